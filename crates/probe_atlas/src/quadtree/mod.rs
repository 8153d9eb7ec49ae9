//! Quadtree partitioner for square atlas tiles.
//!
//! The tree owns a fixed square pixel domain and hands out power-of-two
//! square regions. It has no knowledge of GPU resources or recency; the
//! [`crate::cache`] module layers both on top.
//!
//! # Module Structure
//!
//! - [`node`]: `QuadNode` arena entries, `NodeId`, `QuadInfo`
//! - [`tree`]: `Quadtree` - allocate, free, coalesce, info

pub mod node;
pub mod tree;

// Re-exports
pub use node::{NodeId, NodeState, QuadInfo, QuadNode};
pub use tree::Quadtree;
