//! QuadNode arena entries and the ids that address them.
//!
//! Nodes are stored in a flat arena and reference each other by slot index.
//! A slot's `generation` is bumped whenever an allocation on it ends, so an
//! old [`NodeId`] can never resolve to a newer tile on the same slot.

use glam::{UVec2, Vec2, Vec4};

use crate::rect::PixelRect;

/// Arena slot index of the root node.
pub const ROOT_SLOT: u32 = 0;

/// Child quadrant offsets, in traversal order.
///
/// Quadrant bits: bit 0 = +X half, bit 1 = +Y half.
pub const QUADRANT_OFFSETS: [(u32, u32); 4] = [
  (0, 0), // 0: min corner
  (1, 0), // 1: +X
  (0, 1), // 2: +Y
  (1, 1), // 3: +X +Y
];

/// Identifier of one allocated node inside one quadtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
  /// Arena slot.
  pub slot: u32,
  /// Slot generation at the time of allocation.
  pub generation: u32,
}

/// Occupancy of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
  /// Leaf with no allocation.
  Free,
  /// Leaf holding exactly one tile.
  Allocated,
  /// Interior node with exactly 4 children.
  Split,
}

/// A node of the spatial quadtree.
#[derive(Clone, Debug)]
pub struct QuadNode {
  /// Minimum corner in atlas pixels.
  pub origin: UVec2,
  /// Side length in pixels (power of two).
  pub size: u32,
  pub state: NodeState,
  /// Child slots, present iff `state == Split`.
  pub children: Option<[u32; 4]>,
  /// Parent slot, `None` for the root and for recycled slots.
  pub parent: Option<u32>,
  pub generation: u32,
}

impl QuadNode {
  pub(crate) fn leaf(origin: UVec2, size: u32, parent: Option<u32>, generation: u32) -> Self {
    Self {
      origin,
      size,
      state: NodeState::Free,
      children: None,
      parent,
      generation,
    }
  }

  #[inline]
  pub fn is_free(&self) -> bool {
    self.state == NodeState::Free
  }

  #[inline]
  pub fn rect(&self) -> PixelRect {
    PixelRect::square(self.origin, self.size)
  }

  /// Origin of the child in `quadrant` (0-3).
  #[inline]
  pub fn child_origin(&self, quadrant: usize) -> UVec2 {
    let half = self.size / 2;
    let (qx, qy) = QUADRANT_OFFSETS[quadrant];
    self.origin + UVec2::new(qx * half, qy * half)
  }
}

/// Geometry of an allocated node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadInfo {
  /// Minimum corner in atlas pixels.
  pub origin: UVec2,
  /// Side length in pixels.
  pub size: u32,
  /// Minimum corner in [0, 1] atlas space.
  pub normalized_origin: Vec2,
  /// Side length in [0, 1] atlas space.
  pub normalized_size: f32,
}

impl QuadInfo {
  pub(crate) fn from_node(node: &QuadNode, root_size: u32) -> Self {
    let root = root_size as f32;
    Self {
      origin: node.origin,
      size: node.size,
      normalized_origin: node.origin.as_vec2() / root,
      normalized_size: node.size as f32 / root,
    }
  }

  /// Pixel rectangle for viewport and scissor setup.
  #[inline]
  pub fn pixel_rect(&self) -> PixelRect {
    PixelRect::square(self.origin, self.size)
  }

  /// `(u0, v0, u1, v1)` sub-rectangle of the atlas texture.
  #[inline]
  pub fn uv_rect(&self) -> Vec4 {
    let min = self.normalized_origin;
    let max = min + Vec2::splat(self.normalized_size);
    Vec4::new(min.x, min.y, max.x, max.y)
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
