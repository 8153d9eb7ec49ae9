//! Tile cache over one atlas texture.
//!
//! # Module Structure
//!
//! - [`handle`]: `CacheId`, `TileHandle`
//! - [`entry`]: `CacheEntry` bookkeeping and `CacheStats` counters
//! - [`tile_cache`]: `TileCache` - refresh, evict, pin, bind

pub mod entry;
pub mod handle;
pub mod tile_cache;

// Re-exports
pub use entry::{CacheEntry, CacheStats};
pub use handle::{CacheId, TileHandle};
pub use tile_cache::{Refresh, TileCache};
