//! Per-tile bookkeeping and cache counters.

use super::handle::TileHandle;

/// Bookkeeping attached to every allocated tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheEntry {
  pub handle: TileHandle,
  /// Cache tick of the last `refresh` (or allocation).
  pub last_touched: u64,
  /// Pinned entries are never evicted.
  pub pinned: bool,
  /// Frame counter when the tile was allocated.
  pub allocated_frame: u64,
}

/// Counters accumulated by a tile cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
  /// Tiles allocated (including reallocations after eviction).
  pub allocations: u64,
  /// Tiles reclaimed by the eviction sweep.
  pub evictions: u64,
  /// Requests that failed even after evict-and-retry.
  pub out_of_space: u64,
  /// `refresh` calls that found their handle still valid.
  pub refresh_hits: u64,
  /// `refresh` calls with a non-null handle that had been invalidated.
  pub stale_refreshes: u64,
  /// Tiles freed explicitly through `release`.
  pub releases: u64,
  /// Live tiles right now.
  pub live_tiles: usize,
  /// Pinned tiles right now.
  pub pinned_tiles: usize,
  /// Tiles the atlas holds when full.
  pub capacity: u32,
}

impl CacheStats {
  /// Fraction of capacity in use, 0.0 - 1.0.
  #[inline]
  pub fn occupancy(&self) -> f32 {
    if self.capacity == 0 {
      0.0
    } else {
      self.live_tiles as f32 / self.capacity as f32
    }
  }

  /// Fraction of refreshes that hit a valid handle.
  #[inline]
  pub fn hit_rate(&self) -> f32 {
    let total = self.refresh_hits + self.allocations;
    if total == 0 {
      0.0
    } else {
      self.refresh_hits as f32 / total as f32
    }
  }
}
