//! TileHandle - opaque tile id scoped to the cache that minted it.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::quadtree::NodeId;

// =============================================================================
// CacheId - unique identifier
// =============================================================================

/// Atomic counter for generating unique CacheIds. 0 is reserved for null.
static CACHE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of one tile cache instance.
///
/// A cache takes a fresh id on every full reset, which invalidates every
/// handle it minted before.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct CacheId(u64);

impl CacheId {
  /// Id carried by the null handle. Never assigned to a cache.
  pub const NULL: CacheId = CacheId(0);

  /// Generate a new unique CacheId.
  pub fn new() -> Self {
    Self(CACHE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  /// Get the raw ID value.
  pub fn raw(&self) -> u64 {
    self.0
  }
}

impl Default for CacheId {
  fn default() -> Self {
    Self::new()
  }
}

// =============================================================================
// TileHandle
// =============================================================================

/// Names one allocated tile in one cache.
///
/// Carries no geometry; resolve it with `TileCache::info`. The default
/// handle is null ("no tile yet").
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct TileHandle {
  pub(crate) cache: CacheId,
  pub(crate) node: NodeId,
}

impl TileHandle {
  pub const NULL: TileHandle = TileHandle {
    cache: CacheId::NULL,
    node: NodeId {
      slot: 0,
      generation: 0,
    },
  };

  pub(crate) fn new(cache: CacheId, node: NodeId) -> Self {
    Self { cache, node }
  }

  #[inline]
  pub fn is_null(&self) -> bool {
    self.cache == CacheId::NULL
  }

  /// Id of the cache that minted this handle.
  #[inline]
  pub fn cache_id(&self) -> CacheId {
    self.cache
  }
}

impl Default for TileHandle {
  fn default() -> Self {
    Self::NULL
  }
}
