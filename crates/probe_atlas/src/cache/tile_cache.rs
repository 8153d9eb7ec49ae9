//! TileCache - one atlas texture, one quadtree, recency-based eviction.
//!
//! Every tile in a cache has the same size. Probe drivers call
//! [`TileCache::refresh`] on each handle they hold, every frame. A valid
//! handle is just touched; a null, stale or foreign handle triggers a fresh
//! allocation. When the quadtree is full, the least recently touched
//! unpinned tile is evicted and the allocation is retried once.

use std::collections::HashMap;

use glam::{Vec3, Vec4};

use super::entry::{CacheEntry, CacheStats};
use super::handle::{CacheId, TileHandle};
use crate::config::AtlasConfig;
use crate::error::AtlasError;
use crate::quadtree::{NodeId, QuadInfo, Quadtree};
use crate::target::{AtlasBinder, AtlasId};

/// Result of [`TileCache::refresh_tile`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refresh {
  /// Handle was valid; its tile content survives.
  Kept(TileHandle),
  /// A new tile was allocated; previous content (if any) is gone.
  Allocated(TileHandle),
}

impl Refresh {
  #[inline]
  pub fn handle(&self) -> TileHandle {
    match self {
      Refresh::Kept(handle) | Refresh::Allocated(handle) => *handle,
    }
  }

  #[inline]
  pub fn was_allocated(&self) -> bool {
    matches!(self, Refresh::Allocated(_))
  }
}

/// Quadtree-backed tile cache over one shared atlas texture.
pub struct TileCache {
  atlas: AtlasId,
  id: CacheId,
  config: AtlasConfig,
  tree: Quadtree,
  entries: HashMap<NodeId, CacheEntry>,
  /// Monotonic touch counter, strictly orders recency.
  tick: u64,
  frame: u64,
  stats: CacheStats,
}

impl TileCache {
  /// Create an empty cache. Fails if the configured sizes are invalid.
  pub fn new(atlas: AtlasId, config: AtlasConfig) -> Result<Self, AtlasError> {
    config.validate()?;
    let tree = Quadtree::new(config.atlas_size)?;
    Ok(Self {
      atlas,
      id: CacheId::new(),
      config,
      tree,
      entries: HashMap::new(),
      tick: 0,
      frame: 0,
      stats: CacheStats {
        capacity: config.capacity(),
        ..Default::default()
      },
    })
  }

  #[inline]
  pub fn atlas(&self) -> AtlasId {
    self.atlas
  }

  #[inline]
  pub fn id(&self) -> CacheId {
    self.id
  }

  #[inline]
  pub fn config(&self) -> &AtlasConfig {
    &self.config
  }

  #[inline]
  pub fn tile_size(&self) -> u32 {
    self.config.tile_size
  }

  /// Tiles the atlas holds when full.
  #[inline]
  pub fn capacity(&self) -> u32 {
    self.config.capacity()
  }

  /// Live tiles.
  #[inline]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn pinned_count(&self) -> usize {
    self.entries.values().filter(|e| e.pinned).count()
  }

  /// Current frame counter.
  #[inline]
  pub fn frame(&self) -> u64 {
    self.frame
  }

  /// Advance the frame counter. Call once per frame before any refresh.
  pub fn begin_frame(&mut self) {
    self.frame += 1;
  }

  /// Read-only view of the quadtree.
  #[inline]
  pub fn tree(&self) -> &Quadtree {
    &self.tree
  }

  /// Counters plus current live/pinned totals.
  pub fn stats(&self) -> CacheStats {
    CacheStats {
      live_tiles: self.entries.len(),
      pinned_tiles: self.pinned_count(),
      ..self.stats
    }
  }

  /// Iterate over live entries (unordered).
  pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
    self.entries.values()
  }

  // ===========================================================================
  // Handle resolution
  // ===========================================================================

  fn resolve(&self, handle: TileHandle) -> Option<NodeId> {
    if handle.cache != self.id {
      return None;
    }
    (self.tree.is_allocated(handle.node) && self.entries.contains_key(&handle.node))
      .then_some(handle.node)
  }

  /// True if `handle` names a live tile of this cache.
  #[inline]
  pub fn is_valid(&self, handle: TileHandle) -> bool {
    self.resolve(handle).is_some()
  }

  /// Entry for a live tile.
  pub fn entry(&self, handle: TileHandle) -> Option<&CacheEntry> {
    self.resolve(handle).and_then(|node| self.entries.get(&node))
  }

  /// Geometry of a live tile.
  pub fn info(&self, handle: TileHandle) -> Option<QuadInfo> {
    self.resolve(handle).and_then(|node| self.tree.info(node))
  }

  /// `(u, v, size)` of the tile in normalized atlas space, for consumers
  /// that sample the shared atlas texture directly.
  pub fn tex_vector(&self, handle: TileHandle) -> Option<Vec3> {
    self.info(handle).map(|info| {
      Vec3::new(
        info.normalized_origin.x,
        info.normalized_origin.y,
        info.normalized_size,
      )
    })
  }

  /// `(u0, v0, u1, v1)` of the tile in normalized atlas space.
  pub fn uv_rect(&self, handle: TileHandle) -> Option<Vec4> {
    self.info(handle).map(|info| info.uv_rect())
  }

  // ===========================================================================
  // Refresh / allocate / evict
  // ===========================================================================

  /// Keep a tile alive, reallocating if the handle no longer resolves.
  pub fn refresh(&mut self, handle: TileHandle) -> Result<TileHandle, AtlasError> {
    self.refresh_tile(handle).map(|refresh| refresh.handle())
  }

  /// Like [`TileCache::refresh`], but reports whether a new tile was
  /// allocated.
  pub fn refresh_tile(&mut self, handle: TileHandle) -> Result<Refresh, AtlasError> {
    if let Some(node) = self.resolve(handle) {
      self.tick += 1;
      let tick = self.tick;
      if let Some(entry) = self.entries.get_mut(&node) {
        entry.last_touched = tick;
      }
      self.stats.refresh_hits += 1;
      return Ok(Refresh::Kept(handle));
    }

    if !handle.is_null() {
      self.stats.stale_refreshes += 1;
      log::trace!("{} atlas: stale handle {:?}, reallocating", self.atlas.name(), handle);
    }
    self.allocate().map(Refresh::Allocated)
  }

  /// Allocate one tile, evicting the oldest unpinned tile on failure and
  /// retrying once.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "atlas::allocate"))]
  pub fn allocate(&mut self) -> Result<TileHandle, AtlasError> {
    let size = self.config.tile_size;

    let node = match self.tree.allocate(size) {
      Ok(node) => node,
      Err(AtlasError::OutOfSpace { .. }) => {
        if !self.evict() {
          return Err(self.out_of_space());
        }
        match self.tree.allocate(size) {
          Ok(node) => node,
          Err(AtlasError::OutOfSpace { .. }) => return Err(self.out_of_space()),
          Err(err) => return Err(err),
        }
      }
      Err(err) => return Err(err),
    };

    self.tick += 1;
    let handle = TileHandle::new(self.id, node);
    self.entries.insert(
      node,
      CacheEntry {
        handle,
        last_touched: self.tick,
        pinned: false,
        allocated_frame: self.frame,
      },
    );
    self.stats.allocations += 1;
    Ok(handle)
  }

  fn out_of_space(&mut self) -> AtlasError {
    self.stats.out_of_space += 1;
    log::warn!(
      "{} atlas exhausted: {} live tiles, {} pinned",
      self.atlas.name(),
      self.entries.len(),
      self.pinned_count()
    );
    AtlasError::OutOfSpace {
      requested: self.config.tile_size,
    }
  }

  /// Evict the least recently touched unpinned tile.
  ///
  /// Returns false if every live tile is pinned (or there are none).
  pub fn evict(&mut self) -> bool {
    let Some(victim) = self
      .entries
      .values()
      .filter(|entry| !entry.pinned)
      .min_by_key(|entry| (entry.last_touched, entry.handle.node))
      .map(|entry| entry.handle.node)
    else {
      return false;
    };

    if let Err(err) = self.tree.free(victim) {
      log::warn!("{} atlas: evicting {:?} failed: {}", self.atlas.name(), victim, err);
    }
    self.entries.remove(&victim);
    self.stats.evictions += 1;
    log::debug!("{} atlas: evicted tile {:?}", self.atlas.name(), victim);
    true
  }

  /// Free a tile explicitly. Returns false for an invalid handle.
  pub fn release(&mut self, handle: TileHandle) -> bool {
    let Some(node) = self.resolve(handle) else {
      return false;
    };
    self.entries.remove(&node);
    if self.tree.free(node).is_err() {
      return false;
    }
    self.stats.releases += 1;
    true
  }

  /// Drop every tile and take a new cache id; all handles become invalid.
  pub fn reset(&mut self) {
    self.tree.clear();
    self.entries.clear();
    self.id = CacheId::new();
  }

  // ===========================================================================
  // Pinning
  // ===========================================================================

  /// Exempt a tile from eviction. Returns false for an invalid handle.
  pub fn pin(&mut self, handle: TileHandle) -> bool {
    self.set_pinned(handle, true)
  }

  /// Make a tile evictable again. Returns false for an invalid handle.
  pub fn unpin(&mut self, handle: TileHandle) -> bool {
    self.set_pinned(handle, false)
  }

  pub fn is_pinned(&self, handle: TileHandle) -> bool {
    self.entry(handle).is_some_and(|entry| entry.pinned)
  }

  fn set_pinned(&mut self, handle: TileHandle, pinned: bool) -> bool {
    let Some(node) = self.resolve(handle) else {
      return false;
    };
    match self.entries.get_mut(&node) {
      Some(entry) => {
        entry.pinned = pinned;
        true
      }
      None => false,
    }
  }

  // ===========================================================================
  // Render target binding
  // ===========================================================================

  /// Bind the tile's rectangle of the shared atlas as the render target.
  ///
  /// Returns false for an invalid handle or if the binding layer refuses;
  /// the caller skips that face.
  pub fn bind_as_render_target<B: AtlasBinder + ?Sized>(
    &self,
    handle: TileHandle,
    binder: &mut B,
  ) -> bool {
    let Some(info) = self.info(handle) else {
      return false;
    };
    binder.bind_atlas_framebuffer(self.atlas, info.pixel_rect())
  }
}

#[cfg(test)]
#[path = "tile_cache_test.rs"]
mod tile_cache_test;
