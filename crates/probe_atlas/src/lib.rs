//! probe_atlas - Framework/engine independent texture-atlas cache for probes
//!
//! Many small square render targets (shadow-map faces, reflection cube
//! faces, irradiance faces) share a few large atlas textures. Each atlas is
//! carved into tiles by a quadtree; tiles are kept alive by refreshing
//! their handles every frame and reclaimed least-recently-used first when
//! the atlas fills up. Static probes that have rendered pin their tiles.
//!
//! # Features
//!
//! - **Quadtree partitioner**: closest-fit, deterministic power-of-two
//!   tiles with upward coalescing on free
//! - **Tile cache**: generation-checked handles scoped to one cache,
//!   evict-and-retry allocation, pinning
//! - **Probe drivers**: point/spot/directional shadows, reflection cubes
//!   and irradiance convolution with a single centralized skip rule
//!
//! # Example
//!
//! ```ignore
//! use probe_atlas::{AtlasSet, AtlasSetConfig, DriverConfig, Probe, ProbeDriver};
//!
//! let mut atlases = AtlasSet::new(&AtlasSetConfig::DEFAULT)?;
//! let mut driver = ProbeDriver::new(DriverConfig::DEFAULT);
//! let mut probes = vec![Probe::reflection(transform).with_static(true)];
//!
//! // Once per frame
//! let report = driver.draw_frame(probes.iter_mut(), &mut atlases, &mut binder, &mut renderer);
//! ```

pub mod error;
pub mod rect;
pub mod target;

pub use error::{AtlasError, ConfigError};
pub use rect::PixelRect;
pub use target::{AtlasBinder, AtlasId};

// Spatial partitioning
pub mod quadtree;
pub use quadtree::{NodeId, QuadInfo, Quadtree};

// Tile cache with recency eviction
pub mod cache;
pub use cache::{CacheId, CacheStats, Refresh, TileCache, TileHandle};

pub mod atlas_set;
pub use atlas_set::AtlasSet;

pub mod config;
pub use config::{AtlasConfig, AtlasFormat, AtlasSetConfig, DriverConfig};

// Probe records and draw drivers
pub mod probe;
pub use probe::{
  CapturePass, ConvolveSource, CubeFace, DrawReport, FaceCamera, IrradianceTarget, Probe, ProbeDriver, ProbeKind,
  ProbeState, SceneRenderer,
};

pub mod metrics;

#[cfg(test)]
pub(crate) mod test_utils;
