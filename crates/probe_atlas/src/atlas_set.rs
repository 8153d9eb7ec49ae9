//! The fixed set of atlases: shadows, reflections, irradiance.

use crate::cache::{CacheStats, TileCache};
use crate::config::{AtlasConfig, AtlasSetConfig};
use crate::error::ConfigError;
use crate::target::AtlasId;

/// One tile cache per [`AtlasId`]. Atlases never share tiles.
pub struct AtlasSet {
  shadows: TileCache,
  reflections: TileCache,
  irradiance: TileCache,
}

impl AtlasSet {
  /// Build all three caches. Sizes are validated here, once.
  pub fn new(config: &AtlasSetConfig) -> Result<Self, ConfigError> {
    config.validate()?;
    let build = |atlas: AtlasId, name: &'static str, atlas_config: AtlasConfig| {
      TileCache::new(atlas, atlas_config).map_err(|source| ConfigError::Invalid { atlas: name, source })
    };
    Ok(Self {
      shadows: build(AtlasId::Shadows, "shadows", config.shadows)?,
      reflections: build(AtlasId::Reflections, "reflections", config.reflections)?,
      irradiance: build(AtlasId::Irradiance, "irradiance", config.irradiance)?,
    })
  }

  #[inline]
  pub fn get(&self, atlas: AtlasId) -> &TileCache {
    match atlas {
      AtlasId::Shadows => &self.shadows,
      AtlasId::Reflections => &self.reflections,
      AtlasId::Irradiance => &self.irradiance,
    }
  }

  #[inline]
  pub fn get_mut(&mut self, atlas: AtlasId) -> &mut TileCache {
    match atlas {
      AtlasId::Shadows => &mut self.shadows,
      AtlasId::Reflections => &mut self.reflections,
      AtlasId::Irradiance => &mut self.irradiance,
    }
  }

  /// Advance every cache's frame counter.
  pub fn begin_frame(&mut self) {
    for atlas in AtlasId::ALL {
      self.get_mut(atlas).begin_frame();
    }
  }

  /// Reset every cache; all outstanding handles become invalid.
  pub fn reset(&mut self) {
    for atlas in AtlasId::ALL {
      self.get_mut(atlas).reset();
    }
    log::debug!("atlas set reset");
  }

  /// Stats for every atlas, in [`AtlasId::ALL`] order.
  pub fn stats(&self) -> [(AtlasId, CacheStats); 3] {
    AtlasId::ALL.map(|atlas| (atlas, self.get(atlas).stats()))
  }
}
