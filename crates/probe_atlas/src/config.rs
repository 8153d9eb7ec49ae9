//! Atlas sizing and probe driver configuration.
//!
//! Sizes are validated once, when the atlas set is built. A bad size is a
//! configuration error, never a runtime condition.

use std::path::Path;

use serde::Deserialize;

use crate::error::{AtlasError, ConfigError};

/// Texture layout backing an atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtlasFormat {
	/// Depth texture only (shadow maps).
	DepthOnly,
	/// Color texture plus depth attachment (probe captures).
	ColorDepth,
}

impl AtlasFormat {
	#[inline]
	pub fn has_color(&self) -> bool {
		matches!(self, AtlasFormat::ColorDepth)
	}
}

/// Size policy for one atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct AtlasConfig {
	/// Side of the square atlas texture in pixels.
	pub atlas_size: u32,
	/// Side of every tile handed out by `refresh`.
	pub tile_size: u32,
	pub format: AtlasFormat,
}

impl AtlasConfig {
	/// 4096² depth atlas with 256² tiles (256 shadow faces).
	pub const SHADOWS: Self = Self {
		atlas_size: 4096,
		tile_size: 256,
		format: AtlasFormat::DepthOnly,
	};

	/// 2048² color atlas with 256² tiles (64 reflection faces).
	pub const REFLECTIONS: Self = Self {
		atlas_size: 2048,
		tile_size: 256,
		format: AtlasFormat::ColorDepth,
	};

	/// 512² color atlas with 32² tiles (256 irradiance faces).
	pub const IRRADIANCE: Self = Self {
		atlas_size: 512,
		tile_size: 32,
		format: AtlasFormat::ColorDepth,
	};

	/// Check both sizes are powers of two and the tile fits the atlas.
	pub fn validate(&self) -> Result<(), AtlasError> {
		if self.atlas_size == 0 || !self.atlas_size.is_power_of_two() {
			return Err(AtlasError::InvalidSize {
				size: self.atlas_size,
				root: self.atlas_size,
			});
		}
		if self.tile_size == 0 || !self.tile_size.is_power_of_two() || self.tile_size > self.atlas_size {
			return Err(AtlasError::InvalidSize {
				size: self.tile_size,
				root: self.atlas_size,
			});
		}
		Ok(())
	}

	/// Number of tiles the atlas holds when full.
	#[inline]
	pub fn capacity(&self) -> u32 {
		let per_side = self.atlas_size / self.tile_size.max(1);
		per_side * per_side
	}
}

/// Size policies for the three atlases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct AtlasSetConfig {
	#[serde(default = "default_shadows")]
	pub shadows: AtlasConfig,
	#[serde(default = "default_reflections")]
	pub reflections: AtlasConfig,
	#[serde(default = "default_irradiance")]
	pub irradiance: AtlasConfig,
}

fn default_shadows() -> AtlasConfig {
	AtlasConfig::SHADOWS
}

fn default_reflections() -> AtlasConfig {
	AtlasConfig::REFLECTIONS
}

fn default_irradiance() -> AtlasConfig {
	AtlasConfig::IRRADIANCE
}

impl AtlasSetConfig {
	pub const DEFAULT: Self = Self {
		shadows: AtlasConfig::SHADOWS,
		reflections: AtlasConfig::REFLECTIONS,
		irradiance: AtlasConfig::IRRADIANCE,
	};

	/// Validate every atlas, naming the first bad one.
	pub fn validate(&self) -> Result<(), ConfigError> {
		for (atlas, config) in [
			("shadows", &self.shadows),
			("reflections", &self.reflections),
			("irradiance", &self.irradiance),
		] {
			config
				.validate()
				.map_err(|source| ConfigError::Invalid { atlas, source })?;
		}
		Ok(())
	}

	/// Parse and validate a TOML document. Missing tables keep defaults.
	pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
		let config: AtlasSetConfig = toml::from_str(content)?;
		config.validate()?;
		Ok(config)
	}

	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.display().to_string(),
			source,
		})?;
		Self::from_toml_str(&content)
	}
}

impl Default for AtlasSetConfig {
	fn default() -> Self {
		Self::DEFAULT
	}
}

/// Camera and pass settings used by the probe drivers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriverConfig {
	/// Near clip plane for face cameras.
	pub near: f32,
	/// Far clip plane for face cameras.
	pub far: f32,
	/// Half extent of the orthographic box used for directional shadows.
	pub directional_extent: f32,
	/// Clear color for reflection and irradiance tiles.
	pub clear_color: [f32; 4],
	/// Also convolve irradiance coefficient tiles when a probe has them.
	pub irradiance_coefficients: bool,
}

impl DriverConfig {
	pub const DEFAULT: Self = Self {
		near: 0.1,
		far: 100.0,
		directional_extent: 50.0,
		clear_color: [0.0, 0.0, 0.0, 1.0],
		irradiance_coefficients: false,
	};
}

impl Default for DriverConfig {
	fn default() -> Self {
		Self::DEFAULT
	}
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
