//! Error types for atlas allocation and configuration.

use thiserror::Error;

/// Errors raised by the quadtree partitioner and tile caches.
///
/// Only [`AtlasError::OutOfSpace`] is expected at runtime. The other two
/// variants indicate a misconfigured atlas or a handle that was passed to
/// the wrong cache, and the tile cache absorbs [`AtlasError::InvalidHandle`]
/// by reallocating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AtlasError {
  /// Requested size is zero, not a power of two, or larger than the root.
  #[error("invalid tile size {size} for atlas of size {root}")]
  InvalidSize { size: u32, root: u32 },

  /// Neither a direct allocation nor evict-and-retry found room.
  #[error("atlas has no room for a {requested}px tile")]
  OutOfSpace { requested: u32 },

  /// Handle is null, stale, or was minted by another cache.
  #[error("tile handle is not valid for this atlas")]
  InvalidHandle,
}

/// Errors raised while loading or validating atlas configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read atlas config {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse atlas config: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("{atlas} atlas: {source}")]
  Invalid {
    atlas: &'static str,
    #[source]
    source: AtlasError,
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_messages() {
    let err = AtlasError::InvalidSize { size: 3, root: 1024 };
    assert_eq!(err.to_string(), "invalid tile size 3 for atlas of size 1024");

    let err = AtlasError::OutOfSpace { requested: 256 };
    assert_eq!(err.to_string(), "atlas has no room for a 256px tile");
  }

  #[test]
  fn test_config_error_wraps_atlas_error() {
    let err = ConfigError::Invalid {
      atlas: "shadows",
      source: AtlasError::InvalidSize { size: 0, root: 4096 },
    };
    assert!(err.to_string().starts_with("shadows atlas:"));
  }
}
