//! Bevy components for atlas probes.

use bevy::prelude::*;
use probe_atlas::Probe;

/// A light or capture probe that owns atlas tiles.
///
/// The probe's transform follows the entity's `GlobalTransform`; the tile
/// handles and flags are driven by the plugin every frame.
///
/// # Example
/// ```ignore
/// commands.spawn((
///     AtlasProbe::new(Probe::reflection(Affine3A::IDENTITY).with_static(true)),
///     GlobalTransform::from_xyz(0.0, 2.0, 0.0),
/// ));
/// ```
#[derive(Component, Debug, Clone)]
pub struct AtlasProbe {
  pub probe: Probe,
}

impl AtlasProbe {
  pub fn new(probe: Probe) -> Self {
    Self { probe }
  }

  /// True once every face holds a rendered tile.
  #[inline]
  pub fn is_ready(&self) -> bool {
    self.probe.has_rendered_map
  }
}

impl From<Probe> for AtlasProbe {
  fn from(probe: Probe) -> Self {
    Self::new(probe)
  }
}
