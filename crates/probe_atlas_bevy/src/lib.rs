//! Bevy presentation layer for probe_atlas.
//!
//! This crate bridges the engine-independent atlas cache with Bevy: probes
//! are components, the atlas set is a resource, and each frame's binds and
//! face jobs are recorded into [`ProbeFrame`] for a render-graph node to
//! replay.

pub mod components;
pub mod resources;
pub mod systems;


use bevy::prelude::*;
pub use components::*;
use probe_atlas::{AtlasSet, AtlasSetConfig, DriverConfig, ProbeDriver};
pub use resources::*;

/// Bevy plugin for atlas-backed shadow, reflection and irradiance probes.
#[derive(Default)]
pub struct ProbeAtlasPlugin {
  pub atlases: AtlasSetConfig,
  pub driver: DriverConfig,
}

impl Plugin for ProbeAtlasPlugin {
  fn build(&self, app: &mut App) {
    let atlases = match AtlasSet::new(&self.atlases) {
      Ok(atlases) => atlases,
      Err(err) => {
        error!("probe atlases disabled: {err}");
        return;
      }
    };
    info!(
      "probe atlases: shadows {}px, reflections {}px, irradiance {}px",
      self.atlases.shadows.atlas_size, self.atlases.reflections.atlas_size, self.atlases.irradiance.atlas_size
    );

    app
      .insert_resource(ProbeAtlases(atlases))
      .insert_resource(ProbeDriverState {
        driver: ProbeDriver::new(self.driver),
        ..default()
      })
      .init_resource::<ProbeTileMap>()
      .init_resource::<ProbeFrame>()
      // Last runs after PostUpdate, so GlobalTransform is already propagated
      .add_systems(
        Last,
        (
          systems::sync_probe_transforms,
          systems::release_removed_probes,
          systems::draw_probes,
        )
          .chain(),
      );
  }
}
