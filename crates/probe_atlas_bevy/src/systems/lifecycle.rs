//! Keeping probes in step with their entities.

use bevy::prelude::*;

use crate::components::AtlasProbe;
use crate::resources::{ProbeAtlases, ProbeTileMap};

/// Convert Bevy's `Affine3A` to the core crate's glam version.
pub fn to_core_affine(gt: &GlobalTransform) -> glam::Affine3A {
  glam::Affine3A::from_cols_array(&gt.affine().to_cols_array())
}

/// System to copy moved `GlobalTransform`s into their probes.
///
/// `Probe::set_transform` flags the probe as changed, so static probes
/// re-render once at their new position.
pub fn sync_probe_transforms(mut probes: Query<(&mut AtlasProbe, &GlobalTransform), Changed<GlobalTransform>>) {
  for (mut atlas_probe, gt) in &mut probes {
    atlas_probe.probe.set_transform(to_core_affine(gt));
  }
}

/// System to return the tiles of despawned probes to their atlases.
pub fn release_removed_probes(
  mut removed: RemovedComponents<AtlasProbe>,
  mut tile_map: ResMut<ProbeTileMap>,
  mut atlases: ResMut<ProbeAtlases>,
) {
  for entity in removed.read() {
    let Some(tiles) = tile_map.remove(entity) else {
      continue;
    };
    let mut released = 0;
    for (atlas, handle) in tiles {
      if !handle.is_null() && atlases.get_mut(atlas).release(handle) {
        released += 1;
      }
    }
    debug!("released {released} atlas tiles of despawned probe {entity}");
  }
}
