//! Per-frame probe drawing.

use bevy::prelude::*;

use crate::components::AtlasProbe;
use crate::resources::{ProbeAtlases, ProbeDriverState, ProbeFrame, ProbeTileMap};

/// System that drives every probe through refresh/render and records the
/// resulting GPU work into [`ProbeFrame`].
pub fn draw_probes(
  mut probes: Query<(Entity, &mut AtlasProbe)>,
  mut atlases: ResMut<ProbeAtlases>,
  mut state: ResMut<ProbeDriverState>,
  mut frame: ResMut<ProbeFrame>,
  mut tile_map: ResMut<ProbeTileMap>,
) {
  frame.clear();

  let mut live: Vec<(Entity, Mut<AtlasProbe>)> = probes.iter_mut().collect();
  let ProbeFrame { binder, renderer } = &mut *frame;
  let state = &mut *state;

  let report = state.driver.draw_frame(
    live.iter_mut().map(|(_, atlas_probe)| &mut atlas_probe.probe),
    &mut atlases.0,
    binder,
    renderer,
  );

  for (entity, atlas_probe) in &live {
    tile_map.track(*entity, atlas_probe.probe.tiles());
  }

  if report.faces_failed > 0 {
    warn!("{} probe face(s) could not be drawn this frame", report.faces_failed);
  }
  state.last_report = report;
}
