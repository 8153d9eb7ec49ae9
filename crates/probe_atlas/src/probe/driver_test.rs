use glam::{Affine3A, Vec3};

use super::*;
use crate::config::{AtlasConfig, AtlasFormat, AtlasSetConfig};
use crate::probe::Projection;
use crate::test_utils::{RecordingBinder, RecordingRenderer, RenderCall};

fn small_atlases() -> AtlasSet {
  let config = AtlasSetConfig {
    shadows: AtlasConfig {
      atlas_size: 1024,
      tile_size: 256,
      format: AtlasFormat::DepthOnly,
    },
    reflections: AtlasConfig {
      atlas_size: 1024,
      tile_size: 256,
      format: AtlasFormat::ColorDepth,
    },
    irradiance: AtlasConfig {
      atlas_size: 256,
      tile_size: 64,
      format: AtlasFormat::ColorDepth,
    },
  };
  AtlasSet::new(&config).unwrap()
}

struct Harness {
  driver: ProbeDriver,
  atlases: AtlasSet,
  binder: RecordingBinder,
  renderer: RecordingRenderer,
}

impl Harness {
  fn new() -> Self {
    Self::with_config(DriverConfig::DEFAULT)
  }

  fn with_config(config: DriverConfig) -> Self {
    Self {
      driver: ProbeDriver::new(config),
      atlases: small_atlases(),
      binder: RecordingBinder::default(),
      renderer: RecordingRenderer::default(),
    }
  }

  fn frame(&mut self, probes: &mut [Probe]) -> DrawReport {
    self
      .driver
      .draw_frame(probes.iter_mut(), &mut self.atlases, &mut self.binder, &mut self.renderer)
  }

  fn cache(&self, atlas: AtlasId) -> &TileCache {
    self.atlases.get(atlas)
  }

  fn all_pinned(&self, atlas: AtlasId, handles: &[TileHandle]) -> bool {
    handles.iter().all(|h| self.cache(atlas).is_pinned(*h))
  }
}

fn at(x: f32, y: f32, z: f32) -> Affine3A {
  Affine3A::from_translation(Vec3::new(x, y, z))
}

// =============================================================================
// Capture probes
// =============================================================================

#[test]
fn test_static_reflection_renders_once() {
  let mut h = Harness::new();
  let mut probes = [Probe::reflection(at(0.0, 1.0, 0.0)).with_static(true)];

  let first = h.frame(&mut probes);
  assert_eq!(first.faces_rendered, 6);
  assert_eq!(first.probes_rendered, 1);
  assert_eq!(first.tiles_reallocated, 6);

  for _ in 0..20 {
    let report = h.frame(&mut probes);
    assert_eq!(report.faces_rendered, 0);
    assert_eq!(report.probes_skipped, 1);
  }

  let probe = &probes[0];
  assert_eq!(h.renderer.renders(), 6);
  assert_eq!(h.renderer.skyboxes(), 6);
  assert!(probe.has_rendered_map);
  assert_eq!(probe.state, ProbeState::Rendered);
  assert!(h.all_pinned(AtlasId::Reflections, probe.kind.faces()));
}

#[test]
fn test_dynamic_reflection_renders_every_frame() {
  let mut h = Harness::new();
  let mut probes = [Probe::reflection(at(0.0, 0.0, 0.0))];

  for _ in 0..3 {
    let report = h.frame(&mut probes);
    assert_eq!(report.faces_rendered, 6);
  }
  assert_eq!(h.renderer.renders(), 18);
  // Only the first frame allocates
  assert_eq!(h.cache(AtlasId::Reflections).stats().allocations, 6);
  // Dynamic probes never pin
  assert_eq!(h.cache(AtlasId::Reflections).pinned_count(), 0);
}

#[test]
fn test_changed_static_probe_rerenders_all_faces() {
  let mut h = Harness::new();
  let mut probes = [Probe::reflection(at(0.0, 0.0, 0.0)).with_static(true)];
  h.frame(&mut probes);
  let handles = probes[0].kind.faces().to_vec();
  h.renderer.clear();

  probes[0].set_transform(at(5.0, 0.0, 0.0));
  assert!(probes[0].changed);
  let report = h.frame(&mut probes);

  assert_eq!(report.faces_rendered, 6);
  assert_eq!(report.tiles_reallocated, 0);
  assert_eq!(probes[0].kind.faces(), handles.as_slice());
  assert!(!probes[0].changed);
  assert!(probes[0].has_rendered_map);
  assert!(h.all_pinned(AtlasId::Reflections, &handles));

  // Every face camera sits at the new position, one per direction
  let cameras: Vec<FaceCamera> = h
    .renderer
    .calls
    .iter()
    .filter_map(|call| match call {
      RenderCall::Render { camera, .. } => Some(*camera),
      _ => None,
    })
    .collect();
  assert_eq!(cameras.len(), 6);
  for (camera, face) in cameras.iter().zip(CubeFace::ALL) {
    assert_eq!(camera.position, Vec3::new(5.0, 0.0, 0.0));
    assert_eq!(camera.direction, face.direction());
  }

  // And it is static again afterwards
  assert_eq!(h.frame(&mut probes).faces_rendered, 0);
}

#[test]
fn test_point_shadow_clears_depth_only() {
  let mut h = Harness::new();
  let mut probes = [Probe::point_shadow(at(0.0, 3.0, 0.0))];
  h.frame(&mut probes);

  assert_eq!(h.binder.binds.len(), 6);
  assert!(h.binder.binds.iter().all(|(atlas, _)| *atlas == AtlasId::Shadows));
  assert_eq!(h.binder.depth_clears, 6);
  assert_eq!(h.binder.color_clears, 0);
  assert_eq!(h.renderer.skyboxes(), 0);
  assert!(h
    .renderer
    .calls
    .iter()
    .all(|call| matches!(call, RenderCall::Render { pass: CapturePass::ShadowDepth, .. })));
}

#[test]
fn test_faces_never_alias() {
  let mut h = Harness::new();
  let mut probes = [Probe::point_shadow(at(0.0, 0.0, 0.0)), Probe::spot_shadow(at(1.0, 0.0, 0.0), 0.5)];
  h.frame(&mut probes);

  let rects: Vec<_> = h.binder.binds.iter().map(|(_, rect)| *rect).collect();
  assert_eq!(rects.len(), 7);
  for (i, a) in rects.iter().enumerate() {
    for b in &rects[i + 1..] {
      assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
    }
  }
}

#[test]
fn test_spot_and_directional_use_one_tile() {
  let mut h = Harness::new();
  let mut probes = [
    Probe::spot_shadow(at(0.0, 4.0, 0.0), 0.3),
    Probe::directional_shadow(Affine3A::IDENTITY),
  ];
  let report = h.frame(&mut probes);

  assert_eq!(report.faces_rendered, 2);
  assert_eq!(h.cache(AtlasId::Shadows).len(), 2);
  let projections: Vec<Projection> = h
    .renderer
    .calls
    .iter()
    .filter_map(|call| match call {
      RenderCall::Render { camera, .. } => Some(camera.projection),
      _ => None,
    })
    .collect();
  assert_eq!(
    projections[0],
    Projection::Perspective {
      fov_y: 0.6,
      near: DriverConfig::DEFAULT.near,
      far: DriverConfig::DEFAULT.far,
    }
  );
  assert!(matches!(projections[1], Projection::Orthographic { .. }));
}

#[test]
fn test_non_casting_shadow_stays_idle() {
  let mut h = Harness::new();
  let mut probes = [Probe::point_shadow(at(0.0, 0.0, 0.0)).with_casts_shadows(false)];
  let report = h.frame(&mut probes);

  assert_eq!(report, DrawReport::default());
  assert_eq!(probes[0].state, ProbeState::Idle);
  assert!(h.cache(AtlasId::Shadows).is_empty());
  assert_eq!(h.binder.attempts, 0);
}

#[test]
fn test_failed_bind_retries_next_frame() {
  let mut h = Harness::new();
  h.binder.refuse_attempts = vec![2];
  let mut probes = [Probe::reflection(at(0.0, 0.0, 0.0)).with_static(true)];

  let report = h.frame(&mut probes);
  assert_eq!(report.faces_rendered, 5);
  assert_eq!(report.faces_failed, 1);
  assert!(!probes[0].has_rendered_map);
  assert_eq!(probes[0].state, ProbeState::NeedsRender);
  assert_eq!(h.cache(AtlasId::Reflections).pinned_count(), 0);

  let report = h.frame(&mut probes);
  assert_eq!(report.faces_rendered, 6);
  assert_eq!(report.faces_failed, 0);
  assert!(probes[0].has_rendered_map);
  assert_eq!(h.cache(AtlasId::Reflections).pinned_count(), 6);
}

#[test]
fn test_lost_tiles_force_rerender() {
  let mut h = Harness::new();
  let mut probes = [Probe::point_shadow(at(0.0, 0.0, 0.0)).with_static(true)];
  h.frame(&mut probes);
  assert_eq!(h.frame(&mut probes).probes_skipped, 1);

  h.atlases.get_mut(AtlasId::Shadows).reset();
  let report = h.frame(&mut probes);
  assert_eq!(report.tiles_reallocated, 6);
  assert_eq!(report.faces_rendered, 6);
  assert!(probes[0].has_rendered_map);
  assert!(h.all_pinned(AtlasId::Shadows, probes[0].kind.faces()));
}

#[test]
fn test_exhausted_atlas_degrades_without_aliasing() {
  let mut h = Harness::new();
  // 16 shadow tiles: two static point lights pin 12, the third needs 6
  let mut probes = [
    Probe::point_shadow(at(0.0, 0.0, 0.0)).with_static(true),
    Probe::point_shadow(at(1.0, 0.0, 0.0)).with_static(true),
  ];
  h.frame(&mut probes);
  assert_eq!(h.cache(AtlasId::Shadows).pinned_count(), 12);

  let mut third = [Probe::point_shadow(at(2.0, 0.0, 0.0)).with_static(true)];
  let report = h.frame(&mut third);
  assert!(report.faces_failed > 0);
  assert!(!third[0].has_rendered_map);
  assert_eq!(third[0].state, ProbeState::NeedsRender);

  // The pinned lights are untouched
  for probe in &probes {
    assert!(h.all_pinned(AtlasId::Shadows, probe.kind.faces()));
  }
  // Live handles of the third light name distinct tiles
  let cache = h.cache(AtlasId::Shadows);
  let live: Vec<_> = third[0]
    .kind
    .faces()
    .iter()
    .filter_map(|handle| cache.info(*handle))
    .map(|info| info.pixel_rect())
    .collect();
  for (i, a) in live.iter().enumerate() {
    for b in &live[i + 1..] {
      assert!(!a.overlaps(b));
    }
  }
}

#[test]
fn test_probe_turned_static_pins_its_faces() {
  let mut h = Harness::new();
  let mut probes = [Probe::reflection(at(0.0, 0.0, 0.0))];
  h.frame(&mut probes);
  assert_eq!(h.cache(AtlasId::Reflections).pinned_count(), 0);

  probes[0].is_static = true;
  let report = h.frame(&mut probes);
  assert_eq!(report.probes_skipped, 1);
  assert_eq!(report.faces_rendered, 0);
  assert!(probes[0].has_rendered_map);
  assert!(h.all_pinned(AtlasId::Reflections, probes[0].kind.faces()));
}

#[test]
fn test_map_evicted_within_frame_is_dropped() {
  let mut h = Harness::new();
  // 18 dynamic faces into 16 tiles: the last probe evicts two of the first
  let mut probes = [
    Probe::reflection(at(0.0, 0.0, 0.0)),
    Probe::reflection(at(1.0, 0.0, 0.0)),
    Probe::reflection(at(2.0, 0.0, 0.0)),
  ];
  let report = h.frame(&mut probes);
  assert_eq!(report.faces_rendered, 18);
  assert_eq!(h.cache(AtlasId::Reflections).stats().evictions, 2);

  let cache = h.cache(AtlasId::Reflections);
  for probe in &probes {
    if probe.has_rendered_map {
      assert!(probe.kind.faces().iter().all(|handle| cache.is_valid(*handle)));
    }
  }
  assert!(!probes[0].has_rendered_map);
  assert_eq!(probes[0].state, ProbeState::NeedsRender);
  assert!(probes[1].has_rendered_map);
  assert!(probes[2].has_rendered_map);
}

#[test]
fn test_disabling_shadows_unpins_tiles() {
  let mut h = Harness::new();
  let mut probes = [Probe::point_shadow(at(0.0, 0.0, 0.0)).with_static(true)];
  h.frame(&mut probes);
  assert_eq!(h.cache(AtlasId::Shadows).pinned_count(), 6);

  probes[0].set_casts_shadows(false);
  let report = h.frame(&mut probes);
  assert_eq!(report.faces_rendered, 0);
  assert_eq!(probes[0].state, ProbeState::Idle);
  assert_eq!(h.cache(AtlasId::Shadows).pinned_count(), 0);

  // Unpinned tiles are reclaimable by other lights
  let mut others = [
    Probe::point_shadow(at(1.0, 0.0, 0.0)).with_static(true),
    Probe::point_shadow(at(2.0, 0.0, 0.0)).with_static(true),
  ];
  h.frame(&mut others);
  assert!(others.iter().all(|probe| probe.has_rendered_map));
  assert_eq!(h.cache(AtlasId::Shadows).stats().evictions, 2);
}

// =============================================================================
// Irradiance
// =============================================================================

#[test]
fn test_static_irradiance_convolves_once() {
  let mut h = Harness::new();
  let mut probes = [Probe::irradiance(at(0.0, 2.0, 0.0), false).with_static(true)];

  let first = h.frame(&mut probes);
  assert_eq!(first.faces_rendered, 6);
  assert_eq!(first.convolutions, 6);
  assert_eq!(first.probes_rendered, 2);

  let second = h.frame(&mut probes);
  assert_eq!(second.faces_rendered, 0);
  assert_eq!(second.convolutions, 0);
  assert_eq!(second.probes_skipped, 2);

  let probe = &probes[0];
  let source = probe.source().unwrap();
  assert!(probe.has_rendered_map);
  assert!(source.has_rendered_map);
  assert!(source.is_static);
  assert!(h.all_pinned(AtlasId::Irradiance, probe.kind.faces()));
  assert!(h.all_pinned(AtlasId::Reflections, source.kind.faces()));
}

#[test]
fn test_irradiance_turned_static_pins_all_tiles() {
  let mut h = Harness::new();
  let mut probes = [Probe::irradiance(at(0.0, 0.0, 0.0), false)];
  h.frame(&mut probes);
  assert_eq!(h.cache(AtlasId::Irradiance).pinned_count(), 0);

  probes[0].is_static = true;
  let report = h.frame(&mut probes);
  assert_eq!(report.convolutions, 0);
  assert_eq!(report.probes_skipped, 2);

  let probe = &probes[0];
  let source = probe.source().unwrap();
  assert!(h.all_pinned(AtlasId::Irradiance, probe.kind.faces()));
  assert!(h.all_pinned(AtlasId::Reflections, source.kind.faces()));
}

#[test]
fn test_convolution_reads_source_tex_vectors() {
  let mut h = Harness::new();
  let mut probes = [Probe::irradiance(at(0.0, 0.0, 0.0), false)];
  h.frame(&mut probes);

  let expected: Vec<Vec3> = probes[0]
    .source()
    .unwrap()
    .tex_vectors(&h.atlases)
    .into_iter()
    .map(|v| v.unwrap())
    .collect();

  let convolves: Vec<_> = h
    .renderer
    .calls
    .iter()
    .filter_map(|call| match call {
      RenderCall::Convolve { face, source, .. } => Some((*face, *source)),
      _ => None,
    })
    .collect();
  assert_eq!(convolves.len(), 6);
  for ((face, source), expected_face) in convolves.iter().zip(CubeFace::ALL) {
    assert_eq!(*face, expected_face);
    assert_eq!(source.atlas, AtlasId::Reflections);
    assert_eq!(source.target, IrradianceTarget::Color);
    assert_eq!(source.tex_vectors.as_slice(), expected.as_slice());
  }
}

#[test]
fn test_irradiance_reconvolves_when_source_rerenders() {
  let mut h = Harness::new();
  let mut probes = [Probe::irradiance(at(0.0, 0.0, 0.0), false).with_static(true)];
  h.frame(&mut probes);
  let irradiance_tiles = probes[0].kind.faces().to_vec();

  // Lose only the source capture
  h.atlases.get_mut(AtlasId::Reflections).reset();
  let report = h.frame(&mut probes);
  assert_eq!(report.faces_rendered, 6);
  assert_eq!(report.convolutions, 6);
  assert_eq!(probes[0].kind.faces(), irradiance_tiles.as_slice());
  assert!(probes[0].has_rendered_map);
}

#[test]
fn test_lost_irradiance_tiles_only_reconvolve() {
  let mut h = Harness::new();
  let mut probes = [Probe::irradiance(at(0.0, 0.0, 0.0), false).with_static(true)];
  h.frame(&mut probes);

  h.atlases.get_mut(AtlasId::Irradiance).reset();
  let report = h.frame(&mut probes);
  assert_eq!(report.faces_rendered, 0);
  assert_eq!(report.convolutions, 6);
  assert!(probes[0].has_rendered_map);
}

#[test]
fn test_changed_irradiance_propagates_to_source() {
  let mut h = Harness::new();
  let mut probes = [Probe::irradiance(at(0.0, 0.0, 0.0), false).with_static(true)];
  h.frame(&mut probes);

  probes[0].set_transform(at(0.0, 0.0, 9.0));
  let report = h.frame(&mut probes);
  assert_eq!(report.faces_rendered, 6);
  assert_eq!(report.convolutions, 6);

  let source = probes[0].source().unwrap();
  assert!(!probes[0].changed);
  assert!(!source.changed);
  assert_eq!(source.position(), Vec3::new(0.0, 0.0, 9.0));
}

#[test]
fn test_irradiance_waits_for_source() {
  let mut h = Harness::new();
  // Source faces are binds 0-5; refuse one so the capture is incomplete
  h.binder.refuse_attempts = vec![4];
  let mut probes = [Probe::irradiance(at(0.0, 0.0, 0.0), false).with_static(true)];

  let report = h.frame(&mut probes);
  assert_eq!(report.faces_failed, 1);
  assert_eq!(report.convolutions, 0);
  assert!(!probes[0].has_rendered_map);
  assert_eq!(probes[0].state, ProbeState::NeedsRender);

  let report = h.frame(&mut probes);
  assert_eq!(report.faces_rendered, 6);
  assert_eq!(report.convolutions, 6);
  assert!(probes[0].has_rendered_map);
}

#[test]
fn test_coefficient_tiles() {
  let config = DriverConfig {
    irradiance_coefficients: true,
    ..DriverConfig::DEFAULT
  };
  let mut h = Harness::with_config(config);
  let mut probes = [Probe::irradiance(at(0.0, 0.0, 0.0), true)];
  let report = h.frame(&mut probes);

  assert_eq!(report.convolutions, 12);
  let coefficient_passes = h
    .renderer
    .calls
    .iter()
    .filter(|call| {
      matches!(
        call,
        RenderCall::Convolve { source, .. } if source.target == IrradianceTarget::Coefficients
      )
    })
    .count();
  assert_eq!(coefficient_passes, 6);
  assert_eq!(h.cache(AtlasId::Irradiance).len(), 12);
}

#[test]
fn test_coefficients_disabled_in_config() {
  let mut h = Harness::new();
  let mut probes = [Probe::irradiance(at(0.0, 0.0, 0.0), true)];
  let report = h.frame(&mut probes);

  assert_eq!(report.convolutions, 6);
  assert_eq!(h.cache(AtlasId::Irradiance).len(), 6);
  match &probes[0].kind {
    ProbeKind::Irradiance {
      coefficients: Some(coefficients),
      ..
    } => assert!(coefficients.iter().all(|h| h.is_null())),
    other => panic!("unexpected kind {other:?}"),
  }
}

#[test]
fn test_draw_frame_advances_frames() {
  let mut h = Harness::new();
  let mut probes = [Probe::reflection(at(0.0, 0.0, 0.0)), Probe::point_shadow(at(0.0, 0.0, 0.0))];
  let report = h.frame(&mut probes);
  h.frame(&mut probes);

  assert_eq!(report.faces_rendered, 12);
  assert_eq!(report.probes_rendered, 2);
  for atlas in AtlasId::ALL {
    assert_eq!(h.cache(atlas).frame(), 2);
  }
}
