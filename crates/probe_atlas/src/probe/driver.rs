//! ProbeDriver - per-frame refresh, render and convolve of probe tiles.
//!
//! Each probe walks `Idle -> NeedsRefreshHandles -> (NeedsRender ->)
//! Rendered` once per frame. Every face handle is refreshed every frame so
//! recency tracks use. A probe is skipped only when it is static, already
//! has a map, and none of its faces was reallocated.

use glam::Vec3;
use smallvec::SmallVec;
use web_time::Instant;

use crate::atlas_set::AtlasSet;
use crate::cache::{TileCache, TileHandle};
use crate::config::DriverConfig;
use crate::metrics::{self, DriverMetrics};
use crate::rect::PixelRect;
use crate::target::{AtlasBinder, AtlasId};

use super::cube::{CubeFace, FaceCamera};
use super::record::{Probe, ProbeKind};

// =============================================================================
// Types
// =============================================================================

/// Per-frame draw state of a probe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProbeState {
  /// Not processed this frame, or a shadow caster that casts nothing.
  #[default]
  Idle,
  NeedsRefreshHandles,
  /// Render pending; stays here when a face could not be drawn.
  NeedsRender,
  Rendered,
}

/// What the renderer should draw into a bound tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CapturePass {
  /// Depth only, shadow casters.
  ShadowDepth,
  /// Lit color plus depth.
  Reflection,
}

/// Which irradiance tile set a convolution writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IrradianceTarget {
  Color,
  Coefficients,
}

/// Input of one irradiance convolution pass: where the six source faces sit
/// in the reflection atlas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConvolveSource {
  pub atlas: AtlasId,
  /// `(u, v, size)` of each source face, in [`CubeFace::ALL`] order.
  pub tex_vectors: [Vec3; 6],
  pub target: IrradianceTarget,
}

/// Renderer / draw-queue boundary.
pub trait SceneRenderer {
  /// Draw the scene into the bound tile.
  fn render(&mut self, pass: CapturePass, viewport: PixelRect, camera: &FaceCamera);

  /// Draw the sky behind a reflection face.
  fn draw_skybox(&mut self, _viewport: PixelRect, _camera: &FaceCamera) {}

  /// Full-screen pass filtering the source cube into one irradiance face.
  fn convolve(&mut self, viewport: PixelRect, face: CubeFace, source: &ConvolveSource);
}

/// Work done by one `draw` call, or summed over a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawReport {
  pub faces_rendered: u32,
  pub faces_failed: u32,
  pub convolutions: u32,
  pub probes_rendered: u32,
  pub probes_skipped: u32,
  pub tiles_reallocated: u32,
}

impl DrawReport {
  pub fn merge(&mut self, other: &DrawReport) {
    self.faces_rendered += other.faces_rendered;
    self.faces_failed += other.faces_failed;
    self.convolutions += other.convolutions;
    self.probes_rendered += other.probes_rendered;
    self.probes_skipped += other.probes_skipped;
    self.tiles_reallocated += other.tiles_reallocated;
  }
}

/// Outcome of refreshing one probe's handles.
#[derive(Clone, Copy, Debug, Default)]
struct RefreshOutcome {
  reallocated: u32,
  missing: u32,
}

impl RefreshOutcome {
  fn lost_content(&self) -> bool {
    self.reallocated > 0 || self.missing > 0
  }
}

// =============================================================================
// ProbeDriver
// =============================================================================

/// Drives probes against an [`AtlasSet`].
#[derive(Debug, Default)]
pub struct ProbeDriver {
  config: DriverConfig,
  metrics: DriverMetrics,
}

impl ProbeDriver {
  pub fn new(config: DriverConfig) -> Self {
    Self {
      config,
      metrics: DriverMetrics::default(),
    }
  }

  #[inline]
  pub fn config(&self) -> &DriverConfig {
    &self.config
  }

  #[inline]
  pub fn metrics(&self) -> &DriverMetrics {
    &self.metrics
  }

  /// Draw every probe for this frame and advance the atlas frame counters.
  pub fn draw_frame<'a, B, R>(
    &mut self,
    probes: impl IntoIterator<Item = &'a mut Probe>,
    atlases: &mut AtlasSet,
    binder: &mut B,
    renderer: &mut R,
  ) -> DrawReport
  where
    B: AtlasBinder + ?Sized,
    R: SceneRenderer + ?Sized,
  {
    let start = Instant::now();
    atlases.begin_frame();

    let mut frame = DrawReport::default();
    let mut drawn: Vec<&'a mut Probe> = Vec::new();
    for probe in probes {
      frame.merge(&self.draw(probe, atlases, binder, renderer));
      drawn.push(probe);
    }

    // Later probes may have evicted tiles of probes drawn earlier
    for probe in drawn {
      drop_stale_map(probe, atlases, self.config.irradiance_coefficients);
    }

    if metrics::is_enabled() {
      self.metrics.record_frame(&frame, start.elapsed().as_micros() as u64);
    }
    frame
  }

  /// Run one probe through its state machine.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "probe::draw"))]
  pub fn draw<B, R>(&mut self, probe: &mut Probe, atlases: &mut AtlasSet, binder: &mut B, renderer: &mut R) -> DrawReport
  where
    B: AtlasBinder + ?Sized,
    R: SceneRenderer + ?Sized,
  {
    let mut report = DrawReport::default();
    if matches!(probe.kind, ProbeKind::Irradiance { .. }) {
      self.draw_irradiance(probe, atlases, binder, renderer, &mut report);
    } else {
      self.draw_capture(probe, atlases, binder, renderer, &mut report);
    }
    report
  }

  /// Shadow, spot, directional and reflection captures. Returns true if the
  /// probe rendered all its faces this frame.
  fn draw_capture<B, R>(
    &self,
    probe: &mut Probe,
    atlases: &mut AtlasSet,
    binder: &mut B,
    renderer: &mut R,
    report: &mut DrawReport,
  ) -> bool
  where
    B: AtlasBinder + ?Sized,
    R: SceneRenderer + ?Sized,
  {
    if probe.kind.casts_shadows() == Some(false) {
      unpin_all(atlases.get_mut(probe.kind.atlas()), probe.kind.faces());
      probe.state = ProbeState::Idle;
      return false;
    }

    probe.state = ProbeState::NeedsRefreshHandles;
    let cache = atlases.get_mut(probe.kind.atlas());

    if probe.changed {
      unpin_all(cache, probe.kind.faces());
      probe.has_rendered_map = false;
    }

    let outcome = refresh_all(cache, probe.kind.faces_mut());
    report.tiles_reallocated += outcome.reallocated;
    if outcome.lost_content() {
      probe.has_rendered_map = false;
    }

    if probe.is_static && probe.has_rendered_map && outcome.reallocated == 0 {
      finish(probe.kind.faces(), cache, true);
      probe.state = ProbeState::Rendered;
      report.probes_skipped += 1;
      return false;
    }

    probe.state = ProbeState::NeedsRender;
    let pass = if probe.kind.is_shadow() {
      CapturePass::ShadowDepth
    } else {
      CapturePass::Reflection
    };

    let mut failed = 0;
    for (index, handle) in probe.kind.faces().iter().enumerate() {
      let Some(camera) = self.face_camera(probe, index) else {
        failed += 1;
        continue;
      };
      let Some(viewport) = bind_tile(cache, *handle, binder) else {
        failed += 1;
        continue;
      };

      binder.clear_depth();
      if pass == CapturePass::Reflection {
        binder.clear_color(self.config.clear_color);
        renderer.draw_skybox(viewport, &camera);
      }
      renderer.render(pass, viewport, &camera);
      report.faces_rendered += 1;
    }

    report.faces_failed += failed;
    if failed > 0 {
      probe.has_rendered_map = false;
      log::debug!("{} atlas: {} face(s) not drawn, retrying next frame", cache.atlas().name(), failed);
      return false;
    }

    finish(probe.kind.faces(), cache, probe.is_static);
    probe.has_rendered_map = true;
    probe.changed = false;
    probe.state = ProbeState::Rendered;
    report.probes_rendered += 1;
    true
  }

  fn draw_irradiance<B, R>(
    &self,
    probe: &mut Probe,
    atlases: &mut AtlasSet,
    binder: &mut B,
    renderer: &mut R,
    report: &mut DrawReport,
  ) where
    B: AtlasBinder + ?Sized,
    R: SceneRenderer + ?Sized,
  {
    let Probe {
      transform,
      is_static,
      has_rendered_map,
      changed,
      state,
      kind,
    } = probe;
    let ProbeKind::Irradiance {
      faces,
      coefficients,
      source,
    } = kind
    else {
      return;
    };

    // The source capture follows its irradiance probe, never the reverse
    source.transform = *transform;
    source.is_static = *is_static;
    if *changed {
      source.changed = true;
    }
    let source_rerendered = self.draw_capture(source, atlases, binder, renderer, report);

    *state = ProbeState::NeedsRefreshHandles;
    let mut coefficients = coefficients.as_mut().filter(|_| self.config.irradiance_coefficients);

    let source_vectors: Option<SmallVec<[Vec3; 6]>> = {
      let reflections = atlases.get(AtlasId::Reflections);
      source.kind.faces().iter().map(|handle| reflections.tex_vector(*handle)).collect()
    };
    let source_ready = source.state == ProbeState::Rendered && source.has_rendered_map;

    let cache = atlases.get_mut(AtlasId::Irradiance);
    if *changed {
      unpin_all(cache, faces.as_slice());
      if let Some(coefficients) = coefficients.as_deref() {
        unpin_all(cache, coefficients);
      }
      *has_rendered_map = false;
    }

    let mut outcome = refresh_all(cache, faces.as_mut_slice());
    if let Some(coefficients) = coefficients.as_deref_mut() {
      let more = refresh_all(cache, coefficients);
      outcome.reallocated += more.reallocated;
      outcome.missing += more.missing;
    }
    report.tiles_reallocated += outcome.reallocated;
    if outcome.lost_content() {
      *has_rendered_map = false;
    }

    let up_to_date = *is_static && *has_rendered_map && outcome.reallocated == 0;
    if up_to_date && !source_rerendered {
      finish(faces.as_slice(), cache, true);
      if let Some(coefficients) = coefficients.as_deref() {
        finish(coefficients, cache, true);
      }
      *state = ProbeState::Rendered;
      report.probes_skipped += 1;
      return;
    }

    *state = ProbeState::NeedsRender;
    let tex_vectors = match source_vectors {
      Some(vectors) if source_ready => vectors,
      _ => {
        *has_rendered_map = false;
        return;
      }
    };
    let mut source_faces = [Vec3::ZERO; 6];
    source_faces.copy_from_slice(&tex_vectors);

    let mut targets: SmallVec<[(IrradianceTarget, &[TileHandle]); 2]> = SmallVec::new();
    targets.push((IrradianceTarget::Color, faces.as_slice()));
    if let Some(coefficients) = coefficients.as_deref() {
      targets.push((IrradianceTarget::Coefficients, coefficients.as_slice()));
    }

    let mut failed = 0;
    for (target, handles) in &targets {
      let input = ConvolveSource {
        atlas: AtlasId::Reflections,
        tex_vectors: source_faces,
        target: *target,
      };
      for (face, handle) in CubeFace::ALL.iter().zip(handles.iter()) {
        let Some(viewport) = bind_tile(cache, *handle, binder) else {
          failed += 1;
          continue;
        };
        binder.clear_color(self.config.clear_color);
        renderer.convolve(viewport, *face, &input);
        report.convolutions += 1;
      }
    }

    report.faces_failed += failed;
    if failed > 0 {
      *has_rendered_map = false;
      return;
    }

    for (_, handles) in &targets {
      finish(handles, cache, *is_static);
    }
    *has_rendered_map = true;
    *changed = false;
    *state = ProbeState::Rendered;
    report.probes_rendered += 1;
  }

  /// Camera for face `index` of a capture probe.
  fn face_camera(&self, probe: &Probe, index: usize) -> Option<FaceCamera> {
    let DriverConfig {
      near,
      far,
      directional_extent,
      ..
    } = self.config;
    let camera = match &probe.kind {
      ProbeKind::PointShadow { .. } | ProbeKind::Reflection { .. } => {
        FaceCamera::cube_face(probe.position(), *CubeFace::ALL.get(index)?, near, far)
      }
      ProbeKind::SpotShadow { angle, .. } => FaceCamera::spot(&probe.transform, *angle, near, far),
      ProbeKind::DirectionalShadow { .. } => FaceCamera::directional(&probe.transform, directional_extent, near, far),
      ProbeKind::Irradiance { .. } => return None,
    };
    Some(camera)
  }
}

// =============================================================================
// Helpers
// =============================================================================

fn refresh_all(cache: &mut TileCache, handles: &mut [TileHandle]) -> RefreshOutcome {
  let mut outcome = RefreshOutcome::default();
  for handle in handles {
    match cache.refresh_tile(*handle) {
      Ok(refresh) => {
        if refresh.was_allocated() {
          outcome.reallocated += 1;
        }
        *handle = refresh.handle();
      }
      Err(err) => {
        log::warn!("{} atlas: no tile for probe face: {}", cache.atlas().name(), err);
        *handle = TileHandle::NULL;
        outcome.missing += 1;
      }
    }
  }
  outcome
}

fn unpin_all(cache: &mut TileCache, handles: &[TileHandle]) {
  for handle in handles {
    cache.unpin(*handle);
  }
}

/// Bind a tile, returning its viewport.
fn bind_tile<B: AtlasBinder + ?Sized>(cache: &TileCache, handle: TileHandle, binder: &mut B) -> Option<PixelRect> {
  let viewport = cache.info(handle)?.pixel_rect();
  if !cache.bind_as_render_target(handle, binder) {
    log::warn!("{} atlas: could not bind tile {:?}", cache.atlas().name(), handle);
    return None;
  }
  Some(viewport)
}

/// Pin the rendered faces of a static probe; unpin them otherwise.
fn finish(handles: &[TileHandle], cache: &mut TileCache, is_static: bool) {
  for handle in handles {
    if is_static {
      cache.pin(*handle);
    } else {
      cache.unpin(*handle);
    }
  }
}

/// Clear the map flag of a probe whose tiles no longer all resolve.
fn drop_stale_map(probe: &mut Probe, atlases: &AtlasSet, coefficients_enabled: bool) {
  let cache = atlases.get(probe.kind.atlas());
  let mut lost = probe.kind.faces().iter().any(|handle| !cache.is_valid(*handle));
  if let ProbeKind::Irradiance {
    coefficients, source, ..
  } = &mut probe.kind
  {
    if let Some(coefficients) = coefficients.as_ref().filter(|_| coefficients_enabled) {
      lost |= coefficients.iter().any(|handle| !cache.is_valid(*handle));
    }
    drop_stale_map(source, atlases, coefficients_enabled);
  }

  if lost && probe.has_rendered_map {
    log::debug!("{} atlas: probe map evicted this frame", cache.atlas().name());
    probe.has_rendered_map = false;
    if probe.state == ProbeState::Rendered {
      probe.state = ProbeState::NeedsRender;
    }
  }
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod driver_test;
