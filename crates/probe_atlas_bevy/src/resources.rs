//! Bevy resources for the atlas cache and per-frame GPU work.

use std::collections::HashMap;

use bevy::prelude::*;
use probe_atlas::{
  AtlasBinder, AtlasId, AtlasSet, CapturePass, ConvolveSource, CubeFace, DrawReport, FaceCamera, PixelRect,
  ProbeDriver, SceneRenderer, TileHandle,
};
use smallvec::SmallVec;

/// The shared atlas set.
#[derive(Resource, Deref, DerefMut)]
pub struct ProbeAtlases(pub AtlasSet);

/// Probe driver plus last frame's totals.
#[derive(Resource, Default)]
pub struct ProbeDriverState {
  pub driver: ProbeDriver,
  pub last_report: DrawReport,
}

/// Tiles held by each probe entity, so they can be released on despawn.
#[derive(Resource, Default)]
pub struct ProbeTileMap {
  map: HashMap<Entity, SmallVec<[(AtlasId, TileHandle); 6]>>,
}

impl ProbeTileMap {
  pub fn track(&mut self, entity: Entity, tiles: SmallVec<[(AtlasId, TileHandle); 6]>) {
    self.map.insert(entity, tiles);
  }

  pub fn remove(&mut self, entity: Entity) -> Option<SmallVec<[(AtlasId, TileHandle); 6]>> {
    self.map.remove(&entity)
  }

  pub fn get(&self, entity: Entity) -> Option<&[(AtlasId, TileHandle)]> {
    self.map.get(&entity).map(|tiles| tiles.as_slice())
  }

  pub fn len(&self) -> usize {
    self.map.len()
  }

  pub fn is_empty(&self) -> bool {
    self.map.is_empty()
  }
}

// =============================================================================
// Recorded GPU work
// =============================================================================

/// One bound tile and the clears issued on it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundTarget {
  pub atlas: AtlasId,
  pub rect: PixelRect,
  pub clear_depth: bool,
  pub clear_color: Option<[f32; 4]>,
}

/// Records bind and clear requests for a render-graph node to replay.
#[derive(Default, Debug)]
pub struct FrameBinder {
  pub targets: Vec<BoundTarget>,
}

impl AtlasBinder for FrameBinder {
  fn bind_atlas_framebuffer(&mut self, atlas: AtlasId, rect: PixelRect) -> bool {
    if rect.area() == 0 {
      return false;
    }
    self.targets.push(BoundTarget {
      atlas,
      rect,
      clear_depth: false,
      clear_color: None,
    });
    true
  }

  fn clear_depth(&mut self) {
    if let Some(target) = self.targets.last_mut() {
      target.clear_depth = true;
    }
  }

  fn clear_color(&mut self, rgba: [f32; 4]) {
    if let Some(target) = self.targets.last_mut() {
      target.clear_color = Some(rgba);
    }
  }
}

/// Draw work for one tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FaceJob {
  Capture {
    pass: CapturePass,
    viewport: PixelRect,
    camera: FaceCamera,
    skybox: bool,
  },
  Convolve {
    viewport: PixelRect,
    face: CubeFace,
    source: ConvolveSource,
  },
}

/// Records face jobs in draw order.
#[derive(Default, Debug)]
pub struct FrameRenderer {
  pub jobs: Vec<FaceJob>,
  skybox_pending: Option<PixelRect>,
}

impl SceneRenderer for FrameRenderer {
  fn render(&mut self, pass: CapturePass, viewport: PixelRect, camera: &FaceCamera) {
    let skybox = self.skybox_pending.take() == Some(viewport);
    self.jobs.push(FaceJob::Capture {
      pass,
      viewport,
      camera: *camera,
      skybox,
    });
  }

  fn draw_skybox(&mut self, viewport: PixelRect, _camera: &FaceCamera) {
    self.skybox_pending = Some(viewport);
  }

  fn convolve(&mut self, viewport: PixelRect, face: CubeFace, source: &ConvolveSource) {
    self.jobs.push(FaceJob::Convolve {
      viewport,
      face,
      source: *source,
    });
  }
}

/// GPU work produced by this frame's probe pass.
#[derive(Resource, Default, Debug)]
pub struct ProbeFrame {
  pub binder: FrameBinder,
  pub renderer: FrameRenderer,
}

impl ProbeFrame {
  pub fn clear(&mut self) {
    self.binder.targets.clear();
    self.renderer.jobs.clear();
    self.renderer.skybox_pending = None;
  }

  /// Jobs targeting `atlas`.
  pub fn jobs_for(&self, atlas: AtlasId) -> impl Iterator<Item = &FaceJob> {
    self.renderer.jobs.iter().filter(move |job| match job {
      FaceJob::Capture { pass, .. } => match pass {
        CapturePass::ShadowDepth => atlas == AtlasId::Shadows,
        CapturePass::Reflection => atlas == AtlasId::Reflections,
      },
      FaceJob::Convolve { .. } => atlas == AtlasId::Irradiance,
    })
  }
}
