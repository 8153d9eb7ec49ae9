//! Recording mocks for the binding layer and renderer.

use crate::probe::{CapturePass, ConvolveSource, CubeFace, FaceCamera, SceneRenderer};
use crate::rect::PixelRect;
use crate::target::{AtlasBinder, AtlasId};

/// Records successful binds and clears.
#[derive(Debug, Default)]
pub struct RecordingBinder {
  pub binds: Vec<(AtlasId, PixelRect)>,
  /// Every bind request, including refused ones.
  pub attempts: usize,
  pub depth_clears: usize,
  pub color_clears: usize,
  /// Refuse every bind.
  pub refuse_all: bool,
  /// Refuse the bind requests with these attempt indices (0-based).
  pub refuse_attempts: Vec<usize>,
}

impl AtlasBinder for RecordingBinder {
  fn bind_atlas_framebuffer(&mut self, atlas: AtlasId, rect: PixelRect) -> bool {
    let attempt = self.attempts;
    self.attempts += 1;
    if self.refuse_all || self.refuse_attempts.contains(&attempt) {
      return false;
    }
    self.binds.push((atlas, rect));
    true
  }

  fn clear_depth(&mut self) {
    self.depth_clears += 1;
  }

  fn clear_color(&mut self, _rgba: [f32; 4]) {
    self.color_clears += 1;
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RenderCall {
  Render {
    pass: CapturePass,
    viewport: PixelRect,
    camera: FaceCamera,
  },
  Skybox {
    viewport: PixelRect,
  },
  Convolve {
    viewport: PixelRect,
    face: CubeFace,
    source: ConvolveSource,
  },
}

#[derive(Debug, Default)]
pub struct RecordingRenderer {
  pub calls: Vec<RenderCall>,
}

impl RecordingRenderer {
  pub fn renders(&self) -> usize {
    self.calls.iter().filter(|c| matches!(c, RenderCall::Render { .. })).count()
  }

  pub fn skyboxes(&self) -> usize {
    self.calls.iter().filter(|c| matches!(c, RenderCall::Skybox { .. })).count()
  }

  pub fn convolutions(&self) -> usize {
    self.calls.iter().filter(|c| matches!(c, RenderCall::Convolve { .. })).count()
  }

  pub fn clear(&mut self) {
    self.calls.clear();
  }
}

impl SceneRenderer for RecordingRenderer {
  fn render(&mut self, pass: CapturePass, viewport: PixelRect, camera: &FaceCamera) {
    self.calls.push(RenderCall::Render {
      pass,
      viewport,
      camera: *camera,
    });
  }

  fn draw_skybox(&mut self, viewport: PixelRect, _camera: &FaceCamera) {
    self.calls.push(RenderCall::Skybox { viewport });
  }

  fn convolve(&mut self, viewport: PixelRect, face: CubeFace, source: &ConvolveSource) {
    self.calls.push(RenderCall::Convolve {
      viewport,
      face,
      source: *source,
    });
  }
}
