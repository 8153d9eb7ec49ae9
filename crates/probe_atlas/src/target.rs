//! Boundary to the GPU framebuffer/texture binding layer.
//!
//! The cache never touches a graphics API directly. It asks an
//! [`AtlasBinder`] to attach a sub-rectangle of one atlas texture as the
//! active render target, and the drivers use the same binder to clear it.

use crate::rect::PixelRect;

/// Names one of the fixed atlases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AtlasId {
  Shadows,
  Reflections,
  Irradiance,
}

impl AtlasId {
  pub const ALL: [AtlasId; 3] = [AtlasId::Shadows, AtlasId::Reflections, AtlasId::Irradiance];

  pub fn name(&self) -> &'static str {
    match self {
      AtlasId::Shadows => "shadows",
      AtlasId::Reflections => "reflections",
      AtlasId::Irradiance => "irradiance",
    }
  }
}

/// Thin wrapper over framebuffer binding and clears.
///
/// Implementations must only be driven from the rendering thread.
pub trait AtlasBinder {
  /// Attach `atlas` as the render target with viewport and scissor set to
  /// `rect`. Returns false if the target could not be bound.
  fn bind_atlas_framebuffer(&mut self, atlas: AtlasId, rect: PixelRect) -> bool;

  /// Clear depth inside the bound rectangle.
  fn clear_depth(&mut self);

  /// Clear color inside the bound rectangle.
  fn clear_color(&mut self, rgba: [f32; 4]);
}
