//! Probe records: the lights and captures that own atlas tiles.

use glam::{Affine3A, Vec3};
use smallvec::SmallVec;

use crate::atlas_set::AtlasSet;
use crate::cache::TileHandle;
use crate::target::AtlasId;

use super::driver::ProbeState;

/// Kind-specific tile handles and parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum ProbeKind {
  /// Omnidirectional shadow, one depth tile per cube face.
  PointShadow {
    faces: [TileHandle; 6],
    casts_shadows: bool,
  },
  /// Cone shadow, one depth tile. `angle` is the half-angle in radians.
  SpotShadow {
    tile: TileHandle,
    angle: f32,
    casts_shadows: bool,
  },
  /// Orthographic shadow along the light direction, one depth tile.
  DirectionalShadow {
    tile: TileHandle,
    casts_shadows: bool,
  },
  /// Color cube capture.
  Reflection { faces: [TileHandle; 6] },
  /// Diffuse convolution of its own reflection capture.
  Irradiance {
    faces: [TileHandle; 6],
    /// Optional second tile set for coefficient convolution.
    coefficients: Option<[TileHandle; 6]>,
    source: Box<Probe>,
  },
}

impl ProbeKind {
  /// Atlas holding this probe's own tiles.
  pub fn atlas(&self) -> AtlasId {
    match self {
      ProbeKind::PointShadow { .. } | ProbeKind::SpotShadow { .. } | ProbeKind::DirectionalShadow { .. } => {
        AtlasId::Shadows
      }
      ProbeKind::Reflection { .. } => AtlasId::Reflections,
      ProbeKind::Irradiance { .. } => AtlasId::Irradiance,
    }
  }

  /// `Some(casts)` for shadow kinds, `None` for captures.
  pub fn casts_shadows(&self) -> Option<bool> {
    match self {
      ProbeKind::PointShadow { casts_shadows, .. }
      | ProbeKind::SpotShadow { casts_shadows, .. }
      | ProbeKind::DirectionalShadow { casts_shadows, .. } => Some(*casts_shadows),
      _ => None,
    }
  }

  pub fn is_shadow(&self) -> bool {
    self.casts_shadows().is_some()
  }

  /// Primary face handles (excludes irradiance coefficient tiles).
  pub fn faces(&self) -> &[TileHandle] {
    match self {
      ProbeKind::PointShadow { faces, .. }
      | ProbeKind::Reflection { faces }
      | ProbeKind::Irradiance { faces, .. } => faces,
      ProbeKind::SpotShadow { tile, .. } | ProbeKind::DirectionalShadow { tile, .. } => {
        std::slice::from_ref(tile)
      }
    }
  }

  pub fn faces_mut(&mut self) -> &mut [TileHandle] {
    match self {
      ProbeKind::PointShadow { faces, .. }
      | ProbeKind::Reflection { faces }
      | ProbeKind::Irradiance { faces, .. } => faces,
      ProbeKind::SpotShadow { tile, .. } | ProbeKind::DirectionalShadow { tile, .. } => {
        std::slice::from_mut(tile)
      }
    }
  }
}

/// One probe as the registry owns it. The driver only mutates the handle
/// and flag fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Probe {
  pub transform: Affine3A,
  /// Static probes render once and keep their tiles pinned.
  pub is_static: bool,
  /// True only while every face handle resolves to a rendered tile.
  pub has_rendered_map: bool,
  /// Set by the owner when the probe moved or its scene changed.
  pub changed: bool,
  /// Where the driver left this probe last frame.
  pub state: ProbeState,
  pub kind: ProbeKind,
}

impl Probe {
  fn with_kind(transform: Affine3A, kind: ProbeKind) -> Self {
    Self {
      transform,
      is_static: false,
      has_rendered_map: false,
      changed: false,
      state: ProbeState::Idle,
      kind,
    }
  }

  pub fn point_shadow(transform: Affine3A) -> Self {
    Self::with_kind(
      transform,
      ProbeKind::PointShadow {
        faces: [TileHandle::NULL; 6],
        casts_shadows: true,
      },
    )
  }

  pub fn spot_shadow(transform: Affine3A, angle: f32) -> Self {
    Self::with_kind(
      transform,
      ProbeKind::SpotShadow {
        tile: TileHandle::NULL,
        angle,
        casts_shadows: true,
      },
    )
  }

  pub fn directional_shadow(transform: Affine3A) -> Self {
    Self::with_kind(
      transform,
      ProbeKind::DirectionalShadow {
        tile: TileHandle::NULL,
        casts_shadows: true,
      },
    )
  }

  pub fn reflection(transform: Affine3A) -> Self {
    Self::with_kind(
      transform,
      ProbeKind::Reflection {
        faces: [TileHandle::NULL; 6],
      },
    )
  }

  /// Irradiance probe with its own reflection capture at the same place.
  pub fn irradiance(transform: Affine3A, with_coefficients: bool) -> Self {
    Self::with_kind(
      transform,
      ProbeKind::Irradiance {
        faces: [TileHandle::NULL; 6],
        coefficients: with_coefficients.then_some([TileHandle::NULL; 6]),
        source: Box::new(Probe::reflection(transform)),
      },
    )
  }

  /// Builder-style static flag.
  pub fn with_static(mut self, is_static: bool) -> Self {
    self.is_static = is_static;
    self
  }

  /// Builder-style shadow toggle. No effect on capture probes.
  pub fn with_casts_shadows(mut self, casts: bool) -> Self {
    self.set_casts_shadows(casts);
    self
  }

  pub fn set_casts_shadows(&mut self, casts: bool) {
    match &mut self.kind {
      ProbeKind::PointShadow { casts_shadows, .. }
      | ProbeKind::SpotShadow { casts_shadows, .. }
      | ProbeKind::DirectionalShadow { casts_shadows, .. } => *casts_shadows = casts,
      _ => {}
    }
  }

  /// Move the probe and flag it for re-render.
  pub fn set_transform(&mut self, transform: Affine3A) {
    if self.transform != transform {
      self.transform = transform;
      self.changed = true;
    }
  }

  #[inline]
  pub fn position(&self) -> Vec3 {
    self.transform.translation.into()
  }

  /// Paired reflection capture of an irradiance probe.
  pub fn source(&self) -> Option<&Probe> {
    match &self.kind {
      ProbeKind::Irradiance { source, .. } => Some(source),
      _ => None,
    }
  }

  /// Every tile this probe holds, with its atlas, including the source
  /// capture's tiles and any coefficient tiles.
  pub fn tiles(&self) -> SmallVec<[(AtlasId, TileHandle); 6]> {
    let atlas = self.kind.atlas();
    let mut tiles: SmallVec<[(AtlasId, TileHandle); 6]> =
      self.kind.faces().iter().map(|handle| (atlas, *handle)).collect();
    if let ProbeKind::Irradiance {
      coefficients, source, ..
    } = &self.kind
    {
      if let Some(coefficients) = coefficients {
        tiles.extend(coefficients.iter().map(|handle| (atlas, *handle)));
      }
      tiles.extend(source.tiles());
    }
    tiles
  }

  /// Normalized `(u, v, size)` of each primary face, `None` where the tile
  /// is gone.
  pub fn tex_vectors(&self, atlases: &AtlasSet) -> SmallVec<[Option<Vec3>; 6]> {
    let cache = atlases.get(self.kind.atlas());
    self.kind.faces().iter().map(|handle| cache.tex_vector(*handle)).collect()
  }

  /// Release every tile back to its atlas and reset the probe's flags.
  pub fn release_tiles(&mut self, atlases: &mut AtlasSet) {
    for (atlas, handle) in self.tiles() {
      if !handle.is_null() {
        atlases.get_mut(atlas).release(handle);
      }
    }
    self.clear_handles();
  }

  fn clear_handles(&mut self) {
    self.has_rendered_map = false;
    self.state = ProbeState::Idle;
    for handle in self.kind.faces_mut() {
      *handle = TileHandle::NULL;
    }
    if let ProbeKind::Irradiance {
      coefficients, source, ..
    } = &mut self.kind
    {
      if let Some(coefficients) = coefficients {
        *coefficients = [TileHandle::NULL; 6];
      }
      source.clear_handles();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AtlasSetConfig;

  #[test]
  fn test_constructors() {
    let point = Probe::point_shadow(Affine3A::IDENTITY);
    assert_eq!(point.kind.faces().len(), 6);
    assert_eq!(point.kind.atlas(), AtlasId::Shadows);
    assert_eq!(point.kind.casts_shadows(), Some(true));

    let spot = Probe::spot_shadow(Affine3A::IDENTITY, 0.5);
    assert_eq!(spot.kind.faces().len(), 1);

    let reflection = Probe::reflection(Affine3A::IDENTITY).with_casts_shadows(false);
    assert_eq!(reflection.kind.casts_shadows(), None);
    assert_eq!(reflection.kind.atlas(), AtlasId::Reflections);

    let irradiance = Probe::irradiance(Affine3A::IDENTITY, true);
    assert_eq!(irradiance.kind.atlas(), AtlasId::Irradiance);
    assert_eq!(irradiance.tiles().len(), 18);
    assert!(irradiance.source().is_some());
  }

  #[test]
  fn test_set_transform_flags_change() {
    let mut probe = Probe::reflection(Affine3A::IDENTITY);
    probe.set_transform(Affine3A::IDENTITY);
    assert!(!probe.changed);

    probe.set_transform(Affine3A::from_translation(Vec3::X));
    assert!(probe.changed);
    assert_eq!(probe.position(), Vec3::X);
  }

  #[test]
  fn test_release_tiles() {
    let mut atlases = AtlasSet::new(&AtlasSetConfig::DEFAULT).unwrap();
    let mut probe = Probe::point_shadow(Affine3A::IDENTITY);
    let cache = atlases.get_mut(AtlasId::Shadows);
    for handle in probe.kind.faces_mut() {
      *handle = cache.allocate().unwrap();
    }
    probe.has_rendered_map = true;
    let held: Vec<_> = probe.kind.faces().to_vec();

    probe.release_tiles(&mut atlases);
    assert!(!probe.has_rendered_map);
    assert!(probe.kind.faces().iter().all(|h| h.is_null()));
    for handle in held {
      assert!(!atlases.get(AtlasId::Shadows).is_valid(handle));
    }
    assert_eq!(atlases.get(AtlasId::Shadows).stats().releases, 6);
  }
}
