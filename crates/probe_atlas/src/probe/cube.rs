//! Cube faces and face cameras.

use glam::{Affine3A, Mat4, Vec3};

/// View direction of each cube face, indexed by [`CubeFace::index`].
pub const CUBE_DIRS: [Vec3; 6] = [
  Vec3::NEG_X,
  Vec3::NEG_Y,
  Vec3::NEG_Z,
  Vec3::X,
  Vec3::Y,
  Vec3::Z,
];

/// Up vector of each cube face camera, never parallel to its direction.
pub const CUBE_UP: [Vec3; 6] = [Vec3::Y, Vec3::Z, Vec3::Y, Vec3::Y, Vec3::Z, Vec3::Y];

/// 90 degrees, so six faces cover the full sphere.
pub const CUBE_FOV: f32 = std::f32::consts::FRAC_PI_2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CubeFace {
  NegX,
  NegY,
  NegZ,
  PosX,
  PosY,
  PosZ,
}

impl CubeFace {
  pub const ALL: [CubeFace; 6] = [
    CubeFace::NegX,
    CubeFace::NegY,
    CubeFace::NegZ,
    CubeFace::PosX,
    CubeFace::PosY,
    CubeFace::PosZ,
  ];

  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }

  #[inline]
  pub fn direction(self) -> Vec3 {
    CUBE_DIRS[self.index()]
  }

  #[inline]
  pub fn up(self) -> Vec3 {
    CUBE_UP[self.index()]
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
  /// Square perspective frustum.
  Perspective { fov_y: f32, near: f32, far: f32 },
  /// Square orthographic box of side `2 * half_extent`.
  Orthographic { half_extent: f32, near: f32, far: f32 },
}

impl Projection {
  /// Right-handed projection matrix, aspect 1.
  pub fn matrix(&self) -> Mat4 {
    match *self {
      Projection::Perspective { fov_y, near, far } => Mat4::perspective_rh(fov_y, 1.0, near, far),
      Projection::Orthographic {
        half_extent,
        near,
        far,
      } => Mat4::orthographic_rh(-half_extent, half_extent, -half_extent, half_extent, near, far),
    }
  }
}

/// Camera used to render one tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceCamera {
  pub position: Vec3,
  pub direction: Vec3,
  pub up: Vec3,
  pub projection: Projection,
}

impl FaceCamera {
  /// Camera for one face of a cube capture at `position`.
  pub fn cube_face(position: Vec3, face: CubeFace, near: f32, far: f32) -> Self {
    Self {
      position,
      direction: face.direction(),
      up: face.up(),
      projection: Projection::Perspective {
        fov_y: CUBE_FOV,
        near,
        far,
      },
    }
  }

  /// Spot light camera looking down the light's forward (-Z) axis, covering
  /// the full cone.
  pub fn spot(transform: &Affine3A, angle: f32, near: f32, far: f32) -> Self {
    let (direction, up) = forward_and_up(transform);
    Self {
      position: transform.translation.into(),
      direction,
      up,
      projection: Projection::Perspective {
        fov_y: 2.0 * angle,
        near,
        far,
      },
    }
  }

  /// Orthographic camera along a directional light's forward (-Z) axis.
  pub fn directional(transform: &Affine3A, half_extent: f32, near: f32, far: f32) -> Self {
    let (direction, up) = forward_and_up(transform);
    Self {
      position: transform.translation.into(),
      direction,
      up,
      projection: Projection::Orthographic {
        half_extent,
        near,
        far,
      },
    }
  }

  #[inline]
  pub fn view(&self) -> Mat4 {
    Mat4::look_to_rh(self.position, self.direction, self.up)
  }

  #[inline]
  pub fn view_projection(&self) -> Mat4 {
    self.projection.matrix() * self.view()
  }
}

fn forward_and_up(transform: &Affine3A) -> (Vec3, Vec3) {
  let forward = transform.transform_vector3(Vec3::NEG_Z).normalize_or(Vec3::NEG_Z);
  let up = transform.transform_vector3(Vec3::Y).normalize_or(Vec3::Y);
  // Degenerate transforms can leave up parallel to forward
  if forward.cross(up).length_squared() < 1e-6 {
    (forward, forward.any_orthonormal_vector())
  } else {
    (forward, up)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_faces_cover_both_signs_of_each_axis() {
    for face in CubeFace::ALL {
      let dir = face.direction();
      assert_eq!(dir.length(), 1.0);
      assert_eq!(dir.dot(face.up()), 0.0);
      assert!(CubeFace::ALL.iter().any(|other| other.direction() == -dir));
    }
  }

  #[test]
  fn test_cube_face_camera_looks_along_face() {
    let camera = FaceCamera::cube_face(Vec3::new(1.0, 2.0, 3.0), CubeFace::PosX, 0.1, 10.0);
    let target = camera.view().transform_point3(Vec3::new(2.0, 2.0, 3.0));
    // Right-handed view space looks down -Z
    assert!((target - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
  }

  #[test]
  fn test_spot_camera_fov_is_twice_angle() {
    let transform = Affine3A::from_translation(Vec3::new(0.0, 5.0, 0.0));
    let camera = FaceCamera::spot(&transform, 0.4, 0.1, 20.0);
    assert_eq!(camera.direction, Vec3::NEG_Z);
    assert_eq!(camera.position, Vec3::new(0.0, 5.0, 0.0));
    assert_eq!(
      camera.projection,
      Projection::Perspective {
        fov_y: 0.8,
        near: 0.1,
        far: 20.0
      }
    );
  }

  #[test]
  fn test_directional_camera_is_orthographic() {
    let transform = Affine3A::from_rotation_x(-std::f32::consts::FRAC_PI_2);
    let camera = FaceCamera::directional(&transform, 25.0, 0.1, 100.0);
    assert!((camera.direction - Vec3::NEG_Y).length() < 1e-5);
    assert!(camera.direction.cross(camera.up).length() > 0.5);
    assert!(matches!(
      camera.projection,
      Projection::Orthographic { half_extent, .. } if half_extent == 25.0
    ));
  }
}
