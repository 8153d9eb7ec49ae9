//! Integer pixel rectangles inside an atlas texture.

use glam::UVec2;

/// Axis-aligned pixel rectangle. `origin` is the minimum corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
  pub origin: UVec2,
  pub size: UVec2,
}

impl PixelRect {
  pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
    Self {
      origin: UVec2::new(x, y),
      size: UVec2::new(width, height),
    }
  }

  /// Square rectangle, the only shape the quadtree hands out.
  pub fn square(origin: UVec2, side: u32) -> Self {
    Self {
      origin,
      size: UVec2::splat(side),
    }
  }

  /// Exclusive maximum corner.
  #[inline]
  pub fn max(&self) -> UVec2 {
    self.origin + self.size
  }

  #[inline]
  pub fn area(&self) -> u64 {
    self.size.x as u64 * self.size.y as u64
  }

  /// True if the two rectangles share interior pixels. Touching edges do not
  /// count.
  #[inline]
  pub fn overlaps(&self, other: &PixelRect) -> bool {
    let a_max = self.max();
    let b_max = other.max();
    self.origin.x < b_max.x
      && other.origin.x < a_max.x
      && self.origin.y < b_max.y
      && other.origin.y < a_max.y
  }

  /// True if `other` lies fully inside this rectangle.
  #[inline]
  pub fn contains_rect(&self, other: &PixelRect) -> bool {
    let a_max = self.max();
    let b_max = other.max();
    other.origin.x >= self.origin.x
      && other.origin.y >= self.origin.y
      && b_max.x <= a_max.x
      && b_max.y <= a_max.y
  }
}
