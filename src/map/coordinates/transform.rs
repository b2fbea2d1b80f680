use std::marker::PhantomData;

use super::XY;

/// A strongly typed transform, meant to be used between ``PixelCoordinate`` (the canvas) and
/// ``PixelPosition`` (a pixel in the UI).
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct TTransform<F: XY, T: XY> {
  pub zoom: f32,
  pub trans: T,
  phantom_data: PhantomData<F>,
}

impl<F: XY, T: XY> Default for TTransform<F, T> {
  fn default() -> Self {
    Self {
      zoom: 1.,
      trans: T::default(),
      phantom_data: PhantomData,
    }
  }
}

/// Avoids accidental conversions between incompatible coordinates.
pub trait PrivateInto<T> {
  fn conv(self) -> T;
}

impl<F: XY, T: XY> PrivateInto<T> for F {
  fn conv(self) -> T {
    T::default().with_x(self.x()).with_y(self.y())
  }
}

impl<F: XY, T: XY> TTransform<F, T>
where
  F: PrivateInto<T>,
  T: PrivateInto<F>,
{
  /// An invalid transform is replaced by a fitted one before the first draw.
  #[must_use]
  pub fn invalid() -> Self {
    Self {
      zoom: 0.,
      trans: T::default(),
      phantom_data: PhantomData,
    }
  }

  #[must_use]
  pub fn is_invalid(&self) -> bool {
    self.zoom == 0. || self.zoom.is_nan() || self.trans.x().is_nan() || self.trans.y().is_nan()
  }

  /// Zooms the transform.
  pub fn zoom(&mut self, factor: f32) -> &mut Self {
    self.zoom *= factor;
    self
  }

  /// Translates.
  pub fn translate(&mut self, delta: T) -> &mut Self {
    self.trans += delta;
    self
  }

  /// The inverse ``TTransform``.
  #[must_use]
  pub fn invert(self) -> TTransform<T, F> {
    TTransform {
      zoom: 1. / self.zoom,
      trans: self.trans.conv() * (-1. / self.zoom),
      phantom_data: PhantomData,
    }
  }

  /// Applies the transform to a coordinate.
  pub fn apply(&self, from: F) -> T {
    (from * self.zoom).conv() + self.trans
  }
}

#[cfg(test)]
mod tests {
  use crate::map::coordinates::{PixelCoordinate, PixelPosition, Transform};

  use super::*;
  use assert_approx_eq::assert_approx_eq;

  #[test]
  fn invert_and_apply() {
    let mut trans = Transform::default();
    trans.zoom(4.).translate(PixelPosition { x: 10., y: 20. });
    let inv = trans.invert();

    assert_approx_eq!(inv.zoom, 0.25);
    assert_approx_eq!(inv.trans.x, -2.5);
    assert_approx_eq!(inv.trans.y, -5.);

    let coord = PixelCoordinate { x: 100., y: 300. };
    let pos = trans.apply(coord);
    assert_approx_eq!(pos.x, 410.);
    assert_approx_eq!(pos.y, 1220.);

    let back = inv.apply(pos);
    assert_approx_eq!(back.x, coord.x);
    assert_approx_eq!(back.y, coord.y);
  }

  #[test]
  fn invalid_transform() {
    assert!(Transform::invalid().is_invalid());
    assert!(!Transform::default().is_invalid());
    let mut t = TTransform::<PixelPosition, PixelPosition>::default();
    t.zoom(f32::NAN);
    assert!(t.is_invalid());
  }
}
