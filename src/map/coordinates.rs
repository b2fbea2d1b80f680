mod boxes;
mod coords;
mod mercator;
mod transform;

/// Tiles and bounding boxes.
pub use boxes::*;
/// Coordinates.
pub use coords::*;
/// Web-mercator projection of geographic coordinates.
pub use mercator::*;
/// Transforms.
use transform::TTransform;

/// Keeps track of the transform of the map.
pub type Transform = TTransform<PixelCoordinate, PixelPosition>;

/// A trait generalizing the types of coordinates that can be placed on the map canvas.
pub trait Coordinate: Copy + Clone + std::fmt::Debug {
  fn as_pixel_coordinate(&self) -> PixelCoordinate;
}

impl Coordinate for PixelCoordinate {
  fn as_pixel_coordinate(&self) -> PixelCoordinate {
    *self
  }
}

impl Coordinate for WebMercator {
  fn as_pixel_coordinate(&self) -> PixelCoordinate {
    PixelCoordinate::from(*self)
  }
}
