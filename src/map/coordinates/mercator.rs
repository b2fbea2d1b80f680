use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sphere radius of EPSG:3857, the semi-major axis of WGS84.
pub const EARTH_RADIUS: f64 = 6_378_137.;

/// Half the side length of the web-mercator square in meters.
pub const HALF_EXTENT: f64 = PI * EARTH_RADIUS;

/// The latitude where the web-mercator square ends. Larger absolute latitudes are saturated.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ProjectionError {
  #[error("Invalid coordinate at index {index}: lon {lon}, lat {lat}.")]
  InvalidCoordinate { index: usize, lon: f64, lat: f64 },
}

/// A geographic coordinate in EPSG:4326, longitude first.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct WGS84Coordinate {
  #[serde(alias = "longitude")]
  pub lon: f64,
  #[serde(alias = "latitude")]
  pub lat: f64,
}

impl WGS84Coordinate {
  #[must_use]
  pub fn new(lon: f64, lat: f64) -> Self {
    Self { lon, lat }
  }

  /// Finite and inside [-180, 180] x [-90, 90].
  #[must_use]
  pub fn is_valid(&self) -> bool {
    self.lon.is_finite()
      && self.lat.is_finite()
      && (-180.0..=180.0).contains(&self.lon)
      && (-90.0..=90.0).contains(&self.lat)
  }
}

/// A projected coordinate in EPSG:3857 meters.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct WebMercator {
  pub x: f64,
  pub y: f64,
}

impl WebMercator {
  #[must_use]
  pub fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }

  /// Expects a valid coordinate. Latitudes beyond `MAX_LATITUDE` end up on the border of the
  /// square instead of diverging.
  fn forward(coord: WGS84Coordinate) -> Self {
    let lat = coord.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    Self {
      x: EARTH_RADIUS * coord.lon.to_radians(),
      y: EARTH_RADIUS * (FRAC_PI_4 + lat / 2.).tan().ln(),
    }
  }
}

/// Projects geographic coordinates to web-mercator meters. Order and length are preserved.
///
/// # Errors
/// Fails on the first coordinate that is not finite or outside the geographic range.
pub fn project(points: &[WGS84Coordinate]) -> Result<Vec<WebMercator>, ProjectionError> {
  points
    .iter()
    .enumerate()
    .map(|(index, coord)| {
      if coord.is_valid() {
        Ok(WebMercator::forward(*coord))
      } else {
        Err(ProjectionError::InvalidCoordinate {
          index,
          lon: coord.lon,
          lat: coord.lat,
        })
      }
    })
    .collect()
}

/// The inverse of `project`.
#[must_use]
pub fn unproject(point: &WebMercator) -> WGS84Coordinate {
  WGS84Coordinate {
    lon: (point.x / EARTH_RADIUS).to_degrees(),
    lat: (2. * (point.y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees(),
  }
}
