use std::path::PathBuf;

use egui::Rect;

use crate::map::coordinates::{
  BoundingBox, CANVAS_SIZE, PixelCoordinate, PixelPosition, Transform,
};

pub const MAX_ZOOM: f32 = 524_288.;
pub const MIN_ZOOM: f32 = 1.;

/// Moves the map so that `coord` is drawn at `cursor`.
pub(crate) fn set_coordinate_to_pixel(
  coord: PixelCoordinate,
  cursor: PixelPosition,
  transform: &mut Transform,
) {
  let current_pos_in_gui = transform.apply(coord);
  transform.translate(current_pos_in_gui * (-1.) + cursor);
}

/// Converts a point, e.g. from a click, to a coordinate.
pub(crate) fn point_to_coordinate(point: PixelPosition, transform: &Transform) -> PixelCoordinate {
  transform.invert().apply(point)
}

/// Clamps the zoom and keeps the canvas from being dragged out of the view.
pub(crate) fn fit_to_screen(transform: &mut Transform, rect: &Rect) {
  transform.zoom = transform.zoom.clamp(MIN_ZOOM, MAX_ZOOM);

  let inv = transform.invert();
  let PixelCoordinate { x, y } = inv.apply(rect.min.into());
  if x < 0. || y < 0. {
    transform.translate(
      PixelPosition {
        x: x.min(0.),
        y: y.min(0.),
      } * transform.zoom,
    );
  }

  let inv = transform.invert();
  let PixelCoordinate { x, y } = inv.apply(rect.max.into());
  if x > CANVAS_SIZE || y > CANVAS_SIZE {
    transform.translate(
      PixelPosition {
        x: (x - CANVAS_SIZE).max(0.),
        y: (y - CANVAS_SIZE).max(0.),
      } * transform.zoom,
    );
  }
}

/// Zooms and moves the map so that `bb` fills the view.
pub(crate) fn show_box(transform: &mut Transform, bb: &BoundingBox, rect: Rect) {
  if bb.is_box() {
    let width_zoom: f32 = 1. / (bb.width() * transform.zoom / rect.width());
    let height_zoom: f32 = 1. / (bb.height() * transform.zoom / rect.height());
    transform.zoom(width_zoom.min(height_zoom));
    transform.zoom(0.95);
    transform.zoom = transform.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    set_coordinate_to_pixel(bb.center(), rect.center().into(), transform);
  }
}

pub(crate) fn current_time_screenshot_name() -> PathBuf {
  format!(
    "treevas_screenshot_{}.png",
    chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
  )
  .into()
}

#[cfg(test)]
mod tests {
  use super::*;
  use assert_approx_eq::assert_approx_eq;

  fn view() -> Rect {
    Rect::from_min_max(egui::pos2(0., 0.), egui::pos2(800., 600.))
  }

  #[test]
  fn coordinate_to_pixel() {
    let mut transform = Transform::default();
    transform.zoom(4.);
    let coord = PixelCoordinate::new(1000., 700.);
    set_coordinate_to_pixel(coord, PixelPosition { x: 400., y: 300. }, &mut transform);
    let back = point_to_coordinate(PixelPosition { x: 400., y: 300. }, &transform);
    assert_approx_eq!(back.x, coord.x, 1e-3);
    assert_approx_eq!(back.y, coord.y, 1e-3);
  }

  #[test]
  fn box_fills_view() {
    let mut transform = Transform::default();
    let bb = BoundingBox::from_corners(
      PixelCoordinate::new(1030., 760.),
      PixelCoordinate::new(1040., 770.),
    );
    show_box(&mut transform, &bb, view());
    assert_approx_eq!(transform.zoom, 57., 1e-2);
    let center = point_to_coordinate(view().center().into(), &transform);
    assert_approx_eq!(center.x, 1035., 1e-2);
    assert_approx_eq!(center.y, 765., 1e-2);
  }

  #[test]
  fn degenerate_box_is_ignored() {
    let mut transform = Transform::default();
    let point = PixelCoordinate::new(5., 5.);
    show_box(
      &mut transform,
      &BoundingBox::from_corners(point, point),
      view(),
    );
    assert_eq!(transform, Transform::default());
  }

  #[test]
  fn canvas_stays_in_view() {
    let mut transform = Transform::default();
    transform.translate(PixelPosition { x: 300., y: 300. });
    fit_to_screen(&mut transform, &view());
    let nw = point_to_coordinate(PixelPosition { x: 0., y: 0. }, &transform);
    assert!(nw.x >= -1e-3 && nw.y >= -1e-3);
  }

  #[test]
  fn screenshot_name() {
    let name = current_time_screenshot_name();
    let name = name.to_string_lossy();
    assert!(name.starts_with("treevas_screenshot_"));
    assert!(name.ends_with(".png"));
  }
}
