use std::{
  path::PathBuf,
  sync::mpsc::{Receiver, Sender},
};

use egui::{Color32, Pos2, Rect, Response, Sense, Stroke, Ui, Widget};
use log::{debug, info};

use crate::{config::Config, store::DisplaySubset};

use super::{
  coordinates::{
    BoundingBox, CANVAS_SIZE, PixelCoordinate, PixelPosition, Transform, WGS84Coordinate,
    WebMercator, unproject,
  },
  map_event::MapEvent,
};
use helpers::{
  MAX_ZOOM, MIN_ZOOM, fit_to_screen, point_to_coordinate, set_coordinate_to_pixel, show_box,
};

mod helpers;
mod layer;

pub(crate) use helpers::current_time_screenshot_name;
pub use layer::{Layer, PointLayer, ScreenshotLayer, TileLayer};

/// The map: base tiles, the tree layer and the screenshot tool, with pan, zoom, box zoom, reset
/// and a tooltip for the tree under the cursor.
pub struct Map {
  transform: Transform,
  layers: Vec<Box<dyn Layer>>,
  recv: Receiver<MapEvent>,
  sender: Sender<MapEvent>,
  screenshot: Sender<PathBuf>,
  ctx: egui::Context,
  box_zoom_start: Option<Pos2>,
  cursor: Option<WGS84Coordinate>,
}

impl Map {
  /// Returns the map and the channel that feeds its tree layer.
  #[must_use]
  pub fn new(ctx: egui::Context, config: &Config) -> (Self, Sender<DisplaySubset>) {
    let tile_layer = TileLayer::from_config(ctx.clone(), config);
    let point_layer = PointLayer::new();
    let points = point_layer.get_sender();
    let screenshot_layer = ScreenshotLayer::new(ctx.clone(), config.screenshot_path.clone());
    let screenshot = screenshot_layer.get_sender();
    let (sender, recv) = std::sync::mpsc::channel();

    (
      Self {
        transform: Transform::invalid(),
        layers: vec![
          Box::new(tile_layer),
          Box::new(point_layer),
          Box::new(screenshot_layer),
        ],
        recv,
        sender,
        screenshot,
        ctx,
        box_zoom_start: None,
        cursor: None,
      },
      points,
    )
  }

  /// Events sent here are applied on the next frame.
  #[must_use]
  pub fn sender(&self) -> Sender<MapEvent> {
    self.sender.clone()
  }

  pub fn layers_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Layer>> {
    self.layers.iter_mut()
  }

  /// Geographic position of the cursor during the last frame.
  #[must_use]
  pub fn cursor(&self) -> Option<WGS84Coordinate> {
    self.cursor
  }

  #[must_use]
  pub fn transform(&self) -> Transform {
    self.transform
  }

  /// Fits the view to everything the layers show, or to the whole world if they show nothing.
  fn reset_view(&mut self, rect: Rect) {
    let mut bb = self
      .layers
      .iter()
      .filter_map(|l| l.bounding_box())
      .fold(BoundingBox::get_invalid(), |acc, bb| acc.extend(&bb));
    if !bb.is_valid() {
      bb = BoundingBox::from_corners(
        PixelCoordinate::new(0., 0.),
        PixelCoordinate::new(CANVAS_SIZE, CANVAS_SIZE),
      );
    }
    if !bb.is_box() {
      bb.frame(0.02);
    }
    self.transform = Transform::default();
    show_box(&mut self.transform, &bb, rect);
    debug!("View reset to zoom {}", self.transform.zoom);
  }

  fn request_screenshot(&self, path: PathBuf) {
    let _ = self
      .screenshot
      .send(path)
      .inspect_err(|e| log::error!("Failed to request screenshot: {e}"));
  }

  fn handle_keys(&mut self, ui: &Ui, rect: Rect) {
    // Keys typed into the search field are not map commands.
    if ui.ctx().memory(|mem| mem.focused().is_some()) {
      return;
    }
    let keys = ui.input(|i| {
      i.events
        .iter()
        .filter_map(|e| match e {
          egui::Event::Key {
            key, pressed: true, ..
          } => Some(*key),
          _ => None,
        })
        .collect::<Vec<_>>()
    });
    for key in keys {
      match key {
        egui::Key::ArrowDown => {
          self.transform.translate(PixelPosition { x: 0., y: -10. });
        }
        egui::Key::ArrowLeft => {
          self.transform.translate(PixelPosition { x: 10., y: 0. });
        }
        egui::Key::ArrowRight => {
          self.transform.translate(PixelPosition { x: -10., y: 0. });
        }
        egui::Key::ArrowUp => {
          self.transform.translate(PixelPosition { x: 0., y: 10. });
        }
        egui::Key::Minus => self.zoom_with_center(0.9, rect.center().into()),
        egui::Key::Plus | egui::Key::Equals => {
          self.zoom_with_center(1. / 0.9, rect.center().into());
        }
        egui::Key::F => self.reset_view(rect),
        egui::Key::S => self.request_screenshot(helpers::current_time_screenshot_name()),
        _ => debug!("Unhandled key pressed: {key:?}"),
      }
    }
  }

  fn handle_mouse_wheel(&mut self, ui: &Ui, response: &Response) {
    if !response.hovered() {
      return;
    }
    let delta = ui
      .input(|i| {
        i.events.iter().find_map(|e| match e {
          egui::Event::MouseWheel { delta, .. } => Some(*delta),
          _ => None,
        })
      })
      .map(|d| (d.y + 1.).clamp(0.8, 1.4).sqrt());
    if let Some(delta) = delta {
      let cursor = response.hover_pos().unwrap_or_default().into();
      self.zoom_with_center(delta, cursor);
    }
  }

  fn zoom_with_center(&mut self, delta: f32, center: PixelPosition) {
    if self.transform.zoom * delta < MIN_ZOOM || self.transform.zoom * delta > MAX_ZOOM {
      return;
    }
    let hover_coord = point_to_coordinate(center, &self.transform);
    self.transform.zoom(delta);
    set_coordinate_to_pixel(hover_coord, center, &mut self.transform);
  }

  /// Secondary-button drag selects a box that is zoomed to on release.
  fn handle_box_zoom(&mut self, ui: &Ui, response: &Response, rect: Rect) {
    let secondary = egui::PointerButton::Secondary;
    if response.drag_started_by(secondary) {
      self.box_zoom_start = response.interact_pointer_pos();
    }
    let Some(start) = self.box_zoom_start else {
      return;
    };
    let current = response
      .interact_pointer_pos()
      .or_else(|| response.hover_pos());

    if response.drag_stopped_by(secondary) {
      self.box_zoom_start = None;
      let Some(current) = current else { return };
      let bb = BoundingBox::from_corners(
        point_to_coordinate(start.into(), &self.transform),
        point_to_coordinate(current.into(), &self.transform),
      );
      if bb.is_box() {
        show_box(&mut self.transform, &bb, rect);
      }
    } else if let Some(current) = current
      && response.dragged_by(secondary)
    {
      ui.painter_at(rect).rect(
        Rect::from_two_pos(start, current),
        egui::CornerRadius::ZERO,
        Color32::from_rgba_unmultiplied(0, 100, 0, 30),
        Stroke::new(1., Color32::DARK_GREEN),
        egui::epaint::StrokeKind::Inside,
      );
    }
  }

  fn handle_map_events(&mut self, rect: Rect) {
    let events = self.recv.try_iter().collect::<Vec<_>>();
    for layer in &mut self.layers {
      layer.process_pending_events();
    }
    for event in &events {
      match event {
        MapEvent::Reset => self.reset_view(rect),
        MapEvent::Screenshot(path) => self.request_screenshot(path.clone()),
      }
    }
    if !events.is_empty() {
      self.ctx.request_repaint();
    }
  }

  fn hover_info(&self, pos: Pos2) -> Option<Vec<(String, String)>> {
    self
      .layers
      .iter()
      .filter_map(|l| l.hover_info(pos, &self.transform))
      .min_by(|a, b| a.0.total_cmp(&b.0))
      .map(|(_, rows)| rows)
  }

  fn draw_cursor_position(&self, ui: &Ui, rect: Rect) {
    let Some(cursor) = self.cursor else { return };
    let painter = ui.painter_at(rect);
    let galley = painter.layout_no_wrap(
      format!("LONGITUDE {:.5}  LATITUDE {:.5}", cursor.lon, cursor.lat),
      egui::FontId::monospace(11.),
      Color32::from_gray(40),
    );
    let text_rect = egui::Align2::LEFT_BOTTOM.anchor_size(rect.left_bottom(), galley.size());
    painter.rect_filled(
      text_rect.expand(2.),
      egui::CornerRadius::ZERO,
      Color32::from_white_alpha(180),
    );
    painter.galley(text_rect.min, galley, Color32::from_gray(40));
  }
}

impl Widget for &mut Map {
  fn ui(self, ui: &mut Ui) -> Response {
    let size = ui.available_size();
    let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());

    self.handle_map_events(rect);
    if self.transform.is_invalid() {
      self.reset_view(rect);
      info!("Initial view with zoom {}", self.transform.zoom);
    }

    self.handle_mouse_wheel(ui, &response);
    self.handle_keys(ui, rect);

    if response.dragged_by(egui::PointerButton::Primary) {
      self.transform.translate(PixelPosition {
        x: response.drag_delta().x,
        y: response.drag_delta().y,
      });
    }
    fit_to_screen(&mut self.transform, &rect);

    if ui.is_rect_visible(rect) {
      for layer in &mut self.layers {
        layer.draw(ui, &self.transform, rect);
      }
    }
    self.handle_box_zoom(ui, &response, rect);

    self.cursor = response.hover_pos().map(|pos| {
      unproject(&WebMercator::from(point_to_coordinate(
        pos.into(),
        &self.transform,
      )))
    });
    self.draw_cursor_position(ui, rect);

    match response.hover_pos().and_then(|pos| self.hover_info(pos)) {
      Some(rows) => response.on_hover_ui_at_pointer(|ui| {
        egui::Grid::new("tree_tooltip").show(ui, |ui| {
          for (label, value) in rows {
            ui.strong(format!("{label}:"));
            ui.label(value);
            ui.end_row();
          }
        });
      }),
      None => response,
    }
  }
}
