use egui::{Pos2, Rect, Ui};

use crate::map::coordinates::{BoundingBox, Transform};

/// Draws the trees of the current display subset.
mod point_layer;
/// Saves the map as png.
mod screenshot;
/// Draws the base map.
mod tile_layer;

pub use point_layer::PointLayer;
pub use screenshot::ScreenshotLayer;
pub use tile_layer::TileLayer;

/// A layer represents everything that can be summarized as a logical unit on the map.
/// E.g. a layer to draw the map tiles and one to draw the trees.
pub trait Layer {
  fn draw(&mut self, ui: &mut Ui, transform: &Transform, rect: Rect);
  fn name(&self) -> &str;
  fn visible(&self) -> bool;
  fn visible_mut(&mut self) -> &mut bool;
  /// Handles data that arrived since the last frame.
  fn process_pending_events(&mut self) {}
  fn bounding_box(&self) -> Option<BoundingBox> {
    None
  }
  /// Label/value rows describing what is under `pos`, with the distance in pixels.
  fn hover_info(&self, _pos: Pos2, _transform: &Transform) -> Option<(f32, Vec<(String, String)>)> {
    None
  }
  fn ui(&mut self, ui: &mut Ui) {
    ui.collapsing(self.name().to_owned(), |ui| {
      ui.checkbox(self.visible_mut(), "visible");
      self.ui_content(ui);
    });
  }
  fn ui_content(&mut self, ui: &mut Ui);
}

/// Common properties for all layers.
pub struct LayerProperties {
  pub visible: bool,
}

impl Default for LayerProperties {
  fn default() -> Self {
    Self { visible: true }
  }
}
