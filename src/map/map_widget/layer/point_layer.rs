use std::sync::mpsc::{Receiver, Sender};

use egui::{Color32, Pos2, Rect, Ui};
use log::debug;

use crate::{
  map::coordinates::{BoundingBox, PixelCoordinate, Transform},
  store::DisplaySubset,
};

use super::{Layer, LayerProperties};

/// Maximal distance in pixels between cursor and tree for the tooltip.
const HOVER_DISTANCE: f32 = 6.;

/// Draws one circle per tree of the latest display subset it received.
pub struct PointLayer {
  receiver: Receiver<DisplaySubset>,
  sender: Sender<DisplaySubset>,
  subset: Option<DisplaySubset>,
  positions: Vec<PixelCoordinate>,
  bounding_box: BoundingBox,
  color: Color32,
  radius: f32,
  layer_properties: LayerProperties,
}

const NAME: &str = "Trees";

impl PointLayer {
  #[must_use]
  pub fn new() -> Self {
    let (sender, receiver) = std::sync::mpsc::channel();
    Self {
      receiver,
      sender,
      subset: None,
      positions: Vec::new(),
      bounding_box: BoundingBox::get_invalid(),
      color: Color32::from_rgba_unmultiplied(0, 100, 0, 128),
      radius: 4.,
      layer_properties: LayerProperties::default(),
    }
  }

  /// Subsets sent here replace what is drawn on the next frame.
  #[must_use]
  pub fn get_sender(&self) -> Sender<DisplaySubset> {
    self.sender.clone()
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.positions.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  fn replace(&mut self, subset: DisplaySubset) {
    self.positions = subset
      .iter()
      .map(|record| PixelCoordinate::from(record.projected()))
      .collect();
    self.bounding_box = BoundingBox::from_iterator(self.positions.iter().copied());
    debug!("Point layer shows {} trees", self.positions.len());
    self.subset = Some(subset);
  }
}

impl Default for PointLayer {
  fn default() -> Self {
    Self::new()
  }
}

impl Layer for PointLayer {
  fn draw(&mut self, ui: &mut Ui, transform: &Transform, rect: Rect) {
    self.process_pending_events();
    if !self.visible() {
      return;
    }

    let painter = ui.painter_at(rect);
    let visible = rect.expand(self.radius);
    for coord in &self.positions {
      let pos: Pos2 = transform.apply(*coord).into();
      if visible.contains(pos) {
        painter.circle_filled(pos, self.radius, self.color);
      }
    }
  }

  fn name(&self) -> &str {
    NAME
  }

  fn visible(&self) -> bool {
    self.layer_properties.visible
  }

  fn visible_mut(&mut self) -> &mut bool {
    &mut self.layer_properties.visible
  }

  fn process_pending_events(&mut self) {
    if let Some(subset) = self.receiver.try_iter().last() {
      self.replace(subset);
    }
  }

  fn bounding_box(&self) -> Option<BoundingBox> {
    (!self.positions.is_empty()).then_some(self.bounding_box)
  }

  fn hover_info(&self, pos: Pos2, transform: &Transform) -> Option<(f32, Vec<(String, String)>)> {
    if !self.visible() {
      return None;
    }
    let subset = self.subset.as_ref()?;
    let (distance, record) = self
      .positions
      .iter()
      .zip(subset.iter())
      .map(|(coord, record)| (Pos2::from(transform.apply(*coord)).distance(pos), record))
      .filter(|(distance, _)| *distance <= HOVER_DISTANCE.max(self.radius))
      .min_by(|a, b| a.0.total_cmp(&b.0))?;

    Some((
      distance,
      vec![
        ("Address".to_string(), record.address().to_string()),
        (
          "Scientific name".to_string(),
          record.scientific_name().to_string(),
        ),
      ],
    ))
  }

  fn ui_content(&mut self, ui: &mut Ui) {
    ui.label(format!("{} trees", self.positions.len()));
    ui.horizontal(|ui| {
      ui.label("color");
      ui.color_edit_button_srgba(&mut self.color);
    });
    ui.add(egui::Slider::new(&mut self.radius, 1.0..=12.0).text("radius"));
  }
}
