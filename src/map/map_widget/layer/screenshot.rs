use std::{
  path::{Path, PathBuf},
  sync::{
    Arc,
    mpsc::{Receiver, Sender},
  },
  time::Instant,
};

use egui::{
  Color32, ColorImage, Context, Rect, TextureHandle, TextureOptions, Ui, UserData, ViewportCommand,
};
use log::{error, info};

use crate::map::{coordinates::Transform, map_widget::helpers::current_time_screenshot_name};

use super::{Layer, LayerProperties};

/// Seconds until the thumbnail of the last screenshot has faded out.
const FADE_SECS: f32 = 10.;

/// Takes screenshots of the window, saves them as png and shows a fading thumbnail.
pub struct ScreenshotLayer {
  last_screenshot: Option<TextureHandle>,
  last_screenshot_time: Instant,
  last_path: Option<PathBuf>,
  sender: Sender<PathBuf>,
  receiver: Receiver<PathBuf>,
  ctx: Context,
  screenshot_base_path: PathBuf,
  layer_properties: LayerProperties,
}

impl ScreenshotLayer {
  pub fn new(ctx: Context, screenshot_base_path: Option<PathBuf>) -> Self {
    let (sender, receiver) = std::sync::mpsc::channel();
    Self {
      last_screenshot: None,
      last_screenshot_time: Instant::now(),
      last_path: None,
      sender,
      receiver,
      ctx,
      screenshot_base_path: screenshot_base_path.unwrap_or_else(|| PathBuf::from(".")),
      layer_properties: LayerProperties::default(),
    }
  }

  /// A path sent here is saved on one of the next frames.
  pub fn get_sender(&self) -> Sender<PathBuf> {
    self.sender.clone()
  }

  fn resolve(&self, path: &Path) -> PathBuf {
    if path.is_relative() {
      self.screenshot_base_path.join(path)
    } else {
      path.to_path_buf()
    }
  }

  fn take_screenshot(&self, path: &Path) {
    let path = self.resolve(path);
    info!("Requesting screenshot {}", path.display());
    self
      .ctx
      .send_viewport_cmd(ViewportCommand::Screenshot(UserData::new(path)));
  }

  #[expect(clippy::cast_possible_truncation)]
  fn handle_screenshots(&mut self) {
    let screenshot = self.ctx.input(|i| {
      i.events
        .iter()
        .filter_map(|e| {
          if let egui::Event::Screenshot {
            image, user_data, ..
          } = e
          {
            let path = user_data
              .data
              .as_ref()
              .and_then(|d| d.downcast_ref::<PathBuf>().cloned())
              .unwrap_or_else(|| self.resolve(&current_time_screenshot_name()));
            Some((image.clone(), path))
          } else {
            None
          }
        })
        .next_back()
    });

    let Some((image, path)) = screenshot else {
      return;
    };
    self.store_screenshot_texture(image.clone());
    let saved = image::RgbaImage::from_raw(
      image.width() as u32,
      image.height() as u32,
      image.as_raw().to_vec(),
    )
    .map(image::DynamicImage::ImageRgba8)
    .map(|img| img.save(&path));
    match saved {
      Some(Ok(())) => {
        info!("Saved screenshot {}", path.display());
        self.last_path = Some(path);
      }
      Some(Err(e)) => error!("Failed to save {}: {e}", path.display()),
      None => error!("Screenshot has an unexpected buffer size."),
    }
  }

  fn store_screenshot_texture(&mut self, image: Arc<ColorImage>) {
    self.last_screenshot_time = Instant::now();
    self.last_screenshot = Some(
      self
        .ctx
        .load_texture("screenshot", image, TextureOptions::default()),
    );
  }

  fn compute_gamma(&self) -> f32 {
    1. - self.last_screenshot_time.elapsed().as_secs_f32() / FADE_SECS
  }
}

const NAME: &str = "Screenshot";

impl Layer for ScreenshotLayer {
  fn draw(&mut self, ui: &mut Ui, _transform: &Transform, rect: Rect) {
    for path in self.receiver.try_iter().collect::<Vec<_>>() {
      self.take_screenshot(&path);
    }
    self.handle_screenshots();

    if !self.visible() {
      return;
    }

    if let Some(texture) = &self.last_screenshot {
      let screenshot_rect = rect
        .with_min_x(rect.max.x - rect.width() * 0.2)
        .with_min_y(rect.max.y - rect.height() * 0.2);

      let gamma = ui
        .ctx()
        .pointer_hover_pos()
        .and_then(|pos| screenshot_rect.contains(pos).then_some(1.0))
        .unwrap_or_else(|| self.compute_gamma());
      if gamma < 0. {
        self.last_screenshot = None;
        return;
      }

      ui.painter_at(screenshot_rect).image(
        texture.id(),
        screenshot_rect,
        Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        Color32::LIGHT_GRAY.gamma_multiply(gamma),
      );
      self.ctx.request_repaint_after_secs(0.2);
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

  fn ui_content(&mut self, ui: &mut Ui) {
    ui.label(format!("directory: {}", self.screenshot_base_path.display()));
    if let Some(path) = &self.last_path {
      ui.label(format!("last: {}", path.display()));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn relative_paths_use_base_directory() {
    let layer = ScreenshotLayer::new(Context::default(), Some(PathBuf::from("/tmp/shots")));
    assert_eq!(
      layer.resolve(Path::new("a.png")),
      PathBuf::from("/tmp/shots/a.png")
    );
    assert_eq!(layer.resolve(Path::new("/b.png")), PathBuf::from("/b.png"));
  }
}
