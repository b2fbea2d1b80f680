use std::{
  collections::{HashMap, HashSet},
  sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    mpsc::{Receiver, Sender},
  },
};

use egui::{Align2, Color32, ColorImage, FontId, Rect, Ui};
use log::{debug, error, info};

use crate::{
  config::Config,
  map::{
    coordinates::{TILE_SIZE, Tile, TileCoordinate, Transform, tiles_in_box},
    tile_loader::{CachedTileLoader, TileLoader, TileSource},
    tile_renderer::decode_raster,
  },
  render_pool::RENDER_POOL,
};

use super::{Layer, LayerProperties};

type InFlight = Arc<Mutex<HashSet<Tile>>>;

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashSet<Tile>> {
  in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A layer that loads and displays the map tiles.
pub struct TileLayer {
  receiver: Receiver<(Tile, ColorImage)>,
  sender: Sender<(Tile, ColorImage)>,
  tile_loader_index: usize,
  tile_loader_old_index: usize,
  all_tile_loader: Vec<Arc<CachedTileLoader>>,
  loaded_tiles: HashMap<Tile, egui::TextureHandle>,
  in_flight_tiles: InFlight,
  ctx: egui::Context,
  layer_properties: LayerProperties,
  tile_source: TileSource,
  request_zoom: u8,
}

const NAME: &str = "Base map";

impl TileLayer {
  pub fn from_config(ctx: egui::Context, config: &Config) -> TileLayer {
    let (sender, receiver) = std::sync::mpsc::channel();
    let all_tile_loader: Vec<_> = CachedTileLoader::from_config(config)
      .map(Arc::new)
      .collect();
    if all_tile_loader.is_empty() {
      info!("No tile provider configured, the base map is disabled.");
    }
    TileLayer {
      receiver,
      sender,
      tile_loader_index: 0,
      tile_loader_old_index: 0,
      all_tile_loader,
      loaded_tiles: HashMap::new(),
      in_flight_tiles: Arc::default(),
      ctx,
      layer_properties: LayerProperties::default(),
      tile_source: TileSource::All,
      request_zoom: 0,
    }
  }

  fn tile_loader(&self) -> Option<Arc<CachedTileLoader>> {
    self.all_tile_loader.get(self.tile_loader_index).cloned()
  }

  fn draw_tile(&self, ui: &Ui, rect: Rect, tile: &Tile, transform: &Transform) {
    if let Some(texture) = self.loaded_tiles.get(tile) {
      let (nw, se) = tile.position();
      let tile_rect = Rect::from_min_max(transform.apply(nw).into(), transform.apply(se).into());
      ui.painter_at(rect).image(
        texture.id(),
        tile_rect,
        Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        Color32::WHITE,
      );
    }
  }

  fn draw_attribution(&self, ui: &Ui, rect: Rect) {
    let Some(attribution) = self.tile_loader().and_then(|l| l.attribution().map(str::to_owned))
    else {
      return;
    };
    let painter = ui.painter_at(rect);
    let galley = painter.layout_no_wrap(
      attribution,
      FontId::proportional(10.),
      Color32::from_gray(60),
    );
    let text_rect = Align2::RIGHT_BOTTOM.anchor_size(rect.right_bottom(), galley.size());
    painter.rect_filled(
      text_rect.expand(2.),
      egui::CornerRadius::ZERO,
      Color32::from_white_alpha(180),
    );
    painter.galley(text_rect.min, galley, Color32::from_gray(60));
  }

  /// Downloads on the tokio runtime, decodes on the render pool, uploads on the next frame.
  fn get_tile(&self, tile: Tile) {
    let Some(tile_loader) = self.tile_loader() else {
      return;
    };
    if tile.zoom > tile_loader.max_zoom() || self.loaded_tiles.contains_key(&tile) {
      return;
    }
    if !lock(&self.in_flight_tiles).insert(tile) {
      return;
    }

    let sender = self.sender.clone();
    let ctx = self.ctx.clone();
    let tile_source = self.tile_source;
    let in_flight_tiles = self.in_flight_tiles.clone();

    tokio::spawn(async move {
      let tile_data = match tile_loader.tile_data(&tile, tile_source).await {
        Ok(data) => data,
        Err(e) => {
          debug!("Failed to fetch tile {tile:?}: {e}");
          lock(&in_flight_tiles).remove(&tile);
          return;
        }
      };
      RENDER_POOL.spawn(move || {
        match decode_raster(&tile, &tile_data) {
          Ok(image) => {
            let _ = sender
              .send((tile, image))
              .inspect_err(|e| error!("Failed to send tile {tile:?}: {e}"));
            ctx.request_repaint();
          }
          Err(e) => error!("{e}"),
        }
        lock(&in_flight_tiles).remove(&tile);
      });
    });
  }

  fn collect_new_tile_data(&mut self, ui: &Ui) {
    for (tile, image) in self.receiver.try_iter() {
      let handle = ui.ctx().load_texture(
        format!("{}-{}-{}", tile.zoom, tile.x, tile.y),
        image,
        egui::TextureOptions::default(),
      );
      self.loaded_tiles.insert(tile, handle);
    }
  }
}

impl Layer for TileLayer {
  #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
  fn draw(&mut self, ui: &mut Ui, transform: &Transform, rect: Rect) {
    if self.tile_loader_index != self.tile_loader_old_index {
      info!(
        "Tile provider switched, dropping {} tiles",
        self.loaded_tiles.len()
      );
      self.loaded_tiles.clear();
      lock(&self.in_flight_tiles).clear();
      // Tiles of the old provider that are still on their way.
      let _ = self.receiver.try_iter().count();
      self.tile_loader_old_index = self.tile_loader_index;
    }
    self.collect_new_tile_data(ui);

    let Some(tile_loader) = self.tile_loader() else {
      return;
    };
    if !self.visible() {
      return;
    }

    let (width, height) = (rect.width(), rect.height());
    let ideal_zoom = (transform.zoom * (width.max(height) / TILE_SIZE)).log2() as u8 + 2;
    self.request_zoom = ideal_zoom.min(tile_loader.max_zoom());

    let inv = transform.invert();
    let min_pos = TileCoordinate::from_pixel_position(inv.apply(rect.min.into()), self.request_zoom);
    let max_pos = TileCoordinate::from_pixel_position(inv.apply(rect.max.into()), self.request_zoom);

    for tile in tiles_in_box(min_pos, max_pos) {
      self.get_tile(tile);
    }

    // Coarser parent tiles stand in for missing ones and are drawn first, so that detailed
    // textures end up on top.
    let mut tiles_to_draw = tiles_in_box(min_pos, max_pos)
      .filter_map(|mut tile| {
        while !self.loaded_tiles.contains_key(&tile) {
          tile = tile.parent()?;
        }
        Some(tile)
      })
      .collect::<Vec<_>>();
    tiles_to_draw.sort_unstable_by_key(|tile| (tile.zoom, tile.x, tile.y));
    tiles_to_draw.dedup();

    for tile in &tiles_to_draw {
      self.draw_tile(ui, rect, tile, transform);
    }
    self.draw_attribution(ui, rect);
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
    if self.all_tile_loader.is_empty() {
      ui.label("no tile provider");
      return;
    }
    egui::ComboBox::from_label("tile provider")
      .selected_text(
        self
          .tile_loader()
          .map(|l| l.name().to_string())
          .unwrap_or_default(),
      )
      .show_ui(ui, |ui| {
        for (i, tile_loader) in self.all_tile_loader.iter().enumerate() {
          ui.selectable_value(
            &mut self.tile_loader_index,
            i,
            tile_loader.name().to_string(),
          );
        }
      });
    egui::ComboBox::from_label("tile source")
      .selected_text(self.tile_source.to_string())
      .show_ui(ui, |ui| {
        for s in [TileSource::All, TileSource::Cache, TileSource::Download] {
          ui.selectable_value(&mut self.tile_source, s, s.to_string());
        }
      });
    ui.label(format!(
      "zoom {}, {} tiles loaded, {} in flight",
      self.request_zoom,
      self.loaded_tiles.len(),
      lock(&self.in_flight_tiles).len()
    ));
  }
}
