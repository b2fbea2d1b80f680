use std::sync::{
  Arc,
  mpsc::{Receiver, Sender},
};

use egui::Widget as _;
use log::{debug, error};

use crate::{
  config::Config,
  dashboard::{Dashboard, DashboardSettings, DashboardStatus},
  filter::QueryMode,
  map::{
    map_event::MapEvent,
    map_widget::{Layer as _, Map, current_time_screenshot_name},
  },
  remote::{Remote, RemoteEvent},
  store::RecordStore,
};

/// The dashboard window: search bar and title on top, layer settings on the right, map in the
/// middle.
pub struct DashboardApp {
  dashboard: Dashboard,
  map: Map,
  map_events: Sender<MapEvent>,
  remote: Remote,
  remote_events: Receiver<RemoteEvent>,
  search: String,
  published: Option<DashboardStatus>,
  show_layers: bool,
}

impl DashboardApp {
  /// Wires dashboard, map and remote together and publishes every tree.
  #[must_use]
  pub fn new(ctx: &egui::Context, store: Arc<RecordStore>, config: &Config) -> Self {
    let (map, points) = Map::new(ctx.clone(), config);
    let map_events = map.sender();

    let mut dashboard = Dashboard::new(store, DashboardSettings::from(config));
    let repaint = ctx.clone();
    dashboard.subscribe(move |subset| {
      let _ = points
        .send(subset.clone())
        .inspect_err(|e| error!("Map is gone, dropping {} trees: {e}", subset.count()));
      repaint.request_repaint();
    });
    dashboard.start();
    ctx.send_viewport_cmd(egui::ViewportCommand::Title(dashboard.document_title()));

    let (remote, remote_events) = Remote::new(ctx.clone());
    Self {
      dashboard,
      map,
      map_events,
      remote,
      remote_events,
      search: String::new(),
      published: None,
      show_layers: true,
    }
  }

  /// The handle to hand to the http server.
  #[must_use]
  pub fn remote(&self) -> Remote {
    self.remote.clone()
  }

  #[must_use]
  pub fn dashboard(&self) -> &Dashboard {
    &self.dashboard
  }

  pub fn dashboard_mut(&mut self) -> &mut Dashboard {
    &mut self.dashboard
  }

  /// Text of the search field.
  #[must_use]
  pub fn search(&self) -> &str {
    &self.search
  }

  fn send_to_map(&self, event: MapEvent) {
    let _ = self
      .map_events
      .send(event)
      .inspect_err(|e| error!("Failed to send map event: {e}"));
  }

  fn handle_remote_events(&mut self) {
    let events = self.remote_events.try_iter().collect::<Vec<_>>();
    for event in events {
      debug!("Remote event: {event:?}");
      match event {
        RemoteEvent::Query(query) => {
          self.dashboard.query_changed(&query);
          self.search = query;
        }
        RemoteEvent::Reset => self.send_to_map(MapEvent::Reset),
        RemoteEvent::Screenshot(path) => self.send_to_map(MapEvent::Screenshot(path)),
      }
    }
  }

  fn publish_status(&mut self) {
    let status = self.dashboard.status();
    if self.published.as_ref() != Some(&status) {
      self.remote.publish_status(status.clone());
      self.published = Some(status);
    }
  }

  fn top_panel(&mut self, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
      let label = ui.label("Scientific name search:");
      let response = ui
        .add(
          egui::TextEdit::singleline(&mut self.search)
            .hint_text("e.g. Platanus")
            .desired_width(240.),
        )
        .labelled_by(label.id);
      if response.changed() {
        self.dashboard.query_changed(&self.search);
      }

      let mut pattern = self.dashboard.query_mode() == QueryMode::Pattern;
      if ui
        .checkbox(&mut pattern, "regex")
        .on_hover_text("Match the scientific name against a regular expression")
        .changed()
      {
        self.dashboard.set_query_mode(if pattern {
          QueryMode::Pattern
        } else {
          QueryMode::Literal
        });
      }

      if let Some(e) = self.dashboard.last_error() {
        ui.colored_label(egui::Color32::DARK_RED, e.to_string());
      }

      ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
        if ui.button("Layers").clicked() {
          self.show_layers = !self.show_layers;
        }
        if ui.button("Save").on_hover_text("Save the map as png (S)").clicked() {
          self.send_to_map(MapEvent::Screenshot(current_time_screenshot_name()));
        }
        if ui.button("Reset").on_hover_text("Fit the map to the trees (F)").clicked() {
          self.send_to_map(MapEvent::Reset);
        }
      });
    });
    ui.heading(self.dashboard.title());
  }

  fn layer_panel(&mut self, ui: &mut egui::Ui) {
    ui.heading("Map Layers");
    ui.separator();
    egui::ScrollArea::vertical().show(ui, |ui| {
      for layer in self.map.layers_mut() {
        layer.ui(ui);
      }
    });
    ui.separator();
    ui.label(format!(
      "{} of {} trees shown",
      self.dashboard.displayed().count(),
      self.dashboard.store().len()
    ));
    if let Some(cursor) = self.map.cursor() {
      ui.monospace(format!("{:.5}, {:.5}", cursor.lat, cursor.lon));
    }
  }

  /// Draws one frame into `ui`. Split from [`eframe::App::ui`] so it runs without a window.
  pub fn show(&mut self, ui: &mut egui::Ui) {
    self.handle_remote_events();

    egui::Panel::top("search_panel").show_inside(ui, |ui| self.top_panel(ui));
    if self.show_layers {
      egui::Panel::right("layer_panel")
        .default_size(220.)
        .show_inside(ui, |ui| self.layer_panel(ui));
    }
    egui::CentralPanel::default()
      .frame(egui::Frame::NONE)
      .show_inside(ui, |ui| {
        (&mut self.map).ui(ui);
      });

    self.publish_status();
  }
}

impl eframe::App for DashboardApp {
  fn ui(&mut self, ui: &mut egui::Ui, _frame: &mut eframe::Frame) {
    self.show(ui);
  }
}

impl From<&Config> for DashboardSettings {
  fn from(config: &Config) -> Self {
    Self {
      city: config.city(),
      query_mode: config.query_mode(),
    }
  }
}
