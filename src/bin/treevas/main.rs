use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser as _;
use log::info;
use tracing_subscriber::EnvFilter;
use treevas::{
  config::Config, dashboard_ui::DashboardApp, filter::QueryMode, remote::spawn_remote_runner,
  store::RecordStore,
};

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// The tree csv. Defaults to the configured data path.
  #[arg(short, long)]
  data: Option<PathBuf>,

  /// City name used in the titles.
  #[arg(short, long)]
  city: Option<String>,

  /// How the search text is matched. Values: literal, pattern.
  #[arg(short, long)]
  mode: Option<QueryMode>,

  /// Port of the remote control.
  #[arg(short, long)]
  port: Option<u16>,

  /// Do not listen for remote events.
  #[arg(long, default_value_t = false)]
  no_remote: bool,
}

impl Args {
  fn into_config(self) -> Config {
    Config {
      data_path: self.data,
      city: self.city,
      query_mode: self.mode,
      remote_port: self.port,
      ..Config::default()
    }
    .merge(&Config::new())
  }
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let args = Args::parse();
  let no_remote = args.no_remote;
  let config = args.into_config();

  let data_path = config.data_path();
  let store = Arc::new(
    RecordStore::load(&data_path, &config.columns())
      .with_context(|| format!("Cannot show trees from {}", data_path.display()))?,
  );
  info!("{} trees loaded for {}", store.len(), config.city());

  let rt = tokio::runtime::Runtime::new().context("Failed to start the tokio runtime")?;
  let _enter = rt.enter();
  let handle = rt.handle().clone();

  let options = eframe::NativeOptions {
    viewport: egui::ViewportBuilder {
      title: Some(format!("{} tree dashboard", config.city())),
      inner_size: Some(egui::vec2(1600.0, 1200.0)),
      clamp_size_to_monitor_size: Some(true),
      ..Default::default()
    },
    ..Default::default()
  };

  eframe::run_native(
    "treevas",
    options,
    Box::new(move |cc| {
      egui_extras::install_image_loaders(&cc.egui_ctx);

      let app = DashboardApp::new(&cc.egui_ctx, store, &config);
      if no_remote {
        info!("Remote control disabled.");
      } else {
        spawn_remote_runner(handle, app.remote(), config.remote_port());
      }
      Ok(Box::new(app))
    }),
  )
  .map_err(|e| anyhow::anyhow!("The dashboard window failed: {e}"))
}
