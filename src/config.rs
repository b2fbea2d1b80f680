use std::path::PathBuf;

use dirs::home_dir;
use log::error;

use crate::{filter::QueryMode, parser::Columns};

pub const DEFAULT_PORT: u16 = 12346;
pub const DEFAULT_DATA_PATH: &str = "2020_1T_arbrat_viari.csv";
pub const DEFAULT_CITY: &str = "Barcelona";

const POSITRON_TILE_URL: &str = "https://a.basemaps.cartocdn.com/light_all/{zoom}/{x}/{y}.png";
const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{zoom}/{x}/{y}.png";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct TileProvider {
  pub name: String,
  /// Template with `{zoom}`, `{x}` and `{y}` placeholders.
  pub url: String,
  /// Attribution drawn in the map corner.
  #[serde(default)]
  pub attribution: Option<String>,
  #[serde(default)]
  pub max_zoom: Option<u8>,
}

impl TileProvider {
  #[must_use]
  pub fn get_max_zoom(&self) -> u8 {
    self.max_zoom.unwrap_or(19)
  }
}

/// Settings merged from the environment, `config.json` and defaults, in that order.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
  pub config_path: Option<PathBuf>,
  pub data_path: Option<PathBuf>,
  pub city: Option<String>,
  pub columns: Option<Columns>,
  pub query_mode: Option<QueryMode>,
  pub remote_port: Option<u16>,
  pub tile_provider: Vec<TileProvider>,
  pub tile_cache_dir: Option<PathBuf>,
  pub screenshot_path: Option<PathBuf>,
}

impl Config {
  #[must_use]
  pub fn new() -> Self {
    let mut merged = Self::from_env();
    if let Some(from_file) = Self::from_file() {
      merged = merged.merge(&from_file);
    }
    let merged = merged.with_defaults();
    merged.create_dirs();
    merged
  }

  /// Fills every unset value from [`Config::defaults`]. The built-in tile providers are only
  /// used when no provider is configured.
  #[must_use]
  pub fn with_defaults(self) -> Self {
    let defaults = Self::defaults();
    let use_default_tiles = self.tile_provider.is_empty();
    let mut merged = self.merge(&Self {
      tile_provider: Vec::new(),
      ..defaults.clone()
    });
    if use_default_tiles {
      merged.tile_provider = defaults.tile_provider;
    }
    merged
  }

  /// Built-in values only, without looking at the environment or the file system.
  #[must_use]
  pub fn defaults() -> Self {
    Self {
      config_path: home_dir().map(|p| p.join(".config").join("treevas")),
      data_path: Some(PathBuf::from(DEFAULT_DATA_PATH)),
      city: Some(DEFAULT_CITY.to_string()),
      columns: Some(Columns::default()),
      query_mode: Some(QueryMode::default()),
      remote_port: Some(DEFAULT_PORT),
      tile_provider: vec![
        TileProvider {
          name: "CARTO Positron".to_string(),
          url: POSITRON_TILE_URL.to_string(),
          attribution: Some("© OpenStreetMap contributors © CARTO".to_string()),
          max_zoom: Some(20),
        },
        TileProvider {
          name: "OpenStreetMap".to_string(),
          url: OSM_TILE_URL.to_string(),
          attribution: Some("© OpenStreetMap contributors".to_string()),
          max_zoom: Some(19),
        },
      ],
      tile_cache_dir: home_dir().map(|p| p.join(".treevas_tile_cache")),
      screenshot_path: None,
    }
  }

  fn from_env() -> Self {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

    let tile_provider = var("TREEVAS_TILE_URL").map_or_else(Vec::new, |url| {
      vec![TileProvider {
        name: "ENV".to_string(),
        url,
        attribution: None,
        max_zoom: None,
      }]
    });

    let query_mode = var("TREEVAS_QUERY_MODE").and_then(|v| {
      v.parse()
        .inspect_err(|e| error!("TREEVAS_QUERY_MODE: {e}"))
        .ok()
    });

    Self {
      config_path: var("TREEVAS_CONFIG").map(PathBuf::from),
      data_path: var("TREEVAS_DATA").map(PathBuf::from),
      city: var("TREEVAS_CITY"),
      columns: None,
      query_mode,
      remote_port: None,
      tile_provider,
      tile_cache_dir: var("TREEVAS_TILE_CACHE_DIR").map(PathBuf::from),
      screenshot_path: var("TREEVAS_SCREENSHOT_PATH").map(PathBuf::from),
    }
  }

  fn from_file() -> Option<Self> {
    let config_path = std::env::var("TREEVAS_CONFIG")
      .ok()
      .map(PathBuf::from)
      .or_else(|| home_dir().map(|p| p.join(".config").join("treevas")))?;
    let config_path = config_path.join("config.json");

    serde_json::from_str(&std::fs::read_to_string(&config_path).ok()?)
      .inspect_err(|e| error!("Failed to read config file: {e}"))
      .ok()
  }

  /// Fills every unset value of `self` from `other`. Tile providers are appended.
  #[must_use]
  pub fn merge(mut self, other: &Self) -> Self {
    self.config_path = self.config_path.or(other.config_path.clone());
    self.data_path = self.data_path.or(other.data_path.clone());
    self.city = self.city.or(other.city.clone());
    self.columns = self.columns.or(other.columns.clone());
    self.query_mode = self.query_mode.or(other.query_mode);
    self.remote_port = self.remote_port.or(other.remote_port);
    for tile in &other.tile_provider {
      if !self.tile_provider.iter().any(|t| t == tile) {
        self.tile_provider.push(tile.clone());
      }
    }
    self.tile_cache_dir = self.tile_cache_dir.or(other.tile_cache_dir.clone());
    self.screenshot_path = self.screenshot_path.or(other.screenshot_path.clone());
    self
  }

  fn create_dirs(&self) {
    if let Some(path) = &self.tile_cache_dir
      && !path.exists()
    {
      let _ = std::fs::create_dir_all(path).inspect_err(|e| {
        error!("Failed to create tile cache directory: {e}");
      });
    }
  }

  #[must_use]
  pub fn data_path(&self) -> PathBuf {
    self
      .data_path
      .clone()
      .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH))
  }

  #[must_use]
  pub fn city(&self) -> String {
    self.city.clone().unwrap_or_else(|| DEFAULT_CITY.to_string())
  }

  #[must_use]
  pub fn columns(&self) -> Columns {
    self.columns.clone().unwrap_or_default()
  }

  #[must_use]
  pub fn query_mode(&self) -> QueryMode {
    self.query_mode.unwrap_or_default()
  }

  #[must_use]
  pub fn remote_port(&self) -> u16 {
    self.remote_port.unwrap_or(DEFAULT_PORT)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn merge_prefers_self() {
    let first = Config {
      city: Some("Girona".to_string()),
      query_mode: Some(QueryMode::Pattern),
      ..Config::default()
    };
    let merged = first.merge(&Config::defaults());
    assert_eq!(merged.city(), "Girona");
    assert_eq!(merged.query_mode(), QueryMode::Pattern);
    assert_eq!(merged.remote_port(), DEFAULT_PORT);
    assert_eq!(merged.data_path(), PathBuf::from(DEFAULT_DATA_PATH));
    assert_eq!(merged.columns(), Columns::default());
  }

  fn provider(name: &str) -> TileProvider {
    TileProvider {
      name: name.to_string(),
      url: format!("http://localhost/{name}/{{zoom}}/{{x}}/{{y}}.png"),
      attribution: None,
      max_zoom: None,
    }
  }

  fn provider_names(config: &Config) -> Vec<&str> {
    config.tile_provider.iter().map(|t| t.name.as_str()).collect()
  }

  #[test]
  fn tile_providers_are_appended_once() {
    let env = Config {
      tile_provider: vec![provider("ENV")],
      ..Config::default()
    };
    let file = Config {
      tile_provider: vec![provider("ENV"), provider("File")],
      ..Config::default()
    };
    let merged = env.merge(&file).merge(&file);
    assert_eq!(provider_names(&merged), vec!["ENV", "File"]);
    assert_eq!(merged.tile_provider[0].get_max_zoom(), 19);
  }

  #[test]
  fn configured_tile_providers_replace_builtin_ones() {
    let file = Config {
      tile_provider: vec![provider("File")],
      ..Config::default()
    };
    let merged = Config::default().merge(&file).with_defaults();
    assert_eq!(provider_names(&merged), vec!["File"]);
    assert_eq!(merged.city(), DEFAULT_CITY);
  }

  #[test]
  fn builtin_tile_providers_without_configuration() {
    let merged = Config::default().with_defaults();
    assert_eq!(
      provider_names(&merged),
      vec!["CARTO Positron", "OpenStreetMap"]
    );
    assert_eq!(merged.remote_port(), DEFAULT_PORT);
  }

  #[test]
  fn unset_values_fall_back() {
    let config = Config::default();
    assert!(config.tile_provider.is_empty());
    assert_eq!(config.city(), DEFAULT_CITY);
    assert_eq!(config.query_mode(), QueryMode::Literal);
  }

  #[test]
  fn reads_partial_json() {
    let config: Config =
      serde_json::from_str(r#"{"city": "Valencia", "query_mode": "pattern", "remote_port": 4000}"#)
        .unwrap();
    assert_eq!(config.city(), "Valencia");
    assert_eq!(config.query_mode(), QueryMode::Pattern);
    assert_eq!(config.remote_port(), 4000);
    assert!(config.tile_provider.is_empty());
  }
}
