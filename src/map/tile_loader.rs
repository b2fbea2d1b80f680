use std::{
  collections::HashSet,
  fmt::Display,
  fs::{self, File},
  hash::{DefaultHasher, Hash, Hasher},
  io::Write,
  path::PathBuf,
  sync::{Arc, Mutex},
  time::Duration,
};

use anyhow::Result;
use log::{debug, error, trace};
use regex::Regex;
use surf::{Config, Request, Url, http::Method};
use surf_governor::GovernorMiddleware;
use thiserror::Error;

use crate::{config::TileProvider, map::coordinates::Tile};

#[derive(Error, Debug)]
pub enum TileLoaderError {
  #[error("Tile {tile:?} not available.")]
  TileNotAvailable { tile: Tile },
  #[error("Download of {tile:?} already in progress.")]
  DownloadInProgress { tile: Tile },
  #[error("Invalid tile url {url}: {reason}")]
  InvalidUrl { url: String, reason: String },
  #[error("Failed to set up the http client: {0}")]
  Client(String),
}

/// The png data of a tile.
pub type TileData = Vec<u8>;

/// Determines if a tile should be downloaded or loaded from the cache.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum TileSource {
  All,
  Download,
  Cache,
}

impl Display for TileSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      TileSource::All => write!(f, "all"),
      TileSource::Download => write!(f, "download"),
      TileSource::Cache => write!(f, "cache"),
    }
  }
}

pub trait TileLoader {
  async fn tile_data(&self, tile: &Tile, source: TileSource) -> Result<TileData>;
}

#[derive(Debug, Clone)]
struct TileCache {
  base_path: Option<PathBuf>,
}

impl TileCache {
  fn path(&self, tile: &Tile) -> Option<PathBuf> {
    self
      .base_path
      .as_ref()
      .map(|b| b.join(format!("{}_{}_{}.png", tile.zoom, tile.x, tile.y)))
  }

  fn cache_tile(&self, tile: &Tile, data: &[u8]) {
    let Some(path) = self.path(tile) else { return };
    let _ = File::create(path)
      .and_then(|mut f| f.write_all(data))
      .inspect_err(|e| debug!("Error when writing tile {tile:?} to cache: {e}"));
  }
}

impl TileLoader for TileCache {
  async fn tile_data(&self, tile: &Tile, tile_source: TileSource) -> Result<TileData> {
    if tile_source == TileSource::Download {
      return Err(TileLoaderError::TileNotAvailable { tile: *tile }.into());
    }
    match self.path(tile) {
      Some(p) if p.exists() => Ok(fs::read(p)?),
      _ => Err(TileLoaderError::TileNotAvailable { tile: *tile }.into()),
    }
  }
}

#[derive(Debug)]
struct TileDownloader {
  url_template: String,
  tiles_in_download: Arc<Mutex<HashSet<Tile>>>,
  client: surf::Client,
}

impl TileDownloader {
  fn from_url(url: &str) -> Result<Self, TileLoaderError> {
    let client: surf::Client = Config::new()
      .set_timeout(Some(Duration::from_secs(5)))
      .try_into()
      .map_err(|e| TileLoaderError::Client(format!("{e:?}")))?;
    let governor =
      GovernorMiddleware::per_second(10).map_err(|e| TileLoaderError::Client(format!("{e:?}")))?;
    Ok(Self {
      url_template: url.to_string(),
      tiles_in_download: Arc::default(),
      client: client.with(governor),
    })
  }

  fn url_for_tile(&self, tile: &Tile) -> String {
    self
      .url_template
      .replace("{x}", &tile.x.to_string())
      .replace("{y}", &tile.y.to_string())
      .replace("{zoom}", &tile.zoom.to_string())
  }

  fn in_download(&self) -> std::sync::MutexGuard<'_, HashSet<Tile>> {
    self
      .tiles_in_download
      .lock()
      .unwrap_or_else(std::sync::PoisonError::into_inner)
  }

  async fn fetch(&self, tile: &Tile) -> Result<TileData, TileLoaderError> {
    let url = self.url_for_tile(tile);
    let url = Url::parse(&url).map_err(|e| TileLoaderError::InvalidUrl {
      url: url.clone(),
      reason: e.to_string(),
    })?;
    let mut response = self
      .client
      .send(Request::new(Method::Get, url))
      .await
      .inspect_err(|e| error!("Error when downloading tile: {e}"))
      .map_err(|_| TileLoaderError::TileNotAvailable { tile: *tile })?;
    if response.status() != 200 {
      error!(
        "Error when downloading tile {tile:?}: {}, {:?}",
        response.status(),
        response.body_string().await
      );
      return Err(TileLoaderError::TileNotAvailable { tile: *tile });
    }
    response
      .body_bytes()
      .await
      .map_err(|_| TileLoaderError::TileNotAvailable { tile: *tile })
  }
}

impl TileLoader for TileDownloader {
  async fn tile_data(&self, tile: &Tile, tile_source: TileSource) -> Result<TileData> {
    if tile_source == TileSource::Cache {
      return Err(TileLoaderError::TileNotAvailable { tile: *tile }.into());
    }
    if !self.in_download().insert(*tile) {
      return Err(TileLoaderError::DownloadInProgress { tile: *tile }.into());
    }

    let result = self.fetch(tile).await;
    debug!("Downloaded {tile:?}: {}", result.is_ok());
    self.in_download().remove(tile);

    Ok(result?)
  }
}

/// Downloads the tiles of one provider and keeps them in a disk cache.
#[derive(Debug)]
pub struct CachedTileLoader {
  name: String,
  attribution: Option<String>,
  max_zoom: u8,
  tile_cache: TileCache,
  tile_loader: TileDownloader,
}

impl CachedTileLoader {
  #[must_use]
  pub fn name(&self) -> &str {
    &self.name
  }

  #[must_use]
  pub fn attribution(&self) -> Option<&str> {
    self.attribution.as_deref()
  }

  #[must_use]
  pub fn max_zoom(&self) -> u8 {
    self.max_zoom
  }

  /// One loader per configured provider. Providers that cannot be set up are skipped.
  pub fn from_config(config: &crate::config::Config) -> impl Iterator<Item = Self> {
    config.tile_provider.iter().filter_map(|provider| {
      Self::from_provider(provider, config.tile_cache_dir.clone())
        .inspect_err(|e| error!("Tile provider {}: {e}", provider.name))
        .ok()
    })
  }

  /// # Errors
  /// If the http client cannot be created.
  pub fn from_provider(
    provider: &TileProvider,
    cache: Option<PathBuf>,
  ) -> Result<Self, TileLoaderError> {
    let tile_loader = TileDownloader::from_url(&provider.url)?;
    let cache_path = cache.map(|p| p.join(cache_key(&provider.url)));
    Self::create_cache(cache_path.as_ref());

    Ok(CachedTileLoader {
      name: provider.name.clone(),
      attribution: provider.attribution.clone(),
      max_zoom: provider.get_max_zoom(),
      tile_cache: TileCache {
        base_path: cache_path,
      },
      tile_loader,
    })
  }

  fn create_cache(cache_path: Option<&PathBuf>) {
    let Some(cache_path) = cache_path else { return };
    if cache_path.exists() {
      return;
    }
    let _ = fs::create_dir_all(cache_path).inspect_err(|e| {
      error!("Failed to create cache directory: {e}");
    });
  }

  async fn download(&self, tile: &Tile, tile_source: TileSource) -> Result<TileData> {
    let data = self.tile_loader.tile_data(tile, tile_source).await?;
    // Servers answer missing tiles with tiny placeholder bodies.
    if data.len() <= 100 {
      return Err(TileLoaderError::TileNotAvailable { tile: *tile }.into());
    }
    self.tile_cache.cache_tile(tile, &data);
    Ok(data)
  }
}

impl TileLoader for CachedTileLoader {
  async fn tile_data(&self, tile: &Tile, tile_source: TileSource) -> Result<TileData> {
    trace!("Loading tile {tile:?}");
    if let Ok(data) = self.tile_cache.tile_data(tile, tile_source).await {
      debug!("cache_hit: {tile:?}");
      Ok(data)
    } else {
      debug!("cache_miss: {tile:?}");
      self.download(tile, tile_source).await
    }
  }
}

/// Directory name of a provider's cache. Api keys in the url do not change the key.
fn cache_key(url: &str) -> String {
  let mut hasher = DefaultHasher::new();
  match Regex::new("[Kk]ey=([A-Za-z0-9-_]*)") {
    Ok(key_re) => key_re.replace(url, "*").hash(&mut hasher),
    Err(_) => url.hash(&mut hasher),
  }
  hasher.finish().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn provider(url: &str) -> TileProvider {
    TileProvider {
      name: "Test".to_string(),
      url: url.to_string(),
      attribution: Some("test".to_string()),
      max_zoom: Some(12),
    }
  }

  #[test]
  fn url_template() {
    let downloader = TileDownloader::from_url("https://tiles.test/{zoom}/{x}/{y}.png").unwrap();
    let tile = Tile {
      x: 1035,
      y: 764,
      zoom: 11,
    };
    assert_eq!(
      downloader.url_for_tile(&tile),
      "https://tiles.test/11/1035/764.png"
    );
  }

  #[test]
  fn cache_key_ignores_api_key() {
    assert_eq!(
      cache_key("https://t.test/{zoom}/{x}/{y}.png?apikey=abc"),
      cache_key("https://t.test/{zoom}/{x}/{y}.png?apikey=xyz")
    );
    assert_ne!(
      cache_key("https://a.test/{zoom}/{x}/{y}.png"),
      cache_key("https://b.test/{zoom}/{x}/{y}.png")
    );
  }

  #[tokio::test]
  async fn reads_cached_tiles_without_download() {
    let dir = std::env::temp_dir().join(format!("treevas_tile_cache_{}", std::process::id()));
    let loader = CachedTileLoader::from_provider(
      &provider("http://127.0.0.1:9/{zoom}/{x}/{y}.png"),
      Some(dir.clone()),
    )
    .unwrap();
    assert_eq!(loader.max_zoom(), 12);
    assert_eq!(loader.attribution(), Some("test"));

    let tile = Tile { x: 1, y: 2, zoom: 3 };
    let data = vec![7u8; 200];
    loader.tile_cache.cache_tile(&tile, &data);

    assert_eq!(loader.tile_data(&tile, TileSource::Cache).await.unwrap(), data);
    assert!(
      loader
        .tile_data(&Tile { x: 0, y: 0, zoom: 3 }, TileSource::Cache)
        .await
        .is_err()
    );
    let _ = fs::remove_dir_all(dir);
  }
}
