use egui::ColorImage;
use thiserror::Error;

use super::coordinates::Tile;

#[derive(Error, Debug)]
pub enum TileRenderError {
  #[error("Failed to decode tile {tile:?}: {reason}")]
  ImageDecode { tile: Tile, reason: String },
}

/// Decodes png or jpeg tile data into an image that can be uploaded as a texture.
///
/// # Errors
/// If the data is not an image in a supported format.
pub fn decode_raster(tile: &Tile, data: &[u8]) -> Result<ColorImage, TileRenderError> {
  let start = std::time::Instant::now();
  let decode_error = |reason: String| TileRenderError::ImageDecode {
    tile: *tile,
    reason,
  };

  let img = image::ImageReader::new(std::io::Cursor::new(data))
    .with_guessed_format()
    .map_err(|e| decode_error(e.to_string()))?
    .decode()
    .map_err(|e| decode_error(e.to_string()))?;

  let size = [img.width() as usize, img.height() as usize];
  let rgba = img.to_rgba8();
  log::debug!("Tile {tile:?} decoded in {:?}", start.elapsed());

  Ok(ColorImage::from_rgba_unmultiplied(
    size,
    rgba.as_flat_samples().as_slice(),
  ))
}
