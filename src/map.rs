/// Geographic, projected, canvas and screen coordinates.
pub mod coordinates;
/// Requests to the map from outside the widget.
pub mod map_event;
/// The map widget.
pub mod map_widget;
/// Map tile download and caching.
mod tile_loader;
/// Decoding of tile images.
mod tile_renderer;
