use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Requests to the map widget that do not come from its own input handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapEvent {
  /// Fit the view to the shown trees.
  Reset,
  /// Save the current view as png. Relative paths are resolved against the screenshot directory.
  Screenshot(PathBuf),
}
