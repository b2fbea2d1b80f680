use std::{io::Read, path::Path, sync::Arc};

use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::{
  map::coordinates::{ProjectionError, WGS84Coordinate, WebMercator, project},
  parser::{Columns, CsvParser},
};

#[derive(Error, Debug)]
pub enum LoadError {
  #[error("Failed to read {}: {source}", path.display())]
  DataLoad {
    path: std::path::PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Required column '{column}' is missing.")]
  MissingColumn { column: String },
  #[error("Malformed input: {0}")]
  Csv(#[from] csv::Error),
  #[error("Line {line}: '{value}' in column {column} is not a number.")]
  MalformedRow {
    line: u64,
    column: &'static str,
    value: String,
  },
  #[error("Line {line}: coordinate out of range (lon {lon}, lat {lat}).")]
  InvalidCoordinate { line: u64, lon: f64, lat: f64 },
}

/// One row of the input with only the columns the dashboard needs, numbers still unparsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
  /// Line in the source file, used for diagnostics.
  pub line: u64,
  pub address: String,
  pub scientific_name: String,
  pub longitude: String,
  pub latitude: String,
}

/// A tree with its location in both reference systems.
///
/// The projected coordinates are only ever computed by [`build_store`] from the geographic ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeRecord {
  address: String,
  scientific_name: String,
  longitude: f64,
  latitude: f64,
  projected_x: f64,
  projected_y: f64,
}

impl TreeRecord {
  #[must_use]
  pub fn address(&self) -> &str {
    &self.address
  }

  #[must_use]
  pub fn scientific_name(&self) -> &str {
    &self.scientific_name
  }

  #[must_use]
  pub fn longitude(&self) -> f64 {
    self.longitude
  }

  #[must_use]
  pub fn latitude(&self) -> f64 {
    self.latitude
  }

  #[must_use]
  pub fn projected_x(&self) -> f64 {
    self.projected_x
  }

  #[must_use]
  pub fn projected_y(&self) -> f64 {
    self.projected_y
  }

  #[must_use]
  pub fn location(&self) -> WGS84Coordinate {
    WGS84Coordinate::new(self.longitude, self.latitude)
  }

  #[must_use]
  pub fn projected(&self) -> WebMercator {
    WebMercator::new(self.projected_x, self.projected_y)
  }
}

/// All trees of the input, in file order. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
  records: Vec<TreeRecord>,
}

impl RecordStore {
  /// Reads and projects the input file.
  ///
  /// # Errors
  /// Any unreadable file, missing column or bad row fails the whole load.
  pub fn load(path: &Path, columns: &Columns) -> Result<Self, LoadError> {
    let start = std::time::Instant::now();
    let rows = CsvParser::new(columns.clone()).parse_file(path)?;
    let store = build_store(rows)?;
    info!(
      "Loaded {} tree records from {} in {:?}",
      store.len(),
      path.display(),
      start.elapsed()
    );
    Ok(store)
  }

  /// Same as `load` for input that is already open.
  ///
  /// # Errors
  /// See [`RecordStore::load`].
  pub fn from_reader<R: Read>(reader: R, columns: &Columns) -> Result<Self, LoadError> {
    build_store(CsvParser::new(columns.clone()).parse(reader)?)
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.records.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  #[must_use]
  pub fn get(&self, index: usize) -> Option<&TreeRecord> {
    self.records.get(index)
  }

  #[must_use]
  pub fn records(&self) -> &[TreeRecord] {
    &self.records
  }

  pub fn iter(&self) -> impl Iterator<Item = &TreeRecord> {
    self.records.iter()
  }
}

fn parse_number(line: u64, column: &'static str, value: &str) -> Result<f64, LoadError> {
  value
    .trim()
    .parse::<f64>()
    .map_err(|_| LoadError::MalformedRow {
      line,
      column,
      value: value.to_string(),
    })
}

/// Builds the store from raw rows, projecting all coordinates in one batch.
///
/// # Errors
/// `MalformedRow` for a coordinate that is not a number, `InvalidCoordinate` for one that is out
/// of range. No row is skipped.
pub fn build_store(rows: Vec<RawRow>) -> Result<RecordStore, LoadError> {
  let coordinates = rows
    .iter()
    .map(|row| {
      Ok(WGS84Coordinate::new(
        parse_number(row.line, "longitude", &row.longitude)?,
        parse_number(row.line, "latitude", &row.latitude)?,
      ))
    })
    .collect::<Result<Vec<_>, LoadError>>()?;

  let projected = project(&coordinates).map_err(|e| match e {
    ProjectionError::InvalidCoordinate { index, lon, lat } => LoadError::InvalidCoordinate {
      line: rows[index].line,
      lon,
      lat,
    },
  })?;

  let records = rows
    .into_iter()
    .zip(coordinates)
    .zip(projected)
    .map(|((row, coord), xy)| TreeRecord {
      address: row.address,
      scientific_name: row.scientific_name,
      longitude: coord.lon,
      latitude: coord.lat,
      projected_x: xy.x,
      projected_y: xy.y,
    })
    .collect();

  Ok(RecordStore { records })
}

/// The trees currently shown: a selection of store rows in store order.
#[derive(Debug, Clone)]
pub struct DisplaySubset {
  store: Arc<RecordStore>,
  rows: Arc<[usize]>,
}

impl DisplaySubset {
  /// Every row of the store.
  #[must_use]
  pub fn all(store: Arc<RecordStore>) -> Self {
    let rows = (0..store.len()).collect();
    Self { store, rows }
  }

  #[must_use]
  pub fn empty(store: Arc<RecordStore>) -> Self {
    Self {
      store,
      rows: Arc::new([]),
    }
  }

  /// Expects ascending indices into `store`.
  pub(crate) fn from_rows(store: Arc<RecordStore>, rows: Vec<usize>) -> Self {
    debug_assert!(rows.windows(2).all(|w| w[0] < w[1]));
    debug_assert!(rows.last().is_none_or(|&last| last < store.len()));
    Self {
      store,
      rows: rows.into(),
    }
  }

  /// The number of shown trees.
  #[must_use]
  pub fn count(&self) -> usize {
    self.rows.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// Indices into the store.
  #[must_use]
  pub fn rows(&self) -> &[usize] {
    &self.rows
  }

  #[must_use]
  pub fn store(&self) -> &Arc<RecordStore> {
    &self.store
  }

  pub fn iter(&self) -> impl Iterator<Item = &TreeRecord> + '_ {
    self.rows.iter().filter_map(|&i| self.store.get(i))
  }

  /// True if every shown row of `self` is also shown by `other`.
  #[must_use]
  pub fn is_subset_of(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.store, &other.store)
      && self
        .rows
        .iter()
        .all(|row| other.rows.binary_search(row).is_ok())
  }
}

impl PartialEq for DisplaySubset {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.store, &other.store) && self.rows == other.rows
  }
}
