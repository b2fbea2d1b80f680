use std::{fs::File, io::Read, path::Path};

use csv::{ReaderBuilder, StringRecord};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::store::{LoadError, RawRow};

/// Header names of the required columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Columns {
  pub longitude: String,
  pub latitude: String,
  pub address: String,
  pub scientific_name: String,
}

impl Default for Columns {
  /// The column names of the Barcelona street tree dataset.
  fn default() -> Self {
    Self {
      longitude: "LONGITUD_WGS84".to_string(),
      latitude: "LATITUD_WGS84".to_string(),
      address: "ADRECA".to_string(),
      scientific_name: "NOM_CIENTIFIC".to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndices {
  longitude: usize,
  latitude: usize,
  address: usize,
  scientific_name: usize,
}

/// Extracts the required columns of a csv file with header row. All other columns are dropped.
#[derive(Debug, Clone)]
pub struct CsvParser {
  columns: Columns,
}

impl CsvParser {
  #[must_use]
  pub fn new(columns: Columns) -> Self {
    Self { columns }
  }

  /// # Errors
  /// `DataLoad` if the file cannot be opened, otherwise see [`CsvParser::parse`].
  pub fn parse_file(&self, path: &Path) -> Result<Vec<RawRow>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::DataLoad {
      path: path.to_path_buf(),
      source,
    })?;
    self.parse(file)
  }

  /// # Errors
  /// `MissingColumn` if a required header is absent, `Csv` for structurally broken input or text
  /// that is not valid UTF-8.
  pub fn parse<R: Read>(&self, reader: R) -> Result<Vec<RawRow>, LoadError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let indices = self.column_indices(rdr.headers()?)?;
    debug!("Column indices: {indices:?}");

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while rdr.read_record(&mut record)? {
      let field = |i: usize| record.get(i).unwrap_or_default().to_string();
      rows.push(RawRow {
        line: record.position().map_or(0, csv::Position::line),
        address: field(indices.address),
        scientific_name: field(indices.scientific_name),
        longitude: field(indices.longitude),
        latitude: field(indices.latitude),
      });
    }
    Ok(rows)
  }

  fn column_indices(&self, headers: &StringRecord) -> Result<ColumnIndices, LoadError> {
    let find = |name: &str| {
      headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| LoadError::MissingColumn {
          column: name.to_string(),
        })
    };
    Ok(ColumnIndices {
      longitude: find(&self.columns.longitude)?,
      latitude: find(&self.columns.latitude)?,
      address: find(&self.columns.address)?,
      scientific_name: find(&self.columns.scientific_name)?,
    })
  }
}
