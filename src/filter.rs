use std::{str::FromStr, sync::Arc};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{DisplaySubset, RecordStore};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
  #[error("Invalid search pattern '{query}': {reason}")]
  InvalidPattern { query: String, reason: String },
}

/// How a query is matched against the scientific name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
  /// Case-sensitive plain substring.
  #[default]
  Literal,
  /// The query is a regular expression searched anywhere in the name.
  Pattern,
}

impl QueryMode {
  #[must_use]
  pub fn name(&self) -> &'static str {
    match self {
      QueryMode::Literal => "literal",
      QueryMode::Pattern => "pattern",
    }
  }

  #[must_use]
  pub fn all() -> &'static [QueryMode] {
    &[QueryMode::Literal, QueryMode::Pattern]
  }
}

impl FromStr for QueryMode {
  type Err = String;

  fn from_str(input: &str) -> Result<Self, Self::Err> {
    match input.to_lowercase().as_str() {
      "literal" => Ok(QueryMode::Literal),
      "pattern" | "regex" => Ok(QueryMode::Pattern),
      other => Err(format!("Unknown query mode: {other}")),
    }
  }
}

enum Matcher<'q> {
  Everything,
  Literal(&'q str),
  Pattern(Regex),
}

impl<'q> Matcher<'q> {
  fn new(query: &'q str, mode: QueryMode) -> Result<Self, FilterError> {
    if query.is_empty() {
      return Ok(Self::Everything);
    }
    match mode {
      QueryMode::Literal => Ok(Self::Literal(query)),
      QueryMode::Pattern => Regex::new(query)
        .map(Self::Pattern)
        .map_err(|e| FilterError::InvalidPattern {
          query: query.to_string(),
          reason: e.to_string(),
        }),
    }
  }

  fn matches(&self, name: &str) -> bool {
    match self {
      Self::Everything => true,
      Self::Literal(query) => name.contains(query),
      Self::Pattern(re) => re.is_match(name),
    }
  }
}

/// Selects the trees whose scientific name contains `query`, keeping store order.
/// An empty query selects every tree.
///
/// # Errors
/// Only in `QueryMode::Pattern`, if the query is not a valid regular expression.
pub fn filter(
  store: &Arc<RecordStore>,
  query: &str,
  mode: QueryMode,
) -> Result<DisplaySubset, FilterError> {
  let matcher = Matcher::new(query, mode)?;
  let rows = store
    .iter()
    .enumerate()
    .filter(|(_, record)| matcher.matches(record.scientific_name()))
    .map(|(i, _)| i)
    .collect();
  Ok(DisplaySubset::from_rows(store.clone(), rows))
}
