use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
  filter::{FilterError, QueryMode, filter},
  render_source::{RenderSource, SubscriptionId},
  store::{DisplaySubset, RecordStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardState {
  /// Created, nothing published yet. Query events are ignored.
  Initializing,
  /// The full store has been published and queries are applied.
  Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSettings {
  pub city: String,
  pub query_mode: QueryMode,
}

impl Default for DashboardSettings {
  fn default() -> Self {
    Self {
      city: "Barcelona".to_string(),
      query_mode: QueryMode::default(),
    }
  }
}

/// A snapshot of what the dashboard shows, reported by the remote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStatus {
  pub title: String,
  pub query: Option<String>,
  pub count: usize,
}

/// Owns the record store, the render source and the title and applies query changes to them.
pub struct Dashboard {
  store: Arc<RecordStore>,
  source: RenderSource,
  settings: DashboardSettings,
  state: DashboardState,
  title: String,
  query: Option<String>,
  /// The latest query handed to `query_changed`, accepted or not.
  requested: Option<String>,
  last_error: Option<FilterError>,
}

impl Dashboard {
  #[must_use]
  pub fn new(store: Arc<RecordStore>, settings: DashboardSettings) -> Self {
    let source = RenderSource::new(DisplaySubset::empty(store.clone()));
    Self {
      store,
      source,
      settings,
      state: DashboardState::Initializing,
      title: String::new(),
      query: None,
      requested: None,
      last_error: None,
    }
  }

  /// Publishes every tree and sets the initial title. Calling it again has no effect.
  pub fn start(&mut self) {
    if self.state == DashboardState::Ready {
      debug!("Dashboard already started.");
      return;
    }
    self
      .source
      .replace_contents(DisplaySubset::all(self.store.clone()));
    self.title = format!("Tree localization in {}", self.settings.city);
    self.state = DashboardState::Ready;
    info!(
      "Dashboard ready with {} trees in {}",
      self.store.len(),
      self.settings.city
    );
  }

  /// Applies `query` and returns the number of matching trees.
  ///
  /// # Errors
  /// If the query cannot be evaluated. Contents and title are unchanged in that case.
  pub fn try_query(&mut self, query: &str) -> Result<usize, FilterError> {
    let subset = filter(&self.store, query, self.settings.query_mode)?;
    let count = subset.count();
    self.source.replace_contents(subset);
    self.title = format!("There are {count} {query} in {}.", self.settings.city);
    self.query = Some(query.to_string());
    info!("Query '{query}' matches {count} trees.");
    Ok(count)
  }

  /// Handles a change of the search input. Returns whether the dashboard changed.
  pub fn query_changed(&mut self, query: &str) -> bool {
    if self.state == DashboardState::Initializing {
      warn!("Ignoring query '{query}' before the dashboard is ready.");
      return false;
    }
    self.requested = Some(query.to_string());
    let result = self.try_query(query).inspect_err(|e| error!("{e}"));
    self.last_error = result.err();
    self.last_error.is_none()
  }

  /// Switches how queries are matched and re-applies the latest requested query, including one
  /// the previous mode rejected.
  pub fn set_query_mode(&mut self, mode: QueryMode) {
    if self.settings.query_mode == mode {
      return;
    }
    self.settings.query_mode = mode;
    if let Some(query) = self.requested.clone() {
      self.query_changed(&query);
    }
  }

  pub fn subscribe(&mut self, subscriber: impl FnMut(&DisplaySubset) + 'static) -> SubscriptionId {
    self.source.subscribe(subscriber)
  }

  pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
    self.source.unsubscribe(id)
  }

  #[must_use]
  pub fn state(&self) -> DashboardState {
    self.state
  }

  #[must_use]
  pub fn title(&self) -> &str {
    &self.title
  }

  /// The last query that was applied.
  #[must_use]
  pub fn query(&self) -> Option<&str> {
    self.query.as_deref()
  }

  /// Why the latest query was rejected, if it was.
  #[must_use]
  pub fn last_error(&self) -> Option<&FilterError> {
    self.last_error.as_ref()
  }

  #[must_use]
  pub fn query_mode(&self) -> QueryMode {
    self.settings.query_mode
  }

  #[must_use]
  pub fn city(&self) -> &str {
    &self.settings.city
  }

  #[must_use]
  pub fn store(&self) -> &Arc<RecordStore> {
    &self.store
  }

  #[must_use]
  pub fn displayed(&self) -> &DisplaySubset {
    self.source.contents()
  }

  #[must_use]
  pub fn render_version(&self) -> u64 {
    self.source.version()
  }

  #[must_use]
  pub fn document_title(&self) -> String {
    format!("{} tree dashboard", self.settings.city)
  }

  #[must_use]
  pub fn status(&self) -> DashboardStatus {
    DashboardStatus {
      title: self.title.clone(),
      query: self.query.clone(),
      count: self.displayed().count(),
    }
  }
}

impl std::fmt::Debug for Dashboard {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Dashboard")
      .field("state", &self.state)
      .field("title", &self.title)
      .field("query", &self.query)
      .field("requested", &self.requested)
      .field("last_error", &self.last_error)
      .field("source", &self.source)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use super::*;
  use crate::store::{RawRow, build_store};

  fn store() -> Arc<RecordStore> {
    store_of(&[
      ("Carrer X", "Platanus hispanica"),
      ("Carrer Y", "Tilia cordata"),
      ("Carrer Z", "Tilia cordata"),
    ])
  }

  fn store_of(trees: &[(&str, &str)]) -> Arc<RecordStore> {
    let rows = trees
      .iter()
      .zip(2..)
      .map(|((address, name), line)| RawRow {
        line,
        address: (*address).to_string(),
        scientific_name: (*name).to_string(),
        longitude: "2.17".to_string(),
        latitude: "41.38".to_string(),
      })
      .collect();
    Arc::new(build_store(rows).unwrap())
  }

  fn ready() -> Dashboard {
    let mut dashboard = Dashboard::new(store(), DashboardSettings::default());
    dashboard.start();
    dashboard
  }

  #[test]
  fn starts_initializing() {
    let dashboard = Dashboard::new(store(), DashboardSettings::default());
    assert_eq!(dashboard.state(), DashboardState::Initializing);
    assert!(dashboard.displayed().is_empty());
    assert_eq!(dashboard.render_version(), 0);
  }

  #[test]
  fn start_publishes_everything() {
    let dashboard = ready();
    assert_eq!(dashboard.state(), DashboardState::Ready);
    assert_eq!(dashboard.title(), "Tree localization in Barcelona");
    assert_eq!(dashboard.displayed().count(), 3);
    assert_eq!(dashboard.query(), None);
    assert_eq!(dashboard.document_title(), "Barcelona tree dashboard");
  }

  #[test]
  fn query_before_ready_is_ignored() {
    let mut dashboard = Dashboard::new(store(), DashboardSettings::default());
    assert!(!dashboard.query_changed("Tilia"));
    assert_eq!(dashboard.state(), DashboardState::Initializing);
    assert_eq!(dashboard.title(), "");
    assert_eq!(dashboard.render_version(), 0);
  }

  #[test]
  fn query_updates_title_and_contents() {
    let mut dashboard = ready();
    assert!(dashboard.query_changed("Tilia"));
    assert_eq!(dashboard.title(), "There are 2 Tilia in Barcelona.");
    assert_eq!(dashboard.displayed().rows(), &[1, 2]);
    assert_eq!(dashboard.query(), Some("Tilia"));
    assert_eq!(
      dashboard.status(),
      DashboardStatus {
        title: "There are 2 Tilia in Barcelona.".to_string(),
        query: Some("Tilia".to_string()),
        count: 2,
      }
    );
  }

  #[test]
  fn no_match_shows_zero() {
    let mut dashboard = ready();
    assert!(dashboard.query_changed("Quercus"));
    assert_eq!(dashboard.title(), "There are 0 Quercus in Barcelona.");
    assert!(dashboard.displayed().is_empty());
  }

  #[test]
  fn invalid_pattern_keeps_previous_state() {
    let mut dashboard = Dashboard::new(
      store(),
      DashboardSettings {
        city: "Girona".to_string(),
        query_mode: QueryMode::Pattern,
      },
    );
    dashboard.start();
    assert!(dashboard.query_changed("^Tilia"));
    let version = dashboard.render_version();

    assert!(!dashboard.query_changed("Tilia ("));
    assert!(dashboard.last_error().is_some());
    assert!(dashboard.try_query("Tilia (").is_err());
    assert_eq!(dashboard.title(), "There are 2 ^Tilia in Girona.");
    assert_eq!(dashboard.displayed().count(), 2);
    assert_eq!(dashboard.query(), Some("^Tilia"));
    assert_eq!(dashboard.render_version(), version);

    assert!(dashboard.query_changed("Tilia"));
    assert!(dashboard.last_error().is_none());
  }

  #[test]
  fn subscribers_follow_queries() {
    let mut dashboard = Dashboard::new(store(), DashboardSettings::default());
    let counts = Rc::new(RefCell::new(Vec::new()));
    let sink = counts.clone();
    dashboard.subscribe(move |subset| sink.borrow_mut().push(subset.count()));

    dashboard.start();
    dashboard.query_changed("Plat");
    dashboard.query_changed("");
    assert_eq!(*counts.borrow(), vec![3, 1, 3]);
  }

  #[test]
  fn switching_mode_reapplies_query() {
    let mut dashboard = ready();
    dashboard.query_changed("T.lia");
    assert_eq!(dashboard.displayed().count(), 0);
    dashboard.set_query_mode(QueryMode::Pattern);
    assert_eq!(dashboard.displayed().count(), 2);
    assert_eq!(dashboard.title(), "There are 2 T.lia in Barcelona.");
  }

  #[test]
  fn mode_switch_retries_rejected_query() {
    let mut dashboard = Dashboard::new(
      store_of(&[("Carrer X", "Tilia (cv.)"), ("Carrer Y", "Tilia cordata")]),
      DashboardSettings {
        city: "Barcelona".to_string(),
        query_mode: QueryMode::Pattern,
      },
    );
    dashboard.start();
    assert!(dashboard.query_changed("^Tilia"));
    assert!(!dashboard.query_changed("Tilia ("));
    assert_eq!(dashboard.title(), "There are 2 ^Tilia in Barcelona.");

    dashboard.set_query_mode(QueryMode::Literal);
    assert_eq!(dashboard.title(), "There are 1 Tilia ( in Barcelona.");
    assert_eq!(dashboard.displayed().rows(), &[0]);
    assert_eq!(dashboard.query(), Some("Tilia ("));
    assert!(dashboard.last_error().is_none());
  }

  #[test]
  fn mode_switch_applies_query_that_was_never_accepted() {
    let mut dashboard = Dashboard::new(
      store_of(&[("Carrer X", "Tilia (cv.)"), ("Carrer Y", "Tilia cordata")]),
      DashboardSettings {
        city: "Barcelona".to_string(),
        query_mode: QueryMode::Pattern,
      },
    );
    dashboard.start();
    assert!(!dashboard.query_changed("Tilia ("));
    assert_eq!(dashboard.query(), None);

    dashboard.set_query_mode(QueryMode::Literal);
    assert_eq!(dashboard.title(), "There are 1 Tilia ( in Barcelona.");
  }

  #[test]
  fn start_twice_does_not_republish() {
    let mut dashboard = ready();
    dashboard.query_changed("Plat");
    dashboard.start();
    assert_eq!(dashboard.displayed().count(), 1);
    assert_eq!(dashboard.render_version(), 2);
  }
}
