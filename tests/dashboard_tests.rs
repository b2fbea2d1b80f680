use std::sync::Arc;

use assert_approx_eq::assert_approx_eq;
use rstest::rstest;
use treevas::{
  dashboard::{Dashboard, DashboardSettings},
  filter::{FilterError, QueryMode, filter},
  map::coordinates::{WGS84Coordinate, project},
  parser::Columns,
  store::{LoadError, RecordStore},
};

const HEADER: &str = "ADRECA,NOM_CIENTIFIC,LONGITUD_WGS84,LATITUD_WGS84\n";

fn store_from(rows: &str) -> Arc<RecordStore> {
  let text = format!("{HEADER}{rows}");
  Arc::new(RecordStore::from_reader(text.as_bytes(), &Columns::default()).unwrap())
}

fn two_trees() -> Arc<RecordStore> {
  store_from(
    "Carrer X,Platanus hispanica,2.1734,41.3851\n\
     Carrer Y,Tilia cordata,2.1700,41.3900\n",
  )
}

fn dashboard(store: Arc<RecordStore>) -> Dashboard {
  let mut dashboard = Dashboard::new(store, DashboardSettings::default());
  dashboard.start();
  dashboard
}

#[test]
fn query_matches_one_tree() {
  let mut dashboard = dashboard(two_trees());
  assert!(dashboard.query_changed("Plat"));

  assert_eq!(dashboard.displayed().rows(), &[0]);
  assert_eq!(dashboard.displayed().count(), 1);
  assert_eq!(dashboard.title(), "There are 1 Plat in Barcelona.");
  let tree = dashboard.displayed().iter().next().unwrap();
  assert_eq!(tree.address(), "Carrer X");
}

#[test]
fn empty_query_shows_everything() {
  let mut dashboard = dashboard(two_trees());
  dashboard.query_changed("Plat");
  assert!(dashboard.query_changed(""));

  assert_eq!(dashboard.displayed().rows(), &[0, 1]);
  assert_eq!(dashboard.title(), "There are 2  in Barcelona.");
}

#[test]
fn projection_of_barcelona() {
  let projected = project(&[WGS84Coordinate::new(2.1734, 41.3851)]).unwrap();
  assert_approx_eq!(projected[0].x, 241_941.78, 1.0);
  assert_approx_eq!(projected[0].y, 5_069_310.85, 1.0);

  let store = two_trees();
  let tree = store.get(0).unwrap();
  assert_approx_eq!(tree.projected_x(), projected[0].x, 1e-6);
  assert_approx_eq!(tree.projected_y(), projected[0].y, 1e-6);
}

#[test]
fn duplicates_keep_their_order() {
  let store = store_from(
    "Carrer A,Tilia cordata,2.17,41.38\n\
     Carrer B,Platanus hispanica,2.17,41.38\n\
     Carrer C,Tilia cordata,2.17,41.38\n\
     Carrer D,Celtis australis,2.17,41.38\n\
     Carrer E,Tilia tomentosa,2.17,41.38\n",
  );
  let subset = filter(&store, "Tilia", QueryMode::Literal).unwrap();
  assert_eq!(subset.rows(), &[0, 2, 4]);
  let addresses: Vec<_> = subset.iter().map(|t| t.address()).collect();
  assert_eq!(addresses, ["Carrer A", "Carrer C", "Carrer E"]);
}

#[rstest]
#[case("Tilia", 3)]
#[case("Tilia cordata", 2)]
#[case("tilia", 0)]
#[case("", 5)]
#[case("Quercus", 0)]
fn narrower_queries_match_less(#[case] query: &str, #[case] expected: usize) {
  let store = store_from(
    "A,Tilia cordata,2.17,41.38\n\
     B,Platanus hispanica,2.17,41.38\n\
     C,Tilia cordata,2.17,41.38\n\
     D,Celtis australis,2.17,41.38\n\
     E,Tilia tomentosa,2.17,41.38\n",
  );
  let subset = filter(&store, query, QueryMode::Literal).unwrap();
  assert_eq!(subset.count(), expected);
  assert!(subset.is_subset_of(&filter(&store, "", QueryMode::Literal).unwrap()));
}

#[test]
fn malformed_longitude_aborts_the_load() {
  let text = format!("{HEADER}Carrer X,Platanus hispanica,2.17,41.38\nCarrer Y,Tilia cordata,east,41.39\n");
  let result = RecordStore::from_reader(text.as_bytes(), &Columns::default());
  assert!(matches!(
    result,
    Err(LoadError::MalformedRow { line: 3, column, .. }) if column == "longitude"
  ));
}

#[test]
fn missing_column_aborts_the_load() {
  let text = "ADRECA,NOM_CIENTIFIC,LONGITUD_WGS84\nCarrer X,Platanus hispanica,2.17\n";
  let result = RecordStore::from_reader(text.as_bytes(), &Columns::default());
  assert!(matches!(
    result,
    Err(LoadError::MissingColumn { column }) if column == "LATITUD_WGS84"
  ));
}

#[test]
fn latitude_out_of_range_aborts_the_load() {
  let text = format!("{HEADER}Carrer X,Platanus hispanica,2.17,91.0\n");
  let result = RecordStore::from_reader(text.as_bytes(), &Columns::default());
  assert!(matches!(result, Err(LoadError::InvalidCoordinate { line: 2, .. })));
}

#[test]
fn header_only_file_is_an_empty_store() {
  let store = store_from("");
  assert!(store.is_empty());
  let mut dashboard = dashboard(store);
  assert_eq!(dashboard.title(), "Tree localization in Barcelona");
  assert!(dashboard.query_changed("Tilia"));
  assert_eq!(dashboard.title(), "There are 0 Tilia in Barcelona.");
}

#[test]
fn load_reads_from_disk() {
  let path = std::env::temp_dir().join(format!("treevas_load_{}.csv", std::process::id()));
  std::fs::write(
    &path,
    format!("{HEADER}Carrer X,Platanus hispanica,2.1734,41.3851\n"),
  )
  .unwrap();
  let store = RecordStore::load(&path, &Columns::default()).unwrap();
  std::fs::remove_file(&path).unwrap();
  assert_eq!(store.len(), 1);

  let missing = RecordStore::load(&path, &Columns::default());
  assert!(matches!(missing, Err(LoadError::DataLoad { .. })));
}

#[test]
fn invalid_pattern_is_rejected() {
  let store = two_trees();
  assert!(matches!(
    filter(&store, "Tilia (", QueryMode::Pattern),
    Err(FilterError::InvalidPattern { .. })
  ));
  assert_eq!(
    filter(&store, "Tilia (", QueryMode::Literal).unwrap().count(),
    0
  );

  let mut dashboard = Dashboard::new(
    store,
    DashboardSettings {
      city: "Barcelona".to_string(),
      query_mode: QueryMode::Pattern,
    },
  );
  dashboard.start();
  assert!(dashboard.query_changed("^(Plat|Til)"));
  assert_eq!(dashboard.displayed().count(), 2);
  assert!(!dashboard.query_changed("Tilia ("));
  assert_eq!(dashboard.title(), "There are 2 ^(Plat|Til) in Barcelona.");
}
