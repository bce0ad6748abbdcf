//! End-to-end tests against the sample catalog in `testdata/files.csv`

use std::sync::atomic::{AtomicUsize, Ordering};

use catalog_query::synonyms::ResolverError;
use catalog_query::{
    plan, CatalogBackend, FilterSpec, JsonSnapshotFile, MemoryCatalog, MySql, NameResolver,
    Postgres, QueryEngine, QueryParams, SnapshotStore, SynonymCache,
};

const CATALOG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/files.csv");

fn engine() -> QueryEngine<MemoryCatalog> {
    QueryEngine::new(MemoryCatalog::load_csv(CATALOG).unwrap())
}

fn spec(query: &str) -> FilterSpec {
    FilterSpec::from_params(&QueryParams::from_query_string(query)).unwrap()
}

fn targets(query: &str) -> Vec<String> {
    engine()
        .query(&spec(query))
        .unwrap()
        .into_iter()
        .map(|r| r.target)
        .collect()
}

/// Resolver that knows one object and counts its calls
#[derive(Default)]
struct OneObjectResolver {
    calls: AtomicUsize,
}

impl NameResolver for OneObjectResolver {
    fn resolve(&self, target: &str) -> Result<Option<Vec<String>>, ResolverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if target == "M31" {
            Ok(Some(vec![
                "M 31".to_string(),
                "NAME Andromeda Galaxy".to_string(),
                "NGC 224".to_string(),
            ]))
        } else {
            Ok(None)
        }
    }
}

#[test]
fn test_target_matching() {
    assert_eq!(targets("target=M31"), vec!["M31", "M31_OFF"]);
    assert_eq!(targets("target=!M31"), vec!["M31"]);
    assert_eq!(targets("target=/^HIP 113357"), vec!["HIP 113357", "HIP 113357_OFF"]);
    assert_eq!(targets("target=M33"), vec!["m33"]);
}

#[test]
fn test_fits_includes_legacy_data_files() {
    assert_eq!(
        targets("target=&file-types=fits"),
        vec!["M31", "HIP 113357_OFF", "m33", "GJ 699"]
    );
}

#[test]
fn test_time_window() {
    assert_eq!(targets("target=&time-start=58849"), vec!["GJ 699", "Voyager1"]);
    assert_eq!(
        targets("target=&telescopes=GBT&time-start=58000&time-end=58849"),
        vec!["HIP 1497", "m33"]
    );
}

#[test]
fn test_cone_across_ra_zero() {
    assert_eq!(
        targets("target=&pos-ra=355&pos-dec=10&pos-rad=20"),
        vec!["HIP 113357", "HIP 113357_OFF", "HIP 1497"]
    );
}

#[test]
fn test_cone_post_filter() {
    let engine = engine();
    let spec = spec("target=&pos-ra=355&pos-dec=10&pos-rad=14.5");

    // The bounding box lets all three through; only one is within 14.5 degrees
    let candidates = engine.backend().execute(&plan(&spec)).unwrap();
    assert_eq!(candidates.len(), 3);

    let records = engine.query(&spec).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].target, "HIP 113357_OFF");
}

#[test]
fn test_limit_applies_before_post_filter() {
    assert_eq!(targets("target=&limit=2"), vec!["M31", "M31_OFF"]);
    assert!(targets("target=&limit=1&pos-ra=355&pos-dec=10&pos-rad=14.5").is_empty());
}

#[test]
fn test_response_envelope() {
    let engine = engine();

    let error = serde_json::to_value(engine.respond(&QueryParams::default())).unwrap();
    assert_eq!(
        error,
        serde_json::json!({"result": "error", "message": "Target is required"})
    );

    let success = serde_json::to_value(
        engine.respond(&QueryParams::from_query_string("?target=Voyager1")),
    )
    .unwrap();
    assert_eq!(success["result"], "success");
    assert_eq!(success["data"][0]["telescope"], "GBT");
    assert_eq!(success["data"][0]["utc"], "2020-09-01 00:00:00.000");
    assert_eq!(success["data"][0]["file_type"], "h5");
}

#[test]
fn test_rendered_sql_for_wrapped_cone() {
    let engine = engine();
    let spec = spec("target=!HIP 1497&pos-ra=355&pos-dec=10&pos-rad=20&limit=5");

    let mysql = engine.render_sql(&spec, &MySql);
    assert!(mysql.sql.starts_with("SELECT * FROM files WHERE target_name = %s AND decl BETWEEN"));
    assert!(mysql.sql.contains("ra NOT BETWEEN %s AND %s"));
    assert!(mysql.sql.ends_with("LIMIT %s"));
    assert_eq!(mysql.sql.matches("%s").count(), mysql.params.len());

    let postgres = engine.render_sql(&spec, &Postgres);
    assert_eq!(postgres.params, mysql.params);
    assert!(postgres.sql.contains(&format!("LIMIT ${}", postgres.params.len())));
}

#[test]
fn test_warm_writes_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("simbad-ids.json");
    let engine = engine();

    let cache = SynonymCache::open(OneObjectResolver::default(), JsonSnapshotFile::new(&path))
        .unwrap();
    let report = engine.warm_synonyms(&cache).unwrap();
    assert_eq!(report.targets, 8);
    assert_eq!(report.resolved, 8);
    assert_eq!(report.failed, 0);

    let saved = JsonSnapshotFile::new(&path).load().unwrap();
    assert_eq!(saved.len(), 8);
    assert_eq!(saved["M31"], vec!["Andromeda Galaxy", "M31", "NGC224"]);
    assert_eq!(saved["HIP 1497"], vec!["HIP 1497"]);

    // A second run is served entirely from the snapshot
    let reopened = SynonymCache::open(OneObjectResolver::default(), JsonSnapshotFile::new(&path))
        .unwrap();
    let report = engine.warm_synonyms(&reopened).unwrap();
    assert_eq!(report.resolved, 0);
    assert_eq!(reopened.resolver().calls.load(Ordering::SeqCst), 0);

    let aliases = engine.target_aliases(&reopened).unwrap();
    assert_eq!(aliases["M31"][0], "Andromeda Galaxy");
}
