use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use h5_ingest::ingestion::{IngestOptions, Ingestor};
use h5_ingest::sink::{SqliteSink, TableSink};

fn tmp_file(ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("h5-ingest-versioning-{nanos}.{ext}"))
}

fn container(json: &str) -> PathBuf {
    let path = tmp_file("json");
    fs::write(&path, json).unwrap();
    path
}

fn column_names(sink: &mut SqliteSink, table: &str) -> Vec<String> {
    sink.table_schema(table)
        .unwrap()
        .unwrap()
        .columns
        .into_iter()
        .map(|(name, _)| name)
        .collect()
}

#[test]
fn narrower_frame_gets_its_own_version_which_is_then_reused() {
    let wide = container(r#"{"a1": {"sensor": [{"a": 1.0, "b": 2.0, "c": 3.0}]}}"#);
    let narrow = container(r#"{"a2": {"sensor": [{"a": 4.0, "b": 5.0}]}}"#);
    let narrow_again = container(r#"{"a3": {"sensor": [{"b": 7.0, "a": 6.0}, {"b": 9.0, "a": 8.0}]}}"#);

    let mut ingestor = Ingestor::new(SqliteSink::open_in_memory().unwrap(), IngestOptions::default());
    let report = ingestor.run([&wide, &narrow, &narrow_again]).unwrap();
    assert!(report.is_clean(), "{report}");

    let tables: Vec<(&str, u32)> = report
        .persisted
        .iter()
        .map(|p| (p.table.as_str(), p.version))
        .collect();
    assert_eq!(tables, vec![("sensor", 1), ("sensorv2", 2), ("sensorv2", 2)]);

    let mut sink = ingestor.into_sink();
    assert_eq!(column_names(&mut sink, "sensor"), vec!["a", "b", "c"]);
    assert_eq!(column_names(&mut sink, "sensorv2"), vec!["a", "b"]);
    assert!(sink.table_schema("sensorv3").unwrap().is_none());

    let count: i64 = sink
        .connection()
        .query_row("SELECT COUNT(*) FROM sensorv2", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 3);

    for p in [wide, narrow, narrow_again] {
        fs::remove_file(p).unwrap();
    }
}

#[test]
fn versions_persist_across_runs_on_the_same_database() {
    let db = tmp_file("sqlite");
    let first = container(r#"{"g": {"gain": [1, 2, 3]}}"#);
    let second = container(r#"{"g": {"gain": [1.5, 2.5]}}"#);

    let mut run1 = Ingestor::new(SqliteSink::open(&db).unwrap(), IngestOptions::default());
    let r1 = run1.run([&first, &second]).unwrap();
    let tables: Vec<&str> = r1.persisted.iter().map(|p| p.table.as_str()).collect();
    assert_eq!(tables, vec!["gain", "gainv2"]);
    drop(run1);

    // A fresh run learns existing shapes from the database.
    let mut run2 = Ingestor::new(SqliteSink::open(&db).unwrap(), IngestOptions::default());
    let r2 = run2.run([&second, &first]).unwrap();
    let tables: Vec<&str> = r2.persisted.iter().map(|p| p.table.as_str()).collect();
    assert_eq!(tables, vec!["gainv2", "gain"]);
    drop(run2);

    for p in [db, first, second] {
        fs::remove_file(p).unwrap();
    }
}

#[test]
fn exhausted_versions_skip_only_that_leaf() {
    let path = container(
        r#"{
            "a": {"t": [1]},
            "b": {"t": [1, 2]},
            "c": {"t": [1, 2, 3]},
            "d": {"other": [4]}
        }"#,
    );
    let opts = IngestOptions {
        max_table_versions: 2,
        ..Default::default()
    };
    let mut ingestor = Ingestor::new(SqliteSink::open_in_memory().unwrap(), opts);
    let report = ingestor.run([&path]).unwrap();

    let tables: Vec<&str> = report.persisted.iter().map(|p| p.table.as_str()).collect();
    assert_eq!(tables, vec!["t", "tv2", "other"]);
    assert_eq!(report.skipped_leaves.len(), 1);
    assert_eq!(report.skipped_leaves[0].leaf, "c/t");
    assert!(report.skipped_leaves[0].reason.contains("after 2 versions"));

    fs::remove_file(&path).unwrap();
}

#[test]
fn compatible_types_share_the_base_table() {
    let floats = container(r#"{"g": {"gain": [[1.0, 2.0], [3.5, 4.0]]}}"#);
    let ints = container(r#"{"g": {"gain": [[1, 2], [3, 4]]}}"#);
    let labelled = container(r#"{"g": {"meta": [{"x": 1.0, "label": "a"}]}}"#);
    let unlabelled = container(r#"{"g": {"meta": [{"x": 2.0, "label": null}]}}"#);

    let mut ingestor = Ingestor::new(SqliteSink::open_in_memory().unwrap(), IngestOptions::default());
    let report = ingestor.run([&floats, &ints, &labelled, &unlabelled]).unwrap();
    assert!(report.is_clean(), "{report}");

    let tables: Vec<&str> = report.persisted.iter().map(|p| p.table.as_str()).collect();
    assert_eq!(tables, vec!["gain", "gain", "meta", "meta"]);

    let mut sink = ingestor.into_sink();
    assert!(sink.table_schema("gainv2").unwrap().is_none());
    assert!(sink.table_schema("metav2").unwrap().is_none());
    let total: f64 = sink
        .connection()
        .query_row("SELECT SUM(Column_1) FROM gain", [], |r| r.get(0))
        .unwrap();
    assert_eq!(total, 8.5);

    for p in [floats, ints, labelled, unlabelled] {
        fs::remove_file(p).unwrap();
    }
}
