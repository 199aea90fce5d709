use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use h5_ingest::ingestion::{IngestOptions, IngestionStage, Ingestor};
use h5_ingest::sink::{SqliteSink, TableSink};
use h5_ingest::types::DataType;

fn tmp_file(ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("h5-ingest-e2e-{nanos}.{ext}"))
}

fn write_container(json: &str) -> PathBuf {
    let path = tmp_file("json");
    fs::write(&path, json).unwrap();
    path
}

fn row(sink: &SqliteSink, table: &str) -> Vec<Option<f64>> {
    let sql = format!(
        "SELECT Column_1, Column_2, Column_3, Column_4, Column_5, run_number FROM \"{table}\""
    );
    sink.connection()
        .query_row(&sql, [], |r| {
            (0..6).map(|i| r.get::<_, Option<f64>>(i)).collect::<Result<Vec<_>, _>>()
        })
        .unwrap()
}

#[test]
fn runs_become_tables_with_interpolated_gaps() {
    let path = write_container(
        r#"{
            "expA": {
                "run1": [1.0, 2.0, 3.0, 4.0, 5.0],
                "run2": [1.5, 2.5, null, 4.5, 5.5]
            }
        }"#,
    );

    let mut ingestor = Ingestor::new(SqliteSink::open_in_memory().unwrap(), IngestOptions::default());
    let report = ingestor.run([&path]).unwrap();
    assert!(report.is_clean(), "{report}");
    assert_eq!(report.persisted.len(), 2);

    let tables: Vec<&str> = report.persisted.iter().map(|p| p.table.as_str()).collect();
    assert_eq!(tables, vec!["run1", "run2"]);

    let mut sink = ingestor.into_sink();
    assert_eq!(
        row(&sink, "run1"),
        vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(1.0)]
    );
    assert_eq!(
        row(&sink, "run2"),
        vec![Some(1.5), Some(2.5), Some(3.5), Some(4.5), Some(5.5), Some(2.0)]
    );

    let shape = sink.table_schema("run2").unwrap().unwrap();
    assert_eq!(shape.columns.len(), 6);
    assert_eq!(shape.columns[5], ("run_number".to_string(), Some(DataType::Int64)));

    let count: i64 = sink
        .connection()
        .query_row("SELECT COUNT(*) FROM run2", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);

    fs::remove_file(&path).unwrap();
}

#[test]
fn unreadable_files_are_skipped_and_the_run_continues() {
    let good = write_container(r#"{"calib": {"gain": [[1, 2], [3, 4]]}}"#);
    let broken = write_container("{ not json");
    let unknown = tmp_file("csv");
    let missing = tmp_file("json");

    let mut ingestor = Ingestor::new(SqliteSink::open_in_memory().unwrap(), IngestOptions::default());
    let report = ingestor.run([&broken, &unknown, &missing, &good]).unwrap();

    assert_eq!(report.files_seen, 4);
    assert_eq!(report.skipped_files.len(), 3);
    assert_eq!(report.persisted.len(), 1);
    assert_eq!(report.persisted[0].table, "gain");
    assert_eq!(report.persisted[0].rows, 2);

    fs::remove_file(&good).unwrap();
    fs::remove_file(&broken).unwrap();
}

#[test]
fn markers_route_leaves_to_fixed_tables() {
    let path = write_container(
        r#"{
            "shot": {
                "final_profile1": {"temps": [[10.0, 11.0], [12.0, 13.0]]},
                "history1": {"energy": [{"t": 0.0, "e": 5.0}, {"t": 1.0, "e": 6.0}]}
            }
        }"#,
    );

    let mut ingestor = Ingestor::new(SqliteSink::open_in_memory().unwrap(), IngestOptions::default());
    let report = ingestor.run([&path]).unwrap();
    assert!(report.is_clean(), "{report}");
    assert_eq!(report.persisted_leaf("shot/final_profile1/temps").unwrap().table, "final_profile");
    assert_eq!(report.persisted_leaf("shot/history1/energy").unwrap().table, "history");

    let mut sink = ingestor.into_sink();
    let history = sink.table_schema("history").unwrap().unwrap();
    let names: Vec<&str> = history.columns.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["t", "e"]);
    // Bookkeeping lives apart from the `history` data table.
    assert!(sink.table_schema("history_completed_queries").unwrap().is_some());

    fs::remove_file(&path).unwrap();
}

#[test]
fn bad_leaves_do_not_stop_their_siblings() {
    let path = write_container(
        r#"{
            "g": {
                "before": [1, 2, 3],
                "bad": {"@data": [1, 2], "@attrs": {"column_names": ["x", "x"]}},
                "after": {"@data": [[1, 2]], "@attrs": {"column_names": ["x", "y"]}}
            }
        }"#,
    );

    let mut ingestor = Ingestor::new(SqliteSink::open_in_memory().unwrap(), IngestOptions::default());
    let report = ingestor.run([&path]).unwrap();

    let persisted: Vec<&str> = report.persisted.iter().map(|p| p.leaf.as_str()).collect();
    assert_eq!(persisted, vec!["g/before", "g/after"]);
    assert_eq!(report.skipped_leaves.len(), 1);
    assert_eq!(report.skipped_leaves[0].leaf, "g/bad");
    assert_eq!(report.skipped_leaves[0].stage, IngestionStage::Normalize);

    fs::remove_file(&path).unwrap();
}
