//! The ingestion run: files, then leaves, then tables.
//!
//! An [`Ingestor`] owns the sink for the whole run. [`Ingestor::run`] first makes sure the
//! bookkeeping table exists (a failure there is fatal), then ingests every container in turn:
//!
//! - a container that cannot be opened is reported and skipped
//! - each leaf goes through read, normalize (with sanitization), impute, name and persist; a
//!   failure at any stage skips that leaf only
//!
//! Failures are collected in the returned [`IngestionReport`], logged through `tracing`, and
//! forwarded to the configured [`IngestionObserver`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::container::{open_container, scan, Container, LeafNode, ScanFailure};
use crate::error::{IngestionError, IngestionResult};
use crate::processing::{impute_missing, normalize};
use crate::sink::TableSink;
use crate::tables::{NamingRules, PersistedTable, TableRegistry, DEFAULT_MAX_TABLE_VERSIONS};

use super::observability::{
    severity_for_error, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStage, IngestionStats,
};
use super::report::{IngestionReport, PersistedLeaf, SkippedFile, SkippedLeaf};

/// Options controlling an ingestion run.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestOptions {
    /// Path markers and fixed table names.
    pub naming: NamingRules,
    /// Dataset attribute holding explicit column names.
    pub column_names_attr: String,
    /// Upper bound on `name`, `namev2`, ... tried for one frame.
    pub max_table_versions: u32,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestOptions")
            .field("naming", &self.naming)
            .field("column_names_attr", &self.column_names_attr)
            .field("max_table_versions", &self.max_table_versions)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            naming: NamingRules::default(),
            column_names_attr: "column_names".to_string(),
            max_table_versions: DEFAULT_MAX_TABLE_VERSIONS,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Drives one ingestion run against a [`TableSink`].
///
/// # Example
///
/// ```
/// use h5_ingest::container::json::JsonContainer;
/// use h5_ingest::ingestion::{IngestOptions, Ingestor};
/// use h5_ingest::sink::SqliteSink;
///
/// # fn main() -> Result<(), h5_ingest::IngestionError> {
/// let container = JsonContainer::parse(r#"{"expA": {"run1": [1.0, 2.0, 3.0]}}"#)?;
///
/// let mut ingestor = Ingestor::new(SqliteSink::open_in_memory()?, IngestOptions::default());
/// ingestor.prepare()?;
/// let report = ingestor.ingest_container("inline.json".as_ref(), &container);
///
/// assert_eq!(report.persisted[0].table, "run1");
/// assert!(report.is_clean());
/// # Ok(())
/// # }
/// ```
pub struct Ingestor<S: TableSink> {
    sink: S,
    options: IngestOptions,
    registry: TableRegistry,
    prepared: bool,
}

impl<S: TableSink> fmt::Debug for Ingestor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ingestor")
            .field("backend", &self.sink.backend())
            .field("options", &self.options)
            .field("prepared", &self.prepared)
            .finish()
    }
}

impl<S: TableSink> Ingestor<S> {
    pub fn new(sink: S, options: IngestOptions) -> Self {
        let registry = TableRegistry::new(options.max_table_versions);
        Self {
            sink,
            options,
            registry,
            prepared: false,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Create the bookkeeping schema and history table if absent.
    ///
    /// Runs at most once per ingestor; [`Self::run`] calls it before the first file.
    pub fn prepare(&mut self) -> IngestionResult<()> {
        if self.prepared {
            return Ok(());
        }
        self.sink.ensure_history_table()?;
        tracing::debug!(backend = self.sink.backend(), "history table ready");
        self.prepared = true;
        Ok(())
    }

    /// Ingest every container in `paths`, in order.
    ///
    /// Only a failure to prepare the database is returned as an error; file and leaf failures are
    /// collected in the report.
    pub fn run<I, P>(&mut self, paths: I) -> IngestionResult<IngestionReport>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.prepare()?;

        let mut report = IngestionReport::default();
        for path in paths {
            self.ingest_file(path.as_ref(), &mut report);
        }
        tracing::info!(
            files = report.files_seen,
            leaves = report.persisted.len(),
            rows = report.rows_written(),
            skipped_files = report.skipped_files.len(),
            skipped_leaves = report.skipped_leaves.len(),
            "ingestion finished"
        );
        Ok(report)
    }

    /// Open one container file and ingest its leaves into `report`.
    pub fn ingest_file(&mut self, path: &Path, report: &mut IngestionReport) {
        report.files_seen += 1;
        let container = match open_container(path) {
            Ok(c) => c,
            Err(error) => {
                tracing::warn!(file = %path.display(), error = %error, "skipping container");
                let ctx = IngestionContext {
                    file: path.to_path_buf(),
                    leaf: None,
                    stage: IngestionStage::Open,
                };
                self.notify_failure(&ctx, &error);
                report.skipped_files.push(SkippedFile {
                    file: path.to_path_buf(),
                    reason: error.to_string(),
                });
                return;
            }
        };

        tracing::info!(file = %path.display(), "ingesting container");
        let partial = self.ingest_container(path, container.as_ref());
        report.persisted.extend(partial.persisted);
        report.skipped_leaves.extend(partial.skipped_leaves);
    }

    /// Ingest every leaf of an already opened container; `file` is used for reporting only.
    pub fn ingest_container(&mut self, file: &Path, container: &dyn Container) -> IngestionReport {
        let mut report = IngestionReport::default();
        let attr = self.options.column_names_attr.clone();

        for item in scan(container, &attr) {
            let (leaf_path, outcome) = match item {
                Ok(leaf) => (leaf.path.clone(), self.ingest_leaf(leaf)),
                Err(ScanFailure { path, error }) => (path, Err((IngestionStage::Read, error))),
            };

            let mut ctx = IngestionContext {
                file: file.to_path_buf(),
                leaf: Some(leaf_path.clone()),
                stage: IngestionStage::Persist,
            };
            match outcome {
                Ok(persisted) => {
                    tracing::debug!(
                        leaf = %leaf_path,
                        table = %persisted.table,
                        rows = persisted.rows,
                        "leaf persisted"
                    );
                    if let Some(obs) = self.options.observer.as_ref() {
                        let stats = IngestionStats {
                            rows: persisted.rows,
                            table: persisted.table.clone(),
                        };
                        obs.on_success(&ctx, &stats);
                    }
                    report.persisted.push(PersistedLeaf {
                        file: file.to_path_buf(),
                        leaf: leaf_path,
                        table: persisted.table,
                        version: persisted.version,
                        rows: persisted.rows,
                    });
                }
                Err((stage, error)) => {
                    tracing::warn!(leaf = %leaf_path, stage = %stage, error = %error, "skipping leaf");
                    ctx.stage = stage;
                    self.notify_failure(&ctx, &error);
                    report.skipped_leaves.push(SkippedLeaf {
                        file: file.to_path_buf(),
                        leaf: leaf_path,
                        stage,
                        reason: error.to_string(),
                    });
                }
            }
        }
        report
    }

    fn ingest_leaf(&mut self, leaf: LeafNode) -> Result<PersistedTable, (IngestionStage, IngestionError)> {
        let path = leaf.path.clone();
        let mut frame = normalize(leaf).map_err(|e| (IngestionStage::Normalize, e))?;

        let filled = impute_missing(&mut frame);
        if filled > 0 {
            tracing::debug!(leaf = %path, cells = filled, "interpolated missing values");
        }

        let target = self
            .options
            .naming
            .resolve(&path)
            .map_err(|e| (IngestionStage::Name, e))?;
        target.apply(&mut frame);

        self.registry
            .persist(&mut self.sink, &target.table, &frame)
            .map_err(|e| (IngestionStage::Persist, e))
    }

    fn notify_failure(&self, ctx: &IngestionContext, error: &IngestionError) {
        if let Some(obs) = self.options.observer.as_ref() {
            let sev = severity_for_error(error);
            obs.on_failure(ctx, sev, error);
            if sev >= self.options.alert_at_or_above {
                obs.on_alert(ctx, sev, error);
            }
        }
    }
}
