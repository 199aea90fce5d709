use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::IngestionError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (a leaf or file was skipped).
    Error,
    /// Critical error (typically I/O, connection or other infrastructure failures).
    Critical,
}

/// Pipeline step a leaf (or file) was in when an event was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionStage {
    /// Opening the container file.
    Open,
    /// Listing a group or reading a dataset.
    Read,
    /// Sanitizing and shaping the array into a frame.
    Normalize,
    /// Resolving the table name and run number.
    Name,
    /// Writing to the database.
    Persist,
}

impl fmt::Display for IngestionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IngestionStage::Open => "open",
            IngestionStage::Read => "read",
            IngestionStage::Normalize => "normalize",
            IngestionStage::Name => "name",
            IngestionStage::Persist => "persist",
        })
    }
}

/// Context about one ingestion event.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// Container file being ingested.
    pub file: PathBuf,
    /// Leaf path inside the container; `None` for file-level events.
    pub leaf: Option<String>,
    pub stage: IngestionStage,
}

impl fmt::Display for IngestionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file={} stage={}", self.file.display(), self.stage)?;
        if let Some(leaf) = &self.leaf {
            write!(f, " leaf={leaf}")?;
        }
        Ok(())
    }
}

/// Stats reported when a leaf was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionStats {
    /// Number of rows appended.
    pub rows: usize,
    /// Concrete (possibly versioned) table name.
    pub table: String,
}

/// Observer interface for ingestion outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called when a leaf was persisted.
    fn on_success(&self, _ctx: &IngestionContext, _stats: &IngestionStats) {}

    /// Called when a file or leaf was skipped.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called when a failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: &IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs ingestion events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl IngestionObserver for StdErrObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: &IngestionStats) {
        eprintln!("[ingest][ok] {ctx} table={} rows={}", stats.table, stats.rows);
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        eprintln!("[ingest][{severity:?}] {ctx} err={error}");
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        eprintln!("[ALERT][ingest][{severity:?}] {ctx} err={error}");
    }
}

/// Appends ingestion events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    errors_only: bool,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends every event to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            errors_only: false,
            lock: Mutex::new(()),
        }
    }

    /// Like [`Self::new`], but successful leaves are not logged.
    pub fn errors_only(path: impl AsRef<Path>) -> Self {
        Self {
            errors_only: true,
            ..Self::new(path)
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: &IngestionStats) {
        if self.errors_only {
            return;
        }
        self.append_line(&format!(
            "{} ok {ctx} table={} rows={}",
            unix_ts(),
            stats.table,
            stats.rows
        ));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!("{} fail severity={severity:?} {ctx} err={error}", unix_ts()));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!("{} ALERT severity={severity:?} {ctx} err={error}", unix_ts()));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Severity of a file- or leaf-level failure.
///
/// I/O, traversal and connection-class database failures are infrastructure problems and rank
/// as [`IngestionSeverity::Critical`]; everything else only costs the affected file or leaf.
pub fn severity_for_error(e: &IngestionError) -> IngestionSeverity {
    match e {
        IngestionError::Io(_) | IngestionError::Walk(_) => IngestionSeverity::Critical,
        IngestionError::Sqlite(err) => match err.sqlite_error_code() {
            Some(
                rusqlite::ErrorCode::CannotOpen
                | rusqlite::ErrorCode::DiskFull
                | rusqlite::ErrorCode::SystemIoFailure
                | rusqlite::ErrorCode::ReadOnly,
            ) => IngestionSeverity::Critical,
            _ => IngestionSeverity::Error,
        },
        #[cfg(feature = "postgres")]
        IngestionError::Postgres(err) => match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => IngestionSeverity::Critical,
            _ => IngestionSeverity::Error,
        },
        _ => IngestionSeverity::Error,
    }
}
