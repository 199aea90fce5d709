//! Ingestion runs.
//!
//! Most callers find container files with [`discover_containers`] and hand them to
//! [`Ingestor::run`], which:
//!
//! - prepares the database (bookkeeping history table)
//! - opens each container and walks its leaves
//! - turns every leaf into a frame, fills gaps, routes it to a table and appends it
//! - reports skipped files/leaves in an [`IngestionReport`] and to an optional
//!   [`IngestionObserver`]

pub mod discovery;
pub mod observability;
pub mod orchestrator;
pub mod report;

pub use discovery::{discover_containers, DEFAULT_PATTERN};
pub use observability::{
    severity_for_error, CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity,
    IngestionStage, IngestionStats, StdErrObserver,
};
pub use orchestrator::{IngestOptions, Ingestor};
pub use report::{IngestionReport, PersistedLeaf, SkippedFile, SkippedLeaf};
