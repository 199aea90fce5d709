//! `h5-ingest` loads hierarchical scientific containers into relational tables.
//!
//! Every dataset (leaf) of a container becomes one frame, and every frame is appended to a table
//! named after the leaf. The pipeline per leaf is:
//!
//! 1. **scan**: [`container::scan`] walks groups depth-first in storage order
//! 2. **normalize**: [`processing::normalize`] shapes the array into rows and typed columns,
//!    sanitizing byte strings and records on the way
//! 3. **impute**: [`processing::impute_missing`] fills numeric gaps by linear interpolation
//! 4. **name**: [`tables::NamingRules`] picks the table and the run number
//! 5. **persist**: [`tables::TableRegistry`] appends to `name`, or to `namev2`, `namev3`, ... when
//!    `name` already holds a differently-shaped table
//!
//! [`ingestion::Ingestor`] runs this for many files and collects what was skipped.
//!
//! ## Containers
//!
//! - **HDF5**: `.h5`, `.hdf5`, `.he5` (requires the Cargo feature `hdf5` and libhdf5)
//! - **JSON group trees**: `.json` (see [`container::json`] for the layout)
//!
//! ## Sinks
//!
//! - **PostgreSQL** via [`sink::PostgresSink`] (Cargo feature `postgres`, on by default)
//! - **SQLite** via [`sink::SqliteSink`]
//!
//! ## Quick example
//!
//! ```
//! use h5_ingest::container::json::JsonContainer;
//! use h5_ingest::ingestion::{IngestOptions, Ingestor};
//! use h5_ingest::sink::SqliteSink;
//!
//! # fn main() -> Result<(), h5_ingest::IngestionError> {
//! let container = JsonContainer::parse(
//!     r#"{"expA": {"run1": [1.0, 2.0, 3.0], "run2": [1.0, null, 3.0]}}"#,
//! )?;
//!
//! let mut ingestor = Ingestor::new(SqliteSink::open_in_memory()?, IngestOptions::default());
//! ingestor.prepare()?;
//! let report = ingestor.ingest_container("expA.json".as_ref(), &container);
//! assert_eq!(report.persisted.len(), 2);
//!
//! let filled: f64 = ingestor
//!     .sink()
//!     .connection()
//!     .query_row("SELECT Column_2 FROM run2", [], |r| r.get(0))
//!     .unwrap();
//! assert_eq!(filled, 2.0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`container`]: container backends and the leaf scanner
//! - [`processing`]: sanitization, normalization, imputation
//! - [`tables`]: table naming and versioning
//! - [`sink`]: database backends
//! - [`ingestion`]: runs, reports, observers, file discovery
//! - [`types`]: frames, schemas, values
//! - [`error`]: the shared error type

pub mod container;
pub mod error;
pub mod ingestion;
pub mod processing;
pub mod sink;
pub mod tables;
pub mod types;

pub use error::{IngestionError, IngestionResult};
