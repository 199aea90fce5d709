//! Table routing: which table a leaf's frame is written to.
//!
//! - [`naming`]: base table name and run number from the leaf path
//! - [`registry`]: versioned table selection when a base name is already taken by a
//!   differently-shaped table

pub mod naming;
pub mod registry;

pub use naming::{extract_run_number, NamingRules, TableTarget, RUN_NUMBER_COLUMN};
pub use registry::{versioned_name, PersistedTable, TableRegistry, DEFAULT_MAX_TABLE_VERSIONS};
