//! Schema conflict resolution: picks the versioned table a frame is appended to.
//!
//! A base name `t` has the version sequence `t`, `tv2`, `tv3`, ... A frame goes to the first
//! version that either does not exist yet (it is created with the frame's schema) or already has
//! the frame's columns with compatible types (see [`TableShape::accepts`]). Table shapes are
//! looked up once per run and cached.

use std::collections::HashMap;

use crate::error::{IngestionError, IngestionResult};
use crate::sink::{TableShape, TableSink};
use crate::types::Frame;

/// Default upper bound on the versions tried for one base name.
pub const DEFAULT_MAX_TABLE_VERSIONS: u32 = 1000;

/// Table name for `version` of `base`; version 1 is the base name itself.
pub fn versioned_name(base: &str, version: u32) -> String {
    if version <= 1 {
        base.to_string()
    } else {
        format!("{base}v{version}")
    }
}

/// Where a frame was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTable {
    pub table: String,
    pub version: u32,
    pub rows: usize,
}

/// Per-run registry of table shapes, keyed by concrete (versioned) table name.
///
/// The registry assumes it is the only writer for the duration of the run.
#[derive(Debug)]
pub struct TableRegistry {
    max_versions: u32,
    shapes: HashMap<String, TableShape>,
    highest: HashMap<String, u32>,
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TABLE_VERSIONS)
    }
}

impl TableRegistry {
    pub fn new(max_versions: u32) -> Self {
        Self {
            max_versions: max_versions.max(1),
            shapes: HashMap::new(),
            highest: HashMap::new(),
        }
    }

    /// Append `frame` to the first compatible version of `base`, creating it if needed.
    ///
    /// Structural mismatches (a differently-shaped table, or a schema-class error from the sink)
    /// move on to the next version; any other sink error is returned as-is.
    pub fn persist(
        &mut self,
        sink: &mut dyn TableSink,
        base: &str,
        frame: &Frame,
    ) -> IngestionResult<PersistedTable> {
        for version in 1..=self.max_versions {
            let table = versioned_name(base, version);
            let shape = match self.shapes.get(&table) {
                Some(shape) => Some(shape.clone()),
                None => sink.table_schema(&table)?,
            };

            let shape = match shape {
                None => {
                    sink.create_table(&table, &frame.schema)?;
                    tracing::debug!(table = %table, columns = frame.column_count(), "created table");
                    TableShape::from_schema(&frame.schema)
                }
                Some(shape) if shape.accepts(frame) => shape,
                Some(shape) => {
                    tracing::debug!(table = %table, "column signature differs, trying next version");
                    self.shapes.insert(table, shape);
                    continue;
                }
            };
            let rows = shape.conform(frame);
            self.shapes.insert(table.clone(), shape);

            match sink.append(&table, &rows) {
                Ok(rows) => {
                    let highest = self.highest.entry(base.to_string()).or_insert(version);
                    *highest = (*highest).max(version);
                    return Ok(PersistedTable { table, version, rows });
                }
                Err(e) if e.is_schema_conflict() => {
                    tracing::debug!(table = %table, error = %e, "append rejected, trying next version");
                }
                Err(e) => return Err(e),
            }
        }

        Err(IngestionError::VersionsExhausted {
            base: base.to_string(),
            attempts: self.max_versions,
        })
    }

    /// Highest version of `base` written to during this run.
    pub fn highest_version(&self, base: &str) -> Option<u32> {
        self.highest.get(base).copied()
    }
}
