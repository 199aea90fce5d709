//! Outcome of an ingestion run.

use std::fmt;
use std::path::PathBuf;

use super::observability::IngestionStage;

/// A leaf that was written to the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedLeaf {
    pub file: PathBuf,
    pub leaf: String,
    /// Concrete table name, including any version suffix.
    pub table: String,
    pub version: u32,
    pub rows: usize,
}

/// A container file that could not be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub file: PathBuf,
    pub reason: String,
}

/// A leaf that failed at some stage and was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLeaf {
    pub file: PathBuf,
    pub leaf: String,
    pub stage: IngestionStage,
    pub reason: String,
}

/// What happened during a run: everything persisted, every file and leaf skipped and why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    /// Container files handed to the run.
    pub files_seen: usize,
    pub persisted: Vec<PersistedLeaf>,
    pub skipped_files: Vec<SkippedFile>,
    pub skipped_leaves: Vec<SkippedLeaf>,
}

impl IngestionReport {
    /// Total rows appended across all tables.
    pub fn rows_written(&self) -> usize {
        self.persisted.iter().map(|p| p.rows).sum()
    }

    /// True when nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.skipped_files.is_empty() && self.skipped_leaves.is_empty()
    }

    /// Persisted entry for `leaf`, if it made it to the database.
    pub fn persisted_leaf(&self, leaf: &str) -> Option<&PersistedLeaf> {
        self.persisted.iter().find(|p| p.leaf == leaf)
    }
}

impl fmt::Display for IngestionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "files={} leaves_persisted={} rows={} files_skipped={} leaves_skipped={}",
            self.files_seen,
            self.persisted.len(),
            self.rows_written(),
            self.skipped_files.len(),
            self.skipped_leaves.len()
        )?;
        for s in &self.skipped_files {
            writeln!(f, "  skipped file {}: {}", s.file.display(), s.reason)?;
        }
        for s in &self.skipped_leaves {
            writeln!(
                f,
                "  skipped leaf {} in {} at {}: {}",
                s.leaf,
                s.file.display(),
                s.stage,
                s.reason
            )?;
        }
        Ok(())
    }
}
