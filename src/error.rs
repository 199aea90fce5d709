use thiserror::Error;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error type returned by ingestion functions.
///
/// This is a single error enum shared by the container backends, the processing stages, the
/// table resolvers and the database sinks. Where a failure lands in the run (fatal, file or
/// leaf) is decided by the orchestrator, not by the variant.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON container could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite sink error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    /// PostgreSQL sink error (feature-gated behind `postgres`).
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[cfg(feature = "hdf5")]
    /// HDF5 library error (feature-gated behind `hdf5`).
    #[error("hdf5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// Directory traversal failed while discovering container files.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Invalid discovery glob pattern.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// The file extension does not map to a known container format.
    #[error("unsupported container format: {message}")]
    UnsupportedFormat { message: String },

    /// The container is malformed or a node could not be read.
    #[error("container error at '{path}': {message}")]
    Container { path: String, message: String },

    /// A dataset uses an element type this crate cannot decode.
    #[error("unsupported element type at '{path}': {type_name}")]
    UnsupportedType { path: String, type_name: String },

    /// A raw array could not be turned into a frame.
    #[error("cannot normalize '{path}': {message}")]
    Normalize { path: String, message: String },

    /// Column naming produced the same name twice.
    #[error("duplicate column '{column}' in '{path}'")]
    DuplicateColumn { path: String, column: String },

    /// The path mentions a run but its digits do not form an integer.
    #[error("cannot extract run number from '{path}': digits='{digits}'")]
    RunNumber { path: String, digits: String },

    /// The target table exists with a structurally different column set.
    #[error("schema conflict on table '{table}': {message}")]
    SchemaConflict { table: String, message: String },

    /// No versioned table name accepted the frame.
    #[error("no compatible table for '{base}' after {attempts} versions")]
    VersionsExhausted { base: String, attempts: u32 },
}

impl IngestionError {
    /// True when a persistence failure is structural (column set / type mismatch), i.e. the
    /// schema conflict resolver should retry under the next versioned table name.
    pub fn is_schema_conflict(&self) -> bool {
        match self {
            IngestionError::SchemaConflict { .. } => true,
            #[cfg(feature = "postgres")]
            IngestionError::Postgres(sqlx::Error::Database(db)) => db
                .code()
                .map(|code| code.starts_with("42"))
                .unwrap_or(false),
            IngestionError::Sqlite(rusqlite::Error::SqliteFailure(_, Some(message))) => {
                message.contains("has no column named") || message.contains("no such column")
            }
            _ => false,
        }
    }
}
