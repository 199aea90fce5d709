//! h5-ingest CLI

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use h5_ingest::ingestion::{
    discover_containers, CompositeObserver, FileObserver, IngestOptions, IngestionObserver, Ingestor,
    StdErrObserver, DEFAULT_PATTERN,
};
use h5_ingest::sink::{ConnectionSettings, SqliteSink, TableSink};

#[derive(Parser)]
#[command(name = "h5-ingest")]
#[command(about = "Load every dataset of HDF5 containers into database tables")]
#[command(version)]
struct Cli {
    /// Directory holding the extracted containers
    directory: PathBuf,

    /// Archive the directory was extracted from; ingests <DIRECTORY>/<archive name without extension>
    #[arg(long)]
    archive: Option<String>,

    /// Glob selecting container files, relative to the ingestion root
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pattern: String,

    /// JSON file with connection settings (database, username, password, host, port)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Database name [default: hebse]
    #[arg(long)]
    database: Option<String>,

    /// Database user [default: postgres]
    #[arg(long)]
    username: Option<String>,

    /// Database password [default: root]
    #[arg(long)]
    password: Option<String>,

    /// Database host [default: localhost]
    #[arg(long)]
    host: Option<String>,

    /// Database port [default: 5432]
    #[arg(long)]
    port: Option<u16>,

    /// Write to this SQLite file instead of PostgreSQL
    #[arg(long)]
    sqlite: Option<PathBuf>,

    /// File receiving one line per skipped file or leaf
    #[arg(long, default_value = "h5_import_errors.log")]
    log_file: PathBuf,

    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    let root = ingestion_root(&cli.directory, cli.archive.as_deref());
    let files = discover_containers(&root, &cli.pattern)
        .with_context(|| format!("failed to scan {}", root.display()))?;
    tracing::info!(root = %root.display(), files = files.len(), "discovered containers");

    let observers: Vec<Arc<dyn IngestionObserver>> = vec![
        Arc::new(StdErrObserver),
        Arc::new(FileObserver::errors_only(&cli.log_file)),
    ];
    let options = IngestOptions {
        observer: Some(Arc::new(CompositeObserver::new(observers))),
        ..Default::default()
    };

    match &cli.sqlite {
        Some(path) => {
            let sink = SqliteSink::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            ingest(sink, options, &files)
        }
        None => {
            let settings = connection_settings(&cli)?;
            connect_postgres(&settings).and_then(|sink| ingest(sink, options, &files))
        }
    }
}

fn ingest<S: TableSink>(sink: S, options: IngestOptions, files: &[PathBuf]) -> Result<()> {
    let mut ingestor = Ingestor::new(sink, options);
    let report = ingestor
        .run(files)
        .context("failed to prepare the database")?;
    print!("{report}");
    Ok(())
}

#[cfg(feature = "postgres")]
fn connect_postgres(settings: &ConnectionSettings) -> Result<h5_ingest::sink::PostgresSink> {
    h5_ingest::sink::PostgresSink::connect(settings).with_context(|| {
        format!(
            "failed to connect to postgres at {}:{}/{}",
            settings.host, settings.port, settings.database
        )
    })
}

#[cfg(not(feature = "postgres"))]
fn connect_postgres(_settings: &ConnectionSettings) -> Result<SqliteSink> {
    anyhow::bail!("built without postgres support (enable cargo feature 'postgres') or pass --sqlite")
}

/// `<directory>/<archive stem>` when an archive is named, else `<directory>`.
fn ingestion_root(directory: &Path, archive: Option<&str>) -> PathBuf {
    match archive {
        Some(archive) => {
            let name = Path::new(archive)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(archive);
            let stem = name.split('.').next().unwrap_or(name);
            directory.join(stem)
        }
        None => directory.to_path_buf(),
    }
}

fn connection_settings(cli: &Cli) -> Result<ConnectionSettings> {
    let mut settings = match &cli.settings {
        Some(path) => ConnectionSettings::from_json_file(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?,
        None => ConnectionSettings::default(),
    };
    if let Some(v) = &cli.database {
        settings.database = v.clone();
    }
    if let Some(v) = &cli.username {
        settings.username = v.clone();
    }
    if let Some(v) = &cli.password {
        settings.password = v.clone();
    }
    if let Some(v) = &cli.host {
        settings.host = v.clone();
    }
    if let Some(v) = cli.port {
        settings.port = v;
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::ingestion_root;

    #[test]
    fn archive_name_selects_extracted_folder() {
        let dir = Path::new("/home/alice");
        assert_eq!(ingestion_root(dir, Some("shot42.tar.gz")), PathBuf::from("/home/alice/shot42"));
        assert_eq!(ingestion_root(dir, Some("/tmp/up/shot42.zip")), PathBuf::from("/home/alice/shot42"));
        assert_eq!(ingestion_root(dir, None), PathBuf::from("/home/alice"));
    }
}
