//! Container file discovery.

use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::IngestionResult;

/// Pattern used when the caller does not give one.
pub const DEFAULT_PATTERN: &str = "**/*.h5";

/// Every regular file under `root` whose path relative to `root` matches `pattern`, sorted.
///
/// ```no_run
/// use h5_ingest::ingestion::discover_containers;
///
/// # fn main() -> Result<(), h5_ingest::IngestionError> {
/// let files = discover_containers("/data/shot42", "**/*.h5")?;
/// println!("{} containers", files.len());
/// # Ok(())
/// # }
/// ```
pub fn discover_containers(root: impl AsRef<Path>, pattern: &str) -> IngestionResult<Vec<PathBuf>> {
    let root = root.as_ref();
    let pattern = Pattern::new(pattern)?;

    let mut out = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if pattern.matches_path(rel) {
            out.push(entry.into_path());
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::discover_containers;

    fn tmp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let dir = std::env::temp_dir().join(format!("{prefix}_{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn finds_matching_files_recursively_in_sorted_order() {
        let root = tmp_dir("h5_ingest_discover");
        fs::create_dir_all(root.join("b/deep")).unwrap();
        for f in ["z.h5", "b/deep/a.h5", "b/notes.txt", "a.json"] {
            fs::write(root.join(f), b"").unwrap();
        }

        let found = discover_containers(&root, "**/*.h5").unwrap();
        assert_eq!(found, vec![root.join("b/deep/a.h5"), root.join("z.h5")]);

        let json = discover_containers(&root, "*.json").unwrap();
        assert_eq!(json, vec![root.join("a.json")]);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn bad_pattern_is_an_error() {
        assert!(discover_containers(std::env::temp_dir(), "[").is_err());
    }
}
