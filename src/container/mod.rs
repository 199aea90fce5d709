//! Hierarchical containers and the leaf scanner.
//!
//! A [`Container`] is a read-only tree of groups and datasets. [`scan`] walks it depth-first in
//! storage order and yields one [`LeafNode`] per dataset, reading each array only when the
//! iterator reaches it.
//!
//! Backends:
//! - [`json`]: JSON documents laid out as a group tree (always available)
//! - [`h5`]: native HDF5 files (requires the Cargo feature `hdf5`)
//!
//! [`decode`] turns native element buffers into [`crate::types::Datum`]s and is shared by the
//! binary backends.

pub mod decode;
#[cfg(feature = "hdf5")]
pub mod h5;
pub mod json;
mod scan;

use std::path::Path;

use crate::error::{IngestionError, IngestionResult};
use crate::types::Datum;

pub use scan::{scan, LeafIter, ScanFailure};

/// Kind of a child node inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Intermediate node; the scanner recurses through it.
    Group,
    /// Typed array; the scanner yields it as a leaf.
    Dataset,
}

/// A named child of a group, as listed by [`Container::entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
}

impl Entry {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Group,
        }
    }

    pub fn dataset(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dataset,
        }
    }
}

/// A dataset as read from a container.
///
/// For plain arrays `elements` holds `shape.iter().product()` values in row-major order. For
/// structured arrays (`fields` is `Some`) every element is a [`Datum::Record`] with one value per
/// field. A scalar has an empty `shape` and one element.
#[derive(Debug, Clone, PartialEq)]
pub struct RawArray {
    pub shape: Vec<usize>,
    /// Named sub-fields of a structured/record element type.
    pub fields: Option<Vec<String>>,
    pub elements: Vec<Datum>,
    /// Explicit column names carried as a dataset attribute.
    pub column_names: Option<Vec<String>>,
}

impl RawArray {
    /// A plain (non-structured) array.
    pub fn new(shape: Vec<usize>, elements: Vec<Datum>) -> Self {
        Self {
            shape,
            fields: None,
            elements,
            column_names: None,
        }
    }

    /// A rank-0 array holding one value.
    pub fn scalar(value: Datum) -> Self {
        Self::new(Vec::new(), vec![value])
    }

    /// A 1-D structured array: one [`Datum::Record`] per element.
    pub fn structured(fields: Vec<String>, records: Vec<Datum>) -> Self {
        Self {
            shape: vec![records.len()],
            fields: Some(fields),
            elements: records,
            column_names: None,
        }
    }

    pub fn with_column_names(mut self, names: Vec<String>) -> Self {
        self.column_names = Some(names);
        self
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

/// One dataset found during traversal: its `/`-delimited path and its contents.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
    pub path: String,
    pub array: RawArray,
}

impl LeafNode {
    /// Last path segment.
    pub fn base_name(&self) -> &str {
        base_name(&self.path)
    }
}

/// Last segment of a `/`-delimited path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Join a group path and a child name the way leaf paths are reported (`a/b/c`, no leading `/`).
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Read-only access to a hierarchical container.
///
/// Paths are `/`-delimited and relative to the root; the root group is `""`.
pub trait Container {
    /// List the children of the group at `group`, in storage order.
    fn entries(&self, group: &str) -> IngestionResult<Vec<Entry>>;

    /// Read the full extent of the dataset at `path`.
    ///
    /// `column_names_attr` names the dataset attribute that may carry explicit column names.
    fn read_array(&self, path: &str, column_names_attr: &str) -> IngestionResult<RawArray>;
}

/// Supported container file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// HDF5 (feature-gated behind `hdf5`).
    Hdf5,
    /// JSON group tree.
    Json,
}

impl ContainerFormat {
    /// Parse a container format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "h5" | "hdf5" | "he5" => Some(Self::Hdf5),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> IngestionResult<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| IngestionError::UnsupportedFormat {
                message: format!("path has no extension ({})", path.display()),
            })?;

        Self::from_extension(ext).ok_or_else(|| IngestionError::UnsupportedFormat {
            message: format!("unknown extension '{ext}' ({})", path.display()),
        })
    }
}

/// Open the container at `path`, choosing the backend by extension.
///
/// The returned handle owns the underlying file; dropping it closes the file.
pub fn open_container(path: &Path) -> IngestionResult<Box<dyn Container>> {
    match ContainerFormat::from_path(path)? {
        ContainerFormat::Json => Ok(Box::new(json::JsonContainer::open(path)?)),
        ContainerFormat::Hdf5 => open_hdf5(path),
    }
}

#[cfg(feature = "hdf5")]
fn open_hdf5(path: &Path) -> IngestionResult<Box<dyn Container>> {
    Ok(Box::new(h5::Hdf5Container::open(path)?))
}

#[cfg(not(feature = "hdf5"))]
fn open_hdf5(path: &Path) -> IngestionResult<Box<dyn Container>> {
    Err(IngestionError::UnsupportedFormat {
        message: format!(
            "hdf5 support not enabled (enable cargo feature 'hdf5') ({})",
            path.display()
        ),
    })
}
