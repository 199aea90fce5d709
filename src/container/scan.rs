use crate::error::IngestionError;

use super::{join_path, Container, EntryKind, LeafNode};

/// A node the scanner could not list or read.
#[derive(Debug)]
pub struct ScanFailure {
    /// Path of the group or dataset that failed.
    pub path: String,
    pub error: IngestionError,
}

/// Lazy depth-first iterator over the leaves of a [`Container`].
///
/// Groups are expanded only when the iterator reaches them, and each dataset is read only when
/// it is yielded. A failing node is yielded as an `Err` and traversal continues with its next
/// sibling.
pub struct LeafIter<'a> {
    container: &'a dyn Container,
    column_names_attr: &'a str,
    // Pending nodes, next one on top. Children are pushed in reverse so they pop in storage order.
    stack: Vec<(String, EntryKind)>,
}

/// Walk `container` from its root group.
pub fn scan<'a>(container: &'a dyn Container, column_names_attr: &'a str) -> LeafIter<'a> {
    LeafIter {
        container,
        column_names_attr,
        stack: vec![(String::new(), EntryKind::Group)],
    }
}

impl Iterator for LeafIter<'_> {
    type Item = Result<LeafNode, ScanFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((path, kind)) = self.stack.pop() {
            match kind {
                EntryKind::Dataset => {
                    let item = match self.container.read_array(&path, self.column_names_attr) {
                        Ok(array) => Ok(LeafNode { path, array }),
                        Err(error) => Err(ScanFailure { path, error }),
                    };
                    return Some(item);
                }
                EntryKind::Group => match self.container.entries(&path) {
                    Ok(entries) => {
                        for entry in entries.into_iter().rev() {
                            self.stack.push((join_path(&path, &entry.name), entry.kind));
                        }
                    }
                    Err(error) => return Some(Err(ScanFailure { path, error })),
                },
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::scan;
    use crate::container::{Container, Entry, RawArray};
    use crate::error::{IngestionError, IngestionResult};
    use crate::types::Datum;

    /// Container stub that records which datasets were read.
    struct Tree {
        groups: HashMap<&'static str, Vec<Entry>>,
        reads: RefCell<Vec<String>>,
    }

    impl Container for Tree {
        fn entries(&self, group: &str) -> IngestionResult<Vec<Entry>> {
            self.groups
                .get(group)
                .cloned()
                .ok_or_else(|| IngestionError::Container {
                    path: group.to_string(),
                    message: "unreadable group".to_string(),
                })
        }

        fn read_array(&self, path: &str, _attr: &str) -> IngestionResult<RawArray> {
            self.reads.borrow_mut().push(path.to_string());
            Ok(RawArray::scalar(Datum::Int(1)))
        }
    }

    fn tree() -> Tree {
        let mut groups = HashMap::new();
        groups.insert(
            "",
            vec![Entry::group("z"), Entry::dataset("b"), Entry::group("broken")],
        );
        groups.insert("z", vec![Entry::dataset("y"), Entry::group("inner")]);
        groups.insert("z/inner", vec![Entry::dataset("x")]);
        Tree {
            groups,
            reads: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn depth_first_in_storage_order() {
        let t = tree();
        let items: Vec<_> = scan(&t, "column_names").collect();
        let ok: Vec<String> = items
            .iter()
            .filter_map(|i| i.as_ref().ok().map(|l| l.path.clone()))
            .collect();
        assert_eq!(ok, vec!["z/y", "z/inner/x", "b"]);
        // The broken group is reported, not fatal.
        assert_eq!(items.len(), 4);
        let failure = items[3].as_ref().unwrap_err();
        assert_eq!(failure.path, "broken");
    }

    #[test]
    fn datasets_are_read_lazily() {
        let t = tree();
        let mut it = scan(&t, "column_names");
        let first = it.next().unwrap().unwrap();
        assert_eq!(first.path, "z/y");
        assert_eq!(*t.reads.borrow(), vec!["z/y".to_string()]);
    }
}
