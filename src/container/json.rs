//! JSON container backend.
//!
//! A JSON document is read as a group tree:
//!
//! - an object is a group, unless it has an `"@data"` key
//! - any other value is a dataset
//!
//! Dataset values:
//!
//! - numbers, booleans and strings are elements; `null` is a missing element
//! - `{"@bytes": [104, 105]}` is a byte string
//! - `{"@record": [1, "a"]}` is an opaque structured scalar
//! - nested arrays of equal length define the rank (`[[1, 2], [3, 4]]` is 2 x 2); ragged
//!   nesting is kept as a rank-1 array of sequences
//! - an array of objects is a structured/record array; fields are the keys of the first object
//! - `{"@data": <value>, "@attrs": {"column_names": ["a", "b"]}}` attaches dataset attributes
//!
//! Member order is document order.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value as Json};

use crate::error::{IngestionError, IngestionResult};
use crate::types::Datum;

use super::{Container, Entry, RawArray};

const DATA_KEY: &str = "@data";
const ATTRS_KEY: &str = "@attrs";
const BYTES_KEY: &str = "@bytes";
const RECORD_KEY: &str = "@record";

/// A JSON document opened as a container.
#[derive(Debug, Clone)]
pub struct JsonContainer {
    root: Json,
}

impl JsonContainer {
    /// Parse the JSON file at `path`.
    pub fn open(path: impl AsRef<Path>) -> IngestionResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse an in-memory JSON document.
    pub fn parse(input: &str) -> IngestionResult<Self> {
        let root: Json = serde_json::from_str(input)?;
        if !is_group(&root) {
            return Err(IngestionError::Container {
                path: String::new(),
                message: "json container root must be an object".to_string(),
            });
        }
        Ok(Self { root })
    }

    fn node(&self, path: &str) -> IngestionResult<&Json> {
        let mut current = &self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .as_object()
                .filter(|_| is_group(current))
                .and_then(|obj| obj.get(segment))
                .ok_or_else(|| IngestionError::Container {
                    path: path.to_string(),
                    message: format!("no member '{segment}'"),
                })?;
        }
        Ok(current)
    }
}

impl Container for JsonContainer {
    fn entries(&self, group: &str) -> IngestionResult<Vec<Entry>> {
        let obj = self
            .node(group)?
            .as_object()
            .ok_or_else(|| IngestionError::Container {
                path: group.to_string(),
                message: "not a group".to_string(),
            })?;

        Ok(obj
            .iter()
            .map(|(name, v)| {
                if is_group(v) {
                    Entry::group(name)
                } else {
                    Entry::dataset(name)
                }
            })
            .collect())
    }

    fn read_array(&self, path: &str, column_names_attr: &str) -> IngestionResult<RawArray> {
        let node = self.node(path)?;
        let (data, attrs) = match node.as_object() {
            Some(obj) if obj.contains_key(DATA_KEY) => (&obj[DATA_KEY], obj.get(ATTRS_KEY)),
            _ => (node, None),
        };

        let mut array = array_from_json(path, data)?;
        if let Some(names) = attrs.and_then(|a| a.get(column_names_attr)) {
            array.column_names = Some(string_list(path, column_names_attr, names)?);
        }
        Ok(array)
    }
}

fn is_group(v: &Json) -> bool {
    match v {
        Json::Object(obj) => !obj.contains_key(DATA_KEY) && !is_tagged(obj),
        _ => false,
    }
}

fn is_tagged(obj: &Map<String, Json>) -> bool {
    obj.contains_key(BYTES_KEY) || obj.contains_key(RECORD_KEY)
}

fn array_from_json(path: &str, data: &Json) -> IngestionResult<RawArray> {
    match data {
        Json::Array(items) if !items.is_empty() && items.iter().all(is_record_object) => {
            structured_from_objects(path, items)
        }
        Json::Array(_) => {
            let mut elements = Vec::new();
            match regular_shape(data) {
                Some(shape) => {
                    flatten_into(path, data, &mut elements)?;
                    Ok(RawArray::new(shape, elements))
                }
                None => {
                    // Ragged: keep the outer axis, nest the rest.
                    let items = data.as_array().map(Vec::as_slice).unwrap_or_default();
                    for item in items {
                        elements.push(datum_from_json(path, item)?);
                    }
                    Ok(RawArray::new(vec![elements.len()], elements))
                }
            }
        }
        other => Ok(RawArray::scalar(datum_from_json(path, other)?)),
    }
}

fn is_record_object(v: &Json) -> bool {
    matches!(v, Json::Object(obj) if !is_tagged(obj))
}

fn structured_from_objects(path: &str, items: &[Json]) -> IngestionResult<RawArray> {
    let fields: Vec<String> = items[0]
        .as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default();

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let obj = item.as_object().ok_or_else(|| IngestionError::Container {
            path: path.to_string(),
            message: "record is not an object".to_string(),
        })?;
        let mut values = Vec::with_capacity(fields.len());
        for field in &fields {
            values.push(match obj.get(field) {
                Some(v) => datum_from_json(path, v)?,
                None => Datum::Missing,
            });
        }
        records.push(Datum::Record(values));
    }
    Ok(RawArray::structured(fields, records))
}

/// Shape of a nested array whose every level has equal-length children, `None` if ragged.
fn regular_shape(v: &Json) -> Option<Vec<usize>> {
    match v {
        Json::Array(items) => {
            let mut child_shape: Option<Vec<usize>> = None;
            for item in items {
                let s = regular_shape(item)?;
                match &child_shape {
                    None => child_shape = Some(s),
                    Some(prev) if *prev == s => {}
                    Some(_) => return None,
                }
            }
            let mut shape = vec![items.len()];
            shape.extend(child_shape.unwrap_or_default());
            Some(shape)
        }
        _ => Some(Vec::new()),
    }
}

fn flatten_into(path: &str, v: &Json, out: &mut Vec<Datum>) -> IngestionResult<()> {
    match v {
        Json::Array(items) => {
            for item in items {
                flatten_into(path, item, out)?;
            }
            Ok(())
        }
        other => {
            out.push(datum_from_json(path, other)?);
            Ok(())
        }
    }
}

fn datum_from_json(path: &str, v: &Json) -> IngestionResult<Datum> {
    Ok(match v {
        Json::Null => Datum::Missing,
        Json::Bool(b) => Datum::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Datum::Int(i),
            None => Datum::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Datum::Text(s.clone()),
        Json::Array(items) => Datum::Sequence(
            items
                .iter()
                .map(|item| datum_from_json(path, item))
                .collect::<IngestionResult<_>>()?,
        ),
        Json::Object(obj) => {
            if let Some(bytes) = obj.get(BYTES_KEY) {
                Datum::Bytes(byte_list(path, bytes)?)
            } else if let Some(Json::Array(fields)) = obj.get(RECORD_KEY) {
                Datum::Record(
                    fields
                        .iter()
                        .map(|f| datum_from_json(path, f))
                        .collect::<IngestionResult<_>>()?,
                )
            } else {
                return Err(IngestionError::Container {
                    path: path.to_string(),
                    message: "nested object is not a dataset element".to_string(),
                });
            }
        }
    })
}

fn byte_list(path: &str, v: &Json) -> IngestionResult<Vec<u8>> {
    let items = v.as_array().ok_or_else(|| IngestionError::Container {
        path: path.to_string(),
        message: format!("'{BYTES_KEY}' must be an array of bytes"),
    })?;
    items
        .iter()
        .map(|b| {
            b.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| IngestionError::Container {
                    path: path.to_string(),
                    message: format!("invalid byte {b}"),
                })
        })
        .collect()
}

fn string_list(path: &str, attr: &str, v: &Json) -> IngestionResult<Vec<String>> {
    let items = v.as_array().ok_or_else(|| IngestionError::Container {
        path: path.to_string(),
        message: format!("attribute '{attr}' must be an array of strings"),
    })?;
    items
        .iter()
        .map(|s| match s {
            Json::String(s) => Ok(s.clone()),
            other => Err(IngestionError::Container {
                path: path.to_string(),
                message: format!("attribute '{attr}' holds non-string {other}"),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::JsonContainer;
    use crate::container::{Container, Entry};
    use crate::types::Datum;

    const DOC: &str = r#"{
        "zeta": {"run2": [1, 2], "meta": {"@data": 3, "@attrs": {"column_names": ["n"]}}},
        "alpha": [[1, 2, 3], [4, 5, 6]],
        "ragged": [[1], [2, 3]],
        "table": [{"a": 1, "b": "x"}, {"b": "y", "a": 2}],
        "blob": {"@bytes": [104, 105]}
    }"#;

    #[test]
    fn groups_keep_document_order() {
        let c = JsonContainer::parse(DOC).unwrap();
        let root = c.entries("").unwrap();
        assert_eq!(
            root,
            vec![
                Entry::group("zeta"),
                Entry::dataset("alpha"),
                Entry::dataset("ragged"),
                Entry::dataset("table"),
                Entry::dataset("blob"),
            ]
        );
        assert_eq!(
            c.entries("zeta").unwrap(),
            vec![Entry::dataset("run2"), Entry::dataset("meta")]
        );
    }

    #[test]
    fn nested_arrays_define_rank() {
        let c = JsonContainer::parse(DOC).unwrap();
        let a = c.read_array("alpha", "column_names").unwrap();
        assert_eq!(a.shape, vec![2, 3]);
        assert_eq!(a.elements.len(), 6);
        assert_eq!(a.elements[3], Datum::Int(4));

        let r = c.read_array("ragged", "column_names").unwrap();
        assert_eq!(r.shape, vec![2]);
        assert_eq!(r.elements[1], Datum::Sequence(vec![Datum::Int(2), Datum::Int(3)]));
    }

    #[test]
    fn objects_become_records_with_first_object_field_order() {
        let c = JsonContainer::parse(DOC).unwrap();
        let t = c.read_array("table", "column_names").unwrap();
        assert_eq!(t.fields, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(
            t.elements[1],
            Datum::Record(vec![Datum::Int(2), Datum::Text("y".into())])
        );
    }

    #[test]
    fn attributes_and_tagged_values() {
        let c = JsonContainer::parse(DOC).unwrap();
        let m = c.read_array("zeta/meta", "column_names").unwrap();
        assert_eq!(m.column_names, Some(vec!["n".to_string()]));
        assert_eq!(m.elements, vec![Datum::Int(3)]);
        assert!(m.shape.is_empty());

        let b = c.read_array("blob", "column_names").unwrap();
        assert_eq!(b.elements, vec![Datum::Bytes(b"hi".to_vec())]);
    }

    #[test]
    fn non_object_root_is_rejected() {
        assert!(JsonContainer::parse("[1, 2]").is_err());
    }
}
