//! HDF5 container backend (feature `hdf5`).
//!
//! Datasets are read in one call into a buffer whose layout is the C representation of the
//! file's element type, then decoded with [`super::decode`]. This covers numeric, boolean, enum,
//! fixed-string, fixed-array and compound element types without a compile-time Rust type per
//! dataset. Top-level variable-length strings are read through the typed API instead.

use std::path::Path;

use hdf5::types::{FloatSize, IntSize, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Dataset, Datatype, File, LocationType};
use hdf5_sys::h5d::H5Dread;
use hdf5_sys::h5p::H5P_DEFAULT;
use hdf5_sys::h5s::H5S_ALL;

use crate::error::{IngestionError, IngestionResult};
use crate::types::Datum;

use super::decode::{decode_elements, fold_array_dims, ElementType, Member};
use super::{Container, Entry, RawArray};

/// An HDF5 file opened read-only. The file is closed when this value is dropped.
pub struct Hdf5Container {
    file: File,
}

impl Hdf5Container {
    pub fn open(path: impl AsRef<Path>) -> IngestionResult<Self> {
        Ok(Self {
            file: File::open(path)?,
        })
    }
}

impl Container for Hdf5Container {
    fn entries(&self, group: &str) -> IngestionResult<Vec<Entry>> {
        let group = self.file.group(if group.is_empty() { "/" } else { group })?;
        let mut out = Vec::new();
        // Link-name order: the index every HDF5 file has, whether or not it tracks creation order.
        for name in group.member_names()? {
            match group.loc_type_by_name(&name)? {
                LocationType::Group => out.push(Entry::group(name)),
                LocationType::Dataset => out.push(Entry::dataset(name)),
                // Committed datatypes carry no rows.
                _ => {}
            }
        }
        Ok(out)
    }

    fn read_array(&self, path: &str, column_names_attr: &str) -> IngestionResult<RawArray> {
        let ds = self.file.dataset(path)?;
        let shape = ds.shape();
        let count = ds.size();
        let mem_desc = ds.dtype()?.to_descriptor()?.to_c_repr();
        let ty = element_type(path, &mem_desc)?;

        let mut array = match ty {
            ElementType::VarText => RawArray::new(shape, read_var_text(&ds, &mem_desc)?),
            ty => {
                let buf = read_native(path, &ds, &mem_desc, count)?;
                let elements = decode_elements(path, &buf, &ty, count)?;
                let (shape, elements) = fold_array_dims(shape, &ty, elements);
                RawArray {
                    shape,
                    fields: ty.field_names(),
                    elements,
                    column_names: None,
                }
            }
        };
        array.column_names = read_column_names(&ds, column_names_attr);
        Ok(array)
    }
}

fn element_type(path: &str, desc: &TypeDescriptor) -> IngestionResult<ElementType> {
    Ok(match desc {
        TypeDescriptor::Integer(size) => ElementType::Int {
            size: int_size(*size),
            signed: true,
        },
        TypeDescriptor::Unsigned(size) => ElementType::Int {
            size: int_size(*size),
            signed: false,
        },
        TypeDescriptor::Float(size) => ElementType::Float {
            size: float_size(*size),
        },
        TypeDescriptor::Boolean => ElementType::Bool,
        TypeDescriptor::Enum(e) => ElementType::Int {
            size: int_size(e.size),
            signed: e.signed,
        },
        TypeDescriptor::FixedAscii(n) | TypeDescriptor::FixedUnicode(n) => ElementType::FixedText { size: *n },
        TypeDescriptor::VarLenAscii | TypeDescriptor::VarLenUnicode => ElementType::VarText,
        TypeDescriptor::FixedArray(inner, len) => ElementType::Array {
            inner: Box::new(element_type(path, inner)?),
            len: *len,
        },
        TypeDescriptor::Compound(c) => {
            let mut members = Vec::with_capacity(c.fields.len());
            for f in &c.fields {
                members.push(Member {
                    name: f.name.clone(),
                    offset: f.offset,
                    ty: element_type(path, &f.ty)?,
                });
            }
            ElementType::Compound { size: c.size, members }
        }
        other => {
            return Err(IngestionError::UnsupportedType {
                path: path.to_string(),
                type_name: format!("{other:?}"),
            });
        }
    })
}

fn int_size(size: IntSize) -> usize {
    match size {
        IntSize::U1 => 1,
        IntSize::U2 => 2,
        IntSize::U4 => 4,
        IntSize::U8 => 8,
    }
}

fn float_size(size: FloatSize) -> usize {
    match size {
        FloatSize::U4 => 4,
        FloatSize::U8 => 8,
        // Half precision (behind the crate's `f16` feature); the decoder rejects it.
        #[allow(unreachable_patterns)]
        _ => 2,
    }
}

fn read_native(path: &str, ds: &Dataset, mem_desc: &TypeDescriptor, count: usize) -> IngestionResult<Vec<u8>> {
    let mem_type = Datatype::from_descriptor(mem_desc)?;
    let mut buf = vec![0u8; count * mem_type.size()];
    if buf.is_empty() {
        return Ok(buf);
    }

    // SAFETY: `buf` holds `count` elements of `mem_type`, the full extent selected by H5S_ALL,
    // and both ids stay open for the duration of the call.
    let status = unsafe {
        H5Dread(
            ds.id(),
            mem_type.id(),
            H5S_ALL,
            H5S_ALL,
            H5P_DEFAULT,
            buf.as_mut_ptr().cast(),
        )
    };
    if status < 0 {
        return Err(IngestionError::Container {
            path: path.to_string(),
            message: "H5Dread failed".to_string(),
        });
    }
    Ok(buf)
}

fn read_var_text(ds: &Dataset, desc: &TypeDescriptor) -> IngestionResult<Vec<Datum>> {
    Ok(match desc {
        TypeDescriptor::VarLenAscii => ds
            .read_raw::<VarLenAscii>()?
            .iter()
            .map(|s| Datum::Text(s.as_str().to_string()))
            .collect(),
        _ => ds
            .read_raw::<VarLenUnicode>()?
            .iter()
            .map(|s| Datum::Text(s.as_str().to_string()))
            .collect(),
    })
}

/// Explicit column names stored as a string-array attribute; absent or unreadable means none.
fn read_column_names(ds: &Dataset, attr: &str) -> Option<Vec<String>> {
    if !ds.attr_names().ok()?.iter().any(|n| n == attr) {
        return None;
    }
    let a = ds.attr(attr).ok()?;
    if let Ok(names) = a.read_raw::<VarLenUnicode>() {
        return Some(names.iter().map(|s| s.as_str().to_string()).collect());
    }
    a.read_raw::<VarLenAscii>()
        .ok()
        .map(|names| names.iter().map(|s| s.as_str().to_string()).collect())
}
