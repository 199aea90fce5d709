//! Decoding of native-layout element buffers.
//!
//! Binary backends read a dataset's full extent into one byte buffer laid out as C structs in
//! host byte order, then describe the element layout with an [`ElementType`]. This module turns
//! such a buffer into [`Datum`] values without touching the backend library.

use crate::error::{IngestionError, IngestionResult};
use crate::types::Datum;

/// In-memory layout of one array element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementType {
    /// Integer of `size` bytes (1, 2, 4 or 8).
    Int { size: usize, signed: bool },
    /// IEEE float of `size` bytes (4 or 8).
    Float { size: usize },
    /// One-byte boolean.
    Bool,
    /// Fixed-length, NUL-padded byte string.
    FixedText { size: usize },
    /// Variable-length string stored out of line; cannot be decoded from the element buffer.
    VarText,
    /// Fixed-length array of `len` inner elements.
    Array { inner: Box<ElementType>, len: usize },
    /// Structured record with named members at fixed offsets.
    Compound { size: usize, members: Vec<Member> },
}

/// One named member of a compound element.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub offset: usize,
    pub ty: ElementType,
}

impl ElementType {
    /// Size in bytes of one element.
    pub fn size(&self) -> usize {
        match self {
            ElementType::Int { size, .. } | ElementType::Float { size } | ElementType::FixedText { size } => *size,
            ElementType::Bool => 1,
            ElementType::VarText => std::mem::size_of::<usize>(),
            ElementType::Array { inner, len } => inner.size() * len,
            ElementType::Compound { size, .. } => *size,
        }
    }

    /// Member names, if this is a structured element type.
    pub fn field_names(&self) -> Option<Vec<String>> {
        match self {
            ElementType::Compound { members, .. } => Some(members.iter().map(|m| m.name.clone()).collect()),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            ElementType::Int { size, signed: true } => format!("int{}", size * 8),
            ElementType::Int { size, signed: false } => format!("uint{}", size * 8),
            ElementType::Float { size } => format!("float{}", size * 8),
            ElementType::Bool => "bool".to_string(),
            ElementType::FixedText { size } => format!("fixed string[{size}]"),
            ElementType::VarText => "variable-length string".to_string(),
            ElementType::Array { inner, len } => format!("{}[{len}]", inner.describe()),
            ElementType::Compound { members, .. } => format!("compound({} members)", members.len()),
        }
    }
}

/// Decode `count` consecutive elements of type `ty` from `buf`.
///
/// Compound elements decode to [`Datum::Record`], fixed arrays to [`Datum::Sequence`] and fixed
/// strings to [`Datum::Bytes`] with trailing NULs removed.
pub fn decode_elements(path: &str, buf: &[u8], ty: &ElementType, count: usize) -> IngestionResult<Vec<Datum>> {
    let size = ty.size();
    let needed = size.checked_mul(count).ok_or_else(|| IngestionError::Container {
        path: path.to_string(),
        message: "element buffer size overflows".to_string(),
    })?;
    if buf.len() < needed {
        return Err(IngestionError::Container {
            path: path.to_string(),
            message: format!("buffer holds {} bytes, {count} elements need {needed}", buf.len()),
        });
    }

    (0..count)
        .map(|i| decode_one(path, &buf[i * size..(i + 1) * size], ty))
        .collect()
}

/// Move fixed-array element dimensions into the dataset shape, outermost first.
///
/// An `(N,)` dataset of `int32[3]` elements becomes an `(N, 3)` array of plain integers, the way
/// array-typed datasets read elsewhere. Other element types pass through unchanged.
pub fn fold_array_dims(mut shape: Vec<usize>, ty: &ElementType, mut elements: Vec<Datum>) -> (Vec<usize>, Vec<Datum>) {
    let mut ty = ty;
    while let ElementType::Array { inner, len } = ty {
        shape.push(*len);
        elements = elements
            .into_iter()
            .flat_map(|e| match e {
                Datum::Sequence(items) => items,
                other => vec![other],
            })
            .collect();
        ty = inner.as_ref();
    }
    (shape, elements)
}

fn decode_one(path: &str, bytes: &[u8], ty: &ElementType) -> IngestionResult<Datum> {
    match ty {
        ElementType::Int { size, signed } => decode_int(path, bytes, *size, *signed, ty),
        ElementType::Float { size: 4 } => Ok(Datum::Float(f32::from_ne_bytes(take(bytes)) as f64)),
        ElementType::Float { size: 8 } => Ok(Datum::Float(f64::from_ne_bytes(take(bytes)))),
        ElementType::Bool => Ok(Datum::Bool(bytes[0] != 0)),
        ElementType::FixedText { .. } => {
            let end = bytes.iter().rposition(|b| *b != 0).map(|i| i + 1).unwrap_or(0);
            Ok(Datum::Bytes(bytes[..end].to_vec()))
        }
        ElementType::Array { inner, len } => decode_elements(path, bytes, inner, *len).map(Datum::Sequence),
        ElementType::Compound { members, .. } => {
            let mut values = Vec::with_capacity(members.len());
            for m in members {
                let end = m.offset + m.ty.size();
                let slice = bytes.get(m.offset..end).ok_or_else(|| IngestionError::Container {
                    path: path.to_string(),
                    message: format!("member '{}' lies outside its record", m.name),
                })?;
                values.push(decode_one(path, slice, &m.ty)?);
            }
            Ok(Datum::Record(values))
        }
        ElementType::Float { .. } | ElementType::VarText => Err(unsupported(path, ty)),
    }
}

fn decode_int(path: &str, bytes: &[u8], size: usize, signed: bool, ty: &ElementType) -> IngestionResult<Datum> {
    let v = match (size, signed) {
        (1, true) => i8::from_ne_bytes(take(bytes)) as i64,
        (2, true) => i16::from_ne_bytes(take(bytes)) as i64,
        (4, true) => i32::from_ne_bytes(take(bytes)) as i64,
        (8, true) => i64::from_ne_bytes(take(bytes)),
        (1, false) => u8::from_ne_bytes(take(bytes)) as i64,
        (2, false) => u16::from_ne_bytes(take(bytes)) as i64,
        (4, false) => u32::from_ne_bytes(take(bytes)) as i64,
        (8, false) => {
            let v = u64::from_ne_bytes(take(bytes));
            // Values past i64::MAX do not fit a BIGINT column.
            return Ok(match i64::try_from(v) {
                Ok(v) => Datum::Int(v),
                Err(_) => Datum::Float(v as f64),
            });
        }
        _ => return Err(unsupported(path, ty)),
    };
    Ok(Datum::Int(v))
}

fn take<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

fn unsupported(path: &str, ty: &ElementType) -> IngestionError {
    IngestionError::UnsupportedType {
        path: path.to_string(),
        type_name: ty.describe(),
    }
}
