//! Per-leaf transformation stages.
//!
//! A leaf read from a container goes through:
//!
//! - [`normalize()`]: classify the raw array ([`ArrayLayout`]), sanitize its values
//!   ([`sanitize()`]) and build a typed [`crate::types::Frame`]
//! - [`impute_missing()`]: fill absent numeric cells by linear interpolation
//!
//! ## Example
//!
//! ```rust
//! use h5_ingest::container::{LeafNode, RawArray};
//! use h5_ingest::processing::{impute_missing, normalize};
//! use h5_ingest::types::{Datum, Value};
//!
//! let leaf = LeafNode {
//!     path: "expA/run2".to_string(),
//!     array: RawArray::new(
//!         vec![3],
//!         vec![Datum::Float(1.0), Datum::Float(f64::NAN), Datum::Float(3.0)],
//!     ),
//! };
//! let mut frame = normalize(leaf).unwrap();
//! assert_eq!(frame.rows[0][1], Value::Null);
//!
//! // A rank-1 vector is one row; its gap is filled from the neighbouring elements.
//! assert_eq!(impute_missing(&mut frame), 1);
//! assert_eq!(frame.rows[0][1], Value::Float64(2.0));
//! ```

pub mod impute;
pub mod normalize;
pub mod sanitize;

pub use impute::{impute_missing, interpolate};
pub use normalize::{normalize, ArrayLayout};
pub use sanitize::{decode_bytes, sanitize, sanitize_all};
