//! Value sanitization: byte strings to text, opaque records to tuples.

use crate::types::Datum;

/// Sanitize one value, preserving its nesting shape.
///
/// - [`Datum::Bytes`] becomes [`Datum::Text`]: UTF-8 when the bytes are valid UTF-8, otherwise
///   the lowercase hex rendering of the whole byte string. Never fails.
/// - [`Datum::Record`] becomes a [`Datum::Tuple`] of its sanitized fields.
/// - Sequences and tuples are sanitized element-wise; everything else passes through.
///
/// The output contains no `Bytes` or `Record`, so sanitizing it again returns it unchanged.
pub fn sanitize(value: Datum) -> Datum {
    match value {
        Datum::Bytes(bytes) => Datum::Text(decode_bytes(&bytes)),
        Datum::Record(fields) | Datum::Tuple(fields) => Datum::Tuple(sanitize_all(fields)),
        Datum::Sequence(items) => Datum::Sequence(sanitize_all(items)),
        other => other,
    }
}

/// Sanitize every element of `values`.
pub fn sanitize_all(values: Vec<Datum>) -> Vec<Datum> {
    values.into_iter().map(sanitize).collect()
}

/// Decode a byte string to text, falling back to hex for invalid UTF-8.
pub fn decode_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|b| format!("{b:02x}")).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_bytes, sanitize};
    use crate::types::Datum;

    fn nested() -> Datum {
        Datum::Sequence(vec![
            Datum::Bytes(b"sensor-A".to_vec()),
            Datum::Record(vec![
                Datum::Int(3),
                Datum::Bytes(vec![0xff, 0x00, 0x10]),
                Datum::Record(vec![Datum::Float(0.25)]),
            ]),
            Datum::Missing,
            Datum::Text("kept".into()),
        ])
    }

    #[test]
    fn bytes_and_records_are_converted_in_place() {
        let out = sanitize(nested());
        assert_eq!(
            out,
            Datum::Sequence(vec![
                Datum::Text("sensor-A".into()),
                Datum::Tuple(vec![
                    Datum::Int(3),
                    Datum::Text("ff0010".into()),
                    Datum::Tuple(vec![Datum::Float(0.25)]),
                ]),
                Datum::Missing,
                Datum::Text("kept".into()),
            ])
        );
    }

    #[test]
    fn sanitizing_twice_equals_sanitizing_once() {
        let once = sanitize(nested());
        let twice = sanitize(once.clone());
        assert_eq!(once, twice);

        for v in [Datum::Int(1), Datum::Bool(false), Datum::Bytes(Vec::new()), Datum::Float(1.5)] {
            let once = sanitize(v);
            assert_eq!(sanitize(once.clone()), once);
        }
    }

    #[test]
    fn invalid_utf8_falls_back_to_hex() {
        assert_eq!(decode_bytes(b"ok"), "ok");
        assert_eq!(decode_bytes(&[0xc3, 0x28]), "c328");
        assert_eq!(decode_bytes(&[]), "");
    }
}
