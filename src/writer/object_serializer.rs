//! Byte-level serialization of [`Object`] values.
//!
//! Output follows the PDF 1.4 object syntax: literal strings for printable
//! ASCII, hex strings for anything else (UTF-16 titles in particular), names
//! with `#xx` escapes, and streams whose `/Length` is derived from their data.

use crate::object::{Dictionary, Object, ObjectRef};
use std::io::Write;

/// Serializes objects into byte buffers. Writing to a `Vec<u8>` cannot fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSerializer;

impl ObjectSerializer {
    /// Create a serializer.
    pub fn new() -> Self {
        Self
    }

    /// Serialize a direct object.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out, obj);
        out
    }

    /// Serialize a direct object as text. Lossy for binary strings and stream data.
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).into_owned()
    }

    /// Serialize `id gen obj ... endobj` with a trailing newline.
    pub fn serialize_indirect(&self, id: u32, gen: u16, obj: &Object) -> Vec<u8> {
        let mut out = Vec::new();
        let _ = writeln!(out, "{} {} obj", id, gen);
        self.write(&mut out, obj);
        out.extend_from_slice(b"\nendobj\n");
        out
    }

    fn write(&self, out: &mut Vec<u8>, obj: &Object) {
        match obj {
            Object::Integer(value) => {
                let _ = write!(out, "{}", value);
            },
            Object::Real(value) => out.extend_from_slice(format_real(*value).as_bytes()),
            Object::String(bytes) => write_string(out, bytes),
            Object::Name(name) => write_name(out, name),
            Object::Array(items) => {
                out.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    self.write(out, item);
                }
                out.push(b']');
            },
            Object::Dictionary(dict) => self.write_dict(out, dict, None),
            Object::Stream { dict, data } => {
                self.write_dict(out, dict, Some(data.len()));
                out.extend_from_slice(b"\nstream\n");
                out.extend_from_slice(data);
                out.extend_from_slice(b"\nendstream");
            },
            Object::Reference(reference) => {
                let _ = write!(out, "{}", reference);
            },
        }
    }

    /// Write `<<...>>`. With `length`, any `/Length` entry is replaced by it.
    fn write_dict(&self, out: &mut Vec<u8>, dict: &Dictionary, length: Option<usize>) {
        out.extend_from_slice(b"<<");
        let mut first = true;
        let entries = dict
            .iter()
            .filter(|(key, _)| length.is_none() || key.as_str() != "Length");
        for (key, value) in entries {
            if !first {
                out.push(b' ');
            }
            first = false;
            write_name(out, key);
            out.push(b' ');
            self.write(out, value);
        }
        if let Some(length) = length {
            if !first {
                out.push(b' ');
            }
            let _ = write!(out, "/Length {}", length);
        }
        out.extend_from_slice(b">>");
    }
}

/// Constructors for the values the assembler builds.
impl ObjectSerializer {
    /// Name object.
    pub fn name(name: &str) -> Object {
        Object::Name(name.to_string())
    }

    /// String object holding the bytes of `text`.
    pub fn string(text: &str) -> Object {
        Object::String(text.as_bytes().to_vec())
    }

    /// Integer object.
    pub fn integer(value: i64) -> Object {
        Object::from(value)
    }

    /// Dictionary object, entries kept in the given order.
    pub fn dict(entries: Vec<(&str, Object)>) -> Object {
        Object::Dictionary(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    /// Indirect reference.
    pub fn reference(id: u32, gen: u16) -> Object {
        Object::from(ObjectRef::new(id, gen))
    }

    /// Rectangle `[llx lly urx ury]` from an origin and a size.
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Object {
        Object::Array(
            [x, y, x + width, y + height]
                .into_iter()
                .map(Object::Real)
                .collect(),
        )
    }
}

/// Real numbers without exponent, integral values without a fraction.
fn format_real(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let formatted = format!("{:.5}", value);
    formatted.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn write_string(out: &mut Vec<u8>, bytes: &[u8]) {
    let literal = bytes.iter().all(|b| (0x20..0x7F).contains(b));
    if !literal {
        out.push(b'<');
        out.extend_from_slice(hex::encode_upper(bytes).as_bytes());
        out.push(b'>');
        return;
    }
    out.push(b'(');
    for &byte in bytes {
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out.push(b')');
}

/// Regular characters are written as-is; whitespace, delimiters, `#` and
/// non-ASCII bytes become `#xx`.
fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for byte in name.bytes() {
        let delimiter = b"()<>[]{}/%#".contains(&byte);
        if (0x21..0x7F).contains(&byte) && !delimiter {
            out.push(byte);
        } else {
            let _ = write!(out, "#{:02X}", byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(obj: &Object) -> String {
        ObjectSerializer::new().serialize_to_string(obj)
    }

    #[test]
    fn test_numbers() {
        assert_eq!(text(&Object::Integer(-123)), "-123");
        assert_eq!(text(&Object::Real(1.0)), "1");
        assert_eq!(text(&Object::Real(0.5)), "0.5");
        assert_eq!(text(&Object::Real(7.125)), "7.125");
    }

    #[test]
    fn test_literal_string_escapes() {
        assert_eq!(text(&ObjectSerializer::string("Hello")), "(Hello)");
        assert_eq!(text(&ObjectSerializer::string("a (b) \\ c")), "(a \\(b\\) \\\\ c)");
    }

    #[test]
    fn test_binary_string_is_hex() {
        assert_eq!(text(&Object::String(vec![0xFE, 0xFF, 0x00, 0xE9])), "<FEFF00E9>");
        assert_eq!(text(&ObjectSerializer::string("line\nbreak")), "<6C696E650A627265616B>");
    }

    #[test]
    fn test_name_escapes() {
        assert_eq!(text(&ObjectSerializer::name("Type")), "/Type");
        assert_eq!(text(&ObjectSerializer::name("Name With Space")), "/Name#20With#20Space");
        assert_eq!(text(&ObjectSerializer::name("a/b(c)")), "/a#2Fb#28c#29");
    }

    #[test]
    fn test_dictionary_keeps_insertion_order() {
        let dict = ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Page")),
            ("Count", ObjectSerializer::integer(1)),
            ("Parent", ObjectSerializer::reference(2, 0)),
        ]);
        assert_eq!(text(&dict), "<</Type /Page /Count 1 /Parent 2 0 R>>");
    }

    #[test]
    fn test_serialize_indirect() {
        let bytes = ObjectSerializer::new().serialize_indirect(1, 0, &Object::Integer(42));
        assert_eq!(bytes, b"1 0 obj\n42\nendobj\n");
    }

    #[test]
    fn test_stream_length_comes_from_data() {
        let mut dict = Dictionary::new();
        dict.insert("Length".to_string(), Object::Integer(999));
        dict.insert("Filter".to_string(), ObjectSerializer::name("None"));
        let stream = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"BT ET"),
        };
        assert_eq!(text(&stream), "<</Filter /None /Length 5>>\nstream\nBT ET\nendstream");

        let bare = Object::Stream {
            dict: Dictionary::new(),
            data: bytes::Bytes::from_static(b"x"),
        };
        assert_eq!(text(&bare), "<</Length 1>>\nstream\nx\nendstream");
    }

    #[test]
    fn test_rect() {
        let rect = ObjectSerializer::rect(0.0, 0.0, 612.0, 792.0);
        assert_eq!(text(&rect), "[0 0 612 792]");
    }
}
