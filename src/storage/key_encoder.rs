//! Object key encoding.
//!
//! The same encoded key is used in the request path and in the SigV4 canonical URI, so
//! both must agree byte-for-byte. S3 does not re-encode the path, which means every
//! segment is encoded exactly once here and nowhere else.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters encoded inside a key segment.
///
/// Everything outside the RFC 3986 unreserved set (`A-Z a-z 0-9 - _ . ~`). The second
/// block lists the characters that break SigV4 canonicalization when left literal; each
/// becomes its fixed `%XX` form (`!`→`%21`, `'`→`%27`, `(`→`%28`, `)`→`%29`,
/// `*`→`%2A`, `[`→`%5B`, `]`→`%5D`, `{`→`%7B`, `}`→`%7D`, `#`→`%23`, `?`→`%3F`,
/// `&`→`%26`, `=`→`%3D`, `+`→`%2B`). Space is always `%20`.
const KEY_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'[')
    .add(b']')
    .add(b'{')
    .add(b'}')
    .add(b'#')
    .add(b'?')
    .add(b'&')
    .add(b'=')
    .add(b'+')
    .add(b'"')
    .add(b'$')
    .add(b'%')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'>')
    .add(b'@')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'|');

/// Encode a raw object key for use in a request path.
///
/// A key that is already percent-encoded is decoded once first, so callers may pass
/// either form. Path structure is preserved: `/` separators are never encoded.
///
/// ```
/// use pdf_courier::storage::encode_key;
///
/// assert_eq!(encode_key("My File (v2).docx"), "My%20File%20%28v2%29.docx");
/// assert_eq!(encode_key("a/b c/d"), "a/b%20c/d");
/// ```
pub fn encode_key(key: &str) -> String {
    let decoded = decode_once(key);
    decoded
        .split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// True when the key has a `.` or `..` segment. URL parsers resolve those
/// segments, literal or as `%2E`, so the path sent would not be the one signed.
pub fn has_dot_segment(key: &str) -> bool {
    decode_once(key)
        .split('/')
        .any(|segment| segment == "." || segment == "..")
}

/// Percent-encode a single path segment.
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, KEY_SEGMENT).to_string()
}

/// Best-effort single decode. Falls back to the raw key when the decoded bytes are not
/// valid UTF-8.
fn decode_once(key: &str) -> String {
    if !key.contains('%') {
        return key.to_string();
    }
    match percent_decode_str(key).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => key.to_string(),
    }
}
