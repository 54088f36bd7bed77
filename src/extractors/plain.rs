//! Plain text extraction.

use super::{ExtractedDocument, TextExtractor};
use crate::error::Result;

/// Decodes UTF-8 text (lossily) and splits it into lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedDocument> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let text = String::from_utf8_lossy(bytes);
        let text = text.replace("\r\n", "\n").replace('\r', "\n");

        let mut lines: Vec<String> = text.split('\n').map(|l| l.trim_end().to_string()).collect();
        if lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        Ok(ExtractedDocument::from_lines(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_endings_normalized() {
        let doc = PlainTextExtractor.extract(b"one\r\ntwo\rthree\n\nfour\n").unwrap();
        assert_eq!(doc.lines, vec!["one", "two", "three", "", "four"]);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let doc = PlainTextExtractor.extract(b"caf\xE9").unwrap();
        assert_eq!(doc.lines, vec!["caf\u{FFFD}"]);
    }

    #[test]
    fn test_empty_input() {
        let doc = PlainTextExtractor.extract(b"").unwrap();
        assert!(!doc.has_text());
    }
}
