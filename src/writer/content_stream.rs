//! PDF content stream builder.
//!
//! Builds page content streams from text operators only (ISO 32000-1:2008 section 9.4).
//! Strings are written for a simple font with WinAnsiEncoding: ASCII passes through,
//! Latin-1 characters become octal escapes, anything else is replaced with `?`.

use std::fmt::Write as _;

/// Operations that can be added to a content stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentStreamOp {
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Set font and size (Tf)
    SetFont(String, f32),
    /// Move text position (Td)
    MoveText(f32, f32),
    /// Show text (Tj) - literal string
    ShowText(String),
}

/// Builder for PDF content streams.
#[derive(Debug, Clone, Default)]
pub struct ContentStreamBuilder {
    operations: Vec<ContentStreamOp>,
    in_text_object: bool,
}

impl ContentStreamBuilder {
    /// Create a new content stream builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation as-is.
    pub fn push(&mut self, op: ContentStreamOp) -> &mut Self {
        self.operations.push(op);
        self
    }

    /// Begin a text object.
    pub fn begin_text(&mut self) -> &mut Self {
        if !self.in_text_object {
            self.push(ContentStreamOp::BeginText);
            self.in_text_object = true;
        }
        self
    }

    /// End a text object.
    pub fn end_text(&mut self) -> &mut Self {
        if self.in_text_object {
            self.push(ContentStreamOp::EndText);
            self.in_text_object = false;
        }
        self
    }

    /// Select a font resource and size.
    pub fn set_font(&mut self, resource: &str, size: f32) -> &mut Self {
        self.push(ContentStreamOp::SetFont(resource.to_string(), size))
    }

    /// Move the text cursor relative to the start of the current line.
    pub fn move_text(&mut self, tx: f32, ty: f32) -> &mut Self {
        self.push(ContentStreamOp::MoveText(tx, ty))
    }

    /// Show a string at the cursor.
    pub fn show_text(&mut self, text: &str) -> &mut Self {
        self.push(ContentStreamOp::ShowText(text.to_string()))
    }

    /// Build the content stream to bytes. An open text object is closed.
    pub fn build(&self) -> Vec<u8> {
        let mut buf = String::new();
        for op in &self.operations {
            write_op(&mut buf, op);
            buf.push('\n');
        }
        if self.in_text_object {
            write_op(&mut buf, &ContentStreamOp::EndText);
            buf.push('\n');
        }
        buf.into_bytes()
    }
}

/// Write a single operation. Writing into a `String` cannot fail.
fn write_op(w: &mut String, op: &ContentStreamOp) {
    let _ = match op {
        ContentStreamOp::BeginText => write!(w, "BT"),
        ContentStreamOp::EndText => write!(w, "ET"),
        ContentStreamOp::SetFont(name, size) => write!(w, "/{} {} Tf", name, format_number(*size)),
        ContentStreamOp::MoveText(tx, ty) => {
            write!(w, "{} {} Td", format_number(*tx), format_number(*ty))
        },
        ContentStreamOp::ShowText(text) => {
            w.push('(');
            w.push_str(&escape_text(text));
            write!(w, ") Tj")
        },
    };
}

/// Format a coordinate without trailing zeros.
pub fn format_number(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        let formatted = format!("{:.3}", value);
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Escape text for a literal string operand.
///
/// Escapes backslash, parentheses, carriage return and newline. Tabs become a space,
/// other control characters are dropped.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push(' '),
            c if c.is_control() => {},
            c if c.is_ascii() => out.push(c),
            c => match win_ansi_byte(c) {
                Some(byte) => {
                    let _ = write!(out, "\\{:03o}", byte);
                },
                None => out.push('?'),
            },
        }
    }
    out
}

/// WinAnsiEncoding byte for a non-ASCII character, if it has one.
fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match c {
        '\u{2026}' => Some(0x85), // ellipsis
        '\u{2013}' => Some(0x96), // en dash
        '\u{2014}' => Some(0x97), // em dash
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201C}' => Some(0x93),
        '\u{201D}' => Some(0x94),
        '\u{2022}' => Some(0x95), // bullet
        '\u{20AC}' => Some(0x80), // euro
        _ if (0xA0..=0xFF).contains(&code) => Some(code as u8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_text() {
        let mut builder = ContentStreamBuilder::new();
        builder
            .begin_text()
            .set_font("F1", 12.0)
            .move_text(72.0, 720.0)
            .show_text("Hello, World!")
            .end_text();

        let content = String::from_utf8(builder.build()).unwrap();
        assert_eq!(content, "BT\n/F1 12 Tf\n72 720 Td\n(Hello, World!) Tj\nET\n");
    }

    #[test]
    fn test_unclosed_text_object_is_closed() {
        let mut builder = ContentStreamBuilder::new();
        builder.begin_text().begin_text().push(ContentStreamOp::ShowText("x".to_string()));
        let content = String::from_utf8(builder.build()).unwrap();
        assert_eq!(content, "BT\n(x) Tj\nET\n");
    }

    #[test]
    fn test_escaped_text() {
        assert_eq!(
            escape_text("Text with (parens) and \\backslash"),
            "Text with \\(parens\\) and \\\\backslash"
        );
        assert_eq!(escape_text("a\r\nb"), "a\\r\\nb");
    }

    #[test]
    fn test_latin1_and_unmappable() {
        assert_eq!(escape_text("café"), "caf\\351");
        assert_eq!(escape_text("日本"), "??");
        assert_eq!(escape_text("a\u{7}b\tc"), "ab c");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(10.5), "10.5");
    }
}
