//! Text extraction from downloaded documents.
//!
//! Each supported source format has a [`TextExtractor`] that turns raw bytes
//! into ordered text lines ready for pagination. Format detection looks at
//! magic bytes first and falls back to the file extension and content type.

#[cfg(feature = "office")]
mod docx;
mod plain;
mod spreadsheet;

#[cfg(feature = "office")]
pub use docx::DocxExtractor;
pub use plain::PlainTextExtractor;
#[cfg(feature = "office")]
pub use spreadsheet::SpreadsheetExtractor;
pub use spreadsheet::{render_table, CsvExtractor, MAX_CELL_CHARS};

use crate::error::Result;
use serde::Serialize;

/// How much leading whitespace may precede `%PDF-`, and how close to the end
/// `%%EOF` must be.
pub const PDF_MAGIC_WINDOW: usize = 1024;

const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_EOF: &[u8] = b"%%EOF";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Text pulled out of a source document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedDocument {
    /// Lines in reading order
    pub lines: Vec<String>,
    /// Widest line the layout should try to keep intact, e.g. a table row
    pub line_width_hint: Option<usize>,
    /// Lines were rendered as text tables; complete rows must not be wrapped
    pub tabular: bool,
}

impl ExtractedDocument {
    /// Document from plain lines.
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            line_width_hint: None,
            tabular: false,
        }
    }

    /// True when at least one line has visible content.
    pub fn has_text(&self) -> bool {
        self.lines.iter().any(|line| !line.trim().is_empty())
    }
}

/// Converts source bytes into text lines.
pub trait TextExtractor {
    /// Extract text from a complete document buffer.
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedDocument>;
}

/// Source formats recognised by [`detect_format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Already a PDF
    Pdf,
    /// Word processing document
    Docx,
    /// XLSX, XLS or ODS workbook
    Spreadsheet,
    /// Comma separated values
    Csv,
    /// Plain text or Markdown
    PlainText,
}

impl SourceFormat {
    /// Short lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Pdf => "pdf",
            SourceFormat::Docx => "docx",
            SourceFormat::Spreadsheet => "spreadsheet",
            SourceFormat::Csv => "csv",
            SourceFormat::PlainText => "text",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work out the format of `bytes`.
///
/// Order: a PDF header at the start (after an optional BOM and whitespace) with
/// `%%EOF` near the end, ZIP containers by their parts, legacy `.xls` by extension, CSV, then text. Returns `None`
/// for anything unsupported.
pub fn detect_format(bytes: &[u8], file_name: &str, content_type: Option<&str>) -> Option<SourceFormat> {
    if is_pdf(bytes) {
        return Some(SourceFormat::Pdf);
    }

    let extension = extension(file_name);
    let mime = content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .unwrap_or_default();

    if bytes.starts_with(ZIP_MAGIC) {
        return detect_zip(bytes);
    }
    if extension == "xls" || (bytes.starts_with(OLE_MAGIC) && mime.contains("excel")) {
        return spreadsheet_format();
    }
    if extension == "csv" || mime == "text/csv" || mime == "application/csv" {
        return Some(SourceFormat::Csv);
    }
    if mime.starts_with("text/") || matches!(extension.as_str(), "txt" | "md" | "markdown" | "text")
    {
        return Some(SourceFormat::PlainText);
    }
    None
}

/// A PDF starts with its header and ends with `%%EOF`. Text that merely
/// mentions `%PDF-` is not one.
fn is_pdf(bytes: &[u8]) -> bool {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let lead = body
        .iter()
        .take(PDF_MAGIC_WINDOW)
        .take_while(|b| b.is_ascii_whitespace())
        .count();
    if !body[lead..].starts_with(PDF_MAGIC) {
        return false;
    }
    let tail = &bytes[bytes.len().saturating_sub(PDF_MAGIC_WINDOW)..];
    tail.windows(PDF_EOF.len()).any(|w| w == PDF_EOF)
}

/// Extractor for a format. `None` for [`SourceFormat::Pdf`], which needs none,
/// and for formats whose support is compiled out.
pub fn extractor_for(format: SourceFormat) -> Option<Box<dyn TextExtractor>> {
    match format {
        SourceFormat::Pdf => None,
        #[cfg(feature = "office")]
        SourceFormat::Docx => Some(Box::new(DocxExtractor)),
        #[cfg(feature = "office")]
        SourceFormat::Spreadsheet => Some(Box::new(SpreadsheetExtractor)),
        #[cfg(not(feature = "office"))]
        SourceFormat::Docx | SourceFormat::Spreadsheet => None,
        SourceFormat::Csv => Some(Box::new(CsvExtractor)),
        SourceFormat::PlainText => Some(Box::new(PlainTextExtractor)),
    }
}

fn extension(file_name: &str) -> String {
    let name = file_name.rsplit('/').next().unwrap_or(file_name);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

#[cfg(feature = "office")]
fn spreadsheet_format() -> Option<SourceFormat> {
    Some(SourceFormat::Spreadsheet)
}

#[cfg(not(feature = "office"))]
fn spreadsheet_format() -> Option<SourceFormat> {
    None
}

#[cfg(feature = "office")]
fn detect_zip(bytes: &[u8]) -> Option<SourceFormat> {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).ok()?;
    if archive.index_for_name("word/document.xml").is_some() {
        return Some(SourceFormat::Docx);
    }
    if archive.index_for_name("xl/workbook.xml").is_some() {
        return Some(SourceFormat::Spreadsheet);
    }

    let mut mimetype = String::new();
    if let Ok(mut file) = archive.by_name("mimetype") {
        file.read_to_string(&mut mimetype).ok()?;
    }
    if mimetype.trim() == "application/vnd.oasis.opendocument.spreadsheet" {
        return Some(SourceFormat::Spreadsheet);
    }
    if archive
        .file_names()
        .any(|n| n.starts_with("word/document") && n.ends_with(".xml"))
    {
        return Some(SourceFormat::Docx);
    }
    None
}

#[cfg(not(feature = "office"))]
fn detect_zip(_bytes: &[u8]) -> Option<SourceFormat> {
    None
}
