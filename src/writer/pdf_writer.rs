//! PDF document writer.
//!
//! Assembles complete PDF 1.4 documents with proper structure:
//! header, body, xref table, and trailer.
//!
//! Object numbering is fixed: 1 is the catalog, 2 the page tree, then one
//! page/content-stream pair per page, then the optional info dictionary.
//! Writing happens in two passes. Pass one builds every object body, pass
//! two concatenates them while recording byte offsets. The result is then
//! re-read by [`verify_structure`] before it is handed out.

use super::content_stream::ContentStreamBuilder;
use super::object_serializer::ObjectSerializer;
use super::paginator::Page;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use std::io::Write;

/// PDF version written in the header.
pub const PDF_VERSION: &str = "1.4";

/// Producer string written into the info dictionary.
pub const PRODUCER: &str = concat!("pdf_courier ", env!("CARGO_PKG_VERSION"));

const CATALOG_ID: u32 = 1;
const PAGES_ID: u32 = 2;
const FONT_RESOURCE: &str = "F1";

/// Standard 14 fonts usable without embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StandardFont {
    /// Fixed-pitch, keeps table columns aligned
    #[default]
    Courier,
    /// Proportional sans-serif
    Helvetica,
}

impl StandardFont {
    /// PostScript name used as `/BaseFont`.
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Courier => "Courier",
            StandardFont::Helvetica => "Helvetica",
        }
    }

    /// Average glyph advance as a fraction of the font size.
    fn advance_ratio(&self) -> f32 {
        match self {
            StandardFont::Courier => 0.6,
            StandardFont::Helvetica => 0.5,
        }
    }
}

/// Page layout used for synthesized documents.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Margin on every side in points
    pub margin: f32,
    /// Font size in points
    pub font_size: f32,
    /// Distance between baselines in points
    pub line_height: f32,
    /// Font used for every line
    pub font: StandardFont,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::letter()
    }
}

impl PageGeometry {
    /// US Letter, 50 pt margins, Courier 10 pt on 12 pt leading.
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            margin: 50.0,
            font_size: 10.0,
            line_height: 12.0,
            font: StandardFont::Courier,
        }
    }

    /// A4 with the same margins and font as [`PageGeometry::letter`].
    pub fn a4() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
            ..Self::letter()
        }
    }

    /// Switch the font.
    pub fn with_font(mut self, font: StandardFont) -> Self {
        self.font = font;
        self
    }

    /// Set font size and leading together.
    pub fn with_font_size(mut self, font_size: f32, line_height: f32) -> Self {
        self.font_size = font_size;
        self.line_height = line_height;
        self
    }

    /// Characters that fit between the side margins (at least 1).
    pub fn max_chars_per_line(&self) -> usize {
        let usable = self.width - 2.0 * self.margin;
        let advance = self.font_size * self.font.advance_ratio();
        if usable <= 0.0 || advance <= 0.0 {
            return 1;
        }
        ((usable / advance).floor() as usize).max(1)
    }

    /// Lines that fit between the top and bottom margins (at least 1).
    pub fn max_lines_per_page(&self) -> usize {
        let usable = self.height - 2.0 * self.margin;
        if usable <= 0.0 || self.line_height <= 0.0 {
            return 1;
        }
        ((usable / self.line_height).floor() as usize).max(1)
    }

    /// Baseline of the first line.
    fn first_baseline(&self) -> f32 {
        self.height - self.margin - self.font_size
    }
}

/// One indirect object of the output.
#[derive(Debug, Clone)]
pub struct PdfObject {
    /// Object number
    pub id: u32,
    /// Offset of `id 0 obj` in the output, known after pass two
    pub byte_offset: usize,
    /// Serialized `id 0 obj ... endobj` block
    pub body: Vec<u8>,
}

/// Objects of a document in write order.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    /// Objects, ids ascending from 1
    pub objects: Vec<PdfObject>,
    /// Id referenced by the trailer's `/Root`
    pub trailer_root_id: u32,
    /// Id of the info dictionary, when written
    pub info_id: Option<u32>,
}

impl PdfDocument {
    /// Pass two: concatenate objects, record offsets, append xref and trailer.
    pub fn write(&mut self) -> Result<Vec<u8>> {
        let serializer = ObjectSerializer::new();
        let mut output = Vec::new();

        writeln!(output, "%PDF-{}", PDF_VERSION)?;
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        for object in &mut self.objects {
            object.byte_offset = output.len();
            output.extend_from_slice(&object.body);
        }

        let size = self.objects.len() + 1;
        let xref_start = output.len();
        writeln!(output, "xref")?;
        writeln!(output, "0 {}", size)?;
        output.extend_from_slice(b"0000000000 65535 f \n");
        for object in &self.objects {
            write!(output, "{:010} 00000 n \n", object.byte_offset)?;
        }

        let mut trailer = vec![
            ("Size", ObjectSerializer::integer(size as i64)),
            ("Root", ObjectSerializer::reference(self.trailer_root_id, 0)),
        ];
        if let Some(info_id) = self.info_id {
            trailer.push(("Info", ObjectSerializer::reference(info_id, 0)));
        }

        writeln!(output, "trailer")?;
        output.extend_from_slice(&serializer.serialize(&ObjectSerializer::dict(trailer)));
        writeln!(output)?;
        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        writeln!(output, "%%EOF")?;

        Ok(output)
    }
}

/// Builds minimal text-only PDFs from paginated lines.
#[derive(Debug, Clone, Default)]
pub struct PdfAssembler {
    geometry: PageGeometry,
    title: Option<String>,
}

impl PdfAssembler {
    /// Create an assembler for the given geometry.
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            title: None,
        }
    }

    /// Write an info dictionary with this title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Geometry in use.
    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Assemble and verify a complete PDF.
    ///
    /// An empty page list still produces one blank page.
    pub fn assemble(&self, pages: &[Page]) -> Result<Vec<u8>> {
        let mut document = self.build_document(pages);
        let bytes = document.write()?;
        verify_structure(&bytes)?;
        log::debug!(
            "assembled PDF: {} page(s), {} object(s), {} bytes",
            pages.len().max(1),
            document.objects.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Pass one: build every object body.
    pub fn build_document(&self, pages: &[Page]) -> PdfDocument {
        let serializer = ObjectSerializer::new();
        let blank = [Page::new()];
        let pages = if pages.is_empty() { &blank[..] } else { pages };

        let page_ids: Vec<(u32, u32)> = (0..pages.len() as u32)
            .map(|i| (PAGES_ID + 1 + 2 * i, PAGES_ID + 2 + 2 * i))
            .collect();
        let next_id = PAGES_ID + 1 + 2 * pages.len() as u32;

        let catalog = ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Catalog")),
            ("Pages", ObjectSerializer::reference(PAGES_ID, 0)),
        ]);
        let kids = page_ids
            .iter()
            .map(|(page_id, _)| Object::Reference(ObjectRef::new(*page_id, 0)))
            .collect();
        let page_tree = ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Pages")),
            ("Kids", Object::Array(kids)),
            ("Count", ObjectSerializer::integer(pages.len() as i64)),
        ]);

        let mut objects = vec![
            PdfObject {
                id: CATALOG_ID,
                byte_offset: 0,
                body: serializer.serialize_indirect(CATALOG_ID, 0, &catalog),
            },
            PdfObject {
                id: PAGES_ID,
                byte_offset: 0,
                body: serializer.serialize_indirect(PAGES_ID, 0, &page_tree),
            },
        ];

        for (page, (page_id, content_id)) in pages.iter().zip(&page_ids) {
            let page_obj = ObjectSerializer::dict(vec![
                ("Type", ObjectSerializer::name("Page")),
                ("Parent", ObjectSerializer::reference(PAGES_ID, 0)),
                (
                    "MediaBox",
                    ObjectSerializer::rect(
                        0.0,
                        0.0,
                        self.geometry.width as f64,
                        self.geometry.height as f64,
                    ),
                ),
                ("Resources", self.resources()),
                ("Contents", ObjectSerializer::reference(*content_id, 0)),
            ]);
            let content = Object::Stream {
                dict: Dictionary::new(),
                data: bytes::Bytes::from(self.page_content(page)),
            };
            objects.push(PdfObject {
                id: *page_id,
                byte_offset: 0,
                body: serializer.serialize_indirect(*page_id, 0, &page_obj),
            });
            objects.push(PdfObject {
                id: *content_id,
                byte_offset: 0,
                body: serializer.serialize_indirect(*content_id, 0, &content),
            });
        }

        let info_id = self.title.as_ref().map(|title| {
            let info = ObjectSerializer::dict(vec![
                ("Title", Object::String(text_string(title))),
                ("Producer", ObjectSerializer::string(PRODUCER)),
            ]);
            objects.push(PdfObject {
                id: next_id,
                byte_offset: 0,
                body: serializer.serialize_indirect(next_id, 0, &info),
            });
            next_id
        });

        PdfDocument {
            objects,
            trailer_root_id: CATALOG_ID,
            info_id,
        }
    }

    /// Page resources with the single direct font dictionary.
    fn resources(&self) -> Object {
        let font = ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Font")),
            ("Subtype", ObjectSerializer::name("Type1")),
            ("BaseFont", ObjectSerializer::name(self.geometry.font.base_font())),
            ("Encoding", ObjectSerializer::name("WinAnsiEncoding")),
        ]);
        ObjectSerializer::dict(vec![(
            "Font",
            ObjectSerializer::dict(vec![(FONT_RESOURCE, font)]),
        )])
    }

    /// Content stream for one page.
    fn page_content(&self, page: &Page) -> Vec<u8> {
        let geometry = &self.geometry;
        let max_chars = geometry.max_chars_per_line();

        let mut builder = ContentStreamBuilder::new();
        builder
            .begin_text()
            .set_font(FONT_RESOURCE, geometry.font_size)
            .move_text(geometry.margin, geometry.first_baseline());
        for (i, line) in page.iter().enumerate() {
            if i > 0 {
                builder.move_text(0.0, -geometry.line_height);
            }
            let capped: String = line.chars().take(max_chars).collect();
            builder.show_text(&capped);
        }
        builder.end_text();
        builder.build()
    }
}

/// Encode a text string: plain bytes for ASCII, UTF-16BE with BOM otherwise.
fn text_string(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        return text.as_bytes().to_vec();
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Re-read an assembled PDF and check its structural invariants.
///
/// Checks the header and `%%EOF` marker, that `startxref` points at the xref
/// table, that every in-use xref entry points at `N 0 obj`, that the trailer's
/// `/Root` is `1 0 R`, and that every stream's `/Length` equals its body.
pub fn verify_structure(bytes: &[u8]) -> Result<()> {
    let fail = |msg: String| Err(Error::Assembly(msg));

    if !bytes.starts_with(b"%PDF-") {
        return fail("missing %PDF- header".to_string());
    }
    if !bytes.ends_with(b"%%EOF\n") {
        return fail("missing trailing %%EOF".to_string());
    }

    let startxref = match find_last(bytes, b"startxref\n") {
        Some(pos) => pos,
        None => return fail("missing startxref".to_string()),
    };
    let xref_offset = match parse_leading_number(&bytes[startxref + 10..]) {
        Some(offset) => offset as usize,
        None => return fail("unreadable startxref offset".to_string()),
    };
    if !bytes.get(xref_offset..).is_some_and(|rest| rest.starts_with(b"xref\n")) {
        return fail(format!("startxref {} does not point at xref", xref_offset));
    }

    let mut cursor = xref_offset + 5;
    let header_end = match find_from(bytes, b"\n", cursor) {
        Some(end) => end,
        None => return fail("truncated xref subsection header".to_string()),
    };
    let header = String::from_utf8_lossy(&bytes[cursor..header_end]).to_string();
    let mut parts = header.split_whitespace();
    let (first, count) = match (
        parts.next().and_then(|p| p.parse::<u32>().ok()),
        parts.next().and_then(|p| p.parse::<usize>().ok()),
    ) {
        (Some(first), Some(count)) => (first, count),
        _ => return fail(format!("bad xref subsection header {:?}", header)),
    };
    cursor = header_end + 1;

    let mut offsets = Vec::with_capacity(count);
    for i in 0..count {
        let entry = match bytes.get(cursor..cursor + 20) {
            Some(entry) => entry,
            None => return fail("truncated xref table".to_string()),
        };
        cursor += 20;
        let id = match u32::try_from(i).ok().and_then(|i| first.checked_add(i)) {
            Some(id) => id,
            None => return fail("xref object numbers overflow".to_string()),
        };
        if entry[17] != b'n' {
            continue;
        }
        let offset = match parse_leading_number(&entry[..10]) {
            Some(offset) => offset as usize,
            None => return fail(format!("bad xref entry for object {}", id)),
        };
        let marker = format!("{} 0 obj", id);
        if !bytes.get(offset..).is_some_and(|rest| rest.starts_with(marker.as_bytes())) {
            return fail(format!("xref offset {} does not point at object {}", offset, id));
        }
        offsets.push((id, offset));
    }

    let trailer = match bytes.get(cursor..startxref) {
        Some(trailer) => trailer,
        None => return fail("xref table runs past startxref".to_string()),
    };
    if find_from(trailer, b"/Root 1 0 R", 0).is_none() {
        return fail("trailer /Root is not 1 0 R".to_string());
    }

    offsets.sort_by_key(|(_, offset)| *offset);
    let mut ends: Vec<usize> = offsets.iter().skip(1).map(|(_, offset)| *offset).collect();
    ends.push(xref_offset);
    for ((id, offset), end) in offsets.into_iter().zip(ends) {
        if end < offset {
            return fail(format!("object {} overlaps the xref table", id));
        }
        verify_stream_length(id, &bytes[offset..end])?;
    }

    Ok(())
}

/// Check that a stream object's declared `/Length` matches its body.
fn verify_stream_length(id: u32, object: &[u8]) -> Result<()> {
    let stream_kw = match find_from(object, b"\nstream\n", 0) {
        Some(pos) => pos,
        None => return Ok(()),
    };
    let length = find_from(&object[..stream_kw], b"/Length ", 0)
        .and_then(|pos| parse_leading_number(&object[pos + 8..stream_kw]));
    let length = match length {
        Some(length) => length as usize,
        None => return Err(Error::Assembly(format!("stream object {} has no /Length", id))),
    };
    let body_start = stream_kw + 8;
    let matches = object
        .get(body_start + length..)
        .is_some_and(|rest| rest.starts_with(b"\nendstream"));
    if !matches {
        return Err(Error::Assembly(format!(
            "stream object {} /Length {} does not match its body",
            id, length
        )));
    }
    Ok(())
}

fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

fn parse_leading_number(bytes: &[u8]) -> Option<u64> {
    let digits: Vec<u8> = bytes
        .iter()
        .copied()
        .skip_while(|b| *b == b' ')
        .take_while(u8::is_ascii_digit)
        .collect();
    std::str::from_utf8(&digits).ok()?.parse().ok()
}
