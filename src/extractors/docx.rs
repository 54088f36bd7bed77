//! DOCX text extraction.
//!
//! DOCX files are ZIP archives containing XML files in Open XML format.
//! The main content is in `word/document.xml`.

use super::{ExtractedDocument, TextExtractor};
use crate::error::{Error, Result};
use lazy_static::lazy_static;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

/// Below this many characters the structured pass is cross-checked with a
/// crude tag strip.
const MIN_STRUCTURED_CHARS: usize = 50;

lazy_static! {
    static ref PARAGRAPH_END: Regex = Regex::new(r"</w:p>").unwrap();
    static ref LINE_BREAK: Regex = Regex::new(r"<w:(?:br|cr)\b[^>]*/>").unwrap();
    static ref TAB: Regex = Regex::new(r"<w:tab\b[^>]*/>").unwrap();
    static ref TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref HORIZONTAL_SPACE: Regex = Regex::new(r"[ \t\x{a0}]+").unwrap();
}

/// Extracts paragraph text from Word documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedDocument> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::Format(format!("failed to open DOCX archive: {}", e)))?;
        let xml = read_main_part(&mut archive)?;

        let structured = match parse_document_xml(&xml) {
            Ok(text) => text,
            Err(e) => {
                log::debug!("structured DOCX parse failed, using tag strip: {}", e);
                String::new()
            },
        };

        let text = if structured.chars().count() < MIN_STRUCTURED_CHARS {
            let crude = strip_tags(&xml);
            if crude.chars().count() > structured.chars().count() {
                log::debug!(
                    "tag strip recovered {} chars vs {} structured",
                    crude.chars().count(),
                    structured.chars().count()
                );
                crude
            } else {
                structured
            }
        } else {
            structured
        };

        Ok(ExtractedDocument::from_lines(normalize(&text)))
    }
}

/// Read `word/document.xml`, or failing that any `word/document*.xml` part.
fn read_main_part<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    let name = if archive.index_for_name("word/document.xml").is_some() {
        "word/document.xml".to_string()
    } else {
        archive
            .file_names()
            .filter(|n| n.starts_with("word/document") && n.ends_with(".xml"))
            .min()
            .map(str::to_string)
            .ok_or_else(|| Error::Format("DOCX has no word/document.xml".to_string()))?
    };

    let mut file = archive
        .by_name(&name)
        .map_err(|e| Error::Format(format!("failed to open {}: {}", name, e)))?;
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)
        .map_err(|e| Error::Format(format!("failed to read {}: {}", name, e)))?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

/// Walk the document XML, keeping run text and turning structure into whitespace.
fn parse_document_xml(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut out = String::new();
    let mut in_text = false;
    let mut in_tab_stops = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"tabs" => in_tab_stops = true,
                _ => {},
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"tabs" => in_tab_stops = false,
                b"p" => out.push('\n'),
                _ => {},
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"br" | b"cr" => out.push('\n'),
                b"tab" if !in_tab_stops => out.push(' '),
                b"p" => out.push('\n'),
                _ => {},
            },
            Ok(Event::Text(e)) => {
                if in_text {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::Format(format!("XML escape error: {}", e)))?;
                    out.push_str(&text);
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Format(format!(
                    "XML parse error at {}: {}",
                    reader.buffer_position(),
                    e
                )));
            },
            _ => {},
        }
    }

    Ok(out)
}

/// Regex tag strip for documents the structured pass cannot read well.
fn strip_tags(xml: &str) -> String {
    let text = PARAGRAPH_END.replace_all(xml, "\n");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = TAB.replace_all(&text, " ");
    let text = TAG.replace_all(&text, "");
    decode_entities(&text)
}

/// Decode the five predefined XML entities.
fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Collapse horizontal whitespace and runs of blank lines.
fn normalize(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut previous_blank = true;
    for line in text.lines() {
        let collapsed = HORIZONTAL_SPACE.replace_all(line, " ").trim().to_string();
        let blank = collapsed.is_empty();
        if blank && previous_blank {
            continue;
        }
        previous_blank = blank;
        lines.push(collapsed);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}
