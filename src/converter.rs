//! Turning downloaded bytes into a displayable PDF.
//!
//! [`DocumentConverter::convert`] always yields PDF bytes. Existing PDFs pass
//! through untouched, supported formats are extracted and synthesized, and any
//! failure along the way produces a diagnostic PDF instead of an error.

use crate::config::CourierConfig;
use crate::error::Error;
use crate::extractors::{detect_format, extractor_for, SourceFormat};
use crate::writer::{paginate, paginate_tables, FallbackPdfFactory, PageGeometry, PdfAssembler};
use serde::Serialize;
use uuid::Uuid;

/// Smallest font size used when shrinking text to fit wide tables.
const MIN_FONT_SIZE: f32 = 6.0;

/// Identifier correlating the log lines of one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConversionId(Uuid);

impl ConversionId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConversionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the returned PDF was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// Source already was a PDF
    PassThrough,
    /// Text was extracted and laid out
    Synthesized {
        /// Detected source format
        format: SourceFormat,
        /// Number of pages written
        pages: usize,
    },
    /// Conversion failed, the PDF explains why
    Fallback {
        /// What went wrong
        reason: String,
    },
}

impl ConversionOutcome {
    /// True when the PDF is a diagnostic rather than the document.
    pub fn is_fallback(&self) -> bool {
        matches!(self, ConversionOutcome::Fallback { .. })
    }
}

/// Result of a conversion.
#[derive(Debug, Clone)]
pub struct ConvertedPdf {
    /// Id used in the conversion's log lines
    pub id: ConversionId,
    /// PDF bytes
    pub pdf: Vec<u8>,
    /// How `pdf` was produced
    pub outcome: ConversionOutcome,
}

/// Detects the source format and produces a PDF from it.
#[derive(Debug, Clone, Default)]
pub struct DocumentConverter {
    geometry: PageGeometry,
    title: Option<String>,
}

impl DocumentConverter {
    /// Converter laying out pages with `geometry`.
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            title: None,
        }
    }

    /// Converter using the geometry and title of `config`.
    pub fn from_config(config: &CourierConfig) -> Self {
        Self {
            geometry: config.geometry.clone(),
            title: config.title.clone(),
        }
    }

    /// Title for synthesized PDFs. Defaults to the file name.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Convert `bytes` under a fresh [`ConversionId`].
    pub fn convert(&self, bytes: Vec<u8>, file_name: &str, content_type: Option<&str>) -> ConvertedPdf {
        self.convert_with_id(ConversionId::new(), bytes, file_name, content_type)
    }

    /// Convert `bytes`, logging under `id`. Never fails.
    pub fn convert_with_id(
        &self,
        id: ConversionId,
        bytes: Vec<u8>,
        file_name: &str,
        content_type: Option<&str>,
    ) -> ConvertedPdf {
        log::debug!(
            "[{}] converting {:?} ({} bytes, content type {:?})",
            id,
            file_name,
            bytes.len(),
            content_type
        );

        let format = match detect_format(&bytes, file_name, content_type) {
            Some(format) => format,
            None => {
                let reason = match content_type {
                    Some(ct) => format!("unsupported document format ({})", ct),
                    None => "unsupported document format".to_string(),
                };
                return self.fallback(id, reason, file_name);
            },
        };

        if format == SourceFormat::Pdf {
            log::info!("[{}] {:?} is already a PDF, passing through", id, file_name);
            return ConvertedPdf {
                id,
                pdf: bytes,
                outcome: ConversionOutcome::PassThrough,
            };
        }

        let extractor = match extractor_for(format) {
            Some(extractor) => extractor,
            None => {
                return self.fallback(id, format!("{} support is not enabled", format), file_name)
            },
        };

        let document = match extractor.extract(&bytes) {
            Ok(document) => document,
            Err(e) => return self.fallback(id, e.to_string(), file_name),
        };
        if !document.has_text() {
            let reason = Error::Format("no extractable text".to_string()).to_string();
            return self.fallback(id, reason, file_name);
        }

        let geometry = match document.line_width_hint {
            Some(width) => fit_to_width(&self.geometry, width),
            None => self.geometry.clone(),
        };
        let split = if document.tabular { paginate_tables } else { paginate };
        let pages = split(
            &document.lines,
            geometry.max_chars_per_line(),
            geometry.max_lines_per_page(),
        );
        let title = self.title.clone().unwrap_or_else(|| file_name.to_string());
        let assembler = PdfAssembler::new(geometry).with_title(title);

        match assembler.assemble(&pages) {
            Ok(pdf) => {
                log::info!(
                    "[{}] synthesized {} page(s) from {} {:?} ({} lines)",
                    id,
                    pages.len(),
                    format,
                    file_name,
                    document.lines.len()
                );
                ConvertedPdf {
                    id,
                    pdf,
                    outcome: ConversionOutcome::Synthesized {
                        format,
                        pages: pages.len(),
                    },
                }
            },
            Err(e) => self.fallback(id, e.to_string(), file_name),
        }
    }

    fn fallback(&self, id: ConversionId, reason: String, file_name: &str) -> ConvertedPdf {
        log::warn!("[{}] conversion of {:?} failed: {}", id, file_name, reason);
        let factory = FallbackPdfFactory::new(PdfAssembler::new(self.geometry.clone()));
        ConvertedPdf {
            id,
            pdf: factory.build(&reason, file_name),
            outcome: ConversionOutcome::Fallback { reason },
        }
    }
}

/// Shrink the font so lines of `width` characters fit, down to [`MIN_FONT_SIZE`].
fn fit_to_width(geometry: &PageGeometry, width: usize) -> PageGeometry {
    let available = geometry.max_chars_per_line();
    if width <= available || geometry.font_size <= MIN_FONT_SIZE {
        return geometry.clone();
    }
    let scale = available as f32 / width as f32;
    let font_size = (geometry.font_size * scale).max(MIN_FONT_SIZE);
    let line_height = geometry.line_height * font_size / geometry.font_size;
    geometry.clone().with_font_size(font_size, line_height)
}
