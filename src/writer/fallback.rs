//! Diagnostic PDFs for documents that could not be converted.
//!
//! The caller always gets a displayable PDF. When extraction fails, the
//! failure is explained in a synthesized document; when even that cannot be
//! assembled, [`MINIMAL_PDF`] is returned.

use super::paginator::paginate;
use super::pdf_writer::PdfAssembler;

/// Hand-written single-page PDF with a static message and a valid xref table.
pub const MINIMAL_PDF: &[u8] = b"\
%PDF-1.4\n\
1 0 obj\n\
<</Type /Catalog /Pages 2 0 R>>\n\
endobj\n\
2 0 obj\n\
<</Type /Pages /Kids [3 0 R] /Count 1>>\n\
endobj\n\
3 0 obj\n\
<</Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources <</Font <</F1 <</Type /Font /Subtype /Type1 /BaseFont /Courier /Encoding /WinAnsiEncoding>>>>>> /Contents 4 0 R>>\n\
endobj\n\
4 0 obj\n\
<</Length 119>>\n\
stream\n\
BT\n\
/F1 12 Tf\n\
50 730 Td\n\
(This document could not be displayed.) Tj\n\
0 -16 Td\n\
(Download the original file instead.) Tj\n\
ET\n\
\n\
endstream\n\
endobj\n\
xref\n\
0 5\n\
0000000000 65535 f \n\
0000000009 00000 n \n\
0000000056 00000 n \n\
0000000111 00000 n \n\
0000000303 00000 n \n\
trailer\n\
<</Size 5 /Root 1 0 R>>\n\
startxref\n\
471\n\
%%EOF\n\
";

/// Builds explanatory PDFs for failed conversions.
#[derive(Debug, Clone, Default)]
pub struct FallbackPdfFactory {
    assembler: PdfAssembler,
}

impl FallbackPdfFactory {
    /// Create a factory that lays out its text with `assembler`.
    pub fn new(assembler: PdfAssembler) -> Self {
        Self { assembler }
    }

    /// Build a PDF explaining why `file_name` could not be converted.
    ///
    /// Never fails: if assembly fails, [`MINIMAL_PDF`] is returned.
    pub fn build(&self, reason: &str, file_name: &str) -> Vec<u8> {
        let geometry = self.assembler.geometry();
        let lines = explanation(reason, file_name);
        let pages = paginate(&lines, geometry.max_chars_per_line(), geometry.max_lines_per_page());

        match self.assembler.assemble(&pages) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("fallback PDF assembly failed, using minimal PDF: {}", e);
                MINIMAL_PDF.to_vec()
            },
        }
    }
}

/// Text of the diagnostic document.
pub fn explanation(reason: &str, file_name: &str) -> Vec<String> {
    let name = if file_name.trim().is_empty() {
        "(unnamed document)"
    } else {
        file_name
    };
    let reason = if reason.trim().is_empty() {
        "unknown error"
    } else {
        reason
    };

    let mut lines = vec![
        "Document preview unavailable".to_string(),
        String::new(),
        format!("File: {}", name),
        format!("Problem: {}", reason),
        String::new(),
        "Likely causes:".to_string(),
        "  - The file format is not supported for preview.".to_string(),
        "  - The file is damaged, password protected or empty.".to_string(),
        "  - The document contains only images or drawings.".to_string(),
        String::new(),
        "What you can do:".to_string(),
        "  - Download the original file and open it locally.".to_string(),
        "  - Save the document as PDF and upload it again.".to_string(),
    ];
    if reason.contains("no extractable text") {
        lines.push("  - Check that the document is not blank.".to_string());
    }
    lines
}
