//! PDF writing module for synthesizing documents from extracted text.
//!
//! ## Architecture
//!
//! ```text
//! text lines
//!     ↓
//! [paginate] (word wrap, page split)
//!     ↓
//! [ContentStreamBuilder] (lines → content stream bytes)
//!     ↓
//! [PdfAssembler] (two-pass write, xref, trailer, verification)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```
//!
//! ## Example
//!
//! ```
//! use pdf_courier::writer::{paginate, PageGeometry, PdfAssembler};
//!
//! let geometry = PageGeometry::default();
//! let lines = vec!["Hello, World!".to_string()];
//! let pages = paginate(&lines, geometry.max_chars_per_line(), geometry.max_lines_per_page());
//! let bytes = PdfAssembler::new(geometry).assemble(&pages)?;
//! assert!(bytes.starts_with(b"%PDF-1.4\n"));
//! # Ok::<(), pdf_courier::Error>(())
//! ```

mod content_stream;
mod fallback;
mod object_serializer;
mod paginator;
mod pdf_writer;

pub use content_stream::{escape_text, ContentStreamBuilder, ContentStreamOp};
pub use fallback::{explanation, FallbackPdfFactory, MINIMAL_PDF};
pub use object_serializer::ObjectSerializer;
pub use paginator::{is_tabular, paginate, paginate_tables, Page};
pub use pdf_writer::{
    verify_structure, PageGeometry, PdfAssembler, PdfDocument, PdfObject, StandardFont,
    PDF_VERSION, PRODUCER,
};
