// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::enum_variant_names)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Courier
//!
//! Fetch a document from S3 with self-computed SigV4 signatures and always hand
//! back a displayable PDF.
//!
//! ## Core Features
//!
//! ### Retrieval
//! - **Request Signing**: AWS Signature Version 4 computed in-process, as a presigned
//!   URL or as `Authorization` headers
//! - **Key Encoding**: Per-segment percent-encoding so signature and transport agree
//! - **Multi-Strategy Download**: Presigned URL, signed headers, then basic auth, with
//!   linear backoff retries and an early stop on authentication failures
//! - **Progress & Cancellation**: Monotonic progress events and `CancellationToken` support
//!
//! ### Conversion
//! - **Pass-Through**: Existing PDFs are returned byte for byte
//! - **Extraction**: DOCX, XLSX/XLS/ODS and CSV (as text tables), plain text
//! - **PDF Synthesis**: Minimal PDF 1.4 writer with exact xref offsets, self-verified
//! - **Fallback**: A diagnostic PDF whenever extraction or assembly fails
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_courier::{CourierConfig, Credentials, ObjectLocator, PdfCourier};
//! use pdf_courier::storage::NoProgress;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> pdf_courier::Result<()> {
//! let credentials = Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");
//! let courier = PdfCourier::new(credentials, &CourierConfig::default())?;
//!
//! let locator = ObjectLocator::new("reports", "2024/Q1 summary.xlsx", "eu-west-1");
//! let retrieved = courier
//!     .fetch_pdf(&locator, &NoProgress, &CancellationToken::new())
//!     .await?;
//! println!("{:?}: {} bytes", retrieved.outcome, retrieved.pdf.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 (<http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license (<http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Object storage retrieval
pub mod storage;

// Text extraction
pub mod extractors;

// PDF objects and writing
pub mod object;
pub mod writer;

// Format detection and conversion
pub mod converter;

// High-level API
pub mod api;

pub use api::{PdfCourier, RetrievedPdf};
pub use config::{CourierConfig, Settings};
pub use converter::{ConversionId, ConversionOutcome, DocumentConverter};
pub use error::{Error, Result};
pub use storage::{Credentials, ObjectLocator, ProgressEvent, ProgressSink, Strategy};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
