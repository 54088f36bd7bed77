//! High-level API: one call from object locator to displayable PDF.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_courier::api::PdfCourier;
//! use pdf_courier::config::Settings;
//! use pdf_courier::storage::NoProgress;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> pdf_courier::Result<()> {
//! let settings = Settings::from_env()?;
//! let courier = PdfCourier::from_settings(&settings)?;
//! let retrieved = courier
//!     .fetch_pdf(&settings.locator, &NoProgress, &CancellationToken::new())
//!     .await?;
//! retrieved.save("document.pdf")?;
//! # Ok(())
//! # }
//! ```
//!
//! Retrieval failures (authentication, network, cancellation) are returned as
//! errors. Once bytes are downloaded the call always succeeds: documents that
//! cannot be converted come back as a PDF explaining the problem.

mod courier;

pub use courier::{DownloadMetadata, PdfCourier, RetrievedPdf};
