//! The retrieval-plus-conversion facade.

use crate::config::{CourierConfig, Settings};
use crate::converter::{ConversionId, ConversionOutcome, DocumentConverter};
use crate::error::{Error, Result};
use crate::storage::{
    Credentials, DownloadResult, HttpTransport, ObjectLocator, ProgressReporter, ProgressSink,
    ReqwestTransport, RetrievalCoordinator, Strategy,
};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Last percentage of the retrieval phase; conversion fills the rest.
const RETRIEVAL_PROGRESS_END: u8 = 80;

/// Where and how the source document was downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadMetadata {
    /// `Content-Type` reported by the store
    pub content_type: Option<String>,
    /// Size of the source document in bytes
    pub size_bytes: usize,
    /// Redacted URL the document was fetched from
    pub source_url: String,
    /// Strategy that succeeded
    pub strategy: Strategy,
}

impl DownloadMetadata {
    fn split(download: DownloadResult) -> (Vec<u8>, Self) {
        let DownloadResult {
            bytes,
            content_type,
            size_bytes,
            source_url,
            strategy,
        } = download;
        (
            bytes,
            Self {
                content_type,
                size_bytes,
                source_url,
                strategy,
            },
        )
    }
}

/// A displayable PDF and how it came to be.
#[derive(Debug, Clone)]
pub struct RetrievedPdf {
    /// Id used in every log line of this conversion
    pub conversion_id: ConversionId,
    /// PDF bytes, always well-formed
    pub pdf: Vec<u8>,
    /// Pass-through, synthesized, or diagnostic fallback
    pub outcome: ConversionOutcome,
    /// Download details; `None` for local conversions
    pub download: Option<DownloadMetadata>,
}

impl RetrievedPdf {
    /// Get PDF bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pdf
    }

    /// Consume and return PDF bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.pdf
    }

    /// Save the PDF to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, &self.pdf)?;
        Ok(())
    }
}

/// Downloads documents and hands them back as PDFs.
pub struct PdfCourier {
    coordinator: RetrievalCoordinator,
    converter: DocumentConverter,
}

impl PdfCourier {
    /// Courier talking to S3 over HTTPS.
    pub fn new(credentials: Credentials, config: &CourierConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.request_timeout)?);
        Ok(Self::with_transport(transport, Arc::new(credentials), config))
    }

    /// Courier built from environment-derived settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        log::debug!(
            "courier for s3://{}/{} in {} with key {}",
            settings.locator.bucket,
            settings.locator.key,
            settings.locator.region,
            settings.credentials.redacted_key_id()
        );
        Self::new(settings.credentials.clone(), &settings.config)
    }

    /// Courier using a caller-supplied transport.
    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<Credentials>,
        config: &CourierConfig,
    ) -> Self {
        Self {
            coordinator: RetrievalCoordinator::from_config(config, transport, credentials),
            converter: DocumentConverter::from_config(config),
        }
    }

    /// Download the object at `locator` and turn it into a PDF.
    ///
    /// Progress runs 0-80 while downloading and 80-100 while converting.
    pub async fn fetch_pdf(
        &self,
        locator: &ObjectLocator,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<RetrievedPdf> {
        let id = ConversionId::new();
        log::info!("[{}] fetching s3://{}/{}", id, locator.bucket, locator.key);

        let retrieval = ProgressReporter::scaled(progress, 0, RETRIEVAL_PROGRESS_END);
        let download = match self
            .coordinator
            .retrieve_traced(id, locator, &retrieval, cancel)
            .await
        {
            Ok(download) => download,
            Err(e) => {
                log::warn!("[{}] retrieval failed: {}", id, e.user_message());
                return Err(e);
            },
        };
        if cancel.is_cancelled() {
            log::info!("[{}] cancelled after download", id);
            return Err(Error::Cancelled);
        }

        let (bytes, metadata) = DownloadMetadata::split(download);
        let content_type = metadata.content_type.clone();
        let retrieved = self.convert_traced(
            id,
            bytes,
            locator.file_name(),
            content_type.as_deref(),
            progress,
        );
        Ok(RetrievedPdf {
            download: Some(metadata),
            ..retrieved
        })
    }

    /// Convert a document already in memory. Never fails.
    pub fn convert_local(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        content_type: Option<&str>,
        progress: &dyn ProgressSink,
    ) -> RetrievedPdf {
        self.convert_traced(ConversionId::new(), bytes, file_name, content_type, progress)
    }

    fn convert_traced(
        &self,
        id: ConversionId,
        bytes: Vec<u8>,
        file_name: &str,
        content_type: Option<&str>,
        progress: &dyn ProgressSink,
    ) -> RetrievedPdf {
        let reporter = ProgressReporter::scaled(progress, RETRIEVAL_PROGRESS_END, 100);
        reporter.report(0, format!("Converting {}", file_name), None);

        let converted = self.converter.convert_with_id(id, bytes, file_name, content_type);

        let message = match &converted.outcome {
            ConversionOutcome::PassThrough => "PDF ready".to_string(),
            ConversionOutcome::Synthesized { pages, .. } => format!("PDF ready ({} pages)", pages),
            ConversionOutcome::Fallback { .. } => "Document could not be converted".to_string(),
        };
        reporter.report(100, message, None);

        RetrievedPdf {
            conversion_id: converted.id,
            pdf: converted.pdf,
            outcome: converted.outcome,
            download: None,
        }
    }
}
