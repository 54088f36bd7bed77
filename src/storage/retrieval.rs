//! Multi-strategy download with retries and progress reporting.
//!
//! ```text
//! Init → TryStrategy(0) ─┬─ Success ───────────────→ DownloadResult
//!                        ├─ AuthFailure ───────────→ Error::Auth (remaining strategies skipped)
//!                        └─ Failure ─ retry ≤ N ──→ TryStrategy(i + 1) … → Error::AllStrategiesFailed
//! ```
//!
//! Strategies run strictly one after another. A fresh [`SignedRequest`] is built for
//! every attempt, so a retry after a slow failure never reuses a stale timestamp.

use super::key_encoder::has_dot_segment;
use super::transport::{classify_response, FailureKind, HttpTransport};
use super::{AttemptRecord, CredentialSigner, Credentials, DownloadResult, ObjectLocator};
use super::{SignedRequest, Strategy};
use crate::config::CourierConfig;
use crate::converter::ConversionId;
use crate::error::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Share of the progress range used by download attempts; the rest marks completion.
const ATTEMPT_PROGRESS_SPAN: u32 = 90;

/// One progress update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Completion percentage, 0-100, never decreasing within a conversion
    pub percentage: u8,
    /// Human-readable status
    pub message: String,
    /// Redacted URL of the request in flight, when there is one
    #[serde(rename = "signedUrl", skip_serializing_if = "Option::is_none")]
    pub signed_url: Option<String>,
}

/// Receives progress updates. May be called any number of times, from any point of an
/// in-flight conversion.
pub trait ProgressSink: Send + Sync {
    /// Handle one update.
    fn on_progress(&self, event: &ProgressEvent);
}

/// Sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Adapts a closure into a [`ProgressSink`].
pub struct FnProgress<F>(pub F);

impl<F> ProgressSink for FnProgress<F>
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        (self.0)(event)
    }
}

/// Maps phase-local percentages into a slice of the overall range and keeps the
/// reported value from ever going backwards.
pub struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    start: u8,
    end: u8,
    last: AtomicU8,
}

impl<'a> ProgressReporter<'a> {
    /// Reporter covering the full 0-100 range.
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self::scaled(sink, 0, 100)
    }

    /// Reporter whose 0-100 maps onto `start..=end` of the overall range.
    pub fn scaled(sink: &'a dyn ProgressSink, start: u8, end: u8) -> Self {
        let end = end.min(100);
        let start = start.min(end);
        Self {
            sink,
            start,
            end,
            last: AtomicU8::new(start),
        }
    }

    /// Report a phase-local percentage.
    pub fn report(&self, percent: u32, message: impl Into<String>, signed_url: Option<String>) {
        let span = u32::from(self.end - self.start);
        let mapped = u32::from(self.start) + span * percent.min(100) / 100;
        let mapped = mapped as u8;
        let value = self.last.fetch_max(mapped, Ordering::SeqCst).max(mapped);
        self.sink.on_progress(&ProgressEvent {
            percentage: value,
            message: message.into(),
            signed_url,
        });
    }

    /// Highest percentage reported so far (overall range).
    pub fn last(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }
}

/// Retry behaviour for one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Requests sent per strategy before moving on
    pub max_attempts: u32,
    /// Delay after the first failure; later delays grow linearly
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based): `base * attempt`,
    /// saturating at [`Duration::MAX`].
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff_base.checked_mul(attempt).unwrap_or(Duration::MAX)
    }
}

/// Downloads one object, trying each [`Strategy`] in order.
pub struct RetrievalCoordinator {
    transport: Arc<dyn HttpTransport>,
    signer: CredentialSigner,
    policy: RetryPolicy,
    presign_expiry: Duration,
}

impl RetrievalCoordinator {
    /// Create a coordinator with default retry policy and a one-hour presign expiry.
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: Arc<Credentials>) -> Self {
        Self {
            transport,
            signer: CredentialSigner::new(credentials),
            policy: RetryPolicy::default(),
            presign_expiry: Duration::from_secs(3600),
        }
    }

    /// Create a coordinator using the retry and expiry settings of `config`.
    pub fn from_config(
        config: &CourierConfig,
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<Credentials>,
    ) -> Self {
        Self::new(transport, credentials)
            .with_policy(config.retry)
            .with_presign_expiry(config.presign_expiry)
    }

    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = RetryPolicy {
            max_attempts: policy.max_attempts.max(1),
            ..policy
        };
        self
    }

    /// Replace the presigned URL lifetime.
    pub fn with_presign_expiry(mut self, expiry: Duration) -> Self {
        self.presign_expiry = expiry;
        self
    }

    /// Current retry policy.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Build the request for one attempt of `strategy`.
    pub fn build_request(
        &self,
        strategy: Strategy,
        locator: &ObjectLocator,
    ) -> Result<SignedRequest> {
        let now = Utc::now();
        match strategy {
            Strategy::PresignedUrl => self.signer.presign_get(locator, now, self.presign_expiry),
            Strategy::SignedHeaders => self.signer.sign_get_headers(locator, now),
            Strategy::BasicAuth => Ok(self.signer.basic_auth_get(locator)),
        }
    }

    /// Download the object at `locator`.
    ///
    /// Stops at the first success or authentication failure. When every strategy fails,
    /// the returned error holds the last failure of each one.
    pub async fn retrieve(
        &self,
        locator: &ObjectLocator,
        progress: &ProgressReporter<'_>,
        cancel: &CancellationToken,
    ) -> Result<DownloadResult> {
        self.retrieve_traced(ConversionId::new(), locator, progress, cancel).await
    }

    /// [`RetrievalCoordinator::retrieve`], tagging every log line with `id`.
    pub async fn retrieve_traced(
        &self,
        id: ConversionId,
        locator: &ObjectLocator,
        progress: &ProgressReporter<'_>,
        cancel: &CancellationToken,
    ) -> Result<DownloadResult> {
        if has_dot_segment(&locator.key) {
            let e = Error::Config(format!(
                "object key {:?} has a '.' or '..' segment and cannot be requested over HTTP",
                locator.key
            ));
            log::warn!("[{}] {}", id, e);
            return Err(e);
        }

        let strategies = Strategy::ORDER;
        let total = strategies.len() as u32;
        let mut history: Vec<AttemptRecord> = Vec::with_capacity(strategies.len());

        progress.report(0, format!("Preparing download of {}", locator.file_name()), None);

        for (index, strategy) in strategies.into_iter().enumerate() {
            let index = index as u32;
            let band_start = ATTEMPT_PROGRESS_SPAN * index / total;
            let band_width = ATTEMPT_PROGRESS_SPAN / total;

            let mut record = AttemptRecord {
                strategy,
                tries: 0,
                status: None,
                message: String::new(),
                url: None,
            };

            for attempt in 1..=self.policy.max_attempts {
                if cancel.is_cancelled() {
                    log::info!("[{}] Retrieval of {} cancelled", id, locator.file_name());
                    return Err(Error::Cancelled);
                }

                let request = match self.build_request(strategy, locator) {
                    Ok(request) => request,
                    Err(e) => {
                        log::warn!("[{}] Could not build {} request: {}", id, strategy, e);
                        record.message = e.to_string();
                        break;
                    },
                };
                let url = request.redacted_url();
                record.tries = attempt;
                record.url = Some(url.clone());

                progress.report(
                    band_start + band_width * (attempt - 1) / self.policy.max_attempts,
                    format!(
                        "Downloading via {} (attempt {}/{})",
                        strategy, attempt, self.policy.max_attempts
                    ),
                    Some(url.clone()),
                );
                log::debug!("[{}] GET {} via {} (attempt {})", id, url, strategy, attempt);

                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    outcome = self.transport.get(&request) => outcome,
                };

                match outcome {
                    Ok(response) => match classify_response(&response) {
                        Ok(()) => {
                            let size_bytes = response.body.len();
                            log::info!(
                                "[{}] Downloaded {} ({} bytes) via {}",
                                id,
                                locator.file_name(),
                                size_bytes,
                                strategy
                            );
                            progress.report(100, "Download complete", Some(url.clone()));
                            return Ok(DownloadResult {
                                bytes: response.body,
                                content_type: response.content_type,
                                size_bytes,
                                source_url: url,
                                strategy,
                            });
                        },
                        Err(failure) => {
                            record.status = Some(failure.status);
                            record.message = failure.message.clone();
                            match failure.kind {
                                FailureKind::Auth => {
                                    log::warn!(
                                        "[{}] {} rejected by store ({}); not trying other strategies",
                                        id,
                                        strategy,
                                        failure.message
                                    );
                                    history.push(record);
                                    return Err(Error::Auth {
                                        strategy,
                                        status: failure.status,
                                        code: failure.code,
                                        message: failure.message,
                                        attempts: history,
                                    });
                                },
                                FailureKind::Permanent => {
                                    log::warn!("[{}] {} failed: {}", id, strategy, failure.message);
                                    break;
                                },
                                FailureKind::Transient => {
                                    log::warn!(
                                        "[{}] {} attempt {} failed: {}",
                                        id,
                                        strategy,
                                        attempt,
                                        failure.message
                                    );
                                },
                            }
                        },
                    },
                    Err(e) => {
                        log::warn!("[{}] {} attempt {} failed: {}", id, strategy, attempt, e);
                        record.status = None;
                        record.message = Error::Network(e.to_string()).to_string();
                    },
                }

                if attempt < self.policy.max_attempts {
                    let delay = self.policy.delay(attempt);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(delay) => {},
                    }
                }
            }

            progress.report(
                band_start + band_width,
                format!("{} failed, trying next method", strategy),
                None,
            );
            history.push(record);
        }

        log::warn!(
            "[{}] All {} download strategies failed for {}",
            id,
            history.len(),
            locator.file_name()
        );
        Err(Error::AllStrategiesFailed { attempts: history })
    }
}
