//! Configuration for retrieval and PDF synthesis.

use crate::error::{Error, Result};
use crate::storage::{Credentials, ObjectLocator, RetryPolicy};
use crate::writer::PageGeometry;
use std::time::Duration;

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Retrieval and conversion configuration.
#[derive(Debug, Clone)]
pub struct CourierConfig {
    /// Lifetime of presigned URLs.
    pub presign_expiry: Duration,

    /// Retry behaviour per download strategy.
    pub retry: RetryPolicy,

    /// Timeout for a single HTTP request.
    pub request_timeout: Duration,

    /// Page layout of synthesized PDFs.
    pub geometry: PageGeometry,

    /// Title written into synthesized PDFs (defaults to the file name).
    pub title: Option<String>,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CourierConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            presign_expiry: Duration::from_secs(3600),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
            geometry: PageGeometry::default(),
            title: None,
        }
    }

    /// Set the presigned URL lifetime.
    pub fn with_presign_expiry(mut self, expiry: Duration) -> Self {
        self.presign_expiry = expiry;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the page geometry.
    pub fn with_geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Everything needed for one session: where the document is, how to authenticate,
/// and how to process it.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Document location
    pub locator: ObjectLocator,
    /// Access credentials
    pub credentials: Credentials,
    /// Processing configuration
    pub config: CourierConfig,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// Required: `COURIER_BUCKET`, `COURIER_KEY`, `AWS_ACCESS_KEY_ID`,
    /// `AWS_SECRET_ACCESS_KEY`. Optional: `COURIER_REGION` (falls back to `AWS_REGION`,
    /// then `us-east-1`), `AWS_SESSION_TOKEN`, `COURIER_PRESIGN_EXPIRY_SECS`,
    /// `COURIER_MAX_ATTEMPTS`, `COURIER_BACKOFF_MS`, `COURIER_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require =
            |name: &str| get(name).ok_or_else(|| Error::Config(format!("{} is not set", name)));

        let region = get("COURIER_REGION")
            .or_else(|| get("AWS_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let locator = ObjectLocator::new(require("COURIER_BUCKET")?, require("COURIER_KEY")?, region);

        let mut credentials =
            Credentials::new(require("AWS_ACCESS_KEY_ID")?, require("AWS_SECRET_ACCESS_KEY")?);
        if let Some(token) = get("AWS_SESSION_TOKEN") {
            credentials = credentials.with_session_token(token);
        }

        let mut config = CourierConfig::new();
        if let Some(secs) = parse_number(&get, "COURIER_PRESIGN_EXPIRY_SECS")? {
            config = config.with_presign_expiry(Duration::from_secs(secs));
        }
        if let Some(attempts) = parse_number(&get, "COURIER_MAX_ATTEMPTS")? {
            if attempts == 0 {
                return Err(Error::Config("COURIER_MAX_ATTEMPTS must be at least 1".to_string()));
            }
            config.retry.max_attempts = u32::try_from(attempts).map_err(|_| {
                Error::Config(format!("COURIER_MAX_ATTEMPTS is too large: {}", attempts))
            })?;
        }
        if let Some(ms) = parse_number(&get, "COURIER_BACKOFF_MS")? {
            config.retry.backoff_base = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_number(&get, "COURIER_TIMEOUT_SECS")? {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            locator,
            credentials,
            config,
        })
    }
}

fn parse_number<G>(get: &G, name: &str) -> Result<Option<u64>>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got {:?}", name, raw))),
        None => Ok(None),
    }
}
