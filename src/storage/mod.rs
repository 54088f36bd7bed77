//! Object storage retrieval.
//!
//! Downloads a single object from S3 without an SDK: requests are signed locally with
//! AWS Signature Version 4 and sent through a pluggable [`HttpTransport`].
//!
//! ## Architecture
//!
//! ```text
//! ObjectLocator + Credentials
//!     ↓
//! [key_encoder] (object key → canonical path)
//!     ↓
//! [CredentialSigner] (presigned URL | signed headers | basic auth)
//!     ↓
//! [RetrievalCoordinator] (ordered strategies, retries, progress, cancellation)
//!     ↓
//! [HttpTransport] (reqwest in production)
//!     ↓
//! DownloadResult
//! ```

pub mod key_encoder;
mod retrieval;
mod signer;
mod transport;

pub use key_encoder::{encode_key, has_dot_segment};
pub use retrieval::{
    FnProgress, NoProgress, ProgressEvent, ProgressReporter, ProgressSink, RetrievalCoordinator,
    RetryPolicy,
};
pub use signer::{CredentialSigner, SignedRequest, UNSIGNED_PAYLOAD};
pub use transport::{
    classify_response, FailureKind, HttpTransport, ReqwestTransport, ResponseFailure, TransportError,
    TransportResponse,
};

use serde::Serialize;
use std::fmt;

/// Identifies a stored document: bucket, key and region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocator {
    /// Bucket name
    pub bucket: String,
    /// Raw (unencoded) object key
    pub key: String,
    /// AWS region, e.g. `us-east-1`
    pub region: String,
}

impl ObjectLocator {
    /// Create a new locator.
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            region: region.into(),
        }
    }

    /// Virtual-hosted style host name for this bucket.
    pub fn endpoint_host(&self) -> String {
        format!("{}.s3.{}.amazonaws.com", self.bucket, self.region)
    }

    /// Key as it appears in the request path (leading `/` included).
    pub fn canonical_path(&self) -> String {
        format!("/{}", encode_key(self.key.trim_start_matches('/')))
    }

    /// Unsigned HTTPS URL of the object.
    pub fn object_url(&self) -> String {
        format!("https://{}{}", self.endpoint_host(), self.canonical_path())
    }

    /// Last path segment of the key, used as the display file name.
    pub fn file_name(&self) -> &str {
        self.key
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(self.key.as_str())
    }
}

/// Access credentials. Read-only once constructed; share with `Arc`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Session token for temporary credentials
    pub session_token: Option<String>,
}

impl Credentials {
    /// Create long-term credentials.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Attach a session token (temporary credentials).
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.session_token = if token.is_empty() { None } else { Some(token) };
        self
    }

    /// Access key id truncated for log output.
    pub fn redacted_key_id(&self) -> String {
        let prefix: String = self.access_key_id.chars().take(4).collect();
        format!("{}****", prefix)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.redacted_key_id())
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Download strategies, in the fixed order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Strategy {
    /// GET on a presigned URL (signature in the query string)
    PresignedUrl,
    /// GET with an `Authorization: AWS4-HMAC-SHA256 ...` header
    SignedHeaders,
    /// GET with HTTP basic authentication
    BasicAuth,
}

impl Strategy {
    /// All strategies in attempt order.
    pub const ORDER: [Strategy; 3] =
        [Strategy::PresignedUrl, Strategy::SignedHeaders, Strategy::BasicAuth];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Strategy::PresignedUrl => "presigned URL",
            Strategy::SignedHeaders => "signed headers",
            Strategy::BasicAuth => "basic auth",
        };
        f.write_str(label)
    }
}

/// Last recorded outcome of one strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    /// Strategy that was attempted
    pub strategy: Strategy,
    /// Number of requests sent with this strategy
    pub tries: u32,
    /// HTTP status of the last response, if one arrived
    pub status: Option<u16>,
    /// Technical description of the last failure
    pub message: String,
    /// Redacted URL of the last request
    pub url: Option<String>,
}

/// Bytes of a successfully downloaded object.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    /// Object body
    pub bytes: Vec<u8>,
    /// `Content-Type` reported by the store
    pub content_type: Option<String>,
    /// Body length in bytes
    pub size_bytes: usize,
    /// Redacted URL the object was fetched from
    pub source_url: String,
    /// Strategy that succeeded
    pub strategy: Strategy,
}

/// Strip signature material from a URL before it is logged or reported.
pub fn redact_url(url: &str) -> String {
    match url.split_once('?') {
        Some((base, query)) => {
            let params: Vec<String> = query
                .split('&')
                .map(|pair| match pair.split_once('=') {
                    Some((name, _)) if is_secret_param(name) => format!("{}=<redacted>", name),
                    _ => pair.to_string(),
                })
                .collect();
            format!("{}?{}", base, params.join("&"))
        },
        None => url.to_string(),
    }
}

fn is_secret_param(name: &str) -> bool {
    matches!(name, "X-Amz-Signature" | "X-Amz-Security-Token" | "X-Amz-Credential")
}
