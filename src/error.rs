//! Error types for document retrieval and PDF synthesis.
//!
//! Retrieval failures (`Auth`, `AllStrategiesFailed`, `Cancelled`) are terminal and reach
//! the caller. Conversion failures (`Format`, `Assembly`) are absorbed by the converter,
//! which substitutes a diagnostic PDF.

use crate::storage::{AttemptRecord, Strategy};

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while fetching or converting a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Signature rejected or credentials invalid. Never retried.
    #[error("Access denied during {strategy} (HTTP {status}{}): {message}", code_suffix(.code))]
    Auth {
        /// Strategy that received the rejection
        strategy: Strategy,
        /// HTTP status returned by the store
        status: u16,
        /// S3 error code, when the response body carried one
        code: Option<String>,
        /// Technical message
        message: String,
        /// Every attempt made before the rejection, in order
        attempts: Vec<AttemptRecord>,
    },

    /// Connection, timeout or transport failure of a single request.
    #[error("Network error: {0}")]
    Network(String),

    /// Every strategy was exhausted without a successful download.
    #[error("All download strategies failed: {}", summarize(.attempts))]
    AllStrategiesFailed {
        /// Last recorded failure per strategy, in strategy order
        attempts: Vec<AttemptRecord>,
    },

    /// The retrieval was cancelled by the caller.
    #[error("Retrieval cancelled")]
    Cancelled,

    /// Source bytes could not be parsed into text or rows.
    #[error("Format error: {0}")]
    Format(String),

    /// Internal PDF assembly invariant violated.
    #[error("PDF assembly error: {0}")]
    Assembly(String),

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn code_suffix(code: &Option<String>) -> String {
    match code {
        Some(code) => format!(", {}", code),
        None => String::new(),
    }
}

fn summarize(attempts: &[AttemptRecord]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.strategy, a.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// True for failures that end a retrieval (the caller gets no PDF).
    pub fn is_retrieval_failure(&self) -> bool {
        matches!(
            self,
            Error::Auth { .. }
                | Error::AllStrategiesFailed { .. }
                | Error::Cancelled
                | Error::Network(_)
                | Error::Http(_)
        )
    }

    /// Attempt history carried by a retrieval failure.
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            Error::Auth { attempts, .. } | Error::AllStrategiesFailed { attempts } => attempts,
            _ => &[],
        }
    }

    /// Short message suitable for an end-user error panel.
    pub fn user_message(&self) -> String {
        match self {
            Error::Auth { .. } => {
                "The document store refused access to this file.".to_string()
            },
            Error::AllStrategiesFailed { attempts } => format!(
                "The document could not be downloaded after trying {} method(s).",
                attempts.len()
            ),
            Error::Cancelled => "The download was cancelled.".to_string(),
            Error::Network(_) | Error::Http(_) => {
                "The document store could not be reached.".to_string()
            },
            Error::Config(msg) => format!("The viewer is not configured correctly: {}", msg),
            Error::Format(_) | Error::Assembly(_) | Error::Io(_) => {
                "The document could not be converted for display.".to_string()
            },
        }
    }

    /// Troubleshooting steps shown next to a retrieval failure.
    pub fn remediation(&self) -> &'static [&'static str] {
        match self {
            Error::Auth { .. } => &[
                "Check that the IAM user or role has s3:GetObject on this bucket and key.",
                "Check the bucket policy for explicit Deny statements.",
                "Check the bucket CORS configuration allows GET from this origin.",
                "Check that the session token has not expired.",
                "Check that the system clock is accurate (signatures expire on skew).",
            ],
            Error::AllStrategiesFailed { .. } | Error::Network(_) | Error::Http(_) => &[
                "Check network connectivity to the storage endpoint.",
                "Check that the bucket name, region and object key are correct.",
                "Retry in a few moments; the store may be temporarily unavailable.",
            ],
            Error::Config(_) => &["Check the bucket, key, region and credential settings."],
            _ => &[],
        }
    }
}
