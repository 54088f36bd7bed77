//! HTTP transport seam.
//!
//! The coordinator never inspects error text. A transport either fails before a response
//! arrives ([`TransportError`]) or returns the status code and body, which
//! [`classify_response`] turns into a [`FailureKind`] using the status and the S3
//! `<Code>` element of the error document.

use super::SignedRequest;
use crate::error::{Error, Result};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::time::Duration;

/// S3 error codes that mean the credentials or signature were rejected.
const AUTH_ERROR_CODES: &[&str] = &[
    "AccessDenied",
    "AllAccessDisabled",
    "ExpiredToken",
    "InvalidAccessKeyId",
    "InvalidToken",
    "SignatureDoesNotMatch",
    "TokenRefreshRequired",
];

/// Response received from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// `Content-Type` header, if present
    pub content_type: Option<String>,
    /// Response body
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// A `200 OK` response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        Self {
            status: 200,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    /// An error response with an S3-style XML error document.
    pub fn s3_error(status: u16, code: &str, message: &str) -> Self {
        let body = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Error><Code>{}</Code><Message>{}</Message></Error>",
            code, message
        );
        Self {
            status,
            content_type: Some("application/xml".to_string()),
            body: body.into_bytes(),
        }
    }
}

/// Failure before any HTTP response arrived.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request or body read timed out
    #[error("request timed out")]
    Timeout,
    /// Connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),
    /// Any other transport-level failure
    #[error("transport failure: {0}")]
    Other(String),
}

/// How the coordinator should treat a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Credentials or signature rejected: stop, try nothing else
    Auth,
    /// Worth retrying with the same strategy
    Transient,
    /// Retrying this strategy will not help; move to the next one
    Permanent,
}

/// A response that did not deliver the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFailure {
    /// Classification
    pub kind: FailureKind,
    /// HTTP status
    pub status: u16,
    /// S3 error code from the body, if any
    pub code: Option<String>,
    /// Technical message
    pub message: String,
}

/// Sends signed requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform the GET described by `request`.
    async fn get(
        &self,
        request: &SignedRequest,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        request: &SignedRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(TransportResponse {
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

/// Decide whether a response delivered the object.
///
/// Returns `Ok(())` for a non-empty 2xx response.
pub fn classify_response(response: &TransportResponse) -> std::result::Result<(), ResponseFailure> {
    let status = response.status;
    if (200..300).contains(&status) {
        if response.body.is_empty() {
            return Err(ResponseFailure {
                kind: FailureKind::Transient,
                status,
                code: None,
                message: "empty response body".to_string(),
            });
        }
        return Ok(());
    }

    let (code, message) = parse_s3_error(&response.body);
    let auth_code = code
        .as_deref()
        .map(|c| AUTH_ERROR_CODES.contains(&c))
        .unwrap_or(false);

    let kind = if status == 401 || status == 403 || auth_code {
        FailureKind::Auth
    } else if status == 408 || status == 429 || status >= 500 {
        FailureKind::Transient
    } else {
        FailureKind::Permanent
    };

    let message = match (&code, message) {
        (Some(code), Some(message)) => format!("HTTP {} {}: {}", status, code, message),
        (Some(code), None) => format!("HTTP {} {}", status, code),
        (None, _) => format!("HTTP {}", status),
    };

    Err(ResponseFailure {
        kind,
        status,
        code,
        message,
    })
}

/// Extract `<Code>` and `<Message>` from an S3 XML error document.
fn parse_s3_error(body: &[u8]) -> (Option<String>, Option<String>) {
    let text = String::from_utf8_lossy(body);
    let mut reader = Reader::from_str(&text);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<&'static str> = None;
    let mut code = None;
    let mut message = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                current = match e.local_name().as_ref() {
                    b"Code" => Some("Code"),
                    b"Message" => Some("Message"),
                    _ => None,
                };
            },
            Ok(Event::End(_)) => current = None,
            Ok(Event::Text(e)) => {
                let value = e.unescape().map(|v| v.to_string()).unwrap_or_default();
                match current {
                    Some("Code") => code = Some(value),
                    Some("Message") => message = Some(value),
                    _ => {},
                }
            },
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {},
        }
        buf.clear();
    }

    (code, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(response: TransportResponse) -> Option<FailureKind> {
        classify_response(&response).err().map(|f| f.kind)
    }

    #[test]
    fn test_success() {
        assert!(classify_response(&TransportResponse::ok(b"%PDF-1.4".to_vec(), None)).is_ok());
    }

    #[test]
    fn test_empty_body_is_transient() {
        assert_eq!(kind_of(TransportResponse::ok(Vec::new(), None)), Some(FailureKind::Transient));
    }

    #[test]
    fn test_auth_statuses() {
        for status in [401, 403] {
            let response = TransportResponse {
                status,
                content_type: None,
                body: Vec::new(),
            };
            assert_eq!(kind_of(response), Some(FailureKind::Auth), "status {}", status);
        }
    }

    #[test]
    fn test_auth_codes_on_400() {
        for code in AUTH_ERROR_CODES {
            let response = TransportResponse::s3_error(400, code, "rejected");
            assert_eq!(kind_of(response), Some(FailureKind::Auth), "code {}", code);
        }
    }

    #[test]
    fn test_message_text_alone_is_not_auth() {
        // A 404 whose message mentions "access denied" stays a plain not-found
        let response = TransportResponse::s3_error(404, "NoSuchKey", "access denied 403");
        assert_eq!(kind_of(response), Some(FailureKind::Permanent));
    }

    #[test]
    fn test_transient_statuses() {
        for status in [408, 429, 500, 502, 503, 504] {
            let response = TransportResponse {
                status,
                content_type: None,
                body: Vec::new(),
            };
            assert_eq!(kind_of(response), Some(FailureKind::Transient), "status {}", status);
        }
    }

    #[test]
    fn test_failure_message_includes_code() {
        let failure =
            classify_response(&TransportResponse::s3_error(403, "SignatureDoesNotMatch", "bad sig"))
                .unwrap_err();
        assert_eq!(failure.code.as_deref(), Some("SignatureDoesNotMatch"));
        assert_eq!(failure.message, "HTTP 403 SignatureDoesNotMatch: bad sig");
    }

    #[test]
    fn test_non_xml_body() {
        let response = TransportResponse {
            status: 500,
            content_type: Some("text/html".to_string()),
            body: b"<html>oops".to_vec(),
        };
        let failure = classify_response(&response).unwrap_err();
        assert_eq!(failure.code, None);
        assert_eq!(failure.message, "HTTP 500");
    }
}
