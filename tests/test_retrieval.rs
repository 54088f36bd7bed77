//! Integration tests for multi-strategy retrieval.

use async_trait::async_trait;
use pdf_courier::storage::{
    Credentials, FnProgress, HttpTransport, NoProgress, ObjectLocator, ProgressEvent,
    ProgressReporter, RetrievalCoordinator, RetryPolicy, SignedRequest, Strategy, TransportError,
    TransportResponse,
};
use pdf_courier::Error;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type Scripted = Result<TransportResponse, TransportError>;

/// Replays a fixed list of responses and records every request it sees.
/// Once the script runs out it keeps timing out.
struct ScriptedTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<SignedRequest>>,
}

impl ScriptedTransport {
    fn new(responses: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn strategies(&self) -> Vec<Strategy> {
        self.requests.lock().unwrap().iter().map(|r| r.strategy).collect()
    }

    fn requests(&self) -> Vec<SignedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, request: &SignedRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(TransportError::Timeout))
    }
}

/// Never answers within a test's lifetime.
struct StalledTransport;

#[async_trait]
impl HttpTransport for StalledTransport {
    async fn get(&self, _request: &SignedRequest) -> Result<TransportResponse, TransportError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Err(TransportError::Timeout)
    }
}

fn locator() -> ObjectLocator {
    ObjectLocator::new("reports", "2024/Q1 summary (final).txt", "eu-west-1")
}

fn coordinator(transport: Arc<dyn HttpTransport>, max_attempts: u32) -> RetrievalCoordinator {
    RetrievalCoordinator::new(
        transport,
        Arc::new(Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")),
    )
    .with_policy(RetryPolicy {
        max_attempts,
        backoff_base: Duration::ZERO,
    })
}

async fn retrieve(
    coordinator: &RetrievalCoordinator,
) -> pdf_courier::Result<pdf_courier::storage::DownloadResult> {
    let sink = NoProgress;
    let reporter = ProgressReporter::new(&sink);
    coordinator
        .retrieve(&locator(), &reporter, &CancellationToken::new())
        .await
}

mod strategy_order {
    use super::*;

    #[tokio::test]
    async fn test_first_strategy_success() {
        let transport =
            ScriptedTransport::new(vec![Ok(TransportResponse::ok(b"hello".to_vec(), Some("text/plain")))]);
        let result = retrieve(&coordinator(transport.clone(), 3)).await.unwrap();

        assert_eq!(result.bytes, b"hello");
        assert_eq!(result.size_bytes, 5);
        assert_eq!(result.content_type.as_deref(), Some("text/plain"));
        assert_eq!(result.strategy, Strategy::PresignedUrl);
        assert_eq!(transport.strategies(), vec![Strategy::PresignedUrl]);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let transport = ScriptedTransport::new(vec![
            Ok(TransportResponse::s3_error(503, "SlowDown", "Reduce your request rate")),
            Ok(TransportResponse::ok(b"data".to_vec(), None)),
        ]);
        let result = retrieve(&coordinator(transport.clone(), 3)).await.unwrap();

        assert_eq!(result.strategy, Strategy::PresignedUrl);
        assert_eq!(transport.strategies(), vec![Strategy::PresignedUrl; 2]);
    }

    #[tokio::test]
    async fn test_empty_body_is_retried() {
        let transport = ScriptedTransport::new(vec![
            Ok(TransportResponse::ok(Vec::new(), None)),
            Ok(TransportResponse::ok(b"data".to_vec(), None)),
        ]);
        let result = retrieve(&coordinator(transport.clone(), 3)).await.unwrap();
        assert_eq!(result.bytes, b"data");
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_falls_through_to_signed_headers() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Connect("connection refused".to_string())),
            Ok(TransportResponse::ok(b"data".to_vec(), None)),
        ]);
        let result = retrieve(&coordinator(transport.clone(), 1)).await.unwrap();

        assert_eq!(result.strategy, Strategy::SignedHeaders);
        assert_eq!(
            transport.strategies(),
            vec![Strategy::PresignedUrl, Strategy::SignedHeaders]
        );
    }

    #[tokio::test]
    async fn test_not_found_moves_to_next_strategy() {
        let transport = ScriptedTransport::new(vec![
            Ok(TransportResponse::s3_error(404, "NoSuchKey", "The specified key does not exist.")),
            Ok(TransportResponse::s3_error(404, "NoSuchKey", "The specified key does not exist.")),
            Ok(TransportResponse::s3_error(404, "NoSuchKey", "The specified key does not exist.")),
        ]);
        let err = retrieve(&coordinator(transport.clone(), 3)).await.unwrap_err();

        // Permanent failures are not retried within a strategy
        assert_eq!(transport.requests().len(), 3);
        match err {
            Error::AllStrategiesFailed { attempts } => {
                assert_eq!(attempts.len(), 3);
                assert!(attempts.iter().all(|a| a.tries == 1 && a.status == Some(404)));
                assert!(attempts[0].message.contains("NoSuchKey"));
            },
            other => panic!("unexpected error {:?}", other),
        }
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_dot_segment_key_is_rejected_without_requests() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::ok(b"x".to_vec(), None))]);
        let sink = NoProgress;
        let reporter = ProgressReporter::new(&sink);
        let locator = ObjectLocator::new("reports", "2024/../q1.txt", "eu-west-1");
        let err = coordinator(transport.clone(), 3)
            .retrieve(&locator, &reporter, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Config(ref msg) if msg.contains("'..'")));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_access_denied_stops_immediately() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::s3_error(
            403,
            "AccessDenied",
            "Access Denied",
        ))]);
        let err = retrieve(&coordinator(transport.clone(), 3)).await.unwrap_err();

        assert_eq!(transport.requests().len(), 1);
        match &err {
            Error::Auth {
                strategy,
                status,
                code,
                attempts,
                ..
            } => {
                assert_eq!(*strategy, Strategy::PresignedUrl);
                assert_eq!(*status, 403);
                assert_eq!(code.as_deref(), Some("AccessDenied"));
                assert_eq!(attempts.len(), 1);
            },
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!err.remediation().is_empty());
    }

    #[tokio::test]
    async fn test_expired_token_on_bad_request_is_auth() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::s3_error(
            400,
            "ExpiredToken",
            "The provided token has expired.",
        ))]);
        let err = retrieve(&coordinator(transport.clone(), 3)).await.unwrap_err();
        assert!(matches!(err, Error::Auth { status: 400, .. }));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_all_strategies_time_out() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
        ]);
        let err = retrieve(&coordinator(transport.clone(), 1)).await.unwrap_err();

        assert_eq!(transport.strategies(), Strategy::ORDER.to_vec());
        let attempts = err.attempts();
        assert_eq!(
            attempts.iter().map(|a| a.strategy).collect::<Vec<_>>(),
            Strategy::ORDER.to_vec()
        );
        assert!(attempts.iter().all(|a| a.status.is_none() && a.tries == 1));
        assert!(matches!(err, Error::AllStrategiesFailed { .. }));
    }

    #[tokio::test]
    async fn test_default_policy_tries_each_strategy_three_times() {
        let transport = ScriptedTransport::new(Vec::new());
        let err = retrieve(&coordinator(transport.clone(), 3)).await.unwrap_err();

        assert_eq!(transport.requests().len(), 9);
        assert!(err.attempts().iter().all(|a| a.tries == 3));
    }
}

mod request_shapes {
    use super::*;

    #[tokio::test]
    async fn test_each_strategy_authenticates_differently() {
        let transport = ScriptedTransport::new(Vec::new());
        let _ = retrieve(&coordinator(transport.clone(), 1)).await;
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);

        let presigned = &requests[0];
        assert!(presigned.url.contains("X-Amz-Signature="));
        assert!(presigned.url.contains("X-Amz-Algorithm=AWS4-HMAC-SHA256"));
        assert!(presigned.url.contains("/2024/Q1%20summary%20%28final%29.txt?"));
        assert!(presigned.header("authorization").is_none());

        let signed = &requests[1];
        assert!(!signed.url.contains('?'));
        let authorization = signed.header("Authorization").unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
        assert!(authorization.contains("/eu-west-1/s3/aws4_request"));
        assert_eq!(signed.header("x-amz-content-sha256"), Some("UNSIGNED-PAYLOAD"));

        let basic = &requests[2];
        assert!(basic.header("authorization").unwrap().starts_with("Basic "));
        assert!(basic.expiry.is_none());
    }

    #[tokio::test]
    async fn test_source_url_is_redacted() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::ok(b"x".to_vec(), None))]);
        let result = retrieve(&coordinator(transport, 1)).await.unwrap();
        assert!(result.source_url.contains("X-Amz-Signature=<redacted>"));
        assert!(!result.source_url.contains("AKIDEXAMPLE"));
    }
}

mod progress_and_cancellation {
    use super::*;

    #[tokio::test]
    async fn test_progress_is_monotonic_and_completes() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            Ok(TransportResponse::ok(b"done".to_vec(), None)),
        ]);
        let coordinator = coordinator(transport, 2);

        let seen = Mutex::new(Vec::new());
        let sink = FnProgress(|e: &ProgressEvent| seen.lock().unwrap().push(e.clone()));
        let reporter = ProgressReporter::new(&sink);
        coordinator
            .retrieve(&locator(), &reporter, &CancellationToken::new())
            .await
            .unwrap();

        let events = seen.into_inner().unwrap();
        let percentages: Vec<u8> = events.iter().map(|e| e.percentage).collect();
        assert!(percentages.windows(2).all(|w| w[0] <= w[1]), "{:?}", percentages);
        assert_eq!(percentages.last(), Some(&100));
        assert!(events
            .iter()
            .filter_map(|e| e.signed_url.as_deref())
            .all(|url| !url.contains("wJalrXUtnFEMI")));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_request() {
        let transport = ScriptedTransport::new(Vec::new());
        let coordinator = coordinator(transport.clone(), 3);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let sink = NoProgress;
        let reporter = ProgressReporter::new(&sink);
        let err = coordinator.retrieve(&locator(), &reporter, &cancel).await.unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_while_request_in_flight() {
        let coordinator = coordinator(Arc::new(StalledTransport), 3);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let sink = NoProgress;
        let reporter = ProgressReporter::new(&sink);
        let err = tokio::time::timeout(
            Duration::from_secs(5),
            coordinator.retrieve(&locator(), &reporter, &cancel),
        )
        .await
        .expect("cancellation should interrupt the request")
        .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
    }
}
