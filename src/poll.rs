//! Poll driver: drives one remote analysis to a terminal status.
//!
//! Each attempt issues one GET, classifies the result and either returns,
//! fails, or waits before the next attempt:
//!
//! | outcome                                   | action                        |
//! |-------------------------------------------|-------------------------------|
//! | transport error, non-200, bad body        | wait `retry_backoff`, retry   |
//! | `IN_QUEUE` / `DNS` / `IN_PROGRESS` / other | wait `poll_interval`, retry   |
//! | `READY` with endpoints                    | return the report             |
//! | empty host, `ERROR`, `READY` w/o endpoints | fail immediately              |
//!
//! Every outcome consumes one attempt from `max_attempts`. The first attempt
//! uses the initial URL, all later ones the follow-up URL. Attempts never
//! overlap. A [`CancellationToken`] and the optional overall deadline both
//! interrupt the request in flight as well as the waits.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::analysis::{AnalysisReport, AnalysisStatus};
use crate::errors::{CancelReason, Result, TlsGradeError};
use crate::request::AnalysisUrls;
use crate::transport::AnalysisTransport;

/// Attempt budget used by the CLI.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

/// Timing and budget of the poll loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Maximum number of requests, every outcome counts
    pub max_attempts: u32,

    /// Wait after a non-terminal status
    pub poll_interval: Duration,

    /// Wait after a transient failure
    pub retry_backoff: Duration,

    /// Wall-clock bound for the whole run
    pub max_total_duration: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(5),
            max_total_duration: None,
        }
    }
}

/// Builder pattern for creating poll configurations
pub struct PollConfigBuilder {
    config: PollConfig,
}

impl PollConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: PollConfig::default(),
        }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.config.retry_backoff = backoff;
        self
    }

    pub fn max_total_duration(mut self, duration: Option<Duration>) -> Self {
        self.config.max_total_duration = duration;
        self
    }

    pub fn build(self) -> PollConfig {
        self.config
    }
}

impl Default for PollConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Retryable failure of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransientFailure {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Result of one attempt.
#[derive(Debug)]
pub enum PollOutcome {
    /// Retry after the short backoff.
    Transient(TransientFailure),
    /// Analysis still running (or an unrecognized status); retry after the poll interval.
    Pending { status: AnalysisStatus, progress: u8 },
    /// `READY` with at least one endpoint.
    Terminal(AnalysisReport),
    /// Stop without retrying.
    Fatal(TlsGradeError),
}

/// Decode a `200 OK` body.
///
/// With `capture_raw` the body is decoded into a generic JSON tree first;
/// the tree is pretty-printed into `raw_payload` (keys sorted, two-space
/// indent) so fields not modelled by [`AnalysisReport`] are preserved.
pub fn decode_report(
    body: &[u8],
    capture_raw: bool,
) -> std::result::Result<AnalysisReport, TransientFailure> {
    if !capture_raw {
        return serde_json::from_slice(body).map_err(|e| TransientFailure::Decode(e.to_string()));
    }

    let tree: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| TransientFailure::Decode(e.to_string()))?;
    let pretty =
        serde_json::to_string_pretty(&tree).map_err(|e| TransientFailure::Decode(e.to_string()))?;
    let mut report: AnalysisReport =
        serde_json::from_value(tree).map_err(|e| TransientFailure::Decode(e.to_string()))?;
    report.raw_payload = Some(pretty);
    Ok(report)
}

/// Apply the host-echo check and the remote status state machine.
pub fn classify(report: AnalysisReport, requested_host: &str) -> PollOutcome {
    if report.host.is_empty() {
        return PollOutcome::Fatal(TlsGradeError::missing_host_echo(requested_host));
    }

    match report.status {
        AnalysisStatus::Ready if report.endpoints.is_empty() => {
            PollOutcome::Fatal(TlsGradeError::no_endpoints(report.host))
        }
        AnalysisStatus::Ready => PollOutcome::Terminal(report),
        AnalysisStatus::Error => PollOutcome::Fatal(TlsGradeError::remote_error(
            report.host,
            report.status_message,
        )),
        _ => {
            let progress = report.progress_percent();
            PollOutcome::Pending {
                status: report.status,
                progress,
            }
        }
    }
}

/// Sequential poll loop over an [`AnalysisTransport`].
pub struct PollDriver {
    transport: Arc<dyn AnalysisTransport>,
    config: PollConfig,
}

impl PollDriver {
    pub fn new(transport: Arc<dyn AnalysisTransport>, config: PollConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll until the analysis behind `urls` reaches a terminal status.
    ///
    /// Returns the terminal report, a fatal analysis error, the budget error,
    /// or `Cancelled` when `cancel` fires or the overall deadline passes.
    pub async fn poll(
        &self,
        urls: &AnalysisUrls,
        capture_raw: bool,
        cancel: &CancellationToken,
    ) -> Result<AnalysisReport> {
        let max_attempts = self.config.max_attempts;
        // A deadline past the clock's range is no deadline at all.
        let deadline = self
            .config
            .max_total_duration
            .and_then(|d| Instant::now().checked_add(d));
        let requested_host = requested_host(&urls.initial);

        for attempt in 1..=max_attempts {
            let url = if attempt == 1 {
                &urls.initial
            } else {
                &urls.follow_up
            };

            let outcome = self
                .interruptible(
                    self.attempt(url, capture_raw, &requested_host),
                    cancel,
                    deadline,
                    attempt - 1,
                )
                .await?;

            let pause = match outcome {
                PollOutcome::Terminal(report) => {
                    info!(
                        attempt,
                        host = %report.host,
                        endpoints = report.endpoints.len(),
                        "analysis ready"
                    );
                    return Ok(report);
                }
                PollOutcome::Fatal(err) => {
                    debug!(attempt, error = %err, "analysis failed");
                    return Err(err);
                }
                PollOutcome::Transient(failure) => {
                    warn!(
                        "attempt {attempt}/{max_attempts} failed: {failure}; retrying in {:?}",
                        self.config.retry_backoff
                    );
                    self.config.retry_backoff
                }
                PollOutcome::Pending { status, progress } => {
                    if status.is_known_pending() {
                        info!("[{attempt}/{max_attempts}] progress: {progress}% (status: {status})");
                    } else {
                        warn!("[{attempt}/{max_attempts}] unrecognized status: {status:?}");
                    }
                    self.config.poll_interval
                }
            };

            if attempt < max_attempts {
                self.interruptible(sleep(pause), cancel, deadline, attempt)
                    .await?;
            }
        }

        Err(TlsGradeError::attempts_exhausted(max_attempts))
    }

    /// One request/decode/classify cycle.
    async fn attempt(&self, url: &Url, capture_raw: bool, requested_host: &str) -> PollOutcome {
        let response = match self.transport.get(url).await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return PollOutcome::Transient(TransientFailure::Timeout(e.to_string()));
            }
            Err(e) => return PollOutcome::Transient(TransientFailure::Transport(e.to_string())),
        };

        if !response.is_ok() {
            return PollOutcome::Transient(TransientFailure::HttpStatus(response.status));
        }

        match decode_report(&response.body, capture_raw) {
            Ok(report) => classify(report, requested_host),
            Err(failure) => PollOutcome::Transient(failure),
        }
    }

    /// Run `fut` unless the token fires or the deadline passes first.
    /// `completed` is the number of attempts finished so far.
    async fn interruptible<F: Future>(
        &self,
        fut: F,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
        completed: u32,
    ) -> Result<F::Output> {
        let expiry = async {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                Err(TlsGradeError::cancelled(completed, CancelReason::Interrupted))
            }
            _ = expiry => {
                Err(TlsGradeError::cancelled(completed, CancelReason::DeadlineExceeded))
            }
            output = fut => Ok(output),
        }
    }
}

fn requested_host(url: &Url) -> String {
    url.query_pairs()
        .find(|(k, _)| k == "host")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{AnalysisRequest, RequestBuilder};
    use crate::transport::{TransportError, TransportResponse};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Scripted = std::result::Result<TransportResponse, TransportError>;

    /// Replays canned responses and records every request.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Scripted>>,
        repeat: Option<Scripted>,
        requests: Mutex<Vec<(Url, Instant)>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                repeat: None,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn repeating(response: Scripted) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(VecDeque::new()),
                repeat: Some(response),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<(Url, Instant)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AnalysisTransport for ScriptedTransport {
        async fn get(&self, url: &Url) -> Scripted {
            self.requests
                .lock()
                .unwrap()
                .push((url.clone(), Instant::now()));
            let next = self.script.lock().unwrap().pop_front();
            next.or_else(|| self.repeat.clone())
                .unwrap_or_else(|| Err(TransportError::new("script exhausted")))
        }
    }

    fn status_body(status: &str, endpoints: usize) -> Scripted {
        let endpoints: Vec<serde_json::Value> = (0..endpoints)
            .map(|i| {
                serde_json::json!({
                    "ipAddress": format!("192.0.2.{}", i + 1),
                    "grade": "A",
                    "progress": 100
                })
            })
            .collect();
        let body = serde_json::json!({
            "host": "example.com",
            "port": 443,
            "protocol": "http",
            "status": status,
            "endpoints": endpoints
        });
        Ok(TransportResponse::ok(body.to_string()))
    }

    fn urls(start_new: bool) -> AnalysisUrls {
        let request = AnalysisRequest::builder("example.com")
            .start_new(start_new)
            .build()
            .unwrap();
        RequestBuilder::default().build(&request)
    }

    fn driver(transport: Arc<ScriptedTransport>) -> PollDriver {
        PollDriver::new(transport, PollConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_two_in_progress() {
        let transport = ScriptedTransport::new(vec![
            status_body("IN_PROGRESS", 0),
            status_body("IN_PROGRESS", 1),
            status_body("READY", 1),
        ]);
        let urls = urls(true);

        let report = driver(transport.clone())
            .poll(&urls, false, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.status, AnalysisStatus::Ready);
        assert_eq!(report.endpoints.len(), 1);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].0, urls.initial);
        assert_eq!(requests[1].0, urls.follow_up);
        assert_eq!(requests[2].0, urls.follow_up);
        assert_eq!(requests[1].1 - requests[0].1, Duration::from_secs(10));
        assert_eq!(requests[2].1 - requests[1].1, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_use_short_backoff() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::new("connection refused")),
            Err(TransportError::timeout("operation timed out")),
            Ok(TransportResponse::with_status(503)),
            Ok(TransportResponse::ok("<html>maintenance</html>")),
            status_body("READY", 2),
        ]);

        let report = driver(transport.clone())
            .poll(&urls(false), false, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.endpoints.len(), 2);

        let requests = transport.requests();
        assert_eq!(requests.len(), 5);
        for pair in requests.windows(2) {
            assert_eq!(pair[1].1 - pair[0].1, Duration::from_secs(5));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_without_endpoints_is_fatal() {
        let transport = ScriptedTransport::new(vec![status_body("READY", 0)]);

        let err = driver(transport.clone())
            .poll(&urls(false), false, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TlsGradeError::NoEndpoints { .. }));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_error_is_fatal_at_any_attempt() {
        let transport = ScriptedTransport::new(vec![
            status_body("DNS", 0),
            status_body("IN_QUEUE", 0),
            Ok(TransportResponse::ok(
                r#"{"host":"example.com","status":"ERROR","statusMessage":"Unable to resolve domain name"}"#,
            )),
            status_body("READY", 1),
        ]);

        let err = driver(transport.clone())
            .poll(&urls(false), false, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            TlsGradeError::RemoteError {
                host,
                status_message,
            } => {
                assert_eq!(host, "example.com");
                assert_eq!(
                    status_message.as_deref(),
                    Some("Unable to resolve domain name")
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_host_echo_is_fatal() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::ok(
            r#"{"status":"IN_PROGRESS","endpoints":[]}"#,
        ))]);

        let err = driver(transport.clone())
            .poll(&urls(false), false, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            TlsGradeError::MissingHostEcho { requested } => assert_eq!(requested, "example.com"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhausted_after_fifty_attempts() {
        let transport = ScriptedTransport::repeating(status_body("IN_QUEUE", 0));

        let err = driver(transport.clone())
            .poll(&urls(false), false, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TlsGradeError::AttemptsExhausted { attempts: 50 }));
        assert_eq!(transport.requests().len(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_consume_budget() {
        let transport = ScriptedTransport::repeating(Ok(TransportResponse::with_status(502)));
        let config = PollConfigBuilder::new().max_attempts(4).build();

        let err = PollDriver::new(transport.clone(), config)
            .poll(&urls(false), false, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TlsGradeError::AttemptsExhausted { attempts: 4 }));
        assert_eq!(transport.requests().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_status_keeps_polling() {
        let transport = ScriptedTransport::new(vec![
            status_body("WARMING_UP", 0),
            status_body("READY", 1),
        ]);

        let report = driver(transport.clone())
            .poll(&urls(false), false, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.status, AnalysisStatus::Ready);
        let requests = transport.requests();
        assert_eq!(requests[1].1 - requests[0].1, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_raw_capture_keeps_unmodelled_fields() {
        let body = r#"{"host":"example.com","status":"READY","certs":[{"subject":"CN=example.com"}],
            "endpoints":[{"ipAddress":"192.0.2.1","grade":"A","details":{"heartbleed":false}}]}"#;
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::ok(body))]);

        let report = driver(transport)
            .poll(&urls(false), true, &CancellationToken::new())
            .await
            .unwrap();

        let raw = report.raw_payload.expect("raw payload captured");
        assert!(raw.contains("\"certs\""));
        assert!(raw.contains("\"heartbleed\": false"));

        let reparsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let first = serde_json::to_string_pretty(&reparsed).unwrap();
        let second = serde_json::to_string_pretty(&reparsed).unwrap();
        assert_eq!(first, raw);
        assert_eq!(first, second);
    }

    #[test]
    fn test_plain_decode_has_no_raw_payload() {
        let report = decode_report(br#"{"host":"example.com","status":"DNS"}"#, false).unwrap();
        assert!(report.raw_payload.is_none());
        assert!(matches!(
            decode_report(b"not json", true),
            Err(TransientFailure::Decode(_))
        ));
    }

    #[test]
    fn test_classify_pending_reports_first_endpoint_progress() {
        let report: AnalysisReport = serde_json::from_str(
            r#"{"host":"example.com","status":"IN_PROGRESS",
                "endpoints":[{"progress":35},{"progress":80}]}"#,
        )
        .unwrap();

        match classify(report, "example.com") {
            PollOutcome::Pending { status, progress } => {
                assert_eq!(status, AnalysisStatus::InProgress);
                assert_eq!(progress, 35);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_wait() {
        let transport = ScriptedTransport::repeating(status_body("IN_PROGRESS", 0));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });

        let err = driver(transport.clone())
            .poll(&urls(false), false, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TlsGradeError::Cancelled {
                attempts: 1,
                reason: CancelReason::Interrupted
            }
        ));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_request() {
        let transport = ScriptedTransport::repeating(status_body("READY", 1));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = driver(transport.clone())
            .poll(&urls(false), false, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, TlsGradeError::Cancelled { attempts: 0, .. }));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_total_wait() {
        let transport = ScriptedTransport::repeating(status_body("IN_QUEUE", 0));
        let config = PollConfigBuilder::new()
            .max_total_duration(Some(Duration::from_secs(25)))
            .build();

        let err = PollDriver::new(transport.clone(), config)
            .poll(&urls(false), false, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TlsGradeError::Cancelled {
                attempts: 3,
                reason: CancelReason::DeadlineExceeded
            }
        ));
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_deadline_is_ignored() {
        let transport = ScriptedTransport::new(vec![
            status_body("IN_QUEUE", 0),
            status_body("READY", 1),
        ]);
        let config = PollConfigBuilder::new()
            .max_total_duration(Some(Duration::from_secs(u64::MAX)))
            .build();

        let report = PollDriver::new(transport.clone(), config)
            .poll(&urls(false), false, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.status, AnalysisStatus::Ready);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_with_null_grade_is_terminal() {
        let body = r#"{"host":"example.com","status":"READY","engineVersion":null,
            "endpoints":[{"ipAddress":"192.0.2.1","grade":null,"progress":100}]}"#;
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::ok(body))]);

        let report = driver(transport.clone())
            .poll(&urls(false), false, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.endpoints[0].grade, "");
        assert_eq!(report.engine_version, "");
        assert_eq!(transport.requests().len(), 1);
    }
}
