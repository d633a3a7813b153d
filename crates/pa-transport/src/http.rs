//! HTTP backend client.
//!
//! `record` never touches the network. Events are queued on a bounded
//! channel and a background task on a dedicated runtime sends them one at a
//! time, so a slow backend can delay telemetry but never the caller. When
//! the queue is full the event is dropped and the call reports
//! [`ErrorCode::NoConnection`].
//!
//! Failures the worker finds after `record` returned go to the registered
//! [`FailureListener`]. A startup that completes after `configure` stopped
//! waiting still configures the transport.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pa_core::{ErrorCode, Event, EventKind, Status};
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::wire::WireRecord;
use crate::{FailureListener, LastError, Transport, TransportError};

/// Default request timeout for backend calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_ENDPOINT: &str = "https://analytics.practicalvr.com";
const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// Extra time allowed for a reply beyond the request timeout itself.
const REPLY_GRACE: Duration = Duration::from_millis(500);
const FLUSH_POLL: Duration = Duration::from_millis(10);
const CLIENT_NAME: &str = "pa-transport";

/// HTTP transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Base URL of the backend, without a trailing route.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Events that may wait for the worker before new ones are dropped.
    pub queue_capacity: usize,
    /// Honor `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub system_proxy: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            system_proxy: true,
        }
    }
}

enum Job {
    Startup {
        api_key: String,
        reply: std_mpsc::SyncSender<Status>,
    },
    Record(WireRecord),
    Flush {
        reply: std_mpsc::SyncSender<Status>,
    },
}

type ListenerSlot = Arc<RwLock<Option<Arc<dyn FailureListener>>>>;

/// Queued HTTP client for the analytics backend.
///
/// Owns a one-thread worker runtime, so it may be created and dropped
/// from inside or outside an async context.
pub struct HttpTransport {
    endpoint: String,
    jobs: mpsc::Sender<Job>,
    /// Set by the worker once the backend accepts an API key.
    configured: Arc<AtomicBool>,
    last_error: Arc<LastError>,
    listener: ListenerSlot,
    timeout: Duration,
    runtime: Option<Runtime>,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("configured", &self.configured.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Builds the client and starts its worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a URL, the queue capacity is
    /// zero, or the HTTP client or runtime fail to build.
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        if config.queue_capacity == 0 {
            return Err(TransportError::ZeroCapacity);
        }

        let endpoint = config.endpoint.trim().trim_end_matches('/').to_string();
        reqwest::Url::parse(&endpoint).map_err(|err| TransportError::InvalidEndpoint {
            endpoint: endpoint.clone(),
            reason: err.to_string(),
        })?;

        let mut builder = reqwest::Client::builder().timeout(config.timeout);
        if !config.system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder.build().map_err(TransportError::ClientBuild)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("pa-transport")
            .enable_all()
            .build()
            .map_err(TransportError::Runtime)?;

        let (jobs, receiver) = mpsc::channel(config.queue_capacity);
        let configured = Arc::new(AtomicBool::new(false));
        let last_error = Arc::new(LastError::default());
        let listener = ListenerSlot::default();
        let worker = Worker {
            http,
            endpoint: endpoint.clone(),
            api_key: None,
            configured: Arc::clone(&configured),
            last_error: Arc::clone(&last_error),
            listener: Arc::clone(&listener),
        };
        runtime.spawn(worker.run(receiver));

        Ok(Self {
            endpoint,
            jobs,
            configured,
            last_error,
            listener,
            timeout: config.timeout,
            runtime: Some(runtime),
        })
    }

    fn fail(&self, err: ErrorCode) -> Status {
        let status = Status::Failed(err);
        self.last_error.observe(status);
        status
    }
}

impl Transport for HttpTransport {
    /// Authenticates with the backend, waiting at most one request timeout.
    ///
    /// On a timeout the startup request stays queued; if it later succeeds
    /// the transport is configured even though this returned a failure.
    fn configure(&self, api_key: &str) -> Status {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return self.fail(ErrorCode::InvalidApiKey);
        }

        let (reply, response) = std_mpsc::sync_channel(1);
        let job = Job::Startup {
            api_key: api_key.to_string(),
            reply,
        };
        if self.jobs.try_send(job).is_err() {
            return self.fail(ErrorCode::NoConnection);
        }

        response
            .recv_timeout(self.timeout + REPLY_GRACE)
            .unwrap_or_else(|_| {
                tracing::warn!(endpoint = %self.endpoint, "backend startup timed out");
                self.fail(ErrorCode::NoConnection)
            })
    }

    fn record(&self, event: &Event) -> Status {
        if !self.configured.load(Ordering::Acquire) {
            return self.fail(ErrorCode::NotConfigured);
        }

        match self.jobs.try_send(Job::Record(WireRecord::from(event))) {
            Ok(()) => Status::Success,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(kind = %event.kind, "event queue full, dropping event");
                self.fail(ErrorCode::NoConnection)
            }
            Err(TrySendError::Closed(_)) => self.fail(ErrorCode::NoConnection),
        }
    }

    fn last_error_message(&self) -> Option<String> {
        self.last_error.get()
    }

    fn set_failure_listener(&self, listener: Arc<dyn FailureListener>) {
        *self.listener.write() = Some(listener);
    }

    fn flush(&self, timeout: Duration) -> Status {
        let deadline = Instant::now() + timeout;
        let (reply, response) = std_mpsc::sync_channel(1);
        let mut job = Job::Flush { reply };
        loop {
            match self.jobs.try_send(job) {
                Ok(()) => break,
                Err(TrySendError::Full(returned)) if Instant::now() < deadline => {
                    job = returned;
                    std::thread::sleep(FLUSH_POLL);
                }
                Err(_) => return Status::Failed(ErrorCode::NoConnection),
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        response
            .recv_timeout(remaining)
            .unwrap_or(Status::Failed(ErrorCode::NoConnection))
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

struct Worker {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    configured: Arc<AtomicBool>,
    last_error: Arc<LastError>,
    listener: ListenerSlot,
}

#[derive(Debug, Serialize)]
struct StartupRequest {
    client: &'static str,
    version: &'static str,
}

impl Worker {
    async fn run(mut self, mut jobs: mpsc::Receiver<Job>) {
        while let Some(job) = jobs.recv().await {
            match job {
                Job::Startup { api_key, reply } => {
                    let url = format!("{}/v1/startup", self.endpoint);
                    let request = StartupRequest {
                        client: CLIENT_NAME,
                        version: env!("CARGO_PKG_VERSION"),
                    };
                    let status = self.post(&url, &api_key, &request).await;
                    if status.is_success() {
                        tracing::debug!(endpoint = %self.endpoint, "backend startup succeeded");
                        self.api_key = Some(api_key);
                        self.configured.store(true, Ordering::Release);
                    } else {
                        tracing::warn!(
                            code = status.code(),
                            message = %status.message(),
                            "backend startup failed"
                        );
                    }
                    self.last_error.observe(status);
                    let _ = reply.try_send(status);
                }
                Job::Record(record) => {
                    let Some(api_key) = self.api_key.as_deref() else {
                        self.failed(record.kind, Status::Failed(ErrorCode::NotConfigured));
                        continue;
                    };
                    let url = format!("{}/v1/events/{}", self.endpoint, record.route());
                    let status = self.post(&url, api_key, &record).await;
                    if !status.is_success() {
                        tracing::warn!(
                            code = status.code(),
                            message = %status.message(),
                            route = record.route(),
                            "backend rejected event"
                        );
                        self.failed(record.kind, status);
                    }
                }
                Job::Flush { reply } => {
                    let _ = reply.try_send(Status::Success);
                }
            }
        }
    }

    fn failed(&self, kind: EventKind, status: Status) {
        self.last_error.observe(status);
        let listener = self.listener.read().clone();
        if let Some(listener) = listener {
            listener.on_failure(kind, status);
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, api_key: &str, body: &T) -> Status {
        let response = match self
            .http
            .post(url)
            .header("x-api-key", api_key)
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(url, error = %err, "backend request failed");
                return Status::Failed(ErrorCode::NoConnection);
            }
        };

        let http_status = response.status();
        if http_status == StatusCode::UNAUTHORIZED || http_status == StatusCode::FORBIDDEN {
            return Status::Failed(ErrorCode::InvalidApiKey);
        }

        match response.text().await {
            Ok(text) => status_from_response(http_status, &text),
            Err(err) => {
                tracing::debug!(url, error = %err, "failed to read backend response");
                Status::Failed(ErrorCode::NoConnection)
            }
        }
    }
}

/// Reads the backend's `{"status": n}` body. Without one, the HTTP status
/// decides: any 2xx is success, anything else an unknown error carrying the
/// HTTP code.
fn status_from_response(http_status: StatusCode, body: &str) -> Status {
    #[derive(Deserialize)]
    struct Payload {
        status: i32,
    }

    match serde_json::from_str::<Payload>(body) {
        Ok(payload) => Status::from_code(payload.status),
        Err(_) if http_status.is_success() => Status::Success,
        Err(_) => Status::Failed(ErrorCode::Unknown(i32::from(http_status.as_u16()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::JoinHandle;

    use parking_lot::Mutex;

    use chrono::Utc;
    use pa_core::Value;

    /// A request seen by the stub backend.
    #[derive(Debug)]
    struct Seen {
        path: String,
        api_key: Option<String>,
        body: String,
    }

    /// Reads one request from `stream` and answers it with `body`.
    fn answer(stream: TcpStream, body: &str) -> Seen {
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let path = request_line
            .split_whitespace()
            .nth(1)
            .unwrap_or_default()
            .to_string();

        let mut content_length = 0;
        let mut api_key = None;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                match name.to_ascii_lowercase().as_str() {
                    "content-length" => content_length = value.trim().parse().unwrap(),
                    "x-api-key" => api_key = Some(value.trim().to_string()),
                    _ => {}
                }
            }
        }
        let mut request_body = vec![0; content_length];
        reader.read_exact(&mut request_body).unwrap();

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
        .unwrap();
        stream.flush().unwrap();

        Seen {
            path,
            api_key,
            body: String::from_utf8(request_body).unwrap(),
        }
    }

    /// Serves `bodies.len()` requests, answering each with the next body.
    fn stub_backend(bodies: Vec<&'static str>) -> (String, JoinHandle<Vec<Seen>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            bodies
                .into_iter()
                .map(|body| answer(listener.accept().unwrap().0, body))
                .collect()
        });
        (endpoint, handle)
    }

    /// Answers `bodies`, then accepts every further connection and never
    /// replies. Each held connection is announced on the returned channel.
    fn stalling_backend(bodies: Vec<&'static str>) -> (String, std_mpsc::Receiver<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let (held_tx, held_rx) = std_mpsc::channel();
        std::thread::spawn(move || {
            for body in bodies {
                answer(listener.accept().unwrap().0, body);
            }
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept() {
                held.push(stream);
                if held_tx.send(()).is_err() {
                    break;
                }
            }
        });
        (endpoint, held_rx)
    }

    #[derive(Default)]
    struct RecordingListener(Mutex<Vec<(EventKind, Status)>>);

    impl FailureListener for RecordingListener {
        fn on_failure(&self, kind: EventKind, status: Status) {
            self.0.lock().push((kind, status));
        }
    }

    fn transport(endpoint: String) -> HttpTransport {
        HttpTransport::new(HttpConfig {
            endpoint,
            timeout: Duration::from_secs(5),
            queue_capacity: 8,
            system_proxy: false,
        })
        .unwrap()
    }

    #[test]
    fn rejects_invalid_endpoint() {
        let err = HttpTransport::new(HttpConfig {
            endpoint: "not a url".to_string(),
            ..HttpConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, TransportError::InvalidEndpoint { .. }));
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = HttpTransport::new(HttpConfig {
            queue_capacity: 0,
            ..HttpConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, TransportError::ZeroCapacity));
    }

    #[test]
    fn record_before_configure_is_not_configured() {
        let transport = transport("http://127.0.0.1:9".to_string());
        let status = transport.record(&Event::gain("Coins", Value::ONE, Utc::now()));
        assert_eq!(status, Status::Failed(ErrorCode::NotConfigured));
        assert_eq!(
            transport.last_error_message().as_deref(),
            Some("Must call startup function first.")
        );
    }

    #[test]
    fn blank_api_key_fails_without_network() {
        let transport = transport("http://127.0.0.1:9".to_string());
        assert_eq!(
            transport.configure("   "),
            Status::Failed(ErrorCode::InvalidApiKey)
        );
    }

    #[test]
    fn debug_does_not_leak_api_key() {
        let (endpoint, server) = stub_backend(vec![r#"{"status":0}"#]);
        let transport = transport(endpoint);
        assert!(transport.configure("secret-key").is_success());
        let debug = format!("{transport:?}");
        assert!(!debug.contains("secret-key"));
        server.join().unwrap();
    }

    #[test]
    fn configure_then_record_posts_to_backend() {
        let (endpoint, server) = stub_backend(vec![r#"{"status":0}"#, r#"{"status":0}"#]);
        let transport = transport(endpoint);

        assert!(transport.configure("key-123").is_success());
        let status = transport.record(&Event::gain("Coins", Value::new(3.0).unwrap(), Utc::now()));
        assert!(status.is_success());
        assert!(transport.flush(Duration::from_secs(5)).is_success());

        let seen = server.join().unwrap();
        assert_eq!(seen[0].path, "/v1/startup");
        assert_eq!(seen[0].api_key.as_deref(), Some("key-123"));
        assert_eq!(seen[1].path, "/v1/events/gain");
        let body: serde_json::Value = serde_json::from_str(&seen[1].body).unwrap();
        assert_eq!(body["unique_identifier"], "Coins");
        assert_eq!(body["value"], "3.0");
    }

    #[test]
    fn backend_error_code_becomes_last_error() {
        let (endpoint, server) = stub_backend(vec![r#"{"status":0}"#, r#"{"status":3}"#]);
        let transport = transport(endpoint);

        assert!(transport.configure("key-123").is_success());
        transport.record(&Event::loss("Health", Value::ONE, Utc::now()));
        transport.flush(Duration::from_secs(5));

        server.join().unwrap();
        assert_eq!(
            transport.last_error_message().as_deref(),
            Some("API key is invalid.")
        );
    }

    #[test]
    fn backend_rejection_reaches_failure_listener() {
        let (endpoint, server) = stub_backend(vec![r#"{"status":0}"#, r#"{"status":3}"#]);
        let transport = transport(endpoint);
        let listener = Arc::new(RecordingListener::default());
        transport.set_failure_listener(listener.clone());

        assert!(transport.configure("key-123").is_success());
        assert!(transport.record(&Event::loss("Health", Value::ONE, Utc::now())).is_success());
        assert!(transport.flush(Duration::from_secs(5)).is_success());

        server.join().unwrap();
        assert_eq!(
            *listener.0.lock(),
            vec![(EventKind::Loss, Status::Failed(ErrorCode::InvalidApiKey))]
        );
    }

    #[test]
    fn accepted_events_do_not_reach_failure_listener() {
        let (endpoint, server) = stub_backend(vec![r#"{"status":0}"#, r#"{"status":0}"#]);
        let transport = transport(endpoint);
        let listener = Arc::new(RecordingListener::default());
        transport.set_failure_listener(listener.clone());

        assert!(transport.configure("key-123").is_success());
        transport.record(&Event::gain("Coins", Value::ONE, Utc::now()));
        transport.flush(Duration::from_secs(5));

        server.join().unwrap();
        assert!(listener.0.lock().is_empty());
    }

    #[test]
    fn full_queue_drops_event_without_blocking() {
        let (endpoint, held) = stalling_backend(vec![r#"{"status":0}"#]);
        let transport = HttpTransport::new(HttpConfig {
            endpoint,
            timeout: Duration::from_secs(5),
            queue_capacity: 1,
            system_proxy: false,
        })
        .unwrap();
        assert!(transport.configure("key-123").is_success());

        // The worker takes the first event and waits on the silent backend.
        assert!(transport.record(&Event::gain("Coins", Value::ONE, Utc::now())).is_success());
        held.recv_timeout(Duration::from_secs(5)).unwrap();
        // The second fills the queue.
        assert!(transport.record(&Event::gain("Coins", Value::ONE, Utc::now())).is_success());

        let started = Instant::now();
        let status = transport.record(&Event::gain("Coins", Value::ONE, Utc::now()));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(status, Status::Failed(ErrorCode::NoConnection));
        assert_eq!(status.code(), 2);
        assert_eq!(
            transport.last_error_message().as_deref(),
            Some("No Internet Connection.")
        );
    }

    #[test]
    fn configure_against_silent_backend_fails_with_no_connection() {
        let (endpoint, _held) = stalling_backend(vec![]);
        let timeout = Duration::from_millis(200);
        let transport = HttpTransport::new(HttpConfig {
            endpoint,
            timeout,
            queue_capacity: 8,
            system_proxy: false,
        })
        .unwrap();

        let started = Instant::now();
        let status = transport.configure("key-123");
        assert!(started.elapsed() < timeout + REPLY_GRACE + Duration::from_secs(1));
        assert_eq!(status.code(), 2);
        assert_eq!(
            transport.record(&Event::gain("Coins", Value::ONE, Utc::now())),
            Status::Failed(ErrorCode::NotConfigured)
        );
    }

    #[test]
    fn startup_finishing_after_caller_gave_up_still_configures() {
        let (endpoint, server) = stub_backend(vec![r#"{"status":0}"#, r#"{"status":0}"#]);
        let transport = transport(endpoint);

        // Nobody waits for this reply, as when `configure` timed out.
        let (reply, response) = std_mpsc::sync_channel(1);
        drop(response);
        let job = Job::Startup {
            api_key: "key-123".to_string(),
            reply,
        };
        assert!(transport.jobs.try_send(job).is_ok());
        assert!(transport.flush(Duration::from_secs(5)).is_success());

        assert!(transport.record(&Event::gain("Coins", Value::ONE, Utc::now())).is_success());
        assert!(transport.flush(Duration::from_secs(5)).is_success());

        let seen = server.join().unwrap();
        assert_eq!(seen[1].path, "/v1/events/gain");
        assert_eq!(seen[1].api_key.as_deref(), Some("key-123"));
    }

    #[test]
    fn startup_rejection_leaves_transport_unconfigured() {
        let (endpoint, server) = stub_backend(vec![r#"{"status":3}"#]);
        let transport = transport(endpoint);

        assert_eq!(
            transport.configure("bad-key"),
            Status::Failed(ErrorCode::InvalidApiKey)
        );
        server.join().unwrap();
        assert_eq!(
            transport.record(&Event::gain("Coins", Value::ONE, Utc::now())),
            Status::Failed(ErrorCode::NotConfigured)
        );
    }

    #[test]
    fn unreachable_backend_reports_no_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let transport = transport(endpoint);
        assert_eq!(
            transport.configure("key"),
            Status::Failed(ErrorCode::NoConnection)
        );
    }

    #[test]
    fn status_from_response_prefers_body_code() {
        assert_eq!(
            status_from_response(StatusCode::OK, r#"{"status":7}"#),
            Status::Failed(ErrorCode::EmptyBuffer)
        );
        assert!(status_from_response(StatusCode::NO_CONTENT, "").is_success());
        assert_eq!(
            status_from_response(StatusCode::NOT_FOUND, "missing"),
            Status::Failed(ErrorCode::Unknown(404))
        );
    }
}
