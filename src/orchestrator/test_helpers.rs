//! Shared test helpers: an in-memory transport that replays scripted responses.

use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::orchestrator::Orchestrator;
use crate::transport::{RequestBody, Transport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use reqwest::Method;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A scripted reply: an HTTP response or a connection-level failure
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    Response { status: u16, body: Vec<u8> },
    ConnectionFailure(std::io::ErrorKind),
}

impl Reply {
    pub(crate) fn json(value: serde_json::Value) -> Self {
        Reply::Response {
            status: 200,
            body: value.to_string().into_bytes(),
        }
    }

    pub(crate) fn bytes(body: impl Into<Vec<u8>>) -> Self {
        Reply::Response {
            status: 200,
            body: body.into(),
        }
    }

    pub(crate) fn status(status: u16) -> Self {
        Reply::Response {
            status,
            body: Vec::new(),
        }
    }
}

/// A request as the transport saw it
#[derive(Clone, Debug)]
pub(crate) struct Recorded {
    pub(crate) method: Method,
    pub(crate) target: String,
    pub(crate) body: RequestBody,
}

impl Recorded {
    pub(crate) fn describe(&self) -> String {
        format!("{} {}", self.method, self.target)
    }
}

/// Replies are queued per `(method, target)`; the last queued reply repeats.
/// Unscripted routes answer 404.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn on(&self, method: Method, target: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, target.to_string()))
            .or_default()
            .push_back(reply);
    }

    /// Queue one status document per progress value
    pub(crate) fn on_statuses(&self, target: &str, statuses: &[serde_json::Value]) {
        for status in statuses {
            self.on(Method::GET, target, Reply::json(status.clone()));
        }
    }

    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_log(&self) -> Vec<String> {
        self.requests().iter().map(Recorded::describe).collect()
    }

    pub(crate) fn count(&self, method: &Method, target: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| &r.method == method && r.target == target)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let key = (request.method.clone(), request.target.clone());
        self.requests.lock().unwrap().push(Recorded {
            method: request.method,
            target: request.target,
            body: request.body,
        });

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Response { status, body }) => Ok(TransportResponse::from_bytes(status, body)),
            Some(Reply::ConnectionFailure(kind)) => Err(Error::Io(std::io::Error::from(kind))),
            None => Ok(TransportResponse::from_bytes(404, Vec::new())),
        }
    }
}

/// Status body at the given progress
pub(crate) fn status_json(progress: i32, message: &str) -> serde_json::Value {
    serde_json::json!({
        "status": {"progress": progress, "message": message, "errorStackTrace": null}
    })
}

/// Terminal status body with an output manifest and an optional error trace
pub(crate) fn terminal_json(
    trace: Option<&str>,
    outputs: &[(&str, &str)],
) -> serde_json::Value {
    let output: Vec<_> = outputs
        .iter()
        .map(|(name, url)| serde_json::json!({"name": name, "url": url, "format": "csv"}))
        .collect();
    serde_json::json!({
        "status": {"progress": 100, "message": "Complete", "errorStackTrace": trace},
        "output": output
    })
}

/// Orchestrator over a scripted transport, saving under `save_path`, with a 1s poll
/// interval and fast, jitter-free retries
pub(crate) fn create_test_orchestrator(
    transport: Arc<ScriptedTransport>,
    save_path: &std::path::Path,
) -> Orchestrator {
    let mut config = Config::new("test-key", "https://api.test", save_path);
    config.poll.interval = Duration::from_secs(1);
    config.poll.retry = RetryConfig {
        max_attempts: 2,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(20),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    Orchestrator::new(config, transport)
}
