//! Mock transport for testing without network access.
//!
//! Serves canned JSON payloads keyed by URL, with optional artificial
//! latency and scripted failures. Useful for development and for the
//! session tests, which need to control completion order exactly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::error::FetchError;
use super::key::RequestConfig;
use super::transport::Transport;

/// One scripted response.
#[derive(Debug, Clone)]
struct Scripted {
    outcome: Result<serde_json::Value, FetchError>,
    delay: Duration,
}

/// Transport that serves pre-scripted responses.
///
/// Cheap to clone; clones share the same script table and counters.
#[derive(Clone, Default)]
pub struct MockTransport {
    scripts: Arc<Mutex<HashMap<String, Scripted>>>,
    served: Arc<AtomicU64>,
}

impl MockTransport {
    /// Create an empty mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful response for a URL.
    pub fn respond(&self, url: impl Into<String>, payload: serde_json::Value) {
        self.respond_after(url, payload, Duration::ZERO);
    }

    /// Script a successful response served after an artificial delay.
    pub fn respond_after(
        &self,
        url: impl Into<String>,
        payload: serde_json::Value,
        delay: Duration,
    ) {
        let mut scripts = self.scripts.lock().expect("mock script lock poisoned");
        scripts.insert(
            url.into(),
            Scripted {
                outcome: Ok(payload),
                delay,
            },
        );
    }

    /// Script a failure for a URL.
    pub fn fail(&self, url: impl Into<String>, error: FetchError) {
        self.fail_after(url, error, Duration::ZERO);
    }

    /// Script a failure served after an artificial delay.
    pub fn fail_after(&self, url: impl Into<String>, error: FetchError, delay: Duration) {
        let mut scripts = self.scripts.lock().expect("mock script lock poisoned");
        scripts.insert(
            url.into(),
            Scripted {
                outcome: Err(error),
                delay,
            },
        );
    }

    /// Number of requests this transport has served so far.
    pub fn requests_served(&self) -> u64 {
        self.served.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(
        &self,
        url: &str,
        _config: &RequestConfig,
    ) -> Result<serde_json::Value, FetchError> {
        self.served.fetch_add(1, Ordering::SeqCst);

        let scripted = {
            let scripts = self.scripts.lock().expect("mock script lock poisoned");
            scripts.get(url).cloned()
        };

        let Some(scripted) = scripted else {
            return Err(FetchError::Http {
                status: 404,
                message: format!("no scripted response for {url}"),
            });
        };

        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }

        scripted.outcome
    }
}
