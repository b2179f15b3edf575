//! Mock log loaders for testing
//!
//! Provides scripted [`LogLoader`] implementations for isolated testing of
//! the view lifecycle without a remote store.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use dossier_audit::models::RawAuditEntry;
use dossier_audit::services::LogLoader;

/// Types of errors the mock can simulate
#[derive(Debug, Clone)]
pub enum MockError {
    /// Connection refused
    ConnectionRefused,
    /// Store returned an error status
    Status(u16),
}

impl std::fmt::Display for MockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MockError::ConnectionRefused => write!(f, "connection refused"),
            MockError::Status(code) => write!(f, "Request failed with status {}", code),
        }
    }
}

/// One scripted response
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub delay: Duration,
    pub result: Result<Vec<RawAuditEntry>, MockError>,
}

impl MockResponse {
    pub fn ok(entries: Vec<RawAuditEntry>) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(entries),
        }
    }

    pub fn err(error: MockError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Loader that replays scripted responses in call order.
///
/// When the script runs out the last response is repeated.
#[derive(Default)]
pub struct MockLogLoader {
    script: Mutex<VecDeque<MockResponse>>,
    last: Mutex<Option<MockResponse>>,
    calls: AtomicUsize,
}

impl MockLogLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(entries: Vec<RawAuditEntry>) -> Arc<Self> {
        Arc::new(Self::new().then(MockResponse::ok(entries)))
    }

    pub fn failing(error: MockError) -> Arc<Self> {
        Arc::new(Self::new().then(MockResponse::err(error)))
    }

    pub fn then(self, response: MockResponse) -> Self {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(response);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> MockResponse {
        let mut script = self.script.lock().expect("mock script lock");
        let mut last = self.last.lock().expect("mock last lock");
        match script.pop_front() {
            Some(response) => {
                *last = Some(response.clone());
                response
            }
            None => last.clone().unwrap_or_else(|| MockResponse::ok(Vec::new())),
        }
    }
}

#[async_trait]
impl LogLoader for MockLogLoader {
    async fn load(&self) -> anyhow::Result<Vec<RawAuditEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.next_response();
        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }
        response.result.map_err(|e| anyhow::anyhow!("{}", e))
    }
}
