use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

use crate::ingest::types::{FetchError, Source, SourceProvider};

/// In-memory provider: serves a canned payload, fails, or hangs.
/// Stands in for a listing endpoint in tests.
pub struct FixtureProvider {
    source: Source,
    mode: Mutex<Mode>,
}

#[derive(Clone)]
enum Mode {
    Payload(Value),
    Fail(u16),
    Hang(Duration),
}

impl FixtureProvider {
    pub fn from_value(name: &str, payload: Value) -> Self {
        Self::with_mode(name, Mode::Payload(payload))
    }

    /// Parse a JSON fixture; a bad fixture is a test bug, so this returns Err.
    pub fn from_json_str(name: &str, s: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_value(name, serde_json::from_str(s)?))
    }

    /// Always answers with the given non-2xx status.
    pub fn failing(name: &str, status: u16) -> Self {
        Self::with_mode(name, Mode::Fail(status))
    }

    /// Sleeps before answering with an empty list; pair with a short fetch timeout.
    pub fn hanging(name: &str, delay: Duration) -> Self {
        Self::with_mode(name, Mode::Hang(delay))
    }

    /// Swap the served payload between cycles.
    pub fn set_payload(&self, payload: Value) {
        if let Ok(mut m) = self.mode.lock() {
            *m = Mode::Payload(payload);
        }
    }

    fn with_mode(name: &str, mode: Mode) -> Self {
        Self {
            source: Source::new(name, format!("fixture://{name}")),
            mode: Mutex::new(mode),
        }
    }
}

#[async_trait]
impl SourceProvider for FixtureProvider {
    fn source(&self) -> &Source {
        &self.source
    }

    async fn fetch_payload(&self) -> Result<Value, FetchError> {
        let mode = self
            .mode
            .lock()
            .map(|m| m.clone())
            .map_err(|_| FetchError::Other("fixture mutex poisoned".into()))?;
        match mode {
            Mode::Payload(v) => Ok(v),
            Mode::Fail(status) => Err(FetchError::Status(status)),
            Mode::Hang(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Value::Array(Vec::new()))
            }
        }
    }
}
