// src/notify/mod.rs
pub mod telegram;

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use thiserror::Error;

use crate::ingest::types::{Source, TokenIdentity};

pub use telegram::TelegramNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification endpoint returned HTTP {0}")]
    Status(u16),

    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Delivery channel for alert texts. Callers log failures; nothing retries
/// above this seam.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError>;
}

/// Alert text for a freshly discovered token.
pub fn format_token_alert(id: &TokenIdentity, source: &Source, ts: DateTime<Utc>) -> String {
    let shown = id.display_symbol();
    let symbol_line = if shown == id.symbol() {
        format!("Symbol: {}", id.symbol())
    } else {
        format!("Symbol: {} ({})", shown, id.symbol())
    };
    format!(
        "🆕 New XRPL token detected\n{symbol_line}\nIssuer: {}\nSource: {} ({})\nTime (UTC): {}",
        id.issuer(),
        source.name,
        source.endpoint,
        ts.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Logs instead of sending. Backs `scan_once --dry-run`.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        tracing::info!(target: "notify", recipient, text, "dry-run alert");
        Ok(())
    }
}

// --- Test helper ---
/// Records every message; can be switched to fail.
#[derive(Default)]
pub struct MemoryNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(vec![]),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().map(|v| v.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Rejected("memory notifier set to fail".into()));
        }
        if let Ok(mut v) = self.sent.lock() {
            v.push((recipient.to_string(), text.to_string()));
        }
        Ok(())
    }
}
