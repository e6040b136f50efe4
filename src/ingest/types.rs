// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A token listing endpoint, fixed at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub name: String,     // e.g. "firstledger"
    pub endpoint: String, // absolute http(s) URL
}

impl Source {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// One untrusted record as a source returned it.
pub type RawTokenRecord = Map<String, Value>;

/// Canonical `(symbol, issuer)` pair. Both parts are trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenIdentity {
    symbol: String,
    issuer: String,
}

impl TokenIdentity {
    /// Returns `None` when either part is blank after trimming.
    pub fn new(symbol: &str, issuer: &str) -> Option<Self> {
        let symbol = symbol.trim();
        let issuer = issuer.trim();
        if symbol.is_empty() || issuer.is_empty() {
            return None;
        }
        Some(Self {
            symbol: symbol.to_string(),
            issuer: issuer.to_string(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Persisted / set-membership form: `symbol:issuer`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.symbol, self.issuer)
    }

    /// Human readable symbol. XRPL encodes currency codes longer than three
    /// characters as 40 hex digits (zero padded); those are decoded when the
    /// result is printable ASCII.
    pub fn display_symbol(&self) -> String {
        decode_hex_currency(&self.symbol).unwrap_or_else(|| self.symbol.clone())
    }
}

impl std::fmt::Display for TokenIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.symbol, self.issuer)
    }
}

fn decode_hex_currency(code: &str) -> Option<String> {
    if code.len() != 40 || !code.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let bytes: Vec<u8> = (0..40)
        .step_by(2)
        .map(|i| u8::from_str_radix(&code[i..i + 2], 16))
        .collect::<Result<_, _>>()
        .ok()?;
    let trimmed: Vec<u8> = bytes.into_iter().take_while(|b| *b != 0).collect();
    if trimmed.is_empty() || !trimmed.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        return None;
    }
    String::from_utf8(trimmed).ok()
}

/// Why a single source produced nothing this cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("{0}")]
    Other(String),
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    fn source(&self) -> &Source;

    async fn fetch_payload(&self) -> Result<Value, FetchError>;

    fn name(&self) -> &str {
        &self.source().name
    }
}

/// Per-source counts for one discovery cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    pub new_tokens: usize,
    pub errors: usize,
}

impl SourceReport {
    pub fn empty(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
}

impl CycleReport {
    pub fn new_total(&self) -> usize {
        self.sources.iter().map(|s| s.new_tokens).sum()
    }

    pub fn fetched_total(&self) -> usize {
        self.sources.iter().map(|s| s.fetched).sum()
    }

    pub fn error_total(&self) -> usize {
        self.sources.iter().map(|s| s.errors).sum()
    }

    pub fn for_source(&self, name: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source == name)
    }
}
