use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::ingest::types::{FetchError, Source, SourceProvider};

/// Listing endpoints behind CDNs reject the default reqwest agent.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Bot/1.0";

/// Shared client for every source: finite connect and total timeouts.
pub fn build_http_client(timeout: Duration, connect_timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("building HTTP client")
}

/// GETs a fixed URL and expects a JSON body.
pub struct HttpJsonProvider {
    source: Source,
    client: Client,
}

impl HttpJsonProvider {
    pub fn new(source: Source, client: Client) -> Self {
        Self { source, client }
    }
}

#[async_trait]
impl SourceProvider for HttpJsonProvider {
    fn source(&self) -> &Source {
        &self.source
    }

    async fn fetch_payload(&self) -> Result<Value, FetchError> {
        let t0 = std::time::Instant::now();
        let resp = self
            .client
            .get(&self.source.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp.bytes().await?;
        let payload = serde_json::from_slice(&body)?;

        histogram!("discovery_fetch_ms", "source" => self.source.name.clone())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(payload)
    }
}
