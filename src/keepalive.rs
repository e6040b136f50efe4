// src/keepalive.rs
use reqwest::Client;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Ping `{base_url}/health` once.
pub async fn ping_once(client: &Client, base_url: &str) -> anyhow::Result<u16> {
    let url = format!("{}/health", base_url.trim_end_matches('/'));
    let resp = client.get(&url).send().await?;
    let status = resp.status();
    resp.error_for_status_ref()?;
    Ok(status.as_u16())
}

/// Keeps a hosted instance from being idled: GET our own health route every
/// `period`. The first ping goes out after one full period.
pub fn spawn_keepalive(client: Client, base_url: String, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(target: "keepalive", url = %base_url, period_secs = period.as_secs(), "self-ping enabled");
        loop {
            tokio::time::sleep(period).await;
            match ping_once(&client, &base_url).await {
                Ok(status) => tracing::debug!(target: "keepalive", status, "self-ping ok"),
                Err(e) => tracing::warn!(target: "keepalive", error = %e, "self-ping failed"),
            }
        }
    })
}
