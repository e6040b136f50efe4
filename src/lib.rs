// src/lib.rs
// Public library surface for the service binary, `scan_once` and integration tests.

pub mod api;
pub mod config;
pub mod ingest;
pub mod keepalive;
pub mod metrics;
pub mod notify;
pub mod seen;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::AppConfig;
pub use crate::ingest::types::{CycleReport, Source, SourceReport, TokenIdentity};
pub use crate::ingest::{Watcher, WatcherCfg};
pub use crate::notify::{MemoryNotifier, Notifier, TelegramNotifier};
pub use crate::seen::SeenStore;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::ingest::providers::{build_http_client, HttpJsonProvider};
use crate::ingest::registry::{load_sources_default, load_sources_from};
use crate::ingest::types::SourceProvider;

/// Resolve the source registry: explicit path, then `$SOURCES_PATH` /
/// `config/sources.toml`, then built-ins.
pub fn resolve_sources(explicit: Option<&Path>) -> Result<Vec<Source>> {
    match explicit {
        Some(p) => load_sources_from(p),
        None => load_sources_default(),
    }
}

/// Build the production watcher: HTTP providers, seen set under `data_dir`,
/// and the given notifier.
pub async fn build_watcher(cfg: &AppConfig, notifier: Arc<dyn Notifier>) -> Result<Watcher> {
    let sources = resolve_sources(cfg.sources_path.as_deref()).context("loading sources")?;
    let client = build_http_client(cfg.fetch_timeout, cfg.connect_timeout)?;
    let providers = http_providers(sources, &client);
    tracing::info!(
        sources = ?providers.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
        "sources loaded"
    );

    let seen = Arc::new(SeenStore::in_dir(&cfg.data_dir).await);
    let wcfg = WatcherCfg {
        recipient: cfg.chat_id.clone(),
        // orchestrator bound sits just above the client's own timeout
        fetch_timeout: cfg.fetch_timeout + cfg.connect_timeout,
        // three attempts plus two waits, each capped at notify_timeout
        notify_timeout: cfg.notify_timeout * 5 + std::time::Duration::from_secs(2),
        max_concurrent_fetches: cfg.max_concurrent_fetches,
    };
    Ok(Watcher::new(providers, seen, notifier, wcfg))
}

/// Watcher for `scan_once --dry-run`: alerts go to the log and the seen set
/// under `data_dir` is read but never written.
pub async fn build_dry_run_watcher(
    providers: Vec<Arc<dyn SourceProvider>>,
    data_dir: &Path,
) -> Watcher {
    let seen = Arc::new(SeenStore::load_read_only(data_dir.join(seen::SEEN_FILE_NAME)).await);
    Watcher::new(
        providers,
        seen,
        Arc::new(notify::LogNotifier),
        WatcherCfg::new("dry-run"),
    )
}

pub fn http_providers(sources: Vec<Source>, client: &reqwest::Client) -> Vec<Arc<dyn SourceProvider>> {
    sources
        .into_iter()
        .map(|s| Arc::new(HttpJsonProvider::new(s, client.clone())) as Arc<dyn SourceProvider>)
        .collect()
}

/// Telegram notifier configured from `cfg`.
pub fn telegram_notifier(cfg: &AppConfig) -> TelegramNotifier {
    TelegramNotifier::new(cfg.bot_token.clone())
        .with_api_base(cfg.telegram_api_base.clone())
        .with_timeout(cfg.notify_timeout)
}
