// src/ingest/mod.rs
pub mod identity;
pub mod normalize;
pub mod providers;
pub mod registry;
pub mod scheduler;
pub mod types;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::ingest::types::{CycleReport, FetchError, SourceProvider, SourceReport, TokenIdentity};
use crate::notify::{format_token_alert, Notifier};
use crate::seen::SeenStore;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("discovery_cycles_total", "Discovery cycles completed.");
        describe_counter!(
            "discovery_ticks_skipped_total",
            "Scheduler ticks dropped because a cycle was still running."
        );
        describe_counter!("discovery_records_total", "Raw records returned by sources.");
        describe_counter!("discovery_new_tokens_total", "Tokens seen for the first time.");
        describe_counter!(
            "discovery_source_errors_total",
            "Source fetch/status/parse errors."
        );
        describe_counter!(
            "discovery_normalize_empty_total",
            "Payloads that normalized to no records."
        );
        describe_counter!("seen_persist_errors_total", "Failed writes of the seen set.");
        describe_counter!("notify_failures_total", "Alerts that could not be delivered.");
        describe_histogram!("discovery_cycle_ms", "Discovery cycle duration in milliseconds.");
        describe_histogram!("discovery_fetch_ms", "Source fetch duration in milliseconds.");
        describe_gauge!("discovery_last_cycle_ts", "Unix ts when the last cycle finished.");
        describe_gauge!("seen_tokens", "Size of the seen set.");
    });
}

#[derive(Debug, Clone)]
pub struct WatcherCfg {
    pub recipient: String,
    pub fetch_timeout: Duration,
    pub notify_timeout: Duration,
    pub max_concurrent_fetches: usize,
}

impl WatcherCfg {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            fetch_timeout: Duration::from_secs(15),
            notify_timeout: Duration::from_secs(10),
            max_concurrent_fetches: 4,
        }
    }
}

/// Read-only view of the pipeline for the status endpoint.
#[derive(Debug, Default)]
pub struct StatusBoard {
    inner: RwLock<StatusInner>,
}

#[derive(Debug, Default, Clone)]
struct StatusInner {
    cycles: u64,
    last: Option<CycleReport>,
}

impl StatusBoard {
    pub fn publish(&self, report: &CycleReport) {
        if let Ok(mut g) = self.inner.write() {
            g.cycles += 1;
            g.last = Some(report.clone());
        }
    }

    pub fn cycles(&self) -> u64 {
        self.inner.read().map(|g| g.cycles).unwrap_or(0)
    }

    pub fn last_report(&self) -> Option<CycleReport> {
        self.inner.read().ok().and_then(|g| g.last.clone())
    }
}

/// Discovery cycle orchestrator. Owns the sources and shares the seen set
/// and notifier; nothing here is process-global.
pub struct Watcher {
    providers: Vec<Arc<dyn SourceProvider>>,
    seen: Arc<SeenStore>,
    notifier: Arc<dyn Notifier>,
    status: Arc<StatusBoard>,
    cfg: WatcherCfg,
}

impl Watcher {
    pub fn new(
        providers: Vec<Arc<dyn SourceProvider>>,
        seen: Arc<SeenStore>,
        notifier: Arc<dyn Notifier>,
        cfg: WatcherCfg,
    ) -> Self {
        Self {
            providers,
            seen,
            notifier,
            status: Arc::new(StatusBoard::default()),
            cfg,
        }
    }

    pub fn seen(&self) -> &Arc<SeenStore> {
        &self.seen
    }

    pub fn status(&self) -> Arc<StatusBoard> {
        self.status.clone()
    }

    /// One pass over every source. Never fails: per-source problems end up
    /// in the report and the logs.
    pub async fn run_cycle(&self) -> CycleReport {
        ensure_metrics_described();
        let started_at = Utc::now();
        let t0 = std::time::Instant::now();

        let width = self.cfg.max_concurrent_fetches.max(1);
        let jobs: Vec<_> = self
            .providers
            .iter()
            .map(|p| self.process_source(p.as_ref()))
            .collect();
        let mut sources: Vec<SourceReport> =
            stream::iter(jobs).buffer_unordered(width).collect().await;
        // stable output regardless of completion order
        let order = |name: &str| self.providers.iter().position(|p| p.name() == name);
        sources.sort_by_key(|r| order(&r.source));

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            sources,
        };

        counter!("discovery_cycles_total").increment(1);
        histogram!("discovery_cycle_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("discovery_last_cycle_ts").set(report.finished_at.timestamp() as f64);
        self.status.publish(&report);

        tracing::info!(
            target: "ingest",
            sources = report.sources.len(),
            fetched = report.fetched_total(),
            new = report.new_total(),
            errors = report.error_total(),
            "discovery cycle done"
        );
        report
    }

    async fn process_source(&self, provider: &dyn SourceProvider) -> SourceReport {
        let name = provider.name();
        let mut report = SourceReport::empty(name);

        let fetched = tokio::time::timeout(self.cfg.fetch_timeout, provider.fetch_payload())
            .await
            .unwrap_or(Err(FetchError::Timeout(self.cfg.fetch_timeout)));
        let payload = match fetched {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "ingest", source = name, error = %e, "source fetch failed");
                counter!("discovery_source_errors_total").increment(1);
                report.errors += 1;
                return report;
            }
        };

        let records = normalize::normalize(name, payload);
        report.fetched = records.len();
        counter!("discovery_records_total").increment(records.len() as u64);

        for record in &records {
            let Some(id) = identity::extract(record) else {
                tracing::debug!(target: "ingest", source = name, "record without symbol/issuer skipped");
                continue;
            };
            if self.announce_if_new(provider, &id).await {
                report.new_tokens += 1;
            }
        }
        report
    }

    /// Claim the identity in the seen set, then alert. Only the caller whose
    /// insert succeeds sends, so two sources reporting the same token in one
    /// cycle produce one alert. A failed send is not retried.
    async fn announce_if_new(&self, provider: &dyn SourceProvider, id: &TokenIdentity) -> bool {
        let key = id.key();
        if !self.seen.insert(&key).await {
            return false;
        }
        counter!("discovery_new_tokens_total").increment(1);
        tracing::info!(target: "ingest", source = provider.name(), token = %key, "new token");

        let text = format_token_alert(id, provider.source(), Utc::now());
        let sent = tokio::time::timeout(
            self.cfg.notify_timeout,
            self.notifier.send(&self.cfg.recipient, &text),
        )
        .await;
        match sent {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                counter!("notify_failures_total").increment(1);
                tracing::warn!(target: "notify", token = %key, error = %e, "alert delivery failed");
            }
            Err(_) => {
                counter!("notify_failures_total").increment(1);
                tracing::warn!(target: "notify", token = %key, "alert delivery timed out");
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::providers::FixtureProvider;
    use crate::notify::MemoryNotifier;
    use serde_json::json;

    async fn watcher_with(
        providers: Vec<Arc<dyn SourceProvider>>,
        notifier: Arc<MemoryNotifier>,
        dir: &std::path::Path,
    ) -> Watcher {
        let seen = Arc::new(SeenStore::in_dir(dir).await);
        let mut cfg = WatcherCfg::new("777");
        cfg.fetch_timeout = Duration::from_millis(200);
        Watcher::new(providers, seen, notifier, cfg)
    }

    #[tokio::test]
    async fn report_keeps_provider_order() {
        let dir = tempfile::tempdir().unwrap();
        let n = Arc::new(MemoryNotifier::new());
        let providers: Vec<Arc<dyn SourceProvider>> = vec![
            Arc::new(FixtureProvider::hanging("slow", Duration::from_millis(50))),
            Arc::new(FixtureProvider::from_value("fast", json!([]))),
        ];
        let w = watcher_with(providers, n, dir.path()).await;
        let r = w.run_cycle().await;
        let names: Vec<_> = r.sources.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn status_board_tracks_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let n = Arc::new(MemoryNotifier::new());
        let providers: Vec<Arc<dyn SourceProvider>> = vec![Arc::new(
            FixtureProvider::from_value("a", json!([{"symbol": "S", "issuer": "rS"}])),
        )];
        let w = watcher_with(providers, n, dir.path()).await;
        let board = w.status();
        assert!(board.last_report().is_none());
        w.run_cycle().await;
        w.run_cycle().await;
        assert_eq!(board.cycles(), 2);
        assert_eq!(board.last_report().unwrap().new_total(), 0);
    }
}
