// tests/scheduler.rs
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use xrpl_token_watch::ingest::providers::FixtureProvider;
use xrpl_token_watch::ingest::scheduler::{spawn_scheduler, trigger, CycleGate, TickOutcome};
use xrpl_token_watch::ingest::types::SourceProvider;
use xrpl_token_watch::{MemoryNotifier, SeenStore, Watcher, WatcherCfg};

async fn slow_watcher(dir: &std::path::Path, delay: Duration) -> Arc<Watcher> {
    let seen = Arc::new(SeenStore::in_dir(dir).await);
    let providers: Vec<Arc<dyn SourceProvider>> =
        vec![Arc::new(FixtureProvider::hanging("slow", delay))];
    let mut cfg = WatcherCfg::new("1");
    cfg.fetch_timeout = Duration::from_secs(5);
    Arc::new(Watcher::new(
        providers,
        seen,
        Arc::new(MemoryNotifier::new()),
        cfg,
    ))
}

#[tokio::test]
async fn busy_tick_is_dropped_not_queued() {
    let dir = tempfile::tempdir().unwrap();
    let watcher = slow_watcher(dir.path(), Duration::from_millis(300)).await;
    let gate = Arc::new(CycleGate::default());

    assert_eq!(trigger(&gate, &watcher), TickOutcome::Started);
    assert_eq!(trigger(&gate, &watcher), TickOutcome::Skipped);
    assert_eq!(trigger(&gate, &watcher), TickOutcome::Skipped);

    // wait for the running cycle to release the gate
    for _ in 0..50 {
        if !gate.is_busy() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!gate.is_busy());
    assert_eq!(watcher.status().cycles(), 1, "skipped ticks must not run later");

    assert_eq!(trigger(&gate, &watcher), TickOutcome::Started);
}

#[tokio::test]
async fn scheduler_runs_cycles_periodically() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(SeenStore::in_dir(dir.path()).await);
    let providers: Vec<Arc<dyn SourceProvider>> = vec![Arc::new(FixtureProvider::from_value(
        "fl",
        json!([{"symbol": "T", "issuer": "rT"}]),
    ))];
    let notifier = Arc::new(MemoryNotifier::new());
    let watcher = Arc::new(Watcher::new(
        providers,
        seen,
        notifier.clone(),
        WatcherCfg::new("1"),
    ));

    let handle = spawn_scheduler(watcher.clone(), Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(400)).await;
    handle.abort();

    assert!(watcher.status().cycles() >= 2);
    // repeated cycles, one alert
    assert_eq!(notifier.count(), 1);
}
