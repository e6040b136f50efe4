//! XRPL Token Watch — Binary Entrypoint
//! Boots the Axum liveness server and spawns the discovery scheduler and the
//! optional self-ping next to it. The three share nothing but the seen set
//! and the read-only status board.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use std::sync::Arc;

use xrpl_token_watch::api::{self, AppState, BotHook};
use xrpl_token_watch::ingest::providers::build_http_client;
use xrpl_token_watch::ingest::scheduler::spawn_scheduler;
use xrpl_token_watch::keepalive::spawn_keepalive;
use xrpl_token_watch::metrics::Metrics;
use xrpl_token_watch::{build_watcher, telegram_notifier, telemetry, AppConfig, Notifier};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    // Missing bot token / chat id → refuse to start.
    let cfg = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(config = ?cfg, "configuration loaded");

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "prometheus recorder not installed, /metrics disabled");
            None
        }
    };

    let notifier: Arc<dyn Notifier> = Arc::new(telegram_notifier(&cfg));
    let watcher = Arc::new(build_watcher(&cfg, notifier.clone()).await?);

    spawn_scheduler(watcher.clone(), cfg.poll_interval);

    if let Some(base) = cfg.external_url.clone() {
        let client = build_http_client(cfg.fetch_timeout, cfg.connect_timeout)?;
        spawn_keepalive(client, base, cfg.keepalive_interval);
    } else {
        tracing::info!("EXTERNAL_URL not set, self-ping disabled");
    }

    let state = AppState {
        seen: watcher.seen().clone(),
        status: watcher.status(),
        bot: Some(BotHook {
            token: cfg.bot_token.clone(),
            notifier,
        }),
    };
    let mut router = api::create_router(state);
    if let Some(m) = metrics {
        router = router.merge(m.router());
    }

    Ok(router.into())
}
