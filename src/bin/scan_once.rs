//! Runs a single discovery cycle and prints the report as JSON.
//!
//! `--dry-run` logs alerts instead of sending them and needs no bot
//! credentials. It reads the seen set but leaves the file untouched.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use xrpl_token_watch::ingest::providers::build_http_client;
use xrpl_token_watch::{
    build_dry_run_watcher, build_watcher, http_providers, resolve_sources, telegram_notifier,
    telemetry, AppConfig, Notifier, Watcher,
};

#[derive(Parser, Debug)]
#[command(name = "scan_once", about = "Run one XRPL token discovery cycle")]
struct Args {
    /// Log alerts instead of sending them to Telegram
    #[arg(long)]
    dry_run: bool,

    /// Directory holding seen_tokens.json (overrides DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Source registry file, TOML or JSON (overrides SOURCES_PATH)
    #[arg(long)]
    sources: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();
    let args = Args::parse();

    let watcher = if args.dry_run {
        dry_run_watcher(&args).await?
    } else {
        let mut cfg = AppConfig::from_env().context("invalid configuration")?;
        if let Some(dir) = args.data_dir.clone() {
            cfg.data_dir = dir;
        }
        if let Some(p) = args.sources.clone() {
            cfg.sources_path = Some(p);
        }
        let notifier: Arc<dyn Notifier> = Arc::new(telegram_notifier(&cfg));
        build_watcher(&cfg, notifier).await?
    };

    let report = watcher.run_cycle().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn dry_run_watcher(args: &Args) -> Result<Watcher> {
    let sources = resolve_sources(args.sources.as_deref())?;
    let client = build_http_client(
        std::time::Duration::from_secs(10),
        std::time::Duration::from_secs(5),
    )?;
    let dir = args
        .data_dir
        .clone()
        .or_else(|| std::env::var_os("DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data"));
    Ok(build_dry_run_watcher(http_providers(sources, &client), &dir).await)
}
