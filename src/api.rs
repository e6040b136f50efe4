use std::sync::Arc;

use shuttle_axum::axum::{
    body::{Body, Bytes},
    extract::{MatchedPath, Path, State},
    http::{Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::ingest::types::CycleReport;
use crate::ingest::StatusBoard;
use crate::notify::Notifier;
use crate::seen::SeenStore;

pub const WELCOME_TEXT: &str =
    "Welcome to the XRPL Token Watch bot! New token listings will be announced here.";

/// Bot webhook wiring; absent when the service runs without a bot token
/// (tests, `scan_once`).
#[derive(Clone)]
pub struct BotHook {
    pub token: String,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Clone)]
pub struct AppState {
    pub seen: Arc<SeenStore>,
    pub status: Arc<StatusBoard>,
    pub bot: Option<BotHook>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/telegram/{token}", post(telegram_webhook))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

// The webhook path carries the bot token; spans record the route template only.
fn request_span(req: &Request<Body>) -> tracing::Span {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or("unmatched");
    tracing::debug_span!("request", method = %req.method(), route)
}

/// Alias kept for callers that build the router by name.
pub fn router(state: AppState) -> Router {
    create_router(state)
}

/// Always healthy once the process is up; pipeline health lives in /status.
async fn health() -> &'static str {
    "ok"
}

#[derive(serde::Serialize)]
struct StatusOut {
    status: &'static str,
    seen_tokens: usize,
    cycles: u64,
    last_cycle: Option<CycleReport>,
}

async fn status(State(state): State<AppState>) -> Json<StatusOut> {
    Json(StatusOut {
        status: "ok",
        seen_tokens: state.seen.len().await,
        cycles: state.status.cycles(),
        last_cycle: state.status.last_report(),
    })
}

#[derive(serde::Deserialize)]
struct Update {
    #[serde(default)]
    message: Option<Message>,
}

#[derive(serde::Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(serde::Deserialize)]
struct Chat {
    id: i64,
}

/// Telegram retries anything but 2xx, so bad bodies are acknowledged too.
async fn telegram_webhook(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: Bytes,
) -> StatusCode {
    let Some(bot) = state.bot.as_ref() else {
        return StatusCode::NOT_FOUND;
    };
    if token != bot.token {
        return StatusCode::NOT_FOUND;
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            tracing::warn!(target: "api", error = %e, "unparseable telegram update");
            return StatusCode::OK;
        }
    };

    let Some(msg) = update.message else {
        return StatusCode::OK;
    };
    let is_start = msg
        .text
        .as_deref()
        .map(str::trim_start)
        .is_some_and(|t| t.starts_with("/start"));
    if is_start {
        let chat = msg.chat.id.to_string();
        if let Err(e) = bot.notifier.send(&chat, WELCOME_TEXT).await {
            tracing::warn!(target: "api", chat = %chat, error = %e, "welcome reply failed");
        }
    }
    StatusCode::OK
}
