// tests/api_http.rs
//
// HTTP-level tests for the liveness router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET / and GET /health
// - GET /status (before and after a cycle)
// - POST /telegram/{token} (/start reply, wrong token, junk body)
// - request spans never carry the bot token

use serde_json::{json, Value as Json};
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tower::ServiceExt as _; // for `oneshot`

use xrpl_token_watch::api::{self, AppState, BotHook, WELCOME_TEXT};
use xrpl_token_watch::ingest::providers::FixtureProvider;
use xrpl_token_watch::ingest::types::SourceProvider;
use xrpl_token_watch::{MemoryNotifier, SeenStore, Watcher, WatcherCfg};

const BODY_LIMIT: usize = 1024 * 1024;
const BOT_TOKEN: &str = "123:secret";

struct Harness {
    app: Router,
    watcher: Arc<Watcher>,
    replies: Arc<MemoryNotifier>,
    _dir: tempfile::TempDir,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(SeenStore::in_dir(dir.path()).await);
    let providers: Vec<Arc<dyn SourceProvider>> = vec![Arc::new(FixtureProvider::from_value(
        "firstledger",
        json!({"tokens": [{"symbol": "ABC", "issuer": "rXYZ"}]}),
    ))];
    let alerts = Arc::new(MemoryNotifier::new());
    let watcher = Arc::new(Watcher::new(providers, seen, alerts, WatcherCfg::new("1")));

    let replies = Arc::new(MemoryNotifier::new());
    let state = AppState {
        seen: watcher.seen().clone(),
        status: watcher.status(),
        bot: Some(BotHook {
            token: BOT_TOKEN.to_string(),
            notifier: replies.clone(),
        }),
    };
    Harness {
        app: api::create_router(state),
        watcher,
        replies,
        _dir: dir,
    }
}

async fn body_string(resp: shuttle_axum::axum::response::Response) -> String {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    String::from_utf8(bytes).expect("utf8")
}

#[tokio::test]
async fn health_and_root_return_ok() {
    let h = harness().await;
    for uri in ["/", "/health"] {
        let req = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("build GET");
        let resp = h.app.clone().oneshot(req).await.expect("oneshot");
        assert_eq!(resp.status(), StatusCode::OK, "{uri} should be 200");
        assert_eq!(body_string(resp).await, "ok");
    }
}

#[tokio::test]
async fn status_reflects_cycles_and_seen_count() {
    let h = harness().await;

    let get_status = || {
        Request::builder()
            .uri("/status")
            .body(Body::empty())
            .expect("build GET /status")
    };

    let resp = h.app.clone().oneshot(get_status()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v: Json = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(v["status"], "ok");
    assert_eq!(v["seen_tokens"], 0);
    assert_eq!(v["cycles"], 0);
    assert!(v["last_cycle"].is_null());

    h.watcher.run_cycle().await;

    let resp = h.app.clone().oneshot(get_status()).await.unwrap();
    let v: Json = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(v["seen_tokens"], 1);
    assert_eq!(v["cycles"], 1);
    assert_eq!(v["last_cycle"]["sources"][0]["source"], "firstledger");
    assert_eq!(v["last_cycle"]["sources"][0]["new_tokens"], 1);
}

fn webhook(token: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/telegram/{token}"))
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("build POST webhook")
}

#[tokio::test]
async fn start_command_gets_welcome_reply() {
    let h = harness().await;
    let update = json!({
        "update_id": 1,
        "message": {"message_id": 7, "chat": {"id": 555, "type": "private"}, "text": "/start"}
    });

    let resp = h
        .app
        .clone()
        .oneshot(webhook(BOT_TOKEN, update.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        h.replies.messages(),
        vec![("555".to_string(), WELCOME_TEXT.to_string())]
    );
}

#[tokio::test]
async fn other_messages_are_acknowledged_silently() {
    let h = harness().await;
    let update = json!({"update_id": 2, "message": {"chat": {"id": 9}, "text": "hello"}});
    let resp = h
        .app
        .clone()
        .oneshot(webhook(BOT_TOKEN, update.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(h.replies.count(), 0);
}

#[tokio::test]
async fn wrong_token_is_not_found() {
    let h = harness().await;
    let update = json!({"message": {"chat": {"id": 9}, "text": "/start"}});
    let resp = h
        .app
        .clone()
        .oneshot(webhook("guess", update.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(h.replies.count(), 0);
}

#[tokio::test]
async fn junk_body_is_acknowledged() {
    let h = harness().await;
    let resp = h
        .app
        .clone()
        .oneshot(webhook(BOT_TOKEN, "not json".to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn webhook_without_bot_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(SeenStore::in_dir(dir.path()).await);
    let app = api::create_router(AppState {
        seen,
        status: Default::default(),
        bot: None,
    });
    let resp = app
        .oneshot(webhook(BOT_TOKEN, "{}".to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn request_logs_do_not_contain_bot_token() {
    let h = harness().await;
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let update = json!({"message": {"chat": {"id": 555}, "text": "/start"}});
    let resp = h
        .app
        .clone()
        .oneshot(webhook(BOT_TOKEN, update.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(logs.contains("route=/telegram/{token}"), "{logs}");
    assert!(!logs.contains(BOT_TOKEN), "{logs}");
}
