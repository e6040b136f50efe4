use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Notifier, NotifyError};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramNotifier {
    api_base: String,
    token: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl TelegramNotifier {
    pub fn new(token: String) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token,
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ReplyParameters>,
}

#[derive(Deserialize)]
struct ReplyParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

fn retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Pause before the next attempt: the API's `retry_after` (capped) when a 429
/// carried one, else `500ms << (attempt - 1)`.
fn retry_delay(retry_after: Option<u64>, attempt: u8, cap: Duration) -> Duration {
    match retry_after {
        Some(secs) => Duration::from_secs(secs).min(cap),
        None => Duration::from_millis(500u64 << (attempt - 1)),
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        let payload = SendMessage {
            chat_id: recipient,
            text,
            disable_web_page_preview: true,
        };
        let url = self.send_message_url();

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    let status = rsp.status();
                    if !status.is_success() {
                        if retryable(status) && attempt < self.max_retries {
                            let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
                                rsp.json::<ApiReply>()
                                    .await
                                    .ok()
                                    .and_then(|r| r.parameters)
                                    .and_then(|p| p.retry_after)
                            } else {
                                None
                            };
                            tokio::time::sleep(retry_delay(retry_after, attempt, self.timeout))
                                .await;
                            continue;
                        }
                        return Err(NotifyError::Status(status.as_u16()));
                    }
                    // 200 with ok=false happens for e.g. a blocked chat
                    let reply: ApiReply = rsp.json().await?;
                    if !reply.ok {
                        return Err(NotifyError::Rejected(
                            reply.description.unwrap_or_else(|| "ok=false".into()),
                        ));
                    }
                    return Ok(());
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(retry_delay(None, attempt, self.timeout)).await;
                        continue;
                    }
                    return Err(NotifyError::Transport(e));
                }
            }
        }
    }
}
