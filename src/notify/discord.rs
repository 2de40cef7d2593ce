use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::Notifier;
use crate::error::FeedError;
use crate::ingest::http::HttpFetcher;

/// Discord rejects messages above this many characters.
const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    http: HttpFetcher,
    max_retries: u8,
}

impl DiscordNotifier {
    pub fn new(webhook: String, http: HttpFetcher) -> Self {
        Self {
            webhook,
            http,
            max_retries: 3,
        }
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: String,
}

impl DiscordWebhookPayload {
    fn digest(label: &str, text: &str) -> Self {
        let mut content = format!("**[{label}]**\n{text}");
        if content.chars().count() > MAX_CONTENT_CHARS {
            content = content.chars().take(MAX_CONTENT_CHARS - 1).collect();
            content.push('…');
        }
        Self { content }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn channel(&self) -> &'static str {
        "discord"
    }

    async fn push(&self, label: &str, text: &str) -> Result<(), FeedError> {
        let payload = DiscordWebhookPayload::digest(label, text);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self.http.post_json(&self.webhook, &payload).await;

            match res {
                Ok(_) => return Ok(()),
                Err(e) if attempt < self.max_retries => {
                    tracing::debug!(attempt, error = %e, "discord webhook retry");
                    tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                }
                Err(e) => return Err(FeedError::notify("discord", e)),
            }
        }
    }
}
