use async_trait::async_trait;

use super::Notifier;
use crate::error::FeedError;
use crate::ingest::http::HttpFetcher;

pub struct SlackNotifier {
    webhook_url: String,
    http: HttpFetcher,
}

impl SlackNotifier {
    pub fn new(url: String, http: HttpFetcher) -> Self {
        Self {
            webhook_url: url,
            http,
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn channel(&self) -> &'static str {
        "slack"
    }

    async fn push(&self, label: &str, text: &str) -> Result<(), FeedError> {
        let body = serde_json::json!({ "text": format!("*[{label}]*\n{text}") });

        self.http
            .post_json(&self.webhook_url, &body)
            .await
            .map_err(|e| FeedError::notify("slack", e))?;
        Ok(())
    }
}
