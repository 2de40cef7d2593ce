use async_trait::async_trait;

use super::Notifier;
use crate::error::FeedError;
use crate::ingest::http::{HttpFetcher, Payload};

pub const SERVERCHAN_BASE: &str = "https://sc.ftqq.com";

/// ServerChan push: `text` is the title, `desp` the Markdown body.
#[derive(Clone)]
pub struct ServerChanNotifier {
    url: String,
    http: HttpFetcher,
}

impl ServerChanNotifier {
    pub fn new(send_key: &str, http: HttpFetcher) -> Self {
        Self::with_base_url(SERVERCHAN_BASE, send_key, http)
    }

    pub fn with_base_url(base: &str, send_key: &str, http: HttpFetcher) -> Self {
        Self {
            url: format!("{}/{}.send", base.trim_end_matches('/'), send_key),
            http,
        }
    }
}

/// The service answers 200 with an error code in the body.
fn check_reply(reply: &Payload) -> Result<(), FeedError> {
    let Payload::Json(v) = reply else {
        return Ok(());
    };
    let code = v
        .get("errno")
        .or_else(|| v.get("code"))
        .and_then(|c| c.as_i64())
        .unwrap_or(0);
    if code == 0 {
        return Ok(());
    }
    let msg = v
        .get("errmsg")
        .or_else(|| v.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("unknown error");
    Err(FeedError::notify("serverchan", format!("code {code}: {msg}")))
}

#[async_trait]
impl Notifier for ServerChanNotifier {
    fn channel(&self) -> &'static str {
        "serverchan"
    }

    async fn push(&self, label: &str, text: &str) -> Result<(), FeedError> {
        let form = [("text", format!("[{label}]")), ("desp", text.to_string())];
        let reply = self
            .http
            .post_form(&self.url, &form)
            .await
            .map_err(|e| FeedError::notify("serverchan", e))?;
        check_reply(&reply)
    }
}
