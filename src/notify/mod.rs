//! Digest delivery channels.
//!
//! - [`ServerChanNotifier`] posts to the ServerChan push service.
//! - [`DiscordNotifier`] and [`SlackNotifier`] post to incoming webhooks.
//! - [`NotifierMux`] fans one digest out to every configured channel.

pub mod discord;
pub mod serverchan;
pub mod slack;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::NotifyConfig;
use crate::error::FeedError;
use crate::ingest::http::HttpFetcher;

pub use discord::DiscordNotifier;
pub use serverchan::ServerChanNotifier;
pub use slack::SlackNotifier;

/// Delivers one digest. No retry across cycles: a failed push is dropped.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> &'static str;
    async fn push(&self, label: &str, text: &str) -> Result<(), FeedError>;
}

/// Sends to all channels. Succeeds if any channel accepted the digest.
/// With no channel configured the digest only goes to the log.
#[derive(Default, Clone)]
pub struct NotifierMux {
    channels: Vec<Arc<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Arc<dyn Notifier>>) -> Self {
        Self { channels }
    }

    pub fn from_config(cfg: &NotifyConfig, http: &HttpFetcher) -> Self {
        let mut channels: Vec<Arc<dyn Notifier>> = Vec::new();
        if let Some(key) = cfg.serverchan_send_key.as_deref() {
            channels.push(Arc::new(ServerChanNotifier::new(key, http.clone())));
        }
        if let Some(url) = cfg.discord_webhook.as_deref() {
            channels.push(Arc::new(DiscordNotifier::new(url.to_string(), http.clone())));
        }
        if let Some(url) = cfg.slack_webhook.as_deref() {
            channels.push(Arc::new(SlackNotifier::new(url.to_string(), http.clone())));
        }
        if channels.is_empty() {
            tracing::warn!("no notification channel configured, digests are only logged");
        }
        Self { channels }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[async_trait]
impl Notifier for NotifierMux {
    fn channel(&self) -> &'static str {
        "mux"
    }

    async fn push(&self, label: &str, text: &str) -> Result<(), FeedError> {
        if text.is_empty() {
            return Ok(());
        }
        if self.channels.is_empty() {
            tracing::info!(label, digest = text, "dry-run push");
            return Ok(());
        }

        let mut delivered = 0usize;
        let mut last_err = None;
        for ch in &self.channels {
            match ch.push(label, text).await {
                Ok(()) => {
                    delivered += 1;
                    tracing::info!(channel = ch.channel(), label, "pushed digest");
                }
                Err(e) => {
                    tracing::warn!(channel = ch.channel(), label, error = %e, "push failed");
                    last_err = Some(e);
                }
            }
        }

        match (delivered, last_err) {
            (0, Some(e)) => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        ok: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for Counting {
        fn channel(&self) -> &'static str {
            "counting"
        }
        async fn push(&self, _label: &str, _text: &str) -> Result<(), FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.ok {
                Ok(())
            } else {
                Err(FeedError::notify("counting", "down"))
            }
        }
    }

    fn counting(ok: bool) -> Arc<Counting> {
        Arc::new(Counting {
            ok,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn one_healthy_channel_is_enough() {
        let bad = counting(false);
        let good = counting(true);
        let mux = NotifierMux::new(vec![bad.clone(), good.clone()]);
        mux.push("微博", "digest").await.unwrap();
        assert_eq!(bad.calls.load(Ordering::SeqCst), 1);
        assert_eq!(good.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_channels_failing_is_an_error() {
        let mux = NotifierMux::new(vec![counting(false), counting(false)]);
        let err = mux.push("优酷", "digest").await.unwrap_err();
        assert_eq!(err.kind(), "notify");
    }

    #[tokio::test]
    async fn empty_text_is_never_pushed() {
        let ch = counting(true);
        let mux = NotifierMux::new(vec![ch.clone()]);
        mux.push("Bilibili", "").await.unwrap();
        assert_eq!(ch.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_channels_is_a_dry_run() {
        let mux = NotifierMux::default();
        assert!(mux.is_empty());
        mux.push("微博", "digest").await.unwrap();
    }
}
