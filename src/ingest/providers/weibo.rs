use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::error::FeedError;
use crate::ingest::http::{HttpFetcher, Payload};
use crate::ingest::{normalize_text, null_as_default};
use crate::ingest::types::{Details, Item, SourceKind, SourceProvider, Status};

pub const PROFILE_URL: &str = "https://m.weibo.cn/profile/info";
const DETAIL_URL: &str = "https://m.weibo.cn/detail/";
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Data,
}

#[derive(Debug, Deserialize)]
struct Data {
    /// Kept raw so one unreadable status does not sink the page.
    #[serde(default, deserialize_with = "null_as_default")]
    statuses: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    text: String,
    mid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    comments_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    attitudes_count: u64,
    user: Option<RawUser>,
    retweeted_status: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    screen_name: String,
}

/// Microblog profile feed.
pub struct WeiboProvider {
    http: HttpFetcher,
    url: String,
}

impl WeiboProvider {
    pub fn new(http: HttpFetcher) -> Self {
        Self {
            http,
            url: PROFILE_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

fn parse_created_at(s: &str) -> Result<DateTime<FixedOffset>, FeedError> {
    DateTime::parse_from_str(s, CREATED_AT_FORMAT)
        .map_err(|e| FeedError::Parse(format!("weibo created_at {s:?}: {e}")))
}

fn convert(raw: RawStatus) -> Result<Status, FeedError> {
    let created_at = parse_created_at(&raw.created_at)?;
    // Deleted originals come back without a user
    let screen_name = raw.user.map(|u| u.screen_name).unwrap_or_default();
    let retweeted = match raw.retweeted_status {
        Some(inner) => match status_from_value(inner) {
            Ok(s) => Some(Box::new(s)),
            Err(e) => {
                tracing::warn!(mid = %raw.mid, error = %e, "retweeted status unreadable, dropped");
                None
            }
        },
        None => None,
    };
    Ok(Status {
        screen_name,
        text: normalize_text(&raw.text),
        created_at,
        comments_count: raw.comments_count,
        attitudes_count: raw.attitudes_count,
        link: format!("{DETAIL_URL}{}", raw.mid),
        retweeted,
    })
}

fn status_from_value(v: serde_json::Value) -> Result<Status, FeedError> {
    let raw: RawStatus = serde_json::from_value(v)?;
    convert(raw)
}

/// Parse a profile payload into items, newest first.
/// Statuses that cannot be read are logged and skipped.
pub fn parse_statuses(raw: serde_json::Value) -> Result<Vec<Item>, FeedError> {
    let env: Envelope = serde_json::from_value(raw)?;
    let mut out = Vec::with_capacity(env.data.statuses.len());
    for (idx, v) in env.data.statuses.into_iter().enumerate() {
        let status = match status_from_value(v) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(idx, error = %e, "weibo status unreadable, skipped");
                continue;
            }
        };
        out.push(Item {
            timestamp: status.created_at.timestamp(),
            key: Some(status.link.clone()),
            details: Details::Status(status),
        });
    }
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(out)
}

#[async_trait]
impl SourceProvider for WeiboProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Weibo
    }

    async fn fetch(&self, identity: &str) -> Result<Payload, FeedError> {
        self.http
            .get(&self.url, &[("uid", identity.to_string())])
            .await
    }

    fn parse(&self, raw: Payload) -> Result<Vec<Item>, FeedError> {
        parse_statuses(raw.into_json()?)
    }
}
