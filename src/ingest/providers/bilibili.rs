use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::FeedError;
use crate::ingest::http::{HttpFetcher, Payload};
use crate::ingest::null_as_default;
use crate::ingest::types::{Details, Item, SourceKind, SourceProvider, Submission};

pub const SEARCH_URL: &str = "https://api.bilibili.com/x/space/arc/search";
const VIDEO_URL: &str = "https://www.bilibili.com/video/av";
const PAGE_SIZE: u32 = 10;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<Data>,
}

#[derive(Debug, Deserialize)]
struct Data {
    list: List,
}

#[derive(Debug, Deserialize)]
struct List {
    #[serde(default, deserialize_with = "null_as_default")]
    vlist: Vec<RawSubmission>,
}

#[derive(Debug, Deserialize)]
struct RawSubmission {
    title: String,
    created: i64,
    #[serde(default)]
    length: String,
    #[serde(default)]
    author: String,
    aid: i64,
}

/// Channel upload listing.
pub struct BilibiliProvider {
    http: HttpFetcher,
    url: String,
}

impl BilibiliProvider {
    pub fn new(http: HttpFetcher) -> Self {
        Self {
            http,
            url: SEARCH_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Parse an upload listing into items, newest first.
pub fn parse_submissions(raw: serde_json::Value) -> Result<Vec<Item>, FeedError> {
    let env: Envelope = serde_json::from_value(raw)?;
    if env.code != 0 {
        return Err(FeedError::Upstream(format!(
            "bilibili code {}: {}",
            env.code, env.message
        )));
    }
    let data = env
        .data
        .ok_or_else(|| FeedError::Parse("bilibili reply without data".into()))?;

    let mut out = Vec::with_capacity(data.list.vlist.len());
    for s in data.list.vlist {
        let created_at = DateTime::<Utc>::from_timestamp(s.created, 0)
            .ok_or_else(|| FeedError::Parse(format!("bilibili created {} out of range", s.created)))?;
        out.push(Item {
            timestamp: s.created,
            key: Some(s.aid.to_string()),
            details: Details::Submission(Submission {
                title: s.title,
                author: s.author,
                length: s.length,
                created_at,
                link: format!("{VIDEO_URL}{}", s.aid),
            }),
        });
    }
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(out)
}

#[async_trait]
impl SourceProvider for BilibiliProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Bilibili
    }

    async fn fetch(&self, identity: &str) -> Result<Payload, FeedError> {
        let params = [
            ("mid", identity.to_string()),
            ("ps", PAGE_SIZE.to_string()),
            ("pn", "1".to_string()),
        ];
        self.http.get(&self.url, &params).await
    }

    fn parse(&self, raw: Payload) -> Result<Vec<Item>, FeedError> {
        parse_submissions(raw.into_json()?)
    }
}
