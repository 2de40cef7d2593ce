// src/ingest/types.rs
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::dedup::DedupPolicy;
use crate::error::FeedError;
use crate::ingest::http::Payload;

/// One fetched content unit, normalized across sources.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Item {
    /// Recency ordinal (unix seconds, or page position for scraped sources).
    pub timestamp: i64,
    /// Boundary key for policies that do not order by time.
    pub key: Option<String>,
    pub details: Details,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Details {
    Status(Status),
    Submission(Submission),
    Video(Video),
}

/// Microblog post.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Status {
    pub screen_name: String,
    pub text: String,
    pub created_at: DateTime<FixedOffset>,
    pub comments_count: u64,
    pub attitudes_count: u64,
    pub link: String,
    pub retweeted: Option<Box<Status>>,
}

/// Upload from a channel listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Submission {
    pub title: String,
    pub author: String,
    pub length: String,
    pub created_at: DateTime<Utc>,
    pub link: String,
}

/// Video scraped from a user page.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Video {
    pub title: String,
    pub link: String,
    pub length: String,
    pub pub_time_des: String,
}

/// Sources this crate knows how to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Weibo,
    Bilibili,
    Youku,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Weibo, SourceKind::Bilibili, SourceKind::Youku];

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Weibo => "weibo",
            SourceKind::Bilibili => "bilibili",
            SourceKind::Youku => "youku",
        }
    }

    /// Title shown in the pushed notification.
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Weibo => "微博",
            SourceKind::Bilibili => "Bilibili",
            SourceKind::Youku => "优酷",
        }
    }

    /// Dedup policy is fixed per source.
    pub fn policy(self) -> DedupPolicy {
        match self {
            SourceKind::Weibo => DedupPolicy::ThresholdSinceNonEmpty,
            SourceKind::Bilibili => DedupPolicy::ThresholdSince,
            SourceKind::Youku => DedupPolicy::BoundaryScan,
        }
    }

    /// Digest template registered in the renderer.
    pub fn template(self) -> &'static str {
        match self {
            SourceKind::Weibo => "weibo_statuses",
            SourceKind::Bilibili => "bilibili_submissions",
            SourceKind::Youku => "youku_videos",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A source adapter: fetch raw data for one identity, then turn it into
/// items sorted newest first.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    fn kind(&self) -> SourceKind;
    async fn fetch(&self, identity: &str) -> Result<Payload, FeedError>;
    fn parse(&self, raw: Payload) -> Result<Vec<Item>, FeedError>;
}
