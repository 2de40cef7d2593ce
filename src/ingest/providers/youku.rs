use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::error::FeedError;
use crate::ingest::http::{HttpFetcher, Payload};
use crate::ingest::types::{Details, Item, SourceKind, SourceProvider, Video};

pub const USER_PAGE_URL: &str = "http://i.youku.com/u/";
/// Only the top of the page is considered.
const MAX_VIDEOS: usize = 5;

static VIDEO_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("div.v.va").expect("video selector"));
static LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.v-link a").expect("link selector"));
static TIME_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.v-link span.v-time").expect("time selector"));
static PUBLISH_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.v-publishtime").expect("publish selector"));

/// User video page scrape. Items have no reliable time, so the title is the
/// boundary key and the timestamp is the page position.
pub struct YoukuProvider {
    http: HttpFetcher,
    base_url: String,
}

impl YoukuProvider {
    pub fn new(http: HttpFetcher) -> Self {
        Self {
            http,
            base_url: USER_PAGE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn text_of(el: ElementRef<'_>, sel: &Selector, what: &str) -> Result<String, FeedError> {
    el.select(sel)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .ok_or_else(|| FeedError::Parse(format!("youku video block without {what}")))
}

fn parse_video(el: ElementRef<'_>) -> Result<Video, FeedError> {
    let a = el
        .select(&LINK_SEL)
        .next()
        .ok_or_else(|| FeedError::Parse("youku video block without link".into()))?;
    let title = a
        .value()
        .attr("title")
        .ok_or_else(|| FeedError::Parse("youku link without title".into()))?;
    let link = a
        .value()
        .attr("href")
        .ok_or_else(|| FeedError::Parse("youku link without href".into()))?;

    Ok(Video {
        title: title.trim().to_string(),
        link: link.to_string(),
        length: text_of(el, &TIME_SEL, "length")?,
        pub_time_des: text_of(el, &PUBLISH_SEL, "publish time")?,
    })
}

/// Parse a user page into items in page order (newest first).
pub fn parse_videos(html: &str) -> Result<Vec<Item>, FeedError> {
    let doc = Html::parse_document(html);
    let videos = doc
        .select(&VIDEO_SEL)
        .take(MAX_VIDEOS)
        .map(parse_video)
        .collect::<Result<Vec<_>, _>>()?;

    let n = videos.len() as i64;
    Ok(videos
        .into_iter()
        .enumerate()
        .map(|(i, v)| Item {
            timestamp: n - i as i64,
            key: Some(v.title.clone()),
            details: Details::Video(v),
        })
        .collect())
}

#[async_trait]
impl SourceProvider for YoukuProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Youku
    }

    async fn fetch(&self, identity: &str) -> Result<Payload, FeedError> {
        let url = format!("{}{}", self.base_url, identity);
        self.http.get(&url, &[]).await
    }

    fn parse(&self, raw: Payload) -> Result<Vec<Item>, FeedError> {
        parse_videos(&raw.into_text())
    }
}
