pub mod bilibili;
pub mod weibo;
pub mod youku;

use std::sync::Arc;

use crate::ingest::http::HttpFetcher;
use crate::ingest::types::{SourceKind, SourceProvider};

/// Build the production adapter for `kind`, sharing one HTTP client.
pub fn build_provider(kind: SourceKind, http: HttpFetcher) -> Arc<dyn SourceProvider> {
    match kind {
        SourceKind::Weibo => Arc::new(weibo::WeiboProvider::new(http)),
        SourceKind::Bilibili => Arc::new(bilibili::BilibiliProvider::new(http)),
        SourceKind::Youku => Arc::new(youku::YoukuProvider::new(http)),
    }
}
