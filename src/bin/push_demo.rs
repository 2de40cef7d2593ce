//! Renders a sample digest per source and pushes it through the configured
//! channels (log only when no channel is configured). Handy for checking keys.

use std::sync::Arc;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use myfeeds::config::AppConfig;
use myfeeds::ingest::http::HttpFetcher;
use myfeeds::ingest::types::{Details, Item, SourceKind, Submission, Video};
use myfeeds::notify::{Notifier, NotifierMux};
use myfeeds::render::{DigestRenderer, TemplateRenderer};

fn samples(kind: SourceKind) -> Vec<Item> {
    let created_at = Utc
        .with_ymd_and_hms(2020, 3, 10, 13, 5, 1)
        .single()
        .unwrap_or_else(Utc::now);
    match kind {
        SourceKind::Youku => vec![Item {
            timestamp: 1,
            key: Some("demo video".into()),
            details: Details::Video(Video {
                title: "demo video".into(),
                link: "https://v.youku.com/".into(),
                length: "01:23".into(),
                pub_time_des: "刚刚".into(),
            }),
        }],
        _ => vec![Item {
            timestamp: created_at.timestamp(),
            key: Some("demo".into()),
            details: Details::Submission(Submission {
                title: "demo upload".into(),
                author: "demo".into(),
                length: "04:56".into(),
                created_at,
                link: "https://www.bilibili.com/".into(),
            }),
        }],
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let notify = match AppConfig::load_default() {
        Ok(cfg) => cfg.notify,
        Err(e) => {
            tracing::warn!(error = %e, "no config, dry-run only");
            Default::default()
        }
    };
    let mux: Arc<dyn Notifier> = Arc::new(NotifierMux::from_config(&notify, &HttpFetcher::default()));
    let renderer = TemplateRenderer::new()?;

    for kind in [SourceKind::Bilibili, SourceKind::Youku] {
        let text = renderer.render(kind, &samples(kind))?;
        if let Err(e) = mux.push(kind.label(), &text).await {
            tracing::warn!(source = %kind, error = %e, "demo push failed");
        }
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
    }

    println!("push-demo done");
    Ok(())
}
