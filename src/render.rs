//! Digest rendering: new items → Markdown text for one push.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;

use crate::error::FeedError;
use crate::ingest::types::{Details, Item, SourceKind, Status};

const WEIBO_TEMPLATE: &str = include_str!("../templates/weibo_statuses.hbs");
const BILIBILI_TEMPLATE: &str = include_str!("../templates/bilibili_submissions.hbs");
const YOUKU_TEMPLATE: &str = include_str!("../templates/youku_videos.hbs");

const DISPLAY_TIME: &str = "%Y-%m-%d %H:%M";

/// Turns new items into digest text. An empty result means "nothing to push".
pub trait DigestRenderer: Send + Sync {
    fn render(&self, kind: SourceKind, items: &[Item]) -> Result<String, FeedError>;
}

/// Handlebars templates, one per source.
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

impl TemplateRenderer {
    /// Renderer with the embedded templates.
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        // Markdown output; escaping would mangle links and quotes
        handlebars.register_escape_fn(handlebars::no_escape);

        for kind in SourceKind::ALL {
            handlebars
                .register_template_string(kind.template(), embedded(kind))
                .with_context(|| format!("registering template {}", kind.template()))?;
        }
        Ok(Self { handlebars })
    }

    /// Embedded templates, replaced by `<name>.hbs` files found in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut this = Self::new()?;
        for kind in SourceKind::ALL {
            let path = dir.join(format!("{}.hbs", kind.template()));
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading template {}", path.display()))?;
                this.handlebars
                    .register_template_string(kind.template(), content)
                    .with_context(|| format!("registering template {}", path.display()))?;
                tracing::info!(template = kind.template(), path = %path.display(), "template override loaded");
            }
        }
        Ok(this)
    }
}

fn embedded(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Weibo => WEIBO_TEMPLATE,
        SourceKind::Bilibili => BILIBILI_TEMPLATE,
        SourceKind::Youku => YOUKU_TEMPLATE,
    }
}

#[derive(Serialize)]
struct StatusView {
    screen_name: String,
    text: String,
    created_at: String,
    comments_count: u64,
    attitudes_count: u64,
    link: String,
    retweeted: Option<Box<StatusView>>,
}

impl From<&Status> for StatusView {
    fn from(s: &Status) -> Self {
        Self {
            screen_name: s.screen_name.clone(),
            text: s.text.clone(),
            created_at: s.created_at.format(DISPLAY_TIME).to_string(),
            comments_count: s.comments_count,
            attitudes_count: s.attitudes_count,
            link: s.link.clone(),
            retweeted: s.retweeted.as_deref().map(|r| Box::new(StatusView::from(r))),
        }
    }
}

fn context(kind: SourceKind, items: &[Item]) -> serde_json::Value {
    match kind {
        SourceKind::Weibo => {
            let statuses: Vec<StatusView> = items
                .iter()
                .filter_map(|it| match &it.details {
                    Details::Status(s) => Some(StatusView::from(s)),
                    _ => None,
                })
                .collect();
            json!({ "statuses": statuses })
        }
        SourceKind::Bilibili => {
            let submissions: Vec<serde_json::Value> = items
                .iter()
                .filter_map(|it| match &it.details {
                    Details::Submission(s) => Some(json!({
                        "title": s.title,
                        "author": s.author,
                        "length": s.length,
                        "created_at": s.created_at.with_timezone(&Local).format(DISPLAY_TIME).to_string(),
                        "link": s.link,
                    })),
                    _ => None,
                })
                .collect();
            json!({ "submissions": submissions })
        }
        SourceKind::Youku => {
            let videos: Vec<_> = items
                .iter()
                .filter_map(|it| match &it.details {
                    Details::Video(v) => Some(v),
                    _ => None,
                })
                .collect();
            json!({ "videos": videos })
        }
    }
}

impl DigestRenderer for TemplateRenderer {
    fn render(&self, kind: SourceKind, items: &[Item]) -> Result<String, FeedError> {
        if items.is_empty() {
            return Ok(String::new());
        }
        let text = self.handlebars.render(kind.template(), &context(kind, items))?;
        Ok(text.trim().to_string())
    }
}
