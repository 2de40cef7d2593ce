// tests/common/mod.rs
// Shared doubles for poll-loop and runner tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use myfeeds::error::FeedError;
use myfeeds::ingest::http::Payload;
use myfeeds::ingest::types::{Details, Item, SourceKind, SourceProvider, Submission, Video};
use myfeeds::notify::Notifier;
use myfeeds::poll::Clock;
use myfeeds::render::DigestRenderer;

/// Upload-style item ordered by time.
pub fn ts_item(ts: i64) -> Item {
    Item {
        timestamp: ts,
        key: Some(format!("av{ts}")),
        details: Details::Submission(Submission {
            title: format!("upload {ts}"),
            author: "up".into(),
            length: "01:00".into(),
            created_at: DateTime::<Utc>::from_timestamp(ts, 0).unwrap(),
            link: format!("https://www.bilibili.com/video/av{ts}"),
        }),
    }
}

/// Scraped item keyed by title, in page order.
pub fn key_items(keys: &[&str]) -> Vec<Item> {
    let n = keys.len() as i64;
    keys.iter()
        .enumerate()
        .map(|(i, k)| Item {
            timestamp: n - i as i64,
            key: Some(k.to_string()),
            details: Details::Video(Video {
                title: k.to_string(),
                link: format!("https://v.youku.com/{k}"),
                length: "01:00".into(),
                pub_time_des: "刚刚".into(),
            }),
        })
        .collect()
}

pub fn keys(items: &[Item]) -> Vec<String> {
    items.iter().filter_map(|i| i.key.clone()).collect()
}

#[derive(Clone)]
pub enum Step {
    Items(Vec<Item>),
    Fail,
    Panic,
}

/// Provider replaying a script; the last step repeats once the script runs out.
pub struct ScriptedProvider {
    kind: SourceKind,
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Step>,
    pending: Mutex<Vec<Item>>,
    pub fetches: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(kind: SourceKind, steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script: Mutex::new(steps.into()),
            last: Mutex::new(Step::Items(Vec::new())),
            pending: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceProvider for ScriptedProvider {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, _identity: &str) -> Result<Payload, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let step = match self.script.lock().pop_front() {
            Some(s) => {
                *self.last.lock() = s.clone();
                s
            }
            None => self.last.lock().clone(),
        };
        match step {
            Step::Items(items) => {
                *self.pending.lock() = items;
                Ok(Payload::Json(serde_json::Value::Null))
            }
            Step::Fail => Err(FeedError::Upstream("scripted failure".into())),
            Step::Panic => panic!("scripted panic"),
        }
    }

    fn parse(&self, _raw: Payload) -> Result<Vec<Item>, FeedError> {
        Ok(std::mem::take(&mut *self.pending.lock()))
    }
}

/// One shared provider with a separate script per identity.
pub struct ByIdentityProvider {
    kind: SourceKind,
    scripts: HashMap<String, Arc<ScriptedProvider>>,
    pending: Mutex<HashMap<String, Vec<Item>>>,
}

impl ByIdentityProvider {
    pub fn new(kind: SourceKind, scripts: Vec<(&str, Vec<Step>)>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            scripts: scripts
                .into_iter()
                .map(|(id, steps)| (id.to_string(), ScriptedProvider::new(kind, steps)))
                .collect(),
            pending: Mutex::new(HashMap::new()),
        })
    }

    pub fn fetch_count(&self, identity: &str) -> usize {
        self.scripts.get(identity).map_or(0, |s| s.fetch_count())
    }
}

#[async_trait]
impl SourceProvider for ByIdentityProvider {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, identity: &str) -> Result<Payload, FeedError> {
        let script = self
            .scripts
            .get(identity)
            .ok_or_else(|| FeedError::Upstream(format!("no script for {identity}")))?;
        let raw = script.fetch(identity).await?;
        let items = script.parse(raw)?;
        self.pending.lock().insert(identity.to_string(), items);
        Ok(Payload::Text(identity.to_string()))
    }

    fn parse(&self, raw: Payload) -> Result<Vec<Item>, FeedError> {
        let identity = raw.into_text();
        Ok(self.pending.lock().remove(&identity).unwrap_or_default())
    }
}

/// Records pushes; fails the first `fail_first` calls.
#[derive(Default)]
pub struct RecordingNotifier {
    pub pushes: Mutex<Vec<(String, String)>>,
    pub calls: AtomicUsize,
    fail_first: AtomicUsize,
}

impl RecordingNotifier {
    pub fn failing_first(n: usize) -> Arc<Self> {
        let this = Self::default();
        this.fail_first.store(n, Ordering::SeqCst);
        Arc::new(this)
    }

    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pushed(&self) -> Vec<(String, String)> {
        self.pushes.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn channel(&self) -> &'static str {
        "recording"
    }

    async fn push(&self, label: &str, text: &str) -> Result<(), FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.fail_first.load(Ordering::SeqCst);
        if left > 0 {
            self.fail_first.store(left - 1, Ordering::SeqCst);
            return Err(FeedError::notify("recording", "scripted failure"));
        }
        self.pushes.lock().push((label.to_string(), text.to_string()));
        Ok(())
    }
}

/// Renders one line per item key; counts calls.
#[derive(Default)]
pub struct KeyRenderer {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl DigestRenderer for KeyRenderer {
    fn render(&self, _kind: SourceKind, items: &[Item]) -> Result<String, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FeedError::Render("scripted failure".into()));
        }
        Ok(keys(items).join("\n"))
    }
}

pub struct ManualClock(pub AtomicI64);

impl ManualClock {
    pub fn at(t: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(t)))
    }

    pub fn set(&self, t: i64) {
        self.0.store(t, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}
