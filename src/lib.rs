// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod cursor;
pub mod dedup;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod notify;
pub mod poll;
pub mod render;
pub mod reporting;
pub mod runner;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::cursor::{Cursor, CursorValue};
pub use crate::dedup::{DedupOutcome, DedupPolicy};
pub use crate::error::FeedError;
pub use crate::ingest::types::{Item, SourceKind, SourceProvider};
pub use crate::notify::{Notifier, NotifierMux};
pub use crate::poll::{CycleOutcome, PollLoop, Schedule};
pub use crate::runner::{RunReport, Runner};
