//! # Poll Loop
//! One loop per (source, identity): fetch → dedup → render → notify → sleep,
//! until cancelled. Every error is caught inside a cycle; a loop never exits
//! on its own.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::ScheduleConfig;
use crate::cursor::Cursor;
use crate::dedup::{DedupOutcome, DedupPolicy};
use crate::error::FeedError;
use crate::ingest::types::{Item, SourceProvider};
use crate::notify::Notifier;
use crate::render::DigestRenderer;

/// Wall clock used to stamp threshold cursors.
pub trait Clock: Send + Sync {
    /// Unix seconds.
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub interval: Duration,
    pub heartbeat: Duration,
    /// 0 disables the failure-streak warning.
    pub failure_warn_after: u32,
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::from(&ScheduleConfig::default())
    }
}

impl From<&ScheduleConfig> for Schedule {
    fn from(c: &ScheduleConfig) -> Self {
        Self {
            interval: c.interval(),
            heartbeat: c.heartbeat(),
            failure_warn_after: c.failure_warn_after,
        }
    }
}

/// How a single cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    FetchFailed,
    /// Fetch returned nothing and the policy skips such cycles.
    Empty,
    NothingNew,
    RenderFailed,
    Pushed { items: usize },
    PushFailed { items: usize },
}

impl CycleOutcome {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            CycleOutcome::FetchFailed | CycleOutcome::RenderFailed | CycleOutcome::PushFailed { .. }
        )
    }
}

pub struct PollLoop {
    provider: Arc<dyn SourceProvider>,
    policy: DedupPolicy,
    cursor: Cursor,
    renderer: Arc<dyn DigestRenderer>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    schedule: Schedule,
    failures: u32,
}

impl PollLoop {
    pub fn new(
        provider: Arc<dyn SourceProvider>,
        identity: impl Into<String>,
        renderer: Arc<dyn DigestRenderer>,
        notifier: Arc<dyn Notifier>,
        schedule: Schedule,
    ) -> Self {
        let kind = provider.kind();
        Self {
            policy: kind.policy(),
            cursor: Cursor::new(kind, identity),
            provider,
            renderer,
            notifier,
            clock: Arc::new(SystemClock),
            schedule,
            failures: 0,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Current streak of failed cycles.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// `source:identity`, used as the task name in logs.
    pub fn name(&self) -> String {
        format!("{}:{}", self.cursor.source(), self.cursor.identity())
    }

    async fn fetch(&self) -> Result<Vec<Item>, FeedError> {
        let raw = self.provider.fetch(self.cursor.identity()).await?;
        self.provider.parse(raw)
    }

    fn record_error(&self, err: &FeedError, stage: &'static str) {
        let source = self.cursor.source();
        tracing::warn!(
            source = %source,
            identity = self.cursor.identity(),
            stage,
            error = %err,
            "cycle ended early"
        );
        counter!("feed_cycle_errors_total", "source" => source.name(), "kind" => err.kind())
            .increment(1);
    }

    /// Run one fetch → dedup → render → notify pass.
    pub async fn cycle(&mut self) -> CycleOutcome {
        let kind = self.cursor.source();
        counter!("feed_cycles_total", "source" => kind.name()).increment(1);

        let items = match self.fetch().await {
            Ok(items) => items,
            Err(e) => {
                self.record_error(&e, "fetch");
                return CycleOutcome::FetchFailed;
            }
        };

        if items.is_empty() && self.policy.skips_empty_fetch() {
            tracing::debug!(source = %kind, identity = self.cursor.identity(), "empty fetch, cycle skipped");
            return CycleOutcome::Empty;
        }

        let fetched = items.len();
        let DedupOutcome {
            new_items,
            next_cursor,
        } = self.policy.apply(items, self.cursor.get(), self.clock.now());

        tracing::debug!(
            source = %kind,
            identity = self.cursor.identity(),
            fetched,
            new = new_items.len(),
            "dedup done"
        );

        let mut pending = next_cursor;
        if self.policy.advances_on_fetch() {
            if let Some(c) = pending.take() {
                self.cursor.set(c);
            }
        }

        if new_items.is_empty() {
            return CycleOutcome::NothingNew;
        }

        let digest = match self.renderer.render(kind, &new_items) {
            Ok(d) => d,
            Err(e) => {
                self.record_error(&e, "render");
                return CycleOutcome::RenderFailed;
            }
        };

        // Key cursors only move once the digest exists; a failed push does not roll back.
        if let Some(c) = pending.take() {
            self.cursor.set(c);
        }

        if digest.is_empty() {
            return CycleOutcome::NothingNew;
        }

        let count = new_items.len();
        counter!("feed_new_items_total", "source" => kind.name()).increment(count as u64);

        match self.notifier.push(kind.label(), &digest).await {
            Ok(()) => {
                counter!("feed_pushes_total", "source" => kind.name()).increment(1);
                tracing::info!(source = %kind, identity = self.cursor.identity(), items = count, "pushed a feed");
                CycleOutcome::Pushed { items: count }
            }
            Err(e) => {
                self.record_error(&e, "notify");
                CycleOutcome::PushFailed { items: count }
            }
        }
    }

    fn track(&mut self, outcome: CycleOutcome) {
        let name = self.name();
        let warn_after = self.schedule.failure_warn_after;
        if outcome.is_failure() {
            self.failures += 1;
            if streak_reached(self.failures, warn_after) {
                tracing::warn!(task = %name, streak = self.failures, "source keeps failing");
            }
        } else {
            if warn_after > 0 && self.failures >= warn_after {
                tracing::info!(task = %name, after = self.failures, "source recovered");
            }
            self.failures = 0;
        }

        gauge!("feed_consecutive_failures", "task" => name.clone()).set(self.failures as f64);
        gauge!("feed_last_poll_ts", "task" => name).set(self.clock.now() as f64);
    }

    /// Cycle forever; stops only when `token` is cancelled (checked while sleeping).
    pub async fn run(mut self, token: CancellationToken) {
        let name = self.name();
        tracing::info!(task = %name, "poll loop started");

        while !token.is_cancelled() {
            let outcome = self.cycle().await;
            self.track(outcome);
            tracing::debug!(task = %name, ?outcome, "cycle finished");

            if reportable_sleep(self.schedule.interval, self.schedule.heartbeat, &name, &token).await
            {
                break;
            }
        }

        tracing::info!(task = %name, "poll loop stopped");
    }
}

/// True exactly once per streak: on the failure that brings it to `warn_after`.
fn streak_reached(failures: u32, warn_after: u32) -> bool {
    warn_after > 0 && failures == warn_after
}

/// Sleep `total`, logging a heartbeat every `heartbeat`.
/// Returns `true` if `token` was cancelled before the time was up.
pub async fn reportable_sleep(
    total: Duration,
    heartbeat: Duration,
    name: &str,
    token: &CancellationToken,
) -> bool {
    let heartbeat = heartbeat.max(Duration::from_secs(1));
    let deadline = Instant::now() + total;

    loop {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        let remaining = deadline - now;
        tracing::info!(
            task = name,
            "idle, restarting in {} min",
            remaining.as_secs() / 60
        );

        tokio::select! {
            biased;
            _ = token.cancelled() => return true,
            _ = tokio::time::sleep(remaining.min(heartbeat)) => {}
        }
    }
}
