//! Runner: one concurrent poll loop per configured (source, identity).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::ingest::http::HttpFetcher;
use crate::ingest::providers::build_provider;
use crate::ingest::types::{SourceKind, SourceProvider};
use crate::notify::{Notifier, NotifierMux};
use crate::poll::{PollLoop, Schedule};
use crate::render::{DigestRenderer, TemplateRenderer};

/// How the loops ended. In normal operation only `stopped` is non-zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub stopped: usize,
    pub panicked: usize,
    pub aborted: usize,
}

impl RunReport {
    fn record(&mut self, res: Result<(), JoinError>) {
        match res {
            Ok(()) => self.stopped += 1,
            Err(e) if e.is_panic() => {
                tracing::error!(error = %e, "poll loop panicked, siblings keep running");
                self.panicked += 1;
            }
            Err(_) => self.aborted += 1,
        }
    }
}

pub struct Runner {
    loops: Vec<PollLoop>,
    grace: Duration,
}

impl Runner {
    pub fn new(loops: Vec<PollLoop>) -> Self {
        Self {
            loops,
            grace: Duration::from_secs(10),
        }
    }

    /// Time allowed for loops to notice cancellation before they are aborted.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Production wiring: real providers, templates and notification channels.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let http = HttpFetcher::new(cfg.http.timeout(), &cfg.http.user_agent);
        let renderer = match &cfg.templates_dir {
            Some(dir) => TemplateRenderer::from_dir(dir)?,
            None => TemplateRenderer::new()?,
        };
        let notifier = NotifierMux::from_config(&cfg.notify, &http);
        Ok(Self::with_collaborators(
            cfg,
            Arc::new(renderer),
            Arc::new(notifier),
            |kind| build_provider(kind, http.clone()),
        ))
    }

    /// One loop per identity in `cfg.sources`, using `provider_for` to get each
    /// source's adapter.
    pub fn with_collaborators<F>(
        cfg: &AppConfig,
        renderer: Arc<dyn DigestRenderer>,
        notifier: Arc<dyn Notifier>,
        provider_for: F,
    ) -> Self
    where
        F: Fn(SourceKind) -> Arc<dyn SourceProvider>,
    {
        let schedule = Schedule::from(&cfg.schedule);
        let mut loops = Vec::with_capacity(cfg.loop_count());
        for (kind, identities) in &cfg.sources {
            let provider = provider_for(*kind);
            for id in identities {
                loops.push(PollLoop::new(
                    provider.clone(),
                    id.clone(),
                    renderer.clone(),
                    notifier.clone(),
                    schedule,
                ));
            }
        }
        Self::new(loops).with_grace(Duration::from_secs(cfg.schedule.shutdown_grace_secs))
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.loops.iter().map(PollLoop::name).collect()
    }

    /// Run every loop concurrently until `token` is cancelled and all loops
    /// have stopped (or been aborted after the grace period).
    pub async fn run(self, token: CancellationToken) -> RunReport {
        let mut set = JoinSet::new();
        for l in self.loops {
            tracing::debug!(task = %l.name(), "spawning poll loop");
            set.spawn(l.run(token.clone()));
        }
        tracing::info!(loops = set.len(), "runner started");

        let mut report = RunReport::default();
        let mut abort_at: Option<Instant> = None;
        let mut aborted = false;

        loop {
            let abort_timer = async move {
                match abort_at {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                joined = set.join_next() => match joined {
                    Some(res) => report.record(res),
                    None => break,
                },
                _ = token.cancelled(), if abort_at.is_none() && !aborted => {
                    tracing::info!(grace_secs = self.grace.as_secs(), "shutdown requested");
                    abort_at = Some(Instant::now() + self.grace);
                }
                _ = abort_timer, if !aborted => {
                    tracing::warn!(remaining = set.len(), "loops still busy after grace period, aborting");
                    set.abort_all();
                    aborted = true;
                }
            }
        }

        tracing::info!(?report, "runner finished");
        report
    }
}
