//! Error reporting to Sentry.
//!
//! Enabled outside debug mode when `sentry_dsn` is set. `warn!` and `error!`
//! events become Sentry events, `info!` becomes breadcrumbs.

use anyhow::{Context, Result};
use sentry::ClientInitGuard;
use sentry_tracing::{EventFilter, SentryLayer};
use tracing::{Level, Metadata, Subscriber};
use tracing_subscriber::registry::LookupSpan;

use crate::config::AppConfig;

pub fn enabled(cfg: &AppConfig) -> bool {
    !cfg.debug && cfg.sentry_dsn.is_some()
}

fn event_filter(md: &Metadata<'_>) -> EventFilter {
    match *md.level() {
        Level::ERROR | Level::WARN => EventFilter::Event,
        Level::INFO => EventFilter::Breadcrumb,
        _ => EventFilter::Ignore,
    }
}

/// Tracing layer forwarding events to the current Sentry hub.
pub fn layer<S>() -> SentryLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    sentry_tracing::layer().event_filter(event_filter)
}

/// Start the Sentry client. Keep the guard for the whole process; dropping it
/// flushes pending events.
pub fn init(cfg: &AppConfig) -> Result<Option<ClientInitGuard>> {
    if !enabled(cfg) {
        return Ok(None);
    }
    let Some(raw) = cfg.sentry_dsn.as_deref() else {
        return Ok(None);
    };
    let dsn: sentry::types::Dsn = raw.parse().context("parsing sentry_dsn")?;

    let guard = sentry::init(sentry::ClientOptions {
        dsn: Some(dsn),
        release: sentry::release_name!(),
        environment: Some(cfg.env.clone().into()),
        ..Default::default()
    });
    tracing::info!(env = %cfg.env, "error reporting enabled");
    Ok(Some(guard))
}
