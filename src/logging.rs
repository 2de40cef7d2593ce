//! Tracing setup.
//!
//! Debug mode: compact console output at `debug`.
//! Otherwise: console at the configured level plus a daily rotating JSON file
//! under `log_dir`, plus the Sentry layer when error reporting is enabled.
//! `RUST_LOG` always wins over both.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;
use crate::reporting;

const LOG_FILE_PREFIX: &str = "myfeeds.log";

/// Filter directive for the given config.
pub fn filter_directive(cfg: &AppConfig) -> String {
    let level = if cfg.debug { "debug" } else { cfg.log_level.as_str() };
    // reqwest/hyper internals are noisy even at debug
    format!("{level},hyper=info,reqwest=info,h2=info,html5ever=warn")
}

/// Install the global subscriber. Keep the returned guard alive for the
/// whole process so buffered file logs get flushed.
pub fn init(cfg: &AppConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(cfg)))
        .context("building log filter")?;

    if cfg.debug {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
            .context("installing tracing subscriber")?;
        return Ok(None);
    }

    std::fs::create_dir_all(&cfg.log_dir)
        .with_context(|| format!("creating log dir {}", cfg.log_dir.display()))?;
    let (writer, guard) = non_blocking(rolling::daily(&cfg.log_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(writer).json())
        .with(reporting::enabled(cfg).then(reporting::layer))
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(Some(guard))
}
