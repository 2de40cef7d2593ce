//! myfeeds — Binary Entrypoint
//! Loads config, sets up tracing and error reporting, starts one poll loop per tracked identity
//! and runs until Ctrl-C.

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;

use myfeeds::config::AppConfig;
use myfeeds::metrics::Metrics;
use myfeeds::{logging, reporting, Runner};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cfg = AppConfig::load_default()?;
    let _log_guard = logging::init(&cfg)?;
    let _sentry_guard = reporting::init(&cfg)?;
    tracing::info!(env = %cfg.env, debug = cfg.debug, loops = cfg.loop_count(), "config loaded");

    let token = CancellationToken::new();

    if let Some(addr) = cfg.metrics.listen {
        let metrics = Metrics::init()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let shutdown = token.clone();
        tracing::info!(%addr, "serving /metrics");
        tokio::spawn(async move {
            let serve = axum::serve(listener, metrics.router())
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(e) = serve.await {
                tracing::warn!(error = %e, "metrics server stopped");
            }
        });
    }

    let runner = Runner::from_config(&cfg)?;
    if runner.is_empty() {
        bail!("no sources configured, nothing to poll");
    }
    tracing::info!(loops = ?runner.names(), "starting feeders");

    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            return;
        }
        tracing::info!("Ctrl-C received, stopping");
        ctrl_c.cancel();
    });

    let report = runner.run(token).await;
    if report.panicked > 0 {
        tracing::error!(panicked = report.panicked, "some poll loops panicked");
    }
    Ok(())
}
