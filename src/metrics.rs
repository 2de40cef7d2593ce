use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_cycles_total", "Poll cycles run, per source.");
        describe_counter!(
            "feed_cycle_errors_total",
            "Cycles ended early, per source and error kind."
        );
        describe_counter!("feed_new_items_total", "Items detected as new.");
        describe_counter!("feed_pushes_total", "Digests delivered.");
        describe_gauge!("feed_last_poll_ts", "Unix ts of the last finished cycle.");
        describe_gauge!(
            "feed_consecutive_failures",
            "Current streak of failed cycles per loop."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        router_for(self.handle.clone())
    }
}

pub fn router_for(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let h = handle.clone();
            async move { h.render() }
        }),
    )
}
