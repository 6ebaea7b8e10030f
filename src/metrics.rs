use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and describe the pipeline series.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe_all();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe_all() {
    describe_counter!(
        "herald_candidates_new_total",
        "Candidates that passed the dedup ledger."
    );
    describe_counter!(
        "herald_relevance_fallback_total",
        "Scoring failures answered with the conservative verdict."
    );
    describe_counter!(
        "herald_published_total",
        "Queue items executed successfully, by channel."
    );
    describe_counter!(
        "herald_publish_failures_total",
        "Queue items whose publish failed, by channel."
    );
    describe_counter!(
        "herald_quota_skipped_total",
        "Queue items dropped because the daily cap was reached."
    );
    describe_gauge!("herald_daily_count", "Publications executed today.");
    describe_gauge!("herald_ledger_keys", "Keys stored in the dedup ledger.");
    describe_gauge!("herald_last_cycle_ts", "Unix time of the last finished cycle.");
    describe_histogram!("herald_cycle_ms", "Duration of one full cycle in milliseconds.");
}
