// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder for this process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        ensure_metrics_described();
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

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("poller_cycles_total", "Poll cycles started.");
        describe_counter!(
            "poller_cycles_cancelled_total",
            "Poll cycles cut short by shutdown."
        );
        describe_counter!(
            "poller_tenant_fetch_errors_total",
            "Tenants skipped because the lead fetch or timezone lookup failed."
        );
        describe_counter!("poller_leads_fetched_total", "Leads returned by the lead source.");
        describe_counter!(
            "poller_leads_delivered_total",
            "Leads accepted by a tenant webhook."
        );
        describe_counter!(
            "poller_delivery_failures_total",
            "Leads whose webhook delivery failed."
        );
        describe_counter!(
            "poller_malformed_leads_total",
            "Leads dropped for missing both email and phone."
        );
        describe_histogram!("poller_cycle_duration_ms", "Cycle wall time in milliseconds.");
        describe_histogram!("poller_vendor_call_ms", "Lead source call time in milliseconds.");
        describe_gauge!("poller_last_cycle_ts", "Unix ts when the last cycle finished.");
    });
}
