// src/engine.rs
//! Poll-and-dispatch engine: one cycle over the whole roster.
//!
//! Tenants are processed strictly in roster order, one at a time. A failed
//! fetch skips that tenant only; a failed delivery skips that lead only.
//! Nothing raised here ever reaches the scheduler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::delivery::DeliverySink;
use crate::error::FetchError;
use crate::metrics::ensure_metrics_described;
use crate::model::{Lead, Tenant};
use crate::source::LeadSource;
use crate::window::resolve_window;

/// Operational ceiling on leads fetched per tenant per cycle.
pub const DEFAULT_MAX_LEADS: u32 = 100;

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub max_leads: u32,
    /// How far back each fetch window reaches. Must be at least the cycle interval.
    pub lookback: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_leads: DEFAULT_MAX_LEADS,
            lookback: Duration::from_secs(3600),
        }
    }
}

/// What one cycle did. Purely informational.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub tenants_visited: usize,
    pub fetch_failures: usize,
    pub leads_fetched: usize,
    pub delivered: usize,
    pub delivery_failures: usize,
    pub malformed: usize,
    /// Set when shutdown stopped the cycle before the last tenant.
    pub cancelled: bool,
}

pub struct Engine {
    source: Arc<dyn LeadSource>,
    sink: Arc<dyn DeliverySink>,
    cfg: EngineConfig,
}

impl Engine {
    pub fn new(source: Arc<dyn LeadSource>, sink: Arc<dyn DeliverySink>, cfg: EngineConfig) -> Self {
        Self { source, sink, cfg }
    }

    pub fn config(&self) -> EngineConfig {
        self.cfg
    }

    /// Run one cycle. Cancellation is checked before each tenant, never mid-call.
    pub async fn run_cycle(&self, tenants: &[Tenant], cancel: &CancellationToken) -> CycleReport {
        ensure_metrics_described();
        counter!("poller_cycles_total").increment(1);

        let t0 = Instant::now();
        let mut report = CycleReport::default();

        for tenant in tenants {
            if cancel.is_cancelled() {
                info!(
                    remaining = tenants.len() - report.tenants_visited,
                    "shutdown requested, stopping tenant processing"
                );
                counter!("poller_cycles_cancelled_total").increment(1);
                report.cancelled = true;
                break;
            }
            report.tenants_visited += 1;

            match self.fetch_for_tenant(tenant).await {
                Err(e) => {
                    error!(
                        tenant = %tenant.display_name,
                        account_id = %tenant.account_id,
                        error = %e,
                        "failed to fetch leads"
                    );
                    counter!("poller_tenant_fetch_errors_total").increment(1);
                    report.fetch_failures += 1;
                }
                Ok(leads) if leads.is_empty() => {
                    info!(tenant = %tenant.display_name, "no new leads");
                }
                Ok(leads) => {
                    report.leads_fetched += leads.len();
                    counter!("poller_leads_fetched_total").increment(leads.len() as u64);
                    self.dispatch(tenant, leads, &mut report).await;
                }
            }
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("poller_cycle_duration_ms").record(ms);
        gauge!("poller_last_cycle_ts").set(chrono::Utc::now().timestamp() as f64);

        if !report.cancelled {
            info!(
                tenants = report.tenants_visited,
                fetch_failures = report.fetch_failures,
                delivered = report.delivered,
                delivery_failures = report.delivery_failures,
                malformed = report.malformed,
                elapsed_ms = ms as u64,
                "finished processing leads this run for all tenants"
            );
        }
        report
    }

    async fn fetch_for_tenant(&self, tenant: &Tenant) -> Result<Vec<Lead>, FetchError> {
        let window =
            resolve_window(self.source.as_ref(), &tenant.account_id, self.cfg.lookback).await?;
        self.source
            .fetch_leads(&tenant.account_id, self.cfg.max_leads, &window)
            .await
    }

    async fn dispatch(&self, tenant: &Tenant, leads: Vec<Lead>, report: &mut CycleReport) {
        for lead in leads {
            if !lead.has_contact() {
                let payload = serde_json::to_string_pretty(&lead)
                    .unwrap_or_else(|_| format!("{lead:?}"));
                warn!(
                    tenant = %tenant.display_name,
                    lead_id = %lead.id,
                    payload = %payload,
                    "malformed lead without email or phone, not forwarded"
                );
                counter!("poller_malformed_leads_total").increment(1);
                report.malformed += 1;
                continue;
            }

            match self.sink.deliver(&tenant.callback_url, &lead).await {
                Ok(()) => {
                    info!(tenant = %tenant.display_name, lead_id = %lead.id, "sent lead");
                    counter!("poller_leads_delivered_total").increment(1);
                    report.delivered += 1;
                }
                Err(e) => {
                    error!(
                        tenant = %tenant.display_name,
                        lead_id = %lead.id,
                        error = %e,
                        "failed to send lead"
                    );
                    counter!("poller_delivery_failures_total").increment(1);
                    report.delivery_failures += 1;
                }
            }
        }
    }
}
