// tests/common/mod.rs
//
// Shared stubs for integration tests: a scripted lead source, a recording
// delivery sink, and an in-memory log writer.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use lead_poller::error::{ApiError, DeliveryError, FetchError};
use lead_poller::model::ContactDetails;
use lead_poller::{DeliverySink, FetchWindow, Lead, LeadSource, Tenant};

pub fn lead(id: &str, email: &str, phone: &str) -> Lead {
    Lead {
        id: id.to_string(),
        contact_details: ContactDetails {
            email: email.to_string(),
            phone_number: phone.to_string(),
            consumer_name: "Test Consumer".to_string(),
        },
        ..Default::default()
    }
}

pub fn tenant(id: &str) -> Tenant {
    Tenant::new(id, format!("Tenant {id}"), format!("https://{id}.example/hook"))
}

/// Lead source that answers from a script and records every call.
#[derive(Default)]
pub struct StubSource {
    pub fetched: Mutex<Vec<String>>,
    pub tz_queries: Mutex<Vec<String>>,
    leads: HashMap<String, Vec<Lead>>,
    failing: HashSet<String>,
    timezones: HashMap<String, String>,
    delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_leads(mut self, account: &str, leads: Vec<Lead>) -> Self {
        self.leads.insert(account.to_string(), leads);
        self
    }

    pub fn failing(mut self, account: &str) -> Self {
        self.failing.insert(account.to_string());
        self
    }

    pub fn timezone(mut self, account: &str, tz: &str) -> Self {
        self.timezones.insert(account.to_string(), tz.to_string());
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fire `token` once `n` fetches have completed.
    pub fn cancel_after(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl LeadSource for StubSource {
    async fn account_timezone(&self, account_id: &str) -> Result<Option<String>, ApiError> {
        self.tz_queries.lock().push(account_id.to_string());
        Ok(Some(
            self.timezones
                .get(account_id)
                .cloned()
                .unwrap_or_else(|| "America/Chicago".to_string()),
        ))
    }

    async fn fetch_leads(
        &self,
        account_id: &str,
        _max_leads: u32,
        _window: &FetchWindow,
    ) -> Result<Vec<Lead>, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let count = {
            let mut f = self.fetched.lock();
            f.push(account_id.to_string());
            f.len()
        };
        if let Some((n, token)) = &self.cancel_after {
            if count >= *n {
                token.cancel();
            }
        }

        if self.failing.contains(account_id) {
            return Err(ApiError::Status {
                status: 500,
                body: "backend error".into(),
            }
            .into());
        }
        Ok(self.leads.get(account_id).cloned().unwrap_or_default())
    }
}

/// Delivery sink that records every POST and fails chosen lead ids.
#[derive(Default)]
pub struct RecordingSink {
    pub posts: Mutex<Vec<(String, serde_json::Value)>>,
    pub attempts: Mutex<Vec<String>>,
    fail_ids: HashSet<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, lead_id: &str) -> Self {
        self.fail_ids.insert(lead_id.to_string());
        self
    }

    pub fn posted_ids(&self) -> Vec<String> {
        self.posts
            .lock()
            .iter()
            .map(|(_, body)| body["id"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn attempted_ids(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn deliver(&self, callback_url: &str, lead: &Lead) -> Result<(), DeliveryError> {
        self.attempts.lock().push(lead.id.clone());
        if self.fail_ids.contains(&lead.id) {
            return Err(DeliveryError::Status {
                status: 502,
                body: "bad gateway".into(),
            });
        }
        let body = serde_json::to_value(lead).map_err(DeliveryError::Encode)?;
        self.posts.lock().push((callback_url.to_string(), body));
        Ok(())
    }
}

/// In-memory log sink for asserting on emitted log lines.
#[derive(Clone, Default)]
pub struct LogBuf(Arc<Mutex<Vec<u8>>>);

impl LogBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Capture logs on the current thread. Works with the default current-thread
/// `#[tokio::test]` runtime; keep the guard alive for the whole test.
pub fn capture_logs() -> (LogBuf, tracing::subscriber::DefaultGuard) {
    let buf = LogBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (buf, tracing::subscriber::set_default(subscriber))
}
