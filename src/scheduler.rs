// src/scheduler.rs
//! Cycle scheduler: one cycle immediately, then one per interval, until the
//! cancellation token fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::engine::Engine;
use crate::model::Tenant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    WaitingForNextTick,
    ShuttingDown,
    Stopped,
}

pub struct Scheduler {
    engine: Arc<Engine>,
    tenants: Arc<[Tenant]>,
    interval: Duration,
    state: watch::Sender<SchedulerState>,
}

impl Scheduler {
    pub fn new(engine: Arc<Engine>, tenants: Arc<[Tenant]>, interval: Duration) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            engine,
            tenants,
            // tokio intervals reject a zero period
            interval: interval.max(Duration::from_millis(1)),
            state,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Observe state transitions (diagnostics and tests).
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Drive cycles until `cancel` fires. Returns the number of cycles started.
    ///
    /// Cycles run inline on this task, so cycle N+1 can never start before
    /// cycle N returns. A tick that comes due while a cycle is running is
    /// delayed, not queued up.
    pub async fn run(&self, cancel: CancellationToken) -> usize {
        let mut cycles = 0usize;

        info!(
            tenants = self.tenants.len(),
            interval_secs = self.interval.as_secs_f64(),
            "starting initial poll"
        );
        self.run_cycle(&cancel).await;
        cycles += 1;

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if cancel.is_cancelled() {
                break;
            }
            self.state.send_replace(SchedulerState::WaitingForNextTick);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    info!(at = %chrono::Local::now().format("%H:%M:%S"), "processing started");
                    self.run_cycle(&cancel).await;
                    cycles += 1;
                }
            }
        }

        self.state.send_replace(SchedulerState::ShuttingDown);
        drop(ticker);
        self.state.send_replace(SchedulerState::Stopped);
        info!(cycles, "shutdown complete");
        cycles
    }

    /// Run on a background task.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<usize> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    async fn run_cycle(&self, cancel: &CancellationToken) {
        self.state.send_replace(SchedulerState::Running);
        let report = self.engine.run_cycle(&self.tenants, cancel).await;
        tracing::debug!(?report, "cycle returned");
    }
}
