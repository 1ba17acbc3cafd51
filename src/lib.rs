// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod model;
pub mod shutdown;
pub mod window;

// Poll-and-dispatch core
pub mod engine;
pub mod scheduler;

// External collaborators
pub mod delivery;
pub mod roster;
pub mod source;

// ---- Re-exports for stable public API ----
pub use crate::delivery::DeliverySink;
pub use crate::engine::{CycleReport, Engine, EngineConfig};
pub use crate::model::{Lead, Tenant};
pub use crate::scheduler::{Scheduler, SchedulerState};
pub use crate::source::LeadSource;
pub use crate::window::FetchWindow;
