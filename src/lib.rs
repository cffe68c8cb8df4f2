//! Reconciles provider activities with planned training sessions.
//!
//! Ingested activities are matched to an athlete's planned sessions, linked
//! one-to-one, and used to auto-complete them. Activities without a match get
//! an unplanned "Free Workout" session so every workout lands on the plan.

pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod reconcile;
pub mod repo;
pub mod sport;
pub mod strava;
pub mod sync;

#[cfg(test)]
mod test_utils;

pub use error::{ReconcileError, Result};
pub use reconcile::{LinkConflict, LinkOutcome, Reconciler};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install structured JSON logging filtered by `RUST_LOG`.
///
/// Does nothing if a global subscriber is already set.
pub fn init_logging() {
  let format = tracing_subscriber::fmt::layer()
    .json()
    .with_target(false)
    .with_current_span(true)
    .flatten_event(true);

  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("session_sync=debug,info"));

  let _ = tracing_subscriber::registry()
    .with(filter)
    .with(format)
    .try_init();
}
