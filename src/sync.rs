//! Provider sync job
//!
//! Pulls new activities for one athlete page by page, stores them and hands
//! every activity still unlinked to the reconciler, so a run that failed
//! part-way is finished by the next one. Provider HTTP calls are retried
//! with exponential backoff; reconciliation is not.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use reqwest::Client;
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::sleep;

use crate::config::Config;
use crate::reconcile::Reconciler;
use crate::repo::{activities, connections};
use crate::strava::{self, StravaError, PROVIDER};

const HTTP_TIMEOUT_SECS: u64 = 30;

/// ---------------------------------------------------------------------------
/// Per-athlete Sync Locks
/// ---------------------------------------------------------------------------

/// In-process locks keyed by `provider:userId`
#[derive(Debug, Clone, Default)]
pub struct SyncLocks {
  locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SyncLocks {
  pub fn new() -> Self {
    Self::default()
  }

  /// Take the lock for this key, or None while another sync holds it
  pub fn try_acquire(&self, provider: &str, user_id: i64) -> Option<OwnedMutexGuard<()>> {
    let key = format!("{}:{}", provider, user_id);
    let lock = self
      .locks
      .entry(key)
      .or_insert_with(|| Arc::new(Mutex::new(())))
      .clone();
    lock.try_lock_owned().ok()
  }
}

/// ---------------------------------------------------------------------------
/// Retry
/// ---------------------------------------------------------------------------

/// Bounded retries with exponential backoff for provider calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub initial_delay_ms: u64,
  pub max_delay_ms: u64,
  pub backoff_factor: f64,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      initial_delay_ms: 250,
      max_delay_ms: 5000,
      backoff_factor: 2.0,
    }
  }
}

impl RetryPolicy {
  pub fn from_config(config: &Config) -> Self {
    Self {
      max_attempts: config.sync_max_retries.max(1),
      ..Self::default()
    }
  }

  /// Run `func` until it succeeds, fails permanently, or attempts run out
  pub async fn execute<F, Fut, T>(&self, mut func: F) -> Result<T, StravaError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StravaError>>,
  {
    let mut attempt = 0;
    let mut delay_ms = self.initial_delay_ms;

    loop {
      match func().await {
        Ok(result) => return Ok(result),
        Err(e) => {
          attempt += 1;

          if !e.is_transient() {
            return Err(e);
          }
          if attempt >= self.max_attempts {
            tracing::warn!(attempts = attempt, error = %e, "Provider call failed, giving up");
            return Err(e);
          }

          tracing::debug!(attempt, delay_ms, error = %e, "Provider call failed, retrying");
          sleep(Duration::from_millis(delay_ms)).await;

          delay_ms = ((delay_ms as f64 * self.backoff_factor) as u64).min(self.max_delay_ms);
        }
      }
    }
  }
}

/// ---------------------------------------------------------------------------
/// Sync Job
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  pub fetched: usize,
  pub inserted: usize,
  pub reconciled: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SyncOutcome {
  Completed(SyncReport),
  /// Another sync for the same athlete and provider is in flight
  AlreadyRunning,
}

/// Sync one athlete's Strava activities and reconcile any left unlinked
pub async fn sync_athlete(
  pool: &SqlitePool,
  config: &Config,
  locks: &SyncLocks,
  user_id: i64,
) -> Result<SyncOutcome, StravaError> {
  let Some(_guard) = locks.try_acquire(PROVIDER, user_id) else {
    tracing::info!(athlete_id = user_id, provider = PROVIDER, "Sync already running, skipping");
    return Ok(SyncOutcome::AlreadyRunning);
  };

  let retry = RetryPolicy::from_config(config);
  let client = Client::builder()
    .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
    .build()?;

  let (access_token, after) = {
    let mut conn = pool.acquire().await?;

    let mut tokens = connections::load_tokens(&mut conn, user_id, PROVIDER)
      .await?
      .ok_or(StravaError::NotAuthenticated)?;

    if tokens.needs_refresh() {
      let refresh_token = tokens.refresh_token.clone();
      tokens = retry
        .execute(|| strava::refresh_tokens(&client, &config.strava, &refresh_token))
        .await?;
      connections::save_tokens(&mut conn, user_id, PROVIDER, &tokens).await?;
      tracing::info!(athlete_id = user_id, "Strava tokens refreshed");
    }

    let after = activities::latest_started_at(&mut conn, user_id, PROVIDER)
      .await?
      .map(|started_at| started_at.timestamp());

    (tokens.access_token, after)
  };

  let mut report = SyncReport::default();
  let page_size = config.sync_page_size.max(1);
  let mut page = 1;

  loop {
    let fetched = retry
      .execute(|| {
        strava::fetch_activities(&client, &config.strava, &access_token, after, page, page_size)
      })
      .await?;
    let page_len = fetched.len();
    report.fetched += page_len;

    let mut conn = pool.acquire().await?;
    for activity in fetched {
      let new_activity = activity.into_new_activity(user_id);
      if activities::insert_activity(&mut conn, &new_activity).await?.is_some() {
        report.inserted += 1;
      }
    }
    drop(conn);

    if page_len < page_size as usize {
      break;
    }
    page += 1;
  }

  // Everything still unlinked, so a run that failed mid-reconcile is picked up again
  let pending = {
    let mut conn = pool.acquire().await?;
    activities::find_unreconciled(&mut conn, user_id, PROVIDER).await?
  };
  let reconciled = Reconciler::new(pool.clone()).reconcile_many(&pending).await?;
  report.reconciled = reconciled.len();

  {
    let mut conn = pool.acquire().await?;
    connections::touch_last_sync(&mut conn, user_id, PROVIDER).await?;
  }

  tracing::info!(
    athlete_id = user_id,
    provider = PROVIDER,
    fetched = report.fetched,
    inserted = report.inserted,
    reconciled = report.reconciled,
    "Strava sync complete"
  );

  Ok(SyncOutcome::Completed(report))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
