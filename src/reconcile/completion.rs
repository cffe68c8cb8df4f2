//! Marking sessions completed from their linked activity

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::error::Result;
use crate::metrics::MetricsResolver;
use crate::models::{CompletionSource, TrainingSession, TrainingSessionStatus, User};
use crate::repo::{activities, sessions, users};

/// Complete `session` from its linked activity unless it is already completed.
///
/// Idempotent: a completed session is returned untouched.
pub async fn complete_if_needed(
  conn: &mut SqliteConnection,
  resolver: &dyn MetricsResolver,
  athlete: &User,
  mut session: TrainingSession,
) -> Result<TrainingSession> {
  if session.is_completed() {
    return Ok(session);
  }

  let linked = activities::find_linked_activity(conn, session.id).await?;
  let settings = users::load_user_settings(conn, athlete.id).await?;

  let now = Utc::now();
  session.actual_duration_minutes = linked
    .as_ref()
    .and_then(|activity| resolver.activity_duration_minutes(activity));
  session.actual_tss = linked
    .as_ref()
    .and_then(|activity| resolver.activity_tss(activity, &settings));
  session.status = TrainingSessionStatus::Completed;
  session.completion_source = Some(CompletionSource::ProviderAuto);
  session.completed_at = Some(now);
  session.auto_completed_at = Some(now);

  sessions::update_completion(conn, &session).await?;

  tracing::info!(
    session_id = session.id,
    athlete_id = athlete.id,
    activity_id = linked.as_ref().map(|a| a.id),
    actual_duration_minutes = session.actual_duration_minutes,
    actual_tss = session.actual_tss,
    "Auto-completed session"
  );

  Ok(session)
}

/// Repair completed sessions that predate completion tracking
pub async fn backfill_completion_source(
  conn: &mut SqliteConnection,
  mut session: TrainingSession,
) -> Result<TrainingSession> {
  if !session.is_completed() || session.completion_source.is_some() {
    return Ok(session);
  }

  session.completion_source = Some(CompletionSource::ProviderAuto);
  sessions::update_completion(conn, &session).await?;

  tracing::debug!(session_id = session.id, "Backfilled completion source");
  Ok(session)
}
