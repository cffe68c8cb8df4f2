//! Activity reconciliation
//!
//! Drives matching, linking and completion for one activity at a time:
//! 1. Skip activities without an athlete or start time, or whose owner is not an athlete
//! 2. Lock and re-read the activity row
//! 3. Already linked: complete that session (or repair its completion source)
//! 4. Otherwise match a planned session, or create an unplanned one
//! 5. Link the session to the activity (conflicts are logged and ignored)
//! 6. Complete the session
//!
//! Steps 2-6 run in a single transaction that holds the write lock, so two
//! reconciliations of the same activity cannot both create sessions.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};

use super::completion::{backfill_completion_source, complete_if_needed};
use super::linker::{link, LinkOutcome};
use super::matcher::{derived_duration_minutes, find_matching_planned_session};
use crate::error::Result;
use crate::metrics::{MetricsResolver, WorkoutMetricsResolver};
use crate::models::{
  Activity, NewTrainingSession, PlanningSource, TrainingSession, TrainingSessionStatus, User,
};
use crate::repo::{activities, sessions, users};
use crate::sport;

/// Title and notes of sessions synthesized from unmatched activities
pub const FREE_WORKOUT_TITLE: &str = "Free Workout";

pub struct Reconciler<R = WorkoutMetricsResolver> {
  pool: SqlitePool,
  resolver: R,
}

impl Reconciler<WorkoutMetricsResolver> {
  pub fn new(pool: SqlitePool) -> Self {
    Self::with_resolver(pool, WorkoutMetricsResolver)
  }
}

impl<R: MetricsResolver> Reconciler<R> {
  pub fn with_resolver(pool: SqlitePool, resolver: R) -> Self {
    Self { pool, resolver }
  }

  /// Reconcile one activity, returning the session it completes.
  ///
  /// `Ok(None)` means the activity was skipped, not that something failed.
  pub async fn reconcile(&self, activity: &Activity) -> Result<Option<TrainingSession>> {
    let (Some(athlete_id), Some(_)) = (activity.user_id, activity.started_at) else {
      tracing::debug!(activity_id = activity.id, "Skipping activity without athlete or start time");
      return Ok(None);
    };

    let athlete = {
      let mut conn = self.pool.acquire().await?;
      users::find_user(&mut conn, athlete_id).await?
    };
    let Some(athlete) = athlete else {
      tracing::debug!(activity_id = activity.id, athlete_id, "Skipping activity of unknown user");
      return Ok(None);
    };
    if !athlete.is_athlete() {
      tracing::debug!(
        activity_id = activity.id,
        athlete_id,
        role = %athlete.role,
        "Skipping activity of non-athlete"
      );
      return Ok(None);
    }

    let mut tx = self.pool.begin().await?;
    let session = self.reconcile_locked(&mut *tx, &athlete, activity.id).await?;
    tx.commit().await?;

    Ok(session)
  }

  /// Load an activity by id and reconcile it
  pub async fn reconcile_by_id(&self, activity_id: i64) -> Result<Option<TrainingSession>> {
    let activity = {
      let mut conn = self.pool.acquire().await?;
      activities::find_activity(&mut conn, activity_id).await?
    };

    match activity {
      Some(activity) => self.reconcile(&activity).await,
      None => Ok(None),
    }
  }

  /// Reconcile each activity in turn, returning the sessions that were not skipped.
  /// Stops at the first fatal error.
  pub async fn reconcile_many(&self, activities: &[Activity]) -> Result<Vec<TrainingSession>> {
    let mut reconciled = Vec::with_capacity(activities.len());
    for activity in activities {
      if let Some(session) = self.reconcile(activity).await? {
        reconciled.push(session);
      }
    }
    Ok(reconciled)
  }

  async fn reconcile_locked(
    &self,
    conn: &mut SqliteConnection,
    athlete: &User,
    activity_id: i64,
  ) -> Result<Option<TrainingSession>> {
    let Some(activity) = activities::lock_activity(conn, activity_id).await? else {
      return Ok(None);
    };
    if activity.user_id != Some(athlete.id) {
      return Ok(None);
    }
    let Some(local_date) = activity.local_date() else {
      return Ok(None);
    };

    if let Some(session_id) = activity.training_session_id {
      let Some(session) = sessions::find_session_for_owner(conn, session_id, athlete.id).await? else {
        tracing::warn!(
          activity_id,
          session_id,
          athlete_id = athlete.id,
          "Linked session missing or owned by another user"
        );
        return Ok(None);
      };

      let session = if session.is_completed() {
        backfill_completion_source(conn, session).await?
      } else {
        complete_if_needed(conn, &self.resolver, athlete, session).await?
      };
      return Ok(Some(session));
    }

    let session = match find_matching_planned_session(conn, athlete, &activity, &self.resolver).await? {
      Some(session) => session,
      None => {
        self
          .create_unplanned_session(conn, athlete, &activity, local_date)
          .await?
      }
    };

    match link(conn, athlete, &session, &activity).await? {
      LinkOutcome::Linked(_) | LinkOutcome::AlreadyLinked(_) => {}
      LinkOutcome::Conflict(conflict) => {
        tracing::debug!(
          activity_id,
          session_id = session.id,
          %conflict,
          "Link refused, keeping existing link"
        );
      }
    }

    let session = complete_if_needed(conn, &self.resolver, athlete, session).await?;
    Ok(Some(session))
  }

  async fn create_unplanned_session(
    &self,
    conn: &mut SqliteConnection,
    athlete: &User,
    activity: &Activity,
    scheduled_date: NaiveDate,
  ) -> Result<TrainingSession> {
    let new_session = NewTrainingSession {
      user_id: athlete.id,
      scheduled_date,
      sport: sport::normalize(&activity.sport),
      title: Some(FREE_WORKOUT_TITLE.to_string()),
      notes: Some(FREE_WORKOUT_TITLE.to_string()),
      duration_minutes: Some(derived_duration_minutes(activity, &self.resolver)),
      status: TrainingSessionStatus::Planned,
      planning_source: PlanningSource::Unplanned,
    };

    let session = sessions::insert_session(conn, &new_session).await?;

    tracing::info!(
      activity_id = activity.id,
      session_id = session.id,
      athlete_id = athlete.id,
      sport = %session.sport,
      "Created unplanned session for unmatched activity"
    );

    Ok(session)
  }
}
