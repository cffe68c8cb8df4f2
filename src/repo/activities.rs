//! Activity persistence

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::error::Result;
use crate::models::{Activity, NewActivity};

const ACTIVITY_COLUMNS: &str = "id, user_id, provider, external_id, sport, name, started_at, \
  utc_offset_seconds, duration_seconds, distance_meters, elevation_gain_meters, \
  average_heartrate, average_watts, raw_payload, training_session_id, created_at";

/// Insert an activity, returning None when (provider, external_id) already exists
pub async fn insert_activity(
  conn: &mut SqliteConnection,
  activity: &NewActivity,
) -> Result<Option<Activity>> {
  let sql = format!(
    r#"
    INSERT INTO activities (
      user_id, provider, external_id, sport, name, started_at, utc_offset_seconds,
      duration_seconds, distance_meters, elevation_gain_meters, average_heartrate,
      average_watts, raw_payload
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
    ON CONFLICT(provider, external_id) DO NOTHING
    RETURNING {}
    "#,
    ACTIVITY_COLUMNS
  );

  let inserted = sqlx::query_as::<_, Activity>(&sql)
    .bind(activity.user_id)
    .bind(&activity.provider)
    .bind(&activity.external_id)
    .bind(&activity.sport)
    .bind(&activity.name)
    .bind(activity.started_at)
    .bind(activity.utc_offset_seconds)
    .bind(activity.duration_seconds)
    .bind(activity.distance_meters)
    .bind(activity.elevation_gain_meters)
    .bind(activity.average_heartrate)
    .bind(activity.average_watts)
    .bind(&activity.raw_payload)
    .fetch_optional(&mut *conn)
    .await?;

  Ok(inserted)
}

pub async fn find_activity(conn: &mut SqliteConnection, activity_id: i64) -> Result<Option<Activity>> {
  let sql = format!("SELECT {} FROM activities WHERE id = ?1", ACTIVITY_COLUMNS);
  let activity = sqlx::query_as::<_, Activity>(&sql)
    .bind(activity_id)
    .fetch_optional(&mut *conn)
    .await?;

  Ok(activity)
}

/// Take the write lock on an activity row and re-read it.
///
/// SQLite has no `SELECT ... FOR UPDATE`; the no-op write acquires the
/// database write lock, which is held until the surrounding transaction
/// commits or rolls back. Must be the first statement of the transaction.
pub async fn lock_activity(conn: &mut SqliteConnection, activity_id: i64) -> Result<Option<Activity>> {
  let locked = sqlx::query("UPDATE activities SET updated_at = updated_at WHERE id = ?1")
    .bind(activity_id)
    .execute(&mut *conn)
    .await?;

  if locked.rows_affected() == 0 {
    return Ok(None);
  }

  find_activity(conn, activity_id).await
}

/// Reverse lookup: the activity linked to a session, if any
pub async fn find_linked_activity(
  conn: &mut SqliteConnection,
  session_id: i64,
) -> Result<Option<Activity>> {
  let sql = format!(
    "SELECT {} FROM activities WHERE training_session_id = ?1 LIMIT 1",
    ACTIVITY_COLUMNS
  );
  let activity = sqlx::query_as::<_, Activity>(&sql)
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await?;

  Ok(activity)
}

pub async fn set_training_session(
  conn: &mut SqliteConnection,
  activity_id: i64,
  session_id: i64,
) -> Result<()> {
  sqlx::query(
    r#"
    UPDATE activities
    SET training_session_id = ?1, updated_at = ?2
    WHERE id = ?3
    "#,
  )
  .bind(session_id)
  .bind(Utc::now())
  .bind(activity_id)
  .execute(&mut *conn)
  .await?;

  Ok(())
}

/// Activities of a user and provider not yet linked to a session, oldest first
pub async fn find_unreconciled(
  conn: &mut SqliteConnection,
  user_id: i64,
  provider: &str,
) -> Result<Vec<Activity>> {
  let sql = format!(
    r#"
    SELECT {} FROM activities
    WHERE user_id = ?1 AND provider = ?2 AND training_session_id IS NULL
    ORDER BY started_at ASC, id ASC
    "#,
    ACTIVITY_COLUMNS
  );
  let activities = sqlx::query_as::<_, Activity>(&sql)
    .bind(user_id)
    .bind(provider)
    .fetch_all(&mut *conn)
    .await?;

  Ok(activities)
}

/// Start time of the newest stored activity for a user and provider
pub async fn latest_started_at(
  conn: &mut SqliteConnection,
  user_id: i64,
  provider: &str,
) -> Result<Option<DateTime<Utc>>> {
  let latest: Option<DateTime<Utc>> = sqlx::query_scalar(
    "SELECT MAX(started_at) FROM activities WHERE user_id = ?1 AND provider = ?2",
  )
  .bind(user_id)
  .bind(provider)
  .fetch_one(&mut *conn)
  .await?;

  Ok(latest)
}
