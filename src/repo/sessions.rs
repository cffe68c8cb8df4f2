//! Training session persistence

use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::parse_column;
use crate::error::Result;
use crate::models::{NewTrainingSession, TrainingSession};
use crate::sport::CanonicalSport;

const SESSION_COLUMNS: &str = "id, user_id, scheduled_date, sport, title, notes, \
  duration_minutes, status, planning_source, completion_source, actual_duration_minutes, \
  actual_tss, completed_at, auto_completed_at";

fn session_from_row(row: &SqliteRow) -> Result<TrainingSession> {
  let completion_source: Option<String> = row.try_get("completion_source")?;

  Ok(TrainingSession {
    id: row.try_get("id")?,
    user_id: row.try_get("user_id")?,
    scheduled_date: row.try_get("scheduled_date")?,
    sport: parse_column("training_sessions.sport", row.try_get("sport")?)?,
    title: row.try_get("title")?,
    notes: row.try_get("notes")?,
    duration_minutes: row.try_get("duration_minutes")?,
    status: parse_column("training_sessions.status", row.try_get("status")?)?,
    planning_source: parse_column(
      "training_sessions.planning_source",
      row.try_get("planning_source")?,
    )?,
    completion_source: completion_source
      .map(|value| parse_column("training_sessions.completion_source", value))
      .transpose()?,
    actual_duration_minutes: row.try_get("actual_duration_minutes")?,
    actual_tss: row.try_get("actual_tss")?,
    completed_at: row.try_get("completed_at")?,
    auto_completed_at: row.try_get("auto_completed_at")?,
  })
}

pub async fn insert_session(
  conn: &mut SqliteConnection,
  session: &NewTrainingSession,
) -> Result<TrainingSession> {
  let sql = format!(
    r#"
    INSERT INTO training_sessions (
      user_id, scheduled_date, sport, title, notes, duration_minutes, status, planning_source
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    RETURNING {}
    "#,
    SESSION_COLUMNS
  );

  let row = sqlx::query(&sql)
    .bind(session.user_id)
    .bind(session.scheduled_date)
    .bind(session.sport.as_str())
    .bind(&session.title)
    .bind(&session.notes)
    .bind(session.duration_minutes)
    .bind(session.status.as_str())
    .bind(session.planning_source.as_str())
    .fetch_one(&mut *conn)
    .await?;

  session_from_row(&row)
}

pub async fn find_session(conn: &mut SqliteConnection, session_id: i64) -> Result<Option<TrainingSession>> {
  let sql = format!("SELECT {} FROM training_sessions WHERE id = ?1", SESSION_COLUMNS);
  let row = sqlx::query(&sql)
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await?;

  row.as_ref().map(session_from_row).transpose()
}

/// Fetch a session only if it belongs to `owner_id`
pub async fn find_session_for_owner(
  conn: &mut SqliteConnection,
  session_id: i64,
  owner_id: i64,
) -> Result<Option<TrainingSession>> {
  let sql = format!(
    "SELECT {} FROM training_sessions WHERE id = ?1 AND user_id = ?2",
    SESSION_COLUMNS
  );
  let row = sqlx::query(&sql)
    .bind(session_id)
    .bind(owner_id)
    .fetch_optional(&mut *conn)
    .await?;

  row.as_ref().map(session_from_row).transpose()
}

/// Planned sessions on `date` for `sport` that no activity is linked to yet.
/// Ordered by id so the earliest-created session wins ties.
pub async fn find_unlinked_planned_sessions(
  conn: &mut SqliteConnection,
  owner_id: i64,
  date: NaiveDate,
  sport: CanonicalSport,
) -> Result<Vec<TrainingSession>> {
  let sql = format!(
    r#"
    SELECT {} FROM training_sessions s
    WHERE s.user_id = ?1
      AND s.scheduled_date = ?2
      AND s.sport = ?3
      AND s.status = 'planned'
      AND s.planning_source = 'planned'
      AND NOT EXISTS (
        SELECT 1 FROM activities a WHERE a.training_session_id = s.id
      )
    ORDER BY s.id ASC
    "#,
    SESSION_COLUMNS
  );

  let rows = sqlx::query(&sql)
    .bind(owner_id)
    .bind(date)
    .bind(sport.as_str())
    .fetch_all(&mut *conn)
    .await?;

  rows.iter().map(session_from_row).collect()
}

/// Persist the completion fields of a session
pub async fn update_completion(conn: &mut SqliteConnection, session: &TrainingSession) -> Result<()> {
  sqlx::query(
    r#"
    UPDATE training_sessions
    SET status = ?1,
        completion_source = ?2,
        actual_duration_minutes = ?3,
        actual_tss = ?4,
        completed_at = ?5,
        auto_completed_at = ?6,
        updated_at = ?7
    WHERE id = ?8
    "#,
  )
  .bind(session.status.as_str())
  .bind(session.completion_source.map(|s| s.as_str()))
  .bind(session.actual_duration_minutes)
  .bind(session.actual_tss)
  .bind(session.completed_at)
  .bind(session.auto_completed_at)
  .bind(Utc::now())
  .bind(session.id)
  .execute(&mut *conn)
  .await?;

  Ok(())
}
