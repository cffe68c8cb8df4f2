//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Seed helpers for users, sessions and activities
//! - Mock data factories

use crate::models::{
  Activity, NewActivity, NewTrainingSession, PlanningSource, TrainingSessionStatus, User,
  UserRole,
};
use crate::repo::{activities, sessions};
use crate::sport::CanonicalSport;
use crate::strava::StravaActivity;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};

static SEQUENCE: AtomicUsize = AtomicUsize::new(1);

fn next_sequence() -> usize {
  SEQUENCE.fetch_add(1, Ordering::SeqCst)
}

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Create a file-backed SQLite database shared by several connections
///
/// Unlike `setup_test_db`, connections here really run concurrently, so
/// tests can exercise the reconciler's write lock. Keep the returned
/// `TempDir` alive for as long as the pool is used.
pub async fn setup_file_test_db(max_connections: u32) -> (SqlitePool, tempfile::TempDir) {
  let dir = tempfile::tempdir().expect("Failed to create temp dir");
  let options = sqlx::sqlite::SqliteConnectOptions::new()
    .filename(dir.path().join("session-sync.db"))
    .create_if_missing(true)
    .busy_timeout(std::time::Duration::from_secs(30));

  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(max_connections)
    .connect_with(options)
    .await
    .expect("Failed to create file database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  (pool, dir)
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Insert a user with the given role and return its id
pub async fn seed_user(pool: &SqlitePool, role: &str) -> i64 {
  let n = next_sequence();
  let result = sqlx::query("INSERT INTO users (name, email, role) VALUES (?1, ?2, ?3)")
    .bind(format!("User {}", n))
    .bind(format!("user{}@example.com", n))
    .bind(role)
    .execute(pool)
    .await
    .expect("Failed to insert test user");

  result.last_insert_rowid()
}

/// Seed physiological settings (max_hr 190, lthr 170, ftp 250)
pub async fn seed_user_settings(pool: &SqlitePool, user_id: i64) {
  sqlx::query(
    r#"
    INSERT INTO user_settings (user_id, max_hr, lthr, ftp)
    VALUES (?1, 190, 170, 250)
    ON CONFLICT(user_id) DO UPDATE SET
      max_hr = excluded.max_hr,
      lthr = excluded.lthr,
      ftp = excluded.ftp
    "#,
  )
  .bind(user_id)
  .execute(pool)
  .await
  .expect("Failed to seed user settings");
}

/// Insert a planned session and return its id
pub async fn seed_session(
  pool: &SqlitePool,
  user_id: i64,
  scheduled_date: NaiveDate,
  sport: CanonicalSport,
  duration_minutes: i64,
) -> i64 {
  let mut conn = pool.acquire().await.expect("Failed to acquire connection");
  let session = sessions::insert_session(
    &mut conn,
    &mock_new_session(user_id, scheduled_date, sport, duration_minutes),
  )
  .await
  .expect("Failed to insert test session");

  session.id
}

/// Insert a strava activity and return its id
pub async fn seed_activity(
  pool: &SqlitePool,
  user_id: i64,
  sport: &str,
  started_at: &str,
  duration_seconds: Option<i64>,
) -> i64 {
  let external_id = format!("test_{}", next_sequence());
  let new_activity = mock_new_activity(user_id, &external_id, sport, started_at, duration_seconds);

  let mut conn = pool.acquire().await.expect("Failed to acquire connection");
  let activity = activities::insert_activity(&mut conn, &new_activity)
    .await
    .expect("Failed to insert test activity")
    .expect("Duplicate test activity");

  activity.id
}

/// Load an activity by id, panicking if it is gone
pub async fn load_activity(pool: &SqlitePool, activity_id: i64) -> Activity {
  let mut conn = pool.acquire().await.expect("Failed to acquire connection");
  activities::find_activity(&mut conn, activity_id)
    .await
    .expect("Failed to load activity")
    .expect("Activity not found")
}

pub async fn count_sessions(pool: &SqlitePool) -> i64 {
  sqlx::query_scalar("SELECT COUNT(*) FROM training_sessions")
    .fetch_one(pool)
    .await
    .expect("Failed to count sessions")
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn mock_athlete(id: i64) -> User {
  User {
    id,
    name: format!("User {}", id),
    email: format!("user{}@example.com", id),
    role: UserRole::Athlete,
  }
}

pub fn mock_new_session(
  user_id: i64,
  scheduled_date: NaiveDate,
  sport: CanonicalSport,
  duration_minutes: i64,
) -> NewTrainingSession {
  NewTrainingSession {
    user_id,
    scheduled_date,
    sport,
    title: Some("Planned session".to_string()),
    notes: None,
    duration_minutes: Some(duration_minutes),
    status: TrainingSessionStatus::Planned,
    planning_source: PlanningSource::Planned,
  }
}

pub fn mock_new_activity(
  user_id: i64,
  external_id: &str,
  sport: &str,
  started_at: &str,
  duration_seconds: Option<i64>,
) -> NewActivity {
  NewActivity {
    user_id: Some(user_id),
    provider: "strava".to_string(),
    external_id: external_id.to_string(),
    sport: sport.to_string(),
    name: Some("Morning Workout".to_string()),
    started_at: Some(parse_utc(started_at)),
    utc_offset_seconds: Some(0),
    duration_seconds,
    distance_meters: None,
    elevation_gain_meters: None,
    average_heartrate: Some(150),
    average_watts: None,
    raw_payload: None,
  }
}

/// An unsaved activity for pure-function tests
pub fn mock_activity(sport: &str, duration_seconds: Option<i64>) -> Activity {
  Activity {
    id: 1,
    user_id: Some(1),
    provider: "strava".to_string(),
    external_id: "123456".to_string(),
    sport: sport.to_string(),
    name: Some("Morning Workout".to_string()),
    started_at: Some(parse_utc("2026-02-10T09:10:00Z")),
    utc_offset_seconds: Some(0),
    duration_seconds,
    distance_meters: None,
    elevation_gain_meters: None,
    average_heartrate: None,
    average_watts: None,
    raw_payload: None,
    training_session_id: None,
    created_at: None,
  }
}

/// Create a mock Strava activity for testing
pub fn mock_strava_activity() -> StravaActivity {
  StravaActivity {
    id: 123456,
    name: "Morning Run".to_string(),
    activity_type: "Run".to_string(),
    sport_type: Some("TrailRun".to_string()),
    start_date: parse_utc("2026-02-10T09:10:00Z"),
    utc_offset: Some(3600.0),
    elapsed_time: 3700,
    moving_time: 3600,
    distance: Some(10000.0),
    total_elevation_gain: Some(100.0),
    average_heartrate: Some(145.0),
    average_watts: None,
    raw: None,
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, month, day).expect("Invalid test date")
}

pub fn parse_utc(value: &str) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339(value)
    .expect("Invalid test timestamp")
    .with_timezone(&Utc)
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('users', 'activities', 'training_sessions', 'provider_connections')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 4, "Expected 4 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_helpers_insert_rows() {
    let pool = setup_test_db().await;

    let athlete_id = seed_user(&pool, "athlete").await;
    seed_session(&pool, athlete_id, date(2026, 2, 10), CanonicalSport::Run, 60).await;
    let activity_id = seed_activity(&pool, athlete_id, "Run", "2026-02-10T09:10:00Z", Some(3600)).await;

    assert_eq!(count_sessions(&pool).await, 1);
    let activity = load_activity(&pool, activity_id).await;
    assert_eq!(activity.user_id, Some(athlete_id));
    assert_eq!(activity.duration_seconds, Some(3600));

    teardown_test_db(pool).await;
  }
}
