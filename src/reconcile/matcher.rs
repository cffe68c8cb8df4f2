//! Candidate matching: which planned session does an activity fulfil?
//!
//! Candidates are the athlete's planned, unlinked sessions on the activity's
//! local date with the same canonical sport. A lone candidate is accepted
//! as-is; among several, the closest planned duration wins if it is within
//! tolerance.

use sqlx::SqliteConnection;

use crate::error::Result;
use crate::metrics::MetricsResolver;
use crate::models::{Activity, TrainingSession, User};
use crate::repo::sessions;
use crate::sport;

/// Assumed length of an activity with no usable duration
pub const DEFAULT_ACTIVITY_MINUTES: i64 = 30;

/// Floor of the accepted duration gap when choosing among candidates
pub const MIN_DURATION_TOLERANCE_MINUTES: i64 = 20;

/// Share of the activity duration accepted as gap when choosing among candidates
pub const DURATION_TOLERANCE_RATIO: f64 = 0.5;

/// Activity duration used for matching and for unplanned sessions
pub fn derived_duration_minutes(activity: &Activity, resolver: &dyn MetricsResolver) -> i64 {
  resolver
    .activity_duration_minutes(activity)
    .filter(|minutes| *minutes > 0)
    .unwrap_or(DEFAULT_ACTIVITY_MINUTES)
}

/// Largest accepted |planned - actual| gap: max(20, round(minutes * 0.5))
pub fn duration_tolerance(activity_minutes: i64) -> i64 {
  let proportional = (activity_minutes as f64 * DURATION_TOLERANCE_RATIO).round() as i64;
  proportional.max(MIN_DURATION_TOLERANCE_MINUTES)
}

/// Pick the session an activity of `activity_minutes` should complete.
///
/// `candidates` must already be filtered to the same athlete, date and sport,
/// in creation order. Ties on duration go to the earlier candidate.
pub fn select_candidate(
  candidates: Vec<TrainingSession>,
  activity_minutes: i64,
) -> Option<TrainingSession> {
  if candidates.len() <= 1 {
    // Unambiguous day/sport match: no duration gate
    return candidates.into_iter().next();
  }

  let tolerance = duration_tolerance(activity_minutes);
  candidates
    .into_iter()
    .min_by_key(|session| duration_gap(session, activity_minutes))
    .filter(|best| duration_gap(best, activity_minutes) <= tolerance)
}

fn duration_gap(session: &TrainingSession, activity_minutes: i64) -> i64 {
  (session.duration_minutes.unwrap_or(0) - activity_minutes).abs()
}

/// Find the planned session this activity should complete, if any
pub async fn find_matching_planned_session(
  conn: &mut SqliteConnection,
  athlete: &User,
  activity: &Activity,
  resolver: &dyn MetricsResolver,
) -> Result<Option<TrainingSession>> {
  if activity.user_id != Some(athlete.id) {
    return Ok(None);
  }
  let Some(date) = activity.local_date() else {
    return Ok(None);
  };

  let sport = sport::normalize(&activity.sport);
  let candidates = sessions::find_unlinked_planned_sessions(conn, athlete.id, date, sport).await?;
  let candidate_count = candidates.len();
  let activity_minutes = derived_duration_minutes(activity, resolver);

  let matched = select_candidate(candidates, activity_minutes);

  tracing::debug!(
    activity_id = activity.id,
    athlete_id = athlete.id,
    %date,
    %sport,
    candidate_count,
    activity_minutes,
    session_id = matched.as_ref().map(|s| s.id),
    "Matched activity against planned sessions"
  );

  Ok(matched)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::metrics::WorkoutMetricsResolver;
  use crate::models::{PlanningSource, TrainingSessionStatus};
  use crate::sport::CanonicalSport;
  use crate::test_utils::*;

  fn planned(id: i64, duration_minutes: Option<i64>) -> TrainingSession {
    TrainingSession {
      id,
      user_id: 1,
      scheduled_date: date(2026, 2, 10),
      sport: CanonicalSport::Run,
      title: None,
      notes: None,
      duration_minutes,
      status: TrainingSessionStatus::Planned,
      planning_source: PlanningSource::Planned,
      completion_source: None,
      actual_duration_minutes: None,
      actual_tss: None,
      completed_at: None,
      auto_completed_at: None,
    }
  }

  fn ids(session: Option<TrainingSession>) -> Option<i64> {
    session.map(|s| s.id)
  }

  #[test]
  fn test_tolerance_floor_and_ratio() {
    assert_eq!(duration_tolerance(10), 20);
    assert_eq!(duration_tolerance(40), 20);
    assert_eq!(duration_tolerance(60), 30);
    assert_eq!(duration_tolerance(61), 31); // 30.5 rounds half away from zero
    assert_eq!(duration_tolerance(180), 90);
  }

  #[test]
  fn test_no_candidates() {
    assert_eq!(ids(select_candidate(vec![], 60)), None);
  }

  #[test]
  fn test_single_candidate_skips_duration_gate() {
    assert_eq!(ids(select_candidate(vec![planned(7, Some(300))], 60)), Some(7));
    assert_eq!(ids(select_candidate(vec![planned(7, None)], 60)), Some(7));
  }

  #[test]
  fn test_closest_candidate_at_boundary_accepted() {
    // |30 - 60| = 30 <= max(20, 30)
    let candidates = vec![planned(1, Some(30)), planned(2, Some(300))];
    assert_eq!(ids(select_candidate(candidates, 60)), Some(1));
  }

  #[test]
  fn test_closest_candidate_past_boundary_rejected() {
    // |29 - 60| = 31 > 30
    let candidates = vec![planned(1, Some(29)), planned(2, Some(300))];
    assert_eq!(ids(select_candidate(candidates, 60)), None);
  }

  #[test]
  fn test_floor_tolerance_for_short_activities() {
    // 20 minute activity: tolerance is the 20 minute floor, not 10
    let candidates = vec![planned(1, Some(40)), planned(2, Some(90))];
    assert_eq!(ids(select_candidate(candidates, 20)), Some(1));

    let candidates = vec![planned(1, Some(41)), planned(2, Some(90))];
    assert_eq!(ids(select_candidate(candidates, 20)), None);
  }

  #[test]
  fn test_ties_go_to_earliest_candidate() {
    let candidates = vec![planned(3, Some(50)), planned(4, Some(70))];
    assert_eq!(ids(select_candidate(candidates, 60)), Some(3));
  }

  #[test]
  fn test_derived_duration_defaults_to_thirty() {
    let resolver = WorkoutMetricsResolver;
    assert_eq!(derived_duration_minutes(&mock_activity("Run", None), &resolver), 30);
    assert_eq!(derived_duration_minutes(&mock_activity("Run", Some(0)), &resolver), 30);
    assert_eq!(derived_duration_minutes(&mock_activity("Run", Some(-60)), &resolver), 30);
    assert_eq!(derived_duration_minutes(&mock_activity("Run", Some(5400)), &resolver), 90);
  }

  #[tokio::test]
  async fn test_matches_on_local_date_and_normalized_sport() {
    let pool = setup_test_db().await;
    let athlete_id = seed_user(&pool, "athlete").await;
    let bike = seed_session(&pool, athlete_id, date(2026, 2, 10), CanonicalSport::Bike, 60).await;
    seed_session(&pool, athlete_id, date(2026, 2, 10), CanonicalSport::Run, 60).await;
    let activity_id =
      seed_activity(&pool, athlete_id, "VirtualRide", "2026-02-10T18:00:00Z", Some(3600)).await;
    let activity = load_activity(&pool, activity_id).await;

    let mut conn = pool.acquire().await.unwrap();
    let matched = find_matching_planned_session(
      &mut conn,
      &mock_athlete(athlete_id),
      &activity,
      &WorkoutMetricsResolver,
    )
    .await
    .unwrap();
    assert_eq!(ids(matched), Some(bike));

    drop(conn);
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_never_matches_other_athletes_sessions() {
    let pool = setup_test_db().await;
    let athlete_a = seed_user(&pool, "athlete").await;
    let athlete_b = seed_user(&pool, "athlete").await;
    seed_session(&pool, athlete_b, date(2026, 2, 10), CanonicalSport::Run, 60).await;
    let activity_id = seed_activity(&pool, athlete_a, "Run", "2026-02-10T09:10:00Z", Some(3600)).await;
    let activity = load_activity(&pool, activity_id).await;

    let mut conn = pool.acquire().await.unwrap();
    let resolver = WorkoutMetricsResolver;
    let as_owner =
      find_matching_planned_session(&mut conn, &mock_athlete(athlete_a), &activity, &resolver)
        .await
        .unwrap();
    assert!(as_owner.is_none());

    // Asking on behalf of the wrong athlete never matches either
    let as_other =
      find_matching_planned_session(&mut conn, &mock_athlete(athlete_b), &activity, &resolver)
        .await
        .unwrap();
    assert!(as_other.is_none());

    drop(conn);
    teardown_test_db(pool).await;
  }
}
