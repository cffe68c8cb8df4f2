use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A workout ingested from an activity provider.
///
/// Immutable after ingestion except for `training_session_id`, which only
/// the linker writes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
  pub id: i64,
  pub user_id: Option<i64>,
  pub provider: String,
  pub external_id: String,
  /// Raw provider sport string, e.g. "VirtualRide"
  pub sport: String,
  pub name: Option<String>,
  pub started_at: Option<DateTime<Utc>>,
  /// Offset of the athlete's local clock at start time
  pub utc_offset_seconds: Option<i64>,
  pub duration_seconds: Option<i64>,
  pub distance_meters: Option<f64>,
  pub elevation_gain_meters: Option<f64>,
  pub average_heartrate: Option<i64>,
  pub average_watts: Option<f64>,
  pub raw_payload: Option<String>,
  pub training_session_id: Option<i64>,
  pub created_at: Option<DateTime<Utc>>,
}

impl Activity {
  /// Calendar date in the athlete's local time when the activity started
  pub fn local_date(&self) -> Option<NaiveDate> {
    let started_at = self.started_at?;
    let offset = Duration::seconds(self.utc_offset_seconds.unwrap_or(0));
    Some((started_at + offset).date_naive())
  }
}

/// For inserting new activities (without id, link, created_at)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivity {
  pub user_id: Option<i64>,
  pub provider: String,
  pub external_id: String,
  pub sport: String,
  pub name: Option<String>,
  pub started_at: Option<DateTime<Utc>>,
  pub utc_offset_seconds: Option<i64>,
  pub duration_seconds: Option<i64>,
  pub distance_meters: Option<f64>,
  pub elevation_gain_meters: Option<f64>,
  pub average_heartrate: Option<i64>,
  pub average_watts: Option<f64>,
  pub raw_payload: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn activity_at(started_at: DateTime<Utc>, offset: Option<i64>) -> Activity {
    Activity {
      id: 1,
      user_id: Some(1),
      provider: "strava".to_string(),
      external_id: "1".to_string(),
      sport: "Run".to_string(),
      name: None,
      started_at: Some(started_at),
      utc_offset_seconds: offset,
      duration_seconds: Some(3600),
      distance_meters: None,
      elevation_gain_meters: None,
      average_heartrate: None,
      average_watts: None,
      raw_payload: None,
      training_session_id: None,
      created_at: None,
    }
  }

  #[test]
  fn test_local_date_applies_offset() {
    // 23:30 UTC on the 9th is already the 10th in UTC+2
    let started = Utc.with_ymd_and_hms(2026, 2, 9, 23, 30, 0).unwrap();
    let activity = activity_at(started, Some(7200));
    assert_eq!(activity.local_date(), NaiveDate::from_ymd_opt(2026, 2, 10));

    let activity = activity_at(started, None);
    assert_eq!(activity.local_date(), NaiveDate::from_ymd_opt(2026, 2, 9));
  }

  #[test]
  fn test_local_date_negative_offset() {
    let started = Utc.with_ymd_and_hms(2026, 2, 10, 3, 0, 0).unwrap();
    let activity = activity_at(started, Some(-5 * 3600));
    assert_eq!(activity.local_date(), NaiveDate::from_ymd_opt(2026, 2, 9));
  }

  #[test]
  fn test_local_date_none_without_start() {
    let mut activity = activity_at(Utc::now(), None);
    activity.started_at = None;
    assert_eq!(activity.local_date(), None);
  }
}
