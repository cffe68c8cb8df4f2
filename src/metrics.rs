//! Deterministic activity metrics used when a session is completed.
//!
//! The reconciler only needs two numbers from an activity: how long it was
//! and how much training stress it carried. Both sit behind
//! `MetricsResolver` so callers can plug in a richer model.

use crate::models::{Activity, UserSettings};

/// Resolves completion metrics for a linked activity.
pub trait MetricsResolver: Send + Sync {
  /// Whole minutes, or None when the provider reported no usable duration
  fn activity_duration_minutes(&self, activity: &Activity) -> Option<i64>;

  /// Training stress score, or None when it cannot be computed
  fn activity_tss(&self, activity: &Activity, settings: &UserSettings) -> Option<i64>;
}

/// Default resolver: power-based TSS when FTP is known, HR-based rTSS otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkoutMetricsResolver;

impl MetricsResolver for WorkoutMetricsResolver {
  fn activity_duration_minutes(&self, activity: &Activity) -> Option<i64> {
    match activity.duration_seconds {
      Some(secs) if secs > 0 => Some(((secs as f64 / 60.0).round() as i64).max(1)),
      _ => None,
    }
  }

  fn activity_tss(&self, activity: &Activity, settings: &UserSettings) -> Option<i64> {
    let secs = activity.duration_seconds.filter(|s| *s > 0)?;

    power_tss(secs, activity.average_watts, settings.ftp)
      .or_else(|| hr_tss(secs, activity.average_heartrate, settings.effective_lthr()))
      .map(|tss| tss.round() as i64)
  }
}

/// TSS from average power: hours * IF^2 * 100
fn power_tss(secs: i64, average_watts: Option<f64>, ftp: Option<i64>) -> Option<f64> {
  match (average_watts, ftp) {
    (Some(watts), Some(ftp)) if ftp > 0 && watts > 0.0 => {
      let intensity = watts / ftp as f64;
      Some(secs as f64 / 3600.0 * intensity.powi(2) * 100.0)
    }
    _ => None,
  }
}

/// rTSS from heart rate: (duration_min * (avg_hr / lthr)^2) / 60 * 100
fn hr_tss(secs: i64, average_hr: Option<i64>, lthr: Option<i64>) -> Option<f64> {
  match (average_hr, lthr) {
    (Some(hr), Some(lthr)) if lthr > 0 && hr > 0 => {
      let duration_min = secs as f64 / 60.0;
      let intensity = hr as f64 / lthr as f64;
      Some((duration_min * intensity.powi(2)) / 60.0 * 100.0)
    }
    _ => None,
  }
}
