use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::sport::CanonicalSport;

/// ---------------------------------------------------------------------------
/// Session Status
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrainingSessionStatus {
  #[default]
  Planned,
  Completed,
  Skipped,
  Partial,
}

impl TrainingSessionStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Planned => "planned",
      Self::Completed => "completed",
      Self::Skipped => "skipped",
      Self::Partial => "partial",
    }
  }
}

impl std::fmt::Display for TrainingSessionStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for TrainingSessionStatus {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "planned" => Ok(Self::Planned),
      "completed" => Ok(Self::Completed),
      "skipped" => Ok(Self::Skipped),
      "partial" => Ok(Self::Partial),
      _ => Err(format!("Unknown session status: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Planning Source: where the session came from
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanningSource {
  /// Put on the calendar by a coach or the athlete
  #[default]
  Planned,
  /// Synthesized from an activity that matched nothing
  Unplanned,
}

impl PlanningSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Planned => "planned",
      Self::Unplanned => "unplanned",
    }
  }
}

impl std::fmt::Display for PlanningSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for PlanningSource {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "planned" => Ok(Self::Planned),
      "unplanned" => Ok(Self::Unplanned),
      _ => Err(format!("Unknown planning source: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Completion Source: how the session became completed
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionSource {
  ProviderAuto,
  Manual,
}

impl CompletionSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::ProviderAuto => "provider_auto",
      Self::Manual => "manual",
    }
  }
}

impl std::fmt::Display for CompletionSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for CompletionSource {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "provider_auto" => Ok(Self::ProviderAuto),
      "manual" => Ok(Self::Manual),
      _ => Err(format!("Unknown completion source: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Training Session
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSession {
  pub id: i64,
  /// Owning athlete
  pub user_id: i64,
  pub scheduled_date: NaiveDate,
  pub sport: CanonicalSport,
  pub title: Option<String>,
  pub notes: Option<String>,
  pub duration_minutes: Option<i64>,
  pub status: TrainingSessionStatus,
  pub planning_source: PlanningSource,
  pub completion_source: Option<CompletionSource>,
  pub actual_duration_minutes: Option<i64>,
  pub actual_tss: Option<i64>,
  pub completed_at: Option<DateTime<Utc>>,
  pub auto_completed_at: Option<DateTime<Utc>>,
}

impl TrainingSession {
  pub fn is_completed(&self) -> bool {
    self.status == TrainingSessionStatus::Completed
  }
}

/// For inserting new sessions (without id and completion fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrainingSession {
  pub user_id: i64,
  pub scheduled_date: NaiveDate,
  pub sport: CanonicalSport,
  pub title: Option<String>,
  pub notes: Option<String>,
  pub duration_minutes: Option<i64>,
  pub status: TrainingSessionStatus,
  pub planning_source: PlanningSource,
}
