//! Activity/session linking
//!
//! An activity links to at most one session and a session carries at most
//! one activity. Precondition failures are returned as
//! `LinkOutcome::Conflict` rather than errors so callers decide whether a
//! refused link matters.

use sqlx::SqliteConnection;

use crate::error::Result;
use crate::models::{Activity, TrainingSession, User};
use crate::repo::activities;

/// Why a link was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkConflict {
  /// The activity belongs to someone other than the athlete
  ActivityNotOwned,
  /// The session belongs to someone other than the athlete
  SessionNotOwned,
  /// The activity already completes another session
  ActivityLinkedElsewhere { session_id: i64 },
  /// The session already carries another activity
  SessionHasOtherActivity { activity_id: i64 },
}

impl std::fmt::Display for LinkConflict {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::ActivityNotOwned => write!(f, "activity does not belong to athlete"),
      Self::SessionNotOwned => write!(f, "session does not belong to athlete"),
      Self::ActivityLinkedElsewhere { session_id } => {
        write!(f, "activity already linked to session {}", session_id)
      }
      Self::SessionHasOtherActivity { activity_id } => {
        write!(f, "session already linked to activity {}", activity_id)
      }
    }
  }
}

#[derive(Debug, Clone)]
pub enum LinkOutcome {
  /// The link was written
  Linked(Activity),
  /// The activity was already linked to this session; nothing written
  AlreadyLinked(Activity),
  Conflict(LinkConflict),
}

impl LinkOutcome {
  /// True when the activity ends up linked to the session
  pub fn is_linked(&self) -> bool {
    matches!(self, Self::Linked(_) | Self::AlreadyLinked(_))
  }
}

/// Link `activity` to `session` on behalf of `athlete`.
pub async fn link(
  conn: &mut SqliteConnection,
  athlete: &User,
  session: &TrainingSession,
  activity: &Activity,
) -> Result<LinkOutcome> {
  if activity.user_id != Some(athlete.id) {
    return Ok(LinkOutcome::Conflict(LinkConflict::ActivityNotOwned));
  }
  if session.user_id != athlete.id {
    return Ok(LinkOutcome::Conflict(LinkConflict::SessionNotOwned));
  }

  match activity.training_session_id {
    Some(session_id) if session_id == session.id => {
      return Ok(LinkOutcome::AlreadyLinked(activity.clone()));
    }
    Some(session_id) => {
      return Ok(LinkOutcome::Conflict(LinkConflict::ActivityLinkedElsewhere {
        session_id,
      }));
    }
    None => {}
  }

  if let Some(existing) = activities::find_linked_activity(conn, session.id).await? {
    if existing.id != activity.id {
      return Ok(LinkOutcome::Conflict(LinkConflict::SessionHasOtherActivity {
        activity_id: existing.id,
      }));
    }
  }

  activities::set_training_session(conn, activity.id, session.id).await?;

  tracing::info!(
    activity_id = activity.id,
    session_id = session.id,
    athlete_id = athlete.id,
    "Linked activity to session"
  );

  let mut linked = activity.clone();
  linked.training_session_id = Some(session.id);
  Ok(LinkOutcome::Linked(linked))
}
