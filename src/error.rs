//! Error types shared by the reconciliation core.
//!
//! Only persistence problems are errors here. A skipped activity is
//! `Ok(None)` and a refused link is a `LinkOutcome::Conflict`.

/// Fatal failures surfaced to the invoking job.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Invalid value {value:?} stored in column {column}")]
  InvalidValue { column: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
