//! Persistence for users, activities and training sessions.
//!
//! Every function takes a `&mut SqliteConnection` so the same query runs on
//! a pooled connection or inside the reconciler's transaction.

pub mod activities;
pub mod connections;
pub mod sessions;
pub mod users;

use crate::error::{ReconcileError, Result};

/// Parse a text column into one of the closed enums
pub(crate) fn parse_column<T>(column: &'static str, value: String) -> Result<T>
where
  T: std::str::FromStr,
{
  value
    .parse()
    .map_err(|_| ReconcileError::InvalidValue { column, value })
}
