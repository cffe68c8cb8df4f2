//! User directory lookups

use sqlx::{Row, SqliteConnection};

use super::parse_column;
use crate::error::Result;
use crate::models::{User, UserSettings};

pub async fn find_user(conn: &mut SqliteConnection, user_id: i64) -> Result<Option<User>> {
  let row = sqlx::query("SELECT id, name, email, role FROM users WHERE id = ?1")
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

  match row {
    Some(row) => Ok(Some(User {
      id: row.try_get("id")?,
      name: row.try_get("name")?,
      email: row.try_get("email")?,
      role: parse_column("users.role", row.try_get("role")?)?,
    })),
    None => Ok(None),
  }
}

/// Settings for TSS calculation, defaulting to empty when none are stored
pub async fn load_user_settings(conn: &mut SqliteConnection, user_id: i64) -> Result<UserSettings> {
  let row: Option<(Option<i64>, Option<i64>, Option<i64>)> =
    sqlx::query_as("SELECT max_hr, lthr, ftp FROM user_settings WHERE user_id = ?1")
      .bind(user_id)
      .fetch_optional(&mut *conn)
      .await?;

  Ok(match row {
    Some((max_hr, lthr, ftp)) => UserSettings { max_hr, lthr, ftp },
    None => UserSettings::default(),
  })
}
