//! Provider OAuth state per athlete

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::error::Result;
use crate::strava::StravaTokens;

/// Stored tokens for a user and provider; None when not connected
pub async fn load_tokens(
  conn: &mut SqliteConnection,
  user_id: i64,
  provider: &str,
) -> Result<Option<StravaTokens>> {
  let row: Option<(Option<String>, Option<String>, Option<DateTime<Utc>>)> = sqlx::query_as(
    r#"
    SELECT access_token, refresh_token, token_expires_at
    FROM provider_connections
    WHERE user_id = ?1 AND provider = ?2
    "#,
  )
  .bind(user_id)
  .bind(provider)
  .fetch_optional(&mut *conn)
  .await?;

  match row {
    Some((Some(access), Some(refresh), Some(expires))) => Ok(Some(StravaTokens {
      access_token: access,
      refresh_token: refresh,
      expires_at: expires,
    })),
    _ => Ok(None),
  }
}

pub async fn save_tokens(
  conn: &mut SqliteConnection,
  user_id: i64,
  provider: &str,
  tokens: &StravaTokens,
) -> Result<()> {
  sqlx::query(
    r#"
    INSERT INTO provider_connections (user_id, provider, access_token, refresh_token, token_expires_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(user_id, provider) DO UPDATE SET
      access_token = excluded.access_token,
      refresh_token = excluded.refresh_token,
      token_expires_at = excluded.token_expires_at
    "#,
  )
  .bind(user_id)
  .bind(provider)
  .bind(&tokens.access_token)
  .bind(&tokens.refresh_token)
  .bind(tokens.expires_at)
  .execute(&mut *conn)
  .await?;

  Ok(())
}

pub async fn touch_last_sync(conn: &mut SqliteConnection, user_id: i64, provider: &str) -> Result<()> {
  sqlx::query(
    "UPDATE provider_connections SET last_sync_at = ?1 WHERE user_id = ?2 AND provider = ?3",
  )
  .bind(Utc::now())
  .bind(user_id)
  .bind(provider)
  .execute(&mut *conn)
  .await?;

  Ok(())
}

pub async fn last_sync_at(
  conn: &mut SqliteConnection,
  user_id: i64,
  provider: &str,
) -> Result<Option<DateTime<Utc>>> {
  let last: Option<Option<DateTime<Utc>>> = sqlx::query_scalar(
    "SELECT last_sync_at FROM provider_connections WHERE user_id = ?1 AND provider = ?2",
  )
  .bind(user_id)
  .bind(provider)
  .fetch_optional(&mut *conn)
  .await?;

  Ok(last.flatten())
}
