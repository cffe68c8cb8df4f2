use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ConfigError, StravaConfig};
use crate::error::ReconcileError;
use crate::models::NewActivity;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

pub const PROVIDER: &str = "strava";
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;
const LOG_BODY_MAX_CHARS: usize = 500;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StravaError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Invalid URL: {0}")]
  Url(#[from] url::ParseError),

  #[error("OAuth error: {0}")]
  OAuth(String),

  #[error("Strava API returned {status}: {message}")]
  Api { status: u16, message: String },

  #[error("Not authenticated with Strava")]
  NotAuthenticated,

  #[error(transparent)]
  Reconcile(#[from] ReconcileError),
}

impl From<sqlx::Error> for StravaError {
  fn from(err: sqlx::Error) -> Self {
    Self::Reconcile(ReconcileError::Database(err))
  }
}

impl StravaError {
  /// Worth retrying: network failures, rate limiting and server errors
  pub fn is_transient(&self) -> bool {
    match self {
      Self::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
      Self::Api { status, .. } => *status == 429 || *status >= 500,
      _ => false,
    }
  }
}

/// ---------------------------------------------------------------------------
/// OAuth Tokens
/// ---------------------------------------------------------------------------

/// Response from Strava token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: i64,
}

/// Stored token state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StravaTokens {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: DateTime<Utc>,
}

impl StravaTokens {
  pub fn from_response(resp: TokenResponse) -> Self {
    Self {
      access_token: resp.access_token,
      refresh_token: resp.refresh_token,
      expires_at: DateTime::from_timestamp(resp.expires_at, 0).unwrap_or_else(Utc::now),
    }
  }

  pub fn needs_refresh(&self) -> bool {
    let buffer = Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES);
    Utc::now() + buffer >= self.expires_at
  }
}

/// Exchange a refresh token for a fresh token pair
pub async fn refresh_tokens(
  client: &Client,
  config: &StravaConfig,
  refresh_token: &str,
) -> Result<StravaTokens, StravaError> {
  let (client_id, client_secret) = config.credentials()?;

  let response = client
    .post(&config.token_url)
    .form(&[
      ("client_id", client_id),
      ("client_secret", client_secret),
      ("refresh_token", refresh_token),
      ("grant_type", "refresh_token"),
    ])
    .send()
    .await?;

  let status = response.status();
  if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
    return Err(StravaError::Api {
      status: status.as_u16(),
      message: response.text().await.unwrap_or_default(),
    });
  }
  if !status.is_success() {
    let error_text = response.text().await.unwrap_or_default();
    return Err(StravaError::OAuth(format!(
      "Token refresh failed: {}",
      error_text
    )));
  }

  let token_response: TokenResponse = response.json().await?;
  Ok(StravaTokens::from_response(token_response))
}

/// ---------------------------------------------------------------------------
/// Strava API - Activity Fetching
/// ---------------------------------------------------------------------------

/// Activity summary from Strava API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StravaActivity {
  pub id: i64,
  #[serde(default)]
  pub name: String,
  /// Strava uses "type" for legacy and "sport_type" for newer activities
  #[serde(rename = "type", default)]
  pub activity_type: String,
  #[serde(default)]
  pub sport_type: Option<String>,
  pub start_date: DateTime<Utc>,
  /// Seconds east of UTC at the activity's start
  #[serde(default)]
  pub utc_offset: Option<f64>,
  #[serde(default)]
  pub elapsed_time: i64,
  #[serde(default)]
  pub moving_time: i64,
  #[serde(default)]
  pub distance: Option<f64>,
  #[serde(default)]
  pub total_elevation_gain: Option<f64>,
  #[serde(default)]
  pub average_heartrate: Option<f64>,
  #[serde(default)]
  pub average_watts: Option<f64>,
  /// Provider JSON exactly as received, including fields not modelled here
  #[serde(skip)]
  pub raw: Option<serde_json::Value>,
}

impl StravaActivity {
  /// Sport string to normalize: the newer sport_type when present
  pub fn sport(&self) -> &str {
    match self.sport_type.as_deref() {
      Some(sport) if !sport.trim().is_empty() => sport,
      _ => &self.activity_type,
    }
  }

  /// Moving time, falling back to elapsed time; None when neither is positive
  pub fn duration_seconds(&self) -> Option<i64> {
    [self.moving_time, self.elapsed_time]
      .into_iter()
      .find(|secs| *secs > 0)
  }

  pub fn into_new_activity(self, user_id: i64) -> NewActivity {
    let raw_payload = match &self.raw {
      Some(raw) => Some(raw.to_string()),
      None => serde_json::to_string(&self).ok(),
    };

    NewActivity {
      user_id: Some(user_id),
      provider: PROVIDER.to_string(),
      external_id: self.id.to_string(),
      sport: self.sport().to_string(),
      duration_seconds: self.duration_seconds(),
      started_at: Some(self.start_date),
      utc_offset_seconds: self.utc_offset.map(|offset| offset.round() as i64),
      distance_meters: self.distance,
      elevation_gain_meters: self.total_elevation_gain,
      average_heartrate: self.average_heartrate.map(|hr| hr.round() as i64),
      average_watts: self.average_watts,
      name: Some(self.name),
      raw_payload,
    }
  }
}

/// Fetch one page (1-based) of activities from Strava
pub async fn fetch_activities(
  client: &Client,
  config: &StravaConfig,
  access_token: &str,
  after: Option<i64>,
  page: u32,
  per_page: u32,
) -> Result<Vec<StravaActivity>, StravaError> {
  let mut url = Url::parse(&format!(
    "{}/athlete/activities",
    config.api_base.trim_end_matches('/')
  ))?;
  url
    .query_pairs_mut()
    .append_pair("page", &page.to_string())
    .append_pair("per_page", &per_page.to_string());
  if let Some(after_timestamp) = after {
    url
      .query_pairs_mut()
      .append_pair("after", &after_timestamp.to_string());
  }

  let response = client
    .get(url)
    .bearer_auth(access_token)
    .send()
    .await?;

  let status = response.status();
  if status == StatusCode::UNAUTHORIZED {
    return Err(StravaError::NotAuthenticated);
  }
  if !status.is_success() {
    return Err(StravaError::Api {
      status: status.as_u16(),
      message: response.text().await.unwrap_or_default(),
    });
  }

  let response_text = response.text().await?;

  let parse_error = |e: serde_json::Error| {
    tracing::warn!(
      error = %e,
      body = log_excerpt(&response_text),
      "Failed to parse Strava activities"
    );
    StravaError::Api {
      status: status.as_u16(),
      message: format!("Failed to parse activities: {}", e),
    }
  };

  let payloads: Vec<serde_json::Value> = serde_json::from_str(&response_text).map_err(parse_error)?;

  payloads
    .into_iter()
    .map(|payload| {
      let mut activity: StravaActivity =
        serde_json::from_value(payload.clone()).map_err(parse_error)?;
      activity.raw = Some(payload);
      Ok(activity)
    })
    .collect()
}

/// Leading slice of a response body for logs, cut on a char boundary
fn log_excerpt(text: &str) -> &str {
  match text.char_indices().nth(LOG_BODY_MAX_CHARS) {
    Some((end, _)) => &text[..end],
    None => text,
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
