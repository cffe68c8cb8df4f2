//! Configuration loaded from environment variables (and `.env` when present).

use std::env;

const DEFAULT_DATABASE_URL: &str = "sqlite://session-sync.db?mode=rwc";
const DEFAULT_STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
const DEFAULT_STRAVA_TOKEN_URL: &str = "https://www.strava.com/oauth/token";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Missing configuration: {0}")]
  Missing(&'static str),

  #[error("Invalid value for {name}: {value}")]
  Invalid { name: &'static str, value: String },
}

/// Strava application credentials and endpoints
#[derive(Debug, Clone)]
pub struct StravaConfig {
  pub client_id: Option<String>,
  pub client_secret: Option<String>,
  pub api_base: String,
  pub token_url: String,
}

impl Default for StravaConfig {
  fn default() -> Self {
    Self {
      client_id: None,
      client_secret: None,
      api_base: DEFAULT_STRAVA_API_BASE.to_string(),
      token_url: DEFAULT_STRAVA_TOKEN_URL.to_string(),
    }
  }
}

impl StravaConfig {
  /// Client credentials, required only when tokens need refreshing
  pub fn credentials(&self) -> Result<(&str, &str), ConfigError> {
    let id = self
      .client_id
      .as_deref()
      .ok_or(ConfigError::Missing("STRAVA_CLIENT_ID"))?;
    let secret = self
      .client_secret
      .as_deref()
      .ok_or(ConfigError::Missing("STRAVA_CLIENT_SECRET"))?;
    Ok((id, secret))
  }
}

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub database_max_connections: u32,
  pub strava: StravaConfig,
  /// Activities requested per provider page
  pub sync_page_size: u32,
  /// Attempts per provider HTTP call before the sync fails
  pub sync_max_retries: u32,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: DEFAULT_DATABASE_URL.to_string(),
      database_max_connections: 5,
      strava: StravaConfig::default(),
      sync_page_size: 50,
      sync_max_retries: 3,
    }
  }
}

impl Config {
  /// Load configuration, reading `.env` first if present.
  pub fn from_env() -> Result<Self, ConfigError> {
    dotenvy::dotenv().ok();

    let defaults = Self::default();

    Ok(Self {
      database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
      database_max_connections: parse_var(
        "DATABASE_MAX_CONNECTIONS",
        defaults.database_max_connections,
      )?,
      strava: StravaConfig {
        client_id: non_empty_var("STRAVA_CLIENT_ID"),
        client_secret: non_empty_var("STRAVA_CLIENT_SECRET"),
        api_base: env::var("STRAVA_API_BASE").unwrap_or(defaults.strava.api_base),
        token_url: env::var("STRAVA_TOKEN_URL").unwrap_or(defaults.strava.token_url),
      },
      sync_page_size: parse_var("SYNC_PAGE_SIZE", defaults.sync_page_size)?,
      sync_max_retries: parse_var("SYNC_MAX_RETRIES", defaults.sync_max_retries)?,
    })
  }
}

fn non_empty_var(name: &str) -> Option<String> {
  env::var(name)
    .ok()
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
  match env::var(name) {
    Ok(value) => value
      .trim()
      .parse()
      .map_err(|_| ConfigError::Invalid { name, value }),
    Err(_) => Ok(default),
  }
}
