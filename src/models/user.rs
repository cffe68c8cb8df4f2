use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
  Athlete,
  Coach,
  Admin,
}

impl UserRole {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Athlete => "athlete",
      Self::Coach => "coach",
      Self::Admin => "admin",
    }
  }
}

impl std::fmt::Display for UserRole {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for UserRole {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "athlete" => Ok(Self::Athlete),
      "coach" => Ok(Self::Coach),
      "admin" => Ok(Self::Admin),
      _ => Err(format!("Unknown user role: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id: i64,
  pub name: String,
  pub email: String,
  pub role: UserRole,
}

impl User {
  pub fn is_athlete(&self) -> bool {
    self.role == UserRole::Athlete
  }
}

/// ---------------------------------------------------------------------------
/// User Settings (needed for TSS calculations)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSettings {
  pub max_hr: Option<i64>,
  pub lthr: Option<i64>,
  pub ftp: Option<i64>,
}

impl UserSettings {
  /// Get LTHR, falling back to 93% of max_hr if not set
  pub fn effective_lthr(&self) -> Option<i64> {
    self.lthr.or_else(|| self.max_hr.map(|m| (m as f64 * 0.93) as i64))
  }
}
