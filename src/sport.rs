//! Sport normalization
//!
//! Providers report free-form sport strings ("VirtualRide", "TrailRun",
//! "MountainBiking"). Sessions are planned against a closed vocabulary, so
//! every raw string is folded into a `CanonicalSport` before matching.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalSport {
  Swim,
  Bike,
  Run,
  Gym,
  Other,
  DayOff,
  MtnBike,
  Custom,
  Walk,
}

impl CanonicalSport {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Swim => "swim",
      Self::Bike => "bike",
      Self::Run => "run",
      Self::Gym => "gym",
      Self::Other => "other",
      Self::DayOff => "day_off",
      Self::MtnBike => "mtn_bike",
      Self::Custom => "custom",
      Self::Walk => "walk",
    }
  }
}

impl std::fmt::Display for CanonicalSport {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Strict parse of a stored canonical value. Use `normalize` for provider input.
impl std::str::FromStr for CanonicalSport {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "swim" => Ok(Self::Swim),
      "bike" => Ok(Self::Bike),
      "run" => Ok(Self::Run),
      "gym" => Ok(Self::Gym),
      "other" => Ok(Self::Other),
      "day_off" => Ok(Self::DayOff),
      "mtn_bike" => Ok(Self::MtnBike),
      "custom" => Ok(Self::Custom),
      "walk" => Ok(Self::Walk),
      _ => Err(format!("Unknown sport: {}", s)),
    }
  }
}

/// Fold a raw provider sport string into the canonical vocabulary.
///
/// Never fails: unknown or empty input becomes `Other`.
pub fn normalize(raw: &str) -> CanonicalSport {
  let key = raw.trim().to_lowercase();

  match key.as_str() {
    "swim" => CanonicalSport::Swim,
    "bike" | "ride" | "cycling" | "virtualride" | "ebikeride" | "gravelride" => {
      CanonicalSport::Bike
    }
    "run" | "trailrun" | "virtualrun" => CanonicalSport::Run,
    "mtn_bike" | "mountainbike" | "mountainbiking" | "mountainbikeride"
    | "emountainbikeride" => CanonicalSport::MtnBike,
    "gym" | "strength" | "workout" | "weighttraining" => CanonicalSport::Gym,
    "walk" | "walking" | "hike" => CanonicalSport::Walk,
    "day_off" => CanonicalSport::DayOff,
    "custom" => CanonicalSport::Custom,
    _ => CanonicalSport::Other,
  }
}
