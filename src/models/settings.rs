use serde::{Deserialize, Serialize};

/// Allowed ranges for the user-adjustable settings. Values outside these
/// ranges are clamped on load rather than rejected.
pub const CYCLE_LENGTH_RANGE: std::ops::RangeInclusive<i64> = 20..=45;
pub const PERIOD_LENGTH_RANGE: std::ops::RangeInclusive<i64> = 2..=10;
pub const REMINDER_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=7;

/// User settings. The two length fields are fallbacks, used only when there
/// is not enough logged history to compute real averages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
  pub average_cycle_length: i64,
  pub average_period_length: i64,
  pub reminder_enabled: bool,
  pub reminder_days_before: i64,
  pub appearance: AppearanceMode,
  pub language: Language,
  pub assistant_api_key: String,
}

impl Default for UserSettings {
  fn default() -> Self {
    Self {
      average_cycle_length: 28,
      average_period_length: 5,
      reminder_enabled: false,
      reminder_days_before: 2,
      appearance: AppearanceMode::System,
      language: Language::En,
      assistant_api_key: String::new(),
    }
  }
}

impl UserSettings {
  /// Clamp the adjustable fields into their allowed ranges.
  pub fn normalize(mut self) -> Self {
    self.average_cycle_length = self
      .average_cycle_length
      .clamp(*CYCLE_LENGTH_RANGE.start(), *CYCLE_LENGTH_RANGE.end());
    self.average_period_length = self
      .average_period_length
      .clamp(*PERIOD_LENGTH_RANGE.start(), *PERIOD_LENGTH_RANGE.end());
    self.reminder_days_before = self
      .reminder_days_before
      .clamp(*REMINDER_DAYS_RANGE.start(), *REMINDER_DAYS_RANGE.end());
    self
  }
}

/// Display preference. Stored and mirrored, not interpreted by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppearanceMode {
  #[default]
  System,
  Light,
  Dark,
}

impl std::fmt::Display for AppearanceMode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      AppearanceMode::System => write!(f, "system"),
      AppearanceMode::Light => write!(f, "light"),
      AppearanceMode::Dark => write!(f, "dark"),
    }
  }
}

impl std::str::FromStr for AppearanceMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "system" => Ok(AppearanceMode::System),
      "light" => Ok(AppearanceMode::Light),
      "dark" => Ok(AppearanceMode::Dark),
      _ => Err(format!("Unknown appearance mode: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
  #[default]
  En,
  Tr,
}

impl std::fmt::Display for Language {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Language::En => write!(f, "en"),
      Language::Tr => write!(f, "tr"),
    }
  }
}

impl std::str::FromStr for Language {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "en" => Ok(Language::En),
      "tr" => Ok(Language::Tr),
      _ => Err(format!("Unknown language: {}", s)),
    }
  }
}
