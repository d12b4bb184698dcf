use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Symptom;

/// A daily mood/journal entry. The app treats one entry per calendar day as
/// a soft convention; the model does not enforce uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
  pub id: Uuid,
  pub date: NaiveDate,
  pub mood: Mood,
  pub note: String,
  pub symptoms: BTreeSet<Symptom>,
}

impl JournalEntry {
  pub fn new(
    date: NaiveDate,
    mood: Mood,
    note: impl Into<String>,
    symptoms: BTreeSet<Symptom>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      date,
      mood,
      note: note.into(),
      symptoms,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
  VeryHappy,
  Happy,
  #[default]
  Neutral,
  Sad,
  VerySad,
  Anxious,
  Angry,
  Tired,
}

impl Mood {
  pub fn label(&self) -> &'static str {
    match self {
      Mood::VeryHappy => "great",
      Mood::Happy => "happy",
      Mood::Neutral => "okay",
      Mood::Sad => "down",
      Mood::VerySad => "very down",
      Mood::Anxious => "anxious",
      Mood::Angry => "irritable",
      Mood::Tired => "tired",
    }
  }
}

impl std::fmt::Display for Mood {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Mood::VeryHappy => write!(f, "very_happy"),
      Mood::Happy => write!(f, "happy"),
      Mood::Neutral => write!(f, "neutral"),
      Mood::Sad => write!(f, "sad"),
      Mood::VerySad => write!(f, "very_sad"),
      Mood::Anxious => write!(f, "anxious"),
      Mood::Angry => write!(f, "angry"),
      Mood::Tired => write!(f, "tired"),
    }
  }
}

impl std::str::FromStr for Mood {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "very_happy" => Ok(Mood::VeryHappy),
      "happy" => Ok(Mood::Happy),
      "neutral" => Ok(Mood::Neutral),
      "sad" => Ok(Mood::Sad),
      "very_sad" => Ok(Mood::VerySad),
      "anxious" => Ok(Mood::Anxious),
      "angry" => Ok(Mood::Angry),
      "tired" => Ok(Mood::Tired),
      _ => Err(format!("Unknown mood: {}", s)),
    }
  }
}
