use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A logged period. `end_date` is absent while the period is ongoing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRecord {
  pub id: Uuid,
  pub start_date: NaiveDate,
  pub end_date: Option<NaiveDate>,
  pub notes: String,
  pub symptoms: BTreeSet<Symptom>,
}

impl PeriodRecord {
  pub fn new(
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    notes: impl Into<String>,
    symptoms: BTreeSet<Symptom>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      start_date,
      end_date,
      notes: notes.into(),
      symptoms,
    }
  }

  /// Inclusive duration in days. `None` while ongoing, and also for an
  /// inverted range (end before start) so bad input reads as "ongoing"
  /// instead of a negative length.
  pub fn duration(&self) -> Option<i64> {
    let end = self.end_date?;
    if end < self.start_date {
      return None;
    }
    Some((end - self.start_date).num_days() + 1)
  }
}

/// Symptom tags. A set, not a list: membership matters, order does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symptom {
  Cramps,
  Headache,
  Bloating,
  Fatigue,
  MoodSwings,
  BackPain,
  Acne,
  BreastTenderness,
  Nausea,
  Insomnia,
}

impl Symptom {
  pub const ALL: [Symptom; 10] = [
    Symptom::Cramps,
    Symptom::Headache,
    Symptom::Bloating,
    Symptom::Fatigue,
    Symptom::MoodSwings,
    Symptom::BackPain,
    Symptom::Acne,
    Symptom::BreastTenderness,
    Symptom::Nausea,
    Symptom::Insomnia,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      Symptom::Cramps => "cramps",
      Symptom::Headache => "headache",
      Symptom::Bloating => "bloating",
      Symptom::Fatigue => "fatigue",
      Symptom::MoodSwings => "mood swings",
      Symptom::BackPain => "back pain",
      Symptom::Acne => "acne",
      Symptom::BreastTenderness => "breast tenderness",
      Symptom::Nausea => "nausea",
      Symptom::Insomnia => "insomnia",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn test_duration_is_inclusive() {
    let record = PeriodRecord::new(
      date(2025, 3, 1),
      Some(date(2025, 3, 5)),
      "",
      BTreeSet::new(),
    );
    assert_eq!(record.duration(), Some(5));
  }

  #[test]
  fn test_duration_single_day() {
    let record = PeriodRecord::new(
      date(2025, 3, 1),
      Some(date(2025, 3, 1)),
      "",
      BTreeSet::new(),
    );
    assert_eq!(record.duration(), Some(1));
  }

  #[test]
  fn test_duration_ongoing() {
    let record = PeriodRecord::new(date(2025, 3, 1), None, "", BTreeSet::new());
    assert_eq!(record.duration(), None);
  }

  #[test]
  fn test_duration_inverted_range_reads_as_ongoing() {
    let record = PeriodRecord::new(
      date(2025, 3, 10),
      Some(date(2025, 3, 1)),
      "",
      BTreeSet::new(),
    );
    assert_eq!(record.duration(), None);
  }

  #[test]
  fn test_symptoms_are_a_set() {
    let mut symptoms = BTreeSet::new();
    symptoms.insert(Symptom::Cramps);
    symptoms.insert(Symptom::Cramps);
    symptoms.insert(Symptom::Headache);
    assert_eq!(symptoms.len(), 2);
  }

  #[test]
  fn test_symptom_serializes_snake_case() {
    let json = serde_json::to_string(&Symptom::MoodSwings).unwrap();
    assert_eq!(json, "\"mood_swings\"");
  }
}
