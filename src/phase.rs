//! Cycle phase classification
//!
//! A pure mapping from (day of cycle, period length, cycle length) to one of
//! the four phases. No state is kept between calls; the same function serves
//! "today" and any historical or future date.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
  Menstruation,
  Follicular,
  Ovulation,
  Luteal,
}

impl CyclePhase {
  /// Classify a day of the cycle (1-based). Ovulation is modeled as 14 days
  /// before the next predicted period; the window around it is inclusive on
  /// the upper end. Days past the cycle length stay luteal: the next period
  /// is overdue, and nothing rolls over until the user logs it.
  pub fn for_day(day_of_cycle: i64, period_length: i64, cycle_length: i64) -> Self {
    let ovulation_day = cycle_length - 14;

    if day_of_cycle <= period_length {
      CyclePhase::Menstruation
    } else if day_of_cycle <= ovulation_day - 5 {
      CyclePhase::Follicular
    } else if day_of_cycle <= ovulation_day + 1 {
      CyclePhase::Ovulation
    } else {
      CyclePhase::Luteal
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      CyclePhase::Menstruation => "menstruation",
      CyclePhase::Follicular => "follicular",
      CyclePhase::Ovulation => "ovulation",
      CyclePhase::Luteal => "luteal",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      CyclePhase::Menstruation => "Menstruation",
      CyclePhase::Follicular => "Follicular phase",
      CyclePhase::Ovulation => "Ovulation",
      CyclePhase::Luteal => "Luteal phase",
    }
  }
}

impl std::fmt::Display for CyclePhase {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
