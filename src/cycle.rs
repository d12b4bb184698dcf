//! Cycle statistics and prediction
//!
//! Pure calculations over the logged period history plus user settings.
//! Every function is total: missing history produces `None` or an empty
//! result, never an error. "Today" is always an explicit parameter so the
//! whole layer stays deterministic and testable.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{PeriodRecord, UserSettings};
use crate::phase::CyclePhase;

/// Cycle-length gaps outside this range (exclusive on both ends) are treated
/// as data-entry errors or missed cycles and excluded from the average.
const MIN_PLAUSIBLE_GAP_DAYS: i64 = 15;
const MAX_PLAUSIBLE_GAP_DAYS: i64 = 50;

/// Ovulation is modeled as a fixed 14 days before the next predicted period.
const LUTEAL_PHASE_DAYS: i64 = 14;

/// One predicted future period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictedPeriod {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

/// The fertile window around predicted ovulation: five days before through
/// one day after, reflecting sperm viability ahead of the egg's release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FertileWindow {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

/// Derived cycle state, computed fresh from the record collection on every
/// call. Borrows the records; never mutates them.
#[derive(Debug, Clone, Copy)]
pub struct CycleCalculator<'a> {
  periods: &'a [PeriodRecord],
  settings: &'a UserSettings,
}

impl<'a> CycleCalculator<'a> {
  pub fn new(periods: &'a [PeriodRecord], settings: &'a UserSettings) -> Self {
    Self { periods, settings }
  }

  /// The most recent record by start date.
  pub fn last_period(&self) -> Option<&'a PeriodRecord> {
    self.periods.iter().max_by_key(|p| p.start_date)
  }

  /// Average cycle length from history. Falls back to the setting when there
  /// are fewer than two records or no plausible gap between starts.
  pub fn average_cycle_length(&self) -> i64 {
    let mut starts: Vec<NaiveDate> = self.periods.iter().map(|p| p.start_date).collect();
    starts.sort();

    let mut total = 0;
    let mut count = 0;
    for pair in starts.windows(2) {
      let gap = (pair[1] - pair[0]).num_days();
      if gap > MIN_PLAUSIBLE_GAP_DAYS && gap < MAX_PLAUSIBLE_GAP_DAYS {
        total += gap;
        count += 1;
      }
    }

    if count > 0 {
      total / count
    } else {
      self.settings.average_cycle_length
    }
  }

  /// Average period length from records that have ended. Falls back to the
  /// setting when no record has a usable duration.
  pub fn average_period_length(&self) -> i64 {
    let durations: Vec<i64> = self.periods.iter().filter_map(|p| p.duration()).collect();
    if durations.is_empty() {
      return self.settings.average_period_length;
    }
    durations.iter().sum::<i64>() / durations.len() as i64
  }

  /// End date of the latest period: the recorded one if present, otherwise
  /// an estimate from the average period length. Callers must present the
  /// estimate as such (e.g. with a "~" prefix).
  pub fn estimated_end_date(&self) -> Option<NaiveDate> {
    let last = self.last_period()?;
    if let Some(end) = last.end_date {
      return Some(end);
    }
    Some(last.start_date + Duration::days(self.average_period_length() - 1))
  }

  pub fn next_period_date(&self) -> Option<NaiveDate> {
    let last = self.last_period()?;
    Some(last.start_date + Duration::days(self.average_cycle_length()))
  }

  pub fn next_ovulation_date(&self) -> Option<NaiveDate> {
    let last = self.last_period()?;
    let ovulation_day = self.average_cycle_length() - LUTEAL_PHASE_DAYS;
    Some(last.start_date + Duration::days(ovulation_day))
  }

  pub fn fertile_window(&self) -> Option<FertileWindow> {
    let ovulation = self.next_ovulation_date()?;
    Some(FertileWindow {
      start: ovulation - Duration::days(5),
      end: ovulation + Duration::days(1),
    })
  }

  /// 1-based day of the current cycle (the start date itself is day 1).
  pub fn current_day_of_cycle(&self, today: NaiveDate) -> Option<i64> {
    let last = self.last_period()?;
    Some((today - last.start_date).num_days() + 1)
  }

  /// Days until the predicted next period. Negative once the prediction has
  /// passed without a new record: the prediction is stale, not wrong.
  pub fn days_until_next_period(&self, today: NaiveDate) -> Option<i64> {
    let next = self.next_period_date()?;
    Some((next - today).num_days())
  }

  /// Predicted periods for the next `count` cycles, as cumulative multiples
  /// of the average cycle length from the latest start.
  pub fn predicted_period_dates(&self, count: u32) -> Vec<PredictedPeriod> {
    let Some(last) = self.last_period() else {
      return Vec::new();
    };

    let cycle_length = self.average_cycle_length();
    let period_length = self.average_period_length();

    (1..=count as i64)
      .map(|i| {
        let start = last.start_date + Duration::days(cycle_length * i);
        PredictedPeriod {
          start,
          end: start + Duration::days(period_length - 1),
        }
      })
      .collect()
  }

  /// Phase for an arbitrary date, past or future, based on the latest record
  /// starting on or before it. `None` when no record precedes the date.
  pub fn phase_for_date(&self, date: NaiveDate) -> Option<CyclePhase> {
    let relevant = self
      .periods
      .iter()
      .filter(|p| p.start_date <= date)
      .max_by_key(|p| p.start_date)?;

    let day_of_cycle = (date - relevant.start_date).num_days() + 1;
    let period_length = relevant
      .duration()
      .unwrap_or(self.settings.average_period_length);
    let cycle_length = self.average_cycle_length();

    Some(CyclePhase::for_day(day_of_cycle, period_length, cycle_length))
  }
}
