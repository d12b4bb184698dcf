//! Reminder anchor dates
//!
//! Derives the up-to-three dates the host's notification scheduler cares
//! about. The consumer replaces its whole scheduled set on every change, so
//! there is no diffing here, only fresh anchors.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::UserSettings;

/// Anchor dates for the external scheduler. Any anchor that would land today
/// or earlier is dropped rather than scheduled in the past.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderAnchors {
  /// `reminder_days_before` days ahead of the predicted start.
  pub approaching: Option<NaiveDate>,
  /// The predicted start itself.
  pub start: Option<NaiveDate>,
  /// The recorded or estimated end of the current period.
  pub end: Option<NaiveDate>,
}

impl ReminderAnchors {
  pub fn compute(
    next_period: Option<NaiveDate>,
    estimated_end: Option<NaiveDate>,
    settings: &UserSettings,
    today: NaiveDate,
  ) -> Self {
    if !settings.reminder_enabled {
      return Self::default();
    }
    let Some(next_period) = next_period else {
      return Self::default();
    };

    let future = |d: NaiveDate| if d > today { Some(d) } else { None };

    let approaching = if settings.reminder_days_before > 0 {
      future(next_period - Duration::days(settings.reminder_days_before))
    } else {
      None
    };

    Self {
      approaching,
      start: future(next_period),
      end: estimated_end.and_then(future),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.approaching.is_none() && self.start.is_none() && self.end.is_none()
  }
}

/// The scheduling side the host provides. `schedule` replaces everything
/// previously scheduled with the given set.
pub trait ReminderScheduler: Send + Sync {
  fn schedule(&self, anchors: &ReminderAnchors);
  fn cancel_all(&self);
}
