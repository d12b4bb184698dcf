//! Test fixtures and fakes
//!
//! In-memory implementations of the storage/scheduler seams plus small data
//! factories, shared by the unit tests across modules.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{ChatMessage, JournalEntry, Mood, PeriodRecord, UserSettings};
use crate::reminders::{ReminderAnchors, ReminderScheduler};
use crate::remote::{RemoteError, RemoteStore};
use crate::storage::{LocalStore, StorageError};

/// ---------------------------------------------------------------------------
/// Data Factories
/// ---------------------------------------------------------------------------

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// An ongoing period starting on the given day.
pub fn period_starting(start: NaiveDate) -> PeriodRecord {
  PeriodRecord::new(start, None, "", BTreeSet::new())
}

pub fn ended_period(start: NaiveDate, end: NaiveDate) -> PeriodRecord {
  PeriodRecord::new(start, Some(end), "", BTreeSet::new())
}

pub fn journal_entry_on(day: NaiveDate) -> JournalEntry {
  JournalEntry::new(day, Mood::Neutral, "", BTreeSet::new())
}

/// ---------------------------------------------------------------------------
/// Local Store Fake
/// ---------------------------------------------------------------------------

/// In-memory `LocalStore` with the same overwrite/sort semantics as the
/// SQLite implementation.
#[derive(Default)]
pub struct MemoryStore {
  periods: Mutex<Vec<PeriodRecord>>,
  journal: Mutex<Vec<JournalEntry>>,
  chat: Mutex<Vec<ChatMessage>>,
  settings: Mutex<Option<UserSettings>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl LocalStore for MemoryStore {
  async fn load_periods(&self) -> Result<Vec<PeriodRecord>, StorageError> {
    let mut periods = self.periods.lock().unwrap().clone();
    periods.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    Ok(periods)
  }

  async fn save_periods(&self, periods: &[PeriodRecord]) -> Result<(), StorageError> {
    *self.periods.lock().unwrap() = periods.to_vec();
    Ok(())
  }

  async fn load_journal_entries(&self) -> Result<Vec<JournalEntry>, StorageError> {
    let mut entries = self.journal.lock().unwrap().clone();
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(entries)
  }

  async fn save_journal_entries(&self, entries: &[JournalEntry]) -> Result<(), StorageError> {
    *self.journal.lock().unwrap() = entries.to_vec();
    Ok(())
  }

  async fn load_chat_messages(&self) -> Result<Vec<ChatMessage>, StorageError> {
    Ok(self.chat.lock().unwrap().clone())
  }

  async fn save_chat_messages(&self, messages: &[ChatMessage]) -> Result<(), StorageError> {
    *self.chat.lock().unwrap() = messages.to_vec();
    Ok(())
  }

  async fn load_settings(&self) -> Result<UserSettings, StorageError> {
    Ok(self.settings.lock().unwrap().clone().unwrap_or_default())
  }

  async fn save_settings(&self, settings: &UserSettings) -> Result<(), StorageError> {
    *self.settings.lock().unwrap() = Some(settings.clone());
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Remote Store Fake
/// ---------------------------------------------------------------------------

#[derive(Default)]
struct RemoteState {
  settings: HashMap<String, UserSettings>,
  periods: HashMap<String, Vec<PeriodRecord>>,
  journal: HashMap<String, Vec<JournalEntry>>,
  chat: HashMap<String, Vec<ChatMessage>>,
}

/// In-memory `RemoteStore` that records every mutation it receives (for
/// ordering assertions) and can be switched into a failing mode.
#[derive(Default)]
pub struct MemoryRemote {
  state: Mutex<RemoteState>,
  failing: AtomicBool,
  ops: Mutex<Vec<String>>,
}

impl MemoryRemote {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make every subsequent call fail without touching stored state.
  pub fn set_failing(&self, failing: bool) {
    self.failing.store(failing, Ordering::SeqCst);
  }

  /// Names of the mutations applied, in arrival order.
  pub fn ops(&self) -> Vec<String> {
    self.ops.lock().unwrap().clone()
  }

  pub fn seed_settings(&self, user_id: &str, settings: UserSettings) {
    self
      .state
      .lock()
      .unwrap()
      .settings
      .insert(user_id.to_string(), settings);
  }

  pub fn seed_periods(&self, user_id: &str, periods: Vec<PeriodRecord>) {
    self
      .state
      .lock()
      .unwrap()
      .periods
      .insert(user_id.to_string(), periods);
  }

  pub fn periods_for(&self, user_id: &str) -> Vec<PeriodRecord> {
    self
      .state
      .lock()
      .unwrap()
      .periods
      .get(user_id)
      .cloned()
      .unwrap_or_default()
  }

  pub fn journal_for(&self, user_id: &str) -> Vec<JournalEntry> {
    self
      .state
      .lock()
      .unwrap()
      .journal
      .get(user_id)
      .cloned()
      .unwrap_or_default()
  }

  pub fn chat_for(&self, user_id: &str) -> Vec<ChatMessage> {
    self
      .state
      .lock()
      .unwrap()
      .chat
      .get(user_id)
      .cloned()
      .unwrap_or_default()
  }

  pub fn settings_for(&self, user_id: &str) -> Option<UserSettings> {
    self.state.lock().unwrap().settings.get(user_id).cloned()
  }

  fn check(&self, op: &str) -> Result<(), RemoteError> {
    if self.failing.load(Ordering::SeqCst) {
      return Err(RemoteError::Api(format!("simulated failure in {}", op)));
    }
    Ok(())
  }

  fn record(&self, op: &str) {
    self.ops.lock().unwrap().push(op.to_string());
  }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
  async fn upsert_period(&self, user_id: &str, period: &PeriodRecord) -> Result<(), RemoteError> {
    self.check("upsert_period")?;
    self.record("upsert_period");
    let mut state = self.state.lock().unwrap();
    let periods = state.periods.entry(user_id.to_string()).or_default();
    match periods.iter_mut().find(|p| p.id == period.id) {
      Some(existing) => *existing = period.clone(),
      None => periods.push(period.clone()),
    }
    Ok(())
  }

  async fn upsert_all_periods(
    &self,
    user_id: &str,
    periods: &[PeriodRecord],
  ) -> Result<(), RemoteError> {
    self.check("upsert_all_periods")?;
    self.record("upsert_all_periods");
    let mut state = self.state.lock().unwrap();
    let stored = state.periods.entry(user_id.to_string()).or_default();
    for period in periods {
      match stored.iter_mut().find(|p| p.id == period.id) {
        Some(existing) => *existing = period.clone(),
        None => stored.push(period.clone()),
      }
    }
    Ok(())
  }

  async fn load_periods(&self, user_id: &str) -> Result<Vec<PeriodRecord>, RemoteError> {
    self.check("load_periods")?;
    let mut periods = self
      .state
      .lock()
      .unwrap()
      .periods
      .get(user_id)
      .cloned()
      .unwrap_or_default();
    periods.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    Ok(periods)
  }

  async fn delete_period(&self, user_id: &str, id: Uuid) -> Result<(), RemoteError> {
    self.check("delete_period")?;
    self.record("delete_period");
    if let Some(periods) = self.state.lock().unwrap().periods.get_mut(user_id) {
      periods.retain(|p| p.id != id);
    }
    Ok(())
  }

  async fn delete_all_periods(&self, user_id: &str) -> Result<(), RemoteError> {
    self.check("delete_all_periods")?;
    self.record("delete_all_periods");
    self.state.lock().unwrap().periods.remove(user_id);
    Ok(())
  }

  async fn upsert_journal_entry(
    &self,
    user_id: &str,
    entry: &JournalEntry,
  ) -> Result<(), RemoteError> {
    self.check("upsert_journal_entry")?;
    self.record("upsert_journal_entry");
    let mut state = self.state.lock().unwrap();
    let entries = state.journal.entry(user_id.to_string()).or_default();
    match entries.iter_mut().find(|e| e.id == entry.id) {
      Some(existing) => *existing = entry.clone(),
      None => entries.push(entry.clone()),
    }
    Ok(())
  }

  async fn upsert_all_journal_entries(
    &self,
    user_id: &str,
    entries: &[JournalEntry],
  ) -> Result<(), RemoteError> {
    self.check("upsert_all_journal_entries")?;
    self.record("upsert_all_journal_entries");
    let mut state = self.state.lock().unwrap();
    let stored = state.journal.entry(user_id.to_string()).or_default();
    for entry in entries {
      match stored.iter_mut().find(|e| e.id == entry.id) {
        Some(existing) => *existing = entry.clone(),
        None => stored.push(entry.clone()),
      }
    }
    Ok(())
  }

  async fn load_journal_entries(&self, user_id: &str) -> Result<Vec<JournalEntry>, RemoteError> {
    self.check("load_journal_entries")?;
    let mut entries = self
      .state
      .lock()
      .unwrap()
      .journal
      .get(user_id)
      .cloned()
      .unwrap_or_default();
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(entries)
  }

  async fn delete_journal_entry(&self, user_id: &str, id: Uuid) -> Result<(), RemoteError> {
    self.check("delete_journal_entry")?;
    self.record("delete_journal_entry");
    if let Some(entries) = self.state.lock().unwrap().journal.get_mut(user_id) {
      entries.retain(|e| e.id != id);
    }
    Ok(())
  }

  async fn delete_all_journal_entries(&self, user_id: &str) -> Result<(), RemoteError> {
    self.check("delete_all_journal_entries")?;
    self.record("delete_all_journal_entries");
    self.state.lock().unwrap().journal.remove(user_id);
    Ok(())
  }

  async fn upsert_chat_message(
    &self,
    user_id: &str,
    message: &ChatMessage,
  ) -> Result<(), RemoteError> {
    self.check("upsert_chat_message")?;
    self.record("upsert_chat_message");
    let mut state = self.state.lock().unwrap();
    let messages = state.chat.entry(user_id.to_string()).or_default();
    match messages.iter_mut().find(|m| m.id == message.id) {
      Some(existing) => *existing = message.clone(),
      None => messages.push(message.clone()),
    }
    Ok(())
  }

  async fn upsert_all_chat_messages(
    &self,
    user_id: &str,
    messages: &[ChatMessage],
  ) -> Result<(), RemoteError> {
    self.check("upsert_all_chat_messages")?;
    self.record("upsert_all_chat_messages");
    let mut state = self.state.lock().unwrap();
    let stored = state.chat.entry(user_id.to_string()).or_default();
    for message in messages {
      match stored.iter_mut().find(|m| m.id == message.id) {
        Some(existing) => *existing = message.clone(),
        None => stored.push(message.clone()),
      }
    }
    Ok(())
  }

  async fn load_chat_messages(&self, user_id: &str) -> Result<Vec<ChatMessage>, RemoteError> {
    self.check("load_chat_messages")?;
    let mut messages = self
      .state
      .lock()
      .unwrap()
      .chat
      .get(user_id)
      .cloned()
      .unwrap_or_default();
    messages.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(messages)
  }

  async fn delete_chat_message(&self, user_id: &str, id: Uuid) -> Result<(), RemoteError> {
    self.check("delete_chat_message")?;
    self.record("delete_chat_message");
    if let Some(messages) = self.state.lock().unwrap().chat.get_mut(user_id) {
      messages.retain(|m| m.id != id);
    }
    Ok(())
  }

  async fn delete_all_chat_messages(&self, user_id: &str) -> Result<(), RemoteError> {
    self.check("delete_all_chat_messages")?;
    self.record("delete_all_chat_messages");
    self.state.lock().unwrap().chat.remove(user_id);
    Ok(())
  }

  async fn upsert_settings(
    &self,
    user_id: &str,
    settings: &UserSettings,
  ) -> Result<(), RemoteError> {
    self.check("upsert_settings")?;
    self.record("upsert_settings");
    self
      .state
      .lock()
      .unwrap()
      .settings
      .insert(user_id.to_string(), settings.clone());
    Ok(())
  }

  async fn load_settings(&self, user_id: &str) -> Result<Option<UserSettings>, RemoteError> {
    self.check("load_settings")?;
    Ok(self.state.lock().unwrap().settings.get(user_id).cloned())
  }
}

/// ---------------------------------------------------------------------------
/// Reminder Scheduler Fake
/// ---------------------------------------------------------------------------

/// Records the anchor sets it was handed and how often it was cancelled.
#[derive(Default)]
pub struct RecordingScheduler {
  scheduled: Mutex<Vec<ReminderAnchors>>,
  cancels: AtomicUsize,
}

impl RecordingScheduler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn last_scheduled(&self) -> Option<ReminderAnchors> {
    self.scheduled.lock().unwrap().last().copied()
  }

  pub fn schedule_count(&self) -> usize {
    self.scheduled.lock().unwrap().len()
  }

  pub fn cancel_count(&self) -> usize {
    self.cancels.load(Ordering::SeqCst)
  }
}

impl ReminderScheduler for RecordingScheduler {
  fn schedule(&self, anchors: &ReminderAnchors) {
    self.scheduled.lock().unwrap().push(*anchors);
  }

  fn cancel_all(&self) {
    self.cancels.fetch_add(1, Ordering::SeqCst);
  }
}
