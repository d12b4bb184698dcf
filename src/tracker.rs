//! Record store host
//!
//! Owns the in-memory collections and settings, and runs the mutation
//! pipeline: update memory, persist through the sync service, recompute the
//! current phase, re-feed the reminder anchors. Storage, mirror and scheduler
//! are all injected so hosts and tests choose their own implementations.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use uuid::Uuid;

use crate::assistant::build_cycle_context;
use crate::cycle::CycleCalculator;
use crate::models::{ChatMessage, JournalEntry, PeriodRecord, Symptom, UserSettings};
use crate::phase::CyclePhase;
use crate::reminders::{ReminderAnchors, ReminderScheduler};
use crate::storage::StorageError;
use crate::sync::SyncService;

pub struct CycleTracker {
  periods: Vec<PeriodRecord>,
  journal_entries: Vec<JournalEntry>,
  chat_messages: Vec<ChatMessage>,
  settings: UserSettings,
  current_phase: CyclePhase,
  data: SyncService,
  reminders: Arc<dyn ReminderScheduler>,
}

impl CycleTracker {
  /// Load all collections through the sync service (remote wins when
  /// eligible) and compute the initial phase.
  pub async fn load(
    data: SyncService,
    reminders: Arc<dyn ReminderScheduler>,
  ) -> Result<Self, StorageError> {
    let settings = data.load_settings().await?.normalize();
    let periods = data.load_periods().await?;
    let journal_entries = data.load_journal_entries().await?;
    let chat_messages = data.load_chat_messages().await?;

    let mut tracker = Self {
      periods,
      journal_entries,
      chat_messages,
      settings,
      current_phase: CyclePhase::Follicular,
      data,
      reminders,
    };
    tracker.update_current_phase();
    Ok(tracker)
  }

  fn today() -> NaiveDate {
    Local::now().date_naive()
  }

  /// ---------------------------------------------------------------------------
  /// Accessors
  /// ---------------------------------------------------------------------------

  /// Sorted descending by start date.
  pub fn periods(&self) -> &[PeriodRecord] {
    &self.periods
  }

  /// Sorted descending by date.
  pub fn journal_entries(&self) -> &[JournalEntry] {
    &self.journal_entries
  }

  /// Chronological.
  pub fn chat_messages(&self) -> &[ChatMessage] {
    &self.chat_messages
  }

  pub fn settings(&self) -> &UserSettings {
    &self.settings
  }

  /// The phase of today's date, `Follicular` until any period is logged.
  pub fn current_phase(&self) -> CyclePhase {
    self.current_phase
  }

  pub fn calculator(&self) -> CycleCalculator<'_> {
    CycleCalculator::new(&self.periods, &self.settings)
  }

  pub fn last_period(&self) -> Option<&PeriodRecord> {
    self.periods.first()
  }

  pub fn sync(&self) -> &SyncService {
    &self.data
  }

  /// The context block handed to the assistant caller.
  pub fn assistant_context(&self) -> String {
    build_cycle_context(
      &self.periods,
      &self.journal_entries,
      &self.settings,
      Self::today(),
    )
  }

  /// ---------------------------------------------------------------------------
  /// Period CRUD
  /// ---------------------------------------------------------------------------

  pub async fn add_period(
    &mut self,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    notes: impl Into<String>,
    symptoms: BTreeSet<Symptom>,
  ) -> Result<Uuid, StorageError> {
    let record = PeriodRecord::new(start_date, end_date, notes, symptoms);
    let id = record.id;

    self.periods.push(record.clone());
    self.sort_periods();
    self.data.add_period(&self.periods, &record).await?;
    self.after_cycle_mutation();
    Ok(id)
  }

  /// Replace the record with the same id. Unknown ids are ignored.
  pub async fn update_period(&mut self, updated: PeriodRecord) -> Result<(), StorageError> {
    let Some(slot) = self.periods.iter_mut().find(|p| p.id == updated.id) else {
      log::debug!("Ignoring update for unknown period {}", updated.id);
      return Ok(());
    };
    *slot = updated.clone();

    self.sort_periods();
    self.data.update_period(&self.periods, &updated).await?;
    self.after_cycle_mutation();
    Ok(())
  }

  pub async fn delete_period(&mut self, id: Uuid) -> Result<(), StorageError> {
    self.periods.retain(|p| p.id != id);
    self.data.delete_period(&self.periods, id).await?;
    self.after_cycle_mutation();
    Ok(())
  }

  fn sort_periods(&mut self) {
    self.periods.sort_by(|a, b| b.start_date.cmp(&a.start_date));
  }

  /// ---------------------------------------------------------------------------
  /// Settings
  /// ---------------------------------------------------------------------------

  /// Save settings that affect the cycle math; derived state and reminders
  /// are refreshed.
  pub async fn save_settings(&mut self, settings: UserSettings) -> Result<(), StorageError> {
    self.settings = settings.normalize();
    self.data.save_settings(&self.settings).await?;
    self.after_cycle_mutation();
    Ok(())
  }

  /// Save display-only preferences without touching derived state.
  pub async fn save_appearance_settings(
    &mut self,
    settings: UserSettings,
  ) -> Result<(), StorageError> {
    self.settings = settings.normalize();
    self.data.save_settings(&self.settings).await
  }

  /// ---------------------------------------------------------------------------
  /// Journal CRUD
  /// ---------------------------------------------------------------------------

  pub async fn add_journal_entry(&mut self, entry: JournalEntry) -> Result<(), StorageError> {
    // Insert at the front so that among same-day entries the newest one wins
    // the date lookup after the stable sort.
    self.journal_entries.insert(0, entry.clone());
    self.sort_journal();
    self.data.add_journal_entry(&self.journal_entries, &entry).await
  }

  pub async fn update_journal_entry(&mut self, updated: JournalEntry) -> Result<(), StorageError> {
    let Some(slot) = self.journal_entries.iter_mut().find(|e| e.id == updated.id) else {
      log::debug!("Ignoring update for unknown journal entry {}", updated.id);
      return Ok(());
    };
    *slot = updated.clone();

    self.sort_journal();
    self
      .data
      .update_journal_entry(&self.journal_entries, &updated)
      .await
  }

  pub async fn delete_journal_entry(&mut self, id: Uuid) -> Result<(), StorageError> {
    self.journal_entries.retain(|e| e.id != id);
    self.data.delete_journal_entry(&self.journal_entries, id).await
  }

  /// The entry for a calendar day. Uniqueness per day is not enforced; with
  /// several entries on the same day the most recently added one is returned.
  pub fn journal_entry_for(&self, day: NaiveDate) -> Option<&JournalEntry> {
    self.journal_entries.iter().find(|e| e.date == day)
  }

  pub fn journal_entry_for_today(&self) -> Option<&JournalEntry> {
    self.journal_entry_for(Self::today())
  }

  fn sort_journal(&mut self) {
    self.journal_entries.sort_by(|a, b| b.date.cmp(&a.date));
  }

  /// ---------------------------------------------------------------------------
  /// Chat log
  /// ---------------------------------------------------------------------------

  pub async fn push_chat_message(&mut self, message: ChatMessage) -> Result<(), StorageError> {
    self.chat_messages.push(message);
    self.data.save_chat_messages(&self.chat_messages).await
  }

  pub async fn clear_chat(&mut self) -> Result<(), StorageError> {
    self.chat_messages.clear();
    self.data.save_chat_messages(&self.chat_messages).await
  }

  /// ---------------------------------------------------------------------------
  /// Account / bulk operations
  /// ---------------------------------------------------------------------------

  /// Sign in, run the first-login merge if this is the first eligible
  /// session, then reload everything so cloud data (if any) takes over.
  pub async fn sign_in(&mut self, user_id: impl Into<String>) -> Result<(), StorageError> {
    self.data.sign_in(user_id).await?;
    self.reload().await
  }

  /// Re-read all collections through the sync service.
  pub async fn reload(&mut self) -> Result<(), StorageError> {
    self.settings = self.data.load_settings().await?.normalize();
    self.periods = self.data.load_periods().await?;
    self.journal_entries = self.data.load_journal_entries().await?;
    self.chat_messages = self.data.load_chat_messages().await?;
    self.after_cycle_mutation();
    Ok(())
  }

  /// Clear everything locally (and best-effort remotely).
  pub async fn delete_all_data(&mut self) -> Result<(), StorageError> {
    self.periods.clear();
    self.journal_entries.clear();
    self.chat_messages.clear();
    self.data.delete_all().await?;
    self.after_cycle_mutation();
    Ok(())
  }

  /// ---------------------------------------------------------------------------
  /// Derived state
  /// ---------------------------------------------------------------------------

  fn after_cycle_mutation(&mut self) {
    self.update_current_phase();
    self.reschedule_reminders();
  }

  fn update_current_phase(&mut self) {
    self.current_phase = self
      .calculator()
      .phase_for_date(Self::today())
      .unwrap_or(CyclePhase::Follicular);
  }

  /// Hand the scheduler a fresh anchor set, replacing whatever it had.
  fn reschedule_reminders(&self) {
    if !self.settings.reminder_enabled {
      self.reminders.cancel_all();
      return;
    }

    let calc = self.calculator();
    let anchors = ReminderAnchors::compute(
      calc.next_period_date(),
      calc.estimated_end_date(),
      &self.settings,
      Self::today(),
    );
    self.reminders.schedule(&anchors);
  }
}
