//! Sync reconciliation
//!
//! Local storage is the durable source of truth and is always written first,
//! synchronously from the caller's point of view. When the account is
//! eligible, the same mutation is queued for the remote mirror and applied by
//! a background worker: in order, best-effort, every failure swallowed into a
//! log line. Reads prefer the mirror (remote wins) but fall back to local on
//! any remote failure, so a load can never fail because the network did.

use std::sync::{Arc, RwLock};

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::auth::Account;
use crate::models::{ChatMessage, JournalEntry, PeriodRecord, UserSettings};
use crate::remote::{RemoteError, RemoteStore};
use crate::storage::{LocalStore, StorageError};

/// One queued mirror mutation. Deletions carry ids, not full records.
#[derive(Debug)]
enum MirrorOp {
  UpsertPeriod(PeriodRecord),
  UpsertAllPeriods(Vec<PeriodRecord>),
  DeletePeriod(Uuid),
  UpsertJournalEntry(JournalEntry),
  UpsertAllJournalEntries(Vec<JournalEntry>),
  DeleteJournalEntry(Uuid),
  UpsertAllChatMessages(Vec<ChatMessage>),
  UpsertSettings(UserSettings),
  DeleteAll,
}

impl MirrorOp {
  fn describe(&self) -> &'static str {
    match self {
      MirrorOp::UpsertPeriod(_) => "upsert period",
      MirrorOp::UpsertAllPeriods(_) => "upsert all periods",
      MirrorOp::DeletePeriod(_) => "delete period",
      MirrorOp::UpsertJournalEntry(_) => "upsert journal entry",
      MirrorOp::UpsertAllJournalEntries(_) => "upsert all journal entries",
      MirrorOp::DeleteJournalEntry(_) => "delete journal entry",
      MirrorOp::UpsertAllChatMessages(_) => "upsert all chat messages",
      MirrorOp::UpsertSettings(_) => "upsert settings",
      MirrorOp::DeleteAll => "delete all",
    }
  }
}

enum QueueItem {
  Op { user_id: String, op: MirrorOp },
  Flush(oneshot::Sender<()>),
}

/// Local-first data service with a best-effort remote mirror.
pub struct SyncService {
  local: Arc<dyn LocalStore>,
  remote: Arc<dyn RemoteStore>,
  account: RwLock<Account>,
  queue: mpsc::UnboundedSender<QueueItem>,
}

impl SyncService {
  /// Spawns the mirror worker; must be called from within a tokio runtime.
  pub fn new(local: Arc<dyn LocalStore>, remote: Arc<dyn RemoteStore>, account: Account) -> Self {
    let (queue, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_mirror_worker(rx, remote.clone()));

    Self {
      local,
      remote,
      account: RwLock::new(account),
      queue,
    }
  }

  /// ---------------------------------------------------------------------------
  /// Account transitions
  /// ---------------------------------------------------------------------------

  pub fn account(&self) -> Account {
    match self.account.read() {
      Ok(guard) => guard.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }

  fn set_account(&self, value: Account) {
    match self.account.write() {
      Ok(mut guard) => *guard = value,
      Err(poisoned) => *poisoned.into_inner() = value,
    }
  }

  /// Sign in. The first transition into an eligible account triggers the
  /// one-time local-to-cloud merge.
  pub async fn sign_in(&self, user_id: impl Into<String>) -> Result<(), StorageError> {
    let was_eligible = self.account().sync_eligible().is_some();
    self.set_account(Account::SignedIn {
      user_id: user_id.into(),
    });

    if !was_eligible {
      self.merge_local_to_cloud().await?;
    }
    Ok(())
  }

  pub fn sign_out(&self) {
    self.set_account(Account::SignedOut);
  }

  pub fn continue_as_guest(&self) {
    self.set_account(Account::Guest);
  }

  fn eligible_user_id(&self) -> Option<String> {
    self.account().sync_eligible().map(str::to_string)
  }

  fn enqueue(&self, op: MirrorOp) {
    let Some(user_id) = self.eligible_user_id() else {
      return;
    };
    // The worker outlives every caller; a send can only fail during drop.
    let _ = self.queue.send(QueueItem::Op { user_id, op });
  }

  /// Wait until every queued mirror operation has been attempted. Useful at
  /// host shutdown; local state never depends on it.
  pub async fn flush(&self) {
    let (tx, rx) = oneshot::channel();
    if self.queue.send(QueueItem::Flush(tx)).is_ok() {
      let _ = rx.await;
    }
  }

  /// ---------------------------------------------------------------------------
  /// Reads (remote wins, local fallback)
  /// ---------------------------------------------------------------------------

  pub async fn load_periods(&self) -> Result<Vec<PeriodRecord>, StorageError> {
    if let Some(user_id) = self.eligible_user_id() {
      match self.remote.load_periods(&user_id).await {
        Ok(periods) => {
          self.local.save_periods(&periods).await?;
          return Ok(periods);
        }
        Err(e) => log::warn!("Remote period load failed, using local data: {}", e),
      }
    }
    self.local.load_periods().await
  }

  pub async fn load_journal_entries(&self) -> Result<Vec<JournalEntry>, StorageError> {
    if let Some(user_id) = self.eligible_user_id() {
      match self.remote.load_journal_entries(&user_id).await {
        Ok(entries) => {
          self.local.save_journal_entries(&entries).await?;
          return Ok(entries);
        }
        Err(e) => log::warn!("Remote journal load failed, using local data: {}", e),
      }
    }
    self.local.load_journal_entries().await
  }

  pub async fn load_chat_messages(&self) -> Result<Vec<ChatMessage>, StorageError> {
    if let Some(user_id) = self.eligible_user_id() {
      match self.remote.load_chat_messages(&user_id).await {
        Ok(messages) => {
          self.local.save_chat_messages(&messages).await?;
          return Ok(messages);
        }
        Err(e) => log::warn!("Remote chat load failed, using local data: {}", e),
      }
    }
    self.local.load_chat_messages().await
  }

  pub async fn load_settings(&self) -> Result<UserSettings, StorageError> {
    if let Some(user_id) = self.eligible_user_id() {
      match self.remote.load_settings(&user_id).await {
        Ok(Some(settings)) => {
          self.local.save_settings(&settings).await?;
          return Ok(settings);
        }
        Ok(None) => {}
        Err(e) => log::warn!("Remote settings load failed, using local data: {}", e),
      }
    }
    self.local.load_settings().await
  }

  /// ---------------------------------------------------------------------------
  /// Writes (local synchronously, mirror queued)
  /// ---------------------------------------------------------------------------

  pub async fn save_periods(&self, periods: &[PeriodRecord]) -> Result<(), StorageError> {
    self.local.save_periods(periods).await?;
    self.enqueue(MirrorOp::UpsertAllPeriods(periods.to_vec()));
    Ok(())
  }

  /// Persist the full collection and mirror just the added record.
  pub async fn add_period(
    &self,
    periods: &[PeriodRecord],
    added: &PeriodRecord,
  ) -> Result<(), StorageError> {
    self.local.save_periods(periods).await?;
    self.enqueue(MirrorOp::UpsertPeriod(added.clone()));
    Ok(())
  }

  pub async fn update_period(
    &self,
    periods: &[PeriodRecord],
    updated: &PeriodRecord,
  ) -> Result<(), StorageError> {
    self.local.save_periods(periods).await?;
    self.enqueue(MirrorOp::UpsertPeriod(updated.clone()));
    Ok(())
  }

  pub async fn delete_period(
    &self,
    periods: &[PeriodRecord],
    deleted: Uuid,
  ) -> Result<(), StorageError> {
    self.local.save_periods(periods).await?;
    self.enqueue(MirrorOp::DeletePeriod(deleted));
    Ok(())
  }

  pub async fn save_journal_entries(&self, entries: &[JournalEntry]) -> Result<(), StorageError> {
    self.local.save_journal_entries(entries).await?;
    self.enqueue(MirrorOp::UpsertAllJournalEntries(entries.to_vec()));
    Ok(())
  }

  pub async fn add_journal_entry(
    &self,
    entries: &[JournalEntry],
    added: &JournalEntry,
  ) -> Result<(), StorageError> {
    self.local.save_journal_entries(entries).await?;
    self.enqueue(MirrorOp::UpsertJournalEntry(added.clone()));
    Ok(())
  }

  pub async fn update_journal_entry(
    &self,
    entries: &[JournalEntry],
    updated: &JournalEntry,
  ) -> Result<(), StorageError> {
    self.local.save_journal_entries(entries).await?;
    self.enqueue(MirrorOp::UpsertJournalEntry(updated.clone()));
    Ok(())
  }

  pub async fn delete_journal_entry(
    &self,
    entries: &[JournalEntry],
    deleted: Uuid,
  ) -> Result<(), StorageError> {
    self.local.save_journal_entries(entries).await?;
    self.enqueue(MirrorOp::DeleteJournalEntry(deleted));
    Ok(())
  }

  pub async fn save_chat_messages(&self, messages: &[ChatMessage]) -> Result<(), StorageError> {
    self.local.save_chat_messages(messages).await?;
    self.enqueue(MirrorOp::UpsertAllChatMessages(messages.to_vec()));
    Ok(())
  }

  pub async fn save_settings(&self, settings: &UserSettings) -> Result<(), StorageError> {
    self.local.save_settings(settings).await?;
    self.enqueue(MirrorOp::UpsertSettings(settings.clone()));
    Ok(())
  }

  /// ---------------------------------------------------------------------------
  /// First-login merge
  /// ---------------------------------------------------------------------------

  /// Push local data up once, and only into an empty cloud profile. A
  /// profile that already has a settings document belongs to some earlier
  /// device state and is left completely untouched.
  pub async fn merge_local_to_cloud(&self) -> Result<(), StorageError> {
    let account = self.account();
    let Some(user_id) = account.sync_eligible() else {
      return Ok(());
    };

    let existing = match self.remote.load_settings(user_id).await {
      Ok(existing) => existing,
      Err(e) => {
        // Cannot tell whether the profile is empty; pushing anyway could
        // clobber another device's data, so do nothing this time.
        log::warn!("First-login merge skipped, settings probe failed: {}", e);
        return Ok(());
      }
    };
    if existing.is_some() {
      log::debug!("Cloud profile already initialized, merge skipped");
      return Ok(());
    }

    let settings = self.local.load_settings().await?;
    Self::best_effort("merge settings", self.remote.upsert_settings(user_id, &settings).await);

    let periods = self.local.load_periods().await?;
    if !periods.is_empty() {
      Self::best_effort(
        "merge periods",
        self.remote.upsert_all_periods(user_id, &periods).await,
      );
    }

    let entries = self.local.load_journal_entries().await?;
    if !entries.is_empty() {
      Self::best_effort(
        "merge journal",
        self
          .remote
          .upsert_all_journal_entries(user_id, &entries)
          .await,
      );
    }

    let messages = self.local.load_chat_messages().await?;
    if !messages.is_empty() {
      Self::best_effort(
        "merge chat",
        self
          .remote
          .upsert_all_chat_messages(user_id, &messages)
          .await,
      );
    }

    Ok(())
  }

  /// ---------------------------------------------------------------------------
  /// Delete everything
  /// ---------------------------------------------------------------------------

  /// Clear all local collections immediately; remote clearing is queued and
  /// best-effort, and its failure never brings the local data back.
  pub async fn delete_all(&self) -> Result<(), StorageError> {
    self.local.save_periods(&[]).await?;
    self.local.save_journal_entries(&[]).await?;
    self.local.save_chat_messages(&[]).await?;

    self.enqueue(MirrorOp::DeleteAll);
    Ok(())
  }

  fn best_effort(what: &str, result: Result<(), RemoteError>) {
    if let Err(e) = result {
      log::warn!("Remote {} failed: {}", what, e);
    }
  }
}

/// ---------------------------------------------------------------------------
/// Mirror worker
/// ---------------------------------------------------------------------------

async fn run_mirror_worker(
  mut rx: mpsc::UnboundedReceiver<QueueItem>,
  remote: Arc<dyn RemoteStore>,
) {
  while let Some(item) = rx.recv().await {
    match item {
      QueueItem::Op { user_id, op } => {
        let what = op.describe();
        if let Err(e) = apply_mirror_op(remote.as_ref(), &user_id, op).await {
          log::warn!("Remote {} failed: {}", what, e);
        }
      }
      QueueItem::Flush(ack) => {
        let _ = ack.send(());
      }
    }
  }
}

async fn apply_mirror_op(
  remote: &dyn RemoteStore,
  user_id: &str,
  op: MirrorOp,
) -> Result<(), RemoteError> {
  match op {
    MirrorOp::UpsertPeriod(period) => remote.upsert_period(user_id, &period).await,
    MirrorOp::UpsertAllPeriods(periods) => remote.upsert_all_periods(user_id, &periods).await,
    MirrorOp::DeletePeriod(id) => remote.delete_period(user_id, id).await,
    MirrorOp::UpsertJournalEntry(entry) => remote.upsert_journal_entry(user_id, &entry).await,
    MirrorOp::UpsertAllJournalEntries(entries) => {
      remote.upsert_all_journal_entries(user_id, &entries).await
    }
    MirrorOp::DeleteJournalEntry(id) => remote.delete_journal_entry(user_id, id).await,
    MirrorOp::UpsertAllChatMessages(messages) => {
      remote.upsert_all_chat_messages(user_id, &messages).await
    }
    MirrorOp::UpsertSettings(settings) => remote.upsert_settings(user_id, &settings).await,
    MirrorOp::DeleteAll => {
      // Three independent best-effort clears; one failing must not stop the
      // others.
      for result in [
        remote.delete_all_periods(user_id).await,
        remote.delete_all_journal_entries(user_id).await,
        remote.delete_all_chat_messages(user_id).await,
      ] {
        if let Err(e) = result {
          log::warn!("Remote delete-all step failed: {}", e);
        }
      }
      Ok(())
    }
  }
}
