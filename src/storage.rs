//! Local persistence
//!
//! The durable, always-written side of the data layer. Collection saves are
//! full overwrites: the caller hands over the complete list and the previous
//! contents are replaced in one transaction. Loads come back sorted so hosts
//! can render them directly.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

use crate::models::{ChatMessage, JournalEntry, PeriodRecord, UserSettings};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  #[error("Corrupt record: {0}")]
  Corrupt(String),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

/// The storage backend contract the engine consumes. Implementations must
/// return defaults (not errors) when nothing has been saved yet.
#[async_trait]
pub trait LocalStore: Send + Sync {
  /// Sorted descending by start date.
  async fn load_periods(&self) -> Result<Vec<PeriodRecord>, StorageError>;
  async fn save_periods(&self, periods: &[PeriodRecord]) -> Result<(), StorageError>;

  /// Sorted descending by date.
  async fn load_journal_entries(&self) -> Result<Vec<JournalEntry>, StorageError>;
  async fn save_journal_entries(&self, entries: &[JournalEntry]) -> Result<(), StorageError>;

  /// Chronological (append order).
  async fn load_chat_messages(&self) -> Result<Vec<ChatMessage>, StorageError>;
  async fn save_chat_messages(&self, messages: &[ChatMessage]) -> Result<(), StorageError>;

  /// Defaults when no settings row exists yet.
  async fn load_settings(&self) -> Result<UserSettings, StorageError>;
  async fn save_settings(&self, settings: &UserSettings) -> Result<(), StorageError>;
}

/// SQLite-backed store.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if needed) the database file and run migrations.
  pub async fn connect(db_path: &Path) -> Result<Self, StorageError> {
    if let Some(dir) = db_path.parent() {
      std::fs::create_dir_all(dir)?;
    }
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    log::info!("Opening database at {}", db_path.display());

    let pool = SqlitePoolOptions::new()
      .max_connections(5)
      .connect(&db_url)
      .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(Self::new(pool))
  }

  /// In-memory database, mainly for tests.
  ///
  /// max_connections(1) keeps the pool on a single connection; multiple
  /// connections would each get their own empty in-memory database.
  pub async fn in_memory() -> Result<Self, StorageError> {
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .connect("sqlite::memory:")
      .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(Self::new(pool))
  }

  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }

  fn parse_id(raw: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(raw).map_err(|e| StorageError::Corrupt(format!("bad id {}: {}", raw, e)))
  }

  fn parse_symptoms(raw: &str) -> Result<std::collections::BTreeSet<crate::models::Symptom>, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Corrupt(format!("bad symptoms: {}", e)))
  }

  fn symptoms_json(symptoms: &std::collections::BTreeSet<crate::models::Symptom>) -> String {
    serde_json::to_string(symptoms).unwrap_or_else(|_| "[]".to_string())
  }
}

#[async_trait]
impl LocalStore for SqliteStore {
  async fn load_periods(&self) -> Result<Vec<PeriodRecord>, StorageError> {
    let rows: Vec<(String, NaiveDate, Option<NaiveDate>, String, String)> = sqlx::query_as(
      "SELECT id, start_date, end_date, notes, symptoms FROM periods ORDER BY start_date DESC",
    )
    .fetch_all(&self.pool)
    .await?;

    rows
      .into_iter()
      .map(|(id, start_date, end_date, notes, symptoms)| {
        Ok(PeriodRecord {
          id: Self::parse_id(&id)?,
          start_date,
          end_date,
          notes,
          symptoms: Self::parse_symptoms(&symptoms)?,
        })
      })
      .collect()
  }

  async fn save_periods(&self, periods: &[PeriodRecord]) -> Result<(), StorageError> {
    let mut tx = self.pool.begin().await?;

    sqlx::query("DELETE FROM periods").execute(&mut *tx).await?;
    for period in periods {
      sqlx::query(
        "INSERT INTO periods (id, start_date, end_date, notes, symptoms) VALUES (?1, ?2, ?3, ?4, ?5)",
      )
      .bind(period.id.to_string())
      .bind(period.start_date)
      .bind(period.end_date)
      .bind(&period.notes)
      .bind(Self::symptoms_json(&period.symptoms))
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(())
  }

  async fn load_journal_entries(&self) -> Result<Vec<JournalEntry>, StorageError> {
    let rows: Vec<(String, NaiveDate, String, String, String)> = sqlx::query_as(
      "SELECT id, date, mood, note, symptoms FROM journal_entries ORDER BY date DESC",
    )
    .fetch_all(&self.pool)
    .await?;

    rows
      .into_iter()
      .map(|(id, date, mood, note, symptoms)| {
        Ok(JournalEntry {
          id: Self::parse_id(&id)?,
          date,
          mood: mood
            .parse()
            .map_err(|e: String| StorageError::Corrupt(e))?,
          note,
          symptoms: Self::parse_symptoms(&symptoms)?,
        })
      })
      .collect()
  }

  async fn save_journal_entries(&self, entries: &[JournalEntry]) -> Result<(), StorageError> {
    let mut tx = self.pool.begin().await?;

    sqlx::query("DELETE FROM journal_entries")
      .execute(&mut *tx)
      .await?;
    for entry in entries {
      sqlx::query(
        "INSERT INTO journal_entries (id, date, mood, note, symptoms) VALUES (?1, ?2, ?3, ?4, ?5)",
      )
      .bind(entry.id.to_string())
      .bind(entry.date)
      .bind(entry.mood.to_string())
      .bind(&entry.note)
      .bind(Self::symptoms_json(&entry.symptoms))
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(())
  }

  async fn load_chat_messages(&self) -> Result<Vec<ChatMessage>, StorageError> {
    let rows: Vec<(String, String, bool, DateTime<Utc>)> = sqlx::query_as(
      "SELECT id, content, is_user, date FROM chat_messages ORDER BY date ASC",
    )
    .fetch_all(&self.pool)
    .await?;

    rows
      .into_iter()
      .map(|(id, content, is_user, date)| {
        Ok(ChatMessage {
          id: Self::parse_id(&id)?,
          content,
          is_user,
          date,
        })
      })
      .collect()
  }

  async fn save_chat_messages(&self, messages: &[ChatMessage]) -> Result<(), StorageError> {
    let mut tx = self.pool.begin().await?;

    sqlx::query("DELETE FROM chat_messages")
      .execute(&mut *tx)
      .await?;
    for message in messages {
      sqlx::query(
        "INSERT INTO chat_messages (id, content, is_user, date) VALUES (?1, ?2, ?3, ?4)",
      )
      .bind(message.id.to_string())
      .bind(&message.content)
      .bind(message.is_user)
      .bind(message.date)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(())
  }

  async fn load_settings(&self) -> Result<UserSettings, StorageError> {
    let row: Option<(i64, i64, bool, i64, String, String, String)> = sqlx::query_as(
      r#"
      SELECT average_cycle_length, average_period_length, reminder_enabled,
             reminder_days_before, appearance, language, assistant_api_key
      FROM user_settings WHERE id = 1
      "#,
    )
    .fetch_optional(&self.pool)
    .await?;

    match row {
      Some((cycle, period, enabled, days_before, appearance, language, api_key)) => {
        Ok(
          UserSettings {
            average_cycle_length: cycle,
            average_period_length: period,
            reminder_enabled: enabled,
            reminder_days_before: days_before,
            appearance: appearance
              .parse()
              .map_err(|e: String| StorageError::Corrupt(e))?,
            language: language
              .parse()
              .map_err(|e: String| StorageError::Corrupt(e))?,
            assistant_api_key: api_key,
          }
          .normalize(),
        )
      }
      None => Ok(UserSettings::default()),
    }
  }

  async fn save_settings(&self, settings: &UserSettings) -> Result<(), StorageError> {
    sqlx::query(
      r#"
      INSERT INTO user_settings (
        id, average_cycle_length, average_period_length, reminder_enabled,
        reminder_days_before, appearance, language, assistant_api_key
      )
      VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
      ON CONFLICT(id) DO UPDATE SET
        average_cycle_length = excluded.average_cycle_length,
        average_period_length = excluded.average_period_length,
        reminder_enabled = excluded.reminder_enabled,
        reminder_days_before = excluded.reminder_days_before,
        appearance = excluded.appearance,
        language = excluded.language,
        assistant_api_key = excluded.assistant_api_key
      "#,
    )
    .bind(settings.average_cycle_length)
    .bind(settings.average_period_length)
    .bind(settings.reminder_enabled)
    .bind(settings.reminder_days_before)
    .bind(settings.appearance.to_string())
    .bind(settings.language.to_string())
    .bind(&settings.assistant_api_key)
    .execute(&self.pool)
    .await?;

    Ok(())
  }
}
