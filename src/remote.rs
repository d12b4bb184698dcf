//! Remote document mirror
//!
//! Best-effort cloud copy of the local collections, keyed by user id. The
//! engine never treats this store as authoritative except during the
//! remote-wins read and the first-login merge decision; callers are expected
//! to swallow every error here (see `sync`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;
use uuid::Uuid;

use crate::models::{ChatMessage, JournalEntry, PeriodRecord, UserSettings};

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),
}

impl From<reqwest::Error> for RemoteError {
  fn from(e: reqwest::Error) -> Self {
    RemoteError::Request(e.to_string())
  }
}

/// The mirror contract. Every collection supports upsert-one,
/// bulk-upsert-all, load-all, delete-one and delete-all; settings are a
/// single optional document whose absence drives the first-login merge.
#[async_trait]
pub trait RemoteStore: Send + Sync {
  async fn upsert_period(&self, user_id: &str, period: &PeriodRecord) -> Result<(), RemoteError>;
  async fn upsert_all_periods(
    &self,
    user_id: &str,
    periods: &[PeriodRecord],
  ) -> Result<(), RemoteError>;
  /// Sorted descending by start date.
  async fn load_periods(&self, user_id: &str) -> Result<Vec<PeriodRecord>, RemoteError>;
  async fn delete_period(&self, user_id: &str, id: Uuid) -> Result<(), RemoteError>;
  async fn delete_all_periods(&self, user_id: &str) -> Result<(), RemoteError>;

  async fn upsert_journal_entry(
    &self,
    user_id: &str,
    entry: &JournalEntry,
  ) -> Result<(), RemoteError>;
  async fn upsert_all_journal_entries(
    &self,
    user_id: &str,
    entries: &[JournalEntry],
  ) -> Result<(), RemoteError>;
  /// Sorted descending by date.
  async fn load_journal_entries(&self, user_id: &str) -> Result<Vec<JournalEntry>, RemoteError>;
  async fn delete_journal_entry(&self, user_id: &str, id: Uuid) -> Result<(), RemoteError>;
  async fn delete_all_journal_entries(&self, user_id: &str) -> Result<(), RemoteError>;

  async fn upsert_chat_message(
    &self,
    user_id: &str,
    message: &ChatMessage,
  ) -> Result<(), RemoteError>;
  async fn upsert_all_chat_messages(
    &self,
    user_id: &str,
    messages: &[ChatMessage],
  ) -> Result<(), RemoteError>;
  /// Chronological.
  async fn load_chat_messages(&self, user_id: &str) -> Result<Vec<ChatMessage>, RemoteError>;
  async fn delete_chat_message(&self, user_id: &str, id: Uuid) -> Result<(), RemoteError>;
  async fn delete_all_chat_messages(&self, user_id: &str) -> Result<(), RemoteError>;

  async fn upsert_settings(
    &self,
    user_id: &str,
    settings: &UserSettings,
  ) -> Result<(), RemoteError>;
  /// `Ok(None)` when the user has no settings document yet; this is how the
  /// first-login merge distinguishes a fresh cloud profile.
  async fn load_settings(&self, user_id: &str) -> Result<Option<UserSettings>, RemoteError>;
}

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RemoteConfig {
  pub base_url: Url,
  pub api_token: Option<String>,
}

impl RemoteConfig {
  pub fn from_env() -> Result<Self, RemoteError> {
    dotenvy::dotenv().ok();

    let raw = std::env::var("CYCLE_LOG_SYNC_URL")
      .map_err(|_| RemoteError::MissingConfig("CYCLE_LOG_SYNC_URL".into()))?;
    let base_url = Url::parse(&raw)
      .map_err(|e| RemoteError::MissingConfig(format!("CYCLE_LOG_SYNC_URL: {}", e)))?;

    Ok(Self {
      base_url,
      api_token: std::env::var("CYCLE_LOG_SYNC_TOKEN").ok(),
    })
  }
}

/// ---------------------------------------------------------------------------
/// HTTP implementation
/// ---------------------------------------------------------------------------

/// REST client against a per-user document mirror:
/// `PUT/GET/DELETE {base}/users/{uid}/{collection}[/{id}]` with JSON bodies,
/// plus `{base}/users/{uid}/settings` for the settings document.
pub struct HttpRemoteStore {
  client: Client,
  base_url: Url,
  api_token: Option<String>,
}

impl HttpRemoteStore {
  pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
      .build()?;

    Ok(Self {
      client,
      base_url: config.base_url,
      api_token: config.api_token,
    })
  }

  pub fn from_env() -> Result<Self, RemoteError> {
    Self::new(RemoteConfig::from_env()?)
  }

  fn collection_url(&self, user_id: &str, collection: &str) -> String {
    format!(
      "{}/users/{}/{}",
      self.base_url.as_str().trim_end_matches('/'),
      user_id,
      collection
    )
  }

  fn document_url(&self, user_id: &str, collection: &str, id: &str) -> String {
    format!("{}/{}", self.collection_url(user_id, collection), id)
  }

  fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.api_token {
      Some(token) => builder.bearer_auth(token),
      None => builder,
    }
  }

  async fn put_json<T: serde::Serialize + ?Sized>(
    &self,
    url: &str,
    body: &T,
  ) -> Result<(), RemoteError> {
    let response = self.authorize(self.client.put(url)).json(body).send().await?;
    Self::check_status(response).await?;
    Ok(())
  }

  async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, RemoteError> {
    let response = self.authorize(self.client.get(url)).send().await?;
    let response = Self::check_status(response).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| RemoteError::Parse(e.to_string()))
  }

  async fn delete(&self, url: &str) -> Result<(), RemoteError> {
    let response = self.authorize(self.client.delete(url)).send().await?;
    Self::check_status(response).await?;
    Ok(())
  }

  async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Api(format!("HTTP {}: {}", status, body)))
  }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
  async fn upsert_period(&self, user_id: &str, period: &PeriodRecord) -> Result<(), RemoteError> {
    let url = self.document_url(user_id, "periods", &period.id.to_string());
    self.put_json(&url, period).await
  }

  async fn upsert_all_periods(
    &self,
    user_id: &str,
    periods: &[PeriodRecord],
  ) -> Result<(), RemoteError> {
    let url = self.collection_url(user_id, "periods");
    self.put_json(&url, periods).await
  }

  async fn load_periods(&self, user_id: &str) -> Result<Vec<PeriodRecord>, RemoteError> {
    let url = self.collection_url(user_id, "periods");
    let mut periods: Vec<PeriodRecord> = self.get_json(&url).await?;
    periods.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    Ok(periods)
  }

  async fn delete_period(&self, user_id: &str, id: Uuid) -> Result<(), RemoteError> {
    let url = self.document_url(user_id, "periods", &id.to_string());
    self.delete(&url).await
  }

  async fn delete_all_periods(&self, user_id: &str) -> Result<(), RemoteError> {
    let url = self.collection_url(user_id, "periods");
    self.delete(&url).await
  }

  async fn upsert_journal_entry(
    &self,
    user_id: &str,
    entry: &JournalEntry,
  ) -> Result<(), RemoteError> {
    let url = self.document_url(user_id, "journal", &entry.id.to_string());
    self.put_json(&url, entry).await
  }

  async fn upsert_all_journal_entries(
    &self,
    user_id: &str,
    entries: &[JournalEntry],
  ) -> Result<(), RemoteError> {
    let url = self.collection_url(user_id, "journal");
    self.put_json(&url, entries).await
  }

  async fn load_journal_entries(&self, user_id: &str) -> Result<Vec<JournalEntry>, RemoteError> {
    let url = self.collection_url(user_id, "journal");
    let mut entries: Vec<JournalEntry> = self.get_json(&url).await?;
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(entries)
  }

  async fn delete_journal_entry(&self, user_id: &str, id: Uuid) -> Result<(), RemoteError> {
    let url = self.document_url(user_id, "journal", &id.to_string());
    self.delete(&url).await
  }

  async fn delete_all_journal_entries(&self, user_id: &str) -> Result<(), RemoteError> {
    let url = self.collection_url(user_id, "journal");
    self.delete(&url).await
  }

  async fn upsert_chat_message(
    &self,
    user_id: &str,
    message: &ChatMessage,
  ) -> Result<(), RemoteError> {
    let url = self.document_url(user_id, "chat", &message.id.to_string());
    self.put_json(&url, message).await
  }

  async fn upsert_all_chat_messages(
    &self,
    user_id: &str,
    messages: &[ChatMessage],
  ) -> Result<(), RemoteError> {
    let url = self.collection_url(user_id, "chat");
    self.put_json(&url, messages).await
  }

  async fn load_chat_messages(&self, user_id: &str) -> Result<Vec<ChatMessage>, RemoteError> {
    let url = self.collection_url(user_id, "chat");
    let mut messages: Vec<ChatMessage> = self.get_json(&url).await?;
    messages.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(messages)
  }

  async fn delete_chat_message(&self, user_id: &str, id: Uuid) -> Result<(), RemoteError> {
    let url = self.document_url(user_id, "chat", &id.to_string());
    self.delete(&url).await
  }

  async fn delete_all_chat_messages(&self, user_id: &str) -> Result<(), RemoteError> {
    let url = self.collection_url(user_id, "chat");
    self.delete(&url).await
  }

  async fn upsert_settings(
    &self,
    user_id: &str,
    settings: &UserSettings,
  ) -> Result<(), RemoteError> {
    let url = self.collection_url(user_id, "settings");
    self.put_json(&url, settings).await
  }

  async fn load_settings(&self, user_id: &str) -> Result<Option<UserSettings>, RemoteError> {
    let url = self.collection_url(user_id, "settings");
    let response = self.authorize(self.client.get(&url)).send().await?;

    // 404 means the profile has no settings document yet, which is a
    // meaningful answer, not an error.
    if response.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(None);
    }

    let response = Self::check_status(response).await?;
    let body = response.text().await?;
    let settings: UserSettings =
      serde_json::from_str(&body).map_err(|e| RemoteError::Parse(e.to_string()))?;
    Ok(Some(settings))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{date, period_starting};

  fn store_for(server: &mockito::ServerGuard) -> HttpRemoteStore {
    HttpRemoteStore::new(RemoteConfig {
      base_url: Url::parse(&server.url()).unwrap(),
      api_token: None,
    })
    .unwrap()
  }

  #[test]
  fn test_from_env_requires_url() {
    temp_env::with_vars(
      [
        ("CYCLE_LOG_SYNC_URL", None::<&str>),
        ("CYCLE_LOG_SYNC_TOKEN", None),
      ],
      || {
        assert!(matches!(
          RemoteConfig::from_env(),
          Err(RemoteError::MissingConfig(_))
        ));
      },
    );
  }

  #[tokio::test]
  async fn test_load_periods_sorts_descending() {
    let mut server = mockito::Server::new_async().await;
    let older = period_starting(date(2025, 1, 1));
    let newer = period_starting(date(2025, 2, 1));
    let body = serde_json::to_string(&vec![older.clone(), newer.clone()]).unwrap();

    let mock = server
      .mock("GET", "/users/u1/periods")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(body)
      .create_async()
      .await;

    let store = store_for(&server);
    let loaded = store.load_periods("u1").await.unwrap();
    mock.assert_async().await;

    assert_eq!(loaded, vec![newer, older]);
  }

  #[tokio::test]
  async fn test_upsert_period_puts_document_by_id() {
    let mut server = mockito::Server::new_async().await;
    let period = period_starting(date(2025, 3, 1));
    let path = format!("/users/u1/periods/{}", period.id);

    let mock = server
      .mock("PUT", path.as_str())
      .with_status(200)
      .create_async()
      .await;

    let store = store_for(&server);
    store.upsert_period("u1", &period).await.unwrap();
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_missing_settings_document_is_none() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/users/u1/settings")
      .with_status(404)
      .create_async()
      .await;

    let store = store_for(&server);
    let settings = store.load_settings("u1").await.unwrap();
    mock.assert_async().await;

    assert!(settings.is_none());
  }

  #[tokio::test]
  async fn test_present_settings_document_is_some() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::to_string(&UserSettings::default()).unwrap();
    let mock = server
      .mock("GET", "/users/u1/settings")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(body)
      .create_async()
      .await;

    let store = store_for(&server);
    let settings = store.load_settings("u1").await.unwrap();
    mock.assert_async().await;

    assert_eq!(settings, Some(UserSettings::default()));
  }

  #[tokio::test]
  async fn test_server_error_surfaces_as_api_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("DELETE", "/users/u1/periods")
      .with_status(500)
      .with_body("boom")
      .create_async()
      .await;

    let store = store_for(&server);
    let err = store.delete_all_periods("u1").await.unwrap_err();
    assert!(matches!(err, RemoteError::Api(_)));
  }

  #[tokio::test]
  async fn test_unparseable_body_is_a_parse_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("GET", "/users/u1/journal")
      .with_status(200)
      .with_body("not json")
      .create_async()
      .await;

    let store = store_for(&server);
    let err = store.load_journal_entries("u1").await.unwrap_err();
    assert!(matches!(err, RemoteError::Parse(_)));
  }
}
