use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One message in the assistant conversation. The log is append-only; the
/// only mutation after creation is a bulk clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub id: Uuid,
  pub content: String,
  pub is_user: bool,
  pub date: DateTime<Utc>,
}

impl ChatMessage {
  pub fn user(content: impl Into<String>) -> Self {
    Self::new(content, true)
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self::new(content, false)
  }

  fn new(content: impl Into<String>, is_user: bool) -> Self {
    Self {
      id: Uuid::new_v4(),
      content: content.into(),
      is_user,
      date: Utc::now(),
    }
  }
}
