//! Account state
//!
//! The engine only needs two facts from the identity layer: whether data may
//! leave the device, and which user id keys the remote mirror. Guest mode is
//! an explicit "never sync" choice, distinct from simply being signed out.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum Account {
  #[default]
  SignedOut,
  Guest,
  SignedIn { user_id: String },
}

impl Account {
  /// The mirror user id, when mirroring is allowed at all.
  pub fn sync_eligible(&self) -> Option<&str> {
    match self {
      Account::SignedIn { user_id } => Some(user_id),
      Account::SignedOut | Account::Guest => None,
    }
  }

  pub fn is_guest(&self) -> bool {
    matches!(self, Account::Guest)
  }
}
