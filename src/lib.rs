//! Local-first menstrual cycle engine.
//!
//! `CycleTracker` hosts the record collections and runs every mutation
//! through the same pipeline: local persistence, best-effort cloud mirror,
//! phase recomputation, reminder anchors. The math lives in pure modules
//! (`cycle`, `phase`, `reminders`) that never touch I/O.

pub mod assistant;
pub mod auth;
pub mod cycle;
pub mod models;
pub mod phase;
pub mod reminders;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod tracker;

#[cfg(test)]
pub mod test_utils;

pub use assistant::{build_cycle_context, AssistantClient, AssistantError};
pub use auth::Account;
pub use cycle::{CycleCalculator, FertileWindow, PredictedPeriod};
pub use phase::CyclePhase;
pub use reminders::{ReminderAnchors, ReminderScheduler};
pub use remote::{HttpRemoteStore, RemoteConfig, RemoteError, RemoteStore};
pub use storage::{LocalStore, SqliteStore, StorageError};
pub use sync::SyncService;
pub use tracker::CycleTracker;
