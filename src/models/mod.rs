pub mod chat;
pub mod journal;
pub mod period;
pub mod settings;

pub use chat::ChatMessage;
pub use journal::{JournalEntry, Mood};
pub use period::{PeriodRecord, Symptom};
pub use settings::{AppearanceMode, Language, UserSettings};
