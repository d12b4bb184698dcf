//! Conversational assistant
//!
//! Builds the plain-text cycle context handed to the remote LLM, and wraps
//! the generateContent call itself. Cycle data integrity never depends on
//! anything in this module; assistant failures surface to the caller as a
//! typed error and go no further.

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cycle::CycleCalculator;
use crate::models::{JournalEntry, PeriodRecord, UserSettings};
use crate::phase::CyclePhase;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

const GEMINI_API_URL: &str =
  "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_OUTPUT_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.7;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Serialize)]
pub enum AssistantError {
  #[error("API key not configured")]
  MissingApiKey,

  #[error("Request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Empty response from the assistant")]
  NoResponse,

  #[error("Parse error: {0}")]
  Parse(String),
}

/// ---------------------------------------------------------------------------
/// Cycle Context
/// ---------------------------------------------------------------------------

/// The facts the assistant gets about the user's cycle, one per line, in a
/// fixed order. Lines whose fact is unknown are omitted entirely.
pub fn build_cycle_context(
  periods: &[PeriodRecord],
  journal_entries: &[JournalEntry],
  settings: &UserSettings,
  today: NaiveDate,
) -> String {
  let calc = CycleCalculator::new(periods, settings);
  let phase = calc
    .phase_for_date(today)
    .unwrap_or(CyclePhase::Follicular);

  let mut context = String::new();

  context.push_str(&format!("Current cycle phase: {}\n", phase.label()));
  context.push_str(&format!(
    "Average cycle length: {} days\n",
    calc.average_cycle_length()
  ));
  context.push_str(&format!(
    "Average period length: {} days\n",
    calc.average_period_length()
  ));

  if let Some(day) = calc.current_day_of_cycle(today) {
    context.push_str(&format!("Day {} of the cycle\n", day));
  }
  if let Some(days) = calc.days_until_next_period(today) {
    context.push_str(&format!("{} days until the next period\n", days));
  }

  if let Some(last) = calc.last_period() {
    context.push_str(&format!(
      "Last period started: {}\n",
      format_date(last.start_date)
    ));
    if let Some(end) = last.end_date {
      context.push_str(&format!("Last period ended: {}\n", format_date(end)));
    }
    if !last.symptoms.is_empty() {
      let symptoms: Vec<&str> = last.symptoms.iter().map(|s| s.label()).collect();
      context.push_str(&format!("Recent symptoms: {}\n", symptoms.join(", ")));
    }
  }

  if let Some(next) = calc.next_period_date() {
    context.push_str(&format!("Predicted next period: {}\n", format_date(next)));
  }
  if let Some(ovulation) = calc.next_ovulation_date() {
    context.push_str(&format!(
      "Predicted ovulation: {}\n",
      format_date(ovulation)
    ));
  }

  let mut recent: Vec<&JournalEntry> = journal_entries.iter().collect();
  recent.sort_by(|a, b| b.date.cmp(&a.date));
  if !recent.is_empty() {
    context.push_str("\nRecent journal entries:\n");
    for entry in recent.iter().take(3) {
      context.push_str(&format!(
        "- {}: mood: {}",
        format_date(entry.date),
        entry.mood.label()
      ));
      if !entry.note.is_empty() {
        context.push_str(&format!(", note: {}", entry.note));
      }
      context.push('\n');
    }
  }

  context
}

fn format_date(date: NaiveDate) -> String {
  date.format("%-d %B %Y").to_string()
}

/// ---------------------------------------------------------------------------
/// Gemini API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest {
  contents: Vec<Content>,
  #[serde(rename = "generationConfig")]
  generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
  parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
  text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
  temperature: f64,
  #[serde(rename = "maxOutputTokens")]
  max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
  content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
  error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// Assistant Client
/// ---------------------------------------------------------------------------

pub struct AssistantClient {
  client: Client,
  api_key: String,
  base_url: String,
}

impl AssistantClient {
  pub fn new(api_key: impl Into<String>) -> Result<Self, AssistantError> {
    let api_key = api_key.into();
    if api_key.is_empty() {
      return Err(AssistantError::MissingApiKey);
    }

    let client = Client::builder()
      .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
      .build()
      .map_err(|e| AssistantError::Request(e.to_string()))?;

    Ok(Self {
      client,
      api_key,
      base_url: GEMINI_API_URL.to_string(),
    })
  }

  /// Key from settings, falling back to the GEMINI_API_KEY environment
  /// variable.
  pub fn from_settings(settings: &UserSettings) -> Result<Self, AssistantError> {
    Self::new(resolve_api_key(settings)?)
  }

  /// Point the client at a different endpoint (tests, proxies).
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  /// Send one user message with the cycle context embedded in the system
  /// prompt, returning the assistant's reply text.
  pub async fn send_message(
    &self,
    user_message: &str,
    cycle_context: &str,
  ) -> Result<String, AssistantError> {
    let system_prompt = format!(
      "You are a women's health assistant. You answer questions about the \
       menstrual cycle, symptoms and women's health in a warm, supportive \
       tone, keeping answers short and clear. You never give a medical \
       diagnosis; when in doubt you suggest seeing a doctor. The user's \
       cycle data:\n\n{}",
      cycle_context
    );

    let request = GenerateRequest {
      contents: vec![Content {
        parts: vec![Part {
          text: format!("{}\n\nUser: {}", system_prompt, user_message),
        }],
      }],
      generation_config: GenerationConfig {
        temperature: TEMPERATURE,
        max_output_tokens: MAX_OUTPUT_TOKENS,
      },
    };

    let url = format!("{}?key={}", self.base_url, self.api_key);
    let response = self
      .client
      .post(&url)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| AssistantError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| AssistantError::Request(e.to_string()))?;

    if !status.is_success() {
      if let Ok(error_resp) = serde_json::from_str::<ApiErrorResponse>(&body) {
        return Err(AssistantError::Api(error_resp.error.message));
      }
      return Err(AssistantError::Api(format!("HTTP {}: {}", status, body)));
    }

    let parsed: GenerateResponse =
      serde_json::from_str(&body).map_err(|e| AssistantError::Parse(e.to_string()))?;

    let text = parsed
      .candidates
      .into_iter()
      .next()
      .and_then(|c| c.content)
      .and_then(|c| c.parts.into_iter().next())
      .map(|p| p.text)
      .ok_or(AssistantError::NoResponse)?;

    Ok(text.trim().to_string())
  }
}

fn resolve_api_key(settings: &UserSettings) -> Result<String, AssistantError> {
  if !settings.assistant_api_key.is_empty() {
    return Ok(settings.assistant_api_key.clone());
  }

  dotenvy::dotenv().ok();
  match std::env::var("GEMINI_API_KEY") {
    Ok(key) if !key.is_empty() => Ok(key),
    _ => Err(AssistantError::MissingApiKey),
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
