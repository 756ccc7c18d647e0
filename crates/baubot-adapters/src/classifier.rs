//! LLM-backed intent classification.
//!
//! Every incoming chat message is sent to an OpenAI-compatible chat
//! completion endpoint (Groq by default) with a system prompt that
//! constrains the reply to a single JSON object carrying the intent
//! label and any extracted fields. Classification never fails hard:
//! any transport or parse error downgrades the result to
//! [`Intent::Unknown`] so the conversation keeps flowing.

use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::error::{AdapterError, Result};

/// Default chat completion endpoint (Groq's OpenAI-compatible API).
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Default classification model.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Request timeout for classification calls.
const REQUEST_TIMEOUT_SECS: u64 = 8;

/// System prompt constraining the model to a JSON intent object.
const CLASSIFY_PROMPT: &str = r#"Du bist der Assistent eines Architekturbüros in Tirol. Analysiere die Nachricht und antworte AUSSCHLIESSLICH mit einem JSON-Objekt.

Mögliche Intents:
- CREATE_PROJECT: Ein neues Projekt anlegen. Felder: project_name, location (optional), authority (optional)
- RECORD_TIME: Arbeitszeit auf ein Projekt buchen. Felder: project_identifier, duration_hours, activity_description (optional), entry_date (optional, YYYY-MM-DD oder "heute"/"gestern"/"vorgestern")
- CREATE_TASK: Eine Aufgabe anlegen. Felder: task_description, project_identifier (optional), priority (optional: hoch/mittel/niedrig), authority (optional), municipality (optional)
- SHOW_CALENDAR: Kommende Termine anzeigen. Felder: days_ahead (optional, Zahl)
- CREATE_CALENDAR_EVENT: Einen Termin anlegen. Felder: event_title, event_date (optional, YYYY-MM-DD), event_time (optional, HH:MM), duration_hours (optional), project_identifier (optional)
- HELP: Der Nutzer fragt, was der Assistent kann.
- UNKNOWN: Nichts davon trifft zu.

Antwortformat:
{"intent": "<INTENT>", "confidence": <0.0-1.0>, "fields": { ... }}

Gib nur das JSON-Objekt zurück, keinen weiteren Text."#;

// ── intent model ─────────────────────────────────────────────────────

/// The workflows the assistant knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    CreateProject,
    RecordTime,
    CreateTask,
    ShowCalendar,
    CreateCalendarEvent,
    Help,
    Unknown,
}

impl Intent {
    /// Map a model-produced label onto an intent.
    ///
    /// Accepts the legacy `LOG_TIME` and `SHOW_CALENDAR_EVENTS`
    /// aliases; any unrecognized label folds to [`Intent::Unknown`]
    /// rather than erroring.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "CREATE_PROJECT" => Self::CreateProject,
            "RECORD_TIME" | "LOG_TIME" => Self::RecordTime,
            "CREATE_TASK" => Self::CreateTask,
            "SHOW_CALENDAR" | "SHOW_CALENDAR_EVENTS" => Self::ShowCalendar,
            "CREATE_CALENDAR_EVENT" => Self::CreateCalendarEvent,
            "HELP" => Self::Help,
            _ => Self::Unknown,
        }
    }
}

/// Fields the model extracted from the message alongside the intent.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFields {
    pub project_name: Option<String>,
    pub project_identifier: Option<String>,
    pub location: Option<String>,
    pub authority: Option<String>,
    pub municipality: Option<String>,
    pub duration_hours: Option<f64>,
    pub activity_description: Option<String>,
    pub entry_date: Option<String>,
    pub task_description: Option<String>,
    pub priority: Option<String>,
    pub days_ahead: Option<i64>,
    pub event_title: Option<String>,
    pub event_date: Option<String>,
    pub event_time: Option<String>,
}

impl ExtractedFields {
    /// Read fields out of the model's `fields` object.
    ///
    /// Tolerates the model's habit of sending numbers as strings and
    /// accepts a few label aliases (`behörde`, `gemeinde`, `content`).
    pub fn from_value(fields: &Value) -> Self {
        let text = |keys: &[&str]| -> Option<String> {
            keys.iter().find_map(|key| {
                fields
                    .get(key)
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
        };

        Self {
            project_name: text(&["project_name"]),
            project_identifier: text(&["project_identifier"]),
            location: text(&["location"]),
            authority: text(&["authority", "behörde"]),
            municipality: text(&["municipality", "gemeinde"]),
            duration_hours: number_field(fields, "duration_hours"),
            activity_description: text(&["activity_description"]),
            entry_date: text(&["entry_date"]),
            task_description: text(&["task_description", "content"]),
            priority: text(&["priority"]),
            days_ahead: number_field(fields, "days_ahead").map(|n| n as i64),
            event_title: text(&["event_title"]),
            event_date: text(&["event_date"]),
            event_time: text(&["event_time"]),
        }
    }
}

/// Read a numeric field that may arrive as a JSON number or a string.
fn number_field(fields: &Value, key: &str) -> Option<f64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

/// A classified message: intent, the raw label for diagnostics, an
/// optional confidence score (informational only), and extracted
/// fields.
#[derive(Debug, Clone)]
pub struct ClassifiedIntent {
    pub intent: Intent,
    pub raw_label: String,
    pub confidence: Option<f32>,
    pub fields: ExtractedFields,
}

impl ClassifiedIntent {
    fn unknown(raw_label: impl Into<String>) -> Self {
        Self {
            intent: Intent::Unknown,
            raw_label: raw_label.into(),
            confidence: None,
            fields: ExtractedFields::default(),
        }
    }
}

// ── classifier client ────────────────────────────────────────────────

/// Classifies chat messages via an OpenAI-compatible completion API.
pub struct IntentClassifier {
    api_base: String,
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl IntentClassifier {
    pub fn new(api_key: &str, api_base: Option<&str>, model: Option<&str>) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AdapterError::Config(
                "classifier API key must not be empty".into(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AdapterError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base: api_base
                .unwrap_or(DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            http,
        })
    }

    /// Classify a chat message. Never fails: transport or parse errors
    /// downgrade to [`Intent::Unknown`] after logging.
    #[instrument(skip(self, message), fields(model = %self.model))]
    pub async fn classify(&self, message: &str) -> ClassifiedIntent {
        match self.request_classification(message).await {
            Ok(classified) => {
                debug!(
                    label = %classified.raw_label,
                    confidence = ?classified.confidence,
                    "message classified"
                );
                classified
            }
            Err(e) => {
                warn!(error = %e, "classification failed, treating as unknown");
                ClassifiedIntent::unknown("CLASSIFIER_ERROR")
            }
        }
    }

    async fn request_classification(&self, message: &str) -> Result<ClassifiedIntent> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": CLASSIFY_PROMPT },
                { "role": "user", "content": message },
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.3,
            "max_tokens": 300,
        });

        let payload: Value = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::RequestFailed {
                operation: "classify".into(),
                reason: format!("completion request failed: {e}"),
            })?
            .error_for_status()
            .map_err(|e| AdapterError::RequestFailed {
                operation: "classify".into(),
                reason: format!("completion endpoint returned error: {e}"),
            })?
            .json()
            .await
            .map_err(|e| AdapterError::InvalidResponse {
                operation: "classify".into(),
                reason: format!("failed to parse completion response: {e}"),
            })?;

        parse_completion(&payload)
    }
}

/// Pull the intent JSON out of a chat completion response.
fn parse_completion(payload: &Value) -> Result<ClassifiedIntent> {
    let content = payload
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AdapterError::InvalidResponse {
            operation: "classify".into(),
            reason: "completion response carried no message content".into(),
        })?;

    let parsed: Value =
        serde_json::from_str(content.trim()).map_err(|e| AdapterError::InvalidResponse {
            operation: "classify".into(),
            reason: format!("model reply is not valid JSON: {e}"),
        })?;

    let raw_label = parsed
        .get("intent")
        .and_then(|v| v.as_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let confidence = parsed
        .get("confidence")
        .and_then(|v| v.as_f64())
        .map(|c| c as f32);
    let fields = parsed
        .get("fields")
        .map(ExtractedFields::from_value)
        .unwrap_or_default();

    Ok(ClassifiedIntent {
        intent: Intent::from_label(&raw_label),
        raw_label,
        confidence,
        fields,
    })
}

// ── tests ────────────────────────────────────────────────────────────
