//! Minimal Telegram Bot API client.
//!
//! Long-polls `getUpdates` for incoming messages and sends replies via
//! `sendMessage`. Delivery failures are logged and never retried — by
//! the time a confirmation goes out, the side effect has already
//! happened (or failed) independently of notification delivery.

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{AdapterError, Result};

/// Telegram's hard limit on message length.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Request timeout for non-polling calls.
const REQUEST_TIMEOUT_SECS: u64 = 8;

/// An incoming text message extracted from a Telegram update.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Chat to reply into.
    pub chat_id: i64,
    /// Numeric sender id.
    pub user_id: i64,
    /// Sender's first name, `Unbekannt` when missing.
    pub user_name: String,
    /// The message text.
    pub text: String,
}

/// One entry from a `getUpdates` response.
#[derive(Debug, Clone)]
pub struct TelegramUpdate {
    /// Monotonic update id — the next poll offset is `update_id + 1`.
    pub update_id: i64,
    /// The contained text message, if this update carries one.
    pub message: Option<IncomingMessage>,
}

/// Telegram Bot API client.
pub struct TelegramClient {
    api_base: String,
    /// Client for short calls (sendMessage, getMe).
    http: reqwest::Client,
    /// Client for long polling — timeout must exceed the poll window.
    poll_http: reqwest::Client,
}

impl TelegramClient {
    /// Create a client for the given bot token.
    ///
    /// `poll_timeout` is the long-poll window in seconds; the polling
    /// HTTP client's own timeout is set comfortably above it.
    pub fn new(bot_token: &str, poll_timeout: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        let poll_http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(poll_timeout + 10))
            .build()
            .unwrap_or_default();

        Self {
            api_base: format!("https://api.telegram.org/bot{bot_token}"),
            http,
            poll_http,
        }
    }

    /// Verify the bot token and return the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let payload: Value = self
            .http
            .get(format!("{}/getMe", self.api_base))
            .send()
            .await
            .map_err(|e| AdapterError::RequestFailed {
                operation: "telegram_get_me".into(),
                reason: format!("failed to reach Telegram API: {e}"),
            })?
            .json()
            .await
            .map_err(|e| AdapterError::InvalidResponse {
                operation: "telegram_get_me".into(),
                reason: format!("failed to parse getMe response: {e}"),
            })?;

        if payload.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            return Err(AdapterError::InvalidResponse {
                operation: "telegram_get_me".into(),
                reason: format!("getMe failed: {payload}"),
            });
        }

        Ok(payload
            .pointer("/result/username")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string())
    }

    /// Long-poll for updates starting at `offset`.
    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<TelegramUpdate>> {
        let payload: Value = self
            .poll_http
            .post(format!("{}/getUpdates", self.api_base))
            .json(&json!({
                "offset": offset,
                "timeout": timeout,
                "allowed_updates": ["message"],
            }))
            .send()
            .await
            .map_err(|e| AdapterError::RequestFailed {
                operation: "telegram_get_updates".into(),
                reason: format!("poll failed: {e}"),
            })?
            .json()
            .await
            .map_err(|e| AdapterError::InvalidResponse {
                operation: "telegram_get_updates".into(),
                reason: format!("failed to parse getUpdates response: {e}"),
            })?;

        let results = payload
            .get("result")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(results.iter().filter_map(parse_update).collect())
    }

    /// Send a Markdown-formatted message, splitting it when it exceeds
    /// Telegram's length limit.
    ///
    /// Returns `false` (after logging) on delivery failure; callers do
    /// not retry.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> bool {
        for chunk in split_message(text, TELEGRAM_MESSAGE_LIMIT) {
            let result = self
                .http
                .post(format!("{}/sendMessage", self.api_base))
                .json(&json!({
                    "chat_id": chat_id,
                    "text": chunk,
                    "parse_mode": "Markdown",
                }))
                .send()
                .await;

            match result {
                Ok(response) => {
                    let ok = response
                        .json::<Value>()
                        .await
                        .ok()
                        .and_then(|v| v.get("ok").and_then(|o| o.as_bool()))
                        .unwrap_or(false);
                    if !ok {
                        warn!(chat_id, "Telegram rejected sendMessage");
                        return false;
                    }
                }
                Err(e) => {
                    warn!(chat_id, error = %e, "failed to deliver Telegram message");
                    return false;
                }
            }
        }

        debug!(chat_id, len = text.len(), "Telegram message delivered");
        true
    }
}

/// Extract the update id and text message (if any) from a raw update.
fn parse_update(update: &Value) -> Option<TelegramUpdate> {
    let update_id = update.get("update_id").and_then(|v| v.as_i64())?;

    let message = update.get("message").and_then(|message| {
        let text = message.get("text").and_then(|v| v.as_str())?;
        let chat_id = message.pointer("/chat/id").and_then(|v| v.as_i64())?;
        let user_id = message
            .pointer("/from/id")
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        let user_name = message
            .pointer("/from/first_name")
            .and_then(|v| v.as_str())
            .unwrap_or("Unbekannt")
            .to_string();

        Some(IncomingMessage {
            chat_id,
            user_id,
            user_name,
            text: text.to_string(),
        })
    });

    Some(TelegramUpdate { update_id, message })
}

/// Split `text` into chunks of at most `limit` characters, preferring
/// line boundaries.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if current.chars().count() + line.chars().count() > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        // A single line longer than the limit is split hard.
        if line.chars().count() > limit {
            let mut buf = String::new();
            for ch in line.chars() {
                if buf.chars().count() == limit {
                    chunks.push(std::mem::take(&mut buf));
                }
                buf.push(ch);
            }
            current.push_str(&buf);
        } else {
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_update_extracts_message_fields() {
        let update = json!({
            "update_id": 42,
            "message": {
                "text": "3h auf Projekt 25-001",
                "chat": { "id": 1001 },
                "from": { "id": 7, "first_name": "Marcel" }
            }
        });

        let parsed = parse_update(&update).unwrap();
        assert_eq!(parsed.update_id, 42);
        let message = parsed.message.unwrap();
        assert_eq!(message.chat_id, 1001);
        assert_eq!(message.user_id, 7);
        assert_eq!(message.user_name, "Marcel");
        assert_eq!(message.text, "3h auf Projekt 25-001");
    }

    #[test]
    fn non_text_update_keeps_offset_but_no_message() {
        let update = json!({
            "update_id": 43,
            "message": { "chat": { "id": 1001 }, "photo": [] }
        });

        let parsed = parse_update(&update).unwrap();
        assert_eq!(parsed.update_id, 43);
        assert!(parsed.message.is_none());
    }

    #[test]
    fn short_message_is_not_split() {
        let chunks = split_message("hallo", 4096);
        assert_eq!(chunks, vec!["hallo".to_string()]);
    }

    #[test]
    fn long_message_splits_on_line_boundaries() {
        let text = format!("{}\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = split_message(&text, 40);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with('a'));
        assert!(chunks[1].starts_with('b'));
    }

    #[test]
    fn oversized_single_line_is_split_hard() {
        let text = "x".repeat(100);
        let chunks = split_message(&text, 40);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
    }
}
