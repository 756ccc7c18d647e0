//! Shared helpers for the CLI: tracing setup and environment handling.

use anyhow::Result;
use baubot_adapters::IntentClassifier;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Honors `RUST_LOG` when set, otherwise uses `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Read an environment variable, treating empty values as unset.
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Build the intent classifier from the environment.
///
/// `GROQ_API_KEY` is required; `BAUBOT_API_BASE_URL` and `BAUBOT_MODEL`
/// override the Groq defaults.
pub fn resolve_classifier() -> Result<IntentClassifier> {
    let api_key = env_non_empty("GROQ_API_KEY").ok_or_else(|| {
        anyhow::anyhow!("GROQ_API_KEY is required. Get one at https://console.groq.com")
    })?;
    let base_url = env_non_empty("BAUBOT_API_BASE_URL");
    let model = env_non_empty("BAUBOT_MODEL");

    Ok(IntentClassifier::new(
        &api_key,
        base_url.as_deref(),
        model.as_deref(),
    )?)
}
