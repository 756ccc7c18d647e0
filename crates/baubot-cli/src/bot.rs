//! Subcommand: `baubot bot` -- Telegram bot gateway.
//!
//! Polls Telegram for incoming messages, classifies each one with the
//! LLM, routes it through the dispatcher, and sends the workflow's
//! reply back. The polling offset is persisted so a restart never
//! replays already-handled messages.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use baubot_adapters::{
    CaldavCalendar, ClassifiedIntent, DriveStorage, ExtractedFields, Intent, TelegramClient,
};
use baubot_core::{AssistantConfig, Dispatcher, SenderContext, Workflows};
use baubot_store::BotStateStore;

use crate::helpers::{env_non_empty, init_tracing, resolve_classifier};

/// Key under which the Telegram polling offset is persisted.
const OFFSET_STATE_KEY: &str = "telegram_offset";

/// Run the Telegram bot gateway.
pub async fn cmd_bot(poll_timeout: u64, allowed_users: Option<String>) -> Result<()> {
    init_tracing("info");
    info!("starting Telegram bot gateway");

    // Parse allowed user ids (if provided).
    let allowed_user_ids: Option<Vec<i64>> = allowed_users.map(|s| {
        s.split(',')
            .filter_map(|id| id.trim().parse::<i64>().ok())
            .collect()
    });

    // Resolve and verify the Telegram bot token.
    let bot_token = env_non_empty("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
        anyhow::anyhow!("TELEGRAM_BOT_TOKEN is required. Create a bot at https://t.me/BotFather")
    })?;
    let telegram = TelegramClient::new(&bot_token, poll_timeout);
    let bot_name = telegram
        .get_me()
        .await
        .context("Telegram token verification failed")?;

    // Database.
    let data_dir = Path::new("data");
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir).context("failed to create data directory")?;
    }
    let db_path = data_dir.join("baubot.db");
    let db = baubot_store::Database::open_and_migrate(db_path.clone())
        .await
        .context("failed to open database")?;
    info!(path = %db_path.display(), "store initialized");

    // Classifier and collaborators.
    let classifier = resolve_classifier()?;

    let drive_token = env_non_empty("GOOGLE_DRIVE_TOKEN").unwrap_or_default();
    if drive_token.is_empty() {
        warn!("GOOGLE_DRIVE_TOKEN not set, project folder creation will fail");
    }
    let storage = Arc::new(DriveStorage::new(drive_token));

    let calendar = Arc::new(match env_non_empty("CALDAV_URL") {
        Some(url) => CaldavCalendar::new(
            url,
            env_non_empty("CALDAV_USERNAME").unwrap_or_default(),
            env_non_empty("CALDAV_PASSWORD").unwrap_or_default(),
        ),
        None => {
            warn!("CALDAV_URL not set, calendar workflows will report a missing calendar");
            CaldavCalendar::unconfigured()
        }
    });

    let mut config = AssistantConfig::load("config/default.toml")
        .map_err(|e| anyhow::anyhow!("failed to load config: {e}"))?;
    if config.storage_root_folder_id.is_none() {
        config.storage_root_folder_id = env_non_empty("GOOGLE_DRIVE_ROOT_FOLDER");
    }

    let workflows = Workflows::new(db.clone(), config, storage, calendar)
        .map_err(|e| anyhow::anyhow!("failed to wire workflows: {e}"))?;
    let dispatcher = Dispatcher::new(workflows);
    let bot_state = BotStateStore::new(db);

    // Print banner.
    println!();
    println!("  Baubot Telegram Gateway v{}", env!("CARGO_PKG_VERSION"));
    println!("  Bot: @{bot_name}");
    if let Some(ref ids) = allowed_user_ids {
        println!("  Allowed users: {ids:?}");
    } else {
        println!("  Allowed users: everyone");
    }
    println!("  Long-poll timeout: {poll_timeout}s");
    println!();
    println!("  Bot is running. Send messages to @{bot_name} on Telegram.");
    println!("  Press Ctrl+C to stop.");
    println!();

    // Polling loop -- restore offset from persistent state.
    let mut offset: i64 = bot_state
        .get_i64(OFFSET_STATE_KEY)
        .await
        .unwrap_or(None)
        .unwrap_or(0);
    if offset > 0 {
        info!(offset, "restored Telegram polling offset from database");
    }

    loop {
        let updates = match telegram.get_updates(offset, poll_timeout).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "Telegram poll failed, retrying...");
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(message) = update.message else {
                continue;
            };

            // Access control.
            if let Some(ref ids) = allowed_user_ids
                && !ids.contains(&message.user_id)
            {
                warn!(user_id = message.user_id, "message from disallowed user ignored");
                continue;
            }

            info!(
                chat_id = message.chat_id,
                user = %message.user_name,
                "message received"
            );

            let sender = SenderContext {
                user_id: message.user_id,
                user_name: message.user_name.clone(),
            };

            // /start gets the capability summary without an LLM call.
            let classified = if message.text.trim() == "/start" {
                ClassifiedIntent {
                    intent: Intent::Help,
                    raw_label: "HELP".into(),
                    confidence: None,
                    fields: ExtractedFields::default(),
                }
            } else {
                // Receipt acknowledgment before the (slow) classification.
                telegram
                    .send_message(
                        message.chat_id,
                        &format!(
                            "🤖 **Nachricht empfangen!**\n\n💬 _{}_\n\n🔄 Analysiere...",
                            message.text
                        ),
                    )
                    .await;
                classifier.classify(&message.text).await
            };

            if classified.intent == Intent::CreateProject {
                telegram
                    .send_message(
                        message.chat_id,
                        "🏗️ **Projekt wird erstellt...**\n\n🔧 Erstelle Ordnerstruktur...",
                    )
                    .await;
            }

            let result = dispatcher.dispatch(classified, &sender).await;

            // Delivery failures are logged inside the client, not retried.
            telegram.send_message(message.chat_id, &result.message).await;
        }

        if let Err(e) = bot_state.set_i64(OFFSET_STATE_KEY, offset).await {
            warn!(error = %e, "failed to persist polling offset");
        }
    }
}
