//! Inbound Telegram listener. Binds the alert recipient through a one-time code
//! and otherwise shares nothing with the monitor loop but the config store.

use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::ConfigStore;
use crate::error::Result;
use crate::notify::{TelegramClient, Update};

const LONG_POLL: Duration = Duration::from_secs(30);
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

pub const REPLY_MISSING_CODE: &str = "Please provide the 6-digit auth code: /start <CODE>";
pub const REPLY_BOUND: &str = "✅ Talon Ghost Auth successful. Your Chat ID is now bound for alerts.";
pub const REPLY_REJECTED: &str = "❌ Invalid or expired auth code.";

/// Returns the reply for one inbound text, or `None` if it is not a command we handle.
pub fn handle_text(store: &ConfigStore, chat_id: i64, text: &str) -> Result<Option<&'static str>> {
    let mut words = text.split_whitespace();
    let command = match words.next() {
        Some(word) => word,
        None => return Ok(None),
    };
    // Group chats address commands as /start@BotName.
    if command.split('@').next() != Some("/start") {
        return Ok(None);
    }

    let code = match words.next() {
        Some(code) => code,
        None => return Ok(Some(REPLY_MISSING_CODE)),
    };

    if store.bind_recipient(code, chat_id)? {
        info!("Chat {} bound as alert recipient", chat_id);
        Ok(Some(REPLY_BOUND))
    } else {
        warn!("Rejected auth code from chat {}", chat_id);
        Ok(Some(REPLY_REJECTED))
    }
}

async fn handle_update(client: &TelegramClient, store: &ConfigStore, update: &Update) {
    let Some(message) = &update.message else { return };
    let Some(text) = message.text.as_deref() else { return };

    match handle_text(store, message.chat.id, text) {
        Ok(Some(reply)) => {
            if let Err(e) = client.send_message(message.chat.id, reply).await {
                warn!("Failed to reply to chat {}: {}", message.chat.id, e);
            }
        }
        Ok(None) => {}
        Err(e) => error!("Failed to process command from chat {}: {}", message.chat.id, e),
    }
}

/// Runs until the task is dropped.
pub async fn run(client: TelegramClient, store: ConfigStore) {
    info!("Telegram listener active");
    let mut offset = 0;

    loop {
        match client.get_updates(offset, LONG_POLL).await {
            Ok(updates) => {
                for update in &updates {
                    offset = offset.max(update.update_id + 1);
                    handle_update(&client, &store, update).await;
                }
            }
            Err(e) => {
                warn!("Telegram poll failed: {}; retrying in {:?}", e, RETRY_BACKOFF);
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join(CONFIG_FILE))
    }

    #[test]
    fn ignores_other_text() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_eq!(handle_text(&store, 1, "hello").unwrap(), None);
        assert_eq!(handle_text(&store, 1, "   ").unwrap(), None);
        assert_eq!(handle_text(&store, 1, "/status").unwrap(), None);
    }

    #[test]
    fn start_without_code_asks_for_one() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_eq!(handle_text(&store, 1, "/start").unwrap(), Some(REPLY_MISSING_CODE));
    }

    #[test]
    fn wrong_code_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.set_otp().unwrap();
        assert_eq!(handle_text(&store, 1, "/start nope").unwrap(), Some(REPLY_REJECTED));
        assert_eq!(store.load().unwrap().chat_id, None);
    }

    #[test]
    fn matching_code_binds_chat() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let otp = store.set_otp().unwrap();
        let text = format!("/start@TalonBot {}", otp);
        assert_eq!(handle_text(&store, 555, &text).unwrap(), Some(REPLY_BOUND));
        assert_eq!(store.load().unwrap().chat_id, Some(555));
    }
}
