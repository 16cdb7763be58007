//! Telegram notifier for sending notifications to admin chats

use crate::config::with_config;
use crate::logger::{self, LogTag};
use crate::notifications::{format_notification, Notification, Notifier};
use async_trait::async_trait;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, ParseMode};

pub struct TelegramNotifier {
    bot: Bot,
    recipients: Vec<i64>,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, recipients: Vec<i64>) -> Result<Self, String> {
        if bot_token.trim().is_empty() {
            return Err("Bot token is empty".to_string());
        }
        if recipients.is_empty() {
            return Err("No admin chat ids configured".to_string());
        }
        Ok(Self {
            bot: Bot::new(bot_token.trim()),
            recipients,
        })
    }

    /// Create a notifier from config
    pub fn from_config() -> Result<Self, String> {
        let config = with_config(|c| c.telegram.clone());
        Self::new(&config.bot_token, config.admin_ids)
    }

    /// Bot client shared with the polling task
    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    pub async fn send_message(&self, chat_id: i64, message: &str) -> Result<(), String> {
        self.bot
            .send_message(ChatId(chat_id), message)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| format!("Failed to send Telegram message: {}", e))?;

        logger::debug(
            LogTag::Telegram,
            &format!("Sent message to {} (length={})", chat_id, message.len()),
        );
        Ok(())
    }

    pub async fn send_photo(&self, chat_id: i64, path: &Path, caption: &str) -> Result<(), String> {
        self.bot
            .send_photo(ChatId(chat_id), InputFile::file(path.to_path_buf()))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| format!("Failed to send Telegram photo: {}", e))?;

        logger::debug(
            LogTag::Telegram,
            &format!("Sent photo {} to {}", path.display(), chat_id),
        );
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn recipients(&self) -> Vec<i64> {
        self.recipients.clone()
    }

    async fn send_to(&self, recipient: i64, notification: &Notification) -> Result<(), String> {
        let text = format_notification(notification);

        if let Some(path) = notification.screenshot().filter(|p| p.exists()) {
            match self.send_photo(recipient, path, &text).await {
                Ok(()) => return Ok(()),
                Err(e) => logger::warning(
                    LogTag::Telegram,
                    &format!("{}, sending text only", e),
                ),
            }
        }
        self.send_message(recipient, &text).await
    }
}
