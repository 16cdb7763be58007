//! Update polling and command replies
//!
//! Uses `getUpdates` long polling with a tracked offset. Each command runs on
//! its own task so a slow `/start` does not hold up `/status`; the commands
//! that touch the browser still queue on the session owner.

use crate::commands::{parse_message_text, CommandDispatcher};
use crate::logger::{self, LogTag};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, UpdateKind};
use tokio::sync::watch;

const POLL_TIMEOUT_SECS: u32 = 10;
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Poll until `shutdown` turns true
pub async fn run_polling(
    bot: Bot,
    dispatcher: Arc<CommandDispatcher>,
    mut shutdown: watch::Receiver<bool>,
) {
    match bot.get_me().await {
        Ok(me) => logger::info(
            LogTag::Telegram,
            &format!(
                "Bot connected: @{} (ID: {})",
                me.username.as_deref().unwrap_or("unknown"),
                me.id
            ),
        ),
        Err(e) => logger::warning(
            LogTag::Telegram,
            &format!("Could not validate bot token, polling anyway: {}", e),
        ),
    }

    let mut offset: i32 = 0;
    loop {
        if *shutdown.borrow() {
            break;
        }

        let mut request = bot.get_updates().timeout(POLL_TIMEOUT_SECS);
        if offset > 0 {
            request = request.offset(offset);
        }

        let updates = tokio::select! {
            result = request.send() => result,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        match updates {
            Ok(updates) => {
                for update in updates {
                    // Next offset acknowledges everything up to this update
                    offset = update.id.0 as i32 + 1;
                    if let UpdateKind::Message(message) = update.kind {
                        handle_message(&bot, &dispatcher, message);
                    }
                }
            }
            Err(e) => {
                logger::debug(
                    LogTag::Telegram,
                    &format!("Poll error (will retry): {}", e),
                );
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }

    logger::info(LogTag::Telegram, "Telegram polling stopped");
}

fn handle_message(bot: &Bot, dispatcher: &Arc<CommandDispatcher>, message: Message) {
    let Some(caller) = message.from.as_ref().map(|u| u.id.0 as i64) else {
        return;
    };
    let Some((name, args)) = message.text().and_then(parse_message_text) else {
        return;
    };

    let bot = bot.clone();
    let dispatcher = dispatcher.clone();
    let chat_id = message.chat.id;
    tokio::spawn(async move {
        let reply = dispatcher.handle(&name, &args, caller).await;
        if let Err(e) = bot
            .send_message(chat_id, reply)
            .parse_mode(ParseMode::Html)
            .await
        {
            logger::warning(
                LogTag::Telegram,
                &format!("Failed to reply to /{}: {}", name, e),
            );
        }
    });
}
