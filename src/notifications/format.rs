//! HTML rendering of notifications for chat transports

use super::types::{Notification, TradeOrigin};
use crate::trading::types::Settlement;

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn format_notification(notification: &Notification) -> String {
    match notification {
        Notification::TradePlaced {
            asset,
            direction,
            amount,
            price,
            origin,
            ..
        } => {
            let source = match origin {
                TradeOrigin::Operator => "Manual trade",
                TradeOrigin::Strategy => "Signal trade",
            };
            let mut text = format!(
                "📈 <b>{}</b>\n\n\
                 Asset: <code>{}</code>\n\
                 Direction: <b>{}</b>\n\
                 Amount: ${:.2}",
                source,
                escape_html(asset),
                direction,
                amount
            );
            if let Some(price) = price {
                text.push_str(&format!("\nPrice: {:.5}", price));
            }
            text.push_str("\n\n<i>Click sequence completed; not confirmed by the platform.</i>");
            text
        }
        Notification::TradeSettled {
            asset,
            direction,
            outcome,
            profit,
        } => {
            let (emoji, label) = match outcome {
                Settlement::Win => ("✅", "WIN"),
                Settlement::Loss => ("❌", "LOSS"),
                Settlement::Draw => ("➖", "DRAW"),
                Settlement::Overlapped => ("❔", "UNATTRIBUTED"),
            };
            let mut text = format!(
                "{} <b>Trade {}</b>\n\n\
                 Asset: <code>{}</code>\n\
                 Direction: {}\n\
                 Balance change: {:+.2}",
                emoji,
                label,
                escape_html(asset),
                direction,
                profit
            );
            match outcome {
                Settlement::Draw => {
                    text.push_str("\n\n<i>Balance unchanged; not counted in statistics.</i>")
                }
                Settlement::Overlapped => text.push_str(
                    "\n\n<i>A manual trade overlapped this one; not counted in statistics.</i>",
                ),
                Settlement::Win | Settlement::Loss => {}
            }
            text
        }
        Notification::TradingPaused { consecutive_losses } => format!(
            "⏸️ <b>Trading paused</b>\n\n{} losses in a row. Trading resumes after a win.",
            consecutive_losses
        ),
        Notification::SessionStarted { authenticated } => {
            if *authenticated {
                "🟢 <b>Bot started</b>\n\nLogged in successfully.".to_string()
            } else {
                "🟡 <b>Bot started</b>\n\nBrowser is up but login failed.".to_string()
            }
        }
        Notification::SessionStopped => "🔴 <b>Bot stopped</b>".to_string(),
    }
}
