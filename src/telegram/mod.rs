//! Telegram chat transport
//!
//! A thin adapter around the command dispatcher and the notifier trait:
//!
//! - `polling`: long-polls updates, hands `/command args` to the dispatcher
//!   and replies with its HTML text
//! - `notifier`: `Notifier` implementation sending notifications to every
//!   admin chat, with the trade screenshot attached when there is one

pub mod notifier;
pub mod polling;

pub use notifier::TelegramNotifier;
pub use polling::run_polling;
