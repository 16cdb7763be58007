//! Operator command surface
//!
//! Transport-independent: a chat adapter hands over `(command, args, caller)`
//! and sends back the returned HTML text. Validation happens here, before
//! anything reaches the controller or the browser.

use crate::controller::BotController;
use crate::errors::{BotError, BotResult};
use crate::logger::{self, LogTag};
use crate::notifications::escape_html;
use crate::platform::Direction;
use std::sync::Arc;

pub const NOT_AUTHORIZED: &str = "Sorry, you are not authorized to use this bot.";
pub const TRADE_USAGE: &str =
    "Please provide asset and direction. Example: /trade EURUSD call 1.0";
pub const DEFAULT_TRADE_AMOUNT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Status,
    Balance,
    Trade {
        asset: String,
        direction: Direction,
        amount: f64,
    },
    Stop,
    Help,
    Stats,
    Demo,
}

impl Command {
    /// Validate a command name and its arguments
    pub fn parse(name: &str, args: &[String]) -> BotResult<Self> {
        match name.trim_start_matches('/').to_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "status" => Ok(Command::Status),
            "balance" => Ok(Command::Balance),
            "trade" => parse_trade(args),
            "stop" => Ok(Command::Stop),
            "help" => Ok(Command::Help),
            "stats" => Ok(Command::Stats),
            "demo" => Ok(Command::Demo),
            other => Err(BotError::InvalidCommand(format!(
                "Unknown command /{}. Use /help to see available commands.",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Status => "status",
            Command::Balance => "balance",
            Command::Trade { .. } => "trade",
            Command::Stop => "stop",
            Command::Help => "help",
            Command::Stats => "stats",
            Command::Demo => "demo",
        }
    }
}

fn parse_trade(args: &[String]) -> BotResult<Command> {
    let (asset, direction) = match args {
        [asset, direction, ..] => (asset.trim(), direction),
        _ => return Err(BotError::InvalidCommand(TRADE_USAGE.to_string())),
    };
    if asset.is_empty() {
        return Err(BotError::InvalidCommand(TRADE_USAGE.to_string()));
    }
    let direction = Direction::parse(direction)?;

    let amount = match args.get(2) {
        None => DEFAULT_TRADE_AMOUNT,
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 => value,
            _ => {
                return Err(BotError::InvalidCommand(format!(
                    "Invalid amount '{}'. Amount must be a positive number.",
                    raw
                )))
            }
        },
    };

    Ok(Command::Trade {
        asset: asset.to_uppercase(),
        direction,
        amount,
    })
}

/// `"/trade@MyBot EURUSD call"` → `("trade", ["EURUSD", "call"])`
pub fn parse_message_text(text: &str) -> Option<(String, Vec<String>)> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?.strip_prefix('/')?;
    let name = head.split('@').next().unwrap_or(head).to_lowercase();
    if name.is_empty() {
        return None;
    }
    Some((name, parts.map(|s| s.to_string()).collect()))
}

pub struct CommandDispatcher {
    controller: Arc<BotController>,
    admins: Vec<i64>,
}

impl CommandDispatcher {
    pub fn new(controller: Arc<BotController>, admins: Vec<i64>) -> Self {
        if admins.is_empty() {
            logger::warning(
                LogTag::Commands,
                "No admin ids configured, every command will be refused",
            );
        }
        Self { controller, admins }
    }

    pub fn is_admin(&self, caller: i64) -> bool {
        self.admins.contains(&caller)
    }

    pub fn controller(&self) -> &Arc<BotController> {
        &self.controller
    }

    /// Run one command and return the reply text
    pub async fn handle(&self, name: &str, args: &[String], caller: i64) -> String {
        logger::info(
            LogTag::Commands,
            &format!("/{} from {} (args: {})", name, caller, args.len()),
        );

        if !self.is_admin(caller) {
            logger::warning(
                LogTag::Commands,
                &format!("Refused /{} from non-admin {}", name, caller),
            );
            return NOT_AUTHORIZED.to_string();
        }

        let command = match Command::parse(name, args) {
            Ok(command) => command,
            Err(e) => return format!("❌ {}", escape_html(&e.user_message())),
        };

        match self.execute(&command).await {
            Ok(reply) => reply,
            Err(e) => {
                logger::error(
                    LogTag::Commands,
                    &format!("/{} failed: {}", command.name(), e),
                );
                format!("❌ {}", escape_html(&e.user_message()))
            }
        }
    }

    async fn execute(&self, command: &Command) -> BotResult<String> {
        match command {
            Command::Start => self.controller.start().await,
            Command::Status => Ok(self.controller.status().await),
            Command::Balance => self.controller.balance().await,
            Command::Trade {
                asset,
                direction,
                amount,
            } => self.controller.trade(asset, *direction, *amount).await,
            Command::Stop => Ok(self.controller.stop().await),
            Command::Help => Ok(self.controller.help()),
            Command::Stats => Ok(self.controller.stats()),
            Command::Demo => self.controller.demo().await,
        }
    }
}
