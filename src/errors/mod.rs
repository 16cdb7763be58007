/// Error taxonomy for TradePilot
///
/// Every failure of the automation layer, the platform flows and the command
/// surface is a `BotError`. None of them terminate the process: the trading
/// loop and the command handlers turn them into a log line plus a user-facing
/// message.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Browser driver failed to start: {0}")]
    DriverInitFailed(String),

    #[error("Could not locate '{target}' (tried: {})", attempted.join(", "))]
    LocatorNotFound {
        target: String,
        attempted: Vec<String>,
    },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Anti-bot challenge still present after {seconds}s")]
    ChallengeTimeout { seconds: u64 },

    #[error("Could not parse '{text}' as a number")]
    ParseError { text: String },

    #[error("Trade submission failed: {0}")]
    TradeSubmissionFailed(String),

    #[error("Session is not authenticated")]
    NotAuthenticated,

    #[error("Browser session is closed")]
    SessionClosed,

    #[error("{0}")]
    InvalidCommand(String),

    #[error("WebDriver error: {0}")]
    Driver(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BotError {
    /// Errors worth retrying on the next loop cycle without operator action
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BotError::LocatorNotFound { .. }
                | BotError::ParseError { .. }
                | BotError::TradeSubmissionFailed(_)
                | BotError::Driver(_)
                | BotError::Io(_)
        )
    }

    /// Errors after which the session is unusable and `/start` must be re-issued
    pub fn requires_restart(&self) -> bool {
        matches!(
            self,
            BotError::DriverInitFailed(_) | BotError::SessionClosed | BotError::NotAuthenticated
        )
    }

    /// Short message suitable for a chat reply
    pub fn user_message(&self) -> String {
        match self {
            BotError::DriverInitFailed(_) => {
                "Failed to start the browser. Check the driver and try /start again.".to_string()
            }
            BotError::LocatorNotFound { target, .. } => {
                format!("Could not find the {} on the page.", target)
            }
            BotError::AuthenticationFailed(_) | BotError::ChallengeTimeout { .. } => {
                "Login failed. Check credentials and try /start again.".to_string()
            }
            BotError::ParseError { text } => format!("Unexpected value on page: '{}'", text),
            BotError::TradeSubmissionFailed(reason) => format!("Trade failed: {}", reason),
            BotError::NotAuthenticated => "Not logged in. Use /start first.".to_string(),
            BotError::SessionClosed => "Bot is not running. Use /start first.".to_string(),
            BotError::InvalidCommand(msg) => msg.clone(),
            other => format!("Error: {}", other),
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_not_found_lists_attempts() {
        let err = BotError::LocatorNotFound {
            target: "email field".to_string(),
            attempted: vec!["name=email".to_string(), "id=email".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Could not locate 'email field' (tried: name=email, id=email)"
        );
        assert!(err.is_recoverable());
        assert!(!err.requires_restart());
    }

    #[test]
    fn test_invalid_command_message_passes_through() {
        let err = BotError::InvalidCommand("Invalid amount".to_string());
        assert_eq!(err.user_message(), "Invalid amount");
    }

    #[test]
    fn test_session_errors_require_restart() {
        assert!(BotError::SessionClosed.requires_restart());
        assert!(BotError::DriverInitFailed("spawn".into()).requires_restart());
        assert!(!BotError::SessionClosed.is_recoverable());
    }
}
