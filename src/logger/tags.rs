/// Log tags identify the subsystem a message comes from.
///
/// Each tag maps to a `--debug-<key>` command-line flag.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Browser,
    Resolver,
    Auth,
    Market,
    Trade,
    Strategy,
    Risk,
    Loop,
    Commands,
    Telegram,
    Test,
    Other(String),
}

impl LogTag {
    /// Key used in `--debug-<key>` / `--verbose-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Browser => "browser".to_string(),
            LogTag::Resolver => "resolver".to_string(),
            LogTag::Auth => "auth".to_string(),
            LogTag::Market => "market".to_string(),
            LogTag::Trade => "trade".to_string(),
            LogTag::Strategy => "strategy".to_string(),
            LogTag::Risk => "risk".to_string(),
            LogTag::Loop => "loop".to_string(),
            LogTag::Commands => "commands".to_string(),
            LogTag::Telegram => "telegram".to_string(),
            LogTag::Test => "test".to_string(),
            LogTag::Other(s) => s.to_lowercase(),
        }
    }

    /// Uncolored label written to the log file
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::Other(s) => s.to_uppercase(),
            other => other.to_debug_key().to_uppercase(),
        }
    }

    /// All fixed tags, used for `--debug-all`
    pub fn all_keys() -> &'static [&'static str] {
        &[
            "system", "config", "browser", "resolver", "auth", "market", "trade", "strategy",
            "risk", "loop", "commands", "telegram", "test",
        ]
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
