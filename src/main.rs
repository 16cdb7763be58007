use tradepilot::{
    arguments::{get_enabled_debug_modes, is_help_requested, print_help},
    logger::{self as logger, LogTag},
};

/// Main entry point for TradePilot
///
/// Starts the chat transport and waits for operator commands; without a
/// configured transport the session is started right away.
#[tokio::main]
async fn main() {
    if is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    // Logger needs the logs directory to create its file
    if let Err(e) = tradepilot::paths::ensure_all_directories() {
        eprintln!("❌ Failed to create required directories: {}", e);
        std::process::exit(1);
    }

    logger::init();
    logger::info(LogTag::System, "🚀 TradePilot starting up...");

    let debug_modes = get_enabled_debug_modes();
    if !debug_modes.is_empty() {
        logger::info(
            LogTag::System,
            &format!("Debug modes: {}", debug_modes.join(", ")),
        );
    }

    let result = tradepilot::run::run_bot().await;
    if let Err(e) = &result {
        logger::error(LogTag::System, &format!("❌ TradePilot failed: {}", e));
    }
    logger::flush();

    if result.is_err() {
        std::process::exit(1);
    }
}
