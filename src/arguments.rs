/// Centralized argument handling for TradePilot
///
/// Stores the process arguments once so that the logger, config loader and
/// binaries all read the same view (tests override it with `set_cmd_args`).
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

/// `--help` / `-h`
pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

/// `--config <path>` overrides the default config location
pub fn get_config_path_override() -> Option<String> {
    get_arg_value("--config")
}

/// `--headful` forces a visible browser regardless of config
pub fn is_headful_forced() -> bool {
    has_arg("--headful")
}

/// `--no-auto-trade` keeps the decision loop off after /start
pub fn is_auto_trade_disabled() -> bool {
    has_arg("--no-auto-trade")
}

/// `--autostart` runs /start at boot without waiting for a chat command
pub fn is_autostart_enabled() -> bool {
    has_arg("--autostart")
}

/// Debug modes requested on the command line, without the `--debug-` prefix
pub fn get_enabled_debug_modes() -> Vec<String> {
    get_cmd_args()
        .iter()
        .filter_map(|a| a.strip_prefix("--debug-").map(|s| s.to_string()))
        .collect()
}

pub fn print_help() {
    println!("TradePilot - browser-driven trading assistant");
    println!();
    println!("USAGE:");
    println!("    tradepilot [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <path>      Use a specific config.toml");
    println!("    --headful            Show the browser window");
    println!("    --no-auto-trade      Do not start the decision loop after /start");
    println!("    --autostart          Run /start immediately instead of waiting for a command");
    println!("    --debug-<module>     Debug logs for a module (browser, resolver, auth, market,");
    println!("                         trade, strategy, risk, loop, commands, telegram)");
    println!("    --debug-all          Debug logs for every module");
    println!("    --verbose            Everything, including dependency logs");
    println!("    --quiet              Errors only");
    println!("    --no-log-file        Console output only");
    println!("    -h, --help           Print this help");
}
