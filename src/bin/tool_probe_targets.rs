/// Locator Catalog Probe Tool
///
/// Opens a page in a real browser session and reports, for every catalog
/// target, which fallback strategy matched. Useful after the platform ships
/// a UI change.
///
/// Usage: cargo run --bin tool_probe_targets -- --url https://quotex.com/sign-in [--target "email field"] [--headful] [--screenshot page.png]
use clap::{Arg, ArgAction, Command};
use colored::*;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tradepilot::browser::{ElementResolver, HumanPacing, LocatorTarget, SessionManager};
use tradepilot::config::{self, with_config};
use tradepilot::logger::{self, LogTag};
use tradepilot::platform::targets::{all_targets, find_target};

fn build_cli() -> Command {
    Command::new("Locator Catalog Probe")
        .version("1.0")
        .about("Check which locator strategy finds each platform element")
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("Page to open (defaults to the platform login page)"),
        )
        .arg(
            Arg::new("target")
                .short('t')
                .long("target")
                .value_name("NAME")
                .help("Probe a single target, e.g. \"balance indicator\""),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECS")
                .help("Resolve timeout per target")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Use a specific config.toml"),
        )
        .arg(
            Arg::new("headful")
                .long("headful")
                .help("Show the browser window")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("screenshot")
                .long("screenshot")
                .value_name("PATH")
                .help("Save a screenshot of the page to PATH after probing")
                .value_parser(clap::value_parser!(PathBuf)),
        )
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    if let Err(e) = tradepilot::paths::ensure_all_directories() {
        eprintln!("Failed to create directories: {}", e);
        process::exit(1);
    }
    logger::init();

    let loaded = match matches.get_one::<String>("config") {
        Some(path) => config::load_config_from_path(std::path::Path::new(path)),
        None => config::load_config(),
    };
    if let Err(e) = loaded {
        logger::error(LogTag::Config, &e);
        process::exit(1);
    }

    let targets: Vec<&'static LocatorTarget> = match matches.get_one::<String>("target") {
        Some(name) => match find_target(name) {
            Some(target) => vec![target],
            None => {
                eprintln!("{} unknown target '{}'", "error:".red().bold(), name);
                eprintln!("Known targets:");
                for target in all_targets() {
                    eprintln!("  {}", target.name());
                }
                process::exit(2);
            }
        },
        None => all_targets(),
    };

    let mut browser = with_config(|c| c.browser.clone());
    if matches.get_flag("headful") {
        browser.headless = false;
    }
    let url = matches
        .get_one::<String>("url")
        .cloned()
        .unwrap_or_else(|| with_config(|c| c.platform.login_url()));
    let timeout = Duration::from_secs(*matches.get_one::<u64>("timeout").unwrap_or(&5));

    let mut session = match SessionManager::webdriver()
        .initialize(&browser, HumanPacing::disabled())
        .await
    {
        Ok(session) => session,
        Err(e) => {
            logger::error(LogTag::Browser, &e.to_string());
            process::exit(1);
        }
    };

    if let Err(e) = session.goto(&url).await {
        logger::error(LogTag::Browser, &format!("Failed to open {}: {}", url, e));
        SessionManager::close(Some(&mut session)).await;
        process::exit(1);
    }

    println!("\n{} {}\n", "Probing".bold(), url.cyan());
    let resolver = ElementResolver::default();
    let mut missing = 0;
    for target in &targets {
        match resolver.resolve(&session, target, timeout).await {
            Ok(found) => println!(
                "  {} {:<20} strategy {}/{}  {}",
                "✔".green(),
                target.name(),
                found.strategy_index + 1,
                target.strategies().len(),
                found.strategy.dimmed()
            ),
            Err(e) => {
                missing += 1;
                println!("  {} {:<20} {}", "✘".red(), target.name(), e.to_string().dimmed());
            }
        }
    }
    println!(
        "\n{} found, {} missing\n",
        (targets.len() - missing).to_string().green(),
        missing.to_string().red()
    );

    if let Some(path) = matches.get_one::<PathBuf>("screenshot") {
        match session.save_screenshot(path).await {
            Ok(()) => println!("Screenshot: {}", path.display()),
            Err(e) => logger::warning(LogTag::Browser, &format!("Screenshot failed: {}", e)),
        }
    }

    SessionManager::close(Some(&mut session)).await;
    logger::flush();
}
