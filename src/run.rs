// Process lifecycle: config, controller, chat transport, shutdown

use crate::{
    arguments,
    commands::CommandDispatcher,
    config::{self, Config},
    controller::BotController,
    logger::{self, LogTag},
    notifications::{LogNotifier, Notifier},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const TRANSPORT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Main bot execution function - runs until a shutdown signal arrives
pub async fn run_bot() -> Result<(), String> {
    // 1. Load config.toml + environment overrides
    config::load_config()?;
    let config = effective_config(config::get_config_clone());

    if config.auth.email.trim().is_empty() {
        logger::warning(
            LogTag::Config,
            "No platform email configured, /start will open the browser without logging in",
        );
    }

    // 2. Notification sink and optional chat transport
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let transport = build_transport(&config);
    let notifier: Arc<dyn Notifier> = match &transport {
        Some(t) => t.notifier.clone(),
        None => Arc::new(LogNotifier),
    };

    // 3. Controller + dispatcher
    let controller = Arc::new(BotController::from_config(config.clone(), notifier));
    let dispatcher = Arc::new(CommandDispatcher::new(
        controller.clone(),
        config.telegram.admin_ids.clone(),
    ));

    let polling = transport.map(|t| t.spawn_polling(dispatcher.clone(), shutdown_rx.clone()));
    if polling.is_none() {
        logger::info(
            LogTag::System,
            "No chat transport configured, running the session on its own",
        );
    }

    // 4. Autostart when requested, or when nobody could send /start
    if arguments::is_autostart_enabled() || polling.is_none() {
        match controller.start().await {
            Ok(reply) => logger::info(LogTag::System, &strip_html(&reply)),
            Err(e) => logger::error(LogTag::System, &format!("Autostart failed: {}", e)),
        }
    }

    // 5. Wait for shutdown signal
    wait_for_shutdown_signal().await?;

    // 6. Stop transport, trading loop and browser
    let _ = shutdown_tx.send(true);
    controller.shutdown().await;
    if let Some(handle) = polling {
        if tokio::time::timeout(TRANSPORT_STOP_TIMEOUT, handle).await.is_err() {
            logger::warning(LogTag::Telegram, "Chat transport did not stop in time");
        }
    }

    logger::info(LogTag::System, "TradePilot stopped");
    Ok(())
}

/// Config with command-line overrides applied
fn effective_config(mut config: Config) -> Config {
    if arguments::is_headful_forced() {
        logger::info(LogTag::Config, "CLI override: visible browser window");
        config.browser.headless = false;
    }
    if arguments::is_auto_trade_disabled() {
        logger::info(LogTag::Config, "CLI override: automatic trading disabled");
        config.trading.auto_trade = false;
    }
    config
}

/// Crude tag removal for logging HTML replies
fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            '\n' if !in_tag => out.push(' '),
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

struct Transport {
    notifier: Arc<dyn Notifier>,
    #[cfg(feature = "telegram")]
    bot: teloxide::Bot,
}

impl Transport {
    #[cfg(feature = "telegram")]
    fn spawn_polling(
        self,
        dispatcher: Arc<CommandDispatcher>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(crate::telegram::run_polling(self.bot, dispatcher, shutdown))
    }

    #[cfg(not(feature = "telegram"))]
    fn spawn_polling(
        self,
        _dispatcher: Arc<CommandDispatcher>,
        _shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async {})
    }
}

#[cfg(feature = "telegram")]
fn build_transport(config: &Config) -> Option<Transport> {
    if !config.telegram.enabled {
        logger::info(LogTag::Telegram, "Telegram disabled in config");
        return None;
    }
    match crate::telegram::TelegramNotifier::new(
        &config.telegram.bot_token,
        config.telegram.admin_ids.clone(),
    ) {
        Ok(notifier) => {
            let bot = notifier.bot();
            Some(Transport {
                notifier: Arc::new(notifier),
                bot,
            })
        }
        Err(e) => {
            logger::warning(LogTag::Telegram, &format!("Telegram not started: {}", e));
            None
        }
    }
}

#[cfg(not(feature = "telegram"))]
fn build_transport(_config: &Config) -> Option<Transport> {
    None
}

/// Wait for shutdown signal (Ctrl+C, SIGTERM, SIGHUP on Unix)
async fn wait_for_shutdown_signal() -> Result<(), String> {
    logger::info(LogTag::System, "Waiting for shutdown signal (Ctrl+C)");

    #[cfg(unix)]
    let signal_name = {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint =
            signal(SignalKind::interrupt()).map_err(|e| format!("Failed to bind SIGINT: {}", e))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| format!("Failed to bind SIGTERM: {}", e))?;
        let mut sighup =
            signal(SignalKind::hangup()).map_err(|e| format!("Failed to bind SIGHUP: {}", e))?;

        tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
            _ = sighup.recv() => "SIGHUP",
        }
    };

    #[cfg(not(unix))]
    let signal_name = {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| format!("Failed to listen for shutdown signal: {}", e))?;
        "CTRL_C"
    };

    logger::warning(
        LogTag::System,
        &format!("Shutdown signal received ({}), closing browser", signal_name),
    );
    Ok(())
}
