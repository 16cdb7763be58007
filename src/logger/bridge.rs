//! Bridge from the `log` facade into the tag logger
//!
//! fantoccini, hyper and teloxide report through `log`; their records are
//! tagged with the crate name and run through the same filtering rules.

use super::levels::LogLevel;
use super::tags::LogTag;

struct Bridge;

impl log::Log for Bridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        // Dependency chatter below warning level only with --verbose
        metadata.level() <= log::Level::Warn
            || super::get_logger_config().min_level == LogLevel::Verbose
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let target = record.target().split("::").next().unwrap_or("dep");
        super::core::log_internal(
            LogTag::Other(target.to_string()),
            LogLevel::from_log_level(record.level()),
            &record.args().to_string(),
        );
    }

    fn flush(&self) {
        super::file::flush_file_logging();
    }
}

static BRIDGE: Bridge = Bridge;

pub fn install() {
    if log::set_logger(&BRIDGE).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
}
