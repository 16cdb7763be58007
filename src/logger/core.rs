/// Core logging implementation with automatic filtering
///
/// Checks whether a message should be displayed based on level and tag,
/// then hands it to the format module.
use super::config::{get_logger_config, is_debug_enabled_for_tag, is_verbose_enabled_for_tag};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Check if a log message should be displayed
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Debug level requires --debug-<module> for that tag (suppressed by --quiet)
/// 3. Verbose level requires --verbose OR --verbose-<module> for that tag
/// 4. Other levels are checked against the minimum level threshold
/// 5. If enabled_tags is non-empty, tag must be in the set
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    let config = get_logger_config();

    if level == LogLevel::Error {
        return true;
    }

    if level == LogLevel::Debug {
        return config.min_level != LogLevel::Error && is_debug_enabled_for_tag(tag);
    }

    if level == LogLevel::Verbose {
        return config.min_level == LogLevel::Verbose || is_verbose_enabled_for_tag(tag);
    }

    if level > config.min_level {
        return false;
    }

    if !config.enabled_tags.is_empty() && !config.enabled_tags.contains(&tag.to_debug_key()) {
        return false;
    }

    true
}

/// Internal logging function with automatic filtering
pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(tag, level.as_str(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{set_logger_config, LoggerConfig};

    #[test]
    fn test_filtering_rules() {
        let mut config = LoggerConfig::default();
        config.debug_tags.insert("resolver".to_string());
        set_logger_config(config);

        assert!(should_log(&LogTag::Auth, LogLevel::Error));
        assert!(should_log(&LogTag::Auth, LogLevel::Info));
        assert!(should_log(&LogTag::Resolver, LogLevel::Debug));
        assert!(!should_log(&LogTag::Auth, LogLevel::Debug));
        assert!(!should_log(&LogTag::Resolver, LogLevel::Verbose));

        let mut quiet = LoggerConfig::default();
        quiet.min_level = LogLevel::Error;
        set_logger_config(quiet);
        assert!(!should_log(&LogTag::Trade, LogLevel::Warning));
        assert!(should_log(&LogTag::Trade, LogLevel::Error));

        set_logger_config(LoggerConfig::default());
    }
}
