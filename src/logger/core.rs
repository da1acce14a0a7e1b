/// Core logging implementation with automatic filtering
use super::config::{ get_logger_config, is_debug_enabled_for_tag };
use super::levels::LogLevel;
use super::tags::LogTag;

/// Check if a log message should be displayed
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Check against minimum log level threshold
/// 3. Debug level requires --debug-<module> flag for that tag
/// 4. Verbose level requires --verbose
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    let config = get_logger_config();

    if level == LogLevel::Error {
        return true;
    }

    if level > config.min_level {
        return false;
    }

    if level == LogLevel::Debug {
        return is_debug_enabled_for_tag(tag) || config.min_level == LogLevel::Verbose;
    }

    if level == LogLevel::Verbose {
        return config.min_level == LogLevel::Verbose;
    }

    true
}

/// Internal logging entry point: filter, then format and write
pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(tag, level.as_str(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::config::{ set_logger_config, LoggerConfig };
    use std::collections::HashSet;

    // Single test because the logger config is a process-wide singleton
    #[test]
    fn filtering_rules_follow_level_and_module_flags() {
        set_logger_config(LoggerConfig {
            min_level: LogLevel::Error,
            debug_tags: HashSet::new(),
        });
        assert!(should_log(&LogTag::Rpc, LogLevel::Error));
        assert!(!should_log(&LogTag::Rpc, LogLevel::Info));

        let mut debug_tags = HashSet::new();
        debug_tags.insert("rpc".to_string());
        set_logger_config(LoggerConfig {
            min_level: LogLevel::Debug,
            debug_tags,
        });
        assert!(should_log(&LogTag::Rpc, LogLevel::Debug));
        assert!(!should_log(&LogTag::Dedup, LogLevel::Debug));
        assert!(should_log(&LogTag::Dedup, LogLevel::Info));

        set_logger_config(LoggerConfig::default());
    }
}
