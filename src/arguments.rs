/// Centralized argument handling for matchbot
///
/// This module consolidates all command-line argument parsing and debug flag
/// checking functionality used throughout the application.
///
/// Features:
/// - Centralized CMD_ARGS storage with thread-safe access
/// - Debug flag checking functions for all modules
/// - Unified argument parsing utilities
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
/// Thread-safe singleton that stores arguments for access throughout the application
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
/// Returns a vector clone to avoid holding the mutex lock
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => {
            // Fallback to env::args if mutex is poisoned
            env::args().collect()
        }
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
/// Returns None if the flag is not found or has no value
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// These functions check for specific debug flags in the command-line arguments
// =============================================================================

/// Monitor module debug mode
pub fn is_debug_monitor_enabled() -> bool {
    has_arg("--debug-monitor")
}

/// RPC pool and client debug mode
pub fn is_debug_rpc_enabled() -> bool {
    has_arg("--debug-rpc")
}

/// Filter scheduler debug mode
pub fn is_debug_filters_enabled() -> bool {
    has_arg("--debug-filters")
}

/// Deduplication cache debug mode
pub fn is_debug_dedup_enabled() -> bool {
    has_arg("--debug-dedup")
}

/// Event decoder debug mode
pub fn is_debug_decoder_enabled() -> bool {
    has_arg("--debug-decoder")
}

/// Database debug mode
pub fn is_debug_database_enabled() -> bool {
    has_arg("--debug-database")
}

/// Verbose mode (all modules, very detailed)
pub fn is_verbose_enabled() -> bool {
    has_arg("--verbose")
}

/// Quiet mode (errors only)
pub fn is_quiet_enabled() -> bool {
    has_arg("--quiet")
}

pub mod patterns {
    use super::has_arg;

    /// Check if help was requested via any common form
    pub fn is_help_requested() -> bool {
        has_arg("--help") || has_arg("-h") || has_arg("help")
    }
}

/// Print help text for the binary
pub fn print_help() {
    println!("matchbot - on-chain order match monitor");
    println!();
    println!("USAGE:");
    println!("  matchbot [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  --config <path>       Config file path (default: config.json)");
    println!("  --quiet               Errors only");
    println!("  --verbose             Very detailed trace output");
    println!("  --debug-monitor       Monitor pipeline diagnostics");
    println!("  --debug-rpc           RPC pool/client diagnostics");
    println!("  --debug-filters       Filter scheduler diagnostics");
    println!("  --debug-dedup         Dedup cache diagnostics");
    println!("  --debug-decoder       Event decoder diagnostics");
    println!("  --debug-database      Database diagnostics");
    println!("  -h, --help            Show this help");
}

/// Print active debug modes at startup, if any
pub fn print_debug_info() {
    let mut active = Vec::new();
    if is_debug_monitor_enabled() {
        active.push("monitor");
    }
    if is_debug_rpc_enabled() {
        active.push("rpc");
    }
    if is_debug_filters_enabled() {
        active.push("filters");
    }
    if is_debug_dedup_enabled() {
        active.push("dedup");
    }
    if is_debug_decoder_enabled() {
        active.push("decoder");
    }
    if is_debug_database_enabled() {
        active.push("database");
    }
    if !active.is_empty() {
        crate::logger::info(
            crate::logger::LogTag::System,
            &format!("Debug modes enabled: {}", active.join(", ")),
        );
    }
}
