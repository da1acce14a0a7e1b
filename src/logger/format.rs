//! Log formatting and output with ANSI colors
//!
//! Handles:
//! - Colorized console output with tag and level formatting
//! - Dual output (console + file)
//! - Broken pipe handling for piped commands

use super::file::write_to_file;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{ stdout, ErrorKind, Write };

/// Log format widths for alignment
const TAG_WIDTH: usize = 9;
const LEVEL_WIDTH: usize = 7;

/// Format and output a log message
pub fn format_and_log(tag: LogTag, level: &str, message: &str) {
    let now = Local::now();
    let time = now.format("%H:%M:%S").to_string();

    let console_line = format!(
        "{} [{}] [{}] {}",
        time.dimmed(),
        format_tag(&tag),
        format_level(level),
        message
    );
    print_stdout_safe(&console_line);

    let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let file_line = format!(
        "{} [{:<tag_width$}] [{:<level_width$}] {}",
        timestamp,
        tag.to_plain_string(),
        level,
        message,
        tag_width = TAG_WIDTH,
        level_width = LEVEL_WIDTH
    );
    write_to_file(&file_line);
}

/// Format a tag with its subsystem color
fn format_tag(tag: &LogTag) -> ColoredString {
    let padded = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => padded.bright_yellow().bold(),
        LogTag::Monitor => padded.bright_cyan().bold(),
        LogTag::Rpc => padded.bright_blue().bold(),
        LogTag::Filter => padded.bright_magenta().bold(),
        LogTag::Dedup => padded.bright_green().bold(),
        LogTag::Decoder => padded.cyan().bold(),
        LogTag::Database => padded.bright_white().bold(),
        LogTag::Stats => padded.yellow().bold(),
    }
}

/// Format a level string with its severity color
fn format_level(level: &str) -> ColoredString {
    let padded = format!("{:<width$}", level, width = LEVEL_WIDTH);
    match level {
        "ERROR" => padded.bright_red().bold(),
        "WARNING" => padded.bright_yellow(),
        "INFO" => padded.bright_green(),
        "DEBUG" => padded.bright_blue(),
        "VERBOSE" => padded.dimmed(),
        _ => padded.normal(),
    }
}

/// Print to stdout, ignoring broken pipes (e.g. `matchbot | head`)
fn print_stdout_safe(line: &str) {
    let mut out = stdout().lock();
    if let Err(e) = writeln!(out, "{}", line) {
        if e.kind() != ErrorKind::BrokenPipe {
            eprintln!("logger: stdout write failed: {}", e);
        }
    }
}
