/// Directory layout helpers
///
/// All runtime artifacts live under the working directory:
/// - data/  : SQLite databases
/// - logs/  : rotating log files
use std::path::PathBuf;

pub fn get_data_dir() -> PathBuf {
    PathBuf::from("data")
}

pub fn get_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

pub fn get_log_file_path() -> PathBuf {
    get_logs_dir().join("matchbot.log")
}

/// Create every directory the process writes into.
/// Must run before logger initialization so the log file can be created.
pub fn ensure_all_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_data_dir())?;
    std::fs::create_dir_all(get_logs_dir())?;
    Ok(())
}
