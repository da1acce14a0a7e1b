/// File persistence for log output
use crate::paths::get_log_file_path;
use once_cell::sync::Lazy;
use std::fs::{ File, OpenOptions };
use std::io::Write;
use std::sync::Mutex;

static LOG_FILE: Lazy<Mutex<Option<File>>> = Lazy::new(|| Mutex::new(None));

/// Open (append) the log file. Failure is non-fatal: console logging
/// continues without a file mirror.
pub fn init_file_logging() {
    let path = get_log_file_path();
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            if let Ok(mut guard) = LOG_FILE.lock() {
                *guard = Some(file);
            }
        }
        Err(e) => {
            eprintln!("logger: could not open {}: {}", path.display(), e);
        }
    }
}

/// Append one line to the log file, if open
pub fn write_to_file(line: &str) {
    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(file) = guard.as_mut() {
            let _ = writeln!(file, "{}", line);
        }
    }
}

/// Flush pending writes during shutdown
pub fn flush_file_logging() {
    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(file) = guard.as_mut() {
            let _ = file.flush();
        }
    }
}
