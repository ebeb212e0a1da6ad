#![deny(missing_docs)]
//! Shared logging utilities for the pagechat workspace.
//!
//! This crate provides the `session_*` logging macros used across the
//! codebase, the process-wide logger initialization, and a minimal test
//! initializer for the global logger.

use std::cell::Cell;
use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

thread_local! {
    /// Thread-local storage for the current conversation turn number.
    static TURN: Cell<u64> = const { Cell::new(0) };
}

/// Sets the conversation turn number for the current thread.
/// The conversation driver bumps this once per model request.
pub fn set_turn(turn: u64) {
    TURN.with(|v| v.set(turn));
}

/// Retrieves the conversation turn number for the current thread.
/// Returns 0 before the first model request.
pub fn current_turn() -> u64 {
    TURN.with(|v| v.get())
}

/// Logs a trace-level message tagged with the current turn.
#[macro_export]
macro_rules! session_trace {
    ($($arg:tt)*) => {{
        log::trace!("[turn {}] {}", $crate::current_turn(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the current turn.
#[macro_export]
macro_rules! session_info {
    ($($arg:tt)*) => {{
        log::info!("[turn {}] {}", $crate::current_turn(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the current turn.
#[macro_export]
macro_rules! session_debug {
    ($($arg:tt)*) => {{
        log::debug!("[turn {}] {}", $crate::current_turn(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the current turn.
#[macro_export]
macro_rules! session_warn {
    ($($arg:tt)*) => {{
        log::warn!("[turn {}] {}", $crate::current_turn(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the current turn.
#[macro_export]
macro_rules! session_error {
    ($($arg:tt)*) => {{
        log::error!("[turn {}] {}", $crate::current_turn(), format_args!($($arg)*));
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to ./pagechat.log in current directory.
    File,
    /// Write to the terminal on stderr, keeping stdout for the conversation.
    Terminal,
    /// Write to both file and terminal.
    Both,
}

const LOG_FILE: &str = "./pagechat.log";

/// Initialize the process-wide logger with the specified destination.
///
/// For `LogDestination::File` or `Both`, creates `./pagechat.log` in the
/// current working directory. Calling this twice is a no-op.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File => match create_file_logger(level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => vec![stderr_logger(level, config)],
        LogDestination::Both => {
            let mut loggers = vec![stderr_logger(level, config.clone())];
            if let Some(file_logger) = create_file_logger(level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn stderr_logger(level: LevelFilter, config: Config) -> Box<dyn SharedLogger> {
    TermLogger::new(level, config, TerminalMode::Stderr, ColorChoice::Auto)
}

fn create_file_logger(level: LevelFilter, config: Config) -> Option<Box<dyn SharedLogger>> {
    let log_path = PathBuf::from(LOG_FILE);
    match File::create(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file) as Box<dyn SharedLogger>),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{current_turn, set_turn};

    #[test]
    fn turn_counter_is_per_thread() {
        set_turn(3);
        assert_eq!(current_turn(), 3);
        let other = std::thread::spawn(current_turn).join().unwrap();
        assert_eq!(other, 0);
    }
}
