// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fs::{self, File};
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{atomic::AtomicBool, atomic::Ordering};

use log::{LevelFilter, Log, Metadata, Record};

#[doc(hidden)]
pub use log as _log;

#[macro_export]
macro_rules! info {
    ($msg:literal, $($arg:tt)+) => {
        converter_log::_log::info!(target: concat!("measurement_plugin_converter::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        converter_log::_log::info!(target: concat!("measurement_plugin_converter::", module_path!()), $msg);
    };
}

#[macro_export]
macro_rules! warn {
    ($msg:literal, $($arg:tt)+) => {
        converter_log::_log::warn!(target: concat!("measurement_plugin_converter::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        converter_log::_log::warn!(target: concat!("measurement_plugin_converter::", module_path!()), $msg);
    };
}

#[macro_export]
macro_rules! error {
    ($msg:literal, $($arg:tt)+) => {
        converter_log::_log::error!(target: concat!("measurement_plugin_converter::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        converter_log::_log::error!(target: concat!("measurement_plugin_converter::", module_path!()), $msg);
    };
}

#[macro_export]
macro_rules! debug {
    ($msg:literal, $($arg:tt)+) => {
        converter_log::_log::debug!(target: concat!("measurement_plugin_converter::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        converter_log::_log::debug!(target: concat!("measurement_plugin_converter::", module_path!()), $msg);
    };
}

/// Log a diagnostic message at info level if diagnostics logging is enabled.
#[macro_export]
macro_rules! diagnostic {
    ($msg:literal, $($arg:tt)+) => {
        if converter_log::is_diagnostics_enabled() {
             converter_log::_log::info!(target: concat!("measurement_plugin_converter::", module_path!()), $msg, $($arg)+);
        }
    };
    ($msg:literal) => {
        if converter_log::is_diagnostics_enabled() {
            converter_log::_log::info!(target: concat!("measurement_plugin_converter::", module_path!()), $msg);
        }
    };
}

static DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(false);

#[inline]
pub fn is_diagnostics_enabled() -> bool {
    DIAGNOSTICS_ENABLED.load(Ordering::Acquire)
}

pub const LOG_FILE_NAME: &str = "converter.log";

#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Directory holding the current log file and its rotated predecessors.
    pub directory: PathBuf,
    /// Number of previous runs kept next to the current log file.
    pub max_backups: usize,
    /// Console shows debug records and diagnostics are enabled.
    pub verbose: bool,
}

impl LogSettings {
    pub fn new(directory: impl Into<PathBuf>, verbose: bool) -> Self {
        LogSettings {
            directory: directory.into(),
            max_backups: 5,
            verbose,
        }
    }
}

/// Console and log file loggers behind a single `log::Log`.
struct CombinedLogger {
    console: env_logger::Logger,
    file: env_logger::Logger,
}

impl Log for CombinedLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.console.enabled(metadata) || self.file.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if self.console.matches(record) {
            self.console.log(record);
        }
        if self.file.matches(record) {
            self.file.log(record);
        }
    }

    fn flush(&self) {
        self.console.flush();
        self.file.flush();
    }
}

fn rotated_path(directory: &Path, index: usize) -> PathBuf {
    directory.join(format!("converter.{index}.log"))
}

/// Shift previous log files by one slot and return the path of the fresh log file.
///
/// The oldest file is deleted once `max_backups` rotated files exist.
pub fn rotate_log_files(directory: &Path, max_backups: usize) -> io::Result<PathBuf> {
    fs::create_dir_all(directory)?;
    let current = directory.join(LOG_FILE_NAME);
    if max_backups == 0 {
        return Ok(current);
    }
    let oldest = rotated_path(directory, max_backups);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for index in (1..max_backups).rev() {
        let from = rotated_path(directory, index);
        if from.exists() {
            fs::rename(&from, rotated_path(directory, index + 1))?;
        }
    }
    if current.exists() {
        fs::rename(&current, rotated_path(directory, 1))?;
    }
    Ok(current)
}

/// Initialize the logging.
///
/// This function is meant to be called once at the start of the program.
/// Console output carries user-facing messages, the log file receives every
/// record down to debug level. Returns the path of the log file of this run.
pub fn init_logging(settings: &LogSettings) -> io::Result<PathBuf> {
    DIAGNOSTICS_ENABLED.store(settings.verbose, Ordering::Release);
    let path = rotate_log_files(&settings.directory, settings.max_backups)?;
    let file = File::create(&path)?;

    let console_level = if settings.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let console = env_logger::Builder::new()
        .filter_level(console_level)
        .target(env_logger::Target::Stderr)
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .build();
    let file = env_logger::Builder::new()
        .filter_level(LevelFilter::Debug)
        .write_style(env_logger::WriteStyle::Never)
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .build();

    let max_level = console.filter().max(file.filter());
    log::set_boxed_logger(Box::new(CombinedLogger { console, file }))
        .map_err(|err| io::Error::other(err.to_string()))?;
    log::set_max_level(max_level);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_log_files() {
        let dir = tempfile::tempdir().unwrap();
        let current = rotate_log_files(dir.path(), 2).unwrap();
        assert_eq!(current, dir.path().join(LOG_FILE_NAME));
        assert!(!current.exists());

        fs::write(&current, "run 1").unwrap();
        rotate_log_files(dir.path(), 2).unwrap();
        fs::write(&current, "run 2").unwrap();
        rotate_log_files(dir.path(), 2).unwrap();
        fs::write(&current, "run 3").unwrap();
        rotate_log_files(dir.path(), 2).unwrap();

        assert!(!current.exists());
        assert_eq!(
            fs::read_to_string(rotated_path(dir.path(), 1)).unwrap(),
            "run 3"
        );
        assert_eq!(
            fs::read_to_string(rotated_path(dir.path(), 2)).unwrap(),
            "run 2"
        );
        assert!(!rotated_path(dir.path(), 3).exists());
    }

    #[test]
    fn test_rotate_without_backups_keeps_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let current = rotate_log_files(dir.path(), 0).unwrap();
        fs::write(&current, "run 1").unwrap();
        let again = rotate_log_files(dir.path(), 0).unwrap();
        assert_eq!(current, again);
        assert!(!rotated_path(dir.path(), 1).exists());
    }

    #[test]
    fn test_rotate_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("today");
        let current = rotate_log_files(&nested, 3).unwrap();
        assert!(nested.is_dir());
        assert_eq!(current, nested.join(LOG_FILE_NAME));
    }
}
