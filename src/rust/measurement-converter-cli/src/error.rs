// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Error handling at the command line boundary.
//!
//! Every error is classified into an [`ErrorKind`], which selects the message
//! shown to the user and the process exit code. The complete chain of causes
//! only goes to the log file.
use std::io;
use std::path::{Path, PathBuf};

use measurement_converter::Error as ConverterError;
use measurement_converter::drivers::supported_drivers_description;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Converter(#[from] ConverterError),
    #[error("{0}")]
    InvalidInput(String),
    #[error("Failed to render the template '{template}'")]
    Templating {
        template: &'static str,
        #[source]
        source: askama::Error,
    },
    #[error("Access to '{}' was denied", path.display())]
    AccessDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to access '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedDriver,
    Templating,
    AccessDenied,
    Io,
    Unknown,
}

impl Error {
    /// Classify a failed file system operation on `path`.
    pub fn io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::PermissionDenied => Error::AccessDenied { path, source },
            _ => Error::Io { path, source },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Converter(err) => match err {
                ConverterError::InvalidInput(_) | ConverterError::OutputMismatch { .. } => {
                    ErrorKind::InvalidInput
                }
                ConverterError::UnsupportedDriver(_) => ErrorKind::UnsupportedDriver,
                ConverterError::Anyhow(_) => ErrorKind::Unknown,
            },
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Templating { .. } => ErrorKind::Templating,
            Error::AccessDenied { .. } => ErrorKind::AccessDenied,
            Error::Io { .. } => ErrorKind::Io,
            Error::Anyhow(_) => ErrorKind::Unknown,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::InvalidInput | ErrorKind::UnsupportedDriver => 2,
            ErrorKind::AccessDenied | ErrorKind::Io => 3,
            ErrorKind::Templating | ErrorKind::Unknown => 1,
        }
    }

    /// Message shown on the console.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::InvalidInput | ErrorKind::Io => self.to_string(),
            ErrorKind::UnsupportedDriver => {
                let message = self.to_string();
                let drivers = supported_drivers_description();
                if message.contains(&drivers) {
                    message
                } else {
                    format!("{message}\nSupported drivers: {drivers}.")
                }
            }
            ErrorKind::Templating => format!(
                "{self}. Check the log file for more details."
            ),
            ErrorKind::AccessDenied => format!(
                "{self}. Run the converter with elevated privileges or choose a different output directory."
            ),
            ErrorKind::Unknown => {
                "An unexpected error occurred. Check the log file for more details.".to_string()
            }
        }
    }

    /// Collect the source errors and format them into a string.
    ///
    /// The error's own message is excluded.
    pub fn context_message(&self) -> Option<String> {
        let mut causes = vec![];
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        if causes.is_empty() {
            return None;
        }
        Some(format!("Caused by:\n  {}", causes.join("\n  ")))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
