// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Command line entry point of the measurement plug-in converter.
//!
//! ```bash
//! measurement-plugin-converter --display-name "DC sweep" \
//!     --measurement-file measure.py --function measure --output-dir plugin
//! ```

mod error;
mod generate;
mod service_config;
mod templates;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use converter_log::{LogSettings, debug, error, info, init_logging, warn};
use measurement_converter::ConverterSettings;

use crate::error::{Error, Result};
use crate::generate::{PluginRequest, generate_plugin};

#[derive(Parser, Debug)]
#[command(name = "measurement-plugin-converter")]
#[command(
    version,
    about = "Convert a Python measurement function into a measurement plug-in",
    long_about = None
)]
struct Cli {
    /// Display name of the measurement plug-in
    #[arg(long)]
    display_name: String,

    /// Python file containing the measurement function
    #[arg(long)]
    measurement_file: PathBuf,

    /// Name of the measurement function
    #[arg(long)]
    function: String,

    /// Directory the plug-in is written to
    #[arg(long)]
    output_dir: PathBuf,

    /// JSON file overriding the converter settings
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Directory of the log files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Show debug messages and conversion diagnostics
    #[arg(short, long)]
    verbose: bool,
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("measurement-plugin-converter")
        .join("logs")
}

fn load_settings(path: Option<&Path>) -> Result<ConverterSettings> {
    let mut settings = match path {
        None => ConverterSettings::default(),
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
            serde_json::from_str(&text).map_err(|err| {
                Error::InvalidInput(format!(
                    "Settings file '{}' is invalid: {err}",
                    path.display()
                ))
            })?
        }
    };
    for change in settings.sanitize() {
        warn!(
            "Setting '{}' changed from '{}' to '{}': {}",
            change.field,
            change.original,
            change.sanitized,
            change.reason
        );
    }
    Ok(settings)
}

fn run(cli: Cli) -> Result<PathBuf> {
    let settings = load_settings(cli.settings.as_deref())?;
    let request = PluginRequest {
        display_name: cli.display_name,
        measurement_file: cli.measurement_file,
        function: cli.function,
        output_dir: cli.output_dir,
        settings,
    };
    generate_plugin(&request)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_settings = LogSettings::new(
        cli.log_dir.clone().unwrap_or_else(default_log_dir),
        cli.verbose,
    );
    let log_file = match init_logging(&log_settings) {
        Ok(path) => path,
        Err(err) => {
            eprintln!(
                "ERROR: Failed to initialize logging in '{}': {err}",
                log_settings.directory.display()
            );
            return ExitCode::from(3);
        }
    };

    let code = match run(cli) {
        Ok(output_dir) => {
            info!(
                "Measurement plug-in was created at '{}'",
                output_dir.display()
            );
            0
        }
        Err(err) => {
            error!("{}", err.user_message());
            debug!("{}", err);
            if let Some(context) = err.context_message() {
                debug!("{}", context);
            }
            info!("Check the log file '{}' for details.", log_file.display());
            err.exit_code()
        }
    };
    info!("Process completed");
    ExitCode::from(code)
}
