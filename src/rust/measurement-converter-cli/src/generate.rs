// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::{Path, PathBuf};

use askama::Template;
use converter_log::{debug, info};
use measurement_converter::{ConverterSettings, convert_measurement, python_identifier};

use crate::error::{Error, Result};
use crate::service_config::{ServiceConfig, service_name};
use crate::templates::{HelpersTemplate, MeasurementTemplate, PluginNames, StartBatTemplate};

const LAUNCHER_FILE: &str = "start.bat";
const MEASUREMENT_FILE: &str = "measurement.py";

#[derive(Debug, Clone)]
pub struct PluginRequest {
    pub display_name: String,
    pub measurement_file: PathBuf,
    pub function: String,
    pub output_dir: PathBuf,
    pub settings: ConverterSettings,
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    let mut contents = contents.to_string();
    if !contents.ends_with('\n') {
        contents.push('\n');
    }
    fs::write(path, contents).map_err(|err| Error::io(path, err))?;
    debug!("Wrote '{}'", path.display());
    Ok(())
}

fn render(template: &impl Template, name: &'static str) -> Result<String> {
    template
        .render()
        .map_err(|source| Error::Templating {
            template: name,
            source,
        })
}

fn validate(request: &PluginRequest) -> Result<()> {
    if request.display_name.trim().is_empty() || service_name(&request.display_name).is_empty() {
        return Err(Error::InvalidInput(format!(
            "Display name '{}' must contain at least one letter or digit",
            request.display_name
        )));
    }
    if !request.measurement_file.is_file() {
        return Err(Error::InvalidInput(format!(
            "Measurement file '{}' does not exist",
            request.measurement_file.display()
        )));
    }
    if request.measurement_file.extension().and_then(|ext| ext.to_str()) != Some("py") {
        return Err(Error::InvalidInput(format!(
            "Measurement file '{}' is not a Python file",
            request.measurement_file.display()
        )));
    }
    Ok(())
}

/// Convert the measurement and write the plug-in into the output directory.
///
/// The measurement file is copied to the output directory before anything
/// else. If the conversion fails, that unmodified copy is the only file left.
pub fn generate_plugin(request: &PluginRequest) -> Result<PathBuf> {
    validate(request)?;
    let output_dir = &request.output_dir;
    fs::create_dir_all(output_dir).map_err(|err| match Error::io(output_dir, err) {
        Error::Io { path, source } => Error::InvalidInput(format!(
            "Output directory '{}' cannot be created: {source}",
            path.display()
        )),
        other => other,
    })?;

    let stem = request
        .measurement_file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    let migrated_module = format!("migrated_{}", python_identifier(stem));
    let migrated_path = output_dir.join(format!("{migrated_module}.py"));
    fs::copy(&request.measurement_file, &migrated_path)
        .map_err(|err| Error::io(&migrated_path, err))?;
    info!(
        "Copied '{}' to '{}'",
        request.measurement_file.display(),
        migrated_path.display()
    );

    let source =
        fs::read_to_string(&migrated_path).map_err(|err| Error::io(&migrated_path, err))?;
    let conversion = convert_measurement(
        &source,
        &request.measurement_file.display().to_string(),
        &request.function,
        &request.settings,
    )?;
    write_file(&migrated_path, &conversion.migrated_source)?;
    info!("Migrated '{}'", request.function);

    let names = PluginNames {
        display_name: request.display_name.clone(),
        service_name: service_name(&request.display_name),
        migrated_module,
        function_name: request.function.clone(),
        helper_module: request.settings.helper_module.clone(),
        reservation: request.settings.reservation_parameter.clone(),
    };
    let measurement = render(
        &MeasurementTemplate::new(&conversion, &names),
        MEASUREMENT_FILE,
    )?;
    write_file(&output_dir.join(MEASUREMENT_FILE), &measurement)?;

    let helpers = render(&HelpersTemplate::new(&conversion, &names), "_helpers.py")?;
    write_file(
        &output_dir.join(format!("{}.py", names.helper_module)),
        &helpers,
    )?;

    let launcher = render(&StartBatTemplate::new(&names), LAUNCHER_FILE)?;
    // Batch files use Windows line endings.
    let launcher = launcher.trim_end().replace('\n', "\r\n") + "\r\n";
    write_file(&output_dir.join(LAUNCHER_FILE), &launcher)?;

    let service_config = ServiceConfig::new(&names.display_name, &names.service_name, LAUNCHER_FILE)
        .to_json()
        .map_err(anyhow::Error::from)?;
    write_file(
        &output_dir.join(format!("{}.serviceconfig", names.service_name)),
        &service_config,
    )?;
    info!("Generated the plug-in files in '{}'", output_dir.display());
    Ok(output_dir.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const MEASUREMENT: &str = "\
import nidmm


def measure(range: float = 10.0) -> float:
    with nidmm.Session(\"DMM1\") as dmm:
        value = dmm.read()
    return value
";

    fn request(dir: &Path, source: &str, function: &str) -> PluginRequest {
        let measurement_file = dir.join("dmm measurement.py");
        fs::write(&measurement_file, source).unwrap();
        PluginRequest {
            display_name: "DMM reading".to_string(),
            measurement_file,
            function: function.to_string(),
            output_dir: dir.join("out"),
            settings: ConverterSettings::default(),
        }
    }

    #[test]
    fn test_generate_plugin() {
        let dir = tempfile::tempdir().unwrap();
        let request = request(dir.path(), MEASUREMENT, "measure");
        let output_dir = generate_plugin(&request).unwrap();

        let migrated = fs::read_to_string(output_dir.join("migrated_dmm_measurement.py")).unwrap();
        assert!(migrated.contains("def measure(reservation, range: float = 10.0) -> float:"));
        assert!(migrated.contains("        dmm = session_info.session\n"));
        let measurement = fs::read_to_string(output_dir.join("measurement.py")).unwrap();
        assert!(measurement.contains("import migrated_dmm_measurement\n"));
        assert!(measurement.contains("\"DMMReading.serviceconfig\""));
        assert!(output_dir.join("_helpers.py").is_file());
        let launcher = fs::read_to_string(output_dir.join("start.bat")).unwrap();
        assert!(launcher.starts_with("@echo off\r\n"));
        let config = fs::read_to_string(output_dir.join("DMMReading.serviceconfig")).unwrap();
        assert!(config.contains("ni.examples.DMMReading_Python"));
    }

    #[test]
    fn test_failed_conversion_leaves_only_the_copy() {
        let dir = tempfile::tempdir().unwrap();
        let source = "def measure():\n    return 1\n";
        let request = request(dir.path(), source, "measure");
        let err = generate_plugin(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedDriver);

        let mut files = fs::read_dir(dir.path().join("out"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        files.sort();
        assert_eq!(files, vec!["migrated_dmm_measurement.py"]);
        let copy =
            fs::read_to_string(dir.path().join("out").join("migrated_dmm_measurement.py")).unwrap();
        assert_eq!(copy, source);
    }

    #[test]
    fn test_invalid_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut missing = request(dir.path(), MEASUREMENT, "measure");
        missing.measurement_file = dir.path().join("missing.py");
        assert_eq!(
            generate_plugin(&missing).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );

        let unknown_function = request(dir.path(), MEASUREMENT, "not_there");
        assert_eq!(
            generate_plugin(&unknown_function).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );

        let mut no_name = request(dir.path(), MEASUREMENT, "measure");
        no_name.display_name = " - ".to_string();
        assert_eq!(
            generate_plugin(&no_name).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }
}
