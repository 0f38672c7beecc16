// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Templates of the generated plug-in files.
//!
//! The templates receive ready-made Python snippets, so they contain no logic
//! beyond loops over the descriptors.
use askama::Template;
use measurement_converter::drivers::Driver;
use measurement_converter::{
    Conversion, ParameterKind, SessionMapping, SessionSource, python_string_literal,
};

/// Names shared by all generated files.
#[derive(Debug, Clone)]
pub struct PluginNames {
    pub display_name: String,
    pub service_name: String,
    pub migrated_module: String,
    pub function_name: String,
    pub helper_module: String,
    pub reservation: String,
}

pub struct InputView {
    pub name: String,
    pub native_type: String,
    pub data_type: &'static str,
    pub default_value: String,
}

pub struct PinView {
    pub name: String,
    pub instrument_type: String,
    pub default_value: String,
}

pub struct OutputView {
    pub name: String,
    pub data_type: &'static str,
}

pub struct VisaView {
    pub id: String,
    pub resource: String,
}

#[derive(Template)]
#[template(path = "measurement.py.jinja", escape = "none")]
pub struct MeasurementTemplate {
    display_name: String,
    service_name: String,
    migrated_module: String,
    function_name: String,
    helper_module: String,
    helper_imports: Vec<String>,
    reservation: String,
    inputs: Vec<InputView>,
    pins: Vec<PinView>,
    outputs: Vec<OutputView>,
    parameters: String,
    call_arguments: String,
    reserved_pins: String,
    return_annotation: String,
    return_expression: String,
}

fn return_expression(conversion: &Conversion) -> String {
    let signature = &conversion.signature;
    if signature.outputs.is_empty() {
        return "()".to_string();
    }
    if !signature.is_composite_output {
        return "(result,)".to_string();
    }
    let selected = signature
        .outputs
        .iter()
        .map(|output| format!("result[{}]", output.position))
        .collect::<Vec<_>>();
    match selected.as_slice() {
        [single] => format!("({single},)"),
        _ => format!("({})", selected.join(", ")),
    }
}

impl MeasurementTemplate {
    pub fn new(conversion: &Conversion, names: &PluginNames) -> Self {
        let signature = &conversion.signature;
        let inputs = signature
            .inputs
            .iter()
            .map(|input| InputView {
                name: input.name.clone(),
                native_type: input.native_type.clone(),
                data_type: input.data_type.as_str(),
                default_value: input.default_value.to_string(),
            })
            .collect::<Vec<InputView>>();
        let relay_type = Driver::NiSwitch.traits().instrument_type;
        let pins = conversion
            .pins
            .pins
            .iter()
            .map(|pin| PinView {
                name: pin.name.clone(),
                instrument_type: pin.instrument_type.clone(),
                default_value: python_string_literal(&pin.default_value),
            })
            .chain(conversion.pins.relays.iter().map(|relay| PinView {
                name: relay.name.clone(),
                instrument_type: relay_type.to_string(),
                default_value: python_string_literal(&relay.default_value),
            }))
            .collect::<Vec<PinView>>();
        let outputs = signature
            .outputs
            .iter()
            .map(|output| OutputView {
                name: output.name.clone(),
                data_type: output.data_type.as_str(),
            })
            .collect::<Vec<_>>();

        let parameters = inputs
            .iter()
            .map(|input| format!("{}: {}", input.name, input.native_type))
            .chain(pins.iter().map(|pin| format!("{}: str", pin.name)))
            .collect::<Vec<_>>()
            .join(", ");
        // Positional-only parameters cannot be passed by keyword.
        let call_arguments = std::iter::once(names.reservation.clone())
            .chain(signature.inputs.iter().map(|input| match input.kind {
                ParameterKind::PositionalOnly => input.name.clone(),
                _ => format!("{0}={0}", input.name),
            }))
            .collect::<Vec<_>>()
            .join(", ");
        let reserved_pins = pins
            .iter()
            .map(|pin| pin.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let return_annotation = if signature.outputs.is_empty() {
            "Tuple[()]".to_string()
        } else {
            let types = signature
                .outputs
                .iter()
                .map(|output| output.native_type.as_str())
                .collect::<Vec<_>>();
            format!("Tuple[{}]", types.join(", "))
        };
        let helper_imports = conversion
            .sessions
            .visa_sources()
            .into_iter()
            .map(|source| format!("{}_instrument_type", source.identifier()))
            .collect();

        MeasurementTemplate {
            display_name: python_string_literal(&names.display_name),
            service_name: names.service_name.clone(),
            migrated_module: names.migrated_module.clone(),
            function_name: names.function_name.clone(),
            helper_module: names.helper_module.clone(),
            helper_imports,
            reservation: names.reservation.clone(),
            inputs,
            pins,
            outputs,
            parameters,
            call_arguments,
            reserved_pins,
            return_annotation,
            return_expression: return_expression(conversion),
        }
    }
}

#[derive(Template)]
#[template(path = "_helpers.py.jinja", escape = "none")]
pub struct HelpersTemplate {
    service_name: String,
    reservation: String,
    visa_sessions: Vec<VisaView>,
    mappings: Vec<SessionMapping>,
}

impl HelpersTemplate {
    pub fn new(conversion: &Conversion, names: &PluginNames) -> Self {
        let visa_sessions = conversion
            .sessions
            .visa_sources()
            .into_iter()
            .map(|source| VisaView {
                id: source.identifier(),
                resource: python_string_literal(match source {
                    SessionSource::Visa { resource } => resource.as_str(),
                    SessionSource::Driver(driver) => driver.module(),
                }),
            })
            .collect();
        HelpersTemplate {
            service_name: names.service_name.clone(),
            reservation: names.reservation.clone(),
            visa_sessions,
            mappings: conversion.pins.mappings.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "start.bat.jinja", escape = "none")]
pub struct StartBatTemplate {
    service_name: String,
}

impl StartBatTemplate {
    pub fn new(names: &PluginNames) -> Self {
        StartBatTemplate {
            service_name: names.service_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use measurement_converter::{ConverterSettings, convert_measurement};

    const SOURCE: &str = "\
import nidcpower


def measure(voltage: float = 2.0, count: int = 3) -> Tuple[float, List[float]]:
    with nidcpower.Session(\"DCPower1/0\") as smu:
        level = smu.measure()
    with rm.open_resource(\"GPIB0::12::INSTR\") as scope:
        samples = scope.query_binary_values(\"DATA?\")
    return level, samples
";

    fn names() -> PluginNames {
        PluginNames {
            display_name: "DC \"Sweep\"".to_string(),
            service_name: "DCSweep".to_string(),
            migrated_module: "migrated_measure".to_string(),
            function_name: "measure".to_string(),
            helper_module: "_helpers".to_string(),
            reservation: "reservation".to_string(),
        }
    }

    fn conversion() -> Conversion {
        convert_measurement(SOURCE, "measure.py", "measure", &ConverterSettings::default())
            .unwrap()
    }

    #[test]
    fn test_measurement_template() {
        let rendered = MeasurementTemplate::new(&conversion(), &names())
            .render()
            .unwrap();
        assert!(rendered.contains(
            "@measurement_service.configuration(\"voltage\", nims.DataType.Double, 2.0)\n\
             @measurement_service.configuration(\"count\", nims.DataType.Int32, 3)\n"
        ));
        assert!(rendered.contains("instrument_type=nims.session_management.INSTRUMENT_TYPE_NI_DCPOWER,"));
        assert!(rendered.contains("instrument_type=GPIB0__12__INSTR_instrument_type,"));
        assert!(rendered.contains("from _helpers import GPIB0__12__INSTR_instrument_type\n"));
        assert!(rendered.contains(
            "@measurement_service.output(\"samples\", nims.DataType.DoubleArray1D)\n\
             def measure(voltage: float, count: int, smu_pin: str, scope_pin: str) -> Tuple[float, List[float]]:"
        ));
        assert!(rendered.contains(
            "reserve_sessions([smu_pin, scope_pin]) as reservation:\n        \
             result = migrated_measure.measure(reservation, voltage=voltage, count=count)\n    \
             return (result[0], result[1])\n"
        ));
        assert!(rendered.contains("logging.info(\"Running %s\", \"DC \\\"Sweep\\\"\")"));
    }

    #[test]
    fn test_positional_only_inputs_are_passed_positionally() {
        let source = "\
def measure(a: int, /, b: float = 1.0, *, c: str = \"x\"):
    with nidmm.Session(\"DMM1\") as dmm:
        pass
";
        let conversion =
            convert_measurement(source, "measure.py", "measure", &ConverterSettings::default())
                .unwrap();
        let rendered = MeasurementTemplate::new(&conversion, &names())
            .render()
            .unwrap();
        assert!(rendered.contains(
            "result = migrated_measure.measure(reservation, a, b=b, c=c)\n"
        ));
    }

    #[test]
    fn test_helpers_template() {
        let rendered = HelpersTemplate::new(&conversion(), &names())
            .render()
            .unwrap();
        assert!(rendered.contains("GPIB0__12__INSTR_instrument_type = \"GPIB0__12__INSTR\"\n"));
        assert!(rendered.contains("def GPIB0__12__INSTR_session_constructor("));
        assert!(rendered.contains(
            "def smu_pin_session(reservation: Any, smu_pin: str) -> Any:\n    \
             \"\"\"Initialize the session of the pin passed as 'smu_pin'.\"\"\"\n    \
             return reservation.initialize_nidcpower_session(pin_name=smu_pin)"
        ));
    }

    #[test]
    fn test_start_bat_template() {
        let rendered = StartBatTemplate::new(&names()).render().unwrap();
        assert!(rendered.starts_with("@echo off\n"));
        assert!(rendered.contains("call python \"%~dp0measurement.py\" %*"));
    }
}
