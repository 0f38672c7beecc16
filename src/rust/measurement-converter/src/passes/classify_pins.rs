// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::drivers::VISA_INITIALIZER;
use crate::passes::detect_sessions::{SessionDetail, SessionSource};
use crate::settings::ConverterSettings;

/// Instrument pin configured by the plug-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinInfo {
    pub name: String,
    /// Python expression of the instrument type.
    pub instrument_type: String,
    pub default_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayInfo {
    pub name: String,
    pub default_value: String,
}

/// Expression retrieving the session of a pin from the reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMapping {
    pub name: String,
    pub mapping_expression: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinClassification {
    pub pins: Vec<PinInfo>,
    pub relays: Vec<RelayInfo>,
    /// One entry per pin, then one per relay.
    pub mappings: Vec<SessionMapping>,
}

fn instrument_type(source: &SessionSource) -> String {
    match source {
        SessionSource::Driver(driver) => driver.traits().instrument_type.to_string(),
        SessionSource::Visa { .. } => format!("{}_instrument_type", source.identifier()),
    }
}

fn mapping_expression(source: &SessionSource, pin: &str, reservation: &str) -> String {
    match source {
        SessionSource::Driver(driver) => format!(
            "{reservation}.{}(pin_name={pin})",
            driver.traits().initializer
        ),
        SessionSource::Visa { .. } => {
            let id = source.identifier();
            format!(
                "{reservation}.{VISA_INITIALIZER}({id}_session_constructor, {id}_instrument_type, pin_name={pin})"
            )
        }
    }
}

/// Turn detected sessions into pins and relays.
///
/// Pins keep the order of the sessions they stem from and always precede the
/// relays, whatever the order of the drivers in `detail`.
pub fn classify_pins(detail: &SessionDetail, settings: &ConverterSettings) -> PinClassification {
    let reservation = settings.reservation_parameter.as_str();
    let mut classification = PinClassification::default();
    let mut relay_mappings = vec![];

    for (source, _) in detail.iter() {
        for variable in detail.distinct_variables(source) {
            let name = format!("{variable}_pin");
            let default_value = format!("{}_pin", source.key());
            let mapping = SessionMapping {
                name: name.clone(),
                mapping_expression: mapping_expression(source, &name, reservation),
            };
            if source.is_relay() {
                classification.relays.push(RelayInfo {
                    name,
                    default_value,
                });
                relay_mappings.push(mapping);
            } else {
                classification.pins.push(PinInfo {
                    name,
                    instrument_type: instrument_type(source),
                    default_value,
                });
                classification.mappings.push(mapping);
            }
        }
    }
    classification.mappings.extend(relay_mappings);
    classification
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::Driver;

    #[test]
    fn test_relays_follow_pins_when_interleaved() {
        let mut detail = SessionDetail::new();
        detail.add(SessionSource::Driver(Driver::NiSwitch), "relay1");
        detail.add(SessionSource::Driver(Driver::NiDcPower), "smu");
        detail.add(SessionSource::Driver(Driver::NiSwitch), "relay2");
        detail.add(SessionSource::Driver(Driver::NiDmm), "dmm");

        let classification = classify_pins(&detail, &ConverterSettings::default());
        let pins = classification
            .pins
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>();
        let relays = classification
            .relays
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(pins, vec!["smu_pin", "dmm_pin"]);
        assert_eq!(relays, vec!["relay1_pin", "relay2_pin"]);

        let mappings = classification
            .mappings
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            mappings,
            vec!["smu_pin", "dmm_pin", "relay1_pin", "relay2_pin"]
        );
    }

    #[test]
    fn test_driver_pin_fields() {
        let mut detail = SessionDetail::new();
        detail.add(SessionSource::Driver(Driver::NiDcPower), "smu");
        detail.add(SessionSource::Driver(Driver::NiSwitch), "relay");

        let classification = classify_pins(&detail, &ConverterSettings::default());
        assert_eq!(
            classification.pins,
            vec![PinInfo {
                name: "smu_pin".to_string(),
                instrument_type: "nims.session_management.INSTRUMENT_TYPE_NI_DCPOWER"
                    .to_string(),
                default_value: "nidcpower_pin".to_string(),
            }]
        );
        assert_eq!(
            classification.relays,
            vec![RelayInfo {
                name: "relay_pin".to_string(),
                default_value: "niswitch_pin".to_string(),
            }]
        );
        assert_eq!(
            classification.mappings[0].mapping_expression,
            "reservation.initialize_nidcpower_session(pin_name=smu_pin)"
        );
        assert_eq!(
            classification.mappings[1].mapping_expression,
            "reservation.initialize_niswitch_session(pin_name=relay_pin)"
        );
    }

    #[test]
    fn test_visa_pins_use_synthesized_instrument_type() {
        let mut detail = SessionDetail::new();
        detail.add(
            SessionSource::Visa {
                resource: "GPIB0__12__INSTR".to_string(),
            },
            "instr",
        );
        let classification = classify_pins(&detail, &ConverterSettings::default());
        let pin = &classification.pins[0];
        assert_eq!(pin.instrument_type, "GPIB0__12__INSTR_instrument_type");
        assert_eq!(pin.default_value, "GPIB0__12__INSTR_pin");
        assert_eq!(
            classification.mappings[0].mapping_expression,
            "reservation.initialize_session(GPIB0__12__INSTR_session_constructor, \
             GPIB0__12__INSTR_instrument_type, pin_name=instr_pin)"
        );
    }

    #[test]
    fn test_duplicate_variables_yield_one_pin() {
        let mut detail = SessionDetail::new();
        detail.add(SessionSource::Driver(Driver::NiScope), "scope");
        detail.add(SessionSource::Driver(Driver::NiScope), "scope");
        let classification = classify_pins(&detail, &ConverterSettings::default());
        assert_eq!(classification.pins.len(), 1);
        assert_eq!(classification.mappings.len(), 1);
    }
}
