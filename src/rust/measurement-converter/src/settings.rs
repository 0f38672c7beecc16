// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Module for defining settings for the measurement converter.
use serde::Deserialize;

use crate::utils::{is_python_identifier, python_identifier};

#[derive(Debug, Clone)]
pub struct SanitizationChange {
    pub field: &'static str,
    pub original: String,
    pub sanitized: String,
    pub reason: String,
}

/// Names used in the converted measurement.
///
/// Every field is optional when deserialized; missing fields keep their default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterSettings {
    /// Leading parameter added to the measurement function.
    pub reservation_parameter: String,
    pub session_info_name: String,
    pub session_infos_name: String,
    /// Module the VISA helper definitions are imported from.
    pub helper_module: String,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        ConverterSettings {
            reservation_parameter: "reservation".to_string(),
            session_info_name: "session_info".to_string(),
            session_infos_name: "session_infos".to_string(),
            helper_module: "_helpers".to_string(),
        }
    }
}

impl ConverterSettings {
    pub fn sanitize(&mut self) -> Vec<SanitizationChange> {
        let mut changes = vec![];
        let fields = [
            ("reservation_parameter", &mut self.reservation_parameter),
            ("session_info_name", &mut self.session_info_name),
            ("session_infos_name", &mut self.session_infos_name),
            ("helper_module", &mut self.helper_module),
        ];
        for (field, value) in fields {
            if is_python_identifier(value) {
                continue;
            }
            let sanitized = python_identifier(value);
            changes.push(SanitizationChange {
                field,
                original: value.clone(),
                sanitized: sanitized.clone(),
                reason: "Not a valid Python identifier.".to_string(),
            });
            *value = sanitized;
        }
        if self.session_infos_name == self.session_info_name {
            let sanitized = format!("{}s", self.session_info_name);
            changes.push(SanitizationChange {
                field: "session_infos_name",
                original: self.session_infos_name.clone(),
                sanitized: sanitized.clone(),
                reason: "Must differ from `session_info_name`.".to_string(),
            });
            self.session_infos_name = sanitized;
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let mut settings = ConverterSettings::default();
        assert!(settings.sanitize().is_empty());
        assert_eq!(settings.reservation_parameter, "reservation");
    }

    #[test]
    fn test_partial_deserialization_keeps_defaults() {
        let settings: ConverterSettings =
            serde_json::from_str(r#"{"reservation_parameter": "pin_reservation"}"#).unwrap();
        assert_eq!(settings.reservation_parameter, "pin_reservation");
        assert_eq!(settings.session_info_name, "session_info");
        assert_eq!(settings.helper_module, "_helpers");

        let unknown = serde_json::from_str::<ConverterSettings>(r#"{"reservaton": "x"}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn test_sanitization_change() {
        let mut settings = ConverterSettings {
            reservation_parameter: "my-reservation".to_string(),
            session_infos_name: "1infos".to_string(),
            ..Default::default()
        };
        let changes = settings.sanitize();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].field, "reservation_parameter");
        assert_eq!(changes[0].original, "my-reservation");
        assert_eq!(changes[0].sanitized, "my_reservation");
        assert_eq!(settings.reservation_parameter, "my_reservation");
        assert_eq!(changes[1].field, "session_infos_name");
        assert_eq!(settings.session_infos_name, "_1infos");
    }

    #[test]
    fn test_session_info_names_must_differ() {
        let mut settings = ConverterSettings {
            session_infos_name: "session_info".to_string(),
            ..Default::default()
        };
        let changes = settings.sanitize();
        assert_eq!(changes.len(), 1);
        assert_eq!(settings.session_infos_name, "session_infos");
    }
}
