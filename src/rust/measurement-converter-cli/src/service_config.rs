// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! The `.serviceconfig` descriptor registering the plug-in with the discovery service.
use serde::Serialize;

const PROVIDED_INTERFACES: [&str; 2] = [
    "ni.measurementlink.measurement.v1.MeasurementService",
    "ni.measurementlink.measurement.v2.MeasurementService",
];

#[derive(Debug, Serialize)]
pub struct ServiceConfig {
    services: Vec<ServiceEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceEntry {
    display_name: String,
    service_class: String,
    description_url: String,
    provided_interfaces: Vec<String>,
    path: String,
    annotations: Annotations,
}

#[derive(Debug, Serialize)]
struct Annotations {
    #[serde(rename = "ni/service.description")]
    description: String,
    #[serde(rename = "ni/service.collection")]
    collection: String,
    #[serde(rename = "ni/service.tags")]
    tags: Vec<String>,
}

/// Service name derived from a display name: words capitalized, everything
/// that is not alphanumeric removed.
pub fn service_name(display_name: &str) -> String {
    display_name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars
                .next()
                .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
                .unwrap_or_default()
        })
        .collect()
}

pub fn service_class(service_name: &str) -> String {
    format!("ni.examples.{service_name}_Python")
}

impl ServiceConfig {
    pub fn new(display_name: &str, service_name: &str, launcher: &str) -> Self {
        ServiceConfig {
            services: vec![ServiceEntry {
                display_name: display_name.to_string(),
                service_class: service_class(service_name),
                description_url: String::new(),
                provided_interfaces: PROVIDED_INTERFACES.iter().map(|s| s.to_string()).collect(),
                path: launcher.to_string(),
                annotations: Annotations {
                    description: format!("{display_name} measurement plug-in"),
                    collection: String::new(),
                    tags: vec![],
                },
            }],
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
