// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

/// Driver specific traits for session conversion
///
/// NOTE: The resource argument positions mirror the constructor signatures of
///     the instrument driver Python packages. Ensure that the values do match
///     when a driver changes its `Session`/`Task` constructor.
pub struct DriverTraits {
    pub module: &'static str,
    pub initializer: &'static str,
    pub plural_initializer: &'static str,
    pub instrument_type: &'static str,
    pub resource_keyword: &'static str,
    pub resource_position: usize,
    pub is_relay_driver: bool,
}

pub const NIDCPOWER_TRAITS: DriverTraits = DriverTraits {
    module: "nidcpower",
    initializer: "initialize_nidcpower_session",
    plural_initializer: "initialize_nidcpower_sessions",
    instrument_type: "nims.session_management.INSTRUMENT_TYPE_NI_DCPOWER",
    resource_keyword: "resource_name",
    resource_position: 0,
    is_relay_driver: false,
};

pub const NIDMM_TRAITS: DriverTraits = DriverTraits {
    module: "nidmm",
    initializer: "initialize_nidmm_session",
    plural_initializer: "initialize_nidmm_sessions",
    instrument_type: "nims.session_management.INSTRUMENT_TYPE_NI_DMM",
    resource_keyword: "resource_name",
    resource_position: 0,
    is_relay_driver: false,
};

pub const NIDIGITAL_TRAITS: DriverTraits = DriverTraits {
    module: "nidigital",
    initializer: "initialize_nidigital_session",
    plural_initializer: "initialize_nidigital_sessions",
    instrument_type: "nims.session_management.INSTRUMENT_TYPE_NI_DIGITAL_PATTERN",
    resource_keyword: "resource_name",
    resource_position: 0,
    is_relay_driver: false,
};

pub const NISCOPE_TRAITS: DriverTraits = DriverTraits {
    module: "niscope",
    initializer: "initialize_niscope_session",
    plural_initializer: "initialize_niscope_sessions",
    instrument_type: "nims.session_management.INSTRUMENT_TYPE_NI_SCOPE",
    resource_keyword: "resource_name",
    resource_position: 0,
    is_relay_driver: false,
};

pub const NIFGEN_TRAITS: DriverTraits = DriverTraits {
    module: "nifgen",
    initializer: "initialize_nifgen_session",
    plural_initializer: "initialize_nifgen_sessions",
    instrument_type: "nims.session_management.INSTRUMENT_TYPE_NI_FGEN",
    resource_keyword: "resource_name",
    resource_position: 0,
    is_relay_driver: false,
};

pub const NISWITCH_TRAITS: DriverTraits = DriverTraits {
    module: "niswitch",
    initializer: "initialize_niswitch_session",
    plural_initializer: "initialize_niswitch_sessions",
    instrument_type: "nims.session_management.INSTRUMENT_TYPE_NI_RELAY_DRIVER",
    resource_keyword: "resource_name",
    resource_position: 0,
    is_relay_driver: true,
};

pub const NIDAQMX_TRAITS: DriverTraits = DriverTraits {
    module: "nidaqmx",
    initializer: "create_nidaqmx_task",
    plural_initializer: "create_nidaqmx_tasks",
    instrument_type: "nims.session_management.INSTRUMENT_TYPE_NI_DAQMX",
    // `nidaqmx.Task(new_task_name="")`
    resource_keyword: "new_task_name",
    resource_position: 0,
    is_relay_driver: false,
};

/// Attribute names of driver session constructors, e.g. `nidcpower.Session(...)`.
pub const SESSION_CONSTRUCTORS: [&str; 2] = ["Session", "Task"];

/// Method names opening a VISA-style session, e.g. `rm.open_resource(...)`.
pub const VISA_OPEN_METHODS: [&str; 3] = ["open_resource", "get_instrument", "instrument"];
pub const VISA_RESOURCE_KEYWORD: &str = "resource_name";
pub const VISA_RESOURCE_POSITION: usize = 0;
pub const VISA_INITIALIZER: &str = "initialize_session";
pub const VISA_PLURAL_INITIALIZER: &str = "initialize_sessions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Driver {
    NiDcPower,
    NiDmm,
    NiDigital,
    NiScope,
    NiFgen,
    NiSwitch,
    NiDaqmx,
}

impl Driver {
    pub const ALL: [Driver; 7] = [
        Driver::NiDcPower,
        Driver::NiDmm,
        Driver::NiDigital,
        Driver::NiScope,
        Driver::NiFgen,
        Driver::NiSwitch,
        Driver::NiDaqmx,
    ];

    pub fn traits(&self) -> &'static DriverTraits {
        match self {
            Driver::NiDcPower => &NIDCPOWER_TRAITS,
            Driver::NiDmm => &NIDMM_TRAITS,
            Driver::NiDigital => &NIDIGITAL_TRAITS,
            Driver::NiScope => &NISCOPE_TRAITS,
            Driver::NiFgen => &NIFGEN_TRAITS,
            Driver::NiSwitch => &NISWITCH_TRAITS,
            Driver::NiDaqmx => &NIDAQMX_TRAITS,
        }
    }

    /// Resolve a driver from the module alias used in the measurement source.
    pub fn from_module(module: &str) -> Option<Driver> {
        Driver::ALL
            .into_iter()
            .find(|driver| driver.traits().module == module)
    }

    pub fn module(&self) -> &'static str {
        self.traits().module
    }
}

/// Human readable list of everything the session detector understands.
pub fn supported_drivers_description() -> String {
    let modules = Driver::ALL
        .iter()
        .map(|driver| driver.module())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{modules} and VISA-style sessions opened with {}",
        VISA_OPEN_METHODS.join(", ")
    )
}
