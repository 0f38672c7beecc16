// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

pub mod convert;
pub mod drivers;
pub mod edits;
pub(crate) mod passes;
pub mod settings;
pub mod signature;
pub mod source;
pub mod type_mapper;
pub(crate) mod utils;

pub use convert::{Conversion, convert_measurement};
pub use passes::classify_pins::{
    PinClassification, PinInfo, RelayInfo, SessionMapping, classify_pins,
};
pub use passes::detect_sessions::{SessionDetail, SessionSource, detect_sessions};
pub use passes::rewrite_sessions::{RewrittenSession, SessionRewrite, rewrite_sessions};
pub use passes::rewrite_signature::rewrite_signature;
pub use settings::{ConverterSettings, SanitizationChange};
pub use signature::{
    Diagnostic, FunctionSignature, InputDescriptor, OutputDescriptor, ParameterKind,
    extract_signature,
};
pub use type_mapper::{DataType, DefaultValue, map_type};
pub use utils::{python_identifier, python_string_literal, sanitize_resource_name};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The measurement file, function or arguments cannot be used as given.
    #[error("{0}")]
    InvalidInput(String),
    /// No instrument session could be converted.
    #[error("{0}")]
    UnsupportedDriver(String),
    #[error(
        "Function '{function}' returns {returned} value(s), but its return annotation declares {declared}"
    )]
    OutputMismatch {
        function: String,
        returned: usize,
        declared: usize,
    },
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
