// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Mapping of Python type annotations to measurement data types.
use std::fmt;

use crate::utils::python_string_literal;

/// Data type of a measurement configuration or output.
///
/// The variant names match the members of `nims.DataType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int32,
    Double,
    String,
    Boolean,
    Int32Array1D,
    DoubleArray1D,
    StringArray1D,
    BooleanArray1D,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int32 => "Int32",
            DataType::Double => "Double",
            DataType::String => "String",
            DataType::Boolean => "Boolean",
            DataType::Int32Array1D => "Int32Array1D",
            DataType::DoubleArray1D => "DoubleArray1D",
            DataType::StringArray1D => "StringArray1D",
            DataType::BooleanArray1D => "BooleanArray1D",
        }
    }

    /// Default used for parameters that declare no default themselves.
    pub fn fallback_default(&self) -> DefaultValue {
        match self {
            DataType::Int32 => DefaultValue::Int(1),
            DataType::Double => DefaultValue::Float(1.0),
            DataType::String => DefaultValue::Str(String::new()),
            DataType::Boolean => DefaultValue::Bool(false),
            DataType::Int32Array1D => DefaultValue::List(vec![DefaultValue::Int(1)]),
            DataType::DoubleArray1D => DefaultValue::List(vec![DefaultValue::Float(1.0)]),
            DataType::StringArray1D => DefaultValue::List(vec![DefaultValue::Str(String::new())]),
            DataType::BooleanArray1D => DefaultValue::List(vec![DefaultValue::Bool(false)]),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Look up the data type of a Python type name.
///
/// Only exact spellings are recognized: `None` means the type is unsupported.
pub fn map_type(native_type: &str) -> Option<DataType> {
    let data_type = match native_type {
        "int" => DataType::Int32,
        "float" => DataType::Double,
        "str" => DataType::String,
        "bool" => DataType::Boolean,
        "List[int]" | "list[int]" => DataType::Int32Array1D,
        "List[float]" | "list[float]" => DataType::DoubleArray1D,
        "List[str]" | "list[str]" => DataType::StringArray1D,
        "List[bool]" | "list[bool]" => DataType::BooleanArray1D,
        _ => return None,
    };
    Some(data_type)
}

/// A literal default value as written in Python source.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<DefaultValue>),
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::None => write!(f, "None"),
            DefaultValue::Bool(true) => write!(f, "True"),
            DefaultValue::Bool(false) => write!(f, "False"),
            DefaultValue::Int(value) => write!(f, "{value}"),
            DefaultValue::Float(value) if value.is_nan() => write!(f, "float(\"nan\")"),
            DefaultValue::Float(value) if value.is_infinite() => {
                let sign = if value.is_sign_negative() { "-" } else { "" };
                write!(f, "float(\"{sign}inf\")")
            }
            // Debug keeps the fractional part, `1.0` stays a float in Python.
            DefaultValue::Float(value) => write!(f, "{value:?}"),
            DefaultValue::Str(value) => write!(f, "{}", python_string_literal(value)),
            DefaultValue::List(values) => {
                let items = values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{items}]")
            }
        }
    }
}
