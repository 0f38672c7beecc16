// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Typed inputs and outputs of a measurement function.
//!
//! Parameters and outputs whose types have no measurement data type are not an
//! error: they are left out of the signature and reported as [`Diagnostic`]s.
use std::fmt;

use converter_log::warn;
use num_traits::ToPrimitive;
use rustpython_parser::ast;

use crate::source::PythonModule;
use crate::type_mapper::{DataType, DefaultValue, map_type};
use crate::{Error, Result};

/// How a parameter can be passed in a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Declared before `/`.
    PositionalOnly,
    PositionalOrKeyword,
    /// Declared after `*` or `*args`.
    KeywordOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputDescriptor {
    pub name: String,
    pub native_type: String,
    pub data_type: DataType,
    pub default_value: DefaultValue,
    pub kind: ParameterKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputDescriptor {
    pub name: String,
    pub native_type: String,
    pub data_type: DataType,
    /// Index of the value in a composite return, 0 otherwise.
    pub position: usize,
}

/// Reason a parameter or output was left out of the signature.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    UnsupportedParameterType {
        name: String,
        native_type: Option<String>,
    },
    UnsupportedDefault {
        name: String,
        expression: String,
    },
    VariadicParameter {
        name: String,
    },
    UnsupportedOutputType {
        name: String,
        native_type: Option<String>,
    },
    NonIdentifierOutput {
        position: usize,
        expression: String,
    },
}

fn describe_type(native_type: &Option<String>) -> String {
    match native_type {
        Some(native_type) => format!("type '{native_type}' is not supported"),
        None => "type annotation is missing".to_string(),
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnsupportedParameterType { name, native_type } => write!(
                f,
                "Skipping parameter '{name}': {}",
                describe_type(native_type)
            ),
            Diagnostic::UnsupportedDefault { name, expression } => write!(
                f,
                "Skipping parameter '{name}': default value '{expression}' is not a literal"
            ),
            Diagnostic::VariadicParameter { name } => {
                write!(f, "Skipping variadic parameter '{name}'")
            }
            Diagnostic::UnsupportedOutputType { name, native_type } => write!(
                f,
                "Skipping output '{name}': {}",
                describe_type(native_type)
            ),
            Diagnostic::NonIdentifierOutput {
                position,
                expression,
            } => write!(
                f,
                "Returned value '{expression}' at position {position} is not a variable, naming it 'output_{}'",
                position + 1
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionSignature {
    pub name: String,
    pub inputs: Vec<InputDescriptor>,
    pub outputs: Vec<OutputDescriptor>,
    /// The function returns a tuple or a list of values.
    pub is_composite_output: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Render a type annotation as a type string, e.g. `List[float]`.
pub fn resolve_type_name(annotation: &ast::Expr) -> Option<String> {
    match annotation {
        ast::Expr::Name(ast::ExprName { id, .. }) => Some(id.as_str().to_string()),
        ast::Expr::Attribute(ast::ExprAttribute { attr, .. }) => Some(attr.as_str().to_string()),
        ast::Expr::Constant(ast::ExprConstant { value, .. }) => match value {
            ast::Constant::Str(text) => Some(text.trim().to_string()),
            ast::Constant::None => Some("None".to_string()),
            ast::Constant::Ellipsis => Some("...".to_string()),
            _ => None,
        },
        ast::Expr::Subscript(ast::ExprSubscript { value, slice, .. }) => {
            let outer = resolve_type_name(value)?;
            let inner = match slice.as_ref() {
                ast::Expr::Tuple(ast::ExprTuple { elts, .. }) => elts
                    .iter()
                    .map(resolve_type_name)
                    .collect::<Option<Vec<_>>>()?
                    .join(", "),
                other => resolve_type_name(other)?,
            };
            Some(format!("{outer}[{inner}]"))
        }
        _ => None,
    }
}

/// Split `Tuple[A, B[C]]` into its element types `A` and `B[C]`.
///
/// Returns `None` for anything that is not a tuple annotation.
pub fn split_composite_type(annotation: &str) -> Option<Vec<String>> {
    let inner = annotation
        .strip_prefix("Tuple[")
        .or_else(|| annotation.strip_prefix("tuple["))?
        .strip_suffix(']')?;
    let mut elements = vec![];
    let mut depth = 0usize;
    let mut current = String::new();
    for c in inner.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                elements.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if depth != 0 {
        return None;
    }
    if !current.trim().is_empty() {
        elements.push(current.trim().to_string());
    }
    Some(elements)
}

fn list_element_type(annotation: &str) -> Option<&str> {
    annotation
        .strip_prefix("List[")
        .or_else(|| annotation.strip_prefix("list["))?
        .strip_suffix(']')
}

/// Evaluate a default value expression made of literals only.
pub fn literal_value(expr: &ast::Expr) -> Option<DefaultValue> {
    match expr {
        ast::Expr::Constant(ast::ExprConstant { value, .. }) => match value {
            ast::Constant::None => Some(DefaultValue::None),
            ast::Constant::Bool(value) => Some(DefaultValue::Bool(*value)),
            ast::Constant::Int(value) => value.to_i64().map(DefaultValue::Int),
            ast::Constant::Float(value) => Some(DefaultValue::Float(*value)),
            ast::Constant::Str(value) => Some(DefaultValue::Str(value.clone())),
            _ => None,
        },
        ast::Expr::UnaryOp(ast::ExprUnaryOp {
            op: ast::UnaryOp::USub,
            operand,
            ..
        }) => match literal_value(operand)? {
            DefaultValue::Int(value) => value.checked_neg().map(DefaultValue::Int),
            DefaultValue::Float(value) => Some(DefaultValue::Float(-value)),
            _ => None,
        },
        ast::Expr::List(ast::ExprList { elts, .. })
        | ast::Expr::Tuple(ast::ExprTuple { elts, .. }) => elts
            .iter()
            .map(literal_value)
            .collect::<Option<Vec<_>>>()
            .map(DefaultValue::List),
        _ => None,
    }
}

fn extract_inputs(
    module: &PythonModule,
    args: &ast::Arguments,
    reservation_parameter: Option<&str>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<InputDescriptor> {
    let mut inputs = vec![];
    let parameters = args
        .posonlyargs
        .iter()
        .map(|arg| (arg, ParameterKind::PositionalOnly))
        .chain(
            args.args
                .iter()
                .map(|arg| (arg, ParameterKind::PositionalOrKeyword)),
        )
        .chain(
            args.kwonlyargs
                .iter()
                .map(|arg| (arg, ParameterKind::KeywordOnly)),
        );
    for (parameter, kind) in parameters {
        let name = parameter.def.arg.as_str();
        if Some(name) == reservation_parameter {
            continue;
        }
        let native_type = parameter
            .def
            .annotation
            .as_deref()
            .and_then(resolve_type_name);
        let Some(data_type) = native_type.as_deref().and_then(map_type) else {
            diagnostics.push(Diagnostic::UnsupportedParameterType {
                name: name.to_string(),
                native_type,
            });
            continue;
        };
        let default_value = match parameter.default.as_deref() {
            Some(expr) => match literal_value(expr) {
                Some(value) => value,
                None => {
                    diagnostics.push(Diagnostic::UnsupportedDefault {
                        name: name.to_string(),
                        expression: module.text(expr).to_string(),
                    });
                    continue;
                }
            },
            None => data_type.fallback_default(),
        };
        inputs.push(InputDescriptor {
            name: name.to_string(),
            native_type: native_type.unwrap_or_default(),
            data_type,
            default_value,
            kind,
        });
    }
    for variadic in [&args.vararg, &args.kwarg].into_iter().flatten() {
        diagnostics.push(Diagnostic::VariadicParameter {
            name: variadic.arg.as_str().to_string(),
        });
    }
    inputs
}

/// Names of the returned values and whether the return is composite.
fn returned_names(
    module: &PythonModule,
    value: &ast::Expr,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Vec<String>, bool) {
    let (elements, composite) = match value {
        ast::Expr::Tuple(ast::ExprTuple { elts, .. })
        | ast::Expr::List(ast::ExprList { elts, .. }) => (elts.iter().collect::<Vec<_>>(), true),
        other => (vec![other], false),
    };
    let names = elements
        .into_iter()
        .enumerate()
        .map(|(position, element)| match element {
            ast::Expr::Name(ast::ExprName { id, .. }) => id.as_str().to_string(),
            other => {
                diagnostics.push(Diagnostic::NonIdentifierOutput {
                    position,
                    expression: module.text(other).to_string(),
                });
                format!("output_{}", position + 1)
            }
        })
        .collect();
    (names, composite)
}

fn is_none(expr: &ast::Expr) -> bool {
    matches!(
        expr,
        ast::Expr::Constant(ast::ExprConstant {
            value: ast::Constant::None,
            ..
        })
    )
}

/// Extract the typed signature of `function`.
///
/// The parameter named `reservation_parameter` is not a measurement input and
/// is skipped. Outputs are taken from the last `return` at the top level of
/// the function body.
pub fn extract_signature(
    module: &PythonModule,
    function: &ast::StmtFunctionDef,
    reservation_parameter: Option<&str>,
) -> Result<FunctionSignature> {
    let name = function.name.as_str().to_string();
    let mut diagnostics = vec![];
    let inputs = extract_inputs(module, &function.args, reservation_parameter, &mut diagnostics);

    let returned = function.body.iter().rev().find_map(|stmt| match stmt {
        ast::Stmt::Return(ast::StmtReturn { value, .. }) => Some(value.as_deref()),
        _ => None,
    });
    let mut outputs = vec![];
    let mut is_composite_output = false;
    if let Some(value) = returned.flatten().filter(|value| !is_none(value)) {
        let (names, composite) = returned_names(module, value, &mut diagnostics);
        is_composite_output = composite;
        let annotation = function.returns.as_deref().and_then(resolve_type_name);
        match annotation {
            None => {
                for output in names {
                    diagnostics.push(Diagnostic::UnsupportedOutputType {
                        name: output,
                        native_type: None,
                    });
                }
            }
            Some(annotation) => {
                let types = if !composite {
                    vec![annotation]
                } else if let Some(types) = split_composite_type(&annotation) {
                    match types.as_slice() {
                        // `Tuple[X, ...]` declares any number of `X`.
                        [element, rest] if rest == "..." => vec![element.clone(); names.len()],
                        _ => types,
                    }
                } else if let (ast::Expr::List(_), Some(element)) =
                    (value, list_element_type(&annotation))
                {
                    vec![element.to_string(); names.len()]
                } else {
                    vec![annotation]
                };
                if types.len() != names.len() {
                    return Err(Error::OutputMismatch {
                        function: name,
                        returned: names.len(),
                        declared: types.len(),
                    });
                }
                for (position, (output, native_type)) in names.into_iter().zip(types).enumerate()
                {
                    match map_type(&native_type) {
                        Some(data_type) => outputs.push(OutputDescriptor {
                            name: output,
                            native_type,
                            data_type,
                            position,
                        }),
                        None => diagnostics.push(Diagnostic::UnsupportedOutputType {
                            name: output,
                            native_type: Some(native_type),
                        }),
                    }
                }
            }
        }
    }

    for diagnostic in &diagnostics {
        warn!("{}", diagnostic);
    }
    Ok(FunctionSignature {
        name,
        inputs,
        outputs,
        is_composite_output,
        diagnostics,
    })
}
