// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use anyhow::anyhow;
use rustpython_parser::ast;

use crate::Result;
use crate::edits::{EditPlan, SourceEdit};
use crate::source::{PythonModule, to_span};

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Byte offset of the opening parenthesis of the parameter list.
fn parameter_list_start(module: &PythonModule, function: &ast::StmtFunctionDef) -> Result<usize> {
    let mut span = to_span(function.range);
    // Decorators may contain arbitrary text, start looking after the last one.
    if let Some(decorator) = function.decorator_list.last() {
        span.start = span.start.max(crate::source::span(decorator).end);
    }
    let text = &module.source()[span.clone()];
    let name = function.name.as_str();
    for (index, _) in text.match_indices("def") {
        if text[..index].chars().last().is_some_and(is_identifier_char) {
            continue;
        }
        let rest = &text[index + "def".len()..];
        let trimmed = rest.trim_start();
        if trimmed.len() == rest.len() {
            continue;
        }
        let Some(after_name) = trimmed.strip_prefix(name) else {
            continue;
        };
        if after_name.starts_with(is_identifier_char) {
            continue;
        }
        if let Some(paren) = after_name.find('(') {
            return Ok(span.start + text.len() - after_name.len() + paren);
        }
    }
    Err(anyhow!("Internal error: Parameter list of function '{name}' not found").into())
}

/// Insert `parameter` as the first positional parameter of `function`.
///
/// Running this twice on the same function inserts the parameter twice.
pub fn rewrite_signature(
    module: &PythonModule,
    function: &ast::StmtFunctionDef,
    parameter: &str,
    plan: &mut EditPlan,
) -> Result<()> {
    let args = &function.args;
    if let Some(first) = args.posonlyargs.first().or_else(|| args.args.first()) {
        let offset = to_span(first.def.range).start;
        plan.push(SourceEdit::insert(offset, format!("{parameter}, ")));
        return Ok(());
    }
    let has_other_parameters =
        args.vararg.is_some() || !args.kwonlyargs.is_empty() || args.kwarg.is_some();
    let text = if has_other_parameters {
        format!("{parameter}, ")
    } else {
        parameter.to_string()
    };
    let offset = parameter_list_start(module, function)? + 1;
    plan.push(SourceEdit::insert(offset, text));
    Ok(())
}
