// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use converter_log::diagnostic;
use rustpython_parser::ast;

use crate::Result;
use crate::drivers::{
    VISA_INITIALIZER, VISA_PLURAL_INITIALIZER, VISA_RESOURCE_KEYWORD, VISA_RESOURCE_POSITION,
};
use crate::edits::{EditPlan, SourceEdit};
use crate::passes::detect_sessions::{
    SessionDetail, SessionItem, SessionSource, resolve_resource_name, session_items,
    unresolved_resource_error, with_statements,
};
use crate::settings::ConverterSettings;
use crate::source::{PythonModule, line_prefix, span, to_span};
use crate::utils::sanitize_resource_name;

/// A session whose construction was replaced by a reservation call.
#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenSession {
    pub source: SessionSource,
    /// Sanitized resource name found in the original constructor call.
    pub resource_name: String,
    /// Variable the original code bound the session to.
    pub actual_name: String,
    /// Expression of the session information the variable is re-bound from.
    pub session_info: String,
}

/// Result of rewriting all sessions of a function, in body order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionRewrite {
    pub sessions: Vec<RewrittenSession>,
}

impl SessionRewrite {
    /// Distinct VISA sources in first-seen order.
    pub fn visa_sources(&self) -> Vec<&SessionSource> {
        let mut sources: Vec<&SessionSource> = vec![];
        for session in &self.sessions {
            if matches!(session.source, SessionSource::Visa { .. })
                && !sources.contains(&&session.source)
            {
                sources.push(&session.source);
            }
        }
        sources
    }
}

fn resolve_session_resource(module: &PythonModule, item: &SessionItem<'_>) -> Result<String> {
    let (keyword, position) = match &item.source {
        SessionSource::Driver(driver) => (
            driver.traits().resource_keyword,
            driver.traits().resource_position,
        ),
        SessionSource::Visa { .. } => (VISA_RESOURCE_KEYWORD, VISA_RESOURCE_POSITION),
    };
    resolve_resource_name(module, item.call, keyword, position)
        .map(|name| sanitize_resource_name(&name))
        .ok_or_else(|| {
            unresolved_resource_error(module, item.call, item.variable, keyword, position)
        })
}

fn initializer_call(source: &SessionSource, plural: bool, reservation: &str) -> String {
    match source {
        SessionSource::Driver(driver) => {
            let traits = driver.traits();
            let initializer = if plural {
                traits.plural_initializer
            } else {
                traits.initializer
            };
            format!("{reservation}.{initializer}()")
        }
        SessionSource::Visa { .. } => {
            let id = source.identifier();
            let initializer = if plural {
                VISA_PLURAL_INITIALIZER
            } else {
                VISA_INITIALIZER
            };
            format!(
                "{reservation}.{initializer}({id}_session_constructor, {id}_instrument_type)"
            )
        }
    }
}

/// Insert statements in front of the first statement of a `with` body.
fn rebind_edit(
    module: &PythonModule,
    with: &ast::StmtWith,
    statements: &[String],
) -> Option<SourceEdit> {
    let offset = span(with.body.first()?).start;
    let prefix = line_prefix(module.source(), offset);
    let text = if prefix.trim().is_empty() {
        statements
            .iter()
            .map(|statement| format!("{statement}\n{prefix}"))
            .collect::<String>()
    } else {
        // Body shares the line with the `with` statement.
        statements
            .iter()
            .map(|statement| format!("{statement}; "))
            .collect::<String>()
    };
    Some(SourceEdit::insert(offset, text))
}

fn is_module_preamble(index: usize, stmt: &ast::Stmt) -> bool {
    match stmt {
        ast::Stmt::Expr(ast::StmtExpr { value, .. }) => {
            index == 0
                && matches!(
                    value.as_ref(),
                    ast::Expr::Constant(ast::ExprConstant {
                        value: ast::Constant::Str(_),
                        ..
                    })
                )
        }
        ast::Stmt::ImportFrom(ast::StmtImportFrom { module, .. }) => module
            .as_ref()
            .is_some_and(|module| module.as_str() == "__future__"),
        _ => false,
    }
}

/// Import the VISA helper definitions right after the module docstring and
/// `__future__` imports.
fn visa_import_edit(
    module: &PythonModule,
    sources: &[&SessionSource],
    helper_module: &str,
) -> SourceEdit {
    let offset = module
        .statements()
        .iter()
        .enumerate()
        .find(|(index, stmt)| !is_module_preamble(*index, stmt))
        .map_or(module.source().len(), |(_, stmt)| span(stmt).start);
    let text = sources
        .iter()
        .map(|source| {
            let id = source.identifier();
            format!("from {helper_module} import {id}_instrument_type, {id}_session_constructor\n")
        })
        .collect::<String>();
    SourceEdit::insert(offset, text)
}

/// Replace every instrument session construction in `function` by a reservation call.
///
/// The bound variable is renamed to the session information identifier and the
/// original name is re-bound to its session as the first statement of the `with` body.
pub fn rewrite_sessions(
    module: &PythonModule,
    function: &ast::StmtFunctionDef,
    detail: &SessionDetail,
    settings: &ConverterSettings,
    plan: &mut EditPlan,
) -> Result<SessionRewrite> {
    let reservation = settings.reservation_parameter.as_str();
    let mut rewrite = SessionRewrite::default();
    let mut rebinds = vec![];

    for with in with_statements(function) {
        let items = session_items(module, with)?;
        if items.is_empty() {
            continue;
        }
        let suffixed = items.len() > 1;
        let mut statements = vec![];
        for (position, item) in items.iter().enumerate() {
            let resource_name = resolve_session_resource(module, item)?;
            let actual_name = item.variable.id.as_str().to_string();
            let distinct = detail.distinct_variables(&item.source);
            let plural = distinct.len() > 1;
            let index = distinct
                .iter()
                .position(|variable| *variable == actual_name)
                .unwrap_or_default();

            let mut identifier = if plural {
                settings.session_infos_name.clone()
            } else {
                settings.session_info_name.clone()
            };
            if suffixed {
                identifier = format!("{identifier}_{}", position + 1);
            }
            let session_info = if plural {
                format!("{identifier}[{index}]")
            } else {
                identifier.clone()
            };

            plan.push(SourceEdit::replace(
                to_span(item.call.range),
                initializer_call(&item.source, plural, reservation),
            ));
            plan.push(SourceEdit::replace(
                to_span(item.variable.range),
                identifier,
            ));
            statements.push(format!("{actual_name} = {session_info}.session"));
            diagnostic!(
                "Rewrote session '{}' of '{}' (resource '{}')",
                actual_name,
                item.source.key(),
                resource_name
            );
            rewrite.sessions.push(RewrittenSession {
                source: item.source.clone(),
                resource_name,
                actual_name,
                session_info,
            });
        }
        rebinds.push((with, statements));
    }

    for (with, statements) in rebinds {
        if let Some(edit) = rebind_edit(module, with, &statements) {
            plan.push(edit);
        }
    }
    let visa_sources = rewrite.visa_sources();
    if !visa_sources.is_empty() {
        plan.push(visa_import_edit(
            module,
            &visa_sources,
            &settings.helper_module,
        ));
    }
    Ok(rewrite)
}
