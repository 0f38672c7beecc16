// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use converter_log::diagnostic;
use indexmap::IndexMap;
use rustpython_parser::ast;

use crate::drivers::{
    Driver, SESSION_CONSTRUCTORS, VISA_OPEN_METHODS, VISA_RESOURCE_KEYWORD,
    VISA_RESOURCE_POSITION, supported_drivers_description,
};
use crate::source::{PythonModule, walk_statements};
use crate::utils::{python_identifier, sanitize_resource_name};
use crate::{Error, Result};

/// Origin of an instrument session: a built-in driver or a VISA resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionSource {
    Driver(Driver),
    /// Resource name sanitized to alphanumerics and underscores.
    Visa { resource: String },
}

impl SessionSource {
    /// Grouping key: driver module alias or sanitized resource name.
    pub fn key(&self) -> &str {
        match self {
            SessionSource::Driver(driver) => driver.module(),
            SessionSource::Visa { resource } => resource,
        }
    }

    /// Key usable as a Python identifier prefix.
    pub fn identifier(&self) -> String {
        python_identifier(self.key())
    }

    pub fn is_relay(&self) -> bool {
        match self {
            SessionSource::Driver(driver) => driver.traits().is_relay_driver,
            SessionSource::Visa { .. } => false,
        }
    }
}

/// Session variables of a function grouped by their source.
///
/// Keys and variables keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionDetail {
    entries: IndexMap<SessionSource, Vec<String>>,
}

impl SessionDetail {
    pub fn new() -> Self {
        SessionDetail {
            entries: IndexMap::new(),
        }
    }

    pub fn add(&mut self, source: SessionSource, variable: impl Into<String>) {
        self.entries
            .entry(source)
            .or_default()
            .push(variable.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SessionSource, &[String])> {
        self.entries
            .iter()
            .map(|(source, variables)| (source, variables.as_slice()))
    }

    pub fn variables(&self, source: &SessionSource) -> &[String] {
        self.entries
            .get(source)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Variables of `source` without repetitions, in first-seen order.
    ///
    /// A variable bound by several `with` statements maps to a single reserved session.
    pub fn distinct_variables(&self, source: &SessionSource) -> Vec<&str> {
        let mut distinct: Vec<&str> = vec![];
        for variable in self.variables(source) {
            if !distinct.contains(&variable.as_str()) {
                distinct.push(variable);
            }
        }
        distinct
    }

    /// Number of distinct session sources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn session_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// A `with` item recognized as an instrument session.
pub(crate) struct SessionItem<'a> {
    pub source: SessionSource,
    pub call: &'a ast::ExprCall,
    pub variable: &'a ast::ExprName,
}

enum CallKind {
    Driver(Driver),
    Visa,
}

fn classify_call(call: &ast::ExprCall) -> Option<CallKind> {
    let ast::Expr::Attribute(ast::ExprAttribute { value, attr, .. }) = call.func.as_ref() else {
        return None;
    };
    if SESSION_CONSTRUCTORS.contains(&attr.as_str()) {
        if let ast::Expr::Name(ast::ExprName { id, .. }) = value.as_ref() {
            if let Some(driver) = Driver::from_module(id.as_str()) {
                return Some(CallKind::Driver(driver));
            }
        }
    }
    if VISA_OPEN_METHODS.contains(&attr.as_str()) {
        return Some(CallKind::Visa);
    }
    None
}

/// Find the resource argument of a session call, by keyword first, then by position.
///
/// String literals yield their value, any other expression its source text.
pub(crate) fn resolve_resource_name(
    module: &PythonModule,
    call: &ast::ExprCall,
    keyword: &str,
    position: usize,
) -> Option<String> {
    let by_keyword = call
        .keywords
        .iter()
        .find(|kw| kw.arg.as_ref().is_some_and(|arg| arg.as_str() == keyword))
        .map(|kw| &kw.value);
    let value = by_keyword.or_else(|| call.args.get(position))?;
    let name = match value {
        ast::Expr::Constant(ast::ExprConstant {
            value: ast::Constant::Str(text),
            ..
        }) => text.clone(),
        other => module.text(other).to_string(),
    };
    Some(name)
}

pub(crate) fn unresolved_resource_error(
    module: &PythonModule,
    call: &ast::ExprCall,
    variable: &ast::ExprName,
    keyword: &str,
    position: usize,
) -> Error {
    Error::UnsupportedDriver(format!(
        "Unable to determine the resource name of session '{}' created by '{}'. \
        Pass it as the `{keyword}` keyword argument or as positional argument {position}.",
        variable.id.as_str(),
        module.text(call),
    ))
}

/// Classify the items of a `with` statement, skipping non-session context managers.
pub(crate) fn session_items<'a>(
    module: &PythonModule,
    with: &'a ast::StmtWith,
) -> Result<Vec<SessionItem<'a>>> {
    let mut items = vec![];
    for item in &with.items {
        let ast::Expr::Call(call) = &item.context_expr else {
            continue;
        };
        let Some(ast::Expr::Name(variable)) = item.optional_vars.as_deref() else {
            continue;
        };
        let source = match classify_call(call) {
            Some(CallKind::Driver(driver)) => SessionSource::Driver(driver),
            Some(CallKind::Visa) => {
                let resource = resolve_resource_name(
                    module,
                    call,
                    VISA_RESOURCE_KEYWORD,
                    VISA_RESOURCE_POSITION,
                )
                .ok_or_else(|| {
                    unresolved_resource_error(
                        module,
                        call,
                        variable,
                        VISA_RESOURCE_KEYWORD,
                        VISA_RESOURCE_POSITION,
                    )
                })?;
                SessionSource::Visa {
                    resource: sanitize_resource_name(&resource),
                }
            }
            None => continue,
        };
        items.push(SessionItem {
            source,
            call,
            variable,
        });
    }
    Ok(items)
}

/// All `with` statements of a function, depth-first in source order.
pub(crate) fn with_statements(function: &ast::StmtFunctionDef) -> Vec<&ast::StmtWith> {
    let mut statements = vec![];
    walk_statements(&function.body, &mut |stmt| {
        if let ast::Stmt::With(with) = stmt {
            statements.push(with);
        }
    });
    statements
}

/// Collect the instrument sessions opened in `with` statements of a function.
///
/// A function without any instrument session cannot be converted.
pub fn detect_sessions(
    module: &PythonModule,
    function: &ast::StmtFunctionDef,
) -> Result<SessionDetail> {
    let mut detail = SessionDetail::new();
    for with in with_statements(function) {
        for item in session_items(module, with)? {
            diagnostic!(
                "Found session '{}' for '{}'",
                item.variable.id.as_str(),
                item.source.key()
            );
            detail.add(item.source, item.variable.id.as_str());
        }
    }
    if detail.is_empty() {
        return Err(Error::UnsupportedDriver(format!(
            "No supported instrument session was found in function '{}'. Supported drivers: {}.",
            function.name.as_str(),
            supported_drivers_description()
        )));
    }
    Ok(detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(source: &str) -> Result<SessionDetail> {
        let module = PythonModule::parse(source, "test.py").unwrap();
        let function = module.function("measure").unwrap();
        detect_sessions(&module, function)
    }

    #[test]
    fn test_groups_by_driver_in_first_seen_order() {
        let detail = detect(
            "\
def measure():
    with nidcpower.Session(resource_name=\"DCPower1/0\") as smu1:
        pass
    with nidmm.Session(\"DMM1\") as dmm:
        pass
    with nidcpower.Session(\"DCPower1/1\") as smu2:
        pass
",
        )
        .unwrap();
        assert_eq!(detail.len(), 2);
        assert_eq!(detail.session_count(), 3);
        let entries = detail.iter().collect::<Vec<_>>();
        assert_eq!(entries[0].0, &SessionSource::Driver(Driver::NiDcPower));
        assert_eq!(entries[0].1, &["smu1".to_string(), "smu2".to_string()]);
        assert_eq!(entries[1].0, &SessionSource::Driver(Driver::NiDmm));
        assert_eq!(entries[1].1, &["dmm".to_string()]);
    }

    #[test]
    fn test_visa_sessions_are_keyed_by_sanitized_resource() {
        let detail = detect(
            "\
def measure():
    rm = pyvisa.ResourceManager()
    with rm.open_resource(\"GPIB0::12::INSTR\") as scope:
        pass
    with rm.open_resource(resource_name=\"GPIB0::12::INSTR\") as again:
        pass
",
        )
        .unwrap();
        let source = SessionSource::Visa {
            resource: "GPIB0__12__INSTR".to_string(),
        };
        assert_eq!(detail.len(), 1);
        assert_eq!(
            detail.variables(&source),
            &["scope".to_string(), "again".to_string()]
        );
        assert_eq!(source.key(), "GPIB0__12__INSTR");
        assert!(!source.is_relay());
    }

    #[test]
    fn test_ignores_other_context_managers() {
        let detail = detect(
            "\
def measure(path):
    with open(path) as f, threading.Lock() as lock:
        pass
    with requests.Session() as http:
        pass
    with nidmm.Session(\"DMM1\"):
        pass
    with niswitch.Session(\"Switch1\") as relay:
        pass
",
        )
        .unwrap();
        assert_eq!(detail.len(), 1);
        assert_eq!(
            detail.variables(&SessionSource::Driver(Driver::NiSwitch)),
            &["relay".to_string()]
        );
    }

    #[test]
    fn test_finds_nested_sessions() {
        let detail = detect(
            "\
def measure(count):
    for i in range(count):
        if i % 2:
            with nidaqmx.Task(\"ai\") as task:
                pass
        else:
            try:
                with niscope.Session(\"Scope1\") as scope:
                    pass
            finally:
                pass
",
        )
        .unwrap();
        let keys = detail.iter().map(|(s, _)| s.key()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["nidaqmx", "niscope"]);
    }

    #[test]
    fn test_finds_sessions_in_exception_groups() {
        let detail = detect(
            "\
def measure():
    try:
        with nidmm.Session(\"DMM1\") as dmm:
            pass
    except* ValueError:
        with nifgen.Session(\"FGEN1\") as fgen:
            pass
",
        )
        .unwrap();
        let keys = detail.iter().map(|(s, _)| s.key()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["nidmm", "nifgen"]);
    }

    #[test]
    fn test_distinct_variables() {
        let mut detail = SessionDetail::new();
        let source = SessionSource::Driver(Driver::NiDmm);
        detail.add(source.clone(), "dmm");
        detail.add(source.clone(), "dmm2");
        detail.add(source.clone(), "dmm");
        assert_eq!(detail.variables(&source).len(), 3);
        assert_eq!(detail.distinct_variables(&source), vec!["dmm", "dmm2"]);
        assert!(
            detail
                .distinct_variables(&SessionSource::Driver(Driver::NiScope))
                .is_empty()
        );
    }

    #[test]
    fn test_no_sessions_is_an_error() {
        let err = detect(
            "\
def measure(a: int) -> int:
    with open('log.txt') as f:
        f.write('x')
    return a
",
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedDriver(_)));
        assert!(err.to_string().contains("nidcpower"));
    }

    #[test]
    fn test_visa_without_resource_is_an_error() {
        let err = detect(
            "\
def measure():
    with rm.open_resource() as instr:
        pass
",
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedDriver(_)));
        assert!(err.to_string().contains("'instr'"));
    }
}
