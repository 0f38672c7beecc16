// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Parsed Python source with byte-range access to its syntax tree.
use std::ops::Range;

use rustpython_parser::Parse;
use rustpython_parser::ast::{self, Ranged};
use rustpython_parser::text_size::TextRange;

use crate::{Error, Result};

pub struct PythonModule {
    source: String,
    path: String,
    suite: ast::Suite,
}

impl PythonModule {
    pub fn parse(source: impl Into<String>, path: &str) -> Result<Self> {
        let source = source.into();
        let suite = ast::Suite::parse(&source, path)
            .map_err(|err| Error::InvalidInput(format!("Failed to parse '{path}': {err}")))?;
        Ok(PythonModule {
            source,
            path: path.to_string(),
            suite,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn statements(&self) -> &[ast::Stmt] {
        &self.suite
    }

    /// Find a top-level function definition by name.
    pub fn function(&self, name: &str) -> Result<&ast::StmtFunctionDef> {
        self.suite
            .iter()
            .find_map(|stmt| match stmt {
                ast::Stmt::FunctionDef(function) if function.name.as_str() == name => {
                    Some(function)
                }
                _ => None,
            })
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Function '{name}' was not found in '{}'",
                    self.path
                ))
            })
    }

    /// Source text of a node.
    pub fn text(&self, node: &impl Ranged) -> &str {
        &self.source[span(node)]
    }
}

pub fn span(node: &impl Ranged) -> Range<usize> {
    to_span(node.range())
}

pub fn to_span(range: TextRange) -> Range<usize> {
    usize::from(range.start())..usize::from(range.end())
}

/// Text between the start of the line containing `offset` and `offset`.
pub fn line_prefix(source: &str, offset: usize) -> &str {
    let line_start = source[..offset].rfind('\n').map_or(0, |index| index + 1);
    &source[line_start..offset]
}

/// Visit every statement below `body` depth-first, in source order.
///
/// A statement is visited before the statements nested in it.
pub fn walk_statements<'a, F>(body: &'a [ast::Stmt], visit: &mut F)
where
    F: FnMut(&'a ast::Stmt),
{
    for stmt in body {
        visit(stmt);
        match stmt {
            ast::Stmt::FunctionDef(ast::StmtFunctionDef { body, .. })
            | ast::Stmt::AsyncFunctionDef(ast::StmtAsyncFunctionDef { body, .. })
            | ast::Stmt::ClassDef(ast::StmtClassDef { body, .. })
            | ast::Stmt::With(ast::StmtWith { body, .. })
            | ast::Stmt::AsyncWith(ast::StmtAsyncWith { body, .. }) => {
                walk_statements(body, visit);
            }
            ast::Stmt::If(ast::StmtIf { body, orelse, .. })
            | ast::Stmt::For(ast::StmtFor { body, orelse, .. })
            | ast::Stmt::AsyncFor(ast::StmtAsyncFor { body, orelse, .. })
            | ast::Stmt::While(ast::StmtWhile { body, orelse, .. }) => {
                walk_statements(body, visit);
                walk_statements(orelse, visit);
            }
            ast::Stmt::Try(ast::StmtTry {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            })
            | ast::Stmt::TryStar(ast::StmtTryStar {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            }) => {
                walk_statements(body, visit);
                for handler in handlers {
                    let ast::ExceptHandler::ExceptHandler(handler) = handler;
                    walk_statements(&handler.body, visit);
                }
                walk_statements(orelse, visit);
                walk_statements(finalbody, visit);
            }
            ast::Stmt::Match(ast::StmtMatch { cases, .. }) => {
                for case in cases {
                    walk_statements(&case.body, visit);
                }
            }
            _ => {}
        }
    }
}

/// Line ending style of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn detect(source: &str) -> Self {
        match source.find('\n') {
            Some(index) if source[..index].ends_with('\r') => LineEnding::CrLf,
            _ => LineEnding::Lf,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "\
import nidmm


def helper():
    pass


def measure(a: int):
    if a > 0:
        for i in range(a):
            with open('x') as f:
                pass
    else:
        try:
            pass
        except ValueError:
            while True:
                break
    return a
";

    #[test]
    fn test_function_lookup() {
        let module = PythonModule::parse(SOURCE, "test.py").unwrap();
        let function = module.function("measure").unwrap();
        assert_eq!(function.name.as_str(), "measure");
        assert!(module.function("helper").is_ok());
        let err = module.function("missing").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("'missing'"));
    }

    #[test]
    fn test_parse_error_is_invalid_input() {
        let err = PythonModule::parse("def broken(:\n", "broken.py")
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("broken.py"));
    }

    #[test]
    fn test_walk_statements_is_preorder() {
        let module = PythonModule::parse(SOURCE, "test.py").unwrap();
        let function = module.function("measure").unwrap();
        let mut kinds = vec![];
        walk_statements(&function.body, &mut |stmt| {
            let kind = match stmt {
                ast::Stmt::If(_) => "if",
                ast::Stmt::For(_) => "for",
                ast::Stmt::With(_) => "with",
                ast::Stmt::Pass(_) => "pass",
                ast::Stmt::Try(_) => "try",
                ast::Stmt::While(_) => "while",
                ast::Stmt::Break(_) => "break",
                ast::Stmt::Return(_) => "return",
                _ => "other",
            };
            kinds.push(kind);
        });
        assert_eq!(
            kinds,
            vec![
                "if", "for", "with", "pass", "try", "pass", "while", "break", "return"
            ]
        );
    }

    #[test]
    fn test_text_and_line_prefix() {
        let module = PythonModule::parse(SOURCE, "test.py").unwrap();
        let function = module.function("measure").unwrap();
        let first = &function.body[0];
        assert!(module.text(first).starts_with("if a > 0:"));
        assert_eq!(line_prefix(module.source(), span(first).start), "    ");
        assert_eq!(line_prefix("abc", 2), "ab");
    }

    #[test]
    fn test_line_ending_detection() {
        assert_eq!(LineEnding::detect("a\nb\n"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("a\r\nb\r\n"), LineEnding::CrLf);
        assert_eq!(LineEnding::detect("a"), LineEnding::Lf);
    }
}
