// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

/// Replace every character that is not ASCII alphanumeric with an underscore.
pub fn sanitize_resource_name(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Turn a sanitized name into a valid Python identifier.
pub fn python_identifier(input: &str) -> String {
    let sanitized = input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();
    match sanitized.chars().next() {
        None => "_".to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{sanitized}"),
        Some(_) => sanitized,
    }
}

pub(crate) fn is_python_identifier(input: &str) -> bool {
    python_identifier(input) == input
}

/// Quote a string as a double-quoted Python literal.
pub fn python_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
