// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use converter_log::{debug, info};
use rustpython_parser::ast;

use crate::edits::{EditPlan, reformat};
use crate::passes::classify_pins::{PinClassification, classify_pins};
use crate::passes::detect_sessions::{SessionDetail, detect_sessions};
use crate::passes::rewrite_sessions::{SessionRewrite, rewrite_sessions};
use crate::passes::rewrite_signature::rewrite_signature;
use crate::settings::ConverterSettings;
use crate::signature::{FunctionSignature, extract_signature};
use crate::source::{LineEnding, PythonModule};
use crate::{Error, Result};

/// Outcome of converting a measurement function into plug-in shape.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Complete text of the migrated measurement file.
    pub migrated_source: String,
    /// Signature of the migrated function, without the reservation parameter.
    pub signature: FunctionSignature,
    pub detail: SessionDetail,
    pub sessions: SessionRewrite,
    pub pins: PinClassification,
}

fn has_parameter(function: &ast::StmtFunctionDef, name: &str) -> bool {
    let args = &function.args;
    args.posonlyargs
        .iter()
        .chain(args.args.iter())
        .chain(args.kwonlyargs.iter())
        .any(|arg| arg.def.arg.as_str() == name)
        || [&args.vararg, &args.kwarg]
            .into_iter()
            .flatten()
            .any(|arg| arg.arg.as_str() == name)
}

/// Convert `function_name` of the Python module `source`.
///
/// Nothing is written to disk: the caller decides where the migrated source goes.
/// Any failure aborts the whole conversion.
pub fn convert_measurement(
    source: &str,
    path: &str,
    function_name: &str,
    settings: &ConverterSettings,
) -> Result<Conversion> {
    let module = PythonModule::parse(source, path)?;
    let function = module.function(function_name)?;
    if has_parameter(function, &settings.reservation_parameter) {
        return Err(Error::InvalidInput(format!(
            "Function '{function_name}' already has a parameter named '{}'. \
            Was it converted before?",
            settings.reservation_parameter
        )));
    }

    let detail = detect_sessions(&module, function)?;
    info!(
        "Detected {} session(s) of {} driver(s) in '{}'",
        detail.session_count(),
        detail.len(),
        function_name
    );

    let mut plan = EditPlan::new();
    rewrite_signature(
        &module,
        function,
        &settings.reservation_parameter,
        &mut plan,
    )?;
    let sessions = rewrite_sessions(&module, function, &detail, settings, &mut plan)?;
    debug!("Applying {} source edit(s)", plan.len());
    let rewritten = plan.apply(module.source())?;
    let migrated_source = reformat(&rewritten, LineEnding::detect(module.source()));

    // The signature is taken from the migrated text, which must still parse.
    let migrated = PythonModule::parse(migrated_source.as_str(), path).map_err(|err| {
        Error::Anyhow(anyhow::anyhow!(
            "Internal error: The migrated source does not parse: {err}"
        ))
    })?;
    let migrated_function = migrated.function(function_name)?;
    let signature = extract_signature(
        &migrated,
        migrated_function,
        Some(settings.reservation_parameter.as_str()),
    )?;
    let pins = classify_pins(&detail, settings);

    Ok(Conversion {
        migrated_source,
        signature,
        detail,
        sessions,
        pins,
    })
}
