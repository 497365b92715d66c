//! Solidity → Aptos Move source transpiler.
//!
//! The pipeline: parse (solang), lower to the IR, derive the resource plan,
//! transform into the Move AST and emit text plus a package manifest. Every
//! pass is pure and deterministic; all per-contract mutable state lives in a
//! translation context created here and dropped before returning.

mod abort;
mod builder;
mod constructor;
mod ctx;
mod exprs;
mod functions;
mod interfaces;
mod modifiers;
mod specs;
mod stmts;
mod types;

pub use solmove_common::{config, Diagnostic, DiagnosticKind, Diagnostics, TranspileOptions};

use serde::Serialize;
use solmove_ir::lower::lower_source;
use solmove_move_ast::{emit_module, render_manifest, runtime};

/// One emitted Move source file.
#[derive(Clone, Debug, Serialize)]
pub struct MoveModuleOutput {
    /// Module name (also the suggested file stem).
    pub name: String,
    pub source: String,
}

/// The structured result of a `transpile` call.
#[derive(Debug, Serialize)]
pub struct TranspileResult {
    /// True when no errors remain after translation.
    pub success: bool,
    pub modules: Vec<MoveModuleOutput>,
    pub warnings: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
    pub manifest: Option<String>,
}

/// Translates every contract in `source` into Move modules.
///
/// Generated text is returned even on partial failure unless strict mode is
/// set, in which case errors suppress the module output.
pub fn transpile(source: &str, options: &TranspileOptions) -> TranspileResult {
    let mut diags = Diagnostics::new(options.strict_mode);

    if options.upgradeability == config::Upgradeability::ResourceAccount
        && options.constructor_pattern != config::ConstructorPattern::ResourceAccount
    {
        diags.warn(
            DiagnosticKind::UnsupportedConstruct,
            "upgradeability `resource-account` requires the resource-account constructor pattern; \
             no signer capability will be retained",
        );
    }

    let unit = match lower_source(source, &mut diags) {
        Ok(unit) => unit,
        Err(err) => {
            tracing::debug!(%err, "front-end rejected the source");
            let (warnings, errors) = diags.into_parts();
            return TranspileResult {
                success: false,
                modules: Vec::new(),
                warnings,
                errors,
                manifest: None,
            };
        }
    };

    let mut modules = Vec::new();
    let mut needs_runtime = false;
    let mut needs_token_objects = false;

    for contract in &unit.contracts {
        let plan = solmove_analysis::plan::plan(contract, options.optimization_level);
        let mut ctx = ctx::Ctx::new(options, contract, &unit.interfaces, &plan, &mut diags);
        let module = builder::build_module(&mut ctx);
        needs_runtime |= ctx.needs_runtime;
        needs_token_objects |= ctx.needs_token_objects;
        let source = emit_module(&module);
        modules.push(MoveModuleOutput { name: module.name.clone(), source });
    }

    if needs_runtime {
        modules.push(MoveModuleOutput {
            name: runtime::RUNTIME_MODULE.to_string(),
            source: runtime::runtime_module_source(&options.module_address),
        });
    }

    let manifest = options.generate_manifest.then(|| {
        render_manifest(&options.package_name, &options.module_address, needs_token_objects)
    });

    let success = !diags.has_errors();
    let (warnings, errors) = diags.into_parts();
    let modules = if options.strict_mode && !success { Vec::new() } else { modules };

    TranspileResult { success, modules, warnings, errors, manifest }
}
