//! Command-line options, one flag per recognized configuration key.

use clap::Parser;
use eyre::{Context, Result};
use solmove_common::config::{
    AccessControl, CallStyle, ConstructorPattern, EnumStyle, ErrorStyle, EventPattern,
    InternalVisibility, MappingType, OptimizationLevel, OptionalValues, OverflowBehavior,
    ReentrancyPattern, StringType, Upgradeability, ViewFunctionBehavior,
};
use solmove_common::TranspileOptions;
use std::{fs, path::PathBuf};

#[derive(Debug, Parser)]
#[command(name = "solmove", version, about = "Transpile Solidity contracts to Aptos Move")]
pub struct App {
    /// Path to the Solidity source file.
    pub input: PathBuf,

    /// Directory the Move package is written to.
    #[arg(short, long, default_value = "out")]
    pub out: PathBuf,

    /// Print the structured result as JSON instead of writing files.
    #[arg(long)]
    pub json: bool,

    #[arg(long, default_value = "0x42")]
    pub module_address: String,

    #[arg(long, default_value = "transpiled")]
    pub package_name: String,

    #[arg(long, default_value = "medium")]
    pub optimization_level: OptimizationLevel,

    #[arg(long, default_value = "table")]
    pub mapping_type: MappingType,

    #[arg(long, default_value = "inline-assert")]
    pub access_control: AccessControl,

    #[arg(long, default_value = "immutable")]
    pub upgradeability: Upgradeability,

    #[arg(long, default_value = "sentinel")]
    pub optional_values: OptionalValues,

    #[arg(long, default_value = "module-qualified")]
    pub call_style: CallStyle,

    #[arg(long, default_value = "mutex")]
    pub reentrancy_pattern: ReentrancyPattern,

    #[arg(long, default_value = "deployer-direct")]
    pub constructor_pattern: ConstructorPattern,

    #[arg(long, default_value = "public-package")]
    pub internal_visibility: InternalVisibility,

    #[arg(long, default_value = "string")]
    pub string_type: StringType,

    #[arg(long, default_value = "native-enum")]
    pub enum_style: EnumStyle,

    #[arg(long, default_value = "abort")]
    pub overflow_behavior: OverflowBehavior,

    #[arg(long, default_value = "annotate")]
    pub view_function_behavior: ViewFunctionBehavior,

    #[arg(long, default_value = "abort-codes")]
    pub error_style: ErrorStyle,

    #[arg(long, default_value = "native")]
    pub event_pattern: EventPattern,

    #[arg(long)]
    pub use_inline_functions: bool,

    #[arg(long)]
    pub emit_source_comments: bool,

    #[arg(long)]
    pub strict_mode: bool,

    #[arg(long)]
    pub generate_specs: bool,

    #[arg(long, default_value_t = true)]
    pub generate_manifest: bool,

    #[arg(long, default_value = "account")]
    pub signer_param_name: String,
}

impl App {
    fn options(&self) -> TranspileOptions {
        TranspileOptions {
            module_address: self.module_address.clone(),
            package_name: self.package_name.clone(),
            optimization_level: self.optimization_level,
            mapping_type: self.mapping_type,
            access_control: self.access_control,
            upgradeability: self.upgradeability,
            optional_values: self.optional_values,
            call_style: self.call_style,
            reentrancy_pattern: self.reentrancy_pattern,
            constructor_pattern: self.constructor_pattern,
            internal_visibility: self.internal_visibility,
            string_type: self.string_type,
            enum_style: self.enum_style,
            overflow_behavior: self.overflow_behavior,
            view_function_behavior: self.view_function_behavior,
            error_style: self.error_style,
            event_pattern: self.event_pattern,
            use_inline_functions: self.use_inline_functions,
            emit_source_comments: self.emit_source_comments,
            strict_mode: self.strict_mode,
            generate_specs: self.generate_specs,
            generate_manifest: self.generate_manifest,
            signer_param_name: self.signer_param_name.clone(),
        }
    }

    /// Runs the transpiler; returns whether errors were reported.
    pub fn run(&self) -> Result<bool> {
        let source = fs::read_to_string(&self.input)
            .wrap_err_with(|| format!("failed to read {}", self.input.display()))?;
        let options = self.options();
        let result = solmove_transpiler::transpile(&source, &options);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
            return Ok(!result.success);
        }

        let sources_dir = self.out.join("sources");
        fs::create_dir_all(&sources_dir)
            .wrap_err_with(|| format!("failed to create {}", sources_dir.display()))?;
        for module in &result.modules {
            let path = sources_dir.join(format!("{}.move", module.name));
            fs::write(&path, &module.source)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        if let Some(manifest) = &result.manifest {
            let path = self.out.join("Move.toml");
            fs::write(&path, manifest)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            println!("wrote {}", path.display());
        }

        for warning in &result.warnings {
            eprintln!("{warning}");
        }
        for error in &result.errors {
            eprintln!("{error}");
        }
        eprintln!(
            "{} module(s), {} warning(s), {} error(s)",
            result.modules.len(),
            result.warnings.len(),
            result.errors.len()
        );
        Ok(!result.success)
    }
}
