//! Transpiler configuration.
//!
//! [`TranspileOptions`] is the single configuration record consumed by every
//! stage of the pipeline. All enum-valued options parse from the kebab-case
//! strings accepted on the command line and in JSON option records.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How aggressively the state planner partitions contract state for
/// Block-STM parallelism.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum OptimizationLevel {
    /// Everything collapses into a single primary resource.
    Low,
    /// Multiple resource groups, aggregators and event-only counters.
    #[default]
    Medium,
    /// All of `medium`, plus per-user resources for sender-keyed mappings.
    High,
}

/// The table flavor used for `mapping` state variables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum MappingType {
    #[default]
    Table,
    SmartTable,
}

/// How ownership-style guards are enforced in emitted code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AccessControl {
    /// `assert!(address_of(account) == state.owner, E_UNAUTHORIZED)`.
    #[default]
    InlineAssert,
    /// An `OwnerCapability` resource checked with `exists<_>`.
    Capability,
}

/// Whether the emitted package keeps an upgrade path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Upgradeability {
    #[default]
    Immutable,
    ResourceAccount,
}

/// Representation of "unset" address-typed state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum OptionalValues {
    /// The zero address `@0x0` stands in for "unset".
    #[default]
    Sentinel,
    /// `Option<address>` fields.
    OptionType,
}

/// Call syntax used for framework functions in emitted code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CallStyle {
    #[default]
    ModuleQualified,
    Receiver,
}

/// Reentrancy-guard lowering for `nonReentrant`-shaped modifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ReentrancyPattern {
    /// A status field toggled on entry and restored at every exit.
    #[default]
    Mutex,
    /// Guards are dropped with a diagnostic.
    None,
}

/// Where the contract's resources are stored at initialization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ConstructorPattern {
    /// A resource account holds the state; its signer capability is retained.
    ResourceAccount,
    /// State lives directly at the publisher's address.
    #[default]
    DeployerDirect,
    /// A named object with a stable seed holds the state.
    NamedObject,
}

/// Move visibility used for Solidity `internal` functions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum InternalVisibility {
    #[default]
    PublicPackage,
    PublicFriend,
    Private,
}

/// Target representation of Solidity `string`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum StringType {
    /// `std::string::String` (UTF-8 checked).
    #[default]
    String,
    /// Raw `vector<u8>`.
    Bytes,
}

/// Target representation of Solidity enums.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EnumStyle {
    #[default]
    NativeEnum,
    U8Constants,
}

/// Arithmetic semantics inside what Solidity called `unchecked` blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum OverflowBehavior {
    #[default]
    Abort,
    Wrapping,
}

/// Whether Solidity `view` functions receive the `#[view]` attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ViewFunctionBehavior {
    #[default]
    Annotate,
    Skip,
}

/// Shape of emitted abort sites.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ErrorStyle {
    /// Bare `u64` constants.
    #[default]
    AbortCodes,
    /// Constants wrapped with `error::invalid_argument` style categories.
    AbortVerbose,
}

/// Event emission style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EventPattern {
    /// Module events (`#[event]` structs + `event::emit`).
    #[default]
    Native,
    /// Legacy `EventHandle` fields stored in the resource.
    EventHandle,
    /// Events are dropped with a diagnostic.
    None,
}

/// The configuration record for a single `transpile` invocation.
///
/// Every stage receives this by reference; nothing in the pipeline mutates
/// it. Identical options plus identical source must produce byte-identical
/// output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct TranspileOptions {
    /// The published address literal used in emitted code and the manifest.
    pub module_address: String,
    /// Package identifier, also the manifest `[package] name`.
    pub package_name: String,
    pub optimization_level: OptimizationLevel,
    pub mapping_type: MappingType,
    pub access_control: AccessControl,
    pub upgradeability: Upgradeability,
    pub optional_values: OptionalValues,
    pub call_style: CallStyle,
    pub reentrancy_pattern: ReentrancyPattern,
    pub constructor_pattern: ConstructorPattern,
    pub internal_visibility: InternalVisibility,
    pub string_type: StringType,
    pub enum_style: EnumStyle,
    pub overflow_behavior: OverflowBehavior,
    pub view_function_behavior: ViewFunctionBehavior,
    pub error_style: ErrorStyle,
    pub event_pattern: EventPattern,
    /// Inline small private helpers with `inline fun`.
    pub use_inline_functions: bool,
    /// Reproduce the original Solidity signature as a comment above each
    /// emitted function.
    pub emit_source_comments: bool,
    /// Promote unsupported-construct warnings to errors that block emission.
    pub strict_mode: bool,
    /// Attach MSL spec blocks for recognized guard patterns.
    pub generate_specs: bool,
    /// Emit a `Move.toml` alongside the sources.
    pub generate_manifest: bool,
    /// Identifier used for the leading signer parameter.
    pub signer_param_name: String,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            module_address: "0x42".to_string(),
            package_name: "transpiled".to_string(),
            optimization_level: OptimizationLevel::default(),
            mapping_type: MappingType::default(),
            access_control: AccessControl::default(),
            upgradeability: Upgradeability::default(),
            optional_values: OptionalValues::default(),
            call_style: CallStyle::default(),
            reentrancy_pattern: ReentrancyPattern::default(),
            constructor_pattern: ConstructorPattern::default(),
            internal_visibility: InternalVisibility::default(),
            string_type: StringType::default(),
            enum_style: EnumStyle::default(),
            overflow_behavior: OverflowBehavior::default(),
            view_function_behavior: ViewFunctionBehavior::default(),
            error_style: ErrorStyle::default(),
            event_pattern: EventPattern::default(),
            use_inline_functions: false,
            emit_source_comments: false,
            strict_mode: false,
            generate_specs: false,
            generate_manifest: true,
            signer_param_name: "account".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn option_enums_parse_kebab_case() {
        assert_eq!(MappingType::from_str("smart-table").unwrap(), MappingType::SmartTable);
        assert_eq!(AccessControl::from_str("inline-assert").unwrap(), AccessControl::InlineAssert);
        assert_eq!(EnumStyle::from_str("u8-constants").unwrap(), EnumStyle::U8Constants);
        assert_eq!(
            ConstructorPattern::from_str("named-object").unwrap(),
            ConstructorPattern::NamedObject
        );
        assert_eq!(OptimizationLevel::from_str("high").unwrap(), OptimizationLevel::High);
    }

    #[test]
    fn options_deserialize_from_partial_json() {
        let opts: TranspileOptions = serde_json::from_str(
            r#"{ "package_name": "counter", "optimization_level": "low" }"#,
        )
        .unwrap();
        assert_eq!(opts.package_name, "counter");
        assert_eq!(opts.optimization_level, OptimizationLevel::Low);
        assert_eq!(opts.signer_param_name, "account");
    }
}
