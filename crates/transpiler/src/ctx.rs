//! Per-contract translation context.
//!
//! Everything mutable during a single contract's translation lives here:
//! the diagnostic collector, the abort-code table, the import set and the
//! feature flags that decide which extra outputs (runtime module, token
//! object binding) the driver appends. Created at the start of a contract's
//! translation and discarded after emission.

use crate::{abort::AbortCodes, types::{self, TypeLookup}};
use solmove_analysis::{GroupKind, ResourcePlan};
use solmove_common::{ident, Diagnostics, TranspileOptions};
use solmove_ir::{Contract, Interface, Ty};
use solmove_move_ast::{MoveExpr, MoveType};
use std::collections::{BTreeMap, BTreeSet};

pub(crate) struct Ctx<'a> {
    pub opts: &'a TranspileOptions,
    pub contract: &'a Contract,
    pub interfaces: &'a [Interface],
    pub plan: &'a ResourcePlan,
    pub diags: &'a mut Diagnostics,
    pub lookup: TypeLookup,
    pub abort: AbortCodes,
    /// Import paths collected while transforming; deduplicated by the
    /// emitter.
    pub uses: BTreeSet<String>,
    pub needs_runtime: bool,
    pub needs_token_objects: bool,
}

impl<'a> Ctx<'a> {
    pub fn new(
        opts: &'a TranspileOptions,
        contract: &'a Contract,
        interfaces: &'a [Interface],
        plan: &'a ResourcePlan,
        diags: &'a mut Diagnostics,
    ) -> Self {
        let lookup = TypeLookup {
            structs: contract.structs.iter().map(|s| s.name.clone()).collect(),
            enums: contract.enums.iter().map(|e| e.name.clone()).collect(),
            interfaces: interfaces.iter().map(|i| i.name.clone()).collect(),
        };
        Self {
            opts,
            contract,
            interfaces,
            plan,
            diags,
            lookup,
            abort: AbortCodes::new(),
            uses: BTreeSet::new(),
            needs_runtime: false,
            needs_token_objects: false,
        }
    }

    /// Registers an import.
    pub fn use_(&mut self, path: &str) {
        self.uses.insert(path.to_string());
    }

    /// Marks the runtime helper module as referenced and returns the call
    /// prefix for one of its functions.
    pub fn runtime_fn(&mut self, name: &str) -> String {
        self.needs_runtime = true;
        self.use_(&format!("{}::evm_math", self.opts.module_address));
        format!("evm_math::{name}")
    }

    pub fn map_ty(&mut self, ty: &Ty) -> MoveType {
        let mapped = types::map_type(ty, self.opts, &self.lookup, self.diags);
        self.register_type_uses(&mapped);
        mapped
    }

    /// Pulls in the imports a type's rendering depends on.
    pub fn register_type_uses(&mut self, ty: &MoveType) {
        match ty {
            MoveType::String => self.use_("std::string::String"),
            MoveType::Table(k, v) => {
                self.use_("aptos_std::table::{Self, Table}");
                self.register_type_uses(k);
                self.register_type_uses(v);
            }
            MoveType::SmartTable(k, v) => {
                self.use_("aptos_std::smart_table::{Self, SmartTable}");
                self.register_type_uses(k);
                self.register_type_uses(v);
            }
            MoveType::Aggregator(inner) => {
                self.use_("aptos_framework::aggregator_v2::{Self, Aggregator}");
                self.register_type_uses(inner);
            }
            MoveType::Option(inner) => {
                self.use_("std::option::{Self, Option}");
                self.register_type_uses(inner);
            }
            MoveType::Vector(inner) | MoveType::Ref(inner) | MoveType::MutRef(inner) => {
                self.register_type_uses(inner);
            }
            _ => {}
        }
    }

    /// The module function prefix for the configured mapping type.
    pub fn table_mod(&self) -> &'static str {
        match self.opts.mapping_type {
            solmove_common::config::MappingType::Table => "table",
            solmove_common::config::MappingType::SmartTable => "smart_table",
        }
    }

    /// The Move field name of a state variable.
    pub fn field_name(&self, var: &str) -> String {
        ident::to_move_ident(var)
    }

    /// The local binding each resource group is borrowed into.
    pub fn group_local(kind: GroupKind) -> &'static str {
        match kind {
            GroupKind::AdminConfig => "admin_config",
            GroupKind::Counters => "counters",
            GroupKind::UserData => "user_data",
            GroupKind::State => "state",
        }
    }

    /// The address the contract's resources live at.
    pub fn state_address_expr(&mut self) -> MoveExpr {
        use solmove_common::config::ConstructorPattern;
        match self.opts.constructor_pattern {
            ConstructorPattern::DeployerDirect => {
                MoveExpr::Address(self.opts.module_address.clone())
            }
            ConstructorPattern::ResourceAccount | ConstructorPattern::NamedObject => {
                MoveExpr::call("state_address", vec![])
            }
        }
    }

    /// The default value of a Move type, used for missing initializers and
    /// mapping reads of absent keys.
    pub fn default_value(&mut self, ty: &MoveType) -> MoveExpr {
        match ty {
            t if t.is_integer() => MoveExpr::zero(),
            MoveType::Bool => MoveExpr::Bool(false),
            MoveType::Address => MoveExpr::Address("0x0".to_string()),
            MoveType::Vector(_) => MoveExpr::VectorLit(Vec::new()),
            MoveType::String => {
                self.use_("std::string::{Self, String}");
                MoveExpr::call("string::utf8", vec![MoveExpr::ByteString(String::new())])
            }
            MoveType::Option(_) => {
                self.use_("std::option::{Self, Option}");
                MoveExpr::call("option::none", vec![])
            }
            MoveType::Table(..) => {
                self.use_("aptos_std::table::{Self, Table}");
                MoveExpr::call("table::new", vec![])
            }
            MoveType::SmartTable(..) => {
                self.use_("aptos_std::smart_table::{Self, SmartTable}");
                MoveExpr::call("smart_table::new", vec![])
            }
            MoveType::Aggregator(_) => {
                self.use_("aptos_framework::aggregator_v2::{Self, Aggregator}");
                MoveExpr::call("aggregator_v2::create_unbounded_aggregator", vec![])
            }
            _ => MoveExpr::zero(),
        }
    }
}

/// What a local variable is known to hold, for interface-call routing and
/// mapping-copy write-back detection.
#[derive(Clone, Debug, Default)]
pub(crate) struct LocalBinding {
    /// The interface this local was cast from, e.g. `IERC20 token = IERC20(a)`.
    pub interface: Option<String>,
    /// The struct type, when the local is a struct copy.
    pub struct_name: Option<String>,
}

/// A synthesized write-back of a struct copy taken from a mapping.
#[derive(Clone, Debug)]
pub(crate) struct Writeback {
    /// State variable the copy came from.
    pub var: String,
    /// The transformed key expression, cloned at each exit.
    pub key: MoveExpr,
    /// Move-side name of the local copy.
    pub local: String,
}

/// Per-function translation state.
#[derive(Clone, Debug, Default)]
pub(crate) struct FnCtx {
    /// IR-side function name (the key into the resource plan).
    pub ir_name: String,
    pub is_view: bool,
    /// Name of the signer parameter, when the function has one.
    pub signer: Option<String>,
    /// Name of the promoted address parameter in signer-less functions.
    pub sender_param: Option<String>,
    /// Locals holding borrowed resource groups.
    pub group_refs: BTreeMap<GroupKind, String>,
    /// Local holding the borrowed per-user resource.
    pub user_ref: Option<String>,
    /// Known facts about locals, keyed by source name.
    pub locals: BTreeMap<String, LocalBinding>,
    pub param_names: BTreeSet<String>,
    /// Mapped bit widths of integer-typed parameters, for widening casts.
    pub param_widths: BTreeMap<String, u16>,
    /// Cleanup statements cloned in front of every return site.
    pub cleanup: Vec<solmove_move_ast::MoveStmt>,
    pub writebacks: Vec<Writeback>,
    /// Named return variables `(move name, type)`, declared up front.
    pub named_returns: Vec<(String, MoveType)>,
    /// Internal functions receive resource references as parameters instead
    /// of borrowing globally.
    pub is_internal: bool,
}

impl FnCtx {
    /// The expression for `msg.sender` in this function.
    pub fn sender_expr(&mut self, ctx: &mut Ctx<'_>) -> MoveExpr {
        if let Some(signer) = &self.signer {
            ctx.use_("std::signer");
            return MoveExpr::call("signer::address_of", vec![MoveExpr::ident(signer.clone())]);
        }
        let name = self
            .sender_param
            .get_or_insert_with(|| "sender".to_string())
            .clone();
        MoveExpr::ident(name)
    }

    /// The local a group is available under, if borrowed.
    pub fn group_ref(&self, kind: GroupKind) -> Option<&str> {
        self.group_refs.get(&kind).map(String::as_str)
    }
}
