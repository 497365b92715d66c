//! Lowering from the solang parse tree into the IR (stage S2).
//!
//! The parse tree arrives already flattened by [`crate::flatten`]; lowering
//! is a single pass that never constructs parse-tree nodes, only reads them.

mod exprs;
mod stmts;

pub(crate) use exprs::lower_expr;
pub(crate) use stmts::lower_block;

use crate::{
    ast::*,
    flatten::{self, FlattenedUnit},
    ty::Ty,
};
use solang_parser::pt;
use solmove_common::{DiagnosticKind, Diagnostics, TranspileError};
use std::collections::BTreeSet;

/// The lowered source unit: flattened contracts plus interface signatures
/// used for cross-contract call routing.
#[derive(Clone, Debug, Default)]
pub struct LoweredUnit {
    pub contracts: Vec<Contract>,
    pub interfaces: Vec<Interface>,
}

/// Parses and lowers a full Solidity source.
///
/// Parse failures abort the whole unit; every recoverable oddity inside a
/// contract becomes a diagnostic instead.
pub fn lower_source(
    source: &str,
    diags: &mut Diagnostics,
) -> Result<LoweredUnit, TranspileError> {
    let (unit, _comments) = solang_parser::parse(source, 0).map_err(|errors| {
        for err in &errors {
            diags.hard_error(DiagnosticKind::ParseFailure, err.message.clone());
        }
        TranspileError::Parse { count: errors.len() }
    })?;
    Ok(lower_unit(&unit, diags))
}

/// Lowers an already parsed source unit.
pub fn lower_unit(unit: &pt::SourceUnit, diags: &mut Diagnostics) -> LoweredUnit {
    let FlattenedUnit { contracts, interfaces } = flatten::flatten(unit, diags);

    let known_bases: BTreeSet<String> = unit
        .0
        .iter()
        .filter_map(|part| match part {
            pt::SourceUnitPart::ContractDefinition(def) => {
                def.name.as_ref().map(|id| id.name.clone())
            }
            _ => None,
        })
        .collect();

    let lowered_interfaces = interfaces.iter().map(lower_interface).collect();
    let lowered_contracts = contracts
        .iter()
        .map(|def| lower_contract(def, &known_bases, diags))
        .collect();

    LoweredUnit { contracts: lowered_contracts, interfaces: lowered_interfaces }
}

fn lower_interface(def: &pt::ContractDefinition) -> Interface {
    let name = def.name.as_ref().map(|id| id.name.clone()).unwrap_or_default();
    let functions = def
        .parts
        .iter()
        .filter_map(|part| match part {
            pt::ContractPart::FunctionDefinition(f) => f.name.as_ref().map(|id| id.name.clone()),
            _ => None,
        })
        .collect();
    Interface { name, functions }
}

fn span_of(loc: &pt::Loc) -> Option<Span> {
    match loc {
        pt::Loc::File(_, start, end) => Some((*start, *end)),
        _ => None,
    }
}

fn lower_contract(
    def: &pt::ContractDefinition,
    known_bases: &BTreeSet<String>,
    diags: &mut Diagnostics,
) -> Contract {
    let mut contract = Contract {
        name: def.name.as_ref().map(|id| id.name.clone()).unwrap_or_default(),
        ..Default::default()
    };
    tracing::debug!(contract = %contract.name, "lowering contract");

    for part in &def.parts {
        match part {
            pt::ContractPart::VariableDefinition(var) => {
                if let Some(state_var) = lower_state_var(var, diags) {
                    contract.state_vars.push(state_var);
                }
            }
            pt::ContractPart::FunctionDefinition(f) => {
                lower_function_part(f, known_bases, &mut contract, diags);
            }
            pt::ContractPart::EventDefinition(ev) => {
                contract.events.push(lower_event(ev, diags));
            }
            pt::ContractPart::EnumDefinition(en) => {
                let name = en.name.as_ref().map(|id| id.name.clone()).unwrap_or_default();
                let variants = en
                    .values
                    .iter()
                    .filter_map(|v| v.as_ref().map(|id| id.name.clone()))
                    .collect();
                contract.enums.push(EnumDef { name, variants });
            }
            pt::ContractPart::StructDefinition(st) => {
                contract.structs.push(lower_struct(st, diags));
            }
            // Custom errors surface at their `revert` sites; `using ... for`
            // only matters for the SafeMath-style calls the transformer
            // recognizes by name.
            pt::ContractPart::ErrorDefinition(_) | pt::ContractPart::Using(_) => {}
            _ => {}
        }
    }

    contract
}

fn lower_function_part(
    f: &pt::FunctionDefinition,
    known_bases: &BTreeSet<String>,
    contract: &mut Contract,
    diags: &mut Diagnostics,
) {
    match &f.ty {
        pt::FunctionTy::Constructor => {
            let mut ctor = lower_function(f, known_bases, diags);
            ctor.name = "constructor".to_string();
            contract.constructor = Some(ctor);
        }
        pt::FunctionTy::Modifier => {
            let lowered = lower_function(f, known_bases, diags);
            let placeholders =
                lowered.body.iter().filter(|s| matches!(s, Stmt::Placeholder)).count();
            if placeholders > 1 {
                diags.warn(
                    DiagnosticKind::UnsupportedConstruct,
                    format!(
                        "modifier `{}` contains {placeholders} placeholders; only the first is honored",
                        lowered.name
                    ),
                );
            }
            contract.modifiers.push(Modifier {
                name: lowered.name,
                params: lowered.params,
                body: lowered.body,
            });
        }
        pt::FunctionTy::Function => {
            if f.body.is_none() {
                tracing::debug!(
                    function = ?f.name.as_ref().map(|id| &id.name),
                    "skipping bodyless function"
                );
                return;
            }
            contract.functions.push(lower_function(f, known_bases, diags));
        }
        pt::FunctionTy::Receive | pt::FunctionTy::Fallback => {
            let mut lowered = lower_function(f, known_bases, diags);
            lowered.name = if matches!(f.ty, pt::FunctionTy::Receive) {
                "receive".to_string()
            } else {
                "fallback".to_string()
            };
            contract.functions.push(lowered);
        }
    }
}

fn lower_function(
    f: &pt::FunctionDefinition,
    known_bases: &BTreeSet<String>,
    diags: &mut Diagnostics,
) -> Function {
    let mut visibility = Visibility::Internal;
    let mut mutability = StateMutability::Nonpayable;
    let mut modifiers = Vec::new();

    for attr in &f.attributes {
        match attr {
            pt::FunctionAttribute::Visibility(v) => {
                visibility = match v {
                    pt::Visibility::External(_) => Visibility::External,
                    pt::Visibility::Public(_) => Visibility::Public,
                    pt::Visibility::Internal(_) => Visibility::Internal,
                    pt::Visibility::Private(_) => Visibility::Private,
                };
            }
            pt::FunctionAttribute::Mutability(m) => {
                mutability = match m {
                    pt::Mutability::Pure(_) => StateMutability::Pure,
                    pt::Mutability::View(_) | pt::Mutability::Constant(_) => StateMutability::View,
                    pt::Mutability::Payable(_) => StateMutability::Payable,
                };
            }
            pt::FunctionAttribute::BaseOrModifier(_, base) => {
                let name = base
                    .name
                    .identifiers
                    .last()
                    .map(|id| id.name.clone())
                    .unwrap_or_default();
                if known_bases.contains(&name) {
                    // A base-constructor invocation, already handled by
                    // flattening.
                    continue;
                }
                let args = base
                    .args
                    .as_ref()
                    .map(|args| args.iter().map(|a| lower_expr(a, diags)).collect())
                    .unwrap_or_default();
                modifiers.push(ModifierInvocation { name, args });
            }
            _ => {}
        }
    }

    let params = lower_params(&f.params, "arg", diags);
    let returns = lower_params(&f.returns, "", diags);
    let body = f.body.as_ref().map(|b| lower_block(b, diags)).unwrap_or_default();

    Function {
        name: f.name.as_ref().map(|id| id.name.clone()).unwrap_or_default(),
        visibility,
        mutability,
        params,
        returns,
        modifiers,
        body,
        span: span_of(&f.loc),
    }
}

fn lower_params(
    params: &pt::ParameterList,
    unnamed_prefix: &str,
    diags: &mut Diagnostics,
) -> Vec<Param> {
    params
        .iter()
        .enumerate()
        .filter_map(|(i, (_, param))| {
            let param = param.as_ref()?;
            let ty = lower_type(&param.ty, diags)?;
            let name = match &param.name {
                Some(id) => id.name.clone(),
                None if unnamed_prefix.is_empty() => String::new(),
                None => format!("{unnamed_prefix}{i}"),
            };
            Some(Param { name, ty })
        })
        .collect()
}

fn lower_state_var(var: &pt::VariableDefinition, diags: &mut Diagnostics) -> Option<StateVar> {
    let name = var.name.as_ref().map(|id| id.name.clone()).unwrap_or_default();
    let Some(ty) = lower_type(&var.ty, diags) else {
        diags.warn(
            DiagnosticKind::UnsupportedConstruct,
            format!("state variable `{name}` has an unsupported type and was dropped"),
        );
        return None;
    };

    let mut mutability = Mutability::Mutable;
    let mut visibility = Visibility::Internal;
    for attr in &var.attrs {
        match attr {
            pt::VariableAttribute::Constant(_) => mutability = Mutability::Constant,
            pt::VariableAttribute::Immutable(_) => mutability = Mutability::Immutable,
            pt::VariableAttribute::Visibility(v) => {
                visibility = match v {
                    pt::Visibility::External(_) => Visibility::External,
                    pt::Visibility::Public(_) => Visibility::Public,
                    pt::Visibility::Internal(_) => Visibility::Internal,
                    pt::Visibility::Private(_) => Visibility::Private,
                };
            }
            _ => {}
        }
    }

    if mutability == Mutability::Constant && var.initializer.is_none() {
        diags.warn(
            DiagnosticKind::UnsupportedConstruct,
            format!("constant `{name}` has no initializer"),
        );
    }

    Some(StateVar {
        name,
        ty,
        mutability,
        visibility,
        initializer: var.initializer.as_ref().map(|e| lower_expr(e, diags)),
        span: span_of(&var.loc),
    })
}

fn lower_event(ev: &pt::EventDefinition, diags: &mut Diagnostics) -> EventDef {
    let name = ev.name.as_ref().map(|id| id.name.clone()).unwrap_or_default();
    let fields = ev
        .fields
        .iter()
        .enumerate()
        .filter_map(|(i, field)| {
            let ty = lower_type(&field.ty, diags)?;
            let field_name = field
                .name
                .as_ref()
                .map(|id| id.name.clone())
                .unwrap_or_else(|| format!("field{i}"));
            Some(EventField { name: field_name, ty, indexed: field.indexed })
        })
        .collect();
    EventDef { name, fields }
}

fn lower_struct(st: &pt::StructDefinition, diags: &mut Diagnostics) -> StructDef {
    let name = st.name.as_ref().map(|id| id.name.clone()).unwrap_or_default();
    let fields = st
        .fields
        .iter()
        .filter_map(|field| {
            let ty = lower_type(&field.ty, diags)?;
            let field_name = field.name.as_ref().map(|id| id.name.clone())?;
            Some(FieldDef { name: field_name, ty })
        })
        .collect();
    StructDef { name, fields }
}

/// Lowers a type expression (solang represents types as expressions).
pub(crate) fn lower_type(expr: &pt::Expression, diags: &mut Diagnostics) -> Option<Ty> {
    match expr {
        pt::Expression::Type(_, ty) => lower_pt_type(ty, diags),
        pt::Expression::Variable(id) => Some(Ty::Named(id.name.clone())),
        pt::Expression::MemberAccess(_, _, member) => {
            // `Contract.Struct` references collapse to the member name; the
            // qualifying contract is gone after flattening.
            Some(Ty::Named(member.name.clone()))
        }
        pt::Expression::ArraySubscript(_, elem, len) => {
            let elem = lower_type(elem, diags)?;
            let len = match len {
                Some(len_expr) => match lower_expr(len_expr, diags) {
                    Expr::Number { value, .. } => value.parse::<u64>().ok(),
                    _ => None,
                },
                None => None,
            };
            Some(Ty::Array { elem: Box::new(elem), len })
        }
        _ => {
            diags.warn(
                DiagnosticKind::UnsupportedConstruct,
                "unsupported type expression".to_string(),
            );
            None
        }
    }
}

fn lower_pt_type(ty: &pt::Type, diags: &mut Diagnostics) -> Option<Ty> {
    let lowered = match ty {
        pt::Type::Address => Ty::Address { payable: false },
        pt::Type::AddressPayable | pt::Type::Payable => Ty::Address { payable: true },
        pt::Type::Bool => Ty::Bool,
        pt::Type::String => Ty::String,
        pt::Type::Uint(w) => Ty::Uint(*w),
        pt::Type::Int(w) => Ty::Int(*w),
        pt::Type::Bytes(n) => Ty::FixedBytes(*n),
        pt::Type::DynamicBytes => Ty::Bytes,
        pt::Type::Mapping { key, value, .. } => {
            let key = lower_type(key, diags)?;
            let value = lower_type(value, diags)?;
            Ty::Mapping { key: Box::new(key), value: Box::new(value) }
        }
        pt::Type::Rational => {
            diags.warn(DiagnosticKind::UnsupportedConstruct, "rational types are not supported");
            return None;
        }
        pt::Type::Function { .. } => {
            diags.warn(
                DiagnosticKind::UnsupportedConstruct,
                "function-typed values are not supported",
            );
            return None;
        }
    };
    Some(lowered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower(src: &str) -> (LoweredUnit, Diagnostics) {
        let mut diags = Diagnostics::new(false);
        let unit = lower_source(src, &mut diags).expect("source must parse");
        (unit, diags)
    }

    #[test]
    fn lowers_state_and_functions() {
        let (unit, _) = lower(
            r"
            contract Counter {
                uint256 public count;
                uint256 constant MAX = 100;

                function inc() public { count += 1; }
                function get() public view returns (uint256) { return count; }
            }
            ",
        );
        let c = &unit.contracts[0];
        assert_eq!(c.name, "Counter");
        assert_eq!(c.state_vars.len(), 2);
        assert_eq!(c.state_vars[0].ty, Ty::Uint(256));
        assert_eq!(c.state_vars[1].mutability, Mutability::Constant);
        assert_eq!(c.functions.len(), 2);
        assert_eq!(c.functions[1].mutability, StateMutability::View);
        assert!(matches!(
            &c.functions[0].body[0],
            Stmt::Assign { op: AssignOp::Add, .. }
        ));
    }

    #[test]
    fn lowers_modifier_with_placeholder() {
        let (unit, _) = lower(
            r"
            contract C {
                address owner;
                modifier onlyOwner() {
                    require(msg.sender == owner, 'not owner');
                    _;
                }
                function f() public onlyOwner { }
            }
            ",
        );
        let c = &unit.contracts[0];
        let m = c.modifier("onlyOwner").unwrap();
        let (pre, post) = m.split_at_placeholder();
        assert_eq!(pre.len(), 1);
        assert!(post.is_empty());
        assert!(matches!(pre[0], Stmt::Require { .. }));
        assert_eq!(c.functions[0].modifiers[0].name, "onlyOwner");
    }

    #[test]
    fn lowers_nested_mapping() {
        let (unit, _) = lower(
            r"
            contract C {
                mapping(address => mapping(address => uint256)) allowance;
            }
            ",
        );
        let var = &unit.contracts[0].state_vars[0];
        assert!(var.ty.is_address_keyed_mapping());
        let Ty::Mapping { value, .. } = &var.ty else { panic!() };
        assert!(value.is_mapping());
    }

    #[test]
    fn lowers_constructor_and_events() {
        let (unit, _) = lower(
            r"
            contract Token {
                event Transfer(address indexed from, address indexed to, uint256 value);
                uint256 total;
                constructor(uint256 supply) { total = supply; }
            }
            ",
        );
        let c = &unit.contracts[0];
        assert!(c.constructor.is_some());
        assert_eq!(c.constructor.as_ref().unwrap().params.len(), 1);
        assert_eq!(c.events[0].fields.len(), 3);
        assert!(c.events[0].fields[0].indexed);
    }

    #[test]
    fn parse_failure_is_reported() {
        let mut diags = Diagnostics::new(false);
        let res = lower_source("contract {", &mut diags);
        assert!(res.is_err());
        assert!(diags.has_errors());
    }
}
