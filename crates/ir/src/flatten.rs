//! Inheritance flattening.
//!
//! Runs on the parse tree before lowering: every concrete contract is merged
//! with its base contracts (bases first, derived members override), so the
//! rest of the pipeline only ever sees a single flattened contract.

use solang_parser::pt;
use solmove_common::{DiagnosticKind, Diagnostics};
use std::collections::BTreeMap;

/// The flattening result: concrete contracts ready for lowering plus the
/// interface declarations seen alongside them.
#[derive(Debug, Default)]
pub struct FlattenedUnit {
    pub contracts: Vec<pt::ContractDefinition>,
    pub interfaces: Vec<pt::ContractDefinition>,
}

fn contract_name(def: &pt::ContractDefinition) -> String {
    def.name.as_ref().map(|id| id.name.clone()).unwrap_or_default()
}

fn part_function_name(part: &pt::ContractPart) -> Option<(pt::FunctionTy, String)> {
    match part {
        pt::ContractPart::FunctionDefinition(f) => {
            let name = f.name.as_ref().map(|id| id.name.clone()).unwrap_or_default();
            Some((f.ty.clone(), name))
        }
        _ => None,
    }
}

fn part_type_name(part: &pt::ContractPart) -> Option<String> {
    match part {
        pt::ContractPart::StructDefinition(s) => s.name.as_ref().map(|id| id.name.clone()),
        pt::ContractPart::EnumDefinition(e) => e.name.as_ref().map(|id| id.name.clone()),
        pt::ContractPart::EventDefinition(e) => e.name.as_ref().map(|id| id.name.clone()),
        pt::ContractPart::ErrorDefinition(e) => e.name.as_ref().map(|id| id.name.clone()),
        pt::ContractPart::VariableDefinition(v) => v.name.as_ref().map(|id| id.name.clone()),
        _ => None,
    }
}

/// Flattens every concrete contract in the source unit.
///
/// Libraries are skipped with a diagnostic; abstract contracts only
/// contribute as bases. Base contracts not defined in the same source unit
/// produce a warning and are ignored.
pub fn flatten(unit: &pt::SourceUnit, diags: &mut Diagnostics) -> FlattenedUnit {
    let mut by_name: BTreeMap<String, &pt::ContractDefinition> = BTreeMap::new();
    let mut order: Vec<&pt::ContractDefinition> = Vec::new();
    for part in &unit.0 {
        if let pt::SourceUnitPart::ContractDefinition(def) = part {
            by_name.insert(contract_name(def), def);
            order.push(def);
        }
    }

    let mut out = FlattenedUnit::default();
    for def in order {
        match def.ty {
            pt::ContractTy::Interface(_) => out.interfaces.push((*def).clone()),
            pt::ContractTy::Library(_) => {
                diags.warn(
                    DiagnosticKind::UnsupportedConstruct,
                    format!("library `{}` is not translated", contract_name(def)),
                );
            }
            pt::ContractTy::Abstract(_) => {
                tracing::debug!(contract = %contract_name(def), "abstract contract used only as a base");
            }
            pt::ContractTy::Contract(_) => {
                out.contracts.push(flatten_one(def, &by_name, diags));
            }
        }
    }
    out
}

/// Computes the base-first linearization of `def`'s inheritance chain.
fn linearize<'a>(
    def: &'a pt::ContractDefinition,
    by_name: &BTreeMap<String, &'a pt::ContractDefinition>,
    seen: &mut Vec<String>,
    diags: &mut Diagnostics,
) -> Vec<&'a pt::ContractDefinition> {
    let name = contract_name(def);
    if seen.contains(&name) {
        return Vec::new();
    }
    seen.push(name.clone());

    let mut chain = Vec::new();
    for base in &def.base {
        let base_name = base
            .name
            .identifiers
            .last()
            .map(|id| id.name.clone())
            .unwrap_or_default();
        match by_name.get(&base_name) {
            Some(base_def) => {
                for b in linearize(base_def, by_name, seen, diags) {
                    if !chain.iter().any(|c: &&pt::ContractDefinition| contract_name(c) == contract_name(b)) {
                        chain.push(b);
                    }
                }
            }
            None => diags.warn(
                DiagnosticKind::CrossContractRef,
                format!("base contract `{base_name}` of `{name}` is not defined in this source; its members are not inherited"),
            ),
        }
    }
    chain.push(def);
    chain
}

fn flatten_one(
    def: &pt::ContractDefinition,
    by_name: &BTreeMap<String, &pt::ContractDefinition>,
    diags: &mut Diagnostics,
) -> pt::ContractDefinition {
    let chain = linearize(def, by_name, &mut Vec::new(), diags);
    if chain.len() == 1 {
        return def.clone();
    }

    // Merge parts base-first; a derived member with the same name replaces
    // the base member in place.
    let mut parts: Vec<pt::ContractPart> = Vec::new();
    let mut constructor_idx: Option<usize> = None;
    for link in &chain {
        for part in &link.parts {
            if let Some((fn_ty, fn_name)) = part_function_name(part) {
                if matches!(fn_ty, pt::FunctionTy::Constructor) {
                    // Derived-most constructor wins.
                    if let Some(i) = constructor_idx {
                        parts[i] = part.clone();
                    } else {
                        constructor_idx = Some(parts.len());
                        parts.push(part.clone());
                    }
                    continue;
                }
                if let Some(i) = parts.iter().position(|p| {
                    part_function_name(p).is_some_and(|(ty, name)| ty == fn_ty && name == fn_name)
                }) {
                    parts[i] = part.clone();
                    continue;
                }
            } else if let Some(type_name) = part_type_name(part) {
                if parts.iter().any(|p| part_type_name(p).as_deref() == Some(&type_name)) {
                    // Definitions shadowed along the chain keep the base copy.
                    continue;
                }
            }
            parts.push(part.clone());
        }
    }

    let mut merged = def.clone();
    merged.parts = parts;
    merged.base = Vec::new();
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> pt::SourceUnit {
        solang_parser::parse(src, 0).expect("parse").0
    }

    #[test]
    fn derived_overrides_base_function() {
        let unit = parse(
            r"
            contract Base {
                uint256 x;
                function get() public virtual returns (uint256) { return 1; }
            }
            contract Derived is Base {
                function get() public override returns (uint256) { return 2; }
            }
            ",
        );
        let mut diags = Diagnostics::new(false);
        let flat = flatten(&unit, &mut diags);
        assert_eq!(flat.contracts.len(), 2);

        let derived = &flat.contracts[1];
        let fns: Vec<_> = derived
            .parts
            .iter()
            .filter_map(part_function_name)
            .filter(|(ty, _)| matches!(ty, pt::FunctionTy::Function))
            .collect();
        assert_eq!(fns.len(), 1, "override must replace, not duplicate");
        // The state variable from the base is carried over.
        assert!(derived.parts.iter().any(|p| part_type_name(p).as_deref() == Some("x")));
    }

    #[test]
    fn unknown_base_warns() {
        let unit = parse("contract C is Missing { }");
        let mut diags = Diagnostics::new(false);
        let flat = flatten(&unit, &mut diags);
        assert_eq!(flat.contracts.len(), 1);
        assert!(diags.iter().any(|d| d.message.contains("Missing")));
    }

    #[test]
    fn interfaces_are_collected_not_translated() {
        let unit = parse(
            r"
            interface IERC20 { function transfer(address to, uint256 amt) external returns (bool); }
            contract C { }
            ",
        );
        let mut diags = Diagnostics::new(false);
        let flat = flatten(&unit, &mut diags);
        assert_eq!(flat.contracts.len(), 1);
        assert_eq!(flat.interfaces.len(), 1);
    }
}
