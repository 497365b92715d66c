//! The type mapper: Solidity types to Move types.
//!
//! A pure function of the type and the configuration; identical inputs must
//! produce identical outputs, and mapping an already mapped type is a no-op
//! at the Move level.

use solmove_common::{
    config::{EnumStyle, MappingType, StringType, TranspileOptions},
    DiagnosticKind, Diagnostics,
};
use solmove_ir::Ty;
use solmove_move_ast::MoveType;
use std::collections::BTreeSet;

/// Names the mapper needs to resolve `Ty::Named` references.
#[derive(Clone, Debug, Default)]
pub struct TypeLookup {
    pub structs: BTreeSet<String>,
    pub enums: BTreeSet<String>,
    pub interfaces: BTreeSet<String>,
}

impl TypeLookup {
    /// Interface detection: a declared interface, or the `I*`/`*Interface`
    /// naming convention.
    pub fn is_interface(&self, name: &str) -> bool {
        self.interfaces.contains(name)
            || name.ends_with("Interface")
            || (name.len() > 1
                && name.starts_with('I')
                && name.chars().nth(1).is_some_and(|c| c.is_ascii_uppercase()))
    }
}

/// The supported unsigned widths, in ascending order.
const WIDTHS: [u16; 6] = [8, 16, 32, 64, 128, 256];

pub(crate) fn width_to_move(width: u16) -> MoveType {
    match width {
        8 => MoveType::U8,
        16 => MoveType::U16,
        32 => MoveType::U32,
        64 => MoveType::U64,
        128 => MoveType::U128,
        _ => MoveType::U256,
    }
}

/// Rounds a bit width up to the next supported one.
pub(crate) fn round_up(width: u16) -> u16 {
    WIDTHS.iter().copied().find(|w| *w >= width).unwrap_or(256)
}

/// Maps one Solidity type to its Move representation.
pub fn map_type(
    ty: &Ty,
    opts: &TranspileOptions,
    lookup: &TypeLookup,
    diags: &mut Diagnostics,
) -> MoveType {
    match ty {
        Ty::Uint(width) => {
            let rounded = round_up(*width);
            if rounded != *width {
                diags.warn(
                    DiagnosticKind::Narrowing,
                    format!("uint{width} has no Move equivalent; widened to u{rounded}"),
                );
            }
            width_to_move(rounded)
        }
        Ty::Int(width) => {
            // Move has no signed primitives in this target profile; the value
            // range is preserved but negative values abort at runtime.
            let rounded = round_up(*width);
            diags.warn(
                DiagnosticKind::Narrowing,
                format!("int{width} mapped to unsigned u{rounded}; negative values abort"),
            );
            width_to_move(rounded)
        }
        Ty::Bool => MoveType::Bool,
        Ty::Address { .. } => MoveType::Address,
        Ty::FixedBytes(_) | Ty::Bytes => MoveType::vector(MoveType::U8),
        Ty::String => match opts.string_type {
            StringType::String => MoveType::String,
            StringType::Bytes => MoveType::vector(MoveType::U8),
        },
        Ty::Mapping { key, value } => {
            let key = map_type(key, opts, lookup, diags);
            let value = map_type(value, opts, lookup, diags);
            match opts.mapping_type {
                MappingType::Table => MoveType::Table(Box::new(key), Box::new(value)),
                MappingType::SmartTable => MoveType::SmartTable(Box::new(key), Box::new(value)),
            }
        }
        Ty::Array { elem, .. } => MoveType::vector(map_type(elem, opts, lookup, diags)),
        Ty::Tuple(items) => {
            diags.warn(
                DiagnosticKind::UnsupportedConstruct,
                "tuple-typed values outside return position are not supported",
            );
            items
                .first()
                .map(|t| map_type(t, opts, lookup, diags))
                .unwrap_or(MoveType::Bool)
        }
        Ty::Named(name) => {
            if lookup.is_interface(name) {
                // Interfaces are erased; the value is the callee address.
                MoveType::Address
            } else if lookup.enums.contains(name) {
                match opts.enum_style {
                    EnumStyle::NativeEnum => {
                        MoveType::Struct(solmove_common::ident::to_move_type_ident(name))
                    }
                    EnumStyle::U8Constants => MoveType::U8,
                }
            } else {
                MoveType::Struct(solmove_common::ident::to_move_type_ident(name))
            }
        }
    }
}

/// The aggregator element type for an aggregated numeric field, together
/// with whether the choice narrowed the source type.
pub fn aggregator_inner(source: &Ty) -> (MoveType, bool) {
    match source.bit_width() {
        Some(w) if w <= 64 => (MoveType::U64, false),
        Some(w) => (MoveType::U128, w > 128),
        None => (MoveType::U128, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(ty: Ty) -> (MoveType, Diagnostics) {
        let opts = TranspileOptions::default();
        let lookup = TypeLookup::default();
        let mut diags = Diagnostics::new(false);
        let mapped = map_type(&ty, &opts, &lookup, &mut diags);
        (mapped, diags)
    }

    #[test]
    fn standard_widths_map_directly() {
        assert_eq!(map(Ty::Uint(8)).0, MoveType::U8);
        assert_eq!(map(Ty::Uint(64)).0, MoveType::U64);
        assert_eq!(map(Ty::Uint(256)).0, MoveType::U256);
    }

    #[test]
    fn odd_widths_round_up_with_warning() {
        let (ty, diags) = map(Ty::Uint(24));
        assert_eq!(ty, MoveType::U32);
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::Narrowing));
    }

    #[test]
    fn signed_maps_to_unsigned_with_warning() {
        let (ty, diags) = map(Ty::Int(256));
        assert_eq!(ty, MoveType::U256);
        assert!(diags.iter().any(|d| d.message.contains("negative values abort")));
    }

    #[test]
    fn mappings_nest() {
        let ty = Ty::Mapping {
            key: Box::new(Ty::address()),
            value: Box::new(Ty::Mapping {
                key: Box::new(Ty::address()),
                value: Box::new(Ty::uint256()),
            }),
        };
        let (mapped, _) = map(ty);
        let MoveType::Table(key, value) = mapped else { panic!() };
        assert_eq!(*key, MoveType::Address);
        assert!(matches!(*value, MoveType::Table(..)));
    }

    #[test]
    fn smart_table_is_configurable() {
        let opts = TranspileOptions {
            mapping_type: MappingType::SmartTable,
            ..Default::default()
        };
        let mut diags = Diagnostics::new(false);
        let ty = Ty::Mapping { key: Box::new(Ty::address()), value: Box::new(Ty::uint256()) };
        let mapped = map_type(&ty, &opts, &TypeLookup::default(), &mut diags);
        assert!(matches!(mapped, MoveType::SmartTable(..)));
    }

    #[test]
    fn interface_references_erase_to_address() {
        let lookup = TypeLookup::default();
        let mut diags = Diagnostics::new(false);
        let opts = TranspileOptions::default();
        assert_eq!(
            map_type(&Ty::Named("IERC20".to_string()), &opts, &lookup, &mut diags),
            MoveType::Address
        );
        assert_eq!(
            map_type(&Ty::Named("PriceFeedInterface".to_string()), &opts, &lookup, &mut diags),
            MoveType::Address
        );
    }

    #[test]
    fn mapping_is_deterministic_and_idempotent() {
        let ty = Ty::Mapping { key: Box::new(Ty::Uint(48)), value: Box::new(Ty::Bytes) };
        let (a, _) = map(ty.clone());
        let (b, _) = map(ty);
        assert_eq!(a, b);
    }

    #[test]
    fn aggregator_widths() {
        assert_eq!(aggregator_inner(&Ty::Uint(64)), (MoveType::U64, false));
        assert_eq!(aggregator_inner(&Ty::Uint(128)), (MoveType::U128, false));
        assert_eq!(aggregator_inner(&Ty::Uint(256)), (MoveType::U128, true));
    }
}
