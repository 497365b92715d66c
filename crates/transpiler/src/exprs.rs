//! Expression transformation (IR → Move AST).
//!
//! Evaluation order, side effects and abort conditions are preserved; every
//! construct without a Move analogue produces a diagnostic plus a typed
//! sentinel so the surrounding code keeps its shape.

use crate::{
    ctx::{Ctx, FnCtx},
    functions, interfaces,
    types::{round_up, width_to_move},
};
use solmove_analysis::VarPlacement;
use solmove_common::{ident, DiagnosticKind};
use solmove_ir::{BinOp, BlockField, Expr, MsgField, Mutability, Ty, TxField, UnOp};
use solmove_move_ast::{MoveExpr, MoveType};

pub(crate) fn escape_string(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '"' => vec!['\\', '"'],
            '\\' => vec!['\\', '\\'],
            '\n' => vec!['\\', 'n'],
            c => vec![c],
        })
        .collect()
}

/// A Solidity string literal in the configured Move representation.
pub(crate) fn string_literal(s: &str, ctx: &mut Ctx<'_>) -> MoveExpr {
    let escaped = escape_string(s);
    match ctx.opts.string_type {
        solmove_common::config::StringType::String => {
            ctx.use_("std::string::{Self, String}");
            MoveExpr::call("string::utf8", vec![MoveExpr::ByteString(escaped)])
        }
        solmove_common::config::StringType::Bytes => MoveExpr::ByteString(escaped),
    }
}

fn is_state_var(name: &str, ctx: &Ctx<'_>) -> bool {
    ctx.contract.state_var(name).is_some()
}

/// Resolves `m[k1][k2]...` down to a mapping-typed state variable.
pub(crate) fn mapping_chain<'e>(expr: &'e Expr, ctx: &Ctx<'_>) -> Option<(&'e str, Vec<&'e Expr>)> {
    match expr {
        Expr::Index { base, index } => match &**base {
            Expr::Ident(name) if is_state_var(name, ctx) => {
                ctx.contract.state_var(name)?.ty.is_mapping().then(|| {
                    (name.as_str(), vec![&**index])
                })
            }
            _ => {
                let (root, mut keys) = mapping_chain(base, ctx)?;
                keys.push(index);
                Some((root, keys))
            }
        },
        _ => None,
    }
}

/// The value type at the end of a mapping key chain.
fn mapping_value_ty(root: &str, depth: usize, ctx: &Ctx<'_>) -> Option<Ty> {
    let mut ty = &ctx.contract.state_var(root)?.ty;
    for _ in 0..depth {
        match ty {
            Ty::Mapping { value, .. } => ty = value,
            _ => return None,
        }
    }
    Some(ty.clone())
}

/// Best-effort integer width of an expression, after mapping.
pub(crate) fn expr_width(expr: &Expr, ctx: &Ctx<'_>, f: &FnCtx) -> Option<u16> {
    match expr {
        Expr::Ident(name) => {
            if let Some(var) = ctx.contract.state_var(name) {
                if ctx.plan.is_aggregated(name) {
                    return var.ty.bit_width().map(|w| if w <= 64 { 64 } else { 128 });
                }
                return var.ty.bit_width().map(round_up);
            }
            f.param_widths.get(name).copied()
        }
        Expr::Cast { ty, .. } => ty.bit_width().map(round_up),
        Expr::Binary { op, lhs, rhs } if !op.is_comparison() => {
            match (expr_width(lhs, ctx, f), expr_width(rhs, ctx, f)) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (Some(a), None) | (None, Some(a)) => Some(a),
                (None, None) => None,
            }
        }
        Expr::Index { .. } => {
            let (root, keys) = mapping_chain(expr, ctx)?;
            mapping_value_ty(root, keys.len(), ctx)?.bit_width().map(round_up)
        }
        Expr::BlockAccess(BlockField::Timestamp | BlockField::Number | BlockField::ChainId) => {
            Some(256)
        }
        _ => None,
    }
}

fn bin_op_str(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Pow => unreachable!("pow routed to the runtime helper"),
        BinOp::Shl => "<<",
        BinOp::Shr => ">>",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::And => "&&",
        BinOp::Or => "||",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
    }
}

fn is_hash_call(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Call { callee, .. }
            if matches!(&**callee, Expr::Ident(n) if n == "keccak256" || n == "sha256")
    )
}

fn literal_u128(expr: &Expr) -> Option<u128> {
    match expr {
        Expr::Number { value, .. } => {
            if let Some(hex) = value.strip_prefix("0x") {
                u128::from_str_radix(hex, 16).ok()
            } else {
                value.parse().ok()
            }
        }
        _ => None,
    }
}

/// `agg > 0` / `agg >= n` compile to `is_at_least`, which keeps concurrent
/// writers conflict-free; exact equality keeps a direct read.
fn aggregator_comparison(
    op: BinOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut Ctx<'_>,
    f: &mut FnCtx,
) -> Option<MoveExpr> {
    let (agg_name, literal, op) = match (lhs, rhs) {
        (Expr::Ident(name), rhs) if ctx.plan.is_aggregated(name) => {
            (name.clone(), literal_u128(rhs)?, op)
        }
        (lhs, Expr::Ident(name)) if ctx.plan.is_aggregated(name) => {
            // Mirror `0 < agg` into `agg > 0`.
            let mirrored = match op {
                BinOp::Lt => BinOp::Gt,
                BinOp::Le => BinOp::Ge,
                BinOp::Gt => BinOp::Lt,
                BinOp::Ge => BinOp::Le,
                other => other,
            };
            (name.clone(), literal_u128(lhs)?, mirrored)
        }
        _ => return None,
    };

    let threshold = match op {
        BinOp::Gt => literal.checked_add(1)?,
        BinOp::Ge => literal.max(1),
        _ => return None,
    };
    let agg_field = aggregator_field(&agg_name, ctx, f)?;
    ctx.use_("aptos_framework::aggregator_v2::{Self, Aggregator}");
    Some(aggregator_call(
        ctx,
        "is_at_least",
        agg_field,
        vec![MoveExpr::number(threshold.to_string())],
        false,
    ))
}

fn aggregator_field(var: &str, ctx: &mut Ctx<'_>, f: &FnCtx) -> Option<MoveExpr> {
    let kind = ctx.plan.group_of(var)?;
    let local = f.group_ref(kind)?;
    Some(MoveExpr::field(MoveExpr::ident(local), ctx.field_name(var)))
}

/// An aggregator operation in the configured call style.
pub(crate) fn aggregator_call(
    ctx: &Ctx<'_>,
    method: &str,
    field: MoveExpr,
    args: Vec<MoveExpr>,
    mutable: bool,
) -> MoveExpr {
    match ctx.opts.call_style {
        solmove_common::config::CallStyle::Receiver => MoveExpr::MethodCall {
            receiver: Box::new(field),
            method: method.to_string(),
            args,
        },
        solmove_common::config::CallStyle::ModuleQualified => {
            let mut call_args = vec![if mutable {
                MoveExpr::borrow_mut(field)
            } else {
                MoveExpr::borrow(field)
            }];
            call_args.extend(args);
            MoveExpr::call(format!("aggregator_v2::{method}"), call_args)
        }
    }
}

/// Transforms an operand of an arithmetic or comparison operator, folding in
/// digest re-interpretation for hash calls.
fn arith_operand(expr: &Expr, ctx: &mut Ctx<'_>, f: &mut FnCtx) -> MoveExpr {
    let transformed = transform_expr(expr, ctx, f);
    if is_hash_call(expr) {
        ctx.use_("aptos_std::from_bcs");
        return MoveExpr::call("from_bcs::to_u256", vec![transformed]);
    }
    transformed
}

fn transform_binary(
    op: BinOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut Ctx<'_>,
    f: &mut FnCtx,
) -> MoveExpr {
    if op == BinOp::Pow {
        let func = ctx.runtime_fn("exp");
        let args = vec![
            MoveExpr::Cast { expr: Box::new(transform_expr(lhs, ctx, f)), ty: MoveType::U256 },
            MoveExpr::Cast { expr: Box::new(transform_expr(rhs, ctx, f)), ty: MoveType::U256 },
        ];
        return MoveExpr::call(func, args);
    }

    if op.is_comparison() {
        if let Some(rewritten) = aggregator_comparison(op, lhs, rhs, ctx, f) {
            return rewritten;
        }
    }

    // Wrapping arithmetic routes through the runtime helpers.
    if matches!(op, BinOp::Add | BinOp::Sub | BinOp::Mul)
        && ctx.opts.overflow_behavior == solmove_common::config::OverflowBehavior::Wrapping
    {
        let func = match op {
            BinOp::Add => ctx.runtime_fn("wrapping_add"),
            BinOp::Sub => ctx.runtime_fn("wrapping_sub"),
            _ => ctx.runtime_fn("wrapping_mul"),
        };
        return MoveExpr::call(
            func,
            vec![
                MoveExpr::Cast { expr: Box::new(arith_operand(lhs, ctx, f)), ty: MoveType::U256 },
                MoveExpr::Cast { expr: Box::new(arith_operand(rhs, ctx, f)), ty: MoveType::U256 },
            ],
        );
    }

    let lw = expr_width(lhs, ctx, f);
    let rw = expr_width(rhs, ctx, f);
    let mut l = arith_operand(lhs, ctx, f);
    let mut r = arith_operand(rhs, ctx, f);

    // Shift amounts are u8 in Move.
    if matches!(op, BinOp::Shl | BinOp::Shr) {
        if !matches!(r, MoveExpr::Number { .. }) {
            r = MoveExpr::Cast { expr: Box::new(r), ty: MoveType::U8 };
        }
        return MoveExpr::binary(bin_op_str(op), l, r);
    }

    // Mixed-width operands get an explicit widening cast on the narrow side.
    if let (Some(lw), Some(rw)) = (lw, rw) {
        if lw < rw {
            l = MoveExpr::Cast { expr: Box::new(l), ty: width_to_move(rw) };
        } else if rw < lw {
            r = MoveExpr::Cast { expr: Box::new(r), ty: width_to_move(lw) };
        }
    }

    MoveExpr::binary(bin_op_str(op), l, r)
}

/// True when an address-typed state field is stored as `Option<address>`
/// under option semantics.
pub(crate) fn is_optionized(var: &str, ctx: &Ctx<'_>) -> bool {
    ctx.opts.optional_values == solmove_common::config::OptionalValues::OptionType
        && !ctx.plan.is_aggregated(var)
        && ctx
            .contract
            .state_var(var)
            .is_some_and(|v| matches!(v.ty, Ty::Address { .. }) && v.initializer.is_none())
}

/// Reads a scalar state variable.
pub(crate) fn state_read(var: &str, ctx: &mut Ctx<'_>, f: &mut FnCtx) -> MoveExpr {
    let state_var = match ctx.contract.state_var(var) {
        Some(v) => v,
        None => return MoveExpr::ident(ident::to_move_ident(var)),
    };
    if state_var.mutability == Mutability::Constant {
        return MoveExpr::ident(ident::to_move_const_ident(var));
    }

    let Some(planned) = ctx.plan.var(var) else {
        return MoveExpr::ident(ident::to_move_ident(var));
    };

    match planned.placement {
        VarPlacement::EventOnly => {
            ctx.diags.warn(
                DiagnosticKind::PlanRewrite,
                format!("`{var}` is tracked through events only; this read yields a constant zero"),
            );
            MoveExpr::zero()
        }
        VarPlacement::PerUser => {
            // A bare read of a promoted mapping has no key; fall back to the
            // caller's own state when available.
            match &f.user_ref {
                Some(local) => MoveExpr::field(MoveExpr::ident(local.clone()), ctx.field_name(var)),
                None => {
                    ctx.diags.hard_error(
                        DiagnosticKind::InternalInvariant,
                        format!("read of per-user `{var}` outside a user context"),
                    );
                    MoveExpr::zero()
                }
            }
        }
        VarPlacement::Group(kind) => {
            let Some(local) = f.group_ref(kind).map(str::to_string) else {
                ctx.diags.hard_error(
                    DiagnosticKind::InternalInvariant,
                    format!("`{var}` read without a borrowed resource group"),
                );
                return MoveExpr::zero();
            };
            let field = MoveExpr::field(MoveExpr::ident(local), ctx.field_name(var));
            if is_optionized(var, ctx) {
                // Option-typed addresses read back through the zero-address
                // sentinel so comparisons keep their source meaning.
                ctx.use_("std::option::{Self, Option}");
                return MoveExpr::Deref(Box::new(MoveExpr::call(
                    "option::borrow_with_default",
                    vec![
                        MoveExpr::borrow(field),
                        MoveExpr::borrow(MoveExpr::Address("0x0".to_string())),
                    ],
                )));
            }
            if planned.aggregated {
                ctx.use_("aptos_framework::aggregator_v2::{Self, Aggregator}");
                let read = if ctx.plan.needs_snapshot(&f.ir_name, var) {
                    // Snapshots stay module-qualified in both call styles.
                    MoveExpr::call(
                        "aggregator_v2::read_snapshot",
                        vec![MoveExpr::borrow(MoveExpr::call(
                            "aggregator_v2::snapshot",
                            vec![MoveExpr::borrow(field)],
                        ))],
                    )
                } else {
                    aggregator_call(ctx, "read", field, vec![], false)
                };
                // Aggregators are at most u128; widen back to the source type.
                let source_width = ctx
                    .contract
                    .state_var(var)
                    .and_then(|v| v.ty.bit_width())
                    .map(round_up)
                    .unwrap_or(256);
                if source_width > 128 {
                    return MoveExpr::Cast { expr: Box::new(read), ty: MoveType::U256 };
                }
                return read;
            }
            field
        }
    }
}

/// Reads a chain of keys out of a table-valued expression, falling back to
/// the value's default at every absent level.
pub(crate) fn keyed_read(
    base: MoveExpr,
    keys: &[MoveExpr],
    value_ty: &MoveType,
    default: &MoveExpr,
    table_mod: &str,
) -> MoveExpr {
    match keys {
        [] => base,
        [key] => read_leaf(base, key.clone(), value_ty, default, table_mod),
        [k1, rest @ ..] => {
            let inner = MoveExpr::Deref(Box::new(MoveExpr::call(
                format!("{table_mod}::borrow"),
                vec![MoveExpr::borrow(base.clone()), k1.clone()],
            )));
            MoveExpr::IfElse {
                cond: Box::new(MoveExpr::call(
                    format!("{table_mod}::contains"),
                    vec![MoveExpr::borrow(base), k1.clone()],
                )),
                if_true: Box::new(keyed_read(inner, rest, value_ty, default, table_mod)),
                if_false: Box::new(default.clone()),
            }
        }
    }
}

/// Reads `m[k]` / `m[k1][k2]` out of a mapping state variable.
fn mapping_read(
    root: &str,
    keys: &[&Expr],
    ctx: &mut Ctx<'_>,
    f: &mut FnCtx,
) -> MoveExpr {
    let value_ty = mapping_value_ty(root, keys.len(), ctx)
        .map(|ty| ctx.map_ty(&ty))
        .unwrap_or(MoveType::U256);
    let default = ctx.default_value(&value_ty);
    let table_mod = ctx.table_mod();

    let planned = ctx.plan.var(root).cloned();
    if planned.as_ref().is_some_and(|p| p.placement == VarPlacement::PerUser) {
        let field = ctx.field_name(root);
        let rest: Vec<MoveExpr> =
            keys[1..].iter().map(|k| transform_expr(k, ctx, f)).collect();
        if matches!(keys[0], Expr::MsgAccess(MsgField::Sender)) {
            if let Some(local) = f.user_ref.clone() {
                let base = MoveExpr::field(MoveExpr::ident(local), field);
                return keyed_read(base, &rest, &value_ty, &default, table_mod);
            }
        }
        // Another user's state: guarded global read.
        let resource = ctx
            .plan
            .per_user_resource
            .clone()
            .unwrap_or_else(|| format!("{}UserData", ctx.contract.name));
        let addr = transform_expr(keys[0], ctx, f);
        let base = MoveExpr::field(
            MoveExpr::Call {
                func: "borrow_global".to_string(),
                type_args: vec![MoveType::Struct(resource.clone())],
                args: vec![addr.clone()],
            },
            field,
        );
        return MoveExpr::IfElse {
            cond: Box::new(MoveExpr::Call {
                func: "exists".to_string(),
                type_args: vec![MoveType::Struct(resource)],
                args: vec![addr],
            }),
            if_true: Box::new(keyed_read(base, &rest, &value_ty, &default, table_mod)),
            if_false: Box::new(default),
        };
    }

    let Some(kind) = ctx.plan.group_of(root) else {
        ctx.diags.hard_error(
            DiagnosticKind::InternalInvariant,
            format!("mapping `{root}` has no storage group"),
        );
        return default;
    };
    let Some(local) = f.group_ref(kind).map(str::to_string) else {
        ctx.diags.hard_error(
            DiagnosticKind::InternalInvariant,
            format!("`{root}` read without a borrowed resource group"),
        );
        return default;
    };
    let outer = MoveExpr::field(MoveExpr::ident(local), ctx.field_name(root));
    let keys: Vec<MoveExpr> = keys.iter().map(|k| transform_expr(k, ctx, f)).collect();
    keyed_read(outer, &keys, &value_ty, &default, table_mod)
}

/// Reads one key out of a table, falling back to the value's default when
/// the key is absent. Struct values have no synthesizable default; there a
/// missing key aborts, which is what the copy-out pattern expects.
fn read_leaf(
    table: MoveExpr,
    key: MoveExpr,
    value_ty: &MoveType,
    default: &MoveExpr,
    table_mod: &str,
) -> MoveExpr {
    if matches!(value_ty, MoveType::Struct(_)) {
        MoveExpr::Deref(Box::new(MoveExpr::call(
            format!("{table_mod}::borrow"),
            vec![MoveExpr::borrow(table), key],
        )))
    } else {
        MoveExpr::Deref(Box::new(MoveExpr::call(
            format!("{table_mod}::borrow_with_default"),
            vec![MoveExpr::borrow(table), key, MoveExpr::borrow(default.clone())],
        )))
    }
}

fn transform_member(base: &Expr, member: &str, ctx: &mut Ctx<'_>, f: &mut FnCtx) -> MoveExpr {
    // Enum variant references.
    if let Expr::Ident(name) = base {
        if ctx.lookup.enums.contains(name) {
            return match ctx.opts.enum_style {
                solmove_common::config::EnumStyle::U8Constants => MoveExpr::ident(format!(
                    "{}_{}",
                    ident::to_move_const_ident(name),
                    ident::to_move_const_ident(member)
                )),
                solmove_common::config::EnumStyle::NativeEnum => MoveExpr::ident(format!(
                    "{}::{}",
                    ident::to_move_type_ident(name),
                    ident::to_move_type_ident(member)
                )),
            };
        }
    }

    if member == "length" {
        ctx.use_("std::vector");
        let base = transform_expr(base, ctx, f);
        return MoveExpr::Cast {
            expr: Box::new(MoveExpr::call("vector::length", vec![MoveExpr::borrow(base)])),
            ty: MoveType::U256,
        };
    }

    if member == "balance" {
        ctx.use_("aptos_framework::coin");
        ctx.use_("aptos_framework::aptos_coin::AptosCoin");
        let base = transform_expr(base, ctx, f);
        return MoveExpr::Cast {
            expr: Box::new(MoveExpr::Call {
                func: "coin::balance".to_string(),
                type_args: vec![MoveType::Struct("AptosCoin".to_string())],
                args: vec![base],
            }),
            ty: MoveType::U256,
        };
    }

    MoveExpr::field(transform_expr(base, ctx, f), ident::to_move_ident(member))
}

fn abi_encode(args: &[Expr], ctx: &mut Ctx<'_>, f: &mut FnCtx) -> MoveExpr {
    ctx.use_("std::bcs");
    match args {
        [single] => MoveExpr::call(
            "bcs::to_bytes",
            vec![MoveExpr::borrow(transform_expr(single, ctx, f))],
        ),
        _ => {
            ctx.diags.warn(
                DiagnosticKind::UnsupportedConstruct,
                "multi-argument abi encoding keeps only the first argument",
            );
            match args.first() {
                Some(first) => MoveExpr::call(
                    "bcs::to_bytes",
                    vec![MoveExpr::borrow(transform_expr(first, ctx, f))],
                ),
                None => MoveExpr::HexString(String::new()),
            }
        }
    }
}

fn struct_pack(
    name: &str,
    args: &[Expr],
    named_args: &[(String, Expr)],
    ctx: &mut Ctx<'_>,
    f: &mut FnCtx,
) -> MoveExpr {
    let def = ctx.contract.structs.iter().find(|s| s.name == name).cloned();
    let struct_name = ident::to_move_type_ident(name);
    let fields = match def {
        Some(_) if !named_args.is_empty() => named_args
            .iter()
            .map(|(field, value)| {
                (ident::to_move_ident(field), transform_expr(value, ctx, f))
            })
            .collect(),
        Some(def) => def
            .fields
            .iter()
            .zip(args.iter())
            .map(|(field, value)| {
                (ident::to_move_ident(&field.name), transform_expr(value, ctx, f))
            })
            .collect(),
        None => Vec::new(),
    };
    MoveExpr::Pack { name: struct_name, fields }
}

fn transform_call(
    callee: &Expr,
    args: &[Expr],
    named_args: &[(String, Expr)],
    ctx: &mut Ctx<'_>,
    f: &mut FnCtx,
) -> MoveExpr {
    // Interface method calls: `IERC20(addr).transfer(...)` and friends.
    if let Expr::Member { base, member } = callee {
        if let Some((iface, addr_expr)) = interfaces::interface_target(base, ctx, f) {
            let addr = transform_expr(addr_expr, ctx, f);
            let call_args: Vec<MoveExpr> =
                args.iter().map(|a| transform_expr(a, ctx, f)).collect();
            return interfaces::route_interface_call(&iface, member, addr, call_args, ctx, f);
        }

        if matches!(&**base, Expr::Ident(n) if n == "abi") {
            return abi_encode(args, ctx, f);
        }

        // Low-level calls return `(bool, bytes)`; the sentinel pretends the
        // call succeeded with an empty return.
        if matches!(member.as_str(), "call" | "delegatecall" | "staticcall") {
            ctx.diags.error(
                DiagnosticKind::UnsupportedConstruct,
                format!("low-level `.{member}` has no Move analogue; `(true, empty)` is substituted"),
            );
            return MoveExpr::Tuple(vec![
                MoveExpr::Bool(true),
                MoveExpr::HexString(String::new()),
            ]);
        }

        // SafeMath-era `a.add(b)`: plain operators abort on overflow anyway.
        if args.len() == 1 {
            let op = match member.as_str() {
                "add" => Some(BinOp::Add),
                "sub" => Some(BinOp::Sub),
                "mul" => Some(BinOp::Mul),
                "div" => Some(BinOp::Div),
                "mod" => Some(BinOp::Mod),
                _ => None,
            };
            if let Some(op) = op {
                return transform_binary(op, base, &args[0], ctx, f);
            }
        }

        ctx.diags.warn(
            DiagnosticKind::UnsupportedConstruct,
            format!("method call `.{member}` has no Move routing"),
        );
        return MoveExpr::zero();
    }

    let Expr::Ident(name) = callee else {
        ctx.diags.warn(DiagnosticKind::UnsupportedConstruct, "unsupported call target");
        return MoveExpr::zero();
    };

    match name.as_str() {
        "keccak256" => {
            ctx.use_("aptos_std::aptos_hash");
            let args = args.iter().map(|a| transform_expr(a, ctx, f)).collect();
            return MoveExpr::call("aptos_hash::keccak256", args);
        }
        "sha256" => {
            ctx.use_("std::hash");
            let args = args.iter().map(|a| transform_expr(a, ctx, f)).collect();
            return MoveExpr::call("hash::sha2_256", args);
        }
        "addmod" | "mulmod" if args.len() == 3 => {
            let func = ctx.runtime_fn(if name == "addmod" { "add_mod" } else { "mul_mod" });
            let args = args
                .iter()
                .map(|a| MoveExpr::Cast {
                    expr: Box::new(transform_expr(a, ctx, f)),
                    ty: MoveType::U256,
                })
                .collect();
            return MoveExpr::call(func, args);
        }
        "ecrecover" => {
            ctx.diags.error(
                DiagnosticKind::UnsupportedConstruct,
                "ecrecover has no Move analogue; the zero address is substituted",
            );
            return MoveExpr::Address("0x0".to_string());
        }
        "blockhash" => {
            ctx.diags.error(
                DiagnosticKind::UnsupportedConstruct,
                "blockhash has no Move analogue; an empty digest is substituted",
            );
            return MoveExpr::HexString(String::new());
        }
        "gasleft" => {
            ctx.diags.error(
                DiagnosticKind::UnsupportedConstruct,
                "gasleft has no Move analogue; zero is substituted",
            );
            return MoveExpr::zero();
        }
        "__delete" => {
            ctx.diags.warn(
                DiagnosticKind::UnsupportedConstruct,
                "`delete` in expression position is ignored",
            );
            return MoveExpr::zero();
        }
        _ => {}
    }

    // Same-module struct construction.
    if ctx.lookup.structs.contains(name) {
        return struct_pack(name, args, named_args, ctx, f);
    }

    // Explicit conversion through an interface type in value position binds
    // the callee address; `IERC20(addr)` alone is just the address.
    if ctx.lookup.is_interface(name) && args.len() == 1 {
        return transform_expr(&args[0], ctx, f);
    }

    // Same-contract call.
    if let Some(callee_fn) = ctx.contract.function(name) {
        let callee_fn = callee_fn.clone();
        let callee_fn = &callee_fn;
        let mut call_args = Vec::new();
        if functions::needs_signer(ctx, callee_fn) {
            match (&f.signer, &f.sender_param) {
                (Some(signer), _) if !callee_fn.mutability.is_readonly() => {
                    call_args.push(MoveExpr::ident(signer.clone()));
                }
                _ => {
                    call_args.push(f.sender_expr(ctx));
                }
            }
        }
        call_args.extend(args.iter().map(|a| transform_expr(a, ctx, f)));
        if callee_fn.is_internal() {
            for extra in functions::extra_ref_params(ctx, name) {
                match extra {
                    functions::ExtraRef::Group(kind) => match f.group_ref(kind) {
                        Some(local) => call_args.push(MoveExpr::ident(local)),
                        None => ctx.diags.hard_error(
                            DiagnosticKind::InternalInvariant,
                            format!("internal call to `{name}` needs an unborrowed group"),
                        ),
                    },
                    functions::ExtraRef::PerUser => match &f.user_ref {
                        Some(local) => call_args.push(MoveExpr::ident(local.clone())),
                        None => ctx.diags.hard_error(
                            DiagnosticKind::InternalInvariant,
                            format!("internal call to `{name}` needs the per-user resource"),
                        ),
                    },
                }
            }
        } else if !callee_fn.mutability.is_readonly() {
            ctx.diags.warn(
                DiagnosticKind::UnsupportedConstruct,
                format!(
                    "in-contract call to public `{name}` may conflict on resource borrows"
                ),
            );
        }
        return MoveExpr::call(ident::to_move_ident(name), call_args);
    }

    tracing::debug!(function = %name, "free function call passed through");
    let call_args = args.iter().map(|a| transform_expr(a, ctx, f)).collect();
    MoveExpr::call(ident::to_move_ident(name), call_args)
}

/// Transforms one IR expression into a Move expression.
pub(crate) fn transform_expr(expr: &Expr, ctx: &mut Ctx<'_>, f: &mut FnCtx) -> MoveExpr {
    match expr {
        Expr::Number { value, .. } => MoveExpr::number(value.clone()),
        Expr::Bool(b) => MoveExpr::Bool(*b),
        Expr::Str(s) => string_literal(s, ctx),
        Expr::Hex(h) => MoveExpr::HexString(h.clone()),
        Expr::Address(a) => MoveExpr::Address(a.clone()),

        Expr::Ident(name) => {
            if name == "this" {
                return MoveExpr::Address(ctx.opts.module_address.clone());
            }
            if is_state_var(name, ctx) {
                return state_read(name, ctx, f);
            }
            MoveExpr::ident(ident::to_move_ident(name))
        }

        Expr::Binary { op, lhs, rhs } => transform_binary(*op, lhs, rhs, ctx, f),

        Expr::Unary { op, expr: inner } => match op {
            UnOp::Not => MoveExpr::Unary {
                op: "!",
                expr: Box::new(transform_expr(inner, ctx, f)),
            },
            UnOp::BitNot => {
                let width = expr_width(inner, ctx, f).unwrap_or(256);
                let max = MoveExpr::number(format!("0x{}", "f".repeat(width as usize / 4)));
                MoveExpr::binary("^", transform_expr(inner, ctx, f), max)
            }
            UnOp::Neg => {
                ctx.diags.warn(
                    DiagnosticKind::UnsupportedConstruct,
                    "unary minus on an unsigned value aborts unless the operand is zero",
                );
                MoveExpr::binary("-", MoveExpr::zero(), transform_expr(inner, ctx, f))
            }
            UnOp::PreInc | UnOp::PostInc | UnOp::PreDec | UnOp::PostDec => {
                ctx.diags.warn(
                    DiagnosticKind::UnsupportedConstruct,
                    "increment/decrement inside an expression keeps only the value",
                );
                transform_expr(inner, ctx, f)
            }
        },

        Expr::Call { callee, args, named_args } => {
            transform_call(callee, args, named_args, ctx, f)
        }

        Expr::Member { base, member } => transform_member(base, member, ctx, f),

        Expr::Index { .. } => {
            if let Some((root, keys)) = mapping_chain(expr, ctx) {
                let root = root.to_string();
                let keys: Vec<&Expr> = keys;
                return mapping_read(&root, &keys, ctx, f);
            }
            let Expr::Index { base, index } = expr else { unreachable!() };
            ctx.use_("std::vector");
            let base = transform_expr(base, ctx, f);
            let index = transform_expr(index, ctx, f);
            MoveExpr::Deref(Box::new(MoveExpr::call(
                "vector::borrow",
                vec![
                    MoveExpr::borrow(base),
                    MoveExpr::Cast { expr: Box::new(index), ty: MoveType::U64 },
                ],
            )))
        }

        Expr::Ternary { cond, if_true, if_false } => MoveExpr::IfElse {
            cond: Box::new(transform_expr(cond, ctx, f)),
            if_true: Box::new(transform_expr(if_true, ctx, f)),
            if_false: Box::new(transform_expr(if_false, ctx, f)),
        },

        Expr::Tuple(items) => {
            MoveExpr::Tuple(items.iter().map(|e| transform_expr(e, ctx, f)).collect())
        }

        Expr::Cast { ty, expr: inner } => {
            if let Ty::Named(name) = ty {
                if ctx.lookup.is_interface(name) {
                    // Interface casts erase; the binding is tracked at the
                    // declaration site.
                    return transform_expr(inner, ctx, f);
                }
            }
            match ty {
                Ty::Address { .. } => match &**inner {
                    Expr::Number { value, .. } if value == "0" => {
                        MoveExpr::Address("0x0".to_string())
                    }
                    Expr::Ident(name) if name == "this" => {
                        MoveExpr::Address(ctx.opts.module_address.clone())
                    }
                    _ => transform_expr(inner, ctx, f),
                },
                _ => {
                    let mapped = ctx.map_ty(ty);
                    let transformed = transform_expr(inner, ctx, f);
                    if mapped.is_integer() {
                        MoveExpr::Cast { expr: Box::new(transformed), ty: mapped }
                    } else {
                        transformed
                    }
                }
            }
        }

        Expr::New { ty, .. } => match ty {
            Ty::Array { elem, .. } => {
                ctx.use_("std::vector");
                let elem = ctx.map_ty(elem);
                ctx.diags.warn(
                    DiagnosticKind::UnsupportedConstruct,
                    "sized array allocation becomes an empty vector",
                );
                MoveExpr::Call {
                    func: "vector::empty".to_string(),
                    type_args: vec![elem],
                    args: vec![],
                }
            }
            Ty::String | Ty::Bytes => string_literal("", ctx),
            _ => {
                ctx.diags.error(
                    DiagnosticKind::UnsupportedConstruct,
                    "contract creation has no Move analogue; the zero address is substituted",
                );
                MoveExpr::Address("0x0".to_string())
            }
        },

        Expr::MsgAccess(field) => match field {
            MsgField::Sender => f.sender_expr(ctx),
            MsgField::Value => {
                ctx.diags.error(
                    DiagnosticKind::UnsupportedConstruct,
                    "msg.value has no Move analogue; zero is substituted",
                );
                MoveExpr::zero()
            }
            MsgField::Data | MsgField::Sig => {
                ctx.diags.error(
                    DiagnosticKind::UnsupportedConstruct,
                    "msg.data/msg.sig have no Move analogue; empty bytes are substituted",
                );
                MoveExpr::HexString(String::new())
            }
        },

        Expr::BlockAccess(field) => match field {
            BlockField::Timestamp => {
                ctx.use_("aptos_framework::timestamp");
                MoveExpr::Cast {
                    expr: Box::new(MoveExpr::call("timestamp::now_seconds", vec![])),
                    ty: MoveType::U256,
                }
            }
            BlockField::Number => {
                ctx.use_("aptos_framework::block");
                MoveExpr::Cast {
                    expr: Box::new(MoveExpr::call("block::get_current_block_height", vec![])),
                    ty: MoveType::U256,
                }
            }
            BlockField::ChainId => {
                ctx.use_("aptos_framework::chain_id");
                MoveExpr::Cast {
                    expr: Box::new(MoveExpr::call("chain_id::get", vec![])),
                    ty: MoveType::U256,
                }
            }
            BlockField::Coinbase => {
                ctx.diags.error(
                    DiagnosticKind::UnsupportedConstruct,
                    "block.coinbase has no Move analogue; the zero address is substituted",
                );
                MoveExpr::Address("0x0".to_string())
            }
            BlockField::Difficulty | BlockField::GasLimit | BlockField::BaseFee => {
                ctx.diags.error(
                    DiagnosticKind::UnsupportedConstruct,
                    "EVM block metadata has no Move analogue; zero is substituted",
                );
                MoveExpr::zero()
            }
        },

        Expr::TxAccess(field) => match field {
            TxField::Origin => {
                ctx.diags.error(
                    DiagnosticKind::UnsupportedConstruct,
                    "tx.origin has no Move analogue; msg.sender semantics are substituted",
                );
                f.sender_expr(ctx)
            }
            TxField::GasPrice => {
                ctx.diags.error(
                    DiagnosticKind::UnsupportedConstruct,
                    "tx.gasprice has no Move analogue; zero is substituted",
                );
                MoveExpr::zero()
            }
        },
    }
}
