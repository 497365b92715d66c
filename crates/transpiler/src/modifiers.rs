//! Modifier inlining.
//!
//! Built-in modifier shapes are recognized by name and generate canonical
//! guard code; unknown modifiers are inlined from their IR definition with
//! the caller's argument expressions substituted for the formals.

use crate::{
    ctx::{Ctx, FnCtx},
    exprs::{state_read, transform_expr},
    stmts::abort_code_expr,
};
use solmove_common::DiagnosticKind;
use solmove_ir::{Expr, Modifier, Param, StateVar, Stmt, Ty};
use solmove_move_ast::{MoveExpr, MoveStmt, MoveType};
use std::collections::BTreeMap;

pub(crate) const BUILTINS: &[&str] =
    &["onlyOwner", "nonReentrant", "whenNotPaused", "whenPaused", "onlyRole"];

pub(crate) fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// The synthetic field backing `nonReentrant` under the mutex pattern.
pub(crate) const REENTRANCY_FIELD: &str = "reentrancy_status";
/// The capability resource backing `onlyOwner` under capability access
/// control.
pub(crate) const OWNER_CAPABILITY: &str = "OwnerCapability";

/// The state variable holding the contract owner, when one exists.
pub(crate) fn owner_var<'a>(ctx: &'a Ctx<'_>) -> Option<&'a StateVar> {
    ["owner", "_owner", "admin", "_admin"]
        .iter()
        .find_map(|name| ctx.contract.state_var(name))
        .filter(|v| matches!(v.ty, Ty::Address { .. }))
}

/// The state variable holding the paused flag, when one exists.
pub(crate) fn paused_var<'a>(ctx: &'a Ctx<'_>) -> Option<&'a StateVar> {
    ["paused", "_paused"]
        .iter()
        .find_map(|name| ctx.contract.state_var(name))
        .filter(|v| v.ty == Ty::Bool)
}

/// What a builtin guard needs from the enclosing function before its code
/// can be generated.
#[derive(Clone, Debug, Default)]
pub(crate) struct GuardNeeds {
    pub sender: bool,
    /// State variables whose groups must be readable.
    pub reads_vars: Vec<String>,
    /// The primary group must be mutably borrowed.
    pub primary_write: bool,
}

pub(crate) fn builtin_needs(name: &str, ctx: &Ctx<'_>) -> GuardNeeds {
    match name {
        "onlyOwner" => GuardNeeds {
            sender: true,
            reads_vars: match ctx.opts.access_control {
                solmove_common::config::AccessControl::InlineAssert => {
                    owner_var(ctx).map(|v| vec![v.name.clone()]).unwrap_or_default()
                }
                solmove_common::config::AccessControl::Capability => Vec::new(),
            },
            primary_write: false,
        },
        "nonReentrant" => GuardNeeds {
            sender: false,
            reads_vars: Vec::new(),
            primary_write: ctx.opts.reentrancy_pattern
                == solmove_common::config::ReentrancyPattern::Mutex,
        },
        "whenNotPaused" | "whenPaused" => GuardNeeds {
            sender: false,
            reads_vars: paused_var(ctx).map(|v| vec![v.name.clone()]).unwrap_or_default(),
            primary_write: false,
        },
        "onlyRole" => GuardNeeds { sender: true, ..Default::default() },
        _ => GuardNeeds::default(),
    }
}

fn reentrancy_field_expr(ctx: &mut Ctx<'_>, f: &FnCtx) -> Option<MoveExpr> {
    let primary = ctx.plan.primary?;
    let local = f.group_ref(primary)?;
    Some(MoveExpr::field(MoveExpr::ident(local), REENTRANCY_FIELD))
}

/// Generates the canonical guard for a builtin modifier. Returns the
/// pre-body statements and the cleanup statements cloned per exit site.
/// `None` means the shape could not be applied here.
pub(crate) fn builtin_guard(
    name: &str,
    args: &[Expr],
    ctx: &mut Ctx<'_>,
    f: &mut FnCtx,
) -> Option<(Vec<MoveStmt>, Vec<MoveStmt>)> {
    match name {
        "onlyOwner" => {
            match ctx.opts.access_control {
                solmove_common::config::AccessControl::InlineAssert => {
                    let owner = owner_var(ctx)?.name.clone();
                    let code_name = ctx.abort.for_message("caller is not the owner");
                    let code = abort_code_expr(code_name, ctx);
                    let sender = f.sender_expr(ctx);
                    let owner_read = state_read(&owner, ctx, f);
                    let cond = MoveExpr::binary("==", sender, owner_read);
                    Some((
                        vec![MoveStmt::Expr(MoveExpr::call("assert!", vec![cond, code]))],
                        Vec::new(),
                    ))
                }
                solmove_common::config::AccessControl::Capability => {
                    let code_name = ctx.abort.for_message("caller is not the owner");
                    let code = abort_code_expr(code_name, ctx);
                    let sender = f.sender_expr(ctx);
                    let cond = MoveExpr::Call {
                        func: "exists".to_string(),
                        type_args: vec![MoveType::Struct(OWNER_CAPABILITY.to_string())],
                        args: vec![sender],
                    };
                    Some((
                        vec![MoveStmt::Expr(MoveExpr::call("assert!", vec![cond, code]))],
                        Vec::new(),
                    ))
                }
            }
        }
        "nonReentrant" => {
            if ctx.opts.reentrancy_pattern == solmove_common::config::ReentrancyPattern::None {
                ctx.diags.warn(
                    DiagnosticKind::UnsupportedConstruct,
                    "nonReentrant guard dropped: reentrancy pattern is `none`",
                );
                return Some((Vec::new(), Vec::new()));
            }
            let field = reentrancy_field_expr(ctx, f)?;
            let code_name = ctx.abort.for_message("reentrancy");
            let code = abort_code_expr(code_name, ctx);
            let pre = vec![
                MoveStmt::Expr(MoveExpr::call(
                    "assert!",
                    vec![
                        MoveExpr::binary("!=", field.clone(), MoveExpr::number("2")),
                        code,
                    ],
                )),
                MoveStmt::Assign { target: field.clone(), value: MoveExpr::number("2") },
            ];
            let cleanup = vec![MoveStmt::Assign { target: field, value: MoveExpr::number("1") }];
            Some((pre, cleanup))
        }
        "whenNotPaused" | "whenPaused" => {
            let paused = paused_var(ctx)?.name.clone();
            let read = state_read(&paused, ctx, f);
            let (cond, code_name) = if name == "whenNotPaused" {
                (
                    MoveExpr::Unary { op: "!", expr: Box::new(read) },
                    ctx.abort.for_message("paused"),
                )
            } else {
                (read, ctx.abort.for_message("not paused"))
            };
            let code = abort_code_expr(code_name, ctx);
            Some((
                vec![MoveStmt::Expr(MoveExpr::call("assert!", vec![cond, code]))],
                Vec::new(),
            ))
        }
        "onlyRole" => {
            // Routed through the contract's own `hasRole` when it has one.
            if ctx.contract.function("hasRole").is_none() || args.is_empty() {
                ctx.diags.warn(
                    DiagnosticKind::UnsupportedConstruct,
                    "onlyRole guard needs a `hasRole` function; no guard emitted",
                );
                return Some((Vec::new(), Vec::new()));
            }
            let role = transform_expr(&args[0], ctx, f);
            let sender = f.sender_expr(ctx);
            let cond = MoveExpr::call("has_role", vec![role, sender]);
            let code_name = ctx.abort.for_message("unauthorized");
            let code = abort_code_expr(code_name, ctx);
            Some((
                vec![MoveStmt::Expr(MoveExpr::call("assert!", vec![cond, code]))],
                Vec::new(),
            ))
        }
        _ => None,
    }
}

/// Substitutes modifier formals with the caller's argument expressions.
pub(crate) fn substitute(body: &[Stmt], params: &[Param], args: &[Expr]) -> Vec<Stmt> {
    let map: BTreeMap<&str, &Expr> = params
        .iter()
        .zip(args.iter())
        .map(|(p, a)| (p.name.as_str(), a))
        .collect();
    if map.is_empty() {
        return body.to_vec();
    }
    body.iter().map(|s| subst_stmt(s, &map)).collect()
}

fn subst_expr(expr: &Expr, map: &BTreeMap<&str, &Expr>) -> Expr {
    match expr {
        Expr::Ident(name) => match map.get(name.as_str()) {
            Some(replacement) => (*replacement).clone(),
            None => expr.clone(),
        },
        Expr::Binary { op, lhs, rhs } => Expr::Binary {
            op: *op,
            lhs: Box::new(subst_expr(lhs, map)),
            rhs: Box::new(subst_expr(rhs, map)),
        },
        Expr::Unary { op, expr } => {
            Expr::Unary { op: *op, expr: Box::new(subst_expr(expr, map)) }
        }
        Expr::Call { callee, args, named_args } => Expr::Call {
            callee: Box::new(subst_expr(callee, map)),
            args: args.iter().map(|a| subst_expr(a, map)).collect(),
            named_args: named_args
                .iter()
                .map(|(n, a)| (n.clone(), subst_expr(a, map)))
                .collect(),
        },
        Expr::Member { base, member } => Expr::Member {
            base: Box::new(subst_expr(base, map)),
            member: member.clone(),
        },
        Expr::Index { base, index } => Expr::Index {
            base: Box::new(subst_expr(base, map)),
            index: Box::new(subst_expr(index, map)),
        },
        Expr::Ternary { cond, if_true, if_false } => Expr::Ternary {
            cond: Box::new(subst_expr(cond, map)),
            if_true: Box::new(subst_expr(if_true, map)),
            if_false: Box::new(subst_expr(if_false, map)),
        },
        Expr::Tuple(items) => {
            Expr::Tuple(items.iter().map(|e| subst_expr(e, map)).collect())
        }
        Expr::Cast { ty, expr } => {
            Expr::Cast { ty: ty.clone(), expr: Box::new(subst_expr(expr, map)) }
        }
        Expr::New { ty, args } => Expr::New {
            ty: ty.clone(),
            args: args.iter().map(|a| subst_expr(a, map)).collect(),
        },
        _ => expr.clone(),
    }
}

fn subst_stmt(stmt: &Stmt, map: &BTreeMap<&str, &Expr>) -> Stmt {
    match stmt {
        Stmt::VarDecl { name, ty, init } => Stmt::VarDecl {
            name: name.clone(),
            ty: ty.clone(),
            init: init.as_ref().map(|e| subst_expr(e, map)),
        },
        Stmt::Assign { target, op, value } => Stmt::Assign {
            target: subst_expr(target, map),
            op: *op,
            value: subst_expr(value, map),
        },
        Stmt::If { cond, then_branch, else_branch } => Stmt::If {
            cond: subst_expr(cond, map),
            then_branch: then_branch.iter().map(|s| subst_stmt(s, map)).collect(),
            else_branch: else_branch
                .as_ref()
                .map(|b| b.iter().map(|s| subst_stmt(s, map)).collect()),
        },
        Stmt::While { cond, body } => Stmt::While {
            cond: subst_expr(cond, map),
            body: body.iter().map(|s| subst_stmt(s, map)).collect(),
        },
        Stmt::DoWhile { body, cond } => Stmt::DoWhile {
            body: body.iter().map(|s| subst_stmt(s, map)).collect(),
            cond: subst_expr(cond, map),
        },
        Stmt::For { init, cond, step, body } => Stmt::For {
            init: init.as_ref().map(|s| Box::new(subst_stmt(s, map))),
            cond: cond.as_ref().map(|e| subst_expr(e, map)),
            step: step.as_ref().map(|s| Box::new(subst_stmt(s, map))),
            body: body.iter().map(|s| subst_stmt(s, map)).collect(),
        },
        Stmt::Block(inner) => {
            Stmt::Block(inner.iter().map(|s| subst_stmt(s, map)).collect())
        }
        Stmt::Unchecked(inner) => {
            Stmt::Unchecked(inner.iter().map(|s| subst_stmt(s, map)).collect())
        }
        Stmt::Return(value) => Stmt::Return(value.as_ref().map(|e| subst_expr(e, map))),
        Stmt::Require { cond, message } => Stmt::Require {
            cond: subst_expr(cond, map),
            message: message.clone(),
        },
        Stmt::Emit { event, args } => Stmt::Emit {
            event: event.clone(),
            args: args.iter().map(|a| subst_expr(a, map)).collect(),
        },
        Stmt::Expr(e) => Stmt::Expr(subst_expr(e, map)),
        other => other.clone(),
    }
}

/// Splits a user modifier into pre-guards and cleanup with the invocation
/// arguments substituted.
pub(crate) fn split_user_modifier(
    modifier: &Modifier,
    args: &[Expr],
) -> (Vec<Stmt>, Vec<Stmt>) {
    let substituted = substitute(&modifier.body, &modifier.params, args);
    match substituted.iter().position(|s| matches!(s, Stmt::Placeholder)) {
        Some(i) => {
            let (pre, post) = substituted.split_at(i);
            (pre.to_vec(), post[1..].to_vec())
        }
        None => (substituted, Vec::new()),
    }
}
