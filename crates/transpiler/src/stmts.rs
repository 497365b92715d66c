//! Statement transformation (IR → Move AST).

use crate::{
    ctx::{Ctx, FnCtx, LocalBinding, Writeback},
    exprs::{self, mapping_chain, transform_expr},
    interfaces,
};
use solmove_analysis::VarPlacement;
use solmove_common::{config, ident, DiagnosticKind};
use solmove_ir::{AssignOp, BinOp, Expr, MsgField, Mutability, Stmt, Ty};
use solmove_move_ast::{MoveExpr, MoveStmt, MoveType};

pub(crate) fn transform_stmts(
    stmts: &[Stmt],
    ctx: &mut Ctx<'_>,
    f: &mut FnCtx,
) -> Vec<MoveStmt> {
    let mut out = Vec::new();
    for stmt in stmts {
        transform_stmt(stmt, ctx, f, &mut out);
    }
    out
}

/// The abort-code expression for a constant, wrapped per the error style.
pub(crate) fn abort_code_expr(const_name: String, ctx: &mut Ctx<'_>) -> MoveExpr {
    match ctx.opts.error_style {
        config::ErrorStyle::AbortCodes => MoveExpr::ident(const_name),
        config::ErrorStyle::AbortVerbose => {
            ctx.use_("std::error");
            let wrapper = ctx.abort.category_of(&const_name).wrapper();
            MoveExpr::call(wrapper, vec![MoveExpr::ident(const_name)])
        }
    }
}

/// Write-backs and cleanup code inserted in front of every exit site.
pub(crate) fn exit_statements(ctx: &mut Ctx<'_>, f: &mut FnCtx) -> Vec<MoveStmt> {
    let mut out = Vec::new();
    let writebacks = f.writebacks.clone();
    for wb in &writebacks {
        if let Some(stmt) = writeback_stmt(wb, ctx, f) {
            out.push(stmt);
        }
    }
    out.extend(f.cleanup.clone());
    out
}

fn writeback_stmt(wb: &Writeback, ctx: &mut Ctx<'_>, f: &mut FnCtx) -> Option<MoveStmt> {
    let kind = ctx.plan.group_of(&wb.var)?;
    let local = f.group_ref(kind)?.to_string();
    let field = MoveExpr::field(MoveExpr::ident(local), ctx.field_name(&wb.var));
    Some(MoveStmt::Expr(MoveExpr::call(
        format!("{}::upsert", ctx.table_mod()),
        vec![MoveExpr::borrow_mut(field), wb.key.clone(), MoveExpr::ident(wb.local.clone())],
    )))
}

fn compound_op(op: AssignOp) -> Option<BinOp> {
    Some(match op {
        AssignOp::Assign => return None,
        AssignOp::Add => BinOp::Add,
        AssignOp::Sub => BinOp::Sub,
        AssignOp::Mul => BinOp::Mul,
        AssignOp::Div => BinOp::Div,
        AssignOp::Mod => BinOp::Mod,
        AssignOp::BitAnd => BinOp::BitAnd,
        AssignOp::BitOr => BinOp::BitOr,
        AssignOp::BitXor => BinOp::BitXor,
        AssignOp::Shl => BinOp::Shl,
        AssignOp::Shr => BinOp::Shr,
    })
}

/// The IR expression `target op= value` decomposed into `target op value`.
fn compound_value(target: &Expr, op: AssignOp, value: &Expr) -> Expr {
    match compound_op(op) {
        Some(bin) => Expr::Binary {
            op: bin,
            lhs: Box::new(target.clone()),
            rhs: Box::new(value.clone()),
        },
        None => value.clone(),
    }
}

fn event_only_emit(
    var: &str,
    op: AssignOp,
    value: &Expr,
    ctx: &mut Ctx<'_>,
    f: &mut FnCtx,
    out: &mut Vec<MoveStmt>,
) {
    if ctx.opts.event_pattern == config::EventPattern::None {
        ctx.diags.warn(
            DiagnosticKind::PlanRewrite,
            format!("write to event-tracked `{var}` dropped: events are disabled"),
        );
        return;
    }
    ctx.use_("aptos_framework::event");
    let amount = transform_expr(value, ctx, f);
    let pack = MoveExpr::Pack {
        name: event_struct_name(var),
        fields: vec![
            ("amount".to_string(), amount),
            ("positive".to_string(), MoveExpr::Bool(op != AssignOp::Sub)),
        ],
    };
    out.push(MoveStmt::Expr(MoveExpr::call("event::emit", vec![pack])));
}

/// Name of the synthesized event struct for an event-only counter.
pub(crate) fn event_struct_name(var: &str) -> String {
    format!("{}Event", ident::to_move_type_ident(var))
}

fn aggregator_write(
    var: &str,
    op: AssignOp,
    value: &Expr,
    ctx: &mut Ctx<'_>,
    f: &mut FnCtx,
    out: &mut Vec<MoveStmt>,
) {
    let Some(kind) = ctx.plan.group_of(var) else { return };
    let Some(local) = f.group_ref(kind).map(str::to_string) else {
        ctx.diags.hard_error(
            DiagnosticKind::InternalInvariant,
            format!("aggregated `{var}` written without a borrowed group"),
        );
        return;
    };
    ctx.use_("aptos_framework::aggregator_v2::{Self, Aggregator}");
    let field = MoveExpr::field(MoveExpr::ident(local), ctx.field_name(var));
    let inner = crate::types::aggregator_inner(&ctx.contract.state_var(var).map(|v| v.ty.clone()).unwrap_or(Ty::uint256())).0;
    let amount = MoveExpr::Cast {
        expr: Box::new(transform_expr(value, ctx, f)),
        ty: inner,
    };
    let method = match op {
        AssignOp::Add => "add",
        AssignOp::Sub => "sub",
        _ => {
            ctx.diags.hard_error(
                DiagnosticKind::InternalInvariant,
                format!("aggregated `{var}` only supports `+=`/`-=` writes"),
            );
            return;
        }
    };
    out.push(MoveStmt::Expr(exprs::aggregator_call(ctx, method, field, vec![amount], true)));
}

/// Threads `borrow_mut` through outer tables so the last key can be
/// upserted, creating missing inner tables along the way.
fn table_chain_lvalue(
    base: MoveExpr,
    keys_but_last: &[MoveExpr],
    table_mod: &str,
    out: &mut Vec<MoveStmt>,
) -> MoveExpr {
    let mut lvalue = base;
    for key in keys_but_last {
        // The inner table must exist before it can be borrowed mutably.
        out.push(MoveStmt::If {
            cond: MoveExpr::Unary {
                op: "!",
                expr: Box::new(MoveExpr::call(
                    format!("{table_mod}::contains"),
                    vec![MoveExpr::borrow(lvalue.clone()), key.clone()],
                )),
            },
            then_branch: vec![MoveStmt::Expr(MoveExpr::call(
                format!("{table_mod}::add"),
                vec![
                    MoveExpr::borrow_mut(lvalue.clone()),
                    key.clone(),
                    MoveExpr::call(format!("{table_mod}::new"), vec![]),
                ],
            ))],
            else_branch: None,
        });
        lvalue = MoveExpr::Deref(Box::new(MoveExpr::call(
            format!("{table_mod}::borrow_mut"),
            vec![MoveExpr::borrow_mut(lvalue), key.clone()],
        )));
    }
    lvalue
}

/// The mutable lvalue for a mapping entry chain rooted at a state variable.
/// Returns `None` when the root has no group storage.
fn mapping_entry_lvalue(
    root: &str,
    keys: &[MoveExpr],
    ctx: &mut Ctx<'_>,
    f: &mut FnCtx,
    out: &mut Vec<MoveStmt>,
) -> Option<MoveExpr> {
    let kind = ctx.plan.group_of(root)?;
    let local = f.group_ref(kind)?.to_string();
    let table_mod = ctx.table_mod();
    let base = MoveExpr::field(MoveExpr::ident(local), ctx.field_name(root));
    Some(table_chain_lvalue(base, &keys[..keys.len() - 1], table_mod, out))
}

fn transform_assign(
    target: &Expr,
    op: AssignOp,
    value: &Expr,
    ctx: &mut Ctx<'_>,
    f: &mut FnCtx,
    out: &mut Vec<MoveStmt>,
) {
    // Tuple destructuring: `(a, b) = f()`.
    if let Expr::Tuple(items) = target {
        let names: Vec<String> = items
            .iter()
            .map(|e| e.as_ident().map(ident::to_move_ident).unwrap_or_else(|| "_".to_string()))
            .collect();
        let value = transform_expr(value, ctx, f);
        out.push(MoveStmt::LetTuple { names, value });
        return;
    }

    // Scalar state variable.
    if let Expr::Ident(name) = target {
        if let Some(state_var) = ctx.contract.state_var(name) {
            if state_var.mutability == Mutability::Constant {
                ctx.diags.hard_error(
                    DiagnosticKind::InternalInvariant,
                    format!("assignment to constant `{name}`"),
                );
                return;
            }
            if let Some(planned) = ctx.plan.var(name) {
                match planned.placement {
                    VarPlacement::EventOnly => {
                        event_only_emit(name, op, value, ctx, f, out);
                        return;
                    }
                    _ if planned.aggregated => {
                        aggregator_write(name, op, value, ctx, f, out);
                        return;
                    }
                    _ => {}
                }
            }
            let Some(kind) = ctx.plan.group_of(name) else {
                ctx.diags.hard_error(
                    DiagnosticKind::InternalInvariant,
                    format!("`{name}` written without a storage group"),
                );
                return;
            };
            let Some(local) = f.group_ref(kind).map(str::to_string) else {
                ctx.diags.hard_error(
                    DiagnosticKind::InternalInvariant,
                    format!("`{name}` written without a borrowed resource group"),
                );
                return;
            };
            let lvalue = MoveExpr::field(MoveExpr::ident(local), ctx.field_name(name));
            let mut rhs = transform_expr(&compound_value(target, op, value), ctx, f);
            if exprs::is_optionized(name, ctx) {
                ctx.use_("std::option::{Self, Option}");
                rhs = MoveExpr::call("option::some", vec![rhs]);
            }
            out.push(MoveStmt::Assign { target: lvalue, value: rhs });
            return;
        }

        // Plain local.
        let rhs = transform_expr(&compound_value(target, op, value), ctx, f);
        out.push(MoveStmt::Assign {
            target: MoveExpr::ident(ident::to_move_ident(name)),
            value: rhs,
        });
        return;
    }

    // Mapping entry writes.
    if let Some((root, keys)) = mapping_chain(target, ctx) {
        let root = root.to_string();
        let planned = ctx.plan.var(&root).cloned();

        if planned.as_ref().is_some_and(|p| p.placement == VarPlacement::PerUser) {
            // All writes were verified to key on the sender; the field lives
            // on the caller's own resource.
            if !matches!(keys[0], Expr::MsgAccess(MsgField::Sender)) {
                ctx.diags.hard_error(
                    DiagnosticKind::InternalInvariant,
                    format!("write to per-user `{root}` with a non-sender key"),
                );
            }
            let Some(local) = f.user_ref.clone() else {
                ctx.diags.hard_error(
                    DiagnosticKind::InternalInvariant,
                    format!("write to per-user `{root}` without the user resource"),
                );
                return;
            };
            let field = MoveExpr::field(MoveExpr::ident(local), ctx.field_name(&root));
            let rhs = transform_expr(&compound_value(target, op, value), ctx, f);
            // Keys past the promoted one index into tables stored on the
            // user's resource.
            let rest: Vec<MoveExpr> =
                keys[1..].iter().map(|k| transform_expr(k, ctx, f)).collect();
            if rest.is_empty() {
                out.push(MoveStmt::Assign { target: field, value: rhs });
            } else {
                let table_mod = ctx.table_mod();
                let lvalue =
                    table_chain_lvalue(field, &rest[..rest.len() - 1], table_mod, out);
                let last = rest.last().expect("nonempty").clone();
                out.push(MoveStmt::Expr(MoveExpr::call(
                    format!("{table_mod}::upsert"),
                    vec![MoveExpr::borrow_mut(lvalue), last, rhs],
                )));
            }
            return;
        }

        let rhs = transform_expr(&compound_value(target, op, value), ctx, f);
        let keys_mv: Vec<MoveExpr> =
            keys.iter().map(|k| transform_expr(k, ctx, f)).collect();
        let Some(lvalue) = mapping_entry_lvalue(&root, &keys_mv, ctx, f, out) else {
            ctx.diags.hard_error(
                DiagnosticKind::InternalInvariant,
                format!("mapping `{root}` has no storage group"),
            );
            return;
        };
        let last_key = keys_mv.last().expect("chain has at least one key").clone();
        out.push(MoveStmt::Expr(MoveExpr::call(
            format!("{}::upsert", ctx.table_mod()),
            vec![MoveExpr::borrow_mut(lvalue), last_key, rhs],
        )));
        return;
    }

    // Vector element write: `arr[i] = v`.
    if let Expr::Index { base, index } = target {
        ctx.use_("std::vector");
        let rhs = transform_expr(&compound_value(target, op, value), ctx, f);
        let base = transform_expr(base, ctx, f);
        let index = transform_expr(index, ctx, f);
        out.push(MoveStmt::Assign {
            target: MoveExpr::Deref(Box::new(MoveExpr::call(
                "vector::borrow_mut",
                vec![
                    MoveExpr::borrow_mut(base),
                    MoveExpr::Cast { expr: Box::new(index), ty: MoveType::U64 },
                ],
            ))),
            value: rhs,
        });
        return;
    }

    // Struct field write, through locals or state.
    if let Expr::Member { .. } = target {
        let lvalue = transform_expr(target, ctx, f);
        let rhs = transform_expr(&compound_value(target, op, value), ctx, f);
        out.push(MoveStmt::Assign { target: lvalue, value: rhs });
        return;
    }

    ctx.diags.warn(DiagnosticKind::UnsupportedConstruct, "unsupported assignment target");
}

/// Detects `for (T i = a; i < b; i++)` and rewrites it as a range loop.
fn range_loop(
    init: Option<&Stmt>,
    cond: Option<&Expr>,
    step: Option<&Stmt>,
) -> Option<(String, Expr, Expr)> {
    let Stmt::VarDecl { name, init: Some(from), .. } = init? else { return None };
    let Expr::Binary { op: BinOp::Lt, lhs, rhs } = cond? else { return None };
    if lhs.as_ident() != Some(name.as_str()) {
        return None;
    }
    let Stmt::Assign { target, op: AssignOp::Add, value } = step? else { return None };
    if target.as_ident() != Some(name.as_str()) {
        return None;
    }
    if !matches!(value, Expr::Number { value, .. } if value == "1") {
        return None;
    }
    Some((name.clone(), from.clone(), (**rhs).clone()))
}

fn delete_stmt(target: &Expr, ctx: &mut Ctx<'_>, f: &mut FnCtx, out: &mut Vec<MoveStmt>) {
    if let Some((root, keys)) = mapping_chain(target, ctx) {
        let root = root.to_string();
        let keys_mv: Vec<MoveExpr> = keys.iter().map(|k| transform_expr(k, ctx, f)).collect();
        let table_mod = ctx.table_mod();
        if let Some(lvalue) = mapping_entry_lvalue(&root, &keys_mv, ctx, f, out) {
            let last_key = keys_mv.last().expect("chain has at least one key").clone();
            out.push(MoveStmt::If {
                cond: MoveExpr::call(
                    format!("{table_mod}::contains"),
                    vec![MoveExpr::borrow(lvalue.clone()), last_key.clone()],
                ),
                then_branch: vec![MoveStmt::Expr(MoveExpr::call(
                    format!("{table_mod}::remove"),
                    vec![MoveExpr::borrow_mut(lvalue), last_key],
                ))],
                else_branch: None,
            });
        }
        return;
    }
    if let Expr::Ident(name) = target {
        if let Some(state_var) = ctx.contract.state_var(name) {
            let ty = state_var.ty.clone();
            let mapped = ctx.map_ty(&ty);
            let default = ctx.default_value(&mapped);
            let lvalue = exprs::state_read(name, ctx, f);
            out.push(MoveStmt::Assign { target: lvalue, value: default });
            return;
        }
    }
    ctx.diags.warn(DiagnosticKind::UnsupportedConstruct, "unsupported `delete` target");
}

fn transform_stmt(stmt: &Stmt, ctx: &mut Ctx<'_>, f: &mut FnCtx, out: &mut Vec<MoveStmt>) {
    match stmt {
        Stmt::VarDecl { name, ty, init } => {
            let move_name = ident::to_move_ident(name);
            let mut binding = LocalBinding::default();

            if let Some(init_expr) = init {
                if let Some((iface, _)) = interfaces::interface_target(init_expr, ctx, f) {
                    binding.interface = Some(iface);
                }
                // A struct copy out of a mapping is written back at every
                // exit point.
                if let Some(Ty::Named(struct_name)) = ty {
                    if ctx.lookup.structs.contains(struct_name) {
                        binding.struct_name = Some(struct_name.clone());
                        if let Some((root, keys)) = mapping_chain(init_expr, ctx) {
                            if keys.len() == 1 {
                                let root = root.to_string();
                                let key_mv = transform_expr(keys[0], ctx, f);
                                f.writebacks.push(Writeback {
                                    var: root,
                                    key: key_mv,
                                    local: move_name.clone(),
                                });
                            }
                        }
                    }
                }
            }
            if let Some(width) = ty.as_ref().and_then(|t| t.bit_width()) {
                f.param_widths.insert(name.clone(), crate::types::round_up(width));
            }
            f.locals.insert(name.clone(), binding);

            let mapped_ty = ty.as_ref().map(|t| ctx.map_ty(t));
            let value = init.as_ref().map(|e| {
                // Array literals surface as tuples; in a vector-typed
                // declaration they become vector literals.
                if let (Some(Ty::Array { .. }), Expr::Tuple(items)) = (ty, e) {
                    MoveExpr::VectorLit(
                        items.iter().map(|i| transform_expr(i, ctx, f)).collect(),
                    )
                } else {
                    transform_expr(e, ctx, f)
                }
            });
            out.push(MoveStmt::Let { name: move_name, ty: mapped_ty, value });
        }

        Stmt::Assign { target, op, value } => transform_assign(target, *op, value, ctx, f, out),

        Stmt::If { cond, then_branch, else_branch } => {
            let cond = transform_expr(cond, ctx, f);
            let then_branch = transform_stmts(then_branch, ctx, f);
            let else_branch = else_branch.as_ref().map(|b| transform_stmts(b, ctx, f));
            out.push(MoveStmt::If { cond, then_branch, else_branch });
        }

        Stmt::For { init, cond, step, body } => {
            if let Some((var, from, to)) =
                range_loop(init.as_deref(), cond.as_ref(), step.as_deref())
            {
                let from = transform_expr(&from, ctx, f);
                let to = transform_expr(&to, ctx, f);
                let body = transform_stmts(body, ctx, f);
                out.push(MoveStmt::ForRange {
                    name: ident::to_move_ident(&var),
                    from,
                    to,
                    body,
                });
                return;
            }
            let mut block = Vec::new();
            if let Some(init) = init {
                transform_stmt(init, ctx, f, &mut block);
            }
            let cond = cond
                .as_ref()
                .map(|c| transform_expr(c, ctx, f))
                .unwrap_or(MoveExpr::Bool(true));
            let mut loop_body = transform_stmts(body, ctx, f);
            if let Some(step) = step {
                transform_stmt(step, ctx, f, &mut loop_body);
            }
            block.push(MoveStmt::While { cond, body: loop_body });
            out.extend(block);
        }

        Stmt::While { cond, body } => {
            let cond = transform_expr(cond, ctx, f);
            let body = transform_stmts(body, ctx, f);
            out.push(MoveStmt::While { cond, body });
        }

        Stmt::DoWhile { body, cond } => {
            let mut loop_body = transform_stmts(body, ctx, f);
            let cond = transform_expr(cond, ctx, f);
            loop_body.push(MoveStmt::If {
                cond: MoveExpr::Unary { op: "!", expr: Box::new(cond) },
                then_branch: vec![MoveStmt::Break],
                else_branch: None,
            });
            out.push(MoveStmt::Loop { body: loop_body });
        }

        Stmt::Block(inner) => {
            // Solidity blocks scope locals; the translated body keeps the
            // statements inline since shadowing is resolved by renaming.
            out.extend(transform_stmts(inner, ctx, f));
        }

        // A transparent delimiter: the arithmetic semantics are decided by
        // the overflow configuration, not the block.
        Stmt::Unchecked(inner) => out.extend(transform_stmts(inner, ctx, f)),

        Stmt::Return(value) => {
            out.extend(exit_statements(ctx, f));
            let value = match value {
                Some(v) => Some(transform_expr(v, ctx, f)),
                None if !f.named_returns.is_empty() => {
                    let names: Vec<MoveExpr> = f
                        .named_returns
                        .iter()
                        .map(|(n, _)| MoveExpr::ident(n.clone()))
                        .collect();
                    Some(if names.len() == 1 {
                        names.into_iter().next().expect("len checked")
                    } else {
                        MoveExpr::Tuple(names)
                    })
                }
                None => None,
            };
            out.push(MoveStmt::Return(value));
        }

        Stmt::Emit { event, args } => emit_event(event, args, ctx, f, out),

        Stmt::Revert { error, message } => {
            let const_name = match (error, message) {
                (Some(error), _) => ctx.abort.for_error(error),
                (None, Some(message)) => ctx.abort.for_message(message),
                (None, None) => ctx.abort.assertion_failed(),
            };
            let code = abort_code_expr(const_name, ctx);
            out.push(MoveStmt::Abort(code));
        }

        Stmt::Require { cond, message } => {
            let cond = transform_expr(cond, ctx, f);
            let const_name = match message {
                Some(message) => ctx.abort.for_message(message),
                None => ctx.abort.assertion_failed(),
            };
            let code = abort_code_expr(const_name, ctx);
            out.push(MoveStmt::Expr(MoveExpr::call("assert!", vec![cond, code])));
        }

        Stmt::Break => out.push(MoveStmt::Break),
        Stmt::Continue => out.push(MoveStmt::Continue),

        Stmt::Expr(expr) => {
            if let Expr::Call { callee, args, .. } = expr {
                if matches!(&**callee, Expr::Ident(n) if n == "__delete") {
                    if let Some(target) = args.first() {
                        delete_stmt(target, ctx, f, out);
                    }
                    return;
                }
            }
            let transformed = transform_expr(expr, ctx, f);
            out.push(MoveStmt::Expr(transformed));
        }

        Stmt::TryCatch { call, success, catch } => {
            // External calls cannot fail recoverably on Move; the call runs,
            // then the success branch.
            out.push(MoveStmt::Comment(
                "try/catch: the call aborts instead of failing recoverably".to_string(),
            ));
            let call = transform_expr(call, ctx, f);
            out.push(MoveStmt::Expr(call));
            out.extend(transform_stmts(success, ctx, f));
            if !catch.is_empty() {
                out.push(MoveStmt::Comment("catch branch unreachable on Move".to_string()));
            }
        }

        Stmt::Placeholder => {
            // Only meaningful inside modifier bodies, which are spliced by
            // the function transformer.
        }
    }
}

fn emit_event(
    event: &str,
    args: &[Expr],
    ctx: &mut Ctx<'_>,
    f: &mut FnCtx,
    out: &mut Vec<MoveStmt>,
) {
    let Some(def) = ctx.contract.events.iter().find(|e| e.name == event).cloned() else {
        ctx.diags.hard_error(
            DiagnosticKind::InternalInvariant,
            format!("emit of undeclared event `{event}`"),
        );
        return;
    };

    match ctx.opts.event_pattern {
        config::EventPattern::None => {
            ctx.diags.warn(
                DiagnosticKind::UnsupportedConstruct,
                format!("event `{event}` dropped: events are disabled"),
            );
        }
        config::EventPattern::Native => {
            ctx.use_("aptos_framework::event");
            let fields = def
                .fields
                .iter()
                .zip(args.iter())
                .map(|(field, arg)| {
                    (ident::to_move_ident(&field.name), transform_expr(arg, ctx, f))
                })
                .collect();
            let pack = MoveExpr::Pack { name: ident::to_move_type_ident(event), fields };
            out.push(MoveStmt::Expr(MoveExpr::call("event::emit", vec![pack])));
        }
        config::EventPattern::EventHandle => {
            ctx.use_("aptos_framework::event");
            let Some(primary) = ctx.plan.primary else {
                ctx.diags.hard_error(
                    DiagnosticKind::InternalInvariant,
                    "event handles need a primary resource",
                );
                return;
            };
            let Some(local) = f.group_ref(primary).map(str::to_string) else {
                ctx.diags.hard_error(
                    DiagnosticKind::InternalInvariant,
                    format!("event `{event}` emitted without the primary resource"),
                );
                return;
            };
            let fields = def
                .fields
                .iter()
                .zip(args.iter())
                .map(|(field, arg)| {
                    (ident::to_move_ident(&field.name), transform_expr(arg, ctx, f))
                })
                .collect();
            let pack = MoveExpr::Pack { name: ident::to_move_type_ident(event), fields };
            let handle = MoveExpr::field(
                MoveExpr::ident(local),
                format!("{}_events", ident::to_move_ident(event)),
            );
            out.push(MoveStmt::Expr(MoveExpr::call(
                "event::emit_event",
                vec![MoveExpr::borrow_mut(handle), pack],
            )));
        }
    }
}
