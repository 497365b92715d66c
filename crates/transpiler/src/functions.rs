//! Function assembly: signer threading, state borrowing, modifier inlining
//! and the `acquires` computation.

use crate::{
    ctx::{Ctx, FnCtx},
    modifiers, stmts,
    types::round_up,
};
use solmove_analysis::{access, GroupKind};
use solmove_common::{config, ident, DiagnosticKind};
use solmove_ir::{Contract, Expr, Function, MsgField, Stmt, TxField};
use solmove_move_ast::{
    MoveExpr, MoveFunction, MoveParam, MoveStmt, MoveType, MoveVisibility,
};
use std::collections::BTreeSet;

/// An implicit reference parameter of an internal function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ExtraRef {
    Group(GroupKind),
    PerUser,
}

/// The reference parameters an internal function receives instead of doing
/// its own global borrows. Order is deterministic: groups in kind order,
/// then the per-user resource.
pub(crate) fn extra_ref_params(ctx: &Ctx<'_>, fn_name: &str) -> Vec<ExtraRef> {
    let Some(profile) = ctx.plan.profile(fn_name) else { return Vec::new() };
    let mut out: Vec<ExtraRef> =
        profile.touched_groups().into_iter().map(ExtraRef::Group).collect();
    if profile.reads_per_user || profile.writes_per_user {
        out.push(ExtraRef::PerUser);
    }
    out
}

fn expr_uses_sender(expr: &Expr) -> bool {
    matches!(expr, Expr::MsgAccess(MsgField::Sender) | Expr::TxAccess(TxField::Origin))
        || access::expr_children(expr).into_iter().any(expr_uses_sender)
}

fn stmts_use_sender(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|s| {
        access::stmt_expr_children(s).into_iter().any(expr_uses_sender)
            || stmts_use_sender_nested(s)
    })
}

fn stmts_use_sender_nested(stmt: &Stmt) -> bool {
    access::stmt_stmt_children(stmt)
        .into_iter()
        .any(|s| access::stmt_expr_children(s).into_iter().any(expr_uses_sender)
            || stmts_use_sender_nested(s))
}

/// True when the function (or an inlined modifier) consumes `msg.sender`.
pub(crate) fn uses_msg_sender(contract: &Contract, func: &Function) -> bool {
    if stmts_use_sender(&func.body) {
        return true;
    }
    func.modifiers.iter().any(|inv| {
        if modifiers::is_builtin(&inv.name) {
            return matches!(inv.name.as_str(), "onlyOwner" | "onlyRole");
        }
        contract
            .modifier(&inv.name)
            .is_some_and(|def| stmts_use_sender(&def.body))
    })
}

/// Recognized interface `transfer` routings move coins from the caller and
/// therefore need the signer even without an explicit `msg.sender`.
fn has_interface_transfer(func: &Function, ctx: &Ctx<'_>) -> bool {
    fn expr_has(expr: &Expr, ctx: &Ctx<'_>) -> bool {
        if let Expr::Call { callee, .. } = expr {
            if let Expr::Member { base, member } = &**callee {
                if member == "transfer" {
                    let iface = match &**base {
                        Expr::Call { callee, args, .. } if args.len() == 1 => {
                            match &**callee {
                                Expr::Ident(name) => Some(name),
                                _ => None,
                            }
                        }
                        Expr::Cast { ty: solmove_ir::Ty::Named(name), .. } => Some(name),
                        _ => None,
                    };
                    if iface.is_some_and(|n| ctx.lookup.is_interface(n)) {
                        return true;
                    }
                }
            }
        }
        access::expr_children(expr).into_iter().any(|c| expr_has(c, ctx))
    }
    fn stmt_has(stmt: &Stmt, ctx: &Ctx<'_>) -> bool {
        access::stmt_expr_children(stmt).into_iter().any(|e| expr_has(e, ctx))
            || access::stmt_stmt_children(stmt).into_iter().any(|s| stmt_has(s, ctx))
    }
    func.body.iter().any(|s| stmt_has(s, ctx))
}

/// Whether the assembled function carries a leading signer parameter.
pub(crate) fn needs_signer(ctx: &Ctx<'_>, func: &Function) -> bool {
    uses_msg_sender(ctx.contract, func) || has_interface_transfer(func, ctx)
}

fn fn_emits_events(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|s| {
        matches!(s, Stmt::Emit { .. })
            || access::stmt_stmt_children(s)
                .into_iter()
                .any(|nested| fn_emits_events(std::slice::from_ref(nested)))
    })
}

/// Resource struct names declared by this module.
pub(crate) fn module_resource_names(ctx: &Ctx<'_>) -> BTreeSet<String> {
    let mut names: BTreeSet<String> =
        ctx.plan.groups.iter().map(|g| g.name.clone()).collect();
    if let Some(per_user) = &ctx.plan.per_user_resource {
        names.insert(per_user.clone());
    }
    names.insert(modifiers::OWNER_CAPABILITY.to_string());
    names
}

fn walk_move_expr(expr: &MoveExpr, visit: &mut impl FnMut(&MoveExpr)) {
    visit(expr);
    match expr {
        MoveExpr::Call { args, .. } | MoveExpr::VectorLit(args) | MoveExpr::Tuple(args) => {
            for a in args {
                walk_move_expr(a, visit);
            }
        }
        MoveExpr::MethodCall { receiver, args, .. } => {
            walk_move_expr(receiver, visit);
            for a in args {
                walk_move_expr(a, visit);
            }
        }
        MoveExpr::Field { base, .. } => walk_move_expr(base, visit),
        MoveExpr::Borrow { expr, .. }
        | MoveExpr::Deref(expr)
        | MoveExpr::Unary { expr, .. }
        | MoveExpr::Cast { expr, .. } => walk_move_expr(expr, visit),
        MoveExpr::Binary { lhs, rhs, .. } => {
            walk_move_expr(lhs, visit);
            walk_move_expr(rhs, visit);
        }
        MoveExpr::Pack { fields, .. } => {
            for (_, value) in fields {
                walk_move_expr(value, visit);
            }
        }
        MoveExpr::IfElse { cond, if_true, if_false } => {
            walk_move_expr(cond, visit);
            walk_move_expr(if_true, visit);
            walk_move_expr(if_false, visit);
        }
        _ => {}
    }
}

fn walk_move_stmts(body: &[MoveStmt], visit: &mut impl FnMut(&MoveExpr)) {
    for stmt in body {
        match stmt {
            MoveStmt::Let { value, .. } => {
                if let Some(value) = value {
                    walk_move_expr(value, visit);
                }
            }
            MoveStmt::LetTuple { value, .. } => walk_move_expr(value, visit),
            MoveStmt::Assign { target, value } => {
                walk_move_expr(target, visit);
                walk_move_expr(value, visit);
            }
            MoveStmt::If { cond, then_branch, else_branch } => {
                walk_move_expr(cond, visit);
                walk_move_stmts(then_branch, visit);
                if let Some(else_branch) = else_branch {
                    walk_move_stmts(else_branch, visit);
                }
            }
            MoveStmt::While { cond, body } => {
                walk_move_expr(cond, visit);
                walk_move_stmts(body, visit);
            }
            MoveStmt::Loop { body } => walk_move_stmts(body, visit),
            MoveStmt::ForRange { from, to, body, .. } => {
                walk_move_expr(from, visit);
                walk_move_expr(to, visit);
                walk_move_stmts(body, visit);
            }
            MoveStmt::Return(Some(value)) | MoveStmt::Abort(value) => {
                walk_move_expr(value, visit)
            }
            MoveStmt::Expr(expr) => walk_move_expr(expr, visit),
            _ => {}
        }
    }
}

/// `acquires` is derived from the generated body: exactly the local resource
/// types that appear under `borrow_global`, `borrow_global_mut` or
/// `move_from`.
pub(crate) fn compute_acquires(body: &[MoveStmt], resources: &BTreeSet<String>) -> Vec<String> {
    let mut found = BTreeSet::new();
    walk_move_stmts(body, &mut |expr| {
        if let MoveExpr::Call { func, type_args, .. } = expr {
            if matches!(func.as_str(), "borrow_global" | "borrow_global_mut" | "move_from") {
                if let Some(MoveType::Struct(name)) = type_args.first() {
                    if resources.contains(name) {
                        found.insert(name.clone());
                    }
                }
            }
        }
    });
    found.into_iter().collect()
}

/// Reconstructs the original signature for `emit_source_comments`.
fn signature_comment(func: &Function) -> String {
    use solmove_ir::{StateMutability, Visibility};
    let params = func
        .params
        .iter()
        .map(|p| format!("{} {}", p.ty, p.name))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sig = format!("function {}({params})", func.name);
    sig.push_str(match func.visibility {
        Visibility::Public => " public",
        Visibility::External => " external",
        Visibility::Internal => " internal",
        Visibility::Private => " private",
    });
    match func.mutability {
        StateMutability::Pure => sig.push_str(" pure"),
        StateMutability::View => sig.push_str(" view"),
        StateMutability::Payable => sig.push_str(" payable"),
        StateMutability::Nonpayable => {}
    }
    if !func.returns.is_empty() {
        let rets = func
            .returns
            .iter()
            .map(|r| {
                if r.name.is_empty() {
                    r.ty.to_string()
                } else {
                    format!("{} {}", r.ty, r.name)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        sig.push_str(&format!(" returns ({rets})"));
    }
    sig
}

/// The groups a function needs borrowed, split into reads and writes,
/// including what its builtin guards and event handles force in.
fn required_groups(
    func: &Function,
    ctx: &Ctx<'_>,
) -> (BTreeSet<GroupKind>, BTreeSet<GroupKind>) {
    let profile = ctx.plan.profile(&func.name).cloned().unwrap_or_default();
    let mut reads = profile.read_groups.clone();
    let mut writes = profile.write_groups.clone();

    for inv in &func.modifiers {
        if !modifiers::is_builtin(&inv.name) {
            continue;
        }
        let needs = modifiers::builtin_needs(&inv.name, ctx);
        for var in &needs.reads_vars {
            if let Some(kind) = ctx.plan.group_of(var) {
                reads.insert(kind);
            }
        }
        if needs.primary_write {
            if let Some(primary) = ctx.plan.primary {
                writes.insert(primary);
            }
        }
    }

    if ctx.opts.event_pattern == config::EventPattern::EventHandle
        && fn_emits_events(&func.body)
    {
        if let Some(primary) = ctx.plan.primary {
            writes.insert(primary);
        }
    }

    (reads, writes)
}

/// Flags write-back locals that escape into helper calls.
fn check_writeback_escapes(func: &Function, ctx: &mut Ctx<'_>, f: &FnCtx) {
    if f.writebacks.is_empty() {
        return;
    }
    let locals: BTreeSet<String> = f.writebacks.iter().map(|w| w.local.clone()).collect();
    let mut escaped: BTreeSet<String> = BTreeSet::new();

    fn scan_expr(expr: &Expr, locals: &BTreeSet<String>, escaped: &mut BTreeSet<String>) {
        if let Expr::Call { args, .. } = expr {
            for arg in args {
                if let Expr::Ident(name) = arg {
                    if locals.contains(&ident::to_move_ident(name)) {
                        escaped.insert(name.clone());
                    }
                }
            }
        }
        for child in access::expr_children(expr) {
            scan_expr(child, locals, escaped);
        }
    }

    fn scan(stmts: &[Stmt], locals: &BTreeSet<String>, escaped: &mut BTreeSet<String>) {
        for stmt in stmts {
            for expr in access::stmt_expr_children(stmt) {
                scan_expr(expr, locals, escaped);
            }
            for nested in access::stmt_stmt_children(stmt) {
                scan(std::slice::from_ref(nested), locals, escaped);
            }
        }
    }

    scan(&func.body, &locals, &mut escaped);
    for name in escaped {
        ctx.diags.warn_at(
            DiagnosticKind::AmbiguousWriteback,
            format!(
                "struct copy `{name}` taken from a mapping escapes into a call; the synthesized write-back may not reflect the callee's changes"
            ),
            func.span,
        );
    }
}

/// Transforms one IR function into a Move function.
pub(crate) fn transform_function(func: &Function, ctx: &mut Ctx<'_>) -> MoveFunction {
    use solmove_ir::Visibility;

    tracing::debug!(function = %func.name, "transforming function");
    let mut f = FnCtx {
        ir_name: func.name.clone(),
        is_view: func.mutability.is_readonly(),
        is_internal: func.is_internal(),
        ..Default::default()
    };

    let profile = ctx.plan.profile(&func.name).cloned().unwrap_or_default();
    let uses_sender = needs_signer(ctx, func);
    if !f.is_view && (uses_sender || profile.writes_per_user) {
        f.signer = Some(ctx.opts.signer_param_name.clone());
    }

    let mut out = MoveFunction::new(ident::to_move_ident(&func.name));
    if ctx.opts.emit_source_comments {
        out.leading_comments.push(signature_comment(func));
    }

    match func.visibility {
        Visibility::Public | Visibility::External => {
            out.visibility = MoveVisibility::Public;
            if f.is_view {
                // Pure functions read nothing; only `view` gets the
                // attribute.
                if func.mutability == solmove_ir::StateMutability::View
                    && ctx.opts.view_function_behavior == config::ViewFunctionBehavior::Annotate
                {
                    out.attributes.push("view".to_string());
                }
            } else if func.returns.is_empty() {
                out.is_entry = true;
            }
        }
        Visibility::Internal | Visibility::Private => {
            out.visibility = match ctx.opts.internal_visibility {
                config::InternalVisibility::PublicPackage => MoveVisibility::PublicPackage,
                config::InternalVisibility::PublicFriend => MoveVisibility::PublicFriend,
                config::InternalVisibility::Private => MoveVisibility::Private,
            };
            if ctx.opts.use_inline_functions
                && func.visibility == Visibility::Private
                && func.body.len() <= 3
            {
                out.visibility = MoveVisibility::Private;
                out.is_inline = true;
            }
        }
    }

    if let Some(signer) = &f.signer {
        out.params.push(MoveParam { name: signer.clone(), ty: MoveType::signer_ref() });
    }
    for param in &func.params {
        f.param_names.insert(param.name.clone());
        if let Some(width) = param.ty.bit_width() {
            f.param_widths.insert(param.name.clone(), round_up(width));
        }
        out.params.push(MoveParam {
            name: ident::to_move_ident(&param.name),
            ty: ctx.map_ty(&param.ty),
        });
    }

    for ret in &func.returns {
        let ty = ctx.map_ty(&ret.ty);
        if !ret.name.is_empty() {
            f.named_returns.push((ident::to_move_ident(&ret.name), ty.clone()));
        }
        out.returns.push(ty);
    }

    let (reads, writes) = required_groups(func, ctx);
    let touched: BTreeSet<GroupKind> = reads.union(&writes).copied().collect();

    let mut body: Vec<MoveStmt> = Vec::new();

    // Named returns are locals initialized to their defaults.
    for (name, ty) in f.named_returns.clone() {
        let default = ctx.default_value(&ty);
        body.push(MoveStmt::Let { name, ty: Some(ty), value: Some(default) });
    }

    if f.is_internal {
        // Resource references come in as parameters; re-borrowing globally
        // here would conflict with the caller's borrow.
        for extra in extra_ref_params(ctx, &func.name) {
            match extra {
                ExtraRef::Group(kind) => {
                    let local = Ctx::group_local(kind);
                    f.group_refs.insert(kind, local.to_string());
                    let group_ty = MoveType::Struct(ctx.plan.group_name(kind));
                    let mutable = writes.contains(&kind);
                    out.params.push(MoveParam {
                        name: local.to_string(),
                        ty: if mutable {
                            MoveType::MutRef(Box::new(group_ty))
                        } else {
                            MoveType::Ref(Box::new(group_ty))
                        },
                    });
                }
                ExtraRef::PerUser => {
                    let resource = ctx
                        .plan
                        .per_user_resource
                        .clone()
                        .unwrap_or_else(|| format!("{}UserData", ctx.contract.name));
                    f.user_ref = Some("user_state".to_string());
                    out.params.push(MoveParam {
                        name: "user_state".to_string(),
                        ty: MoveType::MutRef(Box::new(MoveType::Struct(resource))),
                    });
                }
            }
        }
    } else {
        // One global borrow per touched group, mutable iff the plan records
        // this function as a writer.
        for kind in &touched {
            let local = Ctx::group_local(*kind);
            f.group_refs.insert(*kind, local.to_string());
            let mutable = writes.contains(kind);
            let group_name = ctx.plan.group_name(*kind);
            let addr = ctx.state_address_expr();
            body.push(MoveStmt::Let {
                name: local.to_string(),
                ty: None,
                value: Some(MoveExpr::Call {
                    func: if mutable { "borrow_global_mut" } else { "borrow_global" }
                        .to_string(),
                    type_args: vec![MoveType::Struct(group_name)],
                    args: vec![addr],
                }),
            });
        }

        if profile.writes_per_user {
            if let Some(signer) = f.signer.clone() {
                ctx.use_("std::signer");
                let resource = ctx
                    .plan
                    .per_user_resource
                    .clone()
                    .unwrap_or_else(|| format!("{}UserData", ctx.contract.name));
                body.push(MoveStmt::Expr(MoveExpr::call(
                    "ensure_user_state",
                    vec![MoveExpr::ident(signer.clone())],
                )));
                body.push(MoveStmt::Let {
                    name: "user_state".to_string(),
                    ty: None,
                    value: Some(MoveExpr::Call {
                        func: "borrow_global_mut".to_string(),
                        type_args: vec![MoveType::Struct(resource)],
                        args: vec![MoveExpr::call(
                            "signer::address_of",
                            vec![MoveExpr::ident(signer)],
                        )],
                    }),
                });
                f.user_ref = Some("user_state".to_string());
            }
        }
    }

    // Modifier application is outermost-first: guards in order, cleanup in
    // reverse order.
    let mut cleanups: Vec<Vec<MoveStmt>> = Vec::new();
    for inv in &func.modifiers {
        if modifiers::is_builtin(&inv.name) {
            match modifiers::builtin_guard(&inv.name, &inv.args, ctx, &mut f) {
                Some((pre, cleanup)) => {
                    body.extend(pre);
                    cleanups.push(cleanup);
                    continue;
                }
                None => {
                    ctx.diags.warn(
                        DiagnosticKind::UnsupportedConstruct,
                        format!(
                            "builtin modifier `{}` could not be applied; falling back to its definition",
                            inv.name
                        ),
                    );
                }
            }
        }
        match ctx.contract.modifier(&inv.name) {
            Some(def) => {
                let def = def.clone();
                let (pre, post) = modifiers::split_user_modifier(&def, &inv.args);
                body.extend(stmts::transform_stmts(&pre, ctx, &mut f));
                cleanups.push(stmts::transform_stmts(&post, ctx, &mut f));
            }
            None => {
                if !modifiers::is_builtin(&inv.name) {
                    ctx.diags.warn(
                        DiagnosticKind::UnsupportedConstruct,
                        format!("modifier `{}` has no definition and was dropped", inv.name),
                    );
                }
            }
        }
    }
    f.cleanup = cleanups.into_iter().rev().flatten().collect();

    body.extend(stmts::transform_stmts(&func.body, ctx, &mut f));

    let diverges = matches!(body.last(), Some(MoveStmt::Return(_) | MoveStmt::Abort(_)));
    if !diverges {
        body.extend(stmts::exit_statements(ctx, &mut f));
        if !f.named_returns.is_empty() && !func.returns.is_empty() {
            let names: Vec<MoveExpr> = f
                .named_returns
                .iter()
                .map(|(n, _)| MoveExpr::ident(n.clone()))
                .collect();
            body.push(MoveStmt::Return(Some(if names.len() == 1 {
                names.into_iter().next().expect("len checked")
            } else {
                MoveExpr::Tuple(names)
            })));
        }
    }

    check_writeback_escapes(func, ctx, &f);

    // A promoted `msg.sender` address parameter leads the signature.
    if let Some(sender) = &f.sender_param {
        out.params.insert(
            0,
            MoveParam { name: sender.clone(), ty: MoveType::Address },
        );
    }

    let resources = module_resource_names(ctx);
    out.acquires = compute_acquires(&body, &resources);
    out.body = body;
    out
}

/// The `ensure_user_state` helper created for per-user resources.
pub(crate) fn ensure_user_state_fn(ctx: &mut Ctx<'_>) -> Option<MoveFunction> {
    let resource = ctx.plan.per_user_resource.clone()?;
    ctx.use_("std::signer");

    let mut fields = Vec::new();
    for planned in ctx.plan.vars.values() {
        if planned.placement != solmove_analysis::VarPlacement::PerUser {
            continue;
        }
        let var = ctx.contract.state_var(&planned.name)?.clone();
        let value_ty = match &var.ty {
            solmove_ir::Ty::Mapping { value, .. } => ctx.map_ty(value),
            other => ctx.map_ty(other),
        };
        let default = ctx.default_value(&value_ty);
        fields.push((ctx.field_name(&var.name), default));
    }

    let signer_name = ctx.opts.signer_param_name.clone();
    let mut func = MoveFunction::new("ensure_user_state");
    func.params
        .push(MoveParam { name: signer_name.clone(), ty: MoveType::signer_ref() });
    func.body.push(MoveStmt::Let {
        name: "addr".to_string(),
        ty: None,
        value: Some(MoveExpr::call(
            "signer::address_of",
            vec![MoveExpr::ident(signer_name.clone())],
        )),
    });
    func.body.push(MoveStmt::If {
        cond: MoveExpr::Unary {
            op: "!",
            expr: Box::new(MoveExpr::Call {
                func: "exists".to_string(),
                type_args: vec![MoveType::Struct(resource.clone())],
                args: vec![MoveExpr::ident("addr")],
            }),
        },
        then_branch: vec![MoveStmt::Expr(MoveExpr::call(
            "move_to",
            vec![
                MoveExpr::ident(signer_name),
                MoveExpr::Pack { name: resource, fields },
            ],
        ))],
        else_branch: None,
    });
    Some(func)
}

/// The `state_address` helper for non-direct deployment patterns.
pub(crate) fn state_address_fn(ctx: &mut Ctx<'_>) -> Option<MoveFunction> {
    let mut func = MoveFunction::new("state_address");
    func.is_inline = true;
    func.returns.push(MoveType::Address);
    match ctx.opts.constructor_pattern {
        config::ConstructorPattern::DeployerDirect => return None,
        config::ConstructorPattern::ResourceAccount => {
            ctx.use_("aptos_framework::account");
            func.body.push(MoveStmt::Return(Some(MoveExpr::call(
                "account::create_resource_address",
                vec![
                    MoveExpr::borrow(MoveExpr::Address(ctx.opts.module_address.clone())),
                    MoveExpr::ident("STATE_SEED"),
                ],
            ))));
        }
        config::ConstructorPattern::NamedObject => {
            ctx.use_("aptos_framework::object");
            func.body.push(MoveStmt::Return(Some(MoveExpr::call(
                "object::create_object_address",
                vec![
                    MoveExpr::borrow(MoveExpr::Address(ctx.opts.module_address.clone())),
                    MoveExpr::ident("STATE_SEED"),
                ],
            ))));
        }
    }
    Some(func)
}
