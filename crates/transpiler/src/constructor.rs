//! Constructor lowering: `init_module` / `initialize` and the three
//! deployment patterns.

use crate::{
    ctx::{Ctx, FnCtx},
    exprs::transform_expr,
    functions::{compute_acquires, module_resource_names},
    modifiers, stmts,
    types::round_up,
};
use solmove_analysis::{access::CONSTRUCTOR_KEY, GroupKind};
use solmove_common::{config, ident, DiagnosticKind};
use solmove_ir::{AssignOp, Expr, Mutability, Stmt};
use solmove_move_ast::{MoveExpr, MoveFunction, MoveParam, MoveStmt, MoveType, MoveVisibility};
use std::collections::BTreeMap;

/// Whether the module stores an `OwnerCapability` at the deployer.
pub(crate) fn needs_owner_capability(ctx: &Ctx<'_>) -> bool {
    ctx.opts.access_control == config::AccessControl::Capability
        && ctx
            .contract
            .functions
            .iter()
            .any(|f| f.modifiers.iter().any(|m| m.name == "onlyOwner"))
}

/// Whether the primary group carries the reentrancy status field.
pub(crate) fn needs_reentrancy_field(ctx: &Ctx<'_>) -> bool {
    ctx.opts.reentrancy_pattern == config::ReentrancyPattern::Mutex
        && ctx.plan.primary.is_some()
        && ctx
            .contract
            .functions
            .iter()
            .any(|f| f.modifiers.iter().any(|m| m.name == "nonReentrant"))
}

/// The Move type of a resource-group field, including aggregator promotion
/// and option semantics for unset addresses.
pub(crate) fn field_move_ty(var_name: &str, ctx: &mut Ctx<'_>) -> MoveType {
    let Some(var) = ctx.contract.state_var(var_name).cloned() else {
        return MoveType::U256;
    };
    if ctx.plan.is_aggregated(var_name) {
        let (inner, narrowed) = crate::types::aggregator_inner(&var.ty);
        if narrowed {
            ctx.diags.warn(
                DiagnosticKind::Narrowing,
                format!(
                    "`{var_name}` narrowed from {} to an Aggregator<u128> for parallel updates",
                    var.ty
                ),
            );
        }
        let ty = MoveType::Aggregator(Box::new(inner));
        ctx.register_type_uses(&ty);
        return ty;
    }
    let mapped = ctx.map_ty(&var.ty);
    if mapped == MoveType::Address
        && ctx.opts.optional_values == config::OptionalValues::OptionType
        && var.initializer.is_none()
    {
        let ty = MoveType::Option(Box::new(MoveType::Address));
        ctx.register_type_uses(&ty);
        return ty;
    }
    mapped
}

/// Splits the constructor body into scalar field initializations (folded
/// into `move_to`), deferred mapping writes, and everything else.
struct CtorBody {
    field_inits: BTreeMap<String, Expr>,
    deferred: Vec<Stmt>,
    pre: Vec<Stmt>,
}

fn split_ctor_body(body: &[Stmt], ctx: &Ctx<'_>) -> CtorBody {
    let mut out = CtorBody {
        field_inits: BTreeMap::new(),
        deferred: Vec::new(),
        pre: Vec::new(),
    };
    for stmt in body {
        match stmt {
            Stmt::Assign { target: Expr::Ident(name), op: AssignOp::Assign, value }
                if ctx.contract.state_var(name).is_some() =>
            {
                out.field_inits.insert(name.clone(), value.clone());
            }
            Stmt::Assign { target, .. }
                if crate::exprs::mapping_chain(target, ctx).is_some() =>
            {
                out.deferred.push(stmt.clone());
            }
            other => out.pre.push(other.clone()),
        }
    }
    out
}

fn event_handle_fields(ctx: &mut Ctx<'_>, target_signer: &MoveExpr) -> Vec<(String, MoveExpr)> {
    if ctx.opts.event_pattern != config::EventPattern::EventHandle {
        return Vec::new();
    }
    ctx.use_("aptos_framework::account");
    ctx.use_("aptos_framework::event");
    ctx.contract
        .events
        .clone()
        .iter()
        .map(|ev| {
            (
                format!("{}_events", ident::to_move_ident(&ev.name)),
                MoveExpr::Call {
                    func: "account::new_event_handle".to_string(),
                    type_args: vec![MoveType::Struct(ident::to_move_type_ident(&ev.name))],
                    args: vec![target_signer.clone()],
                },
            )
        })
        .collect()
}

/// Builds the initialization function, or `None` for a stateless module.
pub(crate) fn build_constructor(ctx: &mut Ctx<'_>) -> Option<MoveFunction> {
    let has_state = !ctx.plan.groups.is_empty();
    let owner_cap = needs_owner_capability(ctx);
    if !has_state && !owner_cap {
        return None;
    }

    let ctor = ctx.contract.constructor.clone();
    let has_args = ctor.as_ref().is_some_and(|c| !c.params.is_empty());
    let deployer = "deployer".to_string();

    let mut f = FnCtx {
        ir_name: CONSTRUCTOR_KEY.to_string(),
        signer: Some(deployer.clone()),
        ..Default::default()
    };

    let mut func = MoveFunction::new(if has_args { "initialize" } else { "init_module" });
    if has_args {
        func.visibility = MoveVisibility::Public;
        func.is_entry = true;
    }
    func.params.push(MoveParam { name: deployer.clone(), ty: MoveType::signer_ref() });
    if let Some(ctor) = &ctor {
        for param in &ctor.params {
            f.param_names.insert(param.name.clone());
            if let Some(width) = param.ty.bit_width() {
                f.param_widths.insert(param.name.clone(), round_up(width));
            }
            func.params.push(MoveParam {
                name: ident::to_move_ident(&param.name),
                ty: ctx.map_ty(&param.ty),
            });
        }
    }

    let split = ctor
        .as_ref()
        .map(|c| split_ctor_body(&c.body, ctx))
        .unwrap_or(CtorBody {
            field_inits: BTreeMap::new(),
            deferred: Vec::new(),
            pre: Vec::new(),
        });

    let mut body: Vec<MoveStmt> = Vec::new();

    // Guards and other leading statements run before any resource exists.
    body.extend(stmts::transform_stmts(&split.pre, ctx, &mut f));

    // The signer reference the resources are moved to, per deployment
    // pattern. The deployer arrives as `&signer`; created signers are owned
    // values and get borrowed.
    let target_signer = match ctx.opts.constructor_pattern {
        config::ConstructorPattern::DeployerDirect => MoveExpr::ident(deployer.clone()),
        config::ConstructorPattern::ResourceAccount => {
            ctx.use_("aptos_framework::account");
            body.push(MoveStmt::LetTuple {
                names: vec!["resource_signer".to_string(), "signer_cap".to_string()],
                value: MoveExpr::call(
                    "account::create_resource_account",
                    vec![MoveExpr::ident(deployer.clone()), MoveExpr::ident("STATE_SEED")],
                ),
            });
            MoveExpr::borrow(MoveExpr::ident("resource_signer"))
        }
        config::ConstructorPattern::NamedObject => {
            ctx.use_("aptos_framework::object");
            body.push(MoveStmt::Let {
                name: "constructor_ref".to_string(),
                ty: None,
                value: Some(MoveExpr::call(
                    "object::create_named_object",
                    vec![MoveExpr::ident(deployer.clone()), MoveExpr::ident("STATE_SEED")],
                )),
            });
            body.push(MoveStmt::Let {
                name: "object_signer".to_string(),
                ty: None,
                value: Some(MoveExpr::call(
                    "object::generate_signer",
                    vec![MoveExpr::borrow(MoveExpr::ident("constructor_ref"))],
                )),
            });
            MoveExpr::borrow(MoveExpr::ident("object_signer"))
        }
    };

    // Aggregator fields with a nonzero initial value are topped up after the
    // resource exists.
    let mut deferred_aggregator_adds: Vec<(String, Expr)> = Vec::new();

    let groups = ctx.plan.groups.clone();
    for group in &groups {
        let mut fields: Vec<(String, MoveExpr)> = Vec::new();
        for var_name in &group.vars {
            let field = ctx.field_name(var_name);
            let ty = field_move_ty(var_name, ctx);
            let init_expr = split
                .field_inits
                .get(var_name)
                .cloned()
                .or_else(|| {
                    ctx.contract.state_var(var_name).and_then(|v| v.initializer.clone())
                });

            if ctx.plan.is_aggregated(var_name) {
                if let Some(init) = init_expr {
                    if !matches!(&init, Expr::Number { value, .. } if value == "0") {
                        deferred_aggregator_adds.push((var_name.clone(), init));
                    }
                }
                fields.push((field, ctx.default_value(&ty)));
                continue;
            }

            let value = match init_expr {
                Some(expr) => {
                    let transformed = transform_expr(&expr, ctx, &mut f);
                    if matches!(ty, MoveType::Option(_)) {
                        ctx.use_("std::option::{Self, Option}");
                        MoveExpr::call("option::some", vec![transformed])
                    } else {
                        transformed
                    }
                }
                None => ctx.default_value(&ty),
            };
            fields.push((field, value));
        }

        if group.kind == ctx.plan.primary.unwrap_or(GroupKind::State) {
            if needs_reentrancy_field(ctx) {
                fields.push((
                    modifiers::REENTRANCY_FIELD.to_string(),
                    MoveExpr::number("1"),
                ));
            }
            if ctx.opts.constructor_pattern == config::ConstructorPattern::ResourceAccount {
                fields.push(("signer_cap".to_string(), MoveExpr::ident("signer_cap")));
            }
            fields.extend(event_handle_fields(ctx, &target_signer));
        }

        body.push(MoveStmt::Expr(MoveExpr::call(
            "move_to",
            vec![
                target_signer.clone(),
                MoveExpr::Pack { name: group.name.clone(), fields },
            ],
        )));
    }

    if owner_cap {
        body.push(MoveStmt::Expr(MoveExpr::call(
            "move_to",
            vec![
                MoveExpr::ident(deployer.clone()),
                MoveExpr::Pack {
                    name: modifiers::OWNER_CAPABILITY.to_string(),
                    fields: Vec::new(),
                },
            ],
        )));
    }

    // Mapping-keyed initializations re-borrow the freshly stored resource.
    if !split.deferred.is_empty() || !deferred_aggregator_adds.is_empty() {
        let mut needed: Vec<GroupKind> = Vec::new();
        for stmt in &split.deferred {
            if let Stmt::Assign { target, .. } = stmt {
                if let Some((root, _)) = crate::exprs::mapping_chain(target, ctx) {
                    if let Some(kind) = ctx.plan.group_of(root) {
                        if !needed.contains(&kind) {
                            needed.push(kind);
                        }
                    }
                }
            }
        }
        for (var, _) in &deferred_aggregator_adds {
            if let Some(kind) = ctx.plan.group_of(var) {
                if !needed.contains(&kind) {
                    needed.push(kind);
                }
            }
        }
        needed.sort();
        for kind in needed {
            let local = Ctx::group_local(kind);
            let group_name = ctx.plan.group_name(kind);
            let addr = ctx.state_address_expr();
            body.push(MoveStmt::Let {
                name: local.to_string(),
                ty: None,
                value: Some(MoveExpr::Call {
                    func: "borrow_global_mut".to_string(),
                    type_args: vec![MoveType::Struct(group_name)],
                    args: vec![addr],
                }),
            });
            f.group_refs.insert(kind, local.to_string());
        }
        body.extend(stmts::transform_stmts(&split.deferred, ctx, &mut f));
        for (var, init) in &deferred_aggregator_adds {
            let Some(kind) = ctx.plan.group_of(var) else { continue };
            let Some(local) = f.group_ref(kind).map(str::to_string) else { continue };
            let inner = crate::types::aggregator_inner(
                &ctx.contract
                    .state_var(var)
                    .map(|v| v.ty.clone())
                    .unwrap_or(solmove_ir::Ty::Uint(256)),
            )
            .0;
            let amount = MoveExpr::Cast {
                expr: Box::new(transform_expr(init, ctx, &mut f)),
                ty: inner,
            };
            let field = MoveExpr::field(MoveExpr::ident(local), ctx.field_name(var));
            body.push(MoveStmt::Expr(MoveExpr::call(
                "aggregator_v2::add",
                vec![MoveExpr::borrow_mut(field), amount],
            )));
        }
    }

    let resources = module_resource_names(ctx);
    func.acquires = compute_acquires(&body, &resources);
    func.body = body;
    Some(func)
}

/// `STATE_SEED` is required by the resource-account and named-object
/// patterns.
pub(crate) fn needs_seed_const(ctx: &Ctx<'_>) -> bool {
    !matches!(ctx.opts.constructor_pattern, config::ConstructorPattern::DeployerDirect)
        && !ctx.plan.groups.is_empty()
}

/// Immutable and `constant`-like checks share this: a state variable is
/// emitted as a module `const` only when declared `constant`.
pub(crate) fn is_module_const(var: &solmove_ir::StateVar) -> bool {
    var.mutability == Mutability::Constant
}
