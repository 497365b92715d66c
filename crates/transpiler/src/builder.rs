//! Per-contract module assembly.

use crate::{
    constructor::{self, field_move_ty},
    ctx::{Ctx, FnCtx},
    exprs::transform_expr,
    functions, modifiers, specs, stmts,
};
use solmove_analysis::VarPlacement;
use solmove_common::{config, ident, DiagnosticKind};
use solmove_ir::{StateMutability, Ty};
use solmove_move_ast::{
    Ability, MoveConst, MoveEnum, MoveExpr, MoveField, MoveModule, MoveStruct, MoveType, UseDecl,
};

fn struct_abilities(fields: &[MoveType]) -> Vec<Ability> {
    if fields.iter().all(MoveType::is_copyable) {
        vec![Ability::Copy, Ability::Drop, Ability::Store]
    } else {
        vec![Ability::Store]
    }
}

fn build_plain_structs(ctx: &mut Ctx<'_>) -> Vec<MoveStruct> {
    ctx.contract
        .structs
        .clone()
        .iter()
        .map(|def| {
            let fields: Vec<MoveField> = def
                .fields
                .iter()
                .map(|f| MoveField {
                    name: ident::to_move_ident(&f.name),
                    ty: ctx.map_ty(&f.ty),
                })
                .collect();
            let tys: Vec<MoveType> = fields.iter().map(|f| f.ty.clone()).collect();
            MoveStruct {
                name: ident::to_move_type_ident(&def.name),
                abilities: struct_abilities(&tys),
                fields,
                attributes: Vec::new(),
            }
        })
        .collect()
}

fn build_event_structs(ctx: &mut Ctx<'_>) -> Vec<MoveStruct> {
    if ctx.opts.event_pattern == config::EventPattern::None {
        return Vec::new();
    }
    let native = ctx.opts.event_pattern == config::EventPattern::Native;
    let mut out: Vec<MoveStruct> = ctx
        .contract
        .events
        .clone()
        .iter()
        .map(|ev| {
            let fields = ev
                .fields
                .iter()
                .map(|f| MoveField {
                    name: ident::to_move_ident(&f.name),
                    ty: ctx.map_ty(&f.ty),
                })
                .collect();
            MoveStruct {
                name: ident::to_move_type_ident(&ev.name),
                abilities: vec![Ability::Drop, Ability::Store],
                fields,
                attributes: if native { vec!["event".to_string()] } else { Vec::new() },
            }
        })
        .collect();

    // Synthesized delta events for counters that live only in the event
    // stream.
    let event_only: Vec<String> = ctx
        .plan
        .vars
        .values()
        .filter(|v| v.placement == VarPlacement::EventOnly)
        .map(|v| v.name.clone())
        .collect();
    for var in event_only {
        let ty = ctx
            .contract
            .state_var(&var)
            .map(|v| ctx.map_ty(&v.ty))
            .unwrap_or(MoveType::U256);
        out.push(MoveStruct {
            name: stmts::event_struct_name(&var),
            abilities: vec![Ability::Drop, Ability::Store],
            fields: vec![
                MoveField { name: "amount".to_string(), ty },
                MoveField { name: "positive".to_string(), ty: MoveType::Bool },
            ],
            attributes: vec!["event".to_string()],
        });
    }
    out
}

fn build_resource_structs(ctx: &mut Ctx<'_>) -> Vec<MoveStruct> {
    let mut out = Vec::new();
    let groups = ctx.plan.groups.clone();
    for group in &groups {
        let mut fields: Vec<MoveField> = group
            .vars
            .iter()
            .map(|var| MoveField {
                name: ctx.field_name(var),
                ty: field_move_ty(var, ctx),
            })
            .collect();

        if Some(group.kind) == ctx.plan.primary {
            if constructor::needs_reentrancy_field(ctx) {
                fields.push(MoveField {
                    name: modifiers::REENTRANCY_FIELD.to_string(),
                    ty: MoveType::U8,
                });
            }
            if ctx.opts.constructor_pattern == config::ConstructorPattern::ResourceAccount {
                ctx.use_("aptos_framework::account");
                fields.push(MoveField {
                    name: "signer_cap".to_string(),
                    ty: MoveType::Struct("account::SignerCapability".to_string()),
                });
            }
            if ctx.opts.event_pattern == config::EventPattern::EventHandle {
                ctx.use_("aptos_framework::event");
                for ev in ctx.contract.events.clone() {
                    fields.push(MoveField {
                        name: format!("{}_events", ident::to_move_ident(&ev.name)),
                        ty: MoveType::Struct(format!(
                            "event::EventHandle<{}>",
                            ident::to_move_type_ident(&ev.name)
                        )),
                    });
                }
            }
        }

        out.push(MoveStruct {
            name: group.name.clone(),
            abilities: vec![Ability::Key],
            fields,
            attributes: Vec::new(),
        });
    }

    if let Some(per_user) = ctx.plan.per_user_resource.clone() {
        let promoted: Vec<String> = ctx
            .plan
            .vars
            .values()
            .filter(|v| v.placement == VarPlacement::PerUser)
            .map(|v| v.name.clone())
            .collect();
        let fields = promoted
            .iter()
            .map(|var| {
                let value_ty = match ctx.contract.state_var(var).map(|v| v.ty.clone()) {
                    Some(Ty::Mapping { value, .. }) => ctx.map_ty(&value),
                    Some(other) => ctx.map_ty(&other),
                    None => MoveType::U256,
                };
                MoveField { name: ctx.field_name(var), ty: value_ty }
            })
            .collect();
        out.push(MoveStruct {
            name: per_user,
            abilities: vec![Ability::Key],
            fields,
            attributes: Vec::new(),
        });
    }

    if constructor::needs_owner_capability(ctx) {
        out.push(MoveStruct {
            name: modifiers::OWNER_CAPABILITY.to_string(),
            abilities: vec![Ability::Key],
            fields: Vec::new(),
            attributes: Vec::new(),
        });
    }

    out
}

fn build_enum_items(ctx: &mut Ctx<'_>) -> (Vec<MoveEnum>, Vec<MoveConst>) {
    let mut enums = Vec::new();
    let mut consts = Vec::new();
    for def in ctx.contract.enums.clone() {
        match ctx.opts.enum_style {
            config::EnumStyle::NativeEnum => enums.push(MoveEnum {
                name: ident::to_move_type_ident(&def.name),
                abilities: vec![Ability::Copy, Ability::Drop, Ability::Store],
                variants: def
                    .variants
                    .iter()
                    .map(|v| ident::to_move_type_ident(v))
                    .collect(),
            }),
            config::EnumStyle::U8Constants => {
                for (i, variant) in def.variants.iter().enumerate() {
                    consts.push(MoveConst {
                        name: format!(
                            "{}_{}",
                            ident::to_move_const_ident(&def.name),
                            ident::to_move_const_ident(variant)
                        ),
                        ty: MoveType::U8,
                        value: MoveExpr::number(i.to_string()),
                    });
                }
            }
        }
    }
    (enums, consts)
}

fn build_state_constants(ctx: &mut Ctx<'_>) -> Vec<MoveConst> {
    let const_vars: Vec<_> = ctx
        .contract
        .state_vars
        .iter()
        .filter(|v| constructor::is_module_const(v))
        .cloned()
        .collect();
    let mut out = Vec::new();
    for var in const_vars {
        let Some(init) = &var.initializer else { continue };
        let ty = ctx.map_ty(&var.ty);
        // Constant initializers are literal-only in practice; anything
        // fancier still renders, it just may not be a valid Move constant.
        let mut f = FnCtx::default();
        let value = transform_expr(init, ctx, &mut f);
        out.push(MoveConst {
            name: ident::to_move_const_ident(&var.name),
            ty,
            value,
        });
    }
    out
}

/// Assembles the full module for one contract.
pub(crate) fn build_module(ctx: &mut Ctx<'_>) -> MoveModule {
    let mut module = MoveModule {
        address: ctx.opts.module_address.clone(),
        name: ident::module_name_for_contract(&ctx.contract.name),
        ..Default::default()
    };
    tracing::info!(contract = %ctx.contract.name, module = %module.name, "building module");

    // Functions first: they accumulate imports and abort-code constants.
    let mut funcs = Vec::new();
    if let Some(init) = constructor::build_constructor(ctx) {
        funcs.push(init);
    }
    for func in ctx.contract.functions.clone() {
        if matches!(func.name.as_str(), "receive" | "fallback") {
            if func.mutability == StateMutability::Payable {
                ctx.diags.warn(
                    DiagnosticKind::UnsupportedConstruct,
                    format!(
                        "`{}` has no direct Move analogue; emitted as a plain entry function",
                        func.name
                    ),
                );
            } else {
                ctx.diags.warn(
                    DiagnosticKind::UnsupportedConstruct,
                    format!("non-payable `{}` was dropped", func.name),
                );
                continue;
            }
        }
        funcs.push(functions::transform_function(&func, ctx));
    }
    if let Some(helper) = functions::ensure_user_state_fn(ctx) {
        funcs.push(helper);
    }
    if let Some(helper) = functions::state_address_fn(ctx) {
        funcs.push(helper);
    }

    module.structs = build_event_structs(ctx);
    module.structs.extend(build_plain_structs(ctx));
    module.structs.extend(build_resource_structs(ctx));

    let (enums, mut constants) = build_enum_items(ctx);
    module.enums = enums;
    constants.extend(build_state_constants(ctx));

    if constructor::needs_seed_const(ctx) {
        constants.push(MoveConst {
            name: "STATE_SEED".to_string(),
            ty: MoveType::vector(MoveType::U8),
            value: MoveExpr::ByteString(module.name.clone()),
        });
    }

    // Abort codes last: every call site has been visited by now.
    constants.extend(std::mem::take(&mut ctx.abort).into_constants());
    module.constants = constants;

    if ctx.opts.generate_specs {
        if ctx.contract.functions.iter().any(|f| !f.modifiers.is_empty())
            || !ctx.plan.groups.is_empty()
        {
            ctx.use_("std::signer");
        }
        module.specs = specs::generate_specs(ctx);
    }

    module.functions = funcs;
    module.uses = ctx.uses.iter().map(UseDecl::new).collect();
    module
}
