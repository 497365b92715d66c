//! Optional MSL spec blocks.
//!
//! Only recognized guard shapes get function-level conditions; everything
//! else is covered by the module-level pragmas so the prover has a sound
//! starting point without over-promising.

use crate::{ctx::Ctx, modifiers};
use solmove_common::{config, ident};
use solmove_ir::Function;
use solmove_move_ast::SpecBlock;

pub(crate) fn generate_specs(ctx: &mut Ctx<'_>) -> Vec<SpecBlock> {
    let mut out = vec![SpecBlock {
        target: "module".to_string(),
        lines: vec![
            "pragma verify = true;".to_string(),
            "pragma aborts_if_is_partial;".to_string(),
        ],
    }];

    // Ownership guards have a precise abort condition under inline asserts
    // with direct deployment.
    if ctx.opts.access_control == config::AccessControl::InlineAssert
        && ctx.opts.constructor_pattern == config::ConstructorPattern::DeployerDirect
    {
        if let Some(owner) = modifiers::owner_var(ctx).map(|v| v.name.clone()) {
            if let Some(kind) = ctx.plan.group_of(&owner) {
                let group = ctx.plan.group_name(kind);
                let owner_field = ctx.field_name(&owner);
                let addr = &ctx.opts.module_address;
                let signer = &ctx.opts.signer_param_name;
                let guarded: Vec<&Function> = ctx
                    .contract
                    .functions
                    .iter()
                    .filter(|f| f.modifiers.iter().any(|m| m.name == "onlyOwner"))
                    .collect();
                for func in guarded {
                    out.push(SpecBlock {
                        target: ident::to_move_ident(&func.name),
                        lines: vec![format!(
                            "aborts_if signer::address_of({signer}) != global<{group}>(@{addr}).{owner_field};"
                        )],
                    });
                }
            }
        }
    }

    out
}
