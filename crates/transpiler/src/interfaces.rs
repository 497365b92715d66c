//! Cross-contract call routing.
//!
//! Solidity interfaces are erased: interface-typed values carry an address
//! at runtime. A call like `IERC20(token).transfer(to, amt)` becomes a
//! module-qualified call `ierc20::transfer(token, to, amt)` against a module
//! assumed to live at that address, with recognized ERC-20/ERC-721 method
//! names routed to framework primitives instead.

use crate::ctx::{Ctx, FnCtx};
use solmove_common::{ident, DiagnosticKind};
use solmove_ir::Expr;
use solmove_move_ast::{MoveExpr, MoveType};

/// Resolves an expression to an interface-typed value: `(interface name,
/// address expression)`.
pub(crate) fn interface_target<'e>(
    expr: &'e Expr,
    ctx: &Ctx<'_>,
    f: &FnCtx,
) -> Option<(String, &'e Expr)> {
    match expr {
        // `IERC20(addr)` in call position.
        Expr::Call { callee, args, .. } if args.len() == 1 => match &**callee {
            Expr::Ident(name) if ctx.lookup.is_interface(name) => {
                Some((name.clone(), &args[0]))
            }
            _ => None,
        },
        Expr::Cast { ty: solmove_ir::Ty::Named(name), expr } if ctx.lookup.is_interface(name) => {
            Some((name.clone(), expr))
        }
        // A local previously bound to an interface cast.
        Expr::Ident(local) => {
            let iface = f.locals.get(local)?.interface.clone()?;
            Some((iface, expr))
        }
        _ => None,
    }
}

fn is_erc721(interface: &str) -> bool {
    interface.contains("721")
}

/// Emits the Move call for an interface method invocation.
pub(crate) fn route_interface_call(
    interface: &str,
    method: &str,
    addr: MoveExpr,
    args: Vec<MoveExpr>,
    ctx: &mut Ctx<'_>,
    f: &mut FnCtx,
) -> MoveExpr {
    if is_erc721(interface) {
        // NFT methods route through the object/token standards; without the
        // collection context only a stub call can be emitted.
        ctx.needs_token_objects = true;
        return stub_call(interface, method, addr, args, ctx);
    }

    match method {
        "transfer" if args.len() == 2 => {
            if let Some(signer) = f.signer.clone() {
                ctx.use_("aptos_framework::coin");
                ctx.use_("aptos_framework::aptos_coin::AptosCoin");
                let mut call_args = vec![MoveExpr::ident(signer)];
                let mut it = args.into_iter();
                call_args.push(it.next().expect("checked len"));
                call_args.push(MoveExpr::Cast {
                    expr: Box::new(it.next().expect("checked len")),
                    ty: MoveType::U64,
                });
                return MoveExpr::Call {
                    func: "coin::transfer".to_string(),
                    type_args: vec![MoveType::Struct("AptosCoin".to_string())],
                    args: call_args,
                };
            }
            stub_call(interface, method, addr, args, ctx)
        }
        "balanceOf" if args.len() == 1 => {
            ctx.use_("aptos_framework::coin");
            ctx.use_("aptos_framework::aptos_coin::AptosCoin");
            MoveExpr::Cast {
                expr: Box::new(MoveExpr::Call {
                    func: "coin::balance".to_string(),
                    type_args: vec![MoveType::Struct("AptosCoin".to_string())],
                    args,
                }),
                ty: MoveType::U256,
            }
        }
        _ => stub_call(interface, method, addr, args, ctx),
    }
}

/// Emits the best-effort module-qualified stub call.
fn stub_call(
    interface: &str,
    method: &str,
    addr: MoveExpr,
    args: Vec<MoveExpr>,
    ctx: &mut Ctx<'_>,
) -> MoveExpr {
    let module = ident::module_name_for_contract(interface);
    let func = ident::to_move_ident(method);
    ctx.diags.warn(
        DiagnosticKind::CrossContractRef,
        format!(
            "call to `{interface}.{method}` assumes a module `{module}` published at the address held by the callee value"
        ),
    );
    let mut call_args = vec![addr];
    call_args.extend(args);
    MoveExpr::call(format!("{module}::{func}"), call_args)
}
