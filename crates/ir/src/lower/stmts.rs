//! Statement lowering.

use crate::{
    ast::{AssignOp, Expr, Stmt},
    lower::{lower_expr, lower_type},
};
use solang_parser::pt;
use solmove_common::{DiagnosticKind, Diagnostics};

/// Lowers a statement that is expected to be a block (function bodies,
/// branch arms), flattening the outer block into a statement list.
pub(crate) fn lower_block(stmt: &pt::Statement, diags: &mut Diagnostics) -> Vec<Stmt> {
    match stmt {
        pt::Statement::Block { statements, unchecked: false, .. } => {
            statements.iter().filter_map(|s| lower_stmt(s, diags)).collect()
        }
        other => lower_stmt(other, diags).into_iter().collect(),
    }
}

fn string_literal(expr: &pt::Expression) -> Option<String> {
    match expr {
        pt::Expression::StringLiteral(lits) => {
            Some(lits.iter().map(|l| l.string.clone()).collect())
        }
        _ => None,
    }
}

/// Lowers a statement-position expression, catching the forms that only
/// make sense as statements (assignments, require/revert calls, `_;`).
fn lower_expr_statement(expr: &pt::Expression, diags: &mut Diagnostics) -> Option<Stmt> {
    let assign = |op, lhs: &pt::Expression, rhs: &pt::Expression, diags: &mut Diagnostics| {
        Some(Stmt::Assign { target: lower_expr(lhs, diags), op, value: lower_expr(rhs, diags) })
    };

    match expr {
        pt::Expression::Variable(id) if id.name == "_" => Some(Stmt::Placeholder),

        pt::Expression::Assign(_, l, r) => assign(AssignOp::Assign, l, r, diags),
        pt::Expression::AssignAdd(_, l, r) => assign(AssignOp::Add, l, r, diags),
        pt::Expression::AssignSubtract(_, l, r) => assign(AssignOp::Sub, l, r, diags),
        pt::Expression::AssignMultiply(_, l, r) => assign(AssignOp::Mul, l, r, diags),
        pt::Expression::AssignDivide(_, l, r) => assign(AssignOp::Div, l, r, diags),
        pt::Expression::AssignModulo(_, l, r) => assign(AssignOp::Mod, l, r, diags),
        pt::Expression::AssignAnd(_, l, r) => assign(AssignOp::BitAnd, l, r, diags),
        pt::Expression::AssignOr(_, l, r) => assign(AssignOp::BitOr, l, r, diags),
        pt::Expression::AssignXor(_, l, r) => assign(AssignOp::BitXor, l, r, diags),
        pt::Expression::AssignShiftLeft(_, l, r) => assign(AssignOp::Shl, l, r, diags),
        pt::Expression::AssignShiftRight(_, l, r) => assign(AssignOp::Shr, l, r, diags),

        // `i++` in statement position decomposes right away.
        pt::Expression::PostIncrement(_, inner) | pt::Expression::PreIncrement(_, inner) => {
            Some(Stmt::Assign {
                target: lower_expr(inner, diags),
                op: AssignOp::Add,
                value: Expr::number("1"),
            })
        }
        pt::Expression::PostDecrement(_, inner) | pt::Expression::PreDecrement(_, inner) => {
            Some(Stmt::Assign {
                target: lower_expr(inner, diags),
                op: AssignOp::Sub,
                value: Expr::number("1"),
            })
        }

        pt::Expression::FunctionCall(_, callee, args) => {
            if let pt::Expression::Variable(id) = &**callee {
                match id.name.as_str() {
                    "require" if !args.is_empty() => {
                        return Some(Stmt::Require {
                            cond: lower_expr(&args[0], diags),
                            message: args.get(1).and_then(string_literal),
                        });
                    }
                    "assert" if args.len() == 1 => {
                        return Some(Stmt::Require {
                            cond: lower_expr(&args[0], diags),
                            message: None,
                        });
                    }
                    "revert" => {
                        return Some(Stmt::Revert {
                            error: None,
                            message: args.first().and_then(string_literal),
                        });
                    }
                    _ => {}
                }
            }
            Some(Stmt::Expr(lower_expr(expr, diags)))
        }

        _ => Some(Stmt::Expr(lower_expr(expr, diags))),
    }
}

/// Lowers one parse-tree statement; `None` drops it (with a diagnostic when
/// the drop loses semantics).
pub(crate) fn lower_stmt(stmt: &pt::Statement, diags: &mut Diagnostics) -> Option<Stmt> {
    match stmt {
        pt::Statement::Block { unchecked, statements, .. } => {
            let lowered = statements.iter().filter_map(|s| lower_stmt(s, diags)).collect();
            Some(if *unchecked { Stmt::Unchecked(lowered) } else { Stmt::Block(lowered) })
        }
        pt::Statement::Assembly { .. } => {
            diags.error(
                DiagnosticKind::UnsupportedConstruct,
                "inline assembly cannot be translated",
            );
            None
        }
        pt::Statement::Args(..) => None,
        pt::Statement::If(_, cond, then_stmt, else_stmt) => Some(Stmt::If {
            cond: lower_expr(cond, diags),
            then_branch: lower_block(then_stmt, diags),
            else_branch: else_stmt.as_ref().map(|s| lower_block(s, diags)),
        }),
        pt::Statement::While(_, cond, body) => Some(Stmt::While {
            cond: lower_expr(cond, diags),
            body: lower_block(body, diags),
        }),
        pt::Statement::DoWhile(_, body, cond) => Some(Stmt::DoWhile {
            body: lower_block(body, diags),
            cond: lower_expr(cond, diags),
        }),
        pt::Statement::For(_, init, cond, step, body) => Some(Stmt::For {
            init: init.as_deref().and_then(|s| lower_stmt(s, diags)).map(Box::new),
            cond: cond.as_deref().map(|c| lower_expr(c, diags)),
            step: step
                .as_deref()
                .and_then(|e| lower_expr_statement(e, diags))
                .map(Box::new),
            body: body.as_deref().map(|b| lower_block(b, diags)).unwrap_or_default(),
        }),
        pt::Statement::Expression(_, expr) => lower_expr_statement(expr, diags),
        pt::Statement::VariableDefinition(_, decl, init) => {
            let name = decl.name.as_ref().map(|id| id.name.clone()).unwrap_or_default();
            if name == "_" {
                // The modifier placeholder occasionally parses as a
                // definition of `_`.
                return Some(Stmt::Placeholder);
            }
            Some(Stmt::VarDecl {
                name,
                ty: lower_type(&decl.ty, diags),
                init: init.as_ref().map(|e| lower_expr(e, diags)),
            })
        }
        pt::Statement::Return(_, value) => {
            Some(Stmt::Return(value.as_ref().map(|e| lower_expr(e, diags))))
        }
        pt::Statement::Revert(_, error_path, args) => Some(Stmt::Revert {
            error: error_path
                .as_ref()
                .and_then(|p| p.identifiers.last())
                .map(|id| id.name.clone()),
            message: args.first().and_then(string_literal),
        }),
        pt::Statement::RevertNamedArgs(_, error_path, _) => Some(Stmt::Revert {
            error: error_path
                .as_ref()
                .and_then(|p| p.identifiers.last())
                .map(|id| id.name.clone()),
            message: None,
        }),
        pt::Statement::Emit(_, expr) => match expr {
            pt::Expression::FunctionCall(_, callee, args) => {
                let event = match &**callee {
                    pt::Expression::Variable(id) => id.name.clone(),
                    pt::Expression::MemberAccess(_, _, member) => member.name.clone(),
                    _ => {
                        diags.hard_error(
                            DiagnosticKind::InternalInvariant,
                            "emit of a non-event expression",
                        );
                        return None;
                    }
                };
                Some(Stmt::Emit {
                    event,
                    args: args.iter().map(|a| lower_expr(a, diags)).collect(),
                })
            }
            _ => {
                diags.hard_error(DiagnosticKind::InternalInvariant, "emit of a non-call expression");
                None
            }
        },
        pt::Statement::Try(_, call, returns, catches) => {
            diags.warn(
                DiagnosticKind::UnsupportedConstruct,
                "try/catch has no Move analogue; the success branch runs unconditionally",
            );
            let success = returns
                .as_ref()
                .map(|(_, body)| lower_block(body, diags))
                .unwrap_or_default();
            let catch = catches
                .first()
                .map(|clause| match clause {
                    pt::CatchClause::Simple(_, _, body) => lower_block(body, diags),
                    pt::CatchClause::Named(_, _, _, body) => lower_block(body, diags),
                })
                .unwrap_or_default();
            Some(Stmt::TryCatch { call: lower_expr(call, diags), success, catch })
        }
        pt::Statement::Continue(_) => Some(Stmt::Continue),
        pt::Statement::Break(_) => Some(Stmt::Break),
        pt::Statement::Error(_) => {
            diags.warn(DiagnosticKind::ParseFailure, "skipping unparsable statement");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::lower_source;

    fn body_of(src: &str) -> Vec<Stmt> {
        let full = format!("contract T {{ uint256 x; function f() public {{ {src} }} }}");
        let mut diags = Diagnostics::new(false);
        let unit = lower_source(&full, &mut diags).unwrap();
        unit.contracts[0].functions[0].body.clone()
    }

    #[test]
    fn require_with_message() {
        let body = body_of(r#"require(x > 0, "x must be positive");"#);
        assert!(matches!(
            &body[0],
            Stmt::Require { message: Some(m), .. } if m == "x must be positive"
        ));
    }

    #[test]
    fn revert_with_custom_error() {
        let body = body_of("revert Unauthorized();");
        assert!(matches!(
            &body[0],
            Stmt::Revert { error: Some(e), .. } if e == "Unauthorized"
        ));
    }

    #[test]
    fn increment_decomposes() {
        let body = body_of("x++;");
        assert!(matches!(&body[0], Stmt::Assign { op: AssignOp::Add, .. }));
    }

    #[test]
    fn for_loop_keeps_parts() {
        let body = body_of("for (uint256 i = 0; i < 10; i++) { x += i; }");
        let Stmt::For { init, cond, step, body: inner } = &body[0] else { panic!() };
        assert!(matches!(init.as_deref(), Some(Stmt::VarDecl { .. })));
        assert!(cond.is_some());
        assert!(matches!(step.as_deref(), Some(Stmt::Assign { op: AssignOp::Add, .. })));
        assert_eq!(inner.len(), 1);
    }

    #[test]
    fn unchecked_block_is_tagged() {
        let body = body_of("unchecked { x += 1; }");
        assert!(matches!(&body[0], Stmt::Unchecked(inner) if inner.len() == 1));
    }

    #[test]
    fn emit_statement() {
        let full = r"
            contract T {
                event Ping(uint256 v);
                function f() public { emit Ping(1); }
            }
        ";
        let mut diags = Diagnostics::new(false);
        let unit = lower_source(full, &mut diags).unwrap();
        let body = &unit.contracts[0].functions[0].body;
        assert!(matches!(&body[0], Stmt::Emit { event, args } if event == "Ping" && args.len() == 1));
    }
}
