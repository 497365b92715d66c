//! Expression lowering.

use crate::{
    ast::{BinOp, BlockField, Expr, MsgField, TxField, UnOp},
    lower::lower_type,
    ty::Ty,
};
use solang_parser::pt;
use solmove_common::{DiagnosticKind, Diagnostics};

/// Multiplier for a Solidity sub-denomination, when it fits a `u128`.
fn denomination_multiplier(unit: &str) -> Option<u128> {
    Some(match unit {
        "wei" | "seconds" => 1,
        "gwei" => 1_000_000_000,
        "ether" => 1_000_000_000_000_000_000,
        "minutes" => 60,
        "hours" => 3_600,
        "days" => 86_400,
        "weeks" => 604_800,
        _ => return None,
    })
}

/// Folds a decimal literal with optional exponent and sub-denomination into
/// a plain decimal string.
fn fold_number(
    value: &str,
    exp: &str,
    unit: Option<&pt::Identifier>,
    diags: &mut Diagnostics,
) -> Expr {
    let mut digits: String = value.chars().filter(|c| *c != '_').collect();
    let exp: String = exp.chars().filter(|c| *c != '_').collect();
    if !exp.is_empty() {
        match exp.parse::<usize>() {
            Ok(zeros) if zeros <= 77 => digits.extend(std::iter::repeat('0').take(zeros)),
            _ => diags.warn(
                DiagnosticKind::Narrowing,
                format!("exponent `{exp}` is out of range; literal kept unscaled"),
            ),
        }
    }

    let denom = unit.map(|id| id.name.clone());
    if let Some(unit_name) = &denom {
        match denomination_multiplier(unit_name) {
            Some(1) => {}
            Some(mult) => match digits.parse::<u128>().ok().and_then(|v| v.checked_mul(mult)) {
                Some(scaled) => digits = scaled.to_string(),
                None => diags.warn(
                    DiagnosticKind::Narrowing,
                    format!("literal `{digits} {unit_name}` overflows the folding range; kept unscaled"),
                ),
            },
            None => diags.warn(
                DiagnosticKind::UnsupportedConstruct,
                format!("unknown sub-denomination `{unit_name}`"),
            ),
        }
    }

    Expr::Number { value: digits, denom }
}

/// `type(T).max` / `type(T).min`, folded to a literal.
fn fold_type_intrinsic(ty: &Ty, member: &str, diags: &mut Diagnostics) -> Expr {
    match (ty, member) {
        (Ty::Uint(w), "max") => {
            let nibbles = (*w as usize) / 4;
            Expr::number(format!("0x{}", "f".repeat(nibbles)))
        }
        (Ty::Uint(_), "min") => Expr::number("0"),
        (Ty::Int(w), "max") => {
            let bytes = (*w as usize) / 8;
            Expr::number(format!("0x7f{}", "ff".repeat(bytes.saturating_sub(1))))
        }
        _ => {
            diags.warn(
                DiagnosticKind::UnsupportedConstruct,
                format!("`type({ty}).{member}` has no Move analogue"),
            );
            Expr::number("0")
        }
    }
}

fn lower_member_access(
    base: &pt::Expression,
    member: &str,
    diags: &mut Diagnostics,
) -> Expr {
    if let pt::Expression::Variable(id) = base {
        match (id.name.as_str(), member) {
            ("msg", "sender") => return Expr::MsgAccess(MsgField::Sender),
            ("msg", "value") => return Expr::MsgAccess(MsgField::Value),
            ("msg", "data") => return Expr::MsgAccess(MsgField::Data),
            ("msg", "sig") => return Expr::MsgAccess(MsgField::Sig),
            ("block", "timestamp") => return Expr::BlockAccess(BlockField::Timestamp),
            ("block", "number") => return Expr::BlockAccess(BlockField::Number),
            ("block", "chainid") => return Expr::BlockAccess(BlockField::ChainId),
            ("block", "coinbase") => return Expr::BlockAccess(BlockField::Coinbase),
            ("block", "difficulty") | ("block", "prevrandao") => {
                return Expr::BlockAccess(BlockField::Difficulty)
            }
            ("block", "gaslimit") => return Expr::BlockAccess(BlockField::GasLimit),
            ("block", "basefee") => return Expr::BlockAccess(BlockField::BaseFee),
            ("tx", "origin") => return Expr::TxAccess(TxField::Origin),
            ("tx", "gasprice") => return Expr::TxAccess(TxField::GasPrice),
            _ => {}
        }
    }

    // `type(T).max` / `.min`.
    if let pt::Expression::FunctionCall(_, callee, args) = base {
        if matches!(&**callee, pt::Expression::Variable(id) if id.name == "type") {
            if let Some(arg) = args.first() {
                if let Some(ty) = lower_type(arg, diags) {
                    return fold_type_intrinsic(&ty, member, diags);
                }
            }
        }
    }

    Expr::Member { base: Box::new(lower_expr(base, diags)), member: member.to_string() }
}

fn lower_call(
    callee: &pt::Expression,
    args: &[pt::Expression],
    diags: &mut Diagnostics,
) -> Expr {
    match callee {
        // `uint256(x)`, `address(x)`, `payable(x)`: explicit conversions.
        pt::Expression::Type(_, _) => {
            if args.len() == 1 {
                if let Some(ty) = lower_type(callee, diags) {
                    return Expr::Cast {
                        ty,
                        expr: Box::new(lower_expr(&args[0], diags)),
                    };
                }
            }
            diags.warn(DiagnosticKind::UnsupportedConstruct, "malformed type conversion");
            Expr::number("0")
        }
        // `new T(...)` / `new T[](n)`.
        pt::Expression::New(_, ty_expr) => match lower_type(ty_expr, diags) {
            Some(ty) => Expr::New { ty, args: args.iter().map(|a| lower_expr(a, diags)).collect() },
            None => {
                diags.warn(DiagnosticKind::UnsupportedConstruct, "unsupported new-expression");
                Expr::number("0")
            }
        },
        _ => Expr::Call {
            callee: Box::new(lower_expr(callee, diags)),
            args: args.iter().map(|a| lower_expr(a, diags)).collect(),
            named_args: Vec::new(),
        },
    }
}

fn binary(op: BinOp, lhs: &pt::Expression, rhs: &pt::Expression, diags: &mut Diagnostics) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lower_expr(lhs, diags)),
        rhs: Box::new(lower_expr(rhs, diags)),
    }
}

fn unary(op: UnOp, inner: &pt::Expression, diags: &mut Diagnostics) -> Expr {
    Expr::Unary { op, expr: Box::new(lower_expr(inner, diags)) }
}

/// Lowers a single parse-tree expression.
pub(crate) fn lower_expr(expr: &pt::Expression, diags: &mut Diagnostics) -> Expr {
    match expr {
        pt::Expression::Parenthesis(_, inner) | pt::Expression::UnaryPlus(_, inner) => {
            lower_expr(inner, diags)
        }

        pt::Expression::BoolLiteral(_, b) => Expr::Bool(*b),
        pt::Expression::NumberLiteral(_, value, exp, unit) => {
            fold_number(value, exp, unit.as_ref(), diags)
        }
        pt::Expression::HexNumberLiteral(_, value, unit) => {
            let denom = unit.as_ref().map(|id| id.name.clone());
            if let Some(unit_name) = &denom {
                diags.warn(
                    DiagnosticKind::UnsupportedConstruct,
                    format!("sub-denomination `{unit_name}` on a hex literal is ignored"),
                );
            }
            Expr::Number { value: value.to_lowercase(), denom }
        }
        pt::Expression::RationalNumberLiteral(..) => {
            diags.warn(DiagnosticKind::UnsupportedConstruct, "rational literals are not supported");
            Expr::number("0")
        }
        pt::Expression::StringLiteral(lits) => {
            Expr::Str(lits.iter().map(|l| l.string.clone()).collect())
        }
        pt::Expression::HexLiteral(lits) => Expr::Hex(
            lits.iter()
                .flat_map(|l| l.hex.chars())
                .filter(char::is_ascii_hexdigit)
                .collect(),
        ),
        pt::Expression::AddressLiteral(_, addr) => Expr::Address(addr.clone()),
        pt::Expression::Variable(id) => Expr::Ident(id.name.clone()),

        pt::Expression::MemberAccess(_, base, member) => {
            lower_member_access(base, &member.name, diags)
        }
        pt::Expression::FunctionCall(_, callee, args) => lower_call(callee, args, diags),
        pt::Expression::NamedFunctionCall(_, callee, args) => Expr::Call {
            callee: Box::new(lower_expr(callee, diags)),
            args: Vec::new(),
            named_args: args
                .iter()
                .map(|arg| (arg.name.name.clone(), lower_expr(&arg.expr, diags)))
                .collect(),
        },
        pt::Expression::FunctionCallBlock(_, call, _) => {
            diags.warn(
                DiagnosticKind::UnsupportedConstruct,
                "call options (`{value: ...}`) are ignored",
            );
            lower_expr(call, diags)
        }
        pt::Expression::ArraySubscript(_, base, Some(index)) => Expr::Index {
            base: Box::new(lower_expr(base, diags)),
            index: Box::new(lower_expr(index, diags)),
        },
        pt::Expression::ArraySubscript(_, base, None) => {
            diags.hard_error(DiagnosticKind::InternalInvariant, "type expression in value position");
            lower_expr(base, diags)
        }
        pt::Expression::ArraySlice(..) => {
            diags.warn(DiagnosticKind::UnsupportedConstruct, "array slices are not supported");
            Expr::number("0")
        }
        pt::Expression::ConditionalOperator(_, cond, if_true, if_false) => Expr::Ternary {
            cond: Box::new(lower_expr(cond, diags)),
            if_true: Box::new(lower_expr(if_true, diags)),
            if_false: Box::new(lower_expr(if_false, diags)),
        },
        pt::Expression::List(_, items) => Expr::Tuple(
            items
                .iter()
                .map(|(_, param)| match param {
                    // `(uint a, uint b) = ...` carries the name next to the
                    // type; a bare `(a, b)` tuple puts the expression in the
                    // type slot.
                    Some(p) => match &p.name {
                        Some(id) => Expr::Ident(id.name.clone()),
                        None => lower_expr(&p.ty, diags),
                    },
                    None => Expr::Ident("_".to_string()),
                })
                .collect(),
        ),
        // Array literals reuse the tuple node; the transformer emits
        // `vector[...]` for tuples in value position.
        pt::Expression::ArrayLiteral(_, items) => {
            Expr::Tuple(items.iter().map(|e| lower_expr(e, diags)).collect())
        }

        pt::Expression::Not(_, inner) => unary(UnOp::Not, inner, diags),
        pt::Expression::BitwiseNot(_, inner) => unary(UnOp::BitNot, inner, diags),
        pt::Expression::Negate(_, inner) => unary(UnOp::Neg, inner, diags),
        pt::Expression::PreIncrement(_, inner) => unary(UnOp::PreInc, inner, diags),
        pt::Expression::PreDecrement(_, inner) => unary(UnOp::PreDec, inner, diags),
        pt::Expression::PostIncrement(_, inner) => unary(UnOp::PostInc, inner, diags),
        pt::Expression::PostDecrement(_, inner) => unary(UnOp::PostDec, inner, diags),
        pt::Expression::Delete(_, inner) => Expr::Call {
            callee: Box::new(Expr::Ident("__delete".to_string())),
            args: vec![lower_expr(inner, diags)],
            named_args: Vec::new(),
        },

        pt::Expression::Power(_, l, r) => binary(BinOp::Pow, l, r, diags),
        pt::Expression::Multiply(_, l, r) => binary(BinOp::Mul, l, r, diags),
        pt::Expression::Divide(_, l, r) => binary(BinOp::Div, l, r, diags),
        pt::Expression::Modulo(_, l, r) => binary(BinOp::Mod, l, r, diags),
        pt::Expression::Add(_, l, r) => binary(BinOp::Add, l, r, diags),
        pt::Expression::Subtract(_, l, r) => binary(BinOp::Sub, l, r, diags),
        pt::Expression::ShiftLeft(_, l, r) => binary(BinOp::Shl, l, r, diags),
        pt::Expression::ShiftRight(_, l, r) => binary(BinOp::Shr, l, r, diags),
        pt::Expression::BitwiseAnd(_, l, r) => binary(BinOp::BitAnd, l, r, diags),
        pt::Expression::BitwiseXor(_, l, r) => binary(BinOp::BitXor, l, r, diags),
        pt::Expression::BitwiseOr(_, l, r) => binary(BinOp::BitOr, l, r, diags),
        pt::Expression::Less(_, l, r) => binary(BinOp::Lt, l, r, diags),
        pt::Expression::More(_, l, r) => binary(BinOp::Gt, l, r, diags),
        pt::Expression::LessEqual(_, l, r) => binary(BinOp::Le, l, r, diags),
        pt::Expression::MoreEqual(_, l, r) => binary(BinOp::Ge, l, r, diags),
        pt::Expression::Equal(_, l, r) => binary(BinOp::Eq, l, r, diags),
        pt::Expression::NotEqual(_, l, r) => binary(BinOp::Ne, l, r, diags),
        pt::Expression::And(_, l, r) => binary(BinOp::And, l, r, diags),
        pt::Expression::Or(_, l, r) => binary(BinOp::Or, l, r, diags),

        pt::Expression::New(_, ty_expr) => match lower_type(ty_expr, diags) {
            Some(ty) => Expr::New { ty, args: Vec::new() },
            None => {
                diags.warn(DiagnosticKind::UnsupportedConstruct, "unsupported new-expression");
                Expr::number("0")
            }
        },
        pt::Expression::Type(_, _) => {
            diags.hard_error(DiagnosticKind::InternalInvariant, "bare type in value position");
            Expr::number("0")
        }

        // Assignments nested inside expressions lose their side effect; the
        // statement lowering intercepts the common forms first.
        pt::Expression::Assign(_, _, rhs)
        | pt::Expression::AssignOr(_, _, rhs)
        | pt::Expression::AssignAnd(_, _, rhs)
        | pt::Expression::AssignXor(_, _, rhs)
        | pt::Expression::AssignShiftLeft(_, _, rhs)
        | pt::Expression::AssignShiftRight(_, _, rhs)
        | pt::Expression::AssignAdd(_, _, rhs)
        | pt::Expression::AssignSubtract(_, _, rhs)
        | pt::Expression::AssignMultiply(_, _, rhs)
        | pt::Expression::AssignDivide(_, _, rhs)
        | pt::Expression::AssignModulo(_, _, rhs) => {
            diags.warn(
                DiagnosticKind::UnsupportedConstruct,
                "assignment inside an expression keeps only its value",
            );
            lower_expr(rhs, diags)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr_of(src: &str) -> (Expr, Diagnostics) {
        let full = format!("contract T {{ function f() public {{ x = {src}; }} }}");
        let mut diags = Diagnostics::new(false);
        let unit = crate::lower::lower_source(&full, &mut diags).unwrap();
        let f = &unit.contracts[0].functions[0];
        let crate::ast::Stmt::Assign { value, .. } = &f.body[0] else {
            panic!("expected assignment, got {:?}", f.body[0])
        };
        (value.clone(), diags)
    }

    #[test]
    fn folds_ether_denomination() {
        let (e, _) = expr_of("1 ether");
        assert_eq!(
            e,
            Expr::Number {
                value: "1000000000000000000".to_string(),
                denom: Some("ether".to_string())
            }
        );
    }

    #[test]
    fn folds_scientific_exponent() {
        let (e, _) = expr_of("2e3");
        assert!(matches!(e, Expr::Number { value, .. } if value == "2000"));
    }

    #[test]
    fn msg_sender_is_contextual() {
        let (e, _) = expr_of("msg.sender == owner ? 1 : 2");
        let Expr::Ternary { cond, .. } = e else { panic!() };
        assert!(matches!(
            *cond,
            Expr::Binary { op: BinOp::Eq, ref lhs, .. } if **lhs == Expr::MsgAccess(MsgField::Sender)
        ));
    }

    #[test]
    fn type_max_folds_to_hex() {
        let (e, _) = expr_of("type(uint64).max");
        assert!(matches!(e, Expr::Number { value, .. } if value == format!("0x{}", "f".repeat(16))));
    }

    #[test]
    fn casts_are_explicit() {
        let (e, _) = expr_of("uint128(y)");
        assert!(matches!(e, Expr::Cast { ty: Ty::Uint(128), .. }));
    }
}
