//! Rendering of the Move AST to source text.
//!
//! A pure function of the AST: no optimization, no identifier rewriting.
//! Imports are deduplicated and ordered (standard library, aptos_std,
//! framework, token objects, then package-local modules).

use crate::ast::*;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt::Write;

const INDENT: &str = "    ";

struct Writer {
    out: String,
    depth: usize,
}

impl Writer {
    fn new() -> Self {
        Self { out: String::new(), depth: 0 }
    }

    fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.out.push('\n');
            return;
        }
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    fn close(&mut self, text: &str) {
        self.depth -= 1;
        self.line(text);
    }
}

fn import_rank(path: &str) -> usize {
    if path.starts_with("std::") {
        0
    } else if path.starts_with("aptos_std::") {
        1
    } else if path.starts_with("aptos_framework::") {
        2
    } else if path.starts_with("aptos_token_objects::") {
        3
    } else {
        4
    }
}

fn ability_list(abilities: &[Ability]) -> String {
    abilities.iter().map(|a| a.to_string()).join(", ")
}

/// Renders a full module to source text.
pub fn emit_module(module: &MoveModule) -> String {
    let mut w = Writer::new();
    w.open(&format!("module {}::{} {{", module.address, module.name));

    let unique: BTreeSet<&UseDecl> = module.uses.iter().collect();
    let ordered = unique
        .iter()
        .sorted_by_key(|u| (import_rank(&u.path), u.path.as_str()))
        .collect::<Vec<_>>();
    for use_decl in &ordered {
        w.line(&format!("use {};", use_decl.path));
    }
    if !ordered.is_empty() {
        w.line("");
    }

    for friend in &module.friends {
        w.line(&format!("friend {friend};"));
    }
    if !module.friends.is_empty() {
        w.line("");
    }

    for constant in &module.constants {
        w.line(&format!(
            "const {}: {} = {};",
            constant.name,
            constant.ty,
            render_expr(&constant.value)
        ));
    }
    if !module.constants.is_empty() {
        w.line("");
    }

    for en in &module.enums {
        emit_enum(&mut w, en);
        w.line("");
    }

    for st in &module.structs {
        emit_struct(&mut w, st);
        w.line("");
    }

    for (i, func) in module.functions.iter().enumerate() {
        emit_function(&mut w, func);
        if i + 1 < module.functions.len() || !module.specs.is_empty() {
            w.line("");
        }
    }

    for (i, spec) in module.specs.iter().enumerate() {
        emit_spec(&mut w, spec);
        if i + 1 < module.specs.len() {
            w.line("");
        }
    }

    w.close("}");
    w.out
}

fn emit_struct(w: &mut Writer, st: &MoveStruct) {
    for attr in &st.attributes {
        w.line(&format!("#[{attr}]"));
    }
    let abilities = if st.abilities.is_empty() {
        String::new()
    } else {
        format!(" has {}", ability_list(&st.abilities))
    };
    if st.fields.is_empty() {
        w.line(&format!("struct {}{} {{}}", st.name, abilities));
        return;
    }
    w.open(&format!("struct {}{} {{", st.name, abilities));
    for field in &st.fields {
        w.line(&format!("{}: {},", field.name, field.ty));
    }
    w.close("}");
}

fn emit_enum(w: &mut Writer, en: &MoveEnum) {
    let abilities = if en.abilities.is_empty() {
        String::new()
    } else {
        format!(" has {}", ability_list(&en.abilities))
    };
    w.open(&format!("enum {}{} {{", en.name, abilities));
    for variant in &en.variants {
        w.line(&format!("{variant},"));
    }
    w.close("}");
}

fn emit_function(w: &mut Writer, func: &MoveFunction) {
    for comment in &func.leading_comments {
        w.line(&format!("// {comment}"));
    }
    for attr in &func.attributes {
        w.line(&format!("#[{attr}]"));
    }

    let mut header = String::new();
    let _ = write!(header, "{}", func.visibility);
    if func.is_entry {
        header.push_str("entry ");
    }
    if func.is_inline {
        header.push_str("inline ");
    }
    let _ = write!(header, "fun {}(", func.name);
    header.push_str(
        &func
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .join(", "),
    );
    header.push(')');
    match func.returns.len() {
        0 => {}
        1 => {
            let _ = write!(header, ": {}", func.returns[0]);
        }
        _ => {
            let _ = write!(header, ": ({})", func.returns.iter().join(", "));
        }
    }
    if !func.acquires.is_empty() {
        let _ = write!(header, " acquires {}", func.acquires.iter().join(", "));
    }

    if func.body.is_empty() {
        header.push_str(" {}");
        w.line(&header);
        return;
    }
    header.push_str(" {");
    w.open(&header);
    emit_body(w, &func.body, !func.returns.is_empty());
    w.close("}");
}

/// Emits a function body; when `tail_return` is set and the last statement
/// is a value return, it is rendered as the block's tail expression.
fn emit_body(w: &mut Writer, body: &[MoveStmt], tail_return: bool) {
    let (head, tail) = match body.split_last() {
        Some((MoveStmt::Return(Some(value)), head)) if tail_return => {
            (head, Some(value))
        }
        _ => (body, None),
    };
    for stmt in head {
        emit_stmt(w, stmt);
    }
    if let Some(value) = tail {
        w.line(&render_expr(value));
    }
}

fn emit_stmt(w: &mut Writer, stmt: &MoveStmt) {
    match stmt {
        MoveStmt::Let { name, ty, value } => {
            let mut line = String::from("let ");
            line.push_str(name);
            if let Some(ty) = ty {
                let _ = write!(line, ": {ty}");
            }
            if let Some(value) = value {
                let _ = write!(line, " = {}", render_expr(value));
            }
            line.push(';');
            w.line(&line);
        }
        MoveStmt::LetTuple { names, value } => {
            w.line(&format!("let ({}) = {};", names.join(", "), render_expr(value)));
        }
        MoveStmt::Assign { target, value } => {
            w.line(&format!("{} = {};", render_expr(target), render_expr(value)));
        }
        MoveStmt::If { cond, then_branch, else_branch } => {
            w.open(&format!("if ({}) {{", render_expr(cond)));
            for s in then_branch {
                emit_stmt(w, s);
            }
            match else_branch {
                Some(else_branch) => {
                    w.close("} else {");
                    w.depth += 1;
                    for s in else_branch {
                        emit_stmt(w, s);
                    }
                    w.close("};");
                }
                None => w.close("};"),
            }
        }
        MoveStmt::While { cond, body } => {
            w.open(&format!("while ({}) {{", render_expr(cond)));
            for s in body {
                emit_stmt(w, s);
            }
            w.close("};");
        }
        MoveStmt::Loop { body } => {
            w.open("loop {");
            for s in body {
                emit_stmt(w, s);
            }
            w.close("};");
        }
        MoveStmt::ForRange { name, from, to, body } => {
            w.open(&format!(
                "for ({name} in {}..{}) {{",
                render_expr(from),
                render_expr(to)
            ));
            for s in body {
                emit_stmt(w, s);
            }
            w.close("};");
        }
        MoveStmt::Break => w.line("break;"),
        MoveStmt::Continue => w.line("continue;"),
        MoveStmt::Return(Some(value)) => w.line(&format!("return {};", render_expr(value))),
        MoveStmt::Return(None) => w.line("return;"),
        MoveStmt::Abort(code) => w.line(&format!("abort {};", render_expr(code))),
        MoveStmt::Expr(expr) => w.line(&format!("{};", render_expr(expr))),
        MoveStmt::Comment(text) => w.line(&format!("// {text}")),
    }
}

fn emit_spec(w: &mut Writer, spec: &SpecBlock) {
    w.open(&format!("spec {} {{", spec.target));
    for line in &spec.lines {
        w.line(line);
    }
    w.close("}");
}

/// True when the expression binds loosely enough to need parentheses as an
/// operand of a binary operator.
fn needs_parens(expr: &MoveExpr) -> bool {
    matches!(
        expr,
        MoveExpr::Binary { .. } | MoveExpr::IfElse { .. } | MoveExpr::Cast { .. }
    )
}

fn render_operand(expr: &MoveExpr) -> String {
    if needs_parens(expr) {
        format!("({})", render_expr(expr))
    } else {
        render_expr(expr)
    }
}

/// Renders one expression.
pub fn render_expr(expr: &MoveExpr) -> String {
    match expr {
        MoveExpr::Number { value, suffix } => match suffix {
            Some(suffix) => format!("{value}{suffix}"),
            None => value.clone(),
        },
        MoveExpr::Bool(b) => b.to_string(),
        MoveExpr::Address(addr) => format!("@{addr}"),
        MoveExpr::ByteString(s) => format!("b\"{s}\""),
        MoveExpr::HexString(s) => format!("x\"{s}\""),
        MoveExpr::Ident(name) => name.clone(),
        MoveExpr::Call { func, type_args, args } => {
            let ty = if type_args.is_empty() {
                String::new()
            } else {
                format!("<{}>", type_args.iter().join(", "))
            };
            format!("{func}{ty}({})", args.iter().map(render_expr).join(", "))
        }
        MoveExpr::MethodCall { receiver, method, args } => format!(
            "{}.{method}({})",
            render_operand(receiver),
            args.iter().map(render_expr).join(", ")
        ),
        MoveExpr::Field { base, field } => format!("{}.{field}", render_operand(base)),
        MoveExpr::Borrow { mutable: true, expr } => format!("&mut {}", render_operand(expr)),
        MoveExpr::Borrow { mutable: false, expr } => format!("&{}", render_operand(expr)),
        MoveExpr::Deref(inner) => format!("*{}", render_operand(inner)),
        MoveExpr::Unary { op, expr } => format!("{op}{}", render_operand(expr)),
        MoveExpr::Binary { op, lhs, rhs } => {
            format!("{} {op} {}", render_operand(lhs), render_operand(rhs))
        }
        MoveExpr::Cast { expr, ty } => format!("({} as {ty})", render_expr(expr)),
        MoveExpr::Pack { name, fields } => {
            if fields.is_empty() {
                format!("{name} {{}}")
            } else {
                format!(
                    "{name} {{ {} }}",
                    fields
                        .iter()
                        .map(|(field, value)| {
                            let rendered = render_expr(value);
                            if rendered == *field {
                                field.clone()
                            } else {
                                format!("{field}: {rendered}")
                            }
                        })
                        .join(", ")
                )
            }
        }
        MoveExpr::VectorLit(items) => {
            format!("vector[{}]", items.iter().map(render_expr).join(", "))
        }
        MoveExpr::Tuple(items) => {
            format!("({})", items.iter().map(render_expr).join(", "))
        }
        MoveExpr::IfElse { cond, if_true, if_false } => format!(
            "if ({}) {} else {}",
            render_expr(cond),
            render_operand(if_true),
            render_operand(if_false)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn renders_minimal_module() {
        let module = MoveModule {
            address: "0x42".to_string(),
            name: "counter".to_string(),
            uses: vec![
                UseDecl::new("aptos_framework::signer"),
                UseDecl::new("std::string::String"),
                UseDecl::new("aptos_framework::signer"),
            ],
            structs: vec![MoveStruct {
                name: "CounterState".to_string(),
                abilities: vec![Ability::Key],
                fields: vec![MoveField { name: "count".to_string(), ty: MoveType::U256 }],
                attributes: Vec::new(),
            }],
            ..Default::default()
        };
        let text = emit_module(&module);
        let expected = r#"module 0x42::counter {
    use std::string::String;
    use aptos_framework::signer;

    struct CounterState has key {
        count: u256,
    }

}
"#;
        assert_eq!(text, expected);
    }

    #[test]
    fn imports_are_deduped_and_ordered() {
        let module = MoveModule {
            address: "0x1".to_string(),
            name: "m".to_string(),
            uses: vec![
                UseDecl::new("transpiled::evm_math"),
                UseDecl::new("aptos_std::table::{Self, Table}"),
                UseDecl::new("std::signer"),
                UseDecl::new("aptos_framework::event"),
                UseDecl::new("std::signer"),
            ],
            ..Default::default()
        };
        let text = emit_module(&module);
        let std_pos = text.find("use std::signer").unwrap();
        let table_pos = text.find("use aptos_std::table").unwrap();
        let event_pos = text.find("use aptos_framework::event").unwrap();
        let user_pos = text.find("use transpiled::evm_math").unwrap();
        assert!(std_pos < table_pos && table_pos < event_pos && event_pos < user_pos);
        assert_eq!(text.matches("use std::signer").count(), 1);
    }

    #[test]
    fn tail_return_is_an_expression() {
        let mut func = MoveFunction::new("get");
        func.visibility = MoveVisibility::Public;
        func.attributes.push("view".to_string());
        func.returns.push(MoveType::U256);
        func.acquires.push("CounterState".to_string());
        func.body.push(MoveStmt::Let {
            name: "state".to_string(),
            ty: None,
            value: Some(MoveExpr::Call {
                func: "borrow_global".to_string(),
                type_args: vec![MoveType::Struct("CounterState".to_string())],
                args: vec![MoveExpr::Address("0x42".to_string())],
            }),
        });
        func.body.push(MoveStmt::Return(Some(MoveExpr::field(
            MoveExpr::ident("state"),
            "count",
        ))));

        let module = MoveModule {
            address: "0x42".to_string(),
            name: "counter".to_string(),
            functions: vec![func],
            ..Default::default()
        };
        let text = emit_module(&module);
        let expected = r#"module 0x42::counter {
    #[view]
    public fun get(): u256 acquires CounterState {
        let state = borrow_global<CounterState>(@0x42);
        state.count
    }
}
"#;
        assert_eq!(text, expected);
    }

    #[test]
    fn control_flow_statements_get_semicolons() {
        let mut func = MoveFunction::new("f");
        func.body.push(MoveStmt::If {
            cond: MoveExpr::Bool(true),
            then_branch: vec![MoveStmt::Assign {
                target: MoveExpr::ident("x"),
                value: MoveExpr::number("1"),
            }],
            else_branch: None,
        });
        func.body.push(MoveStmt::While {
            cond: MoveExpr::binary("<", MoveExpr::ident("x"), MoveExpr::number("3")),
            body: vec![MoveStmt::Expr(MoveExpr::call("step", vec![]))],
        });
        let module = MoveModule {
            address: "0x1".to_string(),
            name: "m".to_string(),
            functions: vec![func],
            ..Default::default()
        };
        let text = emit_module(&module);
        assert!(text.contains("if (true) {\n            x = 1;\n        };"));
        assert!(text.contains("while (x < 3) {\n            step();\n        };"));
    }
}
