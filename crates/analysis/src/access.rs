//! Per-variable, per-function access records.
//!
//! The walker visits every function (with its modifier bodies inlined) and
//! the constructor, then closes the records over internal-call edges to a
//! fixed point, so a public function calling an internal helper inherits the
//! helper's access set.

use solmove_ir::{AssignOp, BinOp, Contract, Expr, Modifier, MsgField, Stmt};
use std::collections::{BTreeMap, BTreeSet};

/// Where a mapping key expression comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyPattern {
    MsgSender,
    Parameter,
    Literal,
    Computed,
}

/// Access profile of one state variable within one function.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableAccessRecord {
    pub reads: usize,
    pub writes: usize,
    /// Writes that happened under an admin guard (or in the constructor).
    pub guarded_writes: usize,
    pub write_ops: BTreeSet<AssignOp>,
    pub key_patterns: BTreeMap<KeyPattern, usize>,
    /// Key patterns of write accesses only.
    pub write_key_patterns: BTreeMap<KeyPattern, usize>,
    /// The first access in program order was a read.
    pub read_before_write: bool,
    /// The value was consumed somewhere other than as a compound-assignment
    /// target.
    pub explicit_read: bool,
}

impl VariableAccessRecord {
    pub fn admin_guarded(&self) -> bool {
        self.writes > 0 && self.guarded_writes == self.writes
    }

    /// Share of key accesses that go through `msg.sender`.
    pub fn msg_sender_key_ratio(&self) -> f64 {
        let total: usize = self.key_patterns.values().sum();
        if total == 0 {
            return 0.0;
        }
        *self.key_patterns.get(&KeyPattern::MsgSender).unwrap_or(&0) as f64 / total as f64
    }

    fn merge_from(&mut self, other: &Self, caller_guarded: bool) {
        self.reads += other.reads;
        self.writes += other.writes;
        self.guarded_writes +=
            if caller_guarded { other.writes } else { other.guarded_writes };
        self.write_ops.extend(other.write_ops.iter().copied());
        for (pat, n) in &other.key_patterns {
            *self.key_patterns.entry(*pat).or_default() += n;
        }
        for (pat, n) in &other.write_key_patterns {
            *self.write_key_patterns.entry(*pat).or_default() += n;
        }
        if self.writes == other.writes {
            // No local writes before the call edge merged in.
            self.read_before_write |= other.read_before_write;
        }
        self.explicit_read |= other.explicit_read;
    }
}

/// The name under which the constructor's records are filed.
pub const CONSTRUCTOR_KEY: &str = "constructor";

/// The full analysis output.
#[derive(Clone, Debug, Default)]
pub struct AccessAnalysis {
    /// `function name -> state variable name -> record`.
    pub records: BTreeMap<String, BTreeMap<String, VariableAccessRecord>>,
    /// Modifiers recognized as admin guards.
    pub admin_modifiers: BTreeSet<String>,
    /// Functions carrying an admin modifier.
    pub admin_functions: BTreeSet<String>,
}

impl AccessAnalysis {
    pub fn record(&self, func: &str, var: &str) -> Option<&VariableAccessRecord> {
        self.records.get(func).and_then(|vars| vars.get(var))
    }

    /// Iterates `(function, record)` pairs for one variable.
    pub fn records_for_var<'a>(
        &'a self,
        var: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a VariableAccessRecord)> + 'a {
        self.records
            .iter()
            .filter_map(move |(f, vars)| vars.get(var).map(|r| (f.as_str(), r)))
    }
}

/// True when the expression is `msg.sender == <state var>`, possibly inside
/// an `||` chain, which is the structural shape of an admin check.
fn is_admin_check(expr: &Expr, state_vars: &BTreeSet<&str>) -> bool {
    match expr {
        Expr::Binary { op: BinOp::Eq, lhs, rhs } => {
            let sender_vs_state = |a: &Expr, b: &Expr| {
                matches!(a, Expr::MsgAccess(MsgField::Sender))
                    && matches!(b, Expr::Ident(name) if state_vars.contains(name.as_str()))
            };
            sender_vs_state(lhs, rhs) || sender_vs_state(rhs, lhs)
        }
        Expr::Binary { op: BinOp::Or, lhs, rhs } => {
            is_admin_check(lhs, state_vars) || is_admin_check(rhs, state_vars)
        }
        _ => false,
    }
}

fn stmt_exprs(stmt: &Stmt) -> Vec<&Expr> {
    match stmt {
        Stmt::Require { cond, .. } => vec![cond],
        Stmt::If { cond, .. } => vec![cond],
        _ => Vec::new(),
    }
}

fn modifier_is_admin(modifier: &Modifier, state_vars: &BTreeSet<&str>) -> bool {
    if modifier.name.starts_with("only") {
        return true;
    }
    fn walk(stmts: &[Stmt], state_vars: &BTreeSet<&str>) -> bool {
        stmts.iter().any(|s| {
            stmt_exprs(s).iter().any(|e| is_admin_check(e, state_vars))
                || match s {
                    Stmt::If { then_branch, else_branch, .. } => {
                        walk(then_branch, state_vars)
                            || else_branch.as_deref().is_some_and(|b| walk(b, state_vars))
                    }
                    Stmt::Block(inner) | Stmt::Unchecked(inner) => walk(inner, state_vars),
                    _ => false,
                }
        })
    }
    walk(&modifier.body, state_vars)
}

/// Analyzes a contract.
pub fn analyze(contract: &Contract) -> AccessAnalysis {
    let state_vars: BTreeSet<&str> =
        contract.state_vars.iter().map(|v| v.name.as_str()).collect();

    let admin_modifiers: BTreeSet<String> = contract
        .modifiers
        .iter()
        .filter(|m| modifier_is_admin(m, &state_vars))
        .map(|m| m.name.clone())
        .collect();

    let admin_functions: BTreeSet<String> = contract
        .functions
        .iter()
        .filter(|f| f.modifiers.iter().any(|m| admin_modifiers.contains(&m.name)))
        .map(|f| f.name.clone())
        .collect();

    let mut analysis = AccessAnalysis {
        records: BTreeMap::new(),
        admin_modifiers,
        admin_functions,
    };

    for func in &contract.functions {
        let guarded = analysis.admin_functions.contains(&func.name);
        let mut walker = Walker::new(contract, &state_vars, guarded);
        for invocation in &func.modifiers {
            if let Some(modifier) = contract.modifier(&invocation.name) {
                walker.params = modifier.params.iter().map(|p| p.name.clone()).collect();
                walker.walk_stmts(&modifier.body);
            }
        }
        walker.params = func.params.iter().map(|p| p.name.clone()).collect();
        walker.walk_stmts(&func.body);
        analysis.records.insert(func.name.clone(), walker.finish());
    }

    if let Some(ctor) = &contract.constructor {
        // Constructor writes count as guarded: only the deployer runs them.
        let mut walker = Walker::new(contract, &state_vars, true);
        walker.params = ctor.params.iter().map(|p| p.name.clone()).collect();
        walker.walk_stmts(&ctor.body);
        analysis.records.insert(CONSTRUCTOR_KEY.to_string(), walker.finish());
    }

    propagate(contract, &mut analysis);
    analysis
}

/// Closes records over internal-call edges to a fixed point.
fn propagate(contract: &Contract, analysis: &mut AccessAnalysis) {
    let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for func in &contract.functions {
        let mut callees = BTreeSet::new();
        collect_callees(&func.body, contract, &mut callees);
        edges.insert(func.name.clone(), callees);
    }
    if let Some(ctor) = &contract.constructor {
        let mut callees = BTreeSet::new();
        collect_callees(&ctor.body, contract, &mut callees);
        edges.insert(CONSTRUCTOR_KEY.to_string(), callees);
    }

    // Bounded by the depth of the call graph; each round merges one more
    // level of indirect callees.
    for _ in 0..contract.functions.len() + 1 {
        let mut changed = false;
        let snapshot = analysis.records.clone();
        for (caller, callees) in &edges {
            let caller_guarded = analysis.admin_functions.contains(caller)
                || caller == CONSTRUCTOR_KEY;
            let Some(caller_records) = analysis.records.get_mut(caller) else { continue };
            for callee in callees {
                let Some(callee_records) = snapshot.get(callee) else { continue };
                for (var, callee_record) in callee_records {
                    let entry = caller_records.entry(var.clone()).or_default();
                    let before = entry.clone();
                    entry.merge_from(callee_record, caller_guarded);
                    if *entry != before {
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
}

fn collect_callees(stmts: &[Stmt], contract: &Contract, out: &mut BTreeSet<String>) {
    fn walk_expr(expr: &Expr, contract: &Contract, out: &mut BTreeSet<String>) {
        if let Expr::Call { callee, args, named_args } = expr {
            if let Expr::Ident(name) = &**callee {
                if contract.function(name).is_some() {
                    out.insert(name.clone());
                }
            }
            walk_expr(callee, contract, out);
            for a in args {
                walk_expr(a, contract, out);
            }
            for (_, a) in named_args {
                walk_expr(a, contract, out);
            }
            return;
        }
        for child in expr_children(expr) {
            walk_expr(child, contract, out);
        }
    }
    fn walk_stmt(stmt: &Stmt, contract: &Contract, out: &mut BTreeSet<String>) {
        for e in stmt_expr_children(stmt) {
            walk_expr(e, contract, out);
        }
        for nested in stmt_stmt_children(stmt) {
            walk_stmt(nested, contract, out);
        }
    }
    for s in stmts {
        walk_stmt(s, contract, out);
    }
}

/// All direct expression children of `expr`.
pub fn expr_children(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Binary { lhs, rhs, .. } => vec![lhs, rhs],
        Expr::Unary { expr, .. } | Expr::Cast { expr, .. } => vec![expr],
        Expr::Call { callee, args, named_args } => {
            let mut out = vec![&**callee];
            out.extend(args.iter());
            out.extend(named_args.iter().map(|(_, e)| e));
            out
        }
        Expr::Member { base, .. } => vec![base],
        Expr::Index { base, index } => vec![base, index],
        Expr::Ternary { cond, if_true, if_false } => vec![cond, if_true, if_false],
        Expr::Tuple(items) => items.iter().collect(),
        Expr::New { args, .. } => args.iter().collect(),
        _ => Vec::new(),
    }
}

/// All direct expression children of `stmt`.
pub fn stmt_expr_children(stmt: &Stmt) -> Vec<&Expr> {
    match stmt {
        Stmt::VarDecl { init, .. } => init.iter().collect(),
        Stmt::Assign { target, value, .. } => vec![target, value],
        Stmt::If { cond, .. } | Stmt::While { cond, .. } | Stmt::DoWhile { cond, .. } => {
            vec![cond]
        }
        Stmt::For { cond, .. } => cond.iter().collect(),
        Stmt::Return(value) => value.iter().collect(),
        Stmt::Emit { args, .. } => args.iter().collect(),
        Stmt::Require { cond, .. } => vec![cond],
        Stmt::Expr(e) => vec![e],
        Stmt::TryCatch { call, .. } => vec![call],
        _ => Vec::new(),
    }
}

/// All direct statement children of `stmt`.
pub fn stmt_stmt_children(stmt: &Stmt) -> Vec<&Stmt> {
    match stmt {
        Stmt::If { then_branch, else_branch, .. } => {
            let mut out: Vec<&Stmt> = then_branch.iter().collect();
            if let Some(els) = else_branch {
                out.extend(els.iter());
            }
            out
        }
        Stmt::For { init, step, body, .. } => {
            let mut out: Vec<&Stmt> = Vec::new();
            if let Some(i) = init {
                out.push(i);
            }
            out.extend(body.iter());
            if let Some(s) = step {
                out.push(s);
            }
            out
        }
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => body.iter().collect(),
        Stmt::Block(inner) | Stmt::Unchecked(inner) => inner.iter().collect(),
        Stmt::TryCatch { success, catch, .. } => {
            success.iter().chain(catch.iter()).collect()
        }
        _ => Vec::new(),
    }
}

struct Walker<'a> {
    state_vars: &'a BTreeSet<&'a str>,
    params: BTreeSet<String>,
    records: BTreeMap<String, VariableAccessRecord>,
    guarded: bool,
}

impl<'a> Walker<'a> {
    fn new(_contract: &'a Contract, state_vars: &'a BTreeSet<&'a str>, guarded: bool) -> Self {
        Self { state_vars, params: BTreeSet::new(), records: BTreeMap::new(), guarded }
    }

    fn finish(self) -> BTreeMap<String, VariableAccessRecord> {
        self.records
    }

    fn walk_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.walk_stmt(stmt);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        if let Stmt::Assign { target, op, value } = stmt {
            self.record_read(value);
            self.record_write(target, *op);
            return;
        }
        for e in stmt_expr_children(stmt) {
            self.record_read(e);
        }
        for nested in stmt_stmt_children(stmt) {
            self.walk_stmt(nested);
        }
    }

    /// The state variable at the root of an lvalue chain, with the outermost
    /// mapping key when there is one.
    fn resolve_target<'e>(&self, expr: &'e Expr) -> Option<(&'e str, Option<&'e Expr>)> {
        match expr {
            Expr::Ident(name) if self.state_vars.contains(name.as_str()) => {
                Some((name.as_str(), None))
            }
            Expr::Index { base, index } => {
                let (root, outer_key) = self.resolve_target(base)?;
                Some((root, outer_key.or(Some(index))))
            }
            Expr::Member { base, .. } => self.resolve_target(base),
            _ => None,
        }
    }

    fn key_pattern(&self, key: &Expr) -> KeyPattern {
        match key {
            Expr::MsgAccess(MsgField::Sender) => KeyPattern::MsgSender,
            Expr::Ident(name) if self.params.contains(name) => KeyPattern::Parameter,
            Expr::Number { .. } | Expr::Address(_) | Expr::Bool(_) | Expr::Str(_)
            | Expr::Hex(_) => KeyPattern::Literal,
            _ => KeyPattern::Computed,
        }
    }

    fn record_write(&mut self, target: &Expr, op: AssignOp) {
        // Keys inside the target are reads of their own.
        if let Expr::Index { index, .. } = target {
            self.record_read(index);
        }

        let Some((root, outer_key)) = self.resolve_target(target) else {
            // Local variable; nothing to record, but nested keys were
            // already counted.
            return;
        };
        let pattern = outer_key.map(|k| self.key_pattern(k));
        let guarded = self.guarded;
        let record = self.records.entry(root.to_string()).or_default();
        record.writes += 1;
        if guarded {
            record.guarded_writes += 1;
        }
        record.write_ops.insert(op);
        if let Some(pattern) = pattern {
            *record.key_patterns.entry(pattern).or_default() += 1;
            *record.write_key_patterns.entry(pattern).or_default() += 1;
        }
    }

    fn record_read(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(name) if self.state_vars.contains(name.as_str()) => {
                let record = self.records.entry(name.clone()).or_default();
                record.reads += 1;
                record.explicit_read = true;
                if record.writes == 0 {
                    record.read_before_write = true;
                }
            }
            Expr::Index { base, index } => {
                // Reading `m[k]` reads `m` and records the key pattern.
                if let Some((root, _)) = self.resolve_target(base) {
                    let pattern = self.key_pattern(index);
                    let record = self.records.entry(root.to_string()).or_default();
                    record.reads += 1;
                    record.explicit_read = true;
                    if record.writes == 0 {
                        record.read_before_write = true;
                    }
                    *record.key_patterns.entry(pattern).or_default() += 1;
                } else {
                    self.record_read(base);
                }
                self.record_read(index);
            }
            _ => {
                for child in expr_children(expr) {
                    self.record_read(child);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solmove_common::Diagnostics;
    use solmove_ir::lower::lower_source;

    fn analyze_src(src: &str) -> (Contract, AccessAnalysis) {
        let mut diags = Diagnostics::new(false);
        let unit = lower_source(src, &mut diags).unwrap();
        let contract = unit.contracts.into_iter().next().unwrap();
        let analysis = analyze(&contract);
        (contract, analysis)
    }

    const TOKEN: &str = r#"
        contract Token {
            address public owner;
            uint256 public totalSupply;
            uint256 public feesCollected;
            mapping(address => uint256) balances;

            modifier onlyOwner() {
                require(msg.sender == owner, "not owner");
                _;
            }

            constructor() { owner = msg.sender; }

            function mint(address to, uint256 amount) public onlyOwner {
                totalSupply += amount;
                balances[to] += amount;
            }

            function transfer(address to, uint256 amount) public {
                require(balances[msg.sender] >= amount, "insufficient balance");
                balances[msg.sender] -= amount;
                balances[to] += amount;
                feesCollected += 1;
            }

            function balanceOf(address who) public view returns (uint256) {
                return balances[who];
            }
        }
    "#;

    #[test]
    fn admin_modifier_is_recognized_structurally() {
        let (_, analysis) = analyze_src(TOKEN);
        assert!(analysis.admin_modifiers.contains("onlyOwner"));
        assert!(analysis.admin_functions.contains("mint"));
    }

    #[test]
    fn owner_is_only_written_guarded() {
        let (_, analysis) = analyze_src(TOKEN);
        let ctor = analysis.record(CONSTRUCTOR_KEY, "owner").unwrap();
        assert!(ctor.admin_guarded());
        // The modifier's read of `owner` lands on every guarded function.
        let mint = analysis.record("mint", "owner").unwrap();
        assert!(mint.explicit_read);
        assert_eq!(mint.writes, 0);
    }

    #[test]
    fn key_patterns_are_recorded() {
        let (_, analysis) = analyze_src(TOKEN);
        let transfer = analysis.record("transfer", "balances").unwrap();
        let sender = transfer.key_patterns.get(&KeyPattern::MsgSender).copied().unwrap_or(0);
        let param = transfer.key_patterns.get(&KeyPattern::Parameter).copied().unwrap_or(0);
        assert_eq!(sender, 2, "require-read and -= write");
        assert_eq!(param, 1, "+= to `to`");
        assert!(transfer.msg_sender_key_ratio() >= 0.5);
    }

    #[test]
    fn compound_only_counter_has_no_explicit_read() {
        let (_, analysis) = analyze_src(TOKEN);
        let fees = analysis.record("transfer", "feesCollected").unwrap();
        assert_eq!(fees.writes, 1);
        assert!(!fees.explicit_read);
        assert_eq!(fees.write_ops.iter().copied().collect::<Vec<_>>(), vec![AssignOp::Add]);
    }

    #[test]
    fn read_before_write_on_checked_transfer() {
        let (_, analysis) = analyze_src(TOKEN);
        let transfer = analysis.record("transfer", "balances").unwrap();
        assert!(transfer.read_before_write);
    }

    #[test]
    fn internal_calls_propagate() {
        let (_, analysis) = analyze_src(
            r"
            contract C {
                uint256 total;
                function bump() internal { total += 1; }
                function poke() public { bump(); }
            }
            ",
        );
        let poke = analysis.record("poke", "total").unwrap();
        assert_eq!(poke.writes, 1);
        assert!(poke.write_ops.contains(&AssignOp::Add));
    }
}
