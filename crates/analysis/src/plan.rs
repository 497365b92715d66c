//! The resource plan: classification of state variables and their
//! partitioning into resource groups.
//!
//! Independent transactions should acquire disjoint groups; that is the
//! entire point of the partitioning. The plan is derived once per contract
//! and consumed read-only by the transformer.

use crate::access::{self, AccessAnalysis, KeyPattern, VariableAccessRecord, CONSTRUCTOR_KEY};
use solmove_common::config::OptimizationLevel;
use solmove_ir::{AssignOp, Contract, Mutability, StateVar};
use std::collections::{BTreeMap, BTreeSet};

/// The four resource groups a contract's state can land in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupKind {
    AdminConfig,
    Counters,
    UserData,
    State,
}

impl GroupKind {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::AdminConfig => "AdminConfig",
            Self::Counters => "Counters",
            Self::UserData => "UserData",
            Self::State => "State",
        }
    }
}

/// The classification of one state variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarClass {
    /// Immutable, constructor-only, or all writers admin-guarded.
    AdminConfig,
    /// Numeric, only ever `+=`/`-=` outside the constructor.
    Aggregatable,
    /// Aggregatable and never explicitly read outside views.
    EventTrackable,
    /// Address-keyed mapping mostly accessed through `msg.sender`.
    UserKeyedMapping,
    General,
}

/// Where the variable's storage ends up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarPlacement {
    /// A field of a contract-address resource group.
    Group(GroupKind),
    /// A field of the per-user resource stored at each user's address.
    PerUser,
    /// No storage at all; writes surface as emitted events.
    EventOnly,
}

#[derive(Clone, Debug)]
pub struct PlannedVar {
    pub name: String,
    pub class: VarClass,
    pub placement: VarPlacement,
    /// Field uses the aggregator type; `+=`/`-=` compile to aggregator ops.
    pub aggregated: bool,
}

#[derive(Clone, Debug)]
pub struct ResourceGroup {
    pub kind: GroupKind,
    pub name: String,
    /// Member variables in declaration order.
    pub vars: Vec<String>,
}

/// Per-function view of the plan, used to derive borrows and `acquires`.
#[derive(Clone, Debug, Default)]
pub struct FunctionProfile {
    pub reads_vars: BTreeSet<String>,
    pub writes_vars: BTreeSet<String>,
    pub read_groups: BTreeSet<GroupKind>,
    pub write_groups: BTreeSet<GroupKind>,
    pub reads_per_user: bool,
    pub writes_per_user: bool,
}

impl FunctionProfile {
    /// Groups the function touches at all.
    pub fn touched_groups(&self) -> BTreeSet<GroupKind> {
        self.read_groups.union(&self.write_groups).copied().collect()
    }

    pub fn writes_group(&self, kind: GroupKind) -> bool {
        self.write_groups.contains(&kind)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResourcePlan {
    pub contract: String,
    pub level: OptimizationLevel,
    pub vars: BTreeMap<String, PlannedVar>,
    pub groups: Vec<ResourceGroup>,
    pub primary: Option<GroupKind>,
    /// Name of the per-user resource, when any variable was promoted.
    pub per_user_resource: Option<String>,
    pub profiles: BTreeMap<String, FunctionProfile>,
}

impl ResourcePlan {
    pub fn group(&self, kind: GroupKind) -> Option<&ResourceGroup> {
        self.groups.iter().find(|g| g.kind == kind)
    }

    pub fn group_name(&self, kind: GroupKind) -> String {
        format!("{}{}", self.contract, kind.suffix())
    }

    pub fn var(&self, name: &str) -> Option<&PlannedVar> {
        self.vars.get(name)
    }

    pub fn profile(&self, func: &str) -> Option<&FunctionProfile> {
        self.profiles.get(func)
    }

    /// The group a variable is stored in, if it is stored in one.
    pub fn group_of(&self, var: &str) -> Option<GroupKind> {
        match self.vars.get(var)?.placement {
            VarPlacement::Group(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_aggregated(&self, var: &str) -> bool {
        self.vars.get(var).is_some_and(|v| v.aggregated)
    }

    /// True when `func` both reads and writes the aggregated `var`, which
    /// forces reads through a snapshot to stay conflict-free.
    pub fn needs_snapshot(&self, func: &str, var: &str) -> bool {
        self.is_aggregated(var)
            && self.profiles.get(func).is_some_and(|p| {
                p.reads_vars.contains(var) && p.writes_vars.contains(var)
            })
    }
}

fn is_fee_like(name: &str) -> bool {
    let lower = name.to_lowercase();
    ["fee", "collected", "accumulated", "reward", "earned"]
        .iter()
        .any(|hint| lower.contains(hint))
}

/// Record view across all non-constructor functions for one variable.
struct VarSummary<'a> {
    function_records: Vec<(&'a str, &'a VariableAccessRecord)>,
}

impl<'a> VarSummary<'a> {
    fn new(analysis: &'a AccessAnalysis, var: &'a str) -> Self {
        let function_records = analysis
            .records_for_var(var)
            .filter(|(f, _)| *f != CONSTRUCTOR_KEY)
            .collect();
        Self { function_records }
    }

    fn total_writes(&self) -> usize {
        self.function_records.iter().map(|(_, r)| r.writes).sum()
    }

    fn all_writes_guarded(&self) -> bool {
        self.function_records
            .iter()
            .filter(|(_, r)| r.writes > 0)
            .all(|(_, r)| r.admin_guarded())
    }

    fn write_ops(&self) -> BTreeSet<AssignOp> {
        self.function_records
            .iter()
            .flat_map(|(_, r)| r.write_ops.iter().copied())
            .collect()
    }

    fn explicitly_read_in(&self, contract: &Contract, include_views: bool) -> bool {
        self.function_records.iter().any(|(f, r)| {
            if !r.explicit_read {
                return false;
            }
            include_views
                || contract.function(f).is_none_or(|func| !func.mutability.is_readonly())
        })
    }

    fn msg_sender_key_ratio(&self) -> f64 {
        let mut sender = 0usize;
        let mut total = 0usize;
        for (_, r) in &self.function_records {
            sender += r.key_patterns.get(&KeyPattern::MsgSender).copied().unwrap_or(0);
            total += r.key_patterns.values().sum::<usize>();
        }
        if total == 0 {
            0.0
        } else {
            sender as f64 / total as f64
        }
    }

    fn all_write_keys_are_sender(&self) -> bool {
        let mut any = false;
        for (_, r) in &self.function_records {
            for (pat, n) in &r.write_key_patterns {
                if *n > 0 {
                    if *pat != KeyPattern::MsgSender {
                        return false;
                    }
                    any = true;
                }
            }
        }
        any
    }
}

fn classify(
    var: &StateVar,
    contract: &Contract,
    analysis: &AccessAnalysis,
) -> VarClass {
    if var.mutability == Mutability::Immutable {
        return VarClass::AdminConfig;
    }

    let summary = VarSummary::new(analysis, &var.name);

    if summary.total_writes() == 0 || summary.all_writes_guarded() {
        return VarClass::AdminConfig;
    }

    if var.ty.is_integer() {
        let ops = summary.write_ops();
        if !ops.is_empty() && ops.iter().all(|op| matches!(op, AssignOp::Add | AssignOp::Sub)) {
            let read_outside_views = summary.explicitly_read_in(contract, false);
            if !read_outside_views
                && (is_fee_like(&var.name) || !summary.explicitly_read_in(contract, true))
            {
                return VarClass::EventTrackable;
            }
            return VarClass::Aggregatable;
        }
    }

    if var.ty.is_address_keyed_mapping() && summary.msg_sender_key_ratio() >= 0.5 {
        return VarClass::UserKeyedMapping;
    }

    VarClass::General
}

fn placement_for(
    class: VarClass,
    var: &StateVar,
    summary: &VarSummary<'_>,
    level: OptimizationLevel,
) -> (VarPlacement, bool) {
    match level {
        OptimizationLevel::Low => (VarPlacement::Group(GroupKind::State), false),
        OptimizationLevel::Medium | OptimizationLevel::High => match class {
            VarClass::AdminConfig => (VarPlacement::Group(GroupKind::AdminConfig), false),
            VarClass::Aggregatable => (VarPlacement::Group(GroupKind::Counters), true),
            VarClass::EventTrackable => (VarPlacement::EventOnly, false),
            VarClass::UserKeyedMapping => {
                if level == OptimizationLevel::High
                    && var.ty.is_address_keyed_mapping()
                    && summary.all_write_keys_are_sender()
                {
                    (VarPlacement::PerUser, false)
                } else {
                    (VarPlacement::Group(GroupKind::UserData), false)
                }
            }
            VarClass::General => (VarPlacement::Group(GroupKind::State), false),
        },
    }
}

/// Builds the resource plan for one contract.
pub fn plan(contract: &Contract, level: OptimizationLevel) -> ResourcePlan {
    let analysis = access::analyze(contract);
    plan_with_analysis(contract, level, &analysis)
}

/// Builds the plan from an already computed analysis.
pub fn plan_with_analysis(
    contract: &Contract,
    level: OptimizationLevel,
    analysis: &AccessAnalysis,
) -> ResourcePlan {
    let mut out = ResourcePlan {
        contract: contract.name.clone(),
        level,
        ..Default::default()
    };

    // Constants never appear in the plan.
    for var in contract.state_vars.iter().filter(|v| v.mutability != Mutability::Constant) {
        let class = classify(var, contract, analysis);
        let summary = VarSummary::new(analysis, &var.name);
        let (placement, aggregated) = placement_for(class, var, &summary, level);
        tracing::debug!(var = %var.name, ?class, ?placement, "planned state variable");
        out.vars.insert(
            var.name.clone(),
            PlannedVar { name: var.name.clone(), class, placement, aggregated },
        );
    }

    // When any mapping is promoted to a per-user resource, that resource
    // takes the `<C>UserData` name; the remaining user-keyed tables fall
    // back to the primary group to keep names unique.
    if level == OptimizationLevel::High
        && out.vars.values().any(|v| v.placement == VarPlacement::PerUser)
    {
        for planned in out.vars.values_mut() {
            if planned.placement == VarPlacement::Group(GroupKind::UserData) {
                planned.placement = VarPlacement::Group(GroupKind::State);
            }
        }
    }

    // Assemble groups in declaration order.
    for kind in [GroupKind::AdminConfig, GroupKind::Counters, GroupKind::UserData, GroupKind::State]
    {
        let members: Vec<String> = contract
            .state_vars
            .iter()
            .filter(|v| {
                out.vars
                    .get(&v.name)
                    .is_some_and(|p| p.placement == VarPlacement::Group(kind))
            })
            .map(|v| v.name.clone())
            .collect();
        if !members.is_empty() {
            out.groups.push(ResourceGroup {
                kind,
                name: out.group_name(kind),
                vars: members,
            });
        }
    }

    out.primary = if out.group(GroupKind::State).is_some() {
        Some(GroupKind::State)
    } else {
        out.groups.first().map(|g| g.kind)
    };

    if out.vars.values().any(|v| v.placement == VarPlacement::PerUser) {
        out.per_user_resource = Some(format!("{}UserData", contract.name));
    }

    // Per-function profiles.
    for (func, records) in &analysis.records {
        let mut profile = FunctionProfile::default();
        for (var, record) in records {
            let Some(planned) = out.vars.get(var) else { continue };
            let reads = record.reads > 0;
            // Compound assignments read the old value even though the source
            // never names it in value position.
            let writes = record.writes > 0;
            let compound_write = record
                .write_ops
                .iter()
                .any(|op| !matches!(op, AssignOp::Assign));
            if reads || (writes && compound_write) {
                profile.reads_vars.insert(var.clone());
            }
            if writes {
                profile.writes_vars.insert(var.clone());
            }
            match planned.placement {
                VarPlacement::Group(kind) => {
                    if reads {
                        profile.read_groups.insert(kind);
                    }
                    if writes {
                        profile.write_groups.insert(kind);
                    }
                }
                VarPlacement::PerUser => {
                    profile.reads_per_user |= reads;
                    profile.writes_per_user |= writes;
                }
                VarPlacement::EventOnly => {}
            }
        }
        out.profiles.insert(func.clone(), profile);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use solmove_common::Diagnostics;
    use solmove_ir::lower::lower_source;

    fn plan_src(src: &str, level: OptimizationLevel) -> ResourcePlan {
        let mut diags = Diagnostics::new(false);
        let unit = lower_source(src, &mut diags).unwrap();
        plan(&unit.contracts.first().unwrap().clone(), level)
    }

    const COUNTER: &str = r"
        contract Counter {
            uint256 count;
            function inc() public { count += 1; }
            function get() public view returns (uint256) { return count; }
        }
    ";

    #[test]
    fn low_collapses_to_primary() {
        let plan = plan_src(COUNTER, OptimizationLevel::Low);
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].name, "CounterState");
        assert_eq!(plan.primary, Some(GroupKind::State));
        assert!(!plan.is_aggregated("count"));
    }

    #[test]
    fn medium_aggregates_counters() {
        let plan = plan_src(COUNTER, OptimizationLevel::Medium);
        // Read in a view only, but name is not fee-like and it IS read:
        // stays aggregatable rather than event-only.
        assert_eq!(plan.vars["count"].class, VarClass::Aggregatable);
        assert!(plan.is_aggregated("count"));
        assert_eq!(plan.group_of("count"), Some(GroupKind::Counters));
        assert_eq!(plan.groups[0].name, "CounterCounters");
    }

    #[test]
    fn write_only_fee_counter_is_event_trackable() {
        let plan = plan_src(
            r"
            contract Pool {
                uint256 swapFees;
                uint256 volume;
                function swap(uint256 amt) public {
                    swapFees += amt;
                    volume = volume + amt;
                }
            }
            ",
            OptimizationLevel::Medium,
        );
        assert_eq!(plan.vars["swapFees"].class, VarClass::EventTrackable);
        assert_eq!(plan.vars["swapFees"].placement, VarPlacement::EventOnly);
        // `volume` uses plain assignment, so it is not aggregatable.
        assert_eq!(plan.vars["volume"].class, VarClass::General);
    }

    const TOKEN: &str = r#"
        contract Token {
            address public owner;
            mapping(address => uint256) balances;

            modifier onlyOwner() { require(msg.sender == owner, "no"); _; }

            constructor() { owner = msg.sender; }

            function setOwner(address next) public onlyOwner { owner = next; }

            function withdraw(uint256 amount) public {
                require(balances[msg.sender] >= amount, "insufficient balance");
                balances[msg.sender] -= amount;
            }

            function deposit(uint256 amount) public {
                balances[msg.sender] += amount;
            }
        }
    "#;

    #[test]
    fn admin_guarded_owner_is_admin_config() {
        let plan = plan_src(TOKEN, OptimizationLevel::Medium);
        assert_eq!(plan.vars["owner"].class, VarClass::AdminConfig);
        assert_eq!(plan.group_of("owner"), Some(GroupKind::AdminConfig));
    }

    #[test]
    fn sender_keyed_mapping_promotes_at_high() {
        let medium = plan_src(TOKEN, OptimizationLevel::Medium);
        assert_eq!(medium.vars["balances"].class, VarClass::UserKeyedMapping);
        assert_eq!(medium.group_of("balances"), Some(GroupKind::UserData));
        assert!(medium.per_user_resource.is_none());

        let high = plan_src(TOKEN, OptimizationLevel::High);
        assert_eq!(high.vars["balances"].placement, VarPlacement::PerUser);
        assert_eq!(high.per_user_resource.as_deref(), Some("TokenUserData"));
        let w = high.profile("withdraw").unwrap();
        assert!(w.writes_per_user);
    }

    #[test]
    fn profiles_track_groups() {
        let plan = plan_src(TOKEN, OptimizationLevel::Medium);
        let set_owner = plan.profile("setOwner").unwrap();
        assert!(set_owner.writes_group(GroupKind::AdminConfig));
        let withdraw = plan.profile("withdraw").unwrap();
        assert!(withdraw.writes_group(GroupKind::UserData));
        // The onlyOwner modifier read of `owner` lands in setOwner's reads.
        assert!(set_owner.read_groups.contains(&GroupKind::AdminConfig));
    }

    #[test]
    fn constants_never_appear() {
        let plan = plan_src(
            r"
            contract C {
                uint256 constant MAX = 10;
                uint256 x;
                function set(uint256 v) public { x = v; }
            }
            ",
            OptimizationLevel::Medium,
        );
        assert!(plan.var("MAX").is_none());
        assert!(plan.var("x").is_some());
    }

    #[test]
    fn snapshot_needed_when_read_and_written() {
        let plan = plan_src(
            r"
            contract C {
                uint256 total;
                function add(uint256 v) public returns (uint256) {
                    total += v;
                    return total;
                }
            }
            ",
            OptimizationLevel::Medium,
        );
        assert!(plan.is_aggregated("total"));
        assert!(plan.needs_snapshot("add", "total"));
    }
}
