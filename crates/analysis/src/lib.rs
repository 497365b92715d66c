//! State-access analysis and resource planning (stage S3).
//!
//! [`access`] builds per-variable, per-function access records and closes
//! them over internal-call edges; [`plan`] classifies every mutable state
//! variable and partitions the contract's state into resource groups so that
//! non-conflicting transactions stay parallelizable under Block-STM.

pub mod access;
pub mod plan;

pub use access::{AccessAnalysis, KeyPattern, VariableAccessRecord};
pub use plan::{
    FunctionProfile, GroupKind, PlannedVar, ResourceGroup, ResourcePlan, VarClass, VarPlacement,
};
