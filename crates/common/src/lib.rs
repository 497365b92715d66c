//! Shared pieces of the solmove pipeline: the transpiler configuration
//! record, the per-contract diagnostic collector and Move identifier
//! utilities.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ident;

pub use config::TranspileOptions;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::TranspileError;
