//! Typed failures surfaced at stage boundaries.
//!
//! Recoverable oddities flow through [`crate::Diagnostics`]; this type is
//! for failures that abort a translation outright. The driver converts it
//! into the structured result rather than propagating it to callers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranspileError {
    /// The front-end rejected the source text; the individual parser
    /// messages are recorded in the diagnostic collector.
    #[error("failed to parse Solidity source ({count} error(s))")]
    Parse { count: usize },
}
