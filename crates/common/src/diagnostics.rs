//! Per-contract diagnostic collection.
//!
//! Warnings never block emission. Errors block emission only when the
//! collector was created in strict mode; otherwise they are recorded as
//! warnings while keeping their kind, so callers can still see what was
//! degraded.

use serde::Serialize;
use std::fmt;

/// Diagnostic severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// The diagnostic taxonomy of the transpiler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// The front-end rejected the source text.
    ParseFailure,
    /// Assembly, `delegatecall`, `gasleft`, `tx.origin` and friends.
    UnsupportedConstruct,
    /// A source type had no exactly-fitting Move type and was widened.
    Narrowing,
    /// An interface method call without a known module binding.
    CrossContractRef,
    /// A mapping-entry copy whose write-back intent is not syntactically
    /// clear; a write-back was synthesized anyway.
    AmbiguousWriteback,
    /// The state planner rewrote an access (e.g. an event-only counter read
    /// collapsed to a constant).
    PlanRewrite,
    /// An IR node of an unknown variant; indicates a transpiler bug.
    InternalInvariant,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ParseFailure => "parse failure",
            Self::UnsupportedConstruct => "unsupported construct",
            Self::Narrowing => "narrowing",
            Self::CrossContractRef => "cross-contract reference",
            Self::AmbiguousWriteback => "ambiguous write-back",
            Self::PlanRewrite => "plan rewrite",
            Self::InternalInvariant => "internal invariant",
        };
        f.write_str(s)
    }
}

/// A single diagnostic surfaced by any stage of the pipeline.
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    /// Byte span into the original source, when known.
    pub span: Option<(usize, usize)>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sev = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{sev}[{}]: {}", self.kind, self.message)?;
        if let Some((start, end)) = self.span {
            write!(f, " ({start}..{end})")?;
        }
        Ok(())
    }
}

/// Collector scoped to a single contract translation.
#[derive(Debug, Default)]
pub struct Diagnostics {
    diags: Vec<Diagnostic>,
    strict: bool,
}

impl Diagnostics {
    pub fn new(strict: bool) -> Self {
        Self { diags: Vec::new(), strict }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Records a warning.
    pub fn warn(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        self.warn_at(kind, message, None);
    }

    pub fn warn_at(
        &mut self,
        kind: DiagnosticKind,
        message: impl Into<String>,
        span: Option<(usize, usize)>,
    ) {
        let message = message.into();
        tracing::warn!(?kind, %message, "transpile warning");
        self.diags.push(Diagnostic { severity: Severity::Warning, kind, message, span });
    }

    /// Records an unsupported-construct style error. Degrades to a warning
    /// unless the collector is strict.
    pub fn error(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        self.error_at(kind, message, None);
    }

    pub fn error_at(
        &mut self,
        kind: DiagnosticKind,
        message: impl Into<String>,
        span: Option<(usize, usize)>,
    ) {
        if self.strict {
            let message = message.into();
            tracing::error!(?kind, %message, "transpile error");
            self.diags.push(Diagnostic { severity: Severity::Error, kind, message, span });
        } else {
            self.warn_at(kind, message, span);
        }
    }

    /// Records an error that is fatal regardless of strictness (parse
    /// failures, internal invariant violations).
    pub fn hard_error(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(?kind, %message, "transpile error");
        self.diags.push(Diagnostic { severity: Severity::Error, kind, message, span: None });
    }

    pub fn has_errors(&self) -> bool {
        self.diags.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diags.iter()
    }

    /// Moves every diagnostic out of `other` into `self`.
    pub fn absorb(&mut self, other: Diagnostics) {
        self.diags.extend(other.diags);
    }

    /// Splits the collected diagnostics into `(warnings, errors)`.
    pub fn into_parts(self) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
        self.diags.into_iter().partition(|d| d.severity == Severity::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_strict_degrades_errors_to_warnings() {
        let mut diags = Diagnostics::new(false);
        diags.error(DiagnosticKind::UnsupportedConstruct, "delegatecall has no Move analogue");
        assert!(!diags.has_errors());
        let (warnings, errors) = diags.into_parts();
        assert_eq!(warnings.len(), 1);
        assert!(errors.is_empty());
        assert_eq!(warnings[0].kind, DiagnosticKind::UnsupportedConstruct);
    }

    #[test]
    fn strict_keeps_errors() {
        let mut diags = Diagnostics::new(true);
        diags.error(DiagnosticKind::UnsupportedConstruct, "inline assembly");
        assert!(diags.has_errors());
    }

    #[test]
    fn hard_errors_survive_non_strict() {
        let mut diags = Diagnostics::new(false);
        diags.hard_error(DiagnosticKind::ParseFailure, "unexpected token");
        assert!(diags.has_errors());
    }
}
