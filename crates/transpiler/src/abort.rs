//! Abort-code constants.
//!
//! `require` messages are matched against a fixed pattern table to pick a
//! stable, well-known constant; unmatched messages synthesize a new constant
//! that is deduplicated per module. Custom `error` declarations reuse the
//! same table keyed by their name.

use solmove_common::ident::to_move_const_ident;
use solmove_move_ast::{MoveConst, MoveExpr, MoveType};
use std::collections::BTreeMap;

/// Verbose-style category for `std::error` wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbortCategory {
    InvalidArgument,
    InvalidState,
    PermissionDenied,
}

impl AbortCategory {
    pub fn wrapper(self) -> &'static str {
        match self {
            Self::InvalidArgument => "error::invalid_argument",
            Self::InvalidState => "error::invalid_state",
            Self::PermissionDenied => "error::permission_denied",
        }
    }
}

/// The fixed message-pattern table. First match wins.
const PATTERNS: &[(&[&str], &str, u64, AbortCategory)] = &[
    (
        &["not owner", "not the owner", "only owner", "unauthorized", "caller is not", "forbidden", "access denied"],
        "E_UNAUTHORIZED",
        1,
        AbortCategory::PermissionDenied,
    ),
    (
        &["insufficient balance", "insufficient funds", "exceeds balance", "balance too low"],
        "E_INSUFFICIENT_BALANCE",
        2,
        AbortCategory::InvalidArgument,
    ),
    (&["not paused"], "E_NOT_PAUSED", 4, AbortCategory::InvalidState),
    (&["paused"], "E_PAUSED", 3, AbortCategory::InvalidState),
    (&["overflow"], "E_OVERFLOW", 5, AbortCategory::InvalidArgument),
    (&["zero address"], "E_ZERO_ADDRESS", 6, AbortCategory::InvalidArgument),
    (&["reentran"], "E_REENTRANCY", 7, AbortCategory::InvalidState),
    (
        &["invalid amount", "amount must", "zero amount"],
        "E_INVALID_AMOUNT",
        8,
        AbortCategory::InvalidArgument,
    ),
    (&["already initialized"], "E_ALREADY_INITIALIZED", 9, AbortCategory::InvalidState),
    (&["expired", "deadline"], "E_EXPIRED", 10, AbortCategory::InvalidState),
];

/// Code used for `assert(...)` without a message.
const ASSERTION_FAILED: (&str, u64) = ("E_ASSERTION_FAILED", 11);

/// First code handed out to synthesized constants.
const SYNTHESIZED_BASE: u64 = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
struct CodeEntry {
    name: String,
    code: u64,
    category: AbortCategory,
}

/// Per-module abort-code table.
#[derive(Debug, Default)]
pub struct AbortCodes {
    entries: BTreeMap<String, CodeEntry>,
    next_synthesized: u64,
}

impl AbortCodes {
    pub fn new() -> Self {
        Self { entries: BTreeMap::new(), next_synthesized: SYNTHESIZED_BASE }
    }

    /// Constants are deduplicated by name; the first assignment of a code
    /// for a name wins.
    fn intern(&mut self, name: String, code: Option<u64>, category: AbortCategory) -> String {
        if self.entries.contains_key(&name) {
            return name;
        }
        let code = code.unwrap_or_else(|| {
            let c = self.next_synthesized;
            self.next_synthesized += 1;
            c
        });
        self.entries.insert(name.clone(), CodeEntry { name: name.clone(), code, category });
        name
    }

    /// The pattern-table entry matching a name or message, if any.
    fn pattern_for(text: &str) -> Option<(&'static str, u64, AbortCategory)> {
        let lower = text.to_lowercase();
        PATTERNS
            .iter()
            .find(|(needles, ..)| needles.iter().any(|needle| lower.contains(needle)))
            .map(|(_, name, code, category)| (*name, *code, *category))
    }

    /// The constant for a `require`/`revert` message.
    pub fn for_message(&mut self, message: &str) -> String {
        if let Some((name, code, category)) = Self::pattern_for(message) {
            return self.intern(name.to_string(), Some(code), category);
        }
        // Synthesize from the message text, truncated to stay readable.
        let compact: String = message.chars().take(40).collect();
        let name = format!("E_{}", to_move_const_ident(&compact));
        self.intern(name, None, AbortCategory::InvalidArgument)
    }

    /// The constant for a custom error declaration (`revert Foo()`).
    pub fn for_error(&mut self, error_name: &str) -> String {
        let name = format!("E_{}", to_move_const_ident(error_name));
        if let Some((known, code, category)) = Self::pattern_for(&name.to_lowercase().replace('_', " ")) {
            if known == name {
                return self.intern(name, Some(code), category);
            }
        }
        self.intern(name, None, AbortCategory::InvalidArgument)
    }

    /// The constant for a message-less `assert`/`revert()`.
    pub fn assertion_failed(&mut self) -> String {
        self.intern(
            ASSERTION_FAILED.0.to_string(),
            Some(ASSERTION_FAILED.1),
            AbortCategory::InvalidArgument,
        )
    }

    pub fn category_of(&self, const_name: &str) -> AbortCategory {
        self.entries
            .values()
            .find(|e| e.name == const_name)
            .map(|e| e.category)
            .unwrap_or(AbortCategory::InvalidArgument)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `const` declarations, ordered by code. Every entry was created by
    /// a call site, so each constant is referenced at least once.
    pub fn into_constants(self) -> Vec<MoveConst> {
        let mut entries: Vec<CodeEntry> = self.entries.into_values().collect();
        entries.sort_by_key(|e| e.code);
        entries
            .into_iter()
            .map(|e| MoveConst {
                name: e.name,
                ty: MoveType::U64,
                value: MoveExpr::number(e.code.to_string()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_patterns_get_stable_codes() {
        let mut codes = AbortCodes::new();
        assert_eq!(codes.for_message("ERC20: insufficient balance"), "E_INSUFFICIENT_BALANCE");
        assert_eq!(codes.for_message("caller is not the owner"), "E_UNAUTHORIZED");
        assert_eq!(codes.for_message("Pausable: paused"), "E_PAUSED");
        assert_eq!(codes.for_message("Pausable: not paused"), "E_NOT_PAUSED");
    }

    #[test]
    fn unknown_messages_synthesize_deduplicated_constants() {
        let mut codes = AbortCodes::new();
        let a = codes.for_message("price feed is stale");
        let b = codes.for_message("price feed is stale");
        assert_eq!(a, b);
        assert_eq!(a, "E_PRICE_FEED_IS_STALE");
        let consts = codes.into_constants();
        assert_eq!(consts.len(), 1);
        assert!(matches!(&consts[0].value, MoveExpr::Number { value, .. } if value == "100"));
    }

    #[test]
    fn custom_errors_map_by_name() {
        let mut codes = AbortCodes::new();
        assert_eq!(codes.for_error("Unauthorized"), "E_UNAUTHORIZED");
        assert_eq!(codes.for_error("NotEnoughFunds"), "E_NOT_ENOUGH_FUNDS");
    }

    #[test]
    fn constants_are_unique_and_ordered() {
        let mut codes = AbortCodes::new();
        codes.for_message("something odd");
        codes.for_message("another thing");
        codes.for_message("insufficient balance");
        codes.assertion_failed();
        let consts = codes.into_constants();
        let mut names: Vec<&str> = consts.iter().map(|c| c.name.as_str()).collect();
        names.dedup();
        assert_eq!(names.len(), consts.len());
        let values: Vec<u64> = consts
            .iter()
            .map(|c| match &c.value {
                MoveExpr::Number { value, .. } => value.parse().unwrap(),
                _ => panic!(),
            })
            .collect();
        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(values, sorted);
    }
}
