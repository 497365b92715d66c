//! Solidity → Move identifier rewriting.
//!
//! All renaming happens during transformation; the emitter prints identifiers
//! verbatim. The rules: camelCase becomes snake_case, `$` is replaced by `_`,
//! identifiers starting with a digit get a leading `_`, SCREAMING_SNAKE names
//! are preserved for constants, and collisions with Move keywords get a
//! trailing `_`.

use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};

/// Keywords and address-literal-ish names reserved by the Move language.
const MOVE_KEYWORDS: &[&str] = &[
    "abort", "acquires", "address", "as", "break", "const", "continue", "copy", "else", "entry",
    "enum", "false", "for", "friend", "fun", "has", "if", "in", "invariant", "let", "loop",
    "macro", "match", "module", "move", "mut", "native", "public", "return", "script", "spec",
    "struct", "true", "use", "while",
];

fn is_move_keyword(s: &str) -> bool {
    MOVE_KEYWORDS.contains(&s)
}

/// True if the identifier is already SCREAMING_SNAKE (with at least one
/// alphabetic character), the conventional shape of Solidity constants.
pub fn is_screaming_snake(s: &str) -> bool {
    !s.is_empty()
        && s.chars().any(|c| c.is_ascii_uppercase())
        && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn sanitize(s: &str) -> String {
    let mut out: String = s.chars().map(|c| if c == '$' { '_' } else { c }).collect();
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Rewrites a Solidity value-level identifier (variable, function, field,
/// parameter) into a valid Move identifier.
pub fn to_move_ident(name: &str) -> String {
    // Case conversion eats leading escapes, so they are re-applied after.
    let mut snake = if is_screaming_snake(&sanitize(name)) {
        // Constants referenced by name keep their shape.
        sanitize(name)
    } else {
        name.to_snake_case()
    };
    if snake.is_empty() {
        snake = "_".to_string();
    }
    if name.starts_with('$') || snake.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        snake.insert(0, '_');
    }
    if is_move_keyword(&snake) {
        format!("{snake}_")
    } else {
        snake
    }
}

/// Rewrites a name into a Move constant identifier (SCREAMING_SNAKE).
pub fn to_move_const_ident(name: &str) -> String {
    sanitize(name).to_shouty_snake_case()
}

/// Rewrites a Solidity contract/struct/event name into a Move struct name
/// (UpperCamelCase).
pub fn to_move_type_ident(name: &str) -> String {
    sanitize(name).to_upper_camel_case()
}

/// Derives the emitted module name for a contract (snake_case, keyword-safe).
pub fn module_name_for_contract(contract: &str) -> String {
    let mut snake = contract.to_snake_case();
    if snake.is_empty() {
        snake = "_".to_string();
    }
    if snake.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        snake.insert(0, '_');
    }
    if is_move_keyword(&snake) {
        format!("{snake}_")
    } else {
        snake
    }
}

/// True if `s` is a syntactically valid Move identifier.
pub fn is_valid_move_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !is_move_keyword(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_becomes_snake_case() {
        assert_eq!(to_move_ident("balanceOf"), "balance_of");
        assert_eq!(to_move_ident("totalSupply"), "total_supply");
        assert_eq!(to_move_ident("transferFrom"), "transfer_from");
    }

    #[test]
    fn dollar_and_digit_prefixes_are_escaped() {
        assert_eq!(to_move_ident("$value"), "_value");
        assert_eq!(to_move_ident("3days"), "_3days");
    }

    #[test]
    fn keywords_get_a_suffix() {
        assert_eq!(to_move_ident("move"), "move_");
        assert_eq!(to_move_ident("friend"), "friend_");
        assert_eq!(module_name_for_contract("Module"), "module_");
    }

    #[test]
    fn screaming_snake_is_preserved() {
        assert_eq!(to_move_ident("MAX_SUPPLY"), "MAX_SUPPLY");
        assert_eq!(to_move_ident("DEFAULT_ADMIN_ROLE"), "DEFAULT_ADMIN_ROLE");
        assert!(is_screaming_snake("MAX_SUPPLY"));
        assert!(!is_screaming_snake("maxSupply"));
    }

    #[test]
    fn type_names_are_camel() {
        assert_eq!(to_move_type_ident("my_token"), "MyToken");
        assert_eq!(to_move_type_ident("ERC20"), "Erc20");
    }

    #[test]
    fn validity_check() {
        assert!(is_valid_move_ident("balance_of"));
        assert!(is_valid_move_ident("_x"));
        assert!(!is_valid_move_ident("3x"));
        assert!(!is_valid_move_ident("has"));
        assert!(!is_valid_move_ident("a$b"));
    }
}
