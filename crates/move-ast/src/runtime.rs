//! The emitted runtime helper module.
//!
//! Exponentiation, `addmod`/`mulmod` and wrapping arithmetic have no direct
//! Move operator; call sites route to this module, and its source is
//! appended to the output set whenever any of them is referenced.

/// The module name call sites are qualified with.
pub const RUNTIME_MODULE: &str = "evm_math";

/// Renders the helper module at the target address.
pub fn runtime_module_source(module_address: &str) -> String {
    format!(
        r#"module {module_address}::{RUNTIME_MODULE} {{
    const MAX_U256: u256 = 0xffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff;

    /// Modulus must not be zero.
    const E_MOD_BY_ZERO: u64 = 1;

    public fun exp(base: u256, exponent: u256): u256 {{
        let result = 1;
        let b = base;
        let e = exponent;
        while (e > 0) {{
            if (e % 2 == 1) {{
                result = result * b;
            }};
            e = e / 2;
            if (e > 0) {{
                b = b * b;
            }};
        }};
        result
    }}

    public fun add_mod(a: u256, b: u256, m: u256): u256 {{
        assert!(m != 0, E_MOD_BY_ZERO);
        let a = a % m;
        let b = b % m;
        if (a <= MAX_U256 - b) {{
            (a + b) % m
        }} else {{
            // The sum wrapped: a + b == a - (m - b) (mod m).
            a - (m - b)
        }}
    }}

    public fun mul_mod(a: u256, b: u256, m: u256): u256 {{
        assert!(m != 0, E_MOD_BY_ZERO);
        let result = 0;
        let x = a % m;
        let y = b % m;
        while (y > 0) {{
            if (y % 2 == 1) {{
                result = add_mod(result, x, m);
            }};
            x = add_mod(x, x, m);
            y = y / 2;
        }};
        result
    }}

    public fun wrapping_add(a: u256, b: u256): u256 {{
        if (a <= MAX_U256 - b) {{
            a + b
        }} else {{
            b - (MAX_U256 - a) - 1
        }}
    }}

    public fun wrapping_sub(a: u256, b: u256): u256 {{
        if (a >= b) {{
            a - b
        }} else {{
            MAX_U256 - (b - a) + 1
        }}
    }}

    public fun wrapping_mul(a: u256, b: u256): u256 {{
        let result = 0;
        let x = a;
        let y = b;
        while (y > 0) {{
            if (y % 2 == 1) {{
                result = wrapping_add(result, x);
            }};
            x = wrapping_add(x, x);
            y = y / 2;
        }};
        result
    }}
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_module_lives_at_the_target_address() {
        let text = runtime_module_source("0x42");
        assert!(text.starts_with("module 0x42::evm_math {"));
        assert!(text.contains("public fun exp"));
        assert!(text.contains("public fun add_mod"));
        assert!(text.contains("public fun mul_mod"));
    }
}
