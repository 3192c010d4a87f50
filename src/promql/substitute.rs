//! Grafana template-variable substitution
//!
//! Dashboard queries embed `$variable` / `${variable}` references that are
//! not valid PromQL until Grafana renders them. Before parsing, known
//! duration macros are replaced with a parseable duration literal and all
//! remaining variable references with a placeholder label value. Findings
//! and fixes always reference the original raw string, never this one.

/// Replacement for the duration macros so range brackets stay parseable.
const DURATION_PLACEHOLDER: &str = "5m";

/// Replacement for generic variable references.
const VALUE_PLACEHOLDER: &str = "placeholder";

/// Grafana duration macros, plain and braced forms.
const DURATION_VARS: &[&str] = &[
    "$__rate_interval",
    "$__interval",
    "$__range",
    "${__rate_interval}",
    "${__interval}",
    "${__range}",
];

/// Rewrite a raw dashboard query into a parseable form. Idempotent:
/// substituting an already-substituted string is a no-op.
pub fn substitute(raw: &str) -> String {
    let mut result = raw.to_string();
    for var in DURATION_VARS {
        if result.contains(var) {
            result = result.replace(var, DURATION_PLACEHOLDER);
        }
    }
    replace_variable_refs(&result)
}

/// Replace `$var` and `${var}` references with the value placeholder.
/// A lone `$` not followed by an identifier character or `{`, and a `${`
/// with no closing brace, pass through untouched; malformed input must
/// never crash the scanner.
fn replace_variable_refs(expr: &str) -> String {
    let bytes = expr.as_bytes();
    let mut out = String::with_capacity(expr.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            let start = i;
            while i < bytes.len() && bytes[i] != b'$' {
                i += 1;
            }
            out.push_str(&expr[start..i]);
            continue;
        }

        match bytes.get(i + 1) {
            Some(b'{') => match expr[i..].find('}') {
                Some(end) => {
                    out.push_str(VALUE_PLACEHOLDER);
                    i += end + 1;
                }
                None => {
                    out.push('$');
                    i += 1;
                }
            },
            Some(&c) if is_ident_start(c) => {
                let mut j = i + 1;
                while j < bytes.len() && is_ident_char(bytes[j]) {
                    j += 1;
                }
                out.push_str(VALUE_PLACEHOLDER);
                i = j;
            }
            _ => {
                out.push('$');
                i += 1;
            }
        }
    }

    out
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_char(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}
