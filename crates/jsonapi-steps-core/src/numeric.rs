// crates/jsonapi-steps-core/src/numeric.rs
// ============================================================================
// Module: Numeric Notation
// Description: Classification of JSON values as numeric.
// Purpose: Decide whether a node value counts as a number for assertions.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A value is numeric when it is a JSON number or a string written in plain
//! decimal notation: optional surrounding whitespace, an optional sign,
//! digits with an optional fraction (either side of the point may be empty,
//! not both) and an optional exponent. Hex, `inf`, `NaN` and empty strings are
//! not numeric. Booleans, null, arrays and objects never are.

use serde_json::Value;

/// Returns true when the value is a number or a numeric string.
#[must_use]
pub fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(text) => is_numeric_str(text),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => false,
    }
}

/// Returns true when the text is written in numeric notation.
#[must_use]
pub fn is_numeric_str(text: &str) -> bool {
    let trimmed = text.trim_matches(is_numeric_whitespace);
    let bytes = trimmed.as_bytes();
    let mut idx = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        idx += 1;
    }
    let int_digits = count_digits(&bytes[idx..]);
    idx += int_digits;
    let mut frac_digits = 0;
    if bytes.get(idx) == Some(&b'.') {
        idx += 1;
        frac_digits = count_digits(&bytes[idx..]);
        idx += frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return false;
    }
    if matches!(bytes.get(idx), Some(b'e' | b'E')) {
        idx += 1;
        if matches!(bytes.get(idx), Some(b'+' | b'-')) {
            idx += 1;
        }
        let exp_digits = count_digits(&bytes[idx..]);
        if exp_digits == 0 {
            return false;
        }
        idx += exp_digits;
    }
    idx == bytes.len()
}

/// Whitespace allowed around numeric strings.
const fn is_numeric_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

/// Counts leading ASCII digits.
fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|byte| byte.is_ascii_digit()).count()
}
