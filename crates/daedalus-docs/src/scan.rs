//! Custom error code scanning.
//!
//! Framework codes come from [`ErrorCode::ALL`](daedalus_core::ErrorCode::ALL).
//! Codes a service raises itself are only visible in its source, so the
//! text of the `#[rpc]` block is scanned for `custom("CODE"` literals.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static CUSTOM_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"custom\s*\(\s*"([A-Za-z][A-Za-z0-9_]*)""#)
        .unwrap_or_else(|e| panic!("invalid error code regex: {e}"))
});

/// Returns the custom error codes raised in `source`, sorted and deduplicated.
///
/// # Example
///
/// ```
/// use daedalus_docs::scan_error_codes;
///
/// let source = r#"Err(RpcError::custom("USER_NOT_FOUND", "missing"))"#;
/// assert_eq!(scan_error_codes(source), ["USER_NOT_FOUND"]);
/// ```
#[must_use]
pub fn scan_error_codes(source: &str) -> Vec<String> {
    CUSTOM_CODE
        .captures_iter(source)
        .filter_map(|captures| captures.get(1))
        .map(|code| code.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
