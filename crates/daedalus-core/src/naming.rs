//! Mapping between Rust identifiers and wire names.
//!
//! - inline methods are named `action_<snake>` and routed as `<dash-case>`
//! - parameters are declared in `snake_case` and sent as `camelCase`

use std::sync::LazyLock;

use regex::Regex;

/// Prefix of inline action methods.
pub const ACTION_PREFIX: &str = "action_";

static ROUTE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap_or_else(|e| panic!("invalid route regex: {e}"))
});

/// Returns the dash-case route id of an inline method, or `None` if the
/// method is not an action.
///
/// ```
/// use daedalus_core::naming::method_to_route;
///
/// assert_eq!(method_to_route("action_get_user").as_deref(), Some("get-user"));
/// assert_eq!(method_to_route("helper"), None);
/// ```
#[must_use]
pub fn method_to_route(method: &str) -> Option<String> {
    let rest = method.strip_prefix(ACTION_PREFIX)?;
    if rest.is_empty() {
        return None;
    }
    Some(rest.replace('_', "-"))
}

/// Returns the inline method name for a route id, or `None` if the id is
/// malformed.
///
/// Valid ids are lowercase alphanumeric words joined by single dashes.
///
/// ```
/// use daedalus_core::naming::route_to_method;
///
/// assert_eq!(route_to_method("get-user").as_deref(), Some("action_get_user"));
/// assert_eq!(route_to_method("get--user"), None);
/// assert_eq!(route_to_method("-ping"), None);
/// ```
#[must_use]
pub fn route_to_method(route: &str) -> Option<String> {
    if !is_valid_route_id(route) {
        return None;
    }
    Some(format!("{ACTION_PREFIX}{}", route.replace('-', "_")))
}

/// Returns `true` if `route` is a well-formed action id.
#[must_use]
pub fn is_valid_route_id(route: &str) -> bool {
    ROUTE_ID.is_match(route)
}

/// Converts a `snake_case` identifier to `camelCase`.
///
/// ```
/// use daedalus_core::naming::snake_to_camel;
///
/// assert_eq!(snake_to_camel("user_id"), "userId");
/// assert_eq!(snake_to_camel("name"), "name");
/// ```
#[must_use]
pub fn snake_to_camel(ident: &str) -> String {
    let ident = ident.strip_prefix("r#").unwrap_or(ident);
    let mut out = String::with_capacity(ident.len());
    let mut upper = false;
    for ch in ident.trim_start_matches('_').chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Converts a `CamelCase` type name to `dash-case`.
///
/// ```
/// use daedalus_core::naming::camel_to_dash;
///
/// assert_eq!(camel_to_dash("ExportUsers"), "export-users");
/// ```
#[must_use]
pub fn camel_to_dash(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_malformed_routes() {
        for bad in ["", "Get-User", "get_user", "get--user", "user-", "-user", "get user", "ü"] {
            assert!(route_to_method(bad).is_none(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_action_prefix_only() {
        assert_eq!(method_to_route("action_"), None);
        assert_eq!(method_to_route("action_ping").as_deref(), Some("ping"));
    }

    #[test]
    fn test_camel_to_dash_single_word() {
        assert_eq!(camel_to_dash("Ping"), "ping");
    }

    #[test]
    fn test_snake_to_camel_raw_identifier() {
        assert_eq!(snake_to_camel("r#type"), "type");
        assert_eq!(snake_to_camel("r#user_type"), "userType");
    }

    proptest! {
        #[test]
        fn route_and_method_names_correspond(words in prop::collection::vec("[a-z0-9]{1,8}", 1..5)) {
            let route = words.join("-");
            let method = route_to_method(&route).unwrap();
            prop_assert_eq!(method_to_route(&method), Some(route));
        }

        #[test]
        fn camel_case_has_no_underscores(ident in "[a-z][a-z0-9_]{0,20}") {
            prop_assert!(!snake_to_camel(&ident).contains('_'));
        }
    }
}
