//! Contract extraction from structured doc comments.
//!
//! A method's doc comment is split into a free-text description (everything
//! before the first tag line) and tag lines starting with `@`. A line that
//! does not start with `@` after the first tag continues the previous tag.
//!
//! Recognized tags:
//!
//! | Tag | Meaning |
//! |---|---|
//! | `@api` | exposed through the API |
//! | `@no-auth` | no authentication required |
//! | `@transaction` | runs inside a transaction |
//! | `@permission <name>` | required permission |
//! | `@param <type> <name> <text> [{validate=..., element=name\|type\|text}]` | one per declared parameter |
//! | `@return <type> <text>` | at most one |
//! | `@return-element <type> <name> <text>` | field of a structured result |
//! | `@var <type> <text>` | type of a public field |
//!
//! Unknown tags are ignored.

use crate::contract::{ElementSpec, MethodContract, ParamSpec, ReturnSpec};
use crate::error::{RpcError, RpcResult};
use crate::service::ParamDescriptor;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

static TAG_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@([A-Za-z][A-Za-z0-9_-]*)\s*(.*)$")
        .unwrap_or_else(|e| panic!("invalid tag regex: {e}"))
});

static ATTRIBUTE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[A-Za-z][A-Za-z0-9_-]*\s*=")
        .unwrap_or_else(|e| panic!("invalid attribute regex: {e}"))
});

/// One `@tag rest-of-line` entry of a doc comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTag {
    /// Tag name without the `@`.
    pub name: String,
    /// Remaining text, continuation lines joined with a space.
    pub text: String,
}

/// A doc comment split into description and tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    /// Free text before the first tag.
    pub description: Option<String>,
    /// Tags in order of appearance.
    pub tags: Vec<DocTag>,
}

impl DocComment {
    /// Parses raw doc text.
    ///
    /// ```
    /// use daedalus_core::extract::DocComment;
    ///
    /// let doc = DocComment::parse("Says hello.\n\n@api\n@return string The\n  greeting");
    /// assert_eq!(doc.description.as_deref(), Some("Says hello."));
    /// assert!(doc.has("api"));
    /// assert_eq!(doc.first("return"), Some("string The greeting"));
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut description = Vec::new();
        let mut tags: Vec<DocTag> = Vec::new();

        for line in text.lines().map(str::trim) {
            if let Some(caps) = TAG_LINE.captures(line) {
                tags.push(DocTag {
                    name: caps[1].to_string(),
                    text: caps[2].trim().to_string(),
                });
            } else if let Some(last) = tags.last_mut() {
                if !line.is_empty() {
                    if !last.text.is_empty() {
                        last.text.push(' ');
                    }
                    last.text.push_str(line);
                }
            } else {
                description.push(line);
            }
        }

        let description = description.join("\n").trim().to_string();
        Self {
            description: (!description.is_empty()).then_some(description),
            tags,
        }
    }

    /// Returns `true` if the tag is present.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    /// Returns the text of the first occurrence of a tag.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.text.as_str())
    }

    /// Iterates over the texts of all occurrences of a tag.
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |t| t.name == name)
            .map(|t| t.text.as_str())
    }
}

/// A parsed `@param` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamLine {
    /// Documented type.
    pub ty: String,
    /// Documented name, without a leading `$`.
    pub name: String,
    /// Free text.
    pub description: String,
    /// `validate=` attribute.
    pub validator: Option<String>,
    /// `element=` attributes.
    pub elements: IndexMap<String, ElementSpec>,
}

impl ParamLine {
    /// Parses the text following `@param`. Returns `None` if the type or
    /// name is missing.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (body, attributes) = split_attribute_block(text);
        let (ty, rest) = split_word(body)?;
        let (name, description) = split_word(rest)?;

        let mut line = Self {
            ty: ty.to_string(),
            name: name.trim_start_matches('$').to_string(),
            description: description.to_string(),
            validator: None,
            elements: IndexMap::new(),
        };

        for (key, value) in attributes.map(parse_attributes).unwrap_or_default() {
            match key.as_str() {
                "validate" => line.validator = Some(value),
                "element" => {
                    let mut parts = value.splitn(3, '|').map(str::trim);
                    if let Some(element) = parts.next().filter(|n| !n.is_empty()) {
                        let ty = parts.next().unwrap_or("mixed");
                        let description = parts.next().unwrap_or("");
                        line.elements
                            .insert(element.to_string(), ElementSpec::new(ty, description));
                    }
                }
                other => tracing::debug!(attribute = other, "ignoring unknown @param attribute"),
            }
        }
        Some(line)
    }
}

fn split_word(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    match text.find(char::is_whitespace) {
        Some(end) => Some((&text[..end], text[end..].trim())),
        None => Some((text, "")),
    }
}

/// Splits a trailing `{...}` attribute block off a tag line.
fn split_attribute_block(text: &str) -> (&str, Option<&str>) {
    let trimmed = text.trim_end();
    if trimmed.ends_with('}') {
        if let Some(open) = trimmed.rfind('{') {
            return (&trimmed[..open], Some(&trimmed[open + 1..trimmed.len() - 1]));
        }
    }
    (trimmed, None)
}

/// Splits `key=value, key=value` pairs. A comma not followed by `key=`
/// belongs to the previous value.
fn parse_attributes(block: &str) -> Vec<(String, String)> {
    let mut pieces: Vec<String> = Vec::new();
    for piece in block.split(',') {
        match pieces.last_mut() {
            Some(last) if !ATTRIBUTE_KEY.is_match(piece) => {
                last.push(',');
                last.push_str(piece);
            }
            _ => pieces.push(piece.to_string()),
        }
    }

    pieces
        .iter()
        .filter_map(|piece| {
            let (key, value) = piece.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Builds the contract of a method from its doc text and declared params.
///
/// Fails with [`RpcError::NoDocumentation`] when the method carries no doc
/// comment and with [`RpcError::ContractMismatch`] when the `@param` lines
/// do not match the declared parameters one-to-one and in order, or when
/// more than one `@return` line is present.
pub fn extract_contract(
    method: &str,
    doc: Option<&str>,
    params: &[ParamDescriptor],
) -> RpcResult<MethodContract> {
    let doc = doc
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| RpcError::NoDocumentation {
            method: method.to_string(),
        })?;
    let parsed = DocComment::parse(doc);
    let mismatch = |reason: String| RpcError::ContractMismatch {
        method: method.to_string(),
        reason,
    };

    let documented = parsed
        .all("param")
        .map(|text| {
            ParamLine::parse(text).ok_or_else(|| mismatch(format!("malformed @param line `{text}`")))
        })
        .collect::<RpcResult<Vec<_>>>()?;

    if documented.len() != params.len() {
        return Err(mismatch(format!(
            "{} parameters declared but {} documented",
            params.len(),
            documented.len()
        )));
    }

    let mut contract = MethodContract::new(method);
    for (line, declared) in documented.into_iter().zip(params) {
        if line.name != declared.name {
            return Err(mismatch(format!(
                "documented param {} not found in the method definition (expected {})",
                line.name, declared.name
            )));
        }
        contract.params.insert(
            line.name,
            ParamSpec {
                ty: line.ty,
                description: line.description,
                required: declared.is_required(),
                default: declared.default_value(),
                validator: line.validator,
                elements: line.elements,
            },
        );
    }

    let mut returns = parsed.all("return");
    if let Some(text) = returns.next() {
        let (ty, description) = split_word(text).unwrap_or(("mixed", ""));
        contract.returns = ReturnSpec {
            ty: Some(ty.to_string()),
            description: description.to_string(),
        };
    }
    if returns.next().is_some() {
        return Err(mismatch("more than one @return line".to_string()));
    }

    for text in parsed.all("return-element") {
        let parsed_element = split_word(text).and_then(|(ty, rest)| {
            split_word(rest).map(|(name, description)| (ty, name, description))
        });
        match parsed_element {
            Some((ty, name, description)) => {
                contract.return_params.insert(
                    name.trim_start_matches('$').to_string(),
                    ElementSpec::new(ty, description),
                );
            }
            None => return Err(mismatch(format!("malformed @return-element line `{text}`"))),
        }
    }

    contract.description = parsed.description.clone();
    contract.requires_api = parsed.has("api");
    contract.requires_auth = !parsed.has("no-auth");
    contract.requires_transaction = parsed.has("transaction");
    contract.permission = parsed
        .first("permission")
        .and_then(|text| text.split_whitespace().next())
        .map(str::to_string);

    Ok(contract)
}

/// Parses a field's `@var <type> <text>` doc into `(type, description)`.
///
/// Falls back to `(fallback_type, free text)` when no `@var` line exists.
#[must_use]
pub fn property_doc(doc: Option<&str>, fallback_type: &str) -> (String, String) {
    let parsed = doc.map(DocComment::parse).unwrap_or_default();
    let free_text = parsed.description.clone().unwrap_or_default();
    match parsed.first("var").and_then(split_word) {
        Some((ty, description)) if description.is_empty() => (ty.to_string(), free_text),
        Some((ty, description)) => (ty.to_string(), description.to_string()),
        None => (fallback_type.to_string(), free_text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const FIND_USERS: &str = "Finds users.

Searches by name.
@api
@permission users.read
@transaction
@param string query Search text {validate=notEmpty}
@param int limit Page size
@param array filter Extra filter {element=role|string|Role name, element=active|bool|Only active, or all}
@return array Matching users
@return-element integer total Number of matches
@return-element array users The users";

    fn find_users_params() -> Vec<ParamDescriptor> {
        vec![
            ParamDescriptor::required("query"),
            ParamDescriptor::with_default("limit", || json!(20)),
            ParamDescriptor::optional("filter"),
        ]
    }

    #[test]
    fn test_full_contract() {
        let contract = extract_contract("action_find_users", Some(FIND_USERS), &find_users_params())
            .unwrap();

        assert_eq!(
            contract.description.as_deref(),
            Some("Finds users.\n\nSearches by name.")
        );
        assert!(contract.requires_api);
        assert!(contract.requires_auth);
        assert!(contract.requires_transaction);
        assert_eq!(contract.permission.as_deref(), Some("users.read"));

        let names: Vec<_> = contract.params.keys().cloned().collect();
        assert_eq!(names, ["query", "limit", "filter"]);

        let query = &contract.params["query"];
        assert!(query.required);
        assert_eq!(query.validator.as_deref(), Some("notEmpty"));
        assert_eq!(query.description, "Search text");

        let limit = &contract.params["limit"];
        assert!(!limit.required);
        assert_eq!(limit.default, Some(json!(20)));

        let filter = &contract.params["filter"];
        assert_eq!(filter.default, Some(serde_json::Value::Null));
        assert_eq!(filter.elements["role"], ElementSpec::new("string", "Role name"));
        assert_eq!(
            filter.elements["active"],
            ElementSpec::new("bool", "Only active, or all")
        );

        assert_eq!(contract.returns.ty.as_deref(), Some("array"));
        assert_eq!(contract.returns.description, "Matching users");
        assert_eq!(contract.return_params.len(), 2);
        assert_eq!(contract.return_params["total"].ty, "integer");
    }

    #[test]
    fn test_no_auth_marker() {
        let contract = extract_contract("action_ping", Some("@api\n@no-auth"), &[]).unwrap();
        assert!(!contract.requires_auth);
        assert!(contract.description.is_none());
        assert!(contract.returns.ty.is_none());
    }

    #[test]
    fn test_missing_doc() {
        let err = extract_contract("action_x", None, &[]).unwrap_err();
        assert_eq!(err.code(), "NoDocumentation");
        let err = extract_contract("action_x", Some("  \n "), &[]).unwrap_err();
        assert_eq!(err.code(), "NoDocumentation");
    }

    #[test]
    fn test_param_count_mismatch() {
        let err = extract_contract(
            "action_x",
            Some("@api\n@param int a A"),
            &[ParamDescriptor::required("a"), ParamDescriptor::required("b")],
        )
        .unwrap_err();
        match err {
            RpcError::ContractMismatch { method, reason } => {
                assert_eq!(method, "action_x");
                assert!(reason.contains("2 parameters declared but 1 documented"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_param_name_mismatch() {
        let err = extract_contract(
            "action_x",
            Some("@api\n@param int b B\n@param int a A"),
            &[ParamDescriptor::required("a"), ParamDescriptor::required("b")],
        )
        .unwrap_err();
        assert_eq!(err.code(), "ContractMismatch");
    }

    #[test]
    fn test_dollar_prefix_tolerated() {
        let contract = extract_contract(
            "action_x",
            Some("@param int $userId The user"),
            &[ParamDescriptor::required("userId")],
        )
        .unwrap();
        assert!(contract.params.contains_key("userId"));
        assert!(!contract.requires_api);
    }

    #[test]
    fn test_multiple_returns_rejected() {
        let err = extract_contract("action_x", Some("@return int a\n@return int b"), &[]).unwrap_err();
        assert_eq!(err.code(), "ContractMismatch");
    }

    #[test]
    fn test_continuation_lines() {
        let doc = DocComment::parse("@param string name The\n   full name\n@api");
        assert_eq!(doc.first("param"), Some("string name The full name"));
        assert!(doc.has("api"));
    }

    #[test]
    fn test_property_doc() {
        assert_eq!(
            property_doc(Some("@var bool Whether sessions are used"), "bool"),
            ("bool".to_string(), "Whether sessions are used".to_string())
        );
        assert_eq!(
            property_doc(Some("Plain text"), "String"),
            ("String".to_string(), "Plain text".to_string())
        );
        assert_eq!(property_doc(None, "u32"), ("u32".to_string(), String::new()));
        assert_eq!(
            property_doc(Some("Free text\n@var bool"), "String"),
            ("bool".to_string(), "Free text".to_string())
        );
    }

    proptest! {
        #[test]
        fn documented_count_must_match_declared(documented in 0usize..5, declared in 0usize..5) {
            let names: Vec<&'static str> = ["a", "b", "c", "d", "e"].to_vec();
            let doc: String = std::iter::once("@api".to_string())
                .chain(names.iter().take(documented).map(|n| format!("@param int {n} Value")))
                .collect::<Vec<_>>()
                .join("\n");
            let params: Vec<_> = names.iter().take(declared).map(|n| ParamDescriptor::required(*n)).collect();

            let result = extract_contract("action_x", Some(&doc), &params);
            if documented == declared {
                prop_assert_eq!(result.unwrap().params.len(), declared);
            } else {
                let err = result.unwrap_err();
                prop_assert_eq!(err.code(), "ContractMismatch");
            }
        }
    }
}
