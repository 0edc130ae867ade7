//! Plain-text documentation page.
//!
//! The page is rendered from a [`ServiceDefinition`] alone, so the output is
//! fully determined by the definition: methods appear in lexicographic order,
//! properties and constants in declaration order.

use crate::definition::ServiceDefinition;
use daedalus_core::{ElementSpec, ErrorCode, MethodContract};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt::{self, Write as _};

const STATELESS_AUTH: &str = "\
The service is stateless. Every request that calls a method requiring
authentication must carry its own credentials in the request body, the
server keeps no session between calls.";

const SESSION_AUTH: &str = "\
The service uses sessions. Log in first; the session cookie returned by the
server authenticates every following request.";

/// Renders the documentation page of a service.
///
/// # Example
///
/// ```
/// use daedalus_core::fixtures::UserDirectory;
/// use daedalus_core::{ActionMap, ContractCache};
/// use daedalus_docs::{describe, render_docs};
///
/// let definition = describe(&UserDirectory::new(), &ActionMap::new(), &ContractCache::new()).unwrap();
/// let page = render_docs(&definition);
/// assert!(page.starts_with("UserDirectory\n"));
/// assert!(page.contains("USER_NOT_FOUND"));
/// ```
#[must_use]
pub fn render_docs(definition: &ServiceDefinition) -> String {
    DocsPage(definition).to_string()
}

/// [`Display`](fmt::Display) adapter over a definition.
#[derive(Debug, Clone, Copy)]
pub struct DocsPage<'a>(pub &'a ServiceDefinition);

impl fmt::Display for DocsPage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let definition = self.0;

        heading(f, &definition.short_name, '=')?;
        if let Some(description) = &definition.description {
            writeln!(f, "{description}")?;
            writeln!(f)?;
        }

        heading(f, "Usage", '-')?;
        writeln!(f, "Call a method with an HTTP POST request to")?;
        writeln!(f, "    {}/<method>", definition.base_route.trim_end_matches('/'))?;
        writeln!(f, "The request body is a JSON object keyed by parameter name.")?;
        writeln!(f, "Every response is a JSON object with \"hasErrors\" and \"errors\"")?;
        writeln!(f, "(a list of {{\"message\", \"code\"}}); a successful call adds the fields")?;
        writeln!(f, "of the method result.")?;
        writeln!(f)?;

        heading(f, "Authentication", '-')?;
        writeln!(
            f,
            "{}",
            if definition.is_stateless() {
                STATELESS_AUTH
            } else {
                SESSION_AUTH
            }
        )?;
        writeln!(f, "Methods marked \"no authentication\" accept anonymous callers.")?;
        writeln!(f)?;

        heading(f, "Error codes", '-')?;
        writeln!(f, "Framework:")?;
        for code in ErrorCode::ALL {
            writeln!(f, "  {:<24} {}", code.as_str(), code.summary())?;
        }
        if !definition.error_codes.is_empty() {
            writeln!(f, "Service:")?;
            for code in &definition.error_codes {
                writeln!(f, "  {code}")?;
            }
        }
        writeln!(f)?;

        if !definition.properties.is_empty() {
            heading(f, "Properties", '-')?;
            for (name, property) in &definition.properties {
                write!(f, "  {name} ({})", property.ty)?;
                if let Some(value) = &property.value {
                    write!(f, " = {}", inline_value(value))?;
                }
                writeln!(f)?;
                if !property.description.is_empty() {
                    writeln!(f, "      {}", property.description)?;
                }
            }
            writeln!(f)?;
        }

        if !definition.constants.is_empty() {
            heading(f, "Constants", '-')?;
            for (name, value) in &definition.constants {
                writeln!(f, "  {name} = {}", inline_value(value))?;
            }
            writeln!(f)?;
        }

        heading(f, "Methods", '-')?;
        if definition.methods.is_empty() {
            writeln!(f, "The service exposes no methods.")?;
        }
        for (id, contract) in &definition.methods {
            method_block(f, id, contract)?;
        }
        Ok(())
    }
}

fn heading(f: &mut fmt::Formatter<'_>, title: &str, underline: char) -> fmt::Result {
    writeln!(f, "{title}")?;
    let line: String = std::iter::repeat(underline).take(title.chars().count()).collect();
    writeln!(f, "{line}")?;
    writeln!(f)
}

fn method_block(f: &mut fmt::Formatter<'_>, id: &str, contract: &MethodContract) -> fmt::Result {
    writeln!(f, "{id}")?;
    if let Some(description) = &contract.description {
        for line in description.lines() {
            writeln!(f, "  {line}")?;
        }
    }
    writeln!(
        f,
        "  Authentication: {}",
        if contract.requires_auth {
            "required"
        } else {
            "no authentication"
        }
    )?;
    if let Some(permission) = &contract.permission {
        writeln!(f, "  Permission: {permission}")?;
    }
    if contract.requires_transaction {
        writeln!(f, "  Runs in a transaction")?;
    }

    if contract.params.is_empty() {
        writeln!(f, "  Parameters: none")?;
    } else {
        writeln!(f, "  Parameters:")?;
        for (name, spec) in &contract.params {
            let mut flags = String::from(if spec.required { "required" } else { "optional" });
            if let Some(default) = spec.default.as_ref().filter(|v| !v.is_null()) {
                write!(flags, ", default {}", inline_value(default))?;
            }
            if let Some(validator) = &spec.validator {
                write!(flags, ", validator {validator}")?;
            }
            writeln!(f, "    {name} ({}, {flags}) {}", spec.ty, spec.description)?;
            elements(f, &spec.elements, "      ")?;
        }
    }

    match &contract.returns.ty {
        Some(ty) => writeln!(f, "  Returns: {ty} {}", contract.returns.description)?,
        None => writeln!(f, "  Returns: nothing declared")?,
    }
    elements(f, &contract.return_params, "    ")?;
    writeln!(f)
}

fn elements(f: &mut fmt::Formatter<'_>, elements: &IndexMap<String, ElementSpec>, indent: &str) -> fmt::Result {
    for (name, element) in elements {
        writeln!(f, "{indent}.{name} ({}) {}", element.ty, element.description)?;
    }
    Ok(())
}

fn inline_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::describe;
    use daedalus_core::fixtures::UserDirectory;
    use daedalus_core::{ActionMap, ContractCache};

    fn page(stateless: bool) -> String {
        let service = UserDirectory::new().stateless(stateless);
        let definition = describe(&service, &ActionMap::new(), &ContractCache::new()).unwrap();
        render_docs(&definition)
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(page(false), page(false));
    }

    #[test]
    fn test_render_auth_blurb_follows_stateless() {
        assert!(page(true).contains("The service is stateless."));
        assert!(page(false).contains("The service uses sessions."));
    }

    #[test]
    fn test_render_lists_all_framework_codes() {
        let page = page(false);
        for code in ErrorCode::ALL {
            assert!(page.contains(code.as_str()), "missing {code}");
        }
        assert!(page.contains("Service:\n  USER_NOT_FOUND\n  USER_PROTECTED\n"));
    }

    #[test]
    fn test_render_method_blocks_in_order() {
        let page = page(false);
        let delete = page.find("\ndelete-user\n").unwrap();
        let find = page.find("\nfind-users\n").unwrap();
        let get = page.find("\nget-user\n").unwrap();
        assert!(delete < find && find < get);
        assert!(!page.contains("\nstats\n"));
    }

    #[test]
    fn test_render_parameters_and_return_elements() {
        let page = page(false);
        assert!(page.contains("    userId (int, required, validator positive) Identifier of the user"));
        assert!(page.contains("    limit (int, optional, default 20, validator positive) Page size"));
        assert!(page.contains("  Permission: users.read"));
        assert!(page.contains("  Runs in a transaction"));
        assert!(page.contains("    .name (string) Display name"));
        assert!(page.contains("  stateless (bool) = false"));
        assert!(page.contains("  MAX_PAGE = 100"));
        assert!(page.contains("    /user-directory/<method>"));
    }
}
