//! Message translation.
//!
//! Error messages are looked up by their English template (the key) and
//! `{name}` placeholders are substituted afterwards. The default
//! [`PassthroughTranslator`] keeps the English text; [`Catalog`] maps keys
//! to another language and falls back to the key when a translation is
//! missing.

use std::collections::HashMap;

/// Translation lookup used when rendering error messages.
pub trait Translator: Send + Sync {
    /// Translates `key` and substitutes `{name}` placeholders from `args`.
    fn translate(&self, key: &str, args: &[(&str, &str)]) -> String;
}

/// Keeps messages in English.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranslator;

impl Translator for PassthroughTranslator {
    fn translate(&self, key: &str, args: &[(&str, &str)]) -> String {
        interpolate(key, args)
    }
}

/// A static message catalog keyed by English templates.
///
/// # Example
///
/// ```
/// use daedalus_core::i18n::{Catalog, Translator};
///
/// let catalog = Catalog::new("de").with_message("User is not logged in", "Benutzer ist nicht angemeldet");
/// assert_eq!(catalog.translate("User is not logged in", &[]), "Benutzer ist nicht angemeldet");
/// assert_eq!(catalog.translate("Unknown {x}", &[("x", "key")]), "Unknown key");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    language: String,
    messages: HashMap<String, String>,
}

impl Catalog {
    /// Creates an empty catalog for `language`.
    #[must_use]
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            messages: HashMap::new(),
        }
    }

    /// Adds a translation.
    #[must_use]
    pub fn with_message(mut self, key: impl Into<String>, translation: impl Into<String>) -> Self {
        self.messages.insert(key.into(), translation.into());
        self
    }

    /// Returns the catalog language code.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Returns the number of translations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if the catalog has no translations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The bundled Czech catalog of framework messages.
    #[must_use]
    pub fn czech() -> Self {
        CZECH
            .iter()
            .fold(Self::new("cs"), |catalog, (key, value)| {
                catalog.with_message(*key, *value)
            })
    }
}

impl Translator for Catalog {
    fn translate(&self, key: &str, args: &[(&str, &str)]) -> String {
        let template = self.messages.get(key).map_or(key, String::as_str);
        interpolate(template, args)
    }
}

/// Substitutes `{name}` placeholders. Unknown placeholders are left as-is.
#[must_use]
pub fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{name}}}"), value)
    })
}

const CZECH: &[(&str, &str)] = &[
    (
        "Action {action} is neither an inline method nor an attached action",
        "Akce {action} není metodou ani připojenou akcí",
    ),
    (
        "Contract of method {method} does not match its signature: {reason}",
        "Dokumentace metody {method} neodpovídá její hlavičce: {reason}",
    ),
    (
        "Input parameter {param} not found",
        "Nebyl nalezen vstupní parametr {param}",
    ),
    (
        "Method has no documentation comment",
        "Metoda neobsahuje dokumentační komentář",
    ),
    (
        "Method is not intended for use via API",
        "Metoda není určena pro použití v API",
    ),
    (
        "Method return type ({t1}) differs from API return type ({t2})",
        "Návratový typ metody ({t1}) se neshoduje s dokumentovaným typem ({t2})",
    ),
    (
        "Method return type ({type}) is not supported",
        "Návratový typ metody ({type}) není podporován",
    ),
    (
        "Method returned boolean false",
        "Metoda skončila s výsledkem boolean false",
    ),
    (
        "Parameter {param} is not valid (validator {validator})",
        "Parametr {param} není platný (ověření {validator})",
    ),
    (
        "Request body is empty",
        "Tělo požadavku je prázdné",
    ),
    (
        "Request body is not a valid JSON object: {reason}",
        "Tělo požadavku není platný JSON objekt: {reason}",
    ),
    (
        "Request is not secure (over HTTPS)",
        "Požadavek není bezpečný (přes HTTPS)",
    ),
    ("Request method must be POST", "Typ požadavku musí být POST"),
    (
        "Run method is not defined for this action",
        "Pro tuto akci není definována metoda run",
    ),
    ("User is not logged in", "Uživatel není přihlášen"),
    (
        "Validator {validator} method not found",
        "Metoda ověření {validator} nebyla nalezena",
    ),
    (
        "You have not permission to run this action",
        "Nemáte oprávnění k použití této metody",
    ),
    ("An internal error occurred", "Došlo k interní chybě"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_multiple() {
        let text = interpolate("{a} and {b} and {a}", &[("a", "1"), ("b", "2")]);
        assert_eq!(text, "1 and 2 and 1");
    }

    #[test]
    fn test_interpolate_unknown_placeholder_kept() {
        assert_eq!(interpolate("hello {who}", &[]), "hello {who}");
    }

    #[test]
    fn test_czech_catalog_translates_with_args() {
        let catalog = Catalog::czech();
        assert_eq!(catalog.language(), "cs");
        assert_eq!(
            catalog.translate("Input parameter {param} not found", &[("param", "userId")]),
            "Nebyl nalezen vstupní parametr userId"
        );
    }

    #[test]
    fn test_catalog_falls_back_to_key() {
        let catalog = Catalog::czech();
        assert_eq!(catalog.translate("Order is closed", &[]), "Order is closed");
    }

    #[test]
    fn test_czech_translations_keep_placeholders() {
        let placeholder = regex::Regex::new(r"\{[a-z0-9]+\}").unwrap();
        for (key, value) in CZECH {
            for found in placeholder.find_iter(key) {
                assert!(
                    value.contains(found.as_str()),
                    "translation of {key:?} lost {}",
                    found.as_str()
                );
            }
        }
    }
}
