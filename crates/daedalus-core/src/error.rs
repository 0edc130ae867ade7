//! Error types for Daedalus.
//!
//! This module provides the [`RpcError`] type, the single error type threaded
//! through every pipeline stage, and [`ErrorEntry`], the `{message, code}`
//! pair that ends up in the response envelope.
//!
//! # Error codes
//!
//! Every framework error maps to a stable, machine-readable [`ErrorCode`].
//! Codes are serialized with their PascalCase names:
//!
//! | Category | Codes |
//! |---|---|
//! | `Transport` | `NotSecure`, `NotPost`, `WrongActionType`, `NoRunMethod` |
//! | `Parsing` | `EmptyRequest`, `JsonError` |
//! | `Contract` | `NoDocumentation`, `ContractMismatch` |
//! | `Authorization` | `NotApiEnabled`, `NotLoggedIn`, `AccessDenied` |
//! | `Validation` | `ParamNotFound`, `ParamNotValid`, `ValidatorNotFound` |
//! | `Output` | `ReturnTypeMismatch`, `ReturnTypeNotSupported`, `ReturnValueFalse` |
//! | `Internal` | `InternalError` |
//!
//! Services may raise their own codes through [`RpcError::custom`].

use crate::i18n::Translator;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`RpcError`].
pub type RpcResult<T> = Result<T, RpcError>;

/// Categories of errors for classification and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Transport and dispatch preconditions.
    Transport,
    /// Request body parsing.
    Parsing,
    /// Contract extraction integrity.
    Contract,
    /// Exposure, authentication and permission checks.
    Authorization,
    /// Input parameter validation.
    Validation,
    /// Output contract violations.
    Output,
    /// Service-defined business errors.
    Service,
    /// Unexpected internal faults.
    Internal,
}

impl ErrorCategory {
    /// Returns `true` for errors caused by the caller or by the service
    /// definition, as opposed to unexpected faults.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        !matches!(self, Self::Internal)
    }
}

/// Stable machine-readable codes of the framework error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The inbound connection is not secure.
    NotSecure,
    /// The inbound request method is not POST.
    NotPost,
    /// The action id resolves to neither an inline method nor an attached action.
    WrongActionType,
    /// An attached action has no public `run` entry point.
    NoRunMethod,
    /// The request body is empty.
    EmptyRequest,
    /// The request body is not a JSON object.
    JsonError,
    /// The method carries no documentation comment.
    NoDocumentation,
    /// The documented parameters do not match the method signature.
    ContractMismatch,
    /// The method is not exposed through the API.
    NotApiEnabled,
    /// The caller is not authenticated.
    NotLoggedIn,
    /// The caller lacks the permission required by the method.
    AccessDenied,
    /// A required parameter is missing from the request body.
    ParamNotFound,
    /// A parameter failed its validator.
    ParamNotValid,
    /// A documented validator is not registered.
    ValidatorNotFound,
    /// The runtime return type differs from the documented one.
    ReturnTypeMismatch,
    /// The runtime return type cannot be rendered.
    ReturnTypeNotSupported,
    /// The method returned a falsy value.
    ReturnValueFalse,
    /// An unexpected internal fault.
    InternalError,
}

impl ErrorCode {
    /// Every code of the taxonomy, in declaration order.
    pub const ALL: [Self; 18] = [
        Self::NotSecure,
        Self::NotPost,
        Self::WrongActionType,
        Self::NoRunMethod,
        Self::EmptyRequest,
        Self::JsonError,
        Self::NoDocumentation,
        Self::ContractMismatch,
        Self::NotApiEnabled,
        Self::NotLoggedIn,
        Self::AccessDenied,
        Self::ParamNotFound,
        Self::ParamNotValid,
        Self::ValidatorNotFound,
        Self::ReturnTypeMismatch,
        Self::ReturnTypeNotSupported,
        Self::ReturnValueFalse,
        Self::InternalError,
    ];

    /// Returns the wire representation of the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotSecure => "NotSecure",
            Self::NotPost => "NotPost",
            Self::WrongActionType => "WrongActionType",
            Self::NoRunMethod => "NoRunMethod",
            Self::EmptyRequest => "EmptyRequest",
            Self::JsonError => "JsonError",
            Self::NoDocumentation => "NoDocumentation",
            Self::ContractMismatch => "ContractMismatch",
            Self::NotApiEnabled => "NotApiEnabled",
            Self::NotLoggedIn => "NotLoggedIn",
            Self::AccessDenied => "AccessDenied",
            Self::ParamNotFound => "ParamNotFound",
            Self::ParamNotValid => "ParamNotValid",
            Self::ValidatorNotFound => "ValidatorNotFound",
            Self::ReturnTypeMismatch => "ReturnTypeMismatch",
            Self::ReturnTypeNotSupported => "ReturnTypeNotSupported",
            Self::ReturnValueFalse => "ReturnValueFalse",
            Self::InternalError => "InternalError",
        }
    }

    /// Returns the category of the code.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotSecure | Self::NotPost | Self::WrongActionType | Self::NoRunMethod => {
                ErrorCategory::Transport
            }
            Self::EmptyRequest | Self::JsonError => ErrorCategory::Parsing,
            Self::NoDocumentation | Self::ContractMismatch => ErrorCategory::Contract,
            Self::NotApiEnabled | Self::NotLoggedIn | Self::AccessDenied => {
                ErrorCategory::Authorization
            }
            Self::ParamNotFound | Self::ParamNotValid | Self::ValidatorNotFound => {
                ErrorCategory::Validation
            }
            Self::ReturnTypeMismatch | Self::ReturnTypeNotSupported | Self::ReturnValueFalse => {
                ErrorCategory::Output
            }
            Self::InternalError => ErrorCategory::Internal,
        }
    }

    /// One-line description used by the documentation export.
    #[must_use]
    pub const fn summary(&self) -> &'static str {
        match self {
            Self::NotSecure => "Request is not secure (over HTTPS)",
            Self::NotPost => "Request method must be POST",
            Self::WrongActionType => "Action is neither an inline method nor an attached action",
            Self::NoRunMethod => "Run method is not defined for this action",
            Self::EmptyRequest => "Request body is empty",
            Self::JsonError => "Request body is not a valid JSON object",
            Self::NoDocumentation => "Method has no documentation comment",
            Self::ContractMismatch => "Documented parameters differ from the method signature",
            Self::NotApiEnabled => "Method is not intended for use via API",
            Self::NotLoggedIn => "User is not logged in",
            Self::AccessDenied => "You have not permission to run this action",
            Self::ParamNotFound => "Required input parameter not found",
            Self::ParamNotValid => "Input parameter is not valid",
            Self::ValidatorNotFound => "Validator not found",
            Self::ReturnTypeMismatch => "Method return type differs from API return type",
            Self::ReturnTypeNotSupported => "Method return type is not supported",
            Self::ReturnValueFalse => "Method returned boolean false",
            Self::InternalError => "An internal error occurred",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard error type for Daedalus.
///
/// Every failure of a call, whether raised by a pipeline stage or returned by
/// the method body, is an `RpcError`. Each variant carries enough context to
/// render a translated message for the envelope.
///
/// # Example
///
/// ```
/// use daedalus_core::{RpcError, ErrorCode};
///
/// let error = RpcError::ParamNotFound { param: "userId".to_string() };
/// assert_eq!(error.code(), "ParamNotFound");
/// assert_eq!(error.error_code(), Some(ErrorCode::ParamNotFound));
/// ```
#[derive(Error, Debug)]
pub enum RpcError {
    /// The inbound connection is not secure.
    #[error("Request is not secure (over HTTPS)")]
    NotSecure,

    /// The inbound request method is not POST.
    #[error("Request method must be POST")]
    NotPost,

    /// The action id resolves to neither shape of callable.
    #[error("Action {action} is neither an inline method nor an attached action")]
    WrongActionType {
        /// The requested action id.
        action: String,
    },

    /// An attached action lacks its public entry point.
    #[error("Run method is not defined for action {action}")]
    NoRunMethod {
        /// The requested action id.
        action: String,
    },

    /// The request body is empty.
    #[error("Request body is empty")]
    EmptyRequest,

    /// The request body could not be decoded into a JSON object.
    #[error("Request body is not a valid JSON object: {reason}")]
    JsonError {
        /// Decoder message.
        reason: String,
    },

    /// The method has no documentation comment.
    #[error("Method {method} has no documentation comment")]
    NoDocumentation {
        /// The method name.
        method: String,
    },

    /// The documented contract does not match the method signature.
    #[error("Contract of method {method} does not match its signature: {reason}")]
    ContractMismatch {
        /// The offending method name.
        method: String,
        /// What did not match.
        reason: String,
    },

    /// The method is not exposed through the API.
    #[error("Method {method} is not intended for use via API")]
    NotApiEnabled {
        /// The method name.
        method: String,
    },

    /// The caller is not authenticated.
    #[error("User is not logged in")]
    NotLoggedIn,

    /// The caller lacks the required permission.
    #[error("You have not permission to run this action (requires {permission})")]
    AccessDenied {
        /// The permission that was denied.
        permission: String,
    },

    /// A required parameter is missing.
    #[error("Input parameter {param} not found")]
    ParamNotFound {
        /// The parameter name.
        param: String,
    },

    /// A parameter failed validation.
    #[error("Parameter {param} is not valid (validator {validator})")]
    ParamNotValid {
        /// The parameter name.
        param: String,
        /// The validator that rejected it.
        validator: String,
    },

    /// A documented validator is not registered.
    #[error("Validator {validator} method not found")]
    ValidatorNotFound {
        /// The validator name.
        validator: String,
    },

    /// The runtime return type differs from the documented one.
    #[error("Method return type ({actual}) differs from API return type ({declared})")]
    ReturnTypeMismatch {
        /// The documented type (canonical).
        declared: String,
        /// The runtime type.
        actual: String,
    },

    /// The runtime return type cannot be rendered.
    #[error("Method return type ({actual}) is not supported")]
    ReturnTypeNotSupported {
        /// The runtime type.
        actual: String,
    },

    /// The method returned a falsy value.
    #[error("Method returned boolean false")]
    ReturnValueFalse,

    /// A service-defined business error.
    #[error("{message}")]
    Custom {
        /// Machine-readable code chosen by the service.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// An unexpected internal fault.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl RpcError {
    /// Creates a service-defined error with its own code.
    ///
    /// Codes raised this way are picked up by the documentation export.
    #[must_use]
    pub fn custom(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Custom {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the taxonomy code, or `None` for service-defined errors.
    #[must_use]
    pub const fn error_code(&self) -> Option<ErrorCode> {
        Some(match self {
            Self::NotSecure => ErrorCode::NotSecure,
            Self::NotPost => ErrorCode::NotPost,
            Self::WrongActionType { .. } => ErrorCode::WrongActionType,
            Self::NoRunMethod { .. } => ErrorCode::NoRunMethod,
            Self::EmptyRequest => ErrorCode::EmptyRequest,
            Self::JsonError { .. } => ErrorCode::JsonError,
            Self::NoDocumentation { .. } => ErrorCode::NoDocumentation,
            Self::ContractMismatch { .. } => ErrorCode::ContractMismatch,
            Self::NotApiEnabled { .. } => ErrorCode::NotApiEnabled,
            Self::NotLoggedIn => ErrorCode::NotLoggedIn,
            Self::AccessDenied { .. } => ErrorCode::AccessDenied,
            Self::ParamNotFound { .. } => ErrorCode::ParamNotFound,
            Self::ParamNotValid { .. } => ErrorCode::ParamNotValid,
            Self::ValidatorNotFound { .. } => ErrorCode::ValidatorNotFound,
            Self::ReturnTypeMismatch { .. } => ErrorCode::ReturnTypeMismatch,
            Self::ReturnTypeNotSupported { .. } => ErrorCode::ReturnTypeNotSupported,
            Self::ReturnValueFalse => ErrorCode::ReturnValueFalse,
            Self::Internal { .. } => ErrorCode::InternalError,
            Self::Custom { .. } => return None,
        })
    }

    /// Returns the machine-readable code placed in the envelope.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Custom { code, .. } => code,
            other => other
                .error_code()
                .map_or("InternalError", |code| code.as_str()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self.error_code() {
            Some(code) => code.category(),
            None => ErrorCategory::Service,
        }
    }

    /// Returns `true` for unexpected internal faults.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        !self.category().is_caller_error()
    }

    /// Returns the translation key and its interpolation arguments.
    ///
    /// Keys are the English message templates; a [`Translator`] maps them to
    /// the target language and substitutes `{name}` placeholders.
    #[must_use]
    pub fn message_template(&self) -> (&str, Vec<(&'static str, String)>) {
        match self {
            Self::NotSecure => ("Request is not secure (over HTTPS)", Vec::new()),
            Self::NotPost => ("Request method must be POST", Vec::new()),
            Self::WrongActionType { action } => (
                "Action {action} is neither an inline method nor an attached action",
                vec![("action", action.clone())],
            ),
            Self::NoRunMethod { .. } => ("Run method is not defined for this action", Vec::new()),
            Self::EmptyRequest => ("Request body is empty", Vec::new()),
            Self::JsonError { reason } => (
                "Request body is not a valid JSON object: {reason}",
                vec![("reason", reason.clone())],
            ),
            Self::NoDocumentation { .. } => ("Method has no documentation comment", Vec::new()),
            Self::ContractMismatch { method, reason } => (
                "Contract of method {method} does not match its signature: {reason}",
                vec![("method", method.clone()), ("reason", reason.clone())],
            ),
            Self::NotApiEnabled { .. } => ("Method is not intended for use via API", Vec::new()),
            Self::NotLoggedIn => ("User is not logged in", Vec::new()),
            Self::AccessDenied { .. } => ("You have not permission to run this action", Vec::new()),
            Self::ParamNotFound { param } => (
                "Input parameter {param} not found",
                vec![("param", param.clone())],
            ),
            Self::ParamNotValid { param, validator } => (
                "Parameter {param} is not valid (validator {validator})",
                vec![("param", param.clone()), ("validator", validator.clone())],
            ),
            Self::ValidatorNotFound { validator } => (
                "Validator {validator} method not found",
                vec![("validator", validator.clone())],
            ),
            Self::ReturnTypeMismatch { declared, actual } => (
                "Method return type ({t1}) differs from API return type ({t2})",
                vec![("t1", actual.clone()), ("t2", declared.clone())],
            ),
            Self::ReturnTypeNotSupported { actual } => (
                "Method return type ({type}) is not supported",
                vec![("type", actual.clone())],
            ),
            Self::ReturnValueFalse => ("Method returned boolean false", Vec::new()),
            Self::Custom { message, .. } => (message.as_str(), Vec::new()),
            Self::Internal { message, .. } => (message.as_str(), Vec::new()),
        }
    }

    /// Converts this error into an envelope entry using the given translator.
    #[must_use]
    pub fn to_entry(&self, translator: &dyn Translator) -> ErrorEntry {
        let (key, args) = self.message_template();
        let args: Vec<(&str, &str)> = args.iter().map(|(k, v)| (*k, v.as_str())).collect();
        ErrorEntry::new(translator.translate(key, &args), self.code())
    }
}

impl From<anyhow::Error> for RpcError {
    fn from(source: anyhow::Error) -> Self {
        Self::Internal {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// One `{message, code}` pair of the envelope's `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Human-readable (translated) message.
    pub message: String,
    /// Machine-readable code.
    pub code: String,
}

impl ErrorEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{Catalog, PassthroughTranslator};

    #[test]
    fn test_codes_match_variant_names() {
        for code in ErrorCode::ALL {
            let json = serde_json::to_string(&code).expect("serialization should work");
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_custom_error_keeps_its_code() {
        let error = RpcError::custom("USER_BLOCKED", "User is blocked");
        assert_eq!(error.code(), "USER_BLOCKED");
        assert_eq!(error.error_code(), None);
        assert_eq!(error.category(), ErrorCategory::Service);
        assert_eq!(error.to_string(), "User is blocked");
    }

    #[test]
    fn test_internal_error_from_anyhow() {
        let error: RpcError = anyhow::anyhow!("db connection lost").into();
        assert!(error.is_internal());
        assert_eq!(error.code(), "InternalError");
        assert!(!error.category().is_caller_error());
    }

    #[test]
    fn test_entry_interpolates_arguments() {
        let error = RpcError::ParamNotValid {
            param: "age".to_string(),
            validator: "numeric".to_string(),
        };
        let entry = error.to_entry(&PassthroughTranslator);
        assert_eq!(entry.code, "ParamNotValid");
        assert_eq!(entry.message, "Parameter age is not valid (validator numeric)");
    }

    #[test]
    fn test_entry_translated_with_catalog() {
        let error = RpcError::NotLoggedIn;
        let entry = error.to_entry(&Catalog::czech());
        assert_eq!(entry.message, "Uživatel není přihlášen");
        assert_eq!(entry.code, "NotLoggedIn");
    }

    #[test]
    fn test_return_type_mismatch_names_both_types() {
        let error = RpcError::ReturnTypeMismatch {
            declared: "array".to_string(),
            actual: "boolean".to_string(),
        };
        let message = error.to_entry(&PassthroughTranslator).message;
        assert!(message.contains("(boolean)"));
        assert!(message.contains("(array)"));
    }

    #[test]
    fn test_categories_cover_taxonomy() {
        let transport = ErrorCode::ALL
            .iter()
            .filter(|c| c.category() == ErrorCategory::Transport)
            .count();
        assert_eq!(transport, 4);
        assert_eq!(ErrorCode::ReturnValueFalse.category(), ErrorCategory::Output);
    }
}
