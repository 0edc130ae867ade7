//! Error hook for unexpected faults.
//!
//! Internal errors returned by a method and panics caught at the dispatcher
//! boundary end up here. The hook logs the fault with its full context,
//! echoing the request body only in debug mode, and produces the entry shown
//! to the caller: a generic message unless details are exposed.
//!
//! The most recent fault is kept for the `handle-error` utility action.

use daedalus_core::{CallContext, ErrorCode, ErrorEntry, RequestId, RpcError, Translator};
use parking_lot::Mutex;
use std::any::Any;

/// Message shown to callers when fault details are hidden.
pub const GENERIC_MESSAGE: &str = "An internal error occurred";

/// Kind of an unexpected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// A method returned an internal error.
    Error,
    /// A method panicked.
    Panic,
}

impl FaultKind {
    /// Returns the kind name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Panic => "panic",
        }
    }
}

/// A fault as recorded by the hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    /// Request the fault happened in.
    pub request_id: RequestId,
    /// Action id of the call.
    pub action: String,
    /// Error or panic.
    pub kind: FaultKind,
    /// Full fault message.
    pub message: String,
    /// Request body, kept in debug mode only.
    pub request_body: Option<String>,
    /// Entry reported to the caller.
    pub entry: ErrorEntry,
}

/// The process-wide error hook of a dispatcher.
#[derive(Debug, Default)]
pub struct ErrorHook {
    debug: bool,
    expose: bool,
    last: Mutex<Option<FaultReport>>,
}

impl ErrorHook {
    /// Creates a hook.
    ///
    /// Fault details reach the caller when `debug` or `expose` is set.
    #[must_use]
    pub fn new(debug: bool, expose: bool) -> Self {
        Self {
            debug,
            expose,
            last: Mutex::new(None),
        }
    }

    /// Handles an internal error returned by a method.
    pub fn on_error(
        &self,
        ctx: &CallContext,
        error: &RpcError,
        body: &[u8],
        translator: &dyn Translator,
    ) -> ErrorEntry {
        let mut message = error.to_string();
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        self.record(ctx, FaultKind::Error, message, body, translator)
    }

    /// Handles a panic payload caught with `catch_unwind`.
    pub fn on_panic(
        &self,
        ctx: &CallContext,
        payload: &(dyn Any + Send),
        body: &[u8],
        translator: &dyn Translator,
    ) -> ErrorEntry {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with a non-string payload".to_string());
        self.record(ctx, FaultKind::Panic, message, body, translator)
    }

    /// Returns the most recent fault.
    #[must_use]
    pub fn last_fault(&self) -> Option<FaultReport> {
        self.last.lock().clone()
    }

    fn record(
        &self,
        ctx: &CallContext,
        kind: FaultKind,
        message: String,
        body: &[u8],
        translator: &dyn Translator,
    ) -> ErrorEntry {
        let request_body = self
            .debug
            .then(|| String::from_utf8_lossy(body).into_owned());

        tracing::error!(
            request_id = %ctx.request_id(),
            action = ctx.action(),
            caller = %ctx.identity().log_id(),
            kind = kind.as_str(),
            body = request_body.as_deref(),
            "{message}"
        );
        daedalus_telemetry::record_fault(kind.as_str());

        let shown = if self.debug || self.expose {
            message.clone()
        } else {
            translator.translate(GENERIC_MESSAGE, &[])
        };
        let entry = ErrorEntry::new(shown, ErrorCode::InternalError.as_str());

        *self.last.lock() = Some(FaultReport {
            request_id: ctx.request_id(),
            action: ctx.action().to_string(),
            kind,
            message,
            request_body,
            entry: entry.clone(),
        });
        entry
    }
}
