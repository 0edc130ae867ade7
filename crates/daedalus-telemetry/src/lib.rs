//! Observability for Daedalus services.
//!
//! - **Logging**: `tracing-subscriber` setup with JSON or pretty output and
//!   standard field names ([`logging::fields`])
//! - **Metrics**: call counters and durations through the `metrics` facade
//!
//! # Example
//!
//! ```rust,ignore
//! use daedalus_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! daedalus_telemetry::metrics::describe_metrics();
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{fields, init_logging, LogConfig};
pub use crate::metrics::{record_call, record_fault, CallOutcome};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
