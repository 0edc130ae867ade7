//! # Daedalus Pipeline
//!
//! Request dispatcher and response normalizer for Daedalus services.
//!
//! Every call walks a fixed sequence of steps. The order cannot be changed
//! and the first failing step terminates the call:
//!
//! | Step | Name          | Failure                                       |
//! |------|---------------|-----------------------------------------------|
//! | 1    | Bypass        | utility actions skip the remaining steps      |
//! | 2    | Transport     | `NotSecure`, `NotPost`                        |
//! | 3    | Target        | `WrongActionType`, `NoRunMethod`              |
//! | 4    | Body          | `JsonError`, `EmptyRequest`                   |
//! | 5    | Contract      | `ContractMismatch`, `NoDocumentation`         |
//! | 6    | Exposure      | `NotApiEnabled`                               |
//! | 7    | Authorization | `NotLoggedIn`, `AccessDenied`                 |
//! | 8    | Parameters    | `ParamNotFound`, `ParamNotValid`, `ValidatorNotFound` |
//! | 9    | Transaction   | internal error when no manager is configured  |
//!
//! The method result is then normalized: checked against the documented
//! return type, coerced for truthiness and merged into the envelope.
//!
//! ```text
//! InboundCall → Bypass → Transport → Target → Body → Contract → Exposure
//!                                                                   ↓
//! Envelope ← after_call ← method ← Transaction ← Parameters ← Authorization
//! ```
//!
//! ## Example
//!
//! ```
//! use daedalus_core::fixtures::UserDirectory;
//! use daedalus_pipeline::{Dispatcher, InboundCall};
//!
//! let dispatcher = Dispatcher::builder(UserDirectory::new()).build();
//! let reply = dispatcher.handle(InboundCall::post("get-user", r#"{"userId": 2}"#));
//!
//! let envelope = reply.envelope().unwrap();
//! assert!(!envelope.has_errors());
//! assert_eq!(envelope.fields()["name"], "alice");
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-pipeline/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod call;
pub mod dispatcher;
pub mod envelope;
pub mod hook;
pub mod normalize;
pub mod ping;
pub mod step;

pub use call::InboundCall;
pub use dispatcher::{
    DispatchOptions, Dispatcher, DispatcherBuilder, DEFINITION_ACTION, DOCUMENTATION_ACTION,
    HANDLE_ERROR_ACTION,
};
pub use envelope::{Envelope, Reply, JSON_CONTENT_TYPE, TEXT_CONTENT_TYPE};
pub use hook::{ErrorHook, FaultKind, FaultReport, GENERIC_MESSAGE};
pub use normalize::{after_call, result_fields};
pub use ping::{PingAction, PING_ACTION};
pub use step::Step;
