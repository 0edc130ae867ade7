//! # Daedalus Test
//!
//! Test utilities for Daedalus services. Calls are dispatched in memory
//! through the real [`Dispatcher`](daedalus_pipeline::Dispatcher), so the
//! full validation pipeline runs without a network or a host framework.
//!
//! ## Example
//!
//! ```
//! use daedalus_core::fixtures::UserDirectory;
//! use daedalus_test::TestClient;
//! use serde_json::json;
//!
//! let client = TestClient::from_service(UserDirectory::new());
//!
//! client
//!     .call("get-user")
//!     .param("userId", 2)
//!     .send()
//!     .assert_success()
//!     .assert_field("name", &json!("alice"));
//!
//! client.call("get-user").send().assert_error("ParamNotFound");
//! client.call("get-user").param("userId", 2).insecure().send().assert_error("NotSecure");
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod response;

pub use client::{TestCall, TestClient};
pub use error::TestError;
pub use response::TestResponse;
