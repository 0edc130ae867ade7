//! # Daedalus Client
//!
//! Outbound client for calling a remote Daedalus service over HTTP.
//!
//! [`ApiClient::send`] merges the [`AuthProvider`] credentials into the
//! parameters, POSTs them as JSON to `host + api_path + action` and tries
//! each configured host until one answers. [`ApiResult`] gives a typed view
//! of the reply envelope.
//!
//! ```no_run
//! use daedalus_client::ApiClient;
//! use daedalus_config::ClientSection;
//! use serde_json::{Map, Value};
//!
//! # async fn demo() -> Result<(), daedalus_client::ClientError> {
//! let client = ApiClient::new(&ClientSection {
//!     hosts: vec!["https://api.example.com".into()],
//!     ..ClientSection::default()
//! })?;
//!
//! if client.ping().await {
//!     let users = client.call::<Map<String, Value>>("find-users", Map::new()).await?;
//!     println!("{}", users.error_string());
//! }
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-client/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod result;

pub use client::{ApiClient, AuthProvider, NoAuth, StaticAuth};
pub use error::{ClientError, ClientResult};
pub use result::{ApiError, ApiResult};
