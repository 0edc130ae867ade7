//! # Daedalus Docs
//!
//! Service definitions and documentation for Daedalus services.
//!
//! This crate provides:
//! - **Service definitions**: [`describe`] snapshots the `@api` contracts,
//!   public properties and constants of a service
//! - **Documentation**: [`render_docs`] turns a definition into a
//!   deterministic plain-text page
//! - **Error code scanning**: [`scan_error_codes`] finds the custom codes a
//!   service raises
//!
//! ## Quick Start
//!
//! ```rust
//! use daedalus_core::fixtures::UserDirectory;
//! use daedalus_core::{ActionMap, ContractCache};
//! use daedalus_docs::{describe, render_docs};
//!
//! let service = UserDirectory::new();
//! let definition = describe(&service, &ActionMap::new(), &ContractCache::new())?;
//!
//! let methods = definition.methods_document()?;
//! assert!(methods["methods"]["get-user"]["requiresApi"].as_bool().unwrap());
//!
//! let page = render_docs(&definition);
//! assert!(page.contains("get-user"));
//! # Ok::<(), daedalus_docs::DocsError>(())
//! ```

mod definition;
mod error;
mod render;
mod scan;

pub use definition::{describe, PropertyDefinition, ServiceDefinition};
pub use error::{DocsError, DocsResult};
pub use render::{render_docs, DocsPage};
pub use scan::scan_error_codes;
