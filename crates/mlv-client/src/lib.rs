//! mlv-client: HTTP adapter for the `mlv.cgi` JSON API.
//!
//! [`ApiClient`] speaks the wire protocol; [`executor`] bridges it to the
//! session controller's effects.

pub mod base;
pub mod client;
pub mod executor;

pub use base::resolve_base_url;
pub use client::{normalize_response, ApiClient};
pub use executor::{perform, settle, Executor, Reply};
