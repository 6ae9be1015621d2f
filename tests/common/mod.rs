//! Shared test utilities for mlv integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Controller-level helpers run on a virtual clock;
//! client-level helpers talk to a local [`fake_log_api::FakeLogApi`].

#![allow(dead_code, unused_imports, unused_macros)]

pub mod assertions;
pub mod builders;
pub mod fake_log_api;
pub mod fixtures;

pub use builders::*;
pub use fake_log_api::FakeLogApi;
pub use fixtures::*;
