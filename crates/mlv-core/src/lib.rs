//! mlv-core: Multi Log Viewer core library.
//!
//! Everything here is I/O-free except configuration loading and the tokio
//! scheduler.
//!
//! # Architecture
//!
//! ```text
//! Catalog ──► SessionController ──► Effect ──► executor (API client)
//!                   ▲                                │
//!                   └──────── *_loaded(reply) ───────┘
//! ```
//!
//! The controller is synchronous and owned by one thread. Network replies
//! and timer ticks are delivered back to it as plain method calls.

pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod payload;
pub mod schedule;
pub mod session;
pub mod status;
pub mod types;
pub mod update;

pub use catalog::{group_by_category, CategoryGroup, LogCatalog};
pub use error::{ApiError, Guard, SessionError};
pub use schedule::{ManualScheduler, Scheduler, TimerId, TokioScheduler};
pub use session::{ContentView, Effect, GlobalResults, Placeholder, SessionController, Ticket};
pub use status::{Messages, Severity, Status};
pub use types::{Category, LineLimit, LogDescriptor, SearchParams, SessionMode};
