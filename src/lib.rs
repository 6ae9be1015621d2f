//! mlv: Multi Log Viewer
//!
//! Terminal client for the `mlv.cgi` log API. The interactive viewer lives
//! in `mlv-tui`; this crate adds the command line and the headless
//! subcommands so integration tests can drive them directly.
//!
//! # Architecture
//!
//! ```text
//! mlv-tui / headless ──► SessionController ──► Effect ──► mlv-client ──► mlv.cgi
//!                              ▲                               │
//!                              └────────── Reply ──────────────┘
//! ```

pub mod headless;

pub use headless::{Headless, SearchOptions};
