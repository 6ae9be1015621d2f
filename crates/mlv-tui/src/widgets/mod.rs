//! Ratatui widgets for the mlv TUI.

pub mod catalog_tree;
pub mod command_bar;
pub mod header;
pub mod help;
pub mod input;
pub mod log_view;
pub mod query_bar;
