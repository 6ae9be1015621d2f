//! Status taxonomy and the message table that renders it.
//!
//! The session controller only ever records a [`Status`] value. Turning that
//! value into text is a pure function of the status and a [`Messages`]
//! table, so a different language table changes every string without
//! touching the state machine.

use crate::error::{Guard, SessionError};
use crate::types::Category;
use std::collections::HashMap;

const ENGLISH: &str = include_str!("messages/en.toml");

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// How prominently the presentation layer should show a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// Everything the controller can report on its status line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ready,
    LoadingCatalog,
    CatalogFailed(SessionError),
    /// The server returned an empty catalog.
    NoLogsConfigured,
    /// Every configured log is missing on disk.
    NoLogsExist,
    LogsFound {
        found: usize,
        total: usize,
    },
    /// The selected log vanished from a reloaded catalog.
    NotFound(String),
    Compressed,
    Reading,
    Searching,
    ShowingLines(usize),
    SearchDone(usize),
    LiveUpdated(usize),
    LiveStarted {
        seconds: u64,
    },
    LivePaused,
    FetchFailed(SessionError),
    SearchingAll,
    GlobalMatches(usize),
    SearchAllFailed(SessionError),
    Downloading(String),
    Downloaded(String),
    DownloadFailed(SessionError),
    /// An action was refused by a guard or the busy flag.
    Rejected(SessionError),
}

impl Status {
    /// Summary of a non-empty catalog. Nothing to report when every log
    /// exists.
    pub fn catalog_summary(found: usize, total: usize) -> Status {
        match found {
            0 => Status::NoLogsExist,
            found if found == total => Status::Ready,
            found => Status::LogsFound { found, total },
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Status::CatalogFailed(_)
            | Status::NoLogsConfigured
            | Status::NoLogsExist
            | Status::NotFound(_)
            | Status::FetchFailed(_)
            | Status::SearchAllFailed(_)
            | Status::DownloadFailed(_)
            | Status::Rejected(_) => Severity::Error,
            _ => Severity::Info,
        }
    }

    /// Render through `messages`.
    pub fn text(&self, messages: &Messages) -> String {
        match self {
            Status::Ready => String::new(),
            Status::LoadingCatalog => messages.get("status.loading_logs").to_string(),
            Status::CatalogFailed(err) => messages.render(
                "status.error_loading_logs",
                &[("error", &error_text(err, messages, "status.fetch_list_failed"))],
            ),
            Status::NoLogsConfigured => messages.get("status.no_logs_configured").to_string(),
            Status::NoLogsExist => messages.get("status.warning_missing_logs").to_string(),
            Status::LogsFound { found, total } => messages.render(
                "status.logs_found",
                &[("found", &found.to_string()), ("total", &total.to_string())],
            ),
            Status::NotFound(id) => messages.render("status.not_found", &[("id", id)]),
            Status::Compressed => messages.get("status.log_compressed").to_string(),
            Status::Reading => messages.get("status.reading_log").to_string(),
            Status::Searching => messages.get("status.searching_full").to_string(),
            Status::ShowingLines(count) => {
                messages.render("status.showing_lines", &[("count", &count.to_string())])
            }
            Status::SearchDone(0) => messages.get("status.search_done_zero").to_string(),
            Status::SearchDone(count) => {
                messages.render("status.search_done", &[("count", &count.to_string())])
            }
            Status::LiveUpdated(count) => {
                messages.render("status.live_updated", &[("count", &count.to_string())])
            }
            Status::LiveStarted { seconds } => {
                messages.render("status.live_started", &[("seconds", &seconds.to_string())])
            }
            Status::LivePaused => messages.get("status.live_paused").to_string(),
            Status::FetchFailed(err) => error_text(err, messages, "status.error_reading_log"),
            Status::SearchingAll => messages.get("status.searching_all").to_string(),
            Status::GlobalMatches(0) => messages.get("status.global_matches_zero").to_string(),
            Status::GlobalMatches(count) => {
                messages.render("status.global_matches", &[("count", &count.to_string())])
            }
            Status::SearchAllFailed(err) => error_text(err, messages, "status.error_search_all"),
            Status::Downloading(name) => messages.render("status.downloading", &[("name", name)]),
            Status::Downloaded(path) => messages.render("status.downloaded", &[("path", path)]),
            Status::DownloadFailed(err) => messages.render(
                "status.download_failed",
                &[("error", &error_text(err, messages, "update.error_unknown"))],
            ),
            Status::Rejected(err) => error_text(err, messages, "update.error_unknown"),
        }
    }
}

/// Text for an error. Server and transport errors without a message fall
/// back to `fallback_key`.
pub fn error_text(err: &SessionError, messages: &Messages, fallback_key: &str) -> String {
    match err {
        SessionError::Transport(msg) | SessionError::Server(msg) if !msg.trim().is_empty() => {
            msg.clone()
        }
        SessionError::Transport(_) | SessionError::Server(_) => {
            messages.get(fallback_key).to_string()
        }
        SessionError::Malformed => messages.get("error.invalid_json").to_string(),
        SessionError::Busy => messages.get("status.update_in_progress_wait").to_string(),
        SessionError::NotFound(id) => messages.render("status.not_found", &[("id", id)]),
        SessionError::Guarded(guard) => messages.get(guard_key(*guard)).to_string(),
    }
}

fn guard_key(guard: Guard) -> &'static str {
    match guard {
        Guard::NoSelection => "status.select_log",
        Guard::Compressed => "status.live_not_available_compressed",
        Guard::SearchActive => "status.live_not_available_search",
        Guard::EmptyQuery => "status.enter_text_all",
        Guard::NotCompressed => "status.download_not_available",
    }
}

// ---------------------------------------------------------------------------
// Message table
// ---------------------------------------------------------------------------

/// Flat `section.key → template` table.
#[derive(Debug, Clone, Default)]
pub struct Messages {
    table: HashMap<String, String>,
}

impl Messages {
    /// The embedded English table.
    pub fn english() -> Self {
        Self::from_toml(ENGLISH).expect("embedded message table must be valid TOML")
    }

    /// Parse a table of `[section]` blocks holding string templates.
    pub fn from_toml(source: &str) -> anyhow::Result<Self> {
        let sections: HashMap<String, HashMap<String, String>> = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        let table = sections
            .into_iter()
            .flat_map(|(section, entries)| {
                entries
                    .into_iter()
                    .map(move |(key, value)| (format!("{section}.{key}"), value))
            })
            .collect();
        Ok(Self { table })
    }

    /// Raw template for `key`. An unknown key renders as the key itself.
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.table.get(key).map(String::as_str).unwrap_or(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    /// Template for `key` with `{{name}}` placeholders filled from `vars`.
    pub fn render<V: AsRef<str>>(&self, key: &str, vars: &[(&str, V)]) -> String {
        interpolate(self.get(key), vars)
    }

    /// Display name of a category. Custom categories without an entry keep
    /// the server's label.
    pub fn category(&self, category: &Category) -> String {
        let key = format!("category.{}", category.slug());
        match self.table.get(&key) {
            Some(label) => label.clone(),
            None => category.label().to_string(),
        }
    }
}

/// Replace every `{{name}}` in `template`. Placeholders without a matching
/// var are left as written.
pub fn interpolate<V: AsRef<str>>(template: &str, vars: &[(&str, V)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) => {
                let name = after[..close].trim();
                match vars.iter().find(|(k, _)| *k == name) {
                    Some((_, value)) => out.push_str(value.as_ref()),
                    None => out.push_str(&rest[open..open + 2 + close + 2]),
                }
                rest = &after[close + 2..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
