//! `:` commands.
//!
//! | Command | Action |
//! |---------|--------|
//! | `q`, `quit` | Quit |
//! | `q!`, `quit!` | Quit immediately, even mid-update |
//! | `help` | Toggle the help popup |
//! | `live` / `pause` | Start / stop live mode |
//! | `refresh` | Fetch the selected log again |
//! | `all [text]` | Search every log (optionally setting the query first) |
//! | `lines <n>` | Set the line limit |
//! | `case` | Toggle case-sensitive search |
//! | `download` | Download the selected compressed log |
//! | `reload` | Reload the catalog |
//! | `update` | Install the latest version on the server |
//! | `version` | Check the installed and available versions |
//! | `theme <name>` | Switch theme (`default`, `gruvbox`) |
//! | `tail` | Jump to the newest line |

use crate::app::{AppState, ShellRequest};
use crate::event::AppEvent;
use crate::theme::Theme;
use mlv_core::{Scheduler, Severity};

/// A parsed, validated command ready to be executed by the app shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Exit,
    Help,
    Live,
    Pause,
    Refresh,
    All(Option<String>),
    Lines(String),
    Case,
    Download,
    Reload,
    Update,
    Version,
    Theme(String),
    Tail,
}

impl Command {
    /// Parse a raw command string (the text after the `:` prefix).
    ///
    /// Returns `Ok(cmd)` on success, `Err(message)` on failure. An empty
    /// string returns `Err("")` as a sentinel meaning "close without acting".
    pub fn parse(input: &str) -> Result<Command, String> {
        let input = input.trim();
        if input.is_empty() {
            return Err(String::new());
        }

        let (word, rest) = input
            .split_once(char::is_whitespace)
            .map(|(w, r)| (w, r.trim()))
            .unwrap_or((input, ""));

        match word {
            "q" | "quit" => Ok(Command::Quit),
            "q!" | "quit!" => Ok(Command::Exit),
            "help" => Ok(Command::Help),
            "live" => Ok(Command::Live),
            "pause" => Ok(Command::Pause),
            "refresh" => Ok(Command::Refresh),
            "all" => Ok(Command::All((!rest.is_empty()).then(|| rest.to_string()))),
            "lines" => {
                if rest.is_empty() {
                    Err("usage: lines <10-2000>".to_string())
                } else {
                    Ok(Command::Lines(rest.to_string()))
                }
            }
            "case" => Ok(Command::Case),
            "download" => Ok(Command::Download),
            "reload" => Ok(Command::Reload),
            "update" => Ok(Command::Update),
            "version" => Ok(Command::Version),
            "tail" => Ok(Command::Tail),
            "theme" => {
                if rest.is_empty() {
                    Err("usage: theme <default|gruvbox>".to_string())
                } else {
                    Ok(Command::Theme(rest.to_string()))
                }
            }
            other => Err(format!("unknown command: {other}")),
        }
    }
}

/// Execute a parsed [`Command`] against the application state.
pub fn execute_command<S: Scheduler>(s: &mut AppState<S>, cmd: Command) {
    match cmd {
        Command::Quit => {
            if s.session.is_busy() {
                s.flash(
                    Severity::Error,
                    s.messages.get("status.update_in_progress_wait").to_string(),
                );
            } else {
                s.quit = true;
            }
        }
        Command::Exit => s.quit = true,
        Command::Help => s.show_help = !s.show_help,
        Command::Live => {
            let _ = s.session.start_live();
        }
        Command::Pause => {
            let _ = s.session.stop_live();
        }
        Command::Refresh => {
            let _ = s.session.refresh();
        }
        Command::All(text) => {
            if let Some(text) = text {
                s.query.set(text);
                let _ = s.session.edit_query(s.query.as_str());
            }
            let _ = s.session.search_all();
        }
        Command::Lines(raw) => {
            let limit = s.session.set_line_limit_input(&raw);
            tracing::debug!(lines = limit.get(), "line limit set");
            s.refresh_if_viewing();
        }
        Command::Case => s.toggle_case(),
        Command::Download => {
            let _ = s.session.download();
        }
        Command::Reload => {
            let _ = s.session.load_catalog();
        }
        Command::Update => {
            if s.session.is_busy() {
                s.flash(
                    Severity::Error,
                    s.messages.get("status.update_in_progress_wait").to_string(),
                );
            } else {
                s.session.set_update_in_progress(true);
                s.flash(Severity::Info, s.messages.get("update.downloading").to_string());
                s.requests.push(ShellRequest::ApplyUpdate);
            }
        }
        Command::Version => s.requests.push(ShellRequest::CheckUpdate { manual: true }),
        Command::Theme(name) => match Theme::by_name(&name) {
            Some(theme) => s.theme = theme,
            None => s.flash(Severity::Error, format!("unknown theme: {name}")),
        },
        Command::Tail => s.view.handle(&AppEvent::ScrollToTail),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
