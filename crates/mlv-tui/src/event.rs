//! Semantic application events: crossterm key events mapped to a
//! widget-agnostic vocabulary so widgets never touch crossterm directly.
//!
//! # Usage
//!
//! Build a [`Keymap`] once from the `[keybindings]` config section, then call
//! [`to_app_event`] on every [`crossterm::event::Event`] and match on the
//! returned [`AppEvent`] instead of crossterm types.
//!
//! # Keybindings
//!
//! | Key(s)                  | Event                      | Configurable |
//! |-------------------------|----------------------------|--------------|
//! | `q`, `Ctrl+c`           | `Quit`                     |              |
//! | `Tab`                   | `FocusNext`                | yes          |
//! | `/`                     | `QueryFocus`               | yes          |
//! | `f`                     | `FilterFocus`              | yes          |
//! | `L`                     | `ToggleLive`               | yes          |
//! | `r`                     | `Refresh`                  | yes          |
//! | `A`                     | `SearchAll`                | yes          |
//! | `c`                     | `ToggleCase`               | yes          |
//! | `d`                     | `Download`                 | yes          |
//! | `]`                     | `LinesUp`                  | yes          |
//! | `[`                     | `LinesDown`                | yes          |
//! | `x`                     | `ClearSearch`              | yes          |
//! | `PageUp`, `Ctrl+u`      | `ScrollUp`                 |              |
//! | `PageDown`, `Ctrl+d`    | `ScrollDown`               |              |
//! | `G`                     | `ScrollToTail`             |              |
//! | `↑` / `k`               | `Nav(Up)`                  |              |
//! | `↓` / `j`               | `Nav(Down)`                |              |
//! | `←` / `h`               | `Nav(Left)`                |              |
//! | `→` / `l`               | `Nav(Right)`               |              |
//! | printable char          | `Char(c)`                  |              |
//! | `Backspace`             | `Backspace`                |              |
//! | `Enter`                 | `Enter`                    |              |
//! | `Esc`                   | `Escape`                   |              |
//! | terminal resize         | `Resize(w, h)`             |              |
//!
//! Configured bindings are checked before the fixed navigation keys, so
//! binding an action to `j` shadows `Nav(Down)`.
//!
//! ## Insert mode
//!
//! When a text-input widget (query bar, filter line, command bar) is focused,
//! the event loop calls [`to_app_event_insert`] instead. Every printable
//! character becomes `Char`; only `Ctrl+c`, `Escape`, `Enter`, `Tab`,
//! `Backspace` and the arrow keys keep their special meaning.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use mlv_core::config::KeybindingsConfig;

/// Cardinal direction for catalog and log-view navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A semantic application event derived from a raw crossterm [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Quit,
    /// Move keyboard focus to the next pane (Tab-cycle).
    FocusNext,
    /// Transfer focus to the query bar.
    QueryFocus,
    /// Transfer focus to the catalog filter line.
    FilterFocus,
    ToggleLive,
    Refresh,
    SearchAll,
    ToggleCase,
    Download,
    LinesUp,
    LinesDown,
    ClearSearch,
    ScrollUp,
    ScrollDown,
    /// Jump to the newest line and resume following.
    ScrollToTail,
    Nav(Direction),
    /// A printable character forwarded to the active text input.
    Char(char),
    Backspace,
    Enter,
    Resize(u16, u16),
    /// Dismiss the active overlay or leave a text input.
    Escape,
}

// ---------------------------------------------------------------------------
// Keymap
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("empty key binding for `{0}`")]
    Empty(&'static str),
    #[error("unrecognised key `{key}` for `{action}`")]
    Unknown { action: &'static str, key: String },
}

/// One bindable key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    /// Parse `Tab`, `Enter`, `Space`, `Esc`, `F1`..`F12`, `Ctrl+x` or a
    /// single character.
    pub fn parse(action: &'static str, raw: &str) -> Result<Self, KeyParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(KeyParseError::Empty(action));
        }
        let unknown = || KeyParseError::Unknown {
            action,
            key: raw.to_string(),
        };

        if let Some(rest) = raw.strip_prefix("Ctrl+").or_else(|| raw.strip_prefix("ctrl+")) {
            let mut chars = rest.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Self {
                    code: KeyCode::Char(c.to_ascii_lowercase()),
                    modifiers: KeyModifiers::CONTROL,
                }),
                _ => Err(unknown()),
            };
        }

        let code = match raw.to_ascii_lowercase().as_str() {
            "tab" => KeyCode::Tab,
            "enter" => KeyCode::Enter,
            "space" => KeyCode::Char(' '),
            "esc" | "escape" => KeyCode::Esc,
            "backspace" => KeyCode::Backspace,
            lower if lower.len() > 1 && lower.starts_with('f') => {
                let n: u8 = lower[1..].parse().map_err(|_| unknown())?;
                if !(1..=12).contains(&n) {
                    return Err(unknown());
                }
                KeyCode::F(n)
            }
            _ => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    _ => return Err(unknown()),
                }
            }
        };
        Ok(Self {
            code,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn matches(&self, key: &KeyEvent) -> bool {
        if key.code != self.code {
            return false;
        }
        match self.code {
            // Uppercase letters arrive with or without SHIFT depending on
            // the terminal.
            KeyCode::Char(c) if self.modifiers == KeyModifiers::NONE && !c.is_ascii_lowercase() => {
                key.modifiers == KeyModifiers::NONE || key.modifiers == KeyModifiers::SHIFT
            }
            _ => key.modifiers == self.modifiers,
        }
    }
}

/// Configured action keys, in lookup order.
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: Vec<(KeyBinding, AppEvent)>,
}

impl Keymap {
    pub fn from_config(keys: &KeybindingsConfig) -> Result<Self, KeyParseError> {
        let table: [(&'static str, &str, AppEvent); 11] = [
            ("toggle_focus", keys.toggle_focus.as_str(), AppEvent::FocusNext),
            ("query_focus", keys.query_focus.as_str(), AppEvent::QueryFocus),
            ("filter_focus", keys.filter_focus.as_str(), AppEvent::FilterFocus),
            ("toggle_live", keys.toggle_live.as_str(), AppEvent::ToggleLive),
            ("refresh", keys.refresh.as_str(), AppEvent::Refresh),
            ("search_all", keys.search_all.as_str(), AppEvent::SearchAll),
            ("toggle_case", keys.toggle_case.as_str(), AppEvent::ToggleCase),
            ("download", keys.download.as_str(), AppEvent::Download),
            ("lines_up", keys.lines_up.as_str(), AppEvent::LinesUp),
            ("lines_down", keys.lines_down.as_str(), AppEvent::LinesDown),
            ("clear_search", keys.clear_search.as_str(), AppEvent::ClearSearch),
        ];
        let mut bindings = Vec::with_capacity(table.len());
        for (action, raw, event) in table {
            bindings.push((KeyBinding::parse(action, raw)?, event));
        }
        Ok(Self { bindings })
    }

    fn lookup(&self, key: &KeyEvent) -> Option<AppEvent> {
        self.bindings
            .iter()
            .find(|(binding, _)| binding.matches(key))
            .map(|(_, event)| event.clone())
    }

    /// The binding for `event`, formatted for the help popup.
    pub fn describe(&self, event: &AppEvent) -> String {
        self.bindings
            .iter()
            .find(|(_, e)| e == event)
            .map(|(binding, _)| match binding.code {
                KeyCode::Tab => "Tab".to_string(),
                KeyCode::Enter => "Enter".to_string(),
                KeyCode::Esc => "Esc".to_string(),
                KeyCode::Backspace => "Backspace".to_string(),
                KeyCode::F(n) => format!("F{n}"),
                KeyCode::Char(' ') => "Space".to_string(),
                KeyCode::Char(c) if binding.modifiers == KeyModifiers::CONTROL => {
                    format!("Ctrl+{c}")
                }
                KeyCode::Char(c) => c.to_string(),
                _ => "?".to_string(),
            })
            .unwrap_or_default()
    }
}

impl Default for Keymap {
    fn default() -> Self {
        // The embedded defaults are known-good.
        Self::from_config(&mlv_core::config::Config::defaults().keybindings)
            .expect("embedded default keybindings must parse")
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Map a raw crossterm [`Event`] to an [`AppEvent`] (normal / navigation mode).
///
/// Returns `None` for mouse events, key releases and unbound keys.
pub fn to_app_event(event: Event, keymap: &Keymap) -> Option<AppEvent> {
    match event {
        Event::Resize(w, h) => Some(AppEvent::Resize(w, h)),
        Event::Key(key) => map_key(key, keymap),
        _ => None,
    }
}

/// Map a raw crossterm [`Event`] for text-input ("insert") mode.
pub fn to_app_event_insert(event: Event) -> Option<AppEvent> {
    match event {
        Event::Resize(w, h) => Some(AppEvent::Resize(w, h)),
        Event::Key(key) => map_key_insert(key),
        _ => None,
    }
}

fn map_key(key: KeyEvent, keymap: &Keymap) -> Option<AppEvent> {
    use KeyCode::*;
    use KeyModifiers as Mod;

    match key.code {
        Char('q') if key.modifiers == Mod::NONE => return Some(AppEvent::Quit),
        Char('c') if key.modifiers == Mod::CONTROL => return Some(AppEvent::Quit),
        _ => {}
    }

    if let Some(event) = keymap.lookup(&key) {
        return Some(event);
    }

    match key.code {
        PageUp => Some(AppEvent::ScrollUp),
        PageDown => Some(AppEvent::ScrollDown),
        Char('u') if key.modifiers == Mod::CONTROL => Some(AppEvent::ScrollUp),
        Char('d') if key.modifiers == Mod::CONTROL => Some(AppEvent::ScrollDown),

        // 'G' may or may not carry SHIFT depending on the terminal
        Char('G') => Some(AppEvent::ScrollToTail),

        Up | Char('k') if key.modifiers == Mod::NONE => Some(AppEvent::Nav(Direction::Up)),
        Down | Char('j') if key.modifiers == Mod::NONE => Some(AppEvent::Nav(Direction::Down)),
        Left | Char('h') if key.modifiers == Mod::NONE => Some(AppEvent::Nav(Direction::Left)),
        Right | Char('l') if key.modifiers == Mod::NONE => Some(AppEvent::Nav(Direction::Right)),

        Char(c) if key.modifiers == Mod::NONE || key.modifiers == Mod::SHIFT => {
            Some(AppEvent::Char(c))
        }

        Backspace if key.modifiers == Mod::NONE => Some(AppEvent::Backspace),
        Enter if key.modifiers == Mod::NONE => Some(AppEvent::Enter),
        Esc => Some(AppEvent::Escape),

        _ => None,
    }
}

fn map_key_insert(key: KeyEvent) -> Option<AppEvent> {
    use KeyCode::*;
    use KeyModifiers as Mod;

    match key.code {
        Char('c') if key.modifiers == Mod::CONTROL => Some(AppEvent::Quit),

        Up => Some(AppEvent::Nav(Direction::Up)),
        Down => Some(AppEvent::Nav(Direction::Down)),
        Left => Some(AppEvent::Nav(Direction::Left)),
        Right => Some(AppEvent::Nav(Direction::Right)),

        Tab if key.modifiers == Mod::NONE => Some(AppEvent::FocusNext),

        Char(c) if key.modifiers == Mod::NONE || key.modifiers == Mod::SHIFT => {
            Some(AppEvent::Char(c))
        }

        Backspace if key.modifiers == Mod::NONE => Some(AppEvent::Backspace),
        Enter if key.modifiers == Mod::NONE => Some(AppEvent::Enter),
        Esc => Some(AppEvent::Escape),

        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
