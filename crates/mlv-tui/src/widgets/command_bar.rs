//! Vim-style command bar: a single-line overlay at the bottom of the screen.
//!
//! Activated by pressing `:` from any pane except the text inputs. Displays a
//! `:` prefix followed by the typed command. `Enter` hands the input to
//! [`crate::commands::Command::parse`]; `Escape` cancels. See
//! [`crate::commands`] for the command list.

use crate::event::AppEvent;
use crate::theme::Theme;
use crate::widgets::input::TextInput;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Widget},
};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct CommandBarState {
    pub input: TextInput,
    /// Error message from the last failed command, cleared on the next key.
    pub error: Option<String>,
}

impl CommandBarState {
    /// Reset to a blank, error-free state. Call when opening the bar.
    pub fn clear(&mut self) {
        self.input.clear();
        self.error = None;
    }

    /// Handle an editing key while the bar is focused.
    pub fn handle(&mut self, event: &AppEvent) {
        // Any keypress dismisses the error display so the user can edit again.
        self.error = None;
        self.input.handle(event);
    }

    /// Absolute terminal column of the text cursor within `area`.
    ///
    /// The `:` glyph occupies column 0, so the cursor starts at column 1.
    pub fn cursor_col(&self, area: Rect) -> u16 {
        (area.x + 1 + self.input.cursor_col()).min(area.right().saturating_sub(1))
    }
}

// ---------------------------------------------------------------------------
// Widget
// ---------------------------------------------------------------------------

/// Single-row command-bar overlay. The caller passes a 1-row `Rect`.
pub struct CommandBar<'a> {
    state: &'a CommandBarState,
    theme: &'a Theme,
}

impl<'a> CommandBar<'a> {
    pub fn new(state: &'a CommandBarState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }
}

impl Widget for CommandBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let line = if let Some(ref err) = self.state.error {
            Line::from(Span::styled(format!("E  {err}"), self.theme.status_error))
        } else {
            Line::from(vec![
                Span::styled(
                    ":",
                    self.theme.border_command_bar.add_modifier(Modifier::BOLD),
                ),
                Span::styled(self.state.input.as_str(), Style::default()),
            ])
        };

        buf.set_line(area.x, area.y, &line, area.width);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn char_insert_and_backspace() {
        let mut s = CommandBarState::default();
        for c in "foo".chars() {
            s.handle(&AppEvent::Char(c));
        }
        assert_eq!(s.input.as_str(), "foo");
        s.handle(&AppEvent::Backspace);
        assert_eq!(s.input.as_str(), "fo");
        assert_eq!(s.cursor_col(Rect::new(0, 0, 80, 1)), 3);
    }

    #[test]
    fn error_cleared_on_next_key() {
        let mut s = CommandBarState::default();
        s.error = Some("oops".to_string());
        s.handle(&AppEvent::Char('x'));
        assert!(s.error.is_none());
    }
}
