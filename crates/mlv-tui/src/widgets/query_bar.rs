//! Query bar widget: search text, case flag and line limit at the bottom of
//! the screen.
//!
//! # Editing
//!
//! - `Char(c)` inserts at the cursor, `Backspace` deletes before it.
//! - `Nav(Left)` / `Nav(Right)` move the cursor.
//! - `Enter` submits; the app shell runs the search.
//!
//! The case flag and line limit live on the session; the bar only shows them.

use crate::theme::Theme;
use crate::widgets::input::TextInput;
use mlv_core::SearchParams;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction as LayoutDir, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget},
};

pub type QueryBarState = TextInput;

pub struct QueryBar<'a> {
    state: &'a QueryBarState,
    params: &'a SearchParams,
    focused: bool,
    theme: &'a Theme,
}

impl<'a> QueryBar<'a> {
    pub fn new(
        state: &'a QueryBarState,
        params: &'a SearchParams,
        focused: bool,
        theme: &'a Theme,
    ) -> Self {
        Self {
            state,
            params,
            focused,
            theme,
        }
    }

    /// Absolute terminal position of the text cursor within this widget's
    /// rendered area. Pass to `frame.set_cursor_position()` after rendering.
    pub fn cursor_position(&self, area: Rect) -> (u16, u16) {
        // The block adds 1-cell borders; text starts at (area.x+1, area.y+1).
        let x = (area.x + 1 + self.state.cursor_col()).min(area.right().saturating_sub(1));
        (x, area.y + 1)
    }
}

impl Widget for QueryBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            self.theme.border_focused
        } else {
            self.theme.border_unfocused
        };

        let block = Block::bordered().title(" Search ").border_style(border_style);
        let inner = block.inner(area);
        block.render(area, buf);

        // Split inner area: query text (fill) | flags (fixed width)
        let chunks = Layout::default()
            .direction(LayoutDir::Horizontal)
            .constraints([Constraint::Fill(1), Constraint::Length(22)])
            .split(inner);

        let query_line = if self.state.is_empty() && !self.focused {
            Line::from(Span::styled(
                "press / to search",
                Style::default().add_modifier(Modifier::DIM),
            ))
        } else {
            Line::from(self.state.as_str())
        };
        Paragraph::new(query_line).render(chunks[0], buf);

        Paragraph::new(flags_line(self.params)).render(chunks[1], buf);
    }
}

/// `Aa lines:100` when case-sensitive, `aa lines:100` otherwise.
fn flags_line(params: &SearchParams) -> Line<'static> {
    let case = if params.case_sensitive {
        Span::styled("Aa", Style::default().add_modifier(Modifier::BOLD))
    } else {
        Span::styled("aa", Style::default().add_modifier(Modifier::DIM))
    };
    Line::from(vec![
        case,
        Span::raw(format!(" lines:{}", params.line_limit.get())),
    ])
}
