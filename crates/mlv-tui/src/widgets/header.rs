//! Header and status rows.
//!
//! The header shows the app name, the selected log, a badge for the active
//! mode and the update hint, with keybinding hints right-aligned. The status
//! row renders the session status (or a transient shell message) in the
//! colour of its severity.

use crate::theme::Theme;
use mlv_core::{Messages, SessionMode, Severity};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

pub struct Header<'a> {
    log_name: Option<&'a str>,
    mode: SessionMode,
    update_hint: Option<&'a str>,
    messages: &'a Messages,
    theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(mode: SessionMode, messages: &'a Messages, theme: &'a Theme) -> Self {
        Self {
            log_name: None,
            mode,
            update_hint: None,
            messages,
            theme,
        }
    }

    pub fn log_name(mut self, name: Option<&'a str>) -> Self {
        self.log_name = name;
        self
    }

    pub fn update_hint(mut self, hint: Option<&'a str>) -> Self {
        self.update_hint = hint;
        self
    }

    fn spans(&self) -> Vec<Span<'static>> {
        let mut spans = vec![Span::styled(
            " mlv ",
            Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED),
        )];
        if let Some(name) = self.log_name {
            spans.push(Span::raw(format!(" {name} ")));
        }
        let badge = match self.mode {
            SessionMode::Live => Some((self.messages.get("badge.live").to_string(), self.theme.badge_live)),
            SessionMode::Compressed => Some((
                self.messages.get("badge.compressed").to_string(),
                self.theme.badge_compressed,
            )),
            SessionMode::SearchingAll => Some(("ALL".to_string(), self.theme.badge_search_all)),
            SessionMode::Idle | SessionMode::Viewing => None,
        };
        if let Some((text, style)) = badge {
            spans.push(Span::styled(format!(" {text} "), style));
        }
        if let Some(hint) = self.update_hint {
            spans.push(Span::styled(format!("  {hint}"), self.theme.badge_update));
        }
        spans
    }
}

impl Widget for Header<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = Line::from(self.spans());
        buf.set_line(area.x, area.y, &line, area.width);

        // Keybinding hints at the right edge
        let hint = " q:quit  ?:help  :cmd ";
        let hint_x = area.right().saturating_sub(hint.len() as u16);
        buf.set_string(hint_x, area.y, hint, Style::default().add_modifier(Modifier::DIM));
    }
}

pub struct StatusLine<'a> {
    text: &'a str,
    severity: Severity,
    theme: &'a Theme,
}

impl<'a> StatusLine<'a> {
    pub fn new(text: &'a str, severity: Severity, theme: &'a Theme) -> Self {
        Self {
            text,
            severity,
            theme,
        }
    }
}

impl Widget for StatusLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_stringn(
            area.x + 1,
            area.y,
            self.text,
            area.width.saturating_sub(1) as usize,
            self.theme.status_style(self.severity),
        );
    }
}
