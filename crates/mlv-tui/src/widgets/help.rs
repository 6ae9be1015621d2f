//! Popups: the keybinding help (toggle with `?`) and a generic text popup
//! used for update reports. Both close with `?`, `Escape` or `q`.

use crate::event::{AppEvent, Keymap};
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Widget, Wrap},
};

pub struct HelpPopup<'a> {
    keymap: &'a Keymap,
    theme: &'a Theme,
}

impl<'a> HelpPopup<'a> {
    pub fn new(keymap: &'a Keymap, theme: &'a Theme) -> Self {
        Self { keymap, theme }
    }

    /// `(keys, description)` rows, with configured keys resolved.
    pub fn bindings(&self) -> Vec<(String, &'static str)> {
        let k = |event: AppEvent| self.keymap.describe(&event);
        vec![
            ("q  /  Ctrl+c".to_string(), "Quit"),
            (k(AppEvent::FocusNext), "Cycle focus: catalog → log → search"),
            (k(AppEvent::QueryFocus), "Focus search bar (Enter runs search)"),
            (k(AppEvent::FilterFocus), "Filter the catalog"),
            ("Escape".to_string(), "Close results / leave input"),
            ("↑ k  /  ↓ j".to_string(), "Navigate catalog or log lines"),
            ("← h  /  → l".to_string(), "Collapse / expand category"),
            ("Enter".to_string(), "Open log / toggle category"),
            ("PageUp / Ctrl+u".to_string(), "Scroll log up"),
            ("PageDown / Ctrl+d".to_string(), "Scroll log down"),
            ("G".to_string(), "Jump to newest line"),
            (k(AppEvent::ToggleLive), "Toggle live mode"),
            (k(AppEvent::Refresh), "Refresh selected log"),
            (k(AppEvent::SearchAll), "Search all logs"),
            (k(AppEvent::ToggleCase), "Toggle case sensitivity"),
            (k(AppEvent::LinesUp), "More lines"),
            (k(AppEvent::LinesDown), "Fewer lines"),
            (k(AppEvent::ClearSearch), "Clear search"),
            (k(AppEvent::Download), "Download compressed log"),
            (":".to_string(), "Command line (:help for commands)"),
            ("?".to_string(), "Toggle this help popup"),
        ]
    }
}

impl Widget for HelpPopup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bindings = self.bindings();
        let popup = centered_rect(72, bindings.len() as u16 + 2, area);
        Clear.render(popup, buf);

        let block = Block::bordered()
            .title(" mlv keybindings (? to close) ")
            .border_style(self.theme.border_focused);

        let inner = block.inner(popup);
        block.render(popup, buf);

        let lines: Vec<Line> = bindings
            .into_iter()
            .map(|(key, desc)| {
                Line::from(vec![
                    Span::styled(
                        format!("  {key:<22}"),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(desc),
                ])
            })
            .collect();

        Paragraph::new(lines).render(inner, buf);
    }
}

/// A titled block of text lines, e.g. an update report.
pub struct InfoPopup<'a> {
    title: &'a str,
    lines: &'a [String],
    theme: &'a Theme,
}

impl<'a> InfoPopup<'a> {
    pub fn new(title: &'a str, lines: &'a [String], theme: &'a Theme) -> Self {
        Self { title, lines, theme }
    }
}

impl Widget for InfoPopup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let height: usize = self.lines.iter().map(|l| l.lines().count().max(1)).sum();
        let popup = centered_rect(80, height as u16 + 2, area);
        Clear.render(popup, buf);

        let block = Block::bordered()
            .title(format!(" {} ", self.title))
            .border_style(self.theme.border_focused);
        let inner = block.inner(popup);
        block.render(popup, buf);

        let lines: Vec<Line> = self
            .lines
            .iter()
            .flat_map(|l| l.lines())
            .map(|l| Line::from(l.to_string()))
            .collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_resolves_configured_keys() {
        let keymap = Keymap::default();
        let theme = Theme::load_default();
        let help = HelpPopup::new(&keymap, &theme);
        let rows = help.bindings();
        assert!(rows.iter().any(|(k, d)| k == "L" && *d == "Toggle live mode"));
        assert!(rows.iter().any(|(k, d)| k == "/" && d.starts_with("Focus search")));
    }

    #[test]
    fn centered_rect_fits_small_areas() {
        let r = centered_rect(80, 20, Rect::new(0, 0, 40, 10));
        assert_eq!(r, Rect::new(0, 0, 40, 10));
        let r = centered_rect(10, 4, Rect::new(0, 0, 40, 10));
        assert_eq!(r, Rect::new(15, 3, 10, 4));
    }
}
