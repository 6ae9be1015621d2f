//! Log view widget: the scrollable right pane showing the selected log's
//! tail, a placeholder, or cross-log search results.
//!
//! # Navigation (when pane is focused)
//!
//! | Key | Action |
//! |-----|--------|
//! | `↑` / `k` | Move cursor up one line (scrolls view if needed) |
//! | `↓` / `j` | Move cursor down one line |
//! | `PageUp` / `Ctrl+u` | Scroll up one page |
//! | `PageDown` / `Ctrl+d` | Scroll down one page |
//! | `G` | Jump to the newest line and follow again |
//!
//! # Scroll semantics
//!
//! `scroll_offset` = number of lines hidden at the bottom (0 = following the
//! tail). `cursor` = absolute index into `lines`. While following, new
//! content keeps the view pinned to the bottom; once the user scrolls up the
//! view stays put and `buffered_new` counts what arrived meanwhile.

use std::cell::Cell;

use crate::event::{AppEvent, Direction};
use crate::theme::Theme;
use mlv_core::{ContentView, GlobalResults, LogDescriptor, Messages, Placeholder};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget,
    },
};

const PAGE_STEP: usize = 10;

// ---------------------------------------------------------------------------
// View lines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// A log line from the server.
    Text,
    /// `== name (path) ==` header of a cross-log result section.
    Section,
    /// Placeholder or empty-result text.
    Notice,
    /// Compressed-log title.
    Banner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLine {
    pub kind: LineKind,
    pub text: String,
}

impl ViewLine {
    fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Lay out what the session wants shown. Cross-log results take precedence
/// over the selected log's content.
pub fn compose(
    content: &ContentView,
    overlay: Option<&GlobalResults>,
    selected: Option<&LogDescriptor>,
    messages: &Messages,
) -> Vec<ViewLine> {
    if let Some(results) = overlay {
        return compose_global(results, messages);
    }

    let notice = |key: &str| vec![ViewLine::new(LineKind::Notice, messages.get(key))];
    match content {
        ContentView::Placeholder(Placeholder::Initial) => notice("viewer.initial"),
        ContentView::Placeholder(Placeholder::NotFound) => notice("viewer.not_found"),
        ContentView::Placeholder(Placeholder::Compressed) => {
            let mut lines = vec![ViewLine::new(LineKind::Banner, messages.get("compressed.title"))];
            if let Some(log) = selected {
                lines.push(ViewLine::new(
                    LineKind::Notice,
                    messages.render(
                        "compressed.notice",
                        &[("name", log.name.as_str()), ("path", log.path.as_str())],
                    ),
                ));
            }
            lines.push(ViewLine::new(
                LineKind::Notice,
                messages.get("compressed.placeholder"),
            ));
            lines
        }
        ContentView::Loading | ContentView::Cleared => Vec::new(),
        ContentView::Lines(lines) => lines
            .iter()
            .map(|l| ViewLine::new(LineKind::Text, l.as_str()))
            .collect(),
        ContentView::NoMatches => notice("viewer.no_matches_file"),
        ContentView::Empty => notice("viewer.no_results"),
    }
}

fn compose_global(results: &GlobalResults, messages: &Messages) -> Vec<ViewLine> {
    if results.sections.is_empty() {
        return vec![ViewLine::new(
            LineKind::Notice,
            messages.get("viewer.no_matches_configured"),
        )];
    }
    let mut lines = Vec::new();
    for (i, section) in results.sections.iter().enumerate() {
        if i > 0 {
            lines.push(ViewLine::new(LineKind::Text, ""));
        }
        lines.push(ViewLine::new(
            LineKind::Section,
            format!("== {} ({}) ==", section.name, section.path),
        ));
        if section.matches.is_empty() {
            lines.push(ViewLine::new(
                LineKind::Notice,
                messages.get("viewer.no_matching_lines"),
            ));
        }
        lines.extend(
            section
                .matches
                .iter()
                .map(|m| ViewLine::new(LineKind::Text, m.as_str())),
        );
    }
    lines
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

pub struct LogViewState {
    pub lines: Vec<ViewLine>,
    /// Number of lines hidden at the bottom (0 = following the tail).
    pub scroll_offset: usize,
    /// Absolute index into `lines` of the highlighted line.
    pub cursor: usize,
    /// True once the user scrolled away from the tail.
    pub paused: bool,
    /// Lines that arrived while paused.
    pub buffered_new: usize,
    pub show_line_numbers: bool,
    /// Text to highlight inside log lines.
    pub highlight: Option<(String, bool)>,
    /// Cached from the last render so `handle()` can do cursor-aware scrolling.
    last_height: Cell<usize>,
}

impl Default for LogViewState {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl LogViewState {
    pub fn new(lines: Vec<ViewLine>) -> Self {
        let cursor = lines.len().saturating_sub(1);
        Self {
            lines,
            scroll_offset: 0,
            cursor,
            paused: false,
            buffered_new: 0,
            show_line_numbers: false,
            highlight: None,
            last_height: Cell::new(40),
        }
    }

    /// Swap in freshly composed lines. A following view stays on the tail;
    /// a paused view keeps its position relative to the top.
    pub fn replace(&mut self, lines: Vec<ViewLine>) {
        if lines == self.lines {
            return;
        }
        let old_total = self.lines.len();
        let new_total = lines.len();
        self.lines = lines;

        if self.paused && new_total > 0 {
            if new_total > old_total {
                let grown = new_total - old_total;
                self.buffered_new += grown;
                self.scroll_offset += grown;
            }
            self.scroll_offset = self.scroll_offset.min(new_total.saturating_sub(1));
            self.cursor = self.cursor.min(new_total - 1);
        } else {
            self.follow();
        }
    }

    /// Drop scroll state, e.g. after switching logs.
    pub fn reset(&mut self, lines: Vec<ViewLine>) {
        self.lines = lines;
        self.follow();
    }

    fn follow(&mut self) {
        self.scroll_offset = 0;
        self.paused = false;
        self.buffered_new = 0;
        self.cursor = self.lines.len().saturating_sub(1);
    }

    fn height(&self) -> usize {
        self.last_height.get().max(1)
    }

    /// Exclusive range of lines currently visible.
    fn visible_range(&self) -> (usize, usize) {
        let total = self.lines.len();
        let end = total.saturating_sub(self.scroll_offset);
        let start = end.saturating_sub(self.height());
        (start, end)
    }

    /// Handle a navigation event from the app shell.
    pub fn handle(&mut self, event: &AppEvent) {
        let total = self.lines.len();
        if total == 0 {
            return;
        }

        match event {
            AppEvent::Nav(Direction::Up) => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                }
                self.paused = true;
                let (start, _) = self.visible_range();
                if self.cursor < start {
                    self.scroll_offset = total.saturating_sub(self.cursor + self.height());
                }
                tracing::debug!(cursor = self.cursor, scroll_offset = self.scroll_offset, "view: cursor up");
            }
            AppEvent::Nav(Direction::Down) => {
                if self.cursor + 1 < total {
                    self.cursor += 1;
                }
                let (_, end) = self.visible_range();
                if self.cursor >= end {
                    self.scroll_offset = self.scroll_offset.saturating_sub(1);
                }
                if self.scroll_offset == 0 && self.cursor + 1 == total {
                    self.paused = false;
                    self.buffered_new = 0;
                }
                tracing::debug!(cursor = self.cursor, paused = self.paused, "view: cursor down");
            }
            AppEvent::ScrollUp => {
                self.paused = true;
                self.scroll_offset = (self.scroll_offset + PAGE_STEP).min(total.saturating_sub(1));
                let (_, end) = self.visible_range();
                self.cursor = end.saturating_sub(1);
                tracing::debug!(scroll_offset = self.scroll_offset, "view: page up");
            }
            AppEvent::ScrollDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(PAGE_STEP);
                let (_, end) = self.visible_range();
                self.cursor = end.saturating_sub(1);
                if self.scroll_offset == 0 {
                    self.follow();
                }
                tracing::debug!(scroll_offset = self.scroll_offset, "view: page down");
            }
            AppEvent::ScrollToTail => {
                self.follow();
                tracing::debug!(cursor = self.cursor, "view: jumped to tail");
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Widget
// ---------------------------------------------------------------------------

pub struct LogView<'a> {
    state: &'a LogViewState,
    title: &'a str,
    focused: bool,
    theme: &'a Theme,
}

impl<'a> LogView<'a> {
    pub fn new(state: &'a LogViewState, title: &'a str, focused: bool, theme: &'a Theme) -> Self {
        Self {
            state,
            title,
            focused,
            theme,
        }
    }
}

impl Widget for LogView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            self.theme.border_focused
        } else {
            self.theme.border_unfocused
        };

        let block = Block::bordered()
            .title(format!(" {} ", self.title))
            .border_style(border_style);
        let inner = block.inner(area);
        block.render(area, buf);

        let height = inner.height as usize;
        // Cache for handle(); draw always runs before the next key.
        self.state.last_height.set(height);

        let total = self.state.lines.len();
        let end = total.saturating_sub(self.state.scroll_offset);
        let start = end.saturating_sub(height);
        let number_width = total.to_string().len();

        let cursor_row = if self.focused && self.state.cursor >= start && self.state.cursor < end {
            Some(self.state.cursor - start)
        } else {
            None
        };

        let mut lines: Vec<Line<'static>> = self.state.lines[start..end]
            .iter()
            .enumerate()
            .map(|(row, line)| {
                let mut spans = Vec::new();
                if self.state.show_line_numbers && line.kind == LineKind::Text {
                    spans.push(Span::styled(
                        format!("{:>number_width$} ", start + row + 1),
                        self.theme.line_number,
                    ));
                }
                spans.extend(render_line(line, self.state.highlight.as_ref(), self.theme));
                let mut rendered = Line::from(spans);
                if Some(row) == cursor_row {
                    rendered =
                        rendered.patch_style(Style::default().add_modifier(Modifier::REVERSED));
                }
                rendered
            })
            .collect();

        // Pause banner replaces the top visible line
        if self.state.paused {
            let msg = if self.state.buffered_new > 0 {
                format!(" ⏸  paused, {} new lines (G to follow) ", self.state.buffered_new)
            } else {
                " ⏸  paused (G to follow) ".to_string()
            };
            let banner = Line::from(Span::styled(
                msg,
                Style::default()
                    .bg(Color::DarkGray)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ));
            if lines.is_empty() {
                lines.push(banner);
            } else {
                lines[0] = banner;
            }
        }

        // The scrollbar strip sits inside the borders so its track matches
        // the visible rows.
        let text_area = Rect {
            width: inner.width.saturating_sub(1),
            ..inner
        };
        let sb_area = Rect {
            x: inner.right().saturating_sub(1),
            width: 1,
            ..inner
        };

        Paragraph::new(lines).render(text_area, buf);

        if total > height {
            let mut sb_state = ScrollbarState::new(total)
                .position(start)
                .viewport_content_length(height);
            StatefulWidget::render(
                Scrollbar::new(ScrollbarOrientation::VerticalRight)
                    .begin_symbol(None)
                    .end_symbol(None),
                sb_area,
                buf,
                &mut sb_state,
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Line rendering
// ---------------------------------------------------------------------------

fn render_line(
    line: &ViewLine,
    highlight: Option<&(String, bool)>,
    theme: &Theme,
) -> Vec<Span<'static>> {
    match line.kind {
        LineKind::Section => vec![Span::styled(line.text.clone(), theme.section_header)],
        LineKind::Notice => vec![Span::styled(line.text.clone(), theme.placeholder)],
        LineKind::Banner => vec![Span::styled(line.text.clone(), theme.compressed_banner)],
        LineKind::Text => match highlight {
            Some((needle, case_sensitive)) if !needle.is_empty() => {
                highlight_spans(&line.text, needle, *case_sensitive)
                    .into_iter()
                    .map(|(text, hit)| {
                        if hit {
                            Span::styled(text, theme.search_highlight)
                        } else {
                            Span::raw(text)
                        }
                    })
                    .collect()
            }
            _ => vec![Span::raw(line.text.clone())],
        },
    }
}

/// Split `text` into `(segment, is_match)` pairs around occurrences of
/// `needle`. Case-insensitive matching folds ASCII only so byte offsets stay
/// valid.
pub fn highlight_spans(text: &str, needle: &str, case_sensitive: bool) -> Vec<(String, bool)> {
    let (hay, pat) = if case_sensitive {
        (text.to_string(), needle.to_string())
    } else {
        (text.to_ascii_lowercase(), needle.to_ascii_lowercase())
    };

    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(found) = hay[pos..].find(&pat) {
        let begin = pos + found;
        let end = begin + pat.len();
        if begin > pos {
            out.push((text[pos..begin].to_string(), false));
        }
        out.push((text[begin..end].to_string(), true));
        pos = end;
    }
    if pos < text.len() {
        out.push((text[pos..].to_string(), false));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
