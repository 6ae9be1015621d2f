//! Catalog tree widget: the collapsible category tree of configured logs in
//! the left pane.
//!
//! # Navigation
//! - `↑`/`k` and `↓`/`j` move the cursor up and down the visible rows.
//! - `→`/`l` expands the category under the cursor; `←`/`h` collapses the
//!   category under the cursor (or the one containing the focused log).
//! - `Enter` toggles a category, or selects the log under the cursor.
//!
//! Rows are rebuilt from the catalog on every call, so a reload or a filter
//! change is picked up without any syncing. Collapsed state is keyed by
//! category and survives reloads.

use crate::event::{AppEvent, Direction};
use crate::theme::Theme;
use crate::widgets::input::TextInput;
use mlv_core::format::subtitle;
use mlv_core::{group_by_category, Category, LogCatalog, LogDescriptor, Messages};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, List, ListItem, ListState, Paragraph, StatefulWidget, Widget},
};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One visible row of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row<'a> {
    Category {
        category: Category,
        count: usize,
        collapsed: bool,
    },
    Log(&'a LogDescriptor),
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct CatalogTreeState {
    collapsed: HashSet<Category>,
    /// Index into the visible rows.
    pub cursor: usize,
    /// The filter line at the top of the pane.
    pub filter: TextInput,
}

impl CatalogTreeState {
    /// Flatten the filtered catalog into visible rows.
    pub fn rows<'a>(&self, catalog: &'a LogCatalog) -> Vec<Row<'a>> {
        let view = catalog.view();
        let mut rows = Vec::new();
        for group in group_by_category(&view) {
            let collapsed = self.collapsed.contains(&group.category);
            rows.push(Row::Category {
                category: group.category,
                count: group.logs.len(),
                collapsed,
            });
            if !collapsed {
                rows.extend(group.logs.into_iter().map(Row::Log));
            }
        }
        rows
    }

    /// Handle a navigation event. Returns the id of a log the user chose.
    pub fn handle(&mut self, event: &AppEvent, catalog: &LogCatalog) -> Option<String> {
        let rows = self.rows(catalog);
        if rows.is_empty() {
            self.cursor = 0;
            return None;
        }
        self.cursor = self.cursor.min(rows.len() - 1);

        match event {
            AppEvent::Nav(Direction::Up) => {
                self.cursor = self.cursor.saturating_sub(1);
                tracing::debug!(cursor = self.cursor, "catalog: cursor up");
            }
            AppEvent::Nav(Direction::Down) => {
                if self.cursor + 1 < rows.len() {
                    self.cursor += 1;
                }
                tracing::debug!(cursor = self.cursor, "catalog: cursor down");
            }
            AppEvent::Nav(Direction::Right) => {
                if let Row::Category { category, .. } = &rows[self.cursor] {
                    tracing::debug!(category = %category.label(), "catalog: expand");
                    self.collapsed.remove(category);
                }
            }
            AppEvent::Nav(Direction::Left) => {
                let category = match &rows[self.cursor] {
                    Row::Category { category, .. } => category.clone(),
                    Row::Log(log) => log.category(),
                };
                tracing::debug!(category = %category.label(), "catalog: collapse");
                self.collapsed.insert(category.clone());
                self.cursor = self.header_index(catalog, &category);
            }
            AppEvent::Enter => match &rows[self.cursor] {
                Row::Category { category, .. } => {
                    if !self.collapsed.remove(category) {
                        self.collapsed.insert(category.clone());
                    }
                    tracing::debug!(category = %category.label(), "catalog: toggle");
                }
                Row::Log(log) => {
                    tracing::debug!(id = %log.id, "catalog: choose");
                    return Some(log.id.clone());
                }
            },
            _ => {}
        }
        None
    }

    /// Put the cursor on `id`, expanding its category if needed.
    pub fn reveal(&mut self, catalog: &LogCatalog, id: &str) {
        if let Some(log) = catalog.get(id) {
            self.collapsed.remove(&log.category());
        }
        if let Some(idx) = self
            .rows(catalog)
            .iter()
            .position(|row| matches!(row, Row::Log(log) if log.id == id))
        {
            self.cursor = idx;
        }
    }

    fn header_index(&self, catalog: &LogCatalog, category: &Category) -> usize {
        self.rows(catalog)
            .iter()
            .position(|row| matches!(row, Row::Category { category: c, .. } if c == category))
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Widget
// ---------------------------------------------------------------------------

pub struct CatalogTree<'a> {
    state: &'a CatalogTreeState,
    catalog: &'a LogCatalog,
    selected: Option<&'a str>,
    messages: &'a Messages,
    focused: bool,
    filter_focused: bool,
    theme: &'a Theme,
}

impl<'a> CatalogTree<'a> {
    pub fn new(
        state: &'a CatalogTreeState,
        catalog: &'a LogCatalog,
        messages: &'a Messages,
        theme: &'a Theme,
    ) -> Self {
        Self {
            state,
            catalog,
            selected: None,
            messages,
            focused: false,
            filter_focused: false,
            theme,
        }
    }

    pub fn selected(mut self, id: Option<&'a str>) -> Self {
        self.selected = id;
        self
    }

    pub fn focused(mut self, tree: bool, filter: bool) -> Self {
        self.focused = tree;
        self.filter_focused = filter;
        self
    }

    /// Terminal position of the filter cursor, for `set_cursor_position`.
    pub fn filter_cursor(&self, area: Rect) -> (u16, u16) {
        let prefix = 2; // "⌕ "
        let x = (area.x + 1 + prefix + self.state.filter.cursor_col())
            .min(area.right().saturating_sub(2));
        (x, area.y + 1)
    }

    fn log_item(&self, log: &LogDescriptor) -> ListItem<'static> {
        let marker = if self.selected == Some(log.id.as_str()) {
            Span::styled("● ", self.theme.entry_selected)
        } else {
            Span::raw("  ")
        };
        let mut name = vec![Span::raw("  "), marker];
        if !log.exists {
            name.push(Span::styled(log.name.clone(), self.theme.entry_missing));
            name.push(Span::styled(" ✗", self.theme.entry_missing));
        } else if log.compressed {
            name.push(Span::styled(log.name.clone(), self.theme.entry_compressed));
            name.push(Span::styled(
                format!(" [{}]", self.messages.get("badge.compressed")),
                self.theme.entry_compressed,
            ));
        } else {
            name.push(Span::raw(log.name.clone()));
        }

        let detail = subtitle(log);
        let mut lines = vec![Line::from(name)];
        if !detail.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("      {detail}"),
                self.theme.entry_subtitle,
            )));
        }
        ListItem::new(Text::from(lines))
    }
}

impl Widget for CatalogTree<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused || self.filter_focused {
            self.theme.border_focused
        } else {
            self.theme.border_unfocused
        };

        let title = format!(
            " Logs {}/{} ",
            self.catalog.existing_count(),
            self.catalog.len()
        );
        let block = Block::bordered().title(title).border_style(border_style);
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height == 0 {
            return;
        }

        // Filter line occupies the first inner row.
        let filter_area = Rect { height: 1, ..inner };
        let filter_line = if self.state.filter.is_empty() && !self.filter_focused {
            Line::from(Span::styled(
                "⌕ press f to filter",
                Style::default().add_modifier(Modifier::DIM),
            ))
        } else {
            Line::from(vec![
                Span::styled("⌕ ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(self.state.filter.as_str().to_string()),
            ])
        };
        Paragraph::new(filter_line).render(filter_area, buf);

        let list_area = Rect {
            y: inner.y + 1,
            height: inner.height.saturating_sub(1),
            ..inner
        };

        let rows = self.state.rows(self.catalog);
        if rows.is_empty() {
            let empty = if self.catalog.is_empty() {
                self.messages.get("status.no_logs_configured")
            } else {
                self.messages.get("list.not_found")
            };
            Paragraph::new(Line::from(Span::styled(empty.to_string(), self.theme.placeholder)))
                .render(list_area, buf);
            return;
        }

        let items: Vec<ListItem> = rows
            .iter()
            .map(|row| match row {
                Row::Category {
                    category,
                    count,
                    collapsed,
                } => {
                    let arrow = if *collapsed { "▶ " } else { "▼ " };
                    ListItem::new(Line::from(Span::styled(
                        format!("{arrow}{} ({count})", self.messages.category(category)),
                        self.theme.category_header,
                    )))
                }
                Row::Log(log) => self.log_item(log),
            })
            .collect();

        let highlight = if self.focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        let list = List::new(items).highlight_style(highlight);
        let cursor = self.state.cursor.min(rows.len() - 1);
        let mut list_state = ListState::default().with_selected(Some(cursor));
        StatefulWidget::render(list, list_area, buf, &mut list_state);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn log(id: &str, category: &str, exists: bool) -> LogDescriptor {
        LogDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            path: format!("/var/log/{id}"),
            category: Some(category.to_string()),
            exists,
            compressed: false,
            size: None,
            mtime: None,
        }
    }

    fn catalog() -> LogCatalog {
        LogCatalog::new(vec![
            log("exim", "Mail", true),
            log("apache", "Web Server", true),
            log("nginx", "Web Server", false),
            log("cpanel", "cPanel", true),
        ])
    }

    fn labels(rows: &[Row]) -> Vec<String> {
        rows.iter()
            .map(|row| match row {
                Row::Category { category, count, .. } => format!("{}:{count}", category.label()),
                Row::Log(log) => log.id.clone(),
            })
            .collect()
    }

    #[test]
    fn rows_follow_category_order() {
        let state = CatalogTreeState::default();
        let catalog = catalog();
        assert_eq!(
            labels(&state.rows(&catalog)),
            vec!["cPanel:1", "cpanel", "Web Server:2", "apache", "nginx", "Mail:1", "exim"]
        );
    }

    #[test]
    fn enter_on_log_chooses_it_and_on_header_collapses() {
        let mut state = CatalogTreeState::default();
        let catalog = catalog();
        state.handle(&AppEvent::Nav(Direction::Down), &catalog);
        assert_eq!(state.handle(&AppEvent::Enter, &catalog), Some("cpanel".to_string()));

        state.cursor = 2;
        assert_eq!(state.handle(&AppEvent::Enter, &catalog), None);
        assert_eq!(
            labels(&state.rows(&catalog)),
            vec!["cPanel:1", "cpanel", "Web Server:2", "Mail:1", "exim"]
        );
    }

    #[test]
    fn left_on_log_collapses_parent_and_moves_to_header() {
        let mut state = CatalogTreeState::default();
        let catalog = catalog();
        state.cursor = 4; // nginx
        state.handle(&AppEvent::Nav(Direction::Left), &catalog);
        assert_eq!(state.cursor, 2);
        state.handle(&AppEvent::Nav(Direction::Right), &catalog);
        assert_eq!(state.rows(&catalog).len(), 7);
    }

    #[test]
    fn cursor_is_clamped_after_filtering() {
        let mut state = CatalogTreeState::default();
        let mut catalog = catalog();
        state.cursor = 6;
        catalog.set_filter("exim");
        state.handle(&AppEvent::Nav(Direction::Down), &catalog);
        assert_eq!(state.cursor, 1);
        assert_eq!(labels(&state.rows(&catalog)), vec!["Mail:1", "exim"]);
    }

    #[test]
    fn reveal_expands_and_positions() {
        let mut state = CatalogTreeState::default();
        let catalog = catalog();
        state.cursor = 2;
        state.handle(&AppEvent::Enter, &catalog); // collapse Web Server
        state.reveal(&catalog, "nginx");
        assert_eq!(state.cursor, 4);
    }
}
