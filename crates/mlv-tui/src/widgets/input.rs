//! Single-line text buffer shared by the query bar, the catalog filter line
//! and the command bar.

use crate::event::{AppEvent, Direction};

#[derive(Debug, Default, Clone)]
pub struct TextInput {
    pub text: String,
    /// Byte offset of the cursor within `text`.
    pub cursor: usize,
}

impl TextInput {
    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.text.len();
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Apply an editing event. Returns `true` when the text changed.
    pub fn handle(&mut self, event: &AppEvent) -> bool {
        match event {
            AppEvent::Char(c) => {
                self.text.insert(self.cursor, *c);
                self.cursor += c.len_utf8();
                true
            }
            AppEvent::Backspace => {
                if self.cursor == 0 {
                    return false;
                }
                let prev = self.prev_boundary();
                self.text.remove(prev);
                self.cursor = prev;
                true
            }
            AppEvent::Nav(Direction::Left) => {
                self.cursor = self.prev_boundary();
                false
            }
            AppEvent::Nav(Direction::Right) => {
                if self.cursor < self.text.len() {
                    self.cursor = self.text[self.cursor..]
                        .char_indices()
                        .nth(1)
                        .map(|(i, _)| self.cursor + i)
                        .unwrap_or(self.text.len());
                }
                false
            }
            _ => false,
        }
    }

    /// Display column of the cursor (in chars, not bytes).
    pub fn cursor_col(&self) -> u16 {
        self.text[..self.cursor].chars().count() as u16
    }

    fn prev_boundary(&self) -> usize {
        self.text[..self.cursor]
            .char_indices()
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_backspace_and_cursor_moves() {
        let mut input = TextInput::default();
        for c in "abc".chars() {
            assert!(input.handle(&AppEvent::Char(c)));
        }
        assert!(!input.handle(&AppEvent::Nav(Direction::Left)));
        assert!(input.handle(&AppEvent::Backspace));
        assert_eq!(input.as_str(), "ac");
        assert_eq!(input.cursor, 1);
        input.handle(&AppEvent::Nav(Direction::Right));
        input.handle(&AppEvent::Nav(Direction::Right));
        assert_eq!(input.cursor, 2);
    }

    #[test]
    fn multibyte_characters_keep_boundaries() {
        let mut input = TextInput::default();
        input.set("añb");
        input.handle(&AppEvent::Nav(Direction::Left));
        input.handle(&AppEvent::Backspace);
        assert_eq!(input.as_str(), "ab");
        assert_eq!(input.cursor_col(), 1);
    }

    #[test]
    fn backspace_at_start_is_noop() {
        let mut input = TextInput::default();
        assert!(!input.handle(&AppEvent::Backspace));
        assert!(input.is_empty());
    }
}
