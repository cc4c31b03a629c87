use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Editable text with a cursor, counted in chars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with `value`, cursor at the end.
    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    /// Start of the current line.
    pub fn home(&mut self) {
        let (_, col) = self.cursor_position();
        self.cursor -= col;
    }

    /// End of the current line.
    pub fn end(&mut self) {
        let rest = self.value.chars().skip(self.cursor);
        self.cursor += rest.take_while(|&c| c != '\n').count();
    }

    /// Cursor as (line, column), both zero based.
    pub fn cursor_position(&self) -> (usize, usize) {
        let before = self.value.chars().take(self.cursor);
        let mut row = 0;
        let mut col = 0;
        for c in before {
            if c == '\n' {
                row += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (row, col)
    }

    /// Apply an editing key. Returns false for keys the field doesn't handle.
    pub fn handle_key(&mut self, key: KeyEvent, multiline: bool) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('u') => {
                    self.clear();
                    true
                }
                KeyCode::Char('a') => {
                    self.home();
                    true
                }
                KeyCode::Char('e') => {
                    self.end();
                    true
                }
                _ => false,
            };
        }

        match key.code {
            KeyCode::Char(c) => self.insert(c),
            KeyCode::Enter if multiline => self.insert('\n'),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.left(),
            KeyCode::Right => self.right(),
            KeyCode::Home => self.home(),
            KeyCode::End => self.end(),
            _ => return false,
        }
        true
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.value
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }
}
