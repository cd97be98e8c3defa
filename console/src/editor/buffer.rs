/// Edit buffer for the line editor
///
/// A flat `Vec<char>` with embedded newlines and a cursor index. Logical
/// lines and the (line, column) position are derived on demand.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    chars: Vec<char>,
    cursor: usize,
}

/// Chars that make up an identifier for completion and word kills
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer holding `text`, cursor at the end
    pub fn from_text(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let cursor = chars.len();
        LineBuffer { chars, cursor }
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn set_text(&mut self, text: &str) {
        *self = Self::from_text(text);
    }

    pub fn insert(&mut self, c: char) {
        self.chars.insert(self.cursor, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars() {
            self.insert(c);
        }
    }

    /// Delete before the cursor; false if there was nothing to delete
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.chars.remove(self.cursor);
        true
    }

    /// Delete under the cursor
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.chars.len() {
            return false;
        }
        self.chars.remove(self.cursor);
        true
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.chars.len());
    }

    fn line_start_of(&self, at: usize) -> usize {
        self.chars[..at]
            .iter()
            .rposition(|&c| c == '\n')
            .map_or(0, |i| i + 1)
    }

    fn line_end_of(&self, at: usize) -> usize {
        self.chars[at..]
            .iter()
            .position(|&c| c == '\n')
            .map_or(self.chars.len(), |i| at + i)
    }

    pub fn move_line_start(&mut self) {
        self.cursor = self.line_start_of(self.cursor);
    }

    pub fn move_line_end(&mut self) {
        self.cursor = self.line_end_of(self.cursor);
    }

    /// Cut from the cursor to the end of the current line
    pub fn kill_to_line_end(&mut self) -> String {
        let end = self.line_end_of(self.cursor);
        self.chars.drain(self.cursor..end).collect()
    }

    /// Cut from the start of the current line to the cursor
    pub fn kill_to_line_start(&mut self) -> String {
        let start = self.line_start_of(self.cursor);
        let killed = self.chars.drain(start..self.cursor).collect();
        self.cursor = start;
        killed
    }

    /// Cut the whitespace-delimited word before the cursor
    pub fn kill_word_back(&mut self) -> String {
        let mut start = self.cursor;
        while start > 0 && self.chars[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !self.chars[start - 1].is_whitespace() {
            start -= 1;
        }
        let killed = self.chars.drain(start..self.cursor).collect();
        self.cursor = start;
        killed
    }

    /// Identifier chars immediately before the cursor
    pub fn word_before_cursor(&self) -> String {
        let start = self.chars[..self.cursor]
            .iter()
            .rposition(|&c| !is_word_char(c))
            .map_or(0, |i| i + 1);
        self.chars[start..self.cursor].iter().collect()
    }

    /// Move to the previous logical line, keeping the column where possible
    pub fn move_up(&mut self) -> bool {
        let start = self.line_start_of(self.cursor);
        if start == 0 {
            return false;
        }
        let column = self.cursor - start;
        let prev_start = self.line_start_of(start - 1);
        self.cursor = (prev_start + column).min(start - 1);
        true
    }

    /// Move to the next logical line, keeping the column where possible
    pub fn move_down(&mut self) -> bool {
        let end = self.line_end_of(self.cursor);
        if end == self.chars.len() {
            return false;
        }
        let column = self.cursor - self.line_start_of(self.cursor);
        let next_start = end + 1;
        self.cursor = (next_start + column).min(self.line_end_of(next_start));
        true
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().split('\n').map(str::to_string).collect()
    }

    /// (line, column) of the cursor, in chars
    pub fn position(&self) -> (usize, usize) {
        let line = self.chars[..self.cursor]
            .iter()
            .filter(|&&c| c == '\n')
            .count();
        (line, self.cursor - self.line_start_of(self.cursor))
    }
}
