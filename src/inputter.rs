use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

/// Single line editor for filter text.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    cursor_pos: usize, // In characters, not bytes
    finished: bool,
    canceled: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.finished = true,
            (KeyCode::Esc, _) => {
                self.canceled = true;
                self.finished = true;
            }
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.cursor_pos = self.cursor_pos.saturating_sub(1),
            (KeyCode::Right, _) => {
                self.cursor_pos = std::cmp::min(self.cursor_pos + 1, self.char_count())
            }
            (KeyCode::Home, _) => self.cursor_pos = 0,
            (KeyCode::End, _) => self.cursor_pos = self.char_count(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => self.set(""),
            (KeyCode::Char(chr), m) if !m.contains(KeyModifiers::CONTROL) => {
                let at = self.byte_pos(self.cursor_pos);
                self.current_input.insert(at, chr);
                self.cursor_pos += 1;
            }
            _ => {}
        }
        self.get()
    }

    /// Starts editing `s` with the cursor at its end.
    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.cursor_pos = self.char_count();
        self.finished = false;
        self.canceled = false;
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            input: self.current_input.clone(),
            finished: self.finished,
            canceled: self.canceled,
            cursor_pos: self.cursor_pos,
        }
    }

    fn backspace(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            let at = self.byte_pos(self.cursor_pos);
            self.current_input.remove(at);
        }
    }

    fn delete(&mut self) {
        if self.cursor_pos < self.char_count() {
            let at = self.byte_pos(self.cursor_pos);
            self.current_input.remove(at);
        }
    }

    fn char_count(&self) -> usize {
        self.current_input.chars().count()
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.current_input
            .char_indices()
            .nth(char_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(input: &mut Inputter, s: &str) -> InputResult {
        let mut result = input.get();
        for c in s.chars() {
            result = input.read(key(KeyCode::Char(c)));
        }
        result
    }

    #[test]
    fn edits_at_the_cursor() {
        let mut input = Inputter::default();
        type_str(&mut input, "Mesles");
        for _ in 0..4 {
            input.read(key(KeyCode::Left));
        }
        let result = type_str(&mut input, "a");
        assert_eq!(result.input, "Measles");
        assert_eq!(result.cursor_pos, 3);

        input.read(key(KeyCode::Backspace));
        input.read(key(KeyCode::Delete));
        let result = input.read(key(KeyCode::End));
        assert_eq!(result.input, "Meles");
        assert_eq!(result.cursor_pos, 5);
    }

    #[test]
    fn handles_multibyte_characters() {
        let mut input = Inputter::default();
        input.set("Zürich");
        input.read(key(KeyCode::Home));
        input.read(key(KeyCode::Right));
        input.read(key(KeyCode::Right));
        let result = input.read(key(KeyCode::Backspace));
        assert_eq!(result.input, "Zrich");
    }

    #[test]
    fn enter_finishes_and_escape_cancels() {
        let mut input = Inputter::default();
        type_str(&mut input, "A10");
        let result = input.read(key(KeyCode::Enter));
        assert!(result.finished && !result.canceled);

        input.set("x");
        let result = input.read(key(KeyCode::Esc));
        assert!(result.finished && result.canceled);
    }
}
