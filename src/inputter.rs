use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

/// Line editor behind the search box. The cursor counts characters, not bytes.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    cursor_pos: usize,
    submitted: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub submitted: bool,
    pub canceled: bool,
    pub cursor_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        self.submitted = false;
        self.canceled = false;
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.submitted = true,
            (KeyCode::Esc, _) => self.canceled = true,
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.cursor_pos = self.cursor_pos.saturating_sub(1),
            (KeyCode::Right, _) => self.cursor_pos = (self.cursor_pos + 1).min(self.len()),
            (KeyCode::Home, _) => self.cursor_pos = 0,
            (KeyCode::End, _) => self.cursor_pos = self.len(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => self.set(""),
            (KeyCode::Char(chr), m) if !m.contains(KeyModifiers::CONTROL) => self.insert(chr),
            (code, modifiers) => trace!("Ignoring input key {code:?} {modifiers:?}"),
        }
        self.get()
    }

    /// Replaces the text and moves the cursor behind it.
    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.cursor_pos = self.len();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            input: self.current_input.clone(),
            submitted: self.submitted,
            canceled: self.canceled,
            cursor_pos: self.cursor_pos,
        }
    }

    fn len(&self) -> usize {
        self.current_input.chars().count()
    }

    fn insert(&mut self, chr: char) {
        let pos = self.byte_pos(self.cursor_pos);
        self.current_input.insert(pos, chr);
        self.cursor_pos += 1;
    }

    fn backspace(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            let pos = self.byte_pos(self.cursor_pos);
            self.current_input.remove(pos);
        }
    }

    fn delete(&mut self) {
        if self.cursor_pos < self.len() {
            let pos = self.byte_pos(self.cursor_pos);
            self.current_input.remove(pos);
        }
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

    fn press(inputter: &mut Inputter, code: KeyCode) -> InputResult {
        inputter.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(inputter: &mut Inputter, text: &str) {
        for c in text.chars() {
            press(inputter, KeyCode::Char(c));
        }
    }

    #[test]
    fn edits_at_the_cursor() {
        let mut inputter = Inputter::default();
        type_text(&mut inputter, "hnda");
        press(&mut inputter, KeyCode::Home);
        press(&mut inputter, KeyCode::Right);
        let result = press(&mut inputter, KeyCode::Char('o'));
        assert_eq!(result.input, "honda");
        assert_eq!(result.cursor_pos, 2);

        press(&mut inputter, KeyCode::End);
        let result = press(&mut inputter, KeyCode::Backspace);
        assert_eq!(result.input, "hond");
        press(&mut inputter, KeyCode::Home);
        let result = press(&mut inputter, KeyCode::Delete);
        assert_eq!(result.input, "ond");
        assert_eq!(result.cursor_pos, 0);
    }

    #[test]
    fn handles_multibyte_characters() {
        let mut inputter = Inputter::default();
        type_text(&mut inputter, "gelände");
        press(&mut inputter, KeyCode::Left);
        press(&mut inputter, KeyCode::Left);
        let result = press(&mut inputter, KeyCode::Backspace);
        assert_eq!(result.input, "gelände".replace('n', ""));
        assert_eq!(result.cursor_pos, 4);
    }

    #[test]
    fn enter_submits_and_escape_cancels() {
        let mut inputter = Inputter::default();
        type_text(&mut inputter, "ktm");
        let result = press(&mut inputter, KeyCode::Enter);
        assert!(result.submitted);
        assert_eq!(result.input, "ktm");

        let result = press(&mut inputter, KeyCode::Char('!'));
        assert!(!result.submitted);

        let result = press(&mut inputter, KeyCode::Esc);
        assert!(result.canceled);
        assert_eq!(result.input, "ktm!");
    }

    #[test]
    fn set_moves_cursor_to_end() {
        let mut inputter = Inputter::default();
        inputter.set("ducati");
        assert_eq!(inputter.get().cursor_pos, 6);
        inputter.set("");
        assert_eq!(inputter.get(), InputResult::default());
    }
}
