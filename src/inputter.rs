use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Single line editor behind the search box and the text filters.
/// The cursor counts characters, not bytes.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    curser_pos: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    /// The text differs from before the key press.
    pub changed: bool,
    pub curser_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        let before = self.current_input.clone();
        let mut result = match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.enter(),
            (KeyCode::Esc, _) => self.escape(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.left(),
            (KeyCode::Right, _) => self.right(),
            (KeyCode::Home, _) => self.home(),
            (KeyCode::End, _) => self.end(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => self.kill_line(),
            (kc, km) => self.key(kc, km),
        };
        result.changed = before != result.input;
        trace!("Input {:?} -> {:?}", key.code, result);
        result
    }

    /// Start editing with `s` and put the cursor at its end.
    pub fn set(&mut self, s: &str) {
        self.clear();
        self.current_input = s.to_string();
        self.curser_pos = s.chars().count();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            changed: false,
            curser_pos: self.curser_pos,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.curser_pos = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        self.get()
    }

    /// Escape leaves the text untouched, the caller decides what canceling means.
    fn escape(&mut self) -> InputResult {
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.curser_pos > 0 {
            self.curser_pos -= 1;
            let idx = self.byte_pos();
            self.current_input.remove(idx);
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        if self.curser_pos < self.current_input.chars().count() {
            let idx = self.byte_pos();
            self.current_input.remove(idx);
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.curser_pos = self.curser_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.curser_pos < self.current_input.chars().count() {
            self.curser_pos += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.curser_pos = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.curser_pos = self.current_input.chars().count();
        self.get()
    }

    fn kill_line(&mut self) -> InputResult {
        self.current_input.clear();
        self.curser_pos = 0;
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifier: KeyModifiers) -> InputResult {
        if modifier.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return self.get();
        }
        if let Some(chr) = code.as_char() {
            let idx = self.byte_pos();
            self.current_input.insert(idx, chr);
            self.curser_pos += 1;
        }
        self.get()
    }

    fn byte_pos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.curser_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}
