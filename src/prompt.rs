use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

/// Single line command input with cursor editing. Used for the search,
/// rows-per-page and page-jump prompts.
#[derive(Default)]
pub struct Prompt {
    buffer: String,
    cursor: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Debug, Default, Clone)]
pub struct PromptState {
    pub input: String,
    pub cursor: usize,
    pub finished: bool,
    pub canceled: bool,
}

impl Prompt {
    pub fn read(&mut self, key: KeyEvent) -> PromptState {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.finished = true,
            (KeyCode::Esc, KeyModifiers::NONE) => {
                self.clear();
                self.canceled = true;
                self.finished = true;
            }
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Left, KeyModifiers::NONE) => self.cursor = self.cursor.saturating_sub(1),
            (KeyCode::Right, KeyModifiers::NONE) => {
                if self.cursor < self.buffer.chars().count() {
                    self.cursor += 1;
                }
            }
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                self.buffer.clear();
                self.cursor = 0;
            }
            (code, _) => {
                if let Some(chr) = code.as_char() {
                    self.buffer.insert(self.byte_pos(), chr);
                    self.cursor += 1;
                }
            }
        }
        trace!("Prompt input: {:?} cursor {}", self.buffer, self.cursor);
        self.state()
    }

    pub fn state(&self) -> PromptState {
        PromptState {
            input: self.buffer.clone(),
            cursor: self.cursor,
            finished: self.finished,
            canceled: self.canceled,
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.finished = false;
        self.canceled = false;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let pos = self.byte_pos();
            self.buffer.remove(pos);
        }
    }

    fn byte_pos(&self) -> usize {
        self.buffer
            .char_indices()
            .nth(self.cursor)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(prompt: &mut Prompt, code: KeyCode) -> PromptState {
        prompt.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn collects_characters_until_enter() {
        let mut p = Prompt::default();
        for c in "abc".chars() {
            press(&mut p, KeyCode::Char(c));
        }
        let state = press(&mut p, KeyCode::Enter);
        assert_eq!(state.input, "abc");
        assert!(state.finished);
        assert!(!state.canceled);
    }

    #[test]
    fn escape_cancels_and_clears() {
        let mut p = Prompt::default();
        press(&mut p, KeyCode::Char('x'));
        let state = press(&mut p, KeyCode::Esc);
        assert!(state.canceled);
        assert!(state.finished);
        assert_eq!(state.input, "");
    }

    #[test]
    fn edits_at_the_cursor() {
        let mut p = Prompt::default();
        for c in "ac".chars() {
            press(&mut p, KeyCode::Char(c));
        }
        press(&mut p, KeyCode::Left);
        press(&mut p, KeyCode::Char('b'));
        assert_eq!(p.state().input, "abc");

        press(&mut p, KeyCode::Backspace);
        assert_eq!(p.state().input, "ac");
    }
}
