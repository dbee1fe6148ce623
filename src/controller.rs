use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode};
use tracing::trace;

use crate::domain::{Message, TBConfig, TBError};
use crate::model::{Model, Modus};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TBConfig) -> Self {
        Self { event_poll_time: cfg.event_poll_time }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TBError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    // The active prompt consumes keys verbatim.
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(model, key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => (),
            }
        }
        Ok(None)
    }

    fn handle_key(&self, model: &Model, key: event::KeyEvent) -> Option<Message> {
        // A popup swallows everything except quit.
        if model.modus() == Modus::Popup {
            return match key.code {
                KeyCode::Char('q') => Some(Message::Quit),
                _ => Some(Message::Exit),
            };
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Esc => Some(Message::Exit),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Tab => Some(Message::SwitchView),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::Char('n') => Some(Message::NextPage),
            KeyCode::Char('p') => Some(Message::PrevPage),
            KeyCode::Char('s') => Some(Message::SortColumn),
            KeyCode::Char(' ') => Some(Message::ToggleSelect),
            KeyCode::Char('a') => Some(Message::SelectAll),
            KeyCode::Char('y') => Some(Message::CopyRow),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('r') => Some(Message::RowsPerPage),
            KeyCode::Char('g') => Some(Message::JumpToPage),
            KeyCode::Enter => Some(Message::GrabOrDrop),
            KeyCode::Char('<') => Some(Message::MoveColumnLeft),
            KeyCode::Char('>') => Some(Message::MoveColumnRight),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
