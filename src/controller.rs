use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crate::config::DashConfig;
use crate::domain::{DashError, Message};
use crate::model::Model;
use crate::views::ViewKind;

pub struct Controller {
    event_poll_time: u64
}

impl Controller {
    pub fn new(cfg: &DashConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Wait up to the poll time for a terminal event. Returns `None` on a
    /// timeout so the model still gets to pick up finished fetches.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, DashError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            let message = match key.code {
                KeyCode::Char('c') => Some(Message::Quit),
                _ => None,
            };
            trace!("Mapped: {key:?} => {message:?}");
            return message;
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Left => Some(Message::MoveLeft),
            KeyCode::Right => Some(Message::MoveRight),
            KeyCode::Char('h') => Some(Message::ScrollLeft),
            KeyCode::Char('l') => Some(Message::ScrollRight),
            KeyCode::Tab => Some(Message::NextView),
            KeyCode::Char('1') => Some(Message::SelectView(ViewKind::Users)),
            KeyCode::Char('2') => Some(Message::SelectView(ViewKind::Products)),
            KeyCode::Char('t') => Some(Message::NextTab),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('f') => Some(Message::FocusFilters),
            KeyCode::Char('x') => Some(Message::RemoveFilter),
            KeyCode::Char('X') => Some(Message::ClearFilters),
            KeyCode::Char('n') | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Char('p') | KeyCode::PageUp => Some(Message::PrevPage),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::FirstPage),
            KeyCode::Char('G') | KeyCode::End => Some(Message::LastPage),
            KeyCode::Char('m') => Some(Message::MiddlePage),
            KeyCode::Char('s') => Some(Message::CyclePageSize),
            KeyCode::Char('r') => Some(Message::Refetch),
            KeyCode::Char('y') => Some(Message::CopyRow),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn map(code: KeyCode, modifiers: KeyModifiers) -> Option<Message> {
        Controller::new(&DashConfig::default()).handle_key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn keys_map_to_messages() {
        assert_eq!(map(KeyCode::Char('q'), KeyModifiers::NONE), Some(Message::Quit));
        assert_eq!(map(KeyCode::Char('c'), KeyModifiers::CONTROL), Some(Message::Quit));
        assert_eq!(
            map(KeyCode::Char('2'), KeyModifiers::NONE),
            Some(Message::SelectView(ViewKind::Products))
        );
        assert_eq!(map(KeyCode::Char('X'), KeyModifiers::SHIFT), Some(Message::ClearFilters));
        assert_eq!(map(KeyCode::Right, KeyModifiers::NONE), Some(Message::MoveRight));
        assert_eq!(map(KeyCode::Char('z'), KeyModifiers::NONE), None);
    }
}
