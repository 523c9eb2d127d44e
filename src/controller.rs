use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, ReconError, ViewConfig};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &ViewConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Waits up to the poll time for an event. Returning `None` still lets
    /// the model run, which is what commits debounced input.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, ReconError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    Self::handle_key(key)
                }
            }
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    pub fn handle_key(key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Tab, _) => Some(Message::SwitchTable),
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Left, _) => Some(Message::MoveLeft),
            (KeyCode::Right, _) => Some(Message::MoveRight),
            (KeyCode::PageDown, _) => Some(Message::NextPage),
            (KeyCode::PageUp, _) => Some(Message::PreviousPage),
            (KeyCode::Home, _) => Some(Message::FirstPage),
            (KeyCode::End, _) => Some(Message::LastPage),
            (KeyCode::Char('+'), _) => Some(Message::GrowPageSize),
            (KeyCode::Char('-'), _) => Some(Message::ShrinkPageSize),
            (KeyCode::Char('s'), _) => Some(Message::ToggleSort),
            (KeyCode::Char('/'), _) => Some(Message::SearchAll),
            (KeyCode::Char('f'), _) => Some(Message::FilterColumn),
            (KeyCode::Char('c'), _) => Some(Message::ClearFilters),
            (KeyCode::Char('d'), _) => Some(Message::ToggleDiseaseStats),
            (KeyCode::Char('h'), _) => Some(Message::Histogram),
            (KeyCode::Char('g'), _) => Some(Message::GotoPage),
            (KeyCode::Char('r'), _) => Some(Message::Reports),
            (KeyCode::Char('e'), _) => Some(Message::Export),
            (KeyCode::Char('y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Esc, _) => Some(Message::Exit),
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

    fn map(code: KeyCode) -> Option<Message> {
        Controller::handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn maps_navigation_keys() {
        assert_eq!(map(KeyCode::PageDown), Some(Message::NextPage));
        assert_eq!(map(KeyCode::End), Some(Message::LastPage));
        assert_eq!(map(KeyCode::Char('+')), Some(Message::GrowPageSize));
        assert_eq!(map(KeyCode::Tab), Some(Message::SwitchTable));
        assert_eq!(map(KeyCode::Char('g')), Some(Message::GotoPage));
        assert_eq!(map(KeyCode::Char('r')), Some(Message::Reports));
        assert_eq!(map(KeyCode::Char('x')), None);
    }

    #[test]
    fn control_c_quits_while_c_clears() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(Controller::handle_key(ctrl_c), Some(Message::Quit));
        assert_eq!(map(KeyCode::Char('c')), Some(Message::ClearFilters));
    }
}
