use std::time::Duration;
use tracing::trace;

use crate::domain::{BVConfig, BVError, Message};
use crate::model::Model;
use crate::record::Field;
use crate::ui::TableUI;
use ratatui::crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &BVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model, ui: &TableUI) -> Result<Option<Message>, BVError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(self.map_event(event::read()?, model, ui));
        }
        Ok(None)
    }

    fn map_event(&self, event: Event, model: &Model, ui: &TableUI) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(key)
                }
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse, ui),
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        }
    }

    fn handle_mouse(&self, mouse: MouseEvent, ui: &TableUI) -> Option<Message> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => ui
                .header_at(mouse.column, mouse.row)
                .map(Message::SortBy),
            MouseEventKind::ScrollDown => Some(Message::MoveDown),
            MouseEventKind::ScrollUp => Some(Message::MoveUp),
            _ => None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('/'), _) => Some(Message::EditSearch),
            (KeyCode::Char('c'), _) => Some(Message::ClearSearch),
            (KeyCode::Char(c @ '1'..='6'), _) => c
                .to_digit(10)
                .map(|d| Message::SortBy(Field::COLUMNS[d as usize - 1])),
            (KeyCode::Char('s'), _) => Some(Message::SortSelectedColumn),
            (KeyCode::Char('y'), _) => Some(Message::CopyRecord),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Left, _) | (KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right, _) | (KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::Home, _) | (KeyCode::Char('g'), _) => Some(Message::MoveBeginning),
            (KeyCode::End, _) | (KeyCode::Char('G'), _) => Some(Message::MoveEnd),
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
    use crate::record::Dataset;
    use ratatui::crossterm::event::KeyEventKind;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn setup() -> (Controller, Model, TableUI) {
        let cfg = BVConfig::default();
        let model = Model::init(&cfg, Dataset::default(), 80, 24).unwrap();
        (Controller::new(&cfg), model, TableUI::new(&cfg))
    }

    #[test]
    fn number_keys_select_sortable_columns() {
        let (controller, _, _) = setup();
        assert_eq!(
            controller.handle_key(key(KeyCode::Char('1'))),
            Some(Message::SortBy(Field::Make))
        );
        assert_eq!(
            controller.handle_key(key(KeyCode::Char('6'))),
            Some(Message::SortBy(Field::Terrain))
        );
        assert_eq!(controller.handle_key(key(KeyCode::Char('7'))), None);
    }

    #[test]
    fn keys_map_to_messages() {
        let (controller, _, _) = setup();
        assert_eq!(controller.handle_key(key(KeyCode::Char('q'))), Some(Message::Quit));
        assert_eq!(
            controller.handle_key(key(KeyCode::Char('/'))),
            Some(Message::EditSearch)
        );
        assert_eq!(
            controller.handle_key(key(KeyCode::Char('c'))),
            Some(Message::ClearSearch)
        );
        assert_eq!(
            controller.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Message::Quit)
        );
        assert_eq!(controller.handle_key(key(KeyCode::Enter)), Some(Message::Enter));
    }

    #[test]
    fn search_input_receives_raw_keys() {
        let (controller, mut model, ui) = setup();
        model.update(Some(Message::EditSearch)).unwrap();
        let q = key(KeyCode::Char('q'));
        assert_eq!(
            controller.map_event(Event::Key(q), &model, &ui),
            Some(Message::RawKey(q))
        );

        let mut release = key(KeyCode::Char('x'));
        release.kind = KeyEventKind::Release;
        assert_eq!(controller.map_event(Event::Key(release), &model, &ui), None);
    }

    #[test]
    fn resize_and_unmapped_mouse_events() {
        let (controller, model, ui) = setup();
        assert_eq!(
            controller.map_event(Event::Resize(100, 30), &model, &ui),
            Some(Message::Resize(100, 30))
        );
        // Nothing was drawn yet, so no header can be hit.
        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 2,
            row: 5,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(controller.map_event(Event::Mouse(click), &model, &ui), None);
    }
}
