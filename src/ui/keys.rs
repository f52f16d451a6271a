//! ui::keys
//!
//! Terminal-independent key model. The reducer only ever sees [`Key`], so
//! it can be driven from tests without a terminal.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// A key press the reducer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Tab,
    Up,
    Down,
    PageUp,
    PageDown,
    F(u8),
    /// Ctrl+C, the universal interrupt.
    Interrupt,
}

impl Key {
    /// Map a crossterm event. Releases and unsupported keys map to `None`.
    pub fn from_event(event: KeyEvent) -> Option<Self> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        if event.modifiers.contains(KeyModifiers::CONTROL) {
            return match event.code {
                KeyCode::Char('c') | KeyCode::Char('C') => Some(Self::Interrupt),
                _ => None,
            };
        }
        let key = match event.code {
            KeyCode::Char(c) => Self::Char(c),
            KeyCode::Enter => Self::Enter,
            KeyCode::Esc => Self::Esc,
            KeyCode::Backspace => Self::Backspace,
            KeyCode::Tab => Self::Tab,
            KeyCode::Up => Self::Up,
            KeyCode::Down => Self::Down,
            KeyCode::PageUp => Self::PageUp,
            KeyCode::PageDown => Self::PageDown,
            KeyCode::F(n) => Self::F(n),
            _ => return None,
        };
        Some(key)
    }

    /// Printable character, if any.
    pub fn printable(self) -> Option<char> {
        match self {
            Self::Char(c) if !c.is_control() => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_c_is_interrupt() {
        let event = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(Key::from_event(event), Some(Key::Interrupt));
    }

    #[test]
    fn plain_chars_and_specials() {
        let event = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(Key::from_event(event), Some(Key::Char('q')));
        let event = KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE);
        assert_eq!(Key::from_event(event), Some(Key::F(5)));
        let event = KeyEvent::new(KeyCode::Home, KeyModifiers::NONE);
        assert_eq!(Key::from_event(event), None);
    }

    #[test]
    fn other_control_chords_ignored() {
        let event = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL);
        assert_eq!(Key::from_event(event), None);
    }
}
