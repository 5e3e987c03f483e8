//! In-page key chords.
//!
//! ## Default Keybindings
//!
//! | Key | Action |
//! |-----|--------|
//! | `Shift+E` | Explain the current text selection |
//! | `Ctrl+Shift+Q` | Open/close the command center |
//!
//! Letters match case-insensitively. The explain chord does not fire while
//! Ctrl is held, so the two chords never overlap.

use crate::config::RelayConfig;

/// A key press as reported by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: char,
    pub shift: bool,
    pub ctrl: bool,
}

impl KeyPress {
    pub fn new(key: char) -> Self {
        Self {
            key,
            shift: false,
            ctrl: false,
        }
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }
}

/// What a recognized chord asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Explain,
    ToggleConsole,
}

/// The configured chords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    explain_key: char,
    console_key: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new('E', 'Q')
    }
}

impl KeyBindings {
    pub fn new(explain_key: char, console_key: char) -> Self {
        Self {
            explain_key: explain_key.to_ascii_lowercase(),
            console_key: console_key.to_ascii_lowercase(),
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.explain_key, config.console_key)
    }

    /// Map a key press to the action it triggers, if any.
    pub fn classify(&self, press: &KeyPress) -> Option<Trigger> {
        let key = press.key.to_ascii_lowercase();
        if press.ctrl && press.shift && key == self.console_key {
            Some(Trigger::ToggleConsole)
        } else if press.shift && !press.ctrl && key == self.explain_key {
            Some(Trigger::Explain)
        } else {
            None
        }
    }

    /// The key press that triggers an explanation.
    pub fn explain_chord(&self) -> KeyPress {
        KeyPress::new(self.explain_key).shift()
    }

    /// The key press that toggles the command center.
    pub fn console_chord(&self) -> KeyPress {
        KeyPress::new(self.console_key).shift().ctrl()
    }

    /// Human-readable chord descriptions, for help output.
    pub fn describe(&self) -> [(String, &'static str); 2] {
        [
            (
                format!("Shift+{}", self.explain_key.to_ascii_uppercase()),
                "explain selection",
            ),
            (
                format!("Ctrl+Shift+{}", self.console_key.to_ascii_uppercase()),
                "toggle command center",
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chords() {
        let keys = KeyBindings::default();
        assert_eq!(keys.classify(&KeyPress::new('E').shift()), Some(Trigger::Explain));
        assert_eq!(keys.classify(&KeyPress::new('e').shift()), Some(Trigger::Explain));
        assert_eq!(
            keys.classify(&KeyPress::new('q').shift().ctrl()),
            Some(Trigger::ToggleConsole)
        );
    }

    #[test]
    fn test_partial_chords_do_nothing() {
        let keys = KeyBindings::default();
        assert_eq!(keys.classify(&KeyPress::new('e')), None);
        assert_eq!(keys.classify(&KeyPress::new('q').shift()), None);
        assert_eq!(keys.classify(&KeyPress::new('q').ctrl()), None);
        assert_eq!(keys.classify(&KeyPress::new('e').shift().ctrl()), None);
    }

    #[test]
    fn test_configured_chords() {
        let config = RelayConfig {
            explain_key: 'x',
            console_key: 'K',
            ..RelayConfig::default()
        };
        let keys = KeyBindings::from_config(&config);
        assert_eq!(keys.classify(&KeyPress::new('X').shift()), Some(Trigger::Explain));
        assert_eq!(
            keys.classify(&KeyPress::new('k').shift().ctrl()),
            Some(Trigger::ToggleConsole)
        );
        assert_eq!(keys.describe()[1].0, "Ctrl+Shift+K");
        assert_eq!(keys.classify(&keys.explain_chord()), Some(Trigger::Explain));
        assert_eq!(keys.classify(&keys.console_chord()), Some(Trigger::ToggleConsole));
    }
}
