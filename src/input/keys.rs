//! Keystroke values produced by the escape decoder.

/// One decoded unit of keyboard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStroke {
    /// A lone ESC byte (not the start of a CSI sequence)
    Escape,
    /// ETX (0x03), delivered as a byte because ISIG is disabled in raw mode
    CtrlC,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    /// A printable (or otherwise unmapped) character
    Character(char),
    /// CR, LF, or CRLF
    Enter,
    /// DEL (0x7F)
    Backspace,
    Tab,
    /// EOT (0x04) from the keyboard, or end of the TTY stream
    Eof,
    /// A CSI sequence we don't map, or bytes that can never be valid UTF-8
    Unknown(String),
}

impl KeyStroke {
    /// Whether this keystroke ends the viewing session.
    pub fn is_quit(&self) -> bool {
        matches!(
            self,
            KeyStroke::CtrlC | KeyStroke::Escape | KeyStroke::Character('q')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_keys() {
        assert!(KeyStroke::CtrlC.is_quit());
        assert!(KeyStroke::Escape.is_quit());
        assert!(KeyStroke::Character('q').is_quit());
    }

    #[test]
    fn test_non_quit_keys() {
        assert!(!KeyStroke::Character('Q').is_quit());
        assert!(!KeyStroke::Character(' ').is_quit());
        assert!(!KeyStroke::Enter.is_quit());
        assert!(!KeyStroke::Eof.is_quit());
        assert!(!KeyStroke::Unknown("\x1b[H".to_string()).is_quit());
    }
}
