//! Byte-stream to keystroke decoding.
//!
//! Terminal input arrives in arbitrary chunks: an arrow key may be split
//! across two reads, and so may a multi-byte UTF-8 character. The decoder
//! buffers bytes until a complete unit is available and never discards
//! bytes that might still become part of one.
//!
//! Recognized units, checked against the first buffered byte:
//!
//! | Bytes                   | Keystroke                         |
//! |-------------------------|-----------------------------------|
//! | `ESC [ A/B/C/D`         | arrow up / down / right / left    |
//! | `ESC [ ... <0x40-0x7E>` | `Unknown` (other CSI sequences)   |
//! | `ESC <other>`           | `Escape` (only the ESC consumed)  |
//! | `0x03`                  | `CtrlC`                           |
//! | `0x7F`                  | `Backspace`                       |
//! | `CR`, `LF`, `CR LF`     | `Enter`                           |
//! | `0x09`                  | `Tab`                             |
//! | `0x04`                  | `Eof`                             |
//! | valid UTF-8 character   | `Character`                       |

use super::keys::KeyStroke;

const ESC: u8 = 0x1B;
const CR: u8 = 0x0D;
const LF: u8 = 0x0A;

/// Outcome of decoding one unit from the front of a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A complete unit: the keystroke and how many bytes it used
    Complete(KeyStroke, usize),
    /// The buffer holds the start of a unit; wait for more bytes
    Incomplete,
    /// The leading bytes can never become valid input; this many should be skipped
    Invalid(usize),
}

/// Decode a single unit from the front of `buf`.
///
/// Pure function: it never mutates the buffer and never blocks. An empty
/// buffer is `Incomplete`.
pub fn decode(buf: &[u8]) -> Decoded {
    let Some(&first) = buf.first() else {
        return Decoded::Incomplete;
    };

    match first {
        ESC => decode_escape(buf),
        0x03 => Decoded::Complete(KeyStroke::CtrlC, 1),
        0x7F => Decoded::Complete(KeyStroke::Backspace, 1),
        CR | LF => {
            if first == CR && buf.get(1) == Some(&LF) {
                Decoded::Complete(KeyStroke::Enter, 2)
            } else {
                Decoded::Complete(KeyStroke::Enter, 1)
            }
        }
        0x09 => Decoded::Complete(KeyStroke::Tab, 1),
        0x04 => Decoded::Complete(KeyStroke::Eof, 1),
        _ => decode_character(buf),
    }
}

fn decode_escape(buf: &[u8]) -> Decoded {
    if buf.len() == 1 {
        return Decoded::Incomplete;
    }
    if buf[1] != b'[' {
        return Decoded::Complete(KeyStroke::Escape, 1);
    }
    if buf.len() < 3 {
        return Decoded::Incomplete;
    }

    let arrow = match buf[2] {
        b'A' => Some(KeyStroke::ArrowUp),
        b'B' => Some(KeyStroke::ArrowDown),
        b'C' => Some(KeyStroke::ArrowRight),
        b'D' => Some(KeyStroke::ArrowLeft),
        _ => None,
    };
    if let Some(stroke) = arrow {
        return Decoded::Complete(stroke, 3);
    }

    // Parameter and intermediate bytes until the final byte in 0x40..=0x7E
    match buf[2..].iter().position(|b| (0x40..=0x7E).contains(b)) {
        Some(offset) => {
            let len = 2 + offset + 1;
            let text: String = buf[..len]
                .iter()
                .filter(|b| b.is_ascii())
                .map(|&b| b as char)
                .collect();
            Decoded::Complete(KeyStroke::Unknown(text), len)
        }
        None => Decoded::Incomplete,
    }
}

fn decode_character(buf: &[u8]) -> Decoded {
    // A UTF-8 character is at most 4 bytes
    let window = &buf[..buf.len().min(4)];
    let valid = match std::str::from_utf8(window) {
        Ok(text) => text,
        Err(e) if e.valid_up_to() > 0 => match std::str::from_utf8(&window[..e.valid_up_to()]) {
            Ok(text) => text,
            Err(_) => return Decoded::Incomplete,
        },
        Err(e) => {
            return match e.error_len() {
                None => Decoded::Incomplete,
                Some(len) => Decoded::Invalid(len),
            };
        }
    };

    match valid.chars().next() {
        Some(c) => Decoded::Complete(KeyStroke::Character(c), c.len_utf8()),
        None => Decoded::Incomplete,
    }
}

/// Stateful decoder that owns the pending byte buffer.
#[derive(Debug, Default)]
pub struct EscapeDecoder {
    buffer: Vec<u8>,
    /// The last unit was a lone CR at the end of a chunk; a leading LF in
    /// the next chunk belongs to it.
    after_cr: bool,
}

impl EscapeDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return every keystroke that is now complete.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<KeyStroke> {
        self.buffer.extend_from_slice(bytes);
        self.drain()
    }

    /// Bytes held back waiting for the rest of a unit.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// True when the only buffered byte is an ESC that may or may not start a sequence.
    pub fn has_lone_escape(&self) -> bool {
        self.buffer == [ESC]
    }

    /// Resolve a lone buffered ESC as the Escape key.
    ///
    /// Called by the reader once the terminal has been idle long enough that
    /// no sequence can be following.
    pub fn flush_escape(&mut self) -> Option<KeyStroke> {
        if self.has_lone_escape() {
            self.buffer.clear();
            self.after_cr = false;
            Some(KeyStroke::Escape)
        } else {
            None
        }
    }

    fn drain(&mut self) -> Vec<KeyStroke> {
        let mut strokes = Vec::new();
        let mut consumed = 0;

        while consumed < self.buffer.len() {
            let rest = &self.buffer[consumed..];

            if self.after_cr {
                self.after_cr = false;
                if rest[0] == LF {
                    consumed += 1;
                    continue;
                }
            }

            match decode(rest) {
                Decoded::Complete(stroke, len) => {
                    self.after_cr = len == 1 && rest[0] == CR;
                    consumed += len;
                    strokes.push(stroke);
                }
                Decoded::Invalid(len) => {
                    let text = String::from_utf8_lossy(&rest[..len]).into_owned();
                    log::debug!("undecodable input bytes: {:?}", &rest[..len]);
                    consumed += len;
                    strokes.push(KeyStroke::Unknown(text));
                }
                Decoded::Incomplete => break,
            }
        }

        self.buffer.drain(..consumed);
        strokes
    }
}
