//! Keyboard input: raw-mode capture and escape-sequence decoding.
//!
//! # Structure
//!
//! - [`keys`] - Keystroke values
//! - [`decoder`] - Byte buffer to keystroke state machine (no I/O)
//! - [`raw_mode`] - Terminal attribute guard
//! - [`capture`] - Cancellable blocking read loop on the TTY

mod capture;
mod decoder;
mod keys;
mod raw_mode;

pub use capture::{CancelHandle, CaptureError, KeyCapture, RunOutcome};
pub use decoder::{decode, Decoded, EscapeDecoder};
pub use keys::KeyStroke;
pub use raw_mode::RawModeGuard;
