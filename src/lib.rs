//! pipeplot library crate.
//!
//! Turns piped process output into a live terminal plot. Samples are read
//! from stdin, extraction rules pull numbers out of them, and the keyboard
//! (read from the controlling terminal) pauses and scrubs the view.

#[cfg(not(unix))]
compile_error!("pipeplot needs a Unix terminal (termios and poll)");

pub mod cli;
pub mod collect;
pub mod config;
pub mod controller;
pub mod display;
pub mod extract;
pub mod input;
pub mod logging;
pub mod merge;
pub mod plot;
pub mod session;
pub mod settings;
pub mod synth;
pub mod window;
