//! Keyboard capture from the controlling terminal.
//!
//! The read loop blocks in `poll(2)` on two descriptors at once: the TTY and
//! the read end of a socket pair used as a wake channel. Cancelling writes a
//! byte to the other end of the pair, so the same wait that observes new
//! keyboard input also observes cancellation. No signals, no busy polling.

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal, Read, Write};
use std::os::fd::AsFd;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use super::decoder::EscapeDecoder;
use super::keys::KeyStroke;
use super::raw_mode::RawModeGuard;

/// Fallback terminal device when stdin is not interactive (piped input).
const TTY_PATH: &str = "/dev/tty";

/// Bytes requested per read.
const READ_CHUNK: usize = 32;

/// How long a lone ESC may wait for the rest of a sequence, in milliseconds.
const ESCAPE_TIMEOUT_MS: u16 = 50;

/// Errors from opening or reading the keyboard.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("No TTY available for key capture: {0}")]
    NoTty(#[source] io::Error),

    #[error("Failed to create wake channel: {0}")]
    WakeChannel(#[source] io::Error),

    #[error("Failed to enter raw mode: {0}")]
    RawMode(#[source] io::Error),

    #[error("Terminal read failed: {0}")]
    Io(#[from] io::Error),
}

/// Why a call to [`KeyCapture::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The cancel handle fired
    Cancelled,
    /// The terminal stream ended; one `Eof` keystroke was emitted
    Eof,
    /// The keystroke receiver was dropped
    ReceiverClosed,
    /// Another `run` was already active; nothing was done
    AlreadyRunning,
}

enum Wake {
    Input,
    Cancelled,
    Idle,
}

/// Handle that interrupts a running [`KeyCapture::run`] from any thread.
#[derive(Clone)]
pub struct CancelHandle {
    wake: Arc<UnixStream>,
}

impl CancelHandle {
    /// Wake the read loop and make it return [`RunOutcome::Cancelled`].
    ///
    /// Safe to call more than once, and before `run` has started.
    pub fn cancel(&self) {
        if let Err(e) = (&*self.wake).write(&[1]) {
            log::debug!("wake channel write failed: {}", e);
        }
    }
}

/// Owns the keyboard descriptor and turns its bytes into keystrokes.
pub struct KeyCapture {
    input: File,
    wake_rx: UnixStream,
    wake_tx: Arc<UnixStream>,
    tx: UnboundedSender<KeyStroke>,
    running: AtomicBool,
}

impl KeyCapture {
    /// Open the keyboard for this process.
    ///
    /// Uses stdin when it is a terminal; otherwise (stdin is the data pipe)
    /// opens `/dev/tty` directly.
    ///
    /// # Errors
    /// Returns `CaptureError::NoTty` when neither is available.
    pub fn open(tx: UnboundedSender<KeyStroke>) -> Result<Self, CaptureError> {
        let stdin = io::stdin();
        let input = if stdin.is_terminal() {
            let fd = stdin
                .as_fd()
                .try_clone_to_owned()
                .map_err(CaptureError::NoTty)?;
            File::from(fd)
        } else {
            OpenOptions::new()
                .read(true)
                .open(TTY_PATH)
                .map_err(CaptureError::NoTty)?
        };
        Self::from_file(input, tx)
    }

    /// Capture keystrokes from an already-open descriptor.
    ///
    /// Raw mode is only applied if the descriptor is a terminal, which lets
    /// tests drive the loop through a socket pair.
    pub fn from_file(input: File, tx: UnboundedSender<KeyStroke>) -> Result<Self, CaptureError> {
        let (wake_rx, wake_tx) = UnixStream::pair().map_err(CaptureError::WakeChannel)?;
        Ok(Self {
            input,
            wake_rx,
            wake_tx: Arc::new(wake_tx),
            tx,
            running: AtomicBool::new(false),
        })
    }

    /// Handle used to stop the read loop.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            wake: Arc::clone(&self.wake_tx),
        }
    }

    /// Whether a `run` call is currently active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Blocking read loop. Run it on a dedicated thread.
    ///
    /// Puts the terminal into raw mode, then forwards decoded keystrokes
    /// until cancelled or the terminal stream ends. The original terminal
    /// mode is restored on every exit path.
    pub fn run(&self) -> Result<RunOutcome, CaptureError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(RunOutcome::AlreadyRunning);
        }
        let _running = RunningGuard(&self.running);

        let _raw = if self.input.is_terminal() {
            Some(RawModeGuard::enter(&self.input).map_err(CaptureError::RawMode)?)
        } else {
            None
        };

        log::debug!("key capture started");
        let outcome = self.read_loop()?;
        log::debug!("key capture stopped: {:?}", outcome);
        Ok(outcome)
    }

    fn read_loop(&self) -> Result<RunOutcome, CaptureError> {
        let mut decoder = EscapeDecoder::new();
        let mut buf = [0u8; READ_CHUNK];

        loop {
            match self.wait(decoder.has_lone_escape())? {
                Wake::Cancelled => {
                    self.drain_wake();
                    return Ok(RunOutcome::Cancelled);
                }
                Wake::Idle => {
                    if let Some(stroke) = decoder.flush_escape() {
                        if !self.emit(stroke) {
                            return Ok(RunOutcome::ReceiverClosed);
                        }
                    }
                    continue;
                }
                Wake::Input => {}
            }

            let n = match (&self.input).read(&mut buf) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if n == 0 {
                self.emit(KeyStroke::Eof);
                return Ok(RunOutcome::Eof);
            }

            for stroke in decoder.feed(&buf[..n]) {
                if !self.emit(stroke) {
                    return Ok(RunOutcome::ReceiverClosed);
                }
            }
        }
    }

    /// Block until the terminal is readable, the wake channel fires, or
    /// (only while an ESC is pending) the escape timeout expires.
    fn wait(&self, escape_pending: bool) -> Result<Wake, CaptureError> {
        let timeout = if escape_pending {
            PollTimeout::from(ESCAPE_TIMEOUT_MS)
        } else {
            PollTimeout::NONE
        };
        let readable = PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR;

        loop {
            let mut fds = [
                PollFd::new(self.input.as_fd(), PollFlags::POLLIN),
                PollFd::new(self.wake_rx.as_fd(), PollFlags::POLLIN),
            ];
            match poll(&mut fds, timeout) {
                Ok(0) => return Ok(Wake::Idle),
                Ok(_) => {}
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(io::Error::from(e).into()),
            }

            let is_ready = |fd: &PollFd| fd.revents().is_some_and(|r| r.intersects(readable));
            // Cancellation wins over pending input
            if is_ready(&fds[1]) {
                return Ok(Wake::Cancelled);
            }
            if is_ready(&fds[0]) {
                return Ok(Wake::Input);
            }
        }
    }

    fn drain_wake(&self) {
        let mut scratch = [0u8; 64];
        let _ = (&self.wake_rx).read(&mut scratch);
    }

    fn emit(&self, stroke: KeyStroke) -> bool {
        self.tx.send(stroke).is_ok()
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
