//! Raw terminal mode management with panic-safe cleanup.
//!
//! Only the local flags are touched: echo, canonical line buffering and
//! signal generation are switched off, and reads return after one byte with
//! no timeout. Output processing is left alone so the display can keep
//! writing `\n`-terminated lines.

use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
use std::fs::File;
use std::io;
use std::os::fd::AsFd;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Terminal to restore from the panic hook, if a guard is active.
static ACTIVE_RESTORE: Mutex<Option<(File, Termios)>> = Mutex::new(None);

/// Guard that puts a terminal descriptor into raw mode and restores the
/// original attributes on drop.
pub struct RawModeGuard {
    tty: File,
    original: Termios,
    /// Whether this guard is responsible for cleanup
    active: bool,
}

impl RawModeGuard {
    /// Enter raw mode on `tty` and return a guard that will restore it.
    ///
    /// # Errors
    /// Returns an error if the descriptor is not a terminal or the
    /// attributes cannot be read or written.
    pub fn enter(tty: &File) -> io::Result<Self> {
        install_panic_hook();

        let original = termios::tcgetattr(tty.as_fd()).map_err(io::Error::from)?;

        let mut raw = original.clone();
        raw.local_flags
            .remove(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::ISIG);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        termios::tcsetattr(tty.as_fd(), SetArg::TCSANOW, &raw).map_err(io::Error::from)?;

        let tty = tty.try_clone()?;
        if let Ok(mut slot) = ACTIVE_RESTORE.lock() {
            *slot = tty.try_clone().ok().map(|f| (f, original.clone()));
        }

        Ok(Self {
            tty,
            original,
            active: true,
        })
    }

    /// Restore the original attributes now. Drop is a no-op afterwards.
    pub fn exit(&mut self) -> io::Result<()> {
        if self.active {
            self.active = false;
            if let Ok(mut slot) = ACTIVE_RESTORE.lock() {
                *slot = None;
            }
            termios::tcsetattr(self.tty.as_fd(), SetArg::TCSANOW, &self.original)
                .map_err(io::Error::from)?;
        }
        Ok(())
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Best-effort cleanup - ignore errors during drop
        let _ = self.exit();
    }
}

/// Install a panic hook that restores terminal state before panicking.
pub(crate) fn install_panic_hook() {
    static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

    if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        if let Ok(mut slot) = ACTIVE_RESTORE.lock() {
            if let Some((tty, original)) = slot.take() {
                let _ = termios::tcsetattr(tty.as_fd(), SetArg::TCSANOW, &original);
            }
        }
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_on_non_terminal_fails() {
        let file = tempfile::tempfile().expect("tempfile");
        assert!(RawModeGuard::enter(&file).is_err());
    }

    #[test]
    fn test_enter_and_drop_on_tty() {
        // Raw mode requires a real TTY; skipped when there is none (CI)
        let Ok(tty) = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/tty")
        else {
            eprintln!("Skipping test (no TTY)");
            return;
        };
        let before = match termios::tcgetattr(tty.as_fd()) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("Skipping test (no TTY): {}", e);
                return;
            }
        };

        let guard = RawModeGuard::enter(&tty).expect("enter raw mode");
        let during = termios::tcgetattr(tty.as_fd()).expect("tcgetattr");
        assert!(!during.local_flags.contains(LocalFlags::ICANON));
        assert!(!during.local_flags.contains(LocalFlags::ECHO));
        drop(guard);

        let after = termios::tcgetattr(tty.as_fd()).expect("tcgetattr");
        assert_eq!(after.local_flags, before.local_flags);
    }

    #[test]
    fn test_panic_hook_installation() {
        install_panic_hook();
        install_panic_hook(); // Second call should be no-op
    }
}
