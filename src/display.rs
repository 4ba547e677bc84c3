//! In-place terminal painting.
//!
//! Each frame overwrites the previous one: the cursor moves back to the
//! first line of the last frame and everything below it is cleared before
//! the new frame is written, so scrollback does not grow.

use crossterm::cursor::{Hide, MoveToColumn, MoveToPreviousLine, Show};
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use std::io::{self, Write};

/// Default size when the terminal size cannot be queried.
pub const FALLBACK_SIZE: (u16, u16) = (80, 24);

/// Somewhere a rendered frame can be painted.
pub trait Display {
    /// Replace the previously shown frame with `frame`.
    fn show(&mut self, frame: &str) -> io::Result<()>;

    /// Width in columns available for a frame.
    fn width(&self) -> u16;
}

/// Paints frames in place on a terminal-like writer.
pub struct LiveDisplay<W: Write> {
    out: W,
    fixed_size: Option<(u16, u16)>,
    /// Lines the cursor has to climb to reach the start of the last frame
    drawn_lines: u16,
    cursor_hidden: bool,
}

impl LiveDisplay<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> LiveDisplay<W> {
    /// Display whose size follows the controlling terminal.
    pub fn new(out: W) -> Self {
        Self {
            out,
            fixed_size: None,
            drawn_lines: 0,
            cursor_hidden: false,
        }
    }

    /// Display with a fixed size, independent of any terminal.
    pub fn with_size(out: W, cols: u16, rows: u16) -> Self {
        let mut display = Self::new(out);
        display.fixed_size = Some((cols, rows));
        display
    }

    fn size(&self) -> (u16, u16) {
        self.fixed_size
            .unwrap_or_else(|| crossterm::terminal::size().unwrap_or(FALLBACK_SIZE))
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Display for LiveDisplay<W> {
    fn show(&mut self, frame: &str) -> io::Result<()> {
        let (cols, rows) = self.size();
        // Keep the frame within the screen so the cursor can climb back:
        // a wrapped line would occupy more rows than it counts for
        let lines: Vec<String> = frame
            .lines()
            .take(rows.max(1) as usize)
            .map(|line| clip_line(line, cols.max(1) as usize))
            .collect();

        if !self.cursor_hidden {
            queue!(self.out, Hide)?;
            self.cursor_hidden = true;
        }
        if self.drawn_lines > 0 {
            queue!(self.out, MoveToPreviousLine(self.drawn_lines))?;
        }
        queue!(self.out, MoveToColumn(0), Clear(ClearType::FromCursorDown))?;

        self.out.write_all(lines.join("\n").as_bytes())?;
        self.out.flush()?;

        self.drawn_lines = lines.len().saturating_sub(1) as u16;
        Ok(())
    }

    fn width(&self) -> u16 {
        self.size().0
    }
}

/// Cut `line` to `cols` visible columns. CSI sequences pass through
/// without counting; a clipped line that carried any is followed by a reset.
fn clip_line(line: &str, cols: usize) -> String {
    let mut out = String::with_capacity(line.len());
    let mut visible = 0;
    let mut styled = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            out.push(c);
            out.extend(chars.next());
            for next in chars.by_ref() {
                out.push(next);
                if ('\x40'..='\x7e').contains(&next) {
                    break;
                }
            }
            styled = true;
            continue;
        }
        if visible == cols {
            if styled {
                out.push_str("\x1b[0m");
            }
            break;
        }
        out.push(c);
        visible += 1;
    }
    out
}

impl<W: Write> Drop for LiveDisplay<W> {
    fn drop(&mut self) {
        if self.cursor_hidden {
            let _ = queue!(self.out, Show);
            let _ = self.out.write_all(b"\n");
            let _ = self.out.flush();
        }
    }
}
