//! Braille dot canvas.
//!
//! Each braille character is a 2x4 dot matrix, so a canvas of `w x h` cells
//! has `2w x 4h` addressable dots. Dot `(0, 0)` is the top-left corner.

/// Braille base character (U+2800, empty braille pattern).
pub const BRAILLE_BASE: char = '\u{2800}';

/// Bit for the dot at column `dx` (0..2) and row `dy` (0..4) of a cell.
///
/// ```text
/// [0,0]=1   [1,0]=8
/// [0,1]=2   [1,1]=16
/// [0,2]=4   [1,2]=32
/// [0,3]=64  [1,3]=128
/// ```
pub fn dot_bit(dx: usize, dy: usize) -> u8 {
    const BITS: [[u8; 4]; 2] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];
    BITS[dx & 1][dy & 3]
}

/// Convert a 2x4 boolean grid (`grid[x][y]`) to a braille character.
pub fn grid_to_braille(grid: [[bool; 4]; 2]) -> char {
    let mut code = 0u8;
    for (dx, column) in grid.iter().enumerate() {
        for (dy, &on) in column.iter().enumerate() {
            if on {
                code |= dot_bit(dx, dy);
            }
        }
    }
    cell_char(code)
}

fn cell_char(code: u8) -> char {
    char::from_u32(BRAILLE_BASE as u32 + code as u32).unwrap_or(BRAILLE_BASE)
}

/// A grid of braille cells with an optional colour per cell.
#[derive(Debug, Clone)]
pub struct BrailleCanvas {
    width: usize,
    height: usize,
    cells: Vec<u8>,
    colors: Vec<Option<u8>>,
}

impl BrailleCanvas {
    /// Create a canvas `width` cells wide and `height` cells tall.
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            cells: vec![0; size],
            colors: vec![None; size],
        }
    }

    /// Width in dots.
    pub fn dot_width(&self) -> usize {
        self.width * 2
    }

    /// Height in dots.
    pub fn dot_height(&self) -> usize {
        self.height * 4
    }

    /// Turn on the dot at `(x, y)`. Out-of-range dots are ignored.
    pub fn set(&mut self, x: usize, y: usize, color: Option<u8>) {
        if x >= self.dot_width() || y >= self.dot_height() {
            return;
        }
        let index = (y / 4) * self.width + x / 2;
        self.cells[index] |= dot_bit(x % 2, y % 4);
        if color.is_some() {
            self.colors[index] = color;
        }
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        if x >= self.dot_width() || y >= self.dot_height() {
            return false;
        }
        self.cells[(y / 4) * self.width + x / 2] & dot_bit(x % 2, y % 4) != 0
    }

    /// Draw a straight line between two dots (Bresenham).
    pub fn line(&mut self, from: (usize, usize), to: (usize, usize), color: Option<u8>) {
        let (mut x, mut y) = (from.0 as i64, from.1 as i64);
        let (x1, y1) = (to.0 as i64, to.1 as i64);
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.set(x as usize, y as usize, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Render one row of cells. With `ansi`, coloured cells are wrapped in
    /// SGR foreground sequences.
    pub fn row(&self, row: usize, ansi: bool) -> String {
        let mut out = String::with_capacity(self.width * 3);
        if row >= self.height {
            return out;
        }

        let mut active: Option<u8> = None;
        for col in 0..self.width {
            let index = row * self.width + col;
            let code = self.cells[index];
            if ansi {
                let color = if code == 0 { None } else { self.colors[index] };
                if color != active {
                    match color {
                        Some(c) => out.push_str(&format!("\x1b[{}m", c)),
                        None => out.push_str("\x1b[0m"),
                    }
                    active = color;
                }
            }
            out.push(cell_char(code));
        }
        if ansi && active.is_some() {
            out.push_str("\x1b[0m");
        }
        out
    }
}
