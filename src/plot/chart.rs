//! Braille line chart with axis labels and legend.

use super::braille::BrailleCanvas;

/// ANSI foreground colours cycled across series.
const SERIES_COLORS: [u8; 6] = [34, 31, 32, 33, 35, 36];

const MIN_PLOT_WIDTH: usize = 10;

/// Everything a renderer needs for one frame of the plot.
#[derive(Debug, Clone)]
pub struct PlotRequest<'a> {
    pub title: &'a str,
    /// One label per series
    pub legends: &'a [String],
    /// One value sequence per series, each aligned with `times`
    pub series: &'a [Vec<f64>],
    /// Shared x axis, seconds since session start
    pub times: &'a [f64],
    /// Plot height in terminal rows
    pub height: usize,
    pub y_min: f64,
    pub y_max: f64,
    pub y_unit: &'a str,
    /// Terminal width in columns
    pub width: usize,
}

/// Turns a [`PlotRequest`] into a printable string.
pub trait PlotRenderer {
    fn render(&self, request: &PlotRequest<'_>) -> String;
}

/// Braille line chart with y labels on the right and an x axis in seconds.
#[derive(Debug, Clone)]
pub struct BrailleChart {
    color: bool,
}

impl Default for BrailleChart {
    fn default() -> Self {
        Self { color: true }
    }
}

impl BrailleChart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable ANSI colours (used for plain output and tests).
    pub fn plain() -> Self {
        Self { color: false }
    }
}

impl PlotRenderer for BrailleChart {
    fn render(&self, request: &PlotRequest<'_>) -> String {
        let height = request.height.max(1);
        let (y_min, y_max) = ordered_bounds(request.y_min, request.y_max);

        let top_label = format_number(y_max);
        let mid_label = format_number((y_min + y_max) / 2.0);
        let bottom_label = format_number(y_min);
        let label_width = [&top_label, &mid_label, &bottom_label]
            .iter()
            .map(|label| label.chars().count())
            .max()
            .unwrap_or(0);
        let unit_length = if request.y_unit.is_empty() {
            0
        } else {
            request.y_unit.chars().count() + 1
        };
        // Axis line, a space, the label and the unit
        let right_padding = 2 + label_width + unit_length;
        let plot_width = request.width.saturating_sub(right_padding).max(MIN_PLOT_WIDTH);

        let mut canvas = BrailleCanvas::new(plot_width, height);
        let (t_min, t_max) = time_bounds(request.times);
        for (index, values) in request.series.iter().enumerate() {
            let color = self.color.then(|| SERIES_COLORS[index % SERIES_COLORS.len()]);
            let points: Vec<(usize, usize)> = request
                .times
                .iter()
                .zip(values)
                .filter(|(_, v)| v.is_finite())
                .map(|(&t, &v)| {
                    (
                        scale(t, t_min, t_max, canvas.dot_width()),
                        canvas.dot_height() - 1 - scale(v, y_min, y_max, canvas.dot_height()),
                    )
                })
                .collect();

            match points.as_slice() {
                [] => {}
                [only] => canvas.set(only.0, only.1, color),
                _ => {
                    for pair in points.windows(2) {
                        canvas.line(pair[0], pair[1], color);
                    }
                }
            }
        }

        let mut out = String::new();
        let total_width = plot_width + right_padding;
        out.push_str(&center(request.title, total_width));
        out.push('\n');

        let middle = height / 2;
        for row in 0..height {
            out.push_str(&canvas.row(row, self.color));
            out.push('│');
            let label = if row == 0 {
                Some(&top_label)
            } else if row == height - 1 {
                Some(&bottom_label)
            } else if row == middle {
                Some(&mid_label)
            } else {
                None
            };
            if let Some(label) = label {
                out.push(' ');
                out.push_str(label);
                if !request.y_unit.is_empty() {
                    out.push(' ');
                    out.push_str(request.y_unit);
                }
            }
            out.push('\n');
        }

        out.push_str(&"─".repeat(plot_width));
        out.push_str("┘\n");

        let left = format!("{}s", format_number(t_min));
        let right = format!("{}s", format_number(t_max));
        let gap = plot_width.saturating_sub(left.len() + right.len()).max(1);
        out.push_str(&left);
        out.push_str(&" ".repeat(gap));
        out.push_str(&right);

        if !request.legends.is_empty() {
            out.push('\n');
            let entries: Vec<String> = request
                .legends
                .iter()
                .enumerate()
                .map(|(index, name)| {
                    if self.color {
                        let c = SERIES_COLORS[index % SERIES_COLORS.len()];
                        format!("\x1b[{}m⣿\x1b[0m {}", c, name)
                    } else {
                        format!("⣿ {}", name)
                    }
                })
                .collect();
            out.push_str(&entries.join("  "));
        }

        out
    }
}

fn ordered_bounds(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn time_bounds(times: &[f64]) -> (f64, f64) {
    let min = times.iter().copied().fold(f64::INFINITY, f64::min);
    let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min.is_finite() && max.is_finite() {
        (min, max)
    } else {
        (0.0, 0.0)
    }
}

/// Map `value` in `[min, max]` to a dot index in `0..dots`. A flat range
/// maps to the middle.
fn scale(value: f64, min: f64, max: f64, dots: usize) -> usize {
    if dots == 0 {
        return 0;
    }
    let span = max - min;
    if span <= 0.0 || !span.is_finite() {
        return dots / 2;
    }
    let ratio = ((value - min) / span).clamp(0.0, 1.0);
    ((ratio * (dots - 1) as f64).round() as usize).min(dots - 1)
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    format!("{}{}", " ".repeat((width - len) / 2), text)
}

/// Short numeric label: integers without decimals, others with up to
/// three, trailing zeros removed.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{:.0}", value);
    }
    let text = format!("{:.3}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
