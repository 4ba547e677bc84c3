//! Plot rendering.
//!
//! - [`braille`] - 2x4 dot cells and a drawable canvas
//! - [`chart`] - [`PlotRenderer`] trait and the braille line chart

pub mod braille;
mod chart;

pub use braille::{grid_to_braille, BrailleCanvas, BRAILLE_BASE};
pub use chart::{format_number, BrailleChart, PlotRenderer, PlotRequest};
