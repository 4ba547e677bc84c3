//! Piped input collection: normalization and sample segmentation.

mod normalize;
mod segmenter;

pub use normalize::{normalize, strip_ansi};
pub use segmenter::{run_segmenter, FrameSegmenter, LineSegmenter, SampleEvent, SegmentMode};
