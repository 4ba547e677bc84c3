//! Segmentation of piped input into samples.
//!
//! Two modes, picked once per session:
//! - **Lines**: every non-empty normalized line is a sample.
//! - **Frames**: the stream is a sequence of full-screen redraws (as written
//!   by `top`, `watch`, `nvidia-smi -l` and friends). A "clear screen / home
//!   cursor" sequence ends the current frame.
//!
//! In both modes a sample equal to the one emitted just before it is
//! suppressed (adjacent duplicates only).

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use super::normalize::normalize;

/// Frame boundary sequences. Earliest match wins; ties go to the longest.
const FRAME_BOUNDARIES: [&[u8]; 3] = [b"\x1b[2J\x1b[H", b"\x1b[H\x1b[2J", b"\x1b[H"];

/// Length of the longest boundary sequence.
const MAX_BOUNDARY_LEN: usize = 7;

/// Bytes requested per read in frame mode.
const FRAME_READ_CHUNK: usize = 4096;

/// How piped input is cut into samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentMode {
    #[default]
    Lines,
    Frames,
}

/// Item produced by the sample producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleEvent {
    /// A normalized, non-empty sample
    Sample(String),
    /// Upstream closed; no more samples will follow
    End,
}

/// Adjacent-duplicate filter over normalized text.
#[derive(Debug, Default)]
struct Dedup {
    previous: Option<String>,
}

impl Dedup {
    fn accept(&mut self, raw: &str) -> Option<String> {
        let sample = normalize(raw);
        if sample.is_empty() || self.previous.as_deref() == Some(sample.as_str()) {
            return None;
        }
        self.previous = Some(sample.clone());
        Some(sample)
    }
}

/// Line-mode segmenter.
#[derive(Debug, Default)]
pub struct LineSegmenter {
    dedup: Dedup,
}

impl LineSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize one input line; returns it unless empty or a repeat of the last sample.
    pub fn push(&mut self, line: &str) -> Option<String> {
        self.dedup.accept(line)
    }
}

/// Frame-mode segmenter.
#[derive(Debug, Default)]
pub struct FrameSegmenter {
    /// Bytes of the frame in progress (boundaries not yet found)
    pending: Vec<u8>,
    /// Offset before which `pending` is known to hold no boundary
    searched: usize,
    dedup: Dedup,
}

impl FrameSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk of raw bytes and return every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some((pos, len)) = find_boundary(&self.pending, self.searched) {
            let frame: Vec<u8> = self.pending.drain(..pos + len).take(pos).collect();
            self.searched = 0;
            if let Some(sample) = self.dedup.accept(&String::from_utf8_lossy(&frame)) {
                frames.push(sample);
            }
        }

        // A boundary may still be split across the end of the buffer
        self.searched = self
            .pending
            .len()
            .saturating_sub(MAX_BOUNDARY_LEN - 1);
        frames
    }

    /// Flush the trailing frame once upstream has closed.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        self.searched = 0;
        self.dedup.accept(&String::from_utf8_lossy(&rest))
    }
}

/// Find the earliest boundary at or after `from`: `(position, length)`.
fn find_boundary(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    for token in FRAME_BOUNDARIES {
        let Some(pos) = find_subslice(&buf[from.min(buf.len())..], token).map(|p| p + from) else {
            continue;
        };
        best = match best {
            Some((best_pos, best_len))
                if best_pos < pos || (best_pos == pos && best_len >= token.len()) =>
            {
                Some((best_pos, best_len))
            }
            _ => Some((pos, token.len())),
        };
    }
    best
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read `reader` to the end, sending samples to `tx`.
///
/// Sends [`SampleEvent::End`] once upstream closes (or fails). Cancellation
/// stops the producer immediately and sends nothing further.
pub async fn run_segmenter<R>(
    reader: R,
    mode: SegmentMode,
    tx: UnboundedSender<SampleEvent>,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let pumped = tokio::select! {
        _ = cancel.cancelled() => {
            log::debug!("sample producer cancelled");
            return;
        }
        result = pump(reader, mode, &tx) => result,
    };

    match pumped {
        Ok(()) => log::info!("sample input closed"),
        Err(e) => log::warn!("sample input failed: {}", e),
    }
    let _ = tx.send(SampleEvent::End);
}

async fn pump<R>(reader: R, mode: SegmentMode, tx: &UnboundedSender<SampleEvent>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    match mode {
        SegmentMode::Lines => pump_lines(reader, tx).await,
        SegmentMode::Frames => pump_frames(reader, tx).await,
    }
}

async fn pump_lines<R>(reader: R, tx: &UnboundedSender<SampleEvent>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut segmenter = LineSegmenter::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        if let Some(sample) = segmenter.push(&String::from_utf8_lossy(&line)) {
            if tx.send(SampleEvent::Sample(sample)).is_err() {
                return Ok(());
            }
        }
    }
}

async fn pump_frames<R>(mut reader: R, tx: &UnboundedSender<SampleEvent>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut segmenter = FrameSegmenter::new();
    let mut chunk = vec![0u8; FRAME_READ_CHUNK];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        for frame in segmenter.push(&chunk[..n]) {
            if tx.send(SampleEvent::Sample(frame)).is_err() {
                return Ok(());
            }
        }
    }

    if let Some(frame) = segmenter.finish() {
        let _ = tx.send(SampleEvent::Sample(frame));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::sync::mpsc;

    fn samples(events: &[SampleEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                SampleEvent::Sample(s) => Some(s.as_str()),
                SampleEvent::End => None,
            })
            .collect()
    }

    async fn collect(input: &[u8], mode: SegmentMode) -> Vec<SampleEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        run_segmenter(input, mode, tx, CancellationToken::new()).await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    // ==================== LineSegmenter Tests ====================

    #[test]
    fn test_line_adjacent_duplicates_suppressed() {
        let mut seg = LineSegmenter::new();
        assert_eq!(seg.push("cpu 10%\n"), Some("cpu 10%".to_string()));
        assert_eq!(seg.push("cpu 10%\n"), None);
        assert_eq!(seg.push("cpu 10%\n"), None);
        assert_eq!(seg.push("cpu 11%\n"), Some("cpu 11%".to_string()));
    }

    #[test]
    fn test_line_dedup_is_adjacent_only() {
        let mut seg = LineSegmenter::new();
        assert!(seg.push("a").is_some());
        assert!(seg.push("b").is_some());
        assert_eq!(seg.push("a"), Some("a".to_string()));
    }

    #[test]
    fn test_line_dedup_compares_normalized_text() {
        let mut seg = LineSegmenter::new();
        assert!(seg.push("\x1b[32mok\x1b[0m\r\n").is_some());
        assert_eq!(seg.push("  ok  "), None);
    }

    #[test]
    fn test_line_empty_dropped() {
        let mut seg = LineSegmenter::new();
        assert_eq!(seg.push("\n"), None);
        assert_eq!(seg.push("\x1b[2K\r\n"), None);
    }

    // ==================== FrameSegmenter Tests ====================

    #[test]
    fn test_find_boundary_prefers_earliest_then_longest() {
        assert_eq!(find_boundary(b"ab\x1b[2J\x1b[Hcd", 0), Some((2, 7)));
        assert_eq!(find_boundary(b"ab\x1b[H\x1b[2Jcd", 0), Some((2, 7)));
        assert_eq!(find_boundary(b"ab\x1b[Hcd", 0), Some((2, 3)));
        assert_eq!(find_boundary(b"abcd", 0), None);
    }

    #[test]
    fn test_frames_split_on_clear_sequences() {
        let mut seg = FrameSegmenter::new();
        let frames = seg.push(b"\x1b[2J\x1b[Hload 1\n\x1b[2J\x1b[Hload 2\n\x1b[H");
        assert_eq!(frames, vec!["load 1".to_string(), "load 2".to_string()]);
    }

    #[test]
    fn test_frame_boundary_split_across_chunks() {
        let mut seg = FrameSegmenter::new();
        assert!(seg.push(b"frame one\x1b[").is_empty());
        assert_eq!(seg.push(b"Hframe two"), vec!["frame one".to_string()]);
        assert_eq!(seg.finish(), Some("frame two".to_string()));
    }

    #[test]
    fn test_frame_duplicates_suppressed() {
        let mut seg = FrameSegmenter::new();
        let frames = seg.push(b"same\x1b[Hsame\x1b[Hother\x1b[H");
        assert_eq!(frames, vec!["same".to_string(), "other".to_string()]);
    }

    #[test]
    fn test_frame_finish_skips_duplicate_and_empty() {
        let mut seg = FrameSegmenter::new();
        assert_eq!(seg.push(b"x\x1b[H"), vec!["x".to_string()]);
        assert!(seg.push(b"x").is_empty());
        assert_eq!(seg.finish(), None);
        assert_eq!(seg.finish(), None);
    }

    #[test]
    fn test_frame_multibyte_split_across_chunks() {
        let mut seg = FrameSegmenter::new();
        let text = "temp 42°C".as_bytes();
        let (a, b) = text.split_at(text.len() - 2);
        assert!(seg.push(a).is_empty());
        assert!(seg.push(b).is_empty());
        assert_eq!(seg.push(b"\x1b[H"), vec!["temp 42°C".to_string()]);
    }

    // ==================== Producer Tests ====================

    #[tokio::test]
    async fn test_run_lines_dedups_and_ends() {
        let events = collect(b"mem: 10MB\nmem: 10MB\nmem: 10MB\n\nmem: 20MB\n", SegmentMode::Lines).await;
        assert_eq!(samples(&events), vec!["mem: 10MB", "mem: 20MB"]);
        assert_eq!(events.last(), Some(&SampleEvent::End));
    }

    #[tokio::test]
    async fn test_run_lines_without_trailing_newline() {
        let events = collect(b"a\nb", SegmentMode::Lines).await;
        assert_eq!(samples(&events), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_run_frames_flushes_trailing_frame() {
        let events = collect(b"\x1b[2J\x1b[Hone\x1b[2J\x1b[Htwo", SegmentMode::Frames).await;
        assert_eq!(samples(&events), vec!["one", "two"]);
        assert_eq!(events.iter().filter(|e| **e == SampleEvent::End).count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_without_end_marker() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_segmenter(reader, SegmentMode::Lines, tx, cancel.clone()));

        writer.write_all(b"first\n").await.unwrap();
        assert_eq!(rx.recv().await, Some(SampleEvent::Sample("first".to_string())));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("producer stops promptly")
            .unwrap();

        writer.write_all(b"second\n").await.ok();
        assert_eq!(rx.recv().await, None);
    }
}
