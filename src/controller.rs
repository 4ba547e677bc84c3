//! View controller: consumes merged session events, keeps the window store
//! and view state, and paints frames.

use std::io;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::MissedTickBehavior;

use crate::display::Display;
use crate::extract::{ExtractError, Extractor, PlotSpec};
use crate::input::KeyStroke;
use crate::merge::SessionEvent;
use crate::plot::{PlotRenderer, PlotRequest};
use crate::window::{ViewState, WindowEntry, WindowStore};

/// Seconds moved by one `h`/`l` press.
pub const STEP_SECONDS: f64 = 1.0;

/// Smallest gap kept between two entries' timestamps.
const MIN_TIME_STEP: f64 = 1e-6;

/// Bounds on the flush tick period.
const MIN_TICK: Duration = Duration::from_millis(10);
const MAX_TICK: Duration = Duration::from_secs(3600);

/// Tunables for a viewing session.
#[derive(Debug, Clone)]
pub struct ViewSettings {
    /// Entries plotted at once
    pub window_size: usize,
    /// Plot height in rows
    pub height: usize,
    /// Minimum seconds between sample-driven redraws
    pub refresh: f64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            window_size: 200,
            height: 30,
            refresh: 0.5,
        }
    }
}

/// What the session should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct ViewController<R: PlotRenderer, D: Display> {
    spec: PlotSpec,
    extractor: Extractor,
    settings: ViewSettings,
    store: WindowStore,
    view: ViewState,
    renderer: R,
    display: D,
    started: Instant,
    last_live_redraw: Option<f64>,
    redraw_pending: bool,
    dropped: u64,
    input_closed: bool,
}

impl<R: PlotRenderer, D: Display> ViewController<R, D> {
    /// Compile `spec` and set up an empty window.
    pub fn new(
        spec: PlotSpec,
        settings: ViewSettings,
        renderer: R,
        display: D,
    ) -> Result<Self, ExtractError> {
        let extractor = Extractor::new(&spec)?;
        let store = WindowStore::for_window(settings.window_size);
        Ok(Self {
            spec,
            extractor,
            settings,
            store,
            view: ViewState::new(),
            renderer,
            display,
            started: Instant::now(),
            last_live_redraw: None,
            redraw_pending: false,
            dropped: 0,
            input_closed: false,
        })
    }

    pub fn store(&self) -> &WindowStore {
        &self.store
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Samples dropped because they did not fully match.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn input_closed(&self) -> bool {
        self.input_closed
    }

    fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Apply one merged event.
    pub fn handle(&mut self, event: SessionEvent) -> io::Result<Flow> {
        match event {
            SessionEvent::Sample(sample) => {
                let elapsed = self.elapsed();
                self.handle_sample_at(&sample, elapsed)?;
                Ok(Flow::Continue)
            }
            SessionEvent::SamplesEnded => {
                log::info!("piped input closed after {} entries", self.store.written());
                self.input_closed = true;
                self.redraw()?;
                Ok(Flow::Continue)
            }
            SessionEvent::Key(stroke) => self.handle_key(stroke),
        }
    }

    /// Apply a sample observed `elapsed` seconds into the session.
    pub fn handle_sample_at(&mut self, sample: &str, elapsed: f64) -> io::Result<()> {
        let values = match self.extractor.extract(sample) {
            Ok(values) => values,
            Err(e) => {
                self.dropped += 1;
                log::warn!("dropping sample: {}", e);
                return Ok(());
            }
        };

        let elapsed = match self.store.last() {
            Some(last) if elapsed <= last.elapsed => last.elapsed + MIN_TIME_STEP,
            _ => elapsed,
        };
        if self.store.push(WindowEntry::new(elapsed, values, sample)) {
            log::trace!("window full, evicted oldest entry");
        }

        if self.view.is_paused() {
            self.view.clamp(&self.store);
            return Ok(());
        }

        let due = self
            .last_live_redraw
            .map_or(true, |last| elapsed - last >= self.settings.refresh);
        if due {
            self.last_live_redraw = Some(elapsed);
            self.redraw()
        } else {
            self.redraw_pending = true;
            Ok(())
        }
    }

    /// Paint a deferred live redraw once the refresh floor allows it.
    pub fn flush_pending(&mut self) -> io::Result<()> {
        let elapsed = self.elapsed();
        self.flush_pending_at(elapsed)
    }

    pub fn flush_pending_at(&mut self, elapsed: f64) -> io::Result<()> {
        if !self.redraw_pending || self.view.is_paused() {
            return Ok(());
        }
        let due = self
            .last_live_redraw
            .map_or(true, |last| elapsed - last >= self.settings.refresh);
        if !due {
            return Ok(());
        }
        self.last_live_redraw = Some(elapsed);
        self.redraw()
    }

    fn handle_key(&mut self, stroke: KeyStroke) -> io::Result<Flow> {
        if stroke.is_quit() {
            return Ok(Flow::Quit);
        }

        match stroke {
            KeyStroke::Character(' ') => {
                let paused = self.view.toggle(&self.store);
                log::debug!("view {}", if paused { "paused" } else { "resumed" });
                self.redraw()?;
            }
            KeyStroke::Character('h') => {
                if self.view.step_back(&self.store, STEP_SECONDS) {
                    self.redraw()?;
                }
            }
            KeyStroke::Character('l') => {
                if self.view.step_forward(&self.store, STEP_SECONDS) {
                    self.redraw()?;
                }
            }
            KeyStroke::Enter => {
                if self.view.is_paused() {
                    self.view.resume();
                    self.redraw()?;
                }
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    /// Paint the window ending at the cursor (or the newest entry when live).
    fn redraw(&mut self) -> io::Result<()> {
        let Some(last) = self.store.last_index() else {
            return Ok(());
        };
        self.redraw_pending = false;

        let end = self.view.cursor(&self.store).unwrap_or(last);
        let range = self.store.window_range(end, self.settings.window_size);

        let mut times = Vec::with_capacity(range.len());
        let mut series = vec![Vec::with_capacity(range.len()); self.extractor.rule_count()];
        for entry in self.store.range(range) {
            times.push(entry.elapsed);
            for (column, value) in series.iter_mut().zip(&entry.values) {
                column.push(*value);
            }
        }

        let (y_min, y_max) = series
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        let width = self.display.width() as usize;
        let legends = self.spec.legends();
        let plot = self.renderer.render(&PlotRequest {
            title: &self.spec.title,
            legends: &legends,
            series: &series,
            times: &times,
            height: self.settings.height,
            y_min,
            y_max,
            y_unit: self.spec.y_unit(),
            width,
        });

        let raw = self.store.get(end).map(|entry| entry.raw.as_str()).unwrap_or("");
        let status = center_line(&self.status_text(), width);
        self.display.show(&format!("{}\n\n{}\n\n{}", plot, raw, status))
    }

    fn status_text(&self) -> String {
        let mut status = if self.view.is_paused() {
            String::from(" [PAUSED] ")
        } else {
            String::from(" [RUNNING] ")
        };
        if self.input_closed {
            status.push_str("[INPUT CLOSED] ");
        }
        if self.dropped > 0 {
            status.push_str(&format!("({} dropped) ", self.dropped));
        }
        status
    }

    /// Drain `events` until a quit keystroke or the queue closes, flushing
    /// deferred redraws on a `refresh` tick.
    pub async fn run(&mut self, events: &mut UnboundedReceiver<SessionEvent>) -> io::Result<()> {
        let mut tick = tokio::time::interval(tick_period(self.settings.refresh));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        log::info!("event queue closed");
                        return Ok(());
                    };
                    if self.handle(event)? == Flow::Quit {
                        log::info!("quit requested");
                        return Ok(());
                    }
                }
                _ = tick.tick() => self.flush_pending()?,
            }
        }
    }
}

/// Flush tick period for a refresh floor of `refresh` seconds.
fn tick_period(refresh: f64) -> Duration {
    Duration::try_from_secs_f64(refresh)
        .unwrap_or(MAX_TICK)
        .clamp(MIN_TICK, MAX_TICK)
}

fn center_line(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let left = (width - len) / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(width - len - left))
}
