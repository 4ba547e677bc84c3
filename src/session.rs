//! One viewing session: warm-up, specification, and the live view.
//!
//! Setup failures (no keyboard, bad specification, synthesis errors, a
//! warm-up timeout) are reported before the terminal enters raw mode.
//! Whatever happens after that, every producer is cancelled and joined
//! before `run` returns.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::Args;
use crate::collect::{run_segmenter, SampleEvent};
use crate::config::{Config, ConfigError};
use crate::controller::ViewController;
use crate::display::LiveDisplay;
use crate::extract::{ExtractError, PlotSpec};
use crate::input::{CaptureError, KeyCapture, KeyStroke, RunOutcome};
use crate::merge::{EventMerger, SessionEvent};
use crate::plot::BrailleChart;
use crate::settings::Settings;
use crate::synth::{load_spec_file, OpenAiClient, SynthError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("Rule synthesis failed: {0}")]
    Synth(#[from] SynthError),

    #[error("Invalid plot specification: {0}")]
    Extract(#[from] ExtractError),

    #[error("Timeout reached after {0} seconds waiting for samples")]
    CollectTimeout(f64),

    #[error("Input ended before any sample was collected")]
    NoSamples,

    #[error("Terminal output failed: {0}")]
    Io(#[from] io::Error),

    #[error("Key capture thread failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Samples gathered before the plot specification is known.
#[derive(Debug, Clone, PartialEq)]
pub struct Warmup {
    pub samples: Vec<String>,
    /// The sample stream ended during warm-up
    pub ended: bool,
}

/// Gather up to `sample_size` distinct samples, stopping early if the
/// stream ends.
///
/// # Errors
/// `CollectTimeout` if `timeout` passes first, `NoSamples` if the stream
/// ends before anything arrived.
pub async fn collect_warmup(
    rx: &mut UnboundedReceiver<SampleEvent>,
    sample_size: usize,
    timeout: Duration,
) -> Result<Warmup, SessionError> {
    let gather = async {
        let mut samples: Vec<String> = Vec::with_capacity(sample_size);
        while samples.len() < sample_size {
            match rx.recv().await {
                Some(SampleEvent::Sample(sample)) => {
                    if !samples.contains(&sample) {
                        samples.push(sample);
                    }
                }
                Some(SampleEvent::End) | None => {
                    return Warmup {
                        samples,
                        ended: true,
                    }
                }
            }
        }
        Warmup {
            samples,
            ended: false,
        }
    };

    let warmup = tokio::time::timeout(timeout, gather)
        .await
        .map_err(|_| SessionError::CollectTimeout(timeout.as_secs_f64()))?;
    if warmup.samples.is_empty() {
        return Err(SessionError::NoSamples);
    }
    log::info!(
        "collected {} warm-up sample(s){}",
        warmup.samples.len(),
        if warmup.ended { ", input ended" } else { "" }
    );
    Ok(warmup)
}

/// Run a full session for the parsed command line.
pub async fn run(args: &Args) -> Result<(), SessionError> {
    let config = Config::load(args.config.as_deref())?;
    let settings = Settings::resolve(args, &config)?;
    log::debug!("settings: {:?}", settings);
    run_with_settings(&settings).await
}

pub async fn run_with_settings(settings: &Settings) -> Result<(), SessionError> {
    let file_spec = settings
        .spec
        .as_deref()
        .map(load_spec_file)
        .transpose()?;

    let (key_tx, key_rx) = mpsc::unbounded_channel();
    let capture = KeyCapture::open(key_tx)?;
    let capture_cancel = capture.cancel_handle();

    let cancel = CancellationToken::new();
    let (sample_tx, mut sample_rx) = mpsc::unbounded_channel();
    let segmenter = tokio::spawn(run_segmenter(
        tokio::io::stdin(),
        settings.segment_mode(),
        sample_tx,
        cancel.child_token(),
    ));

    let prepared = prepare_spec(settings, file_spec, &mut sample_rx).await;
    let (spec, input_ended) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            cancel.cancel();
            let _ = segmenter.await;
            return Err(e);
        }
    };

    let result = view(settings, spec, input_ended, capture, sample_rx, key_rx, &cancel).await;

    cancel.cancel();
    capture_cancel.cancel();
    if let Err(e) = segmenter.await {
        log::warn!("sample producer failed: {}", e);
    }
    result
}

/// Resolve the plot specification: from file, or synthesized from warm-up
/// samples. Returns whether the input already ended.
async fn prepare_spec(
    settings: &Settings,
    file_spec: Option<PlotSpec>,
    sample_rx: &mut UnboundedReceiver<SampleEvent>,
) -> Result<(PlotSpec, bool), SessionError> {
    if let Some(spec) = file_spec {
        return Ok((spec, false));
    }

    let client = OpenAiClient::new()?.with_model(settings.model.clone());
    eprintln!("Collecting samples for rule synthesis...");
    let warmup = collect_warmup(sample_rx, settings.sample_size, settings.learn_timeout()).await?;

    eprintln!("Synthesizing extraction rules...");
    let spec = client.synthesize(&warmup.samples, &settings.prompt).await?;
    Ok((spec, warmup.ended))
}

async fn view(
    settings: &Settings,
    spec: PlotSpec,
    input_ended: bool,
    capture: KeyCapture,
    sample_rx: UnboundedReceiver<SampleEvent>,
    key_rx: UnboundedReceiver<KeyStroke>,
    cancel: &CancellationToken,
) -> Result<(), SessionError> {
    let mut controller = ViewController::new(
        spec,
        settings.view_settings(),
        BrailleChart::new(),
        LiveDisplay::stdout(),
    )?;

    let capture_cancel = capture.cancel_handle();
    let (mut merger, mut events) = EventMerger::<SessionEvent>::new(cancel.child_token());
    if input_ended {
        // The end marker was consumed during warm-up
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(SampleEvent::End);
        merger.add(rx);
    } else {
        merger.add(sample_rx);
    }
    merger.add(key_rx);

    let mut capture_task: JoinHandle<Result<RunOutcome, CaptureError>> =
        tokio::task::spawn_blocking(move || capture.run());

    let mut capture_done = false;
    let result = tokio::select! {
        result = controller.run(&mut events) => result.map_err(SessionError::from),
        joined = &mut capture_task => {
            capture_done = true;
            match joined {
                Ok(Ok(outcome)) => {
                    log::info!("key capture ended: {:?}", outcome);
                    Ok(())
                }
                Ok(Err(e)) => Err(SessionError::from(e)),
                Err(e) => Err(SessionError::from(e)),
            }
        }
    };

    drop(controller);
    capture_cancel.cancel();
    merger.cancel();
    merger.join().await;
    if !capture_done {
        match capture_task.await {
            Ok(Ok(outcome)) => log::debug!("key capture stopped: {:?}", outcome),
            Ok(Err(e)) => log::warn!("key capture failed: {}", e),
            Err(e) => log::warn!("key capture thread failed: {}", e),
        }
    }
    result
}
