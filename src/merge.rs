//! Fan-in of independent producer queues into one consumer queue.
//!
//! Each producer gets its own forwarding task. Order within a producer is
//! kept; across producers, events are delivered in the order the
//! forwarders get to them. The merged queue stays open after a producer
//! finishes: only the consumer decides when the session is over.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::collect::SampleEvent;
use crate::input::KeyStroke;

/// Events that mark the end of their producer's stream.
pub trait EndOfStream {
    fn is_end_of_stream(&self) -> bool;
}

/// Everything the view controller reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A normalized sample from the piped input
    Sample(String),
    /// The piped input closed
    SamplesEnded,
    /// A decoded keystroke
    Key(KeyStroke),
}

impl From<SampleEvent> for SessionEvent {
    fn from(event: SampleEvent) -> Self {
        match event {
            SampleEvent::Sample(text) => SessionEvent::Sample(text),
            SampleEvent::End => SessionEvent::SamplesEnded,
        }
    }
}

impl From<KeyStroke> for SessionEvent {
    fn from(stroke: KeyStroke) -> Self {
        SessionEvent::Key(stroke)
    }
}

impl EndOfStream for SessionEvent {
    fn is_end_of_stream(&self) -> bool {
        matches!(self, SessionEvent::SamplesEnded)
    }
}

/// Merges producer queues into a single receiver.
pub struct EventMerger<E> {
    tx: UnboundedSender<E>,
    cancel: CancellationToken,
    forwarders: Vec<JoinHandle<()>>,
}

impl<E> EventMerger<E>
where
    E: EndOfStream + Send + 'static,
{
    /// Create a merger and the receiver its producers feed.
    ///
    /// Cancelling `cancel` (or calling [`EventMerger::cancel`]) stops every
    /// forwarder.
    pub fn new(cancel: CancellationToken) -> (Self, UnboundedReceiver<E>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let merger = Self {
            tx,
            cancel,
            forwarders: Vec::new(),
        };
        (merger, rx)
    }

    /// Start forwarding a producer's queue.
    ///
    /// The forwarder stops after passing on an end-of-stream event, when the
    /// producer's queue closes, or on cancellation.
    pub fn add<T>(&mut self, mut source: UnboundedReceiver<T>)
    where
        T: Into<E> + Send + 'static,
    {
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        let index = self.forwarders.len();

        self.forwarders.push(tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    item = source.recv() => item,
                };
                let Some(item) = item else {
                    log::debug!("producer {} queue closed", index);
                    break;
                };

                let event: E = item.into();
                let end = event.is_end_of_stream();
                if tx.send(event).is_err() {
                    break;
                }
                if end {
                    log::debug!("producer {} reached end of stream", index);
                    break;
                }
            }
        }));
    }

    /// Stop all forwarders.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait until every forwarder has finished.
    pub async fn join(self) {
        drop(self.tx);
        for forwarder in self.forwarders {
            if let Err(e) = forwarder.await {
                log::warn!("event forwarder failed: {}", e);
            }
        }
    }
}
