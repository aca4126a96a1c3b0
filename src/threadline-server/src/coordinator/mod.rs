//! Streaming turn coordinator.
//!
//! One [`StreamingCoordinator::run`] call drives one turn. Two tasks feed a
//! single bounded queue:
//!
//! - the producer polls the generator stream and publishes `Fragment`
//!   events followed by exactly one terminal `Done` or `Error`;
//! - the ticker publishes a keepalive whenever the producer has been quiet
//!   for a full keepalive interval.
//!
//! The calling task consumes the queue and forwards items to an
//! [`EventSink`] until the terminal event is delivered or the sink
//! disconnects. It then stops the ticker (bounded by one keepalive
//! interval), stops and joins the producer, and only then returns.

mod event;
mod sink;

pub use event::{SinkItem, StreamEvent, Turn, TurnOutcome, TurnSession};
pub use sink::{CollectingSink, Disconnected, EventSink};

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use threadline_engine::{ConversationStateStore, Generated, GeneratedStream};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Message of the `Error` event sent when the producer dies silently.
pub const GENERATION_ENDED: &str = "generation ended unexpectedly";

/// Timing and buffering of a turn.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Idle time before a keepalive is emitted.
    pub keepalive_interval: Duration,
    /// Longest wait on the queue before re-checking the producer.
    pub read_timeout: Duration,
    pub queue_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(15),
            read_timeout: Duration::from_secs(60),
            queue_capacity: 64,
        }
    }
}

/// Drives turns against a [`ConversationStateStore`].
#[derive(Clone)]
pub struct StreamingCoordinator {
    store: Arc<dyn ConversationStateStore>,
    config: CoordinatorConfig,
}

impl std::fmt::Debug for StreamingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingCoordinator")
            .field("config", &self.config)
            .finish()
    }
}

/// Signals shared by the producer, the ticker and the consumer.
#[derive(Clone)]
struct TurnSignals {
    /// Set by the producer right before it enqueues the terminal event.
    finished: CancellationToken,
    /// Woken on every logical event the producer publishes.
    activity: Arc<Notify>,
}

impl StreamingCoordinator {
    pub fn new(store: Arc<dyn ConversationStateStore>, config: CoordinatorConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run one turn to completion, delivering its events to `sink`.
    ///
    /// The generator is invoked exactly once. When this returns, no task
    /// started for the turn is still running.
    pub async fn run(&self, turn: Turn, sink: &dyn EventSink) -> TurnOutcome {
        let (tx, mut rx) = mpsc::channel::<SinkItem>(self.config.queue_capacity.max(1));
        let signals = TurnSignals {
            finished: CancellationToken::new(),
            activity: Arc::new(Notify::new()),
        };

        if let Some(session) = &turn.session {
            let announce = SinkItem::Event(StreamEvent::Session {
                session_id: session.session_id.clone(),
                thread_id: turn.thread_id.clone(),
                user_id: session.user_id.clone(),
            });
            // The queue is fresh and has room for at least one item.
            let _ = tx.try_send(announce);
        }

        debug!(thread_id = %turn.thread_id, "Starting turn");
        let generated = self.store.generate(&turn.thread_id, &turn.message);

        let producer_cancel = CancellationToken::new();
        let ticker_cancel = CancellationToken::new();
        let mut producer = tokio::spawn(produce(
            generated,
            tx.clone(),
            producer_cancel.clone(),
            signals.clone(),
        ));
        let mut ticker = tokio::spawn(tick(
            tx,
            self.config.keepalive_interval,
            ticker_cancel.clone(),
            signals.clone(),
        ));

        let outcome = self.consume(&mut rx, sink, &producer, &signals).await;

        // Ticker first, bounded by one interval.
        ticker_cancel.cancel();
        if timeout(self.config.keepalive_interval, &mut ticker).await.is_err() {
            warn!(thread_id = %turn.thread_id, "Keepalive task did not stop in time, aborting");
            ticker.abort();
            let _ = ticker.await;
        }

        producer_cancel.cancel();
        if let Err(e) = (&mut producer).await {
            if e.is_panic() {
                error!(thread_id = %turn.thread_id, "Generator task panicked");
            }
        }
        drop(rx);

        match &outcome {
            TurnOutcome::Completed { full_text } => {
                info!(thread_id = %turn.thread_id, chars = full_text.len(), "Turn completed")
            }
            TurnOutcome::Failed { message } => {
                warn!(thread_id = %turn.thread_id, error = %message, "Turn failed")
            }
            TurnOutcome::Disconnected => {
                info!(thread_id = %turn.thread_id, "Client disconnected, turn cancelled")
            }
        }
        outcome
    }

    /// Forward queued items until a terminal event is delivered or the sink goes away.
    async fn consume(
        &self,
        rx: &mut mpsc::Receiver<SinkItem>,
        sink: &dyn EventSink,
        producer: &JoinHandle<()>,
        signals: &TurnSignals,
    ) -> TurnOutcome {
        loop {
            let received = tokio::select! {
                biased;
                _ = sink.closed() => return TurnOutcome::Disconnected,
                received = timeout(self.config.read_timeout, rx.recv()) => received,
            };

            let item = match received {
                Ok(Some(SinkItem::Keepalive)) if signals.finished.is_cancelled() => continue,
                Ok(Some(item)) => item,
                Ok(None) => return deliver_failure(sink).await,
                Err(_) => {
                    debug!("No queued events within read timeout, re-checking turn");
                    if producer_died(producer, signals, rx) {
                        return deliver_failure(sink).await;
                    }
                    if signals.finished.is_cancelled() {
                        continue;
                    }
                    SinkItem::Keepalive
                }
            };

            let outcome = match &item {
                SinkItem::Event(StreamEvent::Done { full_text }) => Some(TurnOutcome::Completed {
                    full_text: full_text.clone(),
                }),
                SinkItem::Event(StreamEvent::Error { message }) => Some(TurnOutcome::Failed {
                    message: message.clone(),
                }),
                _ => None,
            };
            let is_keepalive = matches!(item, SinkItem::Keepalive);

            if sink.send(item).await.is_err() {
                return TurnOutcome::Disconnected;
            }
            if let Some(outcome) = outcome {
                return outcome;
            }
            if is_keepalive && producer_died(producer, signals, rx) {
                return deliver_failure(sink).await;
            }
        }
    }
}

/// The producer exited without enqueueing a terminal event and nothing is left to drain.
fn producer_died(
    producer: &JoinHandle<()>,
    signals: &TurnSignals,
    rx: &mpsc::Receiver<SinkItem>,
) -> bool {
    producer.is_finished() && !signals.finished.is_cancelled() && rx.is_empty()
}

async fn deliver_failure(sink: &dyn EventSink) -> TurnOutcome {
    error!("Generator stopped without a terminal event");
    let event = StreamEvent::Error {
        message: GENERATION_ENDED.to_string(),
    };
    match sink.send(SinkItem::Event(event)).await {
        Ok(()) => TurnOutcome::Failed {
            message: GENERATION_ENDED.to_string(),
        },
        Err(Disconnected) => TurnOutcome::Disconnected,
    }
}

/// Enqueue unless cancelled. Returns `false` when the item was not queued.
async fn publish(tx: &mpsc::Sender<SinkItem>, item: SinkItem, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}

async fn produce(
    mut generated: GeneratedStream,
    tx: mpsc::Sender<SinkItem>,
    cancel: CancellationToken,
    signals: TurnSignals,
) {
    let mut full_text = String::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            next = generated.next() => next,
        };

        let (fragment, terminal) = match next {
            Some(Ok(Generated::Fragment(text))) => {
                if text.is_empty() {
                    continue;
                }
                full_text.push_str(&text);
                (Some(text), None)
            }
            Some(Ok(Generated::Final(text))) => {
                let suffix = match text.strip_prefix(full_text.as_str()) {
                    Some(suffix) => suffix.to_string(),
                    None => {
                        warn!("Final text does not extend the streamed fragments, keeping streamed text");
                        String::new()
                    }
                };
                let fragment = (!suffix.is_empty()).then(|| {
                    full_text.push_str(&suffix);
                    suffix
                });
                let done = StreamEvent::Done {
                    full_text: full_text.clone(),
                };
                (fragment, Some(done))
            }
            Some(Err(e)) => (
                None,
                Some(StreamEvent::Error {
                    message: e.to_string(),
                }),
            ),
            None => (
                None,
                Some(StreamEvent::Done {
                    full_text: full_text.clone(),
                }),
            ),
        };

        if let Some(text) = fragment {
            if !publish(&tx, SinkItem::Event(StreamEvent::Fragment { text }), &cancel).await {
                return;
            }
            signals.activity.notify_one();
        }

        if let Some(event) = terminal {
            signals.finished.cancel();
            publish(&tx, SinkItem::Event(event), &cancel).await;
            return;
        }
    }
}

async fn tick(
    tx: mpsc::Sender<SinkItem>,
    interval: Duration,
    cancel: CancellationToken,
    signals: TurnSignals,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = signals.finished.cancelled() => return,
            _ = signals.activity.notified() => continue,
            _ = sleep(interval) => {
                let sent = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => false,
                    _ = signals.finished.cancelled() => false,
                    sent = tx.send(SinkItem::Keepalive) => sent.is_ok(),
                };
                if !sent {
                    return;
                }
            }
        }
    }
}
