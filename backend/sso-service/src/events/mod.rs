//! Asynchronous, bounded, cancellable event-publication pipeline.
//!
//! `publish` is a non-blocking attempt to hand an event to the background
//! send loop; it fails immediately when the queue is full or the pipeline
//! has been stopped. Broker acknowledgements are drained on their own loop
//! and only logged and counted: publish-time success means "accepted into
//! the local queue", not "delivered". At-least-once, caller-visible failure.

pub mod kafka;

use async_trait::async_trait;
use event_schema::{DomainEvent, EventEnvelope};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum PublishError {
    /// The bounded queue is full; the event was rejected, not queued.
    #[error("event queue is full")]
    QueueFull,

    /// The pipeline has been shut down.
    #[error("event publisher stopped")]
    Stopped,

    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("producer configuration failed: {0}")]
    Config(String),

    #[error("bus queue is full")]
    QueueFull,

    #[error("bus closed")]
    Closed,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Broker acknowledgement for one enqueued message.
pub type Delivery = BoxFuture<'static, Result<(), BusError>>;

/// Topic-addressed byte-payload producer boundary. `enqueue` must not block:
/// it either accepts the message into the producer's local buffer and
/// returns the pending acknowledgement, or fails immediately.
#[async_trait]
pub trait MessageBus: Send + Sync {
    fn enqueue(&self, topic: &str, key: &str, payload: &[u8]) -> Result<Delivery, BusError>;

    /// Flush and release the underlying producer.
    async fn close(&self);
}

#[derive(Debug, Default)]
pub struct DeliveryStats {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl DeliveryStats {
    /// `(enqueued, delivered, failed)` counters so far.
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.enqueued.load(Ordering::Relaxed),
            self.delivered.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

struct OutboundEvent {
    topic: &'static str,
    key: String,
    payload: Vec<u8>,
}

/// Handle used by request paths to emit domain events.
#[derive(Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<OutboundEvent>,
    source: String,
    stats: Arc<DeliveryStats>,
}

impl EventPublisher {
    /// Start the pipeline: a bounded queue, a send loop pushing to the bus
    /// and an acknowledgement drain.
    pub fn spawn(
        bus: Arc<dyn MessageBus>,
        source: impl Into<String>,
        capacity: usize,
    ) -> (EventPublisher, PublisherTask) {
        let (tx, mut rx) = mpsc::channel::<OutboundEvent>(capacity);
        let (ack_tx, mut ack_rx) = mpsc::unbounded_channel::<Delivery>();
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let stats = Arc::new(DeliveryStats::default());

        let send_stats = stats.clone();
        let send_bus = bus.clone();
        let send_loop = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    msg = rx.recv() => {
                        let Some(event) = msg else { break };
                        match send_bus.enqueue(event.topic, &event.key, &event.payload) {
                            Ok(delivery) => {
                                if ack_tx.send(delivery).is_err() {
                                    break;
                                }
                            }
                            Err(err) => {
                                send_stats.failed.fetch_add(1, Ordering::Relaxed);
                                warn!(topic = event.topic, error = %err, "bus rejected event");
                            }
                        }
                    }
                }
            }
        });

        let ack_stats = stats.clone();
        let ack_loop = tokio::spawn(async move {
            while let Some(delivery) = ack_rx.recv().await {
                match delivery.await {
                    Ok(()) => {
                        ack_stats.delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        ack_stats.failed.fetch_add(1, Ordering::Relaxed);
                        error!(error = %err, "event delivery failed");
                    }
                }
            }
        });

        (
            EventPublisher {
                tx,
                source: source.into(),
                stats,
            },
            PublisherTask {
                stop: stop_tx,
                send_loop,
                ack_loop,
                bus,
            },
        )
    }

    /// Non-blocking enqueue of a domain event wrapped in a versioned
    /// envelope. Fail-fast on overflow or after shutdown; never waits.
    pub fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        let topic = event.topic();
        let key = event.partition_key();
        let envelope = EventEnvelope::new(self.source.clone(), event);
        let payload = serde_json::to_vec(&envelope)?;

        self.tx
            .try_send(OutboundEvent {
                topic,
                key,
                payload,
            })
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => PublishError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => PublishError::Stopped,
            })?;

        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn stats(&self) -> &DeliveryStats {
        &self.stats
    }
}

/// Owner of the background loops; dropping the task without calling
/// [`PublisherTask::shutdown`] aborts delivery of queued events.
pub struct PublisherTask {
    stop: watch::Sender<bool>,
    send_loop: JoinHandle<()>,
    ack_loop: JoinHandle<()>,
    bus: Arc<dyn MessageBus>,
}

impl PublisherTask {
    /// Stop both loops, then close the underlying producer. Consumes the
    /// task, so it runs exactly once; any publisher parked on the queue
    /// observes `Stopped` from then on.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.send_loop.await;
        let _ = self.ack_loop.await;
        self.bus.close().await;
        info!("event publisher stopped");
    }
}
