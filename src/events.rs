//! Event bus for decoupled subscribers
//!
//! History, notification and catalog-refresh subscribers listen on a
//! `tokio::sync::broadcast` channel. Publishing never waits for subscribers: a slow
//! subscriber that falls more than [`EVENT_BUFFER`] events behind receives
//! `RecvError::Lagged` and skips ahead.

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::types::Event;

/// Events buffered per subscriber before it starts lagging
pub const EVENT_BUFFER: usize = 1000;

/// Publishing side of the event bus (cheap to clone)
#[derive(Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<Event>,
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher {
    /// Create a bus with the default buffer size
    pub fn new() -> Self {
        Self::with_capacity(EVENT_BUFFER)
    }

    /// Create a bus buffering `capacity` events per subscriber
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to every current subscriber
    ///
    /// Fire-and-forget: with no subscribers the event is dropped. Returns the number
    /// of subscribers that will see it.
    pub fn publish(&self, event: Event) -> usize {
        // send() only errors when nobody is listening
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to all events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Subscribe as a `Stream`, for consumers built on stream combinators
    pub fn stream(&self) -> BroadcastStream<Event> {
        BroadcastStream::new(self.tx.subscribe())
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
