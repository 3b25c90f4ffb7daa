//! The event queue between the capture loop and the BLE sender.
//!
//! The queue is an unbounded FIFO with one logical producer (the capture loop)
//! and one consumer (the sender's transmit tick). It is the only buffer in the
//! system: an event leaves the queue only at the moment it is about to be
//! written to the characteristic. While the peripheral is unreachable, events
//! simply accumulate here and drain in order once the link is back.
//!
//! # Blocking semantics
//!
//! - [`EventQueueProducer::push`] never blocks (the channel is unbounded).
//! - [`EventQueueConsumer::try_pop`] never blocks either; it returns
//!   `Ok(None)` immediately when nothing is queued, so the transmit tick can
//!   never stall waiting for input.
//!
//! # Envelope
//!
//! Items are stored serialized with `bincode`, the way they would travel if
//! the capture and sender sides ran as separate processes. The consumer
//! therefore has to decode each item and can observe one that does not parse;
//! that case is reported as [`QueueError::Malformed`] and the sender decides
//! how to degrade.

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::domain::key_event::KeyEvent;

/// Errors reported by the queue endpoints.
#[derive(Debug, Error, PartialEq)]
pub enum QueueError {
    /// The item at the head of the queue could not be decoded as a [`KeyEvent`].
    /// The item has been removed.
    #[error("malformed queue item: {0}")]
    Malformed(String),

    /// An event could not be serialized into the queue envelope.
    #[error("failed to encode queue item: {0}")]
    Encode(String),

    /// The other endpoint has been dropped.
    #[error("event queue closed")]
    Closed,
}

/// Creates a new, empty event queue and returns its two endpoints.
///
/// The producer can be cloned freely; the consumer is unique.
pub fn event_queue() -> (EventQueueProducer, EventQueueConsumer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventQueueProducer { tx }, EventQueueConsumer { rx })
}

/// Sending half of the event queue, held by the capture loop.
#[derive(Debug, Clone)]
pub struct EventQueueProducer {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl EventQueueProducer {
    /// Appends an event to the tail of the queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the consumer has been dropped (the
    /// sender is gone).
    pub fn push(&self, event: &KeyEvent) -> Result<(), QueueError> {
        let item = bincode::serialize(event).map_err(|e| QueueError::Encode(e.to_string()))?;
        self.push_raw(item)
    }

    /// Appends an already-encoded item to the tail of the queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the consumer has been dropped.
    pub fn push_raw(&self, item: Vec<u8>) -> Result<(), QueueError> {
        self.tx.send(item).map_err(|_| QueueError::Closed)
    }

    /// Returns `true` if the consumer has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of the event queue, owned by the sender.
#[derive(Debug)]
pub struct EventQueueConsumer {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl EventQueueConsumer {
    /// Removes and returns the event at the head of the queue without waiting.
    ///
    /// Returns `Ok(None)` if the queue is currently empty.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Malformed`] if the head item does not decode. It is
    ///   consumed either way.
    /// - [`QueueError::Closed`] if the queue is empty and every producer has
    ///   been dropped.
    pub fn try_pop(&mut self) -> Result<Option<KeyEvent>, QueueError> {
        match self.rx.try_recv() {
            Ok(item) => bincode::deserialize::<KeyEvent>(&item)
                .map(Some)
                .map_err(|e| QueueError::Malformed(e.to_string())),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(QueueError::Closed),
        }
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
