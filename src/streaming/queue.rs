//! Cross-thread event queue
//!
//! Many producers (one per connection thread), one consumer. Producers never
//! block; the consumer drains everything queued once per tick. Order is FIFO
//! per producer, and across producers in enqueue order.

use crate::protocol::TelemetryEvent;
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

/// Consumer of decoded telemetry
///
/// Implemented for any `FnMut(TelemetryEvent)`, so a closure can be passed
/// straight to [`EventQueue::drain_into`].
pub trait TelemetrySink {
    fn on_event(&mut self, event: TelemetryEvent);
}

impl<F> TelemetrySink for F
where
    F: FnMut(TelemetryEvent),
{
    fn on_event(&mut self, event: TelemetryEvent) {
        self(event)
    }
}

/// Producer handle; cheap to clone, one per connection
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<TelemetryEvent>,
}

impl EventSender {
    /// Enqueue without blocking
    ///
    /// Returns `false` if the consuming side is gone; the event is dropped.
    pub fn send(&self, event: TelemetryEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Consumer side of the queue
#[derive(Debug)]
pub struct EventQueue {
    tx: Sender<TelemetryEvent>,
    rx: Receiver<TelemetryEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// Deliver every queued event to `sink`, returning how many were delivered
    ///
    /// Events enqueued while draining are picked up by this same call.
    pub fn drain_into<S: TelemetrySink + ?Sized>(&self, sink: &mut S) -> usize {
        let mut delivered = 0;
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    sink.on_event(event);
                    delivered += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        delivered
    }

    /// Take every queued event
    pub fn drain_all(&self) -> Vec<TelemetryEvent> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
