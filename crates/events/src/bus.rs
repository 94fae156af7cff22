//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is the **distribution layer** between the movement engine and its
//! observers. It is intentionally lightweight:
//!
//! - **Transport-agnostic**: in-memory channels here; a broker elsewhere.
//! - **At-least-once**: consumers must tolerate duplicates (the replenishment
//!   reactor's quantity-0 suppression is an example of why that is safe).
//! - **No persistence**: tasks themselves are the audit trail; the bus only
//!   fans out notifications.
//!
//! Publishing must never block on a consumer, because publishers may be
//! holding no locks but are on the operational hot path.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to an event stream.
///
/// Each subscription gets a copy of every message published to the bus
/// (broadcast semantics). Subscriptions are designed for single-threaded
/// consumption; hand the receiver to one worker.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued, without blocking.
    pub fn drain(&self) -> Vec<M> {
        let mut out = Vec::new();
        while let Ok(m) = self.try_recv() {
            out.push(m);
        }
        out
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// `publish` can fail (implementation-specific); failures surface to the
/// caller, which may retry. Implementations must be safe to share across
/// threads - many floor operators publish concurrently.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
