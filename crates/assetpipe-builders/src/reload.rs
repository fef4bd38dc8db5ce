//! Live-reload broker.
//!
//! Every connected browser holds a subscription. A ping queues a change
//! event for each subscriber; subscribers that are gone or stopped reading
//! are dropped.

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Events a subscriber can hold before it is considered stalled.
pub const SUBSCRIBER_CAPACITY: usize = 5;

/// SSE event name sent on changes.
pub const CHANGE_EVENT: &str = "change";

/// SSE data sent with [`CHANGE_EVENT`].
pub const CHANGE_DATA: &str = "ok";

/// Fans reload pings out to subscribers.
#[derive(Debug, Default)]
pub struct Broker {
    subscribers: Mutex<Vec<mpsc::Sender<&'static str>>>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Each ping delivers [`CHANGE_DATA`].
    pub fn subscribe(&self) -> mpsc::Receiver<&'static str> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Notify every subscriber of a change.
    pub fn ping(&self) {
        tracing::info!("reloading");
        self.subscribers
            .lock()
            .retain(|tx| tx.try_send(CHANGE_DATA).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
