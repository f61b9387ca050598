//! "Consent changed" notifications.
//!
//! The bridge fires one payload-free [`ConsentChanged`] per reconciliation.
//! Listeners re-read the legacy record on their own schedule. The notifier is a
//! port: [`ChangeBus`] is the default broadcast implementation, any
//! `Fn() + Send + Sync` closure works too.

use tokio::sync::broadcast;

/// Capacity of the broadcast channel. Slow listeners lag, they never block the bridge.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// The payload-free change event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsentChanged;

/// A handle for receiving change notifications.
pub type Subscription = broadcast::Receiver<ConsentChanged>;

pub trait ChangeNotifier: Send + Sync {
    fn notify(&self);
}

impl<F> ChangeNotifier for F
where
    F: Fn() + Send + Sync,
{
    fn notify(&self) {
        self()
    }
}

/// Broadcast bus delivering [`ConsentChanged`] to every subscriber.
#[derive(Debug)]
pub struct ChangeBus {
    tx: broadcast::Sender<ConsentChanged>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl ChangeNotifier for ChangeBus {
    fn notify(&self) {
        // send() only fails when nobody is subscribed, which is fine.
        let _ = self.tx.send(ConsentChanged);
    }
}
