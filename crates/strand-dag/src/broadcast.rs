use std::sync::Mutex;

use tokio::sync::mpsc;

/// Fan-out of values to every live subscriber.
///
/// Each subscriber gets its own bounded channel. [`Broadcaster::publish`]
/// waits for room in every subscriber's buffer, so a slow subscriber slows
/// the publisher instead of losing values. Subscribers whose receiving end
/// was dropped are pruned on the next publish.
pub struct Broadcaster<T> {
    capacity: usize,
    subscribers: Mutex<Vec<mpsc::Sender<T>>>,
}

impl<T: Clone + Send> Broadcaster<T> {
    /// `capacity` is the per-subscriber buffer size (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber. It receives values published from now on.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers
            .lock()
            .expect("broadcaster lock poisoned")
            .push(tx);
        Subscription { receiver: rx }
    }

    /// Deliver `value` to every live subscriber. Returns how many received it.
    pub async fn publish(&self, value: T) -> usize {
        let senders = self
            .subscribers
            .lock()
            .expect("broadcaster lock poisoned")
            .clone();

        let mut delivered = 0;
        for sender in &senders {
            if sender.send(value.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        if delivered < senders.len() {
            self.subscribers
                .lock()
                .expect("broadcaster lock poisoned")
                .retain(|sender| !sender.is_closed());
        }
        delivered
    }

    /// Number of registered subscribers, including ones not yet pruned.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("broadcaster lock poisoned")
            .len()
    }
}

impl<T> std::fmt::Debug for Broadcaster<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Receiving end of a [`Broadcaster`] subscription.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> Subscription<T> {
    /// Wait for the next value. `None` once the broadcaster is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Take a value if one is buffered.
    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }
}
