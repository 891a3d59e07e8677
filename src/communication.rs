//! typed publish/subscribe used in place of app wide broadcasts

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError, Weak,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmEvent {
    /// the presentation service started or stopped sounding
    RingingChanged(bool),
    /// one second passed on the countdown for `deadline`
    Tick { deadline: i64, remaining_secs: i64 },
}

type Registry<E> = Mutex<Vec<(u64, Sender<E>)>>;

/// fans every published event out to all live subscriptions
pub struct Broadcaster<E> {
    subscribers: Arc<Registry<E>>,
    next_id: Arc<AtomicU64>,
}

impl<E> Clone for Broadcaster<E> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<E> Default for Broadcaster<E> {
    fn default() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<E: Clone + Send> Broadcaster<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription<E> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, sender));
        Subscription {
            id,
            receiver,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// returns how many subscribers got the event
    pub fn publish(&self, event: E) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|(_, sender)| sender.send(event.clone()).is_ok());
        subscribers.len()
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// a scoped receiver, unsubscribes when dropped
pub struct Subscription<E> {
    id: u64,
    receiver: Receiver<E>,
    subscribers: Weak<Registry<E>>,
}

impl<E> Subscription<E> {
    pub fn try_iter(&self) -> TryIter<'_, E> {
        self.receiver.try_iter()
    }

    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Result<E, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}
