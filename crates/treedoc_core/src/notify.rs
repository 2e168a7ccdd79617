//! Change notification channel.
//!
//! Collection nodes only ever write to a [`Notifier`]. Delivery semantics
//! (ordering across calls, subscriber count, sync vs async) belong to the
//! notifier implementation.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use treedoc_core::{ChangeEvent, ChangeFeed, Notifier};
//!
//! let feed = Arc::new(ChangeFeed::new());
//! let receiver = feed.subscribe();
//!
//! feed.notify(ChangeEvent::collection_added("c1".into(), "/root"));
//!
//! let record = receiver.recv().unwrap();
//! assert_eq!(record.sequence, 1);
//! assert_eq!(record.event.path(), "/root");
//! ```

use crate::event::ChangeEvent;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// A fan-out channel for change events.
///
/// `notify` is fire-and-forget: it must not fail and must not block on
/// subscribers.
pub trait Notifier: Send + Sync {
    /// Publishes one event.
    fn notify(&self, event: ChangeEvent);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, event: ChangeEvent) {
        (**self).notify(event);
    }
}

/// A change event stamped with its position in a [`ChangeFeed`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// Sequence number, starting at 1 and increasing by one per event.
    pub sequence: u64,
    /// The event.
    pub event: ChangeEvent,
}

/// A notifier that distributes events to subscribers and keeps a bounded
/// history for catch-up polling.
///
/// The change feed:
/// - Stamps events with increasing sequence numbers
/// - Delivers events to each subscriber in sequence order
/// - Delivers every event to every live subscriber
/// - Supports multiple subscribers
/// - Is thread-safe
pub struct ChangeFeed {
    subscribers: RwLock<Vec<Sender<ChangeRecord>>>,
    /// Held across sequence assignment, history append and delivery.
    history: Mutex<History>,
    max_history: usize,
}

struct History {
    records: VecDeque<ChangeRecord>,
    last_sequence: u64,
}

impl ChangeFeed {
    /// Creates a new change feed.
    pub fn new() -> Self {
        Self::with_max_history(10_000)
    }

    /// Creates a change feed with a specific history limit.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: Mutex::new(History {
                records: VecDeque::new(),
                last_sequence: 0,
            }),
            max_history,
        }
    }

    /// Subscribes to the feed.
    ///
    /// Returns a receiver that will receive all future events. The receiver
    /// should be drained regularly to avoid unbounded memory growth.
    pub fn subscribe(&self) -> Receiver<ChangeRecord> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Returns history records with sequence > `cursor`, up to `limit`.
    pub fn poll(&self, cursor: u64, limit: usize) -> Vec<ChangeRecord> {
        self.history
            .lock()
            .records
            .iter()
            .filter(|r| r.sequence > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns every event still held in history, oldest first.
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.history
            .lock()
            .records
            .iter()
            .map(|r| r.event.clone())
            .collect()
    }

    /// Returns the latest sequence number issued (0 if none).
    pub fn latest_sequence(&self) -> u64 {
        self.history.lock().last_sequence
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the number of events in history.
    pub fn history_len(&self) -> usize {
        self.history.lock().records.len()
    }
}

impl Notifier for ChangeFeed {
    fn notify(&self, event: ChangeEvent) {
        // Sending under the history lock keeps delivery in sequence order.
        let mut history = self.history.lock();
        history.last_sequence += 1;
        let record = ChangeRecord {
            sequence: history.last_sequence,
            event,
        };
        history.records.push_back(record.clone());
        while history.records.len() > self.max_history {
            history.records.pop_front();
        }

        tracing::trace!(sequence = record.sequence, event = %record.event, "change published");

        // Drop subscribers whose receiver is gone
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(record.clone()).is_ok());
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("subscribers", &self.subscriber_count())
            .field("history_len", &self.history_len())
            .field("max_history", &self.max_history)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn added(n: u32) -> ChangeEvent {
        ChangeEvent::collection_added(format!("c{n}").into(), "/root")
    }

    #[test]
    fn notify_and_receive() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe();

        feed.notify(added(1));

        let received = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(received.sequence, 1);
        assert_eq!(received.event, added(1));
    }

    #[test]
    fn multiple_subscribers() {
        let feed = ChangeFeed::new();
        let rx1 = feed.subscribe();
        let rx2 = feed.subscribe();

        feed.notify(added(1));

        assert_eq!(rx1.recv().unwrap().event, added(1));
        assert_eq!(rx2.recv().unwrap().event, added(1));
    }

    #[test]
    fn subscriber_cleanup() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        drop(rx);

        feed.notify(added(1));
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn poll_from_cursor() {
        let feed = ChangeFeed::new();
        for i in 1..=5 {
            feed.notify(added(i));
        }

        let records = feed.poll(2, 10);
        let sequences: Vec<u64> = records.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![3, 4, 5]);
        assert_eq!(feed.poll(0, 3).len(), 3);
    }

    #[test]
    fn history_is_bounded() {
        let feed = ChangeFeed::with_max_history(5);
        for i in 1..=10 {
            feed.notify(added(i));
        }

        assert_eq!(feed.history_len(), 5);
        assert_eq!(feed.poll(0, 100)[0].sequence, 6);
        assert_eq!(feed.latest_sequence(), 10);
    }

    #[test]
    fn notify_through_shared_handle() {
        let feed = Arc::new(ChangeFeed::new());
        let notifier: Arc<dyn Notifier> = feed.clone();
        notifier.notify(added(7));
        assert_eq!(feed.events(), vec![added(7)]);
    }

    #[test]
    fn threaded_notify() {
        let feed = Arc::new(ChangeFeed::new());
        let rx = feed.subscribe();

        let feed_clone = Arc::clone(&feed);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            feed_clone.notify(added(42));
        });

        let received = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(received.event, added(42));

        handle.join().unwrap();
    }

    #[test]
    fn concurrent_notify_delivers_in_sequence_order() {
        const THREADS: u32 = 8;
        const PER_THREAD: u32 = 2_000;

        let feed = Arc::new(ChangeFeed::with_max_history(16));
        let rx = feed.subscribe();

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let feed = Arc::clone(&feed);
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        feed.notify(added(t * PER_THREAD + i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let sequences: Vec<u64> = rx.try_iter().map(|r| r.sequence).collect();
        assert_eq!(sequences.len(), (THREADS * PER_THREAD) as usize);
        assert!(sequences.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(sequences.first(), Some(&1));
    }
}
