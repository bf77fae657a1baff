//! Serialized, time-ordered message queue
//!
//! All state transitions of a consumer funnel through one of these. Producers
//! on any thread `post` messages; a single consumer drains them in due-time
//! order (post order for equal due times) and handles them one at a time.
//!
//! ```text
//!  producers (UI, transport callbacks, editors)
//!        │ post / post_delayed / debounce
//!        ▼
//!  ┌──────────────────────────────┐
//!  │ [due 0ms] [due 0ms] [due 500ms] ...
//!  └──────────────────────────────┘
//!        │ take_due / wait_due
//!        ▼
//!  single consumer
//! ```

use super::clock::{Clock, SystemClock};
use std::collections::VecDeque;
use std::mem::discriminant;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct Enqueued<M> {
    due: Instant,
    message: M,
}

struct Inner<M> {
    pending: VecDeque<Enqueued<M>>,
    shutdown: bool,
}

/// Time-ordered message queue with delayed and debounced delivery
pub struct MessageQueue<M> {
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<M>>,
    wakeup: Condvar,
}

impl<M> MessageQueue<M> {
    /// Create a queue driven by the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a queue driven by `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(Inner {
                pending: VecDeque::new(),
                shutdown: false,
            }),
            wakeup: Condvar::new(),
        }
    }

    /// The queue's time source
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn lock(&self) -> MutexGuard<'_, Inner<M>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueue for immediate delivery
    pub fn post(&self, message: M) {
        self.post_delayed(message, Duration::ZERO);
    }

    /// Enqueue for delivery once `delay` has elapsed
    pub fn post_delayed(&self, message: M, delay: Duration) {
        let due = self.clock.now() + delay;
        let mut inner = self.lock();
        if inner.shutdown {
            return;
        }

        // Stable insert: after everything due at or before us
        let at = inner
            .pending
            .iter()
            .position(|queued| queued.due > due)
            .unwrap_or(inner.pending.len());
        inner.pending.insert(at, Enqueued { due, message });

        if at == 0 {
            self.wakeup.notify_all();
        }
    }

    /// Replace any pending message of the same variant, then post delayed
    ///
    /// Rapid repeated requests collapse into the last one.
    pub fn debounce(&self, message: M, delay: Duration) {
        let kind = discriminant(&message);
        self.remove(|pending| discriminant(pending) == kind);
        self.post_delayed(message, delay);
    }

    /// Drop pending messages matching `predicate`, returning how many
    pub fn remove(&self, mut predicate: impl FnMut(&M) -> bool) -> usize {
        let mut inner = self.lock();
        let before = inner.pending.len();
        inner.pending.retain(|queued| !predicate(&queued.message));
        before - inner.pending.len()
    }

    /// Whether any pending message matches `predicate`
    pub fn contains(&self, mut predicate: impl FnMut(&M) -> bool) -> bool {
        self.lock()
            .pending
            .iter()
            .any(|queued| predicate(&queued.message))
    }

    /// Number of pending messages, due or not
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pop every message that is due now, in order
    pub fn take_due(&self) -> Vec<M> {
        let now = self.clock.now();
        Self::drain_due(&mut self.lock(), now)
    }

    /// Block until the head message is due (or `max_wait` passes), then pop
    /// everything due
    ///
    /// Returns early with nothing if the queue is shut down.
    pub fn wait_due(&self, max_wait: Option<Duration>) -> Vec<M> {
        let mut inner = self.lock();
        if inner.shutdown {
            return Vec::new();
        }

        let until_head = inner
            .pending
            .front()
            .map(|head| head.due.saturating_duration_since(self.clock.now()));

        let wait = match (until_head, max_wait) {
            (Some(head), Some(max)) => Some(head.min(max)),
            (head, None) => head,
            (None, max) => max,
        };

        match wait {
            Some(wait) if wait.is_zero() => {}
            Some(wait) => {
                inner = match self.wakeup.wait_timeout(inner, wait) {
                    Ok((guard, _)) => guard,
                    Err(poisoned) => poisoned.into_inner().0,
                };
            }
            None => {
                inner = self.wakeup.wait(inner).unwrap_or_else(|e| e.into_inner());
            }
        }

        if inner.shutdown {
            return Vec::new();
        }
        let now = self.clock.now();
        Self::drain_due(&mut inner, now)
    }

    /// Stop accepting messages and wake any waiting consumer
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        inner.shutdown = true;
        inner.pending.clear();
        self.wakeup.notify_all();
    }

    /// Whether `shutdown` has been called
    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    fn drain_due(inner: &mut Inner<M>, now: Instant) -> Vec<M> {
        let mut due = Vec::new();
        while inner.pending.front().is_some_and(|head| head.due <= now) {
            if let Some(queued) = inner.pending.pop_front() {
                due.push(queued.message);
            }
        }
        due
    }
}

impl<M> Default for MessageQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::clock::ManualClock;
    use std::thread;

    #[derive(Debug, PartialEq)]
    enum Msg {
        A(u32),
        B(u32),
    }

    fn queue() -> (Arc<ManualClock>, MessageQueue<Msg>) {
        let clock = Arc::new(ManualClock::new());
        let queue = MessageQueue::with_clock(clock.clone());
        (clock, queue)
    }

    #[test]
    fn immediate_messages_keep_post_order() {
        let (_, queue) = queue();
        queue.post(Msg::A(1));
        queue.post(Msg::B(2));
        queue.post(Msg::A(3));
        assert_eq!(queue.take_due(), vec![Msg::A(1), Msg::B(2), Msg::A(3)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn delayed_messages_wait_for_the_clock() {
        let (clock, queue) = queue();
        queue.post_delayed(Msg::A(1), Duration::from_millis(100));
        queue.post(Msg::B(2));

        assert_eq!(queue.take_due(), vec![Msg::B(2)]);
        clock.advance(Duration::from_millis(99));
        assert!(queue.take_due().is_empty());
        clock.advance(Duration::from_millis(1));
        assert_eq!(queue.take_due(), vec![Msg::A(1)]);
    }

    #[test]
    fn debounce_keeps_only_the_last_request() {
        let (clock, queue) = queue();
        queue.debounce(Msg::A(10), Duration::from_millis(500));
        clock.advance(Duration::from_millis(40));
        queue.debounce(Msg::A(20), Duration::from_millis(500));
        clock.advance(Duration::from_millis(40));
        queue.debounce(Msg::A(30), Duration::from_millis(500));
        queue.post(Msg::B(1));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.take_due(), vec![Msg::B(1)]);

        // 500ms after the *last* request, not the first
        clock.advance(Duration::from_millis(460));
        assert!(queue.take_due().is_empty());
        clock.advance(Duration::from_millis(40));
        assert_eq!(queue.take_due(), vec![Msg::A(30)]);
    }

    #[test]
    fn remove_and_contains_filter_by_predicate() {
        let (_, queue) = queue();
        queue.post(Msg::A(1));
        queue.post_delayed(Msg::B(2), Duration::from_secs(25));
        queue.post(Msg::B(3));

        assert!(queue.contains(|m| matches!(m, Msg::B(2))));
        assert_eq!(queue.remove(|m| matches!(m, Msg::B(_))), 2);
        assert!(!queue.contains(|m| matches!(m, Msg::B(_))));
        assert_eq!(queue.take_due(), vec![Msg::A(1)]);
    }

    #[test]
    fn shutdown_wakes_a_blocked_consumer() {
        let queue: Arc<MessageQueue<Msg>> = Arc::new(MessageQueue::new());
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.wait_due(None))
        };

        thread::sleep(Duration::from_millis(20));
        queue.shutdown();
        assert!(consumer.join().unwrap().is_empty());

        queue.post(Msg::A(1));
        assert!(queue.is_empty());
    }

    #[test]
    fn wait_due_returns_posted_message() {
        let queue: Arc<MessageQueue<Msg>> = Arc::new(MessageQueue::new());
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || {
                let mut received = Vec::new();
                while received.is_empty() {
                    received = queue.wait_due(Some(Duration::from_millis(10)));
                }
                received
            })
        };

        queue.post(Msg::B(7));
        assert_eq!(consumer.join().unwrap(), vec![Msg::B(7)]);
    }
}
