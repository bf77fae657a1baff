//! Consumer thread for a `MessageQueue`

use super::queue::MessageQueue;
use std::io;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long the consumer sleeps between liveness checks when idle
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Handles messages drained from a queue
pub trait MessageTarget<M>: Send + Sync {
    /// Process one message. Called on the dispatcher thread, one at a time.
    fn process_message(&self, message: M);
}

/// Dedicated thread draining a queue into a target
///
/// The target is held weakly so the dispatcher never keeps it alive; the
/// thread exits once the target is dropped or the queue is shut down.
pub struct Dispatcher<M> {
    queue: Arc<MessageQueue<M>>,
    handle: Option<JoinHandle<()>>,
}

impl<M: Send + 'static> Dispatcher<M> {
    /// Spawn a named consumer thread
    pub fn spawn<T>(name: &str, queue: Arc<MessageQueue<M>>, target: Weak<T>) -> io::Result<Self>
    where
        T: MessageTarget<M> + 'static,
    {
        let thread_queue = Arc::clone(&queue);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || Self::run(&thread_queue, &target))?;

        Ok(Self {
            queue,
            handle: Some(handle),
        })
    }

    fn run<T: MessageTarget<M>>(queue: &MessageQueue<M>, target: &Weak<T>) {
        tracing::debug!("Dispatcher thread started");

        while !queue.is_shutdown() {
            let due = queue.wait_due(Some(IDLE_POLL));
            if due.is_empty() {
                if target.strong_count() == 0 {
                    break;
                }
                continue;
            }

            let Some(target) = target.upgrade() else {
                break;
            };
            for message in due {
                target.process_message(message);
            }
        }

        tracing::debug!("Dispatcher thread exiting");
    }
}

impl<M> Dispatcher<M> {
    /// Shut the queue down and wait for the thread
    ///
    /// Safe to call from the dispatcher thread itself (the target may be
    /// dropped while handling a message); the join is skipped in that case.
    pub fn stop(&mut self) {
        self.queue.shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!("Dispatcher thread panicked");
            }
        }
    }
}

impl<M> Drop for Dispatcher<M> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<u32>>,
    }

    impl MessageTarget<u32> for Recorder {
        fn process_message(&self, message: u32) {
            self.seen.lock().unwrap().push(message);
        }
    }

    fn wait_for(recorder: &Recorder, count: usize) -> Vec<u32> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let seen = recorder.seen.lock().unwrap().clone();
            if seen.len() >= count || Instant::now() > deadline {
                return seen;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn delivers_in_order_on_worker_thread() {
        let queue = Arc::new(MessageQueue::new());
        let recorder = Arc::new(Recorder::default());
        let mut dispatcher =
            Dispatcher::spawn("test-dispatch", queue.clone(), Arc::downgrade(&recorder)).unwrap();

        queue.post(1);
        queue.post_delayed(3, Duration::from_millis(30));
        queue.post(2);

        assert_eq!(wait_for(&recorder, 3), vec![1, 2, 3]);
        dispatcher.stop();
        assert!(queue.is_shutdown());
    }

    #[test]
    fn exits_when_target_is_dropped() {
        let queue = Arc::new(MessageQueue::<u32>::new());
        let recorder = Arc::new(Recorder::default());
        let mut dispatcher =
            Dispatcher::spawn("test-dispatch", queue.clone(), Arc::downgrade(&recorder)).unwrap();

        drop(recorder);
        // Join returns once the idle poll notices the target is gone
        let handle = dispatcher.handle.take().unwrap();
        handle.join().unwrap();
    }
}
