use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

static QUEUE_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

/// Unbounded multi-producer/multi-consumer FIFO. Neither end ever blocks
/// beyond the lock; consumers poll.
#[derive(Debug)]
pub struct SynchronizedQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> Default for SynchronizedQueue<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T> SynchronizedQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                if QUEUE_LOCK_POISON_WARNED
                    .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    warn!("queue lock poisoned; recovered inner value");
                }
                poisoned.into_inner()
            }
        }
    }

    pub fn push(&self, value: T) {
        self.lock().push_back(value);
    }

    pub fn pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn pop_on_empty_returns_none_and_leaves_queue_empty() {
        let queue = SynchronizedQueue::<u32>::new();
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
        queue.push(1);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn concurrent_producers_lose_nothing_and_keep_per_producer_order() {
        let queue = SynchronizedQueue::new();
        thread::scope(|scope| {
            for producer in 0..4u32 {
                let queue = &queue;
                scope.spawn(move || {
                    for sequence in 0..250u32 {
                        queue.push((producer, sequence));
                    }
                });
            }
        });

        let mut last_seen = [None::<u32>; 4];
        let mut total = 0;
        while let Some((producer, sequence)) = queue.pop() {
            let slot = &mut last_seen[producer as usize];
            if let Some(previous) = *slot {
                assert!(sequence > previous);
            }
            *slot = Some(sequence);
            total += 1;
        }
        assert_eq!(total, 1000);
    }

    #[derive(Debug, Clone)]
    enum QueueOp {
        Push(u16),
        Pop,
    }

    fn arb_op() -> impl Strategy<Value = QueueOp> {
        prop_oneof![any::<u16>().prop_map(QueueOp::Push), Just(QueueOp::Pop)]
    }

    proptest! {
        #[test]
        fn interleaved_push_pop_is_fifo(ops in prop::collection::vec(arb_op(), 0..200)) {
            let queue = SynchronizedQueue::new();
            let mut model = VecDeque::new();
            for op in ops {
                match op {
                    QueueOp::Push(value) => {
                        queue.push(value);
                        model.push_back(value);
                    }
                    QueueOp::Pop => {
                        prop_assert_eq!(queue.pop(), model.pop_front());
                    }
                }
                prop_assert_eq!(queue.len(), model.len());
            }
        }
    }
}
