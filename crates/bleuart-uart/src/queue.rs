//! Single-producer / single-consumer RX byte queue
//!
//! The radio event path owns the only [`RxProducer`] and the application owns the
//! only [`RxConsumer`]; neither half is `Clone`. The producer never overwrites: a
//! full queue makes it spin until the consumer frees a slot.

use std::sync::Arc;

use crossbeam::queue::ArrayQueue;
use crossbeam::utils::Backoff;

/// Create a queue of `capacity` bytes and split it into its two halves
pub fn rx_queue(capacity: usize) -> (RxProducer, RxConsumer) {
    let queue = Arc::new(ArrayQueue::new(capacity));
    (
        RxProducer {
            queue: Arc::clone(&queue),
        },
        RxConsumer { queue },
    )
}

/// Writing half, used from the radio event path
#[derive(Debug)]
pub struct RxProducer {
    queue: Arc<ArrayQueue<u8>>,
}

impl RxProducer {
    /// Enqueue one byte, waiting for space while the queue is full
    pub fn push(&self, byte: u8) {
        let backoff = Backoff::new();
        let mut pending = byte;
        while let Err(rejected) = self.queue.push(pending) {
            pending = rejected;
            backoff.snooze();
        }
    }

    /// Enqueue every byte in order
    pub fn push_all(&self, bytes: &[u8]) {
        for &byte in bytes {
            self.push(byte);
        }
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

/// Reading half, used from the application thread
#[derive(Debug)]
pub struct RxConsumer {
    queue: Arc<ArrayQueue<u8>>,
}

impl RxConsumer {
    /// Bytes currently queued
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Dequeue one byte if any is queued
    pub fn try_pop(&self) -> Option<u8> {
        self.queue.pop()
    }

    /// Dequeue one byte, waiting for it to become visible
    ///
    /// Returns `None` without waiting when the queue is empty.
    pub fn pop(&self) -> Option<u8> {
        if self.queue.is_empty() {
            return None;
        }

        let backoff = Backoff::new();
        loop {
            if let Some(byte) = self.queue.pop() {
                return Some(byte);
            }
            backoff.snooze();
        }
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}
