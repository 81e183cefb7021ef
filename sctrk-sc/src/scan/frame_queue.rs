/// Bounded frame queue between the capture thread and the decode worker
///
/// Single-producer single-consumer ring buffer:
/// - Producer (capture thread): pushes every Nth frame while scanning
/// - Consumer (decode worker): pops frames and decodes them
/// - Full queue: the new frame is dropped silently, the producer never blocks
///
/// Each queued frame carries the scan epoch it was captured in so the
/// consumer can discard frames from an earlier scanning window.

use crate::bridges::Frame;
use ringbuf::{traits::*, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, trace};

/// Frame stamped with its capture epoch
#[derive(Debug, Clone)]
pub struct QueuedFrame {
    pub frame: Frame,
    pub epoch: u64,
}

/// Queue counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameQueueStats {
    pub pushed: u64,
    pub dropped: u64,
    pub capacity: usize,
}

#[derive(Debug, Default)]
struct Counters {
    pushed: AtomicU64,
    dropped: AtomicU64,
}

/// Frame queue before it is split between threads
pub struct FrameQueue {
    buffer: HeapRb<QueuedFrame>,
    counters: Arc<Counters>,
    notify: Arc<Notify>,
}

impl FrameQueue {
    /// Create a queue holding at most `capacity` frames
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        debug!("Creating frame queue with capacity {}", capacity);

        Self {
            buffer: HeapRb::new(capacity),
            counters: Arc::new(Counters::default()),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Split into producer and consumer halves
    pub fn split(self) -> (FrameProducer, FrameConsumer) {
        let (prod, cons) = self.buffer.split();

        let producer = FrameProducer {
            producer: prod,
            counters: Arc::clone(&self.counters),
            notify: Arc::clone(&self.notify),
        };

        let consumer = FrameConsumer {
            consumer: cons,
            counters: Arc::clone(&self.counters),
            notify: Arc::clone(&self.notify),
        };

        (producer, consumer)
    }
}

/// Producer half (capture thread)
pub struct FrameProducer {
    producer: ringbuf::HeapProd<QueuedFrame>,
    counters: Arc<Counters>,
    notify: Arc<Notify>,
}

impl FrameProducer {
    /// Push a frame without blocking
    ///
    /// Returns false if the queue was full and the frame was dropped.
    pub fn push(&mut self, frame: QueuedFrame) -> bool {
        match self.producer.try_push(frame) {
            Ok(()) => {
                self.counters.pushed.fetch_add(1, Ordering::Relaxed);
                self.notify.notify_one();
                true
            }
            Err(dropped) => {
                let count = self.counters.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                trace!(
                    "Frame queue full, dropped frame {} (total dropped: {})",
                    dropped.frame.sequence,
                    count
                );
                false
            }
        }
    }

    pub fn occupied_len(&self) -> usize {
        self.producer.occupied_len()
    }

    pub fn stats(&self) -> FrameQueueStats {
        FrameQueueStats {
            pushed: self.counters.pushed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            capacity: self.producer.capacity().into(),
        }
    }
}

/// Consumer half (decode worker)
pub struct FrameConsumer {
    consumer: ringbuf::HeapCons<QueuedFrame>,
    counters: Arc<Counters>,
    notify: Arc<Notify>,
}

impl FrameConsumer {
    /// Pop the oldest frame, if any
    pub fn pop(&mut self) -> Option<QueuedFrame> {
        self.consumer.try_pop()
    }

    /// Wake-up handle signalled on every successful push
    pub fn notified(&self) -> Arc<Notify> {
        Arc::clone(&self.notify)
    }

    pub fn occupied_len(&self) -> usize {
        self.consumer.occupied_len()
    }

    pub fn stats(&self) -> FrameQueueStats {
        FrameQueueStats {
            pushed: self.counters.pushed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            capacity: self.consumer.capacity().into(),
        }
    }
}
