//! Bounded FIFO task queue with batch-atomic enqueue/dequeue and shutdown-drain.
//!
//! A fixed ring of slots behind one mutex. Inserts broadcast on `not_empty`, removals broadcast
//! on `not_full`; waiters recheck their own batch size.
//!
//! After [`BoundedQueue::signal_shutdown`] no more items are accepted, consumers keep draining,
//! and once the ring is empty every dequeue reports closed. Dropping the queue releases the ring;
//! all producer and worker threads must have exited by then, which `Arc` ownership guarantees.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::CopyTask;

/// The queue between walkers and copy workers.
pub type TaskQueue = BoundedQueue<CopyTask>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,
    #[error("cannot allocate queue storage for {0} tasks")]
    OutOfMemory(usize),
    #[error("batch of {batch} exceeds queue capacity {capacity}")]
    BatchTooLarge { batch: usize, capacity: usize },
    #[error("queue is shut down")]
    ShutDown,
}

/// Ring state. Invariants: `size <= slots.len()`, slots `head..head+size` (mod len) are `Some`.
struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    size: usize,
    shutdown: bool,
}

impl<T> Ring<T> {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn free(&self) -> usize {
        self.capacity() - self.size
    }

    fn tail(&self) -> usize {
        (self.head + self.size) % self.capacity()
    }

    fn push_back(&mut self, item: T) {
        let tail = self.tail();
        self.slots[tail] = Some(item);
        self.size += 1;
    }

    fn pop_front(&mut self) -> Option<T> {
        if self.size == 0 {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.size -= 1;
        item
    }
}

pub struct BoundedQueue<T> {
    state: Mutex<Ring<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Allocate a queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| QueueError::OutOfMemory(capacity))?;
        slots.resize_with(capacity, || None);
        Ok(Self {
            state: Mutex::new(Ring {
                slots: slots.into_boxed_slice(),
                head: 0,
                size: 0,
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until `n` slots are free or shutdown. Returns the guard with room for `n`.
    fn wait_for_room(&self, n: usize) -> Result<MutexGuard<'_, Ring<T>>, QueueError> {
        if n > self.capacity {
            return Err(QueueError::BatchTooLarge {
                batch: n,
                capacity: self.capacity,
            });
        }
        let ring = self
            .not_full
            .wait_while(self.lock(), |r| !r.shutdown && r.free() < n)
            .unwrap_or_else(PoisonError::into_inner);
        if ring.shutdown {
            return Err(QueueError::ShutDown);
        }
        Ok(ring)
    }

    /// Block until an item is available or the queue is shut down and empty (None).
    fn wait_for_items(&self) -> Option<MutexGuard<'_, Ring<T>>> {
        let ring = self
            .not_empty
            .wait_while(self.lock(), |r| r.size == 0 && !r.shutdown)
            .unwrap_or_else(PoisonError::into_inner);
        if ring.size == 0 {
            return None;
        }
        Some(ring)
    }

    /// Insert all of `items` in one locked step, blocking until there is room for the whole batch.
    ///
    /// Batches from different producers never interleave. A batch larger than the capacity can
    /// never fit and fails with [`QueueError::BatchTooLarge`]; after shutdown every call fails
    /// with [`QueueError::ShutDown`].
    pub fn enqueue_batch(&self, items: Vec<T>) -> Result<(), QueueError> {
        if items.is_empty() {
            return Ok(());
        }
        let mut ring = self.wait_for_room(items.len())?;
        for item in items {
            ring.push_back(item);
        }
        drop(ring);
        self.not_empty.notify_all();
        Ok(())
    }

    /// Insert one item, blocking while the queue is full.
    pub fn push(&self, item: T) -> Result<(), QueueError> {
        let mut ring = self.wait_for_room(1)?;
        ring.push_back(item);
        drop(ring);
        self.not_empty.notify_all();
        Ok(())
    }

    /// Remove up to `max_count` items in FIFO order, blocking while empty.
    ///
    /// Returns None once the queue is shut down and drained; every later call returns None too.
    /// A `max_count` of 0 is treated as 1.
    pub fn dequeue_batch(&self, max_count: usize) -> Option<Vec<T>> {
        let mut ring = self.wait_for_items()?;
        let n = ring.size.min(max_count.max(1));
        let batch: Vec<T> = (0..n).filter_map(|_| ring.pop_front()).collect();
        drop(ring);
        self.not_full.notify_all();
        Some(batch)
    }

    /// Remove one item, blocking while empty. None once shut down and drained.
    pub fn pop(&self) -> Option<T> {
        let mut ring = self.wait_for_items()?;
        let item = ring.pop_front();
        drop(ring);
        self.not_full.notify_all();
        item
    }

    /// Mark the queue closed to new work and wake every waiter. Idempotent.
    ///
    /// Blocked consumers wake to drain what is left; blocked producers wake and fail with
    /// [`QueueError::ShutDown`] instead of waiting for room that may never come.
    pub fn signal_shutdown(&self) {
        let mut ring = self.lock();
        ring.shutdown = true;
        drop(ring);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock().shutdown
    }
}
