//! Memory-bounded FIFO queue
//!
//! `MemoryBoundedQueue` bounds its backlog by *estimated memory* rather than
//! item count. Producers wait in `push` while the budget is exhausted and
//! consumers wait in `pop` while the queue is empty.
//!
//! # Closing
//!
//! Closing replaces the old "push an empty string to wake the consumer"
//! trick. After `close()`:
//! - `push` returns the item back inside `QueueClosed`
//! - `pop` keeps returning queued items, then `None`
//!
//! `clear()` discards everything still queued, which is how an abrupt stop
//! releases producers blocked at the memory ceiling.
//!
//! # Budget
//!
//! An item whose estimate exceeds `max_bytes` can never fit and its `push`
//! waits until the queue is closed. Callers validate the budget against the
//! largest possible item at startup.

use std::collections::VecDeque;
use std::fmt;
use std::pin::pin;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Fixed per-item overhead added to every estimate
///
/// Models the `String` header stored alongside the payload.
pub const ITEM_OVERHEAD_BYTES: usize = std::mem::size_of::<String>();

/// Estimated memory footprint of a queued item
pub trait EstimateSize {
    /// Bytes this item is charged against the queue budget
    fn estimated_size(&self) -> usize;
}

impl EstimateSize for String {
    #[inline]
    fn estimated_size(&self) -> usize {
        self.len() + ITEM_OVERHEAD_BYTES
    }
}

/// Error returned by `push` on a closed queue, carrying the rejected item
pub struct QueueClosed<T>(pub T);

impl<T> QueueClosed<T> {
    /// Recover the item that could not be queued
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for QueueClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueClosed(..)")
    }
}

impl<T> fmt::Display for QueueClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue is closed")
    }
}

impl<T> std::error::Error for QueueClosed<T> {}

struct Inner<T> {
    items: VecDeque<(T, usize)>,
    current_bytes: usize,
    closed: bool,
}

/// FIFO bounded by estimated memory
///
/// Safe for many producers and many consumers. Insertion order is delivery
/// order; the queue never drops items on its own.
pub struct MemoryBoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    max_bytes: usize,
    /// Signalled when an item is appended or the queue closes
    not_empty: Notify,
    /// Signalled when budget is released or the queue closes
    not_full: Notify,
}

impl<T: EstimateSize> MemoryBoundedQueue<T> {
    /// Create an empty queue with the given byte budget
    pub fn new(max_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                current_bytes: 0,
                closed: false,
            }),
            max_bytes,
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    /// Append an item, waiting until it fits in the budget
    ///
    /// # Errors
    ///
    /// Returns the item inside `QueueClosed` if the queue is closed before
    /// the item could be appended.
    pub async fn push(&self, item: T) -> Result<(), QueueClosed<T>> {
        let size = item.estimated_size();

        loop {
            // Register before checking so a pop between the check and the
            // await cannot be missed.
            let mut notified = pin!(self.not_full.notified());
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return Err(QueueClosed(item));
                }
                if inner.current_bytes + size <= self.max_bytes {
                    inner.items.push_back((item, size));
                    inner.current_bytes += size;
                    drop(inner);
                    self.not_empty.notify_one();
                    return Ok(());
                }
            }

            notified.await;
        }
    }

    /// Remove the head, waiting while the queue is empty
    ///
    /// Returns `None` once the queue is closed and fully drained.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let mut notified = pin!(self.not_empty.notified());
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock();
                if let Some(item) = Self::take_head(&mut inner) {
                    drop(inner);
                    self.not_full.notify_one();
                    return Some(item);
                }
                if inner.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Remove the head without waiting
    pub fn try_pop(&self) -> Option<T> {
        let item = Self::take_head(&mut self.inner.lock())?;
        self.not_full.notify_one();
        Some(item)
    }

    fn take_head(inner: &mut Inner<T>) -> Option<T> {
        let (item, size) = inner.items.pop_front()?;
        inner.current_bytes -= size;
        Some(item)
    }
}

impl<T> MemoryBoundedQueue<T> {
    /// Stop accepting items and wake every waiter
    ///
    /// Already-queued items remain poppable. Idempotent.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.not_empty.notify_waiters();
        self.not_full.notify_waiters();
    }

    /// Discard every queued item, returning how many were dropped
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut inner = self.inner.lock();
            let dropped = inner.items.len();
            inner.items.clear();
            inner.current_bytes = 0;
            dropped
        };
        self.not_full.notify_waiters();
        dropped
    }

    /// Check if the queue has been closed
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Check if the queue is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Number of queued items
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Estimated bytes currently charged against the budget
    #[inline]
    pub fn current_bytes(&self) -> usize {
        self.inner.lock().current_bytes
    }

    /// Byte budget
    #[inline]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}

impl<T> fmt::Debug for MemoryBoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemoryBoundedQueue")
            .field("len", &inner.items.len())
            .field("current_bytes", &inner.current_bytes)
            .field("max_bytes", &self.max_bytes)
            .field("closed", &inner.closed)
            .finish()
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
