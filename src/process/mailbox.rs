//! Per-process inbound queue.
//!
//! A mailbox is an unbounded FIFO of [`Message`]s. Posting never blocks;
//! receiving blocks the owning thread until a message is available.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::Message;
use crate::types::ProcessId;

struct MailboxInner {
    owner: ProcessId,
    /// Pending messages in arrival order.
    queue: Mutex<VecDeque<Message>>,
    /// Signalled on every post.
    available: Condvar,
}

/// Handle to one process's inbound queue.
///
/// Cloning the handle shares the queue. Channels keep a clone inside every
/// offer so they can reply to its origin directly.
#[derive(Clone)]
pub struct Mailbox {
    inner: Arc<MailboxInner>,
}

impl Mailbox {
    /// Creates an empty mailbox owned by `owner`.
    #[must_use]
    pub(crate) fn new(owner: ProcessId) -> Self {
        Self {
            inner: Arc::new(MailboxInner {
                owner,
                queue: Mutex::new(VecDeque::new()),
                available: Condvar::new(),
            }),
        }
    }

    /// Returns the process that drains this mailbox.
    #[must_use]
    pub fn owner(&self) -> ProcessId {
        self.inner.owner
    }

    /// Enqueues a message. Never blocks beyond the queue's short critical
    /// section.
    pub fn post(&self, msg: Message) {
        tracing::trace!(to = %self.inner.owner, message = %msg, "post");
        self.inner.queue.lock().push_back(msg);
        self.inner.available.notify_one();
    }

    /// Dequeues the oldest message, blocking until one arrives.
    pub fn recv(&self) -> Message {
        let mut queue = self.inner.queue.lock();
        loop {
            if let Some(msg) = queue.pop_front() {
                drop(queue);
                tracing::trace!(process = %self.inner.owner, message = %msg, "received");
                return msg;
            }
            self.inner.available.wait(&mut queue);
        }
    }

    /// Dequeues the oldest message, waiting at most `timeout`.
    ///
    /// Returns `None` if nothing arrived in time.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Message> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.inner.queue.lock();
        loop {
            if let Some(msg) = queue.pop_front() {
                drop(queue);
                tracing::trace!(process = %self.inner.owner, message = %msg, "received");
                return Some(msg);
            }
            if self
                .inner
                .available
                .wait_until(&mut queue, deadline)
                .timed_out()
            {
                return queue.pop_front();
            }
        }
    }

    /// Dequeues the oldest message without blocking.
    pub fn try_recv(&self) -> Option<Message> {
        self.inner.queue.lock().pop_front()
    }

    /// Returns the number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Returns true if no message is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.queue.lock().is_empty()
    }

    /// Returns true if both handles share one queue.
    #[must_use]
    pub fn same_mailbox(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("owner", &self.inner.owner)
            .field("pending", &self.len())
            .finish()
    }
}
