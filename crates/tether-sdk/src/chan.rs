//! Host channel storage
//!
//! A bounded FIFO guarded by a mutex and two condition variables. A
//! capacity of zero makes an unbuffered channel: a send completes only once
//! a receiver has taken the value.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::{Condvar, Mutex};

use crate::error::{HostError, HostResult};
use crate::value::Data;

/// Outcome of a non-blocking receive
#[derive(Debug)]
pub enum TryRecv {
    /// A value was taken
    Value(Data),
    /// Nothing ready yet
    Empty,
    /// Closed and drained
    Closed,
}

/// Shared storage behind a non-nil channel value
pub struct Channel {
    /// Internal state protected by a mutex
    inner: Mutex<ChannelInner>,
    /// Senders waiting for room, or for an unbuffered handoff
    not_full: Condvar,
    /// Receivers waiting for data
    not_empty: Condvar,
}

struct ChannelInner {
    /// Buffer capacity (0 = unbuffered)
    capacity: usize,
    /// Message queue
    queue: VecDeque<Data>,
    /// Whether channel is closed
    closed: bool,
    /// Total values ever enqueued
    pushed: u64,
    /// Total values ever dequeued
    popped: u64,
    /// Receivers currently blocked in `recv`
    waiting_receivers: usize,
}

impl ChannelInner {
    /// Values the queue may hold before senders block
    fn slots(&self) -> usize {
        self.capacity.max(1)
    }
}

impl Channel {
    /// Create a channel with the given buffer capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(ChannelInner {
                capacity,
                queue: VecDeque::new(),
                closed: false,
                pushed: 0,
                popped: 0,
                waiting_receivers: 0,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Buffer capacity
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Number of buffered values
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        if inner.capacity == 0 {
            0
        } else {
            inner.queue.len()
        }
    }

    /// Whether no values are buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the channel has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Close the channel and wake every waiter
    pub fn close(&self) -> HostResult<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(HostError::AlreadyClosed);
        }
        inner.closed = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
        Ok(())
    }

    /// Send a value, blocking until it is buffered (or, when unbuffered,
    /// received)
    pub fn send(&self, value: Data) -> HostResult<()> {
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return Err(HostError::ChannelClosed);
            }
            if inner.queue.len() < inner.slots() {
                break;
            }
            self.not_full.wait(&mut inner);
        }
        inner.queue.push_back(value);
        inner.pushed += 1;
        let ticket = inner.pushed;
        self.not_empty.notify_one();

        if inner.capacity == 0 {
            // Wait for the handoff
            while inner.popped < ticket {
                if inner.closed {
                    // Withdraw the value nobody took
                    let pending = (ticket - inner.popped - 1) as usize;
                    inner.queue.remove(pending);
                    inner.popped += 1;
                    return Err(HostError::ChannelClosed);
                }
                self.not_full.wait(&mut inner);
            }
        }
        Ok(())
    }

    /// Receive a value, blocking until one is available.
    ///
    /// Returns `None` once the channel is closed and drained.
    pub fn recv(&self) -> Option<Data> {
        let mut inner = self.inner.lock();
        inner.waiting_receivers += 1;
        let result = loop {
            if let Some(value) = inner.queue.pop_front() {
                inner.popped += 1;
                break Some(value);
            }
            if inner.closed {
                break None;
            }
            self.not_empty.wait(&mut inner);
        };
        inner.waiting_receivers -= 1;
        self.not_full.notify_all();
        result
    }

    /// Send without blocking. Returns whether the value was accepted.
    ///
    /// An unbuffered channel accepts only when a receiver is waiting.
    pub fn try_send(&self, value: Data) -> HostResult<bool> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(HostError::ChannelClosed);
        }
        let ready = if inner.capacity == 0 {
            inner.waiting_receivers > inner.queue.len()
        } else {
            inner.queue.len() < inner.capacity
        };
        if !ready {
            return Ok(false);
        }
        inner.queue.push_back(value);
        inner.pushed += 1;
        self.not_empty.notify_one();
        Ok(true)
    }

    /// Receive without blocking
    pub fn try_recv(&self) -> TryRecv {
        let mut inner = self.inner.lock();
        match inner.queue.pop_front() {
            Some(value) => {
                inner.popped += 1;
                self.not_full.notify_all();
                TryRecv::Value(value)
            }
            None if inner.closed => TryRecv::Closed,
            None => TryRecv::Empty,
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Channel")
            .field("capacity", &inner.capacity)
            .field("length", &inner.queue.len())
            .field("closed", &inner.closed)
            .finish()
    }
}
