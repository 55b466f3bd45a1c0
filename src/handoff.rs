//! Capacity-one blocking handoff between the dispatcher and receivers.
//!
//! [`Handoff`] approximates a zero-capacity rendezvous channel with a single
//! slot guarded by a mutex and a pair of condition variables: `send` blocks
//! until the slot is empty, `recv` blocks until it is filled. The producer
//! therefore never runs more than one fired entry ahead of the slowest
//! consumer, which is the backpressure contract the dispatcher relies on.
//!
//! Closing the handoff wakes every blocked party and discards any value
//! still sitting in the slot: a value that has not crossed to a receiver by
//! shutdown is never delivered.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::{RecvError, RecvTimeoutError, TryRecvError};

/// Blocking single-slot handoff.
pub(crate) struct Handoff<T> {
    slot: Mutex<Slot<T>>,
    /// Signaled when a value is placed in the slot or the handoff closes.
    filled: Condvar,
    /// Signaled when the slot is drained or the handoff closes.
    emptied: Condvar,
}

struct Slot<T> {
    value: Option<T>,
    closed: bool,
}

impl<T> Handoff<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: None,
                closed: false,
            }),
            filled: Condvar::new(),
            emptied: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Places a value in the slot, blocking while it is occupied.
    ///
    /// Returns the value back if the handoff closed before the slot freed
    /// up; the caller decides what discarding means.
    pub(crate) fn send(&self, value: T) -> Result<(), T> {
        let mut slot = self.lock();
        loop {
            if slot.closed {
                return Err(value);
            }
            if slot.value.is_none() {
                slot.value = Some(value);
                self.filled.notify_one();
                return Ok(());
            }
            slot = wait(&self.emptied, slot);
        }
    }

    /// Takes the next value, blocking until one is deposited or the handoff
    /// closes.
    pub(crate) fn recv(&self) -> Result<T, RecvError> {
        let mut slot = self.lock();
        loop {
            if let Some(value) = slot.value.take() {
                self.emptied.notify_one();
                return Ok(value);
            }
            if slot.closed {
                return Err(RecvError::Terminated);
            }
            slot = wait(&self.filled, slot);
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub(crate) fn try_recv(&self) -> Result<T, TryRecvError> {
        let mut slot = self.lock();
        if let Some(value) = slot.value.take() {
            self.emptied.notify_one();
            return Ok(value);
        }
        if slot.closed {
            return Err(TryRecvError::Terminated);
        }
        Err(TryRecvError::Empty)
    }

    /// Bounded-blocking variant of [`recv`](Self::recv).
    pub(crate) fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.lock();
        loop {
            if let Some(value) = slot.value.take() {
                self.emptied.notify_one();
                return Ok(value);
            }
            if slot.closed {
                return Err(RecvTimeoutError::Terminated);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(RecvTimeoutError::Timeout);
            }
            slot = wait_timeout(&self.filled, slot, deadline - now);
        }
    }

    /// Closes the handoff, waking all blocked senders and receivers.
    ///
    /// Returns the value that was stranded in the slot, if any; it will
    /// never reach a receiver.
    pub(crate) fn close(&self) -> Option<T> {
        let mut slot = self.lock();
        slot.closed = true;
        let stranded = slot.value.take();
        self.filled.notify_all();
        self.emptied.notify_all();
        stranded
    }
}

fn wait<'a, T>(condvar: &Condvar, guard: MutexGuard<'a, Slot<T>>) -> MutexGuard<'a, Slot<T>> {
    match condvar.wait(guard) {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn wait_timeout<'a, T>(
    condvar: &Condvar,
    guard: MutexGuard<'a, Slot<T>>,
    timeout: Duration,
) -> MutexGuard<'a, Slot<T>> {
    match condvar.wait_timeout(guard, timeout) {
        Ok((guard, _)) => guard,
        Err(poisoned) => poisoned.into_inner().0,
    }
}
