//! Error types for the delay queue.
//!
//! The happy path has no recoverable errors: scheduling on a live queue
//! always succeeds, for any deadline, past or future. Every error here is a
//! lifecycle condition: the queue has been shut down, or (for the
//! non-blocking receive variants) nothing has fired yet. Misuse surfaces as
//! one of these typed errors, never as a panic or an indefinite block.

use thiserror::Error;

/// Error returned by `schedule`/`schedule_at` on a terminated queue.
///
/// The payload is handed back so the caller can reroute or drop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError<T> {
    /// The queue has been shut down; the entry was not stored.
    #[error("scheduling on a terminated delay queue")]
    Terminated(T),
}

impl<T> ScheduleError<T> {
    /// Consumes the error, returning the payload that was not scheduled.
    pub fn into_inner(self) -> T {
        match self {
            Self::Terminated(value) => value,
        }
    }
}

/// Error returned by a blocking `recv` on a terminated queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecvError {
    /// The queue has been shut down; no further values will be delivered.
    #[error("receiving on a terminated delay queue")]
    Terminated,
}

/// Error returned by `try_recv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryRecvError {
    /// No entry has fired yet; the queue is still running.
    #[error("no expired entry is ready")]
    Empty,
    /// The queue has been shut down; no further values will be delivered.
    #[error("receiving on a terminated delay queue")]
    Terminated,
}

/// Error returned by `recv_timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecvTimeoutError {
    /// The timeout elapsed before any entry fired.
    #[error("timed out waiting for an expired entry")]
    Timeout,
    /// The queue has been shut down; no further values will be delivered.
    #[error("receiving on a terminated delay queue")]
    Terminated,
}
