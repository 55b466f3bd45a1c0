//! Delayq: a delayed-event dispatch queue.
//!
//! # Overview
//!
//! Callers schedule opaque payloads to become available after an arbitrary
//! per-entry delay; a single dispatcher thread owned by each queue delivers
//! them, one at a time, in strict order of expiration time, regardless of
//! the order or timing in which they were scheduled. This serves any caller
//! juggling many independent, dynamically-changing timers (connection
//! timeouts, retry backoffs) without paying for one OS timer per event.
//!
//! # Core Guarantees
//!
//! - **Deadline order**: payloads with distinct deadlines come out in
//!   strictly ascending expiration order, independent of insertion order
//! - **Preemption**: an entry scheduled with an earlier deadline than the
//!   one currently being waited on is delivered first
//! - **Immediate due**: zero and past deadlines are delivered without
//!   arming a timer at all
//! - **Bounded runahead**: the dispatcher never gets more than one fired
//!   entry ahead of the slowest receiver
//! - **Safe termination**: shutdown is an exactly-once transition observed
//!   at every suspension point; it never blocks indefinitely, and
//!   undelivered entries are discarded rather than flushed
//!
//! # Module Structure
//!
//! - [`queue`]: the [`DelayQueue`] facade and its dispatcher thread
//! - `heap`: deadline-ordered priority store (internal)
//! - `handoff`: capacity-one blocking handoff (internal)
//! - [`error`]: typed errors for every lifecycle surface
//! - [`test_utils`]: tracing-based logging and assertion helpers for tests
//!
//! # Example
//!
//! ```
//! use delayq::DelayQueue;
//! use std::time::Duration;
//!
//! let queue = DelayQueue::new();
//!
//! // Scheduled out of order; received in deadline order.
//! queue.schedule(Duration::from_millis(60), "second").unwrap();
//! queue.schedule(Duration::from_millis(20), "first").unwrap();
//!
//! assert_eq!(queue.recv().unwrap(), "first");
//! assert_eq!(queue.recv().unwrap(), "second");
//!
//! assert!(queue.shutdown());
//! assert!(queue.recv().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
mod handoff;
mod heap;
pub mod queue;
pub mod test_utils;

pub use error::{RecvError, RecvTimeoutError, ScheduleError, TryRecvError};
pub use queue::{DelayQueue, DelayQueueOptions};
