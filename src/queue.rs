//! The delay queue: a priority store, one dispatcher thread, and the
//! caller-facing facade.
//!
//! # Design
//!
//! A [`DelayQueue`] owns a mutex-guarded `DeadlineHeap` plus two flags: a
//! coalesced wakeup flag and a shutdown flag. A single condition variable
//! multiplexes everything the dispatcher can be waiting for, so one timed
//! wait races the nearest deadline against "something changed" and "shut
//! down" symmetrically; whichever resolves first decides the transition.
//!
//! The dispatcher cycles through four states:
//!
//! - **Idle**: the store is empty; wait on the signal.
//! - **Waiting**: holding the extracted earliest entry; wait until its
//!   deadline, a wakeup, or shutdown. A wakeup only disturbs the wait when
//!   the store's new minimum is strictly earlier than the held entry, in
//!   which case the entry goes back into the store and the loop re-extracts.
//!   Anything else is a no-op continuation of the same wait.
//! - **Delivering**: the store lock is released and the fired entry crosses
//!   the capacity-one `Handoff`; only shutdown can interrupt this, and an
//!   even earlier entry arriving now waits its turn.
//! - **Terminated**: the loop exits; held and stored entries are dropped.
//!
//! Scheduling inserts under the lock and sets the wakeup flag only when the
//! new entry became the overall minimum and no wakeup is already pending:
//! the dispatcher needs to notice that something changed, not how many
//! times. Shutdown is an exactly-once atomic transition consulted by every
//! operation; it aborts whatever wait or handoff is outstanding, discards
//! undelivered entries, and joins the dispatcher, so it completes in bounded
//! time from any state.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{RecvError, RecvTimeoutError, ScheduleError, TryRecvError};
use crate::handoff::Handoff;
use crate::heap::DeadlineHeap;

/// Configuration for a [`DelayQueue`].
#[derive(Debug, Clone)]
pub struct DelayQueueOptions {
    /// Name given to the dispatcher thread.
    pub thread_name: String,
}

impl Default for DelayQueueOptions {
    fn default() -> Self {
        Self {
            thread_name: "delayq-dispatcher".to_string(),
        }
    }
}

/// State shared between the facade and the dispatcher thread.
struct Shared<T> {
    /// The store plus the flags the dispatcher's waits consult. Held only
    /// for structural operations, never across a handoff; condvar waits
    /// release it while blocked.
    state: Mutex<DispatchState<T>>,
    /// Multiplexes deadline, wakeup, and shutdown waits.
    signal: Condvar,
    /// Where fired entries cross to receivers.
    output: Handoff<T>,
    /// Lifecycle latch: set exactly once, by the winning `shutdown` call.
    terminated: AtomicBool,
}

struct DispatchState<T> {
    heap: DeadlineHeap<T>,
    /// Coalesced wakeup: at most one pending notification no matter how
    /// many qualifying inserts happened since the dispatcher last looked.
    wakeup: bool,
    shutdown: bool,
}

impl<T> Shared<T> {
    fn lock_state(&self) -> MutexGuard<'_, DispatchState<T>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn wait_signal<'a>(
        &self,
        guard: MutexGuard<'a, DispatchState<T>>,
    ) -> MutexGuard<'a, DispatchState<T>> {
        match self.signal.wait(guard) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn wait_signal_timeout<'a>(
        &self,
        guard: MutexGuard<'a, DispatchState<T>>,
        timeout: Duration,
    ) -> MutexGuard<'a, DispatchState<T>> {
        match self.signal.wait_timeout(guard, timeout) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }
}

/// A delayed-event dispatch queue.
///
/// Callers [`schedule`](Self::schedule) payloads with per-entry delays; a
/// dispatcher thread owned by the queue delivers them through
/// [`recv`](Self::recv), one at a time, in expiration order, no matter the
/// order or timing of the schedule calls. Construction starts the
/// dispatcher immediately; [`shutdown`](Self::shutdown) (or drop) stops it
/// and the queue is not restartable afterwards.
///
/// All methods take `&self`; share the queue across threads with an `Arc`.
/// Each fired payload is delivered to exactly one receiver.
///
/// # Example
///
/// ```
/// use delayq::DelayQueue;
/// use std::time::Duration;
///
/// let queue = DelayQueue::new();
/// queue.schedule(Duration::from_millis(50), "later").unwrap();
/// queue.schedule(Duration::ZERO, "now").unwrap();
///
/// assert_eq!(queue.recv().unwrap(), "now");
/// assert_eq!(queue.recv().unwrap(), "later");
/// assert!(queue.shutdown());
/// ```
pub struct DelayQueue<T> {
    shared: Arc<Shared<T>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> DelayQueue<T> {
    /// Creates a queue and starts its dispatcher thread.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(DelayQueueOptions::default())
    }

    /// Creates a queue with custom options.
    #[must_use]
    pub fn with_options(options: DelayQueueOptions) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(DispatchState {
                heap: DeadlineHeap::new(),
                wakeup: false,
                shutdown: false,
            }),
            signal: Condvar::new(),
            output: Handoff::new(),
            terminated: AtomicBool::new(false),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(options.thread_name)
                .spawn(move || dispatch_loop(&shared))
                .expect("failed to spawn dispatcher thread")
        };

        Self {
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }
}

impl<T: Send + 'static> Default for DelayQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DelayQueue<T> {
    /// Schedules `value` for delivery after `delay`.
    ///
    /// Fire and forget: there is nothing to wait on and no handle to keep.
    /// A zero delay yields an already-due entry, delivered as soon as the
    /// dispatcher reaches it. For deadlines in the past (the signed-delay
    /// case), use [`schedule_at`](Self::schedule_at).
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::Terminated`], handing `value` back, if the
    /// queue has been shut down.
    pub fn schedule(&self, delay: Duration, value: T) -> Result<(), ScheduleError<T>> {
        self.schedule_at(Instant::now() + delay, value)
    }

    /// Schedules `value` for delivery at an absolute deadline.
    ///
    /// A deadline at or before now yields an already-due entry; no timer is
    /// armed for it.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::Terminated`], handing `value` back, if the
    /// queue has been shut down.
    pub fn schedule_at(&self, deadline: Instant, value: T) -> Result<(), ScheduleError<T>> {
        if self.shared.terminated.load(Ordering::Acquire) {
            return Err(ScheduleError::Terminated(value));
        }
        let mut state = self.shared.lock_state();
        if state.shutdown {
            drop(state);
            return Err(ScheduleError::Terminated(value));
        }

        // The dispatcher only needs a poke when this entry became the
        // overall minimum; a wakeup already pending covers this one too.
        let preempts = state
            .heap
            .peek_earliest()
            .map_or(true, |next| deadline < next.expire_at);
        state.heap.insert(deadline, value);
        if preempts && !state.wakeup {
            state.wakeup = true;
            self.shared.signal.notify_one();
        }
        Ok(())
    }

    /// Blocks until the next entry fires and returns its payload.
    ///
    /// Payloads come out in expiration order, one per call; entries with
    /// equal deadlines come out in an unspecified relative order.
    ///
    /// # Errors
    ///
    /// Returns [`RecvError::Terminated`] once the queue has been shut down;
    /// blocked calls wake with that error rather than waiting forever.
    pub fn recv(&self) -> Result<T, RecvError> {
        self.shared.output.recv()
    }

    /// Returns the next fired payload if one is ready, without blocking.
    ///
    /// # Errors
    ///
    /// [`TryRecvError::Empty`] when nothing has fired yet,
    /// [`TryRecvError::Terminated`] once the queue has been shut down.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.shared.output.try_recv()
    }

    /// Blocks up to `timeout` for the next entry to fire.
    ///
    /// # Errors
    ///
    /// [`RecvTimeoutError::Timeout`] when the timeout elapses first,
    /// [`RecvTimeoutError::Terminated`] once the queue has been shut down.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.shared.output.recv_timeout(timeout)
    }

    /// Stops the dispatcher and closes the delivery path.
    ///
    /// Exactly one call wins the Running to Terminated transition, discards
    /// every undelivered entry (stored, held, or stranded in the handoff),
    /// wakes whatever the dispatcher and any receivers are blocked on, and
    /// joins the dispatcher thread. Every wait observes shutdown, so this
    /// returns in bounded time regardless of pending entries.
    ///
    /// Returns `true` for the winning call, `false` for any later one.
    /// Racing this against `schedule` or `recv` from other threads is
    /// well-defined: late schedules fail with a typed error and blocked
    /// receives wake with [`RecvError::Terminated`].
    pub fn shutdown(&self) -> bool {
        if self
            .shared
            .terminated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let discarded = {
            let mut state = self.shared.lock_state();
            state.shutdown = true;
            let discarded = state.heap.len();
            state.heap.clear();
            self.shared.signal.notify_all();
            discarded
        };
        let stranded = self.shared.output.close();
        if discarded > 0 || stranded.is_some() {
            tracing::debug!(
                discarded,
                stranded = stranded.is_some(),
                "shutdown discarded undelivered entries"
            );
        }

        let worker = {
            let mut worker = match self.worker.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            worker.take()
        };
        if let Some(worker) = worker {
            let _ = worker.join();
        }
        true
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been invoked.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shared.terminated.load(Ordering::Acquire)
    }
}

impl<T> Drop for DelayQueue<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<T> fmt::Debug for DelayQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayQueue")
            .field("terminated", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}

/// The dispatcher: runs on the queue's background thread until shutdown.
fn dispatch_loop<T>(shared: &Shared<T>) {
    tracing::debug!("dispatcher started");
    let mut state = shared.lock_state();
    'dispatch: loop {
        if state.shutdown {
            break;
        }

        let Some(entry) = state.heap.pop_earliest() else {
            // Idle: nothing stored. Sleep until a schedule or shutdown
            // pokes the signal.
            while !state.wakeup && !state.shutdown {
                state = shared.wait_signal(state);
            }
            state.wakeup = false;
            continue 'dispatch;
        };

        // Waiting: race the held entry's deadline against wakeups and
        // shutdown.
        let due = loop {
            if state.shutdown {
                // The held entry is dropped undelivered.
                break 'dispatch;
            }
            if state.wakeup {
                state.wakeup = false;
                if state
                    .heap
                    .peek_earliest()
                    .is_some_and(|next| next.expire_at < entry.expire_at)
                {
                    // A strictly earlier entry arrived: put the held one
                    // back and re-extract. Anything not strictly earlier
                    // leaves the current wait untouched.
                    tracing::trace!("abandoning wait for an earlier deadline");
                    state.heap.insert(entry.expire_at, entry.value);
                    continue 'dispatch;
                }
                continue;
            }
            let now = Instant::now();
            if entry.expire_at <= now {
                // Already due: delivered without arming a timed wait.
                break entry;
            }
            state = shared.wait_signal_timeout(state, entry.expire_at - now);
        };

        // Delivering: hand off without holding the store lock. Only
        // shutdown interrupts a blocked handoff.
        drop(state);
        if shared.output.send(due.value).is_err() {
            tracing::debug!("dispatcher stopped during handoff");
            return;
        }
        state = shared.lock_state();
    }
    drop(state);
    tracing::debug!("dispatcher stopped");
}
