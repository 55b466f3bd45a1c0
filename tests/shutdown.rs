//! Termination safety: bounded shutdown from every dispatcher state,
//! discard semantics, and well-defined post-termination behavior.

use delayq::test_utils::init_test_logging;
use delayq::{DelayQueue, RecvError, ScheduleError, TryRecvError};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn shutdown_with_no_entries_returns_promptly() {
    init_test_logging();
    delayq::test_phase!("shutdown_with_no_entries_returns_promptly");

    let queue: DelayQueue<u8> = DelayQueue::new();
    let started = Instant::now();
    let won = queue.shutdown();
    let elapsed = started.elapsed();

    delayq::assert_with_log!(won, "first shutdown wins", true, won);
    delayq::assert_with_log!(
        elapsed < Duration::from_secs(1),
        "nothing to wait for",
        "< 1s",
        elapsed
    );
    delayq::test_complete!("shutdown_with_no_entries_returns_promptly");
}

#[test]
fn shutdown_discards_unreceived_entries() {
    init_test_logging();
    delayq::test_phase!("shutdown_discards_unreceived_entries");

    let queue = DelayQueue::new();
    for idx in 0..50u32 {
        queue.schedule(Duration::ZERO, idx).unwrap();
    }

    let received: HashSet<u32> = (0..25).map(|_| queue.recv().unwrap()).collect();
    delayq::assert_with_log!(
        received.len() == 25,
        "first half delivered exactly once each",
        25,
        received.len()
    );

    let started = Instant::now();
    let won = queue.shutdown();
    let elapsed = started.elapsed();
    delayq::assert_with_log!(won, "shutdown wins", true, won);
    delayq::assert_with_log!(
        elapsed < Duration::from_secs(2),
        "shutdown does not block on the undelivered half",
        "< 2s",
        elapsed
    );

    // The remaining entries are gone, not flushed.
    let after = queue.try_recv();
    delayq::assert_with_log!(
        after == Err(TryRecvError::Terminated),
        "no delivery after termination",
        Err::<u32, _>(TryRecvError::Terminated),
        after
    );
    delayq::test_complete!("shutdown_discards_unreceived_entries");
}

#[test]
fn blocked_recv_observes_termination() {
    init_test_logging();
    delayq::test_phase!("blocked_recv_observes_termination");

    let queue: Arc<DelayQueue<u8>> = Arc::new(DelayQueue::new());
    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.recv())
    };

    thread::sleep(Duration::from_millis(100));
    queue.shutdown();

    let got = consumer.join().expect("consumer finished");
    delayq::assert_with_log!(
        got == Err(RecvError::Terminated),
        "blocked receive wakes with the termination error",
        Err::<u8, _>(RecvError::Terminated),
        got
    );
    delayq::test_complete!("blocked_recv_observes_termination");
}

#[test]
fn pending_future_entries_never_block_shutdown() {
    init_test_logging();
    delayq::test_phase!("pending_future_entries_never_block_shutdown");

    let queue = DelayQueue::new();
    queue.schedule(Duration::from_secs(60), "never").unwrap();
    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    let won = queue.shutdown();
    let elapsed = started.elapsed();

    delayq::assert_with_log!(won, "shutdown wins", true, won);
    delayq::assert_with_log!(
        elapsed < Duration::from_secs(5),
        "the outstanding deadline wait is abandoned",
        "< 5s",
        elapsed
    );
    delayq::test_complete!("pending_future_entries_never_block_shutdown");
}

#[test]
fn schedule_after_shutdown_is_a_typed_refusal() {
    init_test_logging();
    delayq::test_phase!("schedule_after_shutdown_is_a_typed_refusal");

    let queue = DelayQueue::new();
    queue.shutdown();

    let result = queue.schedule(Duration::ZERO, 41);
    delayq::assert_with_log!(
        result == Err(ScheduleError::Terminated(41)),
        "payload comes back in the error",
        Err::<(), _>(ScheduleError::Terminated(41)),
        result
    );
    delayq::test_complete!("schedule_after_shutdown_is_a_typed_refusal");
}

#[test]
fn racing_shutdowns_have_exactly_one_winner() {
    init_test_logging();
    delayq::test_phase!("racing_shutdowns_have_exactly_one_winner");

    let queue: Arc<DelayQueue<u8>> = Arc::new(DelayQueue::new());
    let contenders: Vec<_> = (0..4)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.shutdown())
        })
        .collect();

    let wins = contenders
        .into_iter()
        .map(|contender| contender.join().expect("contender finished"))
        .filter(|won| *won)
        .count();
    delayq::assert_with_log!(wins == 1, "exactly one winning call", 1, wins);
    delayq::assert_with_log!(
        queue.is_shutdown(),
        "queue latched terminated",
        true,
        queue.is_shutdown()
    );
    delayq::test_complete!("racing_shutdowns_have_exactly_one_winner");
}
