//! Correctness tests for the generation tracker.
//!
//! These verify the core contract:
//! 1. Generations advance by exactly one per increment, starting at 0
//! 2. A wait for generation g returns only after every g-token is released
//! 3. Token generations are monotonic within a thread

use quiesce::Tracker;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn serial_generation_sequence() {
    let tracker = Tracker::new();

    for i in 0..10 {
        let token = tracker.acquire();
        assert_eq!(token.gen(), i);
        token.release();
        assert_eq!(tracker.increment().gen(), i);
    }

    assert_eq!(tracker.increment().gen(), 10);
    assert_eq!(tracker.increment().gen(), 11);
    tracker.acquire().release();
    assert_eq!(tracker.increment().gen(), 12);
    assert_eq!(tracker.increment().gen(), 13);
}

#[test]
fn zero_value_tracker_is_usable() {
    let tracker = Tracker::default();
    assert_eq!(tracker.acquire().gen(), 0);

    static STATIC_TRACKER: Tracker = Tracker::new();
    assert_eq!(STATIC_TRACKER.acquire().gen(), 0);
}

#[test]
fn acquire_observes_increments() {
    let tracker = Tracker::new();
    for n in 1..=25 {
        tracker.increment().wait();
        let token = tracker.acquire();
        assert_eq!(token.gen(), n);
    }
}

#[test]
fn increment_gens_are_strictly_sequential() {
    let tracker = Tracker::new();
    let mut prev = tracker.increment().gen();
    assert_eq!(prev, 0);
    for _ in 0..100 {
        let gen = tracker.increment().gen();
        assert_eq!(gen, prev + 1);
        prev = gen;
    }
}

#[test]
fn token_gen_monotonic_within_thread() {
    let tracker = Arc::new(Tracker::new());
    let done = Arc::new(AtomicBool::new(false));

    let incrementer = {
        let tracker = tracker.clone();
        let done = done.clone();
        thread::spawn(move || {
            while !done.load(Ordering::Relaxed) {
                tracker.increment().wait();
            }
        })
    };

    let mut observers = Vec::new();
    for _ in 0..4 {
        let tracker = tracker.clone();
        observers.push(thread::spawn(move || {
            let mut last = 0;
            for _ in 0..50_000 {
                let token = tracker.acquire();
                let gen = token.gen();
                token.release();
                assert!(gen >= last, "generation went backwards: {gen} < {last}");
                last = gen;
            }
        }));
    }

    for observer in observers {
        observer.join().unwrap();
    }
    done.store(true, Ordering::Relaxed);
    incrementer.join().unwrap();
}

#[test]
fn wait_blocks_until_token_released() {
    let tracker = Tracker::new();
    let released = Arc::new(AtomicBool::new(false));

    let token = tracker.acquire();
    assert_eq!(token.gen(), 0);

    let releaser = {
        let released = released.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            released.store(true, Ordering::Release);
            token.release();
        })
    };

    let gen = tracker.increment().wait();
    assert_eq!(gen, 0);
    assert!(
        released.load(Ordering::Acquire),
        "wait returned while a generation-0 token was live"
    );
    releaser.join().unwrap();
}

#[test]
fn wait_returns_promptly_when_quiescent() {
    let tracker = Tracker::new();
    tracker.acquire().release();
    let pending = tracker.increment();
    assert_eq!(pending.wait(), 0);
    // A second wait on a copy of the handle must not deadlock or recycle
    // the page twice.
    assert_eq!(pending.wait(), 0);
    assert_eq!(tracker.increment().wait(), 1);
}

#[test]
fn equivalent_pendings_share_one_recycle() {
    let tracker = Arc::new(Tracker::new());
    let pending = tracker.increment();

    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let pending = pending;
            thread::spawn(move || pending.wait())
        })
        .collect();

    for waiter in waiters {
        assert_eq!(waiter.join().unwrap(), 0);
    }

    // The tracker keeps working after the page went through the pool.
    assert_eq!(tracker.increment().wait(), 1);
    assert_eq!(tracker.acquire().gen(), 2);
}

#[test]
fn no_token_outlives_its_drained_generation() {
    let tracker = Arc::new(Tracker::new());
    let drained = Arc::new(AtomicU64::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let incrementer = {
        let tracker = tracker.clone();
        let drained = drained.clone();
        thread::spawn(move || {
            for _ in 0..2_000 {
                let pending = tracker.increment();
                // Record one past the drained generation: everything below
                // the recorded floor is fully quiesced.
                let floor = pending.wait() + 1;
                drained.fetch_max(floor, Ordering::SeqCst);
            }
        })
    };

    let mut acquirers = Vec::new();
    for _ in 0..4 {
        let tracker = tracker.clone();
        let drained = drained.clone();
        let done = done.clone();
        acquirers.push(thread::spawn(move || {
            while !done.load(Ordering::Relaxed) {
                let floor = drained.load(Ordering::SeqCst);
                let token = tracker.acquire();
                // Any generation recorded as drained before we acquired must
                // be strictly below the generation we were handed.
                assert!(
                    token.gen() >= floor,
                    "token gen {} issued below drained floor {}",
                    token.gen(),
                    floor
                );
                token.release();
            }
        }));
    }

    incrementer.join().unwrap();
    done.store(true, Ordering::Relaxed);
    for acquirer in acquirers {
        acquirer.join().unwrap();
    }
}
