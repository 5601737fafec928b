//! Quiesce: scalable generation tracking for wait-for-drain resource handoff.
//!
//! A [`Tracker`] hands out [`Token`]s stamped with a monotonically increasing
//! generation number. [`Tracker::increment`] bumps the generation and returns
//! a [`Pending`] whose [`wait`](Pending::wait) blocks until every token of the
//! old generation has been released. Acquire and release are wait-free and
//! shard across cache-line-padded counters, so throughput holds up under many
//! cores; increments never stall future acquires.
//!
//! # Example
//!
//! The archetypal use is double-buffered telemetry: writers add to whichever
//! buffer the current generation selects, and a periodic resetter bumps the
//! generation, waits for in-flight writers of the old one to finish, then
//! reads and clears the now-quiesced buffer.
//!
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use quiesce::Tracker;
//!
//! static TRACKER: Tracker = Tracker::new();
//! static BUCKETS: [AtomicU64; 2] = [AtomicU64::new(0), AtomicU64::new(0)];
//!
//! fn record(n: u64) {
//!     let token = TRACKER.acquire();
//!     BUCKETS[(token.gen() % 2) as usize].fetch_add(n, Ordering::Relaxed);
//!     token.release();
//! }
//!
//! fn drain() -> u64 {
//!     let gen = TRACKER.increment().wait();
//!     BUCKETS[(gen % 2) as usize].swap(0, Ordering::Relaxed)
//! }
//!
//! record(3);
//! record(4);
//! assert_eq!(drain(), 7);
//! record(5);
//! assert_eq!(drain(), 5);
//! ```
//!
//! When `drain` returns from `wait`, every `record` that obtained a token for
//! the drained generation has already finished its `fetch_add`, so the swap
//! reads a consistent, quiescent buffer.
//!
//! # Guarantees
//!
//! - A token's generation is monotonic along any single thread's program
//!   order.
//! - Generations returned by successive increments form a strictly
//!   increasing sequence; the first page is generation 0 and the first
//!   increment's [`Pending`] drains it.
//! - A successful [`Pending::wait`] for generation `g` happens-after every
//!   release of a token with generation `g`.
//!
//! There is no cancellation: `wait` blocks indefinitely. Contract misuse
//! (leaking a token with `mem::forget`, more than 2^30 outstanding acquires
//! on one shard) wedges or corrupts the tracker and is a bug in the caller.

#![warn(missing_docs)]

mod counter;
mod page;
mod pending;
mod token;
mod tracker;

pub use pending::Pending;
pub use token::Token;
pub use tracker::Tracker;
