//! Biased reference count with a wait-for-zero primitive.
//!
//! A `Counter` packs "how many holders are outstanding" and "is someone
//! waiting for zero" into a single atomic word. `acquire` and `release` are a
//! single fetch-and-add each; the semaphore is only touched on the rare
//! zero transition while a waiter is parked.

use core::sync::atomic::{AtomicI32, Ordering};
use parking_lot::{Condvar, Mutex};

/// Bias subtracted by `wait` to mark a parked waiter.
///
/// At most `BIAS - 1` concurrent acquires are supported per counter;
/// exceeding that is a bug in the caller.
const BIAS: i32 = 1 << 30;

/// A single-waiter wait group over one atomic word.
///
/// Only one `wait` may be in flight at a time. The tracker guarantees this by
/// construction: counters are only waited on by [`Pending::wait`], which walks
/// them one at a time under the page's recycle protocol.
///
/// [`Pending::wait`]: crate::Pending::wait
pub(crate) struct Counter {
    count: AtomicI32,
    sema: Semaphore,
}

impl Counter {
    pub(crate) const fn new() -> Self {
        Self {
            count: AtomicI32::new(0),
            sema: Semaphore::new(),
        }
    }

    /// Increments the count. Never blocks.
    #[inline]
    pub(crate) fn acquire(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrements the count, waking a parked `wait` on the zero transition.
    /// Never blocks. Must pair 1:1 with a prior `acquire`.
    #[inline]
    pub(crate) fn release(&self) {
        // The post-decrement value is -BIAS exactly when a waiter subtracted
        // the bias and this release retired the last outstanding acquire.
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 - BIAS {
            self.sema.post();
        }
    }

    /// Reports whether the count is currently zero. The value may be stale by
    /// the time the caller looks at it; use only as a fast-path hint.
    #[inline]
    pub(crate) fn zero(&self) -> bool {
        self.count.load(Ordering::Acquire) == 0
    }

    /// Blocks until the count reaches zero, synchronizing with every release
    /// that drove it there. Returns promptly if the count is already zero.
    pub(crate) fn wait(&self) {
        // Subtracting the bias makes the word negative, which lets release
        // detect the zero transition with a single comparison. A previous
        // value of zero means there is nothing to wait for.
        if self.count.fetch_sub(BIAS, Ordering::AcqRel) != 0 {
            self.sema.wait();
        }
        self.count.fetch_add(BIAS, Ordering::AcqRel);
    }
}

/// A counting semaphore, posted at most once per `Counter::wait`.
///
/// Counting semantics matter: the post can race ahead of the waiter parking,
/// and must not be lost when it does.
struct Semaphore {
    permits: Mutex<u32>,
    available: Condvar,
}

impl Semaphore {
    const fn new() -> Self {
        Self {
            permits: Mutex::new(0),
            available: Condvar::new(),
        }
    }

    fn post(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        drop(permits);
        self.available.notify_one();
    }

    fn wait(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }
}
