//! The tracker: current-page pointer, token acquisition, generation bumps.

use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use parking_lot::Mutex;

use crate::page::{self, CounterPage};
use crate::pending::Pending;
use crate::token::Token;

/// Hands out [`Token`]s stamped with a monotonically increasing generation.
///
/// `Tracker` optimizes for the case where generation bumps are rare:
/// [`acquire`] and the token's release touch one shard-local counter and the
/// shared page pointer, and never block. [`increment`] bumps the generation
/// without stalling future acquires and returns a [`Pending`] whose
/// [`wait`] drains every token of the old generation.
///
/// The constructor is `const`, so a tracker can live in a `static`.
///
/// [`acquire`]: Tracker::acquire
/// [`increment`]: Tracker::increment
/// [`wait`]: Pending::wait
pub struct Tracker {
    /// The page for the current generation. Null until the first use;
    /// acquirers CAS it from null only, increment stores it under `lock`.
    page: AtomicPtr<CounterPage>,
    /// Serializes increment. Never taken by acquire.
    lock: Mutex<()>,
}

impl Tracker {
    /// Creates an empty tracker at generation 0.
    pub const fn new() -> Self {
        Self {
            page: AtomicPtr::new(ptr::null_mut()),
            lock: Mutex::new(()),
        }
    }

    /// Returns a token for the current generation.
    ///
    /// The token pins its generation: the matching [`Pending::wait`] cannot
    /// return until the token is released. Never blocks; safe to call from
    /// any number of threads.
    pub fn acquire(&self) -> Token {
        let hint = shard_hint();
        let mut page = self.current_page();

        loop {
            let ctr = page.counter(hint);
            ctr.acquire();

            // Double check that the page is still current. An increment that
            // sampled the old page before our acquire either sees our count
            // when it drains, or already swapped the pointer, in which case
            // we must back out and pin the new page instead.
            let next = self.page.load(Ordering::Acquire);
            if ptr::eq(next, page) {
                return Token::new(ctr, page.gen(), hint);
            }

            ctr.release();
            // SAFETY: the pointer never returns to null once installed, and
            // pages are 'static.
            page = unsafe { &*next };
        }
    }

    /// Bumps the generation and returns a [`Pending`] for the generation
    /// being left behind.
    ///
    /// Future [`acquire`] calls observe the new generation immediately;
    /// tokens already stamped with the old one are drained by
    /// [`Pending::wait`]. Safe to call concurrently; calls are serialized
    /// internally.
    ///
    /// [`acquire`]: Tracker::acquire
    pub fn increment(&self) -> Pending {
        let guard = self.lock.lock();

        // Acquire may be racing the lazy first allocation, so this must go
        // through the same CAS-from-null path even under the lock.
        let page = self.current_page();

        // A plain store suffices: acquirers only CAS from null and the lock
        // excludes other increments.
        let next = page::acquire_page(page.gen() + 1);
        self.page
            .store(next as *const CounterPage as *mut _, Ordering::Release);
        drop(guard);

        // The old page's header is stable now: it can only be written again
        // once it has gone through the pool, which wait gates on pgen.
        Pending::new(page, page.gen(), page.header.pgen.load(Ordering::Acquire))
    }

    /// Loads the current page, lazily installing a generation-0 page on
    /// first use.
    fn current_page(&self) -> &'static CounterPage {
        let current = self.page.load(Ordering::Acquire);
        if !current.is_null() {
            // SAFETY: non-null values are always leaked 'static pages.
            return unsafe { &*current };
        }
        self.install_first_page()
    }

    #[cold]
    fn install_first_page(&self) -> &'static CounterPage {
        let page = page::acquire_page(0);
        match self.page.compare_exchange(
            ptr::null_mut(),
            page as *const CounterPage as *mut _,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => page,
            Err(current) => {
                // Lost the install race; hand the loser straight back.
                page::release_page(page);
                // SAFETY: the winner installed a leaked 'static page.
                unsafe { &*current }
            }
        }
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Global source of per-thread shard hints.
static NEXT_HINT: AtomicUsize = AtomicUsize::new(0);

std::thread_local! {
    /// Stable-ish per-thread shard index, assigned round-robin at first use.
    /// Correctness never depends on it; it only spreads counter traffic.
    static SHARD_HINT: usize = NEXT_HINT.fetch_add(1, Ordering::Relaxed);
}

#[inline]
fn shard_hint() -> usize {
    SHARD_HINT.with(|hint| *hint)
}
