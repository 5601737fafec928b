//! Wait handles for generations that have been incremented past.

use core::fmt;
use core::sync::atomic::Ordering;

use crate::page::{self, CounterPage};

/// A generation the tracker has moved past, waiting to be drained.
///
/// Produced by [`Tracker::increment`]. When [`wait`] returns, no [`Token`]
/// with the same generation remains live, and the generation's page has been
/// recycled.
///
/// `Pending` is a plain value: copies are equivalent and any number of them
/// may call [`wait`]; the page is recycled exactly once regardless. Dropping
/// every copy without waiting permanently retires the page instead of
/// recycling it.
///
/// [`Tracker::increment`]: crate::Tracker::increment
/// [`Token`]: crate::Token
/// [`wait`]: Pending::wait
#[derive(Clone, Copy)]
pub struct Pending {
    page: &'static CounterPage,
    gen: u64,
    pgen: u64,
}

impl Pending {
    pub(crate) fn new(page: &'static CounterPage, gen: u64, pgen: u64) -> Self {
        Self { page, gen, pgen }
    }

    /// The generation this handle drains.
    #[inline]
    pub fn gen(&self) -> u64 {
        self.gen
    }

    /// Blocks until every token with this generation has been released, then
    /// returns the generation.
    pub fn wait(&self) -> u64 {
        // The read lock announces that this call is still inspecting the
        // page, so the eventual recycler's write lock cannot complete under
        // us. Taken before the pgen check: checking first would only help
        // repeated waits, not the common single-wait case.
        let read = self.page.header.mu.read();

        // A pgen mismatch means an equivalent handle already drained this
        // page; it may even be back in the pool under a newer generation, so
        // we must not look at its counters.
        if self.page.header.pgen.load(Ordering::Acquire) != self.pgen {
            drop(read);
            return self.gen;
        }

        for ctr in self.page.counters.iter() {
            if !ctr.zero() {
                ctr.wait();
            }
        }
        drop(read);

        // Race to be the one caller that recycles. The write lock cycle
        // flushes out every reader that got past the pgen check concurrently
        // with ours; once we hold it, no further reads of the page can start
        // because any later wait fails the pgen check.
        if self
            .page
            .header
            .pgen
            .compare_exchange(self.pgen, self.pgen + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            drop(self.page.header.mu.write());
            page::release_page(self.page);
        }

        self.gen
    }

    #[cfg(test)]
    pub(crate) fn page_addr(&self) -> usize {
        self.page as *const CounterPage as usize
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending").field("gen", &self.gen).finish()
    }
}
