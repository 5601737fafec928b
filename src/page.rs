//! Generation-stamped counter pages and the global page pool.
//!
//! A page shards one generation's reference count across `NUM_COUNTERS`
//! cache-line-padded counters so that acquires on different threads touch
//! different lines. Pages are allocated once, leaked to `'static`, and cycle
//! between a tracker and the process-wide pool for the rest of the process
//! lifetime; nothing holding `&'static CounterPage` can ever dangle.

use core::sync::atomic::{AtomicU64, Ordering};
use crossbeam_queue::SegQueue;
use crossbeam_utils::CachePadded;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::counter::Counter;

/// Number of counter shards per page.
pub(crate) const NUM_COUNTERS: usize = 32;

/// Metadata kept ahead of the counter array, padded onto its own cache line
/// so that header traffic never invalidates a counter's line.
pub(crate) struct PageHeader {
    /// The generation this page represents. Written by the allocator before
    /// the page is published, read-only afterwards.
    pub(crate) gen: AtomicU64,
    /// Pool generation: bumped by the one `Pending::wait` that wins the race
    /// to recycle the page, so the page enters the pool at most once per trip
    /// through increment and wait.
    pub(crate) pgen: AtomicU64,
    /// Coordinates recycling only; never taken on the acquire/release path.
    pub(crate) mu: RwLock<()>,
}

/// One generation's worth of sharded counters.
#[repr(C)]
pub(crate) struct CounterPage {
    pub(crate) header: CachePadded<PageHeader>,
    pub(crate) counters: [CachePadded<Counter>; NUM_COUNTERS],
}

impl CounterPage {
    fn new() -> Self {
        Self {
            header: CachePadded::new(PageHeader {
                gen: AtomicU64::new(0),
                pgen: AtomicU64::new(0),
                mu: RwLock::new(()),
            }),
            counters: core::array::from_fn(|_| CachePadded::new(Counter::new())),
        }
    }

    /// The generation this page was allocated for.
    #[inline]
    pub(crate) fn gen(&self) -> u64 {
        self.header.gen.load(Ordering::Relaxed)
    }

    /// The counter shard for a given hint.
    #[inline]
    pub(crate) fn counter(&self, hint: usize) -> &Counter {
        &self.counters[hint % NUM_COUNTERS]
    }
}

/// Process-wide free list of pages, shared by every tracker.
static PAGE_POOL: Lazy<SegQueue<&'static CounterPage>> = Lazy::new(SegQueue::new);

/// Takes a page out of the pool (allocating if the pool is empty) and stamps
/// it with `gen`. All other fields carry over from the page's prior life:
/// the counters are zero by the recycle protocol, and `pgen` is only ever
/// compared for equality.
pub(crate) fn acquire_page(gen: u64) -> &'static CounterPage {
    let page = PAGE_POOL
        .pop()
        .unwrap_or_else(|| &*Box::leak(Box::new(CounterPage::new())));
    page.header.gen.store(gen, Ordering::Relaxed);
    page
}

/// Returns a page to the pool. The caller must hold the only remaining
/// reference; the page must not be touched after this call.
pub(crate) fn release_page(page: &'static CounterPage) {
    PAGE_POOL.push(page);
}
