//! The bookend protocol: how the writer overwrites a segment and how a
//! reader brackets its copy so torn copies can be recognised.
//!
//! # Protocol
//!
//! **Writer** (one publish cycle):
//! 1. Read `bookend_a`, compute `next = bookend_a + 1` (wrapping)
//! 2. Store `next` into `bookend_a` (segment is now in transition)
//! 3. Overwrite the payload
//! 4. Store `next` into `bookend_b` (segment is settled at `next`)
//!
//! **Reader** (one copy):
//! 1. `before` = `bookend_b`, the bookend the writer stores last
//! 2. Copy the payload
//! 3. `after` = `bookend_a`, the bookend the writer stores first
//! 4. Hand `(before, after)` to the validator
//!
//! Reading the bookends in the opposite order to the writer is what makes
//! the check complete. `before == after == g` means cycle `g` had finished
//! before the copy began and cycle `g + 1` had not begun when it ended, so
//! the payload was untouched for the whole copy. Any cycle that starts,
//! finishes, or runs entirely inside the copy window leaves the two samples
//! different.
//!
//! # Memory Ordering
//!
//! The writer issues a `Release` fence between storing `bookend_a` and
//! touching the payload, and stores `bookend_b` with `Release`. The reader
//! loads `bookend_b` with `Acquire` and issues an `Acquire` fence between the
//! copy and loading `bookend_a`. The payload itself is copied with volatile
//! accesses: the copy is neither atomic nor ordered at byte level and may
//! run forwards or backwards; only the bookends decide whether it is kept.

use crate::layout::{Plain, SharedSegment};
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering, fence};

/// Leaves a segment of unknown payload type permanently in transition.
///
/// `bookend_a` sits at offset 0 whatever the payload, so stepping it past
/// the value `bookend_b` holds makes every later copy by a reader still
/// attached to this object fail validation. Mappings shorter than one
/// bookend are left alone.
///
/// # Safety
/// `base` must point to a live, writable, 8-byte aligned shared mapping of
/// `len` bytes whose first word is not written by anyone else.
pub(crate) unsafe fn retire(base: *mut u8, len: usize) {
    if len < size_of::<AtomicU64>() {
        return;
    }
    // SAFETY: in bounds and aligned per the caller's contract
    let bookend_a = unsafe { &*base.cast::<AtomicU64>() };
    bookend_a.fetch_add(1, Ordering::Release);
}

impl<T: Plain> SharedSegment<T> {
    /// Resets the segment to generation 0 with a zeroed payload.
    ///
    /// Only valid while no reader can observe the segment, i.e. right after
    /// the writer created it.
    pub(crate) fn init(&self) {
        self.bookend_a.store(0, Ordering::Relaxed);
        // SAFETY: payload is in bounds of the mapping and all-zero is a
        // valid `T` for every `Plain` type
        unsafe { ptr::write_bytes(self.payload.get(), 0, 1) };
        self.bookend_b.store(0, Ordering::Release);
    }

    /// Writer steps 1 and 2: open generation `next` and return it.
    #[inline(always)]
    pub(crate) fn begin_cycle(&self) -> u64 {
        let next = self.bookend_a.load(Ordering::Relaxed).wrapping_add(1);
        self.bookend_a.store(next, Ordering::Relaxed);
        // payload stores must not become visible before bookend_a moves
        fence(Ordering::Release);
        next
    }

    /// Writer step 3: overwrite the payload.
    #[inline(always)]
    pub(crate) fn store_payload(&self, value: T) {
        // SAFETY: the caller is the single writer; readers only ever perform
        // volatile reads of this location and validate them afterwards
        unsafe { ptr::write_volatile(self.payload.get().cast::<T>(), value) };
    }

    /// Writer step 4: settle generation `next`.
    #[inline(always)]
    pub(crate) fn seal_cycle(&self, next: u64) {
        self.bookend_b.store(next, Ordering::Release);
    }

    /// One complete publish cycle. Returns the generation it settled.
    #[inline(always)]
    pub(crate) fn publish(&self, value: T) -> u64 {
        let next = self.begin_cycle();
        self.store_payload(value);
        self.seal_cycle(next);
        next
    }

    /// Reader step 1.
    #[inline(always)]
    pub(crate) fn sample_before(&self) -> u64 {
        self.bookend_b.load(Ordering::Acquire)
    }

    /// Reader step 2: opaque, possibly torn copy of the payload.
    #[inline(always)]
    pub(crate) fn copy_payload(&self) -> T {
        // SAFETY: in bounds of the mapping; `Plain` makes any byte mix a
        // valid `T`, and the bookend check decides whether it is kept
        unsafe { ptr::read_volatile(self.payload.get().cast::<T>()) }
    }

    /// Reader step 3.
    #[inline(always)]
    pub(crate) fn sample_after(&self) -> u64 {
        // payload loads must complete before bookend_a is sampled
        fence(Ordering::Acquire);
        self.bookend_a.load(Ordering::Relaxed)
    }

    /// Reader steps 1 to 3 in order.
    #[inline(always)]
    pub(crate) fn snapshot(&self) -> (u64, T, u64) {
        let before = self.sample_before();
        let value = self.copy_payload();
        let after = self.sample_after();
        (before, value, after)
    }

    /// Last settled generation, without copying the payload.
    #[inline(always)]
    pub(crate) fn settled_generation(&self) -> u64 {
        self.bookend_b.load(Ordering::Acquire)
    }

    /// True while a publish cycle is between steps 2 and 4.
    #[inline(always)]
    pub(crate) fn in_transition(&self) -> bool {
        self.bookend_a.load(Ordering::Acquire) != self.bookend_b.load(Ordering::Acquire)
    }
}
