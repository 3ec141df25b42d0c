//! Shared memory layout of an export segment.
//!
//! The segment is the wire format of this crate: writer and readers agree on
//! it at build time and nothing else is exchanged. It holds exactly one
//! payload bracketed by two generation counters ("bookends").
//!
//! # Memory Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  bookend_a: AtomicU64   written FIRST by each publish    │
//! ├──────────────────────────────────────────────────────────┤
//! │  payload: T             (size_of::<T>, no indirection)   │
//! ├──────────────────────────────────────────────────────────┤
//! │  bookend_b: AtomicU64   written LAST by each publish     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # States
//!
//! - **Settled**: `bookend_a == bookend_b`; the payload is the complete
//!   value of that generation.
//! - **In transition**: `bookend_a != bookend_b`; a publish is in progress.

use std::cell::UnsafeCell;
use std::mem::{MaybeUninit, size_of};
use std::sync::atomic::AtomicU64;

/// Marker for payload types that may be copied out of shared memory.
///
/// A reader copies the payload while the writer may be overwriting it, so
/// the copied bytes can be any mix of two values. They are discarded when
/// the bookends disagree, but they still exist as a `T` for a moment.
///
/// # Safety
///
/// Implementors must be plain data: `Copy`, no pointers or references, no
/// padding-sensitive invariants, and every bit pattern (including all
/// zeroes) must be a valid value.
pub unsafe trait Plain: Copy + Send + 'static {}

macro_rules! plain_scalars {
    ($($t:ty),* $(,)?) => {
        $(unsafe impl Plain for $t {})*
    };
}

plain_scalars!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64, usize, isize);

unsafe impl<T: Plain, const N: usize> Plain for [T; N] {}

/// The segment as it sits in shared memory.
///
/// `#[repr(C)]` keeps field order and offsets identical in every process
/// that maps the segment.
#[repr(C)]
pub struct SharedSegment<T: Plain> {
    /// Generation being written. Stored before the payload is touched.
    pub(crate) bookend_a: AtomicU64,
    /// The published value. Only ever accessed through volatile copies.
    pub(crate) payload: UnsafeCell<MaybeUninit<T>>,
    /// Generation last completed. Stored after the payload is written.
    pub(crate) bookend_b: AtomicU64,
}

/// Total bytes of the mapped region for payload type `T`.
#[inline]
pub const fn bytes_for_segment<T: Plain>() -> usize {
    size_of::<SharedSegment<T>>()
}

/// Checks that a mapped region has exactly the size of a segment of `T`.
///
/// A mismatch means writer and reader disagree on the payload type, or the
/// object behind the key is not an export segment at all.
pub(crate) fn validate_len<T: Plain>(len: usize) -> Result<(), &'static str> {
    if len != bytes_for_segment::<T>() {
        return Err("segment size does not match payload type");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, offset_of};

    #[test]
    fn bookends_bracket_the_payload() {
        type Seg = SharedSegment<[u64; 4]>;
        assert_eq!(offset_of!(Seg, bookend_a), 0);
        assert_eq!(offset_of!(Seg, payload), 8);
        assert_eq!(offset_of!(Seg, bookend_b), 8 + 32);
        assert_eq!(bytes_for_segment::<[u64; 4]>(), 48);
        assert_eq!(align_of::<Seg>(), 8);
    }

    #[test]
    fn small_payloads_are_padded_to_counter_alignment() {
        assert_eq!(bytes_for_segment::<u8>(), 24);
    }

    #[test]
    fn validate_len_rejects_mismatch() {
        assert!(validate_len::<u64>(24).is_ok());
        assert!(validate_len::<u64>(0).is_err());
        assert!(validate_len::<u64>(4096).is_err());
    }
}
