//! Consistency check applied to every copy a reader takes.
//!
//! A copy is accepted if and only if the generation sampled before it equals
//! the generation sampled after it. Ordering between generations is never
//! inspected, so counter wraparound is just another step.
//!
//! The one case the check cannot see is a copy window spanning exactly
//! 2^64 publish cycles, which restores numeric equality. That is not
//! reachable in practice.

use crate::error::ShmError;

/// Returns `true` when a copy bracketed by `before` and `after` is untorn.
#[inline(always)]
pub fn is_consistent(before: u64, after: u64) -> bool {
    before == after
}

/// Accepts `value` as generation `before`, or reports the torn read.
///
/// A mismatch is not a fault: it is the signal to copy again.
#[inline(always)]
pub fn validate<T>(before: u64, value: T, after: u64) -> Result<(u64, T), ShmError> {
    if is_consistent(before, after) {
        Ok((before, value))
    } else {
        Err(ShmError::Inconsistent { before, after })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_generations_accept() {
        assert!(is_consistent(0, 0));
        assert!(is_consistent(42, 42));
        assert_eq!(validate(9, "fix", 9).unwrap(), (9, "fix"));
    }

    #[test]
    fn differing_generations_reject() {
        assert!(!is_consistent(6, 7));
        // a writer caught between bookends can make `after` run ahead by any amount
        assert!(!is_consistent(6, 9));
        match validate(6, (), 7) {
            Err(ShmError::Inconsistent { before, after }) => assert_eq!((before, after), (6, 7)),
            other => panic!("expected Inconsistent, got {other:?}"),
        }
    }

    #[test]
    fn wraparound_is_only_equality() {
        assert!(!is_consistent(u64::MAX, 0));
        assert!(is_consistent(u64::MAX, u64::MAX));
    }
}
