//! The reader side of an export segment.
//!
//! A [`Reader`] is a handle that is either attached to a segment or not.
//! It never caches a snapshot: every [`Reader::read`] copies the payload
//! afresh and validates it on its own.
//!
//! ```text
//!   Reader::new() ──► unattached ──attach/open──► attached ──close/drop──► unattached
//! ```

use crate::error::ShmError;
use crate::key::SegmentKey;
use crate::layout::{Plain, SharedSegment, validate_len};
use crate::validator;
use meridian_mmap::MmapFile;
use std::io;
use std::time::Duration;
use tracing::debug;

/// A consistent copy of the payload and the generation it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<T> {
    pub generation: u64,
    pub value: T,
}

/// Caller-side policy for [`Reader::read_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total reads to attempt, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause between attempts. Zero spins with `spin_loop` instead of sleeping.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(16, Duration::ZERO)
    }
}

struct Attachment<T: Plain> {
    /// Owns the mmap lifetime; dropping it unmaps the segment.
    _mm: MmapFile,
    segment: *const SharedSegment<T>,
    key: SegmentKey,
}

/// Per-process read handle on a segment.
///
/// Reading never writes to the segment: it is mapped read-only.
pub struct Reader<T: Plain> {
    attachment: Option<Attachment<T>>,
}

// SAFETY: the mapping moves with the value; nothing is tied to the creating thread
unsafe impl<T: Plain> Send for Reader<T> {}

impl<T: Plain> Reader<T> {
    /// Creates an unattached handle.
    pub fn new() -> Self {
        Self { attachment: None }
    }

    /// Attaches to the segment behind `key`.
    ///
    /// # Errors
    /// - `SegmentAbsent` if nothing exists behind `key`, or the object exists
    ///   but its writer has not sized it yet
    /// - `AttachDenied` if it exists but cannot be mapped, or its size does
    ///   not match a segment of `T`
    pub fn open(key: &SegmentKey) -> Result<Self, ShmError> {
        let mut reader = Self::new();
        reader.attach(key)?;
        Ok(reader)
    }

    /// Attaches this handle to `key`, replacing any previous attachment.
    ///
    /// On error the handle is left unattached.
    pub fn attach(&mut self, key: &SegmentKey) -> Result<(), ShmError> {
        self.close();

        let mm = key.map_ro().map_err(|e| ShmError::attach(key, e))?;
        if mm.is_empty() {
            return Err(ShmError::SegmentAbsent { key: key.clone() });
        }
        validate_len::<T>(mm.len()).map_err(|e| ShmError::AttachDenied {
            key: key.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;

        let segment = mm.as_ptr() as *const SharedSegment<T>;
        debug!(key = %key, "attached");
        self.attachment = Some(Attachment {
            _mm: mm,
            segment,
            key: key.clone(),
        });
        Ok(())
    }

    /// Detaches from the segment. Closing an unattached handle does nothing.
    pub fn close(&mut self) {
        if let Some(attachment) = self.attachment.take() {
            debug!(key = %attachment.key, "detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    /// Key of the current attachment, if any.
    pub fn key(&self) -> Option<&SegmentKey> {
        self.attachment.as_ref().map(|a| &a.key)
    }

    #[inline(always)]
    fn segment(&self) -> Result<&SharedSegment<T>, ShmError> {
        match &self.attachment {
            // SAFETY: the mapping lives as long as the attachment and its
            // length was checked against `SharedSegment<T>` in `attach`
            Some(a) => Ok(unsafe { &*a.segment }),
            None => Err(ShmError::NotAttached),
        }
    }

    /// Copies the payload once and validates the copy.
    ///
    /// Never blocks and never waits for the writer.
    ///
    /// # Errors
    /// - `NotAttached` if the handle was never opened or has been closed
    /// - `Inconsistent` if a publish overlapped the copy; call again
    #[inline]
    pub fn read(&self) -> Result<Sample<T>, ShmError> {
        let (before, value, after) = self.segment()?.snapshot();
        let (generation, value) = validator::validate(before, value, after)?;
        Ok(Sample { generation, value })
    }

    /// Repeats [`Reader::read`] while it reports `Inconsistent`.
    ///
    /// Any other error is returned immediately. Running out of attempts
    /// yields `Exhausted`; a slow reader facing a fast writer may never get a
    /// clean copy, so callers decide how long to keep trying.
    pub fn read_with_retry(&self, policy: &RetryPolicy) -> Result<Sample<T>, ShmError> {
        let attempts = policy.max_attempts.max(1);
        for attempt in 1..=attempts {
            match self.read() {
                Err(ShmError::Inconsistent { .. }) if attempt < attempts => {
                    if policy.backoff.is_zero() {
                        std::hint::spin_loop();
                    } else {
                        std::thread::sleep(policy.backoff);
                    }
                }
                Err(ShmError::Inconsistent { .. }) => break,
                other => return other,
            }
        }
        Err(ShmError::Exhausted { attempts })
    }

    /// Last settled generation, without copying the payload.
    ///
    /// Lets a poller skip a full read when nothing new was published.
    #[inline]
    pub fn generation(&self) -> Result<u64, ShmError> {
        Ok(self.segment()?.settled_generation())
    }
}

impl<T: Plain> Default for Reader<T> {
    fn default() -> Self {
        Self::new()
    }
}
