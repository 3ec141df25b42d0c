//! The writer side of an export segment.

use crate::bookend::retire;
use crate::error::ShmError;
use crate::key::SegmentKey;
use crate::layout::{Plain, SharedSegment, bytes_for_segment};
use meridian_mmap::MmapFileMut;
use std::io;
use tracing::{debug, info, warn};

/// Exclusive owner of a segment's write side.
///
/// Only one publisher may exist per segment across all processes. Nothing
/// enforces this: a second writer leaves the segment permanently garbled.
/// Within a process, `publish` taking `&mut self` and the type being
/// `!Sync` keep a single publisher from being shared between threads.
pub struct Publisher<T: Plain> {
    /// Owns the mmap lifetime; `segment` points into it.
    mm: MmapFileMut,
    segment: *const SharedSegment<T>,
    key: SegmentKey,
}

// SAFETY: the mapping moves with the value; nothing is tied to the creating thread
unsafe impl<T: Plain> Send for Publisher<T> {}

impl<T: Plain> Publisher<T> {
    /// Creates the segment behind `key`, or takes over an existing one.
    ///
    /// A segment that already has the right size keeps its generation
    /// counter, so readers that survive a writer restart keep seeing
    /// generations increase. An object of any other size is retired and
    /// unlinked, and a fresh segment at generation 0 takes its place.
    /// Readers still attached to the old object keep their mapping but
    /// never validate a copy from it again.
    pub fn create(key: &SegmentKey) -> Result<Self, ShmError> {
        let bytes = bytes_for_segment::<T>();
        let mut mm = Self::map_segment(key, bytes).map_err(|source| ShmError::CreateFailed {
            key: key.clone(),
            source,
        })?;
        if mm.len() != bytes {
            return Err(ShmError::CreateFailed {
                key: key.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, "mapped size mismatch"),
            });
        }

        let segment = mm.as_mut_ptr() as *const SharedSegment<T>;
        let publisher = Self {
            mm,
            segment,
            key: key.clone(),
        };

        if publisher.mm.is_fresh() {
            publisher.segment().init();
        } else if publisher.segment().in_transition() {
            // previous writer died mid-publish; readers see Inconsistent until
            // the next publish settles the segment again
            warn!(key = %key, "segment left in transition by a previous writer");
        }

        info!(
            key = %key,
            bytes,
            generation = publisher.generation(),
            fresh = publisher.mm.is_fresh(),
            "segment ready"
        );
        Ok(publisher)
    }

    fn map_segment(key: &SegmentKey, bytes: usize) -> io::Result<MmapFileMut> {
        match key.map_rw(bytes) {
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!(key = %key, error = %e, "replacing segment with a different layout");
                let mut old = key.open_rw()?;
                // SAFETY: `old` is a live page-aligned shared mapping of
                // `old.len()` bytes, and its writer is gone
                unsafe { retire(old.as_mut_ptr(), old.len()) };
                drop(old);
                key.remove()?;
                key.map_rw(bytes)
            }
            other => other,
        }
    }

    #[inline(always)]
    pub(crate) fn segment(&self) -> &SharedSegment<T> {
        // SAFETY: the mapping is alive for as long as `self` and has exactly
        // the size of a `SharedSegment<T>`; mmap returns page-aligned memory
        unsafe { &*self.segment }
    }

    /// Publishes `value` and returns the generation it settled.
    ///
    /// Never blocks and never fails, whatever the readers are doing.
    #[inline(always)]
    pub fn publish(&mut self, value: T) -> u64 {
        self.segment().publish(value)
    }

    /// Generation of the last completed publish.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.segment().settled_generation()
    }

    pub fn key(&self) -> &SegmentKey {
        &self.key
    }

    /// Removes the segment's backing object.
    ///
    /// Attached readers and a live publisher keep their mappings; new
    /// `open` calls fail with `SegmentAbsent`. Destroying a segment that
    /// does not exist is not an error.
    pub fn destroy(key: &SegmentKey) -> Result<(), ShmError> {
        match key.remove() {
            Ok(()) => {
                info!(key = %key, "segment destroyed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(key = %key, "segment already absent");
                Ok(())
            }
            Err(source) => Err(ShmError::DestroyFailed {
                key: key.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_key(tag: &str) -> SegmentKey {
        SegmentKey::file(format!("/tmp/meridian_pub_{tag}_{}", std::process::id()))
    }

    #[test]
    fn fresh_segment_starts_at_zero() {
        let key = temp_key("fresh");
        let _ = Publisher::<u64>::destroy(&key);

        let mut publisher = Publisher::<u64>::create(&key).unwrap();
        assert_eq!(publisher.key(), &key);
        assert_eq!(publisher.generation(), 0);
        assert_eq!(publisher.publish(10), 1);
        assert_eq!(publisher.generation(), 1);

        drop(publisher);
        Publisher::<u64>::destroy(&key).unwrap();
    }

    #[test]
    fn restart_continues_generation() {
        let key = temp_key("restart");
        let _ = Publisher::<u64>::destroy(&key);

        let mut first = Publisher::<u64>::create(&key).unwrap();
        for v in 0..5 {
            first.publish(v);
        }
        drop(first);

        let mut second = Publisher::<u64>::create(&key).unwrap();
        assert_eq!(second.generation(), 5);
        assert_eq!(second.publish(99), 6);

        drop(second);
        Publisher::<u64>::destroy(&key).unwrap();
    }

    #[test]
    fn different_payload_size_replaces_segment() {
        let key = temp_key("resize");
        let _ = Publisher::<u64>::destroy(&key);
        let SegmentKey::File(path) = &key else {
            unreachable!()
        };

        let mut small = Publisher::<u64>::create(&key).unwrap();
        small.publish(1);
        drop(small);

        let big = Publisher::<[u64; 8]>::create(&key).unwrap();
        assert_eq!(big.generation(), 0);
        assert!(!big.segment().in_transition());
        let len = std::fs::metadata(path).unwrap().len() as usize;
        assert_eq!(len, bytes_for_segment::<[u64; 8]>());

        drop(big);
        Publisher::<u64>::destroy(&key).unwrap();
    }

    #[test]
    fn destroy_failure_is_reported() {
        // a directory at the key cannot be removed as a segment
        let key = temp_key("dir");
        let SegmentKey::File(path) = &key else {
            unreachable!()
        };
        let _ = std::fs::remove_dir(path);
        std::fs::create_dir(path).unwrap();

        let err = Publisher::<u64>::destroy(&key).err().unwrap();
        assert!(matches!(err, ShmError::DestroyFailed { .. }), "{err}");

        std::fs::remove_dir(path).unwrap();
    }

    #[test]
    fn destroy_missing_segment_is_ok() {
        let key = temp_key("never");
        assert!(Publisher::<u64>::destroy(&key).is_ok());
        assert!(Publisher::<u64>::destroy(&key).is_ok());
    }
}
