use crate::key::SegmentKey;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ShmError {
    /// Nothing exists behind the key: the writer has never run, or the
    /// segment was destroyed.
    #[error("segment '{key}' does not exist (is the writer running?)")]
    SegmentAbsent { key: SegmentKey },

    /// The segment exists but this process cannot map it.
    #[error("segment '{key}' exists but cannot be attached")]
    AttachDenied {
        key: SegmentKey,
        #[source]
        source: io::Error,
    },

    #[error("reader is not attached to a segment")]
    NotAttached,

    /// A publish overlapped the copy. Expected under load; read again.
    #[error("torn read: generation moved from {before} to {after} during copy")]
    Inconsistent { before: u64, after: u64 },

    #[error("failed to create segment '{key}'")]
    CreateFailed {
        key: SegmentKey,
        #[source]
        source: io::Error,
    },

    #[error("failed to destroy segment '{key}'")]
    DestroyFailed {
        key: SegmentKey,
        #[source]
        source: io::Error,
    },

    #[error("no consistent snapshot after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

impl ShmError {
    /// Classifies a failed attach: a missing object is `SegmentAbsent`,
    /// everything else is `AttachDenied`.
    pub(crate) fn attach(key: &SegmentKey, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => ShmError::SegmentAbsent { key: key.clone() },
            _ => ShmError::AttachDenied {
                key: key.clone(),
                source,
            },
        }
    }

    /// Conditions that may clear up by themselves if the caller tries again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShmError::SegmentAbsent { .. } | ShmError::Inconsistent { .. }
        )
    }
}
