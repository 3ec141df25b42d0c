//! Lock-free shared-memory export of a single continuously overwritten value.
//!
//! One [`Publisher`] owns a segment and overwrites it in place; any number of
//! [`Reader`]s in other processes map the same segment read-only and copy out
//! self-consistent snapshots. Nothing ever blocks: torn copies are detected by
//! comparing the two generation counters that bracket the payload and
//! reported as [`ShmError::Inconsistent`] so the caller can retry.

mod bookend;
mod error;
mod key;
mod layout;
mod publisher;
mod reader;
pub mod validator;

pub use error::ShmError;
pub use key::{InvalidKey, SegmentKey};
pub use layout::{Plain, SharedSegment, bytes_for_segment};
pub use publisher::Publisher;
pub use reader::{Reader, RetryPolicy, Sample};
