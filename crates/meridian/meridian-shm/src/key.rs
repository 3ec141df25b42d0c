//! Identity of a segment.
//!
//! The key is passed explicitly to [`Publisher::create`](crate::Publisher::create)
//! and [`Reader::open`](crate::Reader::open); writer and readers that agree on
//! the key share a segment. Distinct keys give fully isolated segments.

use meridian_mmap::{MmapFile, MmapFileMut, unlink_shm};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SegmentKey {
    /// POSIX shared-memory object name, e.g. `/meridian-fix`.
    Shm(String),
    /// Regular file mapped in shared mode.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid segment key '{0}'")]
pub struct InvalidKey(pub String);

impl SegmentKey {
    /// Well-known name of the daemon's segment.
    pub const DEFAULT_NAME: &'static str = "/meridian-fix";

    pub fn shm(name: impl Into<String>) -> Result<Self, InvalidKey> {
        let name = name.into();
        let normalized = if name.starts_with('/') {
            name
        } else {
            format!("/{name}")
        };
        // POSIX names are a single path component after the leading slash
        if normalized.len() < 2 || normalized[1..].contains('/') || normalized.contains('\0') {
            return Err(InvalidKey(normalized));
        }
        Ok(SegmentKey::Shm(normalized))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        SegmentKey::File(path.into())
    }

    pub(crate) fn map_rw(&self, size_bytes: usize) -> io::Result<MmapFileMut> {
        match self {
            SegmentKey::Shm(name) => MmapFileMut::create_shm(name, size_bytes),
            SegmentKey::File(path) => MmapFileMut::create_rw(path, size_bytes),
        }
    }

    pub(crate) fn open_rw(&self) -> io::Result<MmapFileMut> {
        match self {
            SegmentKey::Shm(name) => MmapFileMut::open_shm_rw(name),
            SegmentKey::File(path) => MmapFileMut::open_rw(path),
        }
    }

    pub(crate) fn map_ro(&self) -> io::Result<MmapFile> {
        match self {
            SegmentKey::Shm(name) => MmapFile::open_shm_ro(name),
            SegmentKey::File(path) => MmapFile::open_ro(path),
        }
    }

    pub(crate) fn remove(&self) -> io::Result<()> {
        match self {
            SegmentKey::Shm(name) => unlink_shm(name),
            SegmentKey::File(path) => std::fs::remove_file(path),
        }
    }
}

impl Default for SegmentKey {
    fn default() -> Self {
        SegmentKey::Shm(Self::DEFAULT_NAME.to_string())
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentKey::Shm(name) => write!(f, "shm:{name}"),
            SegmentKey::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// Accepts `shm:<name>`, `file:<path>`, or a bare string. A bare string that
/// is a single component after a leading `/` names a shm object; anything
/// else is a file path.
impl FromStr for SegmentKey {
    type Err = InvalidKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(name) = s.strip_prefix("shm:") {
            return SegmentKey::shm(name);
        }
        if let Some(path) = s.strip_prefix("file:") {
            if path.is_empty() {
                return Err(InvalidKey(s.to_string()));
            }
            return Ok(SegmentKey::file(path));
        }
        if s.is_empty() {
            return Err(InvalidKey(s.to_string()));
        }
        match s.strip_prefix('/') {
            Some(rest) if !rest.is_empty() && !rest.contains('/') => SegmentKey::shm(s),
            _ => Ok(SegmentKey::file(s)),
        }
    }
}
