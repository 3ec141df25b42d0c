//! Backing objects for shared segments, mapped with `memmap2`.
//!
//! Two kinds of backing object are supported:
//! - a POSIX shared-memory object (`shm_open`), which is kernel-managed and
//!   outlives every process that maps it until it is unlinked;
//! - a plain file, useful on tmpfs and in tests.
//!
//! Both end up as a `File` handle that `memmap2` maps with `MAP_SHARED`.

use memmap2::{Mmap, MmapMut};
use std::{
    ffi::CString,
    fs::{File, OpenOptions},
    io,
    os::fd::FromRawFd,
    os::unix::fs::OpenOptionsExt,
    path::Path,
};

/// Permission bits for newly created objects: owner read/write, everyone read.
pub const SEGMENT_MODE: u32 = 0o644;

pub struct MmapFileMut {
    _file: File,
    mmap: MmapMut,
    fresh: bool,
}

pub struct MmapFile {
    _file: File,
    mmap: Mmap,
}

impl MmapFileMut {
    /// Create (or reuse) a file of exactly `size_bytes` and map it read-write.
    ///
    /// An existing file that already has the requested size keeps its
    /// contents, and an empty one is sized and zero-filled. An existing file
    /// of any other size is left untouched and `AlreadyExists` is returned,
    /// so mappings held by other processes never see it change size.
    pub fn create_rw<P: AsRef<Path>>(path: P, size_bytes: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .mode(SEGMENT_MODE)
            .open(path)?;
        Self::map_sized(file, size_bytes)
    }

    /// Create (or reuse) a POSIX shared-memory object and map it read-write.
    ///
    /// Same sizing rules as [`MmapFileMut::create_rw`].
    pub fn create_shm(name: &str, size_bytes: usize) -> io::Result<Self> {
        let file = shm_open(name, libc::O_CREAT | libc::O_RDWR, SEGMENT_MODE)?;
        Self::map_sized(file, size_bytes)
    }

    /// Open an existing file read-write at whatever size it currently has.
    pub fn open_rw<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Self::map_existing(file)
    }

    /// Open an existing POSIX shared-memory object read-write at its current size.
    pub fn open_shm_rw(name: &str) -> io::Result<Self> {
        let file = shm_open(name, libc::O_RDWR, 0)?;
        Self::map_existing(file)
    }

    fn map_sized(file: File, size_bytes: usize) -> io::Result<Self> {
        let len = file.metadata()?.len();
        let fresh = len == 0;
        if fresh {
            file.set_len(size_bytes as u64)?;
        } else if len != size_bytes as u64 {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("existing object is {len} bytes, wanted {size_bytes}"),
            ));
        }

        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self {
            _file: file,
            mmap,
            fresh,
        })
    }

    fn map_existing(file: File) -> io::Result<Self> {
        if file.metadata()?.len() == 0 {
            return Err(r#unsized());
        }
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self {
            _file: file,
            mmap,
            fresh: false,
        })
    }

    /// Return raw pointer to start of memory mapped file data
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// True when the object was empty and has been sized (and therefore
    /// zeroed) by this call rather than reattached with its previous contents.
    #[inline]
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }
}

impl MmapFile {
    /// Open an existing file and map it read-only
    pub fn open_ro<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::map(file)
    }

    /// Open an existing POSIX shared-memory object and map it read-only
    pub fn open_shm_ro(name: &str) -> io::Result<Self> {
        let file = shm_open(name, libc::O_RDONLY, 0)?;
        Self::map(file)
    }

    /// An object that exists but has not been sized yet is reported as
    /// `NotFound`: its creator is still setting it up.
    fn map(file: File) -> io::Result<Self> {
        if file.metadata()?.len() == 0 {
            return Err(r#unsized());
        }
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Return raw pointer to start of memory mapped file data
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

/// Remove a POSIX shared-memory object. Existing mappings stay valid until
/// they are dropped.
pub fn unlink_shm(name: &str) -> io::Result<()> {
    let c_name = shm_name(name)?;
    if unsafe { libc::shm_unlink(c_name.as_ptr()) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn r#unsized() -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, "object exists but has not been sized")
}

fn shm_name(name: &str) -> io::Result<CString> {
    CString::new(name).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "shared memory name contains a NUL byte",
        )
    })
}

fn shm_open(name: &str, oflag: libc::c_int, mode: u32) -> io::Result<File> {
    let c_name = shm_name(name)?;
    let fd = unsafe { libc::shm_open(c_name.as_ptr(), oflag, mode as libc::c_uint) };
    if fd == -1 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: fd was just returned by shm_open and is owned by nobody else
    Ok(unsafe { File::from_raw_fd(fd) })
}
