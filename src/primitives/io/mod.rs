#![forbid(unsafe_code)]

use std::{
    fs::{File, OpenOptions},
    io::{self, ErrorKind},
    path::Path,
    sync::Arc,
};

use parking_lot::RwLock;
use tracing::trace;

use crate::types::Result;

/// Trait for performing positioned I/O against a backing medium.
///
/// Both the on-disk and the in-memory backends implement it so the pager
/// can treat them identically.
pub trait FileIo: Send + Sync + 'static {
    /// Reads exactly `dst.len()` bytes starting at `off`.
    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<()>;
    /// Writes all of `src` starting at `off`, growing the medium if needed.
    fn write_at(&self, off: u64, src: &[u8]) -> Result<()>;
    /// Flushes buffered data to the durable medium.
    fn sync_all(&self) -> Result<()>;
    /// Returns the current length of the medium in bytes.
    fn len(&self) -> Result<u64>;
    /// Returns true if the medium is empty.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
    /// Truncates or extends the medium to the specified length.
    fn truncate(&self, len: u64) -> Result<()>;
}

/// File-backed I/O. Writes go straight to the OS with no user-space buffering,
/// so a subsequent read in the same process always observes them.
#[derive(Clone)]
pub struct StdFileIo {
    inner: Arc<File>,
}

impl StdFileIo {
    /// Wraps an already-open handle, which must be readable and writable.
    pub fn new(file: File) -> Self {
        Self {
            inner: Arc::new(file),
        }
    }

    /// Opens `path` for read-write access, creating it empty if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self::new(file))
    }
}

#[cfg(unix)]
fn pread_exact(file: &File, off: u64, dst: &mut [u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(dst, off)
}

#[cfg(unix)]
fn pwrite_all(file: &File, off: u64, src: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(src, off)
}

// `seek_read`/`seek_write` may transfer short; loop until done.
#[cfg(windows)]
fn pread_exact(file: &File, mut off: u64, mut dst: &mut [u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !dst.is_empty() {
        match file.seek_read(dst, off)? {
            0 => return Err(io::Error::new(ErrorKind::UnexpectedEof, "page read hit EOF")),
            n => {
                dst = &mut std::mem::take(&mut dst)[n..];
                off += n as u64;
            }
        }
    }
    Ok(())
}

#[cfg(windows)]
fn pwrite_all(file: &File, mut off: u64, mut src: &[u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !src.is_empty() {
        match file.seek_write(src, off)? {
            0 => return Err(io::Error::new(ErrorKind::WriteZero, "page write stalled")),
            n => {
                src = &src[n..];
                off += n as u64;
            }
        }
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn pread_exact(_file: &File, _off: u64, _dst: &mut [u8]) -> io::Result<()> {
    Err(io::Error::new(ErrorKind::Unsupported, "positioned reads unsupported"))
}

#[cfg(not(any(unix, windows)))]
fn pwrite_all(_file: &File, _off: u64, _src: &[u8]) -> io::Result<()> {
    Err(io::Error::new(ErrorKind::Unsupported, "positioned writes unsupported"))
}

impl FileIo for StdFileIo {
    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<()> {
        Ok(pread_exact(&self.inner, off, dst)?)
    }

    fn write_at(&self, off: u64, src: &[u8]) -> Result<()> {
        Ok(pwrite_all(&self.inner, off, src)?)
    }

    fn sync_all(&self) -> Result<()> {
        trace!(target: "bplustree::io", "sync_all");
        Ok(self.inner.sync_all()?)
    }

    fn len(&self) -> Result<u64> {
        Ok(self.inner.metadata()?.len())
    }

    fn truncate(&self, len: u64) -> Result<()> {
        Ok(self.inner.set_len(len)?)
    }
}

/// Growable process-local buffer with the same positioned-I/O contract as a file.
#[derive(Default)]
pub struct MemFileIo {
    buf: RwLock<Vec<u8>>,
}

impl MemFileIo {
    /// Creates an empty in-memory medium.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileIo for MemFileIo {
    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<()> {
        let buf = self.buf.read();
        let start = usize::try_from(off)
            .map_err(|_| io::Error::new(ErrorKind::InvalidInput, "offset overflows usize"))?;
        let end = start
            .checked_add(dst.len())
            .filter(|end| *end <= buf.len())
            .ok_or_else(|| io::Error::new(ErrorKind::UnexpectedEof, "read past end of buffer"))?;
        dst.copy_from_slice(&buf[start..end]);
        Ok(())
    }

    fn write_at(&self, off: u64, src: &[u8]) -> Result<()> {
        let mut buf = self.buf.write();
        let start = usize::try_from(off)
            .map_err(|_| io::Error::new(ErrorKind::InvalidInput, "offset overflows usize"))?;
        let end = start
            .checked_add(src.len())
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "write end overflows"))?;
        if buf.len() < end {
            buf.resize(end, 0);
        }
        buf[start..end].copy_from_slice(src);
        Ok(())
    }

    fn sync_all(&self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.buf.read().len() as u64)
    }

    fn truncate(&self, len: u64) -> Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(ErrorKind::InvalidInput, "length overflows usize"))?;
        self.buf.write().resize(len, 0);
        Ok(())
    }
}
