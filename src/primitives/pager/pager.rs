use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::primitives::io::{FileIo, MemFileIo, StdFileIo};
use crate::types::{PageId, Result, TreeError};

use super::meta::{read_meta_page, write_meta_page, Meta, META_LEN};

/// Persisted scalars a pager is opened with.
///
/// A fresh store records them in page 0; an existing store must carry exactly
/// the same values or the open fails with [`TreeError::Config`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PagerOptions {
    /// Size of each page in bytes (e.g., 4096).
    pub page_size: u32,
    /// Branching order recorded for validation on reopen.
    pub order: u32,
    /// Key width recorded for validation on reopen.
    pub key_size: u32,
    /// Value width recorded for validation on reopen.
    pub value_size: u32,
}

impl PagerOptions {
    fn template(&self) -> Meta {
        Meta::new(self.page_size, self.order, self.key_size, self.value_size)
    }
}

/// Where the pager's bytes live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backing {
    /// Process-local growable buffer.
    Memory,
    /// Growable file at the given path.
    File(PathBuf),
}

impl fmt::Display for Backing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backing::Memory => write!(f, ":memory:"),
            Backing::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Maps logical page numbers to fixed-size blocks on a [`FileIo`] medium.
///
/// The pager knows nothing about tree semantics: it hands out page numbers,
/// moves raw bytes and keeps page 0 (root pointer and allocation mark) current.
pub struct Pager {
    io: Arc<dyn FileIo>,
    backing: Backing,
    page_size: usize,
    meta: Meta,
}

impl Pager {
    /// Opens a pager over a fresh in-memory buffer.
    pub fn in_memory(options: PagerOptions) -> Result<Self> {
        Self::open_with(Arc::new(MemFileIo::new()), Backing::Memory, options)
    }

    /// Opens (creating if absent) a file-backed pager.
    pub fn open(path: impl AsRef<Path>, options: PagerOptions) -> Result<Self> {
        let path = path.as_ref();
        let io = StdFileIo::open(path)?;
        Self::open_with(Arc::new(io), Backing::File(path.to_path_buf()), options)
    }

    /// Opens a pager over an arbitrary medium.
    ///
    /// An empty medium is initialised with a metadata page and no root. A
    /// non-empty one must be an exact multiple of `page_size` and carry
    /// metadata matching `options`.
    pub fn open_with(
        io: Arc<dyn FileIo>,
        backing: Backing,
        options: PagerOptions,
    ) -> Result<Self> {
        let page_size = options.page_size as usize;
        if page_size < META_LEN {
            return Err(TreeError::Config("page size smaller than metadata block"));
        }
        let len = io.len()?;
        if len == 0 {
            let meta = options.template();
            let mut pager = Self {
                io,
                backing,
                page_size,
                meta,
            };
            pager.persist_meta()?;
            debug!(backing = %pager.backing, page_size, "pager.create");
            return Ok(pager);
        }

        if len % page_size as u64 != 0 {
            return Err(TreeError::corrupt(
                PageId::META,
                "store size is not a multiple of page_size",
            ));
        }
        let mut buf = vec![0u8; page_size];
        io.read_at(0, &mut buf)?;
        let meta = read_meta_page(&buf)?;
        let expected = options.template();
        if meta.page_size != expected.page_size {
            return Err(TreeError::Config("page_size differs from the persisted tree"));
        }
        if meta.order != expected.order {
            return Err(TreeError::Config("order differs from the persisted tree"));
        }
        if meta.key_size != expected.key_size {
            return Err(TreeError::Config("key_size differs from the persisted tree"));
        }
        if meta.value_size != expected.value_size {
            return Err(TreeError::Config("value_size differs from the persisted tree"));
        }
        let extent_bytes = meta
            .next_page
            .0
            .checked_mul(page_size as u64)
            .ok_or(TreeError::corrupt(PageId::META, "meta extent overflows"))?;
        if extent_bytes > len {
            return Err(TreeError::corrupt(
                PageId::META,
                "meta extent beyond end of store",
            ));
        }
        if extent_bytes < len {
            // Pages past the recorded mark were never handed out; drop them.
            warn!(
                backing = %backing,
                recorded = extent_bytes,
                actual = len,
                "pager.open.trailing_pages_truncated"
            );
            io.truncate(extent_bytes)?;
        }
        debug!(
            backing = %backing,
            page_size,
            next_page = meta.next_page.0,
            root = meta.root_page.map_or(0, |id| id.0),
            "pager.open"
        );
        Ok(Self {
            io,
            backing,
            page_size,
            meta,
        })
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the backing description.
    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    /// Returns the current metadata.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Number of allocated pages, metadata page included.
    pub fn page_count(&self) -> u64 {
        self.meta.next_page.0
    }

    /// Root page recorded in page 0, if any.
    pub fn root_page(&self) -> Option<PageId> {
        self.meta.root_page
    }

    /// Records `root` in page 0 and writes the metadata through.
    pub fn set_root(&mut self, root: PageId) -> Result<()> {
        self.check_range(root)?;
        if root.is_meta() {
            return Err(TreeError::Config("page 0 cannot hold the root node"));
        }
        self.meta.root_page = Some(root);
        self.persist_meta()?;
        debug!(root = root.0, "pager.set_root");
        Ok(())
    }

    /// Reads one full page.
    pub fn read_page(&self, id: PageId) -> Result<Vec<u8>> {
        self.check_range(id)?;
        let mut buf = vec![0u8; self.page_size];
        self.io.read_at(self.offset(id), &mut buf)?;
        Ok(buf)
    }

    /// Overwrites one full page in place.
    pub fn write_page(&mut self, id: PageId, data: &[u8]) -> Result<()> {
        if data.len() != self.page_size {
            return Err(TreeError::SizeMismatch {
                expected: self.page_size,
                actual: data.len(),
            });
        }
        self.check_range(id)?;
        self.io.write_at(self.offset(id), data)
    }

    /// Hands out the next page number and extends the store by one zeroed page.
    ///
    /// Page numbers are strictly increasing and never reused.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        let id = self.meta.next_page;
        let next = id
            .0
            .checked_add(1)
            .ok_or(TreeError::Config("page numbers exhausted"))?;
        let zeros = vec![0u8; self.page_size];
        self.io.write_at(self.offset(id), &zeros)?;
        self.meta.next_page = PageId(next);
        self.persist_meta()?;
        trace!(page = id.0, "pager.allocate_page");
        Ok(id)
    }

    /// Flushes OS-level buffering to the durable medium.
    pub fn sync(&self) -> Result<()> {
        self.io.sync_all()
    }

    /// Flushes and releases the medium.
    pub fn close(self) -> Result<()> {
        self.sync()?;
        debug!(backing = %self.backing, pages = self.meta.next_page.0, "pager.close");
        Ok(())
    }

    fn offset(&self, id: PageId) -> u64 {
        id.0 * self.page_size as u64
    }

    fn check_range(&self, id: PageId) -> Result<()> {
        if id.0 >= self.meta.next_page.0 {
            return Err(TreeError::OutOfRange {
                page: id,
                extent: self.meta.next_page.0,
            });
        }
        Ok(())
    }

    fn persist_meta(&mut self) -> Result<()> {
        let mut buf = vec![0u8; self.page_size];
        write_meta_page(&mut buf, &self.meta)?;
        self.io.write_at(0, &buf)
    }
}
