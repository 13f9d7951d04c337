use crate::types::{PageId, Result, TreeError};
use std::fmt;
use std::ops::Range;

/// Magic prefix identifying a metadata page.
pub const META_MAGIC: [u8; 4] = *b"BPT+";
/// On-disk format version written into new metadata pages.
pub const META_FORMAT_VERSION: u16 = 1;
/// Bytes occupied by the metadata block at the start of page 0.
pub const META_LEN: usize = 40;

const META_MAGIC_RANGE: Range<usize> = 0..4;
const META_VERSION: Range<usize> = 4..6;
const META_RESERVED: Range<usize> = 6..8;
const META_PAGE_SIZE: Range<usize> = 8..12;
const META_ORDER: Range<usize> = 12..16;
const META_KEY_SIZE: Range<usize> = 16..20;
const META_VALUE_SIZE: Range<usize> = 20..24;
const META_ROOT: Range<usize> = 24..32;
const META_NEXT_PAGE: Range<usize> = 32..40;

/// Tree metadata stored in page 0.
///
/// Carries the four configuration scalars so a reopen can be validated, the
/// current root page and the allocation high-water mark.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Meta {
    /// On-disk format version.
    pub format_version: u16,
    /// Size of each page in bytes.
    pub page_size: u32,
    /// Branching order the tree was created with.
    pub order: u32,
    /// Fixed key width in bytes.
    pub key_size: u32,
    /// Fixed value width in bytes.
    pub value_size: u32,
    /// Current root page, `None` until the tree engine creates one.
    pub root_page: Option<PageId>,
    /// Next page number handed out by the allocator.
    pub next_page: PageId,
}

impl Meta {
    /// Metadata for a store that holds nothing but page 0.
    pub fn new(page_size: u32, order: u32, key_size: u32, value_size: u32) -> Self {
        Self {
            format_version: META_FORMAT_VERSION,
            page_size,
            order,
            key_size,
            value_size,
            root_page: None,
            next_page: PageId(1),
        }
    }
}

/// Encodes metadata into the start of a page buffer, zeroing the rest of the page.
pub fn write_meta_page(buf: &mut [u8], meta: &Meta) -> Result<()> {
    if buf.len() < META_LEN {
        return Err(TreeError::SizeMismatch {
            expected: META_LEN,
            actual: buf.len(),
        });
    }
    buf.fill(0);
    buf[META_MAGIC_RANGE].copy_from_slice(&META_MAGIC);
    buf[META_VERSION].copy_from_slice(&meta.format_version.to_be_bytes());
    buf[META_PAGE_SIZE].copy_from_slice(&meta.page_size.to_be_bytes());
    buf[META_ORDER].copy_from_slice(&meta.order.to_be_bytes());
    buf[META_KEY_SIZE].copy_from_slice(&meta.key_size.to_be_bytes());
    buf[META_VALUE_SIZE].copy_from_slice(&meta.value_size.to_be_bytes());
    let root = meta.root_page.map_or(0, |id| id.0);
    buf[META_ROOT].copy_from_slice(&root.to_be_bytes());
    buf[META_NEXT_PAGE].copy_from_slice(&meta.next_page.0.to_be_bytes());
    Ok(())
}

/// Decodes and sanity-checks metadata from the start of page 0.
pub fn read_meta_page(buf: &[u8]) -> Result<Meta> {
    if buf.len() < META_LEN {
        return Err(TreeError::corrupt(PageId::META, "meta page truncated"));
    }
    if buf[META_MAGIC_RANGE] != META_MAGIC {
        return Err(TreeError::corrupt(PageId::META, "invalid meta magic"));
    }
    let format_version = u16::from_be_bytes(fixed(&buf[META_VERSION]));
    if format_version != META_FORMAT_VERSION {
        return Err(TreeError::corrupt(
            PageId::META,
            "unsupported meta format version",
        ));
    }
    if buf[META_RESERVED].iter().any(|b| *b != 0) {
        return Err(TreeError::corrupt(
            PageId::META,
            "meta reserved field non-zero",
        ));
    }
    let page_size = u32::from_be_bytes(fixed(&buf[META_PAGE_SIZE]));
    let order = u32::from_be_bytes(fixed(&buf[META_ORDER]));
    let key_size = u32::from_be_bytes(fixed(&buf[META_KEY_SIZE]));
    let value_size = u32::from_be_bytes(fixed(&buf[META_VALUE_SIZE]));
    let root = u64::from_be_bytes(fixed(&buf[META_ROOT]));
    let next_page = PageId(u64::from_be_bytes(fixed(&buf[META_NEXT_PAGE])));
    if next_page.0 == 0 {
        return Err(TreeError::corrupt(PageId::META, "meta next_page is zero"));
    }
    if root >= next_page.0 {
        return Err(TreeError::corrupt(
            PageId::META,
            "meta root beyond allocated extent",
        ));
    }
    Ok(Meta {
        format_version,
        page_size,
        order,
        key_size,
        value_size,
        root_page: (root != 0).then_some(PageId(root)),
        next_page,
    })
}

fn fixed<const N: usize>(src: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&src[..N]);
    out
}

impl fmt::Display for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Meta(page_size={}, order={}, key_size={}, value_size={}, root_page={}, next_page={})",
            self.page_size,
            self.order,
            self.key_size,
            self.value_size,
            self.root_page.map_or(0, |id| id.0),
            self.next_page.0,
        )
    }
}
