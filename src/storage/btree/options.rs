use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::Result;

/// Default bytes per page.
pub const DEFAULT_PAGE_SIZE: u32 = 4096;
/// Default branching order.
pub const DEFAULT_ORDER: u32 = 4;
/// Default key width in bytes.
pub const DEFAULT_KEY_SIZE: u32 = 16;
/// Default value width in bytes.
pub const DEFAULT_VALUE_SIZE: u32 = 32;

/// User-facing options for opening a tree.
///
/// Every field is optional in serialized form. `filename = None` selects the
/// in-memory backend. The four numeric scalars must be supplied identically
/// every time an existing file is reopened.
///
/// ```toml
/// filename = "/var/lib/app/index.db"
/// page_size = 8192
/// order = 50
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeOptions {
    /// Path of the backing file; `None` keeps the tree in memory.
    pub filename: Option<PathBuf>,
    /// Bytes per page.
    pub page_size: u32,
    /// Maximum children per internal node.
    pub order: u32,
    /// Fixed width of every encoded key.
    pub key_size: u32,
    /// Fixed width of every value slot.
    pub value_size: u32,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            filename: None,
            page_size: DEFAULT_PAGE_SIZE,
            order: DEFAULT_ORDER,
            key_size: DEFAULT_KEY_SIZE,
            value_size: DEFAULT_VALUE_SIZE,
        }
    }
}

impl TreeOptions {
    /// Options for an in-memory tree with default geometry.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Options for a file-backed tree with default geometry.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            filename: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Parses options from a TOML document; absent keys take their defaults.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        Ok(toml::from_str(src)?)
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the branching order.
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Sets the key width.
    pub fn with_key_size(mut self, key_size: u32) -> Self {
        self.key_size = key_size;
        self
    }

    /// Sets the value width.
    pub fn with_value_size(mut self, value_size: u32) -> Self {
        self.value_size = value_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TreeError;

    #[test]
    fn empty_document_yields_defaults() {
        let opts = TreeOptions::from_toml_str("").unwrap();
        assert_eq!(opts, TreeOptions::default());
        assert!(opts.filename.is_none());
    }

    #[test]
    fn partial_document_overrides_given_keys() {
        let opts = TreeOptions::from_toml_str(
            r#"
            filename = "/tmp/tree.db"
            page_size = 512
            value_size = 128
            "#,
        )
        .unwrap();
        assert_eq!(opts.filename.as_deref(), Some(Path::new("/tmp/tree.db")));
        assert_eq!(opts.page_size, 512);
        assert_eq!(opts.order, DEFAULT_ORDER);
        assert_eq!(opts.key_size, DEFAULT_KEY_SIZE);
        assert_eq!(opts.value_size, 128);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            TreeOptions::from_toml_str("cache_pages = 10"),
            Err(TreeError::Options(_))
        ));
    }

    #[test]
    fn builder_chain() {
        let opts = TreeOptions::file("/tmp/x.db")
            .with_page_size(8192)
            .with_order(50)
            .with_key_size(4)
            .with_value_size(4);
        assert_eq!(opts.page_size, 8192);
        assert_eq!(opts.order, 50);
        assert_eq!(opts.key_size, 4);
        assert_eq!(opts.value_size, 4);
        assert!(opts.filename.is_some());
    }
}
