#![allow(missing_docs)]

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::sync::Arc;

use bplustree::primitives::io::MemFileIo;
use bplustree::primitives::pager::{Backing, Pager, PagerOptions};
use bplustree::storage::btree::{page, InternalNode, LeafNode, Node, Record};
use bplustree::{BPlusTree, PageId, Result, TreeConfig, TreeError, TreeOptions};
use tempfile::TempDir;

fn options() -> PagerOptions {
    PagerOptions {
        page_size: 512,
        order: 4,
        key_size: 8,
        value_size: 16,
    }
}

fn config() -> TreeConfig {
    TreeConfig::new(512, 4, 8, 16).expect("valid geometry")
}

#[test]
fn allocation_is_monotonic_and_zeroed() -> Result<()> {
    let mut pager = Pager::in_memory(options())?;
    assert_eq!(pager.page_count(), 1);
    let ids: Vec<PageId> = (0..5).map(|_| pager.allocate_page()).collect::<Result<_>>()?;
    assert_eq!(ids, (1..=5).map(PageId).collect::<Vec<_>>());
    assert_eq!(pager.page_count(), 6);
    for id in ids {
        assert!(pager.read_page(id)?.iter().all(|b| *b == 0));
    }
    Ok(())
}

#[test]
fn write_then_read_page() -> Result<()> {
    let mut pager = Pager::in_memory(options())?;
    let id = pager.allocate_page()?;
    let mut data = vec![0u8; 512];
    data[..4].copy_from_slice(b"page");
    data[511] = 0xFF;
    pager.write_page(id, &data)?;
    assert_eq!(pager.read_page(id)?, data);
    Ok(())
}

#[test]
fn reads_and_writes_past_extent_are_rejected() -> Result<()> {
    let mut pager = Pager::in_memory(options())?;
    let id = pager.allocate_page()?;
    assert!(matches!(
        pager.read_page(PageId(id.0 + 1)),
        Err(TreeError::OutOfRange { .. })
    ));
    assert!(matches!(
        pager.write_page(PageId(id.0 + 7), &[0u8; 512]),
        Err(TreeError::OutOfRange { .. })
    ));
    Ok(())
}

#[test]
fn wrong_sized_blocks_are_rejected() -> Result<()> {
    let mut pager = Pager::in_memory(options())?;
    let id = pager.allocate_page()?;
    let err = pager.write_page(id, &[0u8; 100]).unwrap_err();
    assert!(matches!(
        err,
        TreeError::SizeMismatch {
            expected: 512,
            actual: 100
        }
    ));
    Ok(())
}

#[test]
fn unknown_tag_is_reported_as_corrupt() -> Result<()> {
    let mut pager = Pager::open_with(Arc::new(MemFileIo::new()), Backing::Memory, options())?;
    let junk = pager.allocate_page()?;
    let mut data = vec![0u8; 512];
    data[0] = 0x7A;
    pager.write_page(junk, &data)?;

    let tree = BPlusTree::with_pager(pager, config())?;
    let err = tree.load(junk).unwrap_err();
    assert!(matches!(err, TreeError::CorruptPage { page, .. } if page == junk));
    Ok(())
}

#[test]
fn non_root_variant_on_root_page_is_rejected() -> Result<()> {
    let cfg = config();
    let mut pager = Pager::in_memory(options())?;
    let id = pager.allocate_page()?;
    let leaf = Node::Leaf(LeafNode {
        records: vec![Record::new(&cfg, 3, b"three")?],
        next: None,
    });
    pager.write_page(id, &page::encode(&cfg, &leaf, id)?)?;
    pager.set_root(id)?;

    let err = BPlusTree::with_pager(pager, cfg).err().expect("must reject");
    assert!(matches!(err, TreeError::CorruptPage { .. }));
    Ok(())
}

#[test]
fn damaged_file_surfaces_corruption_on_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("damaged.db");
    let options = TreeOptions::file(&path);
    let root = {
        let mut tree = BPlusTree::open(&options)?;
        tree.insert(1, b"one")?;
        let root = tree.root_page();
        tree.close()?;
        root
    };

    let mut file = OpenOptions::new().write(true).open(&path)?;
    file.seek(SeekFrom::Start(root.0 * options.page_size as u64))?;
    file.write_all(&[0xEE])?;
    file.sync_all()?;
    drop(file);

    let err = BPlusTree::open(&options).err().expect("must fail");
    assert!(matches!(err, TreeError::CorruptPage { page, .. } if page == root));
    Ok(())
}

#[test]
fn damaged_metadata_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("meta.db");
    let options = TreeOptions::file(&path);
    BPlusTree::open(&options)?.close()?;

    let mut file = OpenOptions::new().write(true).open(&path)?;
    file.write_all(b"XXXX")?;
    drop(file);

    let err = BPlusTree::open(&options).err().expect("must fail");
    assert!(matches!(
        err,
        TreeError::CorruptPage {
            page: PageId::META,
            ..
        }
    ));
    Ok(())
}

#[test]
fn tree_geometry_must_match_persisted_scalars() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("geometry.db");
    let persisted = PagerOptions {
        page_size: 4096,
        order: 3,
        key_size: 16,
        value_size: 32,
    };
    Pager::open(&path, persisted)?.close()?;

    for config in [
        TreeConfig::new(4096, 50, 16, 32)?,
        TreeConfig::new(4096, 3, 8, 32)?,
        TreeConfig::new(4096, 3, 16, 64)?,
    ] {
        let pager = Pager::open(&path, persisted)?;
        let err = BPlusTree::with_pager(pager, config).err().expect("must reject");
        assert!(matches!(err, TreeError::Config(_)), "unexpected error {err}");
    }

    let pager = Pager::open(&path, persisted)?;
    let mut tree = BPlusTree::with_pager(pager, TreeConfig::new(4096, 3, 16, 32)?)?;
    for key in 0..40u64 {
        tree.insert(key, &key.to_be_bytes())?;
    }
    tree.close()?;

    let tree = BPlusTree::open(&TreeOptions::file(&path).with_order(3))?;
    assert_eq!(tree.get(39)?, Some(39u64.to_be_bytes().to_vec()));
    tree.verify()?;
    Ok(())
}

#[test]
fn verify_reports_child_cycles_without_recursing() -> Result<()> {
    let cfg = config();
    let mut pager = Pager::in_memory(options())?;
    let root = pager.allocate_page()?;
    let looped = pager.allocate_page()?;
    let leaf = pager.allocate_page()?;

    let root_node = Node::Root(InternalNode {
        keys: vec![100],
        children: vec![looped, leaf],
    });
    // Points at itself, so a descent would revisit it forever.
    let looped_node = Node::Internal(InternalNode {
        keys: vec![50],
        children: vec![looped, leaf],
    });
    let leaf_node = Node::Leaf(LeafNode {
        records: vec![Record::new(&cfg, 120, b"x")?, Record::new(&cfg, 130, b"y")?],
        next: None,
    });
    pager.write_page(root, &page::encode(&cfg, &root_node, root)?)?;
    pager.write_page(looped, &page::encode(&cfg, &looped_node, looped)?)?;
    pager.write_page(leaf, &page::encode(&cfg, &leaf_node, leaf)?)?;
    pager.set_root(root)?;

    let tree = BPlusTree::with_pager(pager, cfg)?;
    let err = tree.verify().unwrap_err();
    assert!(matches!(err, TreeError::CorruptPage { page, .. } if page == looped));
    Ok(())
}
