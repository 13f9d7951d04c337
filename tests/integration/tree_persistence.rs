#![allow(missing_docs)]

use std::path::PathBuf;

use bplustree::{BPlusTree, Result, TreeError, TreeOptions};
use tempfile::TempDir;

fn setup(name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(format!("{name}.db"));
    (dir, path)
}

fn value_for(key: u64) -> Vec<u8> {
    format!("value-{key}").into_bytes()
}

#[test]
fn reopen_after_many_inserts() -> Result<()> {
    let (_dir, path) = setup("many");
    let options = TreeOptions::file(&path).with_order(5);
    let root_before;
    {
        let mut tree = BPlusTree::open(&options)?;
        for key in 0..500 {
            tree.insert(key, &value_for(key))?;
        }
        root_before = tree.root_page();
        tree.close()?;
    }

    let tree = BPlusTree::open(&options)?;
    assert_eq!(tree.root_page(), root_before);
    for key in 0..500 {
        assert_eq!(tree.get(key)?, Some(value_for(key)));
    }
    assert_eq!(tree.get(500)?, None);
    assert_eq!(tree.len()?, 500);
    tree.verify()?;
    Ok(())
}

#[test]
fn reopen_empty_tree() -> Result<()> {
    let (_dir, path) = setup("empty");
    let options = TreeOptions::file(&path);
    BPlusTree::open(&options)?.close()?;

    let tree = BPlusTree::open(&options)?;
    assert!(tree.is_empty()?);
    assert_eq!(tree.height()?, 1);
    assert_eq!(tree.get(0)?, None);
    Ok(())
}

#[test]
fn reopen_single_record() -> Result<()> {
    let (_dir, path) = setup("single");
    let options = TreeOptions::file(&path);
    {
        let mut tree = BPlusTree::open(&options)?;
        tree.insert(5, b"foo")?;
        tree.flush()?;
    }
    let mut tree = BPlusTree::open(&options)?;
    assert_eq!(tree.get(5)?, Some(b"foo".to_vec()));

    tree.insert(6, b"bar")?;
    tree.close()?;
    let tree = BPlusTree::open(&options)?;
    assert_eq!(tree.get(5)?, Some(b"foo".to_vec()));
    assert_eq!(tree.get(6)?, Some(b"bar".to_vec()));
    Ok(())
}

#[test]
fn reopen_with_mismatched_geometry_fails() -> Result<()> {
    let (_dir, path) = setup("mismatch");
    let mut tree = BPlusTree::open(&TreeOptions::file(&path))?;
    tree.insert(1, b"one")?;
    tree.close()?;

    for options in [
        TreeOptions::file(&path).with_order(8),
        TreeOptions::file(&path).with_key_size(8),
        TreeOptions::file(&path).with_value_size(64),
    ] {
        let err = BPlusTree::open(&options).err().expect("mismatch must fail");
        assert!(matches!(err, TreeError::Config(_)), "unexpected error {err}");
    }

    let tree = BPlusTree::open(&TreeOptions::file(&path))?;
    assert_eq!(tree.get(1)?, Some(b"one".to_vec()));
    Ok(())
}

#[test]
fn reopen_with_different_page_size_fails() -> Result<()> {
    let (_dir, path) = setup("page_size");
    BPlusTree::open(&TreeOptions::file(&path))?.close()?;
    // Two 4096-byte pages are also one aligned 8192-byte page, so the
    // mismatch is caught by the recorded geometry rather than the file size.
    let err = BPlusTree::open(&TreeOptions::file(&path).with_page_size(8192))
        .err()
        .expect("page size mismatch must fail");
    assert!(matches!(err, TreeError::Config(_)));
    Ok(())
}

#[test]
fn options_loaded_from_toml_drive_open() -> Result<()> {
    let (_dir, path) = setup("toml");
    let doc = format!(
        "filename = {:?}\norder = 6\nvalue_size = 8\n",
        path.display().to_string()
    );
    let options = TreeOptions::from_toml_str(&doc)?;
    assert_eq!(options.filename.as_deref(), Some(path.as_path()));

    let mut tree = BPlusTree::open(&options)?;
    for key in 0..100u64 {
        tree.insert(key, &key.to_le_bytes())?;
    }
    assert_eq!(tree.config().order(), 6);
    tree.close()?;

    let tree = BPlusTree::open(&options)?;
    assert_eq!(tree.get(42)?, Some(42u64.to_le_bytes().to_vec()));
    Ok(())
}

#[test]
fn unknown_option_keys_are_rejected() {
    let err = TreeOptions::from_toml_str("ordr = 4\n").unwrap_err();
    assert!(matches!(err, TreeError::Options(_)));
}
