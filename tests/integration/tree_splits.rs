#![allow(missing_docs)]

use bplustree::{BPlusTree, Result, TreeOptions};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

const KEY_COUNT: u64 = 600;

#[derive(Clone, Copy, Debug)]
enum InsertOrder {
    Ascending,
    Descending,
    EvenThenOdd,
    Shuffled,
}

impl InsertOrder {
    const ALL: [InsertOrder; 4] = [
        InsertOrder::Ascending,
        InsertOrder::Descending,
        InsertOrder::EvenThenOdd,
        InsertOrder::Shuffled,
    ];

    fn keys(self, max_key: u64) -> Vec<u64> {
        match self {
            InsertOrder::Ascending => (0..max_key).collect(),
            InsertOrder::Descending => (0..max_key).rev().collect(),
            InsertOrder::EvenThenOdd => (0..max_key)
                .step_by(2)
                .chain((1..max_key).step_by(2))
                .collect(),
            InsertOrder::Shuffled => {
                let mut keys: Vec<u64> = (0..max_key).collect();
                keys.shuffle(&mut ChaCha8Rng::seed_from_u64(max_key));
                keys
            }
        }
    }
}

fn value_for(key: u64, width: usize) -> Vec<u8> {
    key.to_be_bytes()[8 - width.min(8)..].to_vec()
}

/// Largest key count that fits the key width without wrapping.
fn key_limit(key_size: u32) -> u64 {
    if key_size >= 8 {
        KEY_COUNT
    } else {
        KEY_COUNT.min(1 << (key_size * 8))
    }
}

fn check_tree(tree: &BPlusTree, keys: &[u64], value_size: usize) -> Result<()> {
    for &key in keys {
        assert_eq!(tree.get(key)?, Some(value_for(key, value_size)), "key {key}");
    }
    assert_eq!(tree.len()?, keys.len());
    tree.verify()?;
    Ok(())
}

fn run_case(
    order: u32,
    page_size: u32,
    key_size: u32,
    value_size: u32,
    insert_order: InsertOrder,
    file_backed: bool,
) -> Result<()> {
    let dir = TempDir::new()?;
    let mut options = TreeOptions::in_memory()
        .with_order(order)
        .with_page_size(page_size)
        .with_key_size(key_size)
        .with_value_size(value_size);
    if file_backed {
        options.filename = Some(dir.path().join("splits.db"));
    }

    let keys = insert_order.keys(key_limit(key_size));
    let mut tree = BPlusTree::open(&options)?;
    for &key in &keys {
        tree.insert(key, &value_for(key, value_size as usize))?;
    }
    assert!(
        tree.height()? > 1,
        "{insert_order:?} order={order} page={page_size} never split"
    );

    if file_backed {
        tree.close()?;
        let reopened = BPlusTree::open(&options)?;
        check_tree(&reopened, &keys, value_size as usize)
    } else {
        check_tree(&tree, &keys, value_size as usize)
    }
}

#[test]
fn split_matrix_in_memory() -> Result<()> {
    for insert_order in InsertOrder::ALL {
        for order in [3, 4, 50] {
            for page_size in [4096, 8192] {
                for key_size in [4, 16] {
                    for value_size in [4, 16] {
                        run_case(order, page_size, key_size, value_size, insert_order, false)?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[test]
fn split_matrix_file_backed() -> Result<()> {
    for insert_order in InsertOrder::ALL {
        for order in [3, 4, 50] {
            for page_size in [4096, 8192] {
                for key_size in [4, 16] {
                    for value_size in [4, 16] {
                        run_case(order, page_size, key_size, value_size, insert_order, true)?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[test]
fn internal_splits_cascade_to_new_roots() -> Result<()> {
    let mut tree = BPlusTree::open(&TreeOptions::in_memory().with_order(3))?;
    for key in 0..2000u64 {
        tree.insert(key, &value_for(key, 8))?;
    }
    let stats = tree.stats_snapshot();
    assert!(stats.internal_splits > 0);
    assert_eq!(stats.root_splits as usize, tree.height()? - 1);
    tree.verify()?;
    Ok(())
}
