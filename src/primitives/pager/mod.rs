#![forbid(unsafe_code)]

mod meta;
mod pager;

pub use meta::{
    read_meta_page, write_meta_page, Meta, META_FORMAT_VERSION, META_LEN, META_MAGIC,
};
pub use pager::{Backing, Pager, PagerOptions};
