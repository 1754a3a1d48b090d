#![allow(dead_code)]
pub mod buffer_pool;
pub mod disk;
pub mod frame;
pub mod page;
pub mod pinned_page;
pub mod replacer;
pub mod typedef;
pub(crate) type Result<T> = std::result::Result<T, pagepool_error::Error>;
