#![forbid(unsafe_code)]

mod pager;

pub use pager::{Pager, PagerOptions, PagerStats, DEFAULT_MAX_PAGES};
