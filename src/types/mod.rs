#![forbid(unsafe_code)]

//! Shared identifiers and the crate-wide error type.

use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::Serialize;

/// Zero-based page number inside the table file.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
#[serde(transparent)]
pub struct PageId(pub u32);

impl PageId {
    /// The page that always holds the tree root.
    pub const ROOT: PageId = PageId(0);

    /// Byte offset of this page in a file of `page_size` pages.
    pub fn offset(self, page_size: usize) -> u64 {
        u64::from(self.0) * page_size as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors produced by the storage engine.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The backing file could not be created or opened.
    #[error("unable to open {}: {source}", path.display())]
    Open {
        /// Path that was being opened.
        path: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },
    /// The file length is not a whole number of pages.
    #[error("db file is not a whole number of pages ({len} bytes, page size {page_size}); corrupt file")]
    CorruptFile {
        /// File length in bytes.
        len: u64,
        /// Expected page size.
        page_size: usize,
    },
    /// A page number beyond the pager capacity was requested.
    #[error("tried to fetch page number out of bounds: {page} >= {max_pages}")]
    PageOutOfBounds {
        /// Requested page number.
        page: u32,
        /// Pager capacity in pages.
        max_pages: u32,
    },
    /// Short or failed read/write.
    #[error("IO: {0}")]
    Io(#[from] io::Error),
    /// Flush was requested for a page that was never loaded.
    #[error("tried to flush page {0} which is not resident")]
    PageNotResident(PageId),
    /// A leaf other than the root filled up.
    #[error("splitting non-root leaf page {0} is not implemented")]
    SplitNotImplemented(PageId),
    /// The key is already present in the table.
    #[error("duplicate key {0}")]
    DuplicateKey(u32),
    /// On-disk structures are inconsistent.
    #[error("corruption: {0}")]
    Corruption(&'static str),
    /// A caller supplied an unusable argument.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
