use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::primitives::io::{FileIo, StdFileIo};
use crate::types::{PageId, Result, StoreError};

/// Default capacity of the page cache, in pages.
pub const DEFAULT_MAX_PAGES: u32 = 100;

/// Configuration options for the pager.
#[derive(Clone, Debug)]
pub struct PagerOptions {
    /// Highest page count the table may reach; page numbers must stay below it.
    pub max_pages: u32,
}

impl Default for PagerOptions {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Counters describing the cache since the pager was opened.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PagerStats {
    /// Size of each page in bytes.
    pub page_size: usize,
    /// Pages the table currently spans.
    pub page_count: u32,
    /// Capacity in pages.
    pub max_pages: u32,
    /// Pages held in memory.
    pub resident_pages: usize,
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that faulted a page in.
    pub misses: u64,
    /// Faults that read an existing page from the file.
    pub disk_reads: u64,
    /// Pages written back to the file.
    pub flushes: u64,
}

/// Owns the table file and every page read from or allocated in it.
///
/// Pages are faulted in on first access and stay resident until [`Pager::close`],
/// which writes all of them back in page order. Nothing is written before that.
pub struct Pager {
    io: Box<dyn FileIo>,
    page_size: usize,
    file_length: u64,
    num_pages: u32,
    max_pages: u32,
    pages: BTreeMap<PageId, Box<[u8]>>,
    stats: PagerStats,
}

impl Pager {
    /// Opens or creates the file at `path`.
    pub fn open(path: impl AsRef<Path>, page_size: usize, options: PagerOptions) -> Result<Self> {
        let path = path.as_ref();
        let io = StdFileIo::open(path)?;
        let pager = Self::with_io(Box::new(io), page_size, options)?;
        info!(
            path = %path.display(),
            pages = pager.num_pages,
            "pager.open"
        );
        Ok(pager)
    }

    /// Builds a pager over an existing I/O handle.
    pub fn with_io(io: Box<dyn FileIo>, page_size: usize, options: PagerOptions) -> Result<Self> {
        if page_size == 0 {
            return Err(StoreError::Invalid("page size must be non-zero"));
        }
        let file_length = io.len()?;
        if file_length % page_size as u64 != 0 {
            return Err(StoreError::CorruptFile {
                len: file_length,
                page_size,
            });
        }
        let num_pages = u32::try_from(file_length / page_size as u64)
            .map_err(|_| StoreError::Corruption("page count exceeds u32"))?;
        Ok(Self {
            io,
            page_size,
            file_length,
            num_pages,
            max_pages: options.max_pages,
            pages: BTreeMap::new(),
            stats: PagerStats::default(),
        })
    }

    /// Returns the resident buffer for `id`, loading or allocating it on a miss.
    pub fn get_page(&mut self, id: PageId) -> Result<&mut [u8]> {
        if id.0 >= self.max_pages {
            return Err(StoreError::PageOutOfBounds {
                page: id.0,
                max_pages: self.max_pages,
            });
        }
        match self.pages.entry(id) {
            Entry::Occupied(entry) => {
                self.stats.hits += 1;
                Ok(&mut entry.into_mut()[..])
            }
            Entry::Vacant(entry) => {
                self.stats.misses += 1;
                let mut buf = vec![0u8; self.page_size].into_boxed_slice();
                let pages_on_disk = self.file_length / self.page_size as u64;
                let from_disk = u64::from(id.0) < pages_on_disk;
                if from_disk {
                    self.io.read_at(id.offset(self.page_size), &mut buf)?;
                    self.stats.disk_reads += 1;
                }
                if id.0 >= self.num_pages {
                    self.num_pages = id.0 + 1;
                }
                debug!(page = id.0, from_disk, "pager.fault");
                Ok(&mut entry.insert(buf)[..])
            }
        }
    }

    /// Page number the next allocation will use. Pages are never reused.
    pub fn next_unused_page(&self) -> PageId {
        PageId(self.num_pages)
    }

    /// Fails unless `extra` more pages can be allocated within capacity.
    pub fn ensure_capacity(&self, extra: u32) -> Result<()> {
        if extra == 0 {
            return Ok(());
        }
        let last = u64::from(self.num_pages) + u64::from(extra) - 1;
        if last >= u64::from(self.max_pages) {
            return Err(StoreError::PageOutOfBounds {
                page: u32::try_from(last).unwrap_or(u32::MAX),
                max_pages: self.max_pages,
            });
        }
        Ok(())
    }

    /// Writes resident page `id` to its slot in the file.
    pub fn flush(&mut self, id: PageId) -> Result<()> {
        let buf = self
            .pages
            .get(&id)
            .ok_or(StoreError::PageNotResident(id))?;
        let offset = id.offset(self.page_size);
        self.io.write_at(offset, buf)?;
        self.file_length = self.file_length.max(offset + self.page_size as u64);
        self.stats.flushes += 1;
        debug!(page = id.0, "pager.flush");
        Ok(())
    }

    /// Flushes every resident page in ascending page order and releases the file.
    pub fn close(mut self) -> Result<()> {
        let ids: Vec<PageId> = self.pages.keys().copied().collect();
        for id in &ids {
            self.flush(*id)?;
        }
        self.pages.clear();
        info!(
            flushed = ids.len(),
            pages = self.num_pages,
            "pager.close"
        );
        Ok(())
    }

    /// Pages the table spans, including allocated pages not yet written.
    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Capacity in pages.
    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Size of each page in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Whether `id` has been faulted in.
    pub fn is_resident(&self, id: PageId) -> bool {
        self.pages.contains_key(&id)
    }

    /// Current cache counters.
    pub fn stats(&self) -> PagerStats {
        PagerStats {
            page_size: self.page_size,
            page_count: self.num_pages,
            max_pages: self.max_pages,
            resident_pages: self.pages.len(),
            ..self.stats.clone()
        }
    }
}

impl Drop for Pager {
    fn drop(&mut self) {
        if !self.pages.is_empty() {
            warn!(
                resident = self.pages.len(),
                "pager.dropped_without_close"
            );
        }
    }
}
