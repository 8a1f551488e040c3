//! Raw fixed-size page I/O on a single file (spec §4.1 Storage Manager).
//!
//! Deliberately dumb: no slotting, no MVCC, no caching. Those concerns live
//! in `table` and `buffer` respectively, which are built on top of this.

#[cfg(test)]
mod tests;

use std::fs::{File, OpenOptions};
use std::io::{Read as _, Seek, SeekFrom, Write as _};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use common::{BeeDbError, BeeDbResult, PageId};

pub const PAGE_SIZE: usize = 4096;

/// A single fixed-size file backing all pages of a table or index.
///
/// Page ids are dense starting at 0 and never reused; `page_count` is kept
/// in an atomic so concurrent readers can observe it without taking the
/// file lock (writers still serialize through `&mut self`).
#[derive(Debug)]
pub struct PagedFile {
    file: File,
    page_count: AtomicU32,
}

impl PagedFile {
    pub fn open(path: &Path) -> BeeDbResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();
        if len % PAGE_SIZE as u64 != 0 {
            return Err(BeeDbError::InvariantViolation(format!(
                "paged file {} has length {len} not a multiple of page size {PAGE_SIZE}",
                path.display()
            )));
        }
        let page_count = (len / PAGE_SIZE as u64) as u32;
        Ok(Self {
            file,
            page_count: AtomicU32::new(page_count),
        })
    }

    /// Current next id — every allocated page has `id < page_count()`.
    pub fn page_count(&self) -> u32 {
        self.page_count.load(Ordering::SeqCst)
    }

    /// Zero-extend the file by one page and return its id.
    pub fn allocate_page(&mut self) -> BeeDbResult<PageId> {
        let id = self.page_count.load(Ordering::SeqCst);
        let offset = id as u64 * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&[0u8; PAGE_SIZE])?;
        self.file.flush()?;
        self.page_count.store(id + 1, Ordering::SeqCst);
        Ok(PageId(id))
    }

    /// Fill `buffer` with exactly `PAGE_SIZE` bytes read from `page_id`.
    pub fn read(&mut self, page_id: PageId, buffer: &mut [u8; PAGE_SIZE]) -> BeeDbResult<()> {
        if page_id.0 >= self.page_count() {
            return Err(BeeDbError::InvariantViolation(format!(
                "page {} not allocated (page_count={})",
                page_id.0,
                self.page_count()
            )));
        }
        self.file
            .seek(SeekFrom::Start(page_id.0 as u64 * PAGE_SIZE as u64))?;
        self.file.read_exact(buffer)?;
        Ok(())
    }

    /// Write `bytes` (exactly `PAGE_SIZE` long) to `page_id` and flush.
    pub fn write(&mut self, page_id: PageId, bytes: &[u8; PAGE_SIZE]) -> BeeDbResult<()> {
        if page_id.0 >= self.page_count() {
            return Err(BeeDbError::InvariantViolation(format!(
                "page {} not allocated (page_count={})",
                page_id.0,
                self.page_count()
            )));
        }
        self.file
            .seek(SeekFrom::Start(page_id.0 as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(bytes)?;
        self.file.flush()?;
        Ok(())
    }
}
