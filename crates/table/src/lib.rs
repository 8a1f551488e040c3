//! Table Disk Manager (spec §4.3): slotted record pages, MVCC metadata
//! encoding, and the main/time-travel page chains built on top of
//! `buffer`'s pin/unpin pool.

mod codec;
mod mvcc;
mod page;

pub use codec::{decode_row, encode_row, encoded_row_len};
pub use mvcc::{MvccHeader, INFINITY};

use std::path::Path;

use buffer::BufferPool;
use common::{
    BeeDbError, BeeDbResult, PageId, ReplacementStrategyKind, RecordId, Row, INVALID_PAGE_ID,
    INVALID_RID,
};
use page::RecordPage;
use storage::PAGE_SIZE;
use types::{SqlType, Value};

/// One table's backing file: a pin/unpin buffer pool plus the two page
/// chains (main and time-travel) whose heads live in a reserved meta page.
pub struct HeapTable {
    schema: Vec<SqlType>,
    pool: BufferPool,
}

impl HeapTable {
    pub fn open(
        path: &Path,
        buffer_frames: usize,
        replacement: ReplacementStrategyKind,
        schema: Vec<SqlType>,
    ) -> BeeDbResult<Self> {
        let mut pool = BufferPool::open(path, buffer_frames, replacement)?;
        if pool.page_count() == 0 {
            let meta_id = pool.allocate_page()?;
            debug_assert_eq!(meta_id, PageId(0));
            let idx = pool.pin(meta_id)?;
            write_meta(pool.frame_mut(idx).data.as_mut(), INVALID_PAGE_ID, INVALID_PAGE_ID);
            pool.unpin(meta_id, true)?;
        }
        Ok(Self { schema, pool })
    }

    pub fn schema(&self) -> &[SqlType] {
        &self.schema
    }

    fn meta(&mut self) -> BeeDbResult<(PageId, PageId)> {
        let idx = self.pool.pin(PageId(0))?;
        let (main, tt) = read_meta(self.pool.frame(idx).data.as_ref());
        self.pool.unpin(PageId(0), false)?;
        Ok((main, tt))
    }

    fn set_meta(&mut self, main_head: PageId, tt_head: PageId) -> BeeDbResult<()> {
        let idx = self.pool.pin(PageId(0))?;
        write_meta(self.pool.frame_mut(idx).data.as_mut(), main_head, tt_head);
        self.pool.unpin(PageId(0), true)?;
        Ok(())
    }

    pub fn main_chain_head(&mut self) -> BeeDbResult<PageId> {
        Ok(self.meta()?.0)
    }

    /// Follow one link in either chain.
    pub fn next_page(&mut self, page_id: PageId) -> BeeDbResult<PageId> {
        let idx = self.pool.pin(page_id)?;
        let next = RecordPage::new(self.pool.frame_mut(idx).data.as_mut()).header().next_page_id;
        self.pool.unpin(page_id, false)?;
        Ok(next)
    }

    fn allocate_chain_page(&mut self) -> BeeDbResult<PageId> {
        let id = self.pool.allocate_page()?;
        let idx = self.pool.pin(id)?;
        RecordPage::init(self.pool.frame_mut(idx).data.as_mut());
        self.pool.unpin(id, true)?;
        Ok(id)
    }

    fn last_page_of(&mut self, head: PageId) -> BeeDbResult<PageId> {
        let mut current = head;
        loop {
            let next = self.next_page(current)?;
            if !next.is_valid() {
                return Ok(current);
            }
            current = next;
        }
    }

    fn append_to_chain(
        &mut self,
        head: PageId,
        is_main: bool,
        blob: &[u8],
    ) -> BeeDbResult<RecordId> {
        let (mut head, last) = if head.is_valid() {
            (head, self.last_page_of(head)?)
        } else {
            let new_head = self.allocate_chain_page()?;
            (new_head, new_head)
        };
        let target = {
            let idx = self.pool.pin(last)?;
            let fits = RecordPage::new(self.pool.frame_mut(idx).data.as_mut()).can_fit(blob.len());
            self.pool.unpin(last, false)?;
            if fits {
                last
            } else {
                let new_page = self.allocate_chain_page()?;
                let idx = self.pool.pin(last)?;
                RecordPage::new(self.pool.frame_mut(idx).data.as_mut()).set_next_page_id(new_page);
                self.pool.unpin(last, true)?;
                new_page
            }
        };

        let idx = self.pool.pin(target)?;
        let slot = RecordPage::new(self.pool.frame_mut(idx).data.as_mut()).append(blob)?;
        self.pool.unpin(target, true)?;

        if !head.is_valid() {
            head = target;
        }
        let (main, tt) = self.meta()?;
        if is_main && main != head {
            self.set_meta(head, tt)?;
        } else if !is_main && tt != head {
            self.set_meta(main, head)?;
        }

        Ok(RecordId {
            page_id: target,
            slot,
        })
    }

    /// Insert a brand-new tuple at the head of the main chain.
    pub fn append(&mut self, txn_id: u64, row: &[Value]) -> BeeDbResult<RecordId> {
        let row_bytes = encode_row(&self.schema, row)?;
        let (main_head, _) = self.meta()?;

        // Reserve the slot with a placeholder header so we know our own RID
        // before writing the real `original_rid`.
        let mut blob = vec![0u8; mvcc::HEADER_LEN + row_bytes.len()];
        blob[mvcc::HEADER_LEN..].copy_from_slice(&row_bytes);
        let rid = self.append_to_chain(main_head, true, &blob)?;

        let header = MvccHeader::new_head(txn_id, rid);
        let idx = self.pool.pin(rid.page_id)?;
        let mut page = RecordPage::new(self.pool.frame_mut(idx).data.as_mut());
        let mut full = page.read(rid.slot)?.to_vec();
        header.encode(&mut full[..mvcc::HEADER_LEN]);
        page.overwrite(rid.slot, &full)?;
        self.pool.unpin(rid.page_id, true)?;

        Ok(rid)
    }

    /// Copy the current version's bytes onto the time-travel chain.
    pub fn copy_to_time_travel(&mut self, current: RecordId) -> BeeDbResult<RecordId> {
        let blob = self.read_blob(current)?;
        let (_, tt_head) = self.meta()?;
        self.append_to_chain(tt_head, false, &blob)
    }

    /// Tombstone a slot (used to undo a lost time-travel-copy CAS race).
    pub fn remove(&mut self, rid: RecordId) -> BeeDbResult<()> {
        let idx = self.pool.pin(rid.page_id)?;
        RecordPage::new(self.pool.frame_mut(idx).data.as_mut()).remove(rid.slot)?;
        self.pool.unpin(rid.page_id, true)
    }

    fn read_blob(&mut self, rid: RecordId) -> BeeDbResult<Vec<u8>> {
        let idx = self.pool.pin(rid.page_id)?;
        let bytes = RecordPage::new(self.pool.frame_mut(idx).data.as_mut())
            .read(rid.slot)?
            .to_vec();
        self.pool.unpin(rid.page_id, false)?;
        Ok(bytes)
    }

    pub fn read_header(&mut self, rid: RecordId) -> BeeDbResult<MvccHeader> {
        let blob = self.read_blob(rid)?;
        Ok(MvccHeader::decode(&blob[..mvcc::HEADER_LEN]))
    }

    fn write_header(&mut self, rid: RecordId, header: MvccHeader) -> BeeDbResult<()> {
        let idx = self.pool.pin(rid.page_id)?;
        let mut page = RecordPage::new(self.pool.frame_mut(idx).data.as_mut());
        let mut full = page.read(rid.slot)?.to_vec();
        header.encode(&mut full[..mvcc::HEADER_LEN]);
        page.overwrite(rid.slot, &full)?;
        self.pool.unpin(rid.page_id, true)
    }

    pub fn set_next_in_chain(&mut self, rid: RecordId, next: RecordId) -> BeeDbResult<()> {
        let mut header = self.read_header(rid)?;
        header.next_in_chain = next;
        self.write_header(rid, header)
    }

    /// Compare-and-swap the begin timestamp; `false` means someone else won.
    pub fn try_cas_begin_timestamp(
        &mut self,
        rid: RecordId,
        expected: u64,
        new: u64,
    ) -> BeeDbResult<bool> {
        let mut header = self.read_header(rid)?;
        if header.begin_timestamp != expected {
            return Ok(false);
        }
        header.begin_timestamp = new;
        self.write_header(rid, header)?;
        Ok(true)
    }

    /// Compare-and-swap the end timestamp; `false` means someone else won.
    pub fn try_cas_end_timestamp(
        &mut self,
        rid: RecordId,
        expected: u64,
        new: u64,
    ) -> BeeDbResult<bool> {
        let mut header = self.read_header(rid)?;
        if header.end_timestamp != expected {
            return Ok(false);
        }
        header.end_timestamp = new;
        self.write_header(rid, header)?;
        Ok(true)
    }

    /// Overwrite a live row's column bytes in place (same-length guarantee
    /// comes from the fixed-width codec).
    pub fn update_in_place(&mut self, rid: RecordId, new_values: &[Value]) -> BeeDbResult<()> {
        let row_bytes = encode_row(&self.schema, new_values)?;
        let idx = self.pool.pin(rid.page_id)?;
        let mut page = RecordPage::new(self.pool.frame_mut(idx).data.as_mut());
        let mut full = page.read(rid.slot)?.to_vec();
        full[mvcc::HEADER_LEN..].copy_from_slice(&row_bytes);
        page.overwrite(rid.slot, &full)?;
        self.pool.unpin(rid.page_id, true)
    }

    /// Decode every live, visible tuple of `page_id`. Follows `next_in_chain`
    /// through time-travel pages for versions the predicate rejects;
    /// returns the extra pages pinned along the way so the caller can unpin
    /// them once done with the batch.
    pub fn read_rows(
        &mut self,
        page_id: PageId,
        is_visible: &dyn Fn(u64, u64) -> bool,
    ) -> BeeDbResult<(Vec<Row>, Vec<PageId>)> {
        let live_slots = {
            let idx = self.pool.pin(page_id)?;
            let slots = RecordPage::new(self.pool.frame_mut(idx).data.as_mut()).live_slots()?;
            self.pool.unpin(page_id, false)?;
            slots
        };

        let mut rows = Vec::with_capacity(live_slots.len());
        let mut extra_pinned = Vec::new();

        for slot in live_slots {
            let rid = RecordId { page_id, slot };
            let blob = self.read_blob(rid)?;
            let header = MvccHeader::decode(&blob[..mvcc::HEADER_LEN]);

            if is_visible(header.begin_timestamp, header.end_timestamp) {
                let values = decode_row(&self.schema, &blob[mvcc::HEADER_LEN..])?;
                rows.push(Row::with_rid(values, rid));
                continue;
            }

            let mut cursor = header.next_in_chain;
            while cursor != INVALID_RID {
                if !extra_pinned.contains(&cursor.page_id) {
                    self.pool.pin(cursor.page_id)?;
                    extra_pinned.push(cursor.page_id);
                }
                let blob = self.read_blob(cursor)?;
                let header = MvccHeader::decode(&blob[..mvcc::HEADER_LEN]);
                if is_visible(header.begin_timestamp, header.end_timestamp) {
                    let values = decode_row(&self.schema, &blob[mvcc::HEADER_LEN..])?;
                    rows.push(Row::with_rid(values, cursor));
                    break;
                }
                cursor = header.next_in_chain;
            }
        }

        Ok((rows, extra_pinned))
    }

    /// Point lookup: decode the visible version reachable from `rid`,
    /// walking `next_in_chain` the same way `read_rows` does for a batch.
    pub fn read_row(
        &mut self,
        rid: RecordId,
        is_visible: &dyn Fn(u64, u64) -> bool,
    ) -> BeeDbResult<Option<Row>> {
        let blob = self.read_blob(rid)?;
        let header = MvccHeader::decode(&blob[..mvcc::HEADER_LEN]);
        if is_visible(header.begin_timestamp, header.end_timestamp) {
            let values = decode_row(&self.schema, &blob[mvcc::HEADER_LEN..])?;
            return Ok(Some(Row::with_rid(values, rid)));
        }

        let mut cursor = header.next_in_chain;
        while cursor != INVALID_RID {
            let blob = self.read_blob(cursor)?;
            let header = MvccHeader::decode(&blob[..mvcc::HEADER_LEN]);
            if is_visible(header.begin_timestamp, header.end_timestamp) {
                let values = decode_row(&self.schema, &blob[mvcc::HEADER_LEN..])?;
                return Ok(Some(Row::with_rid(values, cursor)));
            }
            cursor = header.next_in_chain;
        }
        Ok(None)
    }

    pub fn unpin_extra(&mut self, pages: &[PageId]) -> BeeDbResult<()> {
        for page in pages {
            self.pool.unpin(*page, false)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> BeeDbResult<()> {
        self.pool.flush()
    }
}

fn write_meta(data: &mut [u8; PAGE_SIZE], main_head: PageId, tt_head: PageId) {
    data[0..4].copy_from_slice(&main_head.0.to_le_bytes());
    data[4..8].copy_from_slice(&tt_head.0.to_le_bytes());
}

fn read_meta(data: &[u8; PAGE_SIZE]) -> (PageId, PageId) {
    (
        PageId(u32::from_le_bytes(data[0..4].try_into().unwrap())),
        PageId(u32::from_le_bytes(data[4..8].try_into().unwrap())),
    )
}

pub type TableResult<T> = Result<T, BeeDbError>;
