//! Slotted record page layout, adapted from the storage crate's original
//! (pre-split) page format: an 8-byte header, a forward-growing slot
//! directory, and tuple bytes packed backward from the end of the page.

use common::{BeeDbError, BeeDbResult, PageId, INVALID_PAGE_ID};
use storage::PAGE_SIZE;

const HEADER_LEN: usize = 8;
const SLOT_LEN: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct PageHeader {
    pub num_slots: u16,
    pub free_offset: u16,
    pub next_page_id: PageId,
}

impl PageHeader {
    fn encode(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.num_slots.to_le_bytes());
        out[2..4].copy_from_slice(&self.free_offset.to_le_bytes());
        out[4..8].copy_from_slice(&self.next_page_id.0.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            num_slots: u16::from_le_bytes(bytes[0..2].try_into().unwrap()),
            free_offset: u16::from_le_bytes(bytes[2..4].try_into().unwrap()),
            next_page_id: PageId(u32::from_le_bytes(bytes[4..8].try_into().unwrap())),
        }
    }
}

impl Default for PageHeader {
    fn default() -> Self {
        Self {
            num_slots: 0,
            free_offset: PAGE_SIZE as u16,
            next_page_id: INVALID_PAGE_ID,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    offset: u16,
    len: u16,
}

impl Slot {
    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn encode(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.offset.to_le_bytes());
        out[2..4].copy_from_slice(&self.len.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            offset: u16::from_le_bytes(bytes[0..2].try_into().unwrap()),
            len: u16::from_le_bytes(bytes[2..4].try_into().unwrap()),
        }
    }
}

/// A view over a page's raw bytes that understands the slotted layout.
/// Borrows a frame's bytes for the duration of one record operation.
pub struct RecordPage<'a> {
    pub data: &'a mut [u8; PAGE_SIZE],
}

impl<'a> RecordPage<'a> {
    pub fn new(data: &'a mut [u8; PAGE_SIZE]) -> Self {
        Self { data }
    }

    /// Initialize a freshly allocated page's header.
    pub fn init(data: &mut [u8; PAGE_SIZE]) {
        PageHeader::default().encode(&mut data[..HEADER_LEN]);
    }

    pub fn header(&self) -> PageHeader {
        PageHeader::decode(&self.data[..HEADER_LEN])
    }

    fn write_header(&mut self, header: &PageHeader) {
        header.encode(&mut self.data[..HEADER_LEN]);
    }

    pub fn set_next_page_id(&mut self, next: PageId) {
        let mut header = self.header();
        header.next_page_id = next;
        self.write_header(&header);
    }

    fn slot_offset(idx: u16) -> usize {
        HEADER_LEN + idx as usize * SLOT_LEN
    }

    fn read_slot(&self, idx: u16) -> BeeDbResult<Slot> {
        let start = Self::slot_offset(idx);
        let header = self.header();
        if idx >= header.num_slots {
            return Err(BeeDbError::InvariantViolation(format!(
                "slot {idx} out of bounds ({} slots)",
                header.num_slots
            )));
        }
        Ok(Slot::decode(&self.data[start..start + SLOT_LEN]))
    }

    fn write_slot(&mut self, idx: u16, slot: &Slot) {
        let start = Self::slot_offset(idx);
        slot.encode(&mut self.data[start..start + SLOT_LEN]);
    }

    fn free_space(&self) -> usize {
        let header = self.header();
        let slots_end = HEADER_LEN + header.num_slots as usize * SLOT_LEN;
        (header.free_offset as usize).saturating_sub(slots_end)
    }

    pub fn can_fit(&self, payload_len: usize) -> bool {
        self.free_space() >= payload_len + SLOT_LEN
    }

    /// Append `bytes` as a new slot, returning its slot index.
    pub fn append(&mut self, bytes: &[u8]) -> BeeDbResult<u16> {
        let mut header = self.header();
        if header.num_slots == u16::MAX {
            return Err(BeeDbError::InvariantViolation("slot index overflow".into()));
        }
        if !self.can_fit(bytes.len()) {
            return Err(BeeDbError::InvariantViolation("page full".into()));
        }
        let slot_idx = header.num_slots;
        let len = bytes.len() as u16;
        let new_free_offset = header.free_offset - len;
        self.data[new_free_offset as usize..header.free_offset as usize].copy_from_slice(bytes);

        self.write_slot(slot_idx, &Slot { offset: new_free_offset, len });

        header.num_slots += 1;
        header.free_offset = new_free_offset;
        self.write_header(&header);
        Ok(slot_idx)
    }

    pub fn read(&self, slot_idx: u16) -> BeeDbResult<&[u8]> {
        let slot = self.read_slot(slot_idx)?;
        if slot.is_empty() {
            return Err(BeeDbError::InvariantViolation(format!(
                "slot {slot_idx} is empty"
            )));
        }
        let start = slot.offset as usize;
        Ok(&self.data[start..start + slot.len as usize])
    }

    /// Overwrite a live slot's bytes with `bytes` of the *same* length.
    pub fn overwrite(&mut self, slot_idx: u16, bytes: &[u8]) -> BeeDbResult<()> {
        let slot = self.read_slot(slot_idx)?;
        if slot.is_empty() {
            return Err(BeeDbError::InvariantViolation(format!(
                "slot {slot_idx} is empty"
            )));
        }
        if bytes.len() != slot.len as usize {
            return Err(BeeDbError::InvariantViolation(format!(
                "in-place write changes slot {slot_idx} length ({} -> {})",
                slot.len,
                bytes.len()
            )));
        }
        let start = slot.offset as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Mark a slot's length zero — a tombstone. Space is not reclaimed.
    pub fn remove(&mut self, slot_idx: u16) -> BeeDbResult<()> {
        let mut slot = self.read_slot(slot_idx)?;
        slot.len = 0;
        self.write_slot(slot_idx, &slot);
        Ok(())
    }

    pub fn live_slots(&self) -> BeeDbResult<Vec<u16>> {
        let header = self.header();
        let mut slots = Vec::new();
        for idx in 0..header.num_slots {
            if !self.read_slot(idx)?.is_empty() {
                slots.push(idx);
            }
        }
        Ok(slots)
    }
}
