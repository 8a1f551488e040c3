//! Fixed-size MVCC metadata prepended to every tuple's encoded row bytes
//! (spec §4.3/§4.4): begin/end timestamps plus the two record pointers
//! (`original_rid`, `next_in_chain`) that stitch together a version chain.

use common::{PageId, RecordId, INVALID_RID};

/// "This version is still live" — the end-timestamp of a head version that
/// hasn't been deleted.
pub const INFINITY: u64 = u64::MAX;

pub const HEADER_LEN: usize = 8 + 8 + 6 + 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MvccHeader {
    pub begin_timestamp: u64,
    pub end_timestamp: u64,
    pub original_rid: RecordId,
    pub next_in_chain: RecordId,
}

impl MvccHeader {
    pub fn new_head(begin_timestamp: u64, original_rid: RecordId) -> Self {
        Self {
            begin_timestamp,
            end_timestamp: INFINITY,
            original_rid,
            next_in_chain: INVALID_RID,
        }
    }

    pub fn encode(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), HEADER_LEN);
        out[0..8].copy_from_slice(&self.begin_timestamp.to_le_bytes());
        out[8..16].copy_from_slice(&self.end_timestamp.to_le_bytes());
        encode_rid(self.original_rid, &mut out[16..22]);
        encode_rid(self.next_in_chain, &mut out[22..28]);
    }

    pub fn decode(bytes: &[u8]) -> Self {
        debug_assert_eq!(bytes.len(), HEADER_LEN);
        Self {
            begin_timestamp: u64::from_le_bytes(bytes[0..8].try_into().unwrap()),
            end_timestamp: u64::from_le_bytes(bytes[8..16].try_into().unwrap()),
            original_rid: decode_rid(&bytes[16..22]),
            next_in_chain: decode_rid(&bytes[22..28]),
        }
    }
}

fn encode_rid(rid: RecordId, out: &mut [u8]) {
    out[0..4].copy_from_slice(&rid.page_id.0.to_le_bytes());
    out[4..6].copy_from_slice(&rid.slot.to_le_bytes());
}

fn decode_rid(bytes: &[u8]) -> RecordId {
    RecordId {
        page_id: PageId(u32::from_le_bytes(bytes[0..4].try_into().unwrap())),
        slot: u16::from_le_bytes(bytes[4..6].try_into().unwrap()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let rid = RecordId {
            page_id: PageId(7),
            slot: 3,
        };
        let header = MvccHeader {
            begin_timestamp: 42,
            end_timestamp: INFINITY,
            original_rid: rid,
            next_in_chain: INVALID_RID,
        };
        let mut buf = [0u8; HEADER_LEN];
        header.encode(&mut buf);
        assert_eq!(MvccHeader::decode(&buf), header);
    }
}
