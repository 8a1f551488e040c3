//! Transaction Manager (spec §4.4): timestamp issuance, the MVCC
//! visibility predicate, and the compare-and-swap update/delete protocols
//! built on `table`'s header primitives.

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use common::{BeeDbError, BeeDbResult, RecordId, TableId};
use table::{HeapTable, INFINITY};
use types::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxnState {
    Active,
    Committed,
    Aborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    Update,
    Delete,
}

/// One mutation this transaction has made, recorded so `abort` can undo it
/// and `commit` can finalize its timestamp markers.
#[derive(Clone, Copy, Debug)]
pub struct WriteEntry {
    pub table_id: TableId,
    pub head_rid: RecordId,
    pub copy_rid: Option<RecordId>,
    pub kind: WriteKind,
    /// The timestamp CAS'd away from: `begin_timestamp` for Update,
    /// `end_timestamp` for Delete. `None` for Insert (undo is a tombstone).
    pub prior_timestamp: Option<u64>,
}

/// A tuple this transaction has read, recorded so scans can be replayed or
/// audited (spec §4.5's read-set bookkeeping).
#[derive(Clone, Copy, Debug)]
pub struct ReadEntry {
    pub table_id: TableId,
    pub original_rid: RecordId,
    pub observed_rid: RecordId,
}

#[derive(Debug)]
pub struct Transaction {
    pub id: u64,
    pub state: TxnState,
    pub read_set: Vec<ReadEntry>,
    pub write_set: Vec<WriteEntry>,
}

impl Transaction {
    pub fn begin_timestamp(&self) -> u64 {
        self.id
    }

    pub fn record_read(&mut self, table_id: TableId, original_rid: RecordId, observed_rid: RecordId) {
        self.read_set.push(ReadEntry {
            table_id,
            original_rid,
            observed_rid,
        });
    }

    /// A closure suitable for `HeapTable::read_rows`'s visibility parameter,
    /// bound to this transaction via `manager`.
    pub fn visibility<'a>(&'a self, manager: &'a TransactionManager) -> impl Fn(u64, u64) -> bool + 'a {
        move |begin_ts, end_ts| manager.is_visible(self, begin_ts, end_ts)
    }
}

/// Lets `commit`/`abort` reach the tables named in a transaction's write set
/// without `txn` depending on `catalog` or `database`.
pub trait TableLookup {
    fn table_mut(&mut self, table_id: TableId) -> Option<&mut HeapTable>;
}

pub struct TransactionManager {
    next_id: AtomicU64,
    active: Mutex<HashSet<u64>>,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            active: Mutex::new(HashSet::new()),
        }
    }

    pub fn begin(&self) -> Transaction {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.active.lock().unwrap().insert(id);
        tracing::info!(txn_id = id, "began");
        Transaction {
            id,
            state: TxnState::Active,
            read_set: Vec::new(),
            write_set: Vec::new(),
        }
    }

    /// A timestamp is "committed" once it no longer names an in-flight
    /// transaction — either it was never a transaction id (already a
    /// finalized commit timestamp) or its owning transaction has committed
    /// and been dropped from the active set.
    fn is_committed(&self, timestamp: u64) -> bool {
        !self.active.lock().unwrap().contains(&timestamp)
    }

    pub fn is_visible(&self, txn: &Transaction, begin_ts: u64, end_ts: u64) -> bool {
        if begin_ts == INFINITY {
            return false;
        }
        if begin_ts == txn.id {
            return end_ts != txn.id;
        }
        self.is_committed(begin_ts) && begin_ts < txn.id && (end_ts == INFINITY || txn.id < end_ts)
    }

    fn conflicts(&self, txn: &Transaction, begin_ts: u64, end_ts: u64) -> bool {
        let begin_is_foreign_uncommitted = begin_ts != txn.id && !self.is_committed(begin_ts);
        let end_is_foreign_uncommitted =
            end_ts != INFINITY && end_ts != txn.id && !self.is_committed(end_ts);
        begin_is_foreign_uncommitted || end_is_foreign_uncommitted
    }

    /// Update protocol (spec §4.4): copy the current version to the
    /// time-travel chain, CAS the head's begin timestamp to this
    /// transaction, link the chain, then overwrite the head's columns.
    ///
    /// The prose names four steps and never says when the time-travel
    /// copy's end timestamp is set; left at `INFINITY` it would stay
    /// visible to every future reader forever. This CASes the copy's end
    /// timestamp to `txn.id` right after copying, before the head's begin
    /// timestamp moves — the same moment the row logically stops being "the
    /// current version" — which keeps `is_visible`'s clause 3 correct for
    /// readers whose snapshot starts after this transaction.
    pub fn update(
        &self,
        txn: &mut Transaction,
        table_id: TableId,
        table: &mut HeapTable,
        head_rid: RecordId,
        new_values: &[Value],
    ) -> BeeDbResult<()> {
        let header = table.read_header(head_rid)?;
        if self.conflicts(txn, header.begin_timestamp, header.end_timestamp) {
            return Err(BeeDbError::WriteWriteConflict(head_rid));
        }

        let copy_rid = table.copy_to_time_travel(head_rid)?;
        if !table.try_cas_end_timestamp(copy_rid, header.end_timestamp, txn.id)? {
            table.remove(copy_rid)?;
            return Err(BeeDbError::WriteWriteConflict(head_rid));
        }
        if !table.try_cas_begin_timestamp(head_rid, header.begin_timestamp, txn.id)? {
            table.remove(copy_rid)?;
            return Err(BeeDbError::WriteWriteConflict(head_rid));
        }
        table.set_next_in_chain(head_rid, copy_rid)?;
        table.update_in_place(head_rid, new_values)?;

        txn.write_set.push(WriteEntry {
            table_id,
            head_rid,
            copy_rid: Some(copy_rid),
            kind: WriteKind::Update,
            prior_timestamp: Some(header.begin_timestamp),
        });
        Ok(())
    }

    /// Delete protocol (spec §4.4): identical conflict check, but the CAS
    /// targets `end_timestamp` and there is no time-travel copy — the
    /// tuple's old bytes remain readable in place for snapshots that began
    /// before this transaction.
    pub fn delete(
        &self,
        txn: &mut Transaction,
        table_id: TableId,
        table: &mut HeapTable,
        head_rid: RecordId,
    ) -> BeeDbResult<()> {
        let header = table.read_header(head_rid)?;
        if self.conflicts(txn, header.begin_timestamp, header.end_timestamp) {
            return Err(BeeDbError::WriteWriteConflict(head_rid));
        }
        if !table.try_cas_end_timestamp(head_rid, header.end_timestamp, txn.id)? {
            return Err(BeeDbError::WriteWriteConflict(head_rid));
        }
        txn.write_set.push(WriteEntry {
            table_id,
            head_rid,
            copy_rid: None,
            kind: WriteKind::Delete,
            prior_timestamp: Some(header.end_timestamp),
        });
        Ok(())
    }

    /// Record a fresh insert (already written by `HeapTable::append` with
    /// `begin_timestamp = txn.id`) into the write set.
    pub fn record_insert(&self, txn: &mut Transaction, table_id: TableId, rid: RecordId) {
        txn.write_set.push(WriteEntry {
            table_id,
            head_rid: rid,
            copy_rid: None,
            kind: WriteKind::Insert,
            prior_timestamp: None,
        });
    }

    /// Validation here is just "did every CAS in the write set already
    /// succeed" — this model enforces write-write conflicts eagerly at
    /// operation time (see `update`/`delete`), so by the time a transaction
    /// reaches commit there is nothing left to validate; finalizing means
    /// replacing its id with a real commit timestamp everywhere it appears.
    pub fn commit(&self, txn: &mut Transaction, tables: &mut dyn TableLookup) -> BeeDbResult<bool> {
        let commit_ts = self.next_id.fetch_add(1, Ordering::SeqCst);
        for entry in &txn.write_set {
            let table = tables.table_mut(entry.table_id).ok_or_else(|| {
                BeeDbError::InvariantViolation(format!("unknown table {:?} in write set", entry.table_id))
            })?;
            match entry.kind {
                WriteKind::Insert | WriteKind::Update => {
                    table.try_cas_begin_timestamp(entry.head_rid, txn.id, commit_ts)?;
                }
                WriteKind::Delete => {
                    table.try_cas_end_timestamp(entry.head_rid, txn.id, commit_ts)?;
                }
            }
            if let Some(copy_rid) = entry.copy_rid {
                table.try_cas_end_timestamp(copy_rid, txn.id, commit_ts)?;
            }
        }
        self.active.lock().unwrap().remove(&txn.id);
        txn.state = TxnState::Committed;
        tracing::info!(txn_id = txn.id, commit_ts, "ended, success");
        Ok(true)
    }

    pub fn abort(&self, txn: &mut Transaction, tables: &mut dyn TableLookup) -> BeeDbResult<()> {
        for entry in txn.write_set.iter().rev() {
            let table = tables.table_mut(entry.table_id).ok_or_else(|| {
                BeeDbError::InvariantViolation(format!("unknown table {:?} in write set", entry.table_id))
            })?;
            match entry.kind {
                WriteKind::Insert => {
                    table.remove(entry.head_rid)?;
                }
                WriteKind::Update => {
                    if let Some(prior) = entry.prior_timestamp {
                        table.try_cas_begin_timestamp(entry.head_rid, txn.id, prior)?;
                    }
                    if let Some(copy_rid) = entry.copy_rid {
                        table.remove(copy_rid)?;
                    }
                }
                WriteKind::Delete => {
                    if let Some(prior) = entry.prior_timestamp {
                        table.try_cas_end_timestamp(entry.head_rid, txn.id, prior)?;
                    }
                }
            }
        }
        self.active.lock().unwrap().remove(&txn.id);
        txn.state = TxnState::Aborted;
        tracing::info!(txn_id = txn.id, "ended, aborted");
        Ok(())
    }
}
