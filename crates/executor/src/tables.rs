//! Lazily-opened table and index handles, shared for the lifetime of one
//! `Database` (or one test) so repeated statements don't reopen files.

use std::collections::HashMap;

use btree::BTreeIndex;
use catalog::{Catalog, IndexKind};
use common::{BeeDbResult, Config, IndexId, TableId};
use hash::HashIndex;
use table::HeapTable;
use txn::TableLookup;

/// Either backend a catalog index can name (spec §4.1's two index kinds).
pub enum IndexHandle {
    BTree(BTreeIndex),
    Hash(HashIndex),
}

impl IndexHandle {
    pub fn search(&mut self, key: &[types::Value]) -> BeeDbResult<Vec<common::RecordId>> {
        match self {
            IndexHandle::BTree(b) => b.search(key),
            IndexHandle::Hash(h) => h.search(key),
        }
    }

    pub fn insert(&mut self, key: Vec<types::Value>, rid: common::RecordId) -> BeeDbResult<()> {
        match self {
            IndexHandle::BTree(b) => b.insert(key, rid),
            IndexHandle::Hash(h) => h.insert(key, rid),
        }
    }

    pub fn delete(&mut self, key: &[types::Value], rid: common::RecordId) -> BeeDbResult<bool> {
        match self {
            IndexHandle::BTree(b) => b.delete(key, rid),
            IndexHandle::Hash(h) => h.delete(key, rid),
        }
    }

    pub fn range_scan(
        &mut self,
        low: Option<&[types::Value]>,
        high: Option<&[types::Value]>,
    ) -> BeeDbResult<Vec<common::RecordId>> {
        match self {
            IndexHandle::BTree(b) => b.range_scan(low, high),
            IndexHandle::Hash(_) => Err(common::BeeDbError::Executor(
                "range scan requires a BTree index".into(),
            )),
        }
    }

    fn flush(&mut self) -> BeeDbResult<()> {
        match self {
            IndexHandle::BTree(b) => b.flush(),
            IndexHandle::Hash(h) => h.flush(),
        }
    }
}

#[derive(Default)]
pub struct TableCache {
    tables: HashMap<TableId, HeapTable>,
    indexes: HashMap<IndexId, IndexHandle>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(
        &mut self,
        catalog: &Catalog,
        config: &Config,
        table_id: TableId,
    ) -> BeeDbResult<&mut HeapTable> {
        if !self.tables.contains_key(&table_id) {
            let meta = catalog.table_by_id(table_id)?;
            let path = catalog.table_file_path(&meta.name)?;
            let schema = meta.schema.columns.iter().map(|c| c.ty).collect();
            let table = HeapTable::open(&path, config.buffer_pool_frames, config.replacement_strategy, schema)?;
            self.tables.insert(table_id, table);
        }
        Ok(self.tables.get_mut(&table_id).unwrap())
    }

    pub fn index(
        &mut self,
        catalog: &Catalog,
        config: &Config,
        table_id: TableId,
        index_name: &str,
    ) -> BeeDbResult<&mut IndexHandle> {
        let meta = catalog.table_by_id(table_id)?;
        let index_meta = meta.index(index_name)?;
        let id = index_meta.id;
        let kind = index_meta.kind;
        if !self.indexes.contains_key(&id) {
            let path = catalog.index_file_path(&meta.name, index_name)?;
            let handle = if path.exists() {
                match kind {
                    IndexKind::BTree => IndexHandle::BTree(BTreeIndex::open(&path, id)?),
                    IndexKind::Hash => IndexHandle::Hash(HashIndex::open(&path, id)?),
                }
            } else {
                let _ = config;
                match kind {
                    IndexKind::BTree => IndexHandle::BTree(BTreeIndex::create(&path, id)?),
                    IndexKind::Hash => IndexHandle::Hash(HashIndex::create(&path, id)?),
                }
            };
            self.indexes.insert(id, handle);
        }
        Ok(self.indexes.get_mut(&id).unwrap())
    }

    /// Flush every table and index touched by this cache.
    pub fn flush(&mut self) -> BeeDbResult<()> {
        for t in self.tables.values_mut() {
            t.flush()?;
        }
        for i in self.indexes.values_mut() {
            i.flush()?;
        }
        Ok(())
    }
}

impl TableLookup for TableCache {
    fn table_mut(&mut self, table_id: TableId) -> Option<&mut HeapTable> {
        self.tables.get_mut(&table_id)
    }
}
