use std::collections::HashMap;

use common::{ReplacementStrategyKind, TableId};
use table::HeapTable;
use tempfile::tempdir;
use types::{SqlType, Value};

use super::*;

struct Tables(HashMap<TableId, HeapTable>);

impl TableLookup for Tables {
    fn table_mut(&mut self, table_id: TableId) -> Option<&mut HeapTable> {
        self.0.get_mut(&table_id)
    }
}

fn one_table(dir: &std::path::Path) -> (TableId, Tables) {
    let table = HeapTable::open(
        &dir.join("t.tbl"),
        8,
        ReplacementStrategyKind::Clock,
        vec![SqlType::Int64],
    )
    .unwrap();
    let id = TableId(1);
    let mut map = HashMap::new();
    map.insert(id, table);
    (id, Tables(map))
}

#[test]
fn read_your_own_writes_is_visible() {
    let dir = tempdir().unwrap();
    let (table_id, mut tables) = one_table(dir.path());
    let mgr = TransactionManager::new();
    let mut txn = mgr.begin();

    let rid = tables
        .0
        .get_mut(&table_id)
        .unwrap()
        .append(txn.id, &[Value::Int64(1)])
        .unwrap();
    mgr.record_insert(&mut txn, table_id, rid);

    let header = tables.0.get_mut(&table_id).unwrap().read_header(rid).unwrap();
    assert!(mgr.is_visible(&txn, header.begin_timestamp, header.end_timestamp));
}

#[test]
fn uncommitted_insert_is_invisible_to_other_transactions() {
    let dir = tempdir().unwrap();
    let (table_id, mut tables) = one_table(dir.path());
    let mgr = TransactionManager::new();
    let mut writer = mgr.begin();
    let reader = mgr.begin();

    let rid = tables
        .0
        .get_mut(&table_id)
        .unwrap()
        .append(writer.id, &[Value::Int64(1)])
        .unwrap();
    mgr.record_insert(&mut writer, table_id, rid);

    let header = tables.0.get_mut(&table_id).unwrap().read_header(rid).unwrap();
    assert!(!mgr.is_visible(&reader, header.begin_timestamp, header.end_timestamp));
}

#[test]
fn commit_finalizes_timestamp_and_makes_row_visible_to_later_readers() {
    let dir = tempdir().unwrap();
    let (table_id, mut tables) = one_table(dir.path());
    let mgr = TransactionManager::new();
    let mut writer = mgr.begin();

    let rid = tables
        .0
        .get_mut(&table_id)
        .unwrap()
        .append(writer.id, &[Value::Int64(7)])
        .unwrap();
    mgr.record_insert(&mut writer, table_id, rid);
    assert!(mgr.commit(&mut writer, &mut tables).unwrap());
    assert_eq!(writer.state, TxnState::Committed);

    let reader = mgr.begin();
    let header = tables.0.get_mut(&table_id).unwrap().read_header(rid).unwrap();
    assert!(mgr.is_visible(&reader, header.begin_timestamp, header.end_timestamp));
}

#[test]
fn abort_undoes_insert() {
    let dir = tempdir().unwrap();
    let (table_id, mut tables) = one_table(dir.path());
    let mgr = TransactionManager::new();
    let mut writer = mgr.begin();

    let rid = tables
        .0
        .get_mut(&table_id)
        .unwrap()
        .append(writer.id, &[Value::Int64(1)])
        .unwrap();
    mgr.record_insert(&mut writer, table_id, rid);
    mgr.abort(&mut writer, &mut tables).unwrap();
    assert_eq!(writer.state, TxnState::Aborted);

    let reader = mgr.begin();
    let head = tables.0.get_mut(&table_id).unwrap().main_chain_head().unwrap();
    let (rows, extra) = tables
        .0
        .get_mut(&table_id)
        .unwrap()
        .read_rows(head, &reader.visibility(&mgr))
        .unwrap();
    tables.0.get_mut(&table_id).unwrap().unpin_extra(&extra).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn update_preserves_old_version_for_earlier_readers() {
    let dir = tempdir().unwrap();
    let (table_id, mut tables) = one_table(dir.path());
    let mgr = TransactionManager::new();

    let mut writer1 = mgr.begin();
    let rid = tables
        .0
        .get_mut(&table_id)
        .unwrap()
        .append(writer1.id, &[Value::Int64(1)])
        .unwrap();
    mgr.record_insert(&mut writer1, table_id, rid);
    mgr.commit(&mut writer1, &mut tables).unwrap();

    let old_reader = mgr.begin();

    let mut writer2 = mgr.begin();
    mgr.update(
        &mut writer2,
        table_id,
        tables.0.get_mut(&table_id).unwrap(),
        rid,
        &[Value::Int64(2)],
    )
    .unwrap();
    mgr.commit(&mut writer2, &mut tables).unwrap();

    let new_reader = mgr.begin();

    let head = tables.0.get_mut(&table_id).unwrap().main_chain_head().unwrap();
    let (old_rows, extra) = tables
        .0
        .get_mut(&table_id)
        .unwrap()
        .read_rows(head, &old_reader.visibility(&mgr))
        .unwrap();
    tables.0.get_mut(&table_id).unwrap().unpin_extra(&extra).unwrap();
    assert_eq!(old_rows[0].clone().into_values(), vec![Value::Int64(1)]);

    let (new_rows, extra) = tables
        .0
        .get_mut(&table_id)
        .unwrap()
        .read_rows(head, &new_reader.visibility(&mgr))
        .unwrap();
    tables.0.get_mut(&table_id).unwrap().unpin_extra(&extra).unwrap();
    assert_eq!(new_rows[0].clone().into_values(), vec![Value::Int64(2)]);
}

#[test]
fn concurrent_update_raises_write_write_conflict() {
    let dir = tempdir().unwrap();
    let (table_id, mut tables) = one_table(dir.path());
    let mgr = TransactionManager::new();

    let mut writer1 = mgr.begin();
    let rid = tables
        .0
        .get_mut(&table_id)
        .unwrap()
        .append(writer1.id, &[Value::Int64(1)])
        .unwrap();
    mgr.record_insert(&mut writer1, table_id, rid);
    mgr.commit(&mut writer1, &mut tables).unwrap();

    let mut txn_a = mgr.begin();
    let mut txn_b = mgr.begin();
    mgr.update(
        &mut txn_a,
        table_id,
        tables.0.get_mut(&table_id).unwrap(),
        rid,
        &[Value::Int64(2)],
    )
    .unwrap();

    let err = mgr
        .update(
            &mut txn_b,
            table_id,
            tables.0.get_mut(&table_id).unwrap(),
            rid,
            &[Value::Int64(3)],
        )
        .unwrap_err();
    assert!(matches!(err, BeeDbError::WriteWriteConflict(_)));
}

#[test]
fn delete_then_commit_hides_row_from_future_readers() {
    let dir = tempdir().unwrap();
    let (table_id, mut tables) = one_table(dir.path());
    let mgr = TransactionManager::new();

    let mut writer1 = mgr.begin();
    let rid = tables
        .0
        .get_mut(&table_id)
        .unwrap()
        .append(writer1.id, &[Value::Int64(1)])
        .unwrap();
    mgr.record_insert(&mut writer1, table_id, rid);
    mgr.commit(&mut writer1, &mut tables).unwrap();

    let mut deleter = mgr.begin();
    mgr.delete(
        &mut deleter,
        table_id,
        tables.0.get_mut(&table_id).unwrap(),
        rid,
    )
    .unwrap();
    mgr.commit(&mut deleter, &mut tables).unwrap();

    let reader = mgr.begin();
    let head = tables.0.get_mut(&table_id).unwrap().main_chain_head().unwrap();
    let (rows, extra) = tables
        .0
        .get_mut(&table_id)
        .unwrap()
        .read_rows(head, &reader.visibility(&mgr))
        .unwrap();
    tables.0.get_mut(&table_id).unwrap().unpin_extra(&extra).unwrap();
    assert!(rows.is_empty());
}
