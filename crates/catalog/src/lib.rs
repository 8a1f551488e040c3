//! System catalog (spec §4's catalog, detailed in §10.7): table and column
//! definitions, index metadata, and table cardinality statistics, all
//! themselves stored as rows in four reserved tables rather than a
//! side-file. The catalog is its own small reader/writer over `table`'s
//! heap files — it sits below `planner`/`executor` in the dependency
//! graph, so it cannot go through the SQL engine to bootstrap itself.


use std::collections::HashMap;
use std::path::{Path, PathBuf};

use common::{BeeDbError, BeeDbResult, ColumnId, IndexId, ReplacementStrategyKind, TableId};
use table::HeapTable;
use types::{SqlType, Value};

const NAME_WIDTH: u16 = 64;
const FILE_NAME_WIDTH: u16 = 128;
const CATALOG_TXN: u64 = 0;
const CATALOG_FRAMES: usize = 4;

fn system_tables_schema() -> Vec<SqlType> {
    vec![SqlType::Int64, SqlType::Char(NAME_WIDTH), SqlType::Char(FILE_NAME_WIDTH)]
}

fn system_columns_schema() -> Vec<SqlType> {
    vec![
        SqlType::Int64,
        SqlType::Int64,
        SqlType::Int32,
        SqlType::Int32,
        SqlType::Char(NAME_WIDTH),
        SqlType::Bool,
    ]
}

fn system_indices_schema() -> Vec<SqlType> {
    vec![
        SqlType::Int64,
        SqlType::Int64,
        SqlType::Int32,
        SqlType::Char(NAME_WIDTH),
        SqlType::Bool,
    ]
}

fn system_statistics_schema() -> Vec<SqlType> {
    vec![SqlType::Int64, SqlType::Int64]
}

fn always_visible(_begin: u64, _end: u64) -> bool {
    true
}

fn encode_type(ty: SqlType) -> (i32, i32) {
    match ty {
        SqlType::Int32 => (0, 0),
        SqlType::Int64 => (1, 0),
        SqlType::Double => (2, 0),
        SqlType::Char(n) => (3, n as i32),
        SqlType::Date => (4, 0),
        SqlType::Bool => (5, 0),
    }
}

fn decode_type(type_id: i32, length: i32) -> BeeDbResult<SqlType> {
    match type_id {
        0 => Ok(SqlType::Int32),
        1 => Ok(SqlType::Int64),
        2 => Ok(SqlType::Double),
        3 => Ok(SqlType::Char(length as u16)),
        4 => Ok(SqlType::Date),
        5 => Ok(SqlType::Bool),
        other => Err(BeeDbError::Catalog(format!("unknown stored type id {other}"))),
    }
}

fn fixed_char(s: &str, width: u16, field: &str) -> BeeDbResult<Value> {
    if s.len() > width as usize {
        return Err(BeeDbError::Catalog(format!(
            "{field} '{s}' exceeds the catalog's {width}-byte limit"
        )));
    }
    Ok(Value::Char(s.to_string()))
}

fn expect_i64(v: &Value) -> i64 {
    match v {
        Value::Int64(n) => *n,
        _ => unreachable!("catalog row has wrong shape"),
    }
}
fn expect_i32(v: &Value) -> i32 {
    match v {
        Value::Int32(n) => *n,
        _ => unreachable!("catalog row has wrong shape"),
    }
}
fn expect_str(v: &Value) -> &str {
    match v {
        Value::Char(s) => s,
        _ => unreachable!("catalog row has wrong shape"),
    }
}
fn expect_bool(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        _ => unreachable!("catalog row has wrong shape"),
    }
}

fn scan_all(table: &mut HeapTable) -> BeeDbResult<Vec<(common::RecordId, Vec<Value>)>> {
    let mut out = Vec::new();
    let mut page = table.main_chain_head()?;
    while page.is_valid() {
        let (rows, extra) = table.read_rows(page, &always_visible)?;
        table.unpin_extra(&extra)?;
        for row in rows {
            let rid = row.rid().expect("scanned row always carries a rid");
            out.push((rid, row.into_values()));
        }
        page = table.next_page(page)?;
    }
    Ok(out)
}

/// Describes a logical column within a table schema.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub global_id: u64,
    pub name: String,
    pub ty: SqlType,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: SqlType, nullable: bool) -> Self {
        Self {
            global_id: 0,
            name: name.into(),
            ty,
            nullable,
        }
    }
}

/// Column layout for a table, along with a name-to-ordinal lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSchema {
    pub columns: Vec<Column>,
    name_to_ordinal: HashMap<String, ColumnId>,
}

impl TableSchema {
    pub fn try_new(columns: Vec<Column>) -> BeeDbResult<Self> {
        if columns.is_empty() {
            return Err(BeeDbError::Catalog("table must contain at least one column".into()));
        }
        if columns.len() > u16::MAX as usize {
            return Err(BeeDbError::Catalog("too many columns for a single table".into()));
        }
        let mut name_to_ordinal = HashMap::new();
        for (idx, column) in columns.iter().enumerate() {
            if name_to_ordinal.insert(column.name.clone(), ColumnId(idx as u16)).is_some() {
                return Err(BeeDbError::Catalog(format!(
                    "duplicate column '{}' found while building schema",
                    column.name
                )));
            }
        }
        Ok(Self { columns, name_to_ordinal })
    }

    pub fn column_index(&self, name: &str) -> Option<ColumnId> {
        self.name_to_ordinal.get(name).copied()
    }

    pub fn column_type(&self, ordinal: ColumnId) -> Option<&SqlType> {
        self.columns.get(ordinal.0 as usize).map(|c| &c.ty)
    }

    pub fn column_types(&self) -> Vec<SqlType> {
        self.columns.iter().map(|c| c.ty).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Supported index implementations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexKind {
    BTree,
    Hash,
}

/// Metadata describing a table index. The persisted schema (spec §10.7's
/// `system_indices`) carries one column per index; `columns` stays a `Vec`
/// to match the in-memory planner vocabulary, but every index created
/// through this catalog today is single-column.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexMeta {
    pub id: IndexId,
    pub name: String,
    pub columns: Vec<ColumnId>,
    pub kind: IndexKind,
    pub unique: bool,
}

/// Metadata describing a registered table.
#[derive(Clone, Debug, PartialEq)]
pub struct TableMeta {
    pub id: TableId,
    pub name: String,
    pub file_name: String,
    pub schema: TableSchema,
    pub indexes: Vec<IndexMeta>,
    pub cardinality: u64,
}

impl TableMeta {
    pub fn index(&self, name: &str) -> BeeDbResult<&IndexMeta> {
        self.indexes
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| BeeDbError::Catalog(format!("index '{name}' does not exist on table '{}'", self.name)))
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.iter().any(|i| i.name == name)
    }

    pub fn indexes(&self) -> &[IndexMeta] {
        &self.indexes
    }
}

/// Persistent catalog backed by the four reserved system tables.
pub struct Catalog {
    dir: PathBuf,
    tables_table: HeapTable,
    columns_table: HeapTable,
    indices_table: HeapTable,
    statistics_table: HeapTable,
    tables: Vec<TableMeta>,
    next_table_id: u64,
    next_index_id: u64,
    next_column_id: u64,
    table_name_index: HashMap<String, usize>,
    table_id_index: HashMap<TableId, usize>,
}

impl Catalog {
    /// Open (or create) the catalog's system tables under `dir` and replay
    /// their rows into memory.
    pub fn open(dir: &Path) -> BeeDbResult<Self> {
        std::fs::create_dir_all(dir)?;
        let tables_table = HeapTable::open(
            &dir.join("system_tables.tbl"),
            CATALOG_FRAMES,
            ReplacementStrategyKind::Clock,
            system_tables_schema(),
        )?;
        let columns_table = HeapTable::open(
            &dir.join("system_columns.tbl"),
            CATALOG_FRAMES,
            ReplacementStrategyKind::Clock,
            system_columns_schema(),
        )?;
        let indices_table = HeapTable::open(
            &dir.join("system_indices.tbl"),
            CATALOG_FRAMES,
            ReplacementStrategyKind::Clock,
            system_indices_schema(),
        )?;
        let statistics_table = HeapTable::open(
            &dir.join("system_statistics.tbl"),
            CATALOG_FRAMES,
            ReplacementStrategyKind::Clock,
            system_statistics_schema(),
        )?;

        let mut catalog = Self {
            dir: dir.to_path_buf(),
            tables_table,
            columns_table,
            indices_table,
            statistics_table,
            tables: Vec::new(),
            next_table_id: 1,
            next_index_id: 1,
            next_column_id: 1,
            table_name_index: HashMap::new(),
            table_id_index: HashMap::new(),
        };
        catalog.reload()?;
        Ok(catalog)
    }

    fn reload(&mut self) -> BeeDbResult<()> {
        let table_rows = scan_all(&mut self.tables_table)?;
        let column_rows = scan_all(&mut self.columns_table)?;
        let index_rows = scan_all(&mut self.indices_table)?;
        let stat_rows = scan_all(&mut self.statistics_table)?;

        let mut tables: Vec<TableMeta> = Vec::with_capacity(table_rows.len());
        let mut max_table_id = 0u64;
        for (_, values) in &table_rows {
            let id = expect_i64(&values[0]) as u64;
            max_table_id = max_table_id.max(id);
            tables.push(TableMeta {
                id: TableId(id),
                name: expect_str(&values[1]).to_string(),
                file_name: expect_str(&values[2]).to_string(),
                schema: TableSchema { columns: Vec::new(), name_to_ordinal: HashMap::new() },
                indexes: Vec::new(),
                cardinality: 0,
            });
        }

        // column_global_id -> (table_id, ordinal within that table in scan order)
        let mut global_to_local: HashMap<u64, (TableId, usize)> = HashMap::new();
        let mut max_column_id = 0u64;
        for (_, values) in &column_rows {
            let global_id = expect_i64(&values[0]) as u64;
            max_column_id = max_column_id.max(global_id);
            let table_id = TableId(expect_i64(&values[1]) as u64);
            let ty = decode_type(expect_i32(&values[2]), expect_i32(&values[3]))?;
            let name = expect_str(&values[4]).to_string();
            let nullable = expect_bool(&values[5]);

            let table = tables
                .iter_mut()
                .find(|t| t.id == table_id)
                .ok_or_else(|| BeeDbError::Catalog(format!("orphan column row for table id {}", table_id.0)))?;
            let ordinal = table.schema.columns.len();
            table.schema.columns.push(Column { global_id, name: name.clone(), ty, nullable });
            table.schema.name_to_ordinal.insert(name, ColumnId(ordinal as u16));
            global_to_local.insert(global_id, (table_id, ordinal));
        }

        let mut max_index_id = 0u64;
        for (_, values) in &index_rows {
            let index_id = expect_i64(&values[0]) as u64;
            max_index_id = max_index_id.max(index_id);
            let column_global_id = expect_i64(&values[1]) as u64;
            let kind = match expect_i32(&values[2]) {
                0 => IndexKind::BTree,
                1 => IndexKind::Hash,
                other => return Err(BeeDbError::Catalog(format!("unknown stored index kind {other}"))),
            };
            let name = expect_str(&values[3]).to_string();
            let unique = expect_bool(&values[4]);

            let (table_id, ordinal) = *global_to_local
                .get(&column_global_id)
                .ok_or_else(|| BeeDbError::Catalog(format!("index '{name}' references unknown column id {column_global_id}")))?;
            let table = tables.iter_mut().find(|t| t.id == table_id).unwrap();
            table.indexes.push(IndexMeta {
                id: IndexId(index_id),
                name,
                columns: vec![ColumnId(ordinal as u16)],
                kind,
                unique,
            });
        }

        for (_, values) in &stat_rows {
            let table_id = TableId(expect_i64(&values[0]) as u64);
            let cardinality = expect_i64(&values[1]) as u64;
            if let Some(table) = tables.iter_mut().find(|t| t.id == table_id) {
                table.cardinality = cardinality;
            }
        }

        self.next_table_id = max_table_id + 1;
        self.next_column_id = max_column_id + 1;
        self.next_index_id = max_index_id + 1;
        self.tables = tables;
        self.rebuild_name_index();
        Ok(())
    }

    fn rebuild_name_index(&mut self) {
        self.table_name_index.clear();
        self.table_id_index.clear();
        for (idx, table) in self.tables.iter().enumerate() {
            self.table_name_index.insert(table.name.clone(), idx);
            self.table_id_index.insert(table.id, idx);
        }
    }

    pub fn table(&self, name: &str) -> BeeDbResult<&TableMeta> {
        let idx = self
            .table_name_index
            .get(name)
            .copied()
            .ok_or_else(|| BeeDbError::Catalog(format!("unknown table '{name}'")))?;
        Ok(&self.tables[idx])
    }

    pub fn table_by_id(&self, id: TableId) -> BeeDbResult<&TableMeta> {
        let idx = self
            .table_id_index
            .get(&id)
            .copied()
            .ok_or_else(|| BeeDbError::Catalog(format!("unknown table id {}", id.0)))?;
        Ok(&self.tables[idx])
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableMeta> {
        self.tables.iter()
    }

    /// Path of the backing heap file for a table, for callers (the executor,
    /// index builders) that need to open it directly.
    pub fn table_file_path(&self, name: &str) -> BeeDbResult<PathBuf> {
        Ok(self.dir.join(&self.table(name)?.file_name))
    }

    /// Path of an index's backing file, for callers that open it directly.
    pub fn index_file_path(&self, table_name: &str, index_name: &str) -> BeeDbResult<PathBuf> {
        let id = self.table(table_name)?.index(index_name)?.id;
        Ok(self.dir.join(format!("index_{}.idx", id.0)))
    }

    pub fn create_table(&mut self, name: &str, columns: Vec<Column>) -> BeeDbResult<TableId> {
        if self.table_name_index.contains_key(name) {
            return Err(BeeDbError::Catalog(format!("table '{name}' already exists")));
        }
        let schema = TableSchema::try_new(columns)?;
        let table_id = TableId(self.next_table_id);
        self.next_table_id += 1;
        let file_name = format!("table_{}.tbl", table_id.0);

        self.tables_table.append(
            CATALOG_TXN,
            &[
                Value::Int64(table_id.0 as i64),
                fixed_char(name, NAME_WIDTH, "table name")?,
                fixed_char(&file_name, FILE_NAME_WIDTH, "file name")?,
            ],
        )?;

        let mut persisted_columns = Vec::with_capacity(schema.columns.len());
        for column in schema.columns {
            let global_id = self.next_column_id;
            self.next_column_id += 1;
            let (type_id, length) = encode_type(column.ty);
            self.columns_table.append(
                CATALOG_TXN,
                &[
                    Value::Int64(global_id as i64),
                    Value::Int64(table_id.0 as i64),
                    Value::Int32(type_id),
                    Value::Int32(length),
                    fixed_char(&column.name, NAME_WIDTH, "column name")?,
                    Value::Bool(column.nullable),
                ],
            )?;
            persisted_columns.push(Column { global_id, ..column });
        }
        self.statistics_table.append(
            CATALOG_TXN,
            &[Value::Int64(table_id.0 as i64), Value::Int64(0)],
        )?;

        let schema = TableSchema::try_new(persisted_columns)?;
        self.tables.push(TableMeta {
            id: table_id,
            name: name.to_string(),
            file_name,
            schema,
            indexes: Vec::new(),
            cardinality: 0,
        });
        self.rebuild_name_index();
        Ok(table_id)
    }

    /// Remove a table's catalog rows. The caller is responsible for deleting
    /// its backing heap file and any index files.
    pub fn drop_table(&mut self, name: &str) -> BeeDbResult<()> {
        let table_id = self.table(name)?.id;
        for (rid, values) in scan_all(&mut self.tables_table)? {
            if expect_i64(&values[0]) as u64 == table_id.0 {
                self.tables_table.remove(rid)?;
            }
        }
        for (rid, values) in scan_all(&mut self.columns_table)? {
            if expect_i64(&values[1]) as u64 == table_id.0 {
                self.columns_table.remove(rid)?;
            }
        }
        for (rid, values) in scan_all(&mut self.indices_table)? {
            let column_global_id = expect_i64(&values[1]) as u64;
            let belongs = self
                .table(name)?
                .schema
                .columns
                .iter()
                .any(|c| c.global_id == column_global_id);
            if belongs {
                self.indices_table.remove(rid)?;
            }
        }
        for (rid, values) in scan_all(&mut self.statistics_table)? {
            if expect_i64(&values[0]) as u64 == table_id.0 {
                self.statistics_table.remove(rid)?;
            }
        }
        let idx = self.table_name_index[name];
        self.tables.remove(idx);
        self.rebuild_name_index();
        Ok(())
    }

    pub fn create_index(
        &mut self,
        table_name: &str,
        index_name: &str,
        column: &str,
        kind: IndexKind,
        unique: bool,
    ) -> BeeDbResult<IndexId> {
        if self.table(table_name)?.has_index(index_name) {
            return Err(BeeDbError::Catalog(format!(
                "index '{index_name}' already exists on table '{table_name}'"
            )));
        }
        let table = self.table(table_name)?;
        let ordinal = table
            .schema
            .column_index(column)
            .ok_or_else(|| BeeDbError::Catalog(format!("unknown column '{column}' on table '{table_name}'")))?;
        let column_global_id = table.schema.columns[ordinal.0 as usize].global_id;

        let index_id = IndexId(self.next_index_id);
        self.next_index_id += 1;
        let kind_id = match kind {
            IndexKind::BTree => 0,
            IndexKind::Hash => 1,
        };
        self.indices_table.append(
            CATALOG_TXN,
            &[
                Value::Int64(index_id.0 as i64),
                Value::Int64(column_global_id as i64),
                Value::Int32(kind_id),
                fixed_char(index_name, NAME_WIDTH, "index name")?,
                Value::Bool(unique),
            ],
        )?;

        let idx = self.table_name_index[table_name];
        self.tables[idx].indexes.push(IndexMeta {
            id: index_id,
            name: index_name.to_string(),
            columns: vec![ordinal],
            kind,
            unique,
        });
        Ok(index_id)
    }

    pub fn drop_index(&mut self, table_name: &str, index_name: &str) -> BeeDbResult<()> {
        let target_id = self.table(table_name)?.index(index_name)?.id;
        for (rid, values) in scan_all(&mut self.indices_table)? {
            if expect_i64(&values[0]) as u64 == target_id.0 {
                self.indices_table.remove(rid)?;
            }
        }
        let idx = self.table_name_index[table_name];
        self.tables[idx].indexes.retain(|i| i.name != index_name);
        Ok(())
    }

    /// Overwrite a table's recorded row count (spec §10.7's `system_statistics`).
    pub fn set_cardinality(&mut self, table_name: &str, cardinality: u64) -> BeeDbResult<()> {
        let table_id = self.table(table_name)?.id;
        for (rid, values) in scan_all(&mut self.statistics_table)? {
            if expect_i64(&values[0]) as u64 == table_id.0 {
                self.statistics_table
                    .update_in_place(rid, &[Value::Int64(table_id.0 as i64), Value::Int64(cardinality as i64)])?;
            }
        }
        let idx = self.table_name_index[table_name];
        self.tables[idx].cardinality = cardinality;
        Ok(())
    }

    pub fn flush(&mut self) -> BeeDbResult<()> {
        self.tables_table.flush()?;
        self.columns_table.flush()?;
        self.indices_table.flush()?;
        self.statistics_table.flush()
    }
}
