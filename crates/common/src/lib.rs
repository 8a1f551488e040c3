//! Shared identifiers, error vocabulary, configuration, and execution
//! statistics used across every crate in the workspace.


use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use types::Value;

/// A page identifier. `INVALID_PAGE_ID` and `MEMORY_TABLE_PAGE_ID` are
/// reserved sentinels (spec §3 Page).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId(pub u32);

/// "No page" — e.g. an empty table's time-travel chain head.
pub const INVALID_PAGE_ID: PageId = PageId(u32::MAX);
/// "This tuple does not live on disk" — synthetic rows produced by
/// operators such as `Aggregation` that have no backing page.
pub const MEMORY_TABLE_PAGE_ID: PageId = PageId(u32::MAX - 1);

impl PageId {
    pub fn is_valid(&self) -> bool {
        *self != INVALID_PAGE_ID && *self != MEMORY_TABLE_PAGE_ID
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnId(pub u16);

/// Record identifier: `(page id, slot index)`, stable for the life of a
/// record version on that page (spec §3 RID).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

pub const INVALID_RID: RecordId = RecordId {
    page_id: INVALID_PAGE_ID,
    slot: u16::MAX,
};

/// A decoded row of column values, carrying its record identifier when it
/// was read back off a page (spec §3 Tuple / §4.5 read-set recording).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
    #[serde(skip)]
    pub rid: Option<RecordId>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values, rid: None }
    }

    pub fn with_rid(values: Vec<Value>, rid: RecordId) -> Self {
        Self {
            values,
            rid: Some(rid),
        }
    }

    pub fn set_rid(&mut self, rid: RecordId) {
        self.rid = Some(rid);
    }

    pub fn rid(&self) -> Option<RecordId> {
        self.rid
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Error kinds named by spec §7, carried as a flat `thiserror` enum so
/// callers can match on kind rather than sniff a message.
#[derive(Debug, thiserror::Error)]
pub enum BeeDbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("buffer pool exhausted: no free frame")]
    NoFreeFrame,

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("write-write conflict on {0:?}")]
    WriteWriteConflict(RecordId),

    #[error("transaction validation failed at commit")]
    ValidationFailed,

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("parser error: {0}")]
    Parser(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("planner error: {0}")]
    Planner(String),

    #[error("optimizer error: {0}")]
    Optimizer(String),

    #[error("executor error: {0}")]
    Executor(String),
}

pub type BeeDbResult<T> = Result<T, BeeDbError>;

/// Replacement strategy selection for the buffer pool (spec §4.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplacementStrategyKind {
    #[default]
    Clock,
    Lru,
    LruK,
    Lfu,
}

/// Optimizer rule toggles (spec §6 configuration knobs).
#[derive(Clone, Copy, Debug, PartialEq, Eq, bon::Builder, Serialize, Deserialize)]
pub struct OptimizationConfig {
    #[builder(default = false)]
    pub disable: bool,
    #[builder(default = true)]
    pub index_scan: bool,
    #[builder(default = true)]
    pub hash_join: bool,
    #[builder(default = true)]
    pub predicate_push_down: bool,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        OptimizationConfig::builder().build()
    }
}

/// Every knob named in spec §6's configuration table.
#[derive(Clone, Debug, bon::Builder)]
pub struct Config {
    pub data_dir: std::path::PathBuf,
    #[builder(default = 4096)]
    pub page_size: usize,
    #[builder(default = 64)]
    pub buffer_pool_frames: usize,
    #[builder(default)]
    pub replacement_strategy: ReplacementStrategyKind,
    #[builder(default = 2)]
    pub lru_k: usize,
    #[builder(default = 1)]
    pub scan_page_batch: usize,
    #[builder(default)]
    pub optimization: OptimizationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config::builder()
            .data_dir(std::path::PathBuf::from("./data"))
            .build()
    }
}

/// Per-operator timing and row-count instrumentation (kept from the
/// teacher; used by `EXPLAIN ANALYZE`-style surfaces in the executor).
#[derive(Clone, Debug, Default)]
pub struct ExecutionStats {
    pub open_time: Duration,
    pub total_next_time: Duration,
    pub close_time: Duration,
    pub rows_produced: u64,
    pub rows_filtered: u64,
    pub pages_scanned: u64,
}

impl ExecutionStats {
    pub fn total_time(&self) -> Duration {
        self.open_time + self.total_next_time + self.close_time
    }

    pub fn format_duration(d: Duration) -> String {
        if d.as_micros() < 1_000 {
            format!("{}µs", d.as_micros())
        } else if d.as_millis() < 1_000 {
            format!("{:.2}ms", d.as_secs_f64() * 1_000.0)
        } else {
            format!("{:.2}s", d.as_secs_f64())
        }
    }
}

/// Convenient re-exports for crates that only need the common vocabulary.
pub mod prelude {
    pub use crate::{
        BeeDbError, BeeDbResult, ColumnId, Config, ExecutionStats, IndexId, OptimizationConfig,
        PageId, RecordId, ReplacementStrategyKind, Row, TableId, INVALID_PAGE_ID, INVALID_RID,
        MEMORY_TABLE_PAGE_ID,
    };
}
