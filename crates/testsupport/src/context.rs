//! Isolated test database setup.
//!
//! Wraps a temporary-directory-backed [`Database`] and one running
//! [`Transaction`], giving each test its own clean on-disk state that is
//! removed automatically when the context is dropped.

use common::{BeeDbResult, Config};
use database::{Database, QueryResult};
use std::path::Path;
use tempfile::TempDir;
use txn::Transaction;

/// A test database with an isolated temporary data directory and a single
/// active transaction.
///
/// # Example
///
/// ```
/// use testsupport::prelude::*;
///
/// let mut ctx = TestContext::new().unwrap();
/// ctx.run("CREATE TABLE t (id BIGINT NOT NULL)").unwrap();
/// ```
pub struct TestContext {
    _temp_dir: TempDir,
    db: Database,
    txn: Transaction,
}

impl TestContext {
    /// Open a fresh database in a new temporary directory and begin a
    /// transaction.
    pub fn new() -> BeeDbResult<Self> {
        let temp_dir = tempfile::tempdir()?;
        Self::with_config(temp_dir, Config::default())
    }

    fn with_config(temp_dir: TempDir, mut config: Config) -> BeeDbResult<Self> {
        config.data_dir = temp_dir.path().to_path_buf();
        let db = Database::open(config)?;
        let txn = db.begin();
        Ok(Self { _temp_dir: temp_dir, db, txn })
    }

    /// Run one SQL statement under this context's transaction.
    pub fn run(&mut self, sql: &str) -> BeeDbResult<QueryResult> {
        self.db.run(&mut self.txn, sql)
    }

    /// Run a sequence of `;`-separated statements, returning the last result.
    pub fn run_script(&mut self, script: &str) -> BeeDbResult<QueryResult> {
        let mut last = QueryResult::Count { affected: 0 };
        for stmt in script.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            last = self.run(stmt)?;
        }
        Ok(last)
    }

    /// Commit the context's transaction, starting a fresh one in its place.
    pub fn commit(&mut self) -> BeeDbResult<bool> {
        let committed = self.db.commit(&mut self.txn)?;
        self.txn = self.db.begin();
        Ok(committed)
    }

    /// Abort the context's transaction, starting a fresh one in its place.
    pub fn abort(&mut self) -> BeeDbResult<()> {
        self.db.abort(&mut self.txn)?;
        self.txn = self.db.begin();
        Ok(())
    }

    /// The underlying database, for tests that need direct access to
    /// `execute`/`begin`.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The path backing this context's catalog and tables.
    pub fn data_dir(&self) -> &Path {
        self._temp_dir.path()
    }
}
