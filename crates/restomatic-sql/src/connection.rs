//! SQLite connection handle.
//!
//! A [`Database`] owns exactly one connection and the shared
//! [`SchemaRegistry`]. Statements run synchronously on that connection, one
//! at a time. The handle is single-owner; to share one connection between
//! worker threads wrap it in a [`SharedDatabase`], which serializes access
//! behind a mutex.

use crate::error::{CompositorError, CompositorResult};
use crate::query::{
    ColumnSelection, CompiledStatement, DeleteQuery, InsertQuery, MappedRows, SelectQuery,
    Statement, StatementKind, StatementParams, UpdateQuery,
};
use crate::result::QueryResult;
use crate::schema::{SchemaRegistry, TableSchema};
use crate::value::to_sql_value;
use parking_lot::Mutex;
use restomatic_config::DatabaseConfig;
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One SQLite connection bound to a schema registry
pub struct Database {
    conn: Connection,
    registry: Arc<SchemaRegistry>,
    config: DatabaseConfig,
}

impl Database {
    /// Open the database described by `config`
    pub fn open(config: DatabaseConfig, registry: Arc<SchemaRegistry>) -> CompositorResult<Self> {
        info!(path = ?config.path, tables = registry.table_names().len(), "Opening SQLite connection");

        let conn = if config.is_memory() {
            Connection::open_in_memory()?
        } else {
            if config.create_parent_dirs {
                if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        CompositorError::Connection(format!("Failed to create directory: {}", e))
                    })?;
                }
            }
            Connection::open(&config.path)?
        };

        let database = Self {
            conn,
            registry,
            config,
        };
        database.configure_pragmas()?;

        Ok(database)
    }

    /// Open a private in-memory database
    pub fn memory(registry: Arc<SchemaRegistry>) -> CompositorResult<Self> {
        Self::open(DatabaseConfig::memory(), registry)
    }

    fn configure_pragmas(&self) -> CompositorResult<()> {
        debug!("Configuring SQLite pragmas");

        if self.config.foreign_keys {
            self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }

        if self.config.wal_mode && !self.config.is_memory() {
            self.conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            self.conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        }

        self.conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {};",
            self.config.busy_timeout_ms
        ))?;
        self.conn
            .execute_batch(&format!("PRAGMA cache_size = {};", self.config.cache_size))?;

        Ok(())
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn is_valid_table(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Raw connection, for DDL and anything outside the compositor
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run trusted SQL (schema setup, fixtures) without parameters
    pub fn execute_batch(&self, sql: &str) -> CompositorResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn table(&self, name: &str) -> CompositorResult<&TableSchema> {
        self.registry.table(name)
    }

    // =========================================================================
    // Statement builders
    // =========================================================================

    /// SELECT builder; set the projection with `columns()`
    pub fn select(&self, table: &str) -> CompositorResult<SelectQuery<'_>> {
        Ok(SelectQuery::new(self, self.table(table)?))
    }

    /// SELECT of every column in schema order
    pub fn select_all(&self, table: &str) -> CompositorResult<SelectQuery<'_>> {
        self.select(table)?.columns(ColumnSelection::All)
    }

    pub fn update(&self, table: &str) -> CompositorResult<UpdateQuery<'_>> {
        Ok(UpdateQuery::new(self, self.table(table)?))
    }

    /// UPDATE with its SET values already assigned
    pub fn update_mapped<I, K, V>(&self, table: &str, set_values: I) -> CompositorResult<UpdateQuery<'_>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.update(table)?.set_values(set_values)
    }

    /// INSERT builder with its column list assigned
    pub fn insert(
        &self,
        table: &str,
        columns: impl Into<ColumnSelection>,
    ) -> CompositorResult<InsertQuery<'_>> {
        InsertQuery::new(self, self.table(table)?).columns(columns)
    }

    /// INSERT of named rows; the column list is the union of the row keys,
    /// in schema order. The statement is built but not executed.
    pub fn insert_mapped(
        &self,
        table: &str,
        rows: impl Into<MappedRows>,
    ) -> CompositorResult<InsertQuery<'_>> {
        let schema = self.table(table)?;
        let rows = rows.into();
        let columns = rows.detect_columns(schema)?;
        InsertQuery::new(self, schema)
            .columns(columns)?
            .values_mapped(rows)
    }

    /// [`insert_mapped`](Self::insert_mapped), then execute
    pub fn insert_mapped_and_run(
        &self,
        table: &str,
        rows: impl Into<MappedRows>,
    ) -> CompositorResult<QueryResult<'_>> {
        self.insert_mapped(table, rows)?.run()
    }

    pub fn delete(&self, table: &str) -> CompositorResult<DeleteQuery<'_>> {
        Ok(DeleteQuery::new(self, self.table(table)?))
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Execute a compiled statement.
    ///
    /// SELECT statements are prepared and bound but not stepped until the
    /// result is consumed. Writes run immediately, inside the open
    /// transaction (one is started when none is active).
    pub fn execute_compiled(&self, statement: &CompiledStatement) -> CompositorResult<QueryResult<'_>> {
        let schema = self.table(&statement.table)?;

        match (&statement.kind, &statement.params) {
            (StatementKind::Select, StatementParams::Single(params)) => {
                debug!(table = %statement.table, sql = %statement.sql, params = params.len(), "Preparing query");
                let prepared = self.conn.prepare(&statement.sql)?;
                let bound = params.iter().map(to_sql_value).collect();
                Ok(QueryResult::pending(
                    schema,
                    statement.columns.clone(),
                    prepared,
                    bound,
                ))
            }
            (StatementKind::Select, StatementParams::Batch(_)) => Err(CompositorError::InvalidInput(
                "SELECT statements cannot be executed as a batch".to_string(),
            )),
            (kind, params) => {
                self.begin_implicit()?;
                let changes = match params {
                    StatementParams::Single(values) => {
                        debug!(table = %statement.table, ?kind, sql = %statement.sql, params = values.len(), "Executing statement");
                        self.conn
                            .execute(&statement.sql, params_from_iter(values.iter().map(to_sql_value)))?
                    }
                    StatementParams::Batch(rows) => {
                        debug!(table = %statement.table, ?kind, sql = %statement.sql, batch = rows.len(), "Executing batch statement");
                        let mut prepared = self.conn.prepare(&statement.sql)?;
                        let mut total = 0;
                        for row in rows {
                            total += prepared.execute(params_from_iter(row.iter().map(to_sql_value)))?;
                        }
                        total
                    }
                };
                Ok(QueryResult::written(
                    schema,
                    changes,
                    self.conn.last_insert_rowid(),
                ))
            }
        }
    }

    fn begin_implicit(&self) -> CompositorResult<()> {
        if self.conn.is_autocommit() {
            debug!("Opening implicit transaction");
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// True while uncommitted writes are pending
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Commit pending writes.
    ///
    /// Committing with no open transaction fails with `NothingToCommit`
    /// unless `no_changes_ok` is set.
    pub fn commit(&self, no_changes_ok: bool) -> CompositorResult<()> {
        if !self.in_transaction() {
            if no_changes_ok {
                return Ok(());
            }
            return Err(CompositorError::NothingToCommit);
        }
        self.conn.execute_batch("COMMIT")?;
        info!("Transaction committed");
        Ok(())
    }

    /// Discard pending writes; a no-op when nothing is pending
    pub fn rollback(&self) -> CompositorResult<()> {
        if self.in_transaction() {
            warn!("Rolling back open transaction");
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    /// Close the connection. Uncommitted writes are discarded.
    pub fn close(self) -> CompositorResult<()> {
        if self.in_transaction() {
            warn!("Closing connection with uncommitted changes");
        }
        self.conn.close().map_err(|(_, e)| CompositorError::from(e))?;
        info!("SQLite connection closed");
        Ok(())
    }
}

/// A [`Database`] behind a mutex, for handlers running on several threads
#[derive(Clone)]
pub struct SharedDatabase {
    inner: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    pub fn new(database: Database) -> Self {
        Self {
            inner: Arc::new(Mutex::new(database)),
        }
    }

    /// Run `f` with exclusive access to the connection
    pub fn with_database<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Database) -> T,
    {
        let database = self.inner.lock();
        f(&database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> Arc<SchemaRegistry> {
        let schema = TableSchema::new("items", ["id", "label"]).unwrap();
        Arc::new(SchemaRegistry::new().with_table(schema).unwrap())
    }

    fn memory_db() -> Database {
        let db = Database::memory(registry()).unwrap();
        db.execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT);")
            .unwrap();
        db
    }

    #[test]
    fn test_memory_database() {
        let db = memory_db();
        assert!(db.is_valid_table("items"));
        assert!(!db.is_valid_table("other"));
        assert!(!db.in_transaction());
    }

    #[test]
    fn test_file_database_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.db");

        let db = Database::open(DatabaseConfig::new(&path).with_foreign_keys(true), registry()).unwrap();

        let enabled: i64 = db
            .connection()
            .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
        assert!(path.exists());
    }

    #[test]
    fn test_wal_mode_on_file_database() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig::new(dir.path().join("wal.db")).with_wal_mode(true);

        let db = Database::open(config, registry()).unwrap();

        let mode: String = db
            .connection()
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_write_opens_transaction_and_commit_closes_it() {
        let db = memory_db();

        db.insert("items", ["id", "label"])
            .unwrap()
            .values_and_run(vec![Value::from(1), Value::from("a")])
            .unwrap();
        assert!(db.in_transaction());

        db.commit(false).unwrap();
        assert!(!db.in_transaction());
    }

    #[test]
    fn test_commit_without_changes() {
        let db = memory_db();

        assert!(matches!(db.commit(false), Err(CompositorError::NothingToCommit)));
        assert!(db.commit(true).is_ok());
    }

    #[test]
    fn test_rollback_discards_writes() {
        let db = memory_db();

        db.insert("items", ["id", "label"])
            .unwrap()
            .values_and_run(vec![Value::from(1), Value::from("a")])
            .unwrap();
        db.rollback().unwrap();
        // Rolling back twice is harmless
        db.rollback().unwrap();

        let count = db.select_all("items").unwrap().count().unwrap().scalar().unwrap();
        assert_eq!(count, Value::from(0));
    }

    #[test]
    fn test_close_discards_uncommitted_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("close.db");

        let db = Database::open(DatabaseConfig::new(&path), registry()).unwrap();
        db.execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT);")
            .unwrap();
        db.insert("items", ["id", "label"])
            .unwrap()
            .values_and_run(vec![Value::from(1), Value::from("lost")])
            .unwrap();
        db.close().unwrap();

        let db = Database::open(DatabaseConfig::new(&path), registry()).unwrap();
        let rows = db.select_all("items").unwrap().all().unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_shared_database_serializes_access() {
        let shared = SharedDatabase::new(memory_db());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    shared.with_database(|db| {
                        db.insert("items", ["id", "label"])?
                            .values_and_run(vec![Value::from(i), Value::from(format!("t{i}"))])?;
                        db.commit(false)
                    })
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let count = shared.with_database(|db| db.select_all("items")?.count()?.scalar());
        assert_eq!(count.unwrap(), Value::from(4));
    }
}
