//! SQLite query compositor for restomatic
//!
//! This crate turns declarative, JSON-shaped query descriptions into
//! parameterized SQLite statements, executes them on a single connection,
//! and exposes the rows through a single-pass result view.
//!
//! ## Features
//!
//! - **Selectors**: `["col", "op", value]` conditions and `{"and"|"or": [...]}`
//!   groups, compiled to SQL with positional `?` placeholders
//! - **Write-once builders**: one builder per statement kind; fields that do
//!   not apply to a kind have no method on its builder
//! - **Processors**: per-column value transforms on bind and on read
//! - **Transactions**: writes open a transaction implicitly; commit and
//!   rollback are explicit
//!
//! ## Usage
//!
//! ```rust
//! use restomatic_sql::{Database, Filterable, SchemaRegistry, Selector, TableSchema};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let users = TableSchema::new("users", ["id", "name", "age"])?;
//! let registry = Arc::new(SchemaRegistry::new().with_table(users)?);
//! let db = Database::memory(registry)?;
//! db.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER);")?;
//!
//! db.insert("users", ["id", "name", "age"])?
//!     .values_and_run(vec![json!(1), json!("ann"), json!(31)])?;
//! db.commit(false)?;
//!
//! let adults = db
//!     .select("users")?
//!     .columns(["name"])?
//!     .filter(Selector::gte("age", 18))?
//!     .all_mapped()?;
//! assert_eq!(adults, vec![json!({"name": "ann"}).as_object().cloned().unwrap_or_default()]);
//! # Ok::<(), restomatic_sql::CompositorError>(())
//! ```

#![warn(clippy::all)]

pub mod connection;
pub mod error;
pub mod query;
pub mod result;
pub mod schema;
pub mod selector;
pub mod validate;
pub mod value;

// Re-exports
pub use connection::{Database, SharedDatabase};
pub use error::{CompositorError, CompositorResult, ErrorKind};
pub use query::{
    ColumnSelection, CompiledStatement, DeleteQuery, Direction, Filterable, InsertQuery,
    InsertRows, MappedRows, OrderBy, SelectQuery, Statement, StatementKind, StatementParams,
    UpdateQuery,
};
pub use restomatic_config::DatabaseConfig;
pub use result::{QueryResult, ResultRows};
pub use schema::{ProcessMode, Processor, ProcessorContext, SchemaRegistry, TableSchema};
pub use selector::{CompiledSelector, LogicalOp, Operator, Selector};
pub use value::{MappedRow, Row};
