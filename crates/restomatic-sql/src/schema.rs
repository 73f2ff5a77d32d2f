//! Table registry: per-table column order and value processors.
//!
//! The registry is built once at startup and shared read-only (behind an
//! `Arc`) by every [`Database`](crate::Database) that uses it.

use crate::error::{CompositorError, CompositorResult};
use crate::validate::{expect_identifier, insert_once};
use crate::value::check_bindable;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Where a processor is being applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessMode {
    /// Binding a WHERE clause value
    Where,
    /// Binding an INSERT value
    Insert,
    /// Binding an UPDATE SET value
    Update,
    /// Transforming a fetched value
    Read,
}

/// Context handed to every processor call
#[derive(Debug, Clone, Copy)]
pub struct ProcessorContext<'a> {
    pub table: &'a str,
    pub column: &'a str,
    pub mode: ProcessMode,
}

/// A per-column value transform
pub type Processor =
    Arc<dyn Fn(Value, &ProcessorContext<'_>) -> anyhow::Result<Value> + Send + Sync>;

/// Column contract for one table
#[derive(Clone)]
pub struct TableSchema {
    name: String,
    columns: Vec<String>,
    preprocessors: HashMap<String, Vec<Processor>>,
    postprocessors: HashMap<String, Vec<Processor>>,
}

impl TableSchema {
    /// Define a table with its columns in positional order
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> CompositorResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        expect_identifier(&name, "table")?;

        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(CompositorError::InvalidInput(format!(
                "Table {name} must define at least one column"
            )));
        }

        let mut seen = HashSet::new();
        for column in &columns {
            expect_identifier(column, "column")?;
            if !seen.insert(column.as_str()) {
                return Err(CompositorError::InvalidInput(format!(
                    "Duplicate column {column} in table {name}"
                )));
            }
        }

        Ok(Self {
            name,
            columns,
            preprocessors: HashMap::new(),
            postprocessors: HashMap::new(),
        })
    }

    /// Register a transform applied before a value for `column` is bound
    /// (WHERE, INSERT and UPDATE contexts)
    pub fn with_preprocessor<F>(mut self, column: &str, processor: F) -> CompositorResult<Self>
    where
        F: Fn(Value, &ProcessorContext<'_>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.check_column(column)?;
        self.preprocessors
            .entry(column.to_string())
            .or_default()
            .push(Arc::new(processor));
        Ok(self)
    }

    /// Register a transform applied to fetched values of `column`
    pub fn with_postprocessor<F>(mut self, column: &str, processor: F) -> CompositorResult<Self>
    where
        F: Fn(Value, &ProcessorContext<'_>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.check_column(column)?;
        self.postprocessors
            .entry(column.to_string())
            .or_default()
            .push(Arc::new(processor));
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns in positional order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Fail with `UnknownColumn` unless `column` belongs to this table
    pub fn check_column(&self, column: &str) -> CompositorResult<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(CompositorError::unknown_column(&self.name, column))
        }
    }

    pub fn has_postprocessors(&self) -> bool {
        !self.postprocessors.is_empty()
    }

    /// Run the write-side processors for `column` over `value`; the result
    /// is what gets bound, so it must be storable
    pub fn preprocess(&self, column: &str, value: Value, mode: ProcessMode) -> CompositorResult<Value> {
        let value = apply(&self.name, self.preprocessors.get(column), column, value, mode)?;
        check_bindable(column, &value)?;
        Ok(value)
    }

    /// Run the read-side processors for `column` over `value`
    pub fn postprocess(&self, column: &str, value: Value) -> CompositorResult<Value> {
        apply(
            &self.name,
            self.postprocessors.get(column),
            column,
            value,
            ProcessMode::Read,
        )
    }
}

fn apply(
    table: &str,
    processors: Option<&Vec<Processor>>,
    column: &str,
    mut value: Value,
    mode: ProcessMode,
) -> CompositorResult<Value> {
    let Some(processors) = processors else {
        return Ok(value);
    };

    let context = ProcessorContext {
        table,
        column,
        mode,
    };
    for processor in processors {
        value = processor(value, &context).map_err(|e| CompositorError::Processor {
            table: table.to_string(),
            column: column.to_string(),
            message: format!("{e:#}"),
        })?;
    }
    Ok(value)
}

impl fmt::Debug for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pre: Vec<_> = self.preprocessors.keys().collect();
        let mut post: Vec<_> = self.postprocessors.keys().collect();
        pre.sort();
        post.sort();
        f.debug_struct("TableSchema")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("preprocessed", &pre)
            .field("postprocessed", &post)
            .finish()
    }
}

/// All tables the compositor may touch
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: HashMap<String, TableSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table; each table name can be registered once
    pub fn register(&mut self, schema: TableSchema) -> CompositorResult<()> {
        insert_once(&mut self.tables, schema.name.clone(), schema, "table")?;
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_table(mut self, schema: TableSchema) -> CompositorResult<Self> {
        self.register(schema)?;
        Ok(self)
    }

    pub fn table(&self, name: &str) -> CompositorResult<&TableSchema> {
        self.tables
            .get(name)
            .ok_or_else(|| CompositorError::UnknownTable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Registered table names, sorted
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
