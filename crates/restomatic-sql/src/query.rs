//! Query compositor: one write-once builder per statement kind.
//!
//! Each builder consumes itself and returns `Result<Self>`, so calls chain
//! with `?`. Every field can be set once (a second assignment fails with
//! [`CompositorError::FieldAlreadySet`]), and a field that makes no sense
//! for a statement kind simply has no method on that builder:
//!
//! ```compile_fail
//! # use restomatic_sql::{Database, Filterable, Selector};
//! # fn demo(db: &Database) -> restomatic_sql::CompositorResult<()> {
//! db.insert("users", ["id"])?.filter(Selector::eq("id", 1))?;
//! # Ok(())
//! # }
//! ```
//!
//! Compiling a builder yields a [`CompiledStatement`]: SQL with positional
//! `?` placeholders plus the bound values, never values spliced into text.

use crate::connection::Database;
use crate::error::{CompositorError, CompositorResult};
use crate::result::QueryResult;
use crate::schema::{ProcessMode, TableSchema};
use crate::selector::{CompiledSelector, Selector};
use crate::validate::{
    cast_non_negative_int, cast_positive_int, expect_array, expect_in, expect_object, expect_str,
    set_once,
};
use crate::value::{MappedRow, Row};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Statement kinds the compositor can build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Update,
    Insert,
    Delete,
}

/// Values bound to a compiled statement
#[derive(Debug, Clone, PartialEq)]
pub enum StatementParams {
    /// One execution
    Single(Vec<Value>),
    /// One execution per row (batch INSERT)
    Batch(Vec<Vec<Value>>),
}

/// A statement ready to execute
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub kind: StatementKind,
    pub table: String,
    pub sql: String,
    pub params: StatementParams,
    /// Projected columns (SELECT only); used for read processors and mapping
    pub columns: Option<Vec<String>>,
}

/// Shared interface of all statement builders
pub trait Statement<'db> {
    fn database(&self) -> &'db Database;

    /// Assemble SQL and bound values without executing
    fn compile(&self) -> CompositorResult<CompiledStatement>;

    /// Compile and execute
    fn run(&self) -> CompositorResult<QueryResult<'db>> {
        let compiled = self.compile()?;
        self.database().execute_compiled(&compiled)
    }
}

/// Builders that accept a WHERE clause (SELECT, UPDATE, DELETE)
pub trait Filterable: Sized {
    #[doc(hidden)]
    fn filter_parts(&mut self) -> (&TableSchema, &mut Option<CompiledSelector>);

    /// Set the WHERE clause; WHERE-context pre-processors run on its values
    fn filter(mut self, selector: Selector) -> CompositorResult<Self> {
        let (schema, slot) = self.filter_parts();
        if slot.is_some() {
            return Err(CompositorError::FieldAlreadySet("where"));
        }
        let clause = selector.to_clause(schema, ProcessMode::Where)?;
        check_placeholders(&clause.sql, clause.params.len())?;
        *slot = Some(clause);
        Ok(self)
    }

    /// Set the WHERE clause from its JSON wire format
    fn filter_json(self, selector: &Value) -> CompositorResult<Self> {
        self.filter(Selector::try_from(selector)?)
    }

    /// Shortcut for `filter(["id", "eq", id])`
    fn by_id(self, id: impl Into<Value>) -> CompositorResult<Self> {
        self.filter(Selector::eq("id", id))
    }
}

// =============================================================================
// Column lists and ordering
// =============================================================================

/// Projection or insert column list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelection {
    /// `*`: every column, in schema order
    All,
    Named(Vec<String>),
}

impl ColumnSelection {
    fn resolve(self, schema: &TableSchema) -> CompositorResult<Vec<String>> {
        match self {
            Self::All => Ok(schema.columns().to_vec()),
            Self::Named(columns) => {
                if columns.is_empty() {
                    return Err(CompositorError::InvalidInput(
                        "Column list must not be empty".to_string(),
                    ));
                }
                for column in &columns {
                    schema.check_column(column)?;
                }
                Ok(columns)
            }
        }
    }
}

impl From<&str> for ColumnSelection {
    fn from(column: &str) -> Self {
        if column == "*" {
            Self::All
        } else {
            Self::Named(vec![column.to_string()])
        }
    }
}

impl From<Vec<String>> for ColumnSelection {
    fn from(columns: Vec<String>) -> Self {
        Self::Named(columns)
    }
}

impl From<Vec<&str>> for ColumnSelection {
    fn from(columns: Vec<&str>) -> Self {
        Self::Named(columns.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for ColumnSelection {
    fn from(columns: &[&str]) -> Self {
        Self::Named(columns.iter().map(|c| c.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ColumnSelection {
    fn from(columns: [&str; N]) -> Self {
        Self::Named(columns.iter().map(|c| c.to_string()).collect())
    }
}

impl TryFrom<&Value> for ColumnSelection {
    type Error = CompositorError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) if s == "*" => Ok(Self::All),
            Value::Array(items) => items
                .iter()
                .map(|item| expect_str(item, "column name").map(String::from))
                .collect::<CompositorResult<Vec<_>>>()
                .map(Self::Named),
            other => Err(CompositorError::InvalidInput(format!(
                "Column list must be a list or *, got {other}"
            ))),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = CompositorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let direction = s.trim().to_ascii_uppercase();
        expect_in(&direction.as_str(), &["ASC", "DESC"], "order direction")?;
        Ok(if direction == "DESC" { Self::Desc } else { Self::Asc })
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// One ORDER BY term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }

    /// Parse a bare column name, a `{"column", "direction"}` object, or a
    /// list of either
    pub fn list_from_json(value: &Value) -> CompositorResult<Vec<OrderBy>> {
        match value {
            Value::Array(items) => items.iter().map(OrderBy::try_from).collect(),
            other => Ok(vec![OrderBy::try_from(other)?]),
        }
    }
}

impl From<&str> for OrderBy {
    fn from(column: &str) -> Self {
        Self::asc(column)
    }
}

impl From<(&str, Direction)> for OrderBy {
    fn from((column, direction): (&str, Direction)) -> Self {
        Self {
            column: column.to_string(),
            direction,
        }
    }
}

impl TryFrom<&Value> for OrderBy {
    type Error = CompositorError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        if let Value::String(column) = value {
            return Ok(Self::asc(column.as_str()));
        }
        let object = expect_object(value, "order_by column/direction object")?;
        let column = object.get("column").ok_or_else(|| {
            CompositorError::InvalidInput(
                "Complex order_by request must contain a column key and an optional direction key"
                    .to_string(),
            )
        })?;
        let direction = match object.get("direction") {
            Some(direction) => expect_str(direction, "order direction")?.parse::<Direction>()?,
            None => Direction::Asc,
        };
        Ok(Self {
            column: expect_str(column, "order_by column")?.to_string(),
            direction,
        })
    }
}

// =============================================================================
// SELECT
// =============================================================================

/// SELECT statement builder
pub struct SelectQuery<'db> {
    db: &'db Database,
    schema: &'db TableSchema,
    columns: Option<Vec<String>>,
    filter: Option<CompiledSelector>,
    order_by: Option<Vec<OrderBy>>,
    limit: Option<u64>,
    offset: Option<u64>,
    count: bool,
}

impl<'db> SelectQuery<'db> {
    pub(crate) fn new(db: &'db Database, schema: &'db TableSchema) -> Self {
        Self {
            db,
            schema,
            columns: None,
            filter: None,
            order_by: None,
            limit: None,
            offset: None,
            count: false,
        }
    }

    /// Projection; `"*"` expands to every column in schema order
    pub fn columns(mut self, columns: impl Into<ColumnSelection>) -> CompositorResult<Self> {
        let columns = columns.into().resolve(self.schema)?;
        set_once(&mut self.columns, columns, "column_list")?;
        Ok(self)
    }

    pub fn order_by<I, O>(mut self, terms: I) -> CompositorResult<Self>
    where
        I: IntoIterator<Item = O>,
        O: Into<OrderBy>,
    {
        let terms: Vec<OrderBy> = terms.into_iter().map(Into::into).collect();
        if terms.is_empty() {
            return Err(CompositorError::InvalidInput(
                "Must specify one or more columns to order by".to_string(),
            ));
        }
        for term in &terms {
            self.schema.check_column(&term.column)?;
        }
        set_once(&mut self.order_by, terms, "order_by")?;
        Ok(self)
    }

    pub fn order_by_json(self, value: &Value) -> CompositorResult<Self> {
        let terms = OrderBy::list_from_json(value)?;
        self.order_by(terms)
    }

    /// LIMIT; accepts a positive integer or numeric string
    pub fn limit(mut self, value: impl Into<Value>) -> CompositorResult<Self> {
        let value = cast_positive_int(&value.into(), "LIMIT")?;
        set_once(&mut self.limit, value, "limit")?;
        Ok(self)
    }

    /// OFFSET; accepts a non-negative integer or numeric string
    pub fn offset(mut self, value: impl Into<Value>) -> CompositorResult<Self> {
        let value = cast_non_negative_int(&value.into(), "OFFSET")?;
        set_once(&mut self.offset, value, "offset")?;
        Ok(self)
    }

    /// Wrap the statement as `SELECT COUNT(*) FROM (...)`
    pub fn count(mut self) -> CompositorResult<Self> {
        if self.count {
            return Err(CompositorError::FieldAlreadySet("count"));
        }
        self.count = true;
        Ok(self)
    }

    pub fn all(&self) -> CompositorResult<Vec<Row>> {
        self.run()?.all()
    }

    pub fn one(&self) -> CompositorResult<Row> {
        self.run()?.one()
    }

    pub fn one_or_none(&self) -> CompositorResult<Option<Row>> {
        self.run()?.one_or_none()
    }

    pub fn scalar(&self) -> CompositorResult<Value> {
        self.run()?.scalar()
    }

    pub fn all_mapped(&self) -> CompositorResult<Vec<MappedRow>> {
        self.run()?.all_mapped()
    }

    pub fn one_mapped(&self) -> CompositorResult<MappedRow> {
        self.run()?.one_mapped()
    }

    pub fn one_or_none_mapped(&self) -> CompositorResult<Option<MappedRow>> {
        self.run()?.one_or_none_mapped()
    }
}

impl Filterable for SelectQuery<'_> {
    fn filter_parts(&mut self) -> (&TableSchema, &mut Option<CompiledSelector>) {
        (self.schema, &mut self.filter)
    }
}

impl<'db> Statement<'db> for SelectQuery<'db> {
    fn database(&self) -> &'db Database {
        self.db
    }

    fn compile(&self) -> CompositorResult<CompiledStatement> {
        let columns = self
            .columns
            .as_ref()
            .ok_or(CompositorError::MissingRequiredField("column_list"))?;

        let mut sql = format!(
            "SELECT {} FROM \"{}\"",
            quote_columns(columns),
            self.schema.name()
        );
        let mut params = Vec::new();

        append_where(&mut sql, &mut params, self.filter.as_ref());

        if let Some(terms) = &self.order_by {
            let terms = terms
                .iter()
                .map(|t| format!("\"{}\" {}", t.column, t.direction))
                .collect::<Vec<_>>()
                .join(",");
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms);
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }

        if self.count {
            sql = format!("SELECT COUNT(*) FROM ({sql})");
        }

        finalize(&sql, params.len())?;

        Ok(CompiledStatement {
            kind: StatementKind::Select,
            table: self.schema.name().to_string(),
            sql,
            params: StatementParams::Single(params),
            columns: (!self.count).then(|| columns.clone()),
        })
    }
}

// =============================================================================
// UPDATE
// =============================================================================

/// UPDATE statement builder
pub struct UpdateQuery<'db> {
    db: &'db Database,
    schema: &'db TableSchema,
    set_values: Option<Vec<(String, Value)>>,
    filter: Option<CompiledSelector>,
}

impl<'db> UpdateQuery<'db> {
    pub(crate) fn new(db: &'db Database, schema: &'db TableSchema) -> Self {
        Self {
            db,
            schema,
            set_values: None,
            filter: None,
        }
    }

    /// Columns to assign; UPDATE-context pre-processors run on the values
    pub fn set_values<I, K, V>(mut self, values: I) -> CompositorResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        if self.set_values.is_some() {
            return Err(CompositorError::FieldAlreadySet("set_values"));
        }

        let mut seen = HashSet::new();
        let mut assignments = Vec::new();
        for (column, value) in values {
            let column = column.into();
            self.schema.check_column(&column)?;
            if !seen.insert(column.clone()) {
                return Err(CompositorError::InvalidInput(format!(
                    "Column {column} assigned twice"
                )));
            }
            let value = self
                .schema
                .preprocess(&column, value.into(), ProcessMode::Update)?;
            assignments.push((column, value));
        }
        if assignments.is_empty() {
            return Err(CompositorError::InvalidInput(
                "Must provide at least one column to set".to_string(),
            ));
        }

        set_once(&mut self.set_values, assignments, "set_values")?;
        Ok(self)
    }

    /// [`set_values`](Self::set_values) from a JSON object
    pub fn set_values_json(self, values: &Value) -> CompositorResult<Self> {
        let object = expect_object(values, "set_values")?;
        self.set_values(object.clone())
    }
}

impl Filterable for UpdateQuery<'_> {
    fn filter_parts(&mut self) -> (&TableSchema, &mut Option<CompiledSelector>) {
        (self.schema, &mut self.filter)
    }
}

impl<'db> Statement<'db> for UpdateQuery<'db> {
    fn database(&self) -> &'db Database {
        self.db
    }

    fn compile(&self) -> CompositorResult<CompiledStatement> {
        let assignments = self
            .set_values
            .as_ref()
            .ok_or(CompositorError::MissingRequiredField("set_values"))?;

        let set_phrases = assignments
            .iter()
            .map(|(column, _)| format!("\"{column}\" = ?"))
            .collect::<Vec<_>>()
            .join(",");
        let mut sql = format!("UPDATE \"{}\" SET {set_phrases}", self.schema.name());
        let mut params: Vec<Value> = assignments.iter().map(|(_, v)| v.clone()).collect();

        append_where(&mut sql, &mut params, self.filter.as_ref());
        finalize(&sql, params.len())?;

        Ok(CompiledStatement {
            kind: StatementKind::Update,
            table: self.schema.name().to_string(),
            sql,
            params: StatementParams::Single(params),
            columns: None,
        })
    }
}

// =============================================================================
// INSERT
// =============================================================================

/// Positional insert values: one row or a batch
#[derive(Debug, Clone, PartialEq)]
pub enum InsertRows {
    Single(Vec<Value>),
    Batch(Vec<Vec<Value>>),
}

impl From<Vec<Value>> for InsertRows {
    fn from(row: Vec<Value>) -> Self {
        Self::Single(row)
    }
}

impl From<Vec<Vec<Value>>> for InsertRows {
    fn from(rows: Vec<Vec<Value>>) -> Self {
        Self::Batch(rows)
    }
}

impl TryFrom<&Value> for InsertRows {
    type Error = CompositorError;

    /// A list of scalars is one row; a list of lists is a batch
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let items = expect_array(value, "insert values")?;
        if items.first().is_some_and(Value::is_array) {
            let rows = items
                .iter()
                .map(|row| expect_array(row, "insert row").cloned())
                .collect::<CompositorResult<Vec<_>>>()?;
            Ok(Self::Batch(rows))
        } else {
            Ok(Self::Single(items.clone()))
        }
    }
}

/// Named insert values: one row or a batch
#[derive(Debug, Clone, PartialEq)]
pub enum MappedRows {
    Single(Map<String, Value>),
    Batch(Vec<Map<String, Value>>),
}

impl MappedRows {
    /// Union of row keys, ordered by schema position
    pub(crate) fn detect_columns(&self, schema: &TableSchema) -> CompositorResult<Vec<String>> {
        let rows: Vec<&Map<String, Value>> = match self {
            Self::Single(row) => vec![row],
            Self::Batch(rows) => rows.iter().collect(),
        };
        let mut keys = HashSet::new();
        for row in rows {
            for key in row.keys() {
                schema.check_column(key)?;
                keys.insert(key.as_str());
            }
        }
        Ok(schema
            .columns()
            .iter()
            .filter(|c| keys.contains(c.as_str()))
            .cloned()
            .collect())
    }
}

impl From<Map<String, Value>> for MappedRows {
    fn from(row: Map<String, Value>) -> Self {
        Self::Single(row)
    }
}

impl From<Vec<Map<String, Value>>> for MappedRows {
    fn from(rows: Vec<Map<String, Value>>) -> Self {
        Self::Batch(rows)
    }
}

impl TryFrom<&Value> for MappedRows {
    type Error = CompositorError;

    /// An object is one row; a list of objects is a batch
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(row) => Ok(Self::Single(row.clone())),
            Value::Array(rows) => rows
                .iter()
                .map(|row| expect_object(row, "values_mapped input row dictionary").cloned())
                .collect::<CompositorResult<Vec<_>>>()
                .map(Self::Batch),
            other => Err(CompositorError::InvalidInput(format!(
                "Must provide a list of value objects or one value object, got {other}"
            ))),
        }
    }
}

/// INSERT statement builder.
///
/// Assigning values only builds the statement; execution is always an
/// explicit call (`run()`, or the `*_and_run` variants).
pub struct InsertQuery<'db> {
    db: &'db Database,
    schema: &'db TableSchema,
    columns: Option<Vec<String>>,
    values: Option<InsertRows>,
}

impl<'db> InsertQuery<'db> {
    pub(crate) fn new(db: &'db Database, schema: &'db TableSchema) -> Self {
        Self {
            db,
            schema,
            columns: None,
            values: None,
        }
    }

    /// Columns the values are given for; `"*"` means every column
    pub fn columns(mut self, columns: impl Into<ColumnSelection>) -> CompositorResult<Self> {
        let columns = columns.into().resolve(self.schema)?;
        set_once(&mut self.columns, columns, "column_list")?;
        Ok(self)
    }

    /// Positional values matching the column list; a batch inserts many rows
    pub fn values(mut self, rows: impl Into<InsertRows>) -> CompositorResult<Self> {
        let columns = self.require_columns()?;
        if self.values.is_some() {
            return Err(CompositorError::FieldAlreadySet("values"));
        }

        let rows = match rows.into() {
            InsertRows::Single(row) => InsertRows::Single(self.prepare_row(&columns, row)?),
            InsertRows::Batch(rows) => {
                if rows.is_empty() {
                    return Err(CompositorError::InvalidInput(
                        "Must provide at least one row to insert".to_string(),
                    ));
                }
                InsertRows::Batch(
                    rows.into_iter()
                        .map(|row| self.prepare_row(&columns, row))
                        .collect::<CompositorResult<Vec<_>>>()?,
                )
            }
        };

        set_once(&mut self.values, rows, "values")?;
        Ok(self)
    }

    /// Named values, reordered into the column list order.
    ///
    /// Keys outside the column list fail with `UnknownColumn`; columns a
    /// row leaves out are bound as NULL.
    pub fn values_mapped(self, rows: impl Into<MappedRows>) -> CompositorResult<Self> {
        let columns = self.require_columns()?;
        let positional = match rows.into() {
            MappedRows::Single(row) => InsertRows::Single(self.unmap_row(&columns, row)?),
            MappedRows::Batch(rows) => InsertRows::Batch(
                rows.into_iter()
                    .map(|row| self.unmap_row(&columns, row))
                    .collect::<CompositorResult<Vec<_>>>()?,
            ),
        };
        self.values(positional)
    }

    /// Assign positional values and execute
    pub fn values_and_run(self, rows: impl Into<InsertRows>) -> CompositorResult<QueryResult<'db>> {
        self.values(rows)?.run()
    }

    /// Assign named values and execute
    pub fn values_mapped_and_run(
        self,
        rows: impl Into<MappedRows>,
    ) -> CompositorResult<QueryResult<'db>> {
        self.values_mapped(rows)?.run()
    }

    fn require_columns(&self) -> CompositorResult<Vec<String>> {
        self.columns
            .clone()
            .ok_or(CompositorError::MissingRequiredField("column_list"))
    }

    fn prepare_row(&self, columns: &[String], row: Vec<Value>) -> CompositorResult<Vec<Value>> {
        if row.len() != columns.len() {
            return Err(CompositorError::DimensionMismatch {
                expected: columns.len(),
                actual: row.len(),
            });
        }
        columns
            .iter()
            .zip(row)
            .map(|(column, value)| self.schema.preprocess(column, value, ProcessMode::Insert))
            .collect()
    }

    fn unmap_row(&self, columns: &[String], row: Map<String, Value>) -> CompositorResult<Vec<Value>> {
        let mut values = vec![Value::Null; columns.len()];
        for (key, value) in row {
            let index = columns
                .iter()
                .position(|c| *c == key)
                .ok_or_else(|| CompositorError::unknown_column(self.schema.name(), &key))?;
            values[index] = value;
        }
        Ok(values)
    }
}

impl<'db> Statement<'db> for InsertQuery<'db> {
    fn database(&self) -> &'db Database {
        self.db
    }

    fn compile(&self) -> CompositorResult<CompiledStatement> {
        let columns = self
            .columns
            .as_ref()
            .ok_or(CompositorError::MissingRequiredField("column_list"))?;
        let values = self
            .values
            .as_ref()
            .ok_or(CompositorError::MissingRequiredField("values"))?;

        let placeholders = vec!["?"; columns.len()].join(",");
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({placeholders})",
            self.schema.name(),
            quote_columns(columns)
        );

        let params = match values {
            InsertRows::Single(row) => {
                finalize(&sql, row.len())?;
                StatementParams::Single(row.clone())
            }
            InsertRows::Batch(rows) => {
                for row in rows {
                    finalize(&sql, row.len())?;
                }
                StatementParams::Batch(rows.clone())
            }
        };

        Ok(CompiledStatement {
            kind: StatementKind::Insert,
            table: self.schema.name().to_string(),
            sql,
            params,
            columns: None,
        })
    }
}

// =============================================================================
// DELETE
// =============================================================================

/// DELETE statement builder. Without a filter it deletes every row.
pub struct DeleteQuery<'db> {
    db: &'db Database,
    schema: &'db TableSchema,
    filter: Option<CompiledSelector>,
}

impl<'db> DeleteQuery<'db> {
    pub(crate) fn new(db: &'db Database, schema: &'db TableSchema) -> Self {
        Self {
            db,
            schema,
            filter: None,
        }
    }
}

impl Filterable for DeleteQuery<'_> {
    fn filter_parts(&mut self) -> (&TableSchema, &mut Option<CompiledSelector>) {
        (self.schema, &mut self.filter)
    }
}

impl<'db> Statement<'db> for DeleteQuery<'db> {
    fn database(&self) -> &'db Database {
        self.db
    }

    fn compile(&self) -> CompositorResult<CompiledStatement> {
        let mut sql = format!("DELETE FROM \"{}\"", self.schema.name());
        let mut params = Vec::new();

        append_where(&mut sql, &mut params, self.filter.as_ref());
        finalize(&sql, params.len())?;

        Ok(CompiledStatement {
            kind: StatementKind::Delete,
            table: self.schema.name().to_string(),
            sql,
            params: StatementParams::Single(params),
            columns: None,
        })
    }
}

// =============================================================================
// Assembly helpers
// =============================================================================

fn quote_columns(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(",")
}

fn append_where(sql: &mut String, params: &mut Vec<Value>, clause: Option<&CompiledSelector>) {
    if let Some(clause) = clause {
        sql.push_str(" WHERE ");
        sql.push_str(&clause.sql);
        params.extend(clause.params.iter().cloned());
    }
}

fn check_placeholders(sql: &str, values: usize) -> CompositorResult<()> {
    let placeholders = sql.matches('?').count();
    if placeholders != values {
        return Err(CompositorError::PlaceholderMismatch {
            placeholders,
            values,
        });
    }
    Ok(())
}

/// Reject statement separators and check placeholder/value agreement
fn finalize(sql: &str, values: usize) -> CompositorResult<()> {
    if sql.contains(';') {
        return Err(CompositorError::CompositeStatementRejected);
    }
    check_placeholders(sql, values)
}
