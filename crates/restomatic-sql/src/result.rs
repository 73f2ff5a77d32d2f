//! Result view over a live SQLite cursor.
//!
//! A [`QueryResult`] is produced by executing a statement. For SELECT
//! statements the rows are not stepped until a terminal method runs, and
//! the rows can be walked exactly once: [`QueryResult::rows`] fails with
//! [`CompositorError::ResultConsumed`] on a second call, and the eager
//! terminals take the result by value. Re-running the query is always an
//! explicit new execution.

use crate::error::{CompositorError, CompositorResult};
use crate::schema::TableSchema;
use crate::value::{from_sql_ref, map_row, MappedRow, Row};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Statement};

/// Outcome of executing a compiled statement
pub struct QueryResult<'db> {
    schema: &'db TableSchema,
    /// Projected column list; drives read processors and name mapping
    columns: Option<Vec<String>>,
    statement: Option<Statement<'db>>,
    params: Vec<SqlValue>,
    names: Vec<String>,
    consumed: bool,
    changes: usize,
    last_insert_rowid: i64,
}

impl<'db> QueryResult<'db> {
    pub(crate) fn pending(
        schema: &'db TableSchema,
        columns: Option<Vec<String>>,
        statement: Statement<'db>,
        params: Vec<SqlValue>,
    ) -> Self {
        let names = statement
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        Self {
            schema,
            columns,
            statement: Some(statement),
            params,
            names,
            consumed: false,
            changes: 0,
            last_insert_rowid: 0,
        }
    }

    pub(crate) fn written(schema: &'db TableSchema, changes: usize, last_insert_rowid: i64) -> Self {
        Self {
            schema,
            columns: None,
            statement: None,
            params: Vec::new(),
            names: Vec::new(),
            consumed: false,
            changes,
            last_insert_rowid,
        }
    }

    /// Rows affected by an UPDATE/INSERT/DELETE (0 for SELECT)
    pub fn changes(&self) -> usize {
        self.changes
    }

    /// Row id of the last inserted row on this connection
    pub fn last_insert_rowid(&self) -> i64 {
        self.last_insert_rowid
    }

    /// Names of the result columns as reported by SQLite
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Lazily iterate the rows, running read processors per row.
    ///
    /// Can be called once; later calls fail with `ResultConsumed`.
    pub fn rows(&mut self) -> CompositorResult<ResultRows<'_>> {
        if self.consumed {
            return Err(CompositorError::ResultConsumed);
        }
        self.consumed = true;

        let width = self.names.len();
        let rows = match self.statement.as_mut() {
            Some(statement) => Some(statement.query(params_from_iter(self.params.iter()))?),
            None => None,
        };

        Ok(ResultRows {
            rows,
            schema: self.schema,
            columns: self.columns.as_deref(),
            width,
        })
    }

    pub fn all(mut self) -> CompositorResult<Vec<Row>> {
        let rows = self.rows()?.collect::<CompositorResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Exactly one row; fails `NoRows` on zero and `TooManyRows` on more
    pub fn one(self) -> CompositorResult<Row> {
        self.one_or_none()?.ok_or(CompositorError::NoRows)
    }

    /// At most one row
    pub fn one_or_none(mut self) -> CompositorResult<Option<Row>> {
        let mut rows = self.rows()?;
        let first = rows.next().transpose()?;
        if first.is_some() && rows.next().transpose()?.is_some() {
            return Err(CompositorError::TooManyRows);
        }
        Ok(first)
    }

    /// The single value of a one-row, one-column result
    pub fn scalar(self) -> CompositorResult<serde_json::Value> {
        let row = self.one()?;
        if row.len() != 1 {
            return Err(CompositorError::NotScalar(row.len()));
        }
        Ok(row.into_iter().next().unwrap_or_default())
    }

    pub fn all_mapped(self) -> CompositorResult<Vec<MappedRow>> {
        let keys = self.mapping_keys();
        Ok(self
            .all()?
            .into_iter()
            .map(|row| map_row(&keys, row))
            .collect())
    }

    pub fn one_mapped(self) -> CompositorResult<MappedRow> {
        let keys = self.mapping_keys();
        Ok(map_row(&keys, self.one()?))
    }

    pub fn one_or_none_mapped(self) -> CompositorResult<Option<MappedRow>> {
        let keys = self.mapping_keys();
        Ok(self.one_or_none()?.map(|row| map_row(&keys, row)))
    }

    fn mapping_keys(&self) -> Vec<String> {
        self.columns.clone().unwrap_or_else(|| self.names.clone())
    }
}

/// Lazy, finite row iterator borrowed from a [`QueryResult`]
pub struct ResultRows<'r> {
    rows: Option<rusqlite::Rows<'r>>,
    schema: &'r TableSchema,
    columns: Option<&'r [String]>,
    width: usize,
}

impl Iterator for ResultRows<'_> {
    type Item = CompositorResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let rows = self.rows.as_mut()?;
        match rows.next() {
            Ok(Some(row)) => Some(read_row(row, self.width, self.schema, self.columns)),
            Ok(None) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

fn read_row(
    row: &rusqlite::Row<'_>,
    width: usize,
    schema: &TableSchema,
    columns: Option<&[String]>,
) -> CompositorResult<Row> {
    let mut values = Vec::with_capacity(width);
    for index in 0..width {
        let value = from_sql_ref(row.get_ref(index)?);
        let column = columns
            .filter(|_| schema.has_postprocessors())
            .and_then(|c| c.get(index));
        let value = match column {
            Some(column) => schema.postprocess(column, value)?,
            None => value,
        };
        values.push(value);
    }
    Ok(values)
}
