//! Error types for the query compositor

use thiserror::Error;

/// Coarse classification of a [`CompositorError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad builder arguments: unknown column, wrong arity, disallowed operator
    InvalidInput,
    /// Field set twice, required field missing, statement illegal for the kind
    BuilderMisuse,
    /// Zero or several rows where exactly one was expected
    QueryResult,
    /// Failure inside SQLite or the connection
    Database,
}

/// Query compositor error type
#[derive(Error, Debug)]
pub enum CompositorError {
    /// Table is not present in the schema registry
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Column is not part of the table schema (or the statement's column list)
    #[error("Unknown column: {column} (table {table})")]
    UnknownColumn { table: String, column: String },

    /// Selector operator outside the supported set
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Argument failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Write-once builder field assigned twice
    #[error("This query has {0} already set")]
    FieldAlreadySet(&'static str),

    /// Builder field needed before this step was never set
    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// Value row width differs from the column list
    #[error("Expected {expected} values per row, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Statement text contains a separator
    #[error("Composite statements are not allowed")]
    CompositeStatementRejected,

    /// Placeholder count and bound value count disagree
    #[error("Internal error: {placeholders} placeholders but {values} bound values")]
    PlaceholderMismatch { placeholders: usize, values: usize },

    /// A pre- or post-processor failed
    #[error("Processor for {table}.{column} failed: {message}")]
    Processor {
        table: String,
        column: String,
        message: String,
    },

    /// `one()` found no rows
    #[error("Did not find any results for query, where exactly one was expected")]
    NoRows,

    /// `one()`/`one_or_none()` found more than one row
    #[error("Found too many results for query, where at most one was expected")]
    TooManyRows,

    /// `scalar()` on a row that is not exactly one column wide
    #[error("Expected a scalar output, got {0} columns instead")]
    NotScalar(usize),

    /// The result cursor was already iterated
    #[error("Result rows were already consumed")]
    ResultConsumed,

    /// `commit()` with no open transaction
    #[error("No changes in an open transaction, cannot commit nothing")]
    NothingToCommit,

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl CompositorError {
    /// Classify the error into the compositor taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTable(_)
            | Self::UnknownColumn { .. }
            | Self::UnsupportedOperator(_)
            | Self::InvalidInput(_)
            | Self::DimensionMismatch { .. }
            | Self::CompositeStatementRejected
            | Self::Processor { .. } => ErrorKind::InvalidInput,
            Self::FieldAlreadySet(_)
            | Self::MissingRequiredField(_)
            | Self::PlaceholderMismatch { .. }
            | Self::ResultConsumed
            | Self::NothingToCommit => ErrorKind::BuilderMisuse,
            Self::NoRows | Self::TooManyRows | Self::NotScalar(_) => ErrorKind::QueryResult,
            Self::Connection(_) | Self::Sqlite(_) => ErrorKind::Database,
        }
    }

    /// HTTP status a request handler failing with this error should produce
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NoRows => 404,
            _ if self.kind() == ErrorKind::InvalidInput => 400,
            _ => 500,
        }
    }

    pub(crate) fn unknown_column(table: &str, column: &str) -> Self {
        Self::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

/// Result type for compositor operations
pub type CompositorResult<T> = Result<T, CompositorError>;
