//! Error types for pgqb

use thiserror::Error;

/// Result type alias for pgqb operations
pub type QbResult<T> = Result<T, QbError>;

/// Error types for query construction and execution
#[derive(Debug, Error)]
pub enum QbError {
    /// A terminal operation ran before `table()` selected a table
    #[error("sql: there was no table() call with table name set")]
    NoTableSet,

    /// Insert/update/replace called without any column
    #[error("sql: empty data payload, at least one column is required")]
    EmptyPayload,

    /// IN / NOT IN given something that is not a list
    #[error("sql: IN/NOT IN expects a list value for '{0}'")]
    InvalidListArgument(String),

    /// Transaction-scoped operation without an open transaction
    #[error("sql: there is no open transaction on this session")]
    NoActiveTransaction,

    /// `begin` while a transaction is already bound to the session
    #[error("sql: a transaction is already open on this session")]
    TransactionAlreadyOpen,

    /// First/Value found no matching row
    #[error("no records were produced by query: {0}")]
    NoRowsProduced(String),

    /// Invalid argument to a fluent or terminal call (pagination, chunk size, DDL modifiers)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Payload shape error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Driver error, passed through as reported
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Row decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl QbError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a missing `table()` error
    pub fn is_no_table(&self) -> bool {
        matches!(self, Self::NoTableSet)
    }

    /// Check if this is a "no rows" error
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRowsProduced(_))
    }

    /// SQLSTATE of a driver error, if the server reported one
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Query(err) => err.as_db_error().map(|db| db.code().code()),
            _ => None,
        }
    }

    /// Check if the server rejected the statement with a unique violation (23505)
    pub fn is_unique_violation(&self) -> bool {
        self.sql_state() == Some("23505")
    }

    /// Check if the server rejected the statement with a foreign key violation (23503)
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sql_state() == Some("23503")
    }
}

/// Error recorded by a fluent call and surfaced by the next terminal operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeferredError {
    NoTable,
    InvalidList(String),
    InvalidArgument(String),
}

impl From<DeferredError> for QbError {
    fn from(err: DeferredError) -> Self {
        match err {
            DeferredError::NoTable => QbError::NoTableSet,
            DeferredError::InvalidList(column) => QbError::InvalidListArgument(column),
            DeferredError::InvalidArgument(message) => QbError::InvalidArgument(message),
        }
    }
}
