//! Fluent builder state and statement rendering.
//!
//! [`QueryBuilder`] accumulates clause fragments for one logical statement.
//! The fluent surface lives on the [`Fluent`] trait so the same chain works on a
//! bare builder (for rendering only) and on a [`Db`](crate::Db) session (for
//! execution):
//!
//! ```ignore
//! use pgqb::prelude::*;
//!
//! let mut qb = QueryBuilder::new();
//! qb.table("users")
//!     .where_gte("age", 18)
//!     .order_by("id", "ASC")
//!     .limit(10);
//! let stmt = qb.to_select()?;
//! assert_eq!(stmt.sql, "SELECT * FROM users WHERE 1=1 AND age >= $1 ORDER BY id ASC LIMIT 10");
//! ```
//!
//! ## Lifecycle
//!
//! - `table()` resets every clause (the pending UNION parts survive).
//! - Terminal operations render, then reset clause state but keep the table.
//! - Fluent calls never fail; bad input is recorded and surfaced by the next
//!   terminal operation, after the missing-table check.

mod clauses;
mod join;
mod statements;
mod traits;
mod where_clause;

pub use join::JoinKind;
pub use traits::Fluent;

pub(crate) use statements::quote_table;

use crate::error::{DeferredError, QbError, QbResult};
use crate::predicate::{ConnectiveMode, Predicate};
use crate::sql::Sql;


/// Accumulated description of one in-progress statement.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    pub(crate) table: String,
    pub(crate) from: Option<String>,
    pub(crate) columns: Vec<String>,
    pub(crate) joins: Vec<String>,
    pub(crate) predicates: Vec<Predicate>,
    pub(crate) where_raw: Option<String>,
    pub(crate) group_by: Option<String>,
    pub(crate) having: Option<String>,
    pub(crate) order_by: Vec<(String, String)>,
    pub(crate) order_by_raw: Option<String>,
    pub(crate) limit: u64,
    pub(crate) offset: u64,
    pub(crate) page: u64,
    pub(crate) size: u64,
    pub(crate) union: Vec<Sql>,
    pub(crate) union_all: bool,
    /// Error of a rejected UNION part; survives `table()` until a SELECT drains it.
    pub(crate) union_error: Option<DeferredError>,
    pub(crate) lock_for_update: bool,
    pub(crate) start_bindings_at: usize,
    pub(crate) mode: ConnectiveMode,
    /// First invalid fluent input, surfaced by the next terminal operation.
    pub(crate) build_error: Option<DeferredError>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Create an empty builder using [`ConnectiveMode::ImplicitAnd`].
    pub fn new() -> Self {
        Self::with_mode(ConnectiveMode::default())
    }

    /// Create an empty builder with an explicit connective mode.
    pub fn with_mode(mode: ConnectiveMode) -> Self {
        Self {
            table: String::new(),
            from: None,
            columns: vec!["*".to_string()],
            joins: Vec::new(),
            predicates: Vec::new(),
            where_raw: None,
            group_by: None,
            having: None,
            order_by: Vec::new(),
            order_by_raw: None,
            limit: 0,
            offset: 0,
            page: 0,
            size: 0,
            union: Vec::new(),
            union_all: false,
            union_error: None,
            lock_for_update: false,
            start_bindings_at: 1,
            mode,
            build_error: None,
        }
    }

    /// Shorthand for `QueryBuilder::new()` followed by `table(name)`.
    pub fn for_table(table: &str) -> Self {
        let mut qb = Self::new();
        qb.table = table.to_string();
        qb
    }

    /// The selected table, empty before `table()`.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn connective_mode(&self) -> ConnectiveMode {
        self.mode
    }

    /// Number of UNION parts waiting for the next SELECT.
    pub fn pending_unions(&self) -> usize {
        self.union.len()
    }

    /// Fail with the missing-table error, then with the first recorded
    /// fluent error.
    pub(crate) fn ready(&self) -> QbResult<()> {
        if self.table.is_empty() {
            return Err(QbError::NoTableSet);
        }
        match &self.build_error {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }

    /// Record a fluent-call error; the first one wins.
    pub(crate) fn defer(&mut self, err: DeferredError) {
        if self.build_error.is_none() {
            self.build_error = Some(err);
        }
    }

    /// Clear clause state, keeping the table, the mode and pending UNION parts.
    pub(crate) fn reset_clauses(&mut self) {
        self.from = None;
        self.columns = vec!["*".to_string()];
        self.joins.clear();
        self.predicates.clear();
        self.where_raw = None;
        self.group_by = None;
        self.having = None;
        self.order_by.clear();
        self.order_by_raw = None;
        self.limit = 0;
        self.offset = 0;
        self.page = 0;
        self.size = 0;
        self.lock_for_update = false;
        self.start_bindings_at = 1;
        self.build_error = None;
    }

    /// Clear everything except pending UNION parts and the mode.
    pub(crate) fn reset(&mut self) {
        self.reset_clauses();
        self.table.clear();
    }

    /// Reset clause state and pass `result` through.
    pub(crate) fn finish<T>(&mut self, result: QbResult<T>) -> QbResult<T> {
        self.reset_clauses();
        result
    }
}
