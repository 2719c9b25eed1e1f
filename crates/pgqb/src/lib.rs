//! # pgqb
//!
//! A fluent PostgreSQL query and schema builder.
//!
//! ## Features
//!
//! - **Fluent chains**: describe a statement with `table(..).where_*(..).order_by(..)`
//!   and finish it with a terminal operation (`get`, `insert`, `update`, ...)
//! - **Positional bindings**: values become `$1, $2, ...` numbered left to right,
//!   across SET clauses, WHERE clauses, EXISTS sub-selects and UNION parts
//! - **Schema definitions**: `schema()` creates a missing table or alters an
//!   existing one, column by column
//! - **Transactions**: `in_transaction()` commits only when the unit of work
//!   reports that it changed something
//! - **Chunked reads**: `chunk()` pages through large result sets
//!
//! ## Example
//!
//! ```ignore
//! use pgqb::prelude::*;
//!
//! let mut db = pgqb::pg::connect("postgres://localhost/app", QbConfig::default()).await?;
//!
//! db.schema("users", |t| {
//!     t.increments("id");
//!     t.string("name", 64).not_null();
//!     t.integer("age");
//! })
//! .await?;
//!
//! let id = db.table("users").insert_get_id(data! { "name" => "ada", "age" => 36 }).await?;
//! let adults = db
//!     .table("users")
//!     .where_gte("age", 18)
//!     .order_by("id", "ASC")
//!     .limit(10)
//!     .get()
//!     .await?;
//! ```
//!
//! The builder renders without a database too:
//!
//! ```ignore
//! let mut qb = QueryBuilder::new();
//! qb.table("users").where_in("id", [1, 2, 3]);
//! assert_eq!(qb.to_select()?.sql, "SELECT * FROM users WHERE 1=1 AND id IN ($1, $2, $3)");
//! ```

pub mod builder;
pub mod catalog;
mod chunk;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod pg;
pub mod predicate;
pub mod prelude;
pub mod record;
pub mod schema;
pub mod sql;
pub mod transaction;
pub mod value;

mod bulk;

#[cfg(test)]
mod mock;

pub use builder::{Fluent, JoinKind, QueryBuilder};
pub use catalog::Catalog;
pub use client::{Connection, Executor, TxHandle};
pub use config::QbConfig;
pub use db::Db;
pub use error::{QbError, QbResult};
pub use pg::{PgConnection, PgTransaction, connect};
pub use predicate::{Connective, ConnectiveMode};
pub use record::Record;
pub use schema::{ColumnSpec, Existence, TableSpec};
pub use sql::{Sql, Statement, sql};
pub use transaction::{Commit, TxOutcome};
pub use value::{Data, Value};
