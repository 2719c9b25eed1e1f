//! Execution collaborator traits.
//!
//! The builders only render SQL; a [`Db`](crate::Db) session hands the rendered
//! statements to an [`Executor`]. The PostgreSQL implementation lives in
//! [`pg`](crate::pg); tests script their own.

use crate::error::QbResult;
use crate::record::Record;
use crate::value::Value;
use std::future::Future;

/// Something that can run statements: a connection or an open transaction.
pub trait Executor: Send + Sync {
    /// Run a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = QbResult<Vec<Record>>> + Send;

    /// Run a query and return the first row, if any.
    ///
    /// Extra rows are ignored.
    fn query_opt(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = QbResult<Option<Record>>> + Send {
        async move { Ok(self.query(sql, params).await?.into_iter().next()) }
    }

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> impl Future<Output = QbResult<u64>> + Send;

    /// Run one or more `;`-separated statements without parameters.
    fn batch_execute(&self, sql: &str) -> impl Future<Output = QbResult<()>> + Send;

    /// Stream pre-encoded `COPY ... FROM STDIN` text rows; returns the number of
    /// rows loaded.
    fn copy_in(&self, sql: &str, rows: Vec<String>) -> impl Future<Output = QbResult<u64>> + Send;
}

/// A connection that can open a transaction.
pub trait Connection: Executor {
    type Tx: TxHandle;

    fn begin(&self) -> impl Future<Output = QbResult<Self::Tx>> + Send;
}

/// An open transaction. Finishing it consumes the handle.
pub trait TxHandle: Executor {
    fn commit(self) -> impl Future<Output = QbResult<()>> + Send;

    fn rollback(self) -> impl Future<Output = QbResult<()>> + Send;
}
