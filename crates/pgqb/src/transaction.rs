//! Transaction coordination.
//!
//! [`Db::in_transaction`] binds a transaction to the session, runs a closure
//! on the same session and decides commit vs rollback from the closure's
//! value: a unit of work that changed nothing rolls back.
//!
//! ```ignore
//! use pgqb::prelude::*;
//!
//! let outcome = db
//!     .in_transaction(|db| {
//!         Box::pin(async move {
//!             let moved = db.table("accounts").where_eq("id", 1).decrease("balance", 100).await?;
//!             db.table("accounts").where_eq("id", 2).increase("balance", 100).await?;
//!             Ok(moved)
//!         })
//!     })
//!     .await?;
//! assert!(outcome.is_committed());
//! ```
//!
//! Explicit control is available through [`Db::begin`], [`Db::commit`] and
//! [`Db::rollback`]. Nesting is not supported.

use crate::client::{Connection, TxHandle};
use crate::db::Db;
use crate::error::{QbError, QbResult};
use crate::record::Record;
use futures_util::future::BoxFuture;

/// Whether a unit-of-work result should be committed.
pub trait Commit {
    fn should_commit(&self) -> bool;
}

macro_rules! impl_commit_int {
    ($($t:ty),*) => {
        $(
            impl Commit for $t {
                fn should_commit(&self) -> bool {
                    *self > 0
                }
            }
        )*
    };
}

impl_commit_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Commit for bool {
    fn should_commit(&self) -> bool {
        *self
    }
}

impl Commit for () {
    fn should_commit(&self) -> bool {
        false
    }
}

impl<T> Commit for Vec<T> {
    fn should_commit(&self) -> bool {
        !self.is_empty()
    }
}

impl Commit for Record {
    fn should_commit(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Commit> Commit for Option<T> {
    fn should_commit(&self) -> bool {
        self.as_ref().is_some_and(Commit::should_commit)
    }
}

/// How a transaction ended, with the closure's value.
#[derive(Debug, Clone, PartialEq)]
pub enum TxOutcome<T> {
    Committed(T),
    RolledBack(T),
}

impl<T> TxOutcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, TxOutcome::Committed(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            TxOutcome::Committed(v) | TxOutcome::RolledBack(v) => v,
        }
    }
}

impl<C: Connection> Db<C> {
    /// Open a transaction and bind it to this session.
    pub async fn begin(&mut self) -> QbResult<()> {
        if self.txn.is_some() {
            return Err(QbError::TransactionAlreadyOpen);
        }
        let tx = self.conn.begin().await?;
        tracing::debug!(target: "pgqb.tx", "begin");
        self.txn = Some(tx);
        Ok(())
    }

    /// Commit the bound transaction. The binding is cleared even on failure.
    pub async fn commit(&mut self) -> QbResult<()> {
        let tx = self.txn.take().ok_or(QbError::NoActiveTransaction)?;
        tx.commit().await?;
        tracing::debug!(target: "pgqb.tx", "commit");
        Ok(())
    }

    /// Roll back the bound transaction. The binding is cleared even on failure.
    pub async fn rollback(&mut self) -> QbResult<()> {
        let tx = self.txn.take().ok_or(QbError::NoActiveTransaction)?;
        tx.rollback().await?;
        tracing::debug!(target: "pgqb.tx", "rollback");
        Ok(())
    }

    /// Run `work` inside a transaction bound to this session.
    ///
    /// - `Err` from `work`: roll back and return the error. A failing rollback
    ///   is returned instead of the original error.
    /// - `Ok(v)`: commit when `v.should_commit()`, otherwise roll back.
    ///
    /// The transaction is unbound on every path.
    pub async fn in_transaction<T, F>(&mut self, work: F) -> QbResult<TxOutcome<T>>
    where
        T: Commit,
        F: for<'a> FnOnce(&'a mut Db<C>) -> BoxFuture<'a, QbResult<T>>,
    {
        self.begin().await?;
        let result = work(&mut *self).await;

        if self.txn.is_none() {
            // `work` finished the transaction itself.
            return match result {
                Ok(value) if value.should_commit() => Ok(TxOutcome::Committed(value)),
                Ok(value) => Ok(TxOutcome::RolledBack(value)),
                Err(err) => Err(err),
            };
        }

        match result {
            Ok(value) if value.should_commit() => {
                self.commit().await?;
                Ok(TxOutcome::Committed(value))
            }
            Ok(value) => {
                self.rollback().await?;
                Ok(TxOutcome::RolledBack(value))
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::warn!(
                        target: "pgqb.tx",
                        error = %err,
                        "rollback failed while surfacing an error"
                    );
                    return Err(rollback_err);
                }
                Err(err)
            }
        }
    }
}
