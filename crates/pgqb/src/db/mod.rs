//! Query sessions.
//!
//! A [`Db`] owns one connection, one [`QueryBuilder`] and, while a transaction
//! is open, its handle. Fluent calls accumulate into the builder; a terminal
//! operation renders the statement, runs it (through the open transaction, if
//! any) and resets clause state for the next chain.
//!
//! ```ignore
//! use pgqb::prelude::*;
//!
//! let mut db = pgqb::pg::connect(&url, QbConfig::default()).await?;
//! let id = db.table("users").insert_get_id(data! { "name" => "ada", "age" => 36 }).await?;
//! let ada = db.table("users").find(id).await?;
//! let adults = db.table("users").where_gte("age", 18).order_by("id", "ASC").get().await?;
//! ```

use crate::builder::{Fluent, QueryBuilder};
use crate::bulk::Batch;
use crate::catalog::Catalog;
use crate::client::{Connection, Executor, TxHandle};
use crate::config::QbConfig;
use crate::error::{QbError, QbResult};
use crate::record::Record;
use crate::schema::{TableSpec, add_candidates, alter_statements, create_statements};
use crate::sql::{Statement, truncate_sql_bytes};
use crate::value::Value;
use std::collections::HashSet;

#[cfg(test)]
mod tests;

/// A query session over one connection.
pub struct Db<C: Connection> {
    pub(crate) conn: C,
    pub(crate) builder: QueryBuilder,
    pub(crate) txn: Option<C::Tx>,
    pub(crate) config: QbConfig,
    last_sql: Option<Statement>,
}

impl<C: Connection> Fluent for Db<C> {
    fn state(&mut self) -> &mut QueryBuilder {
        &mut self.builder
    }
}

impl<C: Connection> Db<C> {
    /// Session with the default configuration.
    pub fn new(conn: C) -> Self {
        Self::with_config(conn, QbConfig::default())
    }

    pub fn with_config(conn: C, config: QbConfig) -> Self {
        Self {
            conn,
            builder: QueryBuilder::with_mode(config.connective_mode),
            txn: None,
            config,
            last_sql: None,
        }
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn config(&self) -> &QbConfig {
        &self.config
    }

    /// The accumulated builder state.
    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// Whether a transaction is bound to this session.
    pub fn in_tx(&self) -> bool {
        self.txn.is_some()
    }

    /// The last statement this session handed to the connection.
    pub fn last_sql(&self) -> Option<&Statement> {
        self.last_sql.as_ref()
    }

    /// Preview the SELECT for the current state. Pending UNION parts are
    /// included but not drained, and clause state is kept.
    pub fn to_sql(&self) -> QbResult<Statement> {
        self.builder.to_select()
    }

    // ==================== Execution plumbing ====================

    fn record(&mut self, stmt: &Statement) {
        if self.config.log_sql {
            let sql = match self.config.max_logged_sql_length {
                Some(max) => truncate_sql_bytes(&stmt.sql, max),
                None => stmt.sql.clone(),
            };
            tracing::debug!(
                target: "pgqb.sql",
                sql = %sql,
                params = stmt.params.len(),
                in_tx = self.txn.is_some(),
                "executing"
            );
        }
        self.last_sql = Some(stmt.clone());
    }

    /// Render with `render`, then reset clause state whatever the outcome.
    fn take(
        &mut self,
        render: impl FnOnce(&QueryBuilder) -> QbResult<Statement>,
    ) -> QbResult<Statement> {
        let result = render(&self.builder);
        self.builder.finish(result)
    }

    pub(crate) async fn fetch(&mut self, stmt: Statement) -> QbResult<Vec<Record>> {
        self.record(&stmt);
        match &self.txn {
            Some(tx) => tx.query(&stmt.sql, &stmt.params).await,
            None => self.conn.query(&stmt.sql, &stmt.params).await,
        }
    }

    async fn fetch_opt(&mut self, stmt: Statement) -> QbResult<Option<Record>> {
        self.record(&stmt);
        match &self.txn {
            Some(tx) => tx.query_opt(&stmt.sql, &stmt.params).await,
            None => self.conn.query_opt(&stmt.sql, &stmt.params).await,
        }
    }

    async fn run(&mut self, stmt: Statement) -> QbResult<u64> {
        self.record(&stmt);
        match &self.txn {
            Some(tx) => tx.execute(&stmt.sql, &stmt.params).await,
            None => self.conn.execute(&stmt.sql, &stmt.params).await,
        }
    }

    async fn run_batch(&mut self, sql: &str) -> QbResult<()> {
        self.record(&Statement::raw(sql));
        match &self.txn {
            Some(tx) => tx.batch_execute(sql).await,
            None => self.conn.batch_execute(sql).await,
        }
    }

    /// First column of the first row, `NULL` when nothing came back.
    async fn fetch_scalar(&mut self, stmt: Statement) -> QbResult<Value> {
        Ok(self
            .fetch_opt(stmt)
            .await?
            .and_then(Record::into_first)
            .unwrap_or_default())
    }

    pub(crate) async fn fetch_count(&mut self, stmt: Statement) -> QbResult<u64> {
        let value = self.fetch_scalar(stmt).await?;
        Ok(value
            .as_i64()
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0))
    }

    // ==================== Reads ====================

    /// Run the SELECT, draining pending UNION parts.
    pub async fn get(&mut self) -> QbResult<Vec<Record>> {
        let stmt = self.builder.take_select()?;
        self.fetch(stmt).await
    }

    /// First row, or [`QbError::NoRowsProduced`].
    pub async fn first(&mut self) -> QbResult<Record> {
        self.builder.limit = 1;
        let stmt = self.builder.take_select()?;
        let sql = stmt.sql.clone();
        self.fetch_opt(stmt)
            .await?
            .ok_or(QbError::NoRowsProduced(sql))
    }

    /// Row whose `id` equals `id`.
    pub async fn find(&mut self, id: impl Into<Value>) -> QbResult<Record> {
        self.where_eq("id", id);
        self.first().await
    }

    /// One column across all matching rows.
    pub async fn pull(&mut self, column: &str) -> QbResult<Vec<Value>> {
        self.builder.columns = vec![column.to_string()];
        let rows = self.get().await?;
        Ok(rows
            .into_iter()
            .map(|r| r.into_first().unwrap_or_default())
            .collect())
    }

    /// `(key, value)` pairs across all matching rows.
    pub async fn pull_pairs(&mut self, key: &str, value: &str) -> QbResult<Vec<(Value, Value)>> {
        self.builder.columns = vec![key.to_string(), value.to_string()];
        let rows = self.get().await?;
        Ok(rows
            .iter()
            .map(|r| {
                (
                    r.get_index(0).cloned().unwrap_or_default(),
                    r.get_index(1).cloned().unwrap_or_default(),
                )
            })
            .collect())
    }

    /// One column of the first matching row.
    pub async fn value(&mut self, column: &str) -> QbResult<Value> {
        self.builder.columns = vec![column.to_string()];
        Ok(self.first().await?.into_first().unwrap_or_default())
    }

    pub async fn count(&mut self) -> QbResult<u64> {
        let stmt = self.take(QueryBuilder::to_count)?;
        self.fetch_count(stmt).await
    }

    async fn aggregate(&mut self, function: &str, column: &str) -> QbResult<Value> {
        let expr = format!("{function}({column})");
        let stmt = self.take(|qb| qb.to_aggregate(&expr))?;
        self.fetch_scalar(stmt).await
    }

    pub async fn avg(&mut self, column: &str) -> QbResult<Value> {
        self.aggregate("AVG", column).await
    }

    pub async fn min(&mut self, column: &str) -> QbResult<Value> {
        self.aggregate("MIN", column).await
    }

    pub async fn max(&mut self, column: &str) -> QbResult<Value> {
        self.aggregate("MAX", column).await
    }

    pub async fn sum(&mut self, column: &str) -> QbResult<Value> {
        self.aggregate("SUM", column).await
    }

    pub async fn exists(&mut self) -> QbResult<bool> {
        let stmt = self.take(QueryBuilder::to_exists)?;
        Ok(self.fetch_scalar(stmt).await?.as_bool().unwrap_or(false))
    }

    pub async fn does_not_exist(&mut self) -> QbResult<bool> {
        Ok(!self.exists().await?)
    }

    // ==================== Writes ====================

    /// Insert one row; returns the affected-row count.
    pub async fn insert(&mut self, data: impl AsRef<[(String, Value)]>) -> QbResult<u64> {
        let stmt = self.take(|qb| qb.to_insert(data.as_ref(), false))?;
        self.run(stmt).await
    }

    /// Insert one row and return its generated `id`.
    pub async fn insert_get_id(&mut self, data: impl AsRef<[(String, Value)]>) -> QbResult<i64> {
        let stmt = self.take(|qb| qb.to_insert(data.as_ref(), true))?;
        let sql = stmt.sql.clone();
        let id = self.fetch_scalar(stmt).await?;
        id.as_i64().ok_or(QbError::NoRowsProduced(sql))
    }

    /// Load many rows with `COPY ... FROM STDIN`.
    ///
    /// The first row fixes the column order. Without an open transaction the
    /// load runs in its own and is rolled back on failure.
    pub async fn insert_batch(&mut self, rows: &[crate::value::Data]) -> QbResult<u64> {
        let table = self.builder.table.clone();
        let shaped = self.builder.ready().and_then(|_| Batch::from_rows(rows));
        let batch = self.builder.finish(shaped)?;
        let stmt = Statement::raw(batch.copy_statement(&table));
        let lines = batch.encode();
        self.record(&stmt);

        if let Some(tx) = &self.txn {
            return tx.copy_in(&stmt.sql, lines).await;
        }

        tracing::debug!(target: "pgqb.tx", "begin (batch insert)");
        let tx = self.conn.begin().await?;
        match tx.copy_in(&stmt.sql, lines).await {
            Ok(loaded) => {
                tx.commit().await?;
                tracing::debug!(target: "pgqb.tx", rows = loaded, "commit (batch insert)");
                Ok(loaded)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        target: "pgqb.tx",
                        error = %rollback_err,
                        "rollback after failed batch insert failed"
                    );
                }
                Err(err)
            }
        }
    }

    /// `UPDATE ... SET ...` for the matching rows; returns the affected-row count.
    pub async fn update(&mut self, data: impl AsRef<[(String, Value)]>) -> QbResult<u64> {
        let stmt = self.take(|qb| qb.to_update(data.as_ref()))?;
        self.run(stmt).await
    }

    pub async fn delete(&mut self) -> QbResult<u64> {
        let stmt = self.take(QueryBuilder::to_delete)?;
        self.run(stmt).await
    }

    /// Upsert on `conflict`, overwriting every inserted column.
    pub async fn replace(
        &mut self,
        data: impl AsRef<[(String, Value)]>,
        conflict: &str,
    ) -> QbResult<u64> {
        let stmt = self.take(|qb| qb.to_replace(data.as_ref(), conflict))?;
        self.run(stmt).await
    }

    /// `column = column + amount` on every row of the table.
    pub async fn increase(&mut self, column: &str, amount: u64) -> QbResult<u64> {
        let stmt = self.take(|qb| qb.to_increment(column, amount, false))?;
        self.run(stmt).await
    }

    /// `column = column - amount` on every row of the table.
    pub async fn decrease(&mut self, column: &str, amount: u64) -> QbResult<u64> {
        let stmt = self.take(|qb| qb.to_increment(column, amount, true))?;
        self.run(stmt).await
    }

    // ==================== Table-level DDL ====================

    async fn run_tables(&mut self, prefix: &str, tables: &[&str]) -> QbResult<()> {
        if tables.is_empty() {
            return Err(QbError::invalid_argument(format!(
                "{prefix} needs at least one table"
            )));
        }
        let sql = format!("{prefix} {}", tables.join(", "));
        self.run_batch(&sql).await
    }

    /// `DROP TABLE a, b`.
    pub async fn drop(&mut self, tables: &[&str]) -> QbResult<()> {
        self.run_tables("DROP TABLE", tables).await
    }

    /// `DROP TABLE IF EXISTS a, b`.
    pub async fn drop_if_exists(&mut self, tables: &[&str]) -> QbResult<()> {
        self.run_tables("DROP TABLE IF EXISTS", tables).await
    }

    /// `TRUNCATE a, b`.
    pub async fn truncate(&mut self, tables: &[&str]) -> QbResult<()> {
        self.run_tables("TRUNCATE", tables).await
    }

    /// `ALTER TABLE from RENAME TO to`.
    pub async fn rename(&mut self, from: &str, to: &str) -> QbResult<()> {
        self.run_batch(&format!("ALTER TABLE {from} RENAME TO {to}"))
            .await
    }
}

impl<C: Connection + Catalog> Db<C> {
    /// Whether `table` exists in the configured schema.
    pub async fn has_table(&self, table: &str) -> QbResult<bool> {
        self.conn
            .table_exists(&self.config.default_schema, table)
            .await
    }

    /// Whether every column exists on the selected table.
    pub async fn has_columns(&mut self, columns: &[&str]) -> QbResult<bool> {
        let ready = self.builder.ready();
        self.builder.finish(ready)?;
        let table = self.builder.table.clone();
        for column in columns {
            let found = self
                .conn
                .column_exists(&self.config.default_schema, &table, column)
                .await?;
            if !found {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Create `table` from `define`, or alter it if it already exists.
    /// Returns the executed statements; an empty definition runs nothing.
    ///
    /// Statements run one by one and the first failure aborts the rest.
    /// Already-applied DDL is not undone.
    pub async fn schema(
        &mut self,
        table: &str,
        define: impl FnOnce(&mut TableSpec),
    ) -> QbResult<Vec<String>> {
        let mut spec = TableSpec::new(table);
        define(&mut spec);
        if let Some(err) = spec.build_error() {
            return Err(QbError::invalid_argument(err));
        }
        if spec.columns.is_empty() {
            return Ok(Vec::new());
        }

        let schema = self.config.default_schema.clone();
        let statements = if self.conn.table_exists(&schema, table).await? {
            let mut existing = HashSet::new();
            for column in add_candidates(&spec) {
                if self.conn.column_exists(&schema, table, column).await? {
                    existing.insert(column.to_string());
                }
            }
            alter_statements(&spec, &existing)
        } else {
            create_statements(&spec)
        };

        for statement in &statements {
            self.run_batch(statement).await?;
        }
        Ok(statements)
    }

    /// Create-only variant of [`schema`](Self::schema): renders
    /// `CREATE TABLE IF NOT EXISTS` without consulting the catalog.
    pub async fn schema_if_not_exists(
        &mut self,
        table: &str,
        define: impl FnOnce(&mut TableSpec),
    ) -> QbResult<Vec<String>> {
        let mut spec = TableSpec::new(table);
        spec.existence = crate::schema::Existence::IfNotExists;
        define(&mut spec);
        if let Some(err) = spec.build_error() {
            return Err(QbError::invalid_argument(err));
        }
        if spec.columns.is_empty() {
            return Ok(Vec::new());
        }

        let statements = create_statements(&spec);
        for statement in &statements {
            self.run_batch(statement).await?;
        }
        Ok(statements)
    }
}
