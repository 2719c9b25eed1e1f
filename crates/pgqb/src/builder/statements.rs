//! Statement rendering: SELECT, aggregates, EXISTS, INSERT, UPSERT, UPDATE,
//! DELETE and increment/decrement.
//!
//! The `to_*` methods render from the current state without touching it, so
//! they double as previews. Sessions call them and then reset clause state.

use super::QueryBuilder;
use crate::error::{QbError, QbResult};
use crate::sql::{Sql, Statement};
use crate::value::Value;

/// Double-quote a table identifier, one segment per `.`-separated part.
pub(crate) fn quote_table(table: &str) -> String {
    table
        .split('.')
        .map(|segment| format!("\"{}\"", segment.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Payloads must name at least one column and carry scalar values only.
pub(crate) fn check_payload(data: &[(String, Value)]) -> QbResult<()> {
    if data.is_empty() {
        return Err(QbError::EmptyPayload);
    }
    if let Some((column, _)) = data.iter().find(|(_, value)| value.is_list()) {
        return Err(QbError::validation(format!(
            "column '{column}' has a list value, payload values must be scalars"
        )));
    }
    Ok(())
}

impl QueryBuilder {
    fn select_with_unions(&self) -> Sql {
        let current = self.compose_select();
        if self.union.is_empty() {
            return current;
        }

        let glue = if self.union_all {
            " UNION ALL "
        } else {
            " UNION "
        };
        let mut out = Sql::empty();
        for part in &self.union {
            out.push_sql(part.clone()).push(glue);
        }
        out.push_sql(current);
        out
    }

    /// SELECT for the current state, glued after any pending UNION parts.
    /// Does not drain them.
    pub fn to_select(&self) -> QbResult<Statement> {
        self.ready()?;
        if let Some(err) = &self.union_error {
            return Err(err.clone().into());
        }
        Ok(self
            .select_with_unions()
            .into_statement(self.start_bindings_at))
    }

    /// Render the SELECT, drain pending UNION parts and reset clause state.
    /// A rejected UNION part drains the buffer too, once its error is returned.
    pub(crate) fn take_select(&mut self) -> QbResult<Statement> {
        let result = self.to_select();
        if result.is_ok() || (self.ready().is_ok() && self.union_error.is_some()) {
            self.union.clear();
            self.union_all = false;
            self.union_error = None;
        }
        self.finish(result)
    }

    /// `SELECT <expr> FROM table ...` ignoring the projection, UNION parts and
    /// `FOR UPDATE`.
    pub fn to_aggregate(&self, expr: &str) -> QbResult<Statement> {
        self.ready()?;
        Ok(self
            .compose_aggregate(expr)
            .into_statement(self.start_bindings_at))
    }

    pub fn to_count(&self) -> QbResult<Statement> {
        self.to_aggregate("COUNT(*)")
    }

    /// `SELECT EXISTS(SELECT 1 FROM "table" ...)`.
    pub fn to_exists(&self) -> QbResult<Statement> {
        self.ready()?;
        let mut out = Sql::new(format!(
            "SELECT EXISTS(SELECT 1 FROM {}",
            quote_table(&self.table)
        ));
        self.compose_clauses(&mut out);
        out.push(")");
        Ok(out.into_statement(self.start_bindings_at))
    }

    fn compose_insert(&self, data: &[(String, Value)]) -> Sql {
        let columns: Vec<&str> = data.iter().map(|(column, _)| column.as_str()).collect();
        let mut out = Sql::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            quote_table(&self.table),
            columns.join(", ")
        ));
        for (i, (_, value)) in data.iter().enumerate() {
            if i > 0 {
                out.push(", ");
            }
            out.push_bind(value.clone());
        }
        out.push(")");
        out
    }

    /// `INSERT INTO "table" (cols) VALUES ($1, ...)`, optionally `RETURNING id`.
    pub fn to_insert(&self, data: &[(String, Value)], returning_id: bool) -> QbResult<Statement> {
        self.ready()?;
        check_payload(data)?;
        let mut out = self.compose_insert(data);
        if returning_id {
            out.push(" RETURNING id");
        }
        Ok(out.into_statement(self.start_bindings_at))
    }

    /// INSERT with `ON CONFLICT(conflict) DO UPDATE SET c = EXCLUDED.c` for
    /// every inserted column.
    pub fn to_replace(&self, data: &[(String, Value)], conflict: &str) -> QbResult<Statement> {
        self.ready()?;
        check_payload(data)?;
        let mut out = self.compose_insert(data);
        let sets: Vec<String> = data
            .iter()
            .map(|(column, _)| format!("{column} = EXCLUDED.{column}"))
            .collect();
        out.push(&format!(
            " ON CONFLICT({conflict}) DO UPDATE SET {}",
            sets.join(", ")
        ));
        Ok(out.into_statement(self.start_bindings_at))
    }

    /// `UPDATE "table" SET c = $1, ... [FROM other]` plus clauses. WHERE
    /// placeholders continue after the SET placeholders.
    pub fn to_update(&self, data: &[(String, Value)]) -> QbResult<Statement> {
        self.ready()?;
        check_payload(data)?;
        let mut out = Sql::new(format!("UPDATE {} SET ", quote_table(&self.table)));
        for (i, (column, value)) in data.iter().enumerate() {
            if i > 0 {
                out.push(", ");
            }
            out.push(column).push(" = ").push_bind(value.clone());
        }
        if let Some(from) = &self.from {
            out.push(" FROM ").push(from);
        }
        self.compose_clauses(&mut out);
        Ok(out.into_statement(self.start_bindings_at))
    }

    /// `DELETE FROM "table"` plus clauses.
    pub fn to_delete(&self) -> QbResult<Statement> {
        self.ready()?;
        let mut out = Sql::new(format!("DELETE FROM {}", quote_table(&self.table)));
        self.compose_clauses(&mut out);
        Ok(out.into_statement(self.start_bindings_at))
    }

    /// `UPDATE "table" SET c = c + n` (or `-`), whole table, no clauses.
    pub fn to_increment(&self, column: &str, amount: u64, decrement: bool) -> QbResult<Statement> {
        self.ready()?;
        let sign = if decrement { '-' } else { '+' };
        Ok(Statement::raw(format!(
            "UPDATE {} SET {column} = {column} {sign} {amount}",
            quote_table(&self.table)
        )))
    }
}
