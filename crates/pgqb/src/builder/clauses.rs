//! Clause composition shared by SELECT, UPDATE, DELETE and EXISTS.

use super::QueryBuilder;
use crate::predicate::render_where;
use crate::sql::Sql;

impl QueryBuilder {
    /// Append clauses in their fixed order: joins, WHERE, GROUP BY, HAVING,
    /// ORDER BY, LIMIT, OFFSET, locking.
    pub(crate) fn compose_clauses(&self, out: &mut Sql) {
        self.compose_unlocked(out);
        if self.lock_for_update {
            out.push(" FOR UPDATE");
        }
    }

    /// Every clause except `FOR UPDATE`, which aggregates reject.
    fn compose_unlocked(&self, out: &mut Sql) {
        for join in &self.joins {
            out.push(join);
        }

        if !self.predicates.is_empty() {
            if let Some(raw) = &self.where_raw {
                tracing::warn!(
                    target: "pgqb.sql",
                    raw = %raw,
                    "raw WHERE ignored because structured predicates are present"
                );
            }
            render_where(&self.predicates, self.mode, out);
        } else if let Some(raw) = &self.where_raw {
            out.push(" WHERE ").push(raw);
        }

        if let Some(group_by) = &self.group_by {
            out.push(" GROUP BY ").push(group_by);
        }
        if let Some(having) = &self.having {
            out.push(" HAVING ").push(having);
        }

        if !self.order_by.is_empty() {
            let list: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{column} {direction}"))
                .collect();
            out.push(" ORDER BY ").push(&list.join(", "));
        } else if let Some(raw) = &self.order_by_raw {
            out.push(" ORDER BY ").push(raw);
        }

        if self.limit > 0 {
            out.push(" LIMIT ").push(&self.limit.to_string());
        }
        if self.offset > 0 {
            out.push(" OFFSET ").push(&self.offset.to_string());
        }
    }

    /// `SELECT <columns> FROM <table>` plus clauses, placeholders unnumbered.
    pub(crate) fn compose_select(&self) -> Sql {
        let mut out = Sql::new(format!("SELECT {} FROM {}", self.columns.join(", "), self.table));
        self.compose_clauses(&mut out);
        out
    }

    /// `SELECT <expr> FROM <table>` plus clauses, never locked.
    pub(crate) fn compose_aggregate(&self, expr: &str) -> Sql {
        let mut out = Sql::new(format!("SELECT {expr} FROM {}", self.table));
        self.compose_unlocked(&mut out);
        out
    }
}
