//! Positional binding allocation.
//!
//! [`Sql`] stores SQL fragments and bind values separately and generates the
//! `$1, $2, ...` placeholders only when the final text is produced. This lets
//! the builder compose SET clauses, WHERE clauses, EXISTS sub-selects and
//! UNION parts independently while the finished statement still numbers its
//! placeholders strictly left to right.
//!
//! # Example
//!
//! ```ignore
//! use pgqb::sql;
//!
//! let mut q = sql("SELECT * FROM users WHERE 1=1");
//! q.push(" AND status = ").push_bind("active");
//! q.push(" AND id IN (").push_bind_list(vec![1, 2, 3]).push(")");
//!
//! let stmt = q.into_statement(1);
//! assert_eq!(stmt.sql, "SELECT * FROM users WHERE 1=1 AND status = $1 AND id IN ($2, $3, $4)");
//! ```

mod builder;
mod parts;

#[cfg(test)]
mod tests;

pub use builder::{Sql, Statement};

/// Start building a SQL fragment.
pub fn sql(initial_sql: impl Into<String>) -> Sql {
    Sql::new(initial_sql)
}

/// Truncate `sql` to at most `max_bytes`, respecting UTF-8 boundaries.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> String {
    if sql.len() <= max_bytes {
        return sql.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end])
}
