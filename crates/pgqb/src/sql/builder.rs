use super::parts::SqlPart;
use crate::value::Value;
use tokio_postgres::types::ToSql;

/// A parameter-safe SQL fragment buffer.
///
/// `Sql` stores SQL pieces and bind values separately and generates `$n`
/// placeholders only in [`Sql::to_sql_from`], so fragments can be appended to
/// each other without renumbering.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sql {
    parts: Vec<SqlPart>,
    params: Vec<Value>,
}

impl Sql {
    /// Create a new buffer with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        let initial = initial_sql.into();
        let parts = if initial.is_empty() {
            Vec::new()
        } else {
            vec![SqlPart::Raw(initial)]
        };
        Self {
            parts,
            params: Vec::new(),
        }
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append a placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(value.into());
        self
    }

    /// Append a comma-separated list of placeholders, one per scalar.
    ///
    /// Nested lists are flattened in encounter order. If nothing remains after
    /// flattening this appends `NULL`, so `IN (NULL)` stays valid SQL that
    /// matches no row.
    pub fn push_bind_list<T>(&mut self, values: impl IntoIterator<Item = T>) -> &mut Self
    where
        T: Into<Value>,
    {
        let flat: Vec<Value> = values
            .into_iter()
            .flat_map(|v| v.into().flatten())
            .collect();

        let mut iter = flat.into_iter();
        let Some(first) = iter.next() else {
            return self.push("NULL");
        };

        self.push_bind(first);
        for v in iter {
            self.push(", ");
            self.push_bind(v);
        }
        self
    }

    /// Append another fragment, consuming it. Its placeholders keep their
    /// relative order after the ones already in `self`.
    pub fn push_sql(&mut self, other: Sql) -> &mut Self {
        for part in other.parts {
            match part {
                SqlPart::Raw(s) => {
                    self.push(&s);
                }
                SqlPart::Param => self.parts.push(SqlPart::Param),
            }
        }
        self.params.extend(other.params);
        self
    }

    /// Returns `true` when no SQL and no parameters have been pushed.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Bind values in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Number of placeholders in the buffer.
    pub fn placeholder_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, SqlPart::Param))
            .count()
    }

    /// Render with placeholders numbered from `$1`.
    pub fn to_sql(&self) -> String {
        self.to_sql_from(1)
    }

    /// Render with placeholders numbered from `$start`.
    pub fn to_sql_from(&self, start: usize) -> String {
        let cap: usize = self
            .parts
            .iter()
            .map(|p| match p {
                SqlPart::Raw(s) => s.len(),
                SqlPart::Param => 4,
            })
            .sum();

        let mut out = String::with_capacity(cap);
        let mut idx = start;
        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    out.push('$');
                    out.push_str(&idx.to_string());
                    idx += 1;
                }
            }
        }
        out
    }

    /// Finish the buffer into a [`Statement`] numbered from `$start`.
    pub fn into_statement(self, start: usize) -> Statement {
        Statement {
            sql: self.to_sql_from(start),
            params: self.params,
        }
    }
}

/// Rendered SQL text plus its bind values, in placeholder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    /// A statement without bind values.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect()
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}
