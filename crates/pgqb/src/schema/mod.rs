//! Table definitions for `Db::schema`.
//!
//! A [`TableSpec`] collects column definitions through a fluent vocabulary.
//! Type methods append a column; modifier methods (`not_null`, `index`,
//! `comment`, ...) apply to the most recently added column.
//!
//! ```ignore
//! db.schema("users", |t| {
//!     t.increments("id");
//!     t.string("email", 128).not_null().unique("users_email_uidx");
//!     t.date_time("created_at", true);
//!     t.table_comment("registered users");
//! })
//! .await?;
//! ```

mod compose;


pub(crate) use compose::{add_candidates, alter_statements, create_statements};

use std::collections::HashSet;

/// Existence qualifier of a table, column or index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Existence {
    #[default]
    Unspecified,
    IfExists,
    IfNotExists,
}

impl Existence {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Existence::Unspecified => "",
            Existence::IfExists => "IF EXISTS ",
            Existence::IfNotExists => "IF NOT EXISTS ",
        }
    }
}

/// One column (or index/drop/rename instruction) of a [`TableSpec`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub index: bool,
    pub concurrent_index: bool,
    pub dropped: bool,
    pub modified: bool,
    pub rename_to: Option<String>,
    /// Literal SQL text of the default.
    pub default: Option<String>,
    pub collation: Option<String>,
    pub comment: Option<String>,
    /// Rendered `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY ...` statement.
    pub foreign_key: Option<String>,
    pub index_name: Option<String>,
    pub includes: Vec<String>,
    pub existence: Existence,
}

impl ColumnSpec {
    fn typed(name: &str, column_type: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            column_type: column_type.into(),
            ..Self::default()
        }
    }
}

/// Collected definition of one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSpec {
    pub name: String,
    pub existence: Existence,
    pub columns: Vec<ColumnSpec>,
    pub comment: Option<String>,
    pub(crate) build_error: Option<String>,
}

impl TableSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Statements `Db::schema` runs when the table does not exist yet.
    pub fn to_create_statements(&self) -> Vec<String> {
        create_statements(self)
    }

    /// Statements `Db::schema` runs against an existing table whose columns
    /// are `existing`.
    pub fn to_alter_statements(&self, existing: &HashSet<String>) -> Vec<String> {
        alter_statements(self, existing)
    }

    /// First modifier misuse, if any.
    pub fn build_error(&self) -> Option<&str> {
        self.build_error.as_deref()
    }

    fn push(&mut self, column: ColumnSpec) -> &mut Self {
        self.columns.push(column);
        self
    }

    /// Apply `f` to the last column, or record a build error naming `modifier`.
    fn modify_last(&mut self, modifier: &str, f: impl FnOnce(&mut ColumnSpec)) -> &mut Self {
        match self.columns.last_mut() {
            Some(column) => f(column),
            None => {
                if self.build_error.is_none() {
                    self.build_error =
                        Some(format!("{modifier}() called before any column was defined"));
                }
            }
        }
        self
    }

    // ==================== Column types ====================

    /// Column with an arbitrary type token.
    pub fn column(&mut self, name: &str, column_type: &str) -> &mut Self {
        self.push(ColumnSpec::typed(name, column_type))
    }

    /// `SERIAL PRIMARY KEY`.
    pub fn increments(&mut self, name: &str) -> &mut Self {
        let mut column = ColumnSpec::typed(name, "SERIAL");
        column.primary_key = true;
        self.push(column)
    }

    /// `BIGSERIAL PRIMARY KEY`.
    pub fn big_increments(&mut self, name: &str) -> &mut Self {
        let mut column = ColumnSpec::typed(name, "BIGSERIAL");
        column.primary_key = true;
        self.push(column)
    }

    pub fn small_int(&mut self, name: &str) -> &mut Self {
        self.push(ColumnSpec::typed(name, "SMALLINT"))
    }

    pub fn integer(&mut self, name: &str) -> &mut Self {
        self.push(ColumnSpec::typed(name, "INTEGER"))
    }

    pub fn big_int(&mut self, name: &str) -> &mut Self {
        self.push(ColumnSpec::typed(name, "BIGINT"))
    }

    /// `VARCHAR(len)`.
    pub fn string(&mut self, name: &str, len: u64) -> &mut Self {
        self.push(ColumnSpec::typed(name, format!("VARCHAR({len})")))
    }

    /// `CHAR(len)`.
    pub fn char(&mut self, name: &str, len: u64) -> &mut Self {
        self.push(ColumnSpec::typed(name, format!("CHAR({len})")))
    }

    pub fn boolean(&mut self, name: &str) -> &mut Self {
        self.push(ColumnSpec::typed(name, "BOOLEAN"))
    }

    pub fn text(&mut self, name: &str) -> &mut Self {
        self.push(ColumnSpec::typed(name, "TEXT"))
    }

    pub fn dbl_precision(&mut self, name: &str) -> &mut Self {
        self.push(ColumnSpec::typed(name, "DOUBLE PRECISION"))
    }

    /// `NUMERIC(precision, scale)`.
    pub fn numeric(&mut self, name: &str, precision: u64, scale: u64) -> &mut Self {
        self.push(ColumnSpec::typed(
            name,
            format!("NUMERIC({precision}, {scale})"),
        ))
    }

    /// Same as [`numeric`](Self::numeric); PostgreSQL treats them alike.
    pub fn decimal(&mut self, name: &str, precision: u64, scale: u64) -> &mut Self {
        self.numeric(name, precision, scale)
    }

    fn temporal(&mut self, name: &str, column_type: &str, current: &str, default_current: bool) -> &mut Self {
        let mut column = ColumnSpec::typed(name, column_type);
        if default_current {
            column.default = Some(current.to_string());
        }
        self.push(column)
    }

    /// `DATE`, optionally `DEFAULT CURRENT_DATE`.
    pub fn date(&mut self, name: &str, default_current: bool) -> &mut Self {
        self.temporal(name, "DATE", "CURRENT_DATE", default_current)
    }

    /// `TIME`, optionally `DEFAULT CURRENT_TIME`.
    pub fn time(&mut self, name: &str, default_current: bool) -> &mut Self {
        self.temporal(name, "TIME", "CURRENT_TIME", default_current)
    }

    /// `TIMESTAMP`, optionally `DEFAULT NOW()`.
    pub fn date_time(&mut self, name: &str, default_current: bool) -> &mut Self {
        self.temporal(name, "TIMESTAMP", "NOW()", default_current)
    }

    /// `TIMESTAMPTZ`, optionally `DEFAULT NOW()`.
    pub fn date_time_tz(&mut self, name: &str, default_current: bool) -> &mut Self {
        self.temporal(name, "TIMESTAMPTZ", "NOW()", default_current)
    }

    pub fn ts_vector(&mut self, name: &str) -> &mut Self {
        self.push(ColumnSpec::typed(name, "TSVECTOR"))
    }

    pub fn ts_query(&mut self, name: &str) -> &mut Self {
        self.push(ColumnSpec::typed(name, "TSQUERY"))
    }

    pub fn json(&mut self, name: &str) -> &mut Self {
        self.push(ColumnSpec::typed(name, "JSON"))
    }

    pub fn jsonb(&mut self, name: &str) -> &mut Self {
        self.push(ColumnSpec::typed(name, "JSONB"))
    }

    pub fn point(&mut self, name: &str) -> &mut Self {
        self.push(ColumnSpec::typed(name, "POINT"))
    }

    pub fn polygon(&mut self, name: &str) -> &mut Self {
        self.push(ColumnSpec::typed(name, "POLYGON"))
    }

    // ==================== Modifiers (last column) ====================

    pub fn not_null(&mut self) -> &mut Self {
        self.modify_last("not_null", |c| c.not_null = true)
    }

    /// `COLLATE "collation"`.
    pub fn collation(&mut self, collation: &str) -> &mut Self {
        self.modify_last("collation", |c| c.collation = Some(collation.to_string()))
    }

    /// Default rendered as a literal (strings are single-quoted, not escaped).
    pub fn default(&mut self, value: impl Into<crate::Value>) -> &mut Self {
        let literal = value.into().to_literal();
        self.modify_last("default", |c| c.default = Some(literal))
    }

    /// Default written verbatim, e.g. `gen_random_uuid()`.
    pub fn default_raw(&mut self, expr: &str) -> &mut Self {
        self.modify_last("default_raw", |c| c.default = Some(expr.to_string()))
    }

    /// `COMMENT ON COLUMN table.column IS '...'`.
    pub fn comment(&mut self, comment: &str) -> &mut Self {
        self.modify_last("comment", |c| c.comment = Some(comment.to_string()))
    }

    /// B-tree index named `index_name` on the last column.
    pub fn index(&mut self, index_name: &str) -> &mut Self {
        self.modify_last("index", |c| {
            c.index = true;
            c.index_name = Some(index_name.to_string());
        })
    }

    /// Unique index named `index_name` on the last column.
    pub fn unique(&mut self, index_name: &str) -> &mut Self {
        self.modify_last("unique", |c| {
            c.unique = true;
            c.index_name = Some(index_name.to_string());
        })
    }

    /// Foreign key constraint from the last column to `refer_table (on_column)`.
    pub fn foreign_key(&mut self, index_name: &str, refer_table: &str, on_column: &str) -> &mut Self {
        let table = self.name.clone();
        self.modify_last("foreign_key", |c| {
            c.foreign_key = Some(format!(
                "ALTER TABLE {table} ADD CONSTRAINT {index_name} FOREIGN KEY ({}) REFERENCES {refer_table} ({on_column})",
                c.name
            ));
        })
    }

    /// Build the last column's index (or constraint) concurrently.
    pub fn concurrently(&mut self) -> &mut Self {
        self.modify_last("concurrently", |c| c.concurrent_index = true)
    }

    /// `INCLUDE (columns)` for the last column's index.
    pub fn include(&mut self, columns: &[&str]) -> &mut Self {
        self.modify_last("include", |c| {
            c.includes = columns.iter().map(|s| s.to_string()).collect();
        })
    }

    /// Alter the last column's type and options instead of adding it.
    pub fn change(&mut self) -> &mut Self {
        self.modify_last("change", |c| c.modified = true)
    }

    pub fn if_exists(&mut self) -> &mut Self {
        self.modify_last("if_exists", |c| c.existence = Existence::IfExists)
    }

    pub fn if_not_exists(&mut self) -> &mut Self {
        self.modify_last("if_not_exists", |c| c.existence = Existence::IfNotExists)
    }

    // ==================== Structural ====================

    /// Rename column `from` to `to`.
    pub fn rename(&mut self, from: &str, to: &str) -> &mut Self {
        self.push(ColumnSpec {
            name: from.to_string(),
            rename_to: Some(to.to_string()),
            modified: true,
            ..ColumnSpec::default()
        })
    }

    pub fn drop_column(&mut self, name: &str) -> &mut Self {
        self.push(ColumnSpec {
            name: name.to_string(),
            dropped: true,
            ..ColumnSpec::default()
        })
    }

    pub fn drop_index(&mut self, index_name: &str) -> &mut Self {
        self.push(ColumnSpec {
            index_name: Some(index_name.to_string()),
            index: true,
            dropped: true,
            ..ColumnSpec::default()
        })
    }

    /// `COMMENT ON TABLE table IS '...'`.
    pub fn table_comment(&mut self, comment: &str) -> &mut Self {
        self.comment = Some(comment.to_string());
        self
    }
}
