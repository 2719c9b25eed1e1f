//! DDL statement planning for create and alter paths.

use super::{ColumnSpec, Existence, TableSpec};
use std::collections::HashSet;

fn column_options(column: &ColumnSpec) -> String {
    let mut options = String::new();
    if column.primary_key {
        options.push_str(" PRIMARY KEY");
    }
    if column.not_null {
        options.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        options.push_str(" DEFAULT ");
        options.push_str(default);
    }
    if let Some(collation) = &column.collation {
        options.push_str(&format!(" COLLATE \"{collation}\""));
    }
    options
}

fn column_definition(column: &ColumnSpec) -> String {
    format!(
        "{} {}{}",
        column.name,
        column.column_type,
        column_options(column)
    )
}

/// Insert `CONCURRENTLY` after the `CONSTRAINT` keyword, token by token.
pub(crate) fn splice_concurrently(statement: &str) -> String {
    let mut tokens = Vec::new();
    for token in statement.split_whitespace() {
        tokens.push(token);
        if token.eq_ignore_ascii_case("CONSTRAINT") {
            tokens.push("CONCURRENTLY");
        }
    }
    tokens.join(" ")
}

/// Index, unique index and foreign key statements for one column.
fn index_statements(table: &str, column: &ColumnSpec) -> Vec<String> {
    let mut out = Vec::new();
    let concurrently = if column.concurrent_index {
        "CONCURRENTLY "
    } else {
        ""
    };
    // Only IF NOT EXISTS is meaningful for CREATE INDEX.
    let existence = match column.existence {
        Existence::IfNotExists => Existence::IfNotExists.as_sql(),
        _ => "",
    };
    let includes = if column.includes.is_empty() {
        String::new()
    } else {
        format!(" INCLUDE ({})", column.includes.join(", "))
    };

    if let Some(index_name) = &column.index_name {
        if column.index || column.unique {
            let kind = if column.index { "INDEX" } else { "UNIQUE INDEX" };
            out.push(format!(
                "CREATE {kind} {concurrently}{existence}{index_name} ON {table} ({}){includes}",
                column.name
            ));
        }
    }

    if let Some(foreign_key) = &column.foreign_key {
        if column.concurrent_index {
            out.push(splice_concurrently(foreign_key));
        } else {
            out.push(foreign_key.clone());
        }
    }
    out
}

fn column_comment(table: &str, column: &ColumnSpec) -> Option<String> {
    column
        .comment
        .as_ref()
        .map(|comment| format!("COMMENT ON COLUMN {table}.{} IS '{comment}'", column.name))
}

fn table_comment(spec: &TableSpec) -> Option<String> {
    spec.comment
        .as_ref()
        .map(|comment| format!("COMMENT ON TABLE {} IS '{comment}'", spec.name))
}

/// Statements for a table that does not exist yet: one `CREATE TABLE`, then
/// index and foreign key statements, then column and table comments.
///
/// Drop and rename instructions have no meaning on this path and are skipped.
pub(crate) fn create_statements(spec: &TableSpec) -> Vec<String> {
    let table = spec.name.as_str();
    let columns: Vec<&ColumnSpec> = spec
        .columns
        .iter()
        .filter(|c| !c.dropped && c.rename_to.is_none())
        .collect();

    let definitions: Vec<String> = columns.iter().map(|c| column_definition(c)).collect();
    let mut out = vec![format!(
        "CREATE TABLE {}{table} ({})",
        spec.existence.as_sql(),
        definitions.join(", ")
    )];

    for column in &columns {
        out.extend(index_statements(table, column));
    }
    out.extend(columns.iter().filter_map(|c| column_comment(table, c)));
    out.extend(table_comment(spec));
    out
}

fn alter_column(table: &str, column: &ColumnSpec) -> String {
    if let Some(to) = &column.rename_to {
        return format!("ALTER TABLE {table} RENAME COLUMN {} TO {to}", column.name);
    }

    let name = &column.name;
    let mut statement = format!("ALTER TABLE {table} ALTER COLUMN {name} TYPE {}", column.column_type);
    if let Some(collation) = &column.collation {
        statement.push_str(&format!(" COLLATE \"{collation}\""));
    }
    if column.not_null {
        statement.push_str(&format!(", ALTER COLUMN {name} SET NOT NULL"));
    }
    if let Some(default) = &column.default {
        statement.push_str(&format!(", ALTER COLUMN {name} SET DEFAULT {default}"));
    }
    statement
}

fn drop_statement(table: &str, column: &ColumnSpec) -> String {
    let existence = match column.existence {
        Existence::IfExists => Existence::IfExists.as_sql(),
        _ => "",
    };
    match (&column.index_name, column.index) {
        (Some(index_name), true) => format!("DROP INDEX {existence}{index_name}"),
        _ => format!("ALTER TABLE {table} DROP COLUMN {existence}{}", column.name),
    }
}

fn add_column(table: &str, column: &ColumnSpec) -> String {
    let existence = match column.existence {
        Existence::IfNotExists => Existence::IfNotExists.as_sql(),
        _ => "",
    };
    format!(
        "ALTER TABLE {table} ADD COLUMN {existence}{}",
        column_definition(column)
    )
}

/// Statements for an existing table.
///
/// The first element (if any) is the `;`-joined batch of rename / type change
/// / drop / add statements; index statements and comments follow one by one.
/// Columns listed in `existing` are not added again, but their indices and
/// comments are still emitted.
pub(crate) fn alter_statements(spec: &TableSpec, existing: &HashSet<String>) -> Vec<String> {
    let table = spec.name.as_str();
    let mut batch = Vec::new();
    let mut indices = Vec::new();
    let mut comments = Vec::new();

    for column in &spec.columns {
        if column.modified {
            batch.push(alter_column(table, column));
        } else if column.dropped {
            batch.push(drop_statement(table, column));
        } else {
            if !existing.contains(&column.name) {
                batch.push(add_column(table, column));
            }
            indices.extend(index_statements(table, column));
            comments.extend(column_comment(table, column));
        }
    }

    let mut out = Vec::new();
    if !batch.is_empty() {
        out.push(batch.join(";"));
    }
    out.extend(indices);
    out.extend(comments);
    out.extend(table_comment(spec));
    out
}

/// Column names whose existence must be checked before an alter plan.
pub(crate) fn add_candidates(spec: &TableSpec) -> Vec<&str> {
    spec.columns
        .iter()
        .filter(|c| !c.modified && !c.dropped)
        .map(|c| c.name.as_str())
        .collect()
}
