//! Batch insert shaping and `COPY ... FROM STDIN` text encoding.
//!
//! The first row fixes the column order. Every later row must name the same
//! columns (in any order); its values are reordered to match.

use crate::builder::quote_table;
use crate::error::{QbError, QbResult};
use crate::value::{Data, Value};

/// Rows reshaped to one column order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Batch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Batch {
    pub(crate) fn from_rows(rows: &[Data]) -> QbResult<Self> {
        let Some(first) = rows.first() else {
            return Err(QbError::EmptyPayload);
        };
        if first.is_empty() {
            return Err(QbError::EmptyPayload);
        }
        let columns: Vec<String> = first.iter().map(|(c, _)| c.clone()).collect();

        let mut shaped = Vec::with_capacity(rows.len());
        for (n, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(QbError::validation(format!(
                    "row {n} has {} columns, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
            let mut values = Vec::with_capacity(columns.len());
            for column in &columns {
                let value = row
                    .iter()
                    .find(|(c, _)| c == column)
                    .map(|(_, v)| v)
                    .ok_or_else(|| {
                        QbError::validation(format!("row {n} is missing column '{column}'"))
                    })?;
                if value.is_list() {
                    return Err(QbError::validation(format!(
                        "row {n} column '{column}' has a list value"
                    )));
                }
                values.push(value.clone());
            }
            shaped.push(values);
        }

        Ok(Self {
            columns,
            rows: shaped,
        })
    }

    /// `COPY "table" (cols) FROM STDIN`.
    pub(crate) fn copy_statement(&self, table: &str) -> String {
        format!(
            "COPY {} ({}) FROM STDIN",
            quote_table(table),
            self.columns.join(", ")
        )
    }

    /// One text-format line per row, newline terminated.
    pub(crate) fn encode(&self) -> Vec<String> {
        self.rows.iter().map(|row| encode_row(row)).collect()
    }
}

fn encode_field(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("\\N"),
        Value::Bool(true) => out.push('t'),
        Value::Bool(false) => out.push('f'),
        Value::Int(v) => out.push_str(&v.to_string()),
        Value::Float(v) => out.push_str(&v.to_string()),
        Value::Text(s) => {
            for ch in s.chars() {
                match ch {
                    '\\' => out.push_str("\\\\"),
                    '\t' => out.push_str("\\t"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    c => out.push(c),
                }
            }
        }
        // Rejected by `Batch::from_rows`.
        Value::List(_) => out.push_str("\\N"),
    }
}

/// Tab-separated text-format COPY line.
pub(crate) fn encode_row(values: &[Value]) -> String {
    let mut line = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            line.push('\t');
        }
        encode_field(value, &mut line);
    }
    line.push('\n');
    line
}
