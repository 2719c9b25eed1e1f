//! WHERE / HAVING accumulation on [`QueryBuilder`].

use super::QueryBuilder;
use crate::error::DeferredError;
use crate::predicate::{Connective, Predicate, between_literal};
use crate::value::Value;

fn normalize_operator(operator: &str) -> String {
    operator
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Literal text for the right-hand side of `IS` / `IS NOT`.
fn is_literal(value: &Value) -> String {
    match value {
        Value::Text(keyword) => keyword.clone(),
        other => other.to_literal(),
    }
}

fn append_raw(slot: &mut Option<String>, connective: Connective, raw: &str) {
    let token = match connective {
        Connective::None => None,
        Connective::And => Some(" AND "),
        Connective::Or => Some(" OR "),
    };
    match (token, slot.take()) {
        (Some(token), Some(mut existing)) => {
            existing.push_str(token);
            existing.push_str(raw);
            *slot = Some(existing);
        }
        _ => *slot = Some(raw.to_string()),
    }
}

impl QueryBuilder {
    /// Append `column operator value`, routing IN, IS and BETWEEN operators
    /// to their dedicated shapes.
    pub(crate) fn push_where(
        &mut self,
        connective: Connective,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) {
        let value = value.into();
        let op = normalize_operator(operator);
        match op.as_str() {
            "IN" | "NOT IN" => match value {
                Value::List(values) => {
                    self.predicates
                        .push(Predicate::list(connective, column, op == "NOT IN", values));
                }
                _ => self.defer(DeferredError::InvalidList(column.to_string())),
            },
            "IS" | "IS NOT" => {
                let literal = is_literal(&value);
                self.predicates
                    .push(Predicate::inline(connective, column, &op, literal));
            }
            "BETWEEN" | "NOT BETWEEN" => match value {
                Value::List(bounds) if bounds.len() == 2 => {
                    let literal = between_literal(&bounds[0], &bounds[1]);
                    self.predicates
                        .push(Predicate::inline(connective, column, &op, literal));
                }
                _ => self.defer(DeferredError::InvalidArgument(format!(
                    "{op} on '{column}' expects a list of exactly two bounds"
                ))),
            },
            _ if value.is_list() => self.defer(DeferredError::InvalidArgument(format!(
                "list value for '{column} {operator}' is only valid with IN / NOT IN"
            ))),
            _ => {
                self.predicates
                    .push(Predicate::bound(connective, column, operator.trim(), value));
            }
        }
    }

    pub(crate) fn push_where_with_op(
        &mut self,
        connective: Connective,
        column: &str,
        value: impl Into<Value>,
        operator: &str,
    ) {
        self.push_where(connective, column, operator, value);
    }

    pub(crate) fn push_between(
        &mut self,
        connective: Connective,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
        negated: bool,
    ) {
        let op = if negated { "NOT BETWEEN" } else { "BETWEEN" };
        let literal = between_literal(&low.into(), &high.into());
        self.predicates
            .push(Predicate::inline(connective, column, op, literal));
    }

    pub(crate) fn push_in(
        &mut self,
        connective: Connective,
        column: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
        negated: bool,
    ) {
        let values = values.into_iter().map(Into::into).collect();
        self.predicates
            .push(Predicate::list(connective, column, negated, values));
    }

    pub(crate) fn push_null(&mut self, connective: Connective, column: &str, negated: bool) {
        let op = if negated { "IS NOT" } else { "IS" };
        self.predicates
            .push(Predicate::inline(connective, column, op, "NULL"));
    }

    /// Raw WHERE text. A plain call replaces it, AND/OR append to it.
    pub(crate) fn push_where_raw(&mut self, connective: Connective, raw: &str) {
        append_raw(&mut self.where_raw, connective, raw);
    }

    pub(crate) fn push_exists(&mut self, connective: Connective, sub: &QueryBuilder, negated: bool) {
        let composed = sub.compose_select();
        self.predicates
            .push(Predicate::exists(connective, negated, composed));
    }

    pub(crate) fn set_having(&mut self, column: &str, operator: &str, value: &Value) {
        self.having = Some(format!(
            "{column} {} {}",
            operator.trim(),
            value.to_literal()
        ));
    }

    pub(crate) fn push_having_raw(&mut self, connective: Connective, raw: &str) {
        append_raw(&mut self.having, connective, raw);
    }
}
