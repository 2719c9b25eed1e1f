//! WHERE predicate accumulation and rendering.
//!
//! Every WHERE call appends one [`Predicate`]: a connective to the previous
//! predicate, a rendered key (`"age >="`, `"id IN"`, `"EXISTS"`) and an
//! operand. Rendering always starts from the base truth fragment `1=1`, so any
//! number of predicates (including zero after `-If` guards) yields valid SQL.
//!
//! How the connective of each predicate is written is controlled by
//! [`ConnectiveMode`].

use crate::sql::Sql;
use crate::value::Value;
use serde::Deserialize;

/// Logical connective joining a predicate to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connective {
    /// Plain `where*` call.
    #[default]
    None,
    And,
    Or,
}

impl Connective {
    fn token(self) -> &'static str {
        match self {
            Connective::None => "",
            Connective::And => " AND ",
            Connective::Or => " OR ",
        }
    }
}

/// How predicate connectives are rendered after the base `1=1` fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectiveMode {
    /// ` WHERE 1=1 AND p1 AND p2 OR p3`: the first predicate is always joined
    /// with `AND`, later plain calls are treated as `AND`.
    #[default]
    ImplicitAnd,
    /// ` WHERE 1=1 p1 AND p2`: connectives are written exactly as supplied.
    /// A second plain `where*` call juxtaposes two predicates.
    Verbatim,
}

/// Right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    /// One placeholder.
    Bound(Value),
    /// Pre-rendered literal text (`IS NULL`, `BETWEEN 'a' AND 'b'`).
    Inline(String),
    /// One placeholder per element, parenthesised.
    List { values: Vec<Value>, negated: bool },
    /// A composed sub-select (`EXISTS (...)`).
    Sub(Sql),
}

/// One WHERE comparison plus its connective to the previous one.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Predicate {
    pub(crate) connective: Connective,
    pub(crate) key: String,
    pub(crate) operand: Operand,
}

impl Predicate {
    pub(crate) fn bound(connective: Connective, column: &str, operator: &str, value: Value) -> Self {
        Self {
            connective,
            key: format!("{column} {operator}"),
            operand: Operand::Bound(value),
        }
    }

    pub(crate) fn inline(
        connective: Connective,
        column: &str,
        operator: &str,
        literal: impl Into<String>,
    ) -> Self {
        Self {
            connective,
            key: format!("{column} {operator}"),
            operand: Operand::Inline(literal.into()),
        }
    }

    pub(crate) fn list(connective: Connective, column: &str, negated: bool, values: Vec<Value>) -> Self {
        let operator = if negated { "NOT IN" } else { "IN" };
        Self {
            connective,
            key: format!("{column} {operator}"),
            operand: Operand::List { values, negated },
        }
    }

    pub(crate) fn exists(connective: Connective, negated: bool, sub: Sql) -> Self {
        let key = if negated { "NOT EXISTS" } else { "EXISTS" };
        Self {
            connective,
            key: key.to_string(),
            operand: Operand::Sub(sub),
        }
    }

    fn render_into(&self, out: &mut Sql) {
        match &self.operand {
            Operand::Bound(value) => {
                out.push(&self.key).push(" ").push_bind(value.clone());
            }
            Operand::Inline(literal) => {
                out.push(&self.key).push(" ").push(literal);
            }
            Operand::List { values, negated } => {
                let flat: Vec<Value> = values.iter().flat_map(Value::flatten).collect();
                if flat.is_empty() {
                    // IN () is a syntax error; keep the predicate's meaning instead.
                    out.push(if *negated { "1=1" } else { "1=0" });
                } else {
                    out.push(&self.key)
                        .push(" (")
                        .push_bind_list(flat)
                        .push(")");
                }
            }
            Operand::Sub(sub) => {
                out.push(&self.key).push(" (").push_sql(sub.clone()).push(")");
            }
        }
    }
}

/// Render the WHERE clause for `predicates`, or nothing when there are none.
pub(crate) fn render_where(predicates: &[Predicate], mode: ConnectiveMode, out: &mut Sql) {
    if predicates.is_empty() {
        return;
    }

    match mode {
        ConnectiveMode::ImplicitAnd => {
            out.push(" WHERE 1=1");
            for (i, predicate) in predicates.iter().enumerate() {
                let token = match predicate.connective {
                    Connective::Or if i > 0 => " OR ",
                    _ => " AND ",
                };
                out.push(token);
                predicate.render_into(out);
            }
        }
        ConnectiveMode::Verbatim => {
            out.push(" WHERE 1=1");
            for (i, predicate) in predicates.iter().enumerate() {
                if i == 0 && predicate.connective == Connective::None {
                    out.push(" ");
                }
                out.push(predicate.connective.token());
                predicate.render_into(out);
            }
        }
    }
}

/// Render the two bounds of a `BETWEEN` as inline literal text.
pub(crate) fn between_literal(low: &Value, high: &Value) -> String {
    format!("{} AND {}", low.to_literal(), high.to_literal())
}
