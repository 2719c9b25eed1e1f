//! JOIN fragments.

use super::QueryBuilder;

/// Kind of table join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    FullOuter,
}

impl JoinKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
            JoinKind::FullOuter => "FULL OUTER JOIN",
        }
    }
}

impl QueryBuilder {
    /// Append ` KIND JOIN table ON left operator right`. Joins render in
    /// append order.
    pub(crate) fn push_join(
        &mut self,
        kind: JoinKind,
        table: &str,
        left: &str,
        operator: &str,
        right: &str,
    ) {
        self.joins.push(format!(
            " {} {table} ON {left} {} {right}",
            kind.as_sql(),
            operator.trim()
        ));
    }
}
