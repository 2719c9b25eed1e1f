//! The chainable surface shared by [`QueryBuilder`] and [`Db`](crate::Db).

use super::QueryBuilder;
use super::join::JoinKind;
use crate::error::DeferredError;
use crate::predicate::Connective;
use crate::value::Value;

/// Generates the plain / `and_` / `or_` methods of one WHERE shape plus their
/// `_if(cond, ..)` guarded variants.
macro_rules! where_family {
    (
        $(#[$meta:meta])*
        [$plain:ident, $and:ident, $or:ident]
        [$plain_if:ident, $and_if:ident, $or_if:ident]
        ($($arg:ident : $ty:ty),*) => $helper:ident $(($($extra:expr),*))?
    ) => {
        $(#[$meta])*
        fn $plain(&mut self, $($arg: $ty),*) -> &mut Self {
            self.state().$helper(Connective::None, $($arg),* $($(, $extra)*)?);
            self
        }

        #[doc = concat!("[`", stringify!($plain), "`](Self::", stringify!($plain), ") joined with `AND`.")]
        fn $and(&mut self, $($arg: $ty),*) -> &mut Self {
            self.state().$helper(Connective::And, $($arg),* $($(, $extra)*)?);
            self
        }

        #[doc = concat!("[`", stringify!($plain), "`](Self::", stringify!($plain), ") joined with `OR`.")]
        fn $or(&mut self, $($arg: $ty),*) -> &mut Self {
            self.state().$helper(Connective::Or, $($arg),* $($(, $extra)*)?);
            self
        }

        #[doc = concat!("[`", stringify!($plain), "`](Self::", stringify!($plain), ") applied only when `cond` holds.")]
        fn $plain_if(&mut self, cond: bool, $($arg: $ty),*) -> &mut Self {
            if cond {
                self.$plain($($arg),*);
            }
            self
        }

        #[doc = concat!("[`", stringify!($and), "`](Self::", stringify!($and), ") applied only when `cond` holds.")]
        fn $and_if(&mut self, cond: bool, $($arg: $ty),*) -> &mut Self {
            if cond {
                self.$and($($arg),*);
            }
            self
        }

        #[doc = concat!("[`", stringify!($or), "`](Self::", stringify!($or), ") applied only when `cond` holds.")]
        fn $or_if(&mut self, cond: bool, $($arg: $ty),*) -> &mut Self {
            if cond {
                self.$or($($arg),*);
            }
            self
        }
    };
}

/// Generates one join method and its `_if` guarded variant.
macro_rules! join_method {
    ($name:ident, $name_if:ident, $kind:expr, $sql:literal) => {
        #[doc = concat!("Append ` ", $sql, " table ON left operator right`.")]
        fn $name(&mut self, table: &str, left: &str, operator: &str, right: &str) -> &mut Self {
            self.state().push_join($kind, table, left, operator, right);
            self
        }

        #[doc = concat!("[`", stringify!($name), "`](Self::", stringify!($name), ") applied only when `cond` holds.")]
        fn $name_if(
            &mut self,
            cond: bool,
            table: &str,
            left: &str,
            operator: &str,
            right: &str,
        ) -> &mut Self {
            if cond {
                self.$name(table, left, operator, right);
            }
            self
        }
    };
}

/// Fluent query construction.
///
/// Every method mutates the accumulated state and returns `&mut Self`, so
/// chains end in a terminal operation on the same value. Methods never fail;
/// invalid input is reported by the next terminal operation.
pub trait Fluent: Sized {
    /// The builder state this value accumulates into.
    fn state(&mut self) -> &mut QueryBuilder;

    // ==================== Table & projection ====================

    /// Select the table and reset every clause. Pending UNION parts survive.
    fn table(&mut self, table: &str) -> &mut Self {
        let state = self.state();
        state.reset();
        state.table = table.to_string();
        self
    }

    /// Replace the projection.
    fn select(&mut self, columns: &[&str]) -> &mut Self {
        self.state().columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Append to the projection.
    fn add_select(&mut self, columns: &[&str]) -> &mut Self {
        self.state()
            .columns
            .extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Replace the projection with a raw expression.
    fn select_raw(&mut self, raw: &str) -> &mut Self {
        self.state().columns = vec![raw.to_string()];
        self
    }

    /// `UPDATE ... FROM other` source table.
    fn from(&mut self, table: &str) -> &mut Self {
        self.state().from = Some(table.to_string());
        self
    }

    // ==================== WHERE ====================

    where_family! {
        /// `column operator $n`. `IN`/`NOT IN` expect a list, `BETWEEN` a
        /// two-element list, `IS` renders its value inline.
        [where_op, and_where_op, or_where_op]
        [where_op_if, and_where_op_if, or_where_op_if]
        (column: &str, operator: &str, value: impl Into<Value>) => push_where
    }

    where_family! {
        /// `column = $n`.
        [where_eq, and_where_eq, or_where_eq]
        [where_eq_if, and_where_eq_if, or_where_eq_if]
        (column: &str, value: impl Into<Value>) => push_where_with_op("=")
    }

    where_family! {
        /// `column >= $n`.
        [where_gte, and_where_gte, or_where_gte]
        [where_gte_if, and_where_gte_if, or_where_gte_if]
        (column: &str, value: impl Into<Value>) => push_where_with_op(">=")
    }

    where_family! {
        /// `column < $n`.
        [where_lt, and_where_lt, or_where_lt]
        [where_lt_if, and_where_lt_if, or_where_lt_if]
        (column: &str, value: impl Into<Value>) => push_where_with_op("<")
    }

    where_family! {
        /// `column <= $n`.
        [where_lte, and_where_lte, or_where_lte]
        [where_lte_if, and_where_lte_if, or_where_lte_if]
        (column: &str, value: impl Into<Value>) => push_where_with_op("<=")
    }

    where_family! {
        /// `column BETWEEN low AND high` with both bounds inlined as literals.
        [where_between, and_where_between, or_where_between]
        [where_between_if, and_where_between_if, or_where_between_if]
        (column: &str, low: impl Into<Value>, high: impl Into<Value>) => push_between(false)
    }

    where_family! {
        /// `column NOT BETWEEN low AND high` with both bounds inlined as literals.
        [where_not_between, and_where_not_between, or_where_not_between]
        [where_not_between_if, and_where_not_between_if, or_where_not_between_if]
        (column: &str, low: impl Into<Value>, high: impl Into<Value>) => push_between(true)
    }

    where_family! {
        /// `column IN ($a, $b, ...)`, one placeholder per element. An empty
        /// list matches nothing.
        [where_in, and_where_in, or_where_in]
        [where_in_if, and_where_in_if, or_where_in_if]
        (column: &str, values: impl IntoIterator<Item = impl Into<Value>>) => push_in(false)
    }

    where_family! {
        /// `column NOT IN ($a, $b, ...)`. An empty list matches everything.
        [where_not_in, and_where_not_in, or_where_not_in]
        [where_not_in_if, and_where_not_in_if, or_where_not_in_if]
        (column: &str, values: impl IntoIterator<Item = impl Into<Value>>) => push_in(true)
    }

    where_family! {
        /// `column IS NULL`.
        [where_null, and_where_null, or_where_null]
        [where_null_if, and_where_null_if, or_where_null_if]
        (column: &str) => push_null(false)
    }

    where_family! {
        /// `column IS NOT NULL`.
        [where_not_null, and_where_not_null, or_where_not_null]
        [where_not_null_if, and_where_not_null_if, or_where_not_null_if]
        (column: &str) => push_null(true)
    }

    where_family! {
        /// Raw WHERE text, used only when no structured predicate exists.
        [where_raw, and_where_raw, or_where_raw]
        [where_raw_if, and_where_raw_if, or_where_raw_if]
        (raw: &str) => push_where_raw
    }

    where_family! {
        /// `EXISTS (<sub-select>)`. The sub-select's bind values join the
        /// outer statement's numbering.
        [where_exists, and_where_exists, or_where_exists]
        [where_exists_if, and_where_exists_if, or_where_exists_if]
        (sub: &QueryBuilder) => push_exists(false)
    }

    where_family! {
        /// `NOT EXISTS (<sub-select>)`.
        [where_not_exists, and_where_not_exists, or_where_not_exists]
        [where_not_exists_if, and_where_not_exists_if, or_where_not_exists_if]
        (sub: &QueryBuilder) => push_exists(true)
    }

    // ==================== JOIN ====================

    join_method!(inner_join, inner_join_if, JoinKind::Inner, "INNER JOIN");
    join_method!(left_join, left_join_if, JoinKind::Left, "LEFT JOIN");
    join_method!(right_join, right_join_if, JoinKind::Right, "RIGHT JOIN");
    join_method!(full_join, full_join_if, JoinKind::Full, "FULL JOIN");
    join_method!(full_outer_join, full_outer_join_if, JoinKind::FullOuter, "FULL OUTER JOIN");

    // ==================== GROUP / HAVING / ORDER ====================

    fn group_by(&mut self, expr: &str) -> &mut Self {
        self.state().group_by = Some(expr.to_string());
        self
    }

    /// `HAVING column operator <literal>`. The value is rendered inline,
    /// not bound. Replaces any previous HAVING text.
    fn having(&mut self, column: &str, operator: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        self.state().set_having(column, operator, &value);
        self
    }

    fn having_raw(&mut self, raw: &str) -> &mut Self {
        self.state().push_having_raw(Connective::None, raw);
        self
    }

    fn and_having_raw(&mut self, raw: &str) -> &mut Self {
        self.state().push_having_raw(Connective::And, raw);
        self
    }

    fn or_having_raw(&mut self, raw: &str) -> &mut Self {
        self.state().push_having_raw(Connective::Or, raw);
        self
    }

    /// Append `column direction` to the ORDER BY list.
    fn order_by(&mut self, column: &str, direction: &str) -> &mut Self {
        self.state()
            .order_by
            .push((column.to_string(), direction.to_string()));
        self
    }

    /// Raw ORDER BY, used when no structured ordering was added.
    fn order_by_raw(&mut self, expr: &str) -> &mut Self {
        self.state().order_by_raw = Some(expr.to_string());
        self
    }

    /// `ORDER BY random()`.
    ///
    /// This randomizes the whole table before limiting; avoid it on large tables.
    fn in_random_order(&mut self) -> &mut Self {
        self.order_by_raw("random()")
    }

    // ==================== Pagination & locking ====================

    fn limit(&mut self, limit: u64) -> &mut Self {
        self.state().limit = limit;
        self
    }

    fn offset(&mut self, offset: u64) -> &mut Self {
        self.state().offset = offset;
        self
    }

    /// 1-based page number; `0` and `1` both mean the first page. Combined
    /// with [`size`](Self::size) in either order as `OFFSET page * size`.
    fn page(&mut self, page: i64) -> &mut Self {
        let state = self.state();
        match u64::try_from(page) {
            Ok(page) => {
                state.page = page.saturating_sub(1);
                state.offset = state.page.saturating_mul(state.size);
            }
            Err(_) => state.defer(DeferredError::InvalidArgument(format!(
                "invalid page: {page}"
            ))),
        }
        self
    }

    /// Page size: sets `LIMIT size` and recomputes the offset.
    fn size(&mut self, size: i64) -> &mut Self {
        let state = self.state();
        match u64::try_from(size) {
            Ok(size) => {
                state.size = size;
                state.limit = size;
                state.offset = state.page.saturating_mul(size);
            }
            Err(_) => state.defer(DeferredError::InvalidArgument(format!(
                "invalid size(limit): {size}"
            ))),
        }
        self
    }

    /// Append ` FOR UPDATE`.
    fn lock_for_update(&mut self) -> &mut Self {
        self.state().lock_for_update = true;
        self
    }

    /// Placeholder numbering origin for the next statement (default `1`).
    fn start_bindings_at(&mut self, start: usize) -> &mut Self {
        self.state().start_bindings_at = start.max(1);
        self
    }

    // ==================== UNION ====================

    /// Capture the current SELECT as a UNION part and reset clause state so
    /// the next SELECT can be described. Parts are glued by the next SELECT
    /// terminal operation.
    ///
    /// A part without a table, or with a recorded fluent error, is not
    /// captured; the error is returned by the SELECT that would glue it.
    fn union(&mut self) -> &mut Self {
        let state = self.state();
        let rejected = if state.table.is_empty() {
            Some(DeferredError::NoTable)
        } else {
            state.build_error.clone()
        };
        match rejected {
            Some(err) => {
                if state.union_error.is_none() {
                    state.union_error = Some(err);
                }
            }
            None => {
                let part = state.compose_select();
                state.union.push(part);
            }
        }
        state.reset_clauses();
        self
    }

    /// Like [`union`](Self::union), glued with `UNION ALL`.
    fn union_all(&mut self) -> &mut Self {
        self.union();
        self.state().union_all = true;
        self
    }
}

impl Fluent for QueryBuilder {
    fn state(&mut self) -> &mut QueryBuilder {
        self
    }
}

