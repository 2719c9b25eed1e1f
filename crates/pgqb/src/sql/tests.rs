use super::*;
use crate::Value;

#[test]
fn builds_placeholders_in_order() {
    let mut q = sql("SELECT * FROM users WHERE a = ");
    q.push_bind(1).push(" AND b = ").push_bind("x");

    assert_eq!(q.to_sql(), "SELECT * FROM users WHERE a = $1 AND b = $2");
    assert_eq!(q.params(), &[Value::Int(1), Value::Text("x".into())]);
}

#[test]
fn numbering_honours_start_index() {
    let mut q = sql("UPDATE t SET a = ");
    q.push_bind(1).push(" WHERE b = ").push_bind(2);
    assert_eq!(q.to_sql_from(5), "UPDATE t SET a = $5 WHERE b = $6");
}

#[test]
fn can_compose_fragments() {
    let mut w = Sql::empty();
    w.push(" WHERE id = ").push_bind(42);

    let mut q = sql("SELECT * FROM users WHERE x = ");
    q.push_bind("a");
    q.push_sql(w);

    assert_eq!(q.to_sql(), "SELECT * FROM users WHERE x = $1 WHERE id = $2");
    assert_eq!(q.placeholder_count(), 2);
    assert_eq!(q.params().len(), 2);
}

#[test]
fn bind_list_renders_commas_and_flattens() {
    let mut q = sql("SELECT * FROM users WHERE id IN (");
    q.push_bind_list(vec![Value::from(1), Value::from(vec![2, 3])])
        .push(")");
    assert_eq!(q.to_sql(), "SELECT * FROM users WHERE id IN ($1, $2, $3)");
    assert_eq!(
        q.params(),
        &[Value::Int(1), Value::Int(2), Value::Int(3)]
    );
}

#[test]
fn bind_list_empty_is_valid_sql() {
    let mut q = sql("SELECT * FROM users WHERE id IN (");
    q.push_bind_list(Vec::<i32>::new()).push(")");
    assert_eq!(q.to_sql(), "SELECT * FROM users WHERE id IN (NULL)");
    assert!(q.params().is_empty());
}

#[test]
fn empty_initial_fragment_is_empty() {
    assert!(sql("").is_empty());
    assert!(!sql("SELECT 1").is_empty());
}

#[test]
fn statement_exposes_driver_params() {
    let mut q = sql("SELECT * FROM t WHERE a = ");
    q.push_bind(1).push(" AND b = ").push_bind(Value::Null);
    let stmt = q.into_statement(1);
    assert_eq!(stmt.sql, "SELECT * FROM t WHERE a = $1 AND b = $2");
    assert_eq!(stmt.params_ref().len(), 2);
    assert_eq!(stmt.to_string(), stmt.sql);
}

#[test]
fn truncation_respects_char_boundaries() {
    assert_eq!(truncate_sql_bytes("SELECT 1", 100), "SELECT 1");
    assert_eq!(truncate_sql_bytes("SELECT 1", 6), "SELECT...");
    assert_eq!(truncate_sql_bytes("é", 1), "...");
}
