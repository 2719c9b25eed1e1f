use super::*;
use crate::data;
use crate::mock::{MockConnection, row};
use crate::predicate::ConnectiveMode;
use crate::transaction::TxOutcome;

fn session() -> (MockConnection, Db<MockConnection>) {
    let conn = MockConnection::new();
    let db = Db::new(conn.clone());
    (conn, db)
}

// ==================== Reads ====================

#[tokio::test]
async fn test_get_renders_binds_and_resets() {
    let (conn, mut db) = session();
    conn.push_rows(vec![row(&[("id", Value::Int(1))])]);

    let rows = db
        .table("users")
        .where_gte("age", 18)
        .order_by("id", "ASC")
        .limit(10)
        .get()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let log = conn.log();
    assert_eq!(
        log[0].sql,
        "SELECT * FROM users WHERE 1=1 AND age >= $1 ORDER BY id ASC LIMIT 10"
    );
    assert_eq!(log[0].params, vec![Value::Int(18)]);
    assert_eq!(db.last_sql(), Some(&log[0]));

    // Clause state is gone, the table stays.
    assert_eq!(db.to_sql().unwrap().sql, "SELECT * FROM users");
}

#[tokio::test]
async fn test_verbatim_mode_from_config() {
    let conn = MockConnection::new();
    let config = QbConfig::new().connective_mode(ConnectiveMode::Verbatim);
    let mut db = Db::with_config(conn.clone(), config);

    db.table("users").where_gte("age", 18).get().await.unwrap();
    assert_eq!(
        conn.statements(),
        vec!["SELECT * FROM users WHERE 1=1 age >= $1"]
    );
}

#[tokio::test]
async fn test_first_without_rows() {
    let (conn, mut db) = session();
    let err = db.table("users").find(5).await.unwrap_err();
    assert!(err.is_no_rows());
    assert_eq!(
        conn.statements(),
        vec!["SELECT * FROM users WHERE 1=1 AND id = $1 LIMIT 1"]
    );
}

#[tokio::test]
async fn test_find_returns_row() {
    let (conn, mut db) = session();
    conn.push_rows(vec![row(&[("id", Value::Int(5)), ("name", "ada".into())])]);
    let user = db.table("users").find(5).await.unwrap();
    assert_eq!(user.get_str("name"), Some("ada"));
    assert_eq!(conn.log()[0].params, vec![Value::Int(5)]);
}

#[tokio::test]
async fn test_pull_and_pull_pairs() {
    let (conn, mut db) = session();
    conn.push_rows(vec![
        row(&[("name", "a".into())]),
        row(&[("name", "b".into())]),
    ]);
    conn.push_rows(vec![row(&[("id", Value::Int(1)), ("name", "a".into())])]);

    let names = db.table("users").pull("name").await.unwrap();
    assert_eq!(names, vec![Value::from("a"), Value::from("b")]);

    let pairs = db.table("users").pull_pairs("id", "name").await.unwrap();
    assert_eq!(pairs, vec![(Value::Int(1), Value::from("a"))]);

    assert_eq!(
        conn.statements(),
        vec!["SELECT name FROM users", "SELECT id, name FROM users"]
    );
}

#[tokio::test]
async fn test_value_reads_first_column() {
    let (conn, mut db) = session();
    conn.push_scalar("email", "a@b.c");
    let email = db
        .table("users")
        .where_eq("id", 1)
        .value("email")
        .await
        .unwrap();
    assert_eq!(email, Value::from("a@b.c"));
    assert_eq!(
        conn.statements(),
        vec!["SELECT email FROM users WHERE 1=1 AND id = $1 LIMIT 1"]
    );
}

#[tokio::test]
async fn test_count_and_aggregates() {
    let (conn, mut db) = session();
    conn.push_scalar("count", 42);
    conn.push_scalar("avg", "2.5");
    conn.push_scalar("max", 9);

    let n = db
        .table("users")
        .where_eq("active", true)
        .count()
        .await
        .unwrap();
    assert_eq!(n, 42);
    let avg = db.table("users").avg("age").await.unwrap();
    assert_eq!(avg.as_f64(), Some(2.5));
    let max = db.table("users").max("age").await.unwrap();
    assert_eq!(max, Value::Int(9));
    let min = db.table("users").min("age").await.unwrap();
    assert!(min.is_null());

    assert_eq!(
        conn.statements(),
        vec![
            "SELECT COUNT(*) FROM users WHERE 1=1 AND active = $1",
            "SELECT AVG(age) FROM users",
            "SELECT MAX(age) FROM users",
            "SELECT MIN(age) FROM users",
        ]
    );
}

#[tokio::test]
async fn test_exists_and_does_not_exist() {
    let (conn, mut db) = session();
    conn.push_scalar("exists", true);

    assert!(db.table("users").where_eq("id", 1).exists().await.unwrap());
    // Nothing queued: NULL reads as "does not exist".
    assert!(db.table("users").does_not_exist().await.unwrap());

    assert_eq!(
        conn.statements()[0],
        "SELECT EXISTS(SELECT 1 FROM \"users\" WHERE 1=1 AND id = $1)"
    );
}

#[tokio::test]
async fn test_union_is_drained_once() {
    let (conn, mut db) = session();
    db.table("a")
        .where_eq("x", 1)
        .union()
        .table("b")
        .where_eq("y", 2)
        .get()
        .await
        .unwrap();
    db.get().await.unwrap();

    let log = conn.log();
    assert_eq!(
        log[0].sql,
        "SELECT * FROM a WHERE 1=1 AND x = $1 UNION SELECT * FROM b WHERE 1=1 AND y = $2"
    );
    assert_eq!(log[0].params, vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(log[1].sql, "SELECT * FROM b");
}

#[tokio::test]
async fn test_deferred_error_surfaces_and_clears() {
    let (conn, mut db) = session();
    let err = db.table("users").page(-1).get().await.unwrap_err();
    assert!(matches!(err, QbError::InvalidArgument(_)));
    assert!(conn.statements().is_empty());

    db.get().await.unwrap();
    assert_eq!(conn.statements(), vec!["SELECT * FROM users"]);
}

#[tokio::test]
async fn test_every_terminal_needs_a_table() {
    let (conn, mut db) = session();

    assert!(db.get().await.unwrap_err().is_no_table());
    assert!(db.first().await.unwrap_err().is_no_table());
    assert!(db.count().await.unwrap_err().is_no_table());
    assert!(db.sum("x").await.unwrap_err().is_no_table());
    assert!(db.exists().await.unwrap_err().is_no_table());
    assert!(db.pull("x").await.unwrap_err().is_no_table());
    assert!(db.insert(data! { "a" => 1 }).await.unwrap_err().is_no_table());
    assert!(db.insert_get_id(data! { "a" => 1 }).await.unwrap_err().is_no_table());
    assert!(
        db.insert_batch(&[data! { "a" => 1 }])
            .await
            .unwrap_err()
            .is_no_table()
    );
    assert!(db.update(data! { "a" => 1 }).await.unwrap_err().is_no_table());
    assert!(db.replace(data! { "a" => 1 }, "a").await.unwrap_err().is_no_table());
    assert!(db.delete().await.unwrap_err().is_no_table());
    assert!(db.increase("a", 1).await.unwrap_err().is_no_table());
    assert!(db.decrease("a", 1).await.unwrap_err().is_no_table());
    assert!(db.chunk(10, |_| true).await.unwrap_err().is_no_table());
    assert!(db.has_columns(&["a"]).await.unwrap_err().is_no_table());
    assert!(
        db.select(&["id"])
            .union()
            .table("guests")
            .get()
            .await
            .unwrap_err()
            .is_no_table()
    );

    assert!(conn.statements().is_empty());
}

#[tokio::test]
async fn test_rejected_union_part_clears_after_error() {
    let (conn, mut db) = session();
    let err = db
        .table("users")
        .where_op("id", "IN", 1)
        .union()
        .table("guests")
        .get()
        .await
        .unwrap_err();
    assert!(matches!(err, QbError::InvalidListArgument(ref c) if c == "id"));

    db.get().await.unwrap();
    assert_eq!(conn.statements(), vec!["SELECT * FROM guests"]);
}

// ==================== Writes ====================

#[tokio::test]
async fn test_insert_and_insert_get_id() {
    let (conn, mut db) = session();
    conn.push_affected(1);
    conn.push_scalar("id", 7);

    let n = db
        .table("users")
        .insert(data! { "name" => "ada", "age" => 36 })
        .await
        .unwrap();
    assert_eq!(n, 1);
    let id = db
        .table("users")
        .insert_get_id(data! { "name" => "bob" })
        .await
        .unwrap();
    assert_eq!(id, 7);

    let log = conn.log();
    assert_eq!(log[0].sql, "INSERT INTO \"users\" (name, age) VALUES ($1, $2)");
    assert_eq!(log[0].params, vec![Value::from("ada"), Value::Int(36)]);
    assert_eq!(
        log[1].sql,
        "INSERT INTO \"users\" (name) VALUES ($1) RETURNING id"
    );
}

#[tokio::test]
async fn test_payload_errors() {
    let (conn, mut db) = session();
    let err = db.table("users").insert(data! {}).await.unwrap_err();
    assert!(matches!(err, QbError::EmptyPayload));
    let err = db
        .table("users")
        .update(data! { "tags" => vec![1, 2] })
        .await
        .unwrap_err();
    assert!(matches!(err, QbError::Validation(_)));
    assert!(conn.statements().is_empty());
}

#[tokio::test]
async fn test_update_numbers_set_before_where() {
    let (conn, mut db) = session();
    conn.push_affected(3);
    let n = db
        .table("users")
        .where_eq("id", 3)
        .update(data! { "name" => "x", "age" => 2 })
        .await
        .unwrap();
    assert_eq!(n, 3);

    let log = conn.log();
    assert_eq!(
        log[0].sql,
        "UPDATE \"users\" SET name = $1, age = $2 WHERE 1=1 AND id = $3"
    );
    assert_eq!(
        log[0].params,
        vec![Value::from("x"), Value::Int(2), Value::Int(3)]
    );
}

#[tokio::test]
async fn test_delete_replace_increment() {
    let (conn, mut db) = session();
    db.table("users").where_eq("id", 1).delete().await.unwrap();
    db.table("users")
        .replace(data! { "id" => 1, "name" => "a" }, "id")
        .await
        .unwrap();
    db.table("posts").increase("views", 2).await.unwrap();
    db.table("posts").decrease("stock", 1).await.unwrap();

    assert_eq!(
        conn.statements(),
        vec![
            "DELETE FROM \"users\" WHERE 1=1 AND id = $1",
            "INSERT INTO \"users\" (id, name) VALUES ($1, $2) ON CONFLICT(id) DO UPDATE SET id = EXCLUDED.id, name = EXCLUDED.name",
            "UPDATE \"posts\" SET views = views + 2",
            "UPDATE \"posts\" SET stock = stock - 1",
        ]
    );
}

#[tokio::test]
async fn test_insert_batch_runs_in_its_own_transaction() {
    let (conn, mut db) = session();
    let rows = vec![
        data! { "id" => 1, "name" => "a" },
        data! { "name" => "b", "id" => 2 },
    ];
    let n = db.table("users").insert_batch(&rows).await.unwrap();
    assert_eq!(n, 2);
    assert_eq!(
        conn.statements(),
        vec!["BEGIN", "COPY \"users\" (id, name) FROM STDIN", "COMMIT"]
    );
    assert_eq!(conn.copied(), vec!["1\ta\n", "2\tb\n"]);
}

#[tokio::test]
async fn test_insert_batch_failure_rolls_back() {
    let (conn, mut db) = session();
    conn.fail_on("COPY");
    let err = db
        .table("users")
        .insert_batch(&[data! { "id" => 1 }])
        .await
        .unwrap_err();
    assert!(matches!(err, QbError::Other(_)));
    assert_eq!(
        conn.statements(),
        vec!["BEGIN", "COPY \"users\" (id) FROM STDIN", "ROLLBACK"]
    );
}

#[tokio::test]
async fn test_insert_batch_rejects_mismatched_rows() {
    let (conn, mut db) = session();
    let rows = vec![data! { "id" => 1, "name" => "a" }, data! { "id" => 2 }];
    let err = db.table("users").insert_batch(&rows).await.unwrap_err();
    assert!(matches!(err, QbError::Validation(_)));
    assert!(conn.statements().is_empty());
}

// ==================== Transactions ====================

#[tokio::test]
async fn test_in_transaction_commits_on_positive_count() {
    let (conn, mut db) = session();
    conn.push_affected(2);

    let outcome = db
        .in_transaction(|db| {
            Box::pin(async move {
                db.table("users")
                    .where_eq("id", 1)
                    .update(data! { "a" => 1 })
                    .await
            })
        })
        .await
        .unwrap();

    assert_eq!(outcome, TxOutcome::Committed(2));
    assert_eq!(
        conn.statements(),
        vec![
            "BEGIN",
            "UPDATE \"users\" SET a = $1 WHERE 1=1 AND id = $2",
            "COMMIT"
        ]
    );
    assert!(!db.in_tx());
}

#[tokio::test]
async fn test_in_transaction_rolls_back_when_nothing_changed() {
    let (conn, mut db) = session();
    conn.push_affected(0);

    let outcome = db
        .in_transaction(|db| Box::pin(async move { db.table("users").delete().await }))
        .await
        .unwrap();

    assert_eq!(outcome, TxOutcome::RolledBack(0));
    assert_eq!(conn.statements().last().map(String::as_str), Some("ROLLBACK"));
    assert!(!db.in_tx());
}

#[tokio::test]
async fn test_in_transaction_rolls_back_on_error() {
    let (conn, mut db) = session();
    conn.fail_on("DELETE");

    let err = db
        .in_transaction(|db| Box::pin(async move { db.table("users").delete().await }))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("DELETE"));
    assert_eq!(
        conn.statements(),
        vec!["BEGIN", "DELETE FROM \"users\"", "ROLLBACK"]
    );
    assert!(!db.in_tx());
}

#[tokio::test]
async fn test_rollback_failure_wins() {
    let (conn, mut db) = session();
    conn.fail_on("DELETE");
    conn.fail_rollback();

    let err = db
        .in_transaction(|db| Box::pin(async move { db.table("users").delete().await }))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "mock rollback failure");
    assert!(!db.in_tx());
}

#[tokio::test]
async fn test_in_transaction_with_record_result() {
    let (conn, mut db) = session();
    conn.push_rows(vec![row(&[("id", Value::Int(1))])]);

    let outcome = db
        .in_transaction(|db| Box::pin(async move { db.table("users").first().await }))
        .await
        .unwrap();
    assert!(outcome.is_committed());
    assert_eq!(outcome.into_inner().get_i64("id"), Some(1));
}

#[tokio::test]
async fn test_explicit_begin_commit_rollback() {
    let (conn, mut db) = session();

    assert!(matches!(
        db.commit().await.unwrap_err(),
        QbError::NoActiveTransaction
    ));
    assert!(matches!(
        db.rollback().await.unwrap_err(),
        QbError::NoActiveTransaction
    ));

    db.begin().await.unwrap();
    assert!(db.in_tx());
    assert!(matches!(
        db.begin().await.unwrap_err(),
        QbError::TransactionAlreadyOpen
    ));
    db.table("users")
        .insert_batch(&[data! { "id" => 1 }])
        .await
        .unwrap();
    db.commit().await.unwrap();
    assert!(!db.in_tx());

    // The batch reuses the open transaction.
    assert_eq!(
        conn.statements(),
        vec!["BEGIN", "COPY \"users\" (id) FROM STDIN", "COMMIT"]
    );
}

// ==================== Chunk ====================

#[tokio::test]
async fn test_chunk_fetches_every_page() {
    let (conn, mut db) = session();
    conn.push_scalar("count", 250);

    let mut pages = 0;
    db.table("users")
        .chunk(100, |_| {
            pages += 1;
            true
        })
        .await
        .unwrap();

    assert_eq!(pages, 3);
    assert_eq!(
        conn.statements(),
        vec![
            "SELECT COUNT(*) FROM users",
            "SELECT * FROM users LIMIT 100",
            "SELECT * FROM users LIMIT 100 OFFSET 100",
            "SELECT * FROM users LIMIT 100 OFFSET 200",
        ]
    );
}

#[tokio::test]
async fn test_chunk_count_is_not_locked() {
    let (conn, mut db) = session();
    conn.push_scalar("count", 150);

    db.table("jobs")
        .lock_for_update()
        .chunk(100, |_| true)
        .await
        .unwrap();

    assert_eq!(
        conn.statements(),
        vec![
            "SELECT COUNT(*) FROM jobs",
            "SELECT * FROM jobs LIMIT 100 FOR UPDATE",
            "SELECT * FROM jobs LIMIT 100 OFFSET 100 FOR UPDATE",
        ]
    );
}

#[tokio::test]
async fn test_chunk_stops_when_callback_declines() {
    let (conn, mut db) = session();
    conn.push_scalar("count", 250);

    let mut pages = 0;
    db.table("users")
        .chunk(100, |_| {
            pages += 1;
            false
        })
        .await
        .unwrap();

    assert_eq!(pages, 1);
    assert_eq!(conn.statements().len(), 2);
}

#[tokio::test]
async fn test_chunk_small_result_single_fetch() {
    let (conn, mut db) = session();
    conn.push_scalar("count", 5);
    conn.push_rows(vec![row(&[("id", Value::Int(1))])]);

    let mut seen = Vec::new();
    db.table("users")
        .chunk(100, |rows| {
            seen.push(rows.len());
            false
        })
        .await
        .unwrap();

    assert_eq!(seen, vec![1]);
    assert_eq!(
        conn.statements(),
        vec!["SELECT COUNT(*) FROM users", "SELECT * FROM users"]
    );
}

#[tokio::test]
async fn test_chunk_keeps_projection_and_filters() {
    let (conn, mut db) = session();
    conn.push_scalar("count", 3);

    db.table("users")
        .select(&["id"])
        .where_eq("active", true)
        .order_by("id", "ASC")
        .chunk(2, |_| true)
        .await
        .unwrap();

    assert_eq!(
        conn.statements(),
        vec![
            "SELECT COUNT(*) FROM users WHERE 1=1 AND active = $1",
            "SELECT id FROM users WHERE 1=1 AND active = $1 ORDER BY id ASC LIMIT 2",
            "SELECT id FROM users WHERE 1=1 AND active = $1 ORDER BY id ASC LIMIT 2 OFFSET 2",
        ]
    );
    assert_eq!(db.to_sql().unwrap().sql, "SELECT * FROM users");
}

#[tokio::test]
async fn test_chunk_rejects_non_positive_size() {
    let (conn, mut db) = session();
    let err = db.table("users").chunk(0, |_| true).await.unwrap_err();
    assert!(matches!(err, QbError::InvalidArgument(_)));
    assert!(conn.statements().is_empty());
}

#[tokio::test]
async fn test_chunk_propagates_fetch_error() {
    let (conn, mut db) = session();
    conn.push_scalar("count", 250);
    conn.push_error(QbError::Other("boom".to_string()));

    let mut pages = 0;
    let err = db
        .table("users")
        .chunk(100, |_| {
            pages += 1;
            true
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "boom");
    assert_eq!(pages, 0);
    assert_eq!(conn.statements().len(), 2);
}

// ==================== Schema & catalog ====================

#[tokio::test]
async fn test_schema_creates_missing_table() {
    let (conn, mut db) = session();
    let executed = db
        .schema("users", |t| {
            t.increments("id");
            t.string("email", 64).not_null().unique("users_email_uidx");
            t.table_comment("people");
        })
        .await
        .unwrap();

    assert_eq!(
        executed,
        vec![
            "CREATE TABLE users (id SERIAL PRIMARY KEY, email VARCHAR(64) NOT NULL)",
            "CREATE UNIQUE INDEX users_email_uidx ON users (email)",
            "COMMENT ON TABLE users IS 'people'",
        ]
    );
    assert_eq!(conn.statements(), executed);
}

#[tokio::test]
async fn test_schema_alters_existing_table() {
    let (conn, mut db) = session();
    conn.add_table("users");
    conn.add_column("users", "id");

    let executed = db
        .schema("users", |t| {
            t.increments("id");
            t.string("email", 64).index("users_email_idx");
        })
        .await
        .unwrap();

    assert_eq!(
        executed,
        vec![
            "ALTER TABLE users ADD COLUMN email VARCHAR(64)",
            "CREATE INDEX users_email_idx ON users (email)",
        ]
    );
    assert_eq!(conn.statements(), executed);
}

#[tokio::test]
async fn test_schema_if_not_exists_skips_catalog() {
    let (conn, mut db) = session();
    conn.add_table("users");

    let executed = db
        .schema_if_not_exists("users", |t| {
            t.increments("id");
        })
        .await
        .unwrap();
    assert_eq!(
        executed,
        vec!["CREATE TABLE IF NOT EXISTS users (id SERIAL PRIMARY KEY)"]
    );
    assert_eq!(conn.statements(), executed);
}

#[tokio::test]
async fn test_schema_stops_at_first_failure() {
    let (conn, mut db) = session();
    conn.fail_on("CREATE INDEX");

    let err = db
        .schema("users", |t| {
            t.integer("age").index("users_age_idx").comment("years");
        })
        .await
        .unwrap_err();
    assert!(matches!(err, QbError::Other(_)));
    assert_eq!(
        conn.statements(),
        vec![
            "CREATE TABLE users (age INTEGER)",
            "CREATE INDEX users_age_idx ON users (age)",
        ]
    );
}

#[tokio::test]
async fn test_schema_modifier_misuse_and_empty_definition() {
    let (conn, mut db) = session();

    let err = db
        .schema("users", |t| {
            t.not_null();
        })
        .await
        .unwrap_err();
    assert!(matches!(err, QbError::InvalidArgument(_)));

    let executed = db.schema("users", |_| {}).await.unwrap();
    assert!(executed.is_empty());
    assert!(conn.statements().is_empty());
}

#[tokio::test]
async fn test_has_table_and_columns() {
    let (conn, mut db) = session();
    conn.add_table("users");
    conn.add_column("users", "id");
    conn.add_column("users", "email");

    assert!(db.has_table("users").await.unwrap());
    assert!(!db.has_table("posts").await.unwrap());
    assert!(db.table("users").has_columns(&["id", "email"]).await.unwrap());
    assert!(!db.table("users").has_columns(&["id", "age"]).await.unwrap());
}

#[tokio::test]
async fn test_table_level_ddl() {
    let (conn, mut db) = session();
    db.drop(&["a", "b"]).await.unwrap();
    db.drop_if_exists(&["c"]).await.unwrap();
    db.truncate(&["d"]).await.unwrap();
    db.rename("e", "f").await.unwrap();
    assert!(matches!(
        db.truncate(&[]).await.unwrap_err(),
        QbError::InvalidArgument(_)
    ));

    assert_eq!(
        conn.statements(),
        vec![
            "DROP TABLE a, b",
            "DROP TABLE IF EXISTS c",
            "TRUNCATE d",
            "ALTER TABLE e RENAME TO f",
        ]
    );
}
