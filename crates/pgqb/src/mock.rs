//! Scripted in-memory connection for session tests.

use crate::catalog::Catalog;
use crate::client::{Connection, Executor, TxHandle};
use crate::error::{QbError, QbResult};
use crate::record::Record;
use crate::sql::Statement;
use crate::value::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockState {
    log: Vec<Statement>,
    rows: VecDeque<QbResult<Vec<Record>>>,
    affected: VecDeque<u64>,
    copied: Vec<String>,
    tables: HashSet<String>,
    columns: HashSet<(String, String)>,
    fail_on: Vec<String>,
    fail_rollback: bool,
}

impl MockState {
    fn check(&self, sql: &str) -> QbResult<()> {
        match self.fail_on.iter().find(|needle| sql.contains(needle.as_str())) {
            Some(needle) => Err(QbError::Other(format!("mock failure on '{needle}'"))),
            None => Ok(()),
        }
    }
}

/// Records every statement and answers from queues.
///
/// Queries pop the next queued row set (empty when none is queued); executes
/// pop the next affected-row count (`0` when none is queued).
#[derive(Clone, Default)]
pub(crate) struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

/// Transaction handle sharing the connection's script.
pub(crate) struct MockTx {
    state: Arc<Mutex<MockState>>,
}

/// Build a row from column/value pairs.
pub(crate) fn row(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(c, v)| (c.to_string(), v.clone()))
        .collect()
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rows(&self, rows: Vec<Record>) {
        self.state.lock().unwrap().rows.push_back(Ok(rows));
    }

    /// Queue a single-row, single-column answer.
    pub fn push_scalar(&self, column: &str, value: impl Into<Value>) {
        self.push_rows(vec![row(&[(column, value.into())])]);
    }

    pub fn push_error(&self, err: QbError) {
        self.state.lock().unwrap().rows.push_back(Err(err));
    }

    pub fn push_affected(&self, n: u64) {
        self.state.lock().unwrap().affected.push_back(n);
    }

    pub fn add_table(&self, table: &str) {
        self.state.lock().unwrap().tables.insert(table.to_string());
    }

    pub fn add_column(&self, table: &str, column: &str) {
        self.state
            .lock()
            .unwrap()
            .columns
            .insert((table.to_string(), column.to_string()));
    }

    /// Fail every statement whose text contains `needle`.
    pub fn fail_on(&self, needle: &str) {
        self.state.lock().unwrap().fail_on.push(needle.to_string());
    }

    pub fn fail_rollback(&self) {
        self.state.lock().unwrap().fail_rollback = true;
    }

    /// Recorded statements, bind values included.
    pub fn log(&self) -> Vec<Statement> {
        self.state.lock().unwrap().log.clone()
    }

    /// Recorded SQL text only.
    pub fn statements(&self) -> Vec<String> {
        self.log().into_iter().map(|s| s.sql).collect()
    }

    /// COPY text lines received so far.
    pub fn copied(&self) -> Vec<String> {
        self.state.lock().unwrap().copied.clone()
    }
}

fn query(state: &Mutex<MockState>, sql: &str, params: &[Value]) -> QbResult<Vec<Record>> {
    let mut state = state.lock().unwrap();
    state.log.push(Statement {
        sql: sql.to_string(),
        params: params.to_vec(),
    });
    state.check(sql)?;
    state.rows.pop_front().unwrap_or_else(|| Ok(Vec::new()))
}

fn execute(state: &Mutex<MockState>, sql: &str, params: &[Value]) -> QbResult<u64> {
    let mut state = state.lock().unwrap();
    state.log.push(Statement {
        sql: sql.to_string(),
        params: params.to_vec(),
    });
    state.check(sql)?;
    Ok(state.affected.pop_front().unwrap_or(0))
}

fn batch_execute(state: &Mutex<MockState>, sql: &str) -> QbResult<()> {
    let mut state = state.lock().unwrap();
    state.log.push(Statement::raw(sql));
    state.check(sql)
}

fn copy_in(state: &Mutex<MockState>, sql: &str, rows: Vec<String>) -> QbResult<u64> {
    let mut state = state.lock().unwrap();
    state.log.push(Statement::raw(sql));
    state.check(sql)?;
    let n = rows.len() as u64;
    state.copied.extend(rows);
    Ok(n)
}

impl Executor for MockConnection {
    async fn query(&self, sql: &str, params: &[Value]) -> QbResult<Vec<Record>> {
        query(&self.state, sql, params)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> QbResult<u64> {
        execute(&self.state, sql, params)
    }

    async fn batch_execute(&self, sql: &str) -> QbResult<()> {
        batch_execute(&self.state, sql)
    }

    async fn copy_in(&self, sql: &str, rows: Vec<String>) -> QbResult<u64> {
        copy_in(&self.state, sql, rows)
    }
}

impl Connection for MockConnection {
    type Tx = MockTx;

    async fn begin(&self) -> QbResult<MockTx> {
        batch_execute(&self.state, "BEGIN")?;
        Ok(MockTx {
            state: Arc::clone(&self.state),
        })
    }
}

impl Catalog for MockConnection {
    async fn table_exists(&self, _schema: &str, table: &str) -> QbResult<bool> {
        Ok(self.state.lock().unwrap().tables.contains(table))
    }

    async fn column_exists(&self, _schema: &str, table: &str, column: &str) -> QbResult<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .columns
            .contains(&(table.to_string(), column.to_string())))
    }
}

impl Executor for MockTx {
    async fn query(&self, sql: &str, params: &[Value]) -> QbResult<Vec<Record>> {
        query(&self.state, sql, params)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> QbResult<u64> {
        execute(&self.state, sql, params)
    }

    async fn batch_execute(&self, sql: &str) -> QbResult<()> {
        batch_execute(&self.state, sql)
    }

    async fn copy_in(&self, sql: &str, rows: Vec<String>) -> QbResult<u64> {
        copy_in(&self.state, sql, rows)
    }
}

impl TxHandle for MockTx {
    async fn commit(self) -> QbResult<()> {
        batch_execute(&self.state, "COMMIT")
    }

    async fn rollback(self) -> QbResult<()> {
        let fail = self.state.lock().unwrap().fail_rollback;
        batch_execute(&self.state, "ROLLBACK")?;
        if fail {
            return Err(QbError::Other("mock rollback failure".to_string()));
        }
        Ok(())
    }
}
