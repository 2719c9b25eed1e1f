//! tokio-postgres implementation of the execution and catalog collaborators.
//!
//! ```ignore
//! let mut db = pgqb::pg::connect("postgres://localhost/app", QbConfig::default()).await?;
//! let adults = db.table("users").where_gte("age", 18).get().await?;
//! ```

use crate::catalog::Catalog;
use crate::client::{Connection, Executor, TxHandle};
use crate::config::QbConfig;
use crate::db::Db;
use crate::error::{QbError, QbResult};
use crate::record::Record;
use crate::value::Value;
use bytes::Bytes;
use futures_util::{SinkExt, pin_mut};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::error::Error;
use tokio_postgres::types::{FromSql, Kind, ToSql, Type};
use tokio_postgres::{Client, NoTls, Row};

/// Connect with `NoTls`, spawn the connection driver and open a session.
pub async fn connect(url: &str, config: QbConfig) -> QbResult<Db<PgConnection>> {
    let (client, connection) = tokio_postgres::connect(url, NoTls)
        .await
        .map_err(|e| QbError::Connection(e.to_string()))?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "postgres connection error");
        }
    });
    Ok(Db::with_config(PgConnection::new(client), config))
}

fn param_refs(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn decode_column<'a, T>(row: &'a Row, idx: usize) -> QbResult<Option<T>>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| QbError::decode(row.columns()[idx].name(), e.to_string()))
}

fn decode_value(row: &Row, idx: usize) -> QbResult<Value> {
    let ty = row.columns()[idx].type_().clone();
    let value: Value = match ty {
        Type::BOOL => decode_column::<bool>(row, idx)?.into(),
        Type::INT2 => decode_column::<i16>(row, idx)?.into(),
        Type::INT4 => decode_column::<i32>(row, idx)?.into(),
        Type::INT8 => decode_column::<i64>(row, idx)?.into(),
        Type::OID => decode_column::<u32>(row, idx)?.into(),
        Type::FLOAT4 => decode_column::<f32>(row, idx)?.into(),
        Type::FLOAT8 => decode_column::<f64>(row, idx)?.into(),
        Type::NUMERIC => decode_column::<Decimal>(row, idx)?
            .map(|d| d.to_string())
            .into(),
        Type::JSON | Type::JSONB => decode_column::<serde_json::Value>(row, idx)?
            .map(|j| j.to_string())
            .into(),
        Type::UUID => decode_column::<uuid::Uuid>(row, idx)?
            .map(|u| u.to_string())
            .into(),
        Type::DATE => decode_column::<chrono::NaiveDate>(row, idx)?
            .map(|d| d.to_string())
            .into(),
        Type::TIME => decode_column::<chrono::NaiveTime>(row, idx)?
            .map(|t| t.to_string())
            .into(),
        Type::TIMESTAMP => decode_column::<chrono::NaiveDateTime>(row, idx)?
            .map(|t| t.to_string())
            .into(),
        Type::TIMESTAMPTZ => decode_column::<chrono::DateTime<chrono::Utc>>(row, idx)?
            .map(|t| t.to_rfc3339())
            .into(),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            decode_column::<String>(row, idx)?.into()
        }
        _ => decode_column::<RawColumn>(row, idx)?
            .map(|raw| raw_to_value(&ty, raw.0))
            .unwrap_or_default(),
    };
    Ok(value)
}

/// Binary column bytes of a type without a typed decoder.
struct RawColumn<'a>(&'a [u8]);

impl<'a> FromSql<'a> for RawColumn<'a> {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawColumn(raw))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

/// Render binary wire bytes as text. Geometric, interval and tsvector values
/// are rendered in PostgreSQL notation; anything unreadable becomes `\x` hex.
fn raw_to_value(ty: &Type, raw: &[u8]) -> Value {
    let text = match *ty {
        Type::POINT => read_point(raw, 0).map(|(x, y)| format!("({x},{y})")),
        Type::POLYGON => read_polygon(raw),
        Type::INTERVAL => read_interval(raw),
        Type::TS_VECTOR => read_tsvector(raw),
        Type::BYTEA | Type::TSQUERY | Type::BOX | Type::LSEG | Type::LINE | Type::PATH
        | Type::CIRCLE => None,
        _ => match ty.kind() {
            Kind::Simple | Kind::Enum(_) | Kind::Pseudo => {
                std::str::from_utf8(raw).ok().map(str::to_string)
            }
            _ => None,
        },
    };
    Value::Text(text.unwrap_or_else(|| to_hex(raw)))
}

fn take<const N: usize>(raw: &[u8], at: usize) -> Option<[u8; N]> {
    raw.get(at..at.checked_add(N)?)?.try_into().ok()
}

fn read_point(raw: &[u8], at: usize) -> Option<(f64, f64)> {
    let x = f64::from_be_bytes(take(raw, at)?);
    let y = f64::from_be_bytes(take(raw, at + 8)?);
    Some((x, y))
}

fn read_polygon(raw: &[u8]) -> Option<String> {
    let count = usize::try_from(i32::from_be_bytes(take(raw, 0)?)).ok()?;
    let mut points = Vec::with_capacity(count);
    for i in 0..count {
        let (x, y) = read_point(raw, 4 + i * 16)?;
        points.push(format!("({x},{y})"));
    }
    Some(format!("({})", points.join(",")))
}

/// ISO 8601 duration, accepted back by PostgreSQL as interval input.
fn read_interval(raw: &[u8]) -> Option<String> {
    let micros = i64::from_be_bytes(take(raw, 0)?);
    let days = i32::from_be_bytes(take(raw, 8)?);
    let months = i32::from_be_bytes(take(raw, 12)?);
    let seconds = micros as f64 / 1_000_000.0;
    Some(format!("P{months}M{days}DT{seconds}S"))
}

fn read_tsvector(raw: &[u8]) -> Option<String> {
    let count = usize::try_from(i32::from_be_bytes(take(raw, 0)?)).ok()?;
    let mut at = 4;
    let mut lexemes = Vec::with_capacity(count);
    for _ in 0..count {
        let len = raw.get(at..)?.iter().position(|b| *b == 0)?;
        let word = std::str::from_utf8(&raw[at..at + len]).ok()?;
        at += len + 1;
        let npos = usize::from(u16::from_be_bytes(take(raw, at)?));
        at += 2;
        let mut entry = format!("'{}'", word.replace('\'', "''"));
        for i in 0..npos {
            let packed = u16::from_be_bytes(take(raw, at + i * 2)?);
            let weight = match packed >> 14 {
                3 => "A",
                2 => "B",
                1 => "C",
                _ => "",
            };
            let sep = if i == 0 { ':' } else { ',' };
            entry.push_str(&format!("{sep}{}{weight}", packed & 0x3FFF));
        }
        at += npos * 2;
        lexemes.push(entry);
    }
    Some(lexemes.join(" "))
}

fn to_hex(raw: &[u8]) -> String {
    let mut out = String::with_capacity(2 + raw.len() * 2);
    out.push_str("\\x");
    for byte in raw {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Decode a driver row into a [`Record`].
pub(crate) fn decode_row(row: &Row) -> QbResult<Record> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        record.push(column.name(), decode_value(row, idx)?);
    }
    Ok(record)
}

async fn run_query(client: &Client, sql: &str, params: &[Value]) -> QbResult<Vec<Record>> {
    let rows = client.query(sql, &param_refs(params)).await?;
    rows.iter().map(decode_row).collect()
}

async fn run_execute(client: &Client, sql: &str, params: &[Value]) -> QbResult<u64> {
    Ok(client.execute(sql, &param_refs(params)).await?)
}

async fn run_copy_in(client: &Client, sql: &str, rows: Vec<String>) -> QbResult<u64> {
    let sink = client.copy_in::<_, Bytes>(sql).await?;
    pin_mut!(sink);
    for row in rows {
        sink.send(Bytes::from(row)).await?;
    }
    Ok(sink.finish().await?)
}

/// A session-owned tokio-postgres client.
#[derive(Clone)]
pub struct PgConnection {
    client: Arc<Client>,
}

impl PgConnection {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Executor for PgConnection {
    async fn query(&self, sql: &str, params: &[Value]) -> QbResult<Vec<Record>> {
        run_query(&self.client, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> QbResult<u64> {
        run_execute(&self.client, sql, params).await
    }

    async fn batch_execute(&self, sql: &str) -> QbResult<()> {
        Ok(self.client.batch_execute(sql).await?)
    }

    async fn copy_in(&self, sql: &str, rows: Vec<String>) -> QbResult<u64> {
        run_copy_in(&self.client, sql, rows).await
    }
}

impl Connection for PgConnection {
    type Tx = PgTransaction;

    async fn begin(&self) -> QbResult<PgTransaction> {
        self.client.batch_execute("BEGIN").await?;
        Ok(PgTransaction {
            client: Arc::clone(&self.client),
            finished: false,
        })
    }
}

impl Catalog for PgConnection {
    async fn table_exists(&self, schema: &str, table: &str) -> QbResult<bool> {
        let row = self
            .client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM information_schema.tables \
                 WHERE table_schema = $1 AND table_name = $2)",
                &[&schema, &table],
            )
            .await?;
        Ok(decode_column::<bool>(&row, 0)?.unwrap_or(false))
    }

    async fn column_exists(&self, schema: &str, table: &str, column: &str) -> QbResult<bool> {
        let row = self
            .client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM information_schema.columns \
                 WHERE table_schema = $1 AND table_name = $2 AND column_name = $3)",
                &[&schema, &table, &column],
            )
            .await?;
        Ok(decode_column::<bool>(&row, 0)?.unwrap_or(false))
    }
}

/// A transaction opened with `BEGIN` on the session's client.
///
/// Dropping it unfinished issues a best-effort `ROLLBACK`.
pub struct PgTransaction {
    client: Arc<Client>,
    finished: bool,
}

impl Executor for PgTransaction {
    async fn query(&self, sql: &str, params: &[Value]) -> QbResult<Vec<Record>> {
        run_query(&self.client, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> QbResult<u64> {
        run_execute(&self.client, sql, params).await
    }

    async fn batch_execute(&self, sql: &str) -> QbResult<()> {
        Ok(self.client.batch_execute(sql).await?)
    }

    async fn copy_in(&self, sql: &str, rows: Vec<String>) -> QbResult<u64> {
        run_copy_in(&self.client, sql, rows).await
    }
}

impl TxHandle for PgTransaction {
    async fn commit(mut self) -> QbResult<()> {
        self.finished = true;
        Ok(self.client.batch_execute("COMMIT").await?)
    }

    async fn rollback(mut self) -> QbResult<()> {
        self.finished = true;
        Ok(self.client.batch_execute("ROLLBACK").await?)
    }
}

impl Drop for PgTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::warn!(target: "pgqb.tx", "transaction dropped without commit or rollback");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let client = Arc::clone(&self.client);
            handle.spawn(async move {
                if let Err(e) = client.batch_execute("ROLLBACK").await {
                    tracing::warn!(target: "pgqb.tx", error = %e, "implicit rollback failed");
                }
            });
        }
    }
}
