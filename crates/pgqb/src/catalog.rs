//! Catalog collaborator: table and column existence lookups used by
//! `Db::schema`, `Db::has_table` and `Db::has_columns`.

use crate::error::QbResult;
use std::future::Future;

pub trait Catalog: Send + Sync {
    fn table_exists(
        &self,
        schema: &str,
        table: &str,
    ) -> impl Future<Output = QbResult<bool>> + Send;

    fn column_exists(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> impl Future<Output = QbResult<bool>> + Send;
}
