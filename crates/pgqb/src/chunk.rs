//! Paginated reads with early termination.

use crate::client::Connection;
use crate::db::Db;
use crate::error::{QbError, QbResult};
use crate::record::Record;

impl<C: Connection> Db<C> {
    /// Feed the matching rows to `each` in pages of `size`.
    ///
    /// The rows are counted first. When there are fewer than `size`, they are
    /// fetched at once and `each` runs once (its return value is ignored).
    /// Otherwise pages are fetched one by one with `LIMIT size OFFSET n*size`
    /// until the last page or until `each` returns `false`.
    ///
    /// Pending UNION parts are neither used nor drained.
    pub async fn chunk<F>(&mut self, size: i64, mut each: F) -> QbResult<()>
    where
        F: FnMut(Vec<Record>) -> bool,
    {
        let base = self.builder.clone();
        self.builder.reset_clauses();

        base.ready()?;
        let size = match u64::try_from(size) {
            Ok(size) if size > 0 => size,
            _ => {
                return Err(QbError::invalid_argument(format!(
                    "chunk size must be positive, got {size}"
                )));
            }
        };
        // ORDER BY next to COUNT(*) is rejected by the server.
        let mut counter = base.clone();
        counter.order_by.clear();
        counter.order_by_raw = None;
        counter.limit = 0;
        counter.offset = 0;
        let count = counter.to_count()?;
        let total = self.fetch_count(count).await?;

        if total < size {
            let stmt = base
                .compose_select()
                .into_statement(base.start_bindings_at);
            let rows = self.fetch(stmt).await?;
            each(rows);
            return Ok(());
        }

        let pages = total.div_ceil(size);
        for page in 0..pages {
            let mut query = base.clone();
            query.limit = size;
            query.offset = page * size;
            let stmt = query
                .compose_select()
                .into_statement(query.start_bindings_at);
            let rows = self.fetch(stmt).await?;
            if !each(rows) {
                tracing::debug!(target: "pgqb.sql", page, pages, "chunk stopped early");
                break;
            }
        }
        Ok(())
    }
}
