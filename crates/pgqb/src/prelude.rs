//! Convenient imports for typical `pgqb` usage.
//!
//! ```ignore
//! use pgqb::prelude::*;
//! ```

pub use crate::data;
pub use crate::{
    Data, Db, Fluent, QbConfig, QbError, QbResult, QueryBuilder, Record, Statement, TableSpec,
    TxOutcome, Value,
};
