use async_trait::async_trait;
use thiserror::Error;

use crate::value::Value;

/// Transport-level failure from the underlying database driver. The sync
/// and query layers never construct this themselves — it only ever comes
/// back out of a [`Queryable`] implementation.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DriverError(pub String);

/// Raw tabular result from a single statement.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// The capability both the query builder and `schema-sync` depend on: a
/// single positional-parameter query round trip. Connection pooling,
/// transport, and transactions are the caller's concern (§1 Non-goals) —
/// this is the entire surface a driver has to implement.
#[async_trait]
pub trait Queryable: Send + Sync {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DriverError>;
}
