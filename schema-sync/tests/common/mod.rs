//! An in-memory, fully-scripted [`Queryable`] fixture modeled on the
//! teacher's `test-setup`/describer fixtures, which script canned catalog
//! rows instead of hitting a live Postgres. Dispatch happens by matching
//! which introspection query was issued; everything that isn't one of the
//! three fixed introspection queries or a data probe is treated as a DDL
//! statement and just has to succeed or fail per `fail_containing`.

use std::sync::Mutex;

use async_trait::async_trait;
use query_builder::{DriverError, Queryable, QueryResult, Value};

/// Best-effort `tracing` subscriber so `tracing::debug!`/`warn!` spans from
/// the catalog reader, validator, and fulfillment executor show up under
/// `cargo test -- --nocapture`, mirroring the teacher's `test-setup` init.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

#[derive(Default)]
pub struct FakeDriver {
    pub schemas: Vec<&'static str>,
    pub columns: Vec<Vec<Value>>,
    pub constraints: Vec<Vec<Value>>,
    pub indexes: Vec<Vec<Value>>,
    pub has_null: bool,
    pub is_unique: bool,
    pub has_value_outside: bool,
    pub has_rows: bool,
    pub fail_containing: Option<&'static str>,
    pub executed: Mutex<Vec<String>>,
}

fn row_result(rows: Vec<Vec<Value>>) -> QueryResult {
    QueryResult { columns: Vec::new(), rows }
}

fn present(flag: bool) -> QueryResult {
    row_result(if flag { vec![vec![Value::Integer(1)]] } else { Vec::new() })
}

fn boolean(flag: bool) -> QueryResult {
    row_result(vec![vec![Value::Boolean(flag)]])
}

#[async_trait]
impl Queryable for FakeDriver {
    async fn query(&self, sql: &str, _params: &[Value]) -> Result<QueryResult, DriverError> {
        self.executed.lock().unwrap().push(sql.to_string());

        if let Some(needle) = self.fail_containing {
            if sql.contains(needle) {
                return Err(DriverError(format!("simulated failure for: {sql}")));
            }
        }

        // Checked before the plain `pg_attribute` match below: both the
        // indexes and constraints queries join/subquery `pg_attribute` too
        // (to resolve column names), so they must be distinguished by their
        // more specific `pg_index`/`pg_constraint` markers first.
        if sql.contains("pg_index") {
            return Ok(row_result(self.indexes.clone()));
        }
        if sql.contains("pg_constraint") {
            return Ok(row_result(self.constraints.clone()));
        }
        if sql.contains("pg_attribute") {
            return Ok(row_result(self.columns.clone()));
        }
        if sql.contains("pg_namespace") {
            return Ok(row_result(
                self.schemas.iter().map(|s| vec![Value::Text(s.to_string())]).collect(),
            ));
        }
        if sql.contains("is null limit 1") {
            return Ok(present(self.has_null));
        }
        if sql.contains("count(distinct") {
            return Ok(boolean(self.is_unique));
        }
        if sql.contains("not in (") {
            return Ok(present(self.has_value_outside));
        }
        if sql.contains("limit 1") {
            return Ok(present(self.has_rows));
        }

        // Anything else is DDL: succeed with an empty result.
        Ok(QueryResult::default())
    }
}

pub fn column(
    table: &str,
    column: &str,
    physical_type: &str,
    not_null: bool,
    default_expr: Option<&str>,
) -> Vec<Value> {
    vec![
        Value::Text("app".to_string()),
        Value::Text(table.to_string()),
        Value::Text(column.to_string()),
        Value::Text(physical_type.to_string()),
        Value::Boolean(not_null),
        Value::Boolean(default_expr.is_some()),
        Value::Boolean(false),
        default_expr.map(|s| Value::Text(s.to_string())).unwrap_or(Value::Null),
    ]
}

#[allow(clippy::too_many_arguments)]
pub fn constraint(
    contype: char,
    name: &str,
    table: &str,
    columns: &str,
    ref_table: Option<&str>,
    ref_columns: Option<&str>,
    on_update: char,
    on_delete: char,
    definition: &str,
) -> Vec<Value> {
    vec![
        Value::Text(contype.to_string()),
        Value::Text(name.to_string()),
        Value::Text(table.to_string()),
        Value::Text(columns.to_string()),
        ref_table.map(|s| Value::Text(s.to_string())).unwrap_or(Value::Null),
        ref_columns.map(|s| Value::Text(s.to_string())).unwrap_or(Value::Null),
        Value::Text(on_update.to_string()),
        Value::Text(on_delete.to_string()),
        Value::Text(definition.to_string()),
    ]
}

pub fn index(name: &str, table: &str, columns: &str) -> Vec<Value> {
    vec![Value::Text(name.to_string()), Value::Text(table.to_string()), Value::Text(columns.to_string())]
}
