use query_builder::{Queryable, Value};

use crate::error::SyncError;

/// One row of the columns introspection query.
#[derive(Debug, Clone)]
pub struct DbColumn {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub physical_type: String,
    pub not_null: bool,
    pub has_default: bool,
    pub is_dropped: bool,
    pub default_expr: Option<String>,
}

/// One row of the constraints introspection query. `contype` follows
/// PostgreSQL's own convention: `p`/`f`/`u`/`c` for primary key, foreign
/// key, unique, check.
#[derive(Debug, Clone)]
pub struct DbConstraint {
    pub contype: char,
    pub name: String,
    pub table: String,
    pub columns: String,
    pub ref_table: Option<String>,
    pub ref_columns: Option<String>,
    pub on_update_code: char,
    pub on_delete_code: char,
    pub definition: String,
}

/// One row of the btree-index introspection query.
#[derive(Debug, Clone)]
pub struct DbIndex {
    pub name: String,
    pub table: String,
    pub columns: String,
}

/// The normalized, in-memory snapshot of a single schema's state, as read
/// from the PostgreSQL catalog. `schema_exists = false` short-circuits the
/// diff engine into the "schema does not exist" branch of §4.7.
#[derive(Debug, Clone, Default)]
pub struct DbState {
    pub schema_exists: bool,
    pub columns: Vec<DbColumn>,
    pub constraints: Vec<DbConstraint>,
    pub indexes: Vec<DbIndex>,
}

/// Splits a PostgreSQL brace-delimited array literal (`{col1,col2}`) into
/// its elements. The diff engine asserts length 1 when comparing against a
/// single declared field, rather than doing the ambiguous substring match
/// the original source performs — see DESIGN.md.
pub fn parse_brace_list(raw: &str) -> Vec<String> {
    raw.trim_start_matches('{')
        .trim_end_matches('}')
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Normalizes a catalog default expression (`pg_get_expr`'s textual form,
/// e.g. `'pending'::character varying` or `0::bigint`) into the bare
/// literal a declared `default_value` is written as, so the two can be
/// compared as plain text without false positives from PostgreSQL's
/// explicit type casts and string quoting.
pub fn normalize_default_expr(raw: &str) -> String {
    let without_cast = match raw.find("::") {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let trimmed = without_cast.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        trimmed[1..trimmed.len() - 1].replace("''", "'")
    } else {
        trimmed.to_string()
    }
}

/// `true` iff this brace-delimited column list names exactly one column,
/// and it is `field`.
pub fn is_single_column(raw: &str, field: &str) -> bool {
    let cols = parse_brace_list(raw);
    cols.len() == 1 && cols[0] == field
}

impl DbState {
    pub fn columns_for<'a>(&'a self, table: &str) -> impl Iterator<Item = &'a DbColumn> {
        self.columns.iter().filter(move |c| c.table == table && !c.is_dropped)
    }

    pub fn column(&self, table: &str, field: &str) -> Option<&DbColumn> {
        self.columns_for(table).find(|c| c.column == field)
    }

    pub fn declared_table_names(&self) -> std::collections::BTreeSet<&str> {
        self.columns.iter().filter(|c| !c.is_dropped).map(|c| c.table.as_str()).collect()
    }

    /// Single-column constraint of the given type on `table.field`.
    pub fn constraint_on(&self, table: &str, field: &str, contype: char) -> Option<&DbConstraint> {
        self.constraints
            .iter()
            .find(|c| c.contype == contype && c.table == table && is_single_column(&c.columns, field))
    }

    /// Any foreign key (in any table) whose reference target is
    /// `table.field` — used to decide whether dropping a dangling primary
    /// key is safe.
    pub fn foreign_keys_referencing<'a>(
        &'a self,
        table: &str,
        field: &str,
    ) -> impl Iterator<Item = &'a DbConstraint> {
        self.constraints.iter().filter(move |c| {
            c.contype == 'f'
                && c.ref_table.as_deref() == Some(table)
                && c.ref_columns.as_deref().is_some_and(|cols| is_single_column(cols, field))
        })
    }

    pub fn index_on(&self, table: &str, field: &str) -> Option<&DbIndex> {
        self.indexes.iter().find(|i| i.table == table && is_single_column(&i.columns, field))
    }
}

const SCHEMAS_QUERY: &str = "select nspname from pg_catalog.pg_namespace";

const COLUMNS_QUERY: &str = r#"
select
  pg_namespace.nspname,
  pg_class.relname,
  pg_attribute.attname,
  pg_type.typname,
  pg_attribute.attnotnull,
  pg_attribute.atthasdef,
  pg_attribute.attisdropped,
  pg_get_expr(pg_attrdef.adbin, pg_attrdef.adrelid) as adbin_sql
from pg_attribute
join pg_class on pg_class.oid = pg_attribute.attrelid
join pg_namespace on pg_namespace.oid = pg_class.relnamespace
join pg_type on pg_type.oid = pg_attribute.atttypid
left join pg_attrdef on pg_attrdef.adrelid = pg_class.oid and pg_attrdef.adnum = pg_attribute.attnum
where pg_class.relkind = 'r' and pg_attribute.attnum > 0 and pg_namespace.nspname = $1
order by pg_class.relname, pg_attribute.attname
"#;

const CONSTRAINTS_QUERY: &str = r#"
select
  pg_constraint.contype,
  pg_constraint.conname,
  pg_class.relname,
  (
    select '{' || string_agg(pg_attribute.attname, ',') || '}'
    from pg_attribute
    where pg_attribute.attrelid = pg_constraint.conrelid
      and pg_attribute.attnum = any(pg_constraint.conkey)
  ) as columns,
  pg_class_f.relname as confrelname,
  (
    select '{' || string_agg(pg_attribute_f.attname, ',') || '}'
    from pg_attribute pg_attribute_f
    where pg_attribute_f.attrelid = pg_constraint.confrelid
      and pg_attribute_f.attnum = any(pg_constraint.confkey)
  ) as ref_columns,
  pg_constraint.confupdtype,
  pg_constraint.confdeltype,
  pg_get_constraintdef(pg_constraint.oid)
from pg_constraint
join pg_namespace on pg_namespace.oid = pg_constraint.connamespace
join pg_class on pg_class.oid = pg_constraint.conrelid
left join pg_class pg_class_f on pg_class_f.oid = pg_constraint.confrelid
where pg_constraint.contype in ('p', 'f', 'u', 'c') and pg_namespace.nspname = $1
"#;

const INDEXES_QUERY: &str = r#"
select
  pg_class_i.relname as idxname,
  pg_class_t.relname,
  '{' || string_agg(pg_attribute.attname, ',') || '}' as columns
from pg_index
join pg_class pg_class_i on pg_class_i.oid = pg_index.indexrelid
join pg_class pg_class_t on pg_class_t.oid = pg_index.indrelid
join pg_namespace on pg_namespace.oid = pg_class_t.relnamespace
join pg_am on pg_am.oid = pg_class_i.relam
join pg_attribute on pg_attribute.attrelid = pg_index.indrelid
  and pg_attribute.attnum = any(pg_index.indkey)
where pg_am.amname = 'btree' and pg_namespace.nspname = $1
group by pg_class_i.relname, pg_class_t.relname
"#;

fn text(v: &Value) -> String {
    match v {
        Value::Text(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Null => String::new(),
    }
}

fn boolean(v: &Value) -> bool {
    matches!(v, Value::Boolean(true))
}

fn char_code(v: &Value) -> char {
    text(v).chars().next().unwrap_or('a')
}

/// Issues the three fixed introspection queries against a target schema
/// and normalizes the results into a [`DbState`] (spec component C4).
pub struct CatalogReader<'a> {
    driver: &'a dyn Queryable,
}

impl<'a> CatalogReader<'a> {
    pub fn new(driver: &'a dyn Queryable) -> Self {
        Self { driver }
    }

    async fn run(&self, sql: &str, params: &[Value]) -> Result<query_builder::QueryResult, SyncError> {
        self.driver
            .query(sql, params)
            .await
            .map_err(|source| SyncError::Driver { sql: sql.to_string(), source })
    }

    pub async fn read(&self, schema: &str) -> Result<DbState, SyncError> {
        let schemas = self.run(SCHEMAS_QUERY, &[]).await?;
        let exists = schemas.rows.iter().any(|row| row.first().map(text).as_deref() == Some(schema));

        if !exists {
            tracing::debug!(schema, "schema not found in catalog");
            return Ok(DbState { schema_exists: false, ..Default::default() });
        }

        let param = [Value::Text(schema.to_string())];

        let column_rows = self.run(COLUMNS_QUERY, &param).await?;
        let columns = column_rows
            .rows
            .iter()
            .map(|r| DbColumn {
                schema: text(&r[0]),
                table: text(&r[1]),
                column: text(&r[2]),
                physical_type: text(&r[3]),
                not_null: boolean(&r[4]),
                has_default: boolean(&r[5]),
                is_dropped: boolean(&r[6]),
                default_expr: if matches!(r[7], Value::Null) { None } else { Some(text(&r[7])) },
            })
            .collect();

        let constraint_rows = self.run(CONSTRAINTS_QUERY, &param).await?;
        let constraints = constraint_rows
            .rows
            .iter()
            .map(|r| DbConstraint {
                contype: char_code(&r[0]),
                name: text(&r[1]),
                table: text(&r[2]),
                columns: text(&r[3]),
                ref_table: if matches!(r[4], Value::Null) { None } else { Some(text(&r[4])) },
                ref_columns: if matches!(r[5], Value::Null) { None } else { Some(text(&r[5])) },
                on_update_code: char_code(&r[6]),
                on_delete_code: char_code(&r[7]),
                definition: text(&r[8]),
            })
            .collect();

        let index_rows = self.run(INDEXES_QUERY, &param).await?;
        let indexes = index_rows
            .rows
            .iter()
            .map(|r| DbIndex { name: text(&r[0]), table: text(&r[1]), columns: text(&r[2]) })
            .collect();

        tracing::debug!(schema, tables = ?columns.len(), "read catalog state");

        Ok(DbState { schema_exists: true, columns, constraints, indexes })
    }

    /// `SELECT 1 FROM "schema"."table" WHERE "field" IS NULL LIMIT 1` —
    /// used to decide whether tightening nullability is safe.
    pub async fn has_null(&self, schema: &str, table: &str, field: &str) -> Result<bool, SyncError> {
        let sql =
            format!("select 1 from \"{schema}\".\"{table}\" where \"{field}\" is null limit 1");
        Ok(self.run(&sql, &[]).await?.row_count() > 0)
    }

    /// `true` iff the column currently holds only distinct values.
    pub async fn is_unique(&self, schema: &str, table: &str, field: &str) -> Result<bool, SyncError> {
        let sql = format!(
            "select count(distinct \"{field}\") = count(\"{field}\") from \"{schema}\".\"{table}\""
        );
        let result = self.run(&sql, &[]).await?;
        Ok(result.rows.first().and_then(|r| r.first()).is_some_and(boolean))
    }

    /// `true` iff any row falls outside the declared `oneOf` set.
    pub async fn has_value_outside(
        &self,
        schema: &str,
        table: &str,
        field: &str,
        allowed: &[String],
    ) -> Result<bool, SyncError> {
        let list = allowed.iter().map(|v| format!("'{}'", v.replace('\'', "''"))).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "select 1 from \"{schema}\".\"{table}\" where \"{field}\" not in ({list}) limit 1"
        );
        Ok(self.run(&sql, &[]).await?.row_count() > 0)
    }

    /// `true` iff the table currently has at least one row.
    pub async fn has_rows(&self, schema: &str, table: &str) -> Result<bool, SyncError> {
        let sql = format!("select 1 from \"{schema}\".\"{table}\" limit 1");
        Ok(self.run(&sql, &[]).await?.row_count() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brace_list_parses_single_and_multiple_columns() {
        assert_eq!(parse_brace_list("{id}"), vec!["id"]);
        assert_eq!(parse_brace_list("{user_id,order_id}"), vec!["user_id", "order_id"]);
        assert_eq!(parse_brace_list("{}"), Vec::<String>::new());
    }

    #[test]
    fn single_column_check_matches_only_exact_lone_column() {
        assert!(is_single_column("{id}", "id"));
        assert!(!is_single_column("{id}", "other"));
        assert!(!is_single_column("{user_id,order_id}", "user_id"));
    }

    #[test]
    fn normalize_default_expr_strips_cast_and_quotes() {
        assert_eq!(normalize_default_expr("'pending'::character varying"), "pending");
        assert_eq!(normalize_default_expr("0::bigint"), "0");
        assert_eq!(normalize_default_expr("'it''s fine'::text"), "it's fine");
    }

    #[test]
    fn normalize_default_expr_passes_through_bare_values() {
        assert_eq!(normalize_default_expr("true"), "true");
        assert_eq!(normalize_default_expr("42"), "42");
    }
}
