use indexmap::IndexMap;

use dml::Table;

use crate::driver::Queryable;
use crate::error::QueryError;
use crate::expr::{Expression, Tag};
use crate::scope::{OrderBy, Projection, Scope};
use crate::value::Row;

struct FromClause {
    table: String,
    alias: String,
}

struct Join {
    table: String,
    alias: String,
    on: Expression,
}

/// Paging options for `exec`. When `page_size` is absent no `LIMIT` is
/// rendered at all, per §4.3.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecOptions {
    pub page_size: Option<u32>,
    pub page_index: Option<u32>,
}

fn field_expressions(table: &Table, alias: &str) -> IndexMap<String, Expression> {
    table
        .fields
        .iter()
        .map(|f| (f.name.clone(), Expression::column(alias, f)))
        .collect()
}

fn render_projection(projection: &Projection) -> String {
    projection
        .iter()
        .map(|(label, expr)| format!("{} as \"{label}\"", expr.sql()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_order_by(order_by: &[Expression]) -> String {
    order_by.iter().map(Expression::sql).collect::<Vec<_>>().join(", ")
}

fn render(
    from: &FromClause,
    joins: &[Join],
    projection: &Projection,
    where_: Option<&Expression>,
    order_by: &[Expression],
    options: ExecOptions,
) -> String {
    let mut sql = format!(
        "select {} from \"{}\" {}",
        render_projection(projection),
        from.table,
        from.alias
    );

    for join in joins {
        sql.push_str(&format!(" join \"{}\" {} on {}", join.table, join.alias, join.on.sql()));
    }

    if let Some(w) = where_ {
        sql.push_str(&format!(" where {}", w.sql()));
    }

    if !order_by.is_empty() {
        sql.push_str(&format!(" order by {}", render_order_by(order_by)));
    }

    if let Some(page_size) = options.page_size {
        let page_index = options.page_index.unwrap_or(0);
        sql.push_str(&format!(" limit {page_size} offset {}", page_index * page_size));
    }

    sql
}

async fn run(
    driver: &dyn Queryable,
    sql: String,
    projection: &Projection,
) -> Result<Vec<Row>, QueryError> {
    let result =
        driver.query(&sql, &[]).await.map_err(|source| QueryError::Driver { sql, source })?;

    let labels: Vec<&str> = projection.keys().map(String::as_str).collect();
    Ok(result
        .rows
        .into_iter()
        .map(|values| labels.iter().map(|l| l.to_string()).zip(values).collect())
        .collect())
}

/// Entry point: `Query::from(&table, "alias")`. Seeds the scope with the
/// table's columns under `alias` and allows `join`/`select` next.
pub struct Query;

impl Query {
    pub fn from(table: &Table, alias: &str) -> FromStage {
        let mut scope = Scope::new();
        scope.insert_alias(alias, field_expressions(table, alias));
        FromStage {
            from: FromClause { table: table.name.clone(), alias: alias.to_string() },
            joins: Vec::new(),
            scope,
        }
    }
}

/// After `from`, before `select`. Accepts any number of `join` calls.
pub struct FromStage {
    from: FromClause,
    joins: Vec<Join>,
    scope: Scope,
}

impl FromStage {
    pub fn join(
        mut self,
        table: &Table,
        alias: &str,
        f: impl FnOnce(&Scope) -> Expression,
    ) -> Result<Self, QueryError> {
        self.scope.insert_alias(alias, field_expressions(table, alias));
        let on = f(&self.scope);
        if on.tag() != Tag::Boolean {
            return Err(QueryError::TypeMismatch { expected: "boolean", found: "other" });
        }
        self.joins.push(Join { table: table.name.clone(), alias: alias.to_string(), on });
        Ok(self)
    }

    pub fn select(self, f: impl FnOnce(&Scope) -> Projection) -> SelectedQuery {
        let projection = f(&self.scope);
        SelectedQuery {
            from: self.from,
            joins: self.joins,
            scope: self.scope,
            projection,
        }
    }
}

/// After `select`. `where`/`orderBy` are each optional and callable at
/// most once — calling either consumes `self` and returns a stage that no
/// longer offers that method, so a second call is a compile error.
pub struct SelectedQuery {
    from: FromClause,
    joins: Vec<Join>,
    scope: Scope,
    projection: Projection,
}

impl SelectedQuery {
    pub fn r#where(
        self,
        f: impl FnOnce(&Scope) -> Expression,
    ) -> Result<FilteredQuery, QueryError> {
        let where_ = f(&self.scope);
        if where_.tag() != Tag::Boolean {
            return Err(QueryError::TypeMismatch { expected: "boolean", found: "other" });
        }
        Ok(FilteredQuery {
            from: self.from,
            joins: self.joins,
            scope: self.scope,
            projection: self.projection,
            where_,
        })
    }

    pub fn order_by(self, f: impl FnOnce(&Scope) -> OrderBy) -> OrderedQuery {
        let order_by = f(&self.scope).into_vec();
        OrderedQuery {
            from: self.from,
            joins: self.joins,
            projection: self.projection,
            where_: None,
            order_by,
        }
    }

    pub async fn exec(
        self,
        driver: &dyn Queryable,
        options: ExecOptions,
    ) -> Result<Vec<Row>, QueryError> {
        let sql = self.to_sql(options);
        run(driver, sql, &self.projection).await
    }

    /// Renders the SQL this query would run, without executing it.
    pub fn to_sql(&self, options: ExecOptions) -> String {
        render(&self.from, &self.joins, &self.projection, None, &[], options)
    }
}

/// After `where`. `orderBy` remains available; `where` does not.
pub struct FilteredQuery {
    from: FromClause,
    joins: Vec<Join>,
    scope: Scope,
    projection: Projection,
    where_: Expression,
}

impl FilteredQuery {
    pub fn order_by(self, f: impl FnOnce(&Scope) -> OrderBy) -> OrderedQuery {
        let order_by = f(&self.scope).into_vec();
        OrderedQuery {
            from: self.from,
            joins: self.joins,
            projection: self.projection,
            where_: Some(self.where_),
            order_by,
        }
    }

    pub async fn exec(
        self,
        driver: &dyn Queryable,
        options: ExecOptions,
    ) -> Result<Vec<Row>, QueryError> {
        let sql = self.to_sql(options);
        run(driver, sql, &self.projection).await
    }

    pub fn to_sql(&self, options: ExecOptions) -> String {
        render(&self.from, &self.joins, &self.projection, Some(&self.where_), &[], options)
    }
}

/// After `orderBy`. Terminal — only `exec` remains.
pub struct OrderedQuery {
    from: FromClause,
    joins: Vec<Join>,
    projection: Projection,
    where_: Option<Expression>,
    order_by: Vec<Expression>,
}

impl OrderedQuery {
    pub async fn exec(
        self,
        driver: &dyn Queryable,
        options: ExecOptions,
    ) -> Result<Vec<Row>, QueryError> {
        let sql = self.to_sql(options);
        run(driver, sql, &self.projection).await
    }

    pub fn to_sql(&self, options: ExecOptions) -> String {
        render(
            &self.from,
            &self.joins,
            &self.projection,
            self.where_.as_ref(),
            &self.order_by,
            options,
        )
    }
}
