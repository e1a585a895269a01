use dml::{FieldType, IndexKind, ReferentialAction, Table};

use crate::catalog::{CatalogReader, DbState};
use crate::ddl;
use crate::error::SyncError;
use crate::issue::{SyncIssue, SyncIssueType};

/// Produces the ordered issue list for one declared schema against its
/// live database state (spec component C7). Consults the catalog reader
/// again for data probes (nullability tightening, uniqueness, check
/// violations) whenever a structural comparison alone can't decide
/// resolvability.
pub struct Differ<'a> {
    schema: &'a str,
    tables: &'a [Table],
    db: &'a DbState,
    reader: &'a CatalogReader<'a>,
}

impl<'a> Differ<'a> {
    pub fn new(schema: &'a str, tables: &'a [Table], db: &'a DbState, reader: &'a CatalogReader<'a>) -> Self {
        Self { schema, tables, db, reader }
    }

    pub async fn diff(&self) -> Result<(Vec<SyncIssue>, Vec<String>), SyncError> {
        let mut issues = if !self.db.schema_exists {
            self.diff_missing_schema()
        } else {
            self.diff_existing_schema().await?
        };

        self.fixup_foreign_key_resolvability(&mut issues);

        let warnings = self.warnings();
        Ok((issues, warnings))
    }

    // -- branch A: schema does not exist at all ----------------------------

    fn diff_missing_schema(&self) -> Vec<SyncIssue> {
        let mut issues = vec![SyncIssue::new(SyncIssueType::SchemaNotFound, self.schema)
            .resolvable(true)
            .actions(ddl::create_schema(self.schema))];

        for table in self.tables {
            issues.extend(self.missing_table_issues(table));
        }

        issues
    }

    /// Every issue implied by a table that doesn't exist yet: the table
    /// itself, plus one `*NotFound` issue per key/index the declared
    /// fields call for. Shared between the schema-missing branch and the
    /// table-missing case inside an existing schema.
    fn missing_table_issues(&self, table: &Table) -> Vec<SyncIssue> {
        let mut issues = vec![SyncIssue::new(SyncIssueType::TableNotFound, self.schema)
            .table(&table.name)
            .resolvable(true)
            .actions(ddl::create_table(self.schema, table))];

        for field in &table.fields {
            if field.primary_key {
                issues.push(
                    SyncIssue::new(SyncIssueType::PrimaryKeyNotFound, self.schema)
                        .table(&table.name)
                        .field(&field.name)
                        .resolvable(true)
                        .actions(ddl::add_primary_key(self.schema, &table.name, &field.name)),
                );
            }
            if let Some(reference) = &field.references {
                issues.push(
                    SyncIssue::new(SyncIssueType::ForeignKeyNotFound, self.schema)
                        .table(&table.name)
                        .field(&field.name)
                        .resolvable(true)
                        .actions(ddl::add_foreign_key(
                            self.schema,
                            &table.name,
                            &field.name,
                            &reference.table,
                            &reference.field,
                            reference.on_delete_or_default(),
                            reference.on_update_or_default(),
                        )),
                );
            }
            if field.unique {
                issues.push(
                    SyncIssue::new(SyncIssueType::UniqueKeyNotFound, self.schema)
                        .table(&table.name)
                        .field(&field.name)
                        .resolvable(true)
                        .actions(ddl::add_unique_key(self.schema, &table.name, &field.name)),
                );
            }
            if !field.one_of.is_empty() {
                issues.push(
                    SyncIssue::new(SyncIssueType::CheckKeyNotFound, self.schema)
                        .table(&table.name)
                        .field(&field.name)
                        .resolvable(true)
                        .actions(ddl::add_check_key(self.schema, &table.name, field)),
                );
            }
            if field.index == Some(IndexKind::Btree) {
                issues.push(
                    SyncIssue::new(SyncIssueType::BtreeIndexNotFound, self.schema)
                        .table(&table.name)
                        .field(&field.name)
                        .resolvable(true)
                        .actions(ddl::add_btree_index(self.schema, &table.name, &field.name)),
                );
            }
        }

        issues
    }

    // -- branch B: schema exists ------------------------------------------

    async fn diff_existing_schema(&self) -> Result<Vec<SyncIssue>, SyncError> {
        let mut issues = Vec::new();

        for table in self.tables {
            if self.db.columns_for(&table.name).next().is_none() {
                issues.extend(self.missing_table_issues(table));
                continue;
            }

            for field in &table.fields {
                issues.extend(self.diff_column(table, field).await?);
            }
        }

        for table in self.tables {
            if self.db.columns_for(&table.name).next().is_none() {
                continue;
            }
            for field in &table.fields {
                issues.extend(self.diff_keys_and_indexes(table, field).await?);
            }
        }

        Ok(issues)
    }

    async fn diff_column(
        &self,
        table: &Table,
        field: &dml::Field,
    ) -> Result<Vec<SyncIssue>, SyncError> {
        let Some(column) = self.db.column(&table.name, &field.name) else {
            let has_rows = self.reader.has_rows(self.schema, &table.name).await?;
            let needs_default = !field.nullable && field.default_value.is_none() && !field.is_serial();
            let resolvable = !(has_rows && needs_default);
            let mut issue = SyncIssue::new(SyncIssueType::FieldNotFound, self.schema)
                .table(&table.name)
                .field(&field.name)
                .resolvable(resolvable)
                .actions(ddl::add_column(self.schema, &table.name, field));
            if !resolvable {
                issue = issue.description("table has existing rows and the new column has no default");
            }
            return Ok(vec![issue]);
        };

        let mut issues = Vec::new();

        let observed_logical = dml::types::to_logical(&column.physical_type);
        let serial_matches_integer = field.r#type == FieldType::Serial && observed_logical == Some(FieldType::Integer);
        let type_matches = observed_logical == Some(field.r#type) || serial_matches_integer;

        if !type_matches {
            let resolvable = observed_logical.is_some_and(|from| dml::types::can_convert(from, field.r#type));
            let mut issue = SyncIssue::new(SyncIssueType::FieldTypeMismatch, self.schema)
                .table(&table.name)
                .field(&field.name)
                .resolvable(resolvable)
                .actions(ddl::alter_column_type(self.schema, &table.name, field));
            if observed_logical.is_none() {
                issue = issue.description(format!("unrecognized physical type '{}'", column.physical_type));
            }
            issues.push(issue);
        }

        if field.r#type != FieldType::Serial {
            let observed_nullable = !column.not_null;
            if field.nullable != observed_nullable {
                let (resolvable, description) = if field.nullable {
                    (true, None)
                } else if self.reader.has_null(self.schema, &table.name, &field.name).await? {
                    (false, Some("nulls found"))
                } else {
                    (true, None)
                };
                let mut issue = SyncIssue::new(SyncIssueType::FieldNullableMismatch, self.schema)
                    .table(&table.name)
                    .field(&field.name)
                    .resolvable(resolvable)
                    .actions(ddl::alter_column_nullable(self.schema, &table.name, &field.name, field.nullable));
                if let Some(d) = description {
                    issue = issue.description(d);
                }
                issues.push(issue);
            }

            let declared_default = field.default_value.clone().unwrap_or_default();
            let observed_default = column
                .default_expr
                .as_deref()
                .map(crate::catalog::normalize_default_expr)
                .unwrap_or_default();
            if declared_default != observed_default {
                issues.push(
                    SyncIssue::new(SyncIssueType::FieldDefaultValueMismatch, self.schema)
                        .table(&table.name)
                        .field(&field.name)
                        .resolvable(true)
                        .actions(ddl::alter_column_default(self.schema, &table.name, field)),
                );
            }
        }

        Ok(issues)
    }

    async fn diff_keys_and_indexes(
        &self,
        table: &Table,
        field: &dml::Field,
    ) -> Result<Vec<SyncIssue>, SyncError> {
        let mut issues = Vec::new();

        issues.extend(self.diff_primary_key(table, field));
        issues.extend(self.diff_foreign_key(table, field));
        issues.extend(self.diff_unique_key(table, field).await?);
        issues.extend(self.diff_check_key(table, field).await?);
        issues.extend(self.diff_index(table, field));

        Ok(issues)
    }

    fn diff_primary_key(&self, table: &Table, field: &dml::Field) -> Vec<SyncIssue> {
        let existing = self.db.constraint_on(&table.name, &field.name, 'p');
        match (field.primary_key, existing) {
            (true, None) => vec![SyncIssue::new(SyncIssueType::PrimaryKeyNotFound, self.schema)
                .table(&table.name)
                .field(&field.name)
                .resolvable(true)
                .actions(ddl::add_primary_key(self.schema, &table.name, &field.name))],
            (false, Some(existing)) => {
                let referenced = self.db.foreign_keys_referencing(&table.name, &field.name).next().is_some();
                vec![SyncIssue::new(SyncIssueType::PrimaryKeyDangling, self.schema)
                    .table(&table.name)
                    .field(&field.name)
                    .resolvable(!referenced)
                    .actions(ddl::drop_constraint(self.schema, &table.name, &existing.name))]
            }
            _ => Vec::new(),
        }
    }

    fn diff_foreign_key(&self, table: &Table, field: &dml::Field) -> Vec<SyncIssue> {
        let existing = self.db.constraint_on(&table.name, &field.name, 'f');

        match (&field.references, existing) {
            (Some(reference), Some(existing)) => {
                let observed_delete = ReferentialAction::from_catalog_code(existing.on_delete_code);
                let observed_update = ReferentialAction::from_catalog_code(existing.on_update_code);
                if observed_delete != reference.on_delete_or_default()
                    || observed_update != reference.on_update_or_default()
                {
                    vec![SyncIssue::new(SyncIssueType::ForeignKeyMismatch, self.schema)
                        .table(&table.name)
                        .field(&field.name)
                        .resolvable(true)
                        .actions(ddl::replace_foreign_key(
                            self.schema,
                            &table.name,
                            &existing.name,
                            &field.name,
                            &reference.table,
                            &reference.field,
                            reference.on_delete_or_default(),
                            reference.on_update_or_default(),
                        ))]
                } else {
                    Vec::new()
                }
            }
            (Some(reference), None) => {
                // Resolvability is finalized in `fixup_foreign_key_resolvability`
                // once the full issue list is known (§9).
                let resolvable = self.db.column(&reference.table, &reference.field).is_some_and(|c| {
                    self.db.constraint_on(&reference.table, &reference.field, 'p').is_some() || c.not_null
                });
                vec![SyncIssue::new(SyncIssueType::ForeignKeyNotFound, self.schema)
                    .table(&table.name)
                    .field(&field.name)
                    .resolvable(resolvable)
                    .actions(ddl::add_foreign_key(
                        self.schema,
                        &table.name,
                        &field.name,
                        &reference.table,
                        &reference.field,
                        reference.on_delete_or_default(),
                        reference.on_update_or_default(),
                    ))]
            }
            (None, Some(existing)) => {
                vec![SyncIssue::new(SyncIssueType::ForeignKeyDangling, self.schema)
                    .table(&table.name)
                    .field(&field.name)
                    .resolvable(true)
                    .actions(ddl::drop_constraint(self.schema, &table.name, &existing.name))]
            }
            (None, None) => Vec::new(),
        }
    }

    async fn diff_unique_key(&self, table: &Table, field: &dml::Field) -> Result<Vec<SyncIssue>, SyncError> {
        let existing = self.db.constraint_on(&table.name, &field.name, 'u');
        match (field.unique, existing) {
            (true, None) => {
                let unique = self.reader.is_unique(self.schema, &table.name, &field.name).await?;
                let mut issue = SyncIssue::new(SyncIssueType::UniqueKeyNotFound, self.schema)
                    .table(&table.name)
                    .field(&field.name)
                    .resolvable(unique)
                    .actions(ddl::add_unique_key(self.schema, &table.name, &field.name));
                if !unique {
                    issue = issue.description("non-unique values found");
                }
                Ok(vec![issue])
            }
            (false, Some(existing)) => Ok(vec![SyncIssue::new(SyncIssueType::UniqueKeyDangling, self.schema)
                .table(&table.name)
                .field(&field.name)
                .resolvable(true)
                .actions(ddl::drop_constraint(self.schema, &table.name, &existing.name))]),
            _ => Ok(Vec::new()),
        }
    }

    async fn diff_check_key(&self, table: &Table, field: &dml::Field) -> Result<Vec<SyncIssue>, SyncError> {
        let existing = self.db.constraint_on(&table.name, &field.name, 'c');
        if field.one_of.is_empty() {
            return Ok(match existing {
                Some(existing) => vec![SyncIssue::new(SyncIssueType::CheckKeyDangling, self.schema)
                    .table(&table.name)
                    .field(&field.name)
                    .resolvable(true)
                    .actions(ddl::drop_constraint(self.schema, &table.name, &existing.name))],
                None => Vec::new(),
            });
        }

        match existing {
            None => Ok(vec![SyncIssue::new(SyncIssueType::CheckKeyNotFound, self.schema)
                .table(&table.name)
                .field(&field.name)
                .resolvable(true)
                .actions(ddl::add_check_key(self.schema, &table.name, field))]),
            Some(existing) => {
                let covers_all = field.one_of.iter().all(|v| existing.definition.contains(v.as_str()));
                if covers_all {
                    return Ok(Vec::new());
                }
                let has_outside =
                    self.reader.has_value_outside(self.schema, &table.name, &field.name, &field.one_of).await?;
                let mut issue = SyncIssue::new(SyncIssueType::CheckKeyMismatch, self.schema)
                    .table(&table.name)
                    .field(&field.name)
                    .resolvable(!has_outside)
                    .actions(ddl::replace_check_key(self.schema, &table.name, &existing.name, field));
                if has_outside {
                    issue = issue.description("rows outside the declared set found");
                }
                Ok(vec![issue])
            }
        }
    }

    fn diff_index(&self, table: &Table, field: &dml::Field) -> Vec<SyncIssue> {
        if field.is_serial() || field.primary_key || field.unique || field.references.is_some() {
            return Vec::new();
        }

        let existing = self.db.index_on(&table.name, &field.name);
        match (field.index, existing) {
            (Some(IndexKind::Btree), None) => vec![SyncIssue::new(SyncIssueType::BtreeIndexNotFound, self.schema)
                .table(&table.name)
                .field(&field.name)
                .resolvable(true)
                .actions(ddl::add_btree_index(self.schema, &table.name, &field.name))],
            (None, Some(existing)) => vec![SyncIssue::new(SyncIssueType::BtreeIndexDangling, self.schema)
                .table(&table.name)
                .field(&field.name)
                .resolvable(true)
                .actions(ddl::drop_index(self.schema, &existing.name))],
            _ => Vec::new(),
        }
    }

    /// Re-evaluates `ForeignKeyNotFound.resolvable` against the *final*
    /// issue list rather than the DB state seen while iterating tables in
    /// declaration order: a reference is resolvable when either the target
    /// already exists, or some other already-resolvable issue in this same
    /// pass will create it (a `TableNotFound`/`FieldNotFound`/
    /// `PrimaryKeyNotFound` for the referenced primary-key field). See
    /// §9's note on not relying on declaration order.
    fn fixup_foreign_key_resolvability(&self, issues: &mut [SyncIssue]) {
        let creates_target: Vec<(String, String)> = issues
            .iter()
            .filter(|i| i.resolvable)
            .filter_map(|i| {
                let table = i.table.as_deref()?;
                match i.kind {
                    SyncIssueType::TableNotFound => {
                        let declared = self.tables.iter().find(|t| t.name == table)?;
                        let pk = declared.primary_key_field()?;
                        Some((table.to_string(), pk.name.clone()))
                    }
                    SyncIssueType::FieldNotFound | SyncIssueType::PrimaryKeyNotFound => {
                        let field = i.field.as_deref()?;
                        let declared = self.tables.iter().find(|t| t.name == table)?;
                        if declared.field(field).is_some_and(|f| f.primary_key) {
                            Some((table.to_string(), field.to_string()))
                        } else {
                            None
                        }
                    }
                    _ => None,
                }
            })
            .collect();

        for issue in issues.iter_mut() {
            if issue.kind != SyncIssueType::ForeignKeyNotFound || issue.resolvable {
                continue;
            }
            let Some(table) = &issue.table else { continue };
            let Some(field) = &issue.field else { continue };
            let declared_field = self
                .tables
                .iter()
                .find(|t| &t.name == table)
                .and_then(|t| t.field(field))
                .and_then(|f| f.references.as_ref());
            if let Some(reference) = declared_field {
                if creates_target.iter().any(|(t, f)| t == &reference.table && f == &reference.field) {
                    issue.resolvable = true;
                }
            }
        }
    }

    fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let declared_tables: std::collections::HashSet<&str> =
            self.tables.iter().map(|t| t.name.as_str()).collect();

        for table_name in self.db.declared_table_names() {
            if !declared_tables.contains(table_name) {
                warnings.push(format!("table '{table_name}' exists in the database but is not declared"));
                continue;
            }
            let declared = self.tables.iter().find(|t| t.name == table_name).expect("checked above");
            for column in self.db.columns_for(table_name) {
                if declared.field(&column.column).is_none() {
                    warnings.push(format!(
                        "column '{table_name}.{}' exists in the database but is not declared",
                        column.column
                    ));
                }
            }
        }

        warnings
    }
}
