use dml::{Field, FieldType, ReferentialAction, Table};

fn quote(ident: &str) -> String {
    format!("\"{ident}\"")
}

fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote(schema), quote(table))
}

/// Formats a declared literal for use in DDL: strings are single-quoted,
/// everything else (numbers) is emitted raw.
fn literal(field_type: FieldType, value: &str) -> String {
    match field_type {
        FieldType::String => format!("'{}'", value.replace('\'', "''")),
        _ => value.to_string(),
    }
}

fn column_definition(field: &Field) -> String {
    let mut sql = format!("{} {}", quote(&field.name), dml::types::to_physical(field.r#type));
    if !field.nullable && !field.is_serial() {
        sql.push_str(" not null");
    }
    if let Some(default) = &field.default_value {
        sql.push_str(&format!(" default {}", literal(field.r#type, default)));
    }
    sql
}

pub fn create_schema(schema: &str) -> Vec<String> {
    vec![format!("create schema {}", quote(schema))]
}

/// Creates the bare table shape (columns only); keys, references, checks,
/// and indexes are emitted as their own, separately-resolvable issues.
pub fn create_table(schema: &str, table: &Table) -> Vec<String> {
    let columns = table.fields.iter().map(column_definition).collect::<Vec<_>>().join(", ");
    vec![format!("create table {} ({})", qualified(schema, &table.name), columns)]
}

pub fn add_column(schema: &str, table: &str, field: &Field) -> Vec<String> {
    vec![format!(
        "alter table {} add column {}",
        qualified(schema, table),
        column_definition(field)
    )]
}

pub fn alter_column_type(schema: &str, table: &str, field: &Field) -> Vec<String> {
    vec![format!(
        "alter table {} alter column {} type {}",
        qualified(schema, table),
        quote(&field.name),
        dml::types::to_physical(field.r#type)
    )]
}

pub fn alter_column_nullable(schema: &str, table: &str, field: &str, nullable: bool) -> Vec<String> {
    let clause = if nullable { "drop not null" } else { "set not null" };
    vec![format!("alter table {} alter column {} {clause}", qualified(schema, table), quote(field))]
}

pub fn alter_column_default(schema: &str, table: &str, field: &Field) -> Vec<String> {
    let clause = match &field.default_value {
        Some(v) => format!("set default {}", literal(field.r#type, v)),
        None => "drop default".to_string(),
    };
    vec![format!("alter table {} alter column {} {clause}", qualified(schema, table), quote(&field.name))]
}

pub fn primary_key_name(table: &str, field: &str) -> String {
    format!("{table}_{field}_pkey")
}

pub fn add_primary_key(schema: &str, table: &str, field: &str) -> Vec<String> {
    vec![format!(
        "alter table {} add constraint {} primary key ({})",
        qualified(schema, table),
        quote(&primary_key_name(table, field)),
        quote(field)
    )]
}

pub fn drop_constraint(schema: &str, table: &str, name: &str) -> Vec<String> {
    vec![format!("alter table {} drop constraint {}", qualified(schema, table), quote(name))]
}

pub fn foreign_key_name(table: &str, field: &str, ref_table: &str, ref_field: &str) -> String {
    format!("{table}_{field}_{ref_table}_{ref_field}_fkey")
}

pub fn add_foreign_key(
    schema: &str,
    table: &str,
    field: &str,
    ref_table: &str,
    ref_field: &str,
    on_delete: ReferentialAction,
    on_update: ReferentialAction,
) -> Vec<String> {
    vec![format!(
        "alter table {} add constraint {} foreign key ({}) references {}({}) on delete {} on update {}",
        qualified(schema, table),
        quote(&foreign_key_name(table, field, ref_table, ref_field)),
        quote(field),
        qualified(schema, ref_table),
        quote(ref_field),
        on_delete.as_sql(),
        on_update.as_sql(),
    )]
}

/// Drop-then-recreate: the only way to change an existing FK's referential
/// actions in PostgreSQL.
pub fn replace_foreign_key(
    schema: &str,
    table: &str,
    existing_name: &str,
    field: &str,
    ref_table: &str,
    ref_field: &str,
    on_delete: ReferentialAction,
    on_update: ReferentialAction,
) -> Vec<String> {
    let mut actions = drop_constraint(schema, table, existing_name);
    actions.extend(add_foreign_key(schema, table, field, ref_table, ref_field, on_delete, on_update));
    actions
}

pub fn unique_key_name(table: &str, field: &str) -> String {
    format!("{table}_{field}_unique")
}

pub fn add_unique_key(schema: &str, table: &str, field: &str) -> Vec<String> {
    vec![format!(
        "alter table {} add constraint {} unique ({})",
        qualified(schema, table),
        quote(&unique_key_name(table, field)),
        quote(field)
    )]
}

pub fn check_key_name(table: &str, field: &str) -> String {
    format!("{table}_{field}_check")
}

fn one_of_list(field_type: FieldType, values: &[String]) -> String {
    values.iter().map(|v| literal(field_type, v)).collect::<Vec<_>>().join(", ")
}

pub fn add_check_key(schema: &str, table: &str, field: &Field) -> Vec<String> {
    vec![format!(
        "alter table {} add constraint {} check ({} in ({}))",
        qualified(schema, table),
        quote(&check_key_name(table, &field.name)),
        quote(&field.name),
        one_of_list(field.r#type, &field.one_of),
    )]
}

pub fn replace_check_key(schema: &str, table: &str, existing_name: &str, field: &Field) -> Vec<String> {
    let mut actions = drop_constraint(schema, table, existing_name);
    actions.extend(add_check_key(schema, table, field));
    actions
}

pub fn index_name(table: &str, field: &str, kind: dml::IndexKind) -> String {
    format!("{table}_{field}_{}", kind.as_sql())
}

pub fn add_btree_index(schema: &str, table: &str, field: &str) -> Vec<String> {
    vec![format!(
        "create index {} on {} using btree ({})",
        quote(&index_name(table, field, dml::IndexKind::Btree)),
        qualified(schema, table),
        quote(field)
    )]
}

pub fn drop_index(schema: &str, index_name: &str) -> Vec<String> {
    vec![format!("drop index {}.{}", quote(schema), quote(index_name))]
}
