use std::collections::HashSet;

use dml::{IndexKind, Table};

use crate::error::SyncError;

fn fail(table: &str, field: &str, reason: &str) -> SyncError {
    tracing::error!(table, field, reason, "declared schema failed pre-flight validation");
    SyncError::InvalidSchema(format!("{table}.{field}: {reason}"))
}

/// Pre-flight checks on the declared schema, run before any database I/O
/// (spec component C6). Every violation aborts the whole sync.
///
/// `oneOf` non-emptiness (§3) has no separate check: the model represents
/// "no `oneOf` declared" as an empty list, so there is no way to construct
/// the invalid "present but empty" state this invariant guards against.
pub fn validate(tables: &[Table]) -> Result<(), SyncError> {
    for table in tables {
        let mut seen = HashSet::new();
        let mut primary_keys = 0;

        for field in &table.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(fail(&table.name, &field.name, "duplicate field name"));
            }

            if field.primary_key {
                primary_keys += 1;
                if field.nullable {
                    return Err(fail(&table.name, &field.name, "primary key field must not be nullable"));
                }
            }

            if field.is_serial() && (field.nullable || field.unique) {
                return Err(fail(
                    &table.name,
                    &field.name,
                    "serial fields are implicitly not-null and unique; nullable/unique must be absent",
                ));
            }

            if let Some(reference) = &field.references {
                let target_table = tables.iter().find(|t| t.name == reference.table).ok_or_else(|| {
                    fail(&table.name, &field.name, &format!("references unknown table '{}'", reference.table))
                })?;

                let target_field = target_table.field(&reference.field).ok_or_else(|| {
                    fail(
                        &table.name,
                        &field.name,
                        &format!("references unknown field '{}.{}'", reference.table, reference.field),
                    )
                })?;

                if !target_field.primary_key {
                    return Err(fail(
                        &table.name,
                        &field.name,
                        &format!("references '{}.{}' which is not a primary key", reference.table, reference.field),
                    ));
                }

                if !dml::types::same_class(field.r#type, target_field.r#type) {
                    return Err(fail(
                        &table.name,
                        &field.name,
                        &format!(
                            "references '{}.{}' of an incompatible type class",
                            reference.table, reference.field
                        ),
                    ));
                }
            }

            if field.index == Some(IndexKind::Btree)
                && (field.is_serial() || field.references.is_some() || field.unique || field.primary_key)
            {
                return Err(fail(
                    &table.name,
                    &field.name,
                    "an explicit btree index is redundant with the implicit index this field already has",
                ));
            }
        }

        if primary_keys > 1 {
            return Err(fail(&table.name, "<table>", "at most one primary key field is allowed"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dml::{Field, FieldType};

    #[test]
    fn rejects_duplicate_field_names() {
        let table = Table::new(
            "users",
            vec![Field::new("id", FieldType::Integer), Field::new("id", FieldType::String)],
        );
        assert!(validate(&[table]).is_err());
    }

    #[test]
    fn rejects_more_than_one_primary_key() {
        let table = Table::new(
            "users",
            vec![
                Field::new("id", FieldType::Serial).primary_key(),
                Field::new("uuid", FieldType::String).primary_key(),
            ],
        );
        assert!(validate(&[table]).is_err());
    }

    #[test]
    fn rejects_nullable_primary_key() {
        let table =
            Table::new("users", vec![Field::new("id", FieldType::Integer).primary_key().nullable()]);
        assert!(validate(&[table]).is_err());
    }

    #[test]
    fn rejects_nullable_or_unique_serial() {
        let nullable = Table::new("users", vec![Field::new("id", FieldType::Serial).nullable()]);
        assert!(validate(&[nullable]).is_err());

        let unique = Table::new("users", vec![Field::new("id", FieldType::Serial).unique()]);
        assert!(validate(&[unique]).is_err());
    }

    #[test]
    fn rejects_reference_to_unknown_table() {
        let orders = Table::new(
            "orders",
            vec![Field::new("user_id", FieldType::Integer)
                .references(dml::FieldReference::new("users", "id"))],
        );
        assert!(validate(&[orders]).is_err());
    }

    #[test]
    fn rejects_reference_to_non_primary_key_field() {
        let tables = vec![
            Table::new(
                "users",
                vec![
                    Field::new("id", FieldType::Serial).primary_key(),
                    Field::new("email", FieldType::String),
                ],
            ),
            Table::new(
                "orders",
                vec![Field::new("user_email", FieldType::String)
                    .references(dml::FieldReference::new("users", "email"))],
            ),
        ];
        assert!(validate(&tables).is_err());
    }

    #[test]
    fn rejects_cross_class_reference() {
        let tables = vec![
            Table::new("users", vec![Field::new("id", FieldType::Serial).primary_key()]),
            Table::new(
                "orders",
                vec![Field::new("user_id", FieldType::String)
                    .references(dml::FieldReference::new("users", "id"))],
            ),
        ];
        assert!(validate(&tables).is_err());
    }

    #[test]
    fn accepts_same_class_reference() {
        let tables = vec![
            Table::new("users", vec![Field::new("id", FieldType::Serial).primary_key()]),
            Table::new(
                "orders",
                vec![Field::new("user_id", FieldType::Integer)
                    .references(dml::FieldReference::new("users", "id"))],
            ),
        ];
        assert!(validate(&tables).is_ok());
    }

    #[test]
    fn rejects_redundant_btree_index() {
        let table = Table::new(
            "users",
            vec![Field::new("id", FieldType::Serial).primary_key().index(IndexKind::Btree)],
        );
        assert!(validate(&[table]).is_err());
    }

    #[test]
    fn accepts_btree_index_on_a_plain_field() {
        let table = Table::new(
            "users",
            vec![
                Field::new("id", FieldType::Serial).primary_key(),
                Field::new("last_name", FieldType::String).index(IndexKind::Btree),
            ],
        );
        assert!(validate(&[table]).is_ok());
    }
}
