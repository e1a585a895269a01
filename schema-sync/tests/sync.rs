mod common;

use common::{column, constraint, index, init_tracing, FakeDriver};
use dml::{Field, FieldReference, FieldType, IndexKind, ReferentialAction, Table};
use schema_sync::{sync, SyncIssueType, SyncOptions};

fn users_table() -> Table {
    Table::new(
        "users",
        vec![
            Field::new("id", FieldType::Serial).primary_key(),
            Field::new("email", FieldType::String).unique(),
        ],
    )
}

// S2 — schema missing entirely.
#[tokio::test]
async fn missing_schema_emits_issues_in_declared_order_all_resolvable() {
    init_tracing();
    let driver = FakeDriver { schemas: vec![], ..Default::default() };

    let result = sync(&driver, "app", &[users_table()], SyncOptions::default()).await.unwrap();

    let kinds: Vec<_> = result.issues.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SyncIssueType::SchemaNotFound,
            SyncIssueType::TableNotFound,
            SyncIssueType::PrimaryKeyNotFound,
            SyncIssueType::UniqueKeyNotFound,
        ]
    );
    assert!(result.resolvable);
    assert!(result.issues.iter().all(|i| i.resolvable));
    assert_eq!(result.actions.len(), 4);
}

// S3 — tightening nullability while nulls exist.
#[tokio::test]
async fn nullable_tightening_with_existing_nulls_is_unresolvable() {
    let table = Table::new("users", vec![Field::new("email", FieldType::String)]);
    let driver = FakeDriver {
        schemas: vec!["app"],
        columns: vec![column("users", "email", "varchar", false, None)],
        has_null: true,
        ..Default::default()
    };

    let result = sync(&driver, "app", &[table], SyncOptions::default()).await.unwrap();

    assert_eq!(result.issues.len(), 1);
    let issue = &result.issues[0];
    assert_eq!(issue.kind, SyncIssueType::FieldNullableMismatch);
    assert!(!issue.resolvable);
    assert_eq!(issue.description.as_deref(), Some("nulls found"));
    assert!(!result.resolvable);
    assert!(!result.fulfilled);
}

// S4 — unique declared, no key yet, values collide.
#[tokio::test]
async fn unique_not_found_with_colliding_values_is_unresolvable() {
    let table = Table::new("users", vec![Field::new("email", FieldType::String).unique()]);
    let driver = FakeDriver {
        schemas: vec!["app"],
        columns: vec![column("users", "email", "varchar", true, None)],
        is_unique: false,
        ..Default::default()
    };

    let result = sync(&driver, "app", &[table], SyncOptions::default()).await.unwrap();

    assert_eq!(result.issues.len(), 1);
    let issue = &result.issues[0];
    assert_eq!(issue.kind, SyncIssueType::UniqueKeyNotFound);
    assert!(!issue.resolvable);
    assert_eq!(issue.description.as_deref(), Some("non-unique values found"));
    assert!(!result.resolvable);
}

// S5 — foreign key exists with the wrong ON DELETE action.
#[tokio::test]
async fn foreign_key_action_mismatch_emits_drop_and_recreate() {
    let orders = Table::new(
        "orders",
        vec![Field::new("user_id", FieldType::Integer).references(
            FieldReference::new("users", "id").on_delete(ReferentialAction::Cascade),
        )],
    );
    let driver = FakeDriver {
        schemas: vec!["app"],
        columns: vec![column("orders", "user_id", "bigint", true, None)],
        constraints: vec![constraint(
            'f',
            "orders_user_id_users_id_fkey",
            "orders",
            "{user_id}",
            Some("users"),
            Some("{id}"),
            'a',
            'a',
            "foreign key (user_id) references users(id)",
        )],
        ..Default::default()
    };

    let result = sync(&driver, "app", &[orders], SyncOptions::default()).await.unwrap();

    assert_eq!(result.issues.len(), 1);
    let issue = &result.issues[0];
    assert_eq!(issue.kind, SyncIssueType::ForeignKeyMismatch);
    assert!(issue.resolvable);
    assert_eq!(issue.actions.len(), 2);
    assert!(issue.actions[0].contains("drop constraint \"orders_user_id_users_id_fkey\""));
    assert!(issue.actions[1].contains("on delete cascade"));
}

// S6 — declared check set drifted from what's stored.
#[tokio::test]
async fn check_constraint_drift_probes_for_rows_outside_the_set() {
    let table = Table::new(
        "orders",
        vec![Field::new("status", FieldType::String).one_of(["a", "b", "c"])],
    );
    let driver = FakeDriver {
        schemas: vec!["app"],
        columns: vec![column("orders", "status", "varchar", true, None)],
        constraints: vec![constraint(
            'c',
            "orders_status_check",
            "orders",
            "{status}",
            None,
            None,
            'a',
            'a',
            "check (status in ('a', 'b'))",
        )],
        has_value_outside: false,
        ..Default::default()
    };

    let result = sync(&driver, "app", &[table], SyncOptions::default()).await.unwrap();

    assert_eq!(result.issues.len(), 1);
    let issue = &result.issues[0];
    assert_eq!(issue.kind, SyncIssueType::CheckKeyMismatch);
    assert!(issue.resolvable);
    assert_eq!(issue.actions.len(), 2);
    assert!(issue.actions[0].contains("drop constraint"));
    assert!(issue.actions[1].contains("check (\"status\" in ('a', 'b', 'c'))"));
}

// Property 4 — diffing an already-synced state yields no issues.
#[tokio::test]
async fn fully_synced_schema_has_no_issues() {
    let table = users_table();
    let driver = FakeDriver {
        schemas: vec!["app"],
        columns: vec![
            column("users", "id", "bigserial", true, None),
            column("users", "email", "varchar", true, None),
        ],
        constraints: vec![
            constraint('p', "users_id_pkey", "users", "{id}", None, None, 'a', 'a', "primary key (id)"),
            constraint('u', "users_email_unique", "users", "{email}", None, None, 'a', 'a', "unique (email)"),
        ],
        is_unique: true,
        ..Default::default()
    };

    let result = sync(&driver, "app", &[table], SyncOptions::default()).await.unwrap();

    assert!(result.issues.is_empty());
    assert!(result.resolvable);
    assert!(result.fulfilled);
}

// Property 5 / fulfillment executor — order and per-issue bookkeeping.
#[tokio::test]
async fn fulfillment_applies_schema_before_table_before_keys() {
    let driver = FakeDriver { schemas: vec![], ..Default::default() };

    let result =
        sync(&driver, "app", &[users_table()], SyncOptions { fulfill: true }).await.unwrap();

    assert!(result.fulfilled);
    assert!(result.issues.iter().all(|i| i.fulfilled == Some(true)));

    let executed = driver.executed.lock().unwrap();
    let schema_pos = executed.iter().position(|s| s.contains("create schema")).unwrap();
    let table_pos = executed.iter().position(|s| s.contains("create table")).unwrap();
    let pk_pos = executed.iter().position(|s| s.contains("primary key")).unwrap();
    let unique_pos = executed.iter().position(|s| s.contains("add constraint") && s.contains("unique")).unwrap();
    assert!(schema_pos < table_pos);
    assert!(table_pos < pk_pos);
    assert!(pk_pos < unique_pos);
}

// Fulfillment errors are recorded per-issue without aborting the pass.
#[tokio::test]
async fn fulfillment_records_failure_without_aborting_remaining_issues() {
    let driver =
        FakeDriver { schemas: vec![], fail_containing: Some("create schema"), ..Default::default() };

    let result =
        sync(&driver, "app", &[users_table()], SyncOptions { fulfill: true }).await.unwrap();

    assert!(!result.fulfilled);
    let schema_issue = result.issues.iter().find(|i| i.kind == SyncIssueType::SchemaNotFound).unwrap();
    assert_eq!(schema_issue.fulfilled, Some(false));
    assert!(schema_issue.error.is_some());

    // Later issues still ran even though the first one failed.
    let table_issue = result.issues.iter().find(|i| i.kind == SyncIssueType::TableNotFound).unwrap();
    assert_eq!(table_issue.fulfilled, Some(true));
}

// Informational warnings never become issues or actions.
#[tokio::test]
async fn undeclared_db_objects_are_warnings_only() {
    let table = Table::new("users", vec![Field::new("id", FieldType::Integer)]);
    let driver = FakeDriver {
        schemas: vec!["app"],
        columns: vec![
            column("users", "id", "bigint", true, None),
            column("users", "legacy_flag", "bigint", true, None),
            column("audit_log", "id", "bigint", true, None),
        ],
        ..Default::default()
    };

    let result = sync(&driver, "app", &[table], SyncOptions::default()).await.unwrap();

    assert!(result.issues.is_empty());
    assert!(result.actions.is_empty());
    assert_eq!(result.warnings.len(), 2);
    assert!(result.warnings.iter().any(|w| w.contains("legacy_flag")));
    assert!(result.warnings.iter().any(|w| w.contains("audit_log")));
}

// §6 declarative invariants abort the whole sync before any I/O.
#[tokio::test]
async fn cross_class_reference_is_rejected_before_any_db_access() {
    let tables = vec![
        Table::new("users", vec![Field::new("id", FieldType::Serial).primary_key()]),
        Table::new(
            "orders",
            vec![Field::new("user_id", FieldType::Double).references(FieldReference::new("users", "id"))],
        ),
    ];
    let driver = FakeDriver::default();

    let err = sync(&driver, "app", &tables, SyncOptions::default()).await.unwrap_err();
    assert!(matches!(err, schema_sync::SyncError::InvalidSchema(_)));
    assert!(driver.executed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn foreign_key_not_found_is_resolvable_when_its_target_is_created_in_the_same_pass() {
    let tables = vec![
        Table::new("users", vec![Field::new("id", FieldType::Serial).primary_key()]),
        Table::new(
            "orders",
            vec![Field::new("user_id", FieldType::Integer).references(FieldReference::new("users", "id"))],
        ),
    ];
    let driver = FakeDriver {
        schemas: vec!["app"],
        columns: vec![column("orders", "user_id", "bigint", true, None)],
        ..Default::default()
    };

    let result = sync(&driver, "app", &tables, SyncOptions::default()).await.unwrap();

    let fk_issue = result.issues.iter().find(|i| i.kind == SyncIssueType::ForeignKeyNotFound).unwrap();
    assert!(fk_issue.resolvable, "users.id is created by the already-resolvable TableNotFound issue");
    assert!(result.resolvable);
}

#[tokio::test]
async fn declared_btree_index_missing_in_db_is_resolvable() {
    let table = Table::new(
        "orders",
        vec![
            Field::new("id", FieldType::Serial).primary_key(),
            Field::new("placed_at", FieldType::String).index(IndexKind::Btree),
        ],
    );
    let driver = FakeDriver {
        schemas: vec!["app"],
        columns: vec![
            column("orders", "id", "bigserial", true, None),
            column("orders", "placed_at", "varchar", true, None),
        ],
        constraints: vec![constraint('p', "orders_id_pkey", "orders", "{id}", None, None, 'a', 'a', "primary key (id)")],
        ..Default::default()
    };

    let result = sync(&driver, "app", &[table], SyncOptions::default()).await.unwrap();

    assert_eq!(result.issues.len(), 1);
    let issue = &result.issues[0];
    assert_eq!(issue.kind, SyncIssueType::BtreeIndexNotFound);
    assert!(issue.resolvable);
    assert!(issue.actions[0].contains("create index \"orders_placed_at_btree\""));
}

#[tokio::test]
async fn undeclared_btree_index_is_dangling_and_resolvable() {
    let table = Table::new(
        "orders",
        vec![
            Field::new("id", FieldType::Serial).primary_key(),
            Field::new("placed_at", FieldType::String),
        ],
    );
    let driver = FakeDriver {
        schemas: vec!["app"],
        columns: vec![
            column("orders", "id", "bigserial", true, None),
            column("orders", "placed_at", "varchar", true, None),
        ],
        constraints: vec![constraint('p', "orders_id_pkey", "orders", "{id}", None, None, 'a', 'a', "primary key (id)")],
        indexes: vec![index("orders_placed_at_btree", "orders", "{placed_at}")],
        ..Default::default()
    };

    let result = sync(&driver, "app", &[table], SyncOptions::default()).await.unwrap();

    assert_eq!(result.issues.len(), 1);
    let issue = &result.issues[0];
    assert_eq!(issue.kind, SyncIssueType::BtreeIndexDangling);
    assert!(issue.resolvable);
    assert!(issue.actions[0].contains("drop index \"app\".\"orders_placed_at_btree\""));
}
