use query_builder::Queryable;

use crate::error::SyncError;
use crate::issue::{SyncIssue, SyncIssueType};

/// Fixed issue-kind order fulfillment runs in (§4.9). Required objects
/// (schemas, tables, columns, primary keys) are applied before the
/// dependent objects (foreign keys, checks, indexes) that reference them,
/// and every mismatch's drop happens before its recreate.
pub const FULFILLMENT_ORDER: &[SyncIssueType] = &[
    SyncIssueType::SchemaNotFound,
    SyncIssueType::TableNotFound,
    SyncIssueType::FieldNotFound,
    SyncIssueType::FieldTypeMismatch,
    SyncIssueType::FieldNullableMismatch,
    SyncIssueType::FieldDefaultValueMismatch,
    SyncIssueType::PrimaryKeyNotFound,
    SyncIssueType::PrimaryKeyDangling,
    SyncIssueType::ForeignKeyNotFound,
    SyncIssueType::ForeignKeyDangling,
    SyncIssueType::ForeignKeyMismatch,
    SyncIssueType::UniqueKeyNotFound,
    SyncIssueType::UniqueKeyDangling,
    SyncIssueType::CheckKeyNotFound,
    SyncIssueType::CheckKeyMismatch,
    SyncIssueType::CheckKeyDangling,
    SyncIssueType::BtreeIndexNotFound,
    SyncIssueType::BtreeIndexDangling,
];

/// Applies every resolvable issue's actions in the fixed kind order from
/// §4.9 (spec component C9). Issues are mutated in place: `fulfilled` and
/// `error` are each set exactly once, here, and never touched again.
///
/// Only called when the caller asked for fulfillment and the result was
/// resolvable to begin with — an unresolvable issue is never attempted.
pub async fn fulfill(driver: &dyn Queryable, issues: &mut [SyncIssue]) -> Result<(), SyncError> {
    for kind in FULFILLMENT_ORDER {
        for issue in issues.iter_mut().filter(|i| i.kind == *kind) {
            if issue.fulfilled.is_some() {
                continue;
            }

            let mut failure = None;
            for sql in &issue.actions {
                tracing::debug!(table = issue.table.as_deref(), field = issue.field.as_deref(), sql, "applying fulfillment statement");
                if let Err(err) = driver.query(sql, &[]).await {
                    failure = Some(err.to_string());
                    break;
                }
            }

            match failure {
                Some(err) => {
                    tracing::warn!(kind = ?issue.kind, error = %err, "fulfillment statement failed");
                    issue.error = Some(err);
                    issue.fulfilled = Some(false);
                }
                None => {
                    issue.fulfilled = Some(true);
                }
            }
        }
    }

    Ok(())
}
