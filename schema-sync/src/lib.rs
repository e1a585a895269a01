//! Schema synchronizer: compares a declared logical schema against a live
//! PostgreSQL-family database and optionally fixes the divergence (spec
//! components C4/C6/C7/C8/C9).
//!
//! `sync` is the only entry point: validate (C6) → read the catalog (C4) →
//! diff (C7) → optionally fulfill (C9). Every fallible step up to and
//! including the catalog read can abort the whole call with [`SyncError`];
//! everything found afterwards is a recoverable [`SyncIssue`], never an
//! `Err`.

mod catalog;
mod ddl;
mod differ;
mod error;
mod executor;
mod issue;
mod validator;

use dml::Table;
use query_builder::Queryable;

pub use catalog::{CatalogReader, DbColumn, DbConstraint, DbIndex, DbState};
pub use error::SyncError;
pub use issue::{SyncIssue, SyncIssueType, SyncResult};

/// The one configuration knob named in §6's `sync(driver, schemaName,
/// tables[], { fullfill? })` signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub fulfill: bool,
}

/// Runs one full sync pass: validates `tables` (C6), reads `schema`'s
/// current state from `driver` (C4), diffs the two (C7), and — when
/// `options.fulfill` is set and the result is resolvable — applies every
/// issue's remediation DDL in the fixed order from §4.9 (C9).
///
/// Declarative invariant violations and driver errors during introspection
/// abort with [`SyncError`]; every other divergence becomes a [`SyncIssue`]
/// inside the returned [`SyncResult`].
pub async fn sync(
    driver: &dyn Queryable,
    schema: &str,
    tables: &[Table],
    options: SyncOptions,
) -> Result<SyncResult, SyncError> {
    validator::validate(tables)?;

    let reader = CatalogReader::new(driver);
    let db = reader.read(schema).await?;

    let (mut issues, warnings) = differ::Differ::new(schema, tables, &db, &reader).diff().await?;

    let resolvable = issues.iter().all(|i| i.resolvable);

    if options.fulfill && resolvable && !issues.is_empty() {
        tracing::debug!(schema, issues = issues.len(), "fulfilling sync issues");
        executor::fulfill(driver, &mut issues).await?;
    }

    Ok(SyncResult::new(issues, warnings))
}
