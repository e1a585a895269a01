use thiserror::Error;

/// Fatal errors that abort a sync before any remediation is attempted.
/// Divergences that can be reported and optionally fixed are never errors —
/// they become [`crate::SyncIssue`] entries instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A declared-schema invariant violation (§3), caught before any I/O.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A driver error while introspecting or probing the database,
    /// wrapped with the SQL that failed.
    #[error("driver error running '{sql}': {source}")]
    Driver {
        sql: String,
        #[source]
        source: query_builder::DriverError,
    },
}
