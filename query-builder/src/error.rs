use thiserror::Error;

/// Errors raised while composing or executing a query.
///
/// Per the design, constructing an expression over the wrong operand type
/// fails immediately at the call site rather than at `exec` time — these
/// variants are the "construction-time failure" the spec calls for.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("field '{0}' is not in scope for alias '{1}'")]
    FieldNotInScope(String, String),

    #[error("alias '{0}' is not in scope")]
    AliasNotInScope(String),

    #[error("expected a {expected} expression, found {found}")]
    TypeMismatch { expected: &'static str, found: &'static str },

    #[error("cast target must be integer, double, or string")]
    InvalidCastTarget,

    #[error("ifNull can only be used with a compatible literal or expression of the same type")]
    IncompatibleIfNullOperand,

    #[error("driver error while executing '{sql}': {source}")]
    Driver {
        sql: String,
        #[source]
        source: crate::driver::DriverError,
    },
}
