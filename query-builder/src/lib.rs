//! Typed SELECT query builder (spec components C2/C3).
//!
//! Composition is purely functional: every combinator on [`Expression`]
//! returns a fresh value, and the stage types in [`query`] thread an
//! immutable [`Scope`] through `from → join* → select → where? → orderBy?
//! → exec`. Later stages are only reachable through the consuming methods
//! of the previous one, so the call order is enforced by the type system.

mod driver;
mod error;
mod expr;
mod query;
mod scope;
mod value;

pub use driver::{DriverError, Queryable, QueryResult};
pub use error::QueryError;
pub use expr::{Expression, Tag};
pub use query::{ExecOptions, FilteredQuery, FromStage, OrderedQuery, Query, SelectedQuery};
pub use scope::{OrderBy, Projection, Scope};
pub use value::{Row, Value};
