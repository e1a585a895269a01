//! Declarative schema model shared by `query-builder` and `schema-sync`.
//!
//! Everything here is a plain, immutable value — no I/O, no validation
//! beyond what the type system gives for free. Validation against the
//! invariants in the specification (single primary key, non-nullable
//! serials, reference type compatibility, …) lives in `schema-sync`'s
//! validator, which is the only component allowed to reject a declared
//! schema.

mod field;
mod table;
pub mod types;

pub use field::{Field, FieldReference, FieldType, IndexKind, ReferentialAction};
pub use table::Table;
