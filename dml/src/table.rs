use serde::{Deserialize, Serialize};

use crate::field::Field;

/// A declared table: a name and an ordered list of fields.
///
/// Validity (single primary key, no duplicate field names, reference
/// targets existing, etc.) is enforced by `schema-sync`'s validator, not
/// here — this type carries no invariants beyond its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Table {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.primary_key)
    }
}
