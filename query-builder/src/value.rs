/// A decoded (or bound) scalar value. Mirrors the teacher's own
/// `quaint::Value` — the driver speaks this type on both the parameter and
/// the result-row side.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// One decoded result row: projection label → value, in projection order.
pub type Row = indexmap::IndexMap<String, Value>;
