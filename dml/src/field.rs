use serde::{Deserialize, Serialize};

/// The logical type of a declared field. See [`crate::types`] for the
/// physical PostgreSQL types each of these maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Serial,
    Integer,
    Double,
    String,
}

/// `ON DELETE` / `ON UPDATE` actions a foreign key can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferentialAction {
    NoAction,
    Restrict,
    Cascade,
    SetDefault,
}

impl ReferentialAction {
    /// Maps to the single-character code PostgreSQL stores in
    /// `pg_constraint.confupdtype`/`confdeltype`.
    pub fn from_catalog_code(code: char) -> Self {
        match code {
            'c' => ReferentialAction::Cascade,
            'r' => ReferentialAction::Restrict,
            'd' => ReferentialAction::SetDefault,
            // 'a' (no action) and anything unrecognized default to no-op.
            _ => ReferentialAction::NoAction,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "no action",
            ReferentialAction::Restrict => "restrict",
            ReferentialAction::Cascade => "cascade",
            ReferentialAction::SetDefault => "set default",
        }
    }
}

/// A declared foreign key target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReference {
    pub table: String,
    pub field: String,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

impl FieldReference {
    pub fn new(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            on_delete: None,
            on_update: None,
        }
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    pub fn on_delete_or_default(&self) -> ReferentialAction {
        self.on_delete.unwrap_or(ReferentialAction::NoAction)
    }

    pub fn on_update_or_default(&self) -> ReferentialAction {
        self.on_update.unwrap_or(ReferentialAction::NoAction)
    }
}

/// Index kinds supported by `Field::index`. Only btree per spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    Btree,
}

impl IndexKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            IndexKind::Btree => "btree",
        }
    }
}

/// One column of a declared [`crate::Table`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub r#type: FieldType,
    pub nullable: bool,
    pub unique: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
    pub references: Option<FieldReference>,
    pub one_of: Vec<String>,
    pub index: Option<IndexKind>,
}

impl Field {
    pub fn new(name: impl Into<String>, r#type: FieldType) -> Self {
        Self {
            name: name.into(),
            r#type,
            nullable: false,
            unique: false,
            default_value: None,
            primary_key: false,
            references: None,
            one_of: Vec::new(),
            index: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn references(mut self, reference: FieldReference) -> Self {
        self.references = Some(reference);
        self
    }

    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.one_of = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn index(mut self, kind: IndexKind) -> Self {
        self.index = Some(kind);
        self
    }

    pub fn is_serial(&self) -> bool {
        matches!(self.r#type, FieldType::Serial)
    }
}
