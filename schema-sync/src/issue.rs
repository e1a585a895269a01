/// One kind of divergence between a declared schema and the live database.
/// Variant order here is the canonical declaration order used when listing
/// issue *kinds*; the order fulfillment actually runs in lives in
/// [`crate::executor::FULFILLMENT_ORDER`] and is independent of this list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncIssueType {
    SchemaNotFound,
    TableNotFound,
    FieldNotFound,
    FieldTypeMismatch,
    FieldNullableMismatch,
    FieldDefaultValueMismatch,
    PrimaryKeyNotFound,
    PrimaryKeyDangling,
    ForeignKeyNotFound,
    ForeignKeyDangling,
    ForeignKeyMismatch,
    UniqueKeyNotFound,
    UniqueKeyDangling,
    CheckKeyNotFound,
    CheckKeyMismatch,
    CheckKeyDangling,
    BtreeIndexNotFound,
    BtreeIndexDangling,
}

/// A single divergence, with the DDL needed to fix it and whether doing so
/// automatically is considered safe.
#[derive(Debug, Clone)]
pub struct SyncIssue {
    pub kind: SyncIssueType,
    pub schema: String,
    pub table: Option<String>,
    pub field: Option<String>,
    pub resolvable: bool,
    pub description: Option<String>,
    pub fulfilled: Option<bool>,
    pub actions: Vec<String>,
    pub error: Option<String>,
}

impl SyncIssue {
    pub(crate) fn new(kind: SyncIssueType, schema: &str) -> Self {
        Self {
            kind,
            schema: schema.to_string(),
            table: None,
            field: None,
            resolvable: false,
            description: None,
            fulfilled: None,
            actions: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub(crate) fn field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub(crate) fn resolvable(mut self, resolvable: bool) -> Self {
        self.resolvable = resolvable;
        self
    }

    pub(crate) fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub(crate) fn actions(mut self, actions: Vec<String>) -> Self {
        self.actions = actions;
        self
    }
}

/// The outcome of a full sync pass.
#[derive(Debug, Clone)]
pub struct SyncResult {
    pub issues: Vec<SyncIssue>,
    pub actions: Vec<String>,
    pub warnings: Vec<String>,
    pub resolvable: bool,
    pub fulfilled: bool,
}

impl SyncResult {
    /// `resolvable` holds iff every issue is individually resolvable (an
    /// empty list is vacuously resolvable). `fulfilled` holds iff the list
    /// is empty, or fulfillment ran and every issue's `fulfilled` came back
    /// `Some(true)` — an issue that was never attempted (no fulfillment
    /// requested, or unresolvable) leaves `fulfilled = false` here.
    pub(crate) fn new(issues: Vec<SyncIssue>, warnings: Vec<String>) -> Self {
        let actions = issues.iter().flat_map(|i| i.actions.clone()).collect();
        let resolvable = issues.iter().all(|i| i.resolvable);
        let fulfilled = issues.is_empty() || issues.iter().all(|i| i.fulfilled == Some(true));
        Self { issues, actions, warnings, resolvable, fulfilled }
    }
}
