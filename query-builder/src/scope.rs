use std::ops::Index;

use indexmap::IndexMap;

use crate::expr::Expression;

/// The alias → field → expression mapping visible to a builder callback at
/// a given point in the chain. Grows by one alias per `from`/`join` call
/// and is otherwise read-only.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    aliases: IndexMap<String, IndexMap<String, Expression>>,
}

impl Scope {
    pub(crate) fn new() -> Self {
        Self { aliases: IndexMap::new() }
    }

    pub(crate) fn insert_alias(&mut self, alias: &str, fields: IndexMap<String, Expression>) {
        self.aliases.insert(alias.to_string(), fields);
    }

    /// Looks up a single field expression without panicking, for callers
    /// that want to handle an out-of-scope reference explicitly.
    pub fn get(&self, alias: &str, field: &str) -> Option<&Expression> {
        self.aliases.get(alias)?.get(field)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }
}

/// `scope["t1"]["field1"]` — mirrors the destructuring access pattern of
/// the original source's callbacks. Panics on an alias or field that was
/// never put in scope; builder callbacks are expected to only reference
/// aliases named earlier in the same chain.
impl Index<&str> for Scope {
    type Output = IndexMap<String, Expression>;

    fn index(&self, alias: &str) -> &IndexMap<String, Expression> {
        self.aliases
            .get(alias)
            .unwrap_or_else(|| panic!("alias '{alias}' is not in scope"))
    }
}

/// The result of a `select` callback: projection label → expression.
pub type Projection = IndexMap<String, Expression>;

/// What `orderBy` produced: either a single expression or an ordered list.
pub enum OrderBy {
    Single(Expression),
    Many(Vec<Expression>),
}

impl OrderBy {
    pub(crate) fn into_vec(self) -> Vec<Expression> {
        match self {
            OrderBy::Single(e) => vec![e],
            OrderBy::Many(es) => es,
        }
    }
}

impl From<Expression> for OrderBy {
    fn from(e: Expression) -> Self {
        OrderBy::Single(e)
    }
}

impl From<Vec<Expression>> for OrderBy {
    fn from(es: Vec<Expression>) -> Self {
        OrderBy::Many(es)
    }
}
