use crate::error::QueryError;
use dml::FieldType;

/// The type tag carried by every [`Expression`]. Operators are free
/// functions on `Expression` that pattern-match this tag at the point of
/// construction instead of at the type level — see the crate docs for why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Generic,
    Boolean,
    Integer,
    Double,
    String,
}

impl Tag {
    fn name(self) -> &'static str {
        match self {
            Tag::Generic => "generic",
            Tag::Boolean => "boolean",
            Tag::Integer => "integer",
            Tag::Double => "double",
            Tag::String => "string",
        }
    }

    pub(crate) fn for_field_type(t: FieldType) -> Tag {
        match t {
            FieldType::Serial | FieldType::Integer => Tag::Integer,
            FieldType::Double => Tag::Double,
            FieldType::String => Tag::String,
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, Tag::Integer | Tag::Double)
    }
}

/// A typed SQL expression: a rendered fragment plus the tag and nullability
/// that gate which operators may be applied to it.
///
/// Expressions are immutable; every combinator returns a fresh value, so
/// rendering the same expression twice always yields the same string.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    sql: String,
    tag: Tag,
    nullable: bool,
}

impl Expression {
    pub(crate) fn new(sql: impl Into<String>, tag: Tag, nullable: bool) -> Self {
        Self { sql: sql.into(), tag, nullable }
    }

    /// The rendered SQL fragment.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// A column reference `alias."field"`, tagged per the field's declared
    /// type (serial columns are tagged `Integer`, matching §4.2's operator
    /// surface — `serial` has no operators of its own).
    pub(crate) fn column(alias: &str, field: &dml::Field) -> Self {
        Self::new(
            format!("{alias}.\"{}\"", field.name),
            Tag::for_field_type(field.r#type),
            field.nullable,
        )
    }

    pub fn int(v: i64) -> Self {
        Self::new(v.to_string(), Tag::Integer, false)
    }

    pub fn double(v: f64) -> Self {
        Self::new(v.to_string(), Tag::Double, false)
    }

    pub fn string(v: &str) -> Self {
        Self::new(format!("'{}'", v.replace('\'', "''")), Tag::String, false)
    }

    pub fn boolean(v: bool) -> Self {
        Self::new(if v { "true" } else { "false" }, Tag::Boolean, false)
    }

    fn expect_tag(&self, expected: Tag) -> Result<(), QueryError> {
        if self.tag == expected {
            Ok(())
        } else {
            Err(QueryError::TypeMismatch { expected: expected.name(), found: self.tag.name() })
        }
    }

    fn expect_numeric(&self) -> Result<(), QueryError> {
        if self.tag.is_numeric() {
            Ok(())
        } else {
            Err(QueryError::TypeMismatch { expected: "integer or double", found: self.tag.name() })
        }
    }

    // -- operators available on every typed expression --------------------

    pub fn asc(&self) -> Expression {
        Expression::new(format!("{} asc", self.sql), Tag::Generic, false)
    }

    pub fn desc(&self) -> Expression {
        Expression::new(format!("{} desc", self.sql), Tag::Generic, false)
    }

    pub fn cast(&self, to: Tag) -> Result<Expression, QueryError> {
        let physical = match to {
            Tag::Integer => "bigint",
            Tag::Double => "double",
            Tag::String => "varchar",
            Tag::Generic | Tag::Boolean => return Err(QueryError::InvalidCastTarget),
        };
        Ok(Expression::new(format!("cast({} as {physical})", self.sql), to, self.nullable))
    }

    /// `coalesce(<frag>, <lift(v)>)`, always yielding a non-nullable result.
    /// Callable on any expression — coalescing a value that happens to be
    /// non-nullable is a harmless no-op in SQL, so this is not restricted to
    /// `nullable` expressions the way the original source gates it.
    pub fn if_null(&self, fallback: impl IntoOperand) -> Result<Expression, QueryError> {
        let fallback = fallback.into_operand();
        if fallback.tag != self.tag {
            return Err(QueryError::IncompatibleIfNullOperand);
        }
        Ok(Expression::new(
            format!("coalesce({}, {})", self.sql, fallback.sql),
            self.tag,
            false,
        ))
    }

    // -- boolean ------------------------------------------------------------

    pub fn not(&self) -> Result<Expression, QueryError> {
        self.expect_tag(Tag::Boolean)?;
        Ok(Expression::new(format!("(not {})", self.sql), Tag::Boolean, self.nullable))
    }

    // -- integer / double -----------------------------------------------------

    fn numeric_cmp(&self, op: &str, rhs: impl IntoOperand) -> Result<Expression, QueryError> {
        self.expect_numeric()?;
        let rhs = rhs.into_operand();
        rhs.expect_numeric()?;
        Ok(Expression::new(
            format!("({} {op} {})", self.sql, rhs.sql),
            Tag::Boolean,
            false,
        ))
    }

    pub fn equals(&self, rhs: impl IntoOperand) -> Result<Expression, QueryError> {
        if self.tag == Tag::String {
            return self.string_equals(rhs);
        }
        self.numeric_cmp("=", rhs)
    }

    pub fn less_than(&self, rhs: impl IntoOperand) -> Result<Expression, QueryError> {
        self.numeric_cmp("<", rhs)
    }

    pub fn greater_than(&self, rhs: impl IntoOperand) -> Result<Expression, QueryError> {
        self.numeric_cmp(">", rhs)
    }

    pub fn less_than_or_equal(&self, rhs: impl IntoOperand) -> Result<Expression, QueryError> {
        self.numeric_cmp("<=", rhs)
    }

    pub fn greater_than_or_equal(&self, rhs: impl IntoOperand) -> Result<Expression, QueryError> {
        self.numeric_cmp(">=", rhs)
    }

    // -- string ---------------------------------------------------------------

    fn string_equals(&self, rhs: impl IntoOperand) -> Result<Expression, QueryError> {
        self.expect_tag(Tag::String)?;
        let rhs = rhs.into_operand();
        rhs.expect_tag(Tag::String)?;
        Ok(Expression::new(format!("({} = {})", self.sql, rhs.sql), Tag::Boolean, false))
    }

    /// `(<l> like (<x> || '%'))`. The original source concatenates with
    /// `+`, which is not a PostgreSQL operator; this renders the correct
    /// `||` (see DESIGN.md).
    pub fn starts_with(&self, rhs: impl IntoOperand) -> Result<Expression, QueryError> {
        self.expect_tag(Tag::String)?;
        let rhs = rhs.into_operand();
        rhs.expect_tag(Tag::String)?;
        Ok(Expression::new(
            format!("({} like ({} || '%'))", self.sql, rhs.sql),
            Tag::Boolean,
            false,
        ))
    }

    pub fn ends_with(&self, rhs: impl IntoOperand) -> Result<Expression, QueryError> {
        self.expect_tag(Tag::String)?;
        let rhs = rhs.into_operand();
        rhs.expect_tag(Tag::String)?;
        Ok(Expression::new(
            format!("({} like ('%' || {}))", self.sql, rhs.sql),
            Tag::Boolean,
            false,
        ))
    }

    fn string_fn(&self, name: &str) -> Result<Expression, QueryError> {
        self.expect_tag(Tag::String)?;
        Ok(Expression::new(format!("{name}({})", self.sql), Tag::String, self.nullable))
    }

    pub fn upper(&self) -> Result<Expression, QueryError> {
        self.string_fn("upper")
    }

    pub fn lower(&self) -> Result<Expression, QueryError> {
        self.string_fn("lower")
    }

    pub fn trim(&self) -> Result<Expression, QueryError> {
        self.string_fn("trim")
    }

    pub fn trim_left(&self) -> Result<Expression, QueryError> {
        self.string_fn("ltrim")
    }

    pub fn trim_right(&self) -> Result<Expression, QueryError> {
        self.string_fn("rtrim")
    }
}

/// Lifts either an existing [`Expression`] or a bare Rust literal into an
/// operand, so `x.equals(5)` and `x.equals(other_expr)` both work.
pub trait IntoOperand {
    fn into_operand(self) -> Expression;
}

impl IntoOperand for Expression {
    fn into_operand(self) -> Expression {
        self
    }
}

impl IntoOperand for &Expression {
    fn into_operand(self) -> Expression {
        self.clone()
    }
}

impl IntoOperand for i64 {
    fn into_operand(self) -> Expression {
        Expression::int(self)
    }
}

impl IntoOperand for i32 {
    fn into_operand(self) -> Expression {
        Expression::int(self as i64)
    }
}

impl IntoOperand for f64 {
    fn into_operand(self) -> Expression {
        Expression::double(self)
    }
}

impl IntoOperand for &str {
    fn into_operand(self) -> Expression {
        Expression::string(self)
    }
}

impl IntoOperand for String {
    fn into_operand(self) -> Expression {
        Expression::string(&self)
    }
}

impl IntoOperand for bool {
    fn into_operand(self) -> Expression {
        Expression::boolean(self)
    }
}
