use crate::field::FieldType;

/// Coarse grouping used for reference-compatibility checks (§4.5 GLOSSARY
/// "Class"). Two fields may only reference one another across tables when
/// their logical types share a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    Integer,
    Double,
    Text,
}

struct TypeMapping {
    class: TypeClass,
    logical: FieldType,
    physical: &'static str,
    aliases: &'static [&'static str],
    converts_to: &'static [FieldType],
}

const MAPPINGS: &[TypeMapping] = &[
    TypeMapping {
        class: TypeClass::Integer,
        logical: FieldType::Serial,
        physical: "bigserial",
        aliases: &["bigserial", "serial8"],
        converts_to: &[FieldType::Serial],
    },
    TypeMapping {
        class: TypeClass::Integer,
        logical: FieldType::Integer,
        physical: "bigint",
        aliases: &["bigint", "int8"],
        converts_to: &[FieldType::Integer, FieldType::Double, FieldType::String],
    },
    TypeMapping {
        class: TypeClass::Double,
        logical: FieldType::Double,
        physical: "float8",
        aliases: &["double precision", "float8"],
        converts_to: &[FieldType::Double, FieldType::String],
    },
    TypeMapping {
        class: TypeClass::Text,
        logical: FieldType::String,
        physical: "varchar",
        aliases: &[
            "character varying",
            "varchar",
            "character",
            "char",
        ],
        converts_to: &[FieldType::String],
    },
];

fn mapping_for_logical(logical: FieldType) -> &'static TypeMapping {
    MAPPINGS
        .iter()
        .find(|m| m.logical == logical)
        .expect("every FieldType variant has a mapping row")
}

/// Resolves a physical PostgreSQL type name (case-insensitive) to the
/// logical type it represents, if any mapping row claims it.
pub fn to_logical(physical: &str) -> Option<FieldType> {
    let physical = physical.to_ascii_lowercase();
    MAPPINGS
        .iter()
        .find(|m| m.aliases.iter().any(|a| *a == physical))
        .map(|m| m.logical)
}

/// The canonical physical type PostgreSQL DDL should use for a logical type.
pub fn to_physical(logical: FieldType) -> &'static str {
    mapping_for_logical(logical).physical
}

/// `true` iff a column currently typed `from` can be safely cast to `to`
/// without data loss (drives §4.7's type-mismatch resolvability).
pub fn can_convert(from: FieldType, to: FieldType) -> bool {
    mapping_for_logical(from).converts_to.contains(&to)
}

/// The type class for a logical type, used to check reference compatibility.
pub fn class_of(logical: FieldType) -> TypeClass {
    mapping_for_logical(logical).class
}

/// `true` iff the two logical types share a class, i.e. a `references` can
/// legally connect fields of these two types.
pub fn same_class(a: FieldType, b: FieldType) -> bool {
    class_of(a) == class_of(b)
}
