//! The static type system used by inspection.
//!
//! Types form a sum of primitives (by kind and nullability), literal
//! refinements, and structured extensions such as defined records and
//! functions. [simplify] reduces a sequence of types set-theoretically
//! while preserving insertion order, so the canonical rendering of a
//! union is stable.

use std::fmt;

use indexmap::IndexMap;
use pqm_grammar::node::PrimitiveTypeKind;
use pqm_grammar::text::is_regular_identifier;
use pqm_grammar::text::quote_identifier;

pub mod infer;

/// The kind of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeKind {
    /// The `action` type.
    Action,
    /// The `any` type.
    Any,
    /// The `anynonnull` type.
    AnyNonNull,
    /// The `binary` type.
    Binary,
    /// The `date` type.
    Date,
    /// The `datetime` type.
    DateTime,
    /// The `datetimezone` type.
    DateTimeZone,
    /// The `duration` type.
    Duration,
    /// The `function` type.
    Function,
    /// The `list` type.
    List,
    /// The `logical` type.
    Logical,
    /// The `none` type.
    None,
    /// The type of nodes that cannot carry a value (punctuation,
    /// parameter lists).
    NotApplicable,
    /// The `null` type.
    Null,
    /// The `number` type.
    Number,
    /// The `record` type.
    Record,
    /// The `table` type.
    Table,
    /// The `text` type.
    Text,
    /// The `time` type.
    Time,
    /// The `type` type.
    Type,
    /// The type of expressions whose type could not be determined.
    Unknown,
}

impl TypeKind {
    /// Gets the canonical name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Any => "any",
            Self::AnyNonNull => "anynonnull",
            Self::Binary => "binary",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::DateTimeZone => "datetimezone",
            Self::Duration => "duration",
            Self::Function => "function",
            Self::List => "list",
            Self::Logical => "logical",
            Self::None => "none",
            Self::NotApplicable => "not applicable",
            Self::Null => "null",
            Self::Number => "number",
            Self::Record => "record",
            Self::Table => "table",
            Self::Text => "text",
            Self::Time => "time",
            Self::Type => "type",
            Self::Unknown => "unknown",
        }
    }
}

impl From<PrimitiveTypeKind> for TypeKind {
    fn from(kind: PrimitiveTypeKind) -> Self {
        match kind {
            PrimitiveTypeKind::Action => Self::Action,
            PrimitiveTypeKind::Any => Self::Any,
            PrimitiveTypeKind::AnyNonNull => Self::AnyNonNull,
            PrimitiveTypeKind::Binary => Self::Binary,
            PrimitiveTypeKind::Date => Self::Date,
            PrimitiveTypeKind::DateTime => Self::DateTime,
            PrimitiveTypeKind::DateTimeZone => Self::DateTimeZone,
            PrimitiveTypeKind::Duration => Self::Duration,
            PrimitiveTypeKind::Function => Self::Function,
            PrimitiveTypeKind::List => Self::List,
            PrimitiveTypeKind::Logical => Self::Logical,
            PrimitiveTypeKind::None => Self::None,
            PrimitiveTypeKind::Null => Self::Null,
            PrimitiveTypeKind::Number => Self::Number,
            PrimitiveTypeKind::Record => Self::Record,
            PrimitiveTypeKind::Table => Self::Table,
            PrimitiveTypeKind::Text => Self::Text,
            PrimitiveTypeKind::Time => Self::Time,
            PrimitiveTypeKind::Type => Self::Type,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parameter of a function type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionParameter {
    /// The parameter's name.
    name: String,
    /// Whether the parameter is optional.
    is_optional: bool,
    /// Whether the parameter's type admits null.
    is_nullable: bool,
    /// The parameter's annotated type kind, when present.
    kind: Option<TypeKind>,
}

impl FunctionParameter {
    /// Creates a function parameter.
    pub fn new(
        name: impl Into<String>,
        is_optional: bool,
        is_nullable: bool,
        kind: Option<TypeKind>,
    ) -> Self {
        Self {
            name: name.into(),
            is_optional,
            is_nullable,
            kind,
        }
    }

    /// Gets the parameter's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the parameter is optional.
    pub fn is_optional(&self) -> bool {
        self.is_optional
    }

    /// Whether the parameter's type admits null.
    pub fn is_nullable(&self) -> bool {
        self.is_nullable
    }

    /// Gets the parameter's annotated type kind, when present.
    pub fn kind(&self) -> Option<TypeKind> {
        self.kind
    }
}

impl fmt::Display for FunctionParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_optional {
            write!(f, "optional ")?;
        }

        write!(f, "{name}: ", name = self.name)?;
        if self.is_nullable && self.kind != Some(TypeKind::Any) {
            write!(f, "nullable ")?;
        }

        write!(f, "{kind}", kind = self.kind.unwrap_or(TypeKind::Any))
    }
}

/// The structure of a type beyond its kind and nullability.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeVariant {
    /// A primitive type, fully described by its kind.
    Primitive(TypeKind),
    /// A number narrowed to a literal value.
    NumberLiteral(String),
    /// A text value narrowed to a literal value.
    TextLiteral(String),
    /// A logical value narrowed to `true` or `false`.
    LogicalLiteral(bool),
    /// A value with one of several alternative types.
    AnyUnion(Vec<Type>),
    /// A list with known element types.
    DefinedList(Vec<Type>),
    /// A record with known fields.
    DefinedRecord {
        /// The fields of the record, in declaration order.
        fields: IndexMap<String, Type>,
        /// Whether the record admits additional fields.
        is_open: bool,
    },
    /// A table with known columns.
    DefinedTable {
        /// The columns of the table, in declaration order.
        fields: IndexMap<String, Type>,
        /// Whether the table admits additional columns.
        is_open: bool,
    },
    /// A function with known parameters and return type.
    DefinedFunction {
        /// The parameters of the function.
        parameters: Vec<FunctionParameter>,
        /// The return type of the function.
        return_type: Box<Type>,
    },
    /// A `type {T}` value.
    ListType(Box<Type>),
    /// A `type {T, …}` value with itemized element types.
    DefinedListType(Vec<Type>),
    /// A `type [ … ]` value.
    RecordType {
        /// The field specifications, in declaration order.
        fields: IndexMap<String, Type>,
        /// Whether the record type is open.
        is_open: bool,
    },
    /// A `type table [ … ]` value.
    TableType {
        /// The column specifications, in declaration order.
        fields: IndexMap<String, Type>,
        /// Whether the table type is open.
        is_open: bool,
    },
    /// A `type table <expression>` value whose row type comes from an
    /// expression.
    TableTypePrimaryExpression,
    /// A `type function ( … ) T` value.
    FunctionType {
        /// The parameters of the function type.
        parameters: Vec<FunctionParameter>,
        /// The return type of the function type.
        return_type: Box<Type>,
    },
    /// A `type P` value over a primitive type.
    PrimaryPrimitiveType(TypeKind),
}

/// A static type: a variant plus nullability.
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    /// Whether the type admits null.
    is_nullable: bool,
    /// The structure of the type.
    variant: TypeVariant,
}

impl Type {
    /// Creates a non-nullable type from a variant.
    pub fn new(variant: TypeVariant) -> Self {
        Self {
            is_nullable: false,
            variant,
        }
    }

    /// Creates a non-nullable primitive type.
    pub fn primitive(kind: TypeKind) -> Self {
        Self::new(TypeVariant::Primitive(kind))
    }

    /// The `any` primitive.
    pub fn any() -> Self {
        Self::primitive(TypeKind::Any)
    }

    /// The `unknown` primitive.
    pub fn unknown() -> Self {
        Self::primitive(TypeKind::Unknown)
    }

    /// The `none` primitive.
    pub fn none_type() -> Self {
        Self::primitive(TypeKind::None)
    }

    /// The `not applicable` primitive.
    pub fn not_applicable() -> Self {
        Self::primitive(TypeKind::NotApplicable)
    }

    /// The `null` primitive.
    pub fn null() -> Self {
        Self::primitive(TypeKind::Null)
    }

    /// The `logical` primitive.
    pub fn logical() -> Self {
        Self::primitive(TypeKind::Logical)
    }

    /// Makes the type nullable.
    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    /// Whether the type admits null.
    pub fn is_nullable(&self) -> bool {
        self.is_nullable
    }

    /// Gets the structure of the type.
    pub fn variant(&self) -> &TypeVariant {
        &self.variant
    }

    /// Gets the kind of the type.
    pub fn kind(&self) -> TypeKind {
        match &self.variant {
            TypeVariant::Primitive(kind) => *kind,
            TypeVariant::NumberLiteral(_) => TypeKind::Number,
            TypeVariant::TextLiteral(_) => TypeKind::Text,
            TypeVariant::LogicalLiteral(_) => TypeKind::Logical,
            TypeVariant::AnyUnion(_) => TypeKind::Any,
            TypeVariant::DefinedList(_) => TypeKind::List,
            TypeVariant::DefinedRecord { .. } => TypeKind::Record,
            TypeVariant::DefinedTable { .. } => TypeKind::Table,
            TypeVariant::DefinedFunction { .. } => TypeKind::Function,
            TypeVariant::ListType(_)
            | TypeVariant::DefinedListType(_)
            | TypeVariant::RecordType { .. }
            | TypeVariant::TableType { .. }
            | TypeVariant::TableTypePrimaryExpression
            | TypeVariant::FunctionType { .. }
            | TypeVariant::PrimaryPrimitiveType(_) => TypeKind::Type,
        }
    }

    /// Determines if the type is exactly a non-nullable `any`.
    fn is_plain_any(&self) -> bool {
        matches!(self.variant, TypeVariant::Primitive(TypeKind::Any)) && !self.is_nullable
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nullable {
            write!(f, "nullable ")?;
        }

        match &self.variant {
            TypeVariant::Primitive(kind) => kind.fmt(f),
            TypeVariant::NumberLiteral(literal) | TypeVariant::TextLiteral(literal) => {
                f.write_str(literal)
            }
            TypeVariant::LogicalLiteral(value) => {
                f.write_str(if *value { "true" } else { "false" })
            }
            TypeVariant::AnyUnion(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    member.fmt(f)?;
                }
                Ok(())
            }
            TypeVariant::DefinedList(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt(f)?;
                }
                write!(f, "}}")
            }
            TypeVariant::DefinedRecord { fields, is_open } => {
                display_fields(f, fields, *is_open)
            }
            TypeVariant::DefinedTable { fields, is_open } => {
                write!(f, "table ")?;
                display_fields(f, fields, *is_open)
            }
            TypeVariant::DefinedFunction {
                parameters,
                return_type,
            } => {
                write!(f, "(")?;
                for (i, parameter) in parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    parameter.fmt(f)?;
                }
                write!(f, ") => {return_type}")
            }
            TypeVariant::ListType(item) => write!(f, "type {{{item}}}"),
            TypeVariant::DefinedListType(items) => {
                write!(f, "type {{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt(f)?;
                }
                write!(f, "}}")
            }
            TypeVariant::RecordType { fields, is_open } => {
                write!(f, "type ")?;
                display_fields(f, fields, *is_open)
            }
            TypeVariant::TableType { fields, is_open } => {
                write!(f, "type table ")?;
                display_fields(f, fields, *is_open)
            }
            TypeVariant::TableTypePrimaryExpression => write!(f, "type table"),
            TypeVariant::FunctionType {
                parameters,
                return_type,
            } => {
                write!(f, "type function (")?;
                for (i, parameter) in parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    parameter.fmt(f)?;
                }
                write!(f, ") {return_type}")
            }
            TypeVariant::PrimaryPrimitiveType(kind) => write!(f, "type {kind}"),
        }
    }
}

/// Renders a field map as `[k: T, …]`, re-quoting keys that are not
/// regular identifiers.
fn display_fields(
    f: &mut fmt::Formatter<'_>,
    fields: &IndexMap<String, Type>,
    is_open: bool,
) -> fmt::Result {
    write!(f, "[")?;
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }

        if is_regular_identifier(key, false) {
            write!(f, "{key}: {value}")?;
        } else {
            write!(f, "{quoted}: {value}", quoted = quote_identifier(key))?;
        }
    }

    if is_open {
        if !fields.is_empty() {
            write!(f, ", ")?;
        }
        write!(f, "...")?;
    }

    write!(f, "]")
}

/// Reduces a sequence of types set-theoretically.
///
/// Nested unions are flattened one level; a non-nullable `any`
/// collapses the whole sequence; duplicate primitives merge with the
/// nullable form winning; duplicate literals dedupe by value and
/// collapse into their primitive when it is present; `true` and
/// `false` together collapse to `logical`. Insertion order is
/// preserved throughout, so the rendering of the result is stable.
pub fn simplify(types: Vec<Type>) -> Type {
    // Flatten nested unions one level, preserving insertion order.
    let mut flattened = Vec::new();
    for ty in types {
        match ty.variant {
            TypeVariant::AnyUnion(members) => flattened.extend(members),
            _ => flattened.push(ty),
        }
    }

    if flattened.iter().any(Type::is_plain_any) {
        return Type::any();
    }

    // Collapse `true` and `false` into `logical`.
    let has_true = flattened
        .iter()
        .any(|t| matches!(t.variant, TypeVariant::LogicalLiteral(true)));
    let has_false = flattened
        .iter()
        .any(|t| matches!(t.variant, TypeVariant::LogicalLiteral(false)));
    if has_true && has_false {
        let nullable = flattened
            .iter()
            .any(|t| matches!(t.variant, TypeVariant::LogicalLiteral(_)) && t.is_nullable);
        let mut replaced = false;
        flattened = flattened
            .into_iter()
            .filter_map(|t| {
                if matches!(t.variant, TypeVariant::LogicalLiteral(_)) {
                    if replaced {
                        return None;
                    }
                    replaced = true;
                    let logical = Type::logical();
                    Some(if nullable { logical.nullable() } else { logical })
                } else {
                    Some(t)
                }
            })
            .collect();
    }

    // A literal collapses into its primitive when the primitive is
    // present.
    let primitive_kinds: Vec<TypeKind> = flattened
        .iter()
        .filter(|t| matches!(t.variant, TypeVariant::Primitive(_)))
        .map(Type::kind)
        .collect();
    flattened.retain(|t| {
        let is_literal = matches!(
            t.variant,
            TypeVariant::NumberLiteral(_)
                | TypeVariant::TextLiteral(_)
                | TypeVariant::LogicalLiteral(_)
        );
        !(is_literal && primitive_kinds.contains(&t.kind()))
    });

    // Dedupe, preferring the nullable form of a primitive kind.
    let mut result: Vec<Type> = Vec::new();
    for ty in flattened {
        if let TypeVariant::Primitive(kind) = ty.variant {
            if let Some(existing) = result
                .iter_mut()
                .find(|t| matches!(t.variant, TypeVariant::Primitive(k) if k == kind))
            {
                if ty.is_nullable {
                    existing.is_nullable = true;
                }
                continue;
            }
        } else if result.contains(&ty) {
            continue;
        }

        result.push(ty);
    }

    match result.len() {
        0 => Type::unknown(),
        1 => result.into_iter().next().expect("one member should remain"),
        _ => Type::new(TypeVariant::AnyUnion(result)),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    /// A number literal type for tests.
    fn number_literal(text: &str) -> Type {
        Type::new(TypeVariant::NumberLiteral(text.to_string()))
    }

    #[test]
    fn any_collapses_everything() {
        let ty = simplify(vec![
            Type::primitive(TypeKind::Number),
            Type::any(),
            Type::primitive(TypeKind::Text),
        ]);
        assert_eq!(ty, Type::any());
    }

    #[test]
    fn union_preserves_insertion_order() {
        let ty = simplify(vec![
            Type::primitive(TypeKind::Number),
            Type::primitive(TypeKind::Text),
        ]);
        assert_eq!(ty.to_string(), "number | text");

        let ty = simplify(vec![
            Type::primitive(TypeKind::Text),
            Type::primitive(TypeKind::Number),
        ]);
        assert_eq!(ty.to_string(), "text | number");
    }

    #[test]
    fn nullable_form_wins() {
        let ty = simplify(vec![
            Type::primitive(TypeKind::Number),
            Type::primitive(TypeKind::Number).nullable(),
        ]);
        assert_eq!(ty, Type::primitive(TypeKind::Number).nullable());
    }

    #[test]
    fn literal_collapses_into_primitive() {
        let ty = simplify(vec![
            number_literal("1"),
            Type::primitive(TypeKind::Number),
        ]);
        assert_eq!(ty, Type::primitive(TypeKind::Number));
    }

    #[test]
    fn boolean_literals_collapse_to_logical() {
        let ty = simplify(vec![
            Type::new(TypeVariant::LogicalLiteral(true)),
            Type::new(TypeVariant::LogicalLiteral(false)),
        ]);
        assert_eq!(ty, Type::logical());
    }

    #[test]
    fn nested_unions_flatten_one_level() {
        let inner = Type::new(TypeVariant::AnyUnion(vec![
            Type::primitive(TypeKind::Number),
            Type::primitive(TypeKind::Text),
        ]));
        let ty = simplify(vec![inner, Type::primitive(TypeKind::Logical)]);
        assert_eq!(ty.to_string(), "number | text | logical");
    }

    #[test]
    fn simplification_is_idempotent() {
        let once = simplify(vec![
            number_literal("1"),
            Type::primitive(TypeKind::Text).nullable(),
            Type::primitive(TypeKind::Text),
            Type::new(TypeVariant::LogicalLiteral(true)),
        ]);
        let twice = simplify(vec![once.clone()]);
        assert_eq!(once, twice);
    }

    #[test]
    fn record_rendering_quotes_irregular_keys() {
        let mut fields = IndexMap::new();
        fields.insert("a".to_string(), Type::primitive(TypeKind::Number));
        fields.insert("b c".to_string(), Type::primitive(TypeKind::Text));
        let ty = Type::new(TypeVariant::DefinedRecord {
            fields,
            is_open: true,
        });
        assert_eq!(ty.to_string(), r##"[a: number, #"b c": text, ...]"##);
    }
}
