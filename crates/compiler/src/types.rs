//! Type representations the compiler consumes
//!
//! The inference algorithm lives upstream; these are the resolved shapes it
//! registers in the `TypeEnv` before compilation starts. The compiler reads
//! them for nominal ids, struct field validation, enum variant arities, and
//! argument hints for bare enum literals.

use crate::ast::Span;

/// A resolved Rill type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Float,
    String,
    Bool,
    None,
    /// `?T`: T or none
    Option(Box<Type>),
    /// `!T`: T or an error carrying E
    Result(Box<Type>, Box<Type>),
    Array(Box<Type>),
    /// A function value; parameter and return types
    Function(Vec<Type>, Box<Type>),
    /// Nominal reference to a registered struct
    Struct(String),
    /// Nominal reference to a registered enum
    Enum(String),
}

impl Type {
    /// The enum name this type expects in a value position, if any.
    /// Used to hint bare variant literals like `Ok(x)` at call sites.
    pub fn expected_enum(&self) -> Option<&str> {
        match self {
            Type::Enum(name) => Some(name),
            Type::Option(inner) | Type::Array(inner) => inner.expected_enum(),
            Type::Result(ok, _) => ok.expected_enum(),
            _ => None,
        }
    }
}

/// Where a name was defined, for diagnostics and tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DefLocation {
    pub line: u32,
    pub column: u32,
    pub end_column: u32,
}

impl DefLocation {
    pub fn from_span(span: Span) -> DefLocation {
        DefLocation {
            line: span.start_line,
            column: span.start_column,
            end_column: span.end_column,
        }
    }
}

/// A registered user function signature.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeFunction {
    pub name: String,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub location: DefLocation,
}

/// A registered struct declaration. `type_id` is assigned at registration
/// and is the value's nominal identity for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeStruct {
    pub name: String,
    pub type_id: i64,
    /// Declared fields in source order
    pub fields: Vec<(String, Type)>,
    pub location: DefLocation,
}

impl TypeStruct {
    pub fn field_type(&self, name: &str) -> Option<&Type> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty)
    }
}

/// One variant of a registered enum.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeVariant {
    pub name: String,
    /// Payload types in declaration order; empty for payloadless variants
    pub payload: Vec<Type>,
}

/// A registered enum declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeEnum {
    pub name: String,
    pub type_id: i64,
    pub variants: Vec<TypeVariant>,
    pub location: DefLocation,
}

impl TypeEnum {
    pub fn variant(&self, name: &str) -> Option<&TypeVariant> {
        self.variants.iter().find(|v| v.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_enum_sees_through_option_and_result() {
        let ty = Type::Option(Box::new(Type::Enum("Shape".to_string())));
        assert_eq!(ty.expected_enum(), Some("Shape"));

        let ty = Type::Result(
            Box::new(Type::Enum("R".to_string())),
            Box::new(Type::String),
        );
        assert_eq!(ty.expected_enum(), Some("R"));

        assert_eq!(Type::Int.expected_enum(), None);
    }

    #[test]
    fn test_struct_field_lookup() {
        let s = TypeStruct {
            name: "Point".to_string(),
            type_id: 1,
            fields: vec![("x".to_string(), Type::Int), ("y".to_string(), Type::Int)],
            location: DefLocation::default(),
        };
        assert_eq!(s.field_type("y"), Some(&Type::Int));
        assert_eq!(s.field_type("z"), None);
    }
}
