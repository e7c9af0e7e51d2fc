//! Runtime values for Rill
//!
//! `Value` is what the language talks about: the tagged union that lives in
//! stack slots, capture vectors, struct fields, and enum payloads.
//!
//! # Cloning
//!
//! Composite payloads (arrays, structs, enums, closures, errors) sit behind
//! `Arc`, so cloning a `Value` is O(1) regardless of how deep the data is.
//! Releasing the last reference frees the whole chain; there is no tracing
//! collector.
//!
//! # Equality
//!
//! Equality is structural within a tag, nominal across type declarations:
//! two structs or enums are equal only if their `type_id` matches. The cached
//! hash is compared first as a cheap reject before any structural walk.

use crate::hash::{hash_enum, hash_struct};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A struct value: nominal identity plus named fields.
///
/// `fields` is a `BTreeMap` so hashing sees a stable sorted-key order no
/// matter what order the compiler emitted the fields in.
#[derive(Debug, Clone)]
pub struct StructData {
    /// Per-run unique id of the struct declaration
    pub type_id: i64,
    /// Declared name, used only for display
    pub type_name: String,
    pub fields: BTreeMap<String, Value>,
    /// Cached FNV-1a hash, computed once at construction
    pub hash: u64,
}

/// An enum value: nominal identity, variant name, and payload values.
#[derive(Debug, Clone)]
pub struct EnumData {
    /// Per-run unique id of the enum declaration
    pub type_id: i64,
    /// Declared enum name, used only for display
    pub enum_name: String,
    pub variant_name: String,
    /// Payload values in declaration order; empty for payloadless variants
    pub payload: Vec<Value>,
    /// Cached FNV-1a hash, computed once at construction
    pub hash: u64,
}

/// A closure: a function index into the program's function table plus the
/// values captured from enclosing scopes at construction time.
#[derive(Debug, Clone)]
pub struct ClosureData {
    pub func_idx: usize,
    /// Captured values, indexed by the compiler's capture order
    pub captures: Vec<Value>,
    /// Binding name for display; empty for anonymous functions
    pub name: String,
}

/// Handle to a socket in the VM's I/O tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketHandle {
    pub id: i64,
    pub is_listener: bool,
}

/// Value: the runtime representation of every Rill expression result.
#[derive(Debug, Clone, Default)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(Arc<str>),
    #[default]
    None,
    Array(Arc<Vec<Value>>),
    Struct(Arc<StructData>),
    Closure(Arc<ClosureData>),
    Enum(Arc<EnumData>),
    /// First-class error carrying an arbitrary payload
    Error(Arc<Value>),
    Socket(SocketHandle),
}

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Value {
        Value::String(s.into())
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Arc::new(items))
    }

    /// Build a struct value, computing and caching its hash.
    pub fn struct_value(
        type_id: i64,
        type_name: impl Into<String>,
        fields: BTreeMap<String, Value>,
    ) -> Value {
        let type_name = type_name.into();
        let hash = hash_struct(&type_name, &fields);
        Value::Struct(Arc::new(StructData {
            type_id,
            type_name,
            fields,
            hash,
        }))
    }

    /// Build an enum value, computing and caching its hash.
    pub fn enum_value(
        type_id: i64,
        enum_name: impl Into<String>,
        variant_name: impl Into<String>,
        payload: Vec<Value>,
    ) -> Value {
        let enum_name = enum_name.into();
        let variant_name = variant_name.into();
        let hash = hash_enum(&enum_name, &variant_name, &payload);
        Value::Enum(Arc::new(EnumData {
            type_id,
            enum_name,
            variant_name,
            payload,
            hash,
        }))
    }

    pub fn closure(func_idx: usize, captures: Vec<Value>, name: impl Into<String>) -> Value {
        Value::Closure(Arc::new(ClosureData {
            func_idx,
            captures,
            name: name.into(),
        }))
    }

    pub fn error(payload: Value) -> Value {
        Value::Error(Arc::new(payload))
    }

    /// Tag name for diagnostics ("Int", "Struct", ...)
    pub fn tag_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Bool(_) => "Bool",
            Value::String(_) => "String",
            Value::None => "None",
            Value::Array(_) => "Array",
            Value::Struct(_) => "Struct",
            Value::Closure(_) => "Closure",
            Value::Enum(_) => "Enum",
            Value::Error(_) => "Error",
            Value::Socket(_) => "Socket",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Truthiness as the VM's conditional jumps see it.
    /// Only `Bool` carries truth; everything else is a type-domain error
    /// handled at the call site.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other)
    }
}

/// Structural/nominal equality over values.
///
/// Same tag required. Structs and enums compare cached hash first (cheap
/// reject), then `type_id` (nominal identity), then structure. Closures are
/// never equal, even to themselves. Sockets compare by id and role.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::None, Value::None) => true,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b))
        }
        (Value::Struct(x), Value::Struct(y)) => {
            if x.hash != y.hash || x.type_id != y.type_id {
                return false;
            }
            x.fields.len() == y.fields.len()
                && x.fields.iter().zip(y.fields.iter()).all(
                    |((name_a, val_a), (name_b, val_b))| {
                        name_a == name_b && values_equal(val_a, val_b)
                    },
                )
        }
        (Value::Enum(x), Value::Enum(y)) => {
            if x.hash != y.hash || x.type_id != y.type_id {
                return false;
            }
            x.variant_name == y.variant_name
                && x.payload.len() == y.payload.len()
                && x.payload
                    .iter()
                    .zip(y.payload.iter())
                    .all(|(a, b)| values_equal(a, b))
        }
        (Value::Error(x), Value::Error(y)) => values_equal(x, y),
        (Value::Closure(_), Value::Closure(_)) => false,
        (Value::Socket(x), Value::Socket(y)) => x == y,
        _ => false,
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", crate::inspect::inspect_inline(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_value;

    fn fields(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_nominal_identity() {
        // Same shape, different type ids: never equal
        let a = Value::struct_value(1, "Point", fields(&[("x", Value::Int(1))]));
        let b = Value::struct_value(2, "Point", fields(&[("x", Value::Int(1))]));
        assert_ne!(a, b);

        let c = Value::struct_value(1, "Point", fields(&[("x", Value::Int(1))]));
        assert_eq!(a, c);
    }

    #[test]
    fn test_equal_values_hash_equal() {
        let a = Value::enum_value(3, "Shape", "Circle", vec![Value::Int(4)]);
        let b = Value::enum_value(3, "Shape", "Circle", vec![Value::Int(4)]);
        assert_eq!(a, b);
        assert_eq!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn test_closures_never_equal() {
        let c = Value::closure(0, vec![], "f");
        assert_ne!(c.clone(), c);
    }

    #[test]
    fn test_array_elementwise() {
        let a = Value::array(vec![Value::Int(1), Value::string("x")]);
        let b = Value::array(vec![Value::Int(1), Value::string("x")]);
        let c = Value::array(vec![Value::Int(1), Value::string("y")]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_cross_tag_never_equal() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Bool(false), Value::None);
    }

    #[test]
    fn test_socket_identity() {
        let a = Value::Socket(SocketHandle {
            id: 1,
            is_listener: false,
        });
        let b = Value::Socket(SocketHandle {
            id: 1,
            is_listener: true,
        });
        assert_ne!(a, b);
    }
}
