//! FNV-1a hashing over runtime values
//!
//! Struct and enum values cache their hash at construction so that equality
//! checks can reject on a single integer compare before walking structure.
//! The invariant the rest of the system leans on: values that compare equal
//! hash equal.
//!
//! Struct fields are folded in sorted-key order (the field map is a
//! `BTreeMap`, so iteration order is already sorted); enum payloads are
//! folded in declaration order.

use crate::value::Value;
use std::collections::BTreeMap;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Incremental FNV-1a folder.
#[derive(Debug, Clone, Copy)]
pub struct Fnv1a(u64);

impl Fnv1a {
    pub fn new() -> Fnv1a {
        Fnv1a(FNV_OFFSET_BASIS)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u64::from(b);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for Fnv1a {
    fn default() -> Self {
        Fnv1a::new()
    }
}

/// Hash a value.
///
/// Structs and enums return their cached hash. None, closures, and sockets
/// hash to a zero seed: they either have no meaningful content (None) or are
/// identity-compared, so any constant is consistent with equality.
pub fn hash_value(value: &Value) -> u64 {
    match value {
        Value::Int(n) => {
            let mut h = Fnv1a::new();
            h.write(&n.to_le_bytes());
            h.finish()
        }
        Value::Float(f) => {
            let mut h = Fnv1a::new();
            h.write(&f.to_bits().to_le_bytes());
            h.finish()
        }
        Value::Bool(b) => {
            let mut h = Fnv1a::new();
            h.write(&[u8::from(*b)]);
            h.finish()
        }
        Value::String(s) => {
            let mut h = Fnv1a::new();
            h.write(s.as_bytes());
            h.finish()
        }
        Value::Array(items) => {
            let mut h = Fnv1a::new();
            for item in items.iter() {
                h.write_u64(hash_value(item));
            }
            h.finish()
        }
        Value::Struct(data) => data.hash,
        Value::Enum(data) => data.hash,
        Value::Error(payload) => {
            let mut h = Fnv1a::new();
            h.write(b"error");
            h.write_u64(hash_value(payload));
            h.finish()
        }
        Value::None | Value::Closure(_) | Value::Socket(_) => 0,
    }
}

/// Hash for a struct under construction: type name, then each field name and
/// recursively-hashed value in sorted-key order.
pub fn hash_struct(type_name: &str, fields: &BTreeMap<String, Value>) -> u64 {
    let mut h = Fnv1a::new();
    h.write(type_name.as_bytes());
    for (name, value) in fields {
        h.write(name.as_bytes());
        h.write_u64(hash_value(value));
    }
    h.finish()
}

/// Hash for an enum under construction: enum name, variant name, then each
/// payload value's hash in declaration order.
pub fn hash_enum(enum_name: &str, variant_name: &str, payload: &[Value]) -> u64 {
    let mut h = Fnv1a::new();
    h.write(enum_name.as_bytes());
    h.write(variant_name.as_bytes());
    for value in payload {
        h.write_u64(hash_value(value));
    }
    h.finish()
}
