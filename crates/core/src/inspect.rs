//! Value rendering for `println` and `inspect`
//!
//! Two forms: `inspect_inline` always produces a single line;
//! `inspect_pretty` switches to a wrapped multi-line layout when a value is
//! too wide or contains non-simple children.
//!
//! "Simple" values (primitives, none, short strings, closures, payloadless
//! enums) never wrap. Arrays of simple values pack several items per line so
//! a list of a hundred ints doesn't become a hundred lines.

use crate::value::Value;
use std::fmt::Write as _;

/// Inline width past which pretty output wraps.
const WRAP_WIDTH: usize = 80;

/// Strings shorter than this count as simple.
const SHORT_STRING: usize = 20;

/// Max simple items packed onto one line of a wrapped array.
const ITEMS_PER_LINE: usize = 6;

/// Single-line rendering. Top-level strings render bare; strings nested in
/// composites are quoted so array/struct output stays readable.
pub fn inspect_inline(value: &Value) -> String {
    inline(value, false)
}

/// Multi-line rendering at the given indent level (two spaces per level).
pub fn inspect_pretty(value: &Value, indent: usize) -> String {
    let flat = inline(value, indent > 0);
    if !needs_wrap(value, &flat) {
        return flat;
    }

    match value {
        Value::Array(items) => pretty_array(items, indent),
        Value::Struct(data) => {
            let mut out = format!("{} {{\n", data.type_name);
            for (name, field) in &data.fields {
                let rendered = inspect_pretty(field, indent + 1);
                let _ = writeln!(out, "{}{}: {},", pad(indent + 1), name, rendered);
            }
            let _ = write!(out, "{}}}", pad(indent));
            out
        }
        Value::Enum(data) => {
            let mut out = format!("{}.{}(\n", data.enum_name, data.variant_name);
            for item in &data.payload {
                let rendered = inspect_pretty(item, indent + 1);
                let _ = writeln!(out, "{}{},", pad(indent + 1), rendered);
            }
            let _ = write!(out, "{})", pad(indent));
            out
        }
        Value::Error(payload) => {
            format!("error({})", inspect_pretty(payload, indent))
        }
        // Everything else is single-line by construction
        _ => flat,
    }
}

/// A value is simple when its inline form is trivially short: primitives,
/// none, short strings, closures, and enums without payload.
pub fn is_simple(value: &Value) -> bool {
    match value {
        Value::Int(_) | Value::Float(_) | Value::Bool(_) | Value::None | Value::Closure(_) => true,
        Value::String(s) => s.len() < SHORT_STRING,
        Value::Enum(data) => data.payload.is_empty(),
        _ => false,
    }
}

fn needs_wrap(value: &Value, flat: &str) -> bool {
    if flat.len() > WRAP_WIDTH {
        return true;
    }
    match value {
        Value::Array(items) => items.iter().any(|v| !is_simple(v)),
        Value::Struct(data) => data.fields.values().any(|v| !is_simple(v)),
        Value::Enum(data) => data.payload.iter().any(|v| !is_simple(v)),
        Value::Error(payload) => !is_simple(payload),
        _ => false,
    }
}

fn pad(indent: usize) -> String {
    "  ".repeat(indent)
}

fn inline(value: &Value, nested: bool) -> String {
    match value {
        Value::Int(n) => n.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => {
            if nested {
                format!("{:?}", s.as_ref())
            } else {
                s.to_string()
            }
        }
        Value::None => "none".to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(|v| inline(v, true)).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Struct(data) => {
            let parts: Vec<String> = data
                .fields
                .iter()
                .map(|(name, v)| format!("{}: {}", name, inline(v, true)))
                .collect();
            if parts.is_empty() {
                format!("{} {{}}", data.type_name)
            } else {
                format!("{} {{ {} }}", data.type_name, parts.join(", "))
            }
        }
        Value::Enum(data) => {
            if data.payload.is_empty() {
                format!("{}.{}", data.enum_name, data.variant_name)
            } else {
                let parts: Vec<String> = data.payload.iter().map(|v| inline(v, true)).collect();
                format!("{}.{}({})", data.enum_name, data.variant_name, parts.join(", "))
            }
        }
        Value::Closure(data) => {
            if data.name.is_empty() {
                "<fn>".to_string()
            } else {
                format!("<fn {}>", data.name)
            }
        }
        Value::Error(payload) => format!("error({})", inline(payload, true)),
        Value::Socket(handle) => {
            if handle.is_listener {
                format!("<listener {}>", handle.id)
            } else {
                format!("<socket {}>", handle.id)
            }
        }
    }
}

/// Floats always show a decimal point so `1.0` doesn't read as an Int.
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

fn pretty_array(items: &[Value], indent: usize) -> String {
    let mut out = String::from("[\n");
    let inner = pad(indent + 1);

    let mut line: Vec<String> = Vec::new();
    for item in items {
        if is_simple(item) && line.len() < ITEMS_PER_LINE {
            line.push(inline(item, true));
            continue;
        }
        if !line.is_empty() {
            let _ = writeln!(out, "{}{},", inner, line.join(", "));
            line.clear();
        }
        if is_simple(item) {
            line.push(inline(item, true));
        } else {
            let _ = writeln!(out, "{}{},", inner, inspect_pretty(item, indent + 1));
        }
    }
    if !line.is_empty() {
        let _ = writeln!(out, "{}{},", inner, line.join(", "));
    }

    let _ = write!(out, "{}]", pad(indent));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_inline_primitives() {
        assert_eq!(inspect_inline(&Value::Int(3)), "3");
        assert_eq!(inspect_inline(&Value::Float(1.0)), "1.0");
        assert_eq!(inspect_inline(&Value::Bool(true)), "true");
        assert_eq!(inspect_inline(&Value::None), "none");
        assert_eq!(inspect_inline(&Value::string("hi")), "hi");
    }

    #[test]
    fn test_nested_strings_quoted() {
        let arr = Value::array(vec![Value::string("a"), Value::Int(1)]);
        assert_eq!(inspect_inline(&arr), "[\"a\", 1]");
    }

    #[test]
    fn test_enum_forms() {
        let bare = Value::enum_value(1, "Color", "Red", vec![]);
        assert_eq!(inspect_inline(&bare), "Color.Red");

        let payload = Value::enum_value(2, "R", "Ok", vec![Value::Int(7)]);
        assert_eq!(inspect_inline(&payload), "R.Ok(7)");
    }

    #[test]
    fn test_short_value_stays_inline_in_pretty() {
        let arr = Value::array(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(inspect_pretty(&arr, 0), "[1, 2]");
    }

    #[test]
    fn test_wide_array_wraps_and_packs() {
        let items: Vec<Value> = (0..40).map(Value::Int).collect();
        let out = inspect_pretty(&Value::array(items), 0);
        assert!(out.starts_with("[\n"));
        assert!(out.ends_with(']'));
        // Six per line: first line holds 0..=5
        assert!(out.contains("0, 1, 2, 3, 4, 5,"));
    }

    #[test]
    fn test_struct_with_long_string_wraps() {
        let mut fields = BTreeMap::new();
        fields.insert(
            "text".to_string(),
            Value::string("a string well past the short-string threshold"),
        );
        let v = Value::struct_value(1, "Doc", fields);
        let out = inspect_pretty(&v, 0);
        assert!(out.starts_with("Doc {\n"));
        assert!(out.contains("  text: "));
    }
}
