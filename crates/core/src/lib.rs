//! Rill Core: shared foundation for the Rill execution pipeline
//!
//! This crate holds the data the compiler and VM agree on, and nothing else:
//!
//! - `value`: the runtime `Value` tagged union (Int, Struct, Enum, Closure, ...)
//! - `hash`: FNV-1a hashing with cached struct/enum hashes
//! - `inspect`: inline and pretty value rendering for `println`/`inspect`
//! - `program`: bytecode `Op`/`Instruction`/`Function`/`Program`
//! - `builtins`: the builtin identifier table shared by compiler and VM
//! - `flags`: host capability gates (I/O, string library, debug builtins)
//!
//! The compiler produces a `Program`; the VM consumes it and produces a
//! `Value`. Neither calls back into the other.

pub mod builtins;
pub mod flags;
pub mod hash;
pub mod inspect;
pub mod program;
pub mod value;

pub use builtins::Builtin;
pub use flags::Flags;
pub use hash::{hash_enum, hash_struct, hash_value, Fnv1a};
pub use inspect::{inspect_inline, inspect_pretty, is_simple};
pub use program::{Function, Instruction, Op, Program};
pub use value::{values_equal, ClosureData, EnumData, SocketHandle, StructData, Value};
