//! VM error type
//!
//! A `VmError` terminates the program: stack underflow, arity mismatch,
//! type-domain violations, out-of-range slices. These indicate compiler
//! bugs or host misconfiguration, not user errors; user-visible failures
//! travel as first-class `Error` values instead.

use rill_core::program::Op;

#[derive(Debug)]
pub struct VmError {
    pub message: String,
}

impl VmError {
    pub fn new(message: impl Into<String>) -> VmError {
        VmError {
            message: message.into(),
        }
    }

    /// Error attributed to the opcode being executed.
    pub fn at(op: Op, message: impl Into<String>) -> VmError {
        VmError {
            message: format!("op {}: {}", op.mnemonic(), message.into()),
        }
    }
}

impl std::fmt::Display for VmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vm error: {}", self.message)
    }
}

impl std::error::Error for VmError {}

impl From<String> for VmError {
    fn from(message: String) -> Self {
        VmError { message }
    }
}
