//! Rill Runtime: the stack virtual machine
//!
//! Executes the bytecode `Program` the compiler produced. Strictly
//! single-threaded and non-reentrant: one operand stack, one frame stack.
//! Only the I/O builtins touch the host, and every one of them sits behind
//! the capability `Flags` the embedder passes in.
//!
//! ```rust,ignore
//! use rill_runtime::run_program;
//! use rill_core::Flags;
//!
//! let result = run_program(&program, Flags::new().with_io())?;
//! ```
//!
//! # Modules
//!
//! - `vm`: frame stack, operand stack, instruction dispatch
//! - `builtins`: builtin dispatch and capability gating
//! - `file` / `tcp`: synchronous host I/O behind the builtins
//! - `capture`: an output sink embedders can read back
//! - `error`: the VM error plane

pub mod builtins;
pub mod capture;
pub mod error;
pub mod file;
pub mod tcp;
pub mod vm;

pub use capture::CaptureBuffer;
pub use error::VmError;
pub use tcp::SocketTables;
pub use vm::{run_program, CallFrame, Vm};
