//! Rill Compiler Library
//!
//! The back half of the Rill pipeline's front end: takes the typed AST and
//! frozen type environment produced by the checker and lowers them to the
//! bytecode the VM executes.
//!
//! ```rust,ignore
//! use rill_compiler::{ast, compile, TypeEnv};
//! use rill_core::Flags;
//!
//! let program: ast::BlockExpression = /* from the type checker */;
//! let env: TypeEnv = /* frozen after inference */;
//! let bytecode = compile(&program, &env, &Flags::new())?;
//! ```
//!
//! Data flow is strictly linear: typed AST + `TypeEnv` + `Flags` in,
//! `rill_core::Program` out. The compiler never executes anything.

pub mod ast;
pub mod codegen;
pub mod env;
pub mod types;

pub use codegen::{compile, CompileError, TailPosition};
pub use env::TypeEnv;
pub use types::{DefLocation, Type, TypeEnum, TypeFunction, TypeStruct, TypeVariant};
