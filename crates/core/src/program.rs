//! Compiled bytecode for the Rill VM
//!
//! A `Program` is the sole artifact the compiler hands the VM: a constant
//! pool, a function table, and one shared instruction vector. Every
//! function's body is a contiguous slice of that vector, so a code address
//! is a single `usize` and jumps are plain absolute addresses.
//!
//! Instructions carry exactly one `i32` operand. Variable-arity constructors
//! (`MakeArray`, `MakeEnumPayload`, ...) encode their count in the operand;
//! opcodes that need no operand leave it zero.

use crate::value::Value;
use std::fmt;

/// Opcode set of the Rill VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Push `constants[operand]`
    PushConst,
    /// Push local slot `base + operand`
    PushLocal,
    /// Pop into local slot `base + operand`
    StoreLocal,
    /// Push capture `operand` of the executing closure
    PushCapture,
    /// Push the currently executing closure value (direct recursion)
    PushSelf,
    PushNone,
    Pop,
    Dup,
    Swap,
    /// Unconditional jump to absolute code address `operand`
    Jump,
    /// Pop a Bool; jump when false
    JumpIfFalse,
    /// Pop a Bool; jump when true
    JumpIfTrue,
    /// Pop a closure, then `operand` arguments; push a frame
    Call,
    /// Like `Call` but reuses the current frame
    TailCall,
    Ret,
    /// Stop the machine, yielding the top of stack (or none)
    Halt,
    /// Pop `functions[operand].capture_count` values into a closure
    MakeClosure,

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Negate,
    Not,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,

    /// Pop `operand` values; push an array in original order
    MakeArray,
    ArrayConcat,
    ArrayLen,
    /// Pop end, start, array; push `array[start..end]`
    ArraySlice,
    /// Pop index, array; push element or none when out of bounds
    Index,
    /// Pop end, start; push `[start, start+1, ..., end-1]`
    MakeRange,

    /// Pop type name, type id, then `operand` (name, value) pairs
    MakeStruct,
    /// Pop a struct; push field named by `constants[operand]`
    GetField,
    /// Pop variant name, enum name, type id; push a payloadless enum
    MakeEnum,
    /// Pop variant name, enum name, type id, then `operand` payload values
    MakeEnumPayload,
    /// Pop variant name, enum name, type id, subject; push Bool
    MatchEnum,
    /// Pop an enum; push its payload values in order (or none when empty)
    UnwrapEnum,

    MakeError,
    IsError,
    IsNone,
    UnwrapError,

    ToString,
    StrConcat,

    /// Dispatch builtin identified by `operand`
    CallBuiltin,
}

impl Op {
    /// Lowercase mnemonic used in disassembly and VM diagnostics.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::PushConst => "push_const",
            Op::PushLocal => "push_local",
            Op::StoreLocal => "store_local",
            Op::PushCapture => "push_capture",
            Op::PushSelf => "push_self",
            Op::PushNone => "push_none",
            Op::Pop => "pop",
            Op::Dup => "dup",
            Op::Swap => "swap",
            Op::Jump => "jump",
            Op::JumpIfFalse => "jump_if_false",
            Op::JumpIfTrue => "jump_if_true",
            Op::Call => "call",
            Op::TailCall => "tail_call",
            Op::Ret => "ret",
            Op::Halt => "halt",
            Op::MakeClosure => "make_closure",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Mod => "mod",
            Op::Negate => "negate",
            Op::Not => "not",
            Op::Eq => "eq",
            Op::Neq => "neq",
            Op::Lt => "lt",
            Op::Gt => "gt",
            Op::Lte => "lte",
            Op::Gte => "gte",
            Op::MakeArray => "make_array",
            Op::ArrayConcat => "array_concat",
            Op::ArrayLen => "array_len",
            Op::ArraySlice => "array_slice",
            Op::Index => "index",
            Op::MakeRange => "make_range",
            Op::MakeStruct => "make_struct",
            Op::GetField => "get_field",
            Op::MakeEnum => "make_enum",
            Op::MakeEnumPayload => "make_enum_payload",
            Op::MatchEnum => "match_enum",
            Op::UnwrapEnum => "unwrap_enum",
            Op::MakeError => "make_error",
            Op::IsError => "is_error",
            Op::IsNone => "is_none",
            Op::UnwrapError => "unwrap_error",
            Op::ToString => "to_string",
            Op::StrConcat => "str_concat",
            Op::CallBuiltin => "call_builtin",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// One instruction: opcode plus a single operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    pub operand: i32,
}

impl Instruction {
    pub fn new(op: Op, operand: i32) -> Instruction {
        Instruction { op, operand }
    }

    /// Instruction whose operand is unused.
    pub fn bare(op: Op) -> Instruction {
        Instruction { op, operand: 0 }
    }
}

/// Metadata for one compiled function.
#[derive(Debug, Clone)]
pub struct Function {
    /// Binding name; `<main>` for the entry, empty for anonymous functions
    pub name: String,
    pub arity: usize,
    /// Total local slot count, parameters included
    pub locals: usize,
    pub capture_count: usize,
    /// First instruction, as an index into the shared code vector
    pub code_start: usize,
    pub code_len: usize,
}

/// A complete compiled program.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub constants: Vec<Value>,
    pub functions: Vec<Function>,
    pub code: Vec<Instruction>,
    /// Index of the entry function
    pub entry: usize,
}

impl Program {
    /// Human-readable listing: function table, then one line per instruction
    /// annotated with the function each address belongs to.
    pub fn disassemble(&self) -> String {
        use std::fmt::Write as _;

        let mut out = String::new();
        for (idx, func) in self.functions.iter().enumerate() {
            let name = if func.name.is_empty() {
                "<anon>"
            } else {
                &func.name
            };
            let _ = writeln!(
                out,
                "fn #{idx} {name} arity={} locals={} captures={} code={}..{}",
                func.arity,
                func.locals,
                func.capture_count,
                func.code_start,
                func.code_start + func.code_len,
            );
        }
        for (addr, instr) in self.code.iter().enumerate() {
            let _ = writeln!(out, "{addr:5}  {:<18} {}", instr.op.mnemonic(), instr.operand);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disassemble_lists_functions_and_code() {
        let program = Program {
            constants: vec![Value::Int(1)],
            functions: vec![Function {
                name: "<main>".to_string(),
                arity: 0,
                locals: 0,
                capture_count: 0,
                code_start: 0,
                code_len: 2,
            }],
            code: vec![
                Instruction::new(Op::PushConst, 0),
                Instruction::bare(Op::Ret),
            ],
            entry: 0,
        };

        let listing = program.disassemble();
        assert!(listing.contains("fn #0 <main> arity=0"));
        assert!(listing.contains("push_const"));
        assert!(listing.contains("ret"));
    }
}
