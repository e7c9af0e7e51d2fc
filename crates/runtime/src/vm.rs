//! The Rill stack virtual machine
//!
//! A single-threaded interpreter over one operand stack and one frame
//! stack. Dispatch fetches `code[func.code_start + frame.ip]`, bumps `ip`,
//! and executes until the frame stack empties (the entry `ret`) or a `halt`
//! is reached.
//!
//! # Calls
//!
//! `call n` pops a closure, makes the top `n` stack values the callee's
//! parameter slots, reserves the remaining local slots, and pushes a frame.
//! `tail_call n` does the same arity check but drains and reuses the
//! current frame, so tail recursion runs in constant frame-stack space.
//! `ret` pops the frame, discards everything above its base slot, and
//! pushes the return value for the caller.
//!
//! # Jumps
//!
//! Jump operands are absolute code addresses; the frame stores its `ip`
//! relative to the function's `code_start`.

use crate::error::VmError;
use crate::tcp::SocketTables;
use rill_core::program::{Op, Program};
use rill_core::value::ClosureData;
use rill_core::{values_equal, Builtin, Flags, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

/// Frame stack bound; overflowing it is a VM error rather than an abort.
const MAX_CALL_DEPTH: usize = 1 << 20;

/// Largest array `make_range` will materialise.
const MAX_RANGE_LEN: i64 = 10_000_000;

/// Per-call record.
#[derive(Debug)]
pub struct CallFrame {
    pub func_idx: usize,
    /// Instruction offset relative to the function's `code_start`
    pub ip: usize,
    /// First operand-stack slot owned by this frame
    pub base_slot: usize,
    /// The executing closure; `None` only for the entry frame
    pub closure: Option<Arc<ClosureData>>,
}

/// The virtual machine. Owns the operand stack, the frame stack, and the
/// I/O tables; borrows the immutable program.
pub struct Vm<'a> {
    pub(crate) program: &'a Program,
    pub(crate) flags: Flags,
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) sockets: SocketTables,
    pub(crate) out: Box<dyn Write>,
}

/// Compile-free convenience: execute a program to its final value.
pub fn run_program(program: &Program, flags: Flags) -> Result<Value, VmError> {
    Vm::new(program, flags).run()
}

impl<'a> Vm<'a> {
    pub fn new(program: &'a Program, flags: Flags) -> Vm<'a> {
        Vm::with_output(program, flags, Box::new(std::io::stdout()))
    }

    /// Route builtin output (`println`) to a caller-supplied sink.
    pub fn with_output(program: &'a Program, flags: Flags, out: Box<dyn Write>) -> Vm<'a> {
        Vm {
            program,
            flags,
            stack: Vec::new(),
            frames: Vec::new(),
            sockets: SocketTables::new(),
            out,
        }
    }

    /// Execute from the entry function until completion.
    pub fn run(&mut self) -> Result<Value, VmError> {
        let entry_idx = self.program.entry;
        let entry = self
            .program
            .functions
            .get(entry_idx)
            .ok_or_else(|| VmError::new("program has no entry function"))?;
        debug!(entry = entry_idx, locals = entry.locals, "vm start");

        // Parameter + local area for the entry frame.
        for _ in 0..entry.locals {
            self.stack.push(Value::None);
        }
        self.frames.push(CallFrame {
            func_idx: entry_idx,
            ip: 0,
            base_slot: 0,
            closure: None,
        });

        loop {
            let (func_idx, ip, base_slot) = match self.frames.last() {
                Some(frame) => (frame.func_idx, frame.ip, frame.base_slot),
                None => return Err(VmError::new("dispatch with empty frame stack")),
            };
            let func = self
                .program
                .functions
                .get(func_idx)
                .ok_or_else(|| VmError::new(format!("bad function index {}", func_idx)))?;
            let code_start = func.code_start;
            let instr = *self
                .program
                .code
                .get(code_start + ip)
                .ok_or_else(|| VmError::new("instruction pointer out of range"))?;
            if let Some(frame) = self.frames.last_mut() {
                frame.ip += 1;
            }

            let op = instr.op;
            let operand = instr.operand;
            match op {
                Op::PushConst => {
                    let idx = index_operand(op, operand)?;
                    let value = self
                        .program
                        .constants
                        .get(idx)
                        .ok_or_else(|| VmError::at(op, format!("bad constant index {}", idx)))?
                        .clone();
                    self.stack.push(value);
                }
                Op::PushLocal => {
                    let slot = base_slot + index_operand(op, operand)?;
                    let value = self
                        .stack
                        .get(slot)
                        .ok_or_else(|| VmError::at(op, format!("bad local slot {}", slot)))?
                        .clone();
                    self.stack.push(value);
                }
                Op::StoreLocal => {
                    let slot = base_slot + index_operand(op, operand)?;
                    let value = self.pop(op)?;
                    match self.stack.get_mut(slot) {
                        Some(cell) => *cell = value,
                        None => {
                            return Err(VmError::at(op, format!("bad local slot {}", slot)))
                        }
                    }
                }
                Op::PushCapture => {
                    let idx = index_operand(op, operand)?;
                    let closure = match self.frames.last().and_then(|f| f.closure.as_ref()) {
                        Some(closure) => closure,
                        None => return Err(VmError::at(op, "no executing closure")),
                    };
                    let value = closure
                        .captures
                        .get(idx)
                        .ok_or_else(|| VmError::at(op, format!("bad capture index {}", idx)))?
                        .clone();
                    self.stack.push(value);
                }
                Op::PushSelf => {
                    let closure = match self.frames.last().and_then(|f| f.closure.as_ref()) {
                        Some(closure) => Arc::clone(closure),
                        None => return Err(VmError::at(op, "no executing closure")),
                    };
                    self.stack.push(Value::Closure(closure));
                }
                Op::PushNone => self.stack.push(Value::None),
                Op::Pop => {
                    self.pop(op)?;
                }
                Op::Dup => {
                    let top = self
                        .stack
                        .last()
                        .ok_or_else(|| VmError::at(op, "stack underflow"))?
                        .clone();
                    self.stack.push(top);
                }
                Op::Swap => {
                    let len = self.stack.len();
                    if len < 2 {
                        return Err(VmError::at(op, "stack underflow"));
                    }
                    self.stack.swap(len - 1, len - 2);
                }
                Op::Jump => self.jump(op, operand, code_start)?,
                Op::JumpIfFalse => {
                    if !self.pop_bool(op)? {
                        self.jump(op, operand, code_start)?;
                    }
                }
                Op::JumpIfTrue => {
                    if self.pop_bool(op)? {
                        self.jump(op, operand, code_start)?;
                    }
                }
                Op::Call => self.call(op, operand)?,
                Op::TailCall => self.tail_call(op, operand)?,
                Op::Ret => {
                    let value = self.pop(op)?;
                    let frame = self
                        .frames
                        .pop()
                        .ok_or_else(|| VmError::at(op, "no frame to return from"))?;
                    self.stack.truncate(frame.base_slot);
                    if self.frames.is_empty() {
                        debug!("vm halt: entry returned");
                        return Ok(value);
                    }
                    self.stack.push(value);
                }
                Op::Halt => {
                    return Ok(self.stack.pop().unwrap_or(Value::None));
                }
                Op::MakeClosure => {
                    let func_idx = index_operand(op, operand)?;
                    let func = self
                        .program
                        .functions
                        .get(func_idx)
                        .ok_or_else(|| VmError::at(op, format!("bad function index {}", func_idx)))?;
                    let count = func.capture_count;
                    if self.stack.len() < count {
                        return Err(VmError::at(op, "stack underflow"));
                    }
                    let captures = self.stack.split_off(self.stack.len() - count);
                    let name = func.name.clone();
                    self.stack.push(Value::closure(func_idx, captures, name));
                }

                Op::Add => self.arith(op)?,
                Op::Sub => self.arith(op)?,
                Op::Mul => self.arith(op)?,
                Op::Div => self.arith(op)?,
                Op::Mod => self.arith(op)?,
                Op::Negate => {
                    let value = self.pop(op)?;
                    let result = match value {
                        Value::Int(n) => Value::Int(n.wrapping_neg()),
                        Value::Float(f) => Value::Float(-f),
                        other => {
                            return Err(VmError::at(
                                op,
                                format!("cannot negate {}", other.tag_name()),
                            ))
                        }
                    };
                    self.stack.push(result);
                }
                Op::Not => {
                    let value = self.pop_bool(op)?;
                    self.stack.push(Value::Bool(!value));
                }
                Op::Eq => {
                    let b = self.pop(op)?;
                    let a = self.pop(op)?;
                    self.stack.push(Value::Bool(values_equal(&a, &b)));
                }
                Op::Neq => {
                    let b = self.pop(op)?;
                    let a = self.pop(op)?;
                    self.stack.push(Value::Bool(!values_equal(&a, &b)));
                }
                Op::Lt | Op::Gt | Op::Lte | Op::Gte => self.compare(op)?,

                Op::MakeArray => {
                    let count = index_operand(op, operand)?;
                    if self.stack.len() < count {
                        return Err(VmError::at(op, "stack underflow"));
                    }
                    let items = self.stack.split_off(self.stack.len() - count);
                    self.stack.push(Value::array(items));
                }
                Op::ArrayConcat => {
                    let b = self.pop_array(op)?;
                    let a = self.pop_array(op)?;
                    let mut combined = a.as_ref().clone();
                    combined.extend(b.iter().cloned());
                    self.stack.push(Value::array(combined));
                }
                Op::ArrayLen => {
                    let array = self.pop_array(op)?;
                    self.stack.push(Value::Int(array.len() as i64));
                }
                Op::ArraySlice => {
                    let end = self.pop_int(op)?;
                    let start = self.pop_int(op)?;
                    let array = self.pop_array(op)?;
                    let len = array.len() as i64;
                    if start < 0 || end < start || end > len {
                        return Err(VmError::at(
                            op,
                            format!("slice [{}..{}] out of range for length {}", start, end, len),
                        ));
                    }
                    let slice = array
                        .get(start as usize..end as usize)
                        .unwrap_or_default()
                        .to_vec();
                    self.stack.push(Value::array(slice));
                }
                Op::Index => {
                    let idx = self.pop_int(op)?;
                    let array = self.pop_array(op)?;
                    // Indexing produces an Option in the language: out of
                    // bounds is none, not an error.
                    let value = if idx >= 0 {
                        array.get(idx as usize).cloned().unwrap_or(Value::None)
                    } else {
                        Value::None
                    };
                    self.stack.push(value);
                }
                Op::MakeRange => {
                    let end = self.pop_int(op)?;
                    let start = self.pop_int(op)?;
                    if end.saturating_sub(start) > MAX_RANGE_LEN {
                        return Err(VmError::at(op, "range too large"));
                    }
                    let items: Vec<Value> = (start..end).map(Value::Int).collect();
                    self.stack.push(Value::array(items));
                }

                Op::MakeStruct => {
                    let count = index_operand(op, operand)?;
                    let type_name = self.pop_string(op)?;
                    let type_id = self.pop_int(op)?;
                    let mut fields = BTreeMap::new();
                    for _ in 0..count {
                        let value = self.pop(op)?;
                        let name = self.pop_string(op)?;
                        fields.insert(name.to_string(), value);
                    }
                    self.stack
                        .push(Value::struct_value(type_id, type_name.as_ref(), fields));
                }
                Op::GetField => {
                    let idx = index_operand(op, operand)?;
                    let name = match self.program.constants.get(idx) {
                        Some(Value::String(s)) => s.clone(),
                        _ => return Err(VmError::at(op, "field name constant missing")),
                    };
                    let value = self.pop(op)?;
                    match value {
                        Value::Struct(data) => match data.fields.get(name.as_ref()) {
                            Some(field) => self.stack.push(field.clone()),
                            None => {
                                return Err(VmError::at(
                                    op,
                                    format!("'{}' has no field '{}'", data.type_name, name),
                                ))
                            }
                        },
                        other => {
                            return Err(VmError::at(
                                op,
                                format!("field access on {}", other.tag_name()),
                            ))
                        }
                    }
                }
                Op::MakeEnum => {
                    let variant = self.pop_string(op)?;
                    let enum_name = self.pop_string(op)?;
                    let type_id = self.pop_int(op)?;
                    self.stack.push(Value::enum_value(
                        type_id,
                        enum_name.as_ref(),
                        variant.as_ref(),
                        Vec::new(),
                    ));
                }
                Op::MakeEnumPayload => {
                    let count = index_operand(op, operand)?;
                    let variant = self.pop_string(op)?;
                    let enum_name = self.pop_string(op)?;
                    let type_id = self.pop_int(op)?;
                    if self.stack.len() < count {
                        return Err(VmError::at(op, "stack underflow"));
                    }
                    let payload = self.stack.split_off(self.stack.len() - count);
                    self.stack.push(Value::enum_value(
                        type_id,
                        enum_name.as_ref(),
                        variant.as_ref(),
                        payload,
                    ));
                }
                Op::MatchEnum => {
                    let variant = self.pop_string(op)?;
                    let _enum_name = self.pop_string(op)?;
                    let type_id = self.pop_int(op)?;
                    let subject = self.pop(op)?;
                    let matched = match subject {
                        Value::Enum(data) => {
                            data.type_id == type_id && data.variant_name == variant.as_ref()
                        }
                        _ => false,
                    };
                    self.stack.push(Value::Bool(matched));
                }
                Op::UnwrapEnum => {
                    let value = self.pop(op)?;
                    match value {
                        Value::Enum(data) => {
                            if data.payload.is_empty() {
                                self.stack.push(Value::None);
                            } else {
                                self.stack.extend(data.payload.iter().cloned());
                            }
                        }
                        other => {
                            return Err(VmError::at(
                                op,
                                format!("expected Enum, got {}", other.tag_name()),
                            ))
                        }
                    }
                }

                Op::MakeError => {
                    let payload = self.pop(op)?;
                    self.stack.push(Value::error(payload));
                }
                Op::IsError => {
                    let value = self.pop(op)?;
                    self.stack.push(Value::Bool(value.is_error()));
                }
                Op::IsNone => {
                    let value = self.pop(op)?;
                    self.stack.push(Value::Bool(value.is_none()));
                }
                Op::UnwrapError => {
                    let value = self.pop(op)?;
                    match value {
                        Value::Error(payload) => self.stack.push(payload.as_ref().clone()),
                        other => {
                            return Err(VmError::at(
                                op,
                                format!("expected Error, got {}", other.tag_name()),
                            ))
                        }
                    }
                }

                Op::ToString => {
                    let value = self.pop(op)?;
                    match value {
                        Value::String(_) => self.stack.push(value),
                        other => self
                            .stack
                            .push(Value::string(rill_core::inspect_inline(&other))),
                    }
                }
                Op::StrConcat => {
                    let b = self.pop_string(op)?;
                    let a = self.pop_string(op)?;
                    let mut combined = a.to_string();
                    combined.push_str(b.as_ref());
                    self.stack.push(Value::string(combined));
                }

                Op::CallBuiltin => {
                    let builtin = Builtin::from_operand(operand)
                        .ok_or_else(|| VmError::at(op, format!("bad builtin id {}", operand)))?;
                    self.call_builtin(op, builtin)?;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Call machinery

    fn call(&mut self, op: Op, operand: i32) -> Result<(), VmError> {
        let argc = index_operand(op, operand)?;
        let closure = self.pop_closure(op)?;
        let func = self
            .program
            .functions
            .get(closure.func_idx)
            .ok_or_else(|| VmError::at(op, format!("bad function index {}", closure.func_idx)))?;
        if func.arity != argc {
            return Err(VmError::at(
                op,
                format!("arity mismatch: expected {}, got {}", func.arity, argc),
            ));
        }
        if self.stack.len() < argc {
            return Err(VmError::at(op, "stack underflow"));
        }
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(VmError::at(op, "frame stack overflow"));
        }
        let base_slot = self.stack.len() - argc;
        for _ in func.arity..func.locals {
            self.stack.push(Value::None);
        }
        self.frames.push(CallFrame {
            func_idx: closure.func_idx,
            ip: 0,
            base_slot,
            closure: Some(closure),
        });
        Ok(())
    }

    /// Same arity contract as `call`, but the current frame is drained and
    /// rewritten: the frame stack does not grow.
    fn tail_call(&mut self, op: Op, operand: i32) -> Result<(), VmError> {
        let argc = index_operand(op, operand)?;
        let closure = self.pop_closure(op)?;
        let func = self
            .program
            .functions
            .get(closure.func_idx)
            .ok_or_else(|| VmError::at(op, format!("bad function index {}", closure.func_idx)))?;
        if func.arity != argc {
            return Err(VmError::at(
                op,
                format!("arity mismatch: expected {}, got {}", func.arity, argc),
            ));
        }
        if self.stack.len() < argc {
            return Err(VmError::at(op, "stack underflow"));
        }
        let args = self.stack.split_off(self.stack.len() - argc);
        let base_slot = match self.frames.last() {
            Some(frame) => frame.base_slot,
            None => return Err(VmError::at(op, "no frame to reuse")),
        };
        self.stack.truncate(base_slot);
        self.stack.extend(args);
        for _ in func.arity..func.locals {
            self.stack.push(Value::None);
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.func_idx = closure.func_idx;
            frame.ip = 0;
            frame.closure = Some(closure);
        }
        Ok(())
    }

    fn jump(&mut self, op: Op, target: i32, code_start: usize) -> Result<(), VmError> {
        let target = index_operand(op, target)?;
        let relative = target
            .checked_sub(code_start)
            .ok_or_else(|| VmError::at(op, format!("jump target {} before function start", target)))?;
        if let Some(frame) = self.frames.last_mut() {
            frame.ip = relative;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Arithmetic and comparison

    fn arith(&mut self, op: Op) -> Result<(), VmError> {
        let b = self.pop(op)?;
        let a = self.pop(op)?;
        let result = match (&a, &b) {
            (Value::Int(x), Value::Int(y)) => int_arith(op, *x, *y)?,
            (Value::Float(x), Value::Float(y)) => Value::Float(float_arith(op, *x, *y)),
            (Value::Int(x), Value::Float(y)) => Value::Float(float_arith(op, *x as f64, *y)),
            (Value::Float(x), Value::Int(y)) => Value::Float(float_arith(op, *x, *y as f64)),
            (Value::String(x), Value::String(y)) if op == Op::Add => {
                let mut combined = x.to_string();
                combined.push_str(y.as_ref());
                Value::string(combined)
            }
            _ => {
                return Err(VmError::at(
                    op,
                    format!("cannot apply to {} and {}", a.tag_name(), b.tag_name()),
                ))
            }
        };
        self.stack.push(result);
        Ok(())
    }

    fn compare(&mut self, op: Op) -> Result<(), VmError> {
        let b = self.pop(op)?;
        let a = self.pop(op)?;
        let ordering = match (&a, &b) {
            (Value::Int(x), Value::Int(y)) => x.partial_cmp(y),
            (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
            (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
            (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
            _ => {
                return Err(VmError::at(
                    op,
                    format!("cannot compare {} and {}", a.tag_name(), b.tag_name()),
                ))
            }
        };
        let result = match ordering {
            Some(ordering) => match op {
                Op::Lt => ordering.is_lt(),
                Op::Gt => ordering.is_gt(),
                Op::Lte => ordering.is_le(),
                Op::Gte => ordering.is_ge(),
                _ => false,
            },
            // NaN comparisons are false, matching IEEE semantics
            None => false,
        };
        self.stack.push(Value::Bool(result));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stack helpers

    pub(crate) fn pop(&mut self, op: Op) -> Result<Value, VmError> {
        self.stack
            .pop()
            .ok_or_else(|| VmError::at(op, "stack underflow"))
    }

    pub(crate) fn pop_int(&mut self, op: Op) -> Result<i64, VmError> {
        match self.pop(op)? {
            Value::Int(n) => Ok(n),
            other => Err(VmError::at(
                op,
                format!("expected Int, got {}", other.tag_name()),
            )),
        }
    }

    fn pop_bool(&mut self, op: Op) -> Result<bool, VmError> {
        match self.pop(op)? {
            Value::Bool(b) => Ok(b),
            other => Err(VmError::at(
                op,
                format!("expected Bool, got {}", other.tag_name()),
            )),
        }
    }

    pub(crate) fn pop_string(&mut self, op: Op) -> Result<Arc<str>, VmError> {
        match self.pop(op)? {
            Value::String(s) => Ok(s),
            other => Err(VmError::at(
                op,
                format!("expected String, got {}", other.tag_name()),
            )),
        }
    }

    fn pop_array(&mut self, op: Op) -> Result<Arc<Vec<Value>>, VmError> {
        match self.pop(op)? {
            Value::Array(items) => Ok(items),
            other => Err(VmError::at(
                op,
                format!("expected Array, got {}", other.tag_name()),
            )),
        }
    }

    fn pop_closure(&mut self, op: Op) -> Result<Arc<ClosureData>, VmError> {
        match self.pop(op)? {
            Value::Closure(data) => Ok(data),
            other => Err(VmError::at(
                op,
                format!("not a function: {}", other.tag_name()),
            )),
        }
    }

    /// Current frame-stack depth, exposed through `__stack_depth__`.
    pub(crate) fn frame_depth(&self) -> usize {
        self.frames.len()
    }
}

fn index_operand(op: Op, operand: i32) -> Result<usize, VmError> {
    usize::try_from(operand)
        .map_err(|_| VmError::at(op, format!("negative operand {}", operand)))
}

fn int_arith(op: Op, a: i64, b: i64) -> Result<Value, VmError> {
    let result = match op {
        Op::Add => a.wrapping_add(b),
        Op::Sub => a.wrapping_sub(b),
        Op::Mul => a.wrapping_mul(b),
        Op::Div => {
            if b == 0 {
                return Err(VmError::at(op, "division by zero"));
            }
            a.wrapping_div(b)
        }
        Op::Mod => {
            if b == 0 {
                return Err(VmError::at(op, "division by zero"));
            }
            a.wrapping_rem(b)
        }
        _ => return Err(VmError::at(op, "not an arithmetic opcode")),
    };
    Ok(Value::Int(result))
}

fn float_arith(op: Op, a: f64, b: f64) -> f64 {
    match op {
        Op::Add => a + b,
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div => a / b,
        Op::Mod => a % b,
        _ => f64::NAN,
    }
}
