//! Bytecode generation
//!
//! Walks a typed `BlockExpression` and emits a `rill_core::Program`. The
//! interesting machinery lives here in the shared state: local slot
//! allocation, capture resolution across enclosing function scopes,
//! self-reference for direct recursion, and the forward-jump patching that
//! every control-flow lowering leans on.
//!
//! # Emit discipline
//!
//! Jumps are emitted with a placeholder operand, the instruction index is
//! remembered, the target is compiled, and the placeholder is overwritten
//! with the then-current code length. Nothing is ever moved or deleted:
//! the code vector only grows, so recorded indices stay valid.
//!
//! # Functions
//!
//! A function body sits inline in the shared code vector behind a skip
//! jump. Compiling one resets the per-function state (locals, captures),
//! pushes a snapshot of the enclosing scope for capture resolution, and on
//! the way out materialises each captured value in the enclosing scope
//! before `make_closure` packs them up.

mod expressions;
mod patterns;

use crate::ast::{BlockExpression, BlockItem, Expression, Param, Statement};
use crate::env::TypeEnv;
use rill_core::program::{Function, Instruction, Op, Program};
use rill_core::{Flags, Value};
use std::collections::HashMap;
use tracing::debug;

/// Error raised by a lowering rule. Compilation stops at the first one.
#[derive(Debug)]
pub struct CompileError {
    pub message: String,
    /// Span of the offending node
    pub span: crate::ast::Span,
}

impl CompileError {
    pub fn new(message: impl Into<String>, span: crate::ast::Span) -> CompileError {
        CompileError {
            message: message.into(),
            span,
        }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "compile error at {}: {}", self.span, self.message)
    }
}

impl std::error::Error for CompileError {}

/// Whether an expression's value becomes the enclosing function's value
/// with no further work. Calls compiled in tail position reuse the current
/// frame instead of pushing a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailPosition {
    Tail,
    NonTail,
}

/// Where an identifier resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VarRef {
    /// Slot in the current function's frame
    Local(usize),
    /// Index into the executing closure's capture vector
    Capture(usize),
    /// The function currently being compiled; lowers to `push_self`
    SelfRef,
}

/// Compile a typed program block against a frozen environment.
pub fn compile(
    program: &BlockExpression,
    env: &TypeEnv,
    flags: &Flags,
) -> Result<Program, CompileError> {
    Compiler::new(env, flags).compile_entry(program)
}

pub(crate) struct Compiler<'a> {
    pub(crate) env: &'a TypeEnv,
    pub(crate) flags: &'a Flags,

    pub(crate) code: Vec<Instruction>,
    pub(crate) constants: Vec<Value>,
    pub(crate) functions: Vec<Function>,

    /// Name → slot for the function being compiled
    pub(crate) locals: HashMap<String, usize>,
    pub(crate) local_count: usize,
    /// Snapshots of enclosing functions' locals, innermost last
    pub(crate) outer_scopes: Vec<HashMap<String, usize>>,
    /// Name → capture index for the function being compiled
    pub(crate) captures: HashMap<String, usize>,
    /// Capture names in creation order; index here is the runtime index
    pub(crate) capture_names: Vec<String>,
    /// Binding name of the function being compiled, for self-recursion
    pub(crate) current_binding: Option<String>,
}

impl<'a> Compiler<'a> {
    fn new(env: &'a TypeEnv, flags: &'a Flags) -> Compiler<'a> {
        Compiler {
            env,
            flags,
            code: Vec::new(),
            constants: Vec::new(),
            functions: Vec::new(),
            locals: HashMap::new(),
            local_count: 0,
            outer_scopes: Vec::new(),
            captures: HashMap::new(),
            capture_names: Vec::new(),
            current_binding: None,
        }
    }

    fn compile_entry(mut self, program: &BlockExpression) -> Result<Program, CompileError> {
        self.compile_block(program, TailPosition::Tail)?;
        self.emit(Op::Ret, 0);

        let entry = self.functions.len();
        self.functions.push(Function {
            name: "<main>".to_string(),
            arity: 0,
            locals: self.local_count,
            capture_count: 0,
            code_start: 0,
            code_len: self.code.len(),
        });

        debug!(
            functions = self.functions.len(),
            instructions = self.code.len(),
            constants = self.constants.len(),
            "compiled program"
        );

        Ok(Program {
            constants: self.constants,
            functions: self.functions,
            code: self.code,
            entry,
        })
    }

    // ------------------------------------------------------------------
    // Emission

    pub(crate) fn emit(&mut self, op: Op, operand: i32) -> usize {
        let idx = self.code.len();
        self.code.push(Instruction::new(op, operand));
        idx
    }

    /// Emit a jump with a placeholder target; returns its index for
    /// `patch_jump`.
    pub(crate) fn emit_jump(&mut self, op: Op) -> usize {
        self.emit(op, -1)
    }

    /// Point a previously emitted jump at the current end of code.
    pub(crate) fn patch_jump(&mut self, jump_idx: usize) {
        let target = self.code.len() as i32;
        if let Some(instr) = self.code.get_mut(jump_idx) {
            instr.operand = target;
        }
    }

    pub(crate) fn add_constant(&mut self, value: Value) -> i32 {
        let idx = self.constants.len();
        self.constants.push(value);
        idx as i32
    }

    pub(crate) fn emit_const(&mut self, value: Value) {
        let idx = self.add_constant(value);
        self.emit(Op::PushConst, idx);
    }

    // ------------------------------------------------------------------
    // Scoping

    /// Slot for a name, allocating the next one if unseen. Shadowing simply
    /// reassigns: subsequent code sees the new slot.
    pub(crate) fn get_or_create_local(&mut self, name: &str) -> usize {
        if let Some(&slot) = self.locals.get(name) {
            return slot;
        }
        let slot = self.local_count;
        self.local_count += 1;
        self.locals.insert(name.to_string(), slot);
        slot
    }

    /// Fresh slot, shadowing any existing binding of the name. Used for
    /// pattern variables and or-receivers, whose bindings must not clobber
    /// an enclosing slot of the same name.
    pub(crate) fn create_local(&mut self, name: &str) -> usize {
        let slot = self.local_count;
        self.local_count += 1;
        self.locals.insert(name.to_string(), slot);
        slot
    }

    /// Resolve an identifier: current locals, then current captures, then
    /// each enclosing function's snapshot. A hit in an enclosing scope
    /// either marks self-reference (when the name is the binding being
    /// compiled) or creates a new capture entry in the current function.
    pub(crate) fn resolve_variable(&mut self, name: &str) -> Option<VarRef> {
        if let Some(&slot) = self.locals.get(name) {
            return Some(VarRef::Local(slot));
        }
        if let Some(&idx) = self.captures.get(name) {
            return Some(VarRef::Capture(idx));
        }
        for scope in self.outer_scopes.iter().rev() {
            if scope.contains_key(name) {
                if self.current_binding.as_deref() == Some(name) {
                    return Some(VarRef::SelfRef);
                }
                let idx = self.capture_names.len();
                self.captures.insert(name.to_string(), idx);
                self.capture_names.push(name.to_string());
                return Some(VarRef::Capture(idx));
            }
        }
        None
    }

    /// Push an already-resolved variable reference.
    pub(crate) fn emit_var(&mut self, var: VarRef) {
        match var {
            VarRef::Local(slot) => self.emit(Op::PushLocal, slot as i32),
            VarRef::Capture(idx) => self.emit(Op::PushCapture, idx as i32),
            VarRef::SelfRef => self.emit(Op::PushSelf, 0),
        };
    }

    // ------------------------------------------------------------------
    // Blocks and statements

    /// Lower a block: every item in order, intermediate expression values
    /// popped, the last expression kept. Empty blocks and blocks ending in
    /// a statement produce none.
    pub(crate) fn compile_block(
        &mut self,
        block: &BlockExpression,
        position: TailPosition,
    ) -> Result<(), CompileError> {
        let last = block.items.len().checked_sub(1);
        let mut ends_in_expression = false;

        for (i, item) in block.items.iter().enumerate() {
            let is_last = Some(i) == last;
            match item {
                BlockItem::Statement(stmt) => {
                    self.compile_statement(stmt)?;
                    ends_in_expression = false;
                }
                BlockItem::Expression(expr) => {
                    let item_position = if is_last { position } else { TailPosition::NonTail };
                    self.compile_expr(expr, item_position)?;
                    if !is_last {
                        self.emit(Op::Pop, 0);
                    }
                    ends_in_expression = true;
                }
            }
        }

        if !ends_in_expression {
            self.emit(Op::PushNone, 0);
        }
        Ok(())
    }

    /// Statements leave the operand stack untouched.
    pub(crate) fn compile_statement(&mut self, stmt: &Statement) -> Result<(), CompileError> {
        match stmt {
            Statement::VariableBinding { name, value, span: _ }
            | Statement::ConstBinding { name, value, span: _ } => {
                self.compile_binding(name, value)
            }
            Statement::TypePatternBinding {
                pattern,
                value,
                span: _,
            } => {
                self.compile_expr(value, TailPosition::NonTail)?;
                self.bind_irrefutable(pattern)
            }
            Statement::FunctionDeclaration {
                name, params, body, ..
            } => {
                self.compile_function_common(Some(name), params, body)?;
                let slot = self.get_or_create_local(name);
                self.emit(Op::StoreLocal, slot as i32);
                Ok(())
            }
            // Types were registered by the checker; nothing to execute.
            Statement::StructDeclaration { .. } | Statement::EnumDeclaration { .. } => Ok(()),
            // Module resolution happened upstream.
            Statement::ImportDeclaration { .. } => Ok(()),
            Statement::ExportDeclaration { inner, .. } => self.compile_statement(inner),
        }
    }

    fn compile_binding(&mut self, name: &str, value: &Expression) -> Result<(), CompileError> {
        // Function values get the binding name so their bodies can resolve
        // direct recursion through push_self.
        if let Expression::Function {
            params,
            body,
            name: fn_name,
            ..
        } = value
        {
            let binding = fn_name.as_deref().unwrap_or(name);
            self.compile_function_common(Some(binding), params, body)?;
        } else {
            self.compile_expr(value, TailPosition::NonTail)?;
        }
        // Rebinding reuses the slot; closures captured the old value by
        // copy, so only subsequent reads observe the new one.
        let slot = self.get_or_create_local(name);
        self.emit(Op::StoreLocal, slot as i32);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Function compilation

    /// Compile a function body inline behind a skip jump and leave a
    /// closure value on the stack.
    pub(crate) fn compile_function_common(
        &mut self,
        name: Option<&str>,
        params: &[Param],
        body: &BlockExpression,
    ) -> Result<(), CompileError> {
        debug!(name = name.unwrap_or("<anon>"), arity = params.len(), "compiling function");

        // 1. Snapshot the enclosing scope. A named function adds a phantom
        //    slot for itself so recursive references resolve.
        let mut snapshot = self.locals.clone();
        if let Some(name) = name {
            snapshot.insert(name.to_string(), self.local_count);
        }
        self.outer_scopes.push(snapshot);

        let saved_locals = std::mem::take(&mut self.locals);
        let saved_local_count = std::mem::replace(&mut self.local_count, 0);
        let saved_captures = std::mem::take(&mut self.captures);
        let saved_capture_names = std::mem::take(&mut self.capture_names);
        let saved_binding = std::mem::replace(
            &mut self.current_binding,
            name.map(|n| n.to_string()),
        );

        // 2. Skip jump: the body sits inline; normal flow jumps over it.
        let skip = self.emit_jump(Op::Jump);

        // 3. Parameters take the first slots in declaration order.
        for param in params {
            self.create_local(&param.name);
        }

        // 4. Body, in tail position, then ret.
        let code_start = self.code.len();
        self.compile_block(body, TailPosition::Tail)?;
        self.emit(Op::Ret, 0);
        let code_len = self.code.len() - code_start;

        // 5. Patch the skip jump and record the function.
        self.patch_jump(skip);
        let func_idx = self.functions.len();
        self.functions.push(Function {
            name: name.unwrap_or_default().to_string(),
            arity: params.len(),
            locals: self.local_count,
            capture_count: self.capture_names.len(),
            code_start,
            code_len,
        });

        // 6. Restore the enclosing scope, then materialise each captured
        //    value there and pack the closure.
        let captured = std::mem::replace(&mut self.capture_names, saved_capture_names);
        self.locals = saved_locals;
        self.local_count = saved_local_count;
        self.captures = saved_captures;
        self.current_binding = saved_binding;
        self.outer_scopes.pop();

        for capture in &captured {
            // The name resolved while compiling the body, so it must
            // resolve here too (possibly creating a transitive capture).
            match self.resolve_variable(capture) {
                Some(var) => self.emit_var(var),
                None => {
                    return Err(CompileError::new(
                        format!("captured variable '{}' vanished from enclosing scope", capture),
                        body.span,
                    ))
                }
            }
        }
        self.emit(Op::MakeClosure, func_idx as i32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FallbackKind, MatchArm, Span};
    use crate::types::{DefLocation, Type, TypeVariant};

    fn sp() -> Span {
        Span::default()
    }

    fn num(n: i64) -> Expression {
        Expression::Number {
            text: n.to_string(),
            span: sp(),
        }
    }

    fn ident(name: &str) -> Expression {
        Expression::Identifier {
            name: name.to_string(),
            span: sp(),
        }
    }

    fn call(name: &str, args: Vec<Expression>) -> Expression {
        Expression::Call {
            callee: Box::new(ident(name)),
            args,
            span: sp(),
        }
    }

    fn bin(op: crate::ast::BinaryOp, left: Expression, right: Expression) -> Expression {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span: sp(),
        }
    }

    fn let_(name: &str, value: Expression) -> BlockItem {
        BlockItem::Statement(Statement::VariableBinding {
            name: name.to_string(),
            value,
            span: sp(),
        })
    }

    fn expr(e: Expression) -> BlockItem {
        BlockItem::Expression(e)
    }

    fn body(items: Vec<BlockItem>) -> BlockExpression {
        BlockExpression::new(items, sp())
    }

    fn fndecl(name: &str, params: &[&str], fn_body: Vec<BlockItem>) -> BlockItem {
        BlockItem::Statement(Statement::FunctionDeclaration {
            name: name.to_string(),
            params: params.iter().map(|p| Param::new(*p, sp())).collect(),
            body: body(fn_body),
            span: sp(),
        })
    }

    fn if_(c: Expression, t: Expression, e: Expression) -> Expression {
        Expression::If {
            condition: Box::new(c),
            then_branch: Box::new(t),
            else_branch: Some(Box::new(e)),
            span: sp(),
        }
    }

    fn compile_ok(program: &BlockExpression) -> Program {
        let env = TypeEnv::new();
        compile(program, &env, &Flags::new()).expect("program should compile")
    }

    fn ops_of(program: &Program, func_name: &str) -> Vec<Op> {
        let func = program
            .functions
            .iter()
            .find(|f| f.name == func_name)
            .expect("function not found");
        program.code[func.code_start..func.code_start + func.code_len]
            .iter()
            .map(|i| i.op)
            .collect()
    }

    use crate::env::TypeEnv;
    use rill_core::Flags;

    #[test]
    fn test_block_pops_intermediate_values() {
        let program = compile_ok(&body(vec![expr(num(1)), expr(num(2))]));
        let ops = ops_of(&program, "<main>");
        // 1 pushed, popped, 2 pushed and kept, ret
        assert_eq!(
            ops,
            vec![Op::PushConst, Op::Pop, Op::PushConst, Op::Ret]
        );
    }

    #[test]
    fn test_block_ending_in_statement_pushes_none() {
        let program = compile_ok(&body(vec![let_("x", num(1))]));
        let ops = ops_of(&program, "<main>");
        assert_eq!(
            ops,
            vec![Op::PushConst, Op::StoreLocal, Op::PushNone, Op::Ret]
        );
    }

    #[test]
    fn test_empty_block_pushes_none() {
        let program = compile_ok(&body(vec![]));
        assert_eq!(ops_of(&program, "<main>"), vec![Op::PushNone, Op::Ret]);
    }

    #[test]
    fn test_tail_call_in_both_if_arms() {
        // fn loop(n, acc) { if n == 0 { acc } else { loop(n - 1, acc + 1) } }
        let recurse = call(
            "loop",
            vec![
                bin(crate::ast::BinaryOp::Sub, ident("n"), num(1)),
                bin(crate::ast::BinaryOp::Add, ident("acc"), num(1)),
            ],
        );
        let program = compile_ok(&body(vec![
            fndecl(
                "loop",
                &["n", "acc"],
                vec![expr(if_(
                    bin(crate::ast::BinaryOp::Eq, ident("n"), num(0)),
                    ident("acc"),
                    recurse,
                ))],
            ),
            expr(call("loop", vec![num(3), num(0)])),
        ]));

        let loop_ops = ops_of(&program, "loop");
        assert!(loop_ops.contains(&Op::TailCall), "recursive call must be a tail call");
        assert!(loop_ops.contains(&Op::PushSelf), "self-recursion uses push_self");

        // The outer call is in tail position of the entry block too.
        let main_ops = ops_of(&program, "<main>");
        assert!(main_ops.contains(&Op::TailCall));
    }

    #[test]
    fn test_argument_call_is_not_tail() {
        // fn f(n) { f(n) + 1 } -- the inner call feeds an add, not a return
        let program = compile_ok(&body(vec![
            fndecl(
                "f",
                &["n"],
                vec![expr(bin(
                    crate::ast::BinaryOp::Add,
                    call("f", vec![ident("n")]),
                    num(1),
                ))],
            ),
            expr(num(0)),
        ]));
        let ops = ops_of(&program, "f");
        assert!(ops.contains(&Op::Call));
        assert!(!ops.contains(&Op::TailCall));
    }

    #[test]
    fn test_closure_captures_enclosing_local() {
        // x = 10; fn add(n) { n + x }
        let program = compile_ok(&body(vec![
            let_("x", num(10)),
            fndecl(
                "add",
                &["n"],
                vec![expr(bin(crate::ast::BinaryOp::Add, ident("n"), ident("x")))],
            ),
            expr(call("add", vec![num(1)])),
        ]));

        let add = program
            .functions
            .iter()
            .find(|f| f.name == "add")
            .expect("add");
        assert_eq!(add.capture_count, 1);
        assert!(ops_of(&program, "add").contains(&Op::PushCapture));
        // The enclosing scope materialises the capture before make_closure.
        let main_ops = ops_of(&program, "<main>");
        assert!(main_ops.contains(&Op::MakeClosure));
    }

    #[test]
    fn test_unknown_identifier_is_a_compile_error() {
        let env = TypeEnv::new();
        let err = compile(&body(vec![expr(ident("nope"))]), &env, &Flags::new())
            .expect_err("should fail");
        assert!(err.message.contains("unknown identifier"));
    }

    #[test]
    fn test_struct_init_validation() {
        let mut env = TypeEnv::new();
        env.register_struct(
            "Point",
            vec![("x".to_string(), Type::Int), ("y".to_string(), Type::Int)],
            DefLocation::default(),
        );

        let init = |fields: Vec<(&str, Expression)>| {
            body(vec![expr(Expression::StructInit {
                name: "Point".to_string(),
                fields: fields
                    .into_iter()
                    .map(|(n, e)| (n.to_string(), e))
                    .collect(),
                span: sp(),
            })])
        };

        // Missing y
        let err = compile(&init(vec![("x", num(1))]), &env, &Flags::new()).expect_err("missing");
        assert!(err.message.contains("missing field 'y'"));

        // Duplicate x
        let err = compile(
            &init(vec![("x", num(1)), ("x", num(2))]),
            &env,
            &Flags::new(),
        )
        .expect_err("duplicate");
        assert!(err.message.contains("duplicate field 'x'"));

        // Unknown z
        let err = compile(
            &init(vec![("x", num(1)), ("y", num(2)), ("z", num(3))]),
            &env,
            &Flags::new(),
        )
        .expect_err("unknown");
        assert!(err.message.contains("no field 'z'"));

        // Complete literal compiles to make_struct
        let program = compile(
            &init(vec![("x", num(1)), ("y", num(2))]),
            &env,
            &Flags::new(),
        )
        .expect("ok");
        assert!(ops_of(&program, "<main>").contains(&Op::MakeStruct));
    }

    #[test]
    fn test_enum_payload_arity_checked() {
        let mut env = TypeEnv::new();
        env.register_enum(
            "R",
            vec![TypeVariant {
                name: "Ok".to_string(),
                payload: vec![Type::Int],
            }],
            DefLocation::default(),
        );
        let err = compile(
            &body(vec![expr(call("Ok", vec![num(1), num(2)]))]),
            &env,
            &Flags::new(),
        )
        .expect_err("arity");
        assert!(err.message.contains("expects 1 payload value(s), got 2"));
    }

    #[test]
    fn test_or_lowering_shapes() {
        let option_or = Expression::Or {
            value: Box::new(Expression::None { span: sp() }),
            receiver: None,
            fallback: body(vec![expr(num(42))]),
            kind: FallbackKind::Option,
            span: sp(),
        };
        let program = compile_ok(&body(vec![expr(option_or)]));
        let ops = ops_of(&program, "<main>");
        assert!(ops.contains(&Op::IsNone));
        assert!(!ops.contains(&Op::IsError));

        let result_or = Expression::Or {
            value: Box::new(Expression::ErrorValue {
                payload: Box::new(num(1)),
                span: sp(),
            }),
            receiver: Some("e".to_string()),
            fallback: body(vec![expr(num(0))]),
            kind: FallbackKind::Result,
            span: sp(),
        };
        let program = compile_ok(&body(vec![expr(result_or)]));
        let ops = ops_of(&program, "<main>");
        assert!(ops.contains(&Op::IsError));
        assert!(ops.contains(&Op::UnwrapError));
    }

    #[test]
    fn test_match_enum_pattern_shape() {
        let mut env = TypeEnv::new();
        env.register_enum(
            "R",
            vec![
                TypeVariant {
                    name: "Ok".to_string(),
                    payload: vec![Type::Int],
                },
                TypeVariant {
                    name: "Err".to_string(),
                    payload: vec![Type::String],
                },
            ],
            DefLocation::default(),
        );

        let arm_ok = MatchArm {
            pattern: call("Ok", vec![ident("n")]),
            body: ident("n"),
            span: sp(),
        };
        let arm_other = MatchArm {
            pattern: Expression::Wildcard { span: sp() },
            body: num(0),
            span: sp(),
        };
        let program = compile(
            &body(vec![expr(Expression::Match {
                subject: Box::new(call("Ok", vec![num(7)])),
                arms: vec![arm_ok, arm_other],
                span: sp(),
            })]),
            &env,
            &Flags::new(),
        )
        .expect("match compiles");
        let ops = ops_of(&program, "<main>");
        assert!(ops.contains(&Op::MatchEnum));
        assert!(ops.contains(&Op::UnwrapEnum));
        // Fallthrough after all arms
        assert!(ops.contains(&Op::PushNone));
    }

    #[test]
    fn test_builtin_arity_error() {
        let env = TypeEnv::new();
        let err = compile(
            &body(vec![expr(call("println", vec![num(1), num(2)]))]),
            &env,
            &Flags::new(),
        )
        .expect_err("arity");
        assert!(err.message.contains("takes 1 argument(s)"));
    }

    #[test]
    fn test_debug_builtin_hidden_without_flag() {
        let env = TypeEnv::new();
        let program = body(vec![expr(call("__stack_depth__", vec![]))]);
        assert!(compile(&program, &env, &Flags::new()).is_err());
        assert!(compile(&program, &env, &Flags::new().with_debug_builtins()).is_ok());
    }

    #[test]
    fn test_interpolation_folds_with_concat() {
        let program = compile_ok(&body(vec![expr(Expression::InterpolatedString {
            parts: vec![
                Expression::String {
                    value: "n = ".to_string(),
                    span: sp(),
                },
                num(3),
            ],
            span: sp(),
        })]));
        let ops = ops_of(&program, "<main>");
        assert!(ops.contains(&Op::ToString));
        assert!(ops.contains(&Op::StrConcat));
    }

    #[test]
    fn test_array_spread_concatenates() {
        let program = compile_ok(&body(vec![
            let_("a", Expression::Array {
                elements: vec![num(1), num(2)],
                span: sp(),
            }),
            expr(Expression::Array {
                elements: vec![
                    num(0),
                    Expression::Spread {
                        value: Box::new(ident("a")),
                        span: sp(),
                    },
                    num(3),
                ],
                span: sp(),
            }),
        ]));
        let ops = ops_of(&program, "<main>");
        let concats = ops.iter().filter(|o| **o == Op::ArrayConcat).count();
        assert_eq!(concats, 2);
    }

    #[test]
    fn test_export_compiles_inner_statement() {
        let program = compile_ok(&body(vec![
            BlockItem::Statement(Statement::ExportDeclaration {
                inner: Box::new(Statement::VariableBinding {
                    name: "x".to_string(),
                    value: num(5),
                    span: sp(),
                }),
                span: sp(),
            }),
            expr(ident("x")),
        ]));
        let ops = ops_of(&program, "<main>");
        assert!(ops.contains(&Op::StoreLocal));
        assert!(ops.contains(&Op::PushLocal));
    }
}
