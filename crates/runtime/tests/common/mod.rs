//! Shared builders for end-to-end tests
//!
//! The parser and type checker live upstream, so tests construct the typed
//! AST directly. These helpers keep the programs readable.

// Not every test binary uses every builder.
#![allow(dead_code)]

use rill_compiler::ast::{
    BinaryOp, BlockExpression, BlockItem, Expression, FallbackKind, MatchArm, Param, Span,
    Statement,
};
use rill_compiler::{compile, TypeEnv};
use rill_core::{Flags, Value};
use rill_runtime::{CaptureBuffer, Vm, VmError};

pub fn sp() -> Span {
    Span::default()
}

pub fn num(n: i64) -> Expression {
    Expression::Number {
        text: n.to_string(),
        span: sp(),
    }
}

pub fn string(s: &str) -> Expression {
    Expression::String {
        value: s.to_string(),
        span: sp(),
    }
}

pub fn none() -> Expression {
    Expression::None { span: sp() }
}

pub fn ident(name: &str) -> Expression {
    Expression::Identifier {
        name: name.to_string(),
        span: sp(),
    }
}

pub fn type_ident(name: &str) -> Expression {
    Expression::TypeIdentifier {
        name: name.to_string(),
        span: sp(),
    }
}

pub fn bin(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
        span: sp(),
    }
}

pub fn add(l: Expression, r: Expression) -> Expression {
    bin(BinaryOp::Add, l, r)
}

pub fn sub(l: Expression, r: Expression) -> Expression {
    bin(BinaryOp::Sub, l, r)
}

pub fn eq(l: Expression, r: Expression) -> Expression {
    bin(BinaryOp::Eq, l, r)
}

pub fn gt(l: Expression, r: Expression) -> Expression {
    bin(BinaryOp::Gt, l, r)
}

pub fn call(name: &str, args: Vec<Expression>) -> Expression {
    Expression::Call {
        callee: Box::new(ident(name)),
        args,
        span: sp(),
    }
}

/// `Enum.Variant(args)`
pub fn variant_call(enum_name: &str, variant: &str, args: Vec<Expression>) -> Expression {
    Expression::Call {
        callee: Box::new(Expression::PropertyAccess {
            object: Box::new(type_ident(enum_name)),
            property: variant.to_string(),
            span: sp(),
        }),
        args,
        span: sp(),
    }
}

pub fn array(elements: Vec<Expression>) -> Expression {
    Expression::Array {
        elements,
        span: sp(),
    }
}

pub fn spread(inner: Expression) -> Expression {
    Expression::Spread {
        value: Box::new(inner),
        span: sp(),
    }
}

pub fn wildcard() -> Expression {
    Expression::Wildcard { span: sp() }
}

pub fn if_else(cond: Expression, then: Expression, els: Expression) -> Expression {
    Expression::If {
        condition: Box::new(cond),
        then_branch: Box::new(then),
        else_branch: Some(Box::new(els)),
        span: sp(),
    }
}

pub fn match_expr(subject: Expression, arms: Vec<(Expression, Expression)>) -> Expression {
    Expression::Match {
        subject: Box::new(subject),
        arms: arms
            .into_iter()
            .map(|(pattern, body)| MatchArm {
                pattern,
                body,
                span: sp(),
            })
            .collect(),
        span: sp(),
    }
}

pub fn or_fallback(value: Expression, kind: FallbackKind, fallback: Vec<BlockItem>) -> Expression {
    Expression::Or {
        value: Box::new(value),
        receiver: None,
        fallback: block(fallback),
        kind,
        span: sp(),
    }
}

pub fn or_receiver(
    value: Expression,
    receiver: &str,
    fallback: Vec<BlockItem>,
) -> Expression {
    Expression::Or {
        value: Box::new(value),
        receiver: Some(receiver.to_string()),
        fallback: block(fallback),
        kind: FallbackKind::Result,
        span: sp(),
    }
}

pub fn propagate(value: Expression) -> Expression {
    Expression::PropagateNone {
        value: Box::new(value),
        span: sp(),
    }
}

pub fn closure(params: &[&str], body_items: Vec<BlockItem>) -> Expression {
    Expression::Function {
        name: None,
        params: params.iter().map(|p| Param::new(*p, sp())).collect(),
        body: block(body_items),
        span: sp(),
    }
}

pub fn let_(name: &str, value: Expression) -> BlockItem {
    BlockItem::Statement(Statement::VariableBinding {
        name: name.to_string(),
        value,
        span: sp(),
    })
}

pub fn fndecl(name: &str, params: &[&str], body_items: Vec<BlockItem>) -> BlockItem {
    BlockItem::Statement(Statement::FunctionDeclaration {
        name: name.to_string(),
        params: params.iter().map(|p| Param::new(*p, sp())).collect(),
        body: block(body_items),
        span: sp(),
    })
}

pub fn expr(e: Expression) -> BlockItem {
    BlockItem::Expression(e)
}

pub fn block(items: Vec<BlockItem>) -> BlockExpression {
    BlockExpression::new(items, sp())
}

/// `println(expr)` as a block item.
pub fn println_of(e: Expression) -> BlockItem {
    expr(call("println", vec![e]))
}

/// Compile and run, returning the program's final value.
pub fn run_value(program: &BlockExpression, env: &TypeEnv, flags: Flags) -> Value {
    let compiled = compile(program, env, &flags).expect("program should compile");
    let mut vm = Vm::new(&compiled, flags);
    vm.run().expect("program should run")
}

/// Compile and run, returning whatever the VM raised.
pub fn run_err(program: &BlockExpression, env: &TypeEnv, flags: Flags) -> VmError {
    let compiled = compile(program, env, &flags).expect("program should compile");
    let mut vm = Vm::new(&compiled, flags);
    vm.run().expect_err("program should fail")
}

/// Compile and run, capturing everything `println` wrote.
pub fn run_stdout(program: &BlockExpression, env: &TypeEnv, flags: Flags) -> String {
    let compiled = compile(program, env, &flags).expect("program should compile");
    let buffer = CaptureBuffer::new();
    let mut vm = Vm::with_output(&compiled, flags, Box::new(buffer.clone()));
    vm.run().expect("program should run");
    buffer.contents()
}
