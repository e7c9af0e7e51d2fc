//! Typed Abstract Syntax Tree for Rill
//!
//! This is the tree the type checker hands the compiler: every node carries
//! a `Span` for error reporting, and the handful of nodes whose lowering
//! depends on inference results (`Or`) carry those results inline.
//!
//! The tree is built once and read-only afterwards. Recursive variants hold
//! their children behind `Box` so the sums stay sized; `BlockItem` bridges
//! the statement and expression sums with a plain two-variant tagged union.
//!
//! Patterns are ordinary expressions: a match arm's pattern slot holds a
//! literal, an identifier, an enum-construction shape, an array shape with
//! an optional `..rest` spread, a `Wildcard`, or an `OrPattern`.

use std::fmt;

/// Source region of a node, used only for error messages.
///
/// Lines and columns are 0-indexed internally; `Display` renders them
/// 1-based the way editors count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Span {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Span {
        Span {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Single-point span, handy in tests and synthesized nodes.
    pub fn at(line: u32, column: u32) -> Span {
        Span::new(line, column, line, column)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line + 1, self.start_column + 1)
    }
}

/// Binary operators after type checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    /// Short-circuit; lowered to jumps, not an opcode
    And,
    /// Short-circuit; lowered to jumps, not an opcode
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

/// Which control-flow layer an `or` fallback recovers, as resolved by the
/// type checker: `None` of an Option or the error of a Result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    Option,
    Result,
}

/// A function parameter. Types live in the `TypeEnv`; the compiler only
/// needs the name for slot allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub span: Span,
}

impl Param {
    pub fn new(name: impl Into<String>, span: Span) -> Param {
        Param {
            name: name.into(),
            span,
        }
    }
}

/// One arm of a match expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: Expression,
    pub body: Expression,
    pub span: Span,
}

/// An ordered item of a block: statement or expression. Order defines
/// evaluation order and must be preserved by the compiler.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockItem {
    Statement(Statement),
    Expression(Expression),
}

/// A `{ ... }` block. The block's value is its last expression, or none
/// when it is empty or ends in a statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockExpression {
    pub items: Vec<BlockItem>,
    pub span: Span,
}

impl BlockExpression {
    pub fn new(items: Vec<BlockItem>, span: Span) -> BlockExpression {
        BlockExpression { items, span }
    }
}

/// Statements. `Export` is recursive and boxes its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    VariableBinding {
        name: String,
        value: Expression,
        span: Span,
    },
    ConstBinding {
        name: String,
        value: Expression,
        span: Span,
    },
    /// Destructuring binding against a pattern the checker has already
    /// proven to match (e.g. unpacking a known enum variant).
    TypePatternBinding {
        pattern: Expression,
        value: Expression,
        span: Span,
    },
    FunctionDeclaration {
        name: String,
        params: Vec<Param>,
        body: BlockExpression,
        span: Span,
    },
    /// Type registration happened in the `TypeEnv`; the statement remains
    /// for spans only.
    StructDeclaration { name: String, span: Span },
    EnumDeclaration { name: String, span: Span },
    /// Module resolution happens upstream of the core.
    ImportDeclaration { module: String, span: Span },
    ExportDeclaration { inner: Box<Statement>, span: Span },
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::VariableBinding { span, .. }
            | Statement::ConstBinding { span, .. }
            | Statement::TypePatternBinding { span, .. }
            | Statement::FunctionDeclaration { span, .. }
            | Statement::StructDeclaration { span, .. }
            | Statement::EnumDeclaration { span, .. }
            | Statement::ImportDeclaration { span, .. }
            | Statement::ExportDeclaration { span, .. } => *span,
        }
    }
}

/// Expressions. Children are boxed; `Block` reuses `BlockExpression`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Numeric literal carrying its raw text; a decimal point selects a
    /// Float constant, otherwise Int.
    Number { text: String, span: Span },
    String { value: String, span: Span },
    /// `"a ${x} b"`: literal and expression parts in order.
    InterpolatedString { parts: Vec<Expression>, span: Span },
    Boolean { value: bool, span: Span },
    None { span: Span },
    Identifier { name: String, span: Span },
    /// An identifier the checker resolved to a type name (`Point`, `Shape`).
    TypeIdentifier { name: String, span: Span },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
        span: Span,
    },
    If {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Option<Box<Expression>>,
        span: Span,
    },
    Match {
        subject: Box<Expression>,
        arms: Vec<MatchArm>,
        span: Span,
    },
    Block(BlockExpression),
    /// Anonymous function; the binding name, when the checker knows it,
    /// enables direct self-recursion.
    Function {
        name: Option<String>,
        params: Vec<Param>,
        body: BlockExpression,
        span: Span,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
        span: Span,
    },
    Array { elements: Vec<Expression>, span: Span },
    ArrayIndex {
        array: Box<Expression>,
        index: Box<Expression>,
        span: Span,
    },
    Range {
        start: Box<Expression>,
        end: Box<Expression>,
        span: Span,
    },
    PropertyAccess {
        object: Box<Expression>,
        property: String,
        span: Span,
    },
    StructInit {
        name: String,
        fields: Vec<(String, Expression)>,
        span: Span,
    },
    Assert {
        condition: Box<Expression>,
        message: Box<Expression>,
        span: Span,
    },
    /// `error <expr>`: wrap a payload into a first-class error value.
    ErrorValue { payload: Box<Expression>, span: Span },
    /// `expr or { fallback }`, with the checker's resolved kind and the
    /// optional receiver bound to a Result's error payload.
    Or {
        value: Box<Expression>,
        receiver: Option<String>,
        fallback: BlockExpression,
        kind: FallbackKind,
        span: Span,
    },
    /// `expr?`: return none from the enclosing function when expr is none.
    PropagateNone { value: Box<Expression>, span: Span },
    /// `..expr` inside an array literal or array pattern.
    Spread { value: Box<Expression>, span: Span },
    /// `_` in a pattern position.
    Wildcard { span: Span },
    /// `p1 | p2 | ...` in a pattern position.
    OrPattern { alternatives: Vec<Expression>, span: Span },
    /// Parser error-recovery placeholder; reaching it is a compile error.
    ErrorNode { span: Span },
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Number { span, .. }
            | Expression::String { span, .. }
            | Expression::InterpolatedString { span, .. }
            | Expression::Boolean { span, .. }
            | Expression::None { span }
            | Expression::Identifier { span, .. }
            | Expression::TypeIdentifier { span, .. }
            | Expression::Binary { span, .. }
            | Expression::Unary { span, .. }
            | Expression::If { span, .. }
            | Expression::Match { span, .. }
            | Expression::Function { span, .. }
            | Expression::Call { span, .. }
            | Expression::Array { span, .. }
            | Expression::ArrayIndex { span, .. }
            | Expression::Range { span, .. }
            | Expression::PropertyAccess { span, .. }
            | Expression::StructInit { span, .. }
            | Expression::Assert { span, .. }
            | Expression::ErrorValue { span, .. }
            | Expression::Or { span, .. }
            | Expression::PropagateNone { span, .. }
            | Expression::Spread { span, .. }
            | Expression::Wildcard { span }
            | Expression::OrPattern { span, .. }
            | Expression::ErrorNode { span } => *span,
            Expression::Block(block) => block.span,
        }
    }
}
