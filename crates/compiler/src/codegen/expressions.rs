//! Expression lowering
//!
//! One method per expression form, all funnelled through `compile_expr`. Tail
//! position flows through the constructs that end a function's work: the
//! last block item, both if arms, match arm bodies, and or-fallback bodies.

use super::{CompileError, Compiler, TailPosition};
use crate::ast::{BinaryOp, Expression, UnaryOp};
use crate::types::{Type, TypeEnum};
use rill_core::program::Op;
use rill_core::{Builtin, Value};

impl<'a> Compiler<'a> {
    pub(crate) fn compile_expr(
        &mut self,
        expr: &Expression,
        position: TailPosition,
    ) -> Result<(), CompileError> {
        match expr {
            Expression::Number { text, span } => {
                let value = parse_number(text)
                    .ok_or_else(|| CompileError::new(format!("invalid number literal '{}'", text), *span))?;
                self.emit_const(value);
                Ok(())
            }
            Expression::String { value, .. } => {
                self.emit_const(Value::string(value.as_str()));
                Ok(())
            }
            Expression::InterpolatedString { parts, .. } => self.compile_interpolation(parts),
            Expression::Boolean { value, .. } => {
                self.emit_const(Value::Bool(*value));
                Ok(())
            }
            Expression::None { .. } => {
                self.emit(Op::PushNone, 0);
                Ok(())
            }
            Expression::Identifier { name, span } => self.compile_identifier(name, *span, None),
            Expression::TypeIdentifier { name, span } => Err(CompileError::new(
                format!("type '{}' cannot be used as a value", name),
                *span,
            )),
            Expression::Binary {
                op, left, right, ..
            } => self.compile_binary(*op, left, right),
            Expression::Unary { op, operand, .. } => {
                self.compile_expr(operand, TailPosition::NonTail)?;
                match op {
                    UnaryOp::Negate => self.emit(Op::Negate, 0),
                    UnaryOp::Not => self.emit(Op::Not, 0),
                };
                Ok(())
            }
            Expression::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.compile_expr(condition, TailPosition::NonTail)?;
                let to_else = self.emit_jump(Op::JumpIfFalse);
                self.compile_expr(then_branch, position)?;
                let to_end = self.emit_jump(Op::Jump);
                self.patch_jump(to_else);
                match else_branch {
                    Some(els) => self.compile_expr(els, position)?,
                    None => {
                        self.emit(Op::PushNone, 0);
                    }
                }
                self.patch_jump(to_end);
                Ok(())
            }
            Expression::Match { subject, arms, .. } => self.compile_match(subject, arms, position),
            Expression::Block(block) => self.compile_block(block, position),
            Expression::Function {
                name, params, body, ..
            } => self.compile_function_common(name.as_deref(), params, body),
            Expression::Call { callee, args, span } => {
                self.compile_call(callee, args, *span, position, None)
            }
            Expression::Array { elements, .. } => self.compile_array(elements),
            Expression::ArrayIndex { array, index, .. } => {
                self.compile_expr(array, TailPosition::NonTail)?;
                self.compile_expr(index, TailPosition::NonTail)?;
                self.emit(Op::Index, 0);
                Ok(())
            }
            Expression::Range { start, end, .. } => {
                self.compile_expr(start, TailPosition::NonTail)?;
                self.compile_expr(end, TailPosition::NonTail)?;
                self.emit(Op::MakeRange, 0);
                Ok(())
            }
            Expression::PropertyAccess {
                object,
                property,
                span,
            } => {
                if let Some(def) = self.enum_for_object(object) {
                    return self.construct_enum(def, property, &[], *span);
                }
                self.compile_expr(object, TailPosition::NonTail)?;
                let idx = self.add_constant(Value::string(property.as_str()));
                self.emit(Op::GetField, idx);
                Ok(())
            }
            Expression::StructInit { name, fields, span } => {
                self.compile_struct_init(name, fields, *span)
            }
            Expression::Assert {
                condition, message, ..
            } => {
                self.compile_expr(condition, TailPosition::NonTail)?;
                let ok = self.emit_jump(Op::JumpIfTrue);
                self.compile_expr(message, TailPosition::NonTail)?;
                self.emit(Op::MakeError, 0);
                self.emit(Op::Ret, 0);
                self.patch_jump(ok);
                self.emit(Op::PushNone, 0);
                Ok(())
            }
            Expression::ErrorValue { payload, .. } => {
                self.compile_expr(payload, TailPosition::NonTail)?;
                self.emit(Op::MakeError, 0);
                Ok(())
            }
            Expression::Or {
                value,
                receiver,
                fallback,
                kind,
                ..
            } => {
                self.compile_expr(value, TailPosition::NonTail)?;
                self.emit(Op::Dup, 0);
                match kind {
                    crate::ast::FallbackKind::Result => {
                        self.emit(Op::IsError, 0);
                        let cont = self.emit_jump(Op::JumpIfFalse);
                        self.emit(Op::UnwrapError, 0);
                        match receiver {
                            Some(name) => {
                                let slot = self.create_local(name);
                                self.emit(Op::StoreLocal, slot as i32);
                            }
                            None => {
                                self.emit(Op::Pop, 0);
                            }
                        }
                        self.compile_block(fallback, position)?;
                        self.patch_jump(cont);
                    }
                    crate::ast::FallbackKind::Option => {
                        self.emit(Op::IsNone, 0);
                        let cont = self.emit_jump(Op::JumpIfFalse);
                        self.emit(Op::Pop, 0);
                        self.compile_block(fallback, position)?;
                        self.patch_jump(cont);
                    }
                }
                Ok(())
            }
            Expression::PropagateNone { value, .. } => {
                self.compile_expr(value, TailPosition::NonTail)?;
                self.emit(Op::Dup, 0);
                self.emit(Op::IsNone, 0);
                let cont = self.emit_jump(Op::JumpIfFalse);
                // Return the none to the caller; the checker guarantees the
                // enclosing function returns an Option.
                self.emit(Op::Ret, 0);
                self.patch_jump(cont);
                Ok(())
            }
            Expression::Spread { span, .. } => Err(CompileError::new(
                "spread is only allowed inside array literals and array patterns",
                *span,
            )),
            Expression::Wildcard { span } | Expression::OrPattern { span, .. } => Err(
                CompileError::new("pattern form outside of a match arm", *span),
            ),
            Expression::ErrorNode { span } => Err(CompileError::new(
                "cannot compile unresolved parse error",
                *span,
            )),
        }
    }

    /// Like `compile_expr`, but a typed hint from the surrounding position
    /// lets bare enum literals (`Ok(x)` for a parameter of enum type)
    /// resolve against the expected enum before the global variant index.
    pub(crate) fn compile_expr_with_hint(
        &mut self,
        expr: &Expression,
        hint: Option<&Type>,
        position: TailPosition,
    ) -> Result<(), CompileError> {
        let expected = hint.and_then(|ty| ty.expected_enum());
        match expr {
            Expression::Identifier { name, span } => {
                self.compile_identifier(name, *span, expected)
            }
            Expression::Call { callee, args, span } => {
                self.compile_call(callee, args, *span, position, expected)
            }
            _ => self.compile_expr(expr, position),
        }
    }

    pub(crate) fn compile_identifier(
        &mut self,
        name: &str,
        span: crate::ast::Span,
        expected_enum: Option<&str>,
    ) -> Result<(), CompileError> {
        if let Some(var) = self.resolve_variable(name) {
            self.emit_var(var);
            return Ok(());
        }
        if let Some(def) = self.variant_owner(name, expected_enum) {
            return self.construct_enum(def, name, &[], span);
        }
        Err(CompileError::new(
            format!("unknown identifier '{}'", name),
            span,
        ))
    }

    pub(crate) fn compile_call(
        &mut self,
        callee: &Expression,
        args: &[Expression],
        span: crate::ast::Span,
        position: TailPosition,
        expected_enum: Option<&str>,
    ) -> Result<(), CompileError> {
        match callee {
            Expression::Identifier { name, .. } => {
                if let Some(var) = self.resolve_variable(name) {
                    // Registered signatures hint enum-typed argument slots.
                    let signature = self.env.lookup_function(name);
                    for (i, arg) in args.iter().enumerate() {
                        let hint = signature.and_then(|f| f.params.get(i));
                        self.compile_expr_with_hint(arg, hint, TailPosition::NonTail)?;
                    }
                    self.emit_var(var);
                    self.emit_call(args.len(), position);
                    return Ok(());
                }
                if let Some(def) = self.variant_owner(name, expected_enum) {
                    return self.construct_enum(def, name, args, span);
                }
                if let Some(builtin) = self.lookup_builtin(name) {
                    return self.compile_builtin_call(builtin, args, span);
                }
                Err(CompileError::new(
                    format!("unknown function '{}'", name),
                    span,
                ))
            }
            Expression::PropertyAccess {
                object, property, ..
            } => match self.enum_for_object(object) {
                Some(def) => self.construct_enum(def, property, args, span),
                None => Err(CompileError::new(
                    "unsupported method-call syntax",
                    span,
                )),
            },
            _ => {
                for arg in args {
                    self.compile_expr(arg, TailPosition::NonTail)?;
                }
                self.compile_expr(callee, TailPosition::NonTail)?;
                self.emit_call(args.len(), position);
                Ok(())
            }
        }
    }

    fn emit_call(&mut self, arity: usize, position: TailPosition) {
        let op = match position {
            TailPosition::Tail => Op::TailCall,
            TailPosition::NonTail => Op::Call,
        };
        self.emit(op, arity as i32);
    }

    fn compile_builtin_call(
        &mut self,
        builtin: Builtin,
        args: &[Expression],
        span: crate::ast::Span,
    ) -> Result<(), CompileError> {
        if args.len() != builtin.arity() {
            return Err(CompileError::new(
                format!(
                    "builtin '{}' takes {} argument(s), got {}",
                    builtin.name(),
                    builtin.arity(),
                    args.len()
                ),
                span,
            ));
        }
        for arg in args {
            self.compile_expr(arg, TailPosition::NonTail)?;
        }
        self.emit(Op::CallBuiltin, builtin.operand());
        if builtin.pushes_none() {
            self.emit(Op::PushNone, 0);
        }
        Ok(())
    }

    /// Builtins resolvable at this site. Debug builtins stay invisible
    /// unless the host exposed them.
    fn lookup_builtin(&self, name: &str) -> Option<Builtin> {
        let builtin = Builtin::from_name(name)?;
        if builtin == Builtin::StackDepth && !self.flags.expose_debug_builtins {
            return None;
        }
        Some(builtin)
    }

    /// The enum to construct against for a variant name: the expected enum
    /// from the surrounding position wins when it declares the variant,
    /// otherwise the global variant index decides.
    pub(crate) fn variant_owner(
        &self,
        variant: &str,
        expected_enum: Option<&str>,
    ) -> Option<&'a TypeEnum> {
        let env = self.env;
        if let Some(def) = expected_enum.and_then(|name| env.lookup_enum(name)) {
            if def.variant(variant).is_some() {
                return Some(def);
            }
        }
        env.lookup_enum_by_variant(variant)
    }

    /// `EnumName` in `EnumName.Variant`: a type identifier, or a plain
    /// identifier that no value binding claims.
    pub(crate) fn enum_for_object(&self, object: &Expression) -> Option<&'a TypeEnum> {
        let env = self.env;
        match object {
            Expression::TypeIdentifier { name, .. } => env.lookup_enum(name),
            Expression::Identifier { name, .. } if !self.is_value_name(name) => {
                env.lookup_enum(name)
            }
            _ => None,
        }
    }

    /// Read-only check whether a name would resolve as a value, without the
    /// capture-creating side effect of `resolve_variable`.
    pub(crate) fn is_value_name(&self, name: &str) -> bool {
        self.locals.contains_key(name)
            || self.captures.contains_key(name)
            || self.outer_scopes.iter().any(|s| s.contains_key(name))
    }

    /// Emit payload args, then type id, enum name, and variant name
    /// constants, then the matching constructor opcode.
    pub(crate) fn construct_enum(
        &mut self,
        def: &'a TypeEnum,
        variant_name: &str,
        args: &[Expression],
        span: crate::ast::Span,
    ) -> Result<(), CompileError> {
        let variant = def.variant(variant_name).ok_or_else(|| {
            CompileError::new(
                format!("enum '{}' has no variant '{}'", def.name, variant_name),
                span,
            )
        })?;
        if args.len() != variant.payload.len() {
            return Err(CompileError::new(
                format!(
                    "variant '{}.{}' expects {} payload value(s), got {}",
                    def.name,
                    variant.name,
                    variant.payload.len(),
                    args.len()
                ),
                span,
            ));
        }

        for (i, arg) in args.iter().enumerate() {
            self.compile_expr_with_hint(arg, variant.payload.get(i), TailPosition::NonTail)?;
        }
        self.emit_const(Value::Int(def.type_id));
        self.emit_const(Value::string(def.name.as_str()));
        self.emit_const(Value::string(variant.name.as_str()));
        if args.is_empty() {
            self.emit(Op::MakeEnum, 0);
        } else {
            self.emit(Op::MakeEnumPayload, args.len() as i32);
        }
        Ok(())
    }

    fn compile_struct_init(
        &mut self,
        name: &str,
        fields: &[(String, Expression)],
        span: crate::ast::Span,
    ) -> Result<(), CompileError> {
        let env = self.env;
        let def = env
            .lookup_struct(name)
            .ok_or_else(|| CompileError::new(format!("unknown struct '{}'", name), span))?;

        // Field completeness and uniqueness against the declaration.
        let mut seen: Vec<&str> = Vec::with_capacity(fields.len());
        for (field, _) in fields {
            if def.field_type(field).is_none() {
                return Err(CompileError::new(
                    format!("struct '{}' has no field '{}'", name, field),
                    span,
                ));
            }
            if seen.contains(&field.as_str()) {
                return Err(CompileError::new(
                    format!("duplicate field '{}' in '{}' literal", field, name),
                    span,
                ));
            }
            seen.push(field);
        }
        for (declared, _) in &def.fields {
            if !seen.contains(&declared.as_str()) {
                return Err(CompileError::new(
                    format!("missing field '{}' in '{}' literal", declared, name),
                    span,
                ));
            }
        }

        for (field, value) in fields {
            self.emit_const(Value::string(field.as_str()));
            self.compile_expr_with_hint(value, def.field_type(field), TailPosition::NonTail)?;
        }
        self.emit_const(Value::Int(def.type_id));
        self.emit_const(Value::string(def.name.as_str()));
        self.emit(Op::MakeStruct, fields.len() as i32);
        Ok(())
    }

    fn compile_binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> Result<(), CompileError> {
        match op {
            BinaryOp::And => {
                self.compile_expr(left, TailPosition::NonTail)?;
                self.emit(Op::Dup, 0);
                let end = self.emit_jump(Op::JumpIfFalse);
                self.emit(Op::Pop, 0);
                self.compile_expr(right, TailPosition::NonTail)?;
                self.patch_jump(end);
                Ok(())
            }
            BinaryOp::Or => {
                self.compile_expr(left, TailPosition::NonTail)?;
                self.emit(Op::Dup, 0);
                let end = self.emit_jump(Op::JumpIfTrue);
                self.emit(Op::Pop, 0);
                self.compile_expr(right, TailPosition::NonTail)?;
                self.patch_jump(end);
                Ok(())
            }
            _ => {
                self.compile_expr(left, TailPosition::NonTail)?;
                self.compile_expr(right, TailPosition::NonTail)?;
                let opcode = match op {
                    BinaryOp::Add => Op::Add,
                    BinaryOp::Sub => Op::Sub,
                    BinaryOp::Mul => Op::Mul,
                    BinaryOp::Div => Op::Div,
                    BinaryOp::Mod => Op::Mod,
                    BinaryOp::Eq => Op::Eq,
                    BinaryOp::Neq => Op::Neq,
                    BinaryOp::Lt => Op::Lt,
                    BinaryOp::Gt => Op::Gt,
                    BinaryOp::Lte => Op::Lte,
                    BinaryOp::Gte => Op::Gte,
                    BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
                };
                self.emit(opcode, 0);
                Ok(())
            }
        }
    }

    fn compile_interpolation(&mut self, parts: &[Expression]) -> Result<(), CompileError> {
        if parts.is_empty() {
            self.emit_const(Value::string(""));
            return Ok(());
        }
        for (i, part) in parts.iter().enumerate() {
            self.compile_expr(part, TailPosition::NonTail)?;
            self.emit(Op::ToString, 0);
            if i > 0 {
                self.emit(Op::StrConcat, 0);
            }
        }
        Ok(())
    }

    /// Arrays without spreads build directly; spreads build incrementally,
    /// concatenating each spread array and each run of plain elements.
    fn compile_array(&mut self, elements: &[Expression]) -> Result<(), CompileError> {
        let has_spread = elements
            .iter()
            .any(|e| matches!(e, Expression::Spread { .. }));

        if !has_spread {
            for element in elements {
                self.compile_expr(element, TailPosition::NonTail)?;
            }
            self.emit(Op::MakeArray, elements.len() as i32);
            return Ok(());
        }

        let mut have_result = false;
        let mut run = 0usize;
        for element in elements {
            if let Expression::Spread { value, .. } = element {
                if run > 0 {
                    self.emit(Op::MakeArray, run as i32);
                    if have_result {
                        self.emit(Op::ArrayConcat, 0);
                    }
                    have_result = true;
                    run = 0;
                }
                self.compile_expr(value, TailPosition::NonTail)?;
                if have_result {
                    self.emit(Op::ArrayConcat, 0);
                }
                have_result = true;
            } else {
                self.compile_expr(element, TailPosition::NonTail)?;
                run += 1;
            }
        }
        if run > 0 {
            self.emit(Op::MakeArray, run as i32);
            if have_result {
                self.emit(Op::ArrayConcat, 0);
            }
        }
        Ok(())
    }
}

/// Decimal-containing (or exponent-containing) text becomes a Float
/// constant; anything else an Int.
fn parse_number(text: &str) -> Option<Value> {
    if text.contains('.') || text.contains('e') || text.contains('E') {
        text.parse::<f64>().ok().map(Value::Float)
    } else {
        text.parse::<i64>().ok().map(Value::Int)
    }
}
