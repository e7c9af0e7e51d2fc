//! Match lowering
//!
//! Back-patched forward jumps, no decision tree: each arm duplicates the
//! subject, runs its test, and falls through to the next arm on failure.
//! First matching arm wins; bindings store into local slots before the
//! subject is dropped and the body runs.
//!
//! After the last arm the subject is popped and none pushed. Exhaustive
//! matches never reach that fallthrough.

use super::{CompileError, Compiler, TailPosition};
use crate::ast::{Expression, MatchArm};
use crate::types::TypeEnum;
use rill_core::program::Op;
use rill_core::Value;

/// A classified enum pattern: the owning enum and variant, plus payload
/// sub-patterns.
struct EnumPattern<'e, 'x> {
    def: &'e TypeEnum,
    variant: String,
    args: &'x [Expression],
}

impl<'a> Compiler<'a> {
    pub(crate) fn compile_match(
        &mut self,
        subject: &Expression,
        arms: &[MatchArm],
        position: TailPosition,
    ) -> Result<(), CompileError> {
        self.compile_expr(subject, TailPosition::NonTail)?;

        let mut end_jumps = Vec::with_capacity(arms.len());
        for arm in arms {
            let fail_jumps = self.compile_arm_test(&arm.pattern)?;
            self.emit(Op::Pop, 0); // drop the subject before the body
            self.compile_expr(&arm.body, position)?;
            end_jumps.push(self.emit_jump(Op::Jump));
            for jump in fail_jumps {
                self.patch_jump(jump);
            }
        }

        // No arm matched: the match produces none.
        self.emit(Op::Pop, 0);
        self.emit(Op::PushNone, 0);

        for jump in end_jumps {
            self.patch_jump(jump);
        }
        Ok(())
    }

    /// Emit the test and bindings for one pattern. On entry the subject is
    /// on top of the stack; on fallthrough it still is, with all pattern
    /// variables stored. The returned jumps lead to the next arm.
    fn compile_arm_test(&mut self, pattern: &Expression) -> Result<Vec<usize>, CompileError> {
        match pattern {
            // Wildcard matches unconditionally, binds nothing.
            Expression::Wildcard { .. } => Ok(Vec::new()),

            Expression::OrPattern { alternatives, .. } => self.compile_or_pattern(alternatives),

            Expression::Array { elements, span } => self.compile_array_pattern(elements, *span),

            _ => {
                if let Some(enum_pattern) = self.classify_enum_pattern(pattern) {
                    return self.compile_enum_pattern(enum_pattern, pattern.span());
                }
                // Literal (or variable reference): plain equality test.
                self.emit(Op::Dup, 0);
                self.compile_expr(pattern, TailPosition::NonTail)?;
                self.emit(Op::Eq, 0);
                Ok(vec![self.emit_jump(Op::JumpIfFalse)])
            }
        }
    }

    /// `p1 | p2 | ...`: a disjunction of equality tests. No bindings are
    /// visible in the body.
    fn compile_or_pattern(
        &mut self,
        alternatives: &[Expression],
    ) -> Result<Vec<usize>, CompileError> {
        let mut to_body = Vec::new();
        let mut fail = Vec::new();
        let last = alternatives.len().saturating_sub(1);
        for (i, alternative) in alternatives.iter().enumerate() {
            self.emit(Op::Dup, 0);
            self.compile_expr(alternative, TailPosition::NonTail)?;
            self.emit(Op::Eq, 0);
            if i < last {
                to_body.push(self.emit_jump(Op::JumpIfTrue));
            } else {
                fail.push(self.emit_jump(Op::JumpIfFalse));
            }
        }
        for jump in to_body {
            self.patch_jump(jump);
        }
        Ok(fail)
    }

    /// `[e1, ..., en]` or `[e1, ..., en, ..rest]`: length check, then
    /// per-index binds, then the rest slice.
    fn compile_array_pattern(
        &mut self,
        elements: &[Expression],
        _span: crate::ast::Span,
    ) -> Result<Vec<usize>, CompileError> {
        let (positional, rest) = match elements.last() {
            Some(Expression::Spread { value, span }) => {
                let rest_name = match value.as_ref() {
                    Expression::Identifier { name, .. } => Some(name.clone()),
                    Expression::Wildcard { .. } => None,
                    _ => {
                        return Err(CompileError::new(
                            "rest pattern must be an identifier or wildcard",
                            *span,
                        ))
                    }
                };
                (
                    elements.get(..elements.len() - 1).unwrap_or_default(),
                    Some(rest_name),
                )
            }
            _ => (elements, None),
        };
        let n = positional.len();

        // Length guard: exact without rest, at-least with.
        self.emit(Op::Dup, 0);
        self.emit(Op::ArrayLen, 0);
        self.emit_const(Value::Int(n as i64));
        self.emit(if rest.is_some() { Op::Gte } else { Op::Eq }, 0);
        let mut fail = vec![self.emit_jump(Op::JumpIfFalse)];

        let mut literal_checks: Vec<(usize, &Expression)> = Vec::new();
        for (i, element) in positional.iter().enumerate() {
            match element {
                Expression::Wildcard { .. } => {}
                Expression::Identifier { name, .. } => {
                    self.emit(Op::Dup, 0);
                    self.emit_const(Value::Int(i as i64));
                    self.emit(Op::Index, 0);
                    let slot = self.create_local(name);
                    self.emit(Op::StoreLocal, slot as i32);
                }
                Expression::Spread { span, .. } => {
                    return Err(CompileError::new(
                        "rest pattern is only allowed in the last position",
                        *span,
                    ))
                }
                _ => {
                    self.emit(Op::Dup, 0);
                    self.emit_const(Value::Int(i as i64));
                    self.emit(Op::Index, 0);
                    let slot = self.scratch_local();
                    self.emit(Op::StoreLocal, slot as i32);
                    literal_checks.push((slot, element));
                }
            }
        }

        if let Some(Some(rest_name)) = rest {
            // slice [n, len) of the subject into the rest binding
            self.emit(Op::Dup, 0);
            self.emit(Op::Dup, 0);
            self.emit(Op::ArrayLen, 0);
            self.emit_const(Value::Int(n as i64));
            self.emit(Op::Swap, 0);
            self.emit(Op::ArraySlice, 0);
            let slot = self.create_local(&rest_name);
            self.emit(Op::StoreLocal, slot as i32);
        }

        for (slot, literal) in literal_checks {
            self.emit(Op::PushLocal, slot as i32);
            self.compile_expr(literal, TailPosition::NonTail)?;
            self.emit(Op::Eq, 0);
            fail.push(self.emit_jump(Op::JumpIfFalse));
        }
        Ok(fail)
    }

    /// Enum pattern: nominal test via `match_enum`, then payload unwrap
    /// into bindings. Literal payload positions are stored to scratch slots
    /// and folded into the guard as equality tests.
    fn compile_enum_pattern(
        &mut self,
        pattern: EnumPattern<'a, '_>,
        span: crate::ast::Span,
    ) -> Result<Vec<usize>, CompileError> {
        let EnumPattern { def, variant, args } = pattern;
        let variant_info = def.variant(&variant).ok_or_else(|| {
            CompileError::new(
                format!("enum '{}' has no variant '{}'", def.name, variant),
                span,
            )
        })?;
        if args.len() != variant_info.payload.len() {
            return Err(CompileError::new(
                format!(
                    "variant '{}.{}' has {} payload value(s), pattern names {}",
                    def.name,
                    variant_info.name,
                    variant_info.payload.len(),
                    args.len()
                ),
                span,
            ));
        }

        self.emit(Op::Dup, 0);
        self.emit_const(Value::Int(def.type_id));
        self.emit_const(Value::string(def.name.as_str()));
        self.emit_const(Value::string(variant_info.name.as_str()));
        self.emit(Op::MatchEnum, 0);
        let mut fail = vec![self.emit_jump(Op::JumpIfFalse)];

        if !args.is_empty() {
            self.emit(Op::Dup, 0);
            self.emit(Op::UnwrapEnum, 0);
            // Payloads sit p0..pn-1 with pn-1 on top; bind in reverse.
            let mut literal_checks: Vec<(usize, &Expression)> = Vec::new();
            for arg in args.iter().rev() {
                match arg {
                    Expression::Identifier { name, .. } => {
                        let slot = self.create_local(name);
                        self.emit(Op::StoreLocal, slot as i32);
                    }
                    Expression::Wildcard { .. } => {
                        self.emit(Op::Pop, 0);
                    }
                    _ => {
                        let slot = self.scratch_local();
                        self.emit(Op::StoreLocal, slot as i32);
                        literal_checks.push((slot, arg));
                    }
                }
            }
            for (slot, literal) in literal_checks {
                self.emit(Op::PushLocal, slot as i32);
                self.compile_expr(literal, TailPosition::NonTail)?;
                self.emit(Op::Eq, 0);
                fail.push(self.emit_jump(Op::JumpIfFalse));
            }
        }
        Ok(fail)
    }

    /// Recognise the enum-pattern shapes: `Enum.Variant(args)`,
    /// `Enum.Variant`, `Variant(args)`, and bare `Variant`.
    fn classify_enum_pattern<'x>(&self, pattern: &'x Expression) -> Option<EnumPattern<'a, 'x>> {
        match pattern {
            Expression::Call { callee, args, .. } => match callee.as_ref() {
                Expression::PropertyAccess {
                    object, property, ..
                } => {
                    let def = self.enum_for_object(object)?;
                    Some(EnumPattern {
                        def,
                        variant: property.clone(),
                        args,
                    })
                }
                Expression::Identifier { name, .. } if !self.is_value_name(name) => {
                    let def = self.env.lookup_enum_by_variant(name)?;
                    Some(EnumPattern {
                        def,
                        variant: name.clone(),
                        args,
                    })
                }
                _ => None,
            },
            Expression::PropertyAccess {
                object, property, ..
            } => {
                let def = self.enum_for_object(object)?;
                Some(EnumPattern {
                    def,
                    variant: property.clone(),
                    args: &[],
                })
            }
            Expression::Identifier { name, .. } if !self.is_value_name(name) => {
                let def = self.env.lookup_enum_by_variant(name)?;
                Some(EnumPattern {
                    def,
                    variant: name.clone(),
                    args: &[],
                })
            }
            _ => None,
        }
    }

    /// Anonymous slot for pattern scratch storage; the angle brackets keep
    /// it out of reach of source identifiers.
    fn scratch_local(&mut self) -> usize {
        let name = format!("<scratch{}>", self.local_count);
        self.create_local(&name)
    }

    /// Destructure an already-proven pattern: the value is on the stack and
    /// is consumed; bindings store unconditionally.
    pub(crate) fn bind_irrefutable(&mut self, pattern: &Expression) -> Result<(), CompileError> {
        match pattern {
            Expression::Identifier { name, .. } if self.classify_enum_pattern(pattern).is_none() => {
                let slot = self.create_local(name);
                self.emit(Op::StoreLocal, slot as i32);
                Ok(())
            }
            Expression::Wildcard { .. } => {
                self.emit(Op::Pop, 0);
                Ok(())
            }
            _ => {
                if let Some(EnumPattern { def: _, variant: _, args }) =
                    self.classify_enum_pattern(pattern)
                {
                    if args.is_empty() {
                        self.emit(Op::Pop, 0);
                        return Ok(());
                    }
                    self.emit(Op::UnwrapEnum, 0);
                    for arg in args.iter().rev() {
                        match arg {
                            Expression::Identifier { name, .. } => {
                                let slot = self.create_local(name);
                                self.emit(Op::StoreLocal, slot as i32);
                            }
                            _ => {
                                self.emit(Op::Pop, 0);
                            }
                        }
                    }
                    return Ok(());
                }
                Err(CompileError::new(
                    "unsupported pattern in binding position",
                    pattern.span(),
                ))
            }
        }
    }
}
