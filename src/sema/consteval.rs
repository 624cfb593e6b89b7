//! Constant evaluation of substituted constraint expressions, plus the small
//! type queries the requirement evaluators need: `decltype`, `noexcept`
//! analysis, and implicit-conversion checking.

use log::trace;

use crate::{
    ast::{BinaryOp, Expr, ExprKind, Member, Type, Value},
    diag::{Diagnostic, Severity},
    sema::{error::SemaResult, Sema, SemaError},
};

/// Result of constant-evaluating an expression as an rvalue: either a value,
/// or the partial diagnostics explaining why it is not a constant expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    Value(Value),
    NotConstant(Vec<Diagnostic>),
}

/// Whether an expression can throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanThrow {
    Can,
    Cannot,
    Dependent,
}

/// Result of checking an implicit conversion sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Ok,
    Ambiguous,
    Failed,
}

fn not_constant(expr: &Expr, why: impl Into<String>) -> EvalOutcome {
    EvalOutcome::NotConstant(vec![Diagnostic {
        severity: Severity::Note,
        span: expr.span,
        message: why.into(),
    }])
}

impl Sema {
    /// The type of a non-dependent expression (the `decltype` of the
    /// substituted form). Fails on dependent expressions and on member
    /// accesses that do not resolve.
    pub fn type_of(&self, expr: &Expr) -> SemaResult<Type> {
        match &expr.kind {
            ExprKind::BoolLit(_) => Ok(Type::Bool),
            ExprKind::IntLit(_) => Ok(Type::Int),
            ExprKind::Binary { .. } => Ok(Type::Bool),
            ExprKind::Paren(inner) | ExprKind::Cleanup(inner) => self.type_of(inner),
            ExprKind::ConceptId(_) | ExprKind::Requires(_) => Ok(Type::Bool),
            ExprKind::SizeOf(_) => Ok(Type::Int),
            ExprKind::Fold { .. } => Ok(Type::Bool),
            ExprKind::Member { base, member, call } => match base.strip_ref_and_cv() {
                Type::Struct(def) => match def.members.get(member) {
                    Some(Member::Const(v)) if !*call => Ok(value_type(*v)),
                    Some(Member::ConstFn { value, .. }) if *call => Ok(value_type(*value)),
                    Some(_) => Err(SemaError::Internal(format!(
                        "member '{}::{}' used with the wrong form",
                        def.name, member
                    ))),
                    None => Err(SemaError::Internal(format!(
                        "no member named '{}' in '{}'",
                        member, def.name
                    ))),
                },
                _ => Err(SemaError::Internal(format!(
                    "type of dependent expression '{}'",
                    expr
                ))),
            },
        }
    }

    /// Constant-evaluate a substituted, non-dependent expression as an
    /// rvalue. Hard errors (from recursive concept satisfaction) propagate;
    /// everything else yields either a value or partial diagnostics.
    pub fn evaluate_as_rvalue(&mut self, expr: &Expr) -> SemaResult<EvalOutcome> {
        trace!("consteval: {}", expr);
        match &expr.kind {
            ExprKind::BoolLit(v) => Ok(EvalOutcome::Value(Value::Bool(*v))),
            ExprKind::IntLit(v) => Ok(EvalOutcome::Value(Value::Int(*v))),
            ExprKind::Paren(inner) | ExprKind::Cleanup(inner) => self.evaluate_as_rvalue(inner),
            ExprKind::Binary { op, lhs, rhs } => self.evaluate_binary(*op, lhs, rhs),
            ExprKind::Member { base, member, call } => match base.strip_ref_and_cv() {
                Type::Struct(def) => match def.members.get(member) {
                    Some(Member::Const(v)) if !*call => Ok(EvalOutcome::Value(*v)),
                    Some(Member::ConstFn { value, .. }) if *call => Ok(EvalOutcome::Value(*value)),
                    _ => Ok(not_constant(
                        expr,
                        format!("'{}' is not a constant expression", expr),
                    )),
                },
                _ => Ok(not_constant(
                    expr,
                    format!("'{}' is not a constant expression", expr),
                )),
            },
            ExprKind::SizeOf(ty) => match ty.size_of() {
                Some(size) => Ok(EvalOutcome::Value(Value::Int(size as i64))),
                None => Ok(not_constant(
                    expr,
                    format!("sizeof applied to incomplete type '{}'", ty),
                )),
            },
            ExprKind::ConceptId(cid) => {
                if expr.is_dependent() {
                    return Ok(not_constant(
                        expr,
                        format!("'{}' is not a constant expression", expr),
                    ));
                }
                let satisfaction = self.check_concept_id(cid, expr.span)?;
                Ok(EvalOutcome::Value(Value::Bool(satisfaction.is_satisfied)))
            }
            ExprKind::Requires(re) => {
                if re.is_dependent() {
                    return Ok(not_constant(
                        expr,
                        format!("'{}' is not a constant expression", expr),
                    ));
                }
                Ok(EvalOutcome::Value(Value::Bool(re.is_satisfied())))
            }
            ExprKind::Fold { .. } => Ok(not_constant(
                expr,
                format!("'{}' is not a constant expression", expr),
            )),
        }
    }

    fn evaluate_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> SemaResult<EvalOutcome> {
        let lhs_value = match self.evaluate_as_rvalue(lhs)? {
            EvalOutcome::Value(v) => v,
            not_const => return Ok(not_const),
        };
        // Logical operators short-circuit even under constant evaluation.
        match op {
            BinaryOp::LAnd if !lhs_value.as_bool() => {
                return Ok(EvalOutcome::Value(Value::Bool(false)))
            }
            BinaryOp::LOr if lhs_value.as_bool() => {
                return Ok(EvalOutcome::Value(Value::Bool(true)))
            }
            _ => {}
        }
        let rhs_value = match self.evaluate_as_rvalue(rhs)? {
            EvalOutcome::Value(v) => v,
            not_const => return Ok(not_const),
        };
        let result = match op {
            BinaryOp::LAnd | BinaryOp::LOr => rhs_value.as_bool(),
            BinaryOp::Lt => lhs_value.as_int() < rhs_value.as_int(),
            BinaryOp::Le => lhs_value.as_int() <= rhs_value.as_int(),
            BinaryOp::Gt => lhs_value.as_int() > rhs_value.as_int(),
            BinaryOp::Ge => lhs_value.as_int() >= rhs_value.as_int(),
            BinaryOp::Eq => lhs_value.as_int() == rhs_value.as_int(),
            BinaryOp::Ne => lhs_value.as_int() != rhs_value.as_int(),
        };
        Ok(EvalOutcome::Value(Value::Bool(result)))
    }

    /// Evaluate as a boolean condition; `None` when not a constant.
    pub fn evaluate_as_boolean_condition(&mut self, expr: &Expr) -> SemaResult<Option<bool>> {
        Ok(match self.evaluate_as_rvalue(expr)? {
            EvalOutcome::Value(v) => Some(v.as_bool()),
            EvalOutcome::NotConstant(_) => None,
        })
    }

    /// Evaluate as an integer; `None` when not a constant.
    pub fn evaluate_as_int(&mut self, expr: &Expr) -> SemaResult<Option<i64>> {
        Ok(match self.evaluate_as_rvalue(expr)? {
            EvalOutcome::Value(v) => Some(v.as_int()),
            EvalOutcome::NotConstant(_) => None,
        })
    }

    /// Whether evaluating `expr` can throw an exception.
    pub fn can_throw(&self, expr: &Expr) -> CanThrow {
        if expr.is_dependent() {
            return CanThrow::Dependent;
        }
        if expr_can_throw(expr) {
            CanThrow::Can
        } else {
            CanThrow::Cannot
        }
    }

    /// Check the implicit conversion sequence from a value of type `from` to
    /// `to` (copy-initialization of an invented `to` result object).
    pub fn check_conversion(&self, from: &Type, to: &Type) -> Conversion {
        let from = from.strip_ref_and_cv();
        let to = to.strip_ref_and_cv();
        if from == to {
            return Conversion::Ok;
        }
        match (from, to) {
            (Type::Bool | Type::Int, Type::Bool | Type::Int) => Conversion::Ok,
            (_, Type::Struct(def)) => {
                let applicable = def
                    .convert_from
                    .iter()
                    .filter(|source| converts_directly(from, source))
                    .count();
                match applicable {
                    0 => Conversion::Failed,
                    1 => Conversion::Ok,
                    _ => Conversion::Ambiguous,
                }
            }
            _ => Conversion::Failed,
        }
    }
}

fn value_type(v: Value) -> Type {
    match v {
        Value::Bool(_) => Type::Bool,
        Value::Int(_) => Type::Int,
    }
}

fn converts_directly(from: &Type, source: &Type) -> bool {
    let source = source.strip_ref_and_cv();
    from == source
        || matches!(
            (from, source),
            (Type::Bool | Type::Int, Type::Bool | Type::Int)
        )
}

fn expr_can_throw(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::BoolLit(_) | ExprKind::IntLit(_) | ExprKind::SizeOf(_) => false,
        ExprKind::Binary { lhs, rhs, .. } => expr_can_throw(lhs) || expr_can_throw(rhs),
        ExprKind::Paren(inner) | ExprKind::Cleanup(inner) => expr_can_throw(inner),
        ExprKind::ConceptId(_) | ExprKind::Requires(_) => false,
        ExprKind::Member { base, member, call } => {
            *call
                && match base.strip_ref_and_cv() {
                    Type::Struct(def) => matches!(
                        def.members.get(member),
                        Some(Member::ConstFn { noexcept: false, .. })
                    ),
                    _ => false,
                }
        }
        ExprKind::Fold { pattern, .. } => expr_can_throw(pattern),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ParamRef, StructDef};

    fn throwing_struct() -> Type {
        StructDef::new("S")
            .with_member("f", Member::ConstFn { value: Value::Bool(true), noexcept: false })
            .with_member("g", Member::ConstFn { value: Value::Bool(true), noexcept: true })
            .with_member("value", Member::Const(Value::Int(3)))
            .into_type()
    }

    #[test]
    fn member_constants_evaluate() {
        let mut sema = Sema::new();
        let s = throwing_struct();
        let expr = Expr::member(s.clone(), "value");
        assert_eq!(
            sema.evaluate_as_rvalue(&expr).unwrap(),
            EvalOutcome::Value(Value::Int(3))
        );
        assert_eq!(sema.type_of(&expr).unwrap(), Type::Int);
        let call = Expr::member_call(s, "f");
        assert_eq!(sema.evaluate_as_boolean_condition(&call).unwrap(), Some(true));
    }

    #[test]
    fn logical_operators_short_circuit_in_consteval() {
        let mut sema = Sema::new();
        // The RHS is not a constant expression, but the LHS decides.
        let bad = Expr::member(Type::Bool, "nope");
        let expr = Expr::and(Expr::bool_lit(false), bad);
        assert_eq!(
            sema.evaluate_as_rvalue(&expr).unwrap(),
            EvalOutcome::Value(Value::Bool(false))
        );
    }

    #[test]
    fn relational_operators_compare_integers() {
        let mut sema = Sema::new();
        let expr = Expr::binary(
            BinaryOp::Ge,
            Expr::size_of(Type::Int),
            Expr::int_lit(8),
        );
        assert_eq!(sema.evaluate_as_boolean_condition(&expr).unwrap(), Some(false));
    }

    #[test]
    fn can_throw_distinguishes_noexcept_members() {
        let sema = Sema::new();
        let s = throwing_struct();
        assert_eq!(sema.can_throw(&Expr::member_call(s.clone(), "f")), CanThrow::Can);
        assert_eq!(sema.can_throw(&Expr::member_call(s.clone(), "g")), CanThrow::Cannot);
        assert_eq!(sema.can_throw(&Expr::member(s, "value")), CanThrow::Cannot);
        let dependent = Expr::member_call(Type::Param(ParamRef::new(0, 0, "T")), "f");
        assert_eq!(sema.can_throw(&dependent), CanThrow::Dependent);
    }

    #[test]
    fn conversions_identity_integral_and_constructors() {
        let sema = Sema::new();
        assert_eq!(sema.check_conversion(&Type::Int, &Type::Int), Conversion::Ok);
        assert_eq!(sema.check_conversion(&Type::Int, &Type::Bool), Conversion::Ok);

        let single = StructDef::new("One").with_conversion_from(Type::Int).into_type();
        assert_eq!(sema.check_conversion(&Type::Int, &single), Conversion::Ok);

        let ambiguous = StructDef::new("Two")
            .with_conversion_from(Type::Int)
            .with_conversion_from(Type::Bool)
            .into_type();
        assert_eq!(
            sema.check_conversion(&Type::Int, &ambiguous),
            Conversion::Ambiguous
        );

        let none = StructDef::new("Zero").into_type();
        assert_eq!(sema.check_conversion(&Type::Int, &none), Conversion::Failed);
        assert_eq!(sema.check_conversion(&none, &Type::Int), Conversion::Failed);
    }
}
