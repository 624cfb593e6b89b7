//! Well-formedness of constraint expressions: every atomic sub-expression of
//! the `&&`/`||`-decomposed tree must be a constant expression of type
//! `bool` (`[temp.constr.atomic]`). Constantness is checked later, during
//! satisfaction; only the type is checked here.

use crate::{
    ast::{Expr, ExprKind, Type},
    sema::Sema,
};

impl Sema {
    /// Returns true iff every atomic constraint of `expr` is type-dependent
    /// or of type `bool` after stripping parens, references, and
    /// cv-qualification. Emits one error at the offending sub-expression
    /// otherwise.
    pub fn check_constraint_expression(&mut self, expr: &Expr) -> bool {
        match find_non_bool_atomic(self, expr) {
            None => true,
            Some((culprit, Some(found))) => {
                self.diags.error(
                    culprit.span,
                    format!(
                        "atomic constraint must be of type 'bool' (found '{}')",
                        found
                    ),
                );
                false
            }
            Some((culprit, None)) => {
                self.diags.error(
                    culprit.span,
                    format!("atomic constraint '{}' is invalid", culprit),
                );
                false
            }
        }
    }
}

/// Locate the first atomic sub-expression whose non-dependent type is not
/// `bool`, together with the type it was found to have (`None` when the
/// expression does not type-check at all).
pub(crate) fn find_non_bool_atomic<'e>(
    sema: &Sema,
    expr: &'e Expr,
) -> Option<(&'e Expr, Option<Type>)> {
    if let ExprKind::Binary { op, lhs, rhs } = &expr.kind {
        if op.is_logical() {
            return find_non_bool_atomic(sema, lhs).or_else(|| find_non_bool_atomic(sema, rhs));
        }
    }

    // An atomic constraint.
    if expr.is_dependent() {
        return None;
    }
    let inner = expr.ignore_parens();
    match sema.type_of(inner) {
        Ok(ty) => {
            if ty.strip_ref_and_cv() == &Type::Bool {
                None
            } else {
                Some((expr, Some(ty)))
            }
        }
        Err(_) => Some((expr, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{BinaryOp, ParamRef, Span},
        diag::Severity,
    };

    fn t_param() -> Type {
        Type::Param(ParamRef::new(0, 0, "T"))
    }

    #[test]
    fn bool_atomics_pass() {
        let mut sema = Sema::new();
        let expr = Expr::and(
            Expr::cleanup(Expr::bool_lit(true)),
            Expr::paren(Expr::binary(
                BinaryOp::Lt,
                Expr::int_lit(1),
                Expr::int_lit(2),
            )),
        );
        assert!(sema.check_constraint_expression(&expr));
        assert!(sema.diags.diagnostics().is_empty());
    }

    #[test]
    fn dependent_atomics_are_deferred() {
        let mut sema = Sema::new();
        let expr = Expr::member_call(t_param(), "f");
        assert!(sema.check_constraint_expression(&expr));
    }

    #[test]
    fn non_bool_atomic_is_diagnosed_once_at_the_culprit() {
        let mut sema = Sema::new();
        let culprit = Expr::int_lit(7).with_span(Span::new(4, 5));
        let expr = Expr::and(Expr::bool_lit(true), culprit);
        assert!(!sema.check_constraint_expression(&expr));
        let diags = sema.diags.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].span, Span::new(4, 5));
        assert!(diags[0].message.contains("found 'int'"));
    }

    #[test]
    fn decomposition_stops_at_relational_operators() {
        let mut sema = Sema::new();
        // `1 < 2` is an atomic of type bool; its integer operands are not
        // themselves atomics.
        let expr = Expr::binary(BinaryOp::Lt, Expr::int_lit(1), Expr::int_lit(2));
        assert!(sema.check_constraint_expression(&expr));
    }
}
