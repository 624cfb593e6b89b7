//! Explaining unsatisfied constraints.
//!
//! Walks a [`Satisfaction`]'s failure details in evaluation order and emits
//! notes pointing at the precise atomic clause that failed, drilling through
//! logical connectives (which survive only inside expanded folds), concept
//! specializations (recursing into their cached satisfaction), and
//! `requires`-expressions (delegating to the failing requirement).

use itertools::Itertools;
use log::debug;

use crate::{
    ast::{
        require::{ExprOrFailure, ExprRequirement, ReturnTypeRequirement, TypeOrFailure},
        BinaryOp, Expr, ExprKind, Requirement, RequirementStatus, Span, TemplateArg,
        TemplateArgList, TemplateDecl, TemplateParamList, Type,
    },
    sema::{
        error::SemaResult,
        satisfaction::{Satisfaction, UnsatisfiedCause, UnsatisfiedConstraintRecord},
        Sema,
    },
};

fn sel(first: bool) -> &'static str {
    if first {
        "because"
    } else {
        "and"
    }
}

impl Sema {
    /// Emit the note cascade for an unsatisfied constraint. Callers check
    /// `!satisfaction.is_satisfied` first; rendering is never automatic.
    pub fn diagnose_unsatisfied_constraint(&mut self, satisfaction: &Satisfaction, mut first: bool) {
        debug_assert!(
            !satisfaction.is_satisfied,
            "attempted to diagnose a satisfied constraint"
        );
        for record in &satisfaction.details {
            self.diagnose_record(record, first);
            first = false;
        }
    }

    fn diagnose_record(&mut self, record: &UnsatisfiedConstraintRecord, first: bool) {
        match &record.cause {
            UnsatisfiedCause::SubstitutionFailure(diag) => {
                self.diags.note(
                    diag.span,
                    format!(
                        "because substituted constraint expression is ill-formed: {}",
                        diag.message
                    ),
                );
            }
            UnsatisfiedCause::EvaluatedFalse(substituted) => {
                self.diagnose_well_formed_false(substituted, first);
            }
        }
    }

    fn diagnose_well_formed_false(&mut self, expr: &Expr, first: bool) {
        match &expr.kind {
            ExprKind::Paren(inner) | ExprKind::Cleanup(inner) => {
                self.diagnose_well_formed_false(inner, first)
            }
            // Bare `||`/`&&` reach this point only from expanded fold
            // expressions; ordinary connectives were decomposed during
            // satisfaction checking.
            ExprKind::Binary {
                op: BinaryOp::LOr,
                lhs,
                rhs,
            } => {
                // The disjunction is false, so both sides are.
                self.diagnose_well_formed_false(lhs, first);
                self.diagnose_well_formed_false(rhs, false);
            }
            ExprKind::Binary {
                op: BinaryOp::LAnd,
                lhs,
                rhs,
            } => {
                let lhs_satisfied = self
                    .evaluate_as_boolean_condition(lhs)
                    .ok()
                    .flatten()
                    .unwrap_or(false);
                if lhs_satisfied {
                    // LHS is true, so the RHS must be false.
                    self.diagnose_well_formed_false(rhs, first);
                    return;
                }
                self.diagnose_well_formed_false(lhs, first);
                let rhs_satisfied = self
                    .evaluate_as_boolean_condition(rhs)
                    .ok()
                    .flatten()
                    .unwrap_or(true);
                if !rhs_satisfied {
                    self.diagnose_well_formed_false(rhs, false);
                }
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_relational() => {
                if let Some(note) = self.elaborate_relational(expr, *op, lhs, rhs, first) {
                    self.diags.note(expr.span, note);
                    return;
                }
                self.note_evaluated_to_false(expr, first);
            }
            ExprKind::ConceptId(cid) => {
                if cid.args.len() == 1 {
                    self.diags.note(
                        expr.span,
                        format!(
                            "{} '{}' does not satisfy '{}'",
                            sel(first),
                            cid.args[0],
                            cid.concept
                        ),
                    );
                } else {
                    self.note_evaluated_to_false(expr, first);
                }
                match self.check_concept_id(cid, expr.span) {
                    Ok(satisfaction) if !satisfaction.is_satisfied => {
                        self.diagnose_unsatisfied_constraint(&satisfaction, true);
                    }
                    Ok(_) => {}
                    Err(e) => debug!("cannot rediagnose '{}': {}", expr, e),
                }
            }
            ExprKind::Requires(re) => {
                if let Some(requirement) = re
                    .requirements
                    .iter()
                    .find(|r| !r.is_dependent() && !r.is_satisfied())
                {
                    self.diagnose_requirement(requirement, first);
                }
            }
            _ => self.note_evaluated_to_false(expr, first),
        }
    }

    /// The elaborated note form for integer relational operators: both sides
    /// evaluated and the operator spelled out.
    fn elaborate_relational(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        first: bool,
    ) -> Option<String> {
        let lhs_is_int = matches!(self.type_of(lhs).ok()?.strip_ref_and_cv(), Type::Int);
        let rhs_is_int = matches!(self.type_of(rhs).ok()?.strip_ref_and_cv(), Type::Int);
        if !lhs_is_int || !rhs_is_int {
            return None;
        }
        let lhs_value = self.evaluate_as_int(lhs).ok().flatten()?;
        let rhs_value = self.evaluate_as_int(rhs).ok().flatten()?;
        Some(format!(
            "{} '{}' ({} {} {}) evaluated to false",
            sel(first),
            expr,
            lhs_value,
            op.spelling(),
            rhs_value
        ))
    }

    fn note_evaluated_to_false(&mut self, expr: &Expr, first: bool) {
        self.diags
            .note(expr.span, format!("{} '{}' evaluated to false", sel(first), expr));
    }

    /// Diagnose one unsatisfied, non-dependent requirement per its status.
    pub fn diagnose_requirement(&mut self, requirement: &Requirement, first: bool) {
        debug_assert!(
            !requirement.is_satisfied() && !requirement.is_dependent(),
            "diagnosing a satisfied or dependent requirement"
        );
        match requirement {
            Requirement::Simple(er) | Requirement::Compound(er) => {
                self.diagnose_expr_requirement(er, first)
            }
            Requirement::Type(tr) => {
                if let TypeOrFailure::Failure(diag) = &tr.value {
                    self.diags.note(
                        diag.span,
                        format!(
                            "{} '{}' would be invalid: {}",
                            sel(first),
                            diag.entity,
                            diag.message
                        ),
                    );
                }
            }
            Requirement::Nested(nested) => {
                if let Some(satisfaction) = &nested.satisfaction {
                    if !satisfaction.is_satisfied {
                        self.diagnose_unsatisfied_constraint(satisfaction, first);
                    }
                }
            }
        }
    }

    fn diagnose_expr_requirement(&mut self, er: &ExprRequirement, first: bool) {
        match er.status {
            RequirementStatus::ExprSubstitutionFailure => {
                if let ExprOrFailure::Failure(diag) = &er.value {
                    self.diags.note(
                        diag.span,
                        format!(
                            "{} '{}' would be invalid: {}",
                            sel(first),
                            diag.entity,
                            diag.message
                        ),
                    );
                }
            }
            RequirementStatus::NoexceptNotMet => {
                if let ExprOrFailure::Expr(expr) = &er.value {
                    let span = er.noexcept_span.unwrap_or(expr.span);
                    self.diags.note(
                        span,
                        format!("{} '{}' may throw an exception", sel(first), expr),
                    );
                }
            }
            RequirementStatus::TypeSubstitutionFailure => {
                if let ReturnTypeRequirement::SubstitutionFailure(diag) = &er.return_req {
                    self.diags.note(
                        diag.span,
                        format!(
                            "{} '{}' would be invalid: {}",
                            sel(first),
                            diag.entity,
                            diag.message
                        ),
                    );
                }
            }
            RequirementStatus::ConversionAmbiguous | RequirementStatus::NoConversion => {
                let (ExprOrFailure::Expr(expr), ReturnTypeRequirement::ExpectedType(expected)) =
                    (&er.value, &er.return_req)
                else {
                    return;
                };
                let found = self
                    .type_of(expr)
                    .map(|t| t.to_string())
                    .unwrap_or_else(|_| expr.to_string());
                let message = if er.status == RequirementStatus::ConversionAmbiguous {
                    format!(
                        "{} conversion from '{}' to '{}' is ambiguous",
                        sel(first),
                        found,
                        expected
                    )
                } else {
                    format!(
                        "{} '{}' cannot be implicitly converted to '{}'",
                        sel(first),
                        found,
                        expected
                    )
                };
                self.diags.note(expr.span, message);
            }
            RequirementStatus::ConstraintsNotSatisfied => {
                let ReturnTypeRequirement::TypeConstraint { substituted, .. } = &er.return_req
                else {
                    return;
                };
                let Some(cse) = substituted.as_deref() else {
                    return;
                };
                let ExprKind::ConceptId(cid) = &cse.kind else {
                    return;
                };
                if cid.args.len() == 1 {
                    self.diags.note(
                        cse.span,
                        format!(
                            "{} '{}' does not satisfy '{}'",
                            sel(first),
                            cid.args[0],
                            cid.concept
                        ),
                    );
                } else {
                    self.diags.note(
                        cse.span,
                        format!(
                            "{} type constraint '{}' was not satisfied",
                            sel(first),
                            cse
                        ),
                    );
                }
                let cid = cid.clone();
                match self.check_concept_id(&cid, cse.span) {
                    Ok(satisfaction) if !satisfaction.is_satisfied => {
                        self.diagnose_unsatisfied_constraint(&satisfaction, true);
                    }
                    Ok(_) => {}
                    Err(e) => debug!("cannot rediagnose '{}': {}", cse, e),
                }
            }
            RequirementStatus::Dependent | RequirementStatus::Satisfied => {}
        }
    }

    /// Convenience wrapper for template-id checking: evaluate the associated
    /// constraints of `td` against `args` and, on failure, emit the
    /// top-level error with the rendered argument binding followed by the
    /// full note cascade. Returns whether the constraints were satisfied.
    pub fn ensure_template_argument_list_constraints(
        &mut self,
        td: &TemplateDecl,
        args: &TemplateArgList,
        range: Span,
    ) -> SemaResult<bool> {
        let mut mltal = td.enclosing_args.clone();
        mltal.add_inner_level(args.clone());
        let satisfaction =
            self.check_constraint_satisfaction(td, &td.associated_constraints, &mltal, range)?;
        if satisfaction.is_satisfied {
            return Ok(true);
        }
        let binding = template_argument_bindings_text(&td.params, args);
        self.diags.error(
            range,
            format!("constraints not satisfied for template '{}'{}", td.name, binding),
        );
        self.diagnose_unsatisfied_constraint(&satisfaction, true);
        Ok(false)
    }
}

/// Render the parameter/argument binding of a template-id, e.g.
/// ` [with T = int, U = S]`.
fn template_argument_bindings_text(params: &TemplateParamList, args: &TemplateArgList) -> String {
    if params.is_empty() || args.is_empty() {
        return String::new();
    }
    let bindings = params
        .params
        .iter()
        .zip(args)
        .map(|(param, arg)| match arg {
            TemplateArg::Pack(elems) => format!(
                "{} = <{}>",
                param.name,
                elems.iter().map(|a| a.to_string()).join(", ")
            ),
            other => format!("{} = {}", param.name, other),
        })
        .join(", ");
    format!(" [with {}]", bindings)
}
