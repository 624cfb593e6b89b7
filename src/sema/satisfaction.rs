//! Constraint satisfaction checking.
//!
//! Satisfaction is computed by recursive descent over the constraint
//! expression. `&&` and `||` short-circuit exactly as `[temp.constr.op]`
//! prescribes; everything below them is an atomic constraint, substituted
//! and constant-evaluated inside its own instantiation frame. Unsatisfied
//! atomics append failure details in evaluation order.
//!
//! Top-level checks are memoized per `(owner, innermost arguments)`; cached
//! records are returned by value.

use log::debug;

use crate::{
    ast::{ConceptId, ConstrainedDecl, Expr, ExprKind, MultiLevelArgList, Span},
    diag::SubstitutionDiagnostic,
    sema::{
        consteval::EvalOutcome,
        error::SemaResult,
        instantiate::InstantiationKind,
        subst::SubstError,
        Sema, SemaError,
    },
};

/// The outcome of a satisfaction check: the verdict plus, when unsatisfied,
/// the ordered failure details the diagnostic renderer walks.
#[derive(Debug, Clone, PartialEq)]
pub struct Satisfaction {
    pub is_satisfied: bool,
    pub details: Vec<UnsatisfiedConstraintRecord>,
}

impl Satisfaction {
    pub fn satisfied() -> Self {
        Self {
            is_satisfied: true,
            details: Vec::new(),
        }
    }
}

/// One entry of [`Satisfaction::details`]: the source-level clause plus what
/// went wrong with it.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsatisfiedConstraintRecord {
    pub clause: Expr,
    pub cause: UnsatisfiedCause,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnsatisfiedCause {
    /// Substituting into the atomic failed in an immediate context; the
    /// standard defines this as "not satisfied".
    SubstitutionFailure(SubstitutionDiagnostic),
    /// The substituted atomic is well-formed and evaluated to false.
    EvaluatedFalse(Expr),
}

/// Dependence facts accumulated across sub-evaluations (OR-semantics).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SatisfactionFlags {
    /// Some substituted atomic was still instantiation-dependent and was
    /// tentatively treated as satisfied; re-evaluate with a fuller argument
    /// set.
    pub is_dependent: bool,
    pub contains_unexpanded_pack: bool,
}

/// What the per-atomic evaluator decided.
enum AtomicEval {
    /// Substitution succeeded; constant-evaluate this expression.
    Ready(Expr),
    /// Soft substitution failure; the atomic is unsatisfied.
    SubstFailure(SubstitutionDiagnostic),
    /// Still dependent after substitution; tentatively satisfied.
    DependentSatisfied,
}

impl Sema {
    /// Check satisfaction of the associated constraints of `owner` (an
    /// implicit conjunction, left to right) against `args`, consulting and
    /// filling the satisfaction cache.
    pub fn check_constraint_satisfaction(
        &mut self,
        owner: &dyn ConstrainedDecl,
        clauses: &[Expr],
        args: &MultiLevelArgList,
        range: Span,
    ) -> SemaResult<Satisfaction> {
        if clauses.is_empty() {
            return Ok(Satisfaction::satisfied());
        }

        let key = (
            owner.decl_id(),
            args.innermost().cloned().unwrap_or_default(),
        );
        if let Some(cached) = self.satisfaction_cache.get(&key) {
            self.metrics.satisfaction_cache_hits += 1;
            debug!("satisfaction cache hit for '{}'", owner.decl_name());
            return Ok(cached.clone());
        }
        self.metrics.satisfaction_cache_misses += 1;

        let name = owner.decl_name().to_string();
        let mut flags = SatisfactionFlags::default();
        let satisfaction =
            self.with_instantiation(InstantiationKind::ConstraintsCheck, range, &name, |sema| {
                sema.evaluate_clauses(clauses, args, &name, &mut flags)
            })?;

        debug!(
            "constraints of '{}' {}",
            name,
            if satisfaction.is_satisfied {
                "satisfied"
            } else {
                "not satisfied"
            }
        );
        self.satisfaction_cache
            .entry(key)
            .or_insert_with(|| satisfaction.clone());
        Ok(satisfaction)
    }

    /// Identity-evaluator overload for expressions that have already been
    /// substituted: no dependence handling, straight to constant evaluation.
    /// A `requires`-expression atom still has its requirements instantiated
    /// (through an empty argument list) so their statuses are definitive.
    pub fn check_substituted_satisfaction(&mut self, expr: &Expr) -> SemaResult<Satisfaction> {
        let mut satisfaction = Satisfaction::satisfied();
        let mut eval = |sema: &mut Sema, atomic: &Expr| {
            if !matches!(atomic.kind, ExprKind::Requires(_)) {
                return Ok(AtomicEval::Ready(atomic.clone()));
            }
            match sema.subst_expr(atomic, &MultiLevelArgList::new()) {
                Ok(instantiated) => Ok(AtomicEval::Ready(instantiated)),
                Err(SubstError::Sfinae(diag)) => Ok(AtomicEval::SubstFailure(diag)),
                Err(SubstError::Hard(e)) => Err(e),
            }
        };
        self.calculate_satisfaction(expr, &mut satisfaction, &mut eval)?;
        Ok(satisfaction)
    }

    /// Nested-requirement variant: evaluates one constraint expression and
    /// reports the dependence flags alongside the satisfaction.
    pub fn check_nested_satisfaction(
        &mut self,
        constraint: &Expr,
        args: &MultiLevelArgList,
    ) -> SemaResult<(Satisfaction, SatisfactionFlags)> {
        if args.is_empty() {
            let satisfaction = self.check_substituted_satisfaction(constraint)?;
            return Ok((satisfaction, SatisfactionFlags::default()));
        }
        let mut flags = SatisfactionFlags::default();
        let satisfaction = self.with_instantiation(
            InstantiationKind::NestedRequirementConstraintsCheck,
            constraint.span,
            "nested requirement",
            |sema| {
                let mut satisfaction = Satisfaction::satisfied();
                sema.calculate_with_subst(
                    constraint,
                    args,
                    "nested requirement",
                    &mut flags,
                    &mut satisfaction,
                )?;
                Ok(satisfaction)
            },
        )?;
        Ok((satisfaction, flags))
    }

    /// Check a non-dependent concept specialization `C<Args...>`. This is
    /// the entry shared by constant evaluation of substituted
    /// concept-references, return-type requirements, and the diagnostic
    /// renderer; all of them hit the same cache.
    pub fn check_concept_id(&mut self, cid: &ConceptId, span: Span) -> SemaResult<Satisfaction> {
        let (converted, dependent) =
            self.check_template_argument_list(&cid.concept, span, &cid.args)?;
        if dependent {
            return Err(SemaError::Internal(format!(
                "satisfaction of dependent concept specialization '{}'",
                cid
            )));
        }
        let args = MultiLevelArgList::from_innermost(converted);
        let constraint = cid.concept.constraint.clone();
        self.check_constraint_satisfaction(
            &*cid.concept,
            std::slice::from_ref(&constraint),
            &args,
            span,
        )
    }

    fn evaluate_clauses(
        &mut self,
        clauses: &[Expr],
        args: &MultiLevelArgList,
        entity: &str,
        flags: &mut SatisfactionFlags,
    ) -> SemaResult<Satisfaction> {
        let mut satisfaction = Satisfaction::satisfied();
        for clause in clauses {
            self.calculate_with_subst(clause, args, entity, flags, &mut satisfaction)?;
            if !satisfaction.is_satisfied {
                // The clause list is a conjunction; the first unsatisfied
                // clause decides.
                return Ok(satisfaction);
            }
        }
        Ok(satisfaction)
    }

    fn calculate_with_subst(
        &mut self,
        expr: &Expr,
        args: &MultiLevelArgList,
        entity: &str,
        flags: &mut SatisfactionFlags,
        satisfaction: &mut Satisfaction,
    ) -> SemaResult<()> {
        let mut eval = |sema: &mut Sema, atomic: &Expr| {
            sema.evaluate_atomic_with_subst(atomic, args, entity, flags)
        };
        self.calculate_satisfaction(expr, satisfaction, &mut eval)
    }

    fn evaluate_atomic_with_subst(
        &mut self,
        atomic: &Expr,
        args: &MultiLevelArgList,
        entity: &str,
        flags: &mut SatisfactionFlags,
    ) -> SemaResult<AtomicEval> {
        self.with_instantiation(
            InstantiationKind::ConstraintSubstitution,
            atomic.span,
            entity,
            |sema| match sema.subst_expr(atomic, args) {
                Err(SubstError::Hard(e)) => Err(e),
                Err(SubstError::Sfinae(diag)) => Ok(AtomicEval::SubstFailure(diag)),
                Ok(substituted) => {
                    flags.contains_unexpanded_pack |= substituted.contains_unexpanded_pack();
                    if substituted.is_dependent() {
                        // Partial argument binding (e.g. a nested requirement
                        // instantiated with only outer levels). Tentatively
                        // satisfied; the caller re-evaluates later.
                        flags.is_dependent = true;
                        return Ok(AtomicEval::DependentSatisfied);
                    }
                    if !sema.check_constraint_expression(&substituted) {
                        return Err(SemaError::IllFormedConstraint);
                    }
                    Ok(AtomicEval::Ready(substituted))
                }
            },
        )
    }

    /// The recursive core: decompose `&&`/`||` with short-circuiting, pass
    /// through parens and cleanups, hand everything else to the atomic
    /// evaluator.
    fn calculate_satisfaction<F>(
        &mut self,
        expr: &Expr,
        satisfaction: &mut Satisfaction,
        eval: &mut F,
    ) -> SemaResult<()>
    where
        F: FnMut(&mut Sema, &Expr) -> SemaResult<AtomicEval>,
    {
        match &expr.kind {
            ExprKind::Binary { op, lhs, rhs } if op.is_logical() => {
                self.calculate_satisfaction(lhs, satisfaction, eval)?;
                let lhs_satisfied = satisfaction.is_satisfied;
                let short_circuits = match op {
                    crate::ast::BinaryOp::LOr => lhs_satisfied,
                    _ => !lhs_satisfied,
                };
                if short_circuits {
                    return Ok(());
                }
                self.calculate_satisfaction(rhs, satisfaction, eval)
            }
            ExprKind::Paren(inner) | ExprKind::Cleanup(inner) => {
                self.calculate_satisfaction(inner, satisfaction, eval)
            }
            _ => match eval(self, expr)? {
                AtomicEval::SubstFailure(diag) => {
                    satisfaction.is_satisfied = false;
                    satisfaction.details.push(UnsatisfiedConstraintRecord {
                        clause: expr.clone(),
                        cause: UnsatisfiedCause::SubstitutionFailure(diag),
                    });
                    Ok(())
                }
                AtomicEval::DependentSatisfied => {
                    satisfaction.is_satisfied = true;
                    Ok(())
                }
                AtomicEval::Ready(substituted) => {
                    match self.evaluate_as_rvalue(&substituted)? {
                        EvalOutcome::NotConstant(partials) => {
                            // [temp.constr.atomic]: E shall be a constant
                            // expression of type bool.
                            self.diags.error(
                                substituted.span,
                                "substitution into constraint expression resulted in a \
                                 non-constant expression",
                            );
                            for partial in partials {
                                self.diags.note(partial.span, partial.message);
                            }
                            Err(SemaError::NonConstantConstraint)
                        }
                        EvalOutcome::Value(value) => {
                            satisfaction.is_satisfied = value.as_bool();
                            if !satisfaction.is_satisfied {
                                satisfaction.details.push(UnsatisfiedConstraintRecord {
                                    clause: expr.clone(),
                                    cause: UnsatisfiedCause::EvaluatedFalse(substituted),
                                });
                            }
                            Ok(())
                        }
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{
            ConceptDecl, Member, ParamRef, Requirement, StructDef, TemplateArg, TemplateParamList,
            Type, Value,
        },
        sema::Sema,
    };

    fn t_param() -> Type {
        Type::Param(ParamRef::new(0, 0, "T"))
    }

    fn s_with_f(value: bool) -> Type {
        StructDef::new("S")
            .with_member(
                "f",
                Member::ConstFn {
                    value: Value::Bool(value),
                    noexcept: true,
                },
            )
            .into_type()
    }

    fn innermost(ty: Type) -> MultiLevelArgList {
        MultiLevelArgList::from_innermost(vec![TemplateArg::Type(ty)])
    }

    #[test]
    fn trivial_concept_is_satisfied_and_cached() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut sema = Sema::new();
        let c = ConceptDecl::new("C", TemplateParamList::types(&["T"]), Expr::bool_lit(true));
        let constraint = c.constraint.clone();
        let args = innermost(Type::Int);
        let satisfaction = sema
            .check_constraint_satisfaction(&*c, &[constraint], &args, Span::default())
            .unwrap();
        assert!(satisfaction.is_satisfied);
        assert!(satisfaction.details.is_empty());
        assert!(sema.satisfaction_cached(c.id, &vec![TemplateArg::Type(Type::Int)]));
        assert_eq!(sema.satisfaction_cache_len(), 1);
    }

    #[test]
    fn member_lookup_failure_is_one_substitution_detail() {
        let mut sema = Sema::new();
        let c = ConceptDecl::new(
            "C",
            TemplateParamList::types(&["T"]),
            Expr::member_call(t_param(), "f"),
        );
        let constraint = c.constraint.clone();
        let args = innermost(StructDef::new("Empty").into_type());
        let satisfaction = sema
            .check_constraint_satisfaction(&*c, &[constraint], &args, Span::default())
            .unwrap();
        assert!(!satisfaction.is_satisfied);
        assert_eq!(satisfaction.details.len(), 1);
        assert!(matches!(
            &satisfaction.details[0].cause,
            UnsatisfiedCause::SubstitutionFailure(d) if d.message.contains("no member named 'f'")
        ));
        // Soft failure: no diagnostics were emitted.
        assert!(sema.diags.diagnostics().is_empty());
    }

    #[test]
    fn conjunction_short_circuits_without_substituting_the_rhs() {
        let mut sema = Sema::new();
        let lhs = Expr::member_call(t_param(), "f");
        let rhs = Expr::member_call(t_param(), "g");
        let c = ConceptDecl::new(
            "D",
            TemplateParamList::types(&["T"]),
            Expr::and(lhs, rhs),
        );
        let constraint = c.constraint.clone();
        let args = innermost(s_with_f(false));
        let satisfaction = sema
            .check_constraint_satisfaction(&*c, &[constraint], &args, Span::default())
            .unwrap();
        assert!(!satisfaction.is_satisfied);
        assert_eq!(satisfaction.details.len(), 1);
        // Only the LHS was substituted.
        assert_eq!(sema.metrics.substitutions, 1);
    }

    #[test]
    fn disjunction_short_circuits_on_satisfied_lhs() {
        let mut sema = Sema::new();
        let expr = Expr::or(
            Expr::member_call(t_param(), "f"),
            Expr::member_call(t_param(), "missing"),
        );
        let c = ConceptDecl::new("E", TemplateParamList::types(&["T"]), expr);
        let constraint = c.constraint.clone();
        let args = innermost(s_with_f(true));
        let satisfaction = sema
            .check_constraint_satisfaction(&*c, &[constraint], &args, Span::default())
            .unwrap();
        assert!(satisfaction.is_satisfied);
        assert_eq!(sema.metrics.substitutions, 1);
    }

    #[test]
    fn cached_checks_do_not_resubstitute_and_return_equal_records() {
        let mut sema = Sema::new();
        let c = ConceptDecl::new(
            "C",
            TemplateParamList::types(&["T"]),
            Expr::member_call(t_param(), "f"),
        );
        let constraint = c.constraint.clone();
        let args = innermost(s_with_f(true));
        let first = sema
            .check_constraint_satisfaction(&*c, &[constraint.clone()], &args, Span::default())
            .unwrap();
        let substitutions_after_first = sema.metrics.substitutions;
        let second = sema
            .check_constraint_satisfaction(&*c, &[constraint], &args, Span::default())
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(sema.metrics.substitutions, substitutions_after_first);
        assert_eq!(sema.metrics.satisfaction_cache_hits, 1);

        // Returned records are snapshots; mutating one cannot corrupt the
        // cache.
        let mut stolen = second;
        stolen.is_satisfied = false;
        let third = sema
            .check_constraint_satisfaction(
                &*c,
                &[c.constraint.clone()],
                &args,
                Span::default(),
            )
            .unwrap();
        assert!(third.is_satisfied);
    }

    #[test]
    fn dependent_atomic_is_tentatively_satisfied_with_flag() {
        let mut sema = Sema::new();
        // Depth 1 is never supplied, so the atomic stays dependent.
        let deep = Expr::member_call(Type::Param(ParamRef::new(1, 0, "U")), "f");
        let args = MultiLevelArgList::from_innermost(vec![TemplateArg::Type(Type::Int)]);
        let (satisfaction, flags) = sema.check_nested_satisfaction(&deep, &args).unwrap();
        assert!(satisfaction.is_satisfied);
        assert!(flags.is_dependent);
        assert!(satisfaction.details.is_empty());
    }

    #[test]
    fn empty_clause_list_is_vacuously_satisfied() {
        let mut sema = Sema::new();
        let c = ConceptDecl::new("C", TemplateParamList::types(&["T"]), Expr::bool_lit(true));
        let satisfaction = sema
            .check_constraint_satisfaction(
                &*c,
                &[],
                &MultiLevelArgList::new(),
                Span::default(),
            )
            .unwrap();
        assert!(satisfaction.is_satisfied);
        assert_eq!(sema.satisfaction_cache_len(), 0);
    }

    #[test]
    fn substituted_requires_expressions_instantiate_their_requirements() {
        let mut sema = Sema::new();
        // A simple requirement is satisfied by mere validity, whatever the
        // member evaluates to.
        let present = Expr::requires(vec![Requirement::simple(Expr::member_call(
            s_with_f(false),
            "f",
        ))]);
        let satisfaction = sema.check_substituted_satisfaction(&present).unwrap();
        assert!(satisfaction.is_satisfied);

        let missing = Expr::requires(vec![Requirement::simple(Expr::member_call(
            s_with_f(false),
            "g",
        ))]);
        let satisfaction = sema.check_substituted_satisfaction(&missing).unwrap();
        assert!(!satisfaction.is_satisfied);
        assert_eq!(satisfaction.details.len(), 1);
    }

    #[test]
    fn missing_member_type_in_sizeof_soft_fails() {
        let mut sema = Sema::new();
        let c = ConceptDecl::new(
            "C",
            TemplateParamList::types(&["T"]),
            Expr::size_of(Type::member(t_param(), "value_type")),
        );
        let constraint = c.constraint.clone();
        let args = innermost(Type::Int);
        let satisfaction = sema
            .check_constraint_satisfaction(&*c, &[constraint], &args, Span::default())
            .unwrap();
        assert!(!satisfaction.is_satisfied);
        assert!(matches!(
            &satisfaction.details[0].cause,
            UnsatisfiedCause::SubstitutionFailure(_)
        ));
    }
}
