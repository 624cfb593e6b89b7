//! Template-argument substitution into constraint expressions and types.
//!
//! Substitution distinguishes two failure channels, which callers must not
//! conflate: a *soft* failure in an immediate context (SFINAE — member
//! lookup failed, a type does not exist) yields
//! [`SubstError::Sfinae`] carrying the diagnostic record, while everything
//! else is a *hard* error ([`SubstError::Hard`]). Per `[temp.constr.atomic]`
//! a soft failure means the atomic constraint is unsatisfied, never that the
//! program is in error.

use log::trace;

use crate::{
    ast::{
        args::{MultiLevelArgList, TemplateArg, TemplateArgList},
        decl::ConceptRef,
        require::{
            ExprOrFailure, ExprRequirement, Requirement, RequirementStatus, ReturnTypeRequirement,
            TypeOrFailure, TypeRequirement,
        },
        ty::{Member, Type},
        ConceptId, Expr, ExprKind, RequiresExpr, Span,
    },
    diag::SubstitutionDiagnostic,
    sema::{error::SemaResult, Sema, SemaError},
};

/// A failed substitution: soft (SFINAE) or hard.
#[derive(Debug)]
pub enum SubstError {
    Sfinae(SubstitutionDiagnostic),
    Hard(SemaError),
}

impl From<SemaError> for SubstError {
    fn from(e: SemaError) -> Self {
        SubstError::Hard(e)
    }
}

pub type SubstResult<T> = core::result::Result<T, SubstError>;

fn sfinae(span: Span, entity: impl Into<String>, message: impl Into<String>) -> SubstError {
    SubstError::Sfinae(SubstitutionDiagnostic {
        span,
        message: message.into(),
        entity: entity.into(),
    })
}

impl Sema {
    /// Substitute `args` into `expr`. This is the entry the satisfaction
    /// evaluator uses per atomic constraint; the substitution counter in
    /// [`SemaMetrics`](crate::sema::SemaMetrics) ticks once per call.
    pub fn subst_expr(&mut self, expr: &Expr, args: &MultiLevelArgList) -> SubstResult<Expr> {
        self.metrics.substitutions += 1;
        trace!("subst: {}", expr);
        self.subst_expr_inner(expr, args)
    }

    fn subst_expr_inner(&mut self, expr: &Expr, args: &MultiLevelArgList) -> SubstResult<Expr> {
        let span = expr.span;
        let kind = match &expr.kind {
            ExprKind::BoolLit(v) => ExprKind::BoolLit(*v),
            ExprKind::IntLit(v) => ExprKind::IntLit(*v),
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op: *op,
                lhs: Box::new(self.subst_expr_inner(lhs, args)?),
                rhs: Box::new(self.subst_expr_inner(rhs, args)?),
            },
            ExprKind::Paren(inner) => {
                ExprKind::Paren(Box::new(self.subst_expr_inner(inner, args)?))
            }
            ExprKind::Cleanup(inner) => {
                ExprKind::Cleanup(Box::new(self.subst_expr_inner(inner, args)?))
            }
            ExprKind::Member { base, member, call } => {
                return self.subst_member(base, member, *call, args, span);
            }
            ExprKind::SizeOf(ty) => ExprKind::SizeOf(self.subst_type(ty, args, span)?),
            ExprKind::ConceptId(cid) => ExprKind::ConceptId(ConceptId {
                concept: cid.concept.clone(),
                args: self.subst_arg_list(&cid.args, args, span)?,
            }),
            ExprKind::Fold { op, pattern } => {
                return self.expand_fold(*op, pattern, args, span);
            }
            ExprKind::Requires(re) => ExprKind::Requires(self.subst_requires(re, args, span)?),
        };
        Ok(Expr::new(kind, span))
    }

    fn subst_member(
        &mut self,
        base: &Type,
        member: &str,
        call: bool,
        args: &MultiLevelArgList,
        span: Span,
    ) -> SubstResult<Expr> {
        let base = self.subst_type(base, args, span)?;
        if base.is_dependent() {
            return Ok(Expr::new(
                ExprKind::Member {
                    base,
                    member: member.to_string(),
                    call,
                },
                span,
            ));
        }
        let entity = format!("{}::{}{}", base, member, if call { "()" } else { "" });
        let def = match base.strip_ref_and_cv() {
            Type::Struct(def) => def.clone(),
            other => {
                return Err(sfinae(
                    span,
                    entity,
                    format!("type '{}' cannot be used before '::' because it has no members", other),
                ))
            }
        };
        match def.members.get(member) {
            None => Err(sfinae(
                span,
                entity,
                format!("no member named '{}' in '{}'", member, def.name),
            )),
            Some(Member::Type(_)) => Err(sfinae(
                span,
                entity,
                format!("member '{}' of '{}' names a type, not a value", member, def.name),
            )),
            Some(Member::Const(_)) if call => Err(sfinae(
                span,
                entity,
                format!("member '{}' of '{}' is not a function", member, def.name),
            )),
            Some(Member::ConstFn { .. }) if !call => Err(sfinae(
                span,
                entity,
                format!("member function '{}' of '{}' is not a constant", member, def.name),
            )),
            Some(_) => Ok(Expr::new(
                ExprKind::Member {
                    base,
                    member: member.to_string(),
                    call,
                },
                span,
            )),
        }
    }

    pub(crate) fn subst_type(
        &mut self,
        ty: &Type,
        args: &MultiLevelArgList,
        span: Span,
    ) -> SubstResult<Type> {
        match ty {
            Type::Bool | Type::Int | Type::Struct(_) => Ok(ty.clone()),
            Type::Ref(inner) => Ok(Type::reference(self.subst_type(inner, args, span)?)),
            Type::Const(inner) => Ok(Type::constant(self.subst_type(inner, args, span)?)),
            Type::Param(p) => match args.level(p.depth) {
                // Retained or unsupplied scope: the parameter stays dependent.
                None => Ok(ty.clone()),
                Some(level) => match level.get(p.index) {
                    None => Err(SubstError::Hard(SemaError::Internal(format!(
                        "no argument for parameter {} at depth {}",
                        p.index, p.depth
                    )))),
                    Some(TemplateArg::Type(t)) => Ok(t.clone()),
                    Some(other) => Err(SubstError::Hard(SemaError::Internal(format!(
                        "argument '{}' cannot substitute a type parameter",
                        other
                    )))),
                },
            },
            Type::MemberType { base, member } => {
                let base = self.subst_type(base, args, span)?;
                if base.is_dependent() {
                    return Ok(Type::member(base, member.clone()));
                }
                let entity = format!("typename {}::{}", base, member);
                match base.strip_ref_and_cv() {
                    Type::Struct(def) => match def.members.get(member) {
                        Some(Member::Type(t)) => Ok(t.clone()),
                        Some(_) => Err(sfinae(
                            span,
                            entity,
                            format!("member '{}' of '{}' is not a type", member, def.name),
                        )),
                        None => Err(sfinae(
                            span,
                            entity,
                            format!("no member named '{}' in '{}'", member, def.name),
                        )),
                    },
                    other => Err(sfinae(
                        span,
                        entity,
                        format!("type '{}' has no member types", other),
                    )),
                }
            }
        }
    }

    fn subst_arg_list(
        &mut self,
        list: &[TemplateArg],
        args: &MultiLevelArgList,
        span: Span,
    ) -> SubstResult<Vec<TemplateArg>> {
        let mut out = Vec::with_capacity(list.len());
        for arg in list {
            match arg {
                TemplateArg::Type(t) => out.push(TemplateArg::Type(self.subst_type(t, args, span)?)),
                TemplateArg::Value(v) => out.push(TemplateArg::Value(*v)),
                TemplateArg::Pack(elems) => {
                    out.push(TemplateArg::Pack(self.subst_arg_list(elems, args, span)?))
                }
                TemplateArg::Expansion(inner) => {
                    // `X...`: once X resolves to a matched pack, splice its
                    // elements in place of the expansion.
                    if let TemplateArg::Type(Type::Param(p)) = inner.as_ref() {
                        if p.pack {
                            match args.level(p.depth) {
                                None => {
                                    out.push(arg.clone());
                                    continue;
                                }
                                Some(level) => match level.get(p.index) {
                                    Some(TemplateArg::Pack(elems)) => {
                                        out.extend(elems.iter().cloned());
                                        continue;
                                    }
                                    Some(other) => {
                                        return Err(SubstError::Hard(SemaError::Internal(
                                            format!(
                                                "pack expansion of non-pack argument '{}'",
                                                other
                                            ),
                                        )))
                                    }
                                    None => {
                                        return Err(SubstError::Hard(SemaError::Internal(
                                            format!(
                                                "no argument for parameter pack {} at depth {}",
                                                p.index, p.depth
                                            ),
                                        )))
                                    }
                                },
                            }
                        }
                    }
                    let substituted =
                        self.subst_arg_list(std::slice::from_ref(inner.as_ref()), args, span)?;
                    out.extend(
                        substituted
                            .into_iter()
                            .map(|a| TemplateArg::Expansion(Box::new(a))),
                    );
                }
            }
        }
        Ok(out)
    }

    /// Expand a unary fold over its pack into a left-associated chain of
    /// binary operators. An empty pack folds to the operator's identity
    /// (`&&` to true, `||` to false); an unbound pack leaves the fold
    /// dependent.
    fn expand_fold(
        &mut self,
        op: crate::ast::BinaryOp,
        pattern: &Expr,
        args: &MultiLevelArgList,
        span: Span,
    ) -> SubstResult<Expr> {
        let Some((depth, index)) = find_pack_param(pattern) else {
            return Err(SubstError::Hard(SemaError::Internal(
                "fold expression does not reference a parameter pack".into(),
            )));
        };
        let Some(level) = args.level(depth) else {
            // Pack not yet bound; the fold survives substitution untouched
            // modulo its non-pack parts.
            let pattern = self.subst_expr_inner(pattern, args)?;
            return Ok(Expr::new(
                ExprKind::Fold {
                    op,
                    pattern: Box::new(pattern),
                },
                span,
            ));
        };
        let elems = match level.get(index) {
            Some(TemplateArg::Pack(elems)) => elems.clone(),
            Some(other) => {
                return Err(SubstError::Hard(SemaError::Internal(format!(
                    "fold over non-pack argument '{}'",
                    other
                ))))
            }
            None => {
                return Err(SubstError::Hard(SemaError::Internal(format!(
                    "no argument for parameter pack {} at depth {}",
                    index, depth
                ))))
            }
        };
        trace!("expanding fold over {} pack elements", elems.len());
        if elems.is_empty() {
            return match op {
                crate::ast::BinaryOp::LAnd => Ok(Expr::new(ExprKind::BoolLit(true), span)),
                crate::ast::BinaryOp::LOr => Ok(Expr::new(ExprKind::BoolLit(false), span)),
                _ => Err(SubstError::Hard(SemaError::Internal(
                    "empty fold over an operator with no identity".into(),
                ))),
            };
        }
        let mut chain: Option<Expr> = None;
        for elem in &elems {
            let args_for_elem = args.replace_arg(depth, index, elem.clone());
            let instance = self.subst_expr_inner(pattern, &args_for_elem)?;
            chain = Some(match chain {
                None => instance,
                Some(acc) => Expr::new(
                    ExprKind::Binary {
                        op,
                        lhs: Box::new(acc),
                        rhs: Box::new(instance),
                    },
                    span,
                ),
            });
        }
        Ok(chain.expect("non-empty pack produces at least one instance"))
    }

    fn subst_requires(
        &mut self,
        re: &RequiresExpr,
        args: &MultiLevelArgList,
        span: Span,
    ) -> SubstResult<RequiresExpr> {
        let mut requirements = Vec::with_capacity(re.requirements.len());
        for req in &re.requirements {
            requirements.push(self.subst_requirement(req, args, span)?);
        }
        Ok(RequiresExpr::new(requirements))
    }

    /// Instantiate one requirement. A SFINAE failure while substituting the
    /// requirement's expression or type is captured into the requirement
    /// itself: the requirement becomes unsatisfied, the enclosing
    /// `requires`-expression merely evaluates to false.
    fn subst_requirement(
        &mut self,
        req: &Requirement,
        args: &MultiLevelArgList,
        span: Span,
    ) -> SubstResult<Requirement> {
        match req {
            Requirement::Simple(er) | Requirement::Compound(er) => {
                let is_simple = matches!(req, Requirement::Simple(_));
                let return_req = match self.subst_return_req(&er.return_req, args, span) {
                    Ok(rr) => rr,
                    Err(SubstError::Sfinae(d)) => ReturnTypeRequirement::SubstitutionFailure(d),
                    Err(hard) => return Err(hard),
                };
                let value = match &er.value {
                    ExprOrFailure::Failure(d) => {
                        let failed = ExprRequirement {
                            value: ExprOrFailure::Failure(d.clone()),
                            noexcept_span: er.noexcept_span,
                            return_req,
                            status: RequirementStatus::ExprSubstitutionFailure,
                        };
                        return Ok(wrap_expr_requirement(is_simple, failed));
                    }
                    ExprOrFailure::Expr(e) => match self.subst_expr_inner(e, args) {
                        Ok(e) => e,
                        Err(SubstError::Sfinae(d)) => {
                            let failed = ExprRequirement {
                                value: ExprOrFailure::Failure(d),
                                noexcept_span: er.noexcept_span,
                                return_req,
                                status: RequirementStatus::ExprSubstitutionFailure,
                            };
                            return Ok(wrap_expr_requirement(is_simple, failed));
                        }
                        Err(hard) => return Err(hard),
                    },
                };
                let finalized =
                    self.finalize_expr_requirement(value, er.noexcept_span, return_req)?;
                Ok(wrap_expr_requirement(is_simple, finalized))
            }
            Requirement::Type(tr) => match &tr.value {
                TypeOrFailure::Failure(d) => Ok(Requirement::Type(TypeRequirement {
                    value: TypeOrFailure::Failure(d.clone()),
                    status: RequirementStatus::TypeSubstitutionFailure,
                })),
                TypeOrFailure::Type(t) => match self.subst_type(t, args, span) {
                    Ok(t) => {
                        let status = if t.is_dependent() {
                            RequirementStatus::Dependent
                        } else {
                            // A resolved type satisfies its requirement by
                            // existing.
                            RequirementStatus::Satisfied
                        };
                        Ok(Requirement::Type(TypeRequirement {
                            value: TypeOrFailure::Type(t),
                            status,
                        }))
                    }
                    Err(SubstError::Sfinae(d)) => Ok(Requirement::Type(TypeRequirement {
                        value: TypeOrFailure::Failure(d),
                        status: RequirementStatus::TypeSubstitutionFailure,
                    })),
                    Err(hard) => Err(hard),
                },
            },
            Requirement::Nested(nr) => Ok(Requirement::Nested(
                self.instantiate_nested_requirement(&nr.constraint, args)?,
            )),
        }
    }

    fn subst_return_req(
        &mut self,
        rr: &ReturnTypeRequirement,
        args: &MultiLevelArgList,
        span: Span,
    ) -> SubstResult<ReturnTypeRequirement> {
        match rr {
            ReturnTypeRequirement::None => Ok(ReturnTypeRequirement::None),
            ReturnTypeRequirement::SubstitutionFailure(d) => {
                Ok(ReturnTypeRequirement::SubstitutionFailure(d.clone()))
            }
            ReturnTypeRequirement::ExpectedType(t) => Ok(ReturnTypeRequirement::ExpectedType(
                self.subst_type(t, args, span)?,
            )),
            ReturnTypeRequirement::TypeConstraint {
                concept,
                extra_args,
                ..
            } => Ok(ReturnTypeRequirement::TypeConstraint {
                concept: concept.clone(),
                extra_args: self.subst_arg_list(extra_args, args, span)?,
                substituted: None,
            }),
        }
    }

    /// Match a (substituted) template-argument list against a concept's
    /// parameter list, producing the canonical converted argument vector.
    /// The second result is true when the match is instantiation-dependent:
    /// a dependent pack expansion cannot yet be matched against the
    /// parameters, so the caller must treat the whole specialization as
    /// atomic.
    pub fn check_template_argument_list(
        &mut self,
        concept: &ConceptRef,
        _span: Span,
        args: &[TemplateArg],
    ) -> SemaResult<(TemplateArgList, bool)> {
        // Splice expansions of already-matched packs.
        let mut flat: Vec<TemplateArg> = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                TemplateArg::Expansion(inner) => {
                    if let TemplateArg::Pack(elems) = inner.as_ref() {
                        flat.extend(elems.iter().cloned());
                    } else {
                        flat.push(arg.clone());
                    }
                }
                other => flat.push(other.clone()),
            }
        }

        let params = &concept.params;
        let mut converted = TemplateArgList::new();
        let mut next = 0usize;
        for (i, param) in params.params.iter().enumerate() {
            if param.is_pack {
                debug_assert_eq!(i + 1, params.len(), "only a trailing pack is supported");
                converted.push(TemplateArg::Pack(flat[next..].to_vec()));
                next = flat.len();
                break;
            }
            match flat.get(next) {
                None => return Err(SemaError::ArgumentListMismatch(concept.name.clone())),
                Some(TemplateArg::Expansion(inner)) if inner.is_dependent() => {
                    // A dependent `X...` may stand for any number of
                    // arguments; matching must wait for a fuller binding.
                    return Ok((flat, true));
                }
                Some(arg) => {
                    converted.push(arg.clone());
                    next += 1;
                }
            }
        }
        if next != flat.len() {
            return Err(SemaError::ArgumentListMismatch(concept.name.clone()));
        }
        Ok((converted, false))
    }
}

fn wrap_expr_requirement(is_simple: bool, er: ExprRequirement) -> Requirement {
    if is_simple {
        Requirement::Simple(er)
    } else {
        Requirement::Compound(er)
    }
}

/// First pack parameter referenced anywhere in the expression.
fn find_pack_param(expr: &Expr) -> Option<(usize, usize)> {
    fn in_type(ty: &Type) -> Option<(usize, usize)> {
        match ty {
            Type::Bool | Type::Int | Type::Struct(_) => None,
            Type::Param(p) if p.pack => Some((p.depth, p.index)),
            Type::Param(_) => None,
            Type::MemberType { base, .. } => in_type(base),
            Type::Ref(inner) | Type::Const(inner) => in_type(inner),
        }
    }
    fn in_arg(arg: &TemplateArg) -> Option<(usize, usize)> {
        match arg {
            TemplateArg::Type(t) => in_type(t),
            TemplateArg::Value(_) => None,
            TemplateArg::Pack(elems) => elems.iter().find_map(in_arg),
            TemplateArg::Expansion(inner) => in_arg(inner),
        }
    }
    match &expr.kind {
        ExprKind::BoolLit(_) | ExprKind::IntLit(_) => None,
        ExprKind::Binary { lhs, rhs, .. } => find_pack_param(lhs).or_else(|| find_pack_param(rhs)),
        ExprKind::Paren(inner) | ExprKind::Cleanup(inner) => find_pack_param(inner),
        ExprKind::Member { base, .. } => in_type(base),
        ExprKind::SizeOf(ty) => in_type(ty),
        ExprKind::ConceptId(cid) => cid.args.iter().find_map(in_arg),
        ExprKind::Fold { pattern, .. } => find_pack_param(pattern),
        ExprKind::Requires(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{BinaryOp, ParamRef, StructDef, TemplateParamList, Value},
        sema::consteval::EvalOutcome,
    };

    fn t_param() -> Type {
        Type::Param(ParamRef::new(0, 0, "T"))
    }

    fn s_with_f() -> Type {
        StructDef::new("S")
            .with_member(
                "f",
                Member::ConstFn {
                    value: Value::Bool(true),
                    noexcept: true,
                },
            )
            .into_type()
    }

    fn innermost(args: Vec<TemplateArg>) -> MultiLevelArgList {
        MultiLevelArgList::from_innermost(args)
    }

    #[test]
    fn member_call_resolves_against_bound_struct() {
        let mut sema = Sema::new();
        let expr = Expr::member_call(t_param(), "f");
        let args = innermost(vec![TemplateArg::Type(s_with_f())]);
        let substituted = sema.subst_expr(&expr, &args).unwrap();
        assert!(!substituted.is_dependent());
        assert_eq!(
            sema.evaluate_as_rvalue(&substituted).unwrap(),
            EvalOutcome::Value(Value::Bool(true))
        );
        assert_eq!(sema.metrics.substitutions, 1);
    }

    #[test]
    fn missing_member_is_a_soft_failure() {
        let mut sema = Sema::new();
        let expr = Expr::member_call(t_param(), "f");
        let args = innermost(vec![TemplateArg::Type(StructDef::new("Empty").into_type())]);
        match sema.subst_expr(&expr, &args) {
            Err(SubstError::Sfinae(d)) => {
                assert!(d.message.contains("no member named 'f'"));
                assert_eq!(d.entity, "Empty::f()");
            }
            other => panic!("expected SFINAE failure, got {:?}", other.map(|e| e.to_string())),
        }
        // Soft failures emit nothing.
        assert!(sema.diags.diagnostics().is_empty());
    }

    #[test]
    fn unbound_levels_leave_the_expression_dependent() {
        let mut sema = Sema::new();
        // Depth 1 is not supplied: only the outer level is bound.
        let inner = Type::Param(ParamRef::new(1, 0, "U"));
        let expr = Expr::member_call(inner, "f");
        let mut args = MultiLevelArgList::from_innermost(vec![TemplateArg::Type(s_with_f())]);
        args.add_outer_retained_level();
        // level(1) resolves to the supplied list; use depth 2 to stay unbound.
        let deeper = Expr::member_call(Type::Param(ParamRef::new(2, 0, "V")), "f");
        let substituted = sema.subst_expr(&deeper, &args).unwrap();
        assert!(substituted.is_dependent());
        let bound = sema.subst_expr(&expr, &args).unwrap();
        assert!(!bound.is_dependent());
    }

    #[test]
    fn fold_expands_left_associated() {
        let mut sema = Sema::new();
        let pack = Type::Param(ParamRef::pack(0, 0, "Ts"));
        let fold = Expr::fold(BinaryOp::LAnd, Expr::member_call(pack, "f"));
        let g = StructDef::new("G")
            .with_member(
                "f",
                Member::ConstFn {
                    value: Value::Bool(true),
                    noexcept: true,
                },
            )
            .into_type();
        let args = innermost(vec![TemplateArg::Pack(vec![
            TemplateArg::Type(g.clone()),
            TemplateArg::Type(g.clone()),
            TemplateArg::Type(g),
        ])]);
        let expanded = sema.subst_expr(&fold, &args).unwrap();
        assert_eq!(expanded.to_string(), "G::f() && G::f() && G::f()");

        let empty = innermost(vec![TemplateArg::Pack(vec![])]);
        let expanded = sema.subst_expr(&fold, &empty).unwrap();
        assert!(matches!(expanded.kind, ExprKind::BoolLit(true)));

        let or_fold = Expr::fold(
            BinaryOp::LOr,
            Expr::member_call(Type::Param(ParamRef::pack(0, 0, "Ts")), "f"),
        );
        let expanded = sema.subst_expr(&or_fold, &empty).unwrap();
        assert!(matches!(expanded.kind, ExprKind::BoolLit(false)));
    }

    #[test]
    fn pack_expansion_splices_into_argument_lists() {
        let mut sema = Sema::new();
        let concept = crate::ast::ConceptDecl::new(
            "C",
            TemplateParamList::types(&["A", "B"]),
            Expr::bool_lit(true),
        );
        let cid = Expr::concept_id(
            concept,
            vec![TemplateArg::expansion(TemplateArg::Type(Type::Param(
                ParamRef::pack(0, 0, "Ts"),
            )))],
        );
        let args = innermost(vec![TemplateArg::Pack(vec![
            TemplateArg::Type(Type::Int),
            TemplateArg::Type(Type::Bool),
        ])]);
        let substituted = sema.subst_expr(&cid, &args).unwrap();
        match &substituted.kind {
            ExprKind::ConceptId(c) => {
                assert_eq!(
                    c.args,
                    vec![TemplateArg::Type(Type::Int), TemplateArg::Type(Type::Bool)]
                );
            }
            other => panic!("expected concept-id, got {:?}", other),
        }
    }

    #[test]
    fn argument_list_matching_handles_packs_and_arity() {
        let mut sema = Sema::new();
        let fixed = crate::ast::ConceptDecl::new(
            "Fixed",
            TemplateParamList::types(&["A", "B"]),
            Expr::bool_lit(true),
        );
        let (converted, dependent) = sema
            .check_template_argument_list(
                &fixed,
                Span::default(),
                &[TemplateArg::Type(Type::Int), TemplateArg::Type(Type::Bool)],
            )
            .unwrap();
        assert!(!dependent);
        assert_eq!(converted.len(), 2);

        // A dependent expansion cannot be matched against a fixed arity.
        let expansion = TemplateArg::expansion(TemplateArg::Type(Type::Param(ParamRef::pack(
            0, 0, "Ts",
        ))));
        let (_, dependent) = sema
            .check_template_argument_list(&fixed, Span::default(), &[expansion])
            .unwrap();
        assert!(dependent);

        // Arity mismatch is a hard error.
        assert!(sema
            .check_template_argument_list(&fixed, Span::default(), &[TemplateArg::Type(Type::Int)])
            .is_err());

        // A trailing pack parameter absorbs the remaining arguments.
        let variadic = crate::ast::ConceptDecl::new(
            "Variadic",
            TemplateParamList::pack("Ts"),
            Expr::bool_lit(true),
        );
        let (converted, dependent) = sema
            .check_template_argument_list(
                &variadic,
                Span::default(),
                &[TemplateArg::Type(Type::Int), TemplateArg::Type(Type::Bool)],
            )
            .unwrap();
        assert!(!dependent);
        assert_eq!(converted.len(), 1);
        assert!(matches!(&converted[0], TemplateArg::Pack(elems) if elems.len() == 2));
    }
}
