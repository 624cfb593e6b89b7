//! Status computation for instantiated requirements.
//!
//! Substitution (see [`subst`](crate::sema::subst)) produces requirement
//! nodes whose expressions and types are concrete; the functions here decide
//! each requirement's definitive [`RequirementStatus`]: `noexcept` analysis,
//! return-type conversion, type-constraint satisfaction, and nested
//! constraint checking.

use crate::{
    ast::{
        require::{ExprOrFailure, ExprRequirement, NestedRequirement, ReturnTypeRequirement},
        ConceptId, Expr, MultiLevelArgList, RequirementStatus, Span, TemplateArg,
    },
    sema::{
        consteval::{CanThrow, Conversion},
        error::SemaResult,
        Sema,
    },
};

impl Sema {
    /// Compute the status of a simple or compound requirement whose
    /// expression substituted successfully.
    pub(crate) fn finalize_expr_requirement(
        &mut self,
        value: Expr,
        noexcept_span: Option<Span>,
        mut return_req: ReturnTypeRequirement,
    ) -> SemaResult<ExprRequirement> {
        let dependent = value.is_dependent() || return_req.is_dependent();
        let status = if dependent {
            RequirementStatus::Dependent
        } else if noexcept_span.is_some() && self.can_throw(&value) == CanThrow::Can {
            RequirementStatus::NoexceptNotMet
        } else {
            self.calculate_return_type_satisfaction(&value, &mut return_req)?
        };
        Ok(ExprRequirement {
            value: ExprOrFailure::Expr(Box::new(value)),
            noexcept_span,
            return_req,
            status,
        })
    }

    fn calculate_return_type_satisfaction(
        &mut self,
        expr: &Expr,
        return_req: &mut ReturnTypeRequirement,
    ) -> SemaResult<RequirementStatus> {
        match return_req {
            ReturnTypeRequirement::None => Ok(RequirementStatus::Satisfied),
            ReturnTypeRequirement::SubstitutionFailure(_) => {
                Ok(RequirementStatus::TypeSubstitutionFailure)
            }
            ReturnTypeRequirement::ExpectedType(expected) => {
                let found = self.type_of(expr)?;
                match self.check_conversion(&found, expected) {
                    Conversion::Ambiguous => Ok(RequirementStatus::ConversionAmbiguous),
                    Conversion::Failed => Ok(RequirementStatus::NoConversion),
                    Conversion::Ok => Ok(RequirementStatus::Satisfied),
                }
            }
            ReturnTypeRequirement::TypeConstraint {
                concept,
                extra_args,
                substituted,
            } => {
                // [expr.prim.req]p1.3.3: the immediately-declared constraint
                // of decltype((E)) must be satisfied.
                let matched = self.type_of(expr)?;
                let mut args = Vec::with_capacity(1 + extra_args.len());
                args.push(TemplateArg::Type(matched));
                args.extend(extra_args.iter().cloned());
                let cid = ConceptId {
                    concept: concept.clone(),
                    args,
                };
                let satisfaction = self.check_concept_id(&cid, expr.span)?;
                *substituted = Some(Box::new(Expr::new(
                    crate::ast::ExprKind::ConceptId(cid),
                    expr.span,
                )));
                if satisfaction.is_satisfied {
                    Ok(RequirementStatus::Satisfied)
                } else {
                    Ok(RequirementStatus::ConstraintsNotSatisfied)
                }
            }
        }
    }

    /// Instantiate a nested requirement: run the satisfaction evaluator on
    /// its constraint immediately and memoize the record on the node.
    pub(crate) fn instantiate_nested_requirement(
        &mut self,
        constraint: &Expr,
        args: &MultiLevelArgList,
    ) -> SemaResult<NestedRequirement> {
        let (satisfaction, flags) = self.check_nested_satisfaction(constraint, args)?;
        let status = if flags.is_dependent {
            RequirementStatus::Dependent
        } else if satisfaction.is_satisfied {
            RequirementStatus::Satisfied
        } else {
            RequirementStatus::ConstraintsNotSatisfied
        };
        Ok(NestedRequirement {
            constraint: Box::new(constraint.clone()),
            satisfaction: Some(satisfaction),
            dependent: flags.is_dependent,
            contains_unexpanded_pack: flags.contains_unexpanded_pack,
            status,
        })
    }
}
