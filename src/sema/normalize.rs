//! Constraint normalization (`[temp.constr.normal]`).
//!
//! Lowers a constraint expression into a tree whose leaves are atomic
//! constraints carrying the parameter mapping captured at their point of
//! normalization. Concept references are expanded by substituting the
//! current mapping into the reference and recursing into the named concept's
//! constraint with the converted arguments as the next mapping level.
//!
//! `None` signals *ill-formed, no diagnostic required*.

use std::sync::Arc;

use log::trace;

use crate::{
    ast::{
        ConstrainedDecl, Expr, ExprKind, MultiLevelArgList, TemplateArgList, TemplateDecl,
    },
    sema::{instantiate::InstantiationKind, Sema},
};

/// A leaf of the normalized tree: the atomic expression plus the innermost
/// template-argument list captured when the atom was formed.
///
/// Leaves are shared behind `Arc` so that their identity is stable while
/// normal forms are built from the same tree.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicConstraint {
    pub expr: Expr,
    pub mapping: TemplateArgList,
}

impl AtomicConstraint {
    /// The structural subsumption predicate: both atoms originate from the
    /// same source expression and their parameter mappings match pointwise.
    /// Textually identical expressions from different declarations are
    /// distinct atoms.
    pub fn subsumes(&self, other: &AtomicConstraint) -> bool {
        self.expr.id == other.expr.id && self.has_matching_parameter_mapping(other)
    }

    pub fn has_matching_parameter_mapping(&self, other: &AtomicConstraint) -> bool {
        self.mapping == other.mapping
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundKind {
    Conjunction,
    Disjunction,
}

/// A normalized constraint: atomic leaves joined by conjunction/disjunction.
/// Leaves contain no logical connectives, concept references, or parens.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedConstraint {
    Atomic(Arc<AtomicConstraint>),
    Compound {
        kind: CompoundKind,
        lhs: Box<NormalizedConstraint>,
        rhs: Box<NormalizedConstraint>,
    },
}

impl NormalizedConstraint {
    pub fn atomic(expr: Expr, mapping: TemplateArgList) -> Self {
        NormalizedConstraint::Atomic(Arc::new(AtomicConstraint { expr, mapping }))
    }

    pub fn compound(kind: CompoundKind, lhs: NormalizedConstraint, rhs: NormalizedConstraint) -> Self {
        NormalizedConstraint::Compound {
            kind,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, NormalizedConstraint::Atomic(_))
    }
}

impl Sema {
    /// Normalize the associated constraints of a declaration under its
    /// enclosing template arguments.
    pub fn normalized_associated_constraints(
        &mut self,
        decl: &TemplateDecl,
    ) -> Option<NormalizedConstraint> {
        self.normalize_constraint_exprs(
            decl.decl_name(),
            &decl.associated_constraints,
            &decl.enclosing_args,
        )
    }

    /// Normalize a sequence of constraint expressions: a left-associated
    /// conjunction of the normal forms of each.
    pub fn normalize_constraint_exprs(
        &mut self,
        entity: &str,
        exprs: &[Expr],
        mapping: &MultiLevelArgList,
    ) -> Option<NormalizedConstraint> {
        let (first, rest) = exprs.split_first()?;
        let mut acc = self.normalize_expr(entity, first, mapping)?;
        for expr in rest {
            let next = self.normalize_expr(entity, expr, mapping)?;
            acc = NormalizedConstraint::compound(CompoundKind::Conjunction, acc, next);
        }
        Some(acc)
    }

    fn normalize_expr(
        &mut self,
        entity: &str,
        expr: &Expr,
        mapping: &MultiLevelArgList,
    ) -> Option<NormalizedConstraint> {
        match &expr.kind {
            ExprKind::Paren(inner) | ExprKind::Cleanup(inner) => {
                self.normalize_expr(entity, inner, mapping)
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_logical() => {
                let lhs = self.normalize_expr(entity, lhs, mapping)?;
                let rhs = self.normalize_expr(entity, rhs, mapping)?;
                let kind = if *op == crate::ast::BinaryOp::LAnd {
                    CompoundKind::Conjunction
                } else {
                    CompoundKind::Disjunction
                };
                Some(NormalizedConstraint::compound(kind, lhs, rhs))
            }
            ExprKind::ConceptId(_) => self.normalize_concept_id(entity, expr, mapping),
            _ => {
                trace!("atomic leaf: {}", expr);
                Some(NormalizedConstraint::atomic(
                    expr.clone(),
                    mapping.innermost().cloned().unwrap_or_default(),
                ))
            }
        }
    }

    /// Expand a concept reference `C<A...>`: substitute the current mapping
    /// into the reference, convert the resulting argument list against `C`'s
    /// parameters, and recurse into `C`'s constraint with the converted
    /// arguments as the next mapping. An argument list that cannot yet be
    /// matched (a dependent pack expansion against a fixed arity) leaves the
    /// whole reference as one atomic leaf.
    fn normalize_concept_id(
        &mut self,
        entity: &str,
        expr: &Expr,
        mapping: &MultiLevelArgList,
    ) -> Option<NormalizedConstraint> {
        let expand = |sema: &mut Sema| -> Option<NormalizedConstraint> {
            let substituted = match sema.subst_expr(expr, mapping) {
                Ok(e) => e,
                // [temp.constr.normal]: an invalid substitution here makes
                // the program ill-formed, no diagnostic required.
                Err(_) => return None,
            };
            let cid = match &substituted.kind {
                ExprKind::ConceptId(cid) => cid,
                _ => return None,
            };
            let (converted, instantiation_dependent) = sema
                .check_template_argument_list(&cid.concept, expr.span, &cid.args)
                .ok()?;
            if instantiation_dependent {
                trace!("concept reference kept atomic: {}", expr);
                return Some(NormalizedConstraint::atomic(expr.clone(), converted));
            }
            let next_mapping = MultiLevelArgList::from_innermost(converted);
            let constraint = cid.concept.constraint.clone();
            let name = cid.concept.name.clone();
            sema.normalize_expr(&name, &constraint, &next_mapping)
        };

        if mapping.is_empty() {
            expand(self)
        } else {
            // The frame spans the recursive expansion, so runaway concept
            // recursion is cut off by the depth limit (and surfaces as
            // ill-formed, no diagnostic required).
            self.with_instantiation(
                InstantiationKind::ConstraintNormalization,
                expr.span,
                entity,
                |sema| Ok(expand(sema)),
            )
            .ok()
            .flatten()
        }
    }
}
