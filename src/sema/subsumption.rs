//! Partial ordering by constraints (`[temp.constr.order]`).
//!
//! `P` subsumes `Q` iff, with `P` in disjunctive normal form and `Q` in
//! conjunctive normal form, every disjunctive clause of `P` subsumes every
//! conjunctive clause of `Q` — where a clause subsumes a clause when some
//! atom of the former subsumes some atom of the latter under the supplied
//! leaf predicate.

use std::{cell::RefCell, sync::Arc};

use itertools::Itertools;
use log::{debug, trace};

use crate::{
    ast::{Expr, TemplateDecl},
    sema::{
        error::SemaResult,
        normalize::{AtomicConstraint, CompoundKind, NormalizedConstraint},
        Sema, SemaError,
    },
};

/// A normal form over shared atomic-constraint leaves. The outer level is a
/// conjunction for CNF and a disjunction for DNF; the inner level is the
/// dual.
pub type NormalForm = Vec<Vec<Arc<AtomicConstraint>>>;

/// Conjunctive normal form: a conjunction of disjunctive clauses.
pub fn make_cnf(normalized: &NormalizedConstraint) -> NormalForm {
    match normalized {
        NormalizedConstraint::Atomic(atom) => vec![vec![atom.clone()]],
        NormalizedConstraint::Compound { kind, lhs, rhs } => {
            let lhs = make_cnf(lhs);
            let rhs = make_cnf(rhs);
            match kind {
                CompoundKind::Conjunction => concat_clauses(lhs, rhs),
                CompoundKind::Disjunction => distribute(lhs, rhs),
            }
        }
    }
}

/// Disjunctive normal form: a disjunction of conjunctive clauses.
pub fn make_dnf(normalized: &NormalizedConstraint) -> NormalForm {
    match normalized {
        NormalizedConstraint::Atomic(atom) => vec![vec![atom.clone()]],
        NormalizedConstraint::Compound { kind, lhs, rhs } => {
            let lhs = make_dnf(lhs);
            let rhs = make_dnf(rhs);
            match kind {
                CompoundKind::Disjunction => concat_clauses(lhs, rhs),
                CompoundKind::Conjunction => distribute(lhs, rhs),
            }
        }
    }
}

fn concat_clauses(mut lhs: NormalForm, rhs: NormalForm) -> NormalForm {
    lhs.extend(rhs);
    lhs
}

/// The distributive step: the Cartesian product of the two clause lists,
/// concatenating each pair. Worst case exponential, as the standard accepts.
fn distribute(lhs: NormalForm, rhs: NormalForm) -> NormalForm {
    lhs.iter()
        .cartesian_product(rhs.iter())
        .map(|(l, r)| l.iter().chain(r.iter()).cloned().collect())
        .collect()
}

impl Sema {
    /// Does `p` subsume `q` under leaf predicate `e`?
    pub(crate) fn subsumes(
        &mut self,
        p: &NormalizedConstraint,
        q: &NormalizedConstraint,
        e: impl Fn(&AtomicConstraint, &AtomicConstraint) -> bool,
    ) -> bool {
        let p_dnf = make_dnf(p);
        let q_cnf = make_cnf(q);
        self.metrics.normal_form_clauses += (p_dnf.len() + q_cnf.len()) as u64;
        trace!(
            "subsumption: {} DNF clauses against {} CNF clauses",
            p_dnf.len(),
            q_cnf.len()
        );
        p_dnf.iter().all(|pi| {
            q_cnf
                .iter()
                .all(|qj| pi.iter().any(|a| qj.iter().any(|b| e(a, b))))
        })
    }

    /// The partial order consulted by overload ranking: is `d1` (with
    /// associated constraints `ac1`) at least as constrained as `d2`? A
    /// declaration without constraints is subsumed by anything.
    ///
    /// `Err` means the procedure itself failed (normalization of an
    /// ill-formed constraint), which is distinct from "not subsumed".
    pub fn is_at_least_as_constrained(
        &mut self,
        d1: &TemplateDecl,
        ac1: &[Expr],
        d2: &TemplateDecl,
        ac2: &[Expr],
    ) -> SemaResult<bool> {
        if ac1.is_empty() {
            return Ok(ac2.is_empty());
        }
        if ac2.is_empty() {
            // D1 has associated constraints and D2 does not.
            return Ok(true);
        }

        let key = (d1.id, d2.id);
        if let Some(&cached) = self.subsumption_cache.get(&key) {
            debug!("subsumption cache hit for ({}, {})", d1.name, d2.name);
            return Ok(cached);
        }

        let n1 = self
            .normalize_constraint_exprs(&d1.name, ac1, &d1.enclosing_args)
            .ok_or(SemaError::NormalizationFailure)?;
        let n2 = self
            .normalize_constraint_exprs(&d2.name, ac2, &d2.enclosing_args)
            .ok_or(SemaError::NormalizationFailure)?;

        let subsumes = self.subsumes(&n1, &n2, |a, b| a.subsumes(b));
        debug!(
            "'{}' is{} at least as constrained as '{}'",
            d1.name,
            if subsumes { "" } else { " not" },
            d2.name
        );
        self.subsumption_cache.entry(key).or_insert(subsumes);
        Ok(subsumes)
    }

    /// Detect the unspecified-ambiguity case: atoms that are textually
    /// identical but originate from different declarations. Runs subsumption
    /// in both directions under the structural predicate and again under
    /// profile equality; when the mutual outcomes differ, the diverging atom
    /// pair is reported with two notes and `true` is returned.
    pub fn maybe_emit_ambiguous_atomic_constraints_diagnostic(
        &mut self,
        d1: &TemplateDecl,
        ac1: &[Expr],
        d2: &TemplateDecl,
        ac2: &[Expr],
    ) -> bool {
        if ac1.is_empty() || ac2.is_empty() {
            return false;
        }

        let ambiguous: RefCell<Option<(Expr, Expr)>> = RefCell::new(None);
        // The subsumption checks may emit diagnostics of their own; trap
        // them.
        let (outcomes, _trapped) = self.with_sfinae_trap(|sema| {
            let n1 = sema.normalize_constraint_exprs(&d1.name, ac1, &d1.enclosing_args)?;
            let n2 = sema.normalize_constraint_exprs(&d2.name, ac2, &d2.enclosing_args)?;

            let structural = |a: &AtomicConstraint, b: &AtomicConstraint| a.subsumes(b);
            let identical = |a: &AtomicConstraint, b: &AtomicConstraint| {
                if !a.expr.profile_eq(&b.expr) {
                    return false;
                }
                if !a.subsumes(b) {
                    // Profile equality fired where the structural predicate
                    // would not: a candidate ambiguity.
                    *ambiguous.borrow_mut() = Some((a.expr.clone(), b.expr.clone()));
                }
                true
            };

            let forward_structural = sema.subsumes(&n1, &n2, structural);
            let backward_structural = sema.subsumes(&n2, &n1, structural);
            let forward_identical = sema.subsumes(&n1, &n2, &identical);
            let backward_identical = sema.subsumes(&n2, &n1, &identical);
            Some((
                forward_structural,
                backward_structural,
                forward_identical,
                backward_identical,
            ))
        });

        let Some((fs, bs, fi, bi)) = outcomes else {
            // Ill-formed constraints; nothing to report here.
            return false;
        };
        if fs == fi && bs == bi {
            // Same mutual outcome: no ambiguity caused by identical atoms.
            return false;
        }
        let Some((first, second)) = ambiguous.into_inner() else {
            return false;
        };
        self.diags.note(
            first.span,
            format!(
                "similar constraint expressions not considered equivalent; constraint '{}' \
                 cannot be considered equivalent to a constraint from a different declaration",
                first
            ),
        );
        self.diags.note(
            second.span,
            format!("similar constraint expression here: '{}'", second),
        );
        true
    }
}
