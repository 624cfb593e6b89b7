//! The constraint engine.
//!
//! [`Sema`] is the per-compilation context: it owns the diagnostic engine,
//! the satisfaction and subsumption caches, the instantiation stack, and the
//! evaluation metrics. The decision procedures live in submodules and hang
//! off `Sema` as methods:
//!
//! - well-formedness of constraint expressions ([`wellformed`])
//! - satisfaction evaluation with caching ([`satisfaction`])
//! - requirement instantiation and statuses ([`requirement`])
//! - normalization to atomic constraints ([`normalize`])
//! - CNF/DNF, subsumption, and ambiguity detection ([`subsumption`])
//! - rendering of unsatisfied constraints ([`diagnose`])

pub mod consteval;
pub mod diagnose;
pub mod error;
pub mod instantiate;
pub mod normalize;
pub mod requirement;
pub mod satisfaction;
pub mod subst;
pub mod subsumption;
pub mod wellformed;

#[cfg(test)]
pub(crate) mod tests;

use std::collections::HashMap;

pub use consteval::{CanThrow, Conversion, EvalOutcome};
pub use error::{SemaError, SemaResult};
pub use instantiate::{InstantiationFrame, InstantiationKind};
pub use normalize::{AtomicConstraint, CompoundKind, NormalizedConstraint};
pub use satisfaction::{Satisfaction, SatisfactionFlags, UnsatisfiedCause, UnsatisfiedConstraintRecord};
pub use subst::{SubstError, SubstResult};
pub use subsumption::NormalForm;

use crate::{
    ast::{DeclId, TemplateArgList},
    diag::DiagnosticEngine,
};

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct Params {
    pub instantiation_depth_limit: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            instantiation_depth_limit: 1024,
        }
    }
}

/// Counters observable by callers and tests: they make short-circuiting and
/// cache soundness externally checkable without instrumenting substitution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SemaMetrics {
    /// Atomic substitutions performed.
    pub substitutions: u64,
    pub satisfaction_cache_hits: u64,
    pub satisfaction_cache_misses: u64,
    /// Clauses produced while building conjunctive/disjunctive normal forms.
    pub normal_form_clauses: u64,
}

pub(crate) type SatisfactionKey = (DeclId, TemplateArgList);

/// The per-compilation semantic context. Single-threaded; both caches are
/// append-only with find-or-insert semantics.
pub struct Sema {
    pub params: Params,
    pub diags: DiagnosticEngine,
    pub metrics: SemaMetrics,
    pub(crate) satisfaction_cache: HashMap<SatisfactionKey, Satisfaction>,
    pub(crate) subsumption_cache: HashMap<(DeclId, DeclId), bool>,
    pub(crate) instantiation_stack: Vec<InstantiationFrame>,
}

impl Sema {
    pub fn new() -> Self {
        Self::with_params(Params::default())
    }

    pub fn with_params(params: Params) -> Self {
        Self {
            params,
            diags: DiagnosticEngine::new(),
            metrics: SemaMetrics::default(),
            satisfaction_cache: HashMap::new(),
            subsumption_cache: HashMap::new(),
            instantiation_stack: Vec::new(),
        }
    }

    /// Run `f` with diagnostic emission suppressed. Returns `f`'s result and
    /// whether any error was trapped inside the scope. Traps nest.
    pub fn with_sfinae_trap<R>(&mut self, f: impl FnOnce(&mut Sema) -> R) -> (R, bool) {
        let watermark = self.diags.push_suppression();
        let result = f(self);
        let trapped = self.diags.pop_suppression(watermark);
        (result, trapped)
    }

    /// Number of satisfaction records memoized so far.
    pub fn satisfaction_cache_len(&self) -> usize {
        self.satisfaction_cache.len()
    }

    /// Whether a satisfaction record is cached for `(owner, args)`.
    pub fn satisfaction_cached(&self, owner: DeclId, args: &TemplateArgList) -> bool {
        self.satisfaction_cache
            .contains_key(&(owner, args.clone()))
    }
}

impl Default for Sema {
    fn default() -> Self {
        Self::new()
    }
}
