//! Semantic engine for C++20 concepts and constraints.
//!
//! This crate decides whether a set of template arguments *satisfies* the
//! constraints attached to a template, and whether one declaration is *at
//! least as constrained as* another (the subsumption partial order used to
//! disambiguate overloads and specializations). It also carries the
//! diagnostic surface that explains why a constraint was not satisfied.
//!
//! The three pillars, each with its own failure semantics:
//! - **Satisfaction** ([`sema::satisfaction`]): short-circuiting evaluation
//!   of constraint expressions under template-argument substitution, where a
//!   substitution failure in an immediate context means *unsatisfied*
//!   (SFINAE), not an error. Memoized per declaration and argument list.
//! - **Normalization and subsumption** ([`sema::normalize`],
//!   [`sema::subsumption`]): constraints are lowered to atomic leaves with
//!   captured parameter mappings, converted to disjunctive/conjunctive
//!   normal forms, and compared clause by clause.
//! - **Diagnosis** ([`sema::diagnose`]): an unsatisfied record is walked in
//!   evaluation order to point at the exact atomic clause that failed.
//!
//! Everything runs inside a [`sema::Sema`] context, which owns the caches,
//! the instantiation stack, the diagnostic engine, and the metrics.

pub mod ast;
pub mod diag;
pub mod sema;
