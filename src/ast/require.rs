//! The four requirement kinds of a `requires`-expression.
//!
//! Requirement nodes built while constructing an AST are *undetermined*
//! (status [`RequirementStatus::Dependent`]); substituting the enclosing
//! `requires`-expression instantiates each requirement and computes its
//! definitive status.

use std::fmt;

use crate::{
    ast::{
        args::TemplateArg,
        decl::ConceptRef,
        ty::Type,
        Expr, Span,
    },
    diag::SubstitutionDiagnostic,
    sema::Satisfaction,
};

/// Why a requirement is (or is not) satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementStatus {
    Dependent,
    Satisfied,
    ExprSubstitutionFailure,
    TypeSubstitutionFailure,
    NoexceptNotMet,
    ConversionAmbiguous,
    NoConversion,
    ConstraintsNotSatisfied,
}

/// An expression, or the record of the substitution failure that consumed it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprOrFailure {
    Expr(Box<Expr>),
    Failure(SubstitutionDiagnostic),
}

/// A type, or the record of the substitution failure that consumed it.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeOrFailure {
    Type(Type),
    Failure(SubstitutionDiagnostic),
}

/// The trailing requirement of a compound requirement: `{ E } -> ...`.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnTypeRequirement {
    None,
    /// `-> T`: the expression must be convertible to `T`.
    ExpectedType(Type),
    /// `-> C<Args...>`: `decltype(E)` must satisfy the concept, bound as the
    /// concept's first argument. `substituted` caches the checked
    /// concept-specialization for diagnosis.
    TypeConstraint {
        concept: ConceptRef,
        extra_args: Vec<TemplateArg>,
        substituted: Option<Box<Expr>>,
    },
    SubstitutionFailure(SubstitutionDiagnostic),
}

impl ReturnTypeRequirement {
    pub fn is_empty(&self) -> bool {
        matches!(self, ReturnTypeRequirement::None)
    }

    pub fn is_dependent(&self) -> bool {
        match self {
            ReturnTypeRequirement::None | ReturnTypeRequirement::SubstitutionFailure(_) => false,
            ReturnTypeRequirement::ExpectedType(t) => t.is_dependent(),
            ReturnTypeRequirement::TypeConstraint { extra_args, .. } => {
                extra_args.iter().any(TemplateArg::is_dependent)
            }
        }
    }

    pub fn contains_unexpanded_pack(&self) -> bool {
        match self {
            ReturnTypeRequirement::None | ReturnTypeRequirement::SubstitutionFailure(_) => false,
            ReturnTypeRequirement::ExpectedType(t) => t.contains_unexpanded_pack(),
            ReturnTypeRequirement::TypeConstraint { extra_args, .. } => {
                extra_args.iter().any(TemplateArg::contains_unexpanded_pack)
            }
        }
    }
}

/// A simple (`E;`) or compound (`{ E } noexcept -> R;`) requirement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprRequirement {
    pub value: ExprOrFailure,
    /// Location of the `noexcept` keyword, when written.
    pub noexcept_span: Option<Span>,
    pub return_req: ReturnTypeRequirement,
    pub status: RequirementStatus,
}

/// A type requirement: `typename T::type;`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRequirement {
    pub value: TypeOrFailure,
    pub status: RequirementStatus,
}

/// A nested requirement: `requires C;`. Carries its own satisfaction record
/// once instantiated.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedRequirement {
    pub constraint: Box<Expr>,
    pub satisfaction: Option<Satisfaction>,
    pub dependent: bool,
    pub contains_unexpanded_pack: bool,
    pub status: RequirementStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Requirement {
    Simple(ExprRequirement),
    Compound(ExprRequirement),
    Type(TypeRequirement),
    Nested(NestedRequirement),
}

impl Requirement {
    pub fn simple(expr: Expr) -> Self {
        Requirement::Simple(ExprRequirement {
            value: ExprOrFailure::Expr(Box::new(expr)),
            noexcept_span: None,
            return_req: ReturnTypeRequirement::None,
            status: RequirementStatus::Dependent,
        })
    }

    pub fn compound(expr: Expr, noexcept_span: Option<Span>, return_req: ReturnTypeRequirement) -> Self {
        Requirement::Compound(ExprRequirement {
            value: ExprOrFailure::Expr(Box::new(expr)),
            noexcept_span,
            return_req,
            status: RequirementStatus::Dependent,
        })
    }

    pub fn type_req(ty: Type) -> Self {
        Requirement::Type(TypeRequirement {
            value: TypeOrFailure::Type(ty),
            status: RequirementStatus::Dependent,
        })
    }

    pub fn nested(constraint: Expr) -> Self {
        Requirement::Nested(NestedRequirement {
            constraint: Box::new(constraint),
            satisfaction: None,
            dependent: true,
            contains_unexpanded_pack: false,
            status: RequirementStatus::Dependent,
        })
    }

    pub fn status(&self) -> RequirementStatus {
        match self {
            Requirement::Simple(r) | Requirement::Compound(r) => r.status,
            Requirement::Type(r) => r.status,
            Requirement::Nested(r) => r.status,
        }
    }

    pub fn is_dependent(&self) -> bool {
        self.status() == RequirementStatus::Dependent
    }

    pub fn is_satisfied(&self) -> bool {
        self.status() == RequirementStatus::Satisfied
    }

    pub fn contains_unexpanded_pack(&self) -> bool {
        match self {
            Requirement::Simple(r) | Requirement::Compound(r) => {
                let expr_pack = match &r.value {
                    ExprOrFailure::Expr(e) => e.contains_unexpanded_pack(),
                    ExprOrFailure::Failure(_) => false,
                };
                expr_pack || r.return_req.contains_unexpanded_pack()
            }
            Requirement::Type(r) => match &r.value {
                TypeOrFailure::Type(t) => t.contains_unexpanded_pack(),
                TypeOrFailure::Failure(_) => false,
            },
            Requirement::Nested(r) => r.contains_unexpanded_pack,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Simple(r) => match &r.value {
                ExprOrFailure::Expr(e) => write!(f, "{};", e),
                ExprOrFailure::Failure(d) => write!(f, "<invalid: {}>;", d.entity),
            },
            Requirement::Compound(r) => {
                match &r.value {
                    ExprOrFailure::Expr(e) => write!(f, "{{ {} }}", e)?,
                    ExprOrFailure::Failure(d) => write!(f, "{{ <invalid: {}> }}", d.entity)?,
                }
                if r.noexcept_span.is_some() {
                    write!(f, " noexcept")?;
                }
                match &r.return_req {
                    ReturnTypeRequirement::None => {}
                    ReturnTypeRequirement::ExpectedType(t) => write!(f, " -> {}", t)?,
                    ReturnTypeRequirement::TypeConstraint { concept, .. } => {
                        write!(f, " -> {}", concept)?
                    }
                    ReturnTypeRequirement::SubstitutionFailure(d) => {
                        write!(f, " -> <invalid: {}>", d.entity)?
                    }
                }
                write!(f, ";")
            }
            Requirement::Type(r) => match &r.value {
                TypeOrFailure::Type(t) => write!(f, "typename {};", t),
                TypeOrFailure::Failure(d) => write!(f, "typename <invalid: {}>;", d.entity),
            },
            Requirement::Nested(r) => write!(f, "requires {};", r.constraint),
        }
    }
}
