//! The constraint-expression AST: a read-only projection of the expression
//! forms the constraint engine cares about. Logical `&&`/`||`, parens and
//! cleanup wrappers, concept references, and `requires`-expressions are
//! structural; everything else is an atomic constraint.

pub mod args;
pub mod decl;
pub mod require;
pub mod ty;

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use itertools::Itertools;
use serde::Serialize;

pub use args::{MultiLevelArgList, TemplateArg, TemplateArgList};
pub use decl::{ConceptDecl, ConceptRef, ConstrainedDecl, DeclId, TemplateDecl, TemplateParamList};
pub use require::{Requirement, RequirementStatus};
pub use ty::{Member, ParamRef, StructDef, Type, Value};

/// A half-open byte range into the source buffer the caller holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    LAnd,
    LOr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinaryOp {
    pub fn spelling(&self) -> &'static str {
        match self {
            BinaryOp::LAnd => "&&",
            BinaryOp::LOr => "||",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::LAnd | BinaryOp::LOr)
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spelling())
    }
}

static NEXT_EXPR_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a source-level expression node. Clones of a node share its
/// id; only freshly constructed nodes (including everything substitution
/// builds) get new ones. Atomic-constraint identity during subsumption is
/// based on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u64);

impl ExprId {
    fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A concept-specialization expression `C<A1, ..., An>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptId {
    pub concept: ConceptRef,
    pub args: Vec<TemplateArg>,
}

/// A `requires`-expression: a braced body of requirements.
#[derive(Debug, Clone, PartialEq)]
pub struct RequiresExpr {
    pub requirements: Vec<Requirement>,
}

impl RequiresExpr {
    pub fn new(requirements: Vec<Requirement>) -> Self {
        Self { requirements }
    }

    pub fn is_dependent(&self) -> bool {
        self.requirements.iter().any(Requirement::is_dependent)
    }

    pub fn is_satisfied(&self) -> bool {
        self.requirements.iter().all(Requirement::is_satisfied)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    BoolLit(bool),
    IntLit(i64),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Paren(Box<Expr>),
    /// Wrapper for expressions with attached cleanups; transparent to the
    /// whole engine, like parens.
    Cleanup(Box<Expr>),
    ConceptId(ConceptId),
    Requires(RequiresExpr),
    /// `Base::member` (a static constant) or `Base::member()` (a constexpr
    /// call), resolved against the base type during substitution.
    Member {
        base: Type,
        member: String,
        call: bool,
    },
    SizeOf(Type),
    /// A unary fold `(pattern op ...)` over a parameter pack. Atomic for
    /// satisfaction and normalization; substitution expands it into a chain
    /// of binary operators.
    Fold { op: BinaryOp, pattern: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            id: ExprId::fresh(),
            kind,
            span,
        }
    }

    pub fn bool_lit(v: bool) -> Self {
        Self::new(ExprKind::BoolLit(v), Span::default())
    }

    pub fn int_lit(v: i64) -> Self {
        Self::new(ExprKind::IntLit(v), Span::default())
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        let span = lhs.span.to(rhs.span);
        Self::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        )
    }

    pub fn and(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::LAnd, lhs, rhs)
    }

    pub fn or(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::LOr, lhs, rhs)
    }

    pub fn paren(inner: Expr) -> Self {
        let span = inner.span;
        Self::new(ExprKind::Paren(Box::new(inner)), span)
    }

    pub fn cleanup(inner: Expr) -> Self {
        let span = inner.span;
        Self::new(ExprKind::Cleanup(Box::new(inner)), span)
    }

    pub fn concept_id(concept: ConceptRef, args: Vec<TemplateArg>) -> Self {
        Self::new(ExprKind::ConceptId(ConceptId { concept, args }), Span::default())
    }

    pub fn requires(requirements: Vec<Requirement>) -> Self {
        Self::new(
            ExprKind::Requires(RequiresExpr::new(requirements)),
            Span::default(),
        )
    }

    pub fn member(base: Type, member: impl Into<String>) -> Self {
        Self::new(
            ExprKind::Member {
                base,
                member: member.into(),
                call: false,
            },
            Span::default(),
        )
    }

    pub fn member_call(base: Type, member: impl Into<String>) -> Self {
        Self::new(
            ExprKind::Member {
                base,
                member: member.into(),
                call: true,
            },
            Span::default(),
        )
    }

    pub fn size_of(ty: Type) -> Self {
        Self::new(ExprKind::SizeOf(ty), Span::default())
    }

    pub fn fold(op: BinaryOp, pattern: Expr) -> Self {
        let span = pattern.span;
        Self::new(
            ExprKind::Fold {
                op,
                pattern: Box::new(pattern),
            },
            span,
        )
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Strip parens and cleanup wrappers.
    pub fn ignore_parens(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) | ExprKind::Cleanup(inner) => inner.ignore_parens(),
            _ => self,
        }
    }

    /// True iff the expression still contains an unresolved
    /// template-parameter reference (possibly after a partial substitution).
    pub fn is_dependent(&self) -> bool {
        match &self.kind {
            ExprKind::BoolLit(_) | ExprKind::IntLit(_) => false,
            ExprKind::Binary { lhs, rhs, .. } => lhs.is_dependent() || rhs.is_dependent(),
            ExprKind::Paren(inner) | ExprKind::Cleanup(inner) => inner.is_dependent(),
            ExprKind::ConceptId(cid) => cid.args.iter().any(TemplateArg::is_dependent),
            ExprKind::Requires(re) => re.is_dependent(),
            ExprKind::Member { base, .. } => base.is_dependent(),
            ExprKind::SizeOf(ty) => ty.is_dependent(),
            ExprKind::Fold { pattern, .. } => pattern.is_dependent(),
        }
    }

    /// True iff a pack parameter is referenced outside an expansion.
    pub fn contains_unexpanded_pack(&self) -> bool {
        match &self.kind {
            ExprKind::BoolLit(_) | ExprKind::IntLit(_) => false,
            ExprKind::Binary { lhs, rhs, .. } => {
                lhs.contains_unexpanded_pack() || rhs.contains_unexpanded_pack()
            }
            ExprKind::Paren(inner) | ExprKind::Cleanup(inner) => inner.contains_unexpanded_pack(),
            ExprKind::ConceptId(cid) => cid.args.iter().any(TemplateArg::contains_unexpanded_pack),
            ExprKind::Requires(re) => {
                re.requirements.iter().any(Requirement::contains_unexpanded_pack)
            }
            ExprKind::Member { base, .. } => base.contains_unexpanded_pack(),
            ExprKind::SizeOf(ty) => ty.contains_unexpanded_pack(),
            // The fold expands the packs referenced by its pattern.
            ExprKind::Fold { .. } => false,
        }
    }

    /// Canonical structural equality: spans and node identity are ignored,
    /// parens and cleanups are transparent.
    pub fn profile_eq(&self, other: &Expr) -> bool {
        let (a, b) = (self.ignore_parens(), other.ignore_parens());
        match (&a.kind, &b.kind) {
            (ExprKind::BoolLit(x), ExprKind::BoolLit(y)) => x == y,
            (ExprKind::IntLit(x), ExprKind::IntLit(y)) => x == y,
            (
                ExprKind::Binary { op, lhs, rhs },
                ExprKind::Binary {
                    op: op2,
                    lhs: lhs2,
                    rhs: rhs2,
                },
            ) => op == op2 && lhs.profile_eq(lhs2) && rhs.profile_eq(rhs2),
            (ExprKind::ConceptId(x), ExprKind::ConceptId(y)) => {
                x.concept == y.concept && x.args == y.args
            }
            (ExprKind::Requires(x), ExprKind::Requires(y)) => x == y,
            (
                ExprKind::Member { base, member, call },
                ExprKind::Member {
                    base: base2,
                    member: member2,
                    call: call2,
                },
            ) => base == base2 && member == member2 && call == call2,
            (ExprKind::SizeOf(x), ExprKind::SizeOf(y)) => x == y,
            (
                ExprKind::Fold { op, pattern },
                ExprKind::Fold {
                    op: op2,
                    pattern: pattern2,
                },
            ) => op == op2 && pattern.profile_eq(pattern2),
            _ => false,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::BoolLit(v) => write!(f, "{}", v),
            ExprKind::IntLit(v) => write!(f, "{}", v),
            ExprKind::Binary { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            ExprKind::Paren(inner) => write!(f, "({})", inner),
            ExprKind::Cleanup(inner) => write!(f, "{}", inner),
            ExprKind::ConceptId(cid) => write!(f, "{}", cid),
            ExprKind::Requires(re) => {
                write!(
                    f,
                    "requires {{ {} }}",
                    re.requirements.iter().map(|r| r.to_string()).join(" ")
                )
            }
            ExprKind::Member { base, member, call } => {
                write!(f, "{}::{}{}", base, member, if *call { "()" } else { "" })
            }
            ExprKind::SizeOf(ty) => write!(f, "sizeof({})", ty),
            ExprKind::Fold { op, pattern } => write!(f, "({} {} ...)", pattern, op),
        }
    }
}

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}<{}>",
            self.concept,
            self.args.iter().map(|a| a.to_string()).join(", ")
        )
    }
}
