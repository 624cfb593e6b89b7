//! Declarations that carry constraints: concepts and constrained templates.

use std::{
    fmt, hash,
    sync::atomic::{AtomicU64, Ordering},
    sync::Arc,
};

use crate::ast::{args::MultiLevelArgList, Expr};

static NEXT_DECL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a declaration. Cache keys are built from this,
/// never from names or source locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u64);

impl DeclId {
    pub fn fresh() -> Self {
        DeclId(NEXT_DECL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One declared template parameter. Only the last parameter of a list may be
/// a pack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateParam {
    pub name: String,
    pub is_pack: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TemplateParamList {
    pub params: Vec<TemplateParam>,
}

impl TemplateParamList {
    /// A list of plain type parameters.
    pub fn types(names: &[&str]) -> Self {
        Self {
            params: names
                .iter()
                .map(|n| TemplateParam {
                    name: (*n).to_string(),
                    is_pack: false,
                })
                .collect(),
        }
    }

    /// A single trailing pack parameter.
    pub fn pack(name: &str) -> Self {
        Self {
            params: vec![TemplateParam {
                name: name.to_string(),
                is_pack: true,
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn has_trailing_pack(&self) -> bool {
        self.params.last().map(|p| p.is_pack).unwrap_or(false)
    }
}

/// A concept definition: a named, parameterized constraint expression.
#[derive(Debug)]
pub struct ConceptDecl {
    pub id: DeclId,
    pub name: String,
    pub params: TemplateParamList,
    pub constraint: Expr,
}

impl ConceptDecl {
    pub fn new(name: impl Into<String>, params: TemplateParamList, constraint: Expr) -> ConceptRef {
        ConceptRef(Arc::new(ConceptDecl {
            id: DeclId::fresh(),
            name: name.into(),
            params,
            constraint,
        }))
    }
}

/// Shared handle to a concept definition. Compares by declaration identity.
#[derive(Debug, Clone)]
pub struct ConceptRef(pub Arc<ConceptDecl>);

impl std::ops::Deref for ConceptRef {
    type Target = ConceptDecl;

    fn deref(&self) -> &ConceptDecl {
        &self.0
    }
}

impl PartialEq for ConceptRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ConceptRef {}

impl hash::Hash for ConceptRef {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Display for ConceptRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

/// A template-like declaration with associated constraints: the conjunction
/// of its `requires`-clauses, in source order.
#[derive(Debug)]
pub struct TemplateDecl {
    pub id: DeclId,
    pub name: String,
    pub params: TemplateParamList,
    pub associated_constraints: Vec<Expr>,
    /// Template arguments of the enclosing scopes, outermost first. Empty for
    /// a non-member template.
    pub enclosing_args: MultiLevelArgList,
}

impl TemplateDecl {
    pub fn new(
        name: impl Into<String>,
        params: TemplateParamList,
        associated_constraints: Vec<Expr>,
    ) -> Self {
        Self {
            id: DeclId::fresh(),
            name: name.into(),
            params,
            associated_constraints,
            enclosing_args: MultiLevelArgList::new(),
        }
    }
}

impl fmt::Display for TemplateDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Anything the satisfaction checker can own constraints for.
pub trait ConstrainedDecl {
    fn decl_id(&self) -> DeclId;
    fn decl_name(&self) -> &str;
}

impl ConstrainedDecl for ConceptDecl {
    fn decl_id(&self) -> DeclId {
        self.id
    }

    fn decl_name(&self) -> &str {
        &self.name
    }
}

impl ConstrainedDecl for TemplateDecl {
    fn decl_id(&self) -> DeclId {
        self.id
    }

    fn decl_name(&self) -> &str {
        &self.name
    }
}
