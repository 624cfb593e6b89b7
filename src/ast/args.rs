//! Template arguments and the multilevel template-argument list.

use std::fmt;

use itertools::Itertools;

use crate::ast::ty::{Type, Value};

/// A single template argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateArg {
    Type(Type),
    Value(Value),
    /// A pack of arguments matched to a template parameter pack.
    Pack(Vec<TemplateArg>),
    /// A written pack expansion `X...`; spliced once `X` resolves to a pack.
    Expansion(Box<TemplateArg>),
}

impl TemplateArg {
    pub fn expansion(inner: TemplateArg) -> Self {
        TemplateArg::Expansion(Box::new(inner))
    }

    pub fn is_dependent(&self) -> bool {
        match self {
            TemplateArg::Type(t) => t.is_dependent(),
            TemplateArg::Value(_) => false,
            TemplateArg::Pack(elems) => elems.iter().any(TemplateArg::is_dependent),
            TemplateArg::Expansion(inner) => inner.is_dependent(),
        }
    }

    pub fn contains_unexpanded_pack(&self) -> bool {
        match self {
            TemplateArg::Type(t) => t.contains_unexpanded_pack(),
            TemplateArg::Value(_) => false,
            TemplateArg::Pack(elems) => elems.iter().any(TemplateArg::contains_unexpanded_pack),
            // The expansion itself expands the pack it references.
            TemplateArg::Expansion(_) => false,
        }
    }
}

impl fmt::Display for TemplateArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateArg::Type(t) => write!(f, "{}", t),
            TemplateArg::Value(v) => write!(f, "{}", v),
            TemplateArg::Pack(elems) => {
                write!(f, "<{}>", elems.iter().map(|a| a.to_string()).join(", "))
            }
            TemplateArg::Expansion(inner) => write!(f, "{}...", inner),
        }
    }
}

impl From<Type> for TemplateArg {
    fn from(t: Type) -> Self {
        TemplateArg::Type(t)
    }
}

impl From<Value> for TemplateArg {
    fn from(v: Value) -> Self {
        TemplateArg::Value(v)
    }
}

/// One level of template arguments.
pub type TemplateArgList = Vec<TemplateArg>;

/// The multilevel template-argument list: one argument level per enclosing
/// template scope, outermost first, innermost last.
///
/// Retained outer levels stand for enclosing scopes whose parameters must
/// survive substitution untouched; a parameter whose depth addresses a
/// retained level (or a level beyond the stack) stays dependent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiLevelArgList {
    levels: Vec<TemplateArgList>,
    retained_outer: usize,
}

impl MultiLevelArgList {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-level list, the common case for checking one template-id.
    pub fn from_innermost(args: TemplateArgList) -> Self {
        Self {
            levels: vec![args],
            retained_outer: 0,
        }
    }

    pub fn num_levels(&self) -> usize {
        self.retained_outer + self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_levels() == 0
    }

    pub fn innermost(&self) -> Option<&TemplateArgList> {
        self.levels.last()
    }

    /// Push a level outside every existing one.
    pub fn add_outer_level(&mut self, args: TemplateArgList) {
        self.levels.insert(0, args);
    }

    /// Retain one more outer scope without supplying its arguments.
    pub fn add_outer_retained_level(&mut self) {
        self.retained_outer += 1;
    }

    /// Push a level inside every existing one.
    pub fn add_inner_level(&mut self, args: TemplateArgList) {
        self.levels.push(args);
    }

    /// The arguments bound at `depth`, or `None` when that scope is retained
    /// or not supplied (the parameter stays dependent).
    pub fn level(&self, depth: usize) -> Option<&TemplateArgList> {
        if depth < self.retained_outer {
            return None;
        }
        self.levels.get(depth - self.retained_outer)
    }

    /// A copy with the argument at `(depth, index)` replaced. Used when a
    /// fold expression substitutes its pattern once per pack element.
    pub(crate) fn replace_arg(&self, depth: usize, index: usize, arg: TemplateArg) -> Self {
        let mut copy = self.clone();
        if depth >= copy.retained_outer {
            if let Some(level) = copy.levels.get_mut(depth - copy.retained_outer) {
                if let Some(slot) = level.get_mut(index) {
                    *slot = arg;
                }
            }
        }
        copy
    }
}
