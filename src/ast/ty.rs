//! The type model: scalar types, struct definitions with members, and
//! template-parameter references.

use std::{collections::BTreeMap, fmt, hash, sync::Arc};

/// A compile-time value produced by constant evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Bool(bool),
    Int(i64),
}

impl Value {
    /// Boolean interpretation: integers convert by zero-test.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            Value::Bool(b) => *b as i64,
            Value::Int(i) => *i,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
        }
    }
}

/// A reference to a template parameter, identified by its depth (0 =
/// outermost enclosing template) and index within that parameter list.
///
/// Equality and hashing are canonical: the written name is ignored, exactly
/// like the canonical form of a dependent type.
#[derive(Debug, Clone)]
pub struct ParamRef {
    pub depth: usize,
    pub index: usize,
    pub name: String,
    pub pack: bool,
}

impl ParamRef {
    pub fn new(depth: usize, index: usize, name: impl Into<String>) -> Self {
        Self {
            depth,
            index,
            name: name.into(),
            pack: false,
        }
    }

    pub fn pack(depth: usize, index: usize, name: impl Into<String>) -> Self {
        Self {
            depth,
            index,
            name: name.into(),
            pack: true,
        }
    }
}

impl PartialEq for ParamRef {
    fn eq(&self, other: &Self) -> bool {
        self.depth == other.depth && self.index == other.index && self.pack == other.pack
    }
}

impl Eq for ParamRef {}

impl hash::Hash for ParamRef {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.depth.hash(state);
        self.index.hash(state);
        self.pack.hash(state);
    }
}

impl fmt::Display for ParamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "type-parameter-{}-{}", self.depth, self.index)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// A member of a struct definition, looked up during substitution.
#[derive(Debug, Clone)]
pub enum Member {
    /// A static constant: `S::value`.
    Const(Value),
    /// A static constexpr function: `S::f()`.
    ConstFn { value: Value, noexcept: bool },
    /// A member type: `typename S::type`.
    Type(Type),
}

/// A class type. Structs compare by name; two definitions with the same name
/// denote the same type.
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    /// sizeof(S), in bytes.
    pub size: usize,
    pub members: BTreeMap<String, Member>,
    /// Source types this struct is implicitly convertible from (converting
    /// constructors). Two applicable entries make a conversion ambiguous.
    pub convert_from: Vec<Type>,
}

impl StructDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 1,
            members: BTreeMap::new(),
            convert_from: Vec::new(),
        }
    }

    pub fn with_member(mut self, name: impl Into<String>, member: Member) -> Self {
        self.members.insert(name.into(), member);
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_conversion_from(mut self, ty: Type) -> Self {
        self.convert_from.push(ty);
        self
    }

    pub fn into_type(self) -> Type {
        Type::Struct(Arc::new(self))
    }
}

/// A type in the constraint language.
#[derive(Debug, Clone)]
pub enum Type {
    Bool,
    Int,
    Struct(Arc<StructDef>),
    Param(ParamRef),
    /// `typename Base::member`, resolved during substitution.
    MemberType { base: Box<Type>, member: String },
    Ref(Box<Type>),
    Const(Box<Type>),
}

impl Type {
    pub fn reference(inner: Type) -> Type {
        Type::Ref(Box::new(inner))
    }

    pub fn constant(inner: Type) -> Type {
        Type::Const(Box::new(inner))
    }

    pub fn member(base: Type, member: impl Into<String>) -> Type {
        Type::MemberType {
            base: Box::new(base),
            member: member.into(),
        }
    }

    /// True iff the type contains an unresolved template-parameter reference.
    pub fn is_dependent(&self) -> bool {
        match self {
            Type::Bool | Type::Int | Type::Struct(_) => false,
            Type::Param(_) => true,
            Type::MemberType { base, .. } => base.is_dependent(),
            Type::Ref(inner) | Type::Const(inner) => inner.is_dependent(),
        }
    }

    /// True iff a pack parameter is referenced outside an expansion context.
    pub fn contains_unexpanded_pack(&self) -> bool {
        match self {
            Type::Bool | Type::Int | Type::Struct(_) => false,
            Type::Param(p) => p.pack,
            Type::MemberType { base, .. } => base.contains_unexpanded_pack(),
            Type::Ref(inner) | Type::Const(inner) => inner.contains_unexpanded_pack(),
        }
    }

    /// Remove references and cv-qualification, as `[temp.constr.atomic]`
    /// requires before the `bool` check.
    pub fn strip_ref_and_cv(&self) -> &Type {
        match self {
            Type::Ref(inner) | Type::Const(inner) => inner.strip_ref_and_cv(),
            other => other,
        }
    }

    /// sizeof for concrete types; `None` while dependent.
    pub fn size_of(&self) -> Option<usize> {
        match self.strip_ref_and_cv() {
            Type::Bool => Some(1),
            Type::Int => Some(4),
            Type::Struct(def) => Some(def.size),
            _ => None,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Bool, Type::Bool) | (Type::Int, Type::Int) => true,
            (Type::Struct(a), Type::Struct(b)) => a.name == b.name,
            (Type::Param(a), Type::Param(b)) => a == b,
            (
                Type::MemberType { base: a, member: m },
                Type::MemberType { base: b, member: n },
            ) => a == b && m == n,
            (Type::Ref(a), Type::Ref(b)) => a == b,
            (Type::Const(a), Type::Const(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Type {}

impl hash::Hash for Type {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Type::Bool | Type::Int => {}
            Type::Struct(def) => def.name.hash(state),
            Type::Param(p) => p.hash(state),
            Type::MemberType { base, member } => {
                base.hash(state);
                member.hash(state);
            }
            Type::Ref(inner) | Type::Const(inner) => inner.hash(state),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Struct(def) => write!(f, "{}", def.name),
            Type::Param(p) => write!(f, "{}", p),
            Type::MemberType { base, member } => write!(f, "typename {}::{}", base, member),
            Type::Ref(inner) => write!(f, "{} &", inner),
            Type::Const(inner) => write!(f, "const {}", inner),
        }
    }
}
