use thiserror::Error;

pub type SemaResult<T, E = SemaError> = core::result::Result<T, E>;

/// Hard failures of the constraint engine. Distinct from "unsatisfied" (a
/// successful evaluation whose answer is no) and from SFINAE substitution
/// failures (which the standard defines to mean unsatisfied).
#[derive(Error, Debug)]
pub enum SemaError {
    #[error("template instantiation depth limit of {0} exceeded")]
    InstantiationDepthExceeded(usize),

    #[error("substitution into constraint expression resulted in a non-constant expression")]
    NonConstantConstraint,

    #[error("ill-formed constraint expression")]
    IllFormedConstraint,

    #[error("normalization of associated constraints failed")]
    NormalizationFailure,

    #[error("template argument list does not match the parameter list of '{0}'")]
    ArgumentListMismatch(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
