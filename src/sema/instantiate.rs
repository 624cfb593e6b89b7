//! The template-instantiation context stack.
//!
//! Every satisfaction check, atomic substitution, concept-reference
//! normalization, and nested-requirement check runs inside a frame so that
//! recursive machinery sees a well-formed stack and runaway recursion is cut
//! off by the configured depth limit. Frames are released on every exit path.

use crate::{
    ast::Span,
    sema::{error::SemaResult, Sema, SemaError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantiationKind {
    ConstraintsCheck,
    ConstraintSubstitution,
    ConstraintNormalization,
    NestedRequirementConstraintsCheck,
}

#[derive(Debug, Clone)]
pub struct InstantiationFrame {
    pub kind: InstantiationKind,
    pub span: Span,
    /// Display name of the entity being instantiated.
    pub entity: String,
}

impl Sema {
    /// Run `f` inside a fresh instantiation frame. Acquisition fails with a
    /// hard error once the depth limit is reached; the frame is popped no
    /// matter how `f` exits.
    pub(crate) fn with_instantiation<R>(
        &mut self,
        kind: InstantiationKind,
        span: Span,
        entity: &str,
        f: impl FnOnce(&mut Sema) -> SemaResult<R>,
    ) -> SemaResult<R> {
        if self.instantiation_stack.len() >= self.params.instantiation_depth_limit {
            return Err(SemaError::InstantiationDepthExceeded(
                self.params.instantiation_depth_limit,
            ));
        }
        self.instantiation_stack.push(InstantiationFrame {
            kind,
            span,
            entity: entity.to_string(),
        });
        let result = f(self);
        self.instantiation_stack.pop();
        result
    }

    pub fn instantiation_depth(&self) -> usize {
        self.instantiation_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::Params;

    #[test]
    fn frames_are_released_on_error_paths() {
        let mut sema = Sema::new();
        let err: SemaResult<()> = sema.with_instantiation(
            InstantiationKind::ConstraintsCheck,
            Span::default(),
            "X",
            |_| Err(SemaError::Internal("boom".into())),
        );
        assert!(err.is_err());
        assert_eq!(sema.instantiation_depth(), 0);
    }

    #[test]
    fn depth_limit_makes_acquisition_fail() {
        let mut sema = Sema::with_params(Params {
            instantiation_depth_limit: 2,
        });
        let result = sema.with_instantiation(
            InstantiationKind::ConstraintsCheck,
            Span::default(),
            "a",
            |s| {
                s.with_instantiation(
                    InstantiationKind::ConstraintSubstitution,
                    Span::default(),
                    "b",
                    |s| {
                        s.with_instantiation(
                            InstantiationKind::ConstraintSubstitution,
                            Span::default(),
                            "c",
                            |_| Ok(()),
                        )
                    },
                )
            },
        );
        assert!(matches!(
            result,
            Err(SemaError::InstantiationDepthExceeded(2))
        ));
        assert_eq!(sema.instantiation_depth(), 0);
    }
}
