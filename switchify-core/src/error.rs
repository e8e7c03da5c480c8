//! Why a chain is left alone
//!
//! Rejection is the normal outcome for most scanned statements, so it is an
//! error value rather than a diagnostic. Only
//! [`RefactorError::InvariantViolation`] indicates a defect.

use strum_macros::Display;
use thiserror::Error;

use crate::tree::Span;

/// Closed set of reasons a construct is not rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RejectReason {
    #[strum(serialize = "rule disabled")]
    Disabled,
    #[strum(serialize = "suppressed by annotation")]
    Suppressed,
    #[strum(serialize = "statement is nested inside another if")]
    NotChainRoot,
    #[strum(serialize = "chain has fewer than three branches")]
    TooShallow,
    #[strum(serialize = "chain is longer than the configured maximum")]
    TooLong,
    #[strum(serialize = "condition is not a type, equality or null test")]
    UnsupportedPredicate,
    #[strum(serialize = "branches test different subjects")]
    SubjectMismatch,
    #[strum(serialize = "subject type cannot be switched on")]
    UnsupportedDomain,
    #[strum(serialize = "subject type is unknown")]
    UnknownSubjectType,
    #[strum(serialize = "record deconstruction pattern")]
    RecordPattern,
    #[strum(serialize = "break or yield inside the chain")]
    BreakOrYield,
    #[strum(serialize = "break or continue escapes the construct")]
    EscapingJump,
    #[strum(serialize = "equality test combined with another condition")]
    EqualityWithCondition,
    #[strum(serialize = "duplicate test")]
    DuplicateTest,
    #[strum(serialize = "dominance reordering would change behavior")]
    DominanceConflict,
    #[strum(serialize = "more than one unconditional branch")]
    MultipleUnconditional,
    #[strum(serialize = "default together with an unconditional pattern")]
    DefaultAndUnconditional,
    #[strum(serialize = "pattern dispatch without a default")]
    PatternWithoutDefault,
    #[strum(serialize = "switch is nested in another switch")]
    NestedSwitch,
    #[strum(serialize = "switch mixes or uses arrow cases")]
    ArrowCase,
    #[strum(serialize = "switch does not use arrow cases")]
    NotArrowSwitch,
    #[strum(serialize = "pattern or guarded case label")]
    PatternLabel,
    #[strum(serialize = "case falls through into a non-empty case")]
    FallThrough,
    #[strum(serialize = "construct is not exhaustive")]
    NotExhaustive,
    #[strum(serialize = "case bodies do not share one shape")]
    ShapeMismatch,
    #[strum(serialize = "nothing to change")]
    NothingToDo,
}

impl RejectReason {
    /// Reasons that come from conflicting tests rather than chain shape.
    pub fn is_ambiguous_priority(self) -> bool {
        matches!(
            self,
            RejectReason::DuplicateTest | RejectReason::EqualityWithCondition | RejectReason::DominanceConflict
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefactorError {
    #[error("not rewritten: {0}")]
    Structural(RejectReason),
    #[error("not rewritten, ambiguous priority: {0}")]
    AmbiguousPriority(RejectReason),
    #[error("internal invariant violated at {span:?}: {message}")]
    InvariantViolation { span: Span, message: String },
}

impl RefactorError {
    pub fn invariant(span: Span, message: impl Into<String>) -> Self {
        RefactorError::InvariantViolation { span, message: message.into() }
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            RefactorError::Structural(r) | RefactorError::AmbiguousPriority(r) => Some(*r),
            RefactorError::InvariantViolation { .. } => None,
        }
    }
}

impl From<RejectReason> for RefactorError {
    fn from(reason: RejectReason) -> Self {
        if reason.is_ambiguous_priority() {
            RefactorError::AmbiguousPriority(reason)
        } else {
            RefactorError::Structural(reason)
        }
    }
}

pub type RefactorResult<T> = Result<T, RefactorError>;

/// `Err` with the given reason; shorthand for early returns.
pub fn reject<T>(reason: RejectReason) -> RefactorResult<T> {
    Err(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_display() {
        assert_eq!(RejectReason::TooShallow.to_string(), "chain has fewer than three branches");
        assert_eq!(
            RefactorError::from(RejectReason::RecordPattern).to_string(),
            "not rewritten: record deconstruction pattern"
        );
    }

    #[test]
    fn test_ambiguous_classification() {
        assert!(matches!(RefactorError::from(RejectReason::DuplicateTest), RefactorError::AmbiguousPriority(_)));
        assert!(matches!(RefactorError::from(RejectReason::TooShallow), RefactorError::Structural(_)));
        assert_eq!(RefactorError::invariant(Span::default(), "x").reason(), None);
    }
}
