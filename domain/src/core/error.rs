//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Plan is already finalized")]
    PlanFinalized,

    #[error("Unit {0} does not exist in the plan")]
    UnknownUnit(usize),

    #[error("Illegal status transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }

    pub(crate) fn transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        DomainError::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_error_display() {
        assert_eq!(DomainError::Cancelled.to_string(), "Operation cancelled");
        assert!(DomainError::Cancelled.is_cancelled());
        assert!(!DomainError::PlanFinalized.is_cancelled());
    }

    #[test]
    fn test_transition_error_display() {
        let error = DomainError::transition("completed", "processing");
        assert_eq!(
            error.to_string(),
            "Illegal status transition: completed -> processing"
        );
    }
}
