//! Engine error taxonomy.
//!
//! `Validation` and `Infeasible` are expected, first-class outcomes
//! communicated through the run record; `Timeout` is distinct from
//! `Infeasible` because a feasible solution might exist but was not
//! found in budget; `Unexpected` wraps everything else and is logged
//! before being recorded.

use thiserror::Error;

use crate::validation::ValidationIssue;

/// Failure modes of a generation run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// One or more precondition checks failed. Carries the full list
    /// of issues so the user can correct everything in one pass.
    #[error("validation failed: {}", format_issues(.0))]
    Validation(Vec<ValidationIssue>),

    /// A requirement references an entity the domain store cannot
    /// resolve.
    #[error("requirement for unit '{unit_id}' references unknown {entity} '{id}'")]
    MissingReference {
        /// Entity kind ("person", "subject", "unit").
        entity: &'static str,
        /// Unresolvable identifier.
        id: String,
        /// Unit whose requirement carried the reference.
        unit_id: String,
    },

    /// The CSP search exhausted its iteration budget without a full
    /// placement.
    #[error("no feasible schedule within {iterations} iterations; {hint}")]
    Infeasible {
        /// Attempts spent before giving up.
        iterations: u64,
        /// Remediation hint for the user.
        hint: String,
    },

    /// The soft time limit elapsed mid-search.
    #[error("time limit exceeded during {phase}; try fewer units or a larger time budget")]
    Timeout {
        /// Pipeline phase that ran out of time.
        phase: &'static str,
    },

    /// Any other failure, recorded verbatim.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{IssueKind, ValidationIssue};

    #[test]
    fn test_validation_message_lists_all_issues() {
        let err = EngineError::Validation(vec![
            ValidationIssue::new(IssueKind::NoUnits, "no units selected"),
            ValidationIssue::new(IssueKind::NoSpaces, "no spaces defined"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("no units selected"));
        assert!(msg.contains("no spaces defined"));
    }

    #[test]
    fn test_infeasible_carries_hint() {
        let err = EngineError::Infeasible {
            iterations: 100_000,
            hint: "extend the date range or add invigilators".into(),
        };
        assert!(err.to_string().contains("extend the date range"));
    }

    #[test]
    fn test_missing_reference_names_entity() {
        let err = EngineError::MissingReference {
            entity: "person",
            id: "T99".into(),
            unit_id: "8B".into(),
        };
        assert!(err.to_string().contains("person 'T99'"));
    }
}
