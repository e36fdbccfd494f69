//! Requirement model.
//!
//! A requirement is a demand for some quantity of (subject,
//! resource-person) time against a unit: periods per week for
//! timetables, one exam per (unit, subject) for exam schedules.

use serde::{Deserialize, Serialize};

use super::SpaceKind;

/// A (unit, subject) demand record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// Unit this requirement belongs to.
    pub unit_id: String,
    /// Subject being taught or examined.
    pub subject_id: String,
    /// Assigned resource-person (teacher or invigilator).
    pub person_id: String,
    /// Quantity needed: periods per week, or 1 for an exam.
    pub quantity: u32,
    /// Consecutive-block size for timetables (e.g., 2 = double
    /// period). Always 1 for exams.
    pub block_size: u32,
    /// Whether placement requires a special space.
    pub needs_special_space: bool,
    /// Preferred space type, when placement should target one.
    pub preferred_space_kind: Option<SpaceKind>,
}

impl Requirement {
    /// Creates a new requirement.
    pub fn new(
        unit_id: impl Into<String>,
        subject_id: impl Into<String>,
        person_id: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            unit_id: unit_id.into(),
            subject_id: subject_id.into(),
            person_id: person_id.into(),
            quantity,
            block_size: 1,
            needs_special_space: false,
            preferred_space_kind: None,
        }
    }

    /// Sets the consecutive-block size.
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Requires a special space for placement.
    pub fn with_special_space(mut self, kind: SpaceKind) -> Self {
        self.needs_special_space = true;
        self.preferred_space_kind = Some(kind);
        self
    }

    /// Sets a preferred (but not required) space type.
    pub fn with_preferred_space(mut self, kind: SpaceKind) -> Self {
        self.preferred_space_kind = Some(kind);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_builder() {
        let r = Requirement::new("8B", "MATH", "T1", 5).with_block_size(2);
        assert_eq!(r.unit_id, "8B");
        assert_eq!(r.subject_id, "MATH");
        assert_eq!(r.person_id, "T1");
        assert_eq!(r.quantity, 5);
        assert_eq!(r.block_size, 2);
        assert!(!r.needs_special_space);
    }

    #[test]
    fn test_special_space() {
        let r = Requirement::new("8B", "CHEM", "T2", 3).with_special_space(SpaceKind::Lab);
        assert!(r.needs_special_space);
        assert_eq!(r.preferred_space_kind, Some(SpaceKind::Lab));
    }

    #[test]
    fn test_block_size_floor() {
        let r = Requirement::new("8B", "ART", "T3", 2).with_block_size(0);
        assert_eq!(r.block_size, 1);
    }
}
