//! Space model: rooms and exam halls.
//!
//! A space is a constrained physical resource with a capacity. Rooms
//! are exclusive per (day, slot); halls may be shared across exams as
//! long as the summed headcount stays within capacity.

use serde::{Deserialize, Serialize};

/// Space type classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpaceKind {
    /// Ordinary classroom.
    Classroom,
    /// Special-purpose room (science lab, computer room, ...).
    Lab,
    /// Examination hall; shareable up to capacity.
    Hall,
    /// Domain-specific space type.
    Custom(String),
}

/// A room or exam hall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Unique space identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Seating capacity.
    pub capacity: u32,
    /// Space classification.
    pub kind: SpaceKind,
    /// Whether the space is usable at all (false = under maintenance).
    pub available: bool,
}

impl Space {
    /// Creates a new available classroom.
    pub fn new(id: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            capacity,
            kind: SpaceKind::Classroom,
            available: true,
        }
    }

    /// Creates an exam hall.
    pub fn hall(id: impl Into<String>, capacity: u32) -> Self {
        Self::new(id, capacity).with_kind(SpaceKind::Hall)
    }

    /// Sets the space name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the space kind.
    pub fn with_kind(mut self, kind: SpaceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Marks the space unavailable.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Whether this is a special-purpose space (anything but a
    /// plain classroom).
    pub fn is_special(&self) -> bool {
        self.kind != SpaceKind::Classroom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_builder() {
        let s = Space::new("R101", 36).with_name("Room 101");
        assert_eq!(s.id, "R101");
        assert_eq!(s.capacity, 36);
        assert_eq!(s.kind, SpaceKind::Classroom);
        assert!(s.available);
        assert!(!s.is_special());
    }

    #[test]
    fn test_hall() {
        let h = Space::hall("H1", 120);
        assert_eq!(h.kind, SpaceKind::Hall);
        assert!(h.is_special());
    }

    #[test]
    fn test_unavailable() {
        let s = Space::new("R102", 30).unavailable();
        assert!(!s.available);
    }
}
