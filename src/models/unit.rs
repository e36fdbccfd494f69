//! Unit, subject, and resource-person models.
//!
//! A unit is the entity that owns a slice of the schedule: a
//! class-section for timetables, a class for exam schedules. A unit
//! can never be double-booked with itself.

use serde::{Deserialize, Serialize};

/// A class-section (timetable) or class (exams).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique unit identifier.
    pub id: String,
    /// Human-readable name (e.g., "Grade 8 - B").
    pub name: String,
    /// Number of students in the unit.
    pub headcount: u32,
}

impl Unit {
    /// Creates a new unit.
    pub fn new(id: impl Into<String>, headcount: u32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            headcount,
        }
    }

    /// Sets the unit name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A subject taught to units and examined at term end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Unique subject identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether the subject is cognitively heavy. Heavy subjects
    /// clustered on the same or adjacent days are penalized by the
    /// optimizer.
    pub heavy: bool,
}

impl Subject {
    /// Creates a new subject.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            heavy: false,
        }
    }

    /// Sets the subject name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks the subject as heavy.
    pub fn heavy(mut self) -> Self {
        self.heavy = true;
        self
    }
}

/// A resource-person: a teacher (timetables) or invigilator (exams)
/// whose time is a constrained resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Unique person identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
}

impl Person {
    /// Creates a new person.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
        }
    }

    /// Sets the person name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
