//! Period/slot model.
//!
//! A slot is an ordered, named time span within a school day. Only
//! teaching slots are placeable; breaks and other interruptions keep
//! their position in the day so that "consecutive periods" means
//! adjacent positions with nothing in between.
//!
//! # Time Model
//! Slot boundaries are minutes since midnight. Days are indexed
//! 0 = Monday .. 6 = Sunday.

use serde::{Deserialize, Serialize};

/// Classification of a slot within the daily grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotKind {
    /// A regular teaching period.
    Teaching,
    /// A break (recess, lunch). Never receives assignments.
    Break,
    /// Domain-specific slot kind (assembly, registration, ...).
    Custom(String),
}

/// An ordered, named time span within the working day.
///
/// Immutable once the working calendar is fixed for a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Unique slot identifier.
    pub id: String,
    /// Human-readable name (e.g., "Period 3").
    pub name: String,
    /// Start time (minutes since midnight).
    pub start_minute: u16,
    /// End time (minutes since midnight, exclusive).
    pub end_minute: u16,
    /// Slot classification.
    pub kind: SlotKind,
    /// Position within the day (0-based, includes breaks).
    pub position: usize,
}

impl Slot {
    /// Creates a new teaching slot.
    pub fn new(id: impl Into<String>, position: usize, start_minute: u16, end_minute: u16) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            start_minute,
            end_minute,
            kind: SlotKind::Teaching,
            position,
        }
    }

    /// Sets the slot name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the slot kind.
    pub fn with_kind(mut self, kind: SlotKind) -> Self {
        self.kind = kind;
        self
    }

    /// Duration of the slot in minutes.
    #[inline]
    pub fn duration_minutes(&self) -> u16 {
        self.end_minute - self.start_minute
    }

    /// Whether this slot can receive assignments.
    #[inline]
    pub fn is_teaching(&self) -> bool {
        self.kind == SlotKind::Teaching
    }
}
