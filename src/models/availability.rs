//! Resource-person availability.
//!
//! Per-(person, day) records describing when a teacher or invigilator
//! may be assigned, how much they may be assigned, and which slots
//! they prefer.
//!
//! # Defaults
//! A missing record means "available all day, no limits". Limits of
//! zero mean "unlimited" so that partially filled records stay
//! permissive.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Slot;

/// A daily working window in minutes since midnight, [start, end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinuteWindow {
    /// Window start (inclusive).
    pub start_minute: u16,
    /// Window end (exclusive).
    pub end_minute: u16,
}

impl MinuteWindow {
    /// Creates a new window.
    pub fn new(start_minute: u16, end_minute: u16) -> Self {
        Self {
            start_minute,
            end_minute,
        }
    }

    /// Whether a slot fits entirely inside this window.
    pub fn covers(&self, slot: &Slot) -> bool {
        slot.start_minute >= self.start_minute && slot.end_minute <= self.end_minute
    }
}

/// Availability of one person on one day of the week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonDayAvailability {
    /// Person this record belongs to.
    pub person_id: String,
    /// Day index (0 = Monday .. 6 = Sunday).
    pub day: u8,
    /// Whether the person works at all on this day.
    pub available: bool,
    /// Working window. `None` = the whole day.
    pub window: Option<MinuteWindow>,
    /// Maximum assignments on this day. 0 = unlimited.
    pub max_per_day: u32,
    /// Maximum consecutive assignments. 0 = unlimited.
    pub max_consecutive: u32,
    /// Preferred teaching-slot indices. Violations are penalized by
    /// the optimizer, never rejected.
    pub preferred_slots: Vec<usize>,
}

impl PersonDayAvailability {
    /// Creates an all-day available record.
    pub fn new(person_id: impl Into<String>, day: u8) -> Self {
        Self {
            person_id: person_id.into(),
            day,
            available: true,
            window: None,
            max_per_day: 0,
            max_consecutive: 0,
            preferred_slots: Vec::new(),
        }
    }

    /// Marks the day off.
    pub fn day_off(mut self) -> Self {
        self.available = false;
        self
    }

    /// Sets the working window.
    pub fn with_window(mut self, start_minute: u16, end_minute: u16) -> Self {
        self.window = Some(MinuteWindow::new(start_minute, end_minute));
        self
    }

    /// Sets the daily assignment cap.
    pub fn with_max_per_day(mut self, max: u32) -> Self {
        self.max_per_day = max;
        self
    }

    /// Sets the consecutive-assignment cap.
    pub fn with_max_consecutive(mut self, max: u32) -> Self {
        self.max_consecutive = max;
        self
    }

    /// Sets the preferred slot indices.
    pub fn with_preferred_slots(mut self, slots: Vec<usize>) -> Self {
        self.preferred_slots = slots;
        self
    }
}

/// Index over availability records, keyed by (person, day).
#[derive(Debug, Clone, Default)]
pub struct AvailabilityBook {
    records: HashMap<(String, u8), PersonDayAvailability>,
}

impl AvailabilityBook {
    /// Builds the index from a flat record list. Later records for the
    /// same (person, day) replace earlier ones.
    pub fn from_records(records: impl IntoIterator<Item = PersonDayAvailability>) -> Self {
        let mut book = Self::default();
        for r in records {
            book.records.insert((r.person_id.clone(), r.day), r);
        }
        book
    }

    /// Looks up the record for a person on a day.
    pub fn get(&self, person_id: &str, day: u8) -> Option<&PersonDayAvailability> {
        self.records.get(&(person_id.to_string(), day))
    }

    /// Whether the person works on this day at all.
    pub fn is_available(&self, person_id: &str, day: u8) -> bool {
        self.get(person_id, day).map(|r| r.available).unwrap_or(true)
    }

    /// Whether the person may be assigned this specific slot
    /// (day availability plus working window).
    pub fn allows_slot(&self, person_id: &str, day: u8, slot: &Slot) -> bool {
        match self.get(person_id, day) {
            None => true,
            Some(r) => {
                r.available
                    && match &r.window {
                        None => true,
                        Some(w) => w.covers(slot),
                    }
            }
        }
    }

    /// Daily assignment cap; `u32::MAX` when unlimited.
    pub fn max_per_day(&self, person_id: &str, day: u8) -> u32 {
        match self.get(person_id, day) {
            Some(r) if !r.available => 0,
            Some(r) if r.max_per_day > 0 => r.max_per_day,
            _ => u32::MAX,
        }
    }

    /// Consecutive-assignment cap; `u32::MAX` when unlimited.
    pub fn max_consecutive(&self, person_id: &str, day: u8) -> u32 {
        match self.get(person_id, day) {
            Some(r) if r.max_consecutive > 0 => r.max_consecutive,
            _ => u32::MAX,
        }
    }

    /// Whether the person prefers the given teaching-slot index.
    /// True when no preference is declared.
    pub fn prefers_slot(&self, person_id: &str, day: u8, slot_index: usize) -> bool {
        match self.get(person_id, day) {
            Some(r) if !r.preferred_slots.is_empty() => r.preferred_slots.contains(&slot_index),
            _ => true,
        }
    }

    /// Total assignable capacity for a person across the given days,
    /// with `slots_per_day` bounding unlimited records.
    pub fn total_capacity(&self, person_id: &str, days: &[u8], slots_per_day: u32) -> u64 {
        days.iter()
            .map(|&d| self.max_per_day(person_id, d).min(slots_per_day) as u64)
            .sum()
    }
}
