//! Timetable assignment arena.
//!
//! Stores schedule cells keyed by a composite (unit, day, slot) key
//! and maintains secondary indices (person busy set, space busy set,
//! per-person daily load) on every place/remove. The indices give the
//! backtracking solver O(1) conflict checks and make undo a pair of
//! symmetric operations.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Composite key of one timetable cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimetableKey {
    /// Owning unit.
    pub unit_id: String,
    /// Day index (0 = Monday).
    pub day: u8,
    /// Teaching-slot index within the day.
    pub slot: usize,
}

impl TimetableKey {
    /// Creates a new key.
    pub fn new(unit_id: impl Into<String>, day: u8, slot: usize) -> Self {
        Self {
            unit_id: unit_id.into(),
            day,
            slot,
        }
    }
}

/// Value of one timetable cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableCell {
    /// Subject taught in this period.
    pub subject_id: String,
    /// Teacher assigned to this period.
    pub person_id: String,
    /// Room assigned to this period.
    pub space_id: String,
}

impl TimetableCell {
    /// Creates a new cell.
    pub fn new(
        subject_id: impl Into<String>,
        person_id: impl Into<String>,
        space_id: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            person_id: person_id.into(),
            space_id: space_id.into(),
        }
    }
}

/// A weekly timetable under construction or completed.
///
/// `place` refuses any cell that would double-book the unit, the
/// person, or the room at the same (day, slot); `remove` is its exact
/// inverse, which is what the solver's tentative-place/rollback
/// discipline relies on.
#[derive(Debug, Clone, Default)]
pub struct Timetable {
    cells: HashMap<TimetableKey, TimetableCell>,
    person_busy: HashSet<(String, u8, usize)>,
    space_busy: HashSet<(String, u8, usize)>,
    person_day_load: HashMap<(String, u8), u32>,
}

impl Timetable {
    /// Creates an empty timetable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a cell. Returns `false` (and changes nothing) if the
    /// unit, person, or space is already booked at that (day, slot).
    pub fn place(&mut self, key: TimetableKey, cell: TimetableCell) -> bool {
        if self.cells.contains_key(&key)
            || self.is_person_busy(&cell.person_id, key.day, key.slot)
            || self.is_space_busy(&cell.space_id, key.day, key.slot)
        {
            return false;
        }
        self.person_busy
            .insert((cell.person_id.clone(), key.day, key.slot));
        self.space_busy
            .insert((cell.space_id.clone(), key.day, key.slot));
        *self
            .person_day_load
            .entry((cell.person_id.clone(), key.day))
            .or_insert(0) += 1;
        self.cells.insert(key, cell);
        true
    }

    /// Removes a cell, unwinding all indices. Returns the cell if it
    /// existed.
    pub fn remove(&mut self, key: &TimetableKey) -> Option<TimetableCell> {
        let cell = self.cells.remove(key)?;
        self.person_busy
            .remove(&(cell.person_id.clone(), key.day, key.slot));
        self.space_busy
            .remove(&(cell.space_id.clone(), key.day, key.slot));
        if let Some(load) = self
            .person_day_load
            .get_mut(&(cell.person_id.clone(), key.day))
        {
            *load -= 1;
            if *load == 0 {
                self.person_day_load.remove(&(cell.person_id.clone(), key.day));
            }
        }
        Some(cell)
    }

    /// Gets the cell at a key.
    pub fn get(&self, key: &TimetableKey) -> Option<&TimetableCell> {
        self.cells.get(key)
    }

    /// Whether the unit is booked at (day, slot).
    pub fn is_unit_busy(&self, unit_id: &str, day: u8, slot: usize) -> bool {
        self.cells
            .contains_key(&TimetableKey::new(unit_id, day, slot))
    }

    /// Whether the person is booked at (day, slot).
    pub fn is_person_busy(&self, person_id: &str, day: u8, slot: usize) -> bool {
        self.person_busy
            .contains(&(person_id.to_string(), day, slot))
    }

    /// Whether the space is booked at (day, slot).
    pub fn is_space_busy(&self, space_id: &str, day: u8, slot: usize) -> bool {
        self.space_busy.contains(&(space_id.to_string(), day, slot))
    }

    /// Number of assignments for a person on a day.
    pub fn person_day_load(&self, person_id: &str, day: u8) -> u32 {
        self.person_day_load
            .get(&(person_id.to_string(), day))
            .copied()
            .unwrap_or(0)
    }

    /// Length of the busy run the person would sit in if also booked
    /// at `slot` on `day` (existing adjacent bookings + 1).
    pub fn person_run_with(&self, person_id: &str, day: u8, slot: usize) -> u32 {
        let mut run = 1u32;
        let mut s = slot;
        while s > 0 && self.is_person_busy(person_id, day, s - 1) {
            run += 1;
            s -= 1;
        }
        let mut s = slot;
        while self.is_person_busy(person_id, day, s + 1) {
            run += 1;
            s += 1;
        }
        run
    }

    /// Iterates over all cells.
    pub fn iter(&self) -> impl Iterator<Item = (&TimetableKey, &TimetableCell)> {
        self.cells.iter()
    }

    /// Slot indices placed for a unit on a day, sorted.
    pub fn slots_for_unit_day(&self, unit_id: &str, day: u8) -> Vec<usize> {
        let mut slots: Vec<usize> = self
            .cells
            .keys()
            .filter(|k| k.unit_id == unit_id && k.day == day)
            .map(|k| k.slot)
            .collect();
        slots.sort_unstable();
        slots
    }

    /// Entries sorted by key, suitable for serialization and
    /// deterministic comparison.
    pub fn entries(&self) -> Vec<(TimetableKey, TimetableCell)> {
        let mut entries: Vec<_> = self
            .cells
            .iter()
            .map(|(k, c)| (k.clone(), c.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Number of placed cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no cells are placed.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
