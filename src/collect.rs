//! Input collection.
//!
//! Assembles raw domain records into a flat, search-ready
//! [`InputBundle`]: every referential lookup is resolved to primitive
//! ids up front, so the rest of the engine never re-queries the domain
//! store. Unresolvable references are reported, never silently
//! skipped.

use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

use crate::error::EngineError;
use crate::models::{
    AvailabilityBook, GenerationConfig, Person, PersonDayAvailability, Requirement, Slot, Space,
    Subject, Unit,
};

/// Read-only snapshot of the domain records a run consumes. Authored
/// ahead of time by external CRUD; how it was fetched is not the
/// engine's concern.
#[derive(Debug, Clone, Default)]
pub struct DomainData {
    /// Slot/period definitions, any order.
    pub slots: Vec<Slot>,
    /// All units known to the school.
    pub units: Vec<Unit>,
    /// All subjects.
    pub subjects: Vec<Subject>,
    /// All resource-persons.
    pub persons: Vec<Person>,
    /// Demand records.
    pub requirements: Vec<Requirement>,
    /// Per-(person, day) availability records.
    pub availability: Vec<PersonDayAvailability>,
    /// Rooms and halls.
    pub spaces: Vec<Space>,
}

/// Flat, fully resolved input for one generation run. Owned by the
/// run; nothing here is shared with other runs.
#[derive(Debug, Clone)]
pub struct InputBundle {
    /// Teaching slots in position order. Placement indices refer into
    /// this list.
    pub teaching_slots: Vec<Slot>,
    /// Working day indices (0 = Monday).
    pub working_days: Vec<u8>,
    /// Exam days derived from the configured range, restricted to
    /// working days. Empty for timetable runs.
    pub exam_days: Vec<NaiveDate>,
    /// Exam sessions per day.
    pub sessions_per_day: u8,
    /// Selected units.
    pub units: Vec<Unit>,
    /// Subject lookup.
    pub subjects: HashMap<String, Subject>,
    /// Requirements restricted to the selected units.
    pub requirements: Vec<Requirement>,
    /// Availability index.
    pub availability: AvailabilityBook,
    /// Usable spaces (unavailable ones are dropped here).
    pub spaces: Vec<Space>,
    /// Soft-constraint weights for this run.
    pub weights: crate::models::SoftWeights,
    /// Minimum gap in days between exam days of one unit.
    pub min_exam_gap_days: i64,
    /// Maximum exams per unit per day.
    pub max_exams_per_day: u32,
}

impl InputBundle {
    /// Looks up a selected unit.
    pub fn unit(&self, unit_id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == unit_id)
    }

    /// Headcount of a unit; 0 when unknown.
    pub fn headcount(&self, unit_id: &str) -> u32 {
        self.unit(unit_id).map(|u| u.headcount).unwrap_or(0)
    }

    /// Whether a subject is marked heavy.
    pub fn is_heavy(&self, subject_id: &str) -> bool {
        self.subjects.get(subject_id).map(|s| s.heavy).unwrap_or(false)
    }

    /// Teaching slots per day.
    pub fn slots_per_day(&self) -> usize {
        self.teaching_slots.len()
    }

    /// Weekday index of an exam date (0 = Monday).
    pub fn day_index(date: NaiveDate) -> u8 {
        date.weekday().num_days_from_monday() as u8
    }
}

/// Builds the input bundle for a generation config.
///
/// Fails with [`EngineError::MissingReference`] if any requirement for
/// a selected unit references an unknown person, subject, or unit.
pub fn collect(config: &GenerationConfig, data: &DomainData) -> Result<InputBundle, EngineError> {
    let mut teaching_slots: Vec<Slot> = data
        .slots
        .iter()
        .filter(|s| s.is_teaching())
        .cloned()
        .collect();
    teaching_slots.sort_by_key(|s| s.position);

    let units: Vec<Unit> = data
        .units
        .iter()
        .filter(|u| config.unit_ids.contains(&u.id))
        .cloned()
        .collect();

    let subjects: HashMap<String, Subject> = data
        .subjects
        .iter()
        .map(|s| (s.id.clone(), s.clone()))
        .collect();

    let mut requirements = Vec::new();
    for req in &data.requirements {
        if !config.unit_ids.contains(&req.unit_id) {
            continue;
        }
        if !data.units.iter().any(|u| u.id == req.unit_id) {
            return Err(EngineError::MissingReference {
                entity: "unit",
                id: req.unit_id.clone(),
                unit_id: req.unit_id.clone(),
            });
        }
        if !subjects.contains_key(&req.subject_id) {
            return Err(EngineError::MissingReference {
                entity: "subject",
                id: req.subject_id.clone(),
                unit_id: req.unit_id.clone(),
            });
        }
        if !data.persons.iter().any(|p| p.id == req.person_id) {
            return Err(EngineError::MissingReference {
                entity: "person",
                id: req.person_id.clone(),
                unit_id: req.unit_id.clone(),
            });
        }
        requirements.push(req.clone());
    }

    let exam_days = match config.exam_range {
        None => Vec::new(),
        Some((start, end)) => working_dates(start, end, &config.working_days),
    };

    Ok(InputBundle {
        teaching_slots,
        working_days: config.working_days.clone(),
        exam_days,
        sessions_per_day: config.sessions_per_day,
        units,
        subjects,
        requirements,
        availability: AvailabilityBook::from_records(data.availability.iter().cloned()),
        spaces: data.spaces.iter().filter(|s| s.available).cloned().collect(),
        weights: config.weights.clone(),
        min_exam_gap_days: config.min_exam_gap_days,
        max_exams_per_day: config.max_exams_per_day,
    })
}

/// Dates in [start, end] whose weekday is a working day.
pub(crate) fn working_dates(start: NaiveDate, end: NaiveDate, working_days: &[u8]) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| working_days.contains(&(d.weekday().num_days_from_monday() as u8)))
        .collect()
}
