//! Feasibility validation.
//!
//! Precondition checks run before any search starts. Every check runs
//! independently and all failures are collected into one report, so
//! the user sees every problem in a single pass. An empty report means
//! "safe to attempt generation", not "guaranteed to find a solution".

use std::collections::HashMap;

use crate::collect::DomainData;
use crate::models::{AvailabilityBook, GenerationConfig};

/// A blocking precondition failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    /// Issue category.
    pub kind: IssueKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of precondition failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// No working calendar or exam date range is configured.
    NoCalendar,
    /// No unit is selected, or a selected unit does not exist.
    NoUnits,
    /// No usable space exists.
    NoSpaces,
    /// The slot/day grid yields no usable slot.
    NoUsableSlots,
    /// Aggregate demand exceeds aggregate supply.
    DemandExceedsSupply,
    /// A requirement references a resource-person that does not exist.
    UnresolvedReference,
    /// A resource-person's demanded load exceeds their available
    /// capacity.
    PersonOverloaded,
}

impl ValidationIssue {
    /// Creates an issue.
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a timetable generation config against the domain data.
///
/// Checks:
/// 1. At least one working day is configured
/// 2. At least one unit is selected and every selected unit exists
/// 3. At least one usable space exists
/// 4. At least one teaching slot exists
/// 5. Per-unit demand fits the unit's slot grid
/// 6. Every requirement's resource-person resolves
/// 7. No resource-person is demanded beyond their availability
///
/// Returns every failing check; never stops at the first.
pub fn validate_timetable(config: &GenerationConfig, data: &DomainData) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if config.working_days.is_empty() {
        issues.push(ValidationIssue::new(
            IssueKind::NoCalendar,
            "no working days configured",
        ));
    }

    check_units(config, data, &mut issues);
    check_spaces(data, &mut issues);

    let slots_per_day = data.slots.iter().filter(|s| s.is_teaching()).count();
    if slots_per_day == 0 {
        issues.push(ValidationIssue::new(
            IssueKind::NoUsableSlots,
            "the slot grid contains no teaching slot",
        ));
    }

    // Per-unit demand vs the unit's own slot grid
    let grid_capacity = (slots_per_day * config.working_days.len()) as u64;
    for unit_id in &config.unit_ids {
        let demand: u64 = data
            .requirements
            .iter()
            .filter(|r| &r.unit_id == unit_id)
            .map(|r| r.quantity as u64)
            .sum();
        if demand > grid_capacity {
            issues.push(ValidationIssue::new(
                IssueKind::DemandExceedsSupply,
                format!(
                    "unit '{unit_id}' demands {demand} periods but the calendar \
                     offers only {grid_capacity}"
                ),
            ));
        }
    }

    check_person_load(config, data, slots_per_day as u32, &mut issues);

    issues
}

/// Validates an exam generation config against the domain data.
///
/// Same battery as [`validate_timetable`], with the calendar and
/// supply checks phrased over the exam date range: each (unit,
/// subject) requirement is one exam, and a unit's supply is its usable
/// exam days times the per-day exam cap.
pub fn validate_exams(config: &GenerationConfig, data: &DomainData) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let exam_days = match config.exam_range {
        None => {
            issues.push(ValidationIssue::new(
                IssueKind::NoCalendar,
                "no exam date range configured",
            ));
            0u64
        }
        Some((start, end)) => {
            let days = crate::collect::working_dates(start, end, &config.working_days).len() as u64;
            if days == 0 {
                issues.push(ValidationIssue::new(
                    IssueKind::NoUsableSlots,
                    "the exam date range contains no working day",
                ));
            }
            days
        }
    };

    check_units(config, data, &mut issues);
    check_spaces(data, &mut issues);

    if config.sessions_per_day == 0 {
        issues.push(ValidationIssue::new(
            IssueKind::NoUsableSlots,
            "sessions per day is zero",
        ));
    }

    let per_day = (config.max_exams_per_day.max(1) as u64).min(config.sessions_per_day as u64);
    for unit_id in &config.unit_ids {
        let exams = data
            .requirements
            .iter()
            .filter(|r| &r.unit_id == unit_id)
            .count() as u64;
        let supply = exam_days * per_day;
        if exams > supply {
            issues.push(ValidationIssue::new(
                IssueKind::DemandExceedsSupply,
                format!(
                    "unit '{unit_id}' needs {exams} exam days but the range \
                     offers only {supply}"
                ),
            ));
        }
    }

    // Invigilator load: one session per exam
    let book = AvailabilityBook::from_records(data.availability.iter().cloned());
    let mut per_person: HashMap<&str, u64> = HashMap::new();
    for req in data
        .requirements
        .iter()
        .filter(|r| config.unit_ids.contains(&r.unit_id))
    {
        if !data.persons.iter().any(|p| p.id == req.person_id) {
            issues.push(ValidationIssue::new(
                IssueKind::UnresolvedReference,
                format!(
                    "requirement for unit '{}' references unknown person '{}'",
                    req.unit_id, req.person_id
                ),
            ));
            continue;
        }
        *per_person.entry(req.person_id.as_str()).or_default() += 1;
    }
    for (person_id, demanded) in per_person {
        let capacity =
            book.total_capacity(person_id, &config.working_days, config.sessions_per_day as u32)
                .min(exam_days * config.sessions_per_day as u64);
        if demanded > capacity {
            issues.push(ValidationIssue::new(
                IssueKind::PersonOverloaded,
                format!(
                    "person '{person_id}' is demanded for {demanded} exam sessions \
                     but can cover at most {capacity}"
                ),
            ));
        }
    }

    issues
}

fn check_units(config: &GenerationConfig, data: &DomainData, issues: &mut Vec<ValidationIssue>) {
    if config.unit_ids.is_empty() {
        issues.push(ValidationIssue::new(
            IssueKind::NoUnits,
            "no units selected",
        ));
    }
    for unit_id in &config.unit_ids {
        if !data.units.iter().any(|u| &u.id == unit_id) {
            issues.push(ValidationIssue::new(
                IssueKind::NoUnits,
                format!("selected unit '{unit_id}' does not exist"),
            ));
        }
    }
}

fn check_spaces(data: &DomainData, issues: &mut Vec<ValidationIssue>) {
    if !data.spaces.iter().any(|s| s.available) {
        issues.push(ValidationIssue::new(
            IssueKind::NoSpaces,
            "no usable spaces defined",
        ));
    }
}

fn check_person_load(
    config: &GenerationConfig,
    data: &DomainData,
    slots_per_day: u32,
    issues: &mut Vec<ValidationIssue>,
) {
    let book = AvailabilityBook::from_records(data.availability.iter().cloned());
    let mut per_person: HashMap<&str, u64> = HashMap::new();

    for req in data
        .requirements
        .iter()
        .filter(|r| config.unit_ids.contains(&r.unit_id))
    {
        if !data.persons.iter().any(|p| p.id == req.person_id) {
            issues.push(ValidationIssue::new(
                IssueKind::UnresolvedReference,
                format!(
                    "requirement for unit '{}' references unknown person '{}'",
                    req.unit_id, req.person_id
                ),
            ));
            continue;
        }
        *per_person.entry(req.person_id.as_str()).or_default() += req.quantity as u64;
    }

    for (person_id, demanded) in per_person {
        let capacity = book.total_capacity(person_id, &config.working_days, slots_per_day);
        if demanded > capacity {
            issues.push(ValidationIssue::new(
                IssueKind::PersonOverloaded,
                format!(
                    "person '{person_id}' is demanded for {demanded} periods \
                     but can cover at most {capacity}"
                ),
            ));
        }
    }
}
