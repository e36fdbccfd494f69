//! Result serialization.
//!
//! Converts the solver arenas into the serialized assignment sets the
//! surrounding system persists on the run record: keyed by unit (and
//! day, for timetables), deterministic ordering, round-trippable
//! through serde. Warnings derived here are quality observations,
//! never blocking.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::collect::InputBundle;
use crate::models::{ExamSchedule, HallSeating, Timetable};

/// One scheduled period in a unit's week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodEntry {
    /// Teaching-slot index within the day.
    pub slot: usize,
    /// Slot identifier from the working calendar.
    pub slot_id: String,
    /// Subject taught.
    pub subject_id: String,
    /// Assigned teacher.
    pub person_id: String,
    /// Assigned room.
    pub space_id: String,
}

/// Serialized weekly timetable, keyed by unit then day.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimetableReport {
    /// unit id -> day index -> periods in slot order.
    pub units: BTreeMap<String, BTreeMap<u8, Vec<PeriodEntry>>>,
}

impl TimetableReport {
    /// Builds the report from a completed timetable.
    pub fn build(bundle: &InputBundle, timetable: &Timetable) -> Self {
        let mut units: BTreeMap<String, BTreeMap<u8, Vec<PeriodEntry>>> = BTreeMap::new();
        for (key, cell) in timetable.entries() {
            let slot_id = bundle
                .teaching_slots
                .get(key.slot)
                .map(|s| s.id.clone())
                .unwrap_or_default();
            units
                .entry(key.unit_id)
                .or_default()
                .entry(key.day)
                .or_default()
                .push(PeriodEntry {
                    slot: key.slot,
                    slot_id,
                    subject_id: cell.subject_id,
                    person_id: cell.person_id,
                    space_id: cell.space_id,
                });
        }
        Self { units }
    }

    /// Total periods in the report.
    pub fn len(&self) -> usize {
        self.units
            .values()
            .flat_map(|days| days.values())
            .map(|periods| periods.len())
            .sum()
    }

    /// Whether the report is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One scheduled exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamEntry {
    /// Examined subject.
    pub subject_id: String,
    /// Exam date.
    pub date: chrono::NaiveDate,
    /// Session index within the day.
    pub session: u8,
    /// Assigned invigilator.
    pub person_id: String,
    /// Halls seating the unit with their per-hall shares.
    pub halls: Vec<HallSeating>,
    /// Seated headcount.
    pub headcount: u32,
}

/// Serialized exam schedule, keyed by unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExamReport {
    /// unit id -> exams in date order.
    pub units: BTreeMap<String, Vec<ExamEntry>>,
}

impl ExamReport {
    /// Builds the report from a completed exam schedule.
    pub fn build(schedule: &ExamSchedule) -> Self {
        let mut units: BTreeMap<String, Vec<ExamEntry>> = BTreeMap::new();
        for (key, cell) in schedule.entries() {
            units.entry(key.unit_id).or_default().push(ExamEntry {
                subject_id: key.subject_id,
                date: cell.date,
                session: cell.session,
                person_id: cell.person_id,
                halls: cell.halls,
                headcount: cell.headcount,
            });
        }
        for exams in units.values_mut() {
            exams.sort_by(|a, b| (a.date, a.session).cmp(&(b.date, b.session)));
        }
        Self { units }
    }

    /// Total exams in the report.
    pub fn len(&self) -> usize {
        self.units.values().map(|exams| exams.len()).sum()
    }

    /// Whether the report is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Non-blocking quality observations about a timetable.
pub fn timetable_warnings(bundle: &InputBundle, timetable: &Timetable) -> Vec<String> {
    let mut warnings = Vec::new();
    let grid = bundle.slots_per_day() * bundle.working_days.len();
    for unit in &bundle.units {
        let placed: usize = bundle
            .working_days
            .iter()
            .map(|&d| timetable.slots_for_unit_day(&unit.id, d).len())
            .sum();
        let empty = grid.saturating_sub(placed);
        if empty > 0 {
            warnings.push(format!("unit {} has {empty} empty periods", unit.id));
        }
    }
    warnings
}

/// Non-blocking quality observations about an exam schedule.
pub fn exam_warnings(bundle: &InputBundle, schedule: &ExamSchedule) -> Vec<String> {
    let mut warnings = Vec::new();
    for unit in &bundle.units {
        let dates = schedule.dates_for_unit(&unit.id);
        if dates
            .windows(2)
            .any(|pair| (pair[1] - pair[0]).num_days() == 1)
        {
            warnings.push(format!("unit {} has exams on consecutive days", unit.id));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{collect, DomainData};
    use crate::models::{
        ExamCell, ExamKey, GenerationConfig, Person, Requirement, Slot, Space, Subject,
        TimetableCell, TimetableKey, Unit,
    };
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn bundle() -> InputBundle {
        let data = DomainData {
            slots: (0..3)
                .map(|i| Slot::new(format!("p{i}"), i, 480 + i as u16 * 50, 525 + i as u16 * 50))
                .collect(),
            units: vec![Unit::new("8B", 30)],
            subjects: vec![Subject::new("MATH")],
            persons: vec![Person::new("T1")],
            requirements: vec![Requirement::new("8B", "MATH", "T1", 2)],
            availability: Vec::new(),
            spaces: vec![Space::new("R1", 32), Space::hall("H1", 60)],
        };
        let config = GenerationConfig::for_units(["8B"]).with_exam_range(d(2), d(6), 1);
        collect(&config, &data).unwrap()
    }

    #[test]
    fn test_timetable_report_groups_by_unit_and_day() {
        let b = bundle();
        let mut tt = Timetable::new();
        tt.place(TimetableKey::new("8B", 0, 2), TimetableCell::new("MATH", "T1", "R1"));
        tt.place(TimetableKey::new("8B", 0, 0), TimetableCell::new("MATH", "T1", "R1"));

        let report = TimetableReport::build(&b, &tt);
        let monday = &report.units["8B"][&0];
        assert_eq!(monday.len(), 2);
        // Slot order within the day
        assert_eq!(monday[0].slot, 0);
        assert_eq!(monday[1].slot, 2);
        assert_eq!(monday[0].slot_id, "p0");
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_timetable_report_round_trip() {
        let b = bundle();
        let mut tt = Timetable::new();
        tt.place(TimetableKey::new("8B", 1, 0), TimetableCell::new("MATH", "T1", "R1"));

        let report = TimetableReport::build(&b, &tt);
        let json = serde_json::to_string(&report).unwrap();
        let back: TimetableReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, back);
    }

    #[test]
    fn test_exam_report_round_trip() {
        let mut es = ExamSchedule::new();
        es.place(
            ExamKey::new("8B", "MATH"),
            ExamCell::new(d(2), 0, "T1", vec![HallSeating::new("H1", 30)], 30),
        );

        let report = ExamReport::build(&es);
        assert_eq!(report.len(), 1);
        let json = serde_json::to_string(&report).unwrap();
        let back: ExamReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, back);
    }

    #[test]
    fn test_exam_report_sorted_by_date() {
        let mut es = ExamSchedule::new();
        es.place(
            ExamKey::new("8B", "ENG"),
            ExamCell::new(d(6), 0, "T1", vec![HallSeating::new("H1", 30)], 30),
        );
        es.place(
            ExamKey::new("8B", "MATH"),
            ExamCell::new(d(2), 0, "T1", vec![HallSeating::new("H1", 30)], 30),
        );

        let report = ExamReport::build(&es);
        let exams = &report.units["8B"];
        assert_eq!(exams[0].subject_id, "MATH");
        assert_eq!(exams[1].subject_id, "ENG");
    }

    #[test]
    fn test_empty_period_warning() {
        let b = bundle();
        let mut tt = Timetable::new();
        tt.place(TimetableKey::new("8B", 0, 0), TimetableCell::new("MATH", "T1", "R1"));

        // 3 slots x 5 days = 15 grid cells, 1 placed
        let warnings = timetable_warnings(&b, &tt);
        assert_eq!(warnings, vec!["unit 8B has 14 empty periods".to_string()]);
    }

    #[test]
    fn test_consecutive_exam_warning() {
        let b = bundle();
        let mut es = ExamSchedule::new();
        es.place(
            ExamKey::new("8B", "MATH"),
            ExamCell::new(d(2), 0, "T1", vec![HallSeating::new("H1", 30)], 30),
        );
        es.place(
            ExamKey::new("8B", "ENG"),
            ExamCell::new(d(3), 0, "T2", vec![HallSeating::new("H1", 30)], 30),
        );

        let warnings = exam_warnings(&b, &es);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("consecutive days"));
    }
}
