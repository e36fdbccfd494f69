//! Exam schedule assignment arena.
//!
//! Mirrors the timetable arena for the exam pipeline: cells keyed by
//! (unit, subject), with secondary indices for invigilator conflicts,
//! shared hall load, and per-unit exam days. Halls are not exclusive;
//! multiple exams may share one hall while the summed seat counts stay
//! within its capacity, which `hall_load` tracks per (hall, date,
//! session). A unit split across several halls books only its per-hall
//! portion in each.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Composite key of one exam cell: each (unit, subject) sits exactly
/// one exam.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExamKey {
    /// Examined unit.
    pub unit_id: String,
    /// Examined subject.
    pub subject_id: String,
}

impl ExamKey {
    /// Creates a new key.
    pub fn new(unit_id: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            subject_id: subject_id.into(),
        }
    }
}

/// One hall's share of an exam's seating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HallSeating {
    /// Seating hall.
    pub hall_id: String,
    /// Seats this hall contributes to the exam.
    pub seats: u32,
}

impl HallSeating {
    /// Creates a new seating share.
    pub fn new(hall_id: impl Into<String>, seats: u32) -> Self {
        Self {
            hall_id: hall_id.into(),
            seats,
        }
    }
}

/// Value of one exam cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamCell {
    /// Exam date.
    pub date: NaiveDate,
    /// Session index within the day (0-based).
    pub session: u8,
    /// Invigilator assigned to the exam.
    pub person_id: String,
    /// Halls seating the unit with their per-hall shares, in
    /// allocation order. The shares sum to `headcount`.
    pub halls: Vec<HallSeating>,
    /// Headcount seated (the unit's size at placement time).
    pub headcount: u32,
}

impl ExamCell {
    /// Creates a new cell.
    pub fn new(
        date: NaiveDate,
        session: u8,
        person_id: impl Into<String>,
        halls: Vec<HallSeating>,
        headcount: u32,
    ) -> Self {
        Self {
            date,
            session,
            person_id: person_id.into(),
            halls,
            headcount,
        }
    }
}

/// An exam schedule under construction or completed.
#[derive(Debug, Clone, Default)]
pub struct ExamSchedule {
    cells: HashMap<ExamKey, ExamCell>,
    unit_busy: HashSet<(String, NaiveDate, u8)>,
    person_busy: HashSet<(String, NaiveDate, u8)>,
    hall_load: HashMap<(String, NaiveDate, u8), u32>,
    unit_day_count: HashMap<(String, NaiveDate), u32>,
}

impl ExamSchedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places an exam. Returns `false` (and changes nothing) if the
    /// unit or invigilator is already booked at that (date, session).
    /// Hall capacity is the caller's check: it needs the hall sizes,
    /// which the arena does not hold.
    pub fn place(&mut self, key: ExamKey, cell: ExamCell) -> bool {
        if self.cells.contains_key(&key)
            || self.is_unit_busy(&key.unit_id, cell.date, cell.session)
            || self.is_person_busy(&cell.person_id, cell.date, cell.session)
        {
            return false;
        }
        self.unit_busy
            .insert((key.unit_id.clone(), cell.date, cell.session));
        self.person_busy
            .insert((cell.person_id.clone(), cell.date, cell.session));
        for seating in &cell.halls {
            *self
                .hall_load
                .entry((seating.hall_id.clone(), cell.date, cell.session))
                .or_insert(0) += seating.seats;
        }
        *self
            .unit_day_count
            .entry((key.unit_id.clone(), cell.date))
            .or_insert(0) += 1;
        self.cells.insert(key, cell);
        true
    }

    /// Removes an exam, unwinding all indices.
    pub fn remove(&mut self, key: &ExamKey) -> Option<ExamCell> {
        let cell = self.cells.remove(key)?;
        self.unit_busy
            .remove(&(key.unit_id.clone(), cell.date, cell.session));
        self.person_busy
            .remove(&(cell.person_id.clone(), cell.date, cell.session));
        for seating in &cell.halls {
            if let Some(load) = self
                .hall_load
                .get_mut(&(seating.hall_id.clone(), cell.date, cell.session))
            {
                *load -= seating.seats;
                if *load == 0 {
                    self.hall_load
                        .remove(&(seating.hall_id.clone(), cell.date, cell.session));
                }
            }
        }
        if let Some(count) = self
            .unit_day_count
            .get_mut(&(key.unit_id.clone(), cell.date))
        {
            *count -= 1;
            if *count == 0 {
                self.unit_day_count.remove(&(key.unit_id.clone(), cell.date));
            }
        }
        Some(cell)
    }

    /// Gets the cell at a key.
    pub fn get(&self, key: &ExamKey) -> Option<&ExamCell> {
        self.cells.get(key)
    }

    /// Whether the unit already sits an exam at (date, session).
    pub fn is_unit_busy(&self, unit_id: &str, date: NaiveDate, session: u8) -> bool {
        self.unit_busy
            .contains(&(unit_id.to_string(), date, session))
    }

    /// Whether the invigilator is booked at (date, session).
    pub fn is_person_busy(&self, person_id: &str, date: NaiveDate, session: u8) -> bool {
        self.person_busy
            .contains(&(person_id.to_string(), date, session))
    }

    /// Headcount already seated in a hall at (date, session).
    pub fn hall_load(&self, hall_id: &str, date: NaiveDate, session: u8) -> u32 {
        self.hall_load
            .get(&(hall_id.to_string(), date, session))
            .copied()
            .unwrap_or(0)
    }

    /// Number of exams a unit sits on a date.
    pub fn unit_count_on(&self, unit_id: &str, date: NaiveDate) -> u32 {
        self.unit_day_count
            .get(&(unit_id.to_string(), date))
            .copied()
            .unwrap_or(0)
    }

    /// Number of exams an invigilator covers on a date.
    pub fn person_count_on(&self, person_id: &str, date: NaiveDate) -> u32 {
        self.person_busy
            .iter()
            .filter(|(p, d, _)| p == person_id && *d == date)
            .count() as u32
    }

    /// Dates on which a unit sits exams, sorted.
    pub fn dates_for_unit(&self, unit_id: &str) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .unit_day_count
            .keys()
            .filter(|(u, _)| u == unit_id)
            .map(|(_, d)| *d)
            .collect();
        dates.sort_unstable();
        dates
    }

    /// Whether seating the unit on `date` keeps the minimum gap (in
    /// days) to every *other* exam day of that unit. Exams on the
    /// same date are governed by the per-day cap instead.
    pub fn gap_ok(&self, unit_id: &str, date: NaiveDate, min_gap_days: i64) -> bool {
        self.unit_day_count
            .keys()
            .filter(|(u, d)| u == unit_id && *d != date)
            .all(|(_, d)| (date - *d).num_days().abs() >= min_gap_days)
    }

    /// Iterates over all cells.
    pub fn iter(&self) -> impl Iterator<Item = (&ExamKey, &ExamCell)> {
        self.cells.iter()
    }

    /// Entries sorted by key.
    pub fn entries(&self) -> Vec<(ExamKey, ExamCell)> {
        let mut entries: Vec<_> = self
            .cells
            .iter()
            .map(|(k, c)| (k.clone(), c.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Number of placed exams.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no exams are placed.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn cell(
        date: NaiveDate,
        session: u8,
        person: &str,
        halls: &[(&str, u32)],
        headcount: u32,
    ) -> ExamCell {
        ExamCell::new(
            date,
            session,
            person,
            halls.iter().map(|&(h, n)| HallSeating::new(h, n)).collect(),
            headcount,
        )
    }

    #[test]
    fn test_place_and_indices() {
        let mut es = ExamSchedule::new();
        assert!(es.place(
            ExamKey::new("8B", "MATH"),
            cell(d(2), 0, "T1", &[("H1", 30)], 30)
        ));
        assert!(es.is_unit_busy("8B", d(2), 0));
        assert!(es.is_person_busy("T1", d(2), 0));
        assert_eq!(es.hall_load("H1", d(2), 0), 30);
        assert_eq!(es.unit_count_on("8B", d(2)), 1);
    }

    #[test]
    fn test_unit_and_person_conflicts() {
        let mut es = ExamSchedule::new();
        es.place(ExamKey::new("8B", "MATH"), cell(d(2), 0, "T1", &[("H1", 30)], 30));
        // Same unit, same session
        assert!(!es.place(ExamKey::new("8B", "ENG"), cell(d(2), 0, "T2", &[("H2", 30)], 30)));
        // Same invigilator, same session
        assert!(!es.place(ExamKey::new("9A", "MATH"), cell(d(2), 0, "T1", &[("H2", 28)], 28)));
        // Different session is fine
        assert!(es.place(ExamKey::new("9A", "MATH"), cell(d(2), 1, "T1", &[("H2", 28)], 28)));
    }

    #[test]
    fn test_hall_sharing_accumulates() {
        let mut es = ExamSchedule::new();
        es.place(ExamKey::new("8B", "MATH"), cell(d(2), 0, "T1", &[("H1", 30)], 30));
        es.place(ExamKey::new("9A", "MATH"), cell(d(2), 0, "T2", &[("H1", 25)], 25));
        assert_eq!(es.hall_load("H1", d(2), 0), 55);
    }

    #[test]
    fn test_split_unit_books_per_hall_share() {
        // 60 students over two halls: each hall carries only its share
        let mut es = ExamSchedule::new();
        es.place(
            ExamKey::new("8B", "MATH"),
            cell(d(2), 0, "T1", &[("H1", 40), ("H2", 20)], 60),
        );
        assert_eq!(es.hall_load("H1", d(2), 0), 40);
        assert_eq!(es.hall_load("H2", d(2), 0), 20);
    }

    #[test]
    fn test_remove_unwinds() {
        let mut es = ExamSchedule::new();
        let key = ExamKey::new("8B", "MATH");
        es.place(key.clone(), cell(d(2), 0, "T1", &[("H1", 40), ("H2", 20)], 60));

        let removed = es.remove(&key).unwrap();
        assert_eq!(removed.halls.len(), 2);
        assert!(es.is_empty());
        assert!(!es.is_unit_busy("8B", d(2), 0));
        assert_eq!(es.hall_load("H1", d(2), 0), 0);
        assert_eq!(es.hall_load("H2", d(2), 0), 0);
        assert_eq!(es.unit_count_on("8B", d(2)), 0);
    }

    #[test]
    fn test_gap_ok() {
        let mut es = ExamSchedule::new();
        es.place(ExamKey::new("8B", "MATH"), cell(d(2), 0, "T1", &[("H1", 30)], 30));

        assert!(es.gap_ok("8B", d(4), 2)); // 2 days away
        assert!(!es.gap_ok("8B", d(3), 2)); // Only 1 day away
        assert!(es.gap_ok("8B", d(2), 2)); // Same day: gap rule does not apply
        assert!(es.gap_ok("9A", d(3), 2)); // Other units unaffected
    }

    #[test]
    fn test_dates_for_unit_sorted() {
        let mut es = ExamSchedule::new();
        es.place(ExamKey::new("8B", "ENG"), cell(d(9), 0, "T2", &[("H1", 30)], 30));
        es.place(ExamKey::new("8B", "MATH"), cell(d(2), 0, "T1", &[("H1", 30)], 30));
        assert_eq!(es.dates_for_unit("8B"), vec![d(2), d(9)]);
    }

    #[test]
    fn test_person_count_on() {
        let mut es = ExamSchedule::new();
        es.place(ExamKey::new("8B", "MATH"), cell(d(2), 0, "T1", &[("H1", 30)], 30));
        es.place(ExamKey::new("9A", "ENG"), cell(d(2), 1, "T1", &[("H1", 28)], 28));
        assert_eq!(es.person_count_on("T1", d(2)), 2);
        assert_eq!(es.person_count_on("T1", d(3)), 0);
    }
}
