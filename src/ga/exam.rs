//! Exam schedule optimization problem.

use chrono::NaiveDate;
use rand::rngs::SmallRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use std::collections::{HashMap, HashSet};

use super::{variance, GaProblem};
use crate::collect::InputBundle;
use crate::csp::{allocate_halls, verify_exams};
use crate::models::{ExamCell, ExamKey, ExamSchedule};

const PENALTY_CAP: f64 = 10.0;

/// Soft-constraint scoring and operators for exam schedules.
///
/// Fitness starts at 100 and subtracts `weight x penalty` per enabled
/// category: invigilator workload imbalance, heavy exams on the same
/// or consecutive days for one unit, wasted hall capacity, and uneven
/// distribution of exams across the date range.
pub struct ExamProblem<'a> {
    bundle: &'a InputBundle,
}

impl<'a> ExamProblem<'a> {
    /// Creates the problem over a collected input bundle.
    pub fn new(bundle: &'a InputBundle) -> Self {
        Self { bundle }
    }

    fn workload_penalty(&self, schedule: &ExamSchedule) -> f64 {
        let persons: HashSet<&str> = self
            .bundle
            .requirements
            .iter()
            .map(|r| r.person_id.as_str())
            .collect();
        let loads: Vec<f64> = persons
            .iter()
            .flat_map(|p| {
                self.bundle
                    .exam_days
                    .iter()
                    .map(|&d| schedule.person_count_on(p, d) as f64)
            })
            .collect();
        variance(&loads).min(PENALTY_CAP)
    }

    fn heavy_adjacency_penalty(&self, schedule: &ExamSchedule) -> f64 {
        let mut penalty = 0u32;
        for unit in &self.bundle.units {
            let mut heavy_dates: Vec<NaiveDate> = schedule
                .iter()
                .filter(|(k, _)| k.unit_id == unit.id && self.bundle.is_heavy(&k.subject_id))
                .map(|(_, c)| c.date)
                .collect();
            heavy_dates.sort_unstable();
            for pair in heavy_dates.windows(2) {
                if (pair[1] - pair[0]).num_days() <= 1 {
                    penalty += 1;
                }
            }
        }
        (penalty as f64).min(PENALTY_CAP)
    }

    fn hall_waste_penalty(&self, schedule: &ExamSchedule) -> f64 {
        let capacity: HashMap<&str, u32> = self
            .bundle
            .spaces
            .iter()
            .map(|s| (s.id.as_str(), s.capacity))
            .collect();

        let mut used: HashSet<(&str, NaiveDate, u8)> = HashSet::new();
        for (_, cell) in schedule.iter() {
            for seating in &cell.halls {
                used.insert((seating.hall_id.as_str(), cell.date, cell.session));
            }
        }
        if used.is_empty() {
            return 0.0;
        }

        let mut waste = 0.0;
        for (hall, date, session) in &used {
            if let Some(&cap) = capacity.get(hall) {
                if cap > 0 {
                    let load = schedule.hall_load(hall, *date, *session);
                    waste += cap.saturating_sub(load) as f64 / cap as f64;
                }
            }
        }
        (PENALTY_CAP * waste / used.len() as f64).min(PENALTY_CAP)
    }

    fn daily_balance_penalty(&self, schedule: &ExamSchedule) -> f64 {
        let mut per_day: HashMap<NaiveDate, u32> = self
            .bundle
            .exam_days
            .iter()
            .map(|&d| (d, 0))
            .collect();
        for (_, cell) in schedule.iter() {
            *per_day.entry(cell.date).or_insert(0) += 1;
        }
        let counts: Vec<f64> = per_day.values().map(|&c| c as f64).collect();
        variance(&counts).min(PENALTY_CAP)
    }

    /// Whether an exam for the unit/person may sit at (date, session),
    /// ignoring the cell currently being moved (already removed).
    fn slot_open(
        &self,
        schedule: &ExamSchedule,
        unit_id: &str,
        person_id: &str,
        date: NaiveDate,
        session: u8,
    ) -> bool {
        let day = InputBundle::day_index(date);
        self.bundle.availability.is_available(person_id, day)
            && schedule.unit_count_on(unit_id, date) < self.bundle.max_exams_per_day
            && schedule.gap_ok(unit_id, date, self.bundle.min_exam_gap_days)
            && (schedule.person_count_on(person_id, date) as u64)
                < self.bundle.availability.max_per_day(person_id, day) as u64
            && !schedule.is_unit_busy(unit_id, date, session)
            && !schedule.is_person_busy(person_id, date, session)
    }

    /// Moves one exam to a different valid (date, session) from a
    /// small shuffled candidate list.
    fn try_move(&self, schedule: &mut ExamSchedule, rng: &mut SmallRng) -> bool {
        let keys: Vec<ExamKey> = schedule.iter().map(|(k, _)| k.clone()).collect();
        let Some(key) = keys.choose(rng) else {
            return false;
        };
        let Some(cell) = schedule.remove(key) else {
            return false;
        };

        let mut candidates: Vec<(NaiveDate, u8)> = self
            .bundle
            .exam_days
            .iter()
            .flat_map(|&d| (0..self.bundle.sessions_per_day).map(move |s| (d, s)))
            .filter(|&(d, s)| !(d == cell.date && s == cell.session))
            .collect();
        candidates.shuffle(rng);

        for (date, session) in candidates.into_iter().take(8) {
            if !self.slot_open(schedule, &key.unit_id, &cell.person_id, date, session) {
                continue;
            }
            let Some(halls) = allocate_halls(self.bundle, schedule, date, session, cell.headcount)
            else {
                continue;
            };
            let moved = ExamCell::new(date, session, &cell.person_id, halls, cell.headcount);
            if schedule.place(key.clone(), moved) {
                return true;
            }
        }
        schedule.place(key.clone(), cell);
        false
    }

    /// Swaps the (date, session) of two exams of one unit.
    fn try_swap(&self, schedule: &mut ExamSchedule, rng: &mut SmallRng) -> bool {
        let Some(unit) = self.bundle.units.choose(rng) else {
            return false;
        };
        let mut keys: Vec<ExamKey> = schedule
            .iter()
            .filter(|(k, _)| k.unit_id == unit.id)
            .map(|(k, _)| k.clone())
            .collect();
        if keys.len() < 2 {
            return false;
        }
        keys.shuffle(rng);
        let (key_a, key_b) = (keys[0].clone(), keys[1].clone());

        let Some(cell_a) = schedule.remove(&key_a) else {
            return false;
        };
        let Some(cell_b) = schedule.remove(&key_b) else {
            schedule.place(key_a, cell_a);
            return false;
        };

        let swapped = (|schedule: &mut ExamSchedule| {
            let halls_a =
                allocate_halls(self.bundle, schedule, cell_b.date, cell_b.session, cell_a.headcount)?;
            let moved_a = ExamCell::new(
                cell_b.date,
                cell_b.session,
                &cell_a.person_id,
                halls_a,
                cell_a.headcount,
            );
            if !schedule.place(key_a.clone(), moved_a) {
                return None;
            }
            let halls_b =
                allocate_halls(self.bundle, schedule, cell_a.date, cell_a.session, cell_b.headcount)?;
            let moved_b = ExamCell::new(
                cell_a.date,
                cell_a.session,
                &cell_b.person_id,
                halls_b,
                cell_b.headcount,
            );
            if !schedule.place(key_b.clone(), moved_b) {
                schedule.remove(&key_a);
                return None;
            }
            Some(())
        })(schedule);

        if swapped.is_some() && self.verify_local(schedule, &key_a) && self.verify_local(schedule, &key_b) {
            return true;
        }

        // Rollback
        schedule.remove(&key_a);
        schedule.remove(&key_b);
        schedule.place(key_a, cell_a);
        schedule.place(key_b, cell_b);
        false
    }

    fn verify_local(&self, schedule: &ExamSchedule, key: &ExamKey) -> bool {
        let Some(cell) = schedule.get(key) else {
            return false;
        };
        let day = InputBundle::day_index(cell.date);
        self.bundle.availability.is_available(&cell.person_id, day)
            && schedule.unit_count_on(&key.unit_id, cell.date) <= self.bundle.max_exams_per_day
            && schedule.gap_ok(&key.unit_id, cell.date, self.bundle.min_exam_gap_days)
            && schedule.person_count_on(&cell.person_id, cell.date) as u64
                <= self.bundle.availability.max_per_day(&cell.person_id, day) as u64
    }

    fn copy_unit(&self, child: &mut ExamSchedule, parent: &ExamSchedule, unit_id: &str) -> bool {
        let mut placed = Vec::new();
        for (key, cell) in parent.iter().filter(|(k, _)| k.unit_id == unit_id) {
            if !child.place(key.clone(), cell.clone()) {
                for key in &placed {
                    child.remove(key);
                }
                return false;
            }
            placed.push(key.clone());
        }
        true
    }
}

impl GaProblem for ExamProblem<'_> {
    type Individual = ExamSchedule;

    fn fitness(&self, schedule: &ExamSchedule) -> f64 {
        let w = &self.bundle.weights;
        let penalty = w.workload_balance * self.workload_penalty(schedule)
            + w.heavy_adjacency * self.heavy_adjacency_penalty(schedule)
            + w.hall_utilization * self.hall_waste_penalty(schedule)
            + w.daily_balance * self.daily_balance_penalty(schedule);
        (100.0 - penalty).max(0.0)
    }

    fn mutate(&self, schedule: &mut ExamSchedule, rng: &mut SmallRng) -> bool {
        for _ in 0..8 {
            let done = if rng.random_bool(0.5) {
                self.try_move(schedule, rng)
            } else {
                self.try_swap(schedule, rng)
            };
            if done {
                return true;
            }
        }
        false
    }

    /// Recombines per unit: a unit's whole exam set is copied from one
    /// parent so its internal date gaps stay consistent, falling back
    /// to the other parent on cross-unit conflicts.
    fn crossover(
        &self,
        a: &ExamSchedule,
        b: &ExamSchedule,
        rng: &mut SmallRng,
    ) -> Option<ExamSchedule> {
        let mut child = ExamSchedule::new();
        for unit in &self.bundle.units {
            let (first, second) = if rng.random_bool(0.5) { (a, b) } else { (b, a) };
            if !self.copy_unit(&mut child, first, &unit.id)
                && !self.copy_unit(&mut child, second, &unit.id)
            {
                return None;
            }
        }
        Some(child)
    }

    fn verify(&self, schedule: &ExamSchedule) -> bool {
        verify_exams(self.bundle, schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{collect, DomainData, InputBundle};
    use crate::csp::ExamGenerator;
    use crate::ga::GaRunner;
    use crate::models::{
        GaSettings, GenerationConfig, HallSeating, Person, Requirement, Slot, Space, Subject, Unit,
    };
    use crate::progress::{Deadline, NullSink};
    use rand::SeedableRng;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn school() -> DomainData {
        DomainData {
            slots: vec![Slot::new("p0", 0, 480, 525)],
            units: vec![Unit::new("8B", 30), Unit::new("9A", 28)],
            subjects: vec![
                Subject::new("MATH").heavy(),
                Subject::new("SCI").heavy(),
                Subject::new("ENG"),
            ],
            persons: vec![Person::new("T1"), Person::new("T2"), Person::new("T3")],
            requirements: vec![
                Requirement::new("8B", "MATH", "T1", 1),
                Requirement::new("8B", "SCI", "T2", 1),
                Requirement::new("8B", "ENG", "T3", 1),
                Requirement::new("9A", "MATH", "T1", 1),
                Requirement::new("9A", "ENG", "T3", 1),
            ],
            availability: Vec::new(),
            spaces: vec![Space::hall("H1", 80), Space::hall("H2", 40)],
        }
    }

    fn seed(data: &DomainData) -> (InputBundle, ExamSchedule) {
        let config = GenerationConfig::for_units(["8B", "9A"])
            .with_exam_range(d(2), d(13), 2)
            .with_exam_limits(2, 1);
        let bundle = collect(&config, data).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let schedule = ExamGenerator::new(&bundle)
            .generate(100_000, &mut rng, Deadline::never(), &NullSink)
            .unwrap();
        (bundle, schedule)
    }

    #[test]
    fn test_fitness_in_range() {
        let data = school();
        let (bundle, schedule) = seed(&data);
        let fitness = ExamProblem::new(&bundle).fitness(&schedule);
        assert!((0.0..=100.0).contains(&fitness));
    }

    #[test]
    fn test_mutation_preserves_hard_constraints() {
        let data = school();
        let (bundle, mut schedule) = seed(&data);
        let problem = ExamProblem::new(&bundle);
        let mut rng = SmallRng::seed_from_u64(7);

        for _ in 0..20 {
            problem.mutate(&mut schedule, &mut rng);
            assert!(problem.verify(&schedule));
        }
        assert_eq!(schedule.len(), 5);
    }

    #[test]
    fn test_crossover_child_is_valid_or_substituted() {
        let data = school();
        let (bundle, schedule) = seed(&data);
        let problem = ExamProblem::new(&bundle);
        let mut rng = SmallRng::seed_from_u64(7);

        let mut other = schedule.clone();
        for _ in 0..5 {
            problem.mutate(&mut other, &mut rng);
        }
        for _ in 0..10 {
            if let Some(child) = problem.crossover(&schedule, &other, &mut rng) {
                // Gap/hall invariants may still fail; the runner
                // re-verifies before acceptance
                let _ = problem.verify(&child);
            }
        }
    }

    #[test]
    fn test_optimizer_never_worsens_seed() {
        let data = school();
        let (bundle, schedule) = seed(&data);
        let problem = ExamProblem::new(&bundle);
        let seed_fitness = problem.fitness(&schedule);

        let mut rng = SmallRng::seed_from_u64(42);
        let outcome = GaRunner::new(GaSettings::default().with_max_generations(15))
            .run(&problem, schedule, &mut rng, Deadline::never(), &NullSink)
            .unwrap();

        assert!(outcome.fitness >= seed_fitness);
        assert!(problem.verify(&outcome.best));
    }

    #[test]
    fn test_hall_waste_penalty_prefers_full_halls() {
        let data = school();
        let config = GenerationConfig::for_units(["8B"])
            .with_exam_range(d(2), d(13), 1)
            .with_exam_limits(2, 1);
        let bundle = collect(&config, &data).unwrap();
        let problem = ExamProblem::new(&bundle);

        let mut tight = ExamSchedule::new();
        tight.place(
            ExamKey::new("8B", "MATH"),
            ExamCell::new(d(2), 0, "T1", vec![HallSeating::new("H2", 30)], 30),
        );
        let mut wasteful = ExamSchedule::new();
        wasteful.place(
            ExamKey::new("8B", "MATH"),
            ExamCell::new(d(2), 0, "T1", vec![HallSeating::new("H1", 30)], 30),
        );

        assert!(problem.hall_waste_penalty(&tight) < problem.hall_waste_penalty(&wasteful));
    }
}
