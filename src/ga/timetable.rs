//! Timetable optimization problem.

use rand::rngs::SmallRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use std::collections::{HashMap, HashSet};

use super::{variance, GaProblem};
use crate::collect::InputBundle;
use crate::csp::verify_timetable;
use crate::models::{Timetable, TimetableKey};

/// Caps each penalty category so one bad dimension cannot zero the
/// whole score.
const PENALTY_CAP: f64 = 10.0;

/// Soft-constraint scoring and operators for weekly timetables.
///
/// Fitness starts at 100 and subtracts `weight x penalty` per enabled
/// category: teacher workload imbalance, heavy subjects in adjacent
/// periods, subjects clustered into too few days, and placements
/// outside preferred slots.
pub struct TimetableProblem<'a> {
    bundle: &'a InputBundle,
}

impl<'a> TimetableProblem<'a> {
    /// Creates the problem over a collected input bundle.
    pub fn new(bundle: &'a InputBundle) -> Self {
        Self { bundle }
    }

    fn workload_penalty(&self, timetable: &Timetable) -> f64 {
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
                    .working_days
                    .iter()
                    .map(|&d| timetable.person_day_load(p, d) as f64)
            })
            .collect();
        variance(&loads).min(PENALTY_CAP)
    }

    fn heavy_adjacency_penalty(&self, timetable: &Timetable) -> f64 {
        let mut adjacent = 0u32;
        for unit in &self.bundle.units {
            for &day in &self.bundle.working_days {
                let slots = timetable.slots_for_unit_day(&unit.id, day);
                for pair in slots.windows(2) {
                    if pair[1] != pair[0] + 1 {
                        continue;
                    }
                    let both_heavy = [pair[0], pair[1]].iter().all(|&s| {
                        timetable
                            .get(&TimetableKey::new(&unit.id, day, s))
                            .map(|c| self.bundle.is_heavy(&c.subject_id))
                            .unwrap_or(false)
                    });
                    if both_heavy {
                        adjacent += 1;
                    }
                }
            }
        }
        (adjacent as f64).min(PENALTY_CAP)
    }

    fn spread_penalty(&self, timetable: &Timetable) -> f64 {
        let mut day_sets: HashMap<(&str, &str), HashSet<u8>> = HashMap::new();
        let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
        for (key, cell) in timetable.iter() {
            let group = (key.unit_id.as_str(), cell.subject_id.as_str());
            day_sets.entry(group).or_default().insert(key.day);
            *counts.entry(group).or_insert(0) += 1;
        }

        let mut penalty = 0.0;
        for (group, count) in counts {
            let distinct = day_sets.get(&group).map(|s| s.len()).unwrap_or(0);
            let ideal = count.min(self.bundle.working_days.len());
            penalty += ideal.saturating_sub(distinct) as f64;
        }
        penalty.min(PENALTY_CAP)
    }

    fn preference_penalty(&self, timetable: &Timetable) -> f64 {
        let misses = timetable
            .iter()
            .filter(|(key, cell)| {
                !self
                    .bundle
                    .availability
                    .prefers_slot(&cell.person_id, key.day, key.slot)
            })
            .count();
        (misses as f64).min(PENALTY_CAP)
    }

    /// Swaps the slots of two cells of one (unit, day), rolling back
    /// unless the swap keeps every hard constraint.
    fn try_swap(&self, timetable: &mut Timetable, rng: &mut SmallRng) -> bool {
        let Some(unit) = self.bundle.units.choose(rng) else {
            return false;
        };
        let Some(&day) = self.bundle.working_days.choose(rng) else {
            return false;
        };
        let mut slots = timetable.slots_for_unit_day(&unit.id, day);
        if slots.len() < 2 {
            return false;
        }
        slots.shuffle(rng);
        let (slot_a, slot_b) = (slots[0], slots[1]);

        let key_a = TimetableKey::new(&unit.id, day, slot_a);
        let key_b = TimetableKey::new(&unit.id, day, slot_b);
        let Some(cell_a) = timetable.remove(&key_a) else {
            return false;
        };
        let Some(cell_b) = timetable.remove(&key_b) else {
            timetable.place(key_a, cell_a);
            return false;
        };

        let swapped = timetable.place(key_a.clone(), cell_b.clone())
            && timetable.place(key_b.clone(), cell_a.clone())
            && self.swap_is_legal(timetable, &key_a)
            && self.swap_is_legal(timetable, &key_b);
        if swapped {
            return true;
        }

        // Rollback to the original arrangement
        timetable.remove(&key_a);
        timetable.remove(&key_b);
        timetable.place(key_a, cell_a);
        timetable.place(key_b, cell_b);
        false
    }

    fn swap_is_legal(&self, timetable: &Timetable, key: &TimetableKey) -> bool {
        let Some(cell) = timetable.get(key) else {
            return false;
        };
        let Some(slot) = self.bundle.teaching_slots.get(key.slot) else {
            return false;
        };
        self.bundle
            .availability
            .allows_slot(&cell.person_id, key.day, slot)
            && timetable.person_run_with(&cell.person_id, key.day, key.slot)
                <= self
                    .bundle
                    .availability
                    .max_consecutive(&cell.person_id, key.day)
    }

    fn copy_group(&self, child: &mut Timetable, parent: &Timetable, unit_id: &str, day: u8) -> bool {
        let mut placed = Vec::new();
        for slot in parent.slots_for_unit_day(unit_id, day) {
            let key = TimetableKey::new(unit_id, day, slot);
            let Some(cell) = parent.get(&key) else {
                continue;
            };
            if !child.place(key.clone(), cell.clone()) {
                for key in &placed {
                    child.remove(key);
                }
                return false;
            }
            placed.push(key);
        }
        true
    }
}

impl GaProblem for TimetableProblem<'_> {
    type Individual = Timetable;

    fn fitness(&self, timetable: &Timetable) -> f64 {
        let w = &self.bundle.weights;
        let penalty = w.workload_balance * self.workload_penalty(timetable)
            + w.heavy_adjacency * self.heavy_adjacency_penalty(timetable)
            + w.subject_spread * self.spread_penalty(timetable)
            + w.preferred_slots * self.preference_penalty(timetable);
        (100.0 - penalty).max(0.0)
    }

    fn mutate(&self, timetable: &mut Timetable, rng: &mut SmallRng) -> bool {
        for _ in 0..8 {
            if self.try_swap(timetable, rng) {
                return true;
            }
        }
        false
    }

    /// Recombines at (unit, day) granularity: each group is copied
    /// wholesale from one parent, falling back to the other when the
    /// copy conflicts with what the child already holds.
    fn crossover(&self, a: &Timetable, b: &Timetable, rng: &mut SmallRng) -> Option<Timetable> {
        let mut child = Timetable::new();
        for unit in &self.bundle.units {
            for &day in &self.bundle.working_days {
                let (first, second) = if rng.random_bool(0.5) {
                    (a, b)
                } else {
                    (b, a)
                };
                if !self.copy_group(&mut child, first, &unit.id, day)
                    && !self.copy_group(&mut child, second, &unit.id, day)
                {
                    return None;
                }
            }
        }
        Some(child)
    }

    fn verify(&self, timetable: &Timetable) -> bool {
        verify_timetable(self.bundle, timetable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{collect, DomainData, InputBundle};
    use crate::csp::TimetableGenerator;
    use crate::ga::GaRunner;
    use crate::models::{
        GaSettings, GenerationConfig, Person, PersonDayAvailability, Requirement, Slot, Space,
        Subject, Unit,
    };
    use crate::progress::{Deadline, NullSink};
    use rand::SeedableRng;

    fn school() -> DomainData {
        DomainData {
            slots: (0..5)
                .map(|i| Slot::new(format!("p{i}"), i, 480 + i as u16 * 50, 525 + i as u16 * 50))
                .collect(),
            units: vec![Unit::new("8B", 30), Unit::new("9A", 28)],
            subjects: vec![
                Subject::new("MATH").heavy(),
                Subject::new("SCI").heavy(),
                Subject::new("ENG"),
                Subject::new("ART"),
            ],
            persons: vec![
                Person::new("T1"),
                Person::new("T2"),
                Person::new("T3"),
                Person::new("T4"),
            ],
            requirements: vec![
                Requirement::new("8B", "MATH", "T1", 5),
                Requirement::new("8B", "SCI", "T2", 3),
                Requirement::new("8B", "ENG", "T3", 4),
                Requirement::new("8B", "ART", "T4", 2),
                Requirement::new("9A", "MATH", "T1", 5),
                Requirement::new("9A", "ENG", "T3", 4),
            ],
            availability: vec![PersonDayAvailability::new("T4", 0).with_preferred_slots(vec![0, 1])],
            spaces: vec![Space::new("R1", 32), Space::new("R2", 30)],
        }
    }

    fn seed(data: &DomainData) -> (InputBundle, Timetable) {
        let config = GenerationConfig::for_units(["8B", "9A"]);
        let bundle = collect(&config, data).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let tt = TimetableGenerator::new(&bundle)
            .generate(100_000, &mut rng, Deadline::never(), &NullSink)
            .unwrap();
        (bundle, tt)
    }

    #[test]
    fn test_fitness_in_range() {
        let data = school();
        let (bundle, tt) = seed(&data);
        let fitness = TimetableProblem::new(&bundle).fitness(&tt);
        assert!((0.0..=100.0).contains(&fitness));
    }

    #[test]
    fn test_mutation_preserves_hard_constraints() {
        let data = school();
        let (bundle, mut tt) = seed(&data);
        let problem = TimetableProblem::new(&bundle);
        let mut rng = SmallRng::seed_from_u64(7);

        let before = tt.len();
        for _ in 0..20 {
            problem.mutate(&mut tt, &mut rng);
            assert!(problem.verify(&tt));
        }
        assert_eq!(tt.len(), before);
    }

    #[test]
    fn test_crossover_child_is_valid_or_substituted() {
        let data = school();
        let (bundle, tt) = seed(&data);
        let problem = TimetableProblem::new(&bundle);
        let mut rng = SmallRng::seed_from_u64(7);

        let mut other = tt.clone();
        for _ in 0..5 {
            problem.mutate(&mut other, &mut rng);
        }
        for _ in 0..10 {
            if let Some(child) = problem.crossover(&tt, &other, &mut rng) {
                assert!(problem.verify(&child));
            }
        }
    }

    #[test]
    fn test_optimizer_never_worsens_seed() {
        let data = school();
        let (bundle, tt) = seed(&data);
        let problem = TimetableProblem::new(&bundle);
        let seed_fitness = problem.fitness(&tt);

        let mut rng = SmallRng::seed_from_u64(42);
        let outcome = GaRunner::new(GaSettings::default().with_max_generations(20))
            .run(&problem, tt, &mut rng, Deadline::never(), &NullSink)
            .unwrap();

        assert!(outcome.fitness >= seed_fitness);
        assert!(problem.verify(&outcome.best));
    }

    #[test]
    fn test_preference_penalty_counts_misses() {
        let data = school();
        let (bundle, tt) = seed(&data);
        let problem = TimetableProblem::new(&bundle);

        // T4 prefers slots 0-1 on Monday; every other T4 Monday cell
        // is a miss
        let misses = tt
            .iter()
            .filter(|(k, c)| c.person_id == "T4" && k.day == 0 && k.slot > 1)
            .count() as f64;
        assert!((problem.preference_penalty(&tt) - misses).abs() < 1e-9);
    }
}
