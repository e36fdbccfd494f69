//! Backtracking timetable generator.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tracing::debug;

use super::{expand_tasks, order_tasks, Halt, PlacementTask, SearchBudget};
use crate::collect::InputBundle;
use crate::error::EngineError;
use crate::models::{Timetable, TimetableCell, TimetableKey};
use crate::progress::{Deadline, ProgressSink};

/// Depth-first backtracking search over the weekly slot grid.
///
/// Produces *a* hard-constraint-valid timetable or reports
/// infeasibility once the iteration budget runs out. No partial result
/// survives a failed search.
pub struct TimetableGenerator<'a> {
    bundle: &'a InputBundle,
}

impl<'a> TimetableGenerator<'a> {
    /// Creates a generator over a collected input bundle.
    pub fn new(bundle: &'a InputBundle) -> Self {
        Self { bundle }
    }

    /// Runs the search.
    pub fn generate(
        &self,
        iteration_cap: u64,
        rng: &mut SmallRng,
        deadline: Deadline,
        sink: &dyn ProgressSink,
    ) -> Result<Timetable, EngineError> {
        let mut tasks = expand_tasks(self.bundle);
        order_tasks(&mut tasks, self.bundle, rng);
        debug!(tasks = tasks.len(), "timetable search starting");

        let mut timetable = Timetable::new();
        let mut budget = SearchBudget::new(iteration_cap);

        match self.solve(&mut timetable, &tasks, 0, &mut budget, rng, deadline, sink) {
            Ok(true) => {
                debug!(iterations = budget.used(), "timetable search solved");
                sink.report(100, "all periods placed");
                Ok(timetable)
            }
            Ok(false) | Err(Halt::Budget) => Err(EngineError::Infeasible {
                iterations: budget.used(),
                hint: "add teaching slots, relax daily limits, or add resource-persons".into(),
            }),
            Err(Halt::Deadline) => Err(EngineError::Timeout {
                phase: "timetable generation",
            }),
        }
    }

    fn solve(
        &self,
        timetable: &mut Timetable,
        tasks: &[PlacementTask],
        index: usize,
        budget: &mut SearchBudget,
        rng: &mut SmallRng,
        deadline: Deadline,
        sink: &dyn ProgressSink,
    ) -> Result<bool, Halt> {
        if index == tasks.len() {
            return Ok(true);
        }
        let task = &tasks[index];

        let mut candidates = self.start_positions(timetable, task);
        candidates.shuffle(rng);

        for (day, start) in candidates {
            if !budget.consume() {
                return Err(Halt::Budget);
            }
            if budget.used() % 256 == 0 && deadline.expired() {
                return Err(Halt::Deadline);
            }
            if budget.used() % 2048 == 0 {
                sink.report(
                    (index * 100 / tasks.len()).min(99) as u8,
                    &format!("placing period blocks ({index}/{} tasks)", tasks.len()),
                );
            }

            let Some(placed) = self.place_block(timetable, task, day, start) else {
                continue;
            };
            if self.solve(timetable, tasks, index + 1, budget, rng, deadline, sink)? {
                return Ok(true);
            }
            for key in &placed {
                timetable.remove(key);
            }
        }
        Ok(false)
    }

    /// Enumerates (day, start slot) positions where the whole block
    /// keeps every hard constraint satisfiable.
    fn start_positions(&self, timetable: &Timetable, task: &PlacementTask) -> Vec<(u8, usize)> {
        let slots = &self.bundle.teaching_slots;
        let block = task.block_size;
        if block > slots.len() {
            return Vec::new();
        }

        let mut out = Vec::new();
        for &day in &self.bundle.working_days {
            let max_per_day = self.bundle.availability.max_per_day(&task.person_id, day) as u64;
            if timetable.person_day_load(&task.person_id, day) as u64 + block as u64 > max_per_day {
                continue;
            }
            for start in 0..=(slots.len() - block) {
                if self.block_fits(timetable, task, day, start) {
                    out.push((day, start));
                }
            }
        }
        out
    }

    fn block_fits(&self, timetable: &Timetable, task: &PlacementTask, day: u8, start: usize) -> bool {
        let slots = &self.bundle.teaching_slots;
        for offset in 0..task.block_size {
            let idx = start + offset;
            let slot = &slots[idx];
            // A break between two grid positions splits the block
            if offset > 0 && slot.position != slots[idx - 1].position + 1 {
                return false;
            }
            if timetable.is_unit_busy(&task.unit_id, day, idx)
                || timetable.is_person_busy(&task.person_id, day, idx)
                || !self.bundle.availability.allows_slot(&task.person_id, day, slot)
            {
                return false;
            }
        }

        let max_run = self.bundle.availability.max_consecutive(&task.person_id, day) as u64;
        if max_run < u32::MAX as u64 {
            let mut before = 0u64;
            let mut s = start;
            while s > 0 && timetable.is_person_busy(&task.person_id, day, s - 1) {
                before += 1;
                s -= 1;
            }
            let mut after = 0u64;
            let mut s = start + task.block_size - 1;
            while timetable.is_person_busy(&task.person_id, day, s + 1) {
                after += 1;
                s += 1;
            }
            if before + task.block_size as u64 + after > max_run {
                return false;
            }
        }
        true
    }

    /// Tentatively places the block, reserving a space per slot via a
    /// greedy largest-capacity-first pick. Returns the placed keys, or
    /// `None` (with everything rolled back) if any slot has no
    /// eligible space.
    fn place_block(
        &self,
        timetable: &mut Timetable,
        task: &PlacementTask,
        day: u8,
        start: usize,
    ) -> Option<Vec<TimetableKey>> {
        let headcount = self.bundle.headcount(&task.unit_id);
        let mut placed = Vec::with_capacity(task.block_size);

        for offset in 0..task.block_size {
            let idx = start + offset;
            let space = self.pick_space(timetable, task, day, idx, headcount);
            let ok = match space {
                Some(space_id) => timetable.place(
                    TimetableKey::new(&task.unit_id, day, idx),
                    TimetableCell::new(&task.subject_id, &task.person_id, space_id),
                ),
                None => false,
            };
            if !ok {
                for key in &placed {
                    timetable.remove(key);
                }
                return None;
            }
            placed.push(TimetableKey::new(&task.unit_id, day, idx));
        }
        Some(placed)
    }

    /// Largest-capacity-first pick among eligible, unused spaces.
    fn pick_space(
        &self,
        timetable: &Timetable,
        task: &PlacementTask,
        day: u8,
        slot: usize,
        headcount: u32,
    ) -> Option<String> {
        self.bundle
            .spaces
            .iter()
            .filter(|s| {
                s.capacity >= headcount
                    && !timetable.is_space_busy(&s.id, day, slot)
                    && match (&task.needs_special_space, &task.preferred_space_kind) {
                        (true, Some(kind)) => &s.kind == kind,
                        (true, None) => s.is_special(),
                        (false, _) => true,
                    }
            })
            .max_by_key(|s| s.capacity)
            .map(|s| s.id.clone())
    }
}

/// Checks every hard constraint of a finished timetable: exact
/// quantity placement per requirement (including space-type demands),
/// availability windows, and daily/consecutive caps. The optimizer
/// runs this on every candidate before acceptance.
pub fn verify_timetable(bundle: &InputBundle, timetable: &Timetable) -> bool {
    // Exact placement per (unit, subject, person) demand
    let mut demanded: HashMap<(&str, &str, &str), u32> = HashMap::new();
    for req in &bundle.requirements {
        *demanded
            .entry((&req.unit_id, &req.subject_id, &req.person_id))
            .or_insert(0) += req.quantity;
    }
    let mut placed: HashMap<(&str, &str, &str), u32> = HashMap::new();
    for (key, cell) in timetable.iter() {
        *placed
            .entry((&key.unit_id, &cell.subject_id, &cell.person_id))
            .or_insert(0) += 1;
    }
    if demanded != placed {
        return false;
    }

    let space_kind: HashMap<&str, &crate::models::Space> =
        bundle.spaces.iter().map(|s| (s.id.as_str(), s)).collect();

    for (key, cell) in timetable.iter() {
        let slot = match bundle.teaching_slots.get(key.slot) {
            Some(slot) => slot,
            None => return false,
        };
        if !bundle.availability.allows_slot(&cell.person_id, key.day, slot) {
            return false;
        }
        let run = timetable.person_run_with(&cell.person_id, key.day, key.slot);
        if run > bundle.availability.max_consecutive(&cell.person_id, key.day) {
            return false;
        }

        // Space-type demand of the matching requirement
        let req = bundle.requirements.iter().find(|r| {
            r.unit_id == key.unit_id
                && r.subject_id == cell.subject_id
                && r.person_id == cell.person_id
        });
        if let Some(req) = req {
            if req.needs_special_space {
                let ok = match (&req.preferred_space_kind, space_kind.get(cell.space_id.as_str())) {
                    (Some(kind), Some(space)) => &space.kind == kind,
                    (None, Some(space)) => space.is_special(),
                    (_, None) => false,
                };
                if !ok {
                    return false;
                }
            }
        }
    }

    for unit in &bundle.units {
        for &day in &bundle.working_days {
            for slot in timetable.slots_for_unit_day(&unit.id, day) {
                if let Some(cell) = timetable.get(&TimetableKey::new(&unit.id, day, slot)) {
                    let load = timetable.person_day_load(&cell.person_id, day);
                    if load > bundle.availability.max_per_day(&cell.person_id, day) {
                        return false;
                    }
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{collect, DomainData};
    use crate::models::{
        GenerationConfig, Person, PersonDayAvailability, Requirement, Slot, Space, SpaceKind,
        Subject, Unit,
    };
    use crate::progress::NullSink;
    use rand::SeedableRng;

    fn slots(n: usize) -> Vec<Slot> {
        (0..n)
            .map(|i| Slot::new(format!("p{i}"), i, 480 + i as u16 * 50, 525 + i as u16 * 50))
            .collect()
    }

    fn school() -> DomainData {
        DomainData {
            slots: slots(5),
            units: vec![Unit::new("8B", 30), Unit::new("9A", 28)],
            subjects: vec![
                Subject::new("MATH").heavy(),
                Subject::new("ENG"),
                Subject::new("CHEM"),
            ],
            persons: vec![Person::new("T1"), Person::new("T2"), Person::new("T3")],
            requirements: vec![
                Requirement::new("8B", "MATH", "T1", 5),
                Requirement::new("8B", "ENG", "T2", 4),
                Requirement::new("8B", "CHEM", "T3", 3).with_special_space(SpaceKind::Lab),
                Requirement::new("9A", "MATH", "T1", 5),
                Requirement::new("9A", "ENG", "T2", 4),
            ],
            availability: Vec::new(),
            spaces: vec![
                Space::new("R1", 32),
                Space::new("R2", 30),
                Space::new("L1", 30).with_kind(SpaceKind::Lab),
            ],
        }
    }

    fn generate(data: &DomainData, units: &[&str]) -> Result<Timetable, EngineError> {
        let config = GenerationConfig::for_units(units.iter().copied());
        let bundle = collect(&config, data).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        TimetableGenerator::new(&bundle).generate(
            100_000,
            &mut rng,
            Deadline::never(),
            &NullSink,
        )
    }

    #[test]
    fn test_generates_feasible_timetable() {
        let data = school();
        let tt = generate(&data, &["8B", "9A"]).unwrap();

        let config = GenerationConfig::for_units(["8B", "9A"]);
        let bundle = collect(&config, &data).unwrap();
        assert_eq!(tt.len(), 21); // 5+4+3 + 5+4
        assert!(verify_timetable(&bundle, &tt));
    }

    #[test]
    fn test_special_space_requirements_honored() {
        let data = school();
        let tt = generate(&data, &["8B"]).unwrap();
        for (key, cell) in tt.iter() {
            if cell.subject_id == "CHEM" {
                assert_eq!(cell.space_id, "L1", "CHEM must sit in the lab at {key:?}");
            }
        }
    }

    #[test]
    fn test_double_periods_are_contiguous() {
        let mut data = school();
        data.requirements = vec![Requirement::new("8B", "MATH", "T1", 4).with_block_size(2)];
        let tt = generate(&data, &["8B"]).unwrap();

        // Every placed slot must have a neighbor from the same block
        for (key, _) in tt.iter() {
            let slots = tt.slots_for_unit_day(&key.unit_id, key.day);
            assert!(slots
                .iter()
                .any(|&s| s != key.slot && (s as i64 - key.slot as i64).abs() == 1));
        }
    }

    #[test]
    fn test_overconstrained_person_is_infeasible() {
        // Two subjects demand 2 periods/day total, person caps at 1/day
        let mut data = school();
        data.requirements = vec![
            Requirement::new("8B", "MATH", "T1", 5),
            Requirement::new("8B", "ENG", "T1", 5),
        ];
        data.availability = (0..5)
            .map(|d| PersonDayAvailability::new("T1", d).with_max_per_day(1))
            .collect();

        match generate(&data, &["8B"]) {
            Err(EngineError::Infeasible { hint, .. }) => assert!(!hint.is_empty()),
            other => panic!("expected Infeasible, got {other:?}"),
        }
    }

    #[test]
    fn test_no_eligible_space_is_placement_failure_not_panic() {
        let mut data = school();
        // Lab requirement but no lab exists
        data.spaces = vec![Space::new("R1", 32)];
        data.requirements = vec![Requirement::new("8B", "CHEM", "T3", 2)
            .with_special_space(SpaceKind::Lab)];

        assert!(matches!(
            generate(&data, &["8B"]),
            Err(EngineError::Infeasible { .. })
        ));
    }

    #[test]
    fn test_day_off_is_respected() {
        let mut data = school();
        data.requirements = vec![Requirement::new("8B", "MATH", "T1", 4)];
        data.availability = vec![PersonDayAvailability::new("T1", 0).day_off()];

        let tt = generate(&data, &["8B"]).unwrap();
        for (key, cell) in tt.iter() {
            assert!(!(cell.person_id == "T1" && key.day == 0));
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let data = school();
        let a = generate(&data, &["8B", "9A"]).unwrap();
        let b = generate(&data, &["8B", "9A"]).unwrap();
        assert_eq!(a.entries(), b.entries());
    }

    #[test]
    fn test_budget_exhaustion_reports_iterations() {
        let mut data = school();
        data.requirements = vec![
            Requirement::new("8B", "MATH", "T1", 5),
            Requirement::new("8B", "ENG", "T1", 5),
        ];
        data.availability = (0..5)
            .map(|d| PersonDayAvailability::new("T1", d).with_max_per_day(1))
            .collect();

        let config = GenerationConfig::for_units(["8B"]);
        let bundle = collect(&config, &data).unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        let err = TimetableGenerator::new(&bundle)
            .generate(50, &mut rng, Deadline::never(), &NullSink)
            .unwrap_err();
        match err {
            EngineError::Infeasible { iterations, .. } => assert!(iterations <= 50),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_verify_rejects_underplacement() {
        let data = school();
        let config = GenerationConfig::for_units(["8B"]);
        let bundle = collect(&config, &data).unwrap();
        let tt = Timetable::new(); // Nothing placed
        assert!(!verify_timetable(&bundle, &tt));
    }
}
