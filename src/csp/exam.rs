//! Backtracking exam-schedule generator.

use chrono::NaiveDate;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tracing::debug;

use super::{order_tasks, Halt, PlacementTask, SearchBudget};
use crate::collect::InputBundle;
use crate::error::EngineError;
use crate::models::{ExamCell, ExamKey, ExamSchedule, HallSeating, SpaceKind};
use crate::progress::{Deadline, ProgressSink};

/// Depth-first backtracking search over the exam date grid.
///
/// One task per (unit, subject) requirement; candidates are
/// (date, session) pairs that keep the invigilator free, the per-day
/// cap, and the minimum gap between a unit's exam days. Units may
/// spill across several halls; halls are shared up to capacity.
pub struct ExamGenerator<'a> {
    bundle: &'a InputBundle,
}

impl<'a> ExamGenerator<'a> {
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
    ) -> Result<ExamSchedule, EngineError> {
        // One exam per (unit, subject) requirement, whatever its
        // weekly period quantity says
        let mut tasks: Vec<PlacementTask> = self
            .bundle
            .requirements
            .iter()
            .enumerate()
            .map(|(index, req)| PlacementTask {
                requirement_index: index,
                unit_id: req.unit_id.clone(),
                subject_id: req.subject_id.clone(),
                person_id: req.person_id.clone(),
                block_size: 1,
                needs_special_space: false,
                preferred_space_kind: None,
            })
            .collect();
        order_tasks(&mut tasks, self.bundle, rng);
        debug!(tasks = tasks.len(), days = self.bundle.exam_days.len(), "exam search starting");

        let mut schedule = ExamSchedule::new();
        let mut budget = SearchBudget::new(iteration_cap);

        match self.solve(&mut schedule, &tasks, 0, &mut budget, rng, deadline, sink) {
            Ok(true) => {
                debug!(iterations = budget.used(), "exam search solved");
                sink.report(100, "all exams placed");
                Ok(schedule)
            }
            Ok(false) | Err(Halt::Budget) => Err(EngineError::Infeasible {
                iterations: budget.used(),
                hint: "extend the date range, relax the minimum gap, or add invigilators".into(),
            }),
            Err(Halt::Deadline) => Err(EngineError::Timeout {
                phase: "exam generation",
            }),
        }
    }

    fn solve(
        &self,
        schedule: &mut ExamSchedule,
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

        let mut candidates = self.slot_candidates(schedule, task);
        candidates.shuffle(rng);

        for (date, session) in candidates {
            if !budget.consume() {
                return Err(Halt::Budget);
            }
            if budget.used() % 256 == 0 && deadline.expired() {
                return Err(Halt::Deadline);
            }
            if budget.used() % 2048 == 0 {
                sink.report(
                    (index * 100 / tasks.len()).min(99) as u8,
                    &format!("placing exams ({index}/{} tasks)", tasks.len()),
                );
            }

            let headcount = self.bundle.headcount(&task.unit_id);
            let Some(halls) = allocate_halls(self.bundle, schedule, date, session, headcount)
            else {
                continue;
            };
            let key = ExamKey::new(&task.unit_id, &task.subject_id);
            let cell = ExamCell::new(date, session, &task.person_id, halls, headcount);
            if !schedule.place(key.clone(), cell) {
                continue;
            }
            if self.solve(schedule, tasks, index + 1, budget, rng, deadline, sink)? {
                return Ok(true);
            }
            schedule.remove(&key);
        }
        Ok(false)
    }

    /// Enumerates (date, session) pairs that keep invariants
    /// satisfiable for the task.
    fn slot_candidates(&self, schedule: &ExamSchedule, task: &PlacementTask) -> Vec<(NaiveDate, u8)> {
        let mut out = Vec::new();
        for &date in &self.bundle.exam_days {
            let day = InputBundle::day_index(date);
            if !self.bundle.availability.is_available(&task.person_id, day) {
                continue;
            }
            if schedule.unit_count_on(&task.unit_id, date) >= self.bundle.max_exams_per_day {
                continue;
            }
            if !schedule.gap_ok(&task.unit_id, date, self.bundle.min_exam_gap_days) {
                continue;
            }
            if schedule.person_count_on(&task.person_id, date) as u64
                >= self.bundle.availability.max_per_day(&task.person_id, day) as u64
            {
                continue;
            }
            for session in 0..self.bundle.sessions_per_day {
                if schedule.is_unit_busy(&task.unit_id, date, session)
                    || schedule.is_person_busy(&task.person_id, date, session)
                {
                    continue;
                }
                out.push((date, session));
            }
        }
        out
    }
}

/// Greedy largest-remaining-capacity-first hall allocation. A unit
/// spills into further halls until fully seated, each hall carrying
/// only its share of the headcount; `None` when the session has no
/// room left for the headcount.
pub(crate) fn allocate_halls(
    bundle: &InputBundle,
    schedule: &ExamSchedule,
    date: NaiveDate,
    session: u8,
    headcount: u32,
) -> Option<Vec<HallSeating>> {
    let mut halls: Vec<_> = bundle
        .spaces
        .iter()
        .filter(|s| s.kind == SpaceKind::Hall)
        .collect();
    if halls.is_empty() {
        // No dedicated halls: any space can seat an exam
        halls = bundle.spaces.iter().collect();
    }
    halls.sort_by_key(|s| {
        std::cmp::Reverse(s.capacity.saturating_sub(schedule.hall_load(&s.id, date, session)))
    });

    let mut chosen = Vec::new();
    let mut seated = 0u32;
    for hall in halls {
        if seated == headcount {
            break;
        }
        let remaining = hall.capacity.saturating_sub(schedule.hall_load(&hall.id, date, session));
        if remaining == 0 {
            continue;
        }
        let seats = remaining.min(headcount - seated);
        seated += seats;
        chosen.push(HallSeating::new(&hall.id, seats));
    }
    (seated == headcount).then_some(chosen)
}

/// Checks every hard constraint of a finished exam schedule: one exam
/// per requirement with the demanded invigilator, per-day caps, the
/// minimum gap between a unit's exam days, hall capacities, and
/// invigilator availability.
pub fn verify_exams(bundle: &InputBundle, schedule: &ExamSchedule) -> bool {
    if schedule.len() != bundle.requirements.len() {
        return false;
    }
    for req in &bundle.requirements {
        match schedule.get(&ExamKey::new(&req.unit_id, &req.subject_id)) {
            Some(cell) if cell.person_id == req.person_id => {}
            _ => return false,
        }
    }

    let capacity: HashMap<&str, u32> = bundle
        .spaces
        .iter()
        .map(|s| (s.id.as_str(), s.capacity))
        .collect();

    for (key, cell) in schedule.iter() {
        if !bundle.exam_days.contains(&cell.date) {
            return false;
        }
        let day = InputBundle::day_index(cell.date);
        if !bundle.availability.is_available(&cell.person_id, day) {
            return false;
        }
        if schedule.unit_count_on(&key.unit_id, cell.date) > bundle.max_exams_per_day {
            return false;
        }
        if schedule.person_count_on(&cell.person_id, cell.date) as u64
            > bundle.availability.max_per_day(&cell.person_id, day) as u64
        {
            return false;
        }
        let mut seated = 0u32;
        for seating in &cell.halls {
            match capacity.get(seating.hall_id.as_str()) {
                Some(&cap)
                    if schedule.hall_load(&seating.hall_id, cell.date, cell.session) <= cap => {}
                _ => return false,
            }
            seated += seating.seats;
        }
        if seated != cell.headcount {
            return false;
        }
    }

    for unit in &bundle.units {
        let dates = schedule.dates_for_unit(&unit.id);
        for pair in dates.windows(2) {
            if (pair[1] - pair[0]).num_days() < bundle.min_exam_gap_days {
                return false;
            }
        }
    }
    true
}
