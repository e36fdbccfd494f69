//! Constraint-satisfaction search.
//!
//! Both generators share the same skeleton: expand requirements into
//! indivisible placement tasks, order them most-constrained-first, and
//! run a bounded recursive backtracking search over the assignment
//! arena. The search finds *a* feasible assignment, not the best one;
//! quality is the optimizer's job.
//!
//! # Reference
//! Russell & Norvig (2021), "Artificial Intelligence: A Modern
//! Approach", Ch. 6 (Constraint Satisfaction Problems)

mod exam;
mod timetable;

pub(crate) use exam::allocate_halls;
pub use exam::{verify_exams, ExamGenerator};
pub use timetable::{verify_timetable, TimetableGenerator};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::cmp::Reverse;

use crate::collect::InputBundle;
use crate::models::SpaceKind;

/// One indivisible unit of placement work: a block of
/// `block_size` consecutive slots for timetables, or a single exam.
#[derive(Debug, Clone)]
pub struct PlacementTask {
    /// Index into the bundle's requirement list.
    pub requirement_index: usize,
    /// Owning unit.
    pub unit_id: String,
    /// Subject placed by this task.
    pub subject_id: String,
    /// Resource-person bound to this task.
    pub person_id: String,
    /// Consecutive slots this task occupies. Always 1 for exams.
    pub block_size: usize,
    /// Whether only special spaces are eligible.
    pub needs_special_space: bool,
    /// Space type to target, when one is set.
    pub preferred_space_kind: Option<SpaceKind>,
}

/// Expands every requirement into placement tasks.
///
/// A requirement of quantity 5 with block size 2 becomes two 2-slot
/// tasks plus one 1-slot remainder task.
pub fn expand_tasks(bundle: &InputBundle) -> Vec<PlacementTask> {
    let mut tasks = Vec::new();
    for (index, req) in bundle.requirements.iter().enumerate() {
        let block = req.block_size.max(1) as usize;
        let full_blocks = req.quantity as usize / block;
        let remainder = req.quantity as usize % block;

        let task = PlacementTask {
            requirement_index: index,
            unit_id: req.unit_id.clone(),
            subject_id: req.subject_id.clone(),
            person_id: req.person_id.clone(),
            block_size: block,
            needs_special_space: req.needs_special_space,
            preferred_space_kind: req.preferred_space_kind.clone(),
        };
        for _ in 0..full_blocks {
            tasks.push(task.clone());
        }
        for _ in 0..remainder {
            tasks.push(PlacementTask {
                block_size: 1,
                ..task.clone()
            });
        }
    }
    tasks
}

/// Orders tasks most-constrained-first: special-space tasks before
/// ordinary ones, larger blocks before smaller, scarcer persons before
/// freer ones. The pre-sort shuffle randomizes ties for search
/// diversity.
pub fn order_tasks(tasks: &mut [PlacementTask], bundle: &InputBundle, rng: &mut SmallRng) {
    tasks.shuffle(rng);
    let slots_per_day = bundle.slots_per_day() as u32;
    tasks.sort_by_key(|t| {
        let capacity =
            bundle
                .availability
                .total_capacity(&t.person_id, &bundle.working_days, slots_per_day);
        Reverse((t.needs_special_space, t.block_size, Reverse(capacity)))
    });
}

/// Iteration budget for one backtracking search.
#[derive(Debug)]
pub struct SearchBudget {
    cap: u64,
    used: u64,
}

impl SearchBudget {
    /// Creates a budget of `cap` attempts.
    pub fn new(cap: u64) -> Self {
        Self { cap, used: 0 }
    }

    /// Spends one attempt; `false` once the budget is gone.
    pub fn consume(&mut self) -> bool {
        if self.used >= self.cap {
            return false;
        }
        self.used += 1;
        true
    }

    /// Attempts spent so far.
    pub fn used(&self) -> u64 {
        self.used
    }
}

/// Why a search halted without an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Halt {
    /// Iteration budget exhausted.
    Budget,
    /// Cooperative deadline expired.
    Deadline,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{collect, DomainData};
    use crate::models::{
        GenerationConfig, Person, PersonDayAvailability, Requirement, Slot, Space, Subject, Unit,
    };
    use rand::SeedableRng;

    fn bundle() -> InputBundle {
        let data = DomainData {
            slots: (0..5)
                .map(|i| Slot::new(format!("p{i}"), i, 480 + i as u16 * 50, 525 + i as u16 * 50))
                .collect(),
            units: vec![Unit::new("8B", 30)],
            subjects: vec![Subject::new("MATH"), Subject::new("CHEM"), Subject::new("ART")],
            persons: vec![Person::new("T1"), Person::new("T2"), Person::new("T3")],
            requirements: vec![
                Requirement::new("8B", "MATH", "T1", 5).with_block_size(2),
                Requirement::new("8B", "CHEM", "T2", 2).with_special_space(SpaceKind::Lab),
                Requirement::new("8B", "ART", "T3", 2),
            ],
            availability: vec![PersonDayAvailability::new("T3", 0).with_max_per_day(1)],
            spaces: vec![Space::new("R1", 32), Space::new("L1", 24).with_kind(SpaceKind::Lab)],
        };
        collect(&GenerationConfig::for_units(["8B"]), &data).unwrap()
    }

    #[test]
    fn test_expand_blocks_and_remainder() {
        let tasks = expand_tasks(&bundle());
        // MATH 5 in blocks of 2: two 2-blocks + one 1-block; CHEM 2; ART 2
        let math: Vec<_> = tasks.iter().filter(|t| t.subject_id == "MATH").collect();
        assert_eq!(math.len(), 3);
        assert_eq!(math.iter().filter(|t| t.block_size == 2).count(), 2);
        assert_eq!(math.iter().filter(|t| t.block_size == 1).count(), 1);
        assert_eq!(tasks.len(), 3 + 2 + 2);
    }

    #[test]
    fn test_expanded_quantity_is_exact() {
        let b = bundle();
        let tasks = expand_tasks(&b);
        let placed: usize = tasks.iter().map(|t| t.block_size).sum();
        let demanded: u32 = b.requirements.iter().map(|r| r.quantity).sum();
        assert_eq!(placed as u32, demanded);
    }

    #[test]
    fn test_order_puts_special_space_first() {
        let b = bundle();
        let mut tasks = expand_tasks(&b);
        let mut rng = SmallRng::seed_from_u64(42);
        order_tasks(&mut tasks, &b, &mut rng);

        assert!(tasks[0].needs_special_space);
        assert!(tasks[1].needs_special_space);
        // Among the rest, double periods come before singles
        assert_eq!(tasks[2].block_size, 2);
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut budget = SearchBudget::new(2);
        assert!(budget.consume());
        assert!(budget.consume());
        assert!(!budget.consume());
        assert_eq!(budget.used(), 2);
    }
}
