//! Generation configuration.
//!
//! All tunables for one generation attempt live here: selected units,
//! the working calendar, the algorithm mode, the CSP iteration budget,
//! GA parameters, and the named soft-constraint weight set. Termination
//! constants are configuration, not code.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How far the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlgorithmMode {
    /// CSP search only; the feasible seed is scored once and returned.
    CspOnly,
    /// CSP search followed by GA refinement.
    #[default]
    CspGa,
}

/// A named set of soft-constraint weights.
///
/// Each category's penalty is a bounded non-negative measure; fitness
/// is 100 minus the weighted sum. A weight of zero disables the
/// category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftWeights {
    /// Weight-set name, for reporting.
    pub name: String,
    /// Variance of per-person daily load.
    pub workload_balance: f64,
    /// Heavy subjects/exams adjacent for one unit.
    pub heavy_adjacency: f64,
    /// One subject clustered into too few distinct days.
    pub subject_spread: f64,
    /// Placements outside a person's preferred slots.
    pub preferred_slots: f64,
    /// Wasted hall capacity (exams).
    pub hall_utilization: f64,
    /// Variance of exams scheduled per day (exams).
    pub daily_balance: f64,
}

impl Default for SoftWeights {
    fn default() -> Self {
        Self {
            name: "default".into(),
            workload_balance: 2.0,
            heavy_adjacency: 1.5,
            subject_spread: 1.5,
            preferred_slots: 1.0,
            hall_utilization: 1.0,
            daily_balance: 1.0,
        }
    }
}

impl SoftWeights {
    /// Creates a named weight set with default weights.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Genetic-algorithm parameters.
///
/// Termination constants (plateau length, target fitness) are
/// empirically chosen defaults, deliberately exposed rather than
/// hard-coded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaSettings {
    /// Population size.
    pub population_size: usize,
    /// Maximum number of generations.
    pub max_generations: usize,
    /// Per-child mutation probability.
    pub mutation_probability: f64,
    /// Tournament size for parent selection.
    pub tournament_size: usize,
    /// Fraction of each generation retained unchanged.
    pub elite_fraction: f64,
    /// Consecutive non-improving generations before stopping.
    pub plateau_generations: usize,
    /// Best fitness at which the search stops early.
    pub target_fitness: f64,
}

impl Default for GaSettings {
    fn default() -> Self {
        Self {
            population_size: 40,
            max_generations: 120,
            mutation_probability: 0.25,
            tournament_size: 3,
            elite_fraction: 0.10,
            plateau_generations: 15,
            target_fitness: 95.0,
        }
    }
}

impl GaSettings {
    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(2);
        self
    }

    /// Sets the generation cap.
    pub fn with_max_generations(mut self, max: usize) -> Self {
        self.max_generations = max;
        self
    }

    /// Sets the mutation probability.
    pub fn with_mutation_probability(mut self, p: f64) -> Self {
        self.mutation_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Sets the tournament size.
    pub fn with_tournament_size(mut self, k: usize) -> Self {
        self.tournament_size = k.max(1);
        self
    }

    /// Sets the plateau length.
    pub fn with_plateau_generations(mut self, n: usize) -> Self {
        self.plateau_generations = n.max(1);
        self
    }

    /// Sets the early-exit fitness threshold.
    pub fn with_target_fitness(mut self, fitness: f64) -> Self {
        self.target_fitness = fitness;
        self
    }
}

/// Tunable parameters for one generation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Units to schedule.
    pub unit_ids: Vec<String>,
    /// Working day indices (0 = Monday).
    pub working_days: Vec<u8>,
    /// Exam date range [start, end], inclusive. `None` for timetables.
    pub exam_range: Option<(NaiveDate, NaiveDate)>,
    /// Exam sessions per day.
    pub sessions_per_day: u8,
    /// Algorithm mode.
    pub mode: AlgorithmMode,
    /// CSP backtracking attempt budget.
    pub csp_iteration_cap: u64,
    /// GA parameters.
    pub ga: GaSettings,
    /// Soft-constraint weights.
    pub weights: SoftWeights,
    /// Minimum gap in days between two exam days of one unit.
    pub min_exam_gap_days: i64,
    /// Maximum exams per unit per day.
    pub max_exams_per_day: u32,
    /// Soft time limit; expiry fails the run with a timeout message.
    pub soft_time_limit: Duration,
    /// Hard backstop; the runner abandons the run past this point.
    pub hard_time_limit: Duration,
    /// Fixed rng seed for reproducible runs. `None` = random per run.
    pub rng_seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            unit_ids: Vec::new(),
            working_days: vec![0, 1, 2, 3, 4],
            exam_range: None,
            sessions_per_day: 1,
            mode: AlgorithmMode::default(),
            csp_iteration_cap: 100_000,
            ga: GaSettings::default(),
            weights: SoftWeights::default(),
            min_exam_gap_days: 1,
            max_exams_per_day: 1,
            soft_time_limit: Duration::from_secs(270),
            hard_time_limit: Duration::from_secs(300),
            rng_seed: None,
        }
    }
}

impl GenerationConfig {
    /// Creates a config for the given units.
    pub fn for_units<I, S>(unit_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unit_ids: unit_ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the working days.
    pub fn with_working_days(mut self, days: Vec<u8>) -> Self {
        self.working_days = days;
        self
    }

    /// Sets the exam date range and sessions per day.
    pub fn with_exam_range(mut self, start: NaiveDate, end: NaiveDate, sessions: u8) -> Self {
        self.exam_range = Some((start, end));
        self.sessions_per_day = sessions.max(1);
        self
    }

    /// Sets the algorithm mode.
    pub fn with_mode(mut self, mode: AlgorithmMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the CSP iteration budget.
    pub fn with_iteration_cap(mut self, cap: u64) -> Self {
        self.csp_iteration_cap = cap;
        self
    }

    /// Sets the GA parameters.
    pub fn with_ga(mut self, ga: GaSettings) -> Self {
        self.ga = ga;
        self
    }

    /// Sets the soft-constraint weights.
    pub fn with_weights(mut self, weights: SoftWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Sets the exam spacing limits.
    pub fn with_exam_limits(mut self, min_gap_days: i64, max_per_day: u32) -> Self {
        self.min_exam_gap_days = min_gap_days;
        self.max_exams_per_day = max_per_day.max(1);
        self
    }

    /// Sets the soft and hard time limits.
    pub fn with_time_limits(mut self, soft: Duration, hard: Duration) -> Self {
        self.soft_time_limit = soft;
        self.hard_time_limit = hard.max(soft);
        self
    }

    /// Fixes the rng seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let c = GenerationConfig::default();
        assert_eq!(c.working_days, vec![0, 1, 2, 3, 4]);
        assert_eq!(c.csp_iteration_cap, 100_000);
        assert_eq!(c.mode, AlgorithmMode::CspGa);
        assert_eq!(c.max_exams_per_day, 1);
        assert!(c.rng_seed.is_none());
    }

    #[test]
    fn test_config_builder() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 13).unwrap();
        let c = GenerationConfig::for_units(["8B", "9A"])
            .with_exam_range(start, end, 2)
            .with_mode(AlgorithmMode::CspOnly)
            .with_iteration_cap(5_000)
            .with_exam_limits(2, 1)
            .with_seed(42);

        assert_eq!(c.unit_ids, vec!["8B", "9A"]);
        assert_eq!(c.exam_range, Some((start, end)));
        assert_eq!(c.sessions_per_day, 2);
        assert_eq!(c.csp_iteration_cap, 5_000);
        assert_eq!(c.min_exam_gap_days, 2);
        assert_eq!(c.rng_seed, Some(42));
    }

    #[test]
    fn test_ga_settings_clamps() {
        let ga = GaSettings::default()
            .with_population_size(1)
            .with_mutation_probability(1.5)
            .with_tournament_size(0);
        assert_eq!(ga.population_size, 2);
        assert!((ga.mutation_probability - 1.0).abs() < 1e-10);
        assert_eq!(ga.tournament_size, 1);
    }

    #[test]
    fn test_hard_limit_never_below_soft() {
        let c = GenerationConfig::default()
            .with_time_limits(Duration::from_secs(100), Duration::from_secs(50));
        assert_eq!(c.hard_time_limit, Duration::from_secs(100));
    }
}
