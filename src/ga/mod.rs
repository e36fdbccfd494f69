//! Genetic-algorithm refinement.
//!
//! The CSP result is feasible but unpolished; the optimizer runs a
//! population-based local search around it. Hard constraints are never
//! traded away: every operator output is re-verified, and invalid
//! candidates are silently replaced by a parent copy, so each
//! population member stays hard-constraint-valid from the seed on.
//!
//! # Reference
//! Goldberg (1989), "Genetic Algorithms in Search, Optimization and
//! Machine Learning"

mod exam;
mod timetable;

pub use exam::ExamProblem;
pub use timetable::TimetableProblem;

use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::debug;

use crate::error::EngineError;
use crate::models::GaSettings;
use crate::progress::{Deadline, ProgressSink};

/// Problem seam between the generic generational loop and a concrete
/// assignment domain.
pub trait GaProblem {
    /// One candidate solution.
    type Individual: Clone;

    /// Scores an individual (0-100, higher is better).
    fn fitness(&self, individual: &Self::Individual) -> f64;

    /// Applies one random hard-constraint-preserving mutation in
    /// place. Returns `false` (leaving the individual untouched) when
    /// no valid mutation was found.
    fn mutate(&self, individual: &mut Self::Individual, rng: &mut SmallRng) -> bool;

    /// Recombines two parents. `None` when no consistent child could
    /// be assembled; the caller substitutes a parent copy.
    fn crossover(
        &self,
        a: &Self::Individual,
        b: &Self::Individual,
        rng: &mut SmallRng,
    ) -> Option<Self::Individual>;

    /// Full hard-constraint check, run before any candidate enters
    /// the population.
    fn verify(&self, individual: &Self::Individual) -> bool;
}

/// Result of one optimization run.
#[derive(Debug, Clone)]
pub struct GaOutcome<I> {
    /// Best individual found.
    pub best: I,
    /// Its fitness (0-100).
    pub fitness: f64,
    /// Generations actually executed.
    pub generations: usize,
}

/// Generational loop with elitism, tournament selection, and early
/// termination on plateau or target fitness.
pub struct GaRunner {
    settings: GaSettings,
}

impl GaRunner {
    /// Creates a runner with the given parameters.
    pub fn new(settings: GaSettings) -> Self {
        Self { settings }
    }

    /// Optimizes from a hard-constraint-valid seed.
    pub fn run<P: GaProblem>(
        &self,
        problem: &P,
        seed: P::Individual,
        rng: &mut SmallRng,
        deadline: Deadline,
        sink: &dyn ProgressSink,
    ) -> Result<GaOutcome<P::Individual>, EngineError> {
        let s = &self.settings;
        if deadline.expired() {
            return Err(EngineError::Timeout {
                phase: "optimization",
            });
        }

        let mut scored: Vec<(f64, P::Individual)> = Vec::with_capacity(s.population_size);
        scored.push((problem.fitness(&seed), seed.clone()));
        while scored.len() < s.population_size {
            let variant = self.spawn_variant(problem, &seed, rng);
            scored.push((problem.fitness(&variant), variant));
        }
        sort_desc(&mut scored);

        let mut best_fitness = scored[0].0;
        let mut stale = 0usize;
        let mut generation = 0usize;

        while generation < s.max_generations
            && best_fitness < s.target_fitness
            && stale < s.plateau_generations
        {
            if deadline.expired() {
                return Err(EngineError::Timeout {
                    phase: "optimization",
                });
            }

            let elite_count = ((s.population_size as f64 * s.elite_fraction).ceil() as usize)
                .clamp(1, s.population_size);
            let mut next: Vec<(f64, P::Individual)> = scored[..elite_count].to_vec();

            while next.len() < s.population_size {
                let a = tournament(&scored, s.tournament_size, rng);
                let b = tournament(&scored, s.tournament_size, rng);
                let mut child = match problem.crossover(&a.1, &b.1, rng) {
                    Some(child) => child,
                    None => a.1.clone(),
                };
                if rng.random_bool(s.mutation_probability) {
                    problem.mutate(&mut child, rng);
                }
                let child = if problem.verify(&child) {
                    child
                } else {
                    a.1.clone()
                };
                next.push((problem.fitness(&child), child));
            }
            sort_desc(&mut next);

            if next[0].0 > best_fitness {
                best_fitness = next[0].0;
                stale = 0;
            } else {
                stale += 1;
            }
            scored = next;
            generation += 1;

            sink.report(
                (generation * 100 / s.max_generations).min(99) as u8,
                &format!("generation {generation}, best fitness {best_fitness:.1}"),
            );
        }

        debug!(generation, best_fitness, stale, "optimization finished");
        Ok(GaOutcome {
            fitness: scored[0].0,
            best: scored[0].1.clone(),
            generations: generation,
        })
    }

    /// A population member: the seed subjected to 2-10 mutations,
    /// regenerated if the sequence somehow left the hard-constraint
    /// region.
    fn spawn_variant<P: GaProblem>(
        &self,
        problem: &P,
        seed: &P::Individual,
        rng: &mut SmallRng,
    ) -> P::Individual {
        for _ in 0..5 {
            let mut variant = seed.clone();
            let mutations = rng.random_range(2..=10);
            for _ in 0..mutations {
                problem.mutate(&mut variant, rng);
            }
            if problem.verify(&variant) {
                return variant;
            }
        }
        seed.clone()
    }
}

fn sort_desc<I>(scored: &mut [(f64, I)]) {
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
}

/// Samples `k` individuals uniformly and keeps the fittest.
fn tournament<'p, I>(scored: &'p [(f64, I)], k: usize, rng: &mut SmallRng) -> &'p (f64, I) {
    let mut best = scored.choose(rng).unwrap_or(&scored[0]);
    for _ in 1..k {
        if let Some(contender) = scored.choose(rng) {
            if contender.0 > best.0 {
                best = contender;
            }
        }
    }
    best
}

/// Population variance of a sample; 0 for empty input.
pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
