//! Orchestration runner.
//!
//! Drives one generation run through its state machine:
//! `Pending -> Validating -> Generating -> Optimizing -> Completed`,
//! with `Failed` reachable from any non-terminal state. The run
//! executes as one synchronous CPU-bound unit of work on a blocking
//! worker; callers poll the shared run handle for progress. A run is
//! bounded by a soft limit (cooperative, checked inside the solvers)
//! and a hard backstop enforced from outside.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

use crate::collect::{collect, DomainData, InputBundle};
use crate::csp::{ExamGenerator, TimetableGenerator};
use crate::error::EngineError;
use crate::ga::{ExamProblem, GaProblem, GaRunner, TimetableProblem};
use crate::models::{
    AlgorithmMode, ExamSchedule, GenerationConfig, GenerationRun, RunHandle, RunStatus, Timetable,
};
use crate::progress::{Deadline, ProgressSink, ScaledSink};
use crate::report::{
    exam_warnings, timetable_warnings, ExamReport, TimetableReport,
};
use crate::validation::{validate_exams, validate_timetable, ValidationIssue};

/// Progress windows of the overall run, per phase.
const GENERATE_WINDOW: (u8, u8) = (5, 60);
const OPTIMIZE_WINDOW: (u8, u8) = (60, 95);

/// One schedule-generation variant: the timetable and exam pipelines
/// plug their validators, solvers, and serializers into the shared
/// state machine through this seam.
pub trait Pipeline {
    /// Solver arena the pipeline searches over.
    type Solution: Clone;
    /// Serialized assignment set persisted on the run.
    type Report: Clone + Send + Sync + 'static;

    /// Pipeline name, for logs and messages.
    fn kind(&self) -> &'static str;

    /// Precondition checks against the raw domain data.
    fn validate(&self, config: &GenerationConfig, data: &DomainData) -> Vec<ValidationIssue>;

    /// CSP search for a feasible seed.
    fn generate(
        &self,
        bundle: &InputBundle,
        config: &GenerationConfig,
        rng: &mut SmallRng,
        deadline: Deadline,
        sink: &dyn ProgressSink,
    ) -> Result<Self::Solution, EngineError>;

    /// GA refinement of the seed.
    fn optimize(
        &self,
        bundle: &InputBundle,
        config: &GenerationConfig,
        seed: Self::Solution,
        rng: &mut SmallRng,
        deadline: Deadline,
        sink: &dyn ProgressSink,
    ) -> Result<(Self::Solution, f64), EngineError>;

    /// Scores a solution without optimizing (CSP-only mode).
    fn score(&self, bundle: &InputBundle, solution: &Self::Solution) -> f64;

    /// Serializes the final solution and derives warnings.
    fn report(&self, bundle: &InputBundle, solution: &Self::Solution)
        -> (Self::Report, Vec<String>);
}

/// Weekly timetable generation.
pub struct TimetablePipeline;

impl Pipeline for TimetablePipeline {
    type Solution = Timetable;
    type Report = TimetableReport;

    fn kind(&self) -> &'static str {
        "timetable"
    }

    fn validate(&self, config: &GenerationConfig, data: &DomainData) -> Vec<ValidationIssue> {
        validate_timetable(config, data)
    }

    fn generate(
        &self,
        bundle: &InputBundle,
        config: &GenerationConfig,
        rng: &mut SmallRng,
        deadline: Deadline,
        sink: &dyn ProgressSink,
    ) -> Result<Timetable, EngineError> {
        TimetableGenerator::new(bundle).generate(config.csp_iteration_cap, rng, deadline, sink)
    }

    fn optimize(
        &self,
        bundle: &InputBundle,
        config: &GenerationConfig,
        seed: Timetable,
        rng: &mut SmallRng,
        deadline: Deadline,
        sink: &dyn ProgressSink,
    ) -> Result<(Timetable, f64), EngineError> {
        let problem = TimetableProblem::new(bundle);
        let outcome = GaRunner::new(config.ga.clone()).run(&problem, seed, rng, deadline, sink)?;
        Ok((outcome.best, outcome.fitness))
    }

    fn score(&self, bundle: &InputBundle, solution: &Timetable) -> f64 {
        TimetableProblem::new(bundle).fitness(solution)
    }

    fn report(&self, bundle: &InputBundle, solution: &Timetable) -> (TimetableReport, Vec<String>) {
        (
            TimetableReport::build(bundle, solution),
            timetable_warnings(bundle, solution),
        )
    }
}

/// Exam schedule generation.
pub struct ExamPipeline;

impl Pipeline for ExamPipeline {
    type Solution = ExamSchedule;
    type Report = ExamReport;

    fn kind(&self) -> &'static str {
        "exam"
    }

    fn validate(&self, config: &GenerationConfig, data: &DomainData) -> Vec<ValidationIssue> {
        validate_exams(config, data)
    }

    fn generate(
        &self,
        bundle: &InputBundle,
        config: &GenerationConfig,
        rng: &mut SmallRng,
        deadline: Deadline,
        sink: &dyn ProgressSink,
    ) -> Result<ExamSchedule, EngineError> {
        ExamGenerator::new(bundle).generate(config.csp_iteration_cap, rng, deadline, sink)
    }

    fn optimize(
        &self,
        bundle: &InputBundle,
        config: &GenerationConfig,
        seed: ExamSchedule,
        rng: &mut SmallRng,
        deadline: Deadline,
        sink: &dyn ProgressSink,
    ) -> Result<(ExamSchedule, f64), EngineError> {
        let problem = ExamProblem::new(bundle);
        let outcome = GaRunner::new(config.ga.clone()).run(&problem, seed, rng, deadline, sink)?;
        Ok((outcome.best, outcome.fitness))
    }

    fn score(&self, bundle: &InputBundle, solution: &ExamSchedule) -> f64 {
        ExamProblem::new(bundle).fitness(solution)
    }

    fn report(&self, bundle: &InputBundle, solution: &ExamSchedule) -> (ExamReport, Vec<String>) {
        (ExamReport::build(solution), exam_warnings(bundle, solution))
    }
}

/// Executes one run synchronously, writing every state transition and
/// progress update through the shared handle. Never panics on solver
/// failure; every failure path lands in `Failed` with a diagnosis.
pub fn execute_run<P>(
    pipeline: &P,
    config: &GenerationConfig,
    data: &DomainData,
    handle: &RunHandle<P::Report>,
) where
    P: Pipeline,
{
    handle.start(RunStatus::Validating);
    handle.set_progress(0, "validating inputs");

    let issues = pipeline.validate(config, data);
    if !issues.is_empty() {
        let err = EngineError::Validation(issues);
        warn!(pipeline = pipeline.kind(), %err, "run rejected by validation");
        handle.fail(err.to_string());
        return;
    }

    let bundle = match collect(config, data) {
        Ok(bundle) => bundle,
        Err(err) => {
            warn!(pipeline = pipeline.kind(), %err, "input collection failed");
            handle.fail(err.to_string());
            return;
        }
    };

    let deadline = Deadline::after(config.soft_time_limit);
    let mut rng = match config.rng_seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_rng(&mut rand::rng()),
    };

    handle.set_status(RunStatus::Generating);
    let sink = ScaledSink::new(handle, GENERATE_WINDOW.0, GENERATE_WINDOW.1);
    let seed = match pipeline.generate(&bundle, config, &mut rng, deadline, &sink) {
        Ok(seed) => seed,
        Err(err) => {
            match &err {
                EngineError::Infeasible { .. } | EngineError::Timeout { .. } => {
                    info!(pipeline = pipeline.kind(), %err, "generation gave up")
                }
                _ => error!(pipeline = pipeline.kind(), %err, "generation failed"),
            }
            handle.fail(err.to_string());
            return;
        }
    };

    let (solution, fitness) = match config.mode {
        AlgorithmMode::CspOnly => {
            let fitness = pipeline.score(&bundle, &seed);
            (seed, fitness)
        }
        AlgorithmMode::CspGa => {
            handle.set_status(RunStatus::Optimizing);
            let sink = ScaledSink::new(handle, OPTIMIZE_WINDOW.0, OPTIMIZE_WINDOW.1);
            match pipeline.optimize(&bundle, config, seed, &mut rng, deadline, &sink) {
                Ok(result) => result,
                Err(err) => {
                    info!(pipeline = pipeline.kind(), %err, "optimization aborted");
                    handle.fail(err.to_string());
                    return;
                }
            }
        }
    };

    handle.set_progress(95, "serializing result");
    let (report, warnings) = pipeline.report(&bundle, &solution);
    info!(
        pipeline = pipeline.kind(),
        fitness, warnings = warnings.len(), "run completed"
    );
    handle.complete(report, fitness, warnings);
}

/// Runs a generation on a blocking worker, bounded by the hard time
/// limit. The soft limit is cooperative; the hard backstop marks the
/// run failed from outside if the worker has not finished by then.
pub async fn run_scheduled<P>(
    pipeline: P,
    config: GenerationConfig,
    data: DomainData,
    handle: RunHandle<P::Report>,
) -> GenerationRun<P::Report>
where
    P: Pipeline + Send + 'static,
{
    let hard_limit = config.hard_time_limit;
    let worker_handle = handle.clone();
    let worker = tokio::task::spawn_blocking(move || {
        execute_run(&pipeline, &config, &data, &worker_handle);
    });

    match tokio::time::timeout(hard_limit, worker).await {
        Ok(Ok(())) => {}
        Ok(Err(join_err)) => {
            error!(%join_err, "run worker panicked");
            if !handle.status().is_terminal() {
                handle.fail(format!("unexpected failure: {join_err}"));
            }
        }
        Err(_) => {
            warn!("hard time limit exceeded, abandoning run");
            if !handle.status().is_terminal() {
                handle.fail("hard time limit exceeded; run abandoned");
            }
        }
    }
    handle.snapshot()
}
