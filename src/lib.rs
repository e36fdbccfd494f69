//! Timetable and exam-schedule generation engine.
//!
//! Builds hard-constraint-valid weekly timetables and exam schedules
//! for school-like domains, then refines them with a genetic
//! algorithm. Both pipelines share one backbone: collect and validate
//! inputs, find a feasible assignment by bounded backtracking search,
//! optimize soft constraints, and serialize the result onto a pollable
//! run record.
//!
//! # Modules
//!
//! - **`models`**: Domain types — slots, units, requirements,
//!   availability, spaces, the assignment arenas, and the run record
//! - **`collect`**: Resolves domain records into a search-ready bundle
//! - **`validation`**: Precondition checks, collected into one report
//! - **`csp`**: Backtracking generators for both pipelines
//! - **`ga`**: Genetic refinement of a feasible seed
//! - **`report`**: Serialized assignment sets and warnings
//! - **`runner`**: State machine orchestrating one bounded run
//!
//! # References
//!
//! - Russell & Norvig (2021), "Artificial Intelligence: A Modern Approach", Ch. 6
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization and Machine Learning"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"

pub mod collect;
pub mod csp;
pub mod error;
pub mod ga;
pub mod models;
pub mod progress;
pub mod report;
pub mod runner;
pub mod validation;

pub use collect::{collect, DomainData, InputBundle};
pub use error::EngineError;
pub use models::{
    AlgorithmMode, GenerationConfig, GenerationRun, RunHandle, RunStatus,
};
pub use report::{ExamReport, TimetableReport};
pub use runner::{execute_run, run_scheduled, ExamPipeline, Pipeline, TimetablePipeline};
