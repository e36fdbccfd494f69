//! Schedule-generation domain models.
//!
//! Core data types for both pipelines: the working calendar (slots,
//! days), demand (units, subjects, requirements), supply (persons,
//! availability, spaces), the assignment arenas the solvers work on,
//! and the configuration/run records that frame one generation
//! attempt.
//!
//! # Domain Mappings
//!
//! | Type | Timetable | Exam schedule |
//! |------|-----------|---------------|
//! | Unit | Class-section | Class |
//! | Person | Teacher | Invigilator |
//! | Space | Room | Exam hall |
//! | Arena | `Timetable` | `ExamSchedule` |

mod availability;
mod config;
mod exam;
mod requirement;
mod run;
mod slot;
mod space;
mod timetable;
mod unit;

pub use availability::{AvailabilityBook, MinuteWindow, PersonDayAvailability};
pub use config::{AlgorithmMode, GaSettings, GenerationConfig, SoftWeights};
pub use exam::{ExamCell, ExamKey, ExamSchedule, HallSeating};
pub use requirement::Requirement;
pub use run::{GenerationRun, RunHandle, RunStatus};
pub use slot::{Slot, SlotKind};
pub use space::{Space, SpaceKind};
pub use timetable::{Timetable, TimetableCell, TimetableKey};
pub use unit::{Person, Subject, Unit};
