#![forbid(unsafe_code)]

pub mod repo;
pub mod store;

pub use repo::{ClockRepo, CycleRepo, ProgressionRepo, TransitionRepo, TreatmentRepo};
pub use store::{CohortClockRow, CohortStore, PatientRecord, StorageError};
