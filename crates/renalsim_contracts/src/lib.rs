#![forbid(unsafe_code)]

pub mod common;
pub mod cycle;
pub mod progression;
pub mod staging;
pub mod transition;
pub mod treatment;

pub use common::{
    ContractViolation, CycleNumber, MonotonicTimeNs, PatientId, SchemaVersion, TreatmentId,
    Validate,
};
