#![forbid(unsafe_code)]

pub mod cohort;
pub mod config;
pub mod cycle;
pub mod error;
pub mod export;
pub mod progression;
pub mod transition;

pub use cohort::{CohortOrchestrator, CohortSummary};
pub use config::SimConfig;
pub use cycle::{CycleGenerator, CycleOutcome};
pub use error::EngineError;
pub use progression::ProgressionStateManager;
pub use transition::{AlertInfo, TransitionDetector};
