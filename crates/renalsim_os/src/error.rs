#![forbid(unsafe_code)]

use renalsim_contracts::ContractViolation;
use renalsim_storage::StorageError;

/// Error taxonomy of the simulation core. No variant is retried internally;
/// at-most-once cycle generation is a correctness invariant, so the caller
/// must re-derive committed state before retrying a failed patient.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    NotFound {
        entity: &'static str,
        id: String,
    },
    /// Cycle requested out of order, or a cycle that already exists.
    SequenceError {
        patient_id: String,
        expected: u16,
        requested: u16,
    },
    CycleLimitExceeded {
        max: u16,
    },
    Persistence(StorageError),
}

impl From<StorageError> for EngineError {
    fn from(e: StorageError) -> Self {
        EngineError::Persistence(e)
    }
}

impl From<ContractViolation> for EngineError {
    fn from(v: ContractViolation) -> Self {
        EngineError::Persistence(StorageError::ContractViolation(v))
    }
}
