#![forbid(unsafe_code)]

use renalsim_contracts::cycle::CycleRecord;
use renalsim_contracts::progression::ProgressionState;
use renalsim_contracts::transition::{AlertRecord, TransitionRecord};
use renalsim_contracts::treatment::{AdherenceHistoryRow, MedicationClass, Treatment};
use renalsim_contracts::{CycleNumber, PatientId, TreatmentId};

use crate::store::{PatientRecord, StorageError};

/// Typed repository interface for the patient roster and progression-state
/// persistence.
pub trait ProgressionRepo {
    fn patient_ids(&self) -> Vec<PatientId>;
    fn patient_row(&self, patient_id: &PatientId) -> Option<&PatientRecord>;
    fn progression_state(&self, patient_id: &PatientId) -> Option<&ProgressionState>;
    fn insert_progression_state(&mut self, state: ProgressionState) -> Result<(), StorageError>;
}

/// Typed repository interface for the append-only per-patient cycle chain.
/// Rows are keyed by `(patient_id, cycle_number)`; appending an existing key
/// is a `DuplicateKey` error, never an overwrite.
pub trait CycleRepo {
    fn append_cycle_row(&mut self, record: CycleRecord) -> Result<(), StorageError>;
    fn cycle_row(&self, patient_id: &PatientId, cycle: CycleNumber) -> Option<&CycleRecord>;
    fn latest_cycle_row(&self, patient_id: &PatientId) -> Option<&CycleRecord>;
    fn cycle_rows_for_patient(&self, patient_id: &PatientId) -> Vec<&CycleRecord>;
}

/// Typed repository interface for treatments and adherence history.
pub trait TreatmentRepo {
    fn insert_treatment(
        &mut self,
        patient_id: &PatientId,
        medication_class: MedicationClass,
        medication_name: String,
        initial_adherence: f64,
        started_cycle: CycleNumber,
    ) -> Result<TreatmentId, StorageError>;
    fn active_treatments(&self, patient_id: &PatientId) -> Vec<Treatment>;
    fn update_adherence(
        &mut self,
        treatment_id: TreatmentId,
        adherence: f64,
    ) -> Result<(), StorageError>;
    /// Upsert keyed by `(treatment_id, cycle_number)`.
    fn upsert_adherence_history(&mut self, row: AdherenceHistoryRow) -> Result<(), StorageError>;
    fn adherence_history_row(
        &self,
        treatment_id: TreatmentId,
        cycle: CycleNumber,
    ) -> Option<&AdherenceHistoryRow>;
}

/// Typed repository interface for transition and alert ledgers.
pub trait TransitionRepo {
    fn append_transition_row(&mut self, record: TransitionRecord) -> Result<(), StorageError>;
    fn append_alert_row(&mut self, record: AlertRecord) -> Result<(), StorageError>;
    fn transition_rows(&self) -> &[TransitionRecord];
    fn alert_rows(&self) -> &[AlertRecord];
}

/// Typed repository interface for the single-row cohort clock. The store is
/// the single writer; `increment_clock_if_below` refuses (returns `None`)
/// instead of moving past the cap.
pub trait ClockRepo {
    fn clock(&self) -> CycleNumber;
    fn increment_clock_if_below(&mut self, max: CycleNumber) -> Option<CycleNumber>;
}
