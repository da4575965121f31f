#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use renalsim_contracts::cycle::CycleRecord;
use renalsim_contracts::progression::ProgressionState;
use renalsim_contracts::transition::{AlertRecord, TransitionRecord};
use renalsim_contracts::treatment::{AdherenceHistoryRow, MedicationClass, Treatment};
use renalsim_contracts::{
    ContractViolation, CycleNumber, MonotonicTimeNs, PatientId, TreatmentId, Validate,
};

use crate::repo::{ClockRepo, CycleRepo, ProgressionRepo, TransitionRepo, TreatmentRepo};

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    DuplicateKey {
        entity: &'static str,
        key: String,
    },
    ForeignKeyViolation {
        entity: &'static str,
        reference: String,
    },
    RowNotFound {
        entity: &'static str,
        key: String,
    },
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

/// Upstream patient registry row. The simulation core never creates
/// patients; it only reads what the enrollment layer registered, including
/// the most recent externally known biomarkers when present.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    pub patient_id: PatientId,
    pub known_egfr: Option<f64>,
    pub known_uacr: Option<f64>,
    pub registered_at: MonotonicTimeNs,
}

/// Single-row cohort clock. `current_cycle` is the last completed batch
/// cycle and only ever moves forward, one step per successful batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CohortClockRow {
    pub current_cycle: CycleNumber,
}

/// In-memory reference implementation of the persistence collaborator.
#[derive(Debug, Clone, Default)]
pub struct CohortStore {
    patients: BTreeMap<PatientId, PatientRecord>,
    progression_states: BTreeMap<PatientId, ProgressionState>,
    cycle_rows: BTreeMap<(PatientId, CycleNumber), CycleRecord>,
    treatments: BTreeMap<TreatmentId, Treatment>,
    adherence_history: BTreeMap<(TreatmentId, CycleNumber), AdherenceHistoryRow>,
    transition_rows: Vec<TransitionRecord>,
    alert_rows: Vec<AlertRecord>,
    clock: Option<CohortClockRow>,
    next_treatment_id: u64,
}

impl CohortStore {
    pub fn new_in_memory() -> Self {
        CohortStore {
            clock: Some(CohortClockRow {
                current_cycle: CycleNumber(0),
            }),
            next_treatment_id: 1,
            ..CohortStore::default()
        }
    }

    pub fn register_patient(&mut self, record: PatientRecord) -> Result<(), StorageError> {
        if self.patients.contains_key(&record.patient_id) {
            return Err(StorageError::DuplicateKey {
                entity: "patients",
                key: record.patient_id.as_str().to_string(),
            });
        }
        self.patients.insert(record.patient_id.clone(), record);
        Ok(())
    }

    pub fn treatment_row(&self, treatment_id: TreatmentId) -> Option<&Treatment> {
        self.treatments.get(&treatment_id)
    }
}

impl ProgressionRepo for CohortStore {
    fn patient_ids(&self) -> Vec<PatientId> {
        self.patients.keys().cloned().collect()
    }

    fn patient_row(&self, patient_id: &PatientId) -> Option<&PatientRecord> {
        self.patients.get(patient_id)
    }

    fn progression_state(&self, patient_id: &PatientId) -> Option<&ProgressionState> {
        self.progression_states.get(patient_id)
    }

    fn insert_progression_state(&mut self, state: ProgressionState) -> Result<(), StorageError> {
        state.validate()?;
        if !self.patients.contains_key(&state.patient_id) {
            return Err(StorageError::ForeignKeyViolation {
                entity: "progression_states",
                reference: state.patient_id.as_str().to_string(),
            });
        }
        if self.progression_states.contains_key(&state.patient_id) {
            return Err(StorageError::DuplicateKey {
                entity: "progression_states",
                key: state.patient_id.as_str().to_string(),
            });
        }
        self.progression_states.insert(state.patient_id.clone(), state);
        Ok(())
    }
}

impl CycleRepo for CohortStore {
    fn append_cycle_row(&mut self, record: CycleRecord) -> Result<(), StorageError> {
        record.validate()?;
        if !self.patients.contains_key(&record.patient_id) {
            return Err(StorageError::ForeignKeyViolation {
                entity: "cycle_rows",
                reference: record.patient_id.as_str().to_string(),
            });
        }
        let key = (record.patient_id.clone(), record.cycle_number);
        if self.cycle_rows.contains_key(&key) {
            return Err(StorageError::DuplicateKey {
                entity: "cycle_rows",
                key: format!("{}#{}", record.patient_id.as_str(), record.cycle_number.0),
            });
        }
        self.cycle_rows.insert(key, record);
        Ok(())
    }

    fn cycle_row(&self, patient_id: &PatientId, cycle: CycleNumber) -> Option<&CycleRecord> {
        self.cycle_rows.get(&(patient_id.clone(), cycle))
    }

    fn latest_cycle_row(&self, patient_id: &PatientId) -> Option<&CycleRecord> {
        self.cycle_rows
            .range((patient_id.clone(), CycleNumber(0))..=(patient_id.clone(), CycleNumber(u16::MAX)))
            .next_back()
            .map(|(_, record)| record)
    }

    fn cycle_rows_for_patient(&self, patient_id: &PatientId) -> Vec<&CycleRecord> {
        self.cycle_rows
            .range((patient_id.clone(), CycleNumber(0))..=(patient_id.clone(), CycleNumber(u16::MAX)))
            .map(|(_, record)| record)
            .collect()
    }
}

impl TreatmentRepo for CohortStore {
    fn insert_treatment(
        &mut self,
        patient_id: &PatientId,
        medication_class: MedicationClass,
        medication_name: String,
        initial_adherence: f64,
        started_cycle: CycleNumber,
    ) -> Result<TreatmentId, StorageError> {
        if !self.patients.contains_key(patient_id) {
            return Err(StorageError::ForeignKeyViolation {
                entity: "treatments",
                reference: patient_id.as_str().to_string(),
            });
        }
        let treatment_id = TreatmentId(self.next_treatment_id);
        let treatment = Treatment::v1(
            treatment_id,
            patient_id.clone(),
            medication_class,
            medication_name,
            initial_adherence,
            started_cycle,
        )?;
        self.next_treatment_id += 1;
        self.treatments.insert(treatment_id, treatment);
        Ok(treatment_id)
    }

    fn active_treatments(&self, patient_id: &PatientId) -> Vec<Treatment> {
        self.treatments
            .values()
            .filter(|t| t.active && &t.patient_id == patient_id)
            .cloned()
            .collect()
    }

    fn update_adherence(
        &mut self,
        treatment_id: TreatmentId,
        adherence: f64,
    ) -> Result<(), StorageError> {
        let treatment = self.treatments.get_mut(&treatment_id).ok_or_else(|| {
            StorageError::RowNotFound {
                entity: "treatments",
                key: treatment_id.0.to_string(),
            }
        })?;
        let mut updated = treatment.clone();
        updated.current_adherence = adherence;
        updated.validate()?;
        *treatment = updated;
        Ok(())
    }

    fn upsert_adherence_history(
        &mut self,
        row: AdherenceHistoryRow,
    ) -> Result<(), StorageError> {
        row.validate()?;
        if !self.treatments.contains_key(&row.treatment_id) {
            return Err(StorageError::ForeignKeyViolation {
                entity: "adherence_history",
                reference: row.treatment_id.0.to_string(),
            });
        }
        self.adherence_history
            .insert((row.treatment_id, row.cycle_number), row);
        Ok(())
    }

    fn adherence_history_row(
        &self,
        treatment_id: TreatmentId,
        cycle: CycleNumber,
    ) -> Option<&AdherenceHistoryRow> {
        self.adherence_history.get(&(treatment_id, cycle))
    }
}

impl TransitionRepo for CohortStore {
    fn append_transition_row(&mut self, record: TransitionRecord) -> Result<(), StorageError> {
        record.validate()?;
        if !self.patients.contains_key(&record.patient_id) {
            return Err(StorageError::ForeignKeyViolation {
                entity: "transition_rows",
                reference: record.patient_id.as_str().to_string(),
            });
        }
        self.transition_rows.push(record);
        Ok(())
    }

    fn append_alert_row(&mut self, record: AlertRecord) -> Result<(), StorageError> {
        record.validate()?;
        if !self.patients.contains_key(&record.patient_id) {
            return Err(StorageError::ForeignKeyViolation {
                entity: "alert_rows",
                reference: record.patient_id.as_str().to_string(),
            });
        }
        self.alert_rows.push(record);
        Ok(())
    }

    fn transition_rows(&self) -> &[TransitionRecord] {
        &self.transition_rows
    }

    fn alert_rows(&self) -> &[AlertRecord] {
        &self.alert_rows
    }
}

impl ClockRepo for CohortStore {
    fn clock(&self) -> CycleNumber {
        self.clock
            .map(|row| row.current_cycle)
            .unwrap_or(CycleNumber(0))
    }

    fn increment_clock_if_below(&mut self, max: CycleNumber) -> Option<CycleNumber> {
        let row = self.clock.get_or_insert(CohortClockRow {
            current_cycle: CycleNumber(0),
        });
        if row.current_cycle >= max {
            return None;
        }
        row.current_cycle = row.current_cycle.next();
        Some(row.current_cycle)
    }
}
