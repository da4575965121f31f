#![forbid(unsafe_code)]

use renalsim_contracts::progression::{ProgressionArchetype, ProgressionState};
use renalsim_contracts::{CycleNumber, MonotonicTimeNs, PatientId};
use renalsim_storage::{ClockRepo, CohortStore, PatientRecord, ProgressionRepo, StorageError};

fn patient(id: &str) -> PatientId {
    PatientId::new(id).unwrap()
}

fn registered_store(id: &str) -> CohortStore {
    let mut s = CohortStore::new_in_memory();
    s.register_patient(PatientRecord {
        patient_id: patient(id),
        known_egfr: Some(72.0),
        known_uacr: Some(18.0),
        registered_at: MonotonicTimeNs(1),
    })
    .unwrap();
    s
}

fn state(id: &str) -> ProgressionState {
    ProgressionState::v1(
        patient(id),
        ProgressionArchetype::Moderate,
        72.0,
        18.0,
        -0.40,
        0.025,
        MonotonicTimeNs(2),
    )
    .unwrap()
}

#[test]
fn at_core_db_01_patient_registry_rejects_duplicates() {
    let mut s = registered_store("dbw_core_pt_1");
    let err = s
        .register_patient(PatientRecord {
            patient_id: patient("dbw_core_pt_1"),
            known_egfr: None,
            known_uacr: None,
            registered_at: MonotonicTimeNs(3),
        })
        .unwrap_err();
    assert!(matches!(err, StorageError::DuplicateKey { entity: "patients", .. }));
}

#[test]
fn at_core_db_02_progression_state_insert_once() {
    let mut s = registered_store("dbw_core_pt_2");
    s.insert_progression_state(state("dbw_core_pt_2")).unwrap();
    assert!(s.progression_state(&patient("dbw_core_pt_2")).is_some());

    let err = s.insert_progression_state(state("dbw_core_pt_2")).unwrap_err();
    assert!(matches!(
        err,
        StorageError::DuplicateKey { entity: "progression_states", .. }
    ));
}

#[test]
fn at_core_db_03_progression_state_requires_registered_patient() {
    let mut s = CohortStore::new_in_memory();
    let err = s.insert_progression_state(state("dbw_core_pt_3")).unwrap_err();
    assert!(matches!(
        err,
        StorageError::ForeignKeyViolation { entity: "progression_states", .. }
    ));
}

#[test]
fn at_core_db_04_clock_increments_by_one_until_cap() {
    let mut s = CohortStore::new_in_memory();
    assert_eq!(s.clock(), CycleNumber(0));
    assert_eq!(s.increment_clock_if_below(CycleNumber(2)), Some(CycleNumber(1)));
    assert_eq!(s.increment_clock_if_below(CycleNumber(2)), Some(CycleNumber(2)));
    // At the cap the clock refuses and stays put.
    assert_eq!(s.increment_clock_if_below(CycleNumber(2)), None);
    assert_eq!(s.clock(), CycleNumber(2));
}
