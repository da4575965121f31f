#![forbid(unsafe_code)]

use renalsim_contracts::cycle::CycleRecord;
use renalsim_contracts::staging::{
    AlbuminuriaCategory, Classification, GfrCategory, HealthState, MonitoringInterval, RiskLevel,
};
use renalsim_contracts::{CycleNumber, MonotonicTimeNs, PatientId};
use renalsim_storage::{CohortStore, CycleRepo, PatientRecord, StorageError};

fn patient(id: &str) -> PatientId {
    PatientId::new(id).unwrap()
}

fn classification() -> Classification {
    Classification {
        gfr_category: GfrCategory::G2,
        albuminuria_category: AlbuminuriaCategory::A1,
        health_state: HealthState::Mild,
        risk_level: RiskLevel::Low,
        stage: 2,
        monitoring: MonitoringInterval::Annual,
        nephrology_referral: false,
        dialysis_planning: false,
        recommend_ras_blockade: false,
        recommend_sglt2: false,
    }
}

fn row(id: &str, cycle: u16, egfr: f64) -> CycleRecord {
    CycleRecord::v1(
        patient(id),
        CycleNumber(cycle),
        egfr,
        20.0,
        classification(),
        false,
        0.0,
        0.0,
        0.0,
        MonotonicTimeNs(10 + cycle as u64),
    )
    .unwrap()
}

fn registered_store(id: &str) -> CohortStore {
    let mut s = CohortStore::new_in_memory();
    s.register_patient(PatientRecord {
        patient_id: patient(id),
        known_egfr: None,
        known_uacr: None,
        registered_at: MonotonicTimeNs(1),
    })
    .unwrap();
    s
}

#[test]
fn at_chain_db_01_append_and_read_exact_cycle() {
    let mut s = registered_store("dbw_chain_pt_1");
    s.append_cycle_row(row("dbw_chain_pt_1", 0, 72.0)).unwrap();
    s.append_cycle_row(row("dbw_chain_pt_1", 1, 71.6)).unwrap();

    let c1 = s.cycle_row(&patient("dbw_chain_pt_1"), CycleNumber(1)).unwrap();
    assert_eq!(c1.cycle_number, CycleNumber(1));
    assert_eq!(c1.egfr, 71.6);
}

#[test]
fn at_chain_db_02_duplicate_key_is_rejected_not_overwritten() {
    let mut s = registered_store("dbw_chain_pt_2");
    s.append_cycle_row(row("dbw_chain_pt_2", 0, 72.0)).unwrap();
    let err = s.append_cycle_row(row("dbw_chain_pt_2", 0, 50.0)).unwrap_err();
    assert!(matches!(err, StorageError::DuplicateKey { entity: "cycle_rows", .. }));

    let kept = s.cycle_row(&patient("dbw_chain_pt_2"), CycleNumber(0)).unwrap();
    assert_eq!(kept.egfr, 72.0);
}

#[test]
fn at_chain_db_03_latest_row_is_highest_cycle_not_insert_order() {
    let mut s = registered_store("dbw_chain_pt_3");
    for cycle in [0u16, 1, 2, 3] {
        s.append_cycle_row(row("dbw_chain_pt_3", cycle, 72.0 - cycle as f64 * 0.4))
            .unwrap();
    }
    let latest = s.latest_cycle_row(&patient("dbw_chain_pt_3")).unwrap();
    assert_eq!(latest.cycle_number, CycleNumber(3));
}

#[test]
fn at_chain_db_04_patient_chains_are_isolated() {
    let mut s = registered_store("dbw_chain_pt_4a");
    s.register_patient(PatientRecord {
        patient_id: patient("dbw_chain_pt_4b"),
        known_egfr: None,
        known_uacr: None,
        registered_at: MonotonicTimeNs(1),
    })
    .unwrap();

    s.append_cycle_row(row("dbw_chain_pt_4a", 0, 72.0)).unwrap();
    s.append_cycle_row(row("dbw_chain_pt_4a", 1, 71.5)).unwrap();
    s.append_cycle_row(row("dbw_chain_pt_4b", 0, 55.0)).unwrap();

    assert_eq!(s.cycle_rows_for_patient(&patient("dbw_chain_pt_4a")).len(), 2);
    let b_latest = s.latest_cycle_row(&patient("dbw_chain_pt_4b")).unwrap();
    assert_eq!(b_latest.cycle_number, CycleNumber(0));
    assert_eq!(b_latest.egfr, 55.0);
}

#[test]
fn at_chain_db_05_unregistered_patient_is_foreign_key_violation() {
    let mut s = CohortStore::new_in_memory();
    let err = s.append_cycle_row(row("dbw_chain_pt_5", 0, 72.0)).unwrap_err();
    assert!(matches!(
        err,
        StorageError::ForeignKeyViolation { entity: "cycle_rows", .. }
    ));
}
