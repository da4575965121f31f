#![forbid(unsafe_code)]

use renalsim_contracts::staging::{
    AlbuminuriaCategory, ChangeType, Classification, GfrCategory, HealthState,
    MonitoringInterval, RiskLevel, TransitionReason,
};
use renalsim_contracts::transition::{AlertRecord, AlertSeverity, TransitionRecord};
use renalsim_contracts::treatment::{AdherenceHistoryRow, AdherenceTier, MedicationClass};
use renalsim_contracts::{CycleNumber, MonotonicTimeNs, PatientId};
use renalsim_storage::{
    CohortStore, PatientRecord, StorageError, TransitionRepo, TreatmentRepo,
};

fn patient(id: &str) -> PatientId {
    PatientId::new(id).unwrap()
}

fn registered_store(id: &str) -> CohortStore {
    let mut s = CohortStore::new_in_memory();
    s.register_patient(PatientRecord {
        patient_id: patient(id),
        known_egfr: Some(60.0),
        known_uacr: Some(40.0),
        registered_at: MonotonicTimeNs(1),
    })
    .unwrap();
    s
}

fn classification(gfr: GfrCategory, risk: RiskLevel) -> Classification {
    Classification {
        gfr_category: gfr,
        albuminuria_category: AlbuminuriaCategory::A2,
        health_state: HealthState::Moderate,
        risk_level: risk,
        stage: gfr.stage(),
        monitoring: MonitoringInterval::Quarterly,
        nephrology_referral: false,
        dialysis_planning: false,
        recommend_ras_blockade: true,
        recommend_sglt2: true,
    }
}

#[test]
fn at_rx_db_01_insert_treatment_assigns_ids_and_filters_active() {
    let mut s = registered_store("dbw_rx_pt_1");
    let id_a = s
        .insert_treatment(
            &patient("dbw_rx_pt_1"),
            MedicationClass::AceInhibitor,
            "lisinopril".to_string(),
            0.85,
            CycleNumber(0),
        )
        .unwrap();
    let id_b = s
        .insert_treatment(
            &patient("dbw_rx_pt_1"),
            MedicationClass::Sglt2Inhibitor,
            "dapagliflozin".to_string(),
            0.70,
            CycleNumber(2),
        )
        .unwrap();
    assert_ne!(id_a, id_b);

    let active = s.active_treatments(&patient("dbw_rx_pt_1"));
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|t| t.active));
}

#[test]
fn at_rx_db_02_adherence_update_validates_range() {
    let mut s = registered_store("dbw_rx_pt_2");
    let id = s
        .insert_treatment(
            &patient("dbw_rx_pt_2"),
            MedicationClass::Arb,
            "losartan".to_string(),
            0.80,
            CycleNumber(0),
        )
        .unwrap();

    s.update_adherence(id, 0.55).unwrap();
    assert_eq!(s.treatment_row(id).unwrap().current_adherence, 0.55);

    let err = s.update_adherence(id, 1.2).unwrap_err();
    assert!(matches!(err, StorageError::ContractViolation(_)));
    // Failed update must not have touched the row.
    assert_eq!(s.treatment_row(id).unwrap().current_adherence, 0.55);
}

#[test]
fn at_rx_db_03_adherence_history_upserts_by_treatment_and_cycle() {
    let mut s = registered_store("dbw_rx_pt_3");
    let id = s
        .insert_treatment(
            &patient("dbw_rx_pt_3"),
            MedicationClass::AceInhibitor,
            "ramipril".to_string(),
            0.90,
            CycleNumber(0),
        )
        .unwrap();

    s.upsert_adherence_history(
        AdherenceHistoryRow::v1(id, CycleNumber(1), 0.92, MonotonicTimeNs(5)).unwrap(),
    )
    .unwrap();
    s.upsert_adherence_history(
        AdherenceHistoryRow::v1(id, CycleNumber(1), 0.78, MonotonicTimeNs(6)).unwrap(),
    )
    .unwrap();

    let row = s.adherence_history_row(id, CycleNumber(1)).unwrap();
    assert_eq!(row.adherence_score, 0.78);
    assert_eq!(row.tier, AdherenceTier::Fair);
}

#[test]
fn at_rx_db_04_transition_and_alert_ledgers_append() {
    let mut s = registered_store("dbw_rx_pt_4");
    let from = classification(GfrCategory::G3a, RiskLevel::High);
    let to = classification(GfrCategory::G3b, RiskLevel::VeryHigh);

    s.append_transition_row(
        TransitionRecord::v1(
            patient("dbw_rx_pt_4"),
            CycleNumber(3),
            CycleNumber(4),
            from,
            to,
            ChangeType::Worsened,
            1,
            0,
            vec![
                TransitionReason::RiskLevelIncreased {
                    from: RiskLevel::High,
                    to: RiskLevel::VeryHigh,
                },
                TransitionReason::GfrStageProgressed {
                    from: GfrCategory::G3a,
                    to: GfrCategory::G3b,
                },
            ],
            MonotonicTimeNs(40),
        )
        .unwrap(),
    )
    .unwrap();

    s.append_alert_row(
        AlertRecord::v1(
            patient("dbw_rx_pt_4"),
            CycleNumber(3),
            CycleNumber(4),
            AlertSeverity::Warning,
            vec!["risk level increased from high to very_high".to_string()],
            MonotonicTimeNs(41),
        )
        .unwrap(),
    )
    .unwrap();

    assert_eq!(s.transition_rows().len(), 1);
    assert!(s.transition_rows()[0].risk_escalated);
    assert!(s.transition_rows()[0].category_escalated);
    assert!(!s.transition_rows()[0].critical_crossed);
    assert_eq!(s.alert_rows().len(), 1);
    assert!(s.alert_rows()[0].requires_action);
    assert_eq!(s.alert_rows()[0].priority_rank, 1);
}

#[test]
fn at_rx_db_05_foreign_keys_enforced_for_unregistered_patients() {
    let mut s = CohortStore::new_in_memory();
    let err = s
        .insert_treatment(
            &patient("dbw_rx_ghost"),
            MedicationClass::Arb,
            "valsartan".to_string(),
            0.75,
            CycleNumber(0),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::ForeignKeyViolation { entity: "treatments", .. }
    ));
}
