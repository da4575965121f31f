#![forbid(unsafe_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sha2::{Digest, Sha256};

use renalsim_contracts::treatment::MedicationClass;
use renalsim_contracts::{CycleNumber, MonotonicTimeNs, PatientId};
use renalsim_storage::repo::{
    ClockRepo, CycleRepo, ProgressionRepo, TransitionRepo, TreatmentRepo,
};

use crate::config::SimConfig;
use crate::cycle::CycleGenerator;
use crate::error::EngineError;
use crate::progression::ProgressionStateManager;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortSummary {
    pub new_cycle: CycleNumber,
    pub patients_processed: u32,
    pub patients_failed: Vec<PatientId>,
    pub transitions_detected: u32,
    pub alerts_generated: u32,
    pub treatment_changes: u32,
}

#[derive(Debug, Default)]
struct PatientOutcome {
    transitions: u32,
    alerts: u32,
    treatment_changes: u32,
}

/// Batch driver: advances every registered patient by one cycle,
/// probabilistically initiates recommended treatments, perturbs adherence,
/// and moves the shared cohort clock exactly once at the end. Per-patient
/// failures are isolated and reported in the summary; the batch never
/// aborts on one bad chain.
#[derive(Debug, Clone)]
pub struct CohortOrchestrator {
    config: SimConfig,
    cohort_seed: u64,
    manager: ProgressionStateManager,
    generator: CycleGenerator,
}

impl CohortOrchestrator {
    pub fn new(config: SimConfig, cohort_seed: u64) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(CohortOrchestrator {
            config,
            cohort_seed,
            manager: ProgressionStateManager::new(config)?,
            generator: CycleGenerator::new(config)?,
        })
    }

    pub fn advance_cohort<S>(
        &self,
        store: &mut S,
        now: MonotonicTimeNs,
    ) -> Result<CohortSummary, EngineError>
    where
        S: ProgressionRepo + CycleRepo + TreatmentRepo + TransitionRepo + ClockRepo,
    {
        let current = store.clock();
        if current.0 >= self.config.max_cycles {
            return Err(EngineError::CycleLimitExceeded {
                max: self.config.max_cycles,
            });
        }
        let new_cycle = current.next();

        let mut summary = CohortSummary {
            new_cycle,
            patients_processed: 0,
            patients_failed: Vec::new(),
            transitions_detected: 0,
            alerts_generated: 0,
            treatment_changes: 0,
        };

        for patient_id in store.patient_ids() {
            match self.advance_patient(store, &patient_id, new_cycle, now) {
                Ok(outcome) => {
                    summary.patients_processed += 1;
                    summary.transitions_detected += outcome.transitions;
                    summary.alerts_generated += outcome.alerts;
                    summary.treatment_changes += outcome.treatment_changes;
                }
                Err(_) => summary.patients_failed.push(patient_id),
            }
        }

        match store.increment_clock_if_below(CycleNumber(self.config.max_cycles)) {
            Some(cycle) => {
                summary.new_cycle = cycle;
                Ok(summary)
            }
            None => Err(EngineError::CycleLimitExceeded {
                max: self.config.max_cycles,
            }),
        }
    }

    fn advance_patient<S>(
        &self,
        store: &mut S,
        patient_id: &PatientId,
        new_cycle: CycleNumber,
        now: MonotonicTimeNs,
    ) -> Result<PatientOutcome, EngineError>
    where
        S: ProgressionRepo + CycleRepo + TreatmentRepo + TransitionRepo,
    {
        let mut rng = patient_rng(self.cohort_seed, patient_id, new_cycle);
        let mut outcome = PatientOutcome::default();

        self.manager
            .get_or_create(store, patient_id, now, &mut rng)?;

        // Late-enrolled patients catch up from their first missing cycle;
        // the chain itself never skips.
        let first_missing = store
            .latest_cycle_row(patient_id)
            .map(|row| row.cycle_number.next())
            .unwrap_or(CycleNumber(0));
        if first_missing > new_cycle {
            return Err(EngineError::SequenceError {
                patient_id: patient_id.as_str().to_string(),
                expected: first_missing.0,
                requested: new_cycle.0,
            });
        }

        let mut latest_classification = None;
        for cycle in first_missing.0..=new_cycle.0 {
            let generated = self.generator.generate(
                store,
                patient_id,
                CycleNumber(cycle),
                now,
                &mut rng,
            )?;
            if generated.transition_detected {
                outcome.transitions += 1;
            }
            if generated.alert.is_some() {
                outcome.alerts += 1;
            }
            latest_classification = Some(generated.record.classification);
        }

        let classification =
            latest_classification.ok_or(EngineError::SequenceError {
                patient_id: patient_id.as_str().to_string(),
                expected: first_missing.0,
                requested: new_cycle.0,
            })?;

        // Probabilistic initiation of recommended drug classes the patient
        // is not already on.
        let active = store.active_treatments(patient_id);
        let on_ras = active.iter().any(|t| t.medication_class.is_ras_blockade());
        let on_sglt2 = active
            .iter()
            .any(|t| t.medication_class == MedicationClass::Sglt2Inhibitor);

        if classification.recommend_ras_blockade
            && !on_ras
            && rng.gen_bool(self.config.initiation_probability)
        {
            let class = if rng.gen_bool(0.5) {
                MedicationClass::AceInhibitor
            } else {
                MedicationClass::Arb
            };
            self.initiate(store, patient_id, class, new_cycle, &mut rng)?;
            outcome.treatment_changes += 1;
        }
        if classification.recommend_sglt2
            && !on_sglt2
            && rng.gen_bool(self.config.initiation_probability)
        {
            self.initiate(
                store,
                patient_id,
                MedicationClass::Sglt2Inhibitor,
                new_cycle,
                &mut rng,
            )?;
            outcome.treatment_changes += 1;
        }

        // Independent small random walk on each pre-existing treatment's
        // adherence, clamped to the documented band.
        for treatment in &active {
            if rng.gen_bool(self.config.adherence_walk_probability) {
                let step = rng
                    .gen_range(-self.config.adherence_walk_step..=self.config.adherence_walk_step);
                let adherence = (treatment.current_adherence + step)
                    .clamp(self.config.adherence_min, self.config.adherence_max);
                store.update_adherence(treatment.treatment_id, adherence)?;
                outcome.treatment_changes += 1;
            }
        }

        Ok(outcome)
    }

    fn initiate<S, R>(
        &self,
        store: &mut S,
        patient_id: &PatientId,
        class: MedicationClass,
        started_cycle: CycleNumber,
        rng: &mut R,
    ) -> Result<(), EngineError>
    where
        S: TreatmentRepo,
        R: Rng,
    {
        let names = class.medication_names();
        let name = names[rng.gen_range(0..names.len())];
        let adherence = rng.gen_range(
            self.config.initial_adherence_min..=self.config.initial_adherence_max,
        );
        store.insert_treatment(patient_id, class, name.to_string(), adherence, started_cycle)?;
        Ok(())
    }
}

/// Deterministic per-patient, per-cycle rng stream derived from the cohort
/// seed, so identical stores and seeds replay identically.
fn patient_rng(cohort_seed: u64, patient_id: &PatientId, cycle: CycleNumber) -> StdRng {
    let mut hasher = Sha256::new();
    hasher.update(cohort_seed.to_le_bytes());
    hasher.update(patient_id.as_str().as_bytes());
    hasher.update(cycle.0.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    StdRng::seed_from_u64(u64::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use renalsim_contracts::cycle::CycleRecord;
    use renalsim_contracts::staging::BiomarkerPair;
    use renalsim_engines::staging::classify;
    use renalsim_storage::{CohortStore, PatientRecord};

    fn patient(id: &str) -> PatientId {
        PatientId::new(id).unwrap()
    }

    fn cohort_store(ids: &[(&str, f64, f64)]) -> CohortStore {
        let mut s = CohortStore::new_in_memory();
        for (id, egfr, uacr) in ids {
            s.register_patient(PatientRecord {
                patient_id: patient(id),
                known_egfr: Some(*egfr),
                known_uacr: Some(*uacr),
                registered_at: MonotonicTimeNs(1),
            })
            .unwrap();
        }
        s
    }

    fn orchestrator() -> CohortOrchestrator {
        CohortOrchestrator::new(SimConfig::mvp_v1(), 42).unwrap()
    }

    #[test]
    fn at_cohort_01_advance_processes_every_patient_and_moves_clock_once() {
        let mut store = cohort_store(&[
            ("pt_coh_a", 72.0, 15.0),
            ("pt_coh_b", 58.0, 45.0),
            ("pt_coh_c", 34.0, 220.0),
        ]);
        let summary = orchestrator()
            .advance_cohort(&mut store, MonotonicTimeNs(100))
            .unwrap();

        assert_eq!(summary.new_cycle, CycleNumber(1));
        assert_eq!(summary.patients_processed, 3);
        assert!(summary.patients_failed.is_empty());
        assert_eq!(store.clock(), CycleNumber(1));
        for id in ["pt_coh_a", "pt_coh_b", "pt_coh_c"] {
            let rows = store.cycle_rows_for_patient(&patient(id));
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].cycle_number, CycleNumber(0));
            assert_eq!(rows[1].cycle_number, CycleNumber(1));
        }
    }

    #[test]
    fn at_cohort_02_clock_limit_fails_without_mutation() {
        let mut store = cohort_store(&[("pt_coh_limit", 70.0, 20.0)]);
        for _ in 0..24 {
            store.increment_clock_if_below(CycleNumber(24)).unwrap();
        }
        assert_eq!(store.clock(), CycleNumber(24));

        let err = orchestrator()
            .advance_cohort(&mut store, MonotonicTimeNs(100))
            .unwrap_err();
        assert_eq!(err, EngineError::CycleLimitExceeded { max: 24 });
        assert_eq!(store.clock(), CycleNumber(24));
        assert!(store
            .cycle_rows_for_patient(&patient("pt_coh_limit"))
            .is_empty());
    }

    #[test]
    fn at_cohort_03_forced_initiation_starts_recommended_classes() {
        let mut config = SimConfig::mvp_v1();
        config.initiation_probability = 1.0;
        let orchestrator = CohortOrchestrator::new(config, 7).unwrap();

        // uACR 150 is A2: both RAS blockade and SGLT2 are recommended.
        let mut store = cohort_store(&[("pt_coh_rx", 52.0, 150.0)]);
        let summary = orchestrator
            .advance_cohort(&mut store, MonotonicTimeNs(100))
            .unwrap();

        let active = store.active_treatments(&patient("pt_coh_rx"));
        assert!(active.iter().any(|t| t.medication_class.is_ras_blockade()));
        assert!(active
            .iter()
            .any(|t| t.medication_class == MedicationClass::Sglt2Inhibitor));
        for treatment in &active {
            assert_eq!(treatment.started_cycle, CycleNumber(1));
            assert!(treatment.current_adherence >= config.initial_adherence_min);
            assert!(treatment.current_adherence <= config.initial_adherence_max);
            assert!(treatment
                .medication_class
                .medication_names()
                .contains(&treatment.medication_name.as_str()));
        }
        assert!(summary.treatment_changes >= 2);

        // Already on both classes: the next batch must not re-initiate.
        orchestrator
            .advance_cohort(&mut store, MonotonicTimeNs(200))
            .unwrap();
        assert_eq!(store.active_treatments(&patient("pt_coh_rx")).len(), 2);
    }

    #[test]
    fn at_cohort_04_adherence_walk_stays_clamped() {
        let mut config = SimConfig::mvp_v1();
        config.adherence_walk_probability = 1.0;
        let orchestrator = CohortOrchestrator::new(config, 9).unwrap();

        let mut store = cohort_store(&[("pt_coh_walk", 70.0, 20.0)]);
        store
            .insert_treatment(
                &patient("pt_coh_walk"),
                MedicationClass::Arb,
                "losartan".to_string(),
                0.12,
                CycleNumber(0),
            )
            .unwrap();

        for cycle in 0..8 {
            let summary = orchestrator
                .advance_cohort(&mut store, MonotonicTimeNs(100 + cycle))
                .unwrap();
            assert!(summary.treatment_changes >= 1);
        }
        for treatment in store.active_treatments(&patient("pt_coh_walk")) {
            assert!(treatment.current_adherence >= config.adherence_min);
            assert!(treatment.current_adherence <= config.adherence_max);
        }
    }

    #[test]
    fn at_cohort_05_per_patient_failure_is_isolated() {
        let mut store = cohort_store(&[
            ("pt_coh_ok_a", 72.0, 15.0),
            ("pt_coh_bad", 60.0, 20.0),
            ("pt_coh_ok_b", 48.0, 60.0),
        ]);

        // Corrupt one chain: a cycle-1 row with no cycle 0 beneath it.
        let pair = BiomarkerPair::v1(60.0, 20.0).unwrap();
        store
            .append_cycle_row(
                CycleRecord::v1(
                    patient("pt_coh_bad"),
                    CycleNumber(1),
                    60.0,
                    20.0,
                    classify(pair),
                    false,
                    0.0,
                    0.0,
                    0.0,
                    MonotonicTimeNs(5),
                )
                .unwrap(),
            )
            .unwrap();

        let summary = orchestrator()
            .advance_cohort(&mut store, MonotonicTimeNs(100))
            .unwrap();
        assert_eq!(summary.patients_processed, 2);
        assert_eq!(summary.patients_failed, vec![patient("pt_coh_bad")]);
        // The clock still advances for the batch.
        assert_eq!(store.clock(), CycleNumber(1));
    }

    #[test]
    fn at_cohort_06_same_seed_replays_identically() {
        let make = || cohort_store(&[("pt_coh_rep_a", 66.0, 35.0), ("pt_coh_rep_b", 81.0, 12.0)]);
        let mut left = make();
        let mut right = make();
        let orchestrator = orchestrator();

        for cycle in 0..3 {
            orchestrator
                .advance_cohort(&mut left, MonotonicTimeNs(100 + cycle))
                .unwrap();
            orchestrator
                .advance_cohort(&mut right, MonotonicTimeNs(100 + cycle))
                .unwrap();
        }

        for id in ["pt_coh_rep_a", "pt_coh_rep_b"] {
            let l = left.cycle_rows_for_patient(&patient(id));
            let r = right.cycle_rows_for_patient(&patient(id));
            assert_eq!(l.len(), r.len());
            for (a, b) in l.iter().zip(r.iter()) {
                assert_eq!(a.egfr, b.egfr);
                assert_eq!(a.uacr, b.uacr);
            }
        }
    }
}
