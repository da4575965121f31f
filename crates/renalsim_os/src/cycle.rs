#![forbid(unsafe_code)]

use rand::Rng;

use renalsim_contracts::cycle::CycleRecord;
use renalsim_contracts::staging::{BiomarkerPair, Comparison};
use renalsim_contracts::treatment::AdherenceHistoryRow;
use renalsim_contracts::{CycleNumber, MonotonicTimeNs, PatientId};
use renalsim_engines::staging::{classify, compare};
use renalsim_engines::treatment::compose;
use renalsim_storage::repo::{CycleRepo, ProgressionRepo, TransitionRepo, TreatmentRepo};

use crate::config::SimConfig;
use crate::error::EngineError;
use crate::transition::{AlertInfo, TransitionDetector};

#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub record: CycleRecord,
    pub comparison: Option<Comparison>,
    pub transition_detected: bool,
    pub alert: Option<AlertInfo>,
}

/// The central stochastic step function. Cycles form a strict linear chain
/// per patient: cycle 0 comes from the progression-state baselines, cycle n
/// from the persisted cycle n-1 row. Generation never skips and never
/// regenerates.
#[derive(Debug, Clone)]
pub struct CycleGenerator {
    config: SimConfig,
    detector: TransitionDetector,
}

impl CycleGenerator {
    pub fn new(config: SimConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(CycleGenerator {
            config,
            detector: TransitionDetector::new(),
        })
    }

    pub fn generate<S, R>(
        &self,
        store: &mut S,
        patient_id: &PatientId,
        target_cycle: CycleNumber,
        now: MonotonicTimeNs,
        rng: &mut R,
    ) -> Result<CycleOutcome, EngineError>
    where
        S: ProgressionRepo + CycleRepo + TreatmentRepo + TransitionRepo,
        R: Rng,
    {
        let state = store
            .progression_state(patient_id)
            .ok_or(EngineError::NotFound {
                entity: "progression_states",
                id: patient_id.as_str().to_string(),
            })?
            .clone();

        let expected = store
            .latest_cycle_row(patient_id)
            .map(|row| row.cycle_number.next())
            .unwrap_or(CycleNumber(0));
        if target_cycle != expected {
            return Err(EngineError::SequenceError {
                patient_id: patient_id.as_str().to_string(),
                expected: expected.0,
                requested: target_cycle.0,
            });
        }

        let prev_record = if target_cycle.0 == 0 {
            None
        } else {
            // expected == target_cycle guarantees the n-1 row exists.
            store
                .cycle_row(patient_id, CycleNumber(target_cycle.0 - 1))
                .cloned()
        };

        let treatments = store.active_treatments(patient_id);
        let effect = compose(&treatments);
        let is_treated = !treatments.is_empty();

        let (egfr, uacr) = match &prev_record {
            None => (
                state.baseline_egfr.max(self.config.egfr_floor),
                state.baseline_uacr.max(self.config.uacr_floor),
            ),
            Some(prev) => {
                let natural_delta = state.egfr_decline_rate;
                let natural_ratio = 1.0 + state.uacr_growth_rate;

                let (mut delta, mut ratio) = (natural_delta, natural_ratio);
                if is_treated {
                    let treated_delta = natural_delta + effect.egfr_offset;
                    let treated_ratio = natural_ratio - effect.uacr_reduction;
                    if effect.average_adherence < self.config.poor_adherence_cutoff {
                        // Poor adherence erodes efficacy: the disease wins
                        // the larger share of the blend.
                        let w = self.config.natural_blend_weight;
                        delta = w * natural_delta + (1.0 - w) * treated_delta;
                        ratio = w * natural_ratio + (1.0 - w) * treated_ratio;
                    } else {
                        delta = treated_delta;
                        ratio = treated_ratio;
                    }
                }

                delta += rng.gen_range(-self.config.egfr_noise..=self.config.egfr_noise);
                ratio *= 1.0
                    + rng.gen_range(-self.config.uacr_ratio_noise..=self.config.uacr_ratio_noise);

                (
                    (prev.egfr + delta).max(self.config.egfr_floor),
                    (prev.uacr * ratio).max(self.config.uacr_floor),
                )
            }
        };

        let pair = BiomarkerPair::v1(egfr, uacr)?;
        let classification = classify(pair);

        let record = CycleRecord::v1(
            patient_id.clone(),
            target_cycle,
            egfr,
            uacr,
            classification,
            is_treated,
            effect.average_adherence,
            effect.egfr_offset,
            effect.uacr_reduction,
            now,
        )?;
        store.append_cycle_row(record.clone())?;

        if target_cycle.0 > 0 {
            for treatment in &treatments {
                store.upsert_adherence_history(AdherenceHistoryRow::v1(
                    treatment.treatment_id,
                    target_cycle,
                    treatment.current_adherence,
                    now,
                )?)?;
            }
        }

        let mut comparison = None;
        let mut transition_detected = false;
        let mut alert = None;
        if let Some(prev) = &prev_record {
            let prev_pair = BiomarkerPair::v1(prev.egfr, prev.uacr)?;
            let cmp = compare(&prev.classification, prev_pair, &classification, pair);
            if cmp.has_changed {
                alert = self.detector.detect(
                    store,
                    patient_id,
                    prev.cycle_number,
                    target_cycle,
                    &prev.classification,
                    &classification,
                    &cmp,
                    now,
                )?;
                transition_detected = true;
            }
            comparison = Some(cmp);
        }

        Ok(CycleOutcome {
            record,
            comparison,
            transition_detected,
            alert,
        })
    }
}
