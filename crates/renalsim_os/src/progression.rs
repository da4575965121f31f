#![forbid(unsafe_code)]

use rand::Rng;

use renalsim_contracts::progression::{ProgressionArchetype, ProgressionState};
use renalsim_contracts::{MonotonicTimeNs, PatientId};
use renalsim_storage::repo::ProgressionRepo;

use crate::config::SimConfig;
use crate::error::EngineError;

/// Owns each patient's long-run trajectory parameters. States are created
/// lazily and frozen for the patient's lifetime.
#[derive(Debug, Clone)]
pub struct ProgressionStateManager {
    config: SimConfig,
}

impl ProgressionStateManager {
    pub fn new(config: SimConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(ProgressionStateManager { config })
    }

    /// Return the existing state unchanged, or create one: fetch the
    /// patient's known biomarkers (synthesizing normal-ish defaults when
    /// absent), draw an archetype from the fixed cohort distribution, and
    /// sample the rate pair once from the archetype's ranges.
    pub fn get_or_create<S, R>(
        &self,
        store: &mut S,
        patient_id: &PatientId,
        now: MonotonicTimeNs,
        rng: &mut R,
    ) -> Result<ProgressionState, EngineError>
    where
        S: ProgressionRepo,
        R: Rng,
    {
        if let Some(existing) = store.progression_state(patient_id) {
            return Ok(existing.clone());
        }

        let patient = store.patient_row(patient_id).ok_or(EngineError::NotFound {
            entity: "patients",
            id: patient_id.as_str().to_string(),
        })?;

        let baseline_egfr = match patient.known_egfr {
            Some(egfr) => egfr,
            None => rng.gen_range(self.config.default_egfr_min..=self.config.default_egfr_max),
        };
        let baseline_uacr = match patient.known_uacr {
            Some(uacr) => uacr,
            None => rng.gen_range(self.config.default_uacr_min..=self.config.default_uacr_max),
        };

        let archetype = draw_archetype(rng);
        let (decline_min, decline_max) = archetype.egfr_decline_range();
        let (growth_min, growth_max) = archetype.uacr_growth_range();

        let state = ProgressionState::v1(
            patient_id.clone(),
            archetype,
            baseline_egfr,
            baseline_uacr,
            rng.gen_range(decline_min..=decline_max),
            rng.gen_range(growth_min..=growth_max),
            now,
        )?;
        store.insert_progression_state(state.clone())?;
        Ok(state)
    }
}

/// Weighted draw over the fixed cohort distribution:
/// 5% rapid, 30% moderate, 15% slow, 50% minimal.
fn draw_archetype<R: Rng>(rng: &mut R) -> ProgressionArchetype {
    let roll = rng.gen_range(0u32..100);
    let mut cumulative = 0u32;
    for archetype in [
        ProgressionArchetype::Rapid,
        ProgressionArchetype::Moderate,
        ProgressionArchetype::Slow,
        ProgressionArchetype::Minimal,
    ] {
        cumulative += archetype.weight_pct() as u32;
        if roll < cumulative {
            return archetype;
        }
    }
    ProgressionArchetype::Minimal
}
