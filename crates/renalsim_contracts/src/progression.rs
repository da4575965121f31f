#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::validate_biomarker;
use crate::{ContractViolation, MonotonicTimeNs, PatientId, SchemaVersion, Validate};

pub const PROGRESSION_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Frozen long-run progression-speed category, sampled once at state
/// creation. Every archetype declines untreated; the names grade speed, not
/// outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressionArchetype {
    Rapid,
    Moderate,
    Slow,
    Minimal,
}

impl ProgressionArchetype {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressionArchetype::Rapid => "rapid",
            ProgressionArchetype::Moderate => "moderate",
            ProgressionArchetype::Slow => "slow",
            ProgressionArchetype::Minimal => "minimal",
        }
    }

    /// Cohort weight in percent; weights sum to 100.
    pub fn weight_pct(self) -> u8 {
        match self {
            ProgressionArchetype::Rapid => 5,
            ProgressionArchetype::Moderate => 30,
            ProgressionArchetype::Slow => 15,
            ProgressionArchetype::Minimal => 50,
        }
    }

    /// Sampling range for the monthly eGFR decline rate, `(min, max)` with
    /// both ends negative.
    pub fn egfr_decline_range(self) -> (f64, f64) {
        match self {
            ProgressionArchetype::Rapid => (-1.20, -0.60),
            ProgressionArchetype::Moderate => (-0.55, -0.25),
            ProgressionArchetype::Slow => (-0.25, -0.10),
            ProgressionArchetype::Minimal => (-0.10, -0.02),
        }
    }

    /// Sampling range for the monthly fractional uACR growth rate.
    pub fn uacr_growth_range(self) -> (f64, f64) {
        match self {
            ProgressionArchetype::Rapid => (0.040, 0.080),
            ProgressionArchetype::Moderate => (0.020, 0.040),
            ProgressionArchetype::Slow => (0.010, 0.020),
            ProgressionArchetype::Minimal => (0.002, 0.010),
        }
    }
}

/// One per patient, immutable after creation. Rates are sampled once from
/// the archetype's ranges and never change; only cycle outcomes vary via
/// noise and treatment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub schema_version: SchemaVersion,
    pub patient_id: PatientId,
    pub archetype: ProgressionArchetype,
    pub baseline_egfr: f64,
    pub baseline_uacr: f64,
    /// mL/min/1.73m2 per month, always <= 0.
    pub egfr_decline_rate: f64,
    /// Fraction per month, always >= 0.
    pub uacr_growth_rate: f64,
    pub created_at: MonotonicTimeNs,
}

impl ProgressionState {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        patient_id: PatientId,
        archetype: ProgressionArchetype,
        baseline_egfr: f64,
        baseline_uacr: f64,
        egfr_decline_rate: f64,
        uacr_growth_rate: f64,
        created_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let state = ProgressionState {
            schema_version: PROGRESSION_CONTRACT_VERSION,
            patient_id,
            archetype,
            baseline_egfr,
            baseline_uacr,
            egfr_decline_rate,
            uacr_growth_rate,
            created_at,
        };
        state.validate()?;
        Ok(state)
    }
}

impl Validate for ProgressionState {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_biomarker("progression_state.baseline_egfr", self.baseline_egfr)?;
        validate_biomarker("progression_state.baseline_uacr", self.baseline_uacr)?;
        if !self.egfr_decline_rate.is_finite() {
            return Err(ContractViolation::NotFinite {
                field: "progression_state.egfr_decline_rate",
            });
        }
        if self.egfr_decline_rate > 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "progression_state.egfr_decline_rate",
                reason: "must be <= 0",
            });
        }
        if !self.uacr_growth_rate.is_finite() {
            return Err(ContractViolation::NotFinite {
                field: "progression_state.uacr_growth_rate",
            });
        }
        if self.uacr_growth_rate < 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "progression_state.uacr_growth_rate",
                reason: "must be >= 0",
            });
        }
        Ok(())
    }
}
