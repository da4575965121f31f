#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::{validate_ascii_token, validate_unit_fraction};
use crate::{
    ContractViolation, CycleNumber, MonotonicTimeNs, PatientId, SchemaVersion, TreatmentId,
    Validate,
};

pub const TREATMENT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Closed set of drug classes with known effect envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MedicationClass {
    AceInhibitor,
    Arb,
    Sglt2Inhibitor,
}

impl MedicationClass {
    pub fn as_str(self) -> &'static str {
        match self {
            MedicationClass::AceInhibitor => "ace_inhibitor",
            MedicationClass::Arb => "arb",
            MedicationClass::Sglt2Inhibitor => "sglt2_inhibitor",
        }
    }

    /// Whether this class satisfies a RAS-blockade recommendation.
    pub fn is_ras_blockade(self) -> bool {
        matches!(self, MedicationClass::AceInhibitor | MedicationClass::Arb)
    }

    pub fn medication_names(self) -> &'static [&'static str] {
        match self {
            MedicationClass::AceInhibitor => &["lisinopril", "enalapril", "ramipril"],
            MedicationClass::Arb => &["losartan", "valsartan", "irbesartan"],
            MedicationClass::Sglt2Inhibitor => {
                &["dapagliflozin", "empagliflozin", "canagliflozin"]
            }
        }
    }
}

/// One prescribed treatment. Class and start cycle are immutable; adherence
/// drifts over time via external perturbation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub schema_version: SchemaVersion,
    pub treatment_id: TreatmentId,
    pub patient_id: PatientId,
    pub medication_class: MedicationClass,
    pub medication_name: String,
    pub current_adherence: f64,
    pub started_cycle: CycleNumber,
    pub active: bool,
}

impl Treatment {
    pub fn v1(
        treatment_id: TreatmentId,
        patient_id: PatientId,
        medication_class: MedicationClass,
        medication_name: String,
        current_adherence: f64,
        started_cycle: CycleNumber,
    ) -> Result<Self, ContractViolation> {
        let treatment = Treatment {
            schema_version: TREATMENT_CONTRACT_VERSION,
            treatment_id,
            patient_id,
            medication_class,
            medication_name,
            current_adherence,
            started_cycle,
            active: true,
        };
        treatment.validate()?;
        Ok(treatment)
    }
}

impl Validate for Treatment {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_ascii_token("treatment.medication_name", &self.medication_name, 48)?;
        validate_unit_fraction("treatment.current_adherence", self.current_adherence)?;
        Ok(())
    }
}

/// Net modifier a patient's active treatments apply to the natural
/// trajectory: an additive offset on the monthly eGFR delta and a
/// subtractive reduction on the fractional uACR growth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreatmentEffect {
    pub egfr_offset: f64,
    pub uacr_reduction: f64,
    pub average_adherence: f64,
}

impl TreatmentEffect {
    pub fn none() -> Self {
        TreatmentEffect {
            egfr_offset: 0.0,
            uacr_reduction: 0.0,
            average_adherence: 0.0,
        }
    }

    pub fn is_none(&self) -> bool {
        self.egfr_offset == 0.0 && self.uacr_reduction == 0.0
    }
}

/// MPR-style adherence tier from fixed score cut points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdherenceTier {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl AdherenceTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.90 {
            AdherenceTier::Excellent
        } else if score >= 0.80 {
            AdherenceTier::Good
        } else if score >= 0.65 {
            AdherenceTier::Fair
        } else if score >= 0.50 {
            AdherenceTier::Poor
        } else {
            AdherenceTier::VeryPoor
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdherenceTier::Excellent => "excellent",
            AdherenceTier::Good => "good",
            AdherenceTier::Fair => "fair",
            AdherenceTier::Poor => "poor",
            AdherenceTier::VeryPoor => "very_poor",
        }
    }
}

/// Upsert row keyed by `(treatment_id, cycle_number)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdherenceHistoryRow {
    pub schema_version: SchemaVersion,
    pub treatment_id: TreatmentId,
    pub cycle_number: CycleNumber,
    pub adherence_score: f64,
    pub tier: AdherenceTier,
    pub recorded_at: MonotonicTimeNs,
}

impl AdherenceHistoryRow {
    pub fn v1(
        treatment_id: TreatmentId,
        cycle_number: CycleNumber,
        adherence_score: f64,
        recorded_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        validate_unit_fraction("adherence_history.adherence_score", adherence_score)?;
        Ok(AdherenceHistoryRow {
            schema_version: TREATMENT_CONTRACT_VERSION,
            treatment_id,
            cycle_number,
            adherence_score,
            tier: AdherenceTier::from_score(adherence_score),
            recorded_at,
        })
    }
}

impl Validate for AdherenceHistoryRow {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_unit_fraction("adherence_history.adherence_score", self.adherence_score)?;
        if self.tier != AdherenceTier::from_score(self.adherence_score) {
            return Err(ContractViolation::InvalidValue {
                field: "adherence_history.tier",
                reason: "must match score cut points",
            });
        }
        Ok(())
    }
}
