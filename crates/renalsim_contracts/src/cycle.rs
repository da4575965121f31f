#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::{validate_biomarker, validate_unit_fraction};
use crate::staging::Classification;
use crate::{
    ContractViolation, CycleNumber, MonotonicTimeNs, PatientId, SchemaVersion, Validate,
};

pub const CYCLE_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Append-only row, one per patient per cycle, keyed by
/// `(patient_id, cycle_number)`. Cycle 0 derives from the progression-state
/// baselines; cycle n derives from the persisted cycle n-1 row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub schema_version: SchemaVersion,
    pub patient_id: PatientId,
    pub cycle_number: CycleNumber,
    pub egfr: f64,
    pub uacr: f64,
    #[serde(flatten)]
    pub classification: Classification,
    pub is_treated: bool,
    pub average_adherence: f64,
    pub treatment_effect_egfr: f64,
    pub treatment_effect_uacr: f64,
    pub measured_at: MonotonicTimeNs,
}

impl CycleRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        patient_id: PatientId,
        cycle_number: CycleNumber,
        egfr: f64,
        uacr: f64,
        classification: Classification,
        is_treated: bool,
        average_adherence: f64,
        treatment_effect_egfr: f64,
        treatment_effect_uacr: f64,
        measured_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let record = CycleRecord {
            schema_version: CYCLE_CONTRACT_VERSION,
            patient_id,
            cycle_number,
            egfr,
            uacr,
            classification,
            is_treated,
            average_adherence,
            treatment_effect_egfr,
            treatment_effect_uacr,
            measured_at,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for CycleRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_biomarker("cycle_record.egfr", self.egfr)?;
        validate_biomarker("cycle_record.uacr", self.uacr)?;
        validate_unit_fraction("cycle_record.average_adherence", self.average_adherence)?;
        if !self.is_treated && self.treatment_effect_egfr != 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "cycle_record.treatment_effect_egfr",
                reason: "untreated cycle must carry zero effect",
            });
        }
        self.classification.validate()
    }
}
