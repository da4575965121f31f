#![forbid(unsafe_code)]

use renalsim_contracts::cycle::CycleRecord;
use renalsim_contracts::transition::{AlertRecord, TransitionRecord};

use crate::cohort::CohortSummary;

/// Stable, flat JSON shapes for the narrative and notification consumers.
/// These are the only serialization surfaces the core owns.
pub fn cycle_record_json(record: &CycleRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}

pub fn transition_record_json(record: &TransitionRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}

pub fn alert_record_json(record: &AlertRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}

pub fn summary_json(summary: &CohortSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use renalsim_contracts::staging::BiomarkerPair;
    use renalsim_contracts::{CycleNumber, MonotonicTimeNs, PatientId};
    use renalsim_engines::staging::classify;

    #[test]
    fn at_export_01_cycle_record_serializes_flat() {
        let pair = BiomarkerPair::v1(52.0, 140.0).unwrap();
        let record = CycleRecord::v1(
            PatientId::new("pt_export_1").unwrap(),
            CycleNumber(3),
            52.0,
            140.0,
            classify(pair),
            true,
            0.85,
            0.21,
            0.03,
            MonotonicTimeNs(77),
        )
        .unwrap();

        let json = cycle_record_json(&record).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let object = value.as_object().unwrap();
        // Classification fields are flattened onto the record itself, so the
        // narrative consumer sees one flat object.
        assert!(object.contains_key("egfr"));
        assert!(object.contains_key("gfr_category"));
        assert!(object.contains_key("risk_level"));
        assert!(object.contains_key("recommend_sglt2"));
        assert!(object.contains_key("average_adherence"));
        assert!(!object.contains_key("classification"));
    }
}
