#![forbid(unsafe_code)]

use renalsim_contracts::treatment::{MedicationClass, Treatment, TreatmentEffect};

/// Flat uplift applied to the summed effects when more than one treatment is
/// active, reflecting complementary drug-class mechanisms.
pub const COMBINATION_BONUS: f64 = 0.15;

/// Per-class benefit envelope, interpolated linearly by adherence
/// (adherence 0 maps to the minimum benefit, 1 to the maximum).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectEnvelope {
    pub egfr_offset_min: f64,
    pub egfr_offset_max: f64,
    pub uacr_reduction_min: f64,
    pub uacr_reduction_max: f64,
}

pub fn effect_envelope(class: MedicationClass) -> EffectEnvelope {
    match class {
        MedicationClass::AceInhibitor => EffectEnvelope {
            egfr_offset_min: 0.05,
            egfr_offset_max: 0.25,
            uacr_reduction_min: 0.010,
            uacr_reduction_max: 0.040,
        },
        MedicationClass::Arb => EffectEnvelope {
            egfr_offset_min: 0.05,
            egfr_offset_max: 0.22,
            uacr_reduction_min: 0.010,
            uacr_reduction_max: 0.035,
        },
        MedicationClass::Sglt2Inhibitor => EffectEnvelope {
            egfr_offset_min: 0.10,
            egfr_offset_max: 0.35,
            uacr_reduction_min: 0.005,
            uacr_reduction_max: 0.030,
        },
    }
}

/// Compose the net trajectory modifier for a patient's active treatments.
/// Pure function of its input: an empty list yields zero effect and zero
/// adherence.
pub fn compose(treatments: &[Treatment]) -> TreatmentEffect {
    let active: Vec<&Treatment> = treatments.iter().filter(|t| t.active).collect();
    if active.is_empty() {
        return TreatmentEffect::none();
    }

    let mut egfr_offset = 0.0;
    let mut uacr_reduction = 0.0;
    let mut adherence_total = 0.0;
    for treatment in &active {
        let envelope = effect_envelope(treatment.medication_class);
        let adherence = treatment.current_adherence.clamp(0.0, 1.0);
        egfr_offset += envelope.egfr_offset_min
            + adherence * (envelope.egfr_offset_max - envelope.egfr_offset_min);
        uacr_reduction += envelope.uacr_reduction_min
            + adherence * (envelope.uacr_reduction_max - envelope.uacr_reduction_min);
        adherence_total += adherence;
    }

    if active.len() > 1 {
        egfr_offset *= 1.0 + COMBINATION_BONUS;
        uacr_reduction *= 1.0 + COMBINATION_BONUS;
    }

    TreatmentEffect {
        egfr_offset,
        uacr_reduction,
        average_adherence: adherence_total / active.len() as f64,
    }
}
