#![forbid(unsafe_code)]

use renalsim_contracts::ContractViolation;

/// Hard cap on the cohort clock; no batch runs past this cycle.
pub const MAX_COHORT_CYCLES: u16 = 24;

/// Tunables of the stochastic core. Every probability and range is explicit
/// here so tests can pin behavior (e.g. force treatment initiation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    pub max_cycles: u16,
    /// Symmetric bound on the additive eGFR noise per cycle (mL/min).
    pub egfr_noise: f64,
    /// Symmetric bound on the multiplicative uACR ratio noise per cycle.
    pub uacr_ratio_noise: f64,
    /// Physiological floors; noise can never push a biomarker below these.
    pub egfr_floor: f64,
    pub uacr_floor: f64,
    /// Below this average adherence the disease partially wins: the cycle
    /// delta blends `natural_blend_weight` natural with the remainder
    /// treatment-modified.
    pub poor_adherence_cutoff: f64,
    pub natural_blend_weight: f64,
    /// Probability of initiating a recommended drug class per batch.
    pub initiation_probability: f64,
    pub initial_adherence_min: f64,
    pub initial_adherence_max: f64,
    /// Per-treatment probability and magnitude of the adherence random walk.
    pub adherence_walk_probability: f64,
    pub adherence_walk_step: f64,
    pub adherence_min: f64,
    pub adherence_max: f64,
    /// Synthesized baseline ranges when a patient has no known biomarkers.
    pub default_egfr_min: f64,
    pub default_egfr_max: f64,
    pub default_uacr_min: f64,
    pub default_uacr_max: f64,
}

impl SimConfig {
    pub fn mvp_v1() -> Self {
        SimConfig {
            max_cycles: MAX_COHORT_CYCLES,
            egfr_noise: 0.30,
            uacr_ratio_noise: 0.02,
            egfr_floor: 1.0,
            uacr_floor: 0.5,
            poor_adherence_cutoff: 0.5,
            natural_blend_weight: 0.7,
            initiation_probability: 0.20,
            initial_adherence_min: 0.60,
            initial_adherence_max: 0.95,
            adherence_walk_probability: 0.30,
            adherence_walk_step: 0.08,
            adherence_min: 0.1,
            adherence_max: 1.0,
            default_egfr_min: 55.0,
            default_egfr_max: 85.0,
            default_uacr_min: 10.0,
            default_uacr_max: 120.0,
        }
    }

    pub fn validate(&self) -> Result<(), ContractViolation> {
        if self.max_cycles == 0 || self.max_cycles > MAX_COHORT_CYCLES {
            return Err(ContractViolation::InvalidValue {
                field: "sim_config.max_cycles",
                reason: "must be within 1..=24",
            });
        }
        if !(self.egfr_noise > 0.0) || !(self.uacr_ratio_noise > 0.0) {
            return Err(ContractViolation::InvalidValue {
                field: "sim_config.noise",
                reason: "noise bounds must be positive",
            });
        }
        if !(self.egfr_floor > 0.0) || !(self.uacr_floor > 0.0) {
            return Err(ContractViolation::InvalidValue {
                field: "sim_config.floors",
                reason: "physiological floors must be positive",
            });
        }
        for (field, p) in [
            ("sim_config.poor_adherence_cutoff", self.poor_adherence_cutoff),
            ("sim_config.natural_blend_weight", self.natural_blend_weight),
            ("sim_config.initiation_probability", self.initiation_probability),
            (
                "sim_config.adherence_walk_probability",
                self.adherence_walk_probability,
            ),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ContractViolation::InvalidRange {
                    field,
                    min: 0.0,
                    max: 1.0,
                    got: p,
                });
            }
        }
        if self.initial_adherence_min > self.initial_adherence_max
            || !(0.0..=1.0).contains(&self.initial_adherence_min)
            || !(0.0..=1.0).contains(&self.initial_adherence_max)
        {
            return Err(ContractViolation::InvalidValue {
                field: "sim_config.initial_adherence",
                reason: "range must sit within 0..=1 and be ordered",
            });
        }
        if self.adherence_min >= self.adherence_max {
            return Err(ContractViolation::InvalidValue {
                field: "sim_config.adherence_clamp",
                reason: "min must be below max",
            });
        }
        if self.default_egfr_min >= self.default_egfr_max
            || self.default_uacr_min >= self.default_uacr_max
        {
            return Err(ContractViolation::InvalidValue {
                field: "sim_config.default_baselines",
                reason: "ranges must be ordered",
            });
        }
        Ok(())
    }
}
