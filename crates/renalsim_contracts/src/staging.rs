#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::validate_biomarker;
use crate::{ContractViolation, SchemaVersion, Validate};

pub const STAGING_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// eGFR below this value marks kidney failure and is a critical alert
/// threshold in its own right (mL/min/1.73m2).
pub const CRITICAL_EGFR_THRESHOLD: f64 = 15.0;

/// uACR above this value marks severely increased albuminuria (mg/g).
pub const CRITICAL_UACR_THRESHOLD: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GfrCategory {
    G1,
    G2,
    G3a,
    G3b,
    G4,
    G5,
}

impl GfrCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            GfrCategory::G1 => "G1",
            GfrCategory::G2 => "G2",
            GfrCategory::G3a => "G3a",
            GfrCategory::G3b => "G3b",
            GfrCategory::G4 => "G4",
            GfrCategory::G5 => "G5",
        }
    }

    /// Ordinal position, higher means more advanced disease.
    pub fn rank(self) -> u8 {
        match self {
            GfrCategory::G1 => 0,
            GfrCategory::G2 => 1,
            GfrCategory::G3a => 2,
            GfrCategory::G3b => 3,
            GfrCategory::G4 => 4,
            GfrCategory::G5 => 5,
        }
    }

    /// Numeric CKD stage shown to downstream consumers (G3a and G3b share
    /// stage 3).
    pub fn stage(self) -> u8 {
        match self {
            GfrCategory::G1 => 1,
            GfrCategory::G2 => 2,
            GfrCategory::G3a | GfrCategory::G3b => 3,
            GfrCategory::G4 => 4,
            GfrCategory::G5 => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlbuminuriaCategory {
    A1,
    A2,
    A3,
}

impl AlbuminuriaCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            AlbuminuriaCategory::A1 => "A1",
            AlbuminuriaCategory::A2 => "A2",
            AlbuminuriaCategory::A3 => "A3",
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            AlbuminuriaCategory::A1 => 0,
            AlbuminuriaCategory::A2 => 1,
            AlbuminuriaCategory::A3 => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthState {
    Normal,
    Mild,
    Moderate,
    Severe,
    KidneyFailure,
}

impl HealthState {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Normal => "normal",
            HealthState::Mild => "mild",
            HealthState::Moderate => "moderate",
            HealthState::Severe => "severe",
            HealthState::KidneyFailure => "kidney_failure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::VeryHigh => "very_high",
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::Moderate => 1,
            RiskLevel::High => 2,
            RiskLevel::VeryHigh => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonitoringInterval {
    Annual,
    Semiannual,
    Quarterly,
    Monthly,
}

impl MonitoringInterval {
    pub fn as_str(self) -> &'static str {
        match self {
            MonitoringInterval::Annual => "annual",
            MonitoringInterval::Semiannual => "semiannual",
            MonitoringInterval::Quarterly => "quarterly",
            MonitoringInterval::Monthly => "monthly",
        }
    }
}

/// Complete staging output for one biomarker pair. Flat fields only; the
/// narrative and notification collaborators consume this shape as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub gfr_category: GfrCategory,
    pub albuminuria_category: AlbuminuriaCategory,
    pub health_state: HealthState,
    pub risk_level: RiskLevel,
    pub stage: u8,
    pub monitoring: MonitoringInterval,
    pub nephrology_referral: bool,
    pub dialysis_planning: bool,
    pub recommend_ras_blockade: bool,
    pub recommend_sglt2: bool,
}

impl Validate for Classification {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.stage != self.gfr_category.stage() {
            return Err(ContractViolation::InvalidValue {
                field: "classification.stage",
                reason: "must match gfr_category stage",
            });
        }
        if self.dialysis_planning && self.gfr_category != GfrCategory::G5 {
            return Err(ContractViolation::InvalidValue {
                field: "classification.dialysis_planning",
                reason: "only valid at G5",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    Improved,
    Worsened,
    Stable,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Improved => "improved",
            ChangeType::Worsened => "worsened",
            ChangeType::Stable => "stable",
        }
    }
}

/// Closed set of reasons a comparison can change; the transition detector
/// derives alert severity from these without re-deriving clinical logic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransitionReason {
    HealthStateChanged {
        from: HealthState,
        to: HealthState,
    },
    RiskLevelIncreased {
        from: RiskLevel,
        to: RiskLevel,
    },
    RiskLevelDecreased {
        from: RiskLevel,
        to: RiskLevel,
    },
    GfrStageProgressed {
        from: GfrCategory,
        to: GfrCategory,
    },
    CriticalEgfrCrossed {
        egfr: f64,
    },
    CriticalUacrCrossed {
        uacr: f64,
    },
}

impl TransitionReason {
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            TransitionReason::CriticalEgfrCrossed { .. }
                | TransitionReason::CriticalUacrCrossed { .. }
        )
    }

    pub fn is_escalation(self) -> bool {
        matches!(
            self,
            TransitionReason::RiskLevelIncreased { .. }
                | TransitionReason::GfrStageProgressed { .. }
        )
    }

    pub fn describe(&self) -> String {
        match self {
            TransitionReason::HealthStateChanged { from, to } => {
                format!("health state changed from {} to {}", from.as_str(), to.as_str())
            }
            TransitionReason::RiskLevelIncreased { from, to } => {
                format!("risk level increased from {} to {}", from.as_str(), to.as_str())
            }
            TransitionReason::RiskLevelDecreased { from, to } => {
                format!("risk level decreased from {} to {}", from.as_str(), to.as_str())
            }
            TransitionReason::GfrStageProgressed { from, to } => {
                format!("GFR category progressed from {} to {}", from.as_str(), to.as_str())
            }
            TransitionReason::CriticalEgfrCrossed { egfr } => {
                format!("eGFR fell below 15 mL/min/1.73m2 ({egfr:.1})")
            }
            TransitionReason::CriticalUacrCrossed { uacr } => {
                format!("uACR rose above 300 mg/g ({uacr:.1})")
            }
        }
    }
}

/// Outcome of comparing two consecutive classifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub has_changed: bool,
    pub change_type: ChangeType,
    pub needs_alert: bool,
    pub risk_delta: i8,
    pub stage_delta: i8,
    pub reasons: Vec<TransitionReason>,
}

impl Comparison {
    pub fn unchanged() -> Self {
        Comparison {
            has_changed: false,
            change_type: ChangeType::Stable,
            needs_alert: false,
            risk_delta: 0,
            stage_delta: 0,
            reasons: Vec::new(),
        }
    }
}

impl Validate for Comparison {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.has_changed && self.reasons.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "comparison.reasons",
                reason: "changed comparison must carry at least one reason",
            });
        }
        if self.needs_alert && !self.has_changed {
            return Err(ContractViolation::InvalidValue {
                field: "comparison.needs_alert",
                reason: "alert requires a detected change",
            });
        }
        Ok(())
    }
}

/// A validated biomarker pair, the classifier's sole input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiomarkerPair {
    pub egfr: f64,
    pub uacr: f64,
}

impl BiomarkerPair {
    pub fn v1(egfr: f64, uacr: f64) -> Result<Self, ContractViolation> {
        let pair = BiomarkerPair { egfr, uacr };
        pair.validate()?;
        Ok(pair)
    }
}

impl Validate for BiomarkerPair {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_biomarker("biomarker_pair.egfr", self.egfr)?;
        validate_biomarker("biomarker_pair.uacr", self.uacr)?;
        Ok(())
    }
}
