#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::staging::{ChangeType, Classification, TransitionReason};
use crate::{
    ContractViolation, CycleNumber, MonotonicTimeNs, PatientId, SchemaVersion, Validate,
};

pub const TRANSITION_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Persisted whenever a comparison between consecutive cycles reports a
/// meaningful change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub schema_version: SchemaVersion,
    pub patient_id: PatientId,
    pub from_cycle: CycleNumber,
    pub to_cycle: CycleNumber,
    pub from_classification: Classification,
    pub to_classification: Classification,
    pub change_type: ChangeType,
    pub risk_delta: i8,
    pub stage_delta: i8,
    pub category_escalated: bool,
    pub risk_escalated: bool,
    pub critical_crossed: bool,
    pub reasons: Vec<TransitionReason>,
    pub detected_at: MonotonicTimeNs,
}

impl TransitionRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        patient_id: PatientId,
        from_cycle: CycleNumber,
        to_cycle: CycleNumber,
        from_classification: Classification,
        to_classification: Classification,
        change_type: ChangeType,
        risk_delta: i8,
        stage_delta: i8,
        reasons: Vec<TransitionReason>,
        detected_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let category_escalated = reasons
            .iter()
            .any(|r| matches!(r, TransitionReason::GfrStageProgressed { .. }));
        let risk_escalated = reasons
            .iter()
            .any(|r| matches!(r, TransitionReason::RiskLevelIncreased { .. }));
        let critical_crossed = reasons.iter().any(|r| r.is_critical());
        let record = TransitionRecord {
            schema_version: TRANSITION_CONTRACT_VERSION,
            patient_id,
            from_cycle,
            to_cycle,
            from_classification,
            to_classification,
            change_type,
            risk_delta,
            stage_delta,
            category_escalated,
            risk_escalated,
            critical_crossed,
            reasons,
            detected_at,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for TransitionRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.to_cycle.0 != self.from_cycle.0 + 1 {
            return Err(ContractViolation::InvalidValue {
                field: "transition_record.to_cycle",
                reason: "must be exactly one cycle after from_cycle",
            });
        }
        if self.reasons.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "transition_record.reasons",
                reason: "must carry at least one reason",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

impl AlertSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertSeverity::Critical => "critical",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Info => "info",
        }
    }

    /// Lower rank means higher delivery priority.
    pub fn priority_rank(self) -> u8 {
        match self {
            AlertSeverity::Critical => 0,
            AlertSeverity::Warning => 1,
            AlertSeverity::Info => 2,
        }
    }

    pub fn requires_action(self) -> bool {
        !matches!(self, AlertSeverity::Info)
    }
}

/// Created only alongside a transition whose comparison signaled
/// `needs_alert`. Reason texts are structured descriptions, not narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub schema_version: SchemaVersion,
    pub patient_id: PatientId,
    pub from_cycle: CycleNumber,
    pub to_cycle: CycleNumber,
    pub severity: AlertSeverity,
    pub priority_rank: u8,
    pub requires_action: bool,
    pub reasons: Vec<String>,
    pub created_at: MonotonicTimeNs,
}

impl AlertRecord {
    pub fn v1(
        patient_id: PatientId,
        from_cycle: CycleNumber,
        to_cycle: CycleNumber,
        severity: AlertSeverity,
        reasons: Vec<String>,
        created_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let record = AlertRecord {
            schema_version: TRANSITION_CONTRACT_VERSION,
            patient_id,
            from_cycle,
            to_cycle,
            severity,
            priority_rank: severity.priority_rank(),
            requires_action: severity.requires_action(),
            reasons,
            created_at,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for AlertRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.reasons.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "alert_record.reasons",
                reason: "must carry at least one reason",
            });
        }
        if self.priority_rank != self.severity.priority_rank() {
            return Err(ContractViolation::InvalidValue {
                field: "alert_record.priority_rank",
                reason: "must match severity",
            });
        }
        if self.requires_action != self.severity.requires_action() {
            return Err(ContractViolation::InvalidValue {
                field: "alert_record.requires_action",
                reason: "must match severity",
            });
        }
        Ok(())
    }
}
