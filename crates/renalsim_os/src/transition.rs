#![forbid(unsafe_code)]

use renalsim_contracts::staging::{Classification, Comparison};
use renalsim_contracts::transition::{AlertRecord, AlertSeverity, TransitionRecord};
use renalsim_contracts::{CycleNumber, MonotonicTimeNs, PatientId};
use renalsim_storage::repo::TransitionRepo;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertInfo {
    pub severity: AlertSeverity,
    pub requires_action: bool,
}

/// Persists transitions and, when the comparison asked for it, an alert.
/// Severity is derived purely from the comparison's reason list; no clinical
/// logic is re-derived here. Persistence failures propagate — a lost alert
/// is worse than a failed cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionDetector;

impl TransitionDetector {
    pub fn new() -> Self {
        TransitionDetector
    }

    /// Caller has already filtered on `comparison.has_changed`; a
    /// TransitionRecord is always written. Returns the alert info when an
    /// AlertRecord was persisted as well.
    #[allow(clippy::too_many_arguments)]
    pub fn detect<S>(
        &self,
        store: &mut S,
        patient_id: &PatientId,
        from_cycle: CycleNumber,
        to_cycle: CycleNumber,
        prev: &Classification,
        curr: &Classification,
        comparison: &Comparison,
        now: MonotonicTimeNs,
    ) -> Result<Option<AlertInfo>, EngineError>
    where
        S: TransitionRepo,
    {
        let severity = severity_from_reasons(comparison);

        store.append_transition_row(TransitionRecord::v1(
            patient_id.clone(),
            from_cycle,
            to_cycle,
            *prev,
            *curr,
            comparison.change_type,
            comparison.risk_delta,
            comparison.stage_delta,
            comparison.reasons.clone(),
            now,
        )?)?;

        if !comparison.needs_alert {
            return Ok(None);
        }

        let reasons: Vec<String> = comparison.reasons.iter().map(|r| r.describe()).collect();
        store.append_alert_row(AlertRecord::v1(
            patient_id.clone(),
            from_cycle,
            to_cycle,
            severity,
            reasons,
            now,
        )?)?;

        Ok(Some(AlertInfo {
            severity,
            requires_action: severity.requires_action(),
        }))
    }
}

fn severity_from_reasons(comparison: &Comparison) -> AlertSeverity {
    if comparison.reasons.iter().any(|r| r.is_critical()) {
        AlertSeverity::Critical
    } else if comparison.reasons.iter().any(|r| r.is_escalation()) {
        AlertSeverity::Warning
    } else {
        AlertSeverity::Info
    }
}
