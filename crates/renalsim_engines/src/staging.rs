#![forbid(unsafe_code)]

use renalsim_contracts::staging::{
    AlbuminuriaCategory, BiomarkerPair, ChangeType, Classification, Comparison, GfrCategory,
    HealthState, MonitoringInterval, RiskLevel, TransitionReason, CRITICAL_EGFR_THRESHOLD,
    CRITICAL_UACR_THRESHOLD,
};

/// Pure, total, deterministic staging of one validated biomarker pair.
/// Same inputs always produce the same classification.
pub fn classify(pair: BiomarkerPair) -> Classification {
    let gfr_category = gfr_category(pair.egfr);
    let albuminuria_category = albuminuria_category(pair.uacr);
    let health_state = health_state(gfr_category, albuminuria_category);
    let risk_level = risk_level(gfr_category, albuminuria_category);

    let nephrology_referral = gfr_category.rank() >= GfrCategory::G4.rank()
        || (gfr_category == GfrCategory::G3b && albuminuria_category == AlbuminuriaCategory::A3);
    let dialysis_planning = gfr_category == GfrCategory::G5;
    let recommend_ras_blockade = albuminuria_category.rank() >= AlbuminuriaCategory::A2.rank();
    let recommend_sglt2 = pair.egfr >= 20.0
        && (albuminuria_category.rank() >= AlbuminuriaCategory::A2.rank()
            || gfr_category.rank() >= GfrCategory::G3a.rank());

    Classification {
        gfr_category,
        albuminuria_category,
        health_state,
        risk_level,
        stage: gfr_category.stage(),
        monitoring: monitoring_for(risk_level),
        nephrology_referral,
        dialysis_planning,
        recommend_ras_blockade,
        recommend_sglt2,
    }
}

/// Compare two consecutive classifications, with the raw biomarker pairs
/// alongside so critical-threshold crossings within the same composite state
/// are still detected.
pub fn compare(
    prev: &Classification,
    prev_pair: BiomarkerPair,
    curr: &Classification,
    curr_pair: BiomarkerPair,
) -> Comparison {
    let mut reasons = Vec::new();

    if prev.health_state != curr.health_state {
        reasons.push(TransitionReason::HealthStateChanged {
            from: prev.health_state,
            to: curr.health_state,
        });
    }

    let risk_delta = curr.risk_level.rank() as i8 - prev.risk_level.rank() as i8;
    if risk_delta > 0 {
        reasons.push(TransitionReason::RiskLevelIncreased {
            from: prev.risk_level,
            to: curr.risk_level,
        });
    } else if risk_delta < 0 && prev.health_state != curr.health_state {
        reasons.push(TransitionReason::RiskLevelDecreased {
            from: prev.risk_level,
            to: curr.risk_level,
        });
    }

    if curr.gfr_category.rank() > prev.gfr_category.rank() {
        reasons.push(TransitionReason::GfrStageProgressed {
            from: prev.gfr_category,
            to: curr.gfr_category,
        });
    }

    if prev_pair.egfr >= CRITICAL_EGFR_THRESHOLD && curr_pair.egfr < CRITICAL_EGFR_THRESHOLD {
        reasons.push(TransitionReason::CriticalEgfrCrossed {
            egfr: curr_pair.egfr,
        });
    }
    if prev_pair.uacr <= CRITICAL_UACR_THRESHOLD && curr_pair.uacr > CRITICAL_UACR_THRESHOLD {
        reasons.push(TransitionReason::CriticalUacrCrossed {
            uacr: curr_pair.uacr,
        });
    }

    let critical_crossed = reasons.iter().any(|r| r.is_critical());
    let has_changed =
        prev.health_state != curr.health_state || risk_delta > 0 || critical_crossed;
    if !has_changed {
        return Comparison::unchanged();
    }

    let stage_delta = curr.stage as i8 - prev.stage as i8;
    let change_type = if risk_delta > 0 || critical_crossed {
        ChangeType::Worsened
    } else if risk_delta < 0 {
        ChangeType::Improved
    } else if stage_delta > 0 {
        ChangeType::Worsened
    } else if stage_delta < 0 {
        ChangeType::Improved
    } else {
        ChangeType::Stable
    };

    let needs_alert = change_type == ChangeType::Worsened
        || critical_crossed
        || reasons.iter().any(|r| r.is_escalation());

    Comparison {
        has_changed,
        change_type,
        needs_alert,
        risk_delta,
        stage_delta,
        reasons,
    }
}

fn gfr_category(egfr: f64) -> GfrCategory {
    if egfr >= 90.0 {
        GfrCategory::G1
    } else if egfr >= 60.0 {
        GfrCategory::G2
    } else if egfr >= 45.0 {
        GfrCategory::G3a
    } else if egfr >= 30.0 {
        GfrCategory::G3b
    } else if egfr >= CRITICAL_EGFR_THRESHOLD {
        GfrCategory::G4
    } else {
        GfrCategory::G5
    }
}

fn albuminuria_category(uacr: f64) -> AlbuminuriaCategory {
    if uacr < 30.0 {
        AlbuminuriaCategory::A1
    } else if uacr <= CRITICAL_UACR_THRESHOLD {
        AlbuminuriaCategory::A2
    } else {
        AlbuminuriaCategory::A3
    }
}

fn health_state(gfr: GfrCategory, alb: AlbuminuriaCategory) -> HealthState {
    match gfr {
        GfrCategory::G5 => HealthState::KidneyFailure,
        GfrCategory::G4 => HealthState::Severe,
        GfrCategory::G3a | GfrCategory::G3b => HealthState::Moderate,
        GfrCategory::G2 => HealthState::Mild,
        GfrCategory::G1 => {
            if alb == AlbuminuriaCategory::A1 {
                HealthState::Normal
            } else {
                HealthState::Mild
            }
        }
    }
}

// KDIGO-style heat map over the category pair.
fn risk_level(gfr: GfrCategory, alb: AlbuminuriaCategory) -> RiskLevel {
    use AlbuminuriaCategory as A;
    use GfrCategory as G;
    match (gfr, alb) {
        (G::G1 | G::G2, A::A1) => RiskLevel::Low,
        (G::G1 | G::G2, A::A2) | (G::G3a, A::A1) => RiskLevel::Moderate,
        (G::G1 | G::G2, A::A3) | (G::G3a, A::A2) | (G::G3b, A::A1) => RiskLevel::High,
        _ => RiskLevel::VeryHigh,
    }
}

fn monitoring_for(risk: RiskLevel) -> MonitoringInterval {
    match risk {
        RiskLevel::Low => MonitoringInterval::Annual,
        RiskLevel::Moderate => MonitoringInterval::Semiannual,
        RiskLevel::High => MonitoringInterval::Quarterly,
        RiskLevel::VeryHigh => MonitoringInterval::Monthly,
    }
}
