//! The pure-function decision-maker over `(level, tier, confidence)`.

use crate::tier::{ActionTier, AutonomyLevel, GateDecision};

pub use crate::tier::parse_autonomy_level;

const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// The fixed policy matrix from the tier registry: row is level, column is
/// tier.
fn base_decision(level: AutonomyLevel, tier: ActionTier) -> GateDecision {
    use ActionTier::*;
    use AutonomyLevel::*;
    use GateDecision::*;

    // `Irreversible` always requires approval regardless of level.
    if tier == Irreversible {
        return NeedsApproval;
    }

    match (level, tier) {
        (_, CachedPattern) => AutoApprove,
        (Low, EphemeralCompute) => NeedsApproval,
        (Medium | High, EphemeralCompute) => AutoApprove,
        (Low | Medium, PersistentService) => NeedsApproval,
        (High, PersistentService) => AutoApprove,
        (Low | Medium, SandboxedWorkspace) => NeedsApproval,
        (High, SandboxedWorkspace) => AutoApprove,
        (_, Irreversible) => unreachable!("handled above"),
    }
}

/// The full result of a gate evaluation.
#[derive(Debug, Clone)]
pub struct GateEvaluation {
    pub decision: GateDecision,
    pub reason: String,
    pub level: AutonomyLevel,
    pub tier: ActionTier,
    pub confidence: Option<f64>,
}

/// Evaluates the policy matrix for `(level, tier)`, applying the
/// confidence-threshold downgrade: an otherwise-auto-approved call whose
/// confidence falls strictly below `threshold` is downgraded to
/// `needs_approval`. A `needs_approval` base decision is never promoted
/// regardless of confidence. Exactly-at-threshold values stay auto-approve
/// (inclusive comparison).
pub fn evaluate_gate(
    level: AutonomyLevel,
    tier: ActionTier,
    confidence: Option<f64>,
    threshold: Option<f64>,
) -> GateEvaluation {
    let threshold = threshold.unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);
    let base = base_decision(level, tier);

    if base == GateDecision::AutoApprove {
        if let Some(c) = confidence {
            if c < threshold {
                let reason = format!(
                    "confidence {:.0}% is below the {:.0}% threshold for {} ({}); approval required",
                    c * 100.0,
                    threshold * 100.0,
                    tier,
                    tier.description()
                );
                return GateEvaluation {
                    decision: GateDecision::NeedsApproval,
                    reason,
                    level,
                    tier,
                    confidence,
                };
            }
        }
        return GateEvaluation {
            decision: GateDecision::AutoApprove,
            reason: format!(
                "autonomy level {level:?} auto-approves {tier} ({})",
                tier.description()
            ),
            level,
            tier,
            confidence,
        };
    }

    let reason = format!(
        "autonomy level {level:?} requires approval for {tier} ({})",
        tier.description()
    );
    GateEvaluation {
        decision: base,
        reason,
        level,
        tier,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AutonomyLevel::*;

    #[test]
    fn irreversible_always_needs_approval() {
        for level in [Low, Medium, High] {
            let eval = evaluate_gate(level, ActionTier::Irreversible, None, None);
            assert_eq!(eval.decision, GateDecision::NeedsApproval);
        }
    }

    #[test]
    fn cached_pattern_always_auto_approves_without_low_confidence() {
        for level in [Low, Medium, High] {
            let eval = evaluate_gate(level, ActionTier::CachedPattern, None, None);
            assert_eq!(eval.decision, GateDecision::AutoApprove);
        }
    }

    #[test]
    fn confidence_exactly_at_threshold_stays_auto_approve() {
        let eval = evaluate_gate(High, ActionTier::EphemeralCompute, Some(0.7), None);
        assert_eq!(eval.decision, GateDecision::AutoApprove);
    }

    #[test]
    fn confidence_just_under_threshold_downgrades() {
        let eval = evaluate_gate(High, ActionTier::EphemeralCompute, Some(0.69), None);
        assert_eq!(eval.decision, GateDecision::NeedsApproval);
        assert!(eval.reason.contains('%'));
    }

    #[test]
    fn needs_approval_never_promoted_by_confidence() {
        let eval = evaluate_gate(Low, ActionTier::PersistentService, Some(0.99), None);
        assert_eq!(eval.decision, GateDecision::NeedsApproval);
    }

    #[test]
    fn matrix_matches_table_for_all_cells() {
        let expect = [
            (Low, ActionTier::CachedPattern, GateDecision::AutoApprove),
            (Low, ActionTier::EphemeralCompute, GateDecision::NeedsApproval),
            (Low, ActionTier::PersistentService, GateDecision::NeedsApproval),
            (Low, ActionTier::SandboxedWorkspace, GateDecision::NeedsApproval),
            (Medium, ActionTier::CachedPattern, GateDecision::AutoApprove),
            (Medium, ActionTier::EphemeralCompute, GateDecision::AutoApprove),
            (Medium, ActionTier::PersistentService, GateDecision::NeedsApproval),
            (Medium, ActionTier::SandboxedWorkspace, GateDecision::NeedsApproval),
            (High, ActionTier::CachedPattern, GateDecision::AutoApprove),
            (High, ActionTier::EphemeralCompute, GateDecision::AutoApprove),
            (High, ActionTier::PersistentService, GateDecision::AutoApprove),
            (High, ActionTier::SandboxedWorkspace, GateDecision::AutoApprove),
        ];
        for (level, tier, decision) in expect {
            assert_eq!(evaluate_gate(level, tier, None, None).decision, decision);
        }
    }
}
