//! Core enums shared across the gate, classifier and approval manager:
//! [`AutonomyLevel`], [`ActionTier`] and [`GateDecision`].

use serde::{Deserialize, Serialize};

/// The user-chosen trust budget the gate spends per call.
///
/// Totally ordered `Low < Medium < High`; the ordering is load-bearing for
/// [`crate::progression`], which only ever proposes moving one rung up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutonomyLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl AutonomyLevel {
    /// The next rung up, or `None` if already at the maximum.
    pub fn next(self) -> Option<AutonomyLevel> {
        match self {
            AutonomyLevel::Low => Some(AutonomyLevel::Medium),
            AutonomyLevel::Medium => Some(AutonomyLevel::High),
            AutonomyLevel::High => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AutonomyLevel::Low => "low",
            AutonomyLevel::Medium => "medium",
            AutonomyLevel::High => "high",
        }
    }
}

/// Parses an autonomy level from an exact lowercase string.
///
/// Anything else — including `None`, empty strings, or differently-cased
/// input like `"LOW"` — maps to [`AutonomyLevel::Low`]. Casing is
/// deliberately not normalised; callers that want case-insensitivity must
/// lowercase before calling this.
pub fn parse_autonomy_level(raw: Option<&str>) -> AutonomyLevel {
    match raw {
        Some("low") => AutonomyLevel::Low,
        Some("medium") => AutonomyLevel::Medium,
        Some("high") => AutonomyLevel::High,
        _ => AutonomyLevel::Low,
    }
}

/// Coarse impact classification of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTier {
    CachedPattern,
    EphemeralCompute,
    PersistentService,
    SandboxedWorkspace,
    Irreversible,
}

impl ActionTier {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionTier::CachedPattern => "cached_pattern",
            ActionTier::EphemeralCompute => "ephemeral_compute",
            ActionTier::PersistentService => "persistent_service",
            ActionTier::SandboxedWorkspace => "sandboxed_workspace",
            ActionTier::Irreversible => "irreversible",
        }
    }

    /// A short human description used in gate reason strings.
    pub fn description(self) -> &'static str {
        match self {
            ActionTier::CachedPattern => "a cached, read-only pattern",
            ActionTier::EphemeralCompute => "ephemeral compute with local side effects",
            ActionTier::PersistentService => "a persistent external service",
            ActionTier::SandboxedWorkspace => "a sandboxed workspace surface",
            ActionTier::Irreversible => "an irreversible, externally visible action",
        }
    }
}

impl std::fmt::Display for ActionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a single gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    AutoApprove,
    NeedsApproval,
    Denied,
}

impl GateDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            GateDecision::AutoApprove => "auto_approve",
            GateDecision::NeedsApproval => "needs_approval",
            GateDecision::Denied => "denied",
        }
    }
}
