//! Maps `(tool name, params, hint)` to an [`ActionTier`].
//!
//! Resolution priority, top down: caller-supplied hint, runtime override,
//! static default registry, conservative fallback. `classify_action` is
//! total and pure given the process-wide override snapshot at call time.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::tier::ActionTier;

/// Caller-supplied override for a single classification call.
#[derive(Debug, Clone, Copy)]
pub struct ToolAutonomyHint {
    pub tier: ActionTier,
}

/// Conservative fallback used when a tool name matches nothing else.
///
/// Deliberately `PersistentService`, not `CachedPattern` — an unknown tool
/// must never be treated as free to auto-approve.
const FALLBACK_TIER: ActionTier = ActionTier::PersistentService;

fn default_registry() -> HashMap<&'static str, ActionTier> {
    use ActionTier::*;
    let mut m = HashMap::new();
    for name in [
        "read",
        "grep",
        "find",
        "ls",
        "web_search",
        "web_fetch",
        "memory_search",
        "memory_get",
        "agents_list",
        "sessions_list",
        "sessions_history",
        "session_status",
    ] {
        m.insert(name, CachedPattern);
    }
    for name in ["write", "edit", "apply_patch", "exec", "bash", "process", "image", "tts"] {
        m.insert(name, EphemeralCompute);
    }
    for name in ["cron", "gateway", "nodes", "subagents", "sessions_spawn"] {
        m.insert(name, PersistentService);
    }
    for name in ["browser", "canvas"] {
        m.insert(name, SandboxedWorkspace);
    }
    for name in ["message", "sessions_send", "whatsapp_login"] {
        m.insert(name, Irreversible);
    }
    m
}

/// Process-wide tool-tier classifier.
///
/// Holds the static default registry plus a mutable table of runtime
/// overrides. A read-copy-on-write discipline (an `RwLock` over a plain
/// `HashMap`) satisfies the single-process race-freedom requirement without
/// needing anything fancier — the table is small and writes are rare.
pub struct ActionClassifier {
    defaults: HashMap<&'static str, ActionTier>,
    overrides: RwLock<HashMap<String, ActionTier>>,
}

impl Default for ActionClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionClassifier {
    pub fn new() -> Self {
        Self {
            defaults: default_registry(),
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a runtime override, replacing any prior tier for `name`.
    pub fn register_tool_tier(&self, name: &str, tier: ActionTier) {
        self.overrides
            .write()
            .expect("classifier overrides lock poisoned")
            .insert(name.to_string(), tier);
    }

    /// Removes a runtime override, if any. Returns true if one was removed.
    pub fn unregister_tool_tier(&self, name: &str) -> bool {
        self.overrides
            .write()
            .expect("classifier overrides lock poisoned")
            .remove(name)
            .is_some()
    }

    /// A read-only merged snapshot: static defaults overlaid with runtime
    /// overrides, as seen at the moment of the call.
    pub fn classification_map(&self) -> HashMap<String, ActionTier> {
        let mut merged: HashMap<String, ActionTier> = self
            .defaults
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        for (k, v) in self
            .overrides
            .read()
            .expect("classifier overrides lock poisoned")
            .iter()
        {
            merged.insert(k.clone(), *v);
        }
        merged
    }

    /// Classifies a tool call. `params` is accepted but deliberately unused
    /// by the static/override paths — per-tool param shapes are opaque to
    /// the classifier; only a caller-supplied hint may branch on them, and
    /// today no built-in hint does.
    pub fn classify_action(
        &self,
        tool_name: &str,
        _params: Option<&Value>,
        hint: Option<ToolAutonomyHint>,
    ) -> ActionTier {
        if let Some(hint) = hint {
            return hint.tier;
        }
        if let Some(tier) = self
            .overrides
            .read()
            .expect("classifier overrides lock poisoned")
            .get(tool_name)
        {
            return *tier;
        }
        if let Some(tier) = self.defaults.get(tool_name) {
            return *tier;
        }
        FALLBACK_TIER
    }
}
