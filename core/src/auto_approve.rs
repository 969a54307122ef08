//! Persistent, file-backed auto-approve rule store.
//!
//! Rules short-circuit the gate for future matching `(tool, tier)` calls.
//! Reads fail soft: a missing, unparseable, or wrong-version file is
//! treated as empty rather than as an error, matching the teacher's
//! credential-loading convention in `provider_auth::manager`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tier::ActionTier;

pub const DEFAULT_AGENT_ID: &str = "main";
const WILDCARD_AGENT_ID: &str = "*";
const FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutoApproveRule {
    pub id: Uuid,
    pub tool_pattern: String,
    pub tier: ActionTier,
    pub created_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at_ms: Option<i64>,
    pub use_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AgentRules {
    rules: Vec<AutoApproveRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AutoApproveFile {
    version: u32,
    agents: HashMap<String, AgentRules>,
}

impl Default for AutoApproveFile {
    fn default() -> Self {
        Self {
            version: FILE_VERSION,
            agents: HashMap::new(),
        }
    }
}

fn expand_home(raw: &Path) -> PathBuf {
    let s = raw.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/"))
            .join(rest)
    } else {
        raw.to_path_buf()
    }
}

/// `toolPattern` matching per the documented glob semantics: `"*"` matches
/// anything, a trailing `"*"` matches by prefix, anything else is an exact,
/// case-sensitive match.
pub fn matches_tool_pattern(pattern: &str, name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return name.starts_with(prefix);
    }
    pattern == name
}

/// File-backed rule store. Every public method does a full
/// `load -> mutate -> save` round trip; nothing is cached across calls, per
/// the concurrency model's tolerance for stale reads from other processes.
pub struct AutoApproveStore {
    path: PathBuf,
}

impl AutoApproveStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: expand_home(path.as_ref()),
        }
    }

    fn load(&self) -> AutoApproveFile {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return AutoApproveFile::default();
        };
        match serde_json::from_str::<AutoApproveFile>(&content) {
            Ok(f) if f.version == FILE_VERSION => f,
            Ok(_) => {
                tracing::warn!("autonomy-rules.json has an unsupported version, ignoring");
                AutoApproveFile::default()
            }
            Err(e) => {
                tracing::warn!("autonomy-rules.json is malformed, ignoring: {e}");
                AutoApproveFile::default()
            }
        }
    }

    fn save(&self, file: &AutoApproveFile) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut body = serde_json::to_string_pretty(file)?;
        body.push('\n');
        std::fs::write(&self.path, &body)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Adds a rule, deduping on `(toolPattern, tier)` per agent. Returns the
    /// existing rule if one already matches exactly, otherwise a fresh one.
    pub fn add(
        &self,
        tool_name: &str,
        tier: ActionTier,
        agent_id: Option<&str>,
        now_ms: i64,
    ) -> AutoApproveRule {
        let agent_id = agent_id.unwrap_or(DEFAULT_AGENT_ID).to_string();
        let mut file = self.load();
        let entry = file.agents.entry(agent_id).or_default();
        if let Some(existing) = entry
            .rules
            .iter()
            .find(|r| r.tool_pattern == tool_name && r.tier == tier)
        {
            return existing.clone();
        }
        let rule = AutoApproveRule {
            id: Uuid::new_v4(),
            tool_pattern: tool_name.to_string(),
            tier,
            created_at_ms: now_ms,
            last_used_at_ms: None,
            use_count: 0,
        };
        entry.rules.push(rule.clone());
        if let Err(e) = self.save(&file) {
            tracing::debug!("failed to persist auto-approve rule: {e}");
        }
        rule
    }

    /// Searches the agent's own rules first, then the wildcard-agent
    /// rules, for the first rule whose pattern matches `tool_name` and
    /// whose tier equals `tier`. On a match, fires off a best-effort usage
    /// update; failures there never propagate to the caller.
    pub fn check(
        &self,
        tool_name: &str,
        tier: ActionTier,
        agent_id: Option<&str>,
        now_ms: i64,
    ) -> Option<AutoApproveRule> {
        let agent_id = agent_id.unwrap_or(DEFAULT_AGENT_ID).to_string();
        let file = self.load();

        let find_in = |agent: &str| -> Option<AutoApproveRule> {
            file.agents.get(agent).and_then(|rules| {
                rules
                    .rules
                    .iter()
                    .find(|r| matches_tool_pattern(&r.tool_pattern, tool_name) && r.tier == tier)
                    .cloned()
            })
        };

        let hit = find_in(&agent_id).or_else(|| find_in(WILDCARD_AGENT_ID))?;
        self.touch_usage(&hit.id, now_ms);
        Some(hit)
    }

    fn touch_usage(&self, rule_id: &Uuid, now_ms: i64) {
        let mut file = self.load();
        let mut touched = false;
        for agent in file.agents.values_mut() {
            if let Some(rule) = agent.rules.iter_mut().find(|r| r.id == *rule_id) {
                rule.last_used_at_ms = Some(now_ms);
                rule.use_count += 1;
                touched = true;
                break;
            }
        }
        if touched {
            if let Err(e) = self.save(&file) {
                tracing::debug!("failed to persist auto-approve rule usage: {e}");
            }
        }
    }

    /// Removes a rule by id. Returns `false` if it was not present.
    pub fn remove(&self, rule_id: Uuid, agent_id: Option<&str>) -> bool {
        let agent_id = agent_id.unwrap_or(DEFAULT_AGENT_ID).to_string();
        let mut file = self.load();
        let Some(entry) = file.agents.get_mut(&agent_id) else {
            return false;
        };
        let before = entry.rules.len();
        entry.rules.retain(|r| r.id != rule_id);
        let removed = entry.rules.len() != before;
        if removed {
            if let Err(e) = self.save(&file) {
                tracing::debug!("failed to persist auto-approve rule removal: {e}");
            }
        }
        removed
    }

    pub fn list(&self, agent_id: Option<&str>) -> Vec<AutoApproveRule> {
        let agent_id = agent_id.unwrap_or(DEFAULT_AGENT_ID).to_string();
        self.load()
            .agents
            .get(&agent_id)
            .map(|a| a.rules.clone())
            .unwrap_or_default()
    }
}
