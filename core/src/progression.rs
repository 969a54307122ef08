//! Progression Tracker: per-agent approval streak that proposes autonomy
//! upgrades once the track record warrants.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::tier::AutonomyLevel;

const FILE_VERSION: u32 = 1;
const DEFAULT_MIN_APPROVALS: u64 = 50;
const DEFAULT_MIN_APPROVAL_RATE: f64 = 0.95;
const DEFAULT_COOLDOWN_DAYS: i64 = 7;
const MS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProgressionStats {
    pub total_approvals: u64,
    pub total_denials: u64,
    pub consecutive_successes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_proposal_at_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_proposal_level: Option<AutonomyLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProgressionFile {
    version: u32,
    agents: HashMap<String, ProgressionStats>,
}

impl Default for ProgressionFile {
    fn default() -> Self {
        Self {
            version: FILE_VERSION,
            agents: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    pub enabled: bool,
    pub min_approvals: u64,
    pub min_approval_rate: f64,
    pub cooldown_days: i64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_approvals: DEFAULT_MIN_APPROVALS,
            min_approval_rate: DEFAULT_MIN_APPROVAL_RATE,
            cooldown_days: DEFAULT_COOLDOWN_DAYS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpgradeProposal {
    pub propose: bool,
    pub from_level: AutonomyLevel,
    pub to_level: Option<AutonomyLevel>,
    pub stats: ProgressionStats,
    pub reason: String,
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

pub struct ProgressionTracker {
    path: PathBuf,
}

impl ProgressionTracker {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: expand_home(path.as_ref()),
        }
    }

    fn load(&self) -> ProgressionFile {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return ProgressionFile::default();
        };
        match serde_json::from_str::<ProgressionFile>(&content) {
            Ok(f) if f.version == FILE_VERSION => f,
            Ok(_) => ProgressionFile::default(),
            Err(e) => {
                tracing::warn!("autonomy-progression.json is malformed, ignoring: {e}");
                ProgressionFile::default()
            }
        }
    }

    fn save(&self, file: &ProgressionFile) -> std::io::Result<()> {
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

    pub fn stats(&self, agent_id: &str) -> ProgressionStats {
        self.load().agents.get(agent_id).cloned().unwrap_or_default()
    }

    /// Increments the appropriate counter. `consecutiveSuccesses` resets to
    /// 0 on any denial.
    pub fn record_approval_outcome(&self, approved: bool, agent_id: &str) -> ProgressionStats {
        let mut file = self.load();
        let stats = file.agents.entry(agent_id.to_string()).or_default();
        if approved {
            stats.total_approvals += 1;
            stats.consecutive_successes += 1;
        } else {
            stats.total_denials += 1;
            stats.consecutive_successes = 0;
        }
        let result = stats.clone();
        if let Err(e) = self.save(&file) {
            tracing::debug!("failed to persist progression stats: {e}");
        }
        result
    }

    /// Evaluates the short-circuit guard chain and returns whether an
    /// upgrade should be proposed.
    pub fn should_propose_upgrade(
        &self,
        current_level: AutonomyLevel,
        config: &ProgressionConfig,
        agent_id: &str,
        now_ms: i64,
    ) -> UpgradeProposal {
        let stats = self.stats(agent_id);

        let Some(next) = current_level.next() else {
            return UpgradeProposal {
                propose: false,
                from_level: current_level,
                to_level: None,
                stats,
                reason: "at maximum autonomy level".to_string(),
            };
        };

        if !config.enabled {
            return UpgradeProposal {
                propose: false,
                from_level: current_level,
                to_level: Some(next),
                stats,
                reason: "progression is disabled".to_string(),
            };
        }

        let total = stats.total_approvals + stats.total_denials;
        if total < config.min_approvals {
            return UpgradeProposal {
                propose: false,
                from_level: current_level,
                to_level: Some(next),
                stats,
                reason: format!(
                    "Need at least {} resolved decisions, have {total}",
                    config.min_approvals
                ),
            };
        }

        let rate = stats.total_approvals as f64 / total as f64;
        if rate < config.min_approval_rate {
            return UpgradeProposal {
                propose: false,
                from_level: current_level,
                to_level: Some(next),
                stats,
                reason: format!(
                    "approval rate {:.1}% is below the {:.1}% minimum",
                    rate * 100.0,
                    config.min_approval_rate * 100.0
                ),
            };
        }

        if let Some(last) = stats.last_proposal_at_ms {
            let elapsed = now_ms - last;
            let cooldown_ms = config.cooldown_days * MS_PER_DAY;
            if elapsed < cooldown_ms {
                return UpgradeProposal {
                    propose: false,
                    from_level: current_level,
                    to_level: Some(next),
                    stats,
                    reason: format!(
                        "cooldown active: {} of {} days elapsed since the last proposal",
                        elapsed / MS_PER_DAY,
                        config.cooldown_days
                    ),
                };
            }
        }

        UpgradeProposal {
            propose: true,
            from_level: current_level,
            to_level: Some(next),
            stats,
            reason: format!(
                "{total} resolved decisions at a {:.1}% approval rate clear the bar for {next:?}",
                rate * 100.0
            ),
        }
    }

    pub fn mark_proposal_surfaced(&self, agent_id: &str, level: AutonomyLevel, now_ms: i64) {
        let mut file = self.load();
        let stats = file.agents.entry(agent_id.to_string()).or_default();
        stats.last_proposal_at_ms = Some(now_ms);
        stats.last_proposal_level = Some(level);
        if let Err(e) = self.save(&file) {
            tracing::debug!("failed to persist progression proposal stamp: {e}");
        }
    }

    pub fn reset(&self, agent_id: &str) {
        let mut file = self.load();
        file.agents.remove(agent_id);
        if let Err(e) = self.save(&file) {
            tracing::debug!("failed to persist progression reset: {e}");
        }
    }
}
