//! Layered configuration: compiled-in defaults, overlaid by an optional
//! TOML file, in turn overlaid by `AASC_*` environment variables — the same
//! three-layer precedence the teacher's `ConfigLoader` applies, with the
//! teacher's `CODEX_*` prefix swapped for `AASC_*`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data_flow::DataFlowConfig;
use crate::fs_boundary::FilesystemBoundaryConfig;
use crate::output_scanner::OutputScannerConfig;
use crate::progression::ProgressionConfig;
use crate::tier::{parse_autonomy_level, AutonomyLevel};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutonomyConfig {
    pub level: AutonomyLevel,
    pub confidence_threshold: f64,
    pub approval_timeout_ms: i64,
    pub progression: ProgressionConfig,
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            level: AutonomyLevel::Low,
            confidence_threshold: 0.7,
            approval_timeout_ms: 120_000,
            progression: ProgressionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub filesystem: FilesystemBoundaryConfig,
    pub data_flow: DataFlowConfig,
    pub sensitive_patterns: Vec<String>,
    pub output_scanning: OutputScannerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningTraceConfig {
    pub enabled: bool,
    pub base_dir: String,
    pub include_reasoning: bool,
    pub max_result_length: usize,
}

impl Default for ReasoningTraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_dir: "~/.openclaw/traces".to_string(),
            include_reasoning: true,
            max_result_length: 2000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub reasoning_trace: ReasoningTraceConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AascConfig {
    pub autonomy: AutonomyConfig,
    pub security: SecurityConfig,
    pub diagnostics: DiagnosticsConfig,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Applies `AASC_*` overrides on top of an already-built config. Unset or
/// unparseable variables leave the existing value untouched.
fn apply_env_overrides(config: &mut AascConfig) {
    if let Some(v) = env_var("AASC_AUTONOMY_LEVEL") {
        config.autonomy.level = parse_autonomy_level(Some(v.to_lowercase().as_str()));
    }
    if let Some(v) = env_var("AASC_AUTONOMY_CONFIDENCE_THRESHOLD") {
        if let Ok(parsed) = v.parse() {
            config.autonomy.confidence_threshold = parsed;
        }
    }
    if let Some(v) = env_var("AASC_AUTONOMY_APPROVAL_TIMEOUT_MS") {
        if let Ok(parsed) = v.parse() {
            config.autonomy.approval_timeout_ms = parsed;
        }
    }
    if let Some(v) = env_var("AASC_AUTONOMY_PROGRESSION_ENABLED") {
        if let Ok(parsed) = v.parse() {
            config.autonomy.progression.enabled = parsed;
        }
    }
    if let Some(v) = env_var("AASC_DIAGNOSTICS_REASONING_TRACE_BASE_DIR") {
        config.diagnostics.reasoning_trace.base_dir = v;
    }
    if let Some(v) = env_var("AASC_DIAGNOSTICS_REASONING_TRACE_ENABLED") {
        if let Ok(parsed) = v.parse() {
            config.diagnostics.reasoning_trace.enabled = parsed;
        }
    }
}

/// Loads `defaults -> optional TOML file -> AASC_* env vars`, in that
/// precedence order. A missing or malformed file is logged and skipped
/// rather than treated as fatal — the caller always gets a usable config.
pub fn load_config(file_path: Option<&Path>) -> AascConfig {
    let mut config = AascConfig::default();

    if let Some(path) = file_path {
        match std::fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<AascConfig>(&raw) {
                Ok(parsed) => config = parsed,
                Err(e) => tracing::warn!("failed to parse config file {path:?}: {e}"),
            },
            Err(e) => {
                tracing::debug!("no config file at {path:?}, using defaults: {e}");
            }
        }
    }

    apply_env_overrides(&mut config);
    config
}
