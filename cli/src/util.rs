//! Small shared helpers for the command modules.

use std::path::PathBuf;

/// Expands a leading `~/` against `$HOME`. Mirrors the expansion each
/// storage module in `aasc-core` already applies to its own config path;
/// the CLI needs its own copy for paths it builds itself, like the traces
/// directory, which `TraceWriter` takes literally.
pub fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        return dirs_home();
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        return dirs_home().join(rest);
    }
    PathBuf::from(raw)
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/"))
}

pub fn rules_path() -> PathBuf {
    expand_home("~/.openclaw/autonomy-rules.json")
}

pub fn progression_path() -> PathBuf {
    expand_home("~/.openclaw/autonomy-progression.json")
}

pub fn traces_dir() -> PathBuf {
    expand_home("~/.openclaw/traces")
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    );
}
