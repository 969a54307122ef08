//! Filesystem access boundary: rejects tool calls whose target path falls
//! outside configured readable/writable scopes, or inside denied paths.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read vs. write access, as requested by a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// Raw, pre-expansion boundary configuration, as read from `security.filesystem`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesystemBoundaryConfig {
    pub readable: Vec<String>,
    pub writable: Vec<String>,
    pub denied: Vec<String>,
}

impl Default for FilesystemBoundaryConfig {
    fn default() -> Self {
        Self {
            readable: vec!["~".to_string()],
            writable: vec!["~/.openclaw/".to_string()],
            denied: vec![
                "~/.ssh/".to_string(),
                "~/.gnupg/".to_string(),
                "~/.aws/".to_string(),
                "~/.config/gcloud/".to_string(),
                "~/.docker/".to_string(),
                "~/.kube/".to_string(),
                "~/.netrc".to_string(),
                "~/.npmrc".to_string(),
                "~/.pypirc".to_string(),
            ],
        }
    }
}

fn expand_home(raw: &str) -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
    if raw == "~" {
        home
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(raw)
    }
}

/// Absolutises `path` without requiring it to exist: expands `~`, then
/// lexically normalises `.`/`..` components relative to the current
/// directory if the path is relative.
fn absolutize(path: &Path) -> PathBuf {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// True iff `child` is `parent` itself or strictly nested inside it,
/// compared component-by-component so `/home/alice/secrets` is never
/// considered inside `/home/alic`.
pub fn is_path_inside(parent: &Path, child: &Path) -> bool {
    let parent_comps: Vec<_> = parent.components().collect();
    let child_comps: Vec<_> = child.components().collect();
    if child_comps.len() < parent_comps.len() {
        return false;
    }
    parent_comps
        .iter()
        .zip(child_comps.iter())
        .all(|(p, c)| p == c)
}

/// The outcome of a boundary check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: String,
}

/// A constructed, home-expanded and absolutised filesystem boundary.
pub struct FilesystemBoundary {
    readable: Vec<PathBuf>,
    writable: Vec<PathBuf>,
    denied: Vec<PathBuf>,
}

impl FilesystemBoundary {
    pub fn new(config: &FilesystemBoundaryConfig) -> Self {
        let expand_all = |items: &[String]| -> Vec<PathBuf> {
            items.iter().map(|p| absolutize(&expand_home(p))).collect()
        };
        Self {
            readable: expand_all(&config.readable),
            writable: expand_all(&config.writable),
            denied: expand_all(&config.denied),
        }
    }

    /// Checks whether `target` may be accessed in `mode`. Denied paths
    /// dominate: a target inside a denied path is rejected even if it is
    /// also inside a writable path.
    pub fn check_access(&self, target: &Path, mode: AccessMode) -> AccessDecision {
        let resolved = absolutize(&expand_home(&target.to_string_lossy()));

        if self
            .denied
            .iter()
            .any(|d| resolved == *d || is_path_inside(d, &resolved))
        {
            return AccessDecision {
                allowed: false,
                reason: "path is inside a denied boundary".to_string(),
            };
        }

        match mode {
            AccessMode::Write => {
                if self.writable.iter().any(|w| is_path_inside(w, &resolved)) {
                    AccessDecision {
                        allowed: true,
                        reason: "inside writable boundaries".to_string(),
                    }
                } else {
                    AccessDecision {
                        allowed: false,
                        reason: "outside writable boundaries".to_string(),
                    }
                }
            }
            AccessMode::Read => {
                if self.readable.iter().any(|r| is_path_inside(r, &resolved)) {
                    AccessDecision {
                        allowed: true,
                        reason: "inside readable boundaries".to_string(),
                    }
                } else {
                    AccessDecision {
                        allowed: false,
                        reason: "outside readable boundaries".to_string(),
                    }
                }
            }
        }
    }
}

/// Classifies known tools into the filesystem access mode they imply.
/// Unknown tools return `None` (no check performed).
pub fn tool_filesystem_mode(tool_name: &str) -> Option<AccessMode> {
    match tool_name {
        "write" | "edit" | "apply_patch" => Some(AccessMode::Write),
        "read" | "ls" | "find" | "grep" => Some(AccessMode::Read),
        _ => None,
    }
}

const PATH_PARAM_KEYS: &[&str] = &["path", "file_path", "filePath", "directory", "dir"];

/// Looks up the first present path-shaped parameter, in documented priority
/// order.
pub fn extract_tool_path(params: &Value) -> Option<PathBuf> {
    let obj = params.as_object()?;
    for key in PATH_PARAM_KEYS {
        if let Some(v) = obj.get(*key).and_then(|v| v.as_str()) {
            return Some(PathBuf::from(v));
        }
    }
    None
}

/// Runs the full boundary check for a tool call, or returns `None` when no
/// check applies (unknown tool, or no extractable path).
pub fn validate_tool_filesystem_access(
    boundary: &FilesystemBoundary,
    tool_name: &str,
    params: &Value,
) -> Option<AccessDecision> {
    let mode = tool_filesystem_mode(tool_name)?;
    let path = extract_tool_path(params)?;
    Some(boundary.check_access(&path, mode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn component_containment_not_string_prefix() {
        assert!(!is_path_inside(
            Path::new("/home/alic"),
            Path::new("/home/alice/secrets")
        ));
        assert!(is_path_inside(
            Path::new("/home/alice"),
            Path::new("/home/alice/secrets")
        ));
        assert!(is_path_inside(
            Path::new("/home/alice"),
            Path::new("/home/alice")
        ));
    }

    #[test]
    fn denied_dominates_over_writable() {
        let cfg = FilesystemBoundaryConfig {
            readable: vec!["~".to_string()],
            writable: vec!["~".to_string()],
            denied: vec!["~/secret".to_string()],
        };
        let boundary = FilesystemBoundary::new(&cfg);
        let home = dirs::home_dir().unwrap();
        let target = home.join("secret/key");
        assert!(!boundary.check_access(&target, AccessMode::Read).allowed);
        assert!(!boundary.check_access(&target, AccessMode::Write).allowed);
    }

    #[test]
    fn ssh_denied_regardless_of_readable_writable() {
        let cfg = FilesystemBoundaryConfig::default();
        let boundary = FilesystemBoundary::new(&cfg);
        let home = dirs::home_dir().unwrap();
        let target = home.join(".ssh/id_rsa");
        assert!(!boundary.check_access(&target, AccessMode::Read).allowed);
        assert!(!boundary.check_access(&target, AccessMode::Write).allowed);
    }

    #[test]
    fn etc_passwd_outside_home_scoped_readable() {
        let cfg = FilesystemBoundaryConfig {
            readable: vec!["~".to_string()],
            writable: vec![],
            denied: vec![],
        };
        let boundary = FilesystemBoundary::new(&cfg);
        let decision = boundary.check_access(Path::new("/etc/passwd"), AccessMode::Read);
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "outside readable boundaries");
    }

    #[test]
    fn writable_iff_not_covered_by_openclaw_dir() {
        let cfg = FilesystemBoundaryConfig::default();
        let boundary = FilesystemBoundary::new(&cfg);
        let home = dirs::home_dir().unwrap();
        assert!(
            !boundary
                .check_access(&home.join("file"), AccessMode::Write)
                .allowed
        );
        assert!(
            boundary
                .check_access(&home.join(".openclaw/state.json"), AccessMode::Write)
                .allowed
        );
    }

    #[test]
    fn extract_tool_path_checks_documented_keys_in_order() {
        assert_eq!(
            extract_tool_path(&json!({"path": "/a"})),
            Some(PathBuf::from("/a"))
        );
        assert_eq!(
            extract_tool_path(&json!({"file_path": "/b"})),
            Some(PathBuf::from("/b"))
        );
        assert_eq!(
            extract_tool_path(&json!({"directory": "/c"})),
            Some(PathBuf::from("/c"))
        );
        assert_eq!(extract_tool_path(&json!({"other": "/x"})), None);
    }

    #[test]
    fn unknown_tool_skips_check() {
        assert_eq!(tool_filesystem_mode("web_search"), None);
        let cfg = FilesystemBoundaryConfig::default();
        let boundary = FilesystemBoundary::new(&cfg);
        assert!(
            validate_tool_filesystem_access(&boundary, "web_search", &json!({"path": "/etc"}))
                .is_none()
        );
    }
}
