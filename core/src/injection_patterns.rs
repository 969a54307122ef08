//! External-content pattern detector: prompt-injection markers looked for
//! in tool output before it re-enters the agent's context.

use regex_lite::Regex;
use std::sync::LazyLock;

pub const TOOL_OUTPUT_BOUNDARY_START: &str = "<<<TOOL_OUTPUT>>>";
pub const TOOL_OUTPUT_BOUNDARY_END: &str = "<<<END_TOOL_OUTPUT>>>";
const EXTERNAL_UNTRUSTED_BOUNDARY: &str = "<<<EXTERNAL_UNTRUSTED_CONTENT>>>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionKind {
    IgnoreInstructions,
    ForgetInstructions,
    SystemTag,
    RoleOverride,
    BoundaryMarker,
}

struct InjectionPattern {
    kind: InjectionKind,
    label: &'static str,
    regex: LazyLock<Regex>,
}

macro_rules! ipattern {
    ($kind:expr, $label:expr, $re:expr) => {
        InjectionPattern {
            kind: $kind,
            label: $label,
            regex: LazyLock::new(|| Regex::new($re).expect("built-in injection pattern is valid")),
        }
    };
}

static INJECTION_PATTERNS: LazyLock<Vec<InjectionPattern>> = LazyLock::new(|| {
    vec![
        ipattern!(
            InjectionKind::IgnoreInstructions,
            "ignore_previous_instructions",
            r"(?i)ignore (all )?previous instructions"
        ),
        ipattern!(
            InjectionKind::ForgetInstructions,
            "forget_your_instructions",
            r"(?i)forget your instructions"
        ),
        ipattern!(
            InjectionKind::SystemTag,
            "system_tag_open",
            r"(?i)<\s*system\s*>"
        ),
        ipattern!(
            InjectionKind::RoleOverride,
            "role_override_sequence",
            r"\]\s*\n\s*\[system\]\s*:"
        ),
    ]
});

/// A located match against one of the built-in injection patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionHit {
    pub kind: InjectionKind,
    pub label: &'static str,
    pub offset: usize,
    pub length: usize,
}

/// Detects the boundary markers the system itself uses, so untrusted
/// content cannot forge them to escape the sanitiser's own wrapping.
fn boundary_hits(text: &str) -> Vec<InjectionHit> {
    let mut hits = Vec::new();
    for marker in [
        TOOL_OUTPUT_BOUNDARY_START,
        TOOL_OUTPUT_BOUNDARY_END,
        EXTERNAL_UNTRUSTED_BOUNDARY,
    ] {
        let mut start = 0;
        while let Some(pos) = text[start..].find(marker) {
            let offset = start + pos;
            hits.push(InjectionHit {
                kind: InjectionKind::BoundaryMarker,
                label: marker,
                offset,
                length: marker.len(),
            });
            start = offset + marker.len();
        }
    }
    hits
}

/// Scans `text` for every known injection marker, including the literal
/// boundary markers the sanitiser itself emits.
pub fn detect_injection_patterns(text: &str) -> Vec<InjectionHit> {
    let mut hits = Vec::new();
    for p in INJECTION_PATTERNS.iter() {
        for m in p.regex.find_iter(text) {
            hits.push(InjectionHit {
                kind: p.kind,
                label: p.label,
                offset: m.start(),
                length: m.end() - m.start(),
            });
        }
    }
    hits.extend(boundary_hits(text));
    hits.sort_by_key(|h| h.offset);
    hits
}

pub fn has_injection_pattern(text: &str) -> bool {
    !detect_injection_patterns(text).is_empty()
}
