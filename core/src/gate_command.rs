//! Parses the chat-surface `gate <id> allow-once|allow-always|deny` command
//! grammar, including its documented aliases.

use crate::approval_manager::ApprovalDecision;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateCommand {
    pub id: String,
    pub decision: ApprovalDecision,
}

/// Resolves a single token against the documented alias table. Public so
/// callers outside the `<id> <decision>` grammar (e.g. a single-prompt
/// stdin loop) can reuse the same alias set.
pub fn decision_alias(token: &str) -> Option<ApprovalDecision> {
    match token.to_lowercase().as_str() {
        "allow" | "once" | "allowonce" | "allow-once" => Some(ApprovalDecision::AllowOnce),
        "always" | "allowalways" | "remember" | "allow-always" => {
            Some(ApprovalDecision::AllowAlways)
        }
        "reject" | "block" | "deny" => Some(ApprovalDecision::Deny),
        _ => None,
    }
}

/// Parses `<id> <decision-tokens...>`. Exactly one token must resolve to a
/// decision alias; its position relative to the id is not fixed.
pub fn parse_gate_command(args: &[&str]) -> Result<GateCommand, String> {
    if args.len() < 2 {
        return Err("usage: gate <id> allow-once|allow-always|deny".to_string());
    }

    let mut decision = None;
    let mut id = None;
    for token in args {
        if let Some(d) = decision_alias(token) {
            if decision.is_some() {
                return Err("ambiguous: more than one decision token given".to_string());
            }
            decision = Some(d);
        } else if id.is_none() {
            id = Some((*token).to_string());
        } else {
            return Err(format!("unrecognized token: {token}"));
        }
    }

    match (id, decision) {
        (Some(id), Some(decision)) => Ok(GateCommand { id, decision }),
        (None, _) => Err("missing approval id".to_string()),
        (_, None) => Err("missing or unrecognized decision token".to_string()),
    }
}
