//! `aasc gate <id> <decision-tokens...>` — parses the chat-surface command
//! grammar.
//!
//! A standalone invocation of this binary has no view of another process's
//! live Approval Manager, so it can only parse and echo the resolved
//! command; `aasc demo` is where the same grammar actually settles a
//! pending approval, inside the single process that registered it.

use clap::Parser;

use aasc_core::gate_command::parse_gate_command;

use crate::util::print_json;

#[derive(Debug, Parser)]
pub struct GateArgs {
    #[arg(num_args = 2.., required = true)]
    pub tokens: Vec<String>,
}

impl GateArgs {
    pub fn run(&self) -> anyhow::Result<()> {
        let tokens: Vec<&str> = self.tokens.iter().map(String::as_str).collect();
        match parse_gate_command(&tokens) {
            Ok(cmd) => {
                print_json(&serde_json::json!({
                    "id": cmd.id,
                    "decision": cmd.decision,
                    "note": "parsed only; resolve a live approval from within the process that registered it (see `aasc demo`)",
                }));
                Ok(())
            }
            Err(e) => anyhow::bail!(e),
        }
    }
}
