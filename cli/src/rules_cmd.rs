//! `aasc rules list|add|remove` — a thin wrapper over the Auto-Approve Rule
//! Store.

use aasc_core::auto_approve::{AutoApproveStore, DEFAULT_AGENT_ID};
use aasc_core::tier::ActionTier;
use clap::{Parser, Subcommand, ValueEnum};

use crate::util::{now_ms, print_json, rules_path};

#[derive(Debug, Parser)]
pub struct RulesCli {
    #[command(subcommand)]
    pub command: RulesSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum RulesSubcommand {
    /// Lists the auto-approve rules for an agent.
    List(ListArgs),
    /// Adds a rule, deduped on (tool pattern, tier).
    Add(AddArgs),
    /// Removes a rule by id.
    Remove(RemoveArgs),
}

#[derive(Debug, Parser)]
pub struct ListArgs {
    #[arg(long)]
    pub agent: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TierArg {
    CachedPattern,
    EphemeralCompute,
    PersistentService,
    SandboxedWorkspace,
    Irreversible,
}

impl From<TierArg> for ActionTier {
    fn from(value: TierArg) -> Self {
        match value {
            TierArg::CachedPattern => ActionTier::CachedPattern,
            TierArg::EphemeralCompute => ActionTier::EphemeralCompute,
            TierArg::PersistentService => ActionTier::PersistentService,
            TierArg::SandboxedWorkspace => ActionTier::SandboxedWorkspace,
            TierArg::Irreversible => ActionTier::Irreversible,
        }
    }
}

#[derive(Debug, Parser)]
pub struct AddArgs {
    /// Tool name or glob pattern (e.g. "web_*" or "*").
    pub tool_pattern: String,
    #[arg(value_enum)]
    pub tier: TierArg,
    #[arg(long)]
    pub agent: Option<String>,
}

#[derive(Debug, Parser)]
pub struct RemoveArgs {
    pub rule_id: uuid::Uuid,
    #[arg(long)]
    pub agent: Option<String>,
}

impl RulesCli {
    pub fn run(&self) -> anyhow::Result<()> {
        let store = AutoApproveStore::new(rules_path());
        match &self.command {
            RulesSubcommand::List(args) => {
                let agent = args.agent.as_deref().unwrap_or(DEFAULT_AGENT_ID);
                let rules = store.list(Some(agent));
                print_json(&serde_json::to_value(&rules)?);
            }
            RulesSubcommand::Add(args) => {
                let agent = args.agent.as_deref();
                let rule = store.add(&args.tool_pattern, args.tier.into(), agent, now_ms());
                print_json(&serde_json::to_value(&rule)?);
            }
            RulesSubcommand::Remove(args) => {
                let agent = args.agent.as_deref();
                let removed = store.remove(args.rule_id, agent);
                if !removed {
                    anyhow::bail!("no rule with id {} for this agent", args.rule_id);
                }
                println!("removed {}", args.rule_id);
            }
        }
        Ok(())
    }
}
