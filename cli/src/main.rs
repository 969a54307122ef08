//! `aasc` — administers the Agent Action Safety Core's on-disk state and
//! exercises its pipeline without a real chat front end.

mod demo_cmd;
mod gate_cmd;
mod rules_cmd;
mod trace_cmd;
mod util;

use clap::{Parser, Subcommand};

use demo_cmd::DemoArgs;
use gate_cmd::GateArgs;
use rules_cmd::RulesCli;
use trace_cmd::TraceCli;

#[derive(Debug, Parser)]
#[command(name = "aasc", about = "Agent Action Safety Core administration and demo CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Auto-approve rule store operations.
    Rules(RulesCli),
    /// Reasoning trace query operations.
    Trace(TraceCli),
    /// Parses a `gate <id> <decision>` command.
    Gate(GateArgs),
    /// Runs the pipeline over a small in-memory tool registry.
    Demo(DemoArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Rules(rules) => rules.run(),
        Command::Trace(trace) => trace.run(),
        Command::Gate(gate) => gate.run(),
        Command::Demo(demo) => demo.run().await,
    }
}
