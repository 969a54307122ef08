//! `aasc trace query|get|subtasks` — a thin wrapper over the Trace Query
//! API.

use aasc_core::trace_query::{get_subtasks, get_trace, query_traces, QueryParams, SortField, SortOrder};
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::util::{print_json, traces_dir};

#[derive(Debug, Parser)]
pub struct TraceCli {
    #[command(subcommand)]
    pub command: TraceSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum TraceSubcommand {
    /// Searches and filters traces across every agent/session.
    Query(QueryArgs),
    /// Scans for a single trace by id.
    Get(GetArgs),
    /// Lists child traces of a parent decision, ascending by timestamp.
    Subtasks(SubtasksArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortFieldArg {
    Timestamp,
    Cost,
    Duration,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortOrderArg {
    Asc,
    Desc,
}

#[derive(Debug, Parser)]
pub struct QueryArgs {
    #[arg(long)]
    pub keyword: Option<String>,
    #[arg(long)]
    pub classification: Option<String>,
    #[arg(long)]
    pub subtask_of: Option<Uuid>,
    #[arg(long)]
    pub since: Option<String>,
    #[arg(long)]
    pub until: Option<String>,
    #[arg(long, value_enum)]
    pub sort: Option<SortFieldArg>,
    #[arg(long, value_enum)]
    pub order: Option<SortOrderArg>,
    #[arg(long)]
    pub offset: Option<usize>,
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Parser)]
pub struct GetArgs {
    pub id: Uuid,
}

#[derive(Debug, Parser)]
pub struct SubtasksArgs {
    pub parent_id: Uuid,
}

impl TraceCli {
    pub fn run(&self) -> anyhow::Result<()> {
        let base = traces_dir();
        match &self.command {
            TraceSubcommand::Query(args) => {
                let params = QueryParams {
                    keyword: args.keyword.clone(),
                    classification: args.classification.clone(),
                    subtask_of: args.subtask_of,
                    since: args.since.clone(),
                    until: args.until.clone(),
                    sort_field: args.sort.map(|s| match s {
                        SortFieldArg::Timestamp => SortField::Timestamp,
                        SortFieldArg::Cost => SortField::Cost,
                        SortFieldArg::Duration => SortField::Duration,
                    }),
                    sort_order: args.order.map(|o| match o {
                        SortOrderArg::Asc => SortOrder::Asc,
                        SortOrderArg::Desc => SortOrder::Desc,
                    }),
                    offset: args.offset,
                    limit: args.limit,
                };
                let results = query_traces(&base, params);
                print_json(&serde_json::to_value(&results)?);
            }
            TraceSubcommand::Get(args) => match get_trace(&base, args.id) {
                Some(trace) => print_json(&serde_json::to_value(&trace)?),
                None => anyhow::bail!("no trace with id {}", args.id),
            },
            TraceSubcommand::Subtasks(args) => {
                let results = get_subtasks(&base, args.parent_id);
                print_json(&serde_json::to_value(&results)?);
            }
        }
        Ok(())
    }
}
