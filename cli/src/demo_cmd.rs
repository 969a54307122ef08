//! `aasc demo` — drives the pipeline orchestrator end-to-end over a small
//! in-memory tool registry, prompting on stdin whenever a call needs a
//! human decision. Demonstration scaffolding only: every decision made
//! here flows through the same public pipeline API a real integration
//! would call, with no policy logic of its own.

use std::io::Write as _;

use clap::Parser;
use futures::future::BoxFuture;
use serde_json::json;

use aasc_core::approval_manager::{ApprovalDecision, ApprovalManager};
use aasc_core::auto_approve::AutoApproveStore;
use aasc_core::classifier::ActionClassifier;
use aasc_core::fs_boundary::{FilesystemBoundary, FilesystemBoundaryConfig};
use aasc_core::gate_command::decision_alias;
use aasc_core::pipeline::{
    run_tool_call, AbortSignal, Pipeline, PipelineHooks, SystemClock, ToolCallParams,
    ToolCallResult, ToolExecution, ToolExecutor,
};
use aasc_core::progression::ProgressionTracker;
use aasc_core::tier::AutonomyLevel;
use aasc_core::trace::{
    ReasoningTracer, ReasoningTracerConfig, StartDecisionParams, TraceContextInfo, TraceInput,
};
use aasc_core::trace_writer::TraceWriter;
use aasc_core::AascError;

use crate::util::{now_ms, progression_path, rules_path, traces_dir};

#[derive(Debug, Parser)]
pub struct DemoArgs {
    /// Starting autonomy level for the demo pipeline.
    #[arg(long, default_value = "low")]
    pub level: String,
}

struct DemoExecutor;

impl ToolExecutor for DemoExecutor {
    fn execute<'a>(
        &'a self,
        tool_name: &'a str,
        params: serde_json::Value,
        _tool_call_id: &'a str,
        _signal: &'a AbortSignal,
    ) -> BoxFuture<'a, Result<ToolExecution, AascError>> {
        Box::pin(async move {
            let output = match tool_name {
                "read" => Some(format!("contents of {}", params.get("path").and_then(|v| v.as_str()).unwrap_or("?"))),
                "write" => Some("wrote file".to_string()),
                "exec" => Some("command exited 0".to_string()),
                other => return Err(AascError::ToolExecution(format!("unknown demo tool {other}"))),
            };
            Ok(ToolExecution { output })
        })
    }
}

fn prompt_decision(tool_name: &str, reason: &str) -> Option<ApprovalDecision> {
    println!("approval requested for `{tool_name}`: {reason}");
    print!("allow-once / allow-always / deny > ");
    std::io::stdout().flush().ok();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return None;
    }
    decision_alias(line.trim())
}

impl DemoArgs {
    pub async fn run(&self) -> anyhow::Result<()> {
        let level = match self.level.to_lowercase().as_str() {
            "medium" => AutonomyLevel::Medium,
            "high" => AutonomyLevel::High,
            _ => AutonomyLevel::Low,
        };

        let manager = ApprovalManager::new();
        let pipeline = Pipeline {
            classifier: ActionClassifier::new(),
            auto_approve: AutoApproveStore::new(rules_path()),
            approval_manager: Some(manager.clone()),
            boundary: FilesystemBoundary::new(&FilesystemBoundaryConfig::default()),
            progression: ProgressionTracker::new(progression_path()),
            sensitive_patterns: Vec::new(),
            autonomy_level: level,
            confidence_threshold: 0.7,
            approval_timeout_ms: 30_000,
            agent_id: "demo".to_string(),
            tracer_config: ReasoningTracerConfig::default(),
        };

        let tracer = ReasoningTracer::new(
            TraceWriter::new(traces_dir()),
            ReasoningTracerConfig::default(),
        );

        let executor = DemoExecutor;
        let clock = SystemClock;

        let calls = [
            ("read", json!({"path": "~/notes.txt"})),
            ("write", json!({"path": "~/.openclaw/scratch.txt", "content": "hi"})),
            ("exec", json!({"command": "echo hi"})),
        ];

        for (tool_name, params) in calls {
            let trace_ctx = tracer.start_decision(StartDecisionParams {
                session_id: "demo-session".to_string(),
                agent_id: Some("demo".to_string()),
                input: TraceInput {
                    system_event: Some(format!("demo call: {tool_name}")),
                    ..TraceInput::default()
                },
                context: TraceContextInfo {
                    available_tools: vec!["read".into(), "write".into(), "exec".into()],
                    active_user_model: "demo-model".to_string(),
                    character_state: "idle".to_string(),
                    autonomy_level: level,
                    relevant_memories: Vec::new(),
                },
                started_at_ms: now_ms(),
            });

            let signal = AbortSignal::new();
            let call = ToolCallParams {
                tool_name: tool_name.to_string(),
                params,
                tool_call_id: uuid::Uuid::new_v4().to_string(),
                confidence: Some(0.8),
            };

            let manager_for_prompt = manager.clone();
            let tool_name_owned = tool_name.to_string();
            let resolver = async move {
                loop {
                    let pending = manager_for_prompt.list_pending().await;
                    if let Some(record) = pending.iter().find(|r| r.request.tool_name == tool_name_owned) {
                        let id = record.id;
                        let reason = record.request.gate_reason.clone();
                        let decision = tokio::task::spawn_blocking(move || {
                            prompt_decision(&tool_name_owned, &reason)
                        })
                        .await
                        .ok()
                        .flatten();
                        if let Some(decision) = decision {
                            manager_for_prompt.resolve(id, decision, Some("demo-operator"), now_ms()).await;
                        }
                        return;
                    }
                    tokio::task::yield_now().await;
                }
            };

            // The resolver only ever finds work when this call lands in
            // needs_approval; for an auto-approved call it would spin
            // forever, so it runs in the background and is dropped the
            // moment the call itself finishes.
            let resolver_handle = tokio::spawn(resolver);

            let result = run_tool_call(
                &pipeline,
                &trace_ctx,
                &PipelineHooks::default(),
                &executor,
                call,
                &signal,
                &clock,
            )
            .await;
            resolver_handle.abort();

            match result {
                Ok(ToolCallResult::Ok { output }) => {
                    println!("{tool_name} -> ok: {}", output.unwrap_or_default());
                }
                Ok(ToolCallResult::Error { tool, error }) => {
                    println!("{tool} -> error: {error}");
                }
                Err(e) => {
                    println!("{tool_name} -> blocked: {e}");
                }
            }
        }

        tracer.flush().await;
        Ok(())
    }
}
