//! One structured record per agent decision, accumulated in a
//! [`TraceContext`] and finalised into a [`ReasoningTrace`] handed to the
//! [`crate::trace_writer::TraceWriter`].

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cost_tracker::CostTracker;
use crate::tier::{ActionTier, AutonomyLevel, GateDecision};
use crate::trace_writer::TraceWriter;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtask_of: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceContextInfo {
    pub available_tools: Vec<String>,
    pub active_user_model: String,
    pub character_state: String,
    pub autonomy_level: AutonomyLevel,
    pub relevant_memories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceDecision {
    pub action: String,
    pub reasoning: String,
    pub confidence: f64,
    pub classification: String,
    pub approval_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_outcome: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration: u64,
    pub token_count: u64,
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceReflection {
    pub quality_score: f64,
    pub alternatives_considered: Vec<String>,
    pub lessons_learned: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_satisfaction_signal: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningTrace {
    pub id: Uuid,
    pub timestamp: String,
    pub input: TraceInput,
    pub context: TraceContextInfo,
    pub decision: TraceDecision,
    pub outcome: TraceOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<TraceReflection>,
}

/// A single gate evaluation recorded onto an in-flight trace.
#[derive(Debug, Clone)]
pub struct GateDecisionRecord {
    pub tool: String,
    pub decision: GateDecision,
    pub classification: ActionTier,
    pub confidence: Option<f64>,
    pub approval_outcome: Option<String>,
}

/// A tool's execution outcome recorded onto an in-flight trace.
#[derive(Debug, Clone)]
pub struct ToolOutcomeRecord {
    pub success: bool,
    pub result: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// An LLM call's result recorded onto an in-flight trace.
#[derive(Debug, Clone)]
pub struct LlmResponseRecord {
    pub stop_reason: Option<String>,
    pub reasoning: Option<String>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Clone, Default)]
pub struct FinalizeParams {
    pub success: bool,
    pub result: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReasoningTracerConfig {
    pub include_reasoning: bool,
    pub max_result_length: usize,
}

impl Default for ReasoningTracerConfig {
    fn default() -> Self {
        Self {
            include_reasoning: true,
            max_result_length: 2000,
        }
    }
}

struct Accumulated {
    gate_records: Vec<GateDecisionRecord>,
    tool_outcomes: Vec<ToolOutcomeRecord>,
    llm_records: Vec<LlmResponseRecord>,
    finalized: bool,
    context: TraceContextInfo,
    input: TraceInput,
    cost_tracker: CostTracker,
}

/// A single in-flight decision. Created by
/// [`ReasoningTracer::start_decision`]; further recordings after
/// `finalize` are silently ignored.
pub struct TraceContext {
    pub trace_id: Uuid,
    pub started_at_ms: i64,
    session_id: String,
    agent_id: Option<String>,
    writer: TraceWriter,
    state: Mutex<Accumulated>,
}

impl TraceContext {
    pub fn recorded_gate_count(&self) -> usize {
        self.state.lock().expect("trace context lock poisoned").gate_records.len()
    }

    pub fn record_gate_decision(&self, record: GateDecisionRecord) {
        let mut state = self.state.lock().expect("trace context lock poisoned");
        if state.finalized {
            return;
        }
        state.gate_records.push(record);
    }

    pub fn record_tool_outcome(&self, outcome: ToolOutcomeRecord) {
        let mut state = self.state.lock().expect("trace context lock poisoned");
        if state.finalized {
            return;
        }
        state.tool_outcomes.push(outcome);
    }

    pub fn record_llm_response(&self, record: LlmResponseRecord) {
        let mut state = self.state.lock().expect("trace context lock poisoned");
        if state.finalized {
            return;
        }
        state.cost_tracker.record_usage(record.prompt_tokens, record.completion_tokens);
        state.llm_records.push(record);
    }

    /// Builds the final trace and hands it to the writer. Idempotent: a
    /// second call is a no-op.
    pub fn finalize(&self, params: FinalizeParams, config: &ReasoningTracerConfig, now_iso: String, duration_ms: u64) {
        let mut state = self.state.lock().expect("trace context lock poisoned");
        if state.finalized {
            return;
        }
        state.finalized = true;

        let first_gate = state.gate_records.first();
        let last_llm = state.llm_records.last();

        let action = first_gate
            .map(|g| g.tool.clone())
            .or_else(|| last_llm.and_then(|l| l.stop_reason.clone()))
            .unwrap_or_else(|| "response".to_string());

        let reasoning = if config.include_reasoning {
            last_llm.and_then(|l| l.reasoning.clone()).unwrap_or_default()
        } else {
            String::new()
        };

        let confidence = first_gate.and_then(|g| g.confidence).unwrap_or(1.0);
        let classification = first_gate
            .map(|g| g.classification.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let approval_required = state
            .gate_records
            .iter()
            .any(|g| g.decision == GateDecision::NeedsApproval);
        let approval_outcome = first_gate.and_then(|g| g.approval_outcome.clone());

        let tool_outcome = state.tool_outcomes.last();
        let success = params.success;
        let result = params.result.or_else(|| tool_outcome.and_then(|t| t.result.clone()));
        let truncated_result = result.map(|r| truncate_result(&r, config.max_result_length));
        let error = params.error.or_else(|| tool_outcome.and_then(|t| t.error.clone()));

        let cost = state.cost_tracker.snapshot();

        let trace = ReasoningTrace {
            id: self.trace_id,
            timestamp: now_iso,
            input: state.input.clone(),
            context: state.context.clone(),
            decision: TraceDecision {
                action,
                reasoning,
                confidence,
                classification,
                approval_required,
                approval_outcome,
            },
            outcome: TraceOutcome {
                success,
                result: truncated_result,
                error,
                duration: duration_ms,
                token_count: cost.token_count,
                estimated_cost: cost.estimated_cost,
            },
            reflection: None,
        };

        self.writer.write(&self.session_id, self.agent_id.as_deref(), trace);
    }
}

fn truncate_result(raw: &str, max_len: usize) -> String {
    if raw.chars().count() <= max_len {
        return raw.to_string();
    }
    let mut out: String = raw.chars().take(max_len).collect();
    out.push('\u{2026}');
    out
}

/// Constructs [`TraceContext`]s for a session and owns the shared config
/// that governs finalisation (`includeReasoning`, `maxResultLength`).
pub struct ReasoningTracer {
    writer: TraceWriter,
    config: ReasoningTracerConfig,
}

pub struct StartDecisionParams {
    pub session_id: String,
    pub agent_id: Option<String>,
    pub input: TraceInput,
    pub context: TraceContextInfo,
    pub started_at_ms: i64,
}

impl ReasoningTracer {
    pub fn new(writer: TraceWriter, config: ReasoningTracerConfig) -> Self {
        Self { writer, config }
    }

    pub fn config(&self) -> &ReasoningTracerConfig {
        &self.config
    }

    pub fn start_decision(&self, params: StartDecisionParams) -> TraceContext {
        TraceContext {
            trace_id: Uuid::new_v4(),
            started_at_ms: params.started_at_ms,
            session_id: params.session_id,
            agent_id: params.agent_id,
            writer: self.writer.clone(),
            state: Mutex::new(Accumulated {
                gate_records: Vec::new(),
                tool_outcomes: Vec::new(),
                llm_records: Vec::new(),
                finalized: false,
                context: params.context,
                input: params.input,
                cost_tracker: CostTracker::new(0.0, 0.0),
            }),
        }
    }

    pub async fn flush(&self) {
        self.writer.flush().await;
    }
}
