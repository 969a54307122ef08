//! Streams the on-disk JSONL trace files for querying, filtering and
//! sorting, plus the parent/child lookup used by `getSubtasks`.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::trace::ReasoningTrace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Timestamp,
    Cost,
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pub keyword: Option<String>,
    pub classification: Option<String>,
    pub subtask_of: Option<Uuid>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub sort_field: Option<SortField>,
    pub sort_order: Option<SortOrder>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

const DEFAULT_LIMIT: usize = 50;

fn iter_jsonl_files(base_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(agents) = std::fs::read_dir(base_dir) else {
        return files;
    };
    for agent_entry in agents.flatten() {
        let Ok(session_files) = std::fs::read_dir(agent_entry.path()) else {
            continue;
        };
        for session_entry in session_files.flatten() {
            let path = session_entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

fn read_traces(path: &Path) -> Vec<ReasoningTrace> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<ReasoningTrace>(line).ok())
        .collect()
}

fn matches_keyword(trace: &ReasoningTrace, keyword: &str) -> bool {
    let needle = keyword.to_lowercase();
    trace
        .input
        .user_message
        .as_ref()
        .is_some_and(|m| m.to_lowercase().contains(&needle))
        || trace.decision.action.to_lowercase().contains(&needle)
        || trace.decision.reasoning.to_lowercase().contains(&needle)
}

fn in_time_range(trace: &ReasoningTrace, since: Option<&str>, until: Option<&str>) -> bool {
    if let Some(since) = since {
        if trace.timestamp.as_str() < since {
            return false;
        }
    }
    if let Some(until) = until {
        if trace.timestamp.as_str() > until {
            return false;
        }
    }
    true
}

fn matches(trace: &ReasoningTrace, params: &QueryParams) -> bool {
    if let Some(kw) = &params.keyword {
        if !matches_keyword(trace, kw) {
            return false;
        }
    }
    if let Some(classification) = &params.classification {
        if &trace.decision.classification != classification {
            return false;
        }
    }
    if let Some(parent) = params.subtask_of {
        if trace.input.subtask_of != Some(parent) {
            return false;
        }
    }
    if !in_time_range(trace, params.since.as_deref(), params.until.as_deref()) {
        return false;
    }
    true
}

fn sort_key(trace: &ReasoningTrace, field: SortField) -> f64 {
    match field {
        SortField::Timestamp => 0.0, // timestamps sort lexically, handled separately
        SortField::Cost => trace.outcome.estimated_cost,
        SortField::Duration => trace.outcome.duration as f64,
    }
}

/// Streams every JSONL trace file under `base_dir`, skipping malformed
/// lines, applying the documented filters, sort, offset and limit.
pub fn query_traces(base_dir: &Path, params: QueryParams) -> Vec<ReasoningTrace> {
    let mut all: Vec<ReasoningTrace> = iter_jsonl_files(base_dir)
        .iter()
        .flat_map(|p| read_traces(p))
        .filter(|t| matches(t, &params))
        .collect();

    let field = params.sort_field.unwrap_or(SortField::Timestamp);
    let order = params.sort_order.unwrap_or(SortOrder::Desc);

    all.sort_by(|a, b| {
        let ordering = match field {
            SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
            _ => sort_key(a, field)
                .partial_cmp(&sort_key(b, field))
                .unwrap_or(std::cmp::Ordering::Equal),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    all.into_iter().skip(offset).take(limit).collect()
}

/// Scans every file until a trace with the given id is found.
pub fn get_trace(base_dir: &Path, id: Uuid) -> Option<ReasoningTrace> {
    for path in iter_jsonl_files(base_dir) {
        if let Some(t) = read_traces(&path).into_iter().find(|t| t.id == id) {
            return Some(t);
        }
    }
    None
}

/// `subtaskOf=parentId`, ascending by timestamp, limit 1000.
pub fn get_subtasks(base_dir: &Path, parent_id: Uuid) -> Vec<ReasoningTrace> {
    query_traces(
        base_dir,
        QueryParams {
            subtask_of: Some(parent_id),
            sort_field: Some(SortField::Timestamp),
            sort_order: Some(SortOrder::Asc),
            limit: Some(1000),
            ..Default::default()
        },
    )
}
