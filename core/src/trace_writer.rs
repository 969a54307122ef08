//! Writes one append-only newline-delimited JSON file per `(agentId,
//! sessionId)`.
//!
//! Writes are serialised through a single in-order async queue (the
//! teacher's `async-channel` crate, used elsewhere for cooperative
//! suspension points) so two `write()` calls for the same file produce two
//! appended lines in call order. All I/O errors are swallowed — trace
//! failure must never block agent execution.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};

use crate::trace::ReasoningTrace;

enum QueueItem {
    Append { file_path: PathBuf, line: String },
    /// A drain marker: completing its sender proves every item enqueued
    /// before it has already been written, since the consumer is single
    /// and processes the channel strictly in order.
    Flush(oneshot::Sender<()>),
}

struct Inner {
    base_dir: PathBuf,
    tx: async_channel::Sender<QueueItem>,
    created_dirs: Mutex<HashSet<PathBuf>>,
}

/// Cheaply clonable handle; the background drain task and every live
/// `TraceContext` share the same queue.
#[derive(Clone)]
pub struct TraceWriter {
    inner: Arc<Inner>,
}

impl TraceWriter {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        let (tx, rx) = async_channel::unbounded::<QueueItem>();
        let inner = Arc::new(Inner {
            base_dir: base_dir.as_ref().to_path_buf(),
            tx,
            created_dirs: Mutex::new(HashSet::new()),
        });

        let drain_inner = inner.clone();
        tokio::spawn(async move {
            while let Ok(item) = rx.recv().await {
                match item {
                    QueueItem::Flush(done) => {
                        let _ = done.send(());
                    }
                    QueueItem::Append { file_path, line } => {
                        if let Some(parent) = file_path.parent() {
                            let mut created = drain_inner.created_dirs.lock().await;
                            if !created.contains(parent) {
                                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                                    tracing::debug!(
                                        "failed to create trace directory {parent:?}: {e}"
                                    );
                                } else {
                                    created.insert(parent.to_path_buf());
                                }
                            }
                        }
                        if let Err(e) = append_line(&file_path, &line).await {
                            tracing::debug!("failed to append trace line to {file_path:?}: {e}");
                        }
                    }
                }
            }
        });

        Self { inner }
    }

    fn file_path(&self, agent_id: Option<&str>, session_id: &str) -> PathBuf {
        let agent_dir = agent_id.unwrap_or("default");
        self.inner
            .base_dir
            .join(agent_dir)
            .join(format!("{session_id}.jsonl"))
    }

    /// Fire-and-forget: serialises the trace and enqueues it. Never blocks
    /// on I/O; failures to serialise are logged and dropped.
    pub fn write(&self, session_id: &str, agent_id: Option<&str>, trace: ReasoningTrace) {
        let line = match serde_json::to_string(&trace) {
            Ok(l) => l,
            Err(e) => {
                tracing::debug!("failed to serialize reasoning trace: {e}");
                return;
            }
        };
        let file_path = self.file_path(agent_id, session_id);
        if self
            .inner
            .tx
            .send_blocking(QueueItem::Append { file_path, line })
            .is_err()
        {
            tracing::debug!("trace writer queue is closed, dropping trace");
        }
    }

    /// Awaits the tail of the queue: enqueues a drain marker and waits for
    /// the single consumer to reach it, which — because the channel is
    /// processed strictly in order — proves every prior `write()` has been
    /// appended to disk.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.inner.tx.send(QueueItem::Flush(tx)).await.is_err() {
            return;
        }
        let _ = rx.await;
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_trace(action: &str) -> ReasoningTrace {
        use crate::tier::AutonomyLevel;
        use crate::trace::{TraceContextInfo, TraceDecision, TraceInput, TraceOutcome};
        ReasoningTrace {
            id: uuid::Uuid::new_v4(),
            timestamp: "2026-08-01T00:00:00Z".to_string(),
            input: TraceInput::default(),
            context: TraceContextInfo {
                available_tools: vec![],
                active_user_model: "m".to_string(),
                character_state: "idle".to_string(),
                autonomy_level: AutonomyLevel::Low,
                relevant_memories: vec![],
            },
            decision: TraceDecision {
                action: action.to_string(),
                reasoning: String::new(),
                confidence: 1.0,
                classification: "unknown".to_string(),
                approval_required: false,
                approval_outcome: None,
            },
            outcome: TraceOutcome {
                success: true,
                result: None,
                error: None,
                duration: 0,
                token_count: 0,
                estimated_cost: 0.0,
            },
            reflection: None,
        }
    }

    #[tokio::test]
    async fn n_writes_produce_n_lines_in_call_order() {
        let dir = tempdir().unwrap();
        let writer = TraceWriter::new(dir.path());
        for i in 0..10 {
            writer.write("session-a", Some("agent-a"), sample_trace(&format!("step-{i}")));
        }
        writer.flush().await;

        let path = dir.path().join("agent-a").join("session-a.jsonl");
        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 10);
        for (i, line) in lines.iter().enumerate() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["decision"]["action"], format!("step-{i}"));
        }
    }

    #[tokio::test]
    async fn missing_agent_id_uses_default_directory() {
        let dir = tempdir().unwrap();
        let writer = TraceWriter::new(dir.path());
        writer.write("session-b", None, sample_trace("x"));
        writer.flush().await;
        assert!(dir.path().join("default").join("session-b.jsonl").exists());
    }
}
