//! Single-process coordinator for tool calls suspended pending a human
//! approval decision.
//!
//! Mirrors the cooperative single-threaded model described for the pipeline:
//! all mutation of the pending-record map happens behind a single `Mutex`,
//! and ordering between concurrent calls is otherwise unconstrained.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::tier::{ActionTier, AutonomyLevel};

/// The human decision resolving a pending approval, or the timeout
/// sentinel (`None` from `await_decision`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    AllowOnce,
    AllowAlways,
    Deny,
}

/// The request payload backing a pending approval, threaded with a
/// `traceId` so a human decision can be joined back to its reasoning trace
/// offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomyApprovalRequest {
    pub tool_name: String,
    pub params_summary: String,
    pub tier: ActionTier,
    pub level: AutonomyLevel,
    pub gate_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

const PARAMS_SUMMARY_LIMIT: usize = 500;

/// Truncates a params summary to the documented 500-char boundary, ensuring
/// an over-limit string ends with a single ellipsis code point rather than
/// a raw cut, and that no newline survives into the result.
pub fn truncate_params_summary(raw: &str) -> String {
    let flattened = raw.replace('\n', " ");
    if flattened.chars().count() <= PARAMS_SUMMARY_LIMIT {
        return flattened;
    }
    let mut out: String = flattened.chars().take(PARAMS_SUMMARY_LIMIT - 1).collect();
    out.push('\u{2026}');
    out
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomyApprovalRecord {
    pub id: Uuid,
    pub request: AutonomyApprovalRequest,
    pub created_at_ms: i64,
    pub expires_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<ApprovalDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
}

impl AutonomyApprovalRecord {
    pub fn is_resolved(&self) -> bool {
        self.decision.is_some()
    }
}

const GRACE_PERIOD: Duration = Duration::from_secs(15);

/// `None` while pending; `Some(None)` on timeout; `Some(Some(_))` once a
/// human decision lands. A `watch` channel (rather than a `oneshot`) lets
/// `register` hand back a cheap, clonable receiver so idempotent
/// re-registration of a still-pending id observes the same eventual
/// outcome instead of racing a second sender.
type Settled = Option<Option<ApprovalDecision>>;

struct PendingEntry {
    record: AutonomyApprovalRecord,
    tx: watch::Sender<Settled>,
    timer: Option<tokio::task::JoinHandle<()>>,
    grace_evictor: Option<tokio::task::JoinHandle<()>>,
}

#[derive(Default)]
struct Inner {
    pending: HashMap<Uuid, PendingEntry>,
}

/// A future-like handle over a pending approval's eventual outcome.
#[derive(Debug, Clone)]
pub struct ApprovalWait {
    rx: watch::Receiver<Settled>,
}

impl ApprovalWait {
    /// Waits for the approval to settle, returning the decision, or `None`
    /// on timeout.
    pub async fn await_decision(mut self) -> Option<ApprovalDecision> {
        loop {
            if let Some(settled) = *self.rx.borrow() {
                return settled;
            }
            if self.rx.changed().await.is_err() {
                return None;
            }
        }
    }
}

/// The asynchronous coordinator. Cheaply clonable; internal state is
/// `Arc`-shared so a handle can be passed into the pipeline and into any
/// background eviction tasks it spawns.
#[derive(Clone)]
pub struct ApprovalManager {
    inner: Arc<Mutex<Inner>>,
}

impl Default for ApprovalManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ApprovalManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Builds a record with a fresh (or trimmed supplied) id. Does not arm
    /// a timer — call `register` for that.
    pub fn create(
        &self,
        request: AutonomyApprovalRequest,
        timeout_ms: i64,
        id: Option<&str>,
        now_ms: i64,
    ) -> AutonomyApprovalRecord {
        let id = id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);
        AutonomyApprovalRecord {
            id,
            request,
            created_at_ms: now_ms,
            expires_at_ms: now_ms + timeout_ms,
            resolved_at_ms: None,
            decision: None,
            resolved_by: None,
        }
    }

    /// Registers a record and arms its timeout timer, returning a waitable
    /// handle over the eventual decision.
    ///
    /// Idempotent: re-registering a still-pending id returns a handle over
    /// the *same* pending outcome; registering an already-resolved id fails
    /// with `"already resolved"`.
    pub async fn register(
        &self,
        record: AutonomyApprovalRecord,
        timeout_ms: i64,
    ) -> Result<ApprovalWait, String> {
        let mut guard = self.inner.lock().await;

        if let Some(existing) = guard.pending.get(&record.id) {
            if existing.record.is_resolved() {
                return Err("already resolved".to_string());
            }
            return Ok(ApprovalWait {
                rx: existing.tx.subscribe(),
            });
        }

        let (tx, rx) = watch::channel::<Settled>(None);
        let manager = self.clone();
        let id = record.id;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(timeout_ms.max(0) as u64)).await;
            manager.fire_timeout(id).await;
        });

        guard.pending.insert(
            record.id,
            PendingEntry {
                record,
                tx,
                timer: Some(timer),
                grace_evictor: None,
            },
        );

        Ok(ApprovalWait { rx })
    }

    async fn fire_timeout(&self, id: Uuid) {
        let mut guard = self.inner.lock().await;
        let Some(entry) = guard.pending.get_mut(&id) else {
            return;
        };
        if entry.record.is_resolved() {
            return;
        }
        let _ = entry.tx.send(Some(None));
        self.schedule_eviction_locked(&mut guard, id);
    }

    fn schedule_eviction_locked(&self, guard: &mut Inner, id: Uuid) {
        if let Some(entry) = guard.pending.get_mut(&id) {
            if let Some(t) = entry.timer.take() {
                t.abort();
            }
        }
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(GRACE_PERIOD).await;
            let mut guard = manager.inner.lock().await;
            guard.pending.remove(&id);
        });
        if let Some(entry) = guard.pending.get_mut(&id) {
            entry.grace_evictor = Some(handle);
        }
    }

    /// Resolves a pending approval. Returns `false` if the id is unknown or
    /// already resolved.
    pub async fn resolve(
        &self,
        id: Uuid,
        decision: ApprovalDecision,
        resolved_by: Option<&str>,
        now_ms: i64,
    ) -> bool {
        let mut guard = self.inner.lock().await;
        let Some(entry) = guard.pending.get_mut(&id) else {
            return false;
        };
        if entry.record.is_resolved() {
            return false;
        }
        entry.record.resolved_at_ms = Some(now_ms);
        entry.record.decision = Some(decision);
        entry.record.resolved_by = resolved_by.map(str::to_string);
        let _ = entry.tx.send(Some(Some(decision)));
        self.schedule_eviction_locked(&mut guard, id);
        true
    }

    pub async fn get_snapshot(&self, id: Uuid) -> Option<AutonomyApprovalRecord> {
        self.inner
            .lock()
            .await
            .pending
            .get(&id)
            .map(|e| e.record.clone())
    }

    /// A fresh waitable handle over a record's decision, for late
    /// `awaitDecision` callers (e.g. reconnecting after a process restart
    /// of the caller, within the grace window).
    pub async fn await_decision(&self, id: Uuid) -> Option<ApprovalWait> {
        self.inner
            .lock()
            .await
            .pending
            .get(&id)
            .map(|e| ApprovalWait {
                rx: e.tx.subscribe(),
            })
    }

    /// Pending records, excluding resolved-but-still-grace-retained entries.
    pub async fn list_pending(&self) -> Vec<AutonomyApprovalRecord> {
        self.inner
            .lock()
            .await
            .pending
            .values()
            .filter(|e| !e.record.is_resolved())
            .map(|e| e.record.clone())
            .collect()
    }

    pub async fn pending_count(&self) -> usize {
        self.inner
            .lock()
            .await
            .pending
            .values()
            .filter(|e| !e.record.is_resolved())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> AutonomyApprovalRequest {
        AutonomyApprovalRequest {
            tool_name: "exec".to_string(),
            params_summary: "{}".to_string(),
            tier: ActionTier::EphemeralCompute,
            level: AutonomyLevel::Low,
            gate_reason: "requires approval".to_string(),
            confidence: None,
            agent_id: None,
            session_key: None,
            trace_id: None,
        }
    }

    #[tokio::test]
    async fn resolve_completes_future_and_is_one_way() {
        let manager = ApprovalManager::new();
        let record = manager.create(sample_request(), 120_000, None, 0);
        let id = record.id;
        let wait = manager.register(record, 120_000).await.unwrap();

        assert!(
            manager
                .resolve(id, ApprovalDecision::AllowOnce, Some("u@c"), 10)
                .await
        );
        assert!(!manager.resolve(id, ApprovalDecision::Deny, None, 20).await);

        let decision = wait.await_decision().await;
        assert_eq!(decision, Some(ApprovalDecision::AllowOnce));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_resolves_to_none_sentinel() {
        let manager = ApprovalManager::new();
        let record = manager.create(sample_request(), 1_000, None, 0);
        let wait = manager.register(record, 1_000).await.unwrap();

        tokio::time::advance(Duration::from_millis(1_001)).await;
        let decision = wait.await_decision().await;
        assert_eq!(decision, None);
    }

    #[tokio::test]
    async fn unknown_id_resolve_returns_false() {
        let manager = ApprovalManager::new();
        assert!(
            !manager
                .resolve(Uuid::new_v4(), ApprovalDecision::Deny, None, 0)
                .await
        );
    }

    #[tokio::test]
    async fn list_pending_excludes_resolved() {
        let manager = ApprovalManager::new();
        let record = manager.create(sample_request(), 120_000, None, 0);
        let id = record.id;
        let _wait = manager.register(record, 120_000).await.unwrap();
        assert_eq!(manager.pending_count().await, 1);

        manager
            .resolve(id, ApprovalDecision::AllowOnce, None, 5)
            .await;
        assert_eq!(manager.pending_count().await, 0);
        assert!(manager.list_pending().await.is_empty());
    }

    #[tokio::test]
    async fn idempotent_register_shares_outcome() {
        let manager = ApprovalManager::new();
        let record = manager.create(sample_request(), 120_000, None, 0);
        let id = record.id;
        let wait1 = manager.register(record.clone(), 120_000).await.unwrap();
        let wait2 = manager.register(record, 120_000).await.unwrap();

        manager
            .resolve(id, ApprovalDecision::AllowAlways, None, 5)
            .await;

        assert_eq!(wait1.await_decision().await, Some(ApprovalDecision::AllowAlways));
        assert_eq!(wait2.await_decision().await, Some(ApprovalDecision::AllowAlways));
    }

    #[tokio::test]
    async fn registering_resolved_id_fails() {
        let manager = ApprovalManager::new();
        let record = manager.create(sample_request(), 120_000, None, 0);
        let id = record.id;
        manager.register(record.clone(), 120_000).await.unwrap();
        manager
            .resolve(id, ApprovalDecision::Deny, None, 5)
            .await;

        let err = manager.register(record, 120_000).await.unwrap_err();
        assert_eq!(err, "already resolved");
    }

    #[test]
    fn truncation_appends_single_ellipsis() {
        let long = "x".repeat(600);
        let summary = truncate_params_summary(&long);
        assert_eq!(summary.chars().count(), PARAMS_SUMMARY_LIMIT);
        assert!(summary.ends_with('\u{2026}'));
    }

    #[test]
    fn short_summary_passes_through() {
        assert_eq!(truncate_params_summary("hello"), "hello");
    }

    #[test]
    fn newline_stripped_even_under_limit() {
        assert_eq!(truncate_params_summary("a\nb"), "a b");
    }
}
