//! Error taxonomy for the Agent Action Safety Core.
//!
//! Each variant carries the distinctive tagged prefix its human-readable
//! message needs so logs and CLI output stay diff-friendly and greppable.

use thiserror::Error;

/// The error type returned by fallible AASC operations.
#[derive(Debug, Error)]
pub enum AascError {
    /// The target path fell outside the configured readable/writable scope,
    /// or inside a denied path.
    #[error("fs-boundary: {0}")]
    FsBoundary(String),

    /// The policy matrix denied the action outright.
    #[error("autonomy-gate denied: {0}")]
    GateDenied(String),

    /// A human explicitly denied a pending approval.
    #[error("autonomy-gate approval denied: {0}")]
    ApprovalDenied(String),

    /// The approval timer expired before a decision arrived.
    #[error("autonomy-gate approval timed out: {0}")]
    ApprovalTimedOut(String),

    /// An external before-hook vetoed the call.
    #[error("before-hook blocked: {0}")]
    BeforeHookBlocked(String),

    /// The underlying tool failed during execution.
    #[error("tool execution failed: {0}")]
    ToolExecution(String),

    /// The caller aborted the in-flight call.
    #[error("aborted")]
    Aborted,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl AascError {
    /// True for errors that must propagate unchanged rather than being
    /// wrapped into a structured `{status: "error", ...}` result.
    pub fn is_abort(&self) -> bool {
        matches!(self, AascError::Aborted)
    }
}

pub type Result<T> = std::result::Result<T, AascError>;
