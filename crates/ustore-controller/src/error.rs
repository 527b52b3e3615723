//! Reconcile error types.

use thiserror::Error;
use ustore_state::StateError;

/// Why a reconcile pass stopped before converging.
///
/// Every variant names the object kind and key involved so the caller can log
/// and decide on requeue without inspecting the store.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("store unavailable while handling {kind} {key}: {source}")]
    StoreUnavailable {
        kind: String,
        key: String,
        #[source]
        source: StateError,
    },

    #[error("{kind} {key} exists but is not owned by this workload: {reason}")]
    ConflictingState {
        kind: String,
        key: String,
        reason: String,
    },

    #[error("workload {key} rejected: {reason}")]
    ValidationRejected { key: String, reason: String },

    #[error("failed to converge {kind} {key}: {reason}")]
    ConvergenceFailed {
        kind: String,
        key: String,
        reason: String,
    },

    #[error("reconcile of {key} cancelled")]
    Cancelled { key: String },
}

impl ReconcileError {
    /// Whether running the same pass again later may succeed without a spec
    /// change or operator intervention.
    ///
    /// Store errors requeue only when the store says the call may succeed on
    /// retry. A record that fails to decode stays broken.
    pub fn requeue(&self) -> bool {
        match self {
            ReconcileError::StoreUnavailable { source, .. } => source.is_transient(),
            ReconcileError::ConvergenceFailed { .. } | ReconcileError::Cancelled { .. } => true,
            ReconcileError::ConflictingState { .. } | ReconcileError::ValidationRejected { .. } => {
                false
            }
        }
    }

    /// Kind of the object the pass stopped at, if any.
    pub fn kind(&self) -> Option<&str> {
        match self {
            ReconcileError::StoreUnavailable { kind, .. }
            | ReconcileError::ConflictingState { kind, .. }
            | ReconcileError::ConvergenceFailed { kind, .. } => Some(kind),
            ReconcileError::ValidationRejected { .. } | ReconcileError::Cancelled { .. } => None,
        }
    }

    pub(crate) fn store(kind: impl ToString, key: impl ToString, source: StateError) -> Self {
        ReconcileError::StoreUnavailable {
            kind: kind.to_string(),
            key: key.to_string(),
            source,
        }
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
