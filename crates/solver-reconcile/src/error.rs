//! Reconciler error types.

use thiserror::Error;

use crate::api::ResourceKind;

/// A create call failed for a reason other than "already exists".
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{kind} {name} rejected by control plane ({code}): {message}")]
    Rejected {
        kind: ResourceKind,
        name: String,
        code: u16,
        message: String,
    },

    #[error("{kind} {name}: control plane unreachable: {message}")]
    Transport {
        kind: ResourceKind,
        name: String,
        message: String,
    },
}

impl ReconcileError {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ReconcileError::Rejected { kind, .. } | ReconcileError::Transport { kind, .. } => *kind,
        }
    }

    /// HTTP status returned by the control plane, if it answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ReconcileError::Rejected { code, .. } => Some(*code),
            ReconcileError::Transport { .. } => None,
        }
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
