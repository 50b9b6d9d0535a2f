//! Dispatch error types.

use std::time::Duration;

use thiserror::Error;

use solver_core::MalformedRequest;
use solver_metadata::MetadataError;
use solver_reconcile::ReconcileError;

/// Broker-side failures: connecting, consuming, publishing.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("amqp: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("publish to {queue} was not confirmed by the broker")]
    NotConfirmed { queue: String },

    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// Why a control message did not reach its worker queue.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed message: {0}")]
    Malformed(#[from] MalformedRequest),

    #[error("metadata unavailable: {0}")]
    MetadataUnavailable(#[from] MetadataError),

    #[error("reconciliation failed: {0}")]
    ReconciliationFailed(#[from] ReconcileError),

    #[error("publish failed: {0}")]
    PublishFailed(#[from] BrokerError),

    #[error("processing exceeded {0:?}")]
    Timeout(Duration),

    #[error("encode work item: {0}")]
    Encode(serde_json::Error),
}

impl DispatchError {
    /// Whether redelivering the same message may succeed later.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DispatchError::Malformed(_) | DispatchError::Encode(_))
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
