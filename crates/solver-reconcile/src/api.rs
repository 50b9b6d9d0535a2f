//! The control-plane seam.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use solver_manifest::{AutoscalingPolicySpec, WorkerDeploymentSpec};

/// Which of the two worker resources a call concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Deployment,
    Policy,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Deployment => f.write_str("deployment"),
            ResourceKind::Policy => f.write_str("scaled object"),
        }
    }
}

/// Outcome of a failed create call, as reported by the control plane.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CreateError {
    /// HTTP 409: a resource with that name already exists.
    #[error("already exists")]
    Conflict,

    /// Any other non-success answer.
    #[error("rejected ({code}): {message}")]
    Rejected { code: u16, message: String },

    /// The call never got an answer.
    #[error("transport: {0}")]
    Transport(String),
}

/// Create calls against a cluster control plane.
///
/// Implementations must not update or delete: a create for a name that
/// already exists returns [`CreateError::Conflict`] and leaves the
/// existing resource untouched.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn create_deployment(&self, spec: &WorkerDeploymentSpec) -> Result<(), CreateError>;

    async fn create_policy(&self, spec: &AutoscalingPolicySpec) -> Result<(), CreateError>;
}
