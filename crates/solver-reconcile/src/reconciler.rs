//! Reconciler — create-if-absent of a worker's deployment and scaler.

use std::sync::Arc;

use tracing::{debug, error, info};

use solver_manifest::{AutoscalingPolicySpec, WorkerDeploymentSpec};

use crate::api::{CreateError, ResourceApi, ResourceKind};
use crate::error::{ReconcileError, ReconcileResult};

/// Successful outcome of an ensure call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// This call created the resource.
    Created,
    /// The resource was already present and was left as is.
    AlreadyExists,
}

/// Outcome of ensuring both worker resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnsuredWorker {
    pub deployment: Applied,
    pub policy: Applied,
}

/// Applies worker resources to the control plane with create-if-absent
/// semantics.
///
/// Holds no state of its own. Concurrent reconcilers (one per controller
/// process) may race on the same names; the conflict rule makes that safe
/// but does not decide who wins.
#[derive(Clone)]
pub struct Reconciler {
    api: Arc<dyn ResourceApi>,
}

impl Reconciler {
    pub fn new(api: Arc<dyn ResourceApi>) -> Self {
        Self { api }
    }

    pub async fn ensure_deployment(&self, spec: &WorkerDeploymentSpec) -> ReconcileResult<Applied> {
        let result = self.api.create_deployment(spec).await;
        classify(ResourceKind::Deployment, &spec.namespace, &spec.name, result)
    }

    pub async fn ensure_policy(&self, spec: &AutoscalingPolicySpec) -> ReconcileResult<Applied> {
        let result = self.api.create_policy(spec).await;
        classify(ResourceKind::Policy, &spec.namespace, &spec.name, result)
    }

    /// Ensure the deployment, then its policy.
    ///
    /// The policy is attempted even when the deployment already existed, so
    /// a scaler lost between the two creates of an earlier attempt is
    /// restored. It is never attempted if the deployment failed.
    pub async fn ensure_worker(
        &self,
        deployment: &WorkerDeploymentSpec,
        policy: &AutoscalingPolicySpec,
    ) -> ReconcileResult<EnsuredWorker> {
        let deployment = self.ensure_deployment(deployment).await?;
        let policy = self.ensure_policy(policy).await?;
        Ok(EnsuredWorker { deployment, policy })
    }
}

fn classify(
    kind: ResourceKind,
    namespace: &str,
    name: &str,
    result: Result<(), CreateError>,
) -> ReconcileResult<Applied> {
    match result {
        Ok(()) => {
            info!(%kind, %namespace, %name, "created");
            Ok(Applied::Created)
        }
        Err(CreateError::Conflict) => {
            debug!(%kind, %namespace, %name, "already exists");
            Ok(Applied::AlreadyExists)
        }
        Err(CreateError::Rejected { code, message }) => {
            error!(%kind, %namespace, %name, code, %message, "create rejected");
            Err(ReconcileError::Rejected {
                kind,
                name: name.to_string(),
                code,
                message,
            })
        }
        Err(CreateError::Transport(message)) => {
            error!(%kind, %namespace, %name, %message, "create failed");
            Err(ReconcileError::Transport {
                kind,
                name: name.to_string(),
                message,
            })
        }
    }
}
