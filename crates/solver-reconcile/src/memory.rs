//! In-process control plane.
//!
//! Keeps created resources in memory with the same create-if-absent rule
//! as a real cluster. Records the most recent calls in order and can be
//! told to fail the next call for a resource kind. Used by tests and by
//! dry runs.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::info;

use solver_manifest::{AutoscalingPolicySpec, WorkerDeploymentSpec};

use crate::api::{CreateError, ResourceApi, ResourceKind};

/// Calls kept in the journal; older entries are discarded.
pub const JOURNAL_CAPACITY: usize = 1024;

/// A create call, in the order it was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    CreateDeployment(String),
    CreatePolicy(String),
}

#[derive(Default)]
struct Inner {
    deployments: BTreeMap<(String, String), WorkerDeploymentSpec>,
    policies: BTreeMap<(String, String), AutoscalingPolicySpec>,
    journal: VecDeque<ApiCall>,
    failures: VecDeque<(ResourceKind, CreateError)>,
}

impl Inner {
    fn record(&mut self, call: ApiCall) {
        if self.journal.len() == JOURNAL_CAPACITY {
            self.journal.pop_front();
        }
        self.journal.push_back(call);
    }

    /// Pop the first injected failure for `kind`, if any.
    fn take_failure(&mut self, kind: ResourceKind) -> Option<CreateError> {
        let pos = self.failures.iter().position(|(k, _)| *k == kind)?;
        self.failures.remove(pos).map(|(_, err)| err)
    }
}

/// Control plane held in memory. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryResourceApi {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryResourceApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next create of `kind` fail with status `code`.
    pub fn fail_next(&self, kind: ResourceKind, code: u16, message: &str) {
        self.lock().failures.push_back((
            kind,
            CreateError::Rejected {
                code,
                message: message.to_string(),
            },
        ));
    }

    /// Make the next create of `kind` fail without an answer.
    pub fn disconnect_next(&self, kind: ResourceKind) {
        self.lock()
            .failures
            .push_back((kind, CreateError::Transport("connection refused".to_string())));
    }

    /// The last [`JOURNAL_CAPACITY`] create calls, oldest first.
    pub fn journal(&self) -> Vec<ApiCall> {
        self.lock().journal.iter().cloned().collect()
    }

    pub fn deployment(&self, namespace: &str, name: &str) -> Option<WorkerDeploymentSpec> {
        self.lock()
            .deployments
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn policy(&self, namespace: &str, name: &str) -> Option<AutoscalingPolicySpec> {
        self.lock()
            .policies
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn deployment_count(&self) -> usize {
        self.lock().deployments.len()
    }

    pub fn policy_count(&self) -> usize {
        self.lock().policies.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ResourceApi for InMemoryResourceApi {
    async fn create_deployment(&self, spec: &WorkerDeploymentSpec) -> Result<(), CreateError> {
        let mut inner = self.lock();
        inner.record(ApiCall::CreateDeployment(spec.name.clone()));

        if let Some(err) = inner.take_failure(ResourceKind::Deployment) {
            return Err(err);
        }

        let key = (spec.namespace.clone(), spec.name.clone());
        if inner.deployments.contains_key(&key) {
            return Err(CreateError::Conflict);
        }

        info!(namespace = %spec.namespace, name = %spec.name, image = %spec.container.image, "in-memory deployment stored");
        inner.deployments.insert(key, spec.clone());
        Ok(())
    }

    async fn create_policy(&self, spec: &AutoscalingPolicySpec) -> Result<(), CreateError> {
        let mut inner = self.lock();
        inner.record(ApiCall::CreatePolicy(spec.name.clone()));

        if let Some(err) = inner.take_failure(ResourceKind::Policy) {
            return Err(err);
        }

        let key = (spec.namespace.clone(), spec.name.clone());
        if inner.policies.contains_key(&key) {
            return Err(CreateError::Conflict);
        }

        info!(namespace = %spec.namespace, name = %spec.name, target = %spec.target_deployment, "in-memory scaled object stored");
        inner.policies.insert(key, spec.clone());
        Ok(())
    }
}
