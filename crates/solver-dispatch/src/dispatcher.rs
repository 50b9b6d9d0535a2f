//! Dispatcher — one control message through the whole chain.
//!
//! ```text
//! Received → Parsed → Enriched → NamesDerived → DeploymentEnsured
//!          → PolicyEnsured → Published
//! ```
//!
//! A parse failure is final and the message is dropped. Any later failure
//! leaves the message for redelivery.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use solver_core::{
    ConfigError, ControllerConfig, EnrichedSolveRequest, SolveRequest, WorkerIdentity,
    derive_names,
};
use solver_manifest::ManifestBuilder;
use solver_metadata::{ProblemLinks, SolverDirectory};
use solver_reconcile::{EnsuredWorker, Reconciler};

use crate::error::{DispatchError, DispatchResult};
use crate::publisher::Publisher;
use crate::stats::DispatchStats;

/// What the broker should do with the inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Requeue,
}

/// A work item that reached its worker queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub identity: WorkerIdentity,
    pub queue: String,
    pub worker: EnsuredWorker,
}

/// Result of processing one control message.
#[derive(Debug)]
pub enum Outcome {
    Published(Delivered),
    /// Failed in a way redelivery cannot fix; acknowledged.
    Dropped(DispatchError),
    /// Failed after parsing; redelivery may succeed.
    Retry {
        identity: WorkerIdentity,
        error: DispatchError,
    },
}

impl Outcome {
    pub fn disposition(&self) -> Disposition {
        match self {
            Outcome::Published(_) | Outcome::Dropped(_) => Disposition::Ack,
            Outcome::Retry { .. } => Disposition::Requeue,
        }
    }
}

/// Routes control messages to worker queues, creating the workers on the
/// way.
pub struct Dispatcher {
    tenant: String,
    directory: Arc<dyn SolverDirectory>,
    links: ProblemLinks,
    builder: ManifestBuilder,
    reconciler: Reconciler,
    message_timeout: Duration,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    pub fn new(
        config: &ControllerConfig,
        directory: Arc<dyn SolverDirectory>,
        reconciler: Reconciler,
        stats: Arc<DispatchStats>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            tenant: config.tenant.clone(),
            directory,
            links: ProblemLinks::new(&config.problem_api_url),
            builder: ManifestBuilder::new(config)?,
            reconciler,
            message_timeout: config.message_timeout,
            stats,
        })
    }

    pub fn stats(&self) -> &Arc<DispatchStats> {
        &self.stats
    }

    /// Process one raw control message body.
    ///
    /// Never panics and never returns early without a disposition: every
    /// failure is logged here and folded into the [`Outcome`].
    pub async fn process(&self, body: &[u8], publisher: &dyn Publisher) -> Outcome {
        self.stats.record_received();

        let request = match SolveRequest::from_slice(body) {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, body = %String::from_utf8_lossy(body), "dropping malformed control message");
                self.stats.record_dropped();
                return Outcome::Dropped(e.into());
            }
        };

        let identity = request.identity();
        debug!(
            solver_id = identity.solver_id,
            vcpus = identity.vcpus,
            problem_id = request.problem_id,
            instance_id = request.instance_id,
            "control message parsed"
        );

        let result = tokio::time::timeout(self.message_timeout, self.route(request, publisher))
            .await
            .unwrap_or(Err(DispatchError::Timeout(self.message_timeout)));

        match result {
            Ok(delivered) => {
                self.stats.record_published();
                Outcome::Published(delivered)
            }
            Err(e) if e.is_retryable() => {
                warn!(
                    solver_id = identity.solver_id,
                    vcpus = identity.vcpus,
                    error = %e,
                    "control message will be redelivered"
                );
                self.stats.record_requeued();
                Outcome::Retry { identity, error: e }
            }
            Err(e) => {
                error!(
                    solver_id = identity.solver_id,
                    vcpus = identity.vcpus,
                    error = %e,
                    "dropping control message"
                );
                self.stats.record_dropped();
                Outcome::Dropped(e)
            }
        }
    }

    async fn route(
        &self,
        request: SolveRequest,
        publisher: &dyn Publisher,
    ) -> DispatchResult<Delivered> {
        let identity = request.identity();

        let metadata = self.directory.resolve(request.solver_id).await?;
        let enriched = EnrichedSolveRequest {
            solver_id: request.solver_id,
            solver_name: metadata.name.clone(),
            problem_id: request.problem_id,
            instance_id: request.instance_id,
            problem_url: self.links.problem_url(request.problem_id),
            instance_url: self.links.instance_url(request.problem_id, request.instance_id),
            solver_image_ref: metadata.image_ref.clone(),
            vcpus: request.vcpus,
        };

        let names = derive_names(&self.tenant, identity);
        let deployment = self.builder.build_deployment(identity, &metadata, &names);
        let policy = self.builder.build_policy(identity, &names);
        let worker = self.reconciler.ensure_worker(&deployment, &policy).await?;

        let payload = serde_json::to_vec(&enriched).map_err(DispatchError::Encode)?;
        publisher.publish(&names.input_queue, &payload).await?;

        info!(
            solver_id = identity.solver_id,
            vcpus = identity.vcpus,
            solver = %enriched.solver_name,
            problem_id = enriched.problem_id,
            instance_id = enriched.instance_id,
            queue = %names.input_queue,
            deployment = %names.deployment,
            "work item routed"
        );

        Ok(Delivered {
            identity,
            queue: names.input_queue,
            worker,
        })
    }
}
