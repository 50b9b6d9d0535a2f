//! Manifest builder — pure construction of worker resources.

use std::collections::BTreeMap;

use solver_core::{
    BrokerConfig, ConfigError, ControllerConfig, ScalingConfig, SolverMetadata, WorkerIdentity,
    WorkerNames, WorkerResources,
};

use crate::spec::*;

/// Seconds between autoscaler polls of the trigger sources.
pub const POLLING_INTERVAL_SECS: u32 = 1;

/// Seconds after the last active trigger before scaling to the minimum.
pub const COOLDOWN_PERIOD_SECS: u32 = 2;

const CONTAINER_NAME: &str = "solver";
const SCRATCH_MOUNT: &str = "/tmp";

const LABEL_NAME: &str = "app.kubernetes.io/name";
const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
const LABEL_SOLVER_ID: &str = "solver-controller/solver-id";
const LABEL_VCPUS: &str = "solver-controller/vcpus";
const ANNOTATION_SOLVER_NAME: &str = "solver-controller/solver-name";

/// Builds worker deployments and autoscaling policies from the
/// controller configuration.
///
/// Holds only configuration captured at construction; every build call is
/// a pure function of its arguments.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    namespace: String,
    broker: BrokerConfig,
    broker_uri: String,
    worker: WorkerResources,
    scaling: ScalingConfig,
}

impl ManifestBuilder {
    /// Fails only when the broker endpoint cannot form an AMQP URI.
    pub fn new(config: &ControllerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            namespace: config.namespace.clone(),
            broker: config.broker.clone(),
            broker_uri: config.broker.amqp_uri()?,
            worker: config.worker.clone(),
            scaling: config.scaling.clone(),
        })
    }

    /// Build the deployment for `identity`.
    ///
    /// The CPU reservation is the identity's vcpu count, so two profiles of
    /// the same solver get differently sized workers.
    pub fn build_deployment(
        &self,
        identity: WorkerIdentity,
        solver: &SolverMetadata,
        names: &WorkerNames,
    ) -> WorkerDeploymentSpec {
        let cpu = identity.vcpus.to_string();

        let mut annotations = BTreeMap::new();
        annotations.insert(ANNOTATION_SOLVER_NAME.to_string(), solver.name.clone());

        WorkerDeploymentSpec {
            name: names.deployment.clone(),
            namespace: self.namespace.clone(),
            labels: identity_labels(identity),
            annotations,
            replicas: self.scaling.min_replicas,
            container: WorkerContainer {
                name: CONTAINER_NAME.to_string(),
                image: solver.image_ref.clone(),
                env: self.env_bindings(names, &cpu),
                resources: ResourceReservation {
                    cpu,
                    memory: format!("{}Gi", self.worker.memory_gib),
                },
                security: ContainerSecurity::restricted(),
            },
            image_pull_secrets: self.worker.image_pull_secrets.clone(),
            scratch_mount: SCRATCH_MOUNT.to_string(),
            pod_security: PodSecurity::restricted(),
        }
    }

    /// Build the autoscaling policy that scales `names.deployment` on the
    /// depth of `names.input_queue`.
    pub fn build_policy(
        &self,
        identity: WorkerIdentity,
        names: &WorkerNames,
    ) -> AutoscalingPolicySpec {
        let mut triggers = vec![ScaleTrigger::QueueLength {
            host: self.broker_uri.clone(),
            queue: names.input_queue.clone(),
            messages_per_replica: self.scaling.queue_length_per_replica,
        }];

        if let Some(percent) = self.scaling.cpu_utilization_percent {
            triggers.push(ScaleTrigger::CpuUtilization { percent });
        }

        AutoscalingPolicySpec {
            name: names.policy.clone(),
            namespace: self.namespace.clone(),
            labels: identity_labels(identity),
            target_deployment: names.deployment.clone(),
            min_replicas: self.scaling.min_replicas,
            max_replicas: self.scaling.max_replicas,
            polling_interval_secs: POLLING_INTERVAL_SECS,
            cooldown_period_secs: COOLDOWN_PERIOD_SECS,
            triggers,
        }
    }

    fn env_bindings(&self, names: &WorkerNames, cpu: &str) -> Vec<EnvBinding> {
        vec![
            EnvBinding::new("QUEUE_HOST", self.broker.host.clone()),
            EnvBinding::new("QUEUE_PORT", self.broker.port.to_string()),
            EnvBinding::new("QUEUE_USER", self.broker.user.clone()),
            EnvBinding::new("QUEUE_PASSWORD", self.broker.password.clone()),
            EnvBinding::new("QUEUE_IN_NAME", names.input_queue.clone()),
            EnvBinding::new("QUEUE_OUT_NAME", names.output_queue.clone()),
            EnvBinding::new("CPU_LIMIT", cpu),
        ]
    }
}

fn identity_labels(identity: WorkerIdentity) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), "solver-worker".to_string()),
        (LABEL_MANAGED_BY.to_string(), "solver-controller".to_string()),
        (LABEL_SOLVER_ID.to_string(), identity.solver_id.to_string()),
        (LABEL_VCPUS.to_string(), identity.vcpus.to_string()),
    ])
}
