//! Typed worker resource records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Deployment ─────────────────────────────────────────────────────

/// Declarative description of one worker deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerDeploymentSpec {
    pub name: String,
    pub namespace: String,
    /// Labels on the deployment and its pods. Also used as the selector.
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    /// Replica count at creation time. The autoscaler owns it afterwards.
    pub replicas: u32,
    pub container: WorkerContainer,
    pub image_pull_secrets: Vec<String>,
    /// Writable scratch directory backed by an `emptyDir` volume.
    pub scratch_mount: String,
    pub pod_security: PodSecurity,
}

/// The single solver container of a worker pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerContainer {
    pub name: String,
    pub image: String,
    pub env: Vec<EnvBinding>,
    pub resources: ResourceReservation,
    pub security: ContainerSecurity,
}

/// One environment variable injected into the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvBinding {
    pub name: String,
    pub value: String,
}

impl EnvBinding {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// CPU and memory, used as both request and limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReservation {
    /// Whole cores, e.g. `"4"`.
    pub cpu: String,
    /// Binary-suffixed quantity, e.g. `"2Gi"`.
    pub memory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSecurity {
    pub allow_privilege_escalation: bool,
    pub privileged: bool,
    pub read_only_root_filesystem: bool,
    pub drop_capabilities: Vec<String>,
}

impl ContainerSecurity {
    /// Unprivileged container with an immutable root filesystem.
    pub fn restricted() -> Self {
        Self {
            allow_privilege_escalation: false,
            privileged: false,
            read_only_root_filesystem: true,
            drop_capabilities: vec!["ALL".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSecurity {
    pub run_as_non_root: bool,
    pub seccomp_profile: String,
}

impl PodSecurity {
    pub fn restricted() -> Self {
        Self {
            run_as_non_root: true,
            seccomp_profile: "RuntimeDefault".to_string(),
        }
    }
}

// ── Autoscaling ────────────────────────────────────────────────────

/// Declarative autoscaling policy for one worker deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoscalingPolicySpec {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    /// Name of the deployment this policy scales.
    pub target_deployment: String,
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub polling_interval_secs: u32,
    pub cooldown_period_secs: u32,
    pub triggers: Vec<ScaleTrigger>,
}

/// A condition the external autoscaler scales on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScaleTrigger {
    /// Scale so each replica has about `messages_per_replica` queued
    /// messages.
    QueueLength {
        /// Broker URI the autoscaler polls the queue through.
        host: String,
        queue: String,
        messages_per_replica: u32,
    },
    /// Keep replicas while average CPU utilization exceeds `percent`.
    CpuUtilization { percent: u32 },
}
