//! Typed worker specs → Kubernetes objects.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Capabilities, Container, EmptyDirVolumeSource, EnvVar, LocalObjectReference,
    PodSecurityContext, PodSpec, PodTemplateSpec, ResourceRequirements, SeccompProfile,
    SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use solver_manifest::{AutoscalingPolicySpec, ScaleTrigger, WorkerDeploymentSpec};

use crate::keda::{ScaleTargetRef, ScaleTriggerSpec, ScaledObject, ScaledObjectSpec};

const SCRATCH_VOLUME: &str = "tmp";

/// Build the `apps/v1` Deployment for a worker.
pub fn deployment(spec: &WorkerDeploymentSpec) -> Deployment {
    let container = &spec.container;

    let reservation = BTreeMap::from([
        ("cpu".to_string(), Quantity(container.resources.cpu.clone())),
        ("memory".to_string(), Quantity(container.resources.memory.clone())),
    ]);

    let env = container
        .env
        .iter()
        .map(|binding| EnvVar {
            name: binding.name.clone(),
            value: Some(binding.value.clone()),
            ..Default::default()
        })
        .collect();

    let k8s_container = Container {
        name: container.name.clone(),
        image: Some(container.image.clone()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        env: Some(env),
        resources: Some(ResourceRequirements {
            requests: Some(reservation.clone()),
            limits: Some(reservation),
            ..Default::default()
        }),
        volume_mounts: Some(vec![VolumeMount {
            name: SCRATCH_VOLUME.to_string(),
            mount_path: spec.scratch_mount.clone(),
            ..Default::default()
        }]),
        security_context: Some(SecurityContext {
            allow_privilege_escalation: Some(container.security.allow_privilege_escalation),
            privileged: Some(container.security.privileged),
            read_only_root_filesystem: Some(container.security.read_only_root_filesystem),
            capabilities: Some(Capabilities {
                drop: Some(container.security.drop_capabilities.clone()),
                add: None,
            }),
            ..Default::default()
        }),
        ..Default::default()
    };

    let image_pull_secrets = if spec.image_pull_secrets.is_empty() {
        None
    } else {
        Some(
            spec.image_pull_secrets
                .iter()
                .map(|name| LocalObjectReference { name: name.clone() })
                .collect(),
        )
    };

    Deployment {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(spec.namespace.clone()),
            labels: Some(spec.labels.clone()),
            annotations: Some(spec.annotations.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(to_i32(spec.replicas)),
            selector: LabelSelector {
                match_labels: Some(spec.labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(spec.labels.clone()),
                    annotations: Some(spec.annotations.clone()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![k8s_container],
                    image_pull_secrets,
                    security_context: Some(PodSecurityContext {
                        run_as_non_root: Some(spec.pod_security.run_as_non_root),
                        seccomp_profile: Some(SeccompProfile {
                            type_: spec.pod_security.seccomp_profile.clone(),
                            localhost_profile: None,
                        }),
                        ..Default::default()
                    }),
                    volumes: Some(vec![Volume {
                        name: SCRATCH_VOLUME.to_string(),
                        empty_dir: Some(EmptyDirVolumeSource::default()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

/// Build the KEDA ScaledObject for a worker's autoscaling policy.
pub fn scaled_object(spec: &AutoscalingPolicySpec) -> ScaledObject {
    let triggers = spec.triggers.iter().map(trigger).collect();

    let mut object = ScaledObject::new(
        &spec.name,
        ScaledObjectSpec {
            scale_target_ref: ScaleTargetRef {
                name: spec.target_deployment.clone(),
            },
            min_replica_count: to_i32(spec.min_replicas),
            max_replica_count: to_i32(spec.max_replicas),
            polling_interval: to_i32(spec.polling_interval_secs),
            cooldown_period: to_i32(spec.cooldown_period_secs),
            triggers,
        },
    );
    object.metadata.namespace = Some(spec.namespace.clone());
    object.metadata.labels = Some(spec.labels.clone());
    object
}

fn trigger(trigger: &ScaleTrigger) -> ScaleTriggerSpec {
    match trigger {
        ScaleTrigger::QueueLength {
            host,
            queue,
            messages_per_replica,
        } => ScaleTriggerSpec {
            type_: "rabbitmq".to_string(),
            metric_type: None,
            metadata: BTreeMap::from([
                ("host".to_string(), host.clone()),
                ("queueName".to_string(), queue.clone()),
                ("mode".to_string(), "QueueLength".to_string()),
                ("value".to_string(), messages_per_replica.to_string()),
            ]),
        },
        ScaleTrigger::CpuUtilization { percent } => ScaleTriggerSpec {
            type_: "cpu".to_string(),
            metric_type: Some("Utilization".to_string()),
            metadata: BTreeMap::from([("value".to_string(), percent.to_string())]),
        },
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
