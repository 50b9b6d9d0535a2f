//! Shared fixtures for tests across the workspace.

use std::time::Duration;

use crate::config::{BrokerConfig, ControllerConfig, ScalingConfig, WorkerResources};

/// A configuration that passes `validate()`. Tests adjust the fields they
/// care about.
pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        tenant: "acme".to_string(),
        namespace: "solvers".to_string(),
        control_queue: "control".to_string(),
        broker: BrokerConfig {
            host: "rabbitmq".to_string(),
            port: 5672,
            user: "guest".to_string(),
            password: "guest".to_string(),
        },
        worker: WorkerResources {
            memory_gib: 1,
            default_image: None,
            image_pull_secrets: vec![],
        },
        scaling: ScalingConfig {
            min_replicas: 0,
            max_replicas: 10,
            queue_length_per_replica: 1,
            cpu_utilization_percent: Some(50),
        },
        solver_directory_url: "http://directory:8000/solvers".to_string(),
        problem_api_url: "http://problems:8000".to_string(),
        metadata_connect_timeout: Duration::from_secs(5),
        metadata_timeout: Duration::from_secs(10),
        message_timeout: Duration::from_secs(60),
        requeue_delay: Duration::from_millis(10),
    }
}
