//! Command-line and environment configuration.

use std::time::Duration;

use clap::Args;

use solver_core::{
    BrokerConfig, ConfigError, ControllerConfig, ScalingConfig, WorkerResources,
};

/// Controller settings shared by every subcommand.
///
/// Each flag falls back to the environment variable of the same name in
/// upper snake case.
#[derive(Args, Debug, Clone)]
pub struct ControllerArgs {
    /// Tenant / project id used in queue names.
    #[arg(long, env = "PROJECT_ID")]
    pub project_id: String,

    /// Namespace worker deployments are created in.
    #[arg(long, env = "SOLVERS_NAMESPACE")]
    pub solvers_namespace: String,

    /// Queue solve requests arrive on.
    #[arg(long, env = "CONTROL_QUEUE")]
    pub control_queue: String,

    #[arg(long, env = "RABBITMQ_HOST")]
    pub rabbitmq_host: String,

    #[arg(long, env = "RABBITMQ_PORT", default_value_t = 5672)]
    pub rabbitmq_port: u16,

    #[arg(long, env = "RABBITMQ_USER")]
    pub rabbitmq_user: String,

    #[arg(long, env = "RABBITMQ_PASSWORD", hide_env_values = true)]
    pub rabbitmq_password: String,

    /// Base URL of the solver directory (`GET {url}/{solver_id}`).
    #[arg(long, env = "SOLVER_DIRECTORY_URL")]
    pub solver_directory_url: String,

    /// Base URL for problem and instance file links.
    #[arg(long, env = "PROBLEM_API_URL")]
    pub problem_api_url: String,

    /// Worker image used when the directory has none for a solver.
    #[arg(long, env = "SOLVER_IMAGE")]
    pub solver_image: Option<String>,

    /// Comma-separated image pull secret names.
    #[arg(long, env = "IMAGE_PULL_SECRETS", value_delimiter = ',')]
    pub image_pull_secrets: Vec<String>,

    /// Memory per worker, in GiB.
    #[arg(long, env = "POD_MEMORY_REQUEST_GI", default_value_t = 1)]
    pub pod_memory_request_gi: u32,

    #[arg(long, env = "QUEUE_LENGTH_PER_REPLICA", default_value_t = 1)]
    pub queue_length_per_replica: u32,

    /// CPU utilization target for the cpu trigger; 0 disables it.
    #[arg(long, env = "CPU_UTILIZATION_PERCENT", default_value_t = 50)]
    pub cpu_utilization_percent: u32,

    #[arg(long, env = "MIN_REPLICAS", default_value_t = 0)]
    pub min_replicas: u32,

    #[arg(long, env = "MAX_TOTAL_SOLVER_REPLICAS")]
    pub max_total_solver_replicas: u32,

    #[arg(long, env = "METADATA_CONNECT_TIMEOUT_SECS", default_value_t = 5)]
    pub metadata_connect_timeout_secs: u64,

    #[arg(long, env = "METADATA_TIMEOUT_SECS", default_value_t = 10)]
    pub metadata_timeout_secs: u64,

    /// Upper bound on processing one control message.
    #[arg(long, env = "MESSAGE_TIMEOUT_SECS", default_value_t = 60)]
    pub message_timeout_secs: u64,

    /// Pause before a failed message is requeued.
    #[arg(long, env = "REQUEUE_DELAY_MS", default_value_t = 1000)]
    pub requeue_delay_ms: u64,
}

impl ControllerArgs {
    /// Build and validate the controller configuration.
    pub fn into_config(self) -> Result<ControllerConfig, ConfigError> {
        let config = ControllerConfig {
            tenant: self.project_id,
            namespace: self.solvers_namespace,
            control_queue: self.control_queue,
            broker: BrokerConfig {
                host: self.rabbitmq_host,
                port: self.rabbitmq_port,
                user: self.rabbitmq_user,
                password: self.rabbitmq_password,
            },
            worker: WorkerResources {
                memory_gib: self.pod_memory_request_gi,
                default_image: self.solver_image.filter(|i| !i.is_empty()),
                image_pull_secrets: self
                    .image_pull_secrets
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            scaling: ScalingConfig {
                min_replicas: self.min_replicas,
                max_replicas: self.max_total_solver_replicas,
                queue_length_per_replica: self.queue_length_per_replica,
                cpu_utilization_percent: (self.cpu_utilization_percent > 0)
                    .then_some(self.cpu_utilization_percent),
            },
            solver_directory_url: self.solver_directory_url,
            problem_api_url: self.problem_api_url,
            metadata_connect_timeout: Duration::from_secs(self.metadata_connect_timeout_secs),
            metadata_timeout: Duration::from_secs(self.metadata_timeout_secs),
            message_timeout: Duration::from_secs(self.message_timeout_secs),
            requeue_delay: Duration::from_millis(self.requeue_delay_ms),
        };
        config.validate()?;
        Ok(config)
    }
}
