//! Controller configuration.
//!
//! Built once at startup (the daemon fills it from flags / environment)
//! and handed to each component constructor. `validate()` catches the
//! values the controller cannot run with, so a bad deployment fails at
//! boot instead of on the first message.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid tenant id {0:?}: only ASCII letters, digits, '-' and '_' are allowed")]
    InvalidTenant(String),

    #[error("invalid URL for {field}: {value:?}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("invalid replica bounds: min {min} > max {max}")]
    ReplicaBounds { min: u32, max: u32 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("cpu utilization threshold must be within 1..=100, got {0}")]
    CpuPercent(u32),
}

/// Broker endpoint and credentials. Shared by the controller's own
/// connection and injected into every worker it deploys.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl BrokerConfig {
    /// AMQP URI on the default vhost, credentials percent-encoded.
    pub fn amqp_uri(&self) -> Result<String, ConfigError> {
        let invalid = || ConfigError::InvalidUrl {
            field: "broker",
            value: format!("{}:{}", self.host, self.port),
        };
        let mut uri =
            Url::parse(&format!("amqp://{}:{}/%2f", self.host, self.port)).map_err(|_| invalid())?;
        if uri.host_str().is_none_or(str::is_empty) {
            return Err(invalid());
        }
        uri.set_username(&self.user).map_err(|_| invalid())?;
        uri.set_password(Some(&self.password))
            .map_err(|_| invalid())?;
        Ok(uri.into())
    }
}

/// Per-worker container settings that do not depend on the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerResources {
    /// Memory request (and limit) per worker, in GiB.
    pub memory_gib: u32,
    /// Image used when the solver directory does not name one.
    pub default_image: Option<String>,
    pub image_pull_secrets: Vec<String>,
}

/// Autoscaling parameters shared by every worker kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScalingConfig {
    pub min_replicas: u32,
    /// Ceiling shared across all worker kinds in the namespace.
    pub max_replicas: u32,
    /// Queued messages each replica is expected to absorb.
    pub queue_length_per_replica: u32,
    /// Keep replicas while CPU utilization is above this percentage.
    /// `None` disables the CPU trigger.
    pub cpu_utilization_percent: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Tenant / project id, part of every queue name.
    pub tenant: String,
    /// Namespace workers and their scalers are created in.
    pub namespace: String,
    /// Queue the controller consumes solve requests from.
    pub control_queue: String,
    pub broker: BrokerConfig,
    pub worker: WorkerResources,
    pub scaling: ScalingConfig,
    /// Base URL of the solver directory (`GET {base}/{solver_id}`).
    pub solver_directory_url: String,
    /// Base URL problem and instance links are built against.
    pub problem_api_url: String,
    pub metadata_connect_timeout: Duration,
    pub metadata_timeout: Duration,
    /// Upper bound on one message's enrich → reconcile → publish chain.
    pub message_timeout: Duration,
    /// Pause before a failed message is handed back to the broker.
    pub requeue_delay: Duration,
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tenant.is_empty() {
            return Err(ConfigError::Missing("tenant id"));
        }
        if !self
            .tenant
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::InvalidTenant(self.tenant.clone()));
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::Missing("solvers namespace"));
        }
        if self.control_queue.is_empty() {
            return Err(ConfigError::Missing("control queue"));
        }
        if self.broker.host.is_empty() {
            return Err(ConfigError::Missing("broker host"));
        }
        self.broker.amqp_uri()?;

        check_url("solver directory", &self.solver_directory_url)?;
        check_url("problem api", &self.problem_api_url)?;

        if self.worker.memory_gib == 0 {
            return Err(ConfigError::Zero("worker memory"));
        }

        let scaling = &self.scaling;
        if scaling.max_replicas == 0 {
            return Err(ConfigError::Zero("max replicas"));
        }
        if scaling.min_replicas > scaling.max_replicas {
            return Err(ConfigError::ReplicaBounds {
                min: scaling.min_replicas,
                max: scaling.max_replicas,
            });
        }
        if scaling.queue_length_per_replica == 0 {
            return Err(ConfigError::Zero("queue length per replica"));
        }
        if let Some(pct) = scaling.cpu_utilization_percent
            && !(1..=100).contains(&pct)
        {
            return Err(ConfigError::CpuPercent(pct));
        }

        if self.message_timeout.is_zero() {
            return Err(ConfigError::Zero("message timeout"));
        }

        Ok(())
    }
}

/// Absolute `http(s)` URL with a host.
fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
    };
    let url = Url::parse(value).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none_or(str::is_empty) {
        return Err(invalid());
    }
    Ok(())
}
