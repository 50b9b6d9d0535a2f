//! solver-core — shared vocabulary of the solver controller.
//!
//! - [`types`]: inbound/outbound queue messages and the `WorkerIdentity` key
//! - [`names`]: deterministic queue / deployment / policy naming
//! - [`config`]: the controller configuration built once at startup

pub mod config;
pub mod names;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::{BrokerConfig, ConfigError, ControllerConfig, ScalingConfig, WorkerResources};
pub use names::{WorkerNames, derive_names};
pub use types::*;
