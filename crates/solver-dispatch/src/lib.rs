//! solver-dispatch — control queue → worker queue routing.
//!
//! # Architecture
//!
//! ```text
//!   control queue ──► ControlConsumer (prefetch 1, reconnect w/ backoff)
//!                         │ body
//!                         ▼
//!                     Dispatcher::process
//!                         ├── SolverDirectory::resolve     (name, image)
//!                         ├── derive_names                 (queues, deployment, policy)
//!                         ├── ManifestBuilder              (typed specs)
//!                         ├── Reconciler::ensure_worker    (create-if-absent)
//!                         └── Publisher::publish           (worker input queue)
//!                         │ Outcome
//!                         ▼
//!                     ack / nack(requeue)
//! ```
//!
//! The inbound message is acknowledged only after the work item was
//! published, or when it can never succeed (malformed body). Delivery is
//! at-least-once: a crash between publish and ack duplicates the work item.

pub mod amqp;
pub mod backoff;
pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod publisher;
pub mod stats;

pub use amqp::{AmqpConnector, AmqpPublisher};
pub use backoff::Backoff;
pub use consumer::{Acker, Connector, ControlConsumer, Inbound, Session};
pub use dispatcher::{Delivered, Dispatcher, Disposition, Outcome};
pub use error::{BrokerError, DispatchError, DispatchResult};
pub use publisher::{PublishedMessage, Publisher, RecordingPublisher};
pub use stats::{DispatchStats, StatsSnapshot};
